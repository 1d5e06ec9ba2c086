//! Peepin Node - nearby people over HTTP
//!
//! Hosts the proximity core behind a small authenticated HTTP API. Profiles
//! live in RocksDB; live locations live in memory only and expire on their own.
//!
//! # Architecture
//!
//! - **Models**: User profiles and the demo seed set
//! - **Storage**: RocksDB-backed profile storage
//! - **Auth**: Demo-grade bearer tokens (keyed BLAKE3 MACs, no passwords)
//! - **Nearby**: Location sharing and ranked nearby lookups
//! - **API**: HTTP endpoints for clients
//! - **Admin Socket**: Unix socket for local admin commands (peepin-admin CLI)
//!
//! # Example
//!
//! ```no_run
//! use peepin_node::{NodeConfig, PeepinNode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = NodeConfig::from_env()?;
//!     let node = PeepinNode::new(config).await?;
//!     node.run().await?;
//!     Ok(())
//! }
//! ```

pub mod admin_socket;
pub mod api;
pub mod auth;
pub mod error;
pub mod models;
pub mod nearby;
pub mod node;
pub mod storage;

pub use error::{Error, Result};
pub use models::{Mode, UserProfile};
pub use nearby::NearbyService;
pub use node::{NodeConfig, PeepinNode};
pub use storage::Storage;
