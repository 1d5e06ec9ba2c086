//! Data models for the Peepin node.
//!
//! - [`UserProfile`] - public profile, including the location-sharing flag
//! - [`Mode`] - which side of the network a profile presents

mod user;

pub use user::{Mode, UserProfile};
