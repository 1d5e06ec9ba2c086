//! Peepin Node - the main application entry point.
//!
//! Architecture:
//! - Single daemon process with shared RocksDB profile storage
//! - In-memory location store owned by the nearby service
//! - HTTP API for clients (login, location sharing, nearby)
//! - Unix admin socket for local admin ops (peepin-admin CLI)
//! - Background sweeper pruning stale locations

use crate::admin_socket::AdminSocket;
use crate::api;
use crate::auth::TokenSigner;
use crate::error::{Error, Result};
use crate::nearby::NearbyService;
use crate::storage::Storage;
use peepin_proximity::{now_millis, ProximityPolicy};
use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for a Peepin node.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Data directory for storage
    pub data_dir: PathBuf,

    /// HTTP API listen address
    pub api_addr: SocketAddr,

    /// Admin socket path (for peepin-admin CLI)
    pub admin_socket: PathBuf,

    /// Secret for token MACs; `None` generates one per process
    pub token_secret: Option<String>,

    /// Proximity thresholds
    pub policy: ProximityPolicy,

    /// Seed demo profiles into an empty store
    pub seed_demo: bool,

    /// Password given to every seeded demo profile
    pub demo_password: String,
}

/// Demo password used when `PEEPIN_DEMO_PASSWORD` is unset.
pub const DEFAULT_DEMO_PASSWORD: &str = "peepin123";

impl Default for NodeConfig {
    fn default() -> Self {
        let data_dir = PathBuf::from("./peepin-data");
        Self {
            admin_socket: data_dir.join("admin.sock"),
            data_dir,
            api_addr: SocketAddr::from(([0, 0, 0, 0], 4000)),
            token_secret: None,
            policy: ProximityPolicy::default(),
            seed_demo: true,
            demo_password: DEFAULT_DEMO_PASSWORD.to_string(),
        }
    }
}

impl NodeConfig {
    /// Create config from environment variables with sensible defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let data_dir = lookup("PEEPIN_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let api_addr = parse_or(&lookup, "PEEPIN_API_ADDR", defaults.api_addr)?;

        let admin_socket = lookup("PEEPIN_ADMIN_SOCKET")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("admin.sock"));

        let token_secret = lookup("PEEPIN_TOKEN_SECRET").filter(|s| !s.is_empty());

        let policy = ProximityPolicy {
            stale_threshold: Duration::from_secs(parse_or(
                &lookup,
                "PEEPIN_STALE_THRESHOLD_SECS",
                defaults.policy.stale_threshold.as_secs(),
            )?),
            recent_window: Duration::from_secs(parse_or(
                &lookup,
                "PEEPIN_RECENT_WINDOW_SECS",
                defaults.policy.recent_window.as_secs(),
            )?),
            default_radius_m: parse_or(
                &lookup,
                "PEEPIN_DEFAULT_RADIUS_M",
                defaults.policy.default_radius_m,
            )?,
        };
        policy
            .validate()
            .map_err(|e| Error::Config(e.to_string()))?;

        let seed_demo = parse_or(&lookup, "PEEPIN_SEED_DEMO", defaults.seed_demo)?;

        let demo_password = lookup("PEEPIN_DEMO_PASSWORD")
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.demo_password);

        Ok(Self {
            data_dir,
            api_addr,
            admin_socket,
            token_secret,
            policy,
            seed_demo,
            demo_password,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("invalid {key} value {raw:?}: {e}"))),
        None => Ok(default),
    }
}

/// Shared state for the node - handed to API handlers and the admin socket.
pub struct NodeState {
    pub storage: Arc<Storage>,
    pub nearby: Arc<NearbyService>,
    pub tokens: TokenSigner,
    pub config: NodeConfig,
}

/// A Peepin node instance.
pub struct PeepinNode {
    state: Arc<NodeState>,
    config: NodeConfig,
}

impl PeepinNode {
    /// Create a new node.
    pub async fn new(config: NodeConfig) -> Result<Self> {
        // Ensure data directory exists
        std::fs::create_dir_all(&config.data_dir)?;

        let storage = Arc::new(Storage::open(&config.data_dir)?);

        if config.seed_demo {
            let seeded = storage.init_demo_users(&config.demo_password)?;
            if seeded > 0 {
                tracing::info!("Seeded {} demo profiles", seeded);
                if config.demo_password == DEFAULT_DEMO_PASSWORD {
                    tracing::warn!("Demo profiles use the default password, set PEEPIN_DEMO_PASSWORD");
                }
            }
        }

        let tokens = match &config.token_secret {
            Some(secret) => TokenSigner::from_secret(secret),
            None => {
                tracing::warn!("PEEPIN_TOKEN_SECRET not set, tokens will not survive a restart");
                TokenSigner::random()
            }
        };

        let nearby = Arc::new(NearbyService::new(Arc::clone(&storage), config.policy));

        let state = Arc::new(NodeState {
            storage,
            nearby,
            tokens,
            config: config.clone(),
        });

        Ok(Self { state, config })
    }

    /// Get the shared state (for API handlers).
    pub fn state(&self) -> Arc<NodeState> {
        Arc::clone(&self.state)
    }

    /// Run the node (starts HTTP server, admin socket and stale sweeper).
    pub async fn run(self) -> Result<()> {
        let policy = &self.config.policy;
        tracing::info!("Peepin node starting");
        tracing::info!("  API: http://{}", self.config.api_addr);
        tracing::info!("  Admin: {:?}", self.config.admin_socket);
        tracing::info!("  Data: {:?}", self.config.data_dir);
        tracing::info!(
            "  Policy: stale after {:?}, recent within {:?}, default radius {} m",
            policy.stale_threshold,
            policy.recent_window,
            policy.default_radius_m
        );

        // Start admin socket server in background
        let admin_socket = AdminSocket::new(
            Arc::clone(&self.state.storage),
            Arc::clone(&self.state.nearby),
            &self.config.admin_socket,
        );
        tokio::spawn(async move {
            if let Err(e) = admin_socket.run().await {
                tracing::error!("Admin socket error: {}", e);
            }
        });

        // Stale sweeper
        let nearby = Arc::clone(&self.state.nearby);
        let every = sweep_interval(policy.stale_threshold);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let removed = nearby.prune_stale(now_millis());
                if removed > 0 {
                    tracing::info!("Swept {} stale locations", removed);
                }
            }
        });

        // Build HTTP API
        let app = api::build_router(self.state());

        // Start HTTP server
        let listener = tokio::net::TcpListener::bind(self.config.api_addr).await?;
        tracing::info!("HTTP server listening on {}", self.config.api_addr);

        axum::serve(listener, app).await?;

        Ok(())
    }
}

/// Half the stale threshold, never below one second.
fn sweep_interval(stale_threshold: Duration) -> Duration {
    (stale_threshold / 2).max(Duration::from_secs(1))
}
