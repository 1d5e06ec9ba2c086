//! Unix socket server for admin commands.
//!
//! Provides a local IPC interface for managing profiles and live locations.
//! One JSON command per line in, one JSON response per line out.

use crate::error::Result;
use crate::models::UserProfile;
use crate::nearby::NearbyService;
use crate::storage::Storage;
use peepin_proximity::now_millis;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

/// Admin command sent over the socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum AdminCommand {
    /// Ping (health check)
    Ping,
    /// Create a profile with a login password
    AddUser {
        id: String,
        handle: String,
        password: String,
        name: String,
    },
    /// Replace a user's login password
    SetPassword { user_id: String, password: String },
    /// List all profiles
    ListUsers,
    /// Turn location sharing on or off for a user
    SetSharing { user_id: String, share: bool },
    /// Drop a user's live location
    ForgetLocation { user_id: String },
    /// Prune stale locations now
    Prune,
    /// Profile and location counts
    Stats,
}

/// Response from admin command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AdminResponse {
    Ok { message: String },
    Error { error: String },
    List { items: Vec<String> },
    Count { value: usize },
    Stats { users: usize, locations: usize },
    Pong,
}

impl AdminResponse {
    fn error(e: impl ToString) -> Self {
        AdminResponse::Error {
            error: e.to_string(),
        }
    }
}

/// Admin socket server.
pub struct AdminSocket {
    storage: Arc<Storage>,
    nearby: Arc<NearbyService>,
    socket_path: PathBuf,
}

impl AdminSocket {
    /// Create a new admin socket server.
    pub fn new(storage: Arc<Storage>, nearby: Arc<NearbyService>, socket_path: &Path) -> Self {
        Self {
            storage,
            nearby,
            socket_path: socket_path.to_path_buf(),
        }
    }

    /// Run the admin socket server.
    pub async fn run(&self) -> Result<()> {
        // Remove existing socket file if present
        let _ = std::fs::remove_file(&self.socket_path);

        let listener = UnixListener::bind(&self.socket_path)?;
        tracing::info!("Admin socket listening on {:?}", self.socket_path);

        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let storage = Arc::clone(&self.storage);
                    let nearby = Arc::clone(&self.nearby);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, storage, nearby).await {
                            tracing::error!("Admin connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    tracing::error!("Failed to accept admin connection: {}", e);
                }
            }
        }
    }

    /// Get the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

async fn handle_connection(
    stream: UnixStream,
    storage: Arc<Storage>,
    nearby: Arc<NearbyService>,
) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    while reader.read_line(&mut line).await? > 0 {
        let response = match serde_json::from_str::<AdminCommand>(&line) {
            Ok(cmd) => execute_command(cmd, &storage, &nearby),
            Err(e) => AdminResponse::Error {
                error: format!("Invalid command: {}", e),
            },
        };

        let response_json = serde_json::to_string(&response)? + "\n";
        writer.write_all(response_json.as_bytes()).await?;
        line.clear();
    }

    Ok(())
}

fn execute_command(cmd: AdminCommand, storage: &Storage, nearby: &NearbyService) -> AdminResponse {
    match cmd {
        AdminCommand::Ping => AdminResponse::Pong,

        AdminCommand::AddUser {
            id,
            handle,
            password,
            name,
        } => {
            if password.is_empty() {
                return AdminResponse::error("password must not be empty");
            }
            match storage.get_user(&id) {
                Ok(Some(_)) => return AdminResponse::error(format!("user {id} already exists")),
                Ok(None) => {}
                Err(e) => return AdminResponse::error(e),
            }
            let user = UserProfile::new(id, handle, name);
            match storage
                .put_user(&user)
                .and_then(|()| storage.set_password(&user.id, &password))
            {
                Ok(()) => {
                    tracing::info!("Added user {} (@{})", user.id, user.handle);
                    AdminResponse::Ok {
                        message: format!("Added user: {}", user.id),
                    }
                }
                Err(e) => AdminResponse::error(e),
            }
        }

        AdminCommand::SetPassword { user_id, password } => {
            match storage.set_password(&user_id, &password) {
                Ok(()) => {
                    tracing::info!("Changed password for {}", user_id);
                    AdminResponse::Ok {
                        message: format!("Changed password for {}", user_id),
                    }
                }
                Err(e) => AdminResponse::error(e),
            }
        }

        AdminCommand::ListUsers => match storage.list_users() {
            Ok(users) => AdminResponse::List {
                items: users
                    .iter()
                    .map(|u| {
                        let sharing = if u.share_location { "sharing" } else { "hidden" };
                        format!("{} @{} {} ({})", u.id, u.handle, u.name, sharing)
                    })
                    .collect(),
            },
            Err(e) => AdminResponse::error(e),
        },

        AdminCommand::SetSharing { user_id, share } => match nearby.set_sharing(&user_id, share) {
            Ok(_) => {
                tracing::info!("Set sharing for {} to {}", user_id, share);
                AdminResponse::Ok {
                    message: format!("Sharing for {} is now {}", user_id, share),
                }
            }
            Err(e) => AdminResponse::error(e),
        },

        AdminCommand::ForgetLocation { user_id } => {
            if nearby.forget_location(&user_id) {
                tracing::info!("Forgot location of {}", user_id);
                AdminResponse::Ok {
                    message: format!("Forgot location of {}", user_id),
                }
            } else {
                AdminResponse::error(format!("no location stored for {user_id}"))
            }
        }

        AdminCommand::Prune => AdminResponse::Count {
            value: nearby.prune_stale(now_millis()),
        },

        AdminCommand::Stats => match storage.list_users() {
            Ok(users) => AdminResponse::Stats {
                users: users.len(),
                locations: nearby.location_count(),
            },
            Err(e) => AdminResponse::error(e),
        },
    }
}

/// Default socket path.
pub fn default_socket_path() -> PathBuf {
    let data_dir = std::env::var("PEEPIN_DATA_DIR").unwrap_or_else(|_| "./peepin-data".to_string());
    Path::new(&data_dir).join("admin.sock")
}
