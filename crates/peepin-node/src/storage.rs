//! Persistent profile storage using RocksDB.
//!
//! Live locations are not stored here; they only exist in memory inside the
//! proximity store.

use crate::auth::{hash_password, verify_password};
use crate::error::{Error, Result};
use crate::models::UserProfile;
use peepin_proximity::ProfileLookup;
use rocksdb::{Options, DB};
use std::path::Path;

/// Storage backend for node data.
pub struct Storage {
    db: DB,
}

impl Storage {
    /// Open or create storage at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path)?;
        Ok(Self { db })
    }

    /// Open existing storage read-only; every write fails.
    #[cfg(test)]
    pub(crate) fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = DB::open_for_read_only(&Options::default(), path, false)?;
        Ok(Self { db })
    }

    // --- Users ---

    /// Store a profile, keeping the handle index in step.
    ///
    /// Fails if the handle already belongs to a different user.
    pub fn put_user(&self, user: &UserProfile) -> Result<()> {
        if let Some(owner) = self.user_id_for_handle(&user.handle)? {
            if owner != user.id {
                return Err(Error::InvalidInput(format!(
                    "handle {} already in use",
                    user.handle
                )));
            }
        }

        if let Some(previous) = self.get_user(&user.id)? {
            if previous.handle != user.handle {
                self.db.delete(handle_key(&previous.handle).as_bytes())?;
            }
        }

        let value = serde_json::to_vec(user)?;
        self.db.put(user_key(&user.id).as_bytes(), value)?;
        self.db
            .put(handle_key(&user.handle).as_bytes(), user.id.as_bytes())?;
        Ok(())
    }

    /// Get a profile by ID.
    pub fn get_user(&self, id: &str) -> Result<Option<UserProfile>> {
        match self.db.get(user_key(id).as_bytes())? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    /// Get a profile by handle.
    pub fn get_user_by_handle(&self, handle: &str) -> Result<Option<UserProfile>> {
        match self.user_id_for_handle(handle)? {
            Some(id) => self.get_user(&id),
            None => Ok(None),
        }
    }

    fn user_id_for_handle(&self, handle: &str) -> Result<Option<String>> {
        Ok(self
            .db
            .get(handle_key(handle).as_bytes())?
            .map(|id| String::from_utf8_lossy(&id).into_owned()))
    }

    /// List all profiles.
    pub fn list_users(&self) -> Result<Vec<UserProfile>> {
        let prefix = b"user:";
        let mut users = Vec::new();

        let iter = self.db.prefix_iterator(prefix);
        for item in iter {
            let (key, value) = item?;
            if key.starts_with(prefix) {
                let user: UserProfile = serde_json::from_slice(&value)?;
                users.push(user);
            } else {
                break;
            }
        }

        Ok(users)
    }


    /// Set a user's location-sharing flag and return the updated profile.
    pub fn set_share_location(&self, id: &str, share: bool) -> Result<UserProfile> {
        let mut user = self
            .get_user(id)?
            .ok_or_else(|| Error::NotFound(format!("user {id}")))?;
        if user.share_location != share {
            user.share_location = share;
            self.put_user(&user)?;
        }
        Ok(user)
    }

    // --- Credentials ---

    /// Set a user's password.
    pub fn set_password(&self, id: &str, password: &str) -> Result<()> {
        if password.is_empty() {
            return Err(Error::InvalidInput("password must not be empty".into()));
        }
        if self.get_user(id)?.is_none() {
            return Err(Error::NotFound(format!("user {id}")));
        }
        let phc = hash_password(password)?;
        self.db.put(credential_key(id).as_bytes(), phc.as_bytes())?;
        Ok(())
    }

    /// Whether `password` matches the user's stored credential. Users
    /// without a credential never match.
    pub fn verify_password(&self, id: &str, password: &str) -> Result<bool> {
        match self.db.get(credential_key(id).as_bytes())? {
            Some(phc) => verify_password(password, &String::from_utf8_lossy(&phc)),
            None => Ok(false),
        }
    }

    /// Seed demo profiles, all sharing `password`, if no users exist yet.
    /// Returns how many were added.
    pub fn init_demo_users(&self, password: &str) -> Result<usize> {
        if !self.list_users()?.is_empty() {
            return Ok(0);
        }
        let phc = hash_password(password)?;
        let users = UserProfile::demo_users();
        for user in &users {
            self.put_user(user)?;
            self.db.put(credential_key(&user.id).as_bytes(), phc.as_bytes())?;
        }
        Ok(users.len())
    }
}

impl ProfileLookup for Storage {
    type Profile = UserProfile;

    fn lookup(&self, user_id: &str) -> Option<UserProfile> {
        match self.get_user(user_id) {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!("Skipping unreadable profile {}: {}", user_id, e);
                None
            }
        }
    }
}

fn user_key(id: &str) -> String {
    format!("user:{}", id)
}

fn handle_key(handle: &str) -> String {
    format!("handle:{}", handle)
}

fn credential_key(id: &str) -> String {
    format!("credential:{}", id)
}
