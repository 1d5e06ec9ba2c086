//! Authentication: password credentials and bearer tokens.
//!
//! Passwords are stored as Argon2id PHC strings. Tokens are `<user id>.<mac>`
//! where the MAC is a keyed BLAKE3 hash of the user id under the node secret.
//! Tokens do not expire.

use crate::error::{Error, Result};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::http::{header, HeaderMap};

/// Hash `password` into a PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::encode_b64(&rand::random::<[u8; 16]>())
        .map_err(|e| Error::Credential(e.to_string()))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::Credential(e.to_string()))?;
    Ok(hash.to_string())
}

/// Check `password` against a stored PHC string.
pub fn verify_password(password: &str, phc: &str) -> Result<bool> {
    let parsed = PasswordHash::new(phc).map_err(|e| Error::Credential(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Context string for deriving the MAC key from a configured secret.
const KEY_CONTEXT: &str = "peepin-node 2024-01-01 bearer token mac";

/// Issues and verifies bearer tokens.
#[derive(Clone)]
pub struct TokenSigner {
    key: [u8; 32],
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner").finish_non_exhaustive()
    }
}

impl TokenSigner {
    /// Signer keyed from a configured secret.
    pub fn from_secret(secret: &str) -> Self {
        Self {
            key: blake3::derive_key(KEY_CONTEXT, secret.as_bytes()),
        }
    }

    /// Signer with a fresh random key. Tokens die with the process.
    pub fn random() -> Self {
        Self {
            key: rand::random(),
        }
    }

    fn mac(&self, user_id: &str) -> blake3::Hash {
        blake3::keyed_hash(&self.key, user_id.as_bytes())
    }

    /// Issue a token for `user_id`.
    pub fn issue(&self, user_id: &str) -> String {
        format!("{}.{}", user_id, hex::encode(self.mac(user_id).as_bytes()))
    }

    /// Verify a token and return the user id it was issued for.
    pub fn verify(&self, token: &str) -> Result<String> {
        let invalid = || Error::Unauthorized("invalid token".into());

        let (user_id, mac_hex) = token.rsplit_once('.').ok_or_else(invalid)?;
        if user_id.is_empty() {
            return Err(invalid());
        }
        let bytes: [u8; 32] = hex::decode(mac_hex)
            .map_err(|_| invalid())?
            .try_into()
            .map_err(|_| invalid())?;

        // blake3::Hash equality is constant-time.
        if blake3::Hash::from(bytes) == self.mac(user_id) {
            Ok(user_id.to_string())
        } else {
            Err(invalid())
        }
    }

    /// Authenticate a request from its `Authorization: Bearer` header.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<String> {
        let value = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| Error::Unauthorized("missing bearer token".into()))?;
        let token = value
            .strip_prefix("Bearer ")
            .ok_or_else(|| Error::Unauthorized("missing bearer token".into()))?;
        self.verify(token.trim())
    }
}
