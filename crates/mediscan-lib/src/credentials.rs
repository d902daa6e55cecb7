//! File-backed credential store
//!
//! Users live in a single JSON object keyed by normalized username:
//! `{"alice": {"password": "$pbkdf2-sha256$...", "email": "a@b.c"}}`.
//! Hashes use the passlib `pbkdf2_sha256` modular-crypt layout so stores
//! written by other tools keep verifying.

use crate::error::CredentialError;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// passlib's default round count for pbkdf2_sha256
pub const DEFAULT_ROUNDS: u32 = 29_000;

const HASH_SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;

pub const REGISTERED_MESSAGE: &str = "Registration successful! Please login.";
pub const LOGIN_MESSAGE: &str = "Login successful";

/// Stored user entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

type UserTable = BTreeMap<String, UserRecord>;

/// Username/password store persisted as JSON
#[derive(Debug)]
pub struct CredentialStore {
    path: PathBuf,
    rounds: u32,
    lock: Mutex<()>,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_rounds(path, DEFAULT_ROUNDS)
    }

    pub fn with_rounds(path: impl Into<PathBuf>, rounds: u32) -> Self {
        Self {
            path: path.into(),
            rounds: rounds.max(1),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check the backing file can be read; used by health checks
    pub fn check(&self) -> Result<usize, CredentialError> {
        let _guard = self.guard()?;
        self.read_table().map(|users| users.len())
    }

    pub fn register(
        &self,
        username: &str,
        password: &str,
        email: Option<&str>,
    ) -> Result<String, CredentialError> {
        let username = normalize(username);
        if username.is_empty() || password.is_empty() {
            return Err(CredentialError::EmptyCredentials);
        }
        let email = email.map(str::trim).filter(|e| !e.is_empty());
        if email.is_some_and(|e| !e.contains('@')) {
            return Err(CredentialError::InvalidEmail);
        }

        let _guard = self.guard()?;
        let mut users = self.read_table()?;
        if users.contains_key(&username) {
            return Err(CredentialError::UserExists);
        }

        users.insert(
            username.clone(),
            UserRecord {
                password: Some(hash_password(password, self.rounds)),
                email: email.map(String::from),
            },
        );
        self.write_table(&users)?;
        debug!(username = %username, "Stored new user");
        Ok(REGISTERED_MESSAGE.to_string())
    }

    pub fn verify(&self, username: &str, password: &str) -> Result<String, CredentialError> {
        let username = normalize(username);
        let record = {
            let _guard = self.guard()?;
            self.read_table()?.remove(&username)
        };

        let record = record.ok_or(CredentialError::InvalidCredentials)?;
        let stored = record
            .password
            .filter(|p| !p.is_empty())
            .ok_or(CredentialError::IncompleteRecord)?;

        if verify_password(password, &stored) {
            Ok(LOGIN_MESSAGE.to_string())
        } else {
            Err(CredentialError::InvalidCredentials)
        }
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>, CredentialError> {
        self.lock
            .lock()
            .map_err(|_| CredentialError::Storage("credential store lock poisoned".to_string()))
    }

    /// Missing or blank file reads as an empty store
    fn read_table(&self) -> Result<UserTable, CredentialError> {
        if !self.path.exists() {
            return Ok(UserTable::new());
        }
        let contents = fs::read_to_string(&self.path)
            .map_err(|e| storage_error(&self.path, "read", e))?;
        if contents.trim().is_empty() {
            return Ok(UserTable::new());
        }
        serde_json::from_str(&contents).map_err(|e| storage_error(&self.path, "parse", e))
    }

    fn write_table(&self, users: &UserTable) -> Result<(), CredentialError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| storage_error(parent, "create", e))?;
        }
        let json = serde_json::to_vec_pretty(users)
            .map_err(|e| storage_error(&self.path, "serialize", e))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| storage_error(&tmp, "write", e))?;
        fs::rename(&tmp, &self.path).map_err(|e| storage_error(&self.path, "replace", e))
    }
}

fn storage_error(path: &Path, action: &str, e: impl std::fmt::Display) -> CredentialError {
    warn!(path = %path.display(), action, error = %e, "Credential store I/O failed");
    CredentialError::Storage(format!("failed to {} {}: {}", action, path.display(), e))
}

fn normalize(username: &str) -> String {
    username.trim().to_lowercase()
}

/// passlib "adapted base64": standard alphabet, no padding, `.` for `+`
fn ab64_encode(bytes: &[u8]) -> String {
    STANDARD_NO_PAD.encode(bytes).replace('+', ".")
}

fn ab64_decode(text: &str) -> Option<Vec<u8>> {
    STANDARD_NO_PAD.decode(text.replace('.', "+")).ok()
}

fn derive(password: &str, salt: &[u8], rounds: u32) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, rounds, &mut key);
    key
}

/// Hash with a fresh random salt
pub fn hash_password(password: &str, rounds: u32) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    let key = derive(password, &salt, rounds);
    format!(
        "${}${}${}${}",
        HASH_SCHEME,
        rounds,
        ab64_encode(&salt),
        ab64_encode(&key)
    )
}

/// Check a password against a stored hash; malformed hashes never match
pub fn verify_password(password: &str, stored: &str) -> bool {
    let parts: Vec<&str> = stored.split('$').collect();
    let ["", scheme, rounds, salt, checksum] = parts.as_slice() else {
        warn!("Stored password hash is malformed");
        return false;
    };
    if *scheme != HASH_SCHEME {
        warn!(scheme = %scheme, "Unsupported password hash scheme");
        return false;
    }
    let (Ok(rounds), Some(salt), Some(expected)) =
        (rounds.parse::<u32>(), ab64_decode(salt), ab64_decode(checksum))
    else {
        warn!("Stored password hash is malformed");
        return false;
    };
    if rounds == 0 || expected.len() != KEY_LEN {
        return false;
    }

    let actual = derive(password, &salt, rounds);
    actual
        .iter()
        .zip(&expected)
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}
