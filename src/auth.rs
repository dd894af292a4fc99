// Login against a user store.
// Passwords are checked by a fixed, ordered list of verifier strategies.
// The list includes plaintext equality because existing accounts rely on
// it; it accepts any store that leaked or was seeded with raw passwords and
// must not be enabled for a production deployment.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("account is deactivated")]
    Deactivated,
    #[error("your account is registered as {actual}, but you selected {expected}")]
    RoleMismatch { expected: Role, actual: Role },
    #[error("user store: {0}")]
    Store(String),
}

impl From<std::io::Error> for AuthError {
    fn from(e: std::io::Error) -> Self {
        AuthError::Store(e.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(e: serde_json::Error) -> Self {
        AuthError::Store(e.to_string())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Educator,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Student => f.write_str("student"),
            Role::Educator => f.write_str("educator"),
        }
    }
}

/// A stored account as it appears in the user document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub role: Role,
    /// Stored credential: raw, bcrypt or SHA-256 hex.
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
}

/// The signed-in user handed to the rest of the app.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub username: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    pub token: String,
}

impl Profile {
    fn from_record(user: &UserRecord, now: DateTime<Utc>) -> Self {
        let (school, course, classes) = match user.role {
            Role::Student => (user.school.clone(), user.course.clone(), Vec::new()),
            Role::Educator => (None, None, user.classes.clone()),
        };
        Self {
            id: user.id.clone(),
            full_name: user.full_name.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
            role: user.role,
            school,
            course,
            classes,
            token: session_token(&user.id, now),
        }
    }

    pub fn load(path: &Path) -> Result<Self, AuthError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), AuthError> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

fn sha256_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

fn session_token(user_id: &str, now: DateTime<Utc>) -> String {
    sha256_hex(&format!("{user_id}{}", now.timestamp_micros()))
}

pub trait PasswordVerifier: Send + Sync {
    fn name(&self) -> &'static str;
    fn verify(&self, password: &str, stored: &str) -> bool;
}

pub struct Plaintext;

impl PasswordVerifier for Plaintext {
    fn name(&self) -> &'static str {
        "plaintext"
    }

    fn verify(&self, password: &str, stored: &str) -> bool {
        password == stored
    }
}

pub struct Bcrypt;

impl PasswordVerifier for Bcrypt {
    fn name(&self) -> &'static str {
        "bcrypt"
    }

    fn verify(&self, password: &str, stored: &str) -> bool {
        if !stored.starts_with("$2") {
            return false;
        }
        bcrypt::verify(password, stored).unwrap_or_else(|e| {
            tracing::warn!("bcrypt check failed: {e}");
            false
        })
    }
}

pub struct Sha256Hex;

impl PasswordVerifier for Sha256Hex {
    fn name(&self) -> &'static str {
        "sha256"
    }

    fn verify(&self, password: &str, stored: &str) -> bool {
        stored.len() == 64 && sha256_hex(password).eq_ignore_ascii_case(stored)
    }
}

/// Strategies in the order they are tried.
pub fn default_verifiers() -> Vec<Box<dyn PasswordVerifier>> {
    vec![Box::new(Plaintext), Box::new(Bcrypt), Box::new(Sha256Hex)]
}

pub trait UserStore {
    /// `email` is already normalized.
    fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError>;
    fn record_login(&mut self, id: &str, at: DateTime<Utc>) -> Result<(), AuthError>;
}

/// Users kept as a JSON array in one file.
pub struct JsonUserStore {
    path: PathBuf,
    users: Vec<UserRecord>,
}

impl JsonUserStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AuthError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)?;
        let users = serde_json::from_str(&content)?;
        Ok(Self { path, users })
    }

    pub fn users(&self) -> &[UserRecord] {
        &self.users
    }
}

impl UserStore for JsonUserStore {
    fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError> {
        Ok(self.users.iter().find(|u| u.email.trim().eq_ignore_ascii_case(email)).cloned())
    }

    fn record_login(&mut self, id: &str, at: DateTime<Utc>) -> Result<(), AuthError> {
        if let Some(u) = self.users.iter_mut().find(|u| u.id == id) {
            u.last_login = Some(at);
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&self.users)?)?;
        Ok(())
    }
}

pub struct Authenticator<S> {
    store: S,
    verifiers: Vec<Box<dyn PasswordVerifier>>,
}

impl<S: UserStore> Authenticator<S> {
    pub fn new(store: S) -> Self {
        Self { store, verifiers: default_verifiers() }
    }

    pub fn with_verifiers(store: S, verifiers: Vec<Box<dyn PasswordVerifier>>) -> Self {
        Self { store, verifiers }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Check the credentials and the role the user picked. Unknown users and
    /// wrong passwords are indistinguishable to the caller.
    pub fn authenticate(&mut self, email: &str, password: &str, expected_role: Role) -> Result<Profile, AuthError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return Err(AuthError::MissingField("email"));
        }
        if password.is_empty() {
            return Err(AuthError::MissingField("password"));
        }

        let Some(user) = self.store.find_by_email(&email)? else {
            tracing::info!(%email, "login rejected: unknown user");
            return Err(AuthError::InvalidCredentials);
        };
        if user.is_active == Some(false) {
            return Err(AuthError::Deactivated);
        }

        let Some(verifier) = self.verifiers.iter().find(|v| v.verify(password, &user.password)) else {
            tracing::info!(%email, "login rejected: password mismatch");
            return Err(AuthError::InvalidCredentials);
        };
        tracing::debug!(%email, scheme = verifier.name(), "password accepted");

        if user.role != expected_role {
            return Err(AuthError::RoleMismatch { expected: expected_role, actual: user.role });
        }

        let now = Utc::now();
        if let Err(e) = self.store.record_login(&user.id, now) {
            tracing::warn!("could not record last login: {e}");
        }
        tracing::info!(%email, role = %user.role, "login succeeded");
        Ok(Profile::from_record(&user, now))
    }
}
