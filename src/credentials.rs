//! Service-account credential file.
//!
//! Loaded once at startup and never written. The private key signs the
//! OAuth2 assertion that authorizes every administrative call.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("Credential file not found: {0}")]
    NotFound(PathBuf),

    #[error("Cannot read credential file {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Credential file {path} is not valid JSON: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Credential file {path} is not a service account: {reason}")]
    WrongKind { path: PathBuf, reason: String },
}

#[derive(Clone, Deserialize)]
pub struct ServiceAccount {
    #[serde(rename = "type")]
    pub kind: String,
    pub project_id: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

impl std::fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("project_id", &self.project_id)
            .field("private_key_id", &self.private_key_id)
            .field("private_key", &"[REDACTED]")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceAccount {
    pub fn load(path: &Path) -> Result<Self, CredentialsError> {
        if !path.exists() {
            return Err(CredentialsError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|source| CredentialsError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_json(&content, path)
    }

    pub fn from_json(content: &str, path: &Path) -> Result<Self, CredentialsError> {
        let account: ServiceAccount =
            serde_json::from_str(content).map_err(|source| CredentialsError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;

        account.validate(path)?;
        Ok(account)
    }

    fn validate(&self, path: &Path) -> Result<(), CredentialsError> {
        let wrong = |reason: &str| CredentialsError::WrongKind {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };

        if self.kind != "service_account" {
            return Err(wrong(&format!("type is '{}', expected 'service_account'", self.kind)));
        }
        if self.project_id.trim().is_empty() {
            return Err(wrong("project_id is empty"));
        }
        if self.client_email.trim().is_empty() {
            return Err(wrong("client_email is empty"));
        }
        if !self.private_key.contains("PRIVATE KEY-----") {
            return Err(wrong("private_key is not a PEM private key"));
        }
        Ok(())
    }
}
