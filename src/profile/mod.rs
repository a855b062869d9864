pub mod codec;
pub mod firestore;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::AdminAccount;
use crate::error::BootstrapError;

pub use firestore::FirestoreProfiles;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserType {
    Admin,
    Student,
    Coordinator,
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
}

/// Profile document for an administrator, keyed by uid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdministratorProfile {
    pub uid: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub user_type: UserType,
    pub role: String,
    pub active: bool,
    pub verification_status: VerificationStatus,
    /// Omitted from the write when the document already has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    pub updated_at: String,
}

impl AdministratorProfile {
    pub fn new(uid: &str, account: &AdminAccount, now: DateTime<Utc>) -> Self {
        let stamp = now.to_rfc3339_opts(SecondsFormat::Millis, true);
        Self {
            uid: uid.to_string(),
            email: account.email.clone(),
            first_name: account.first_name.clone(),
            last_name: account.last_name.clone(),
            user_type: UserType::Admin,
            role: "admin".to_string(),
            active: true,
            verification_status: VerificationStatus::Verified,
            created_at: Some(stamp.clone()),
            updated_at: stamp,
        }
    }

    /// Keep an existing `createdAt` by leaving it out of the merge.
    pub fn preserving_created_at(mut self, existing: Option<&Map<String, Value>>) -> Self {
        if existing.is_some_and(|doc| doc.contains_key("createdAt")) {
            self.created_at = None;
        }
        self
    }

    pub fn to_fields(&self) -> Result<Map<String, Value>, BootstrapError> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            _ => unreachable!("struct serializes to an object"),
        }
    }
}

/// Structured profile records keyed by uid.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Merge-write: fields present in `fields` are set, all others kept.
    async fn upsert_profile(&self, uid: &str, fields: &Map<String, Value>) -> Result<(), BootstrapError>;

    async fn fetch_profile(&self, uid: &str) -> Result<Option<Map<String, Value>>, BootstrapError>;
}
