pub mod firebase;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::error::BootstrapError;

pub use firebase::FirebaseAuth;

/// Custom claims attached to an identity record and embedded in ID tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomClaims {
    pub admin: bool,
    pub role: String,
}

impl CustomClaims {
    pub fn admin() -> Self {
        Self {
            admin: true,
            role: "admin".to_string(),
        }
    }
}

/// Account fields sent when creating a user.
#[derive(Clone)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub email_verified: bool,
}

impl std::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("display_name", &self.display_name)
            .field("email_verified", &self.email_verified)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub email_verified: bool,
    pub disabled: bool,
    pub custom_claims: Option<Map<String, Value>>,
}

/// Result of a password sign-in.
#[derive(Debug, Clone)]
pub struct SignInResult {
    pub id_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    pub uid: String,
}

/// Verified ID-token payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedToken {
    #[serde(rename = "sub")]
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: Option<bool>,
    pub iat: i64,
    pub exp: i64,
    #[serde(default)]
    pub auth_time: Option<i64>,
    #[serde(default)]
    pub admin: Option<bool>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl DecodedToken {
    pub fn is_admin(&self) -> bool {
        self.admin.unwrap_or(false)
    }
}

/// Administrative user management plus password sign-in.
#[async_trait]
pub trait IdentityBackend: Send + Sync {
    /// Create a user. Fails with `UserAlreadyExists` if the email is taken.
    async fn create_user(&self, user: &NewUser) -> Result<UserRecord, BootstrapError>;

    async fn get_user_by_email(&self, email: &str) -> Result<UserRecord, BootstrapError>;

    /// Replace the user's custom claims.
    async fn set_custom_claims(&self, uid: &str, claims: &CustomClaims) -> Result<(), BootstrapError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<SignInResult, BootstrapError>;

    async fn verify_token(&self, token: &str) -> Result<DecodedToken, BootstrapError>;
}

/// Create the user, or fetch the existing record when the email is already
/// registered. Returns the record and whether it was newly created.
pub async fn create_or_fetch_user(
    backend: &dyn IdentityBackend,
    user: &NewUser,
) -> Result<(UserRecord, bool), BootstrapError> {
    match backend.create_user(user).await {
        Ok(record) => {
            info!(uid = %record.uid, "Auth user created");
            Ok((record, true))
        }
        Err(e) if e.is_already_exists() => {
            warn!(email = %user.email, "User already exists, fetching existing user");
            let record = backend.get_user_by_email(&user.email).await?;
            info!(uid = %record.uid, "Found existing user");
            Ok((record, false))
        }
        Err(e) => Err(e),
    }
}
