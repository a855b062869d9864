//! Entry sequences for the three administrative commands.
//!
//! Each sequence runs its steps in order and stops at the first error;
//! nothing is retried.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde::Serialize;
use tracing::{info, warn};

use crate::auth::AccessTokenProvider;
use crate::config::{AdminAccount, BootstrapConfig};
use crate::credentials::ServiceAccount;
use crate::error::BootstrapError;
use crate::identity::{create_or_fetch_user, CustomClaims, FirebaseAuth, IdentityBackend, NewUser};
use crate::profile::{AdministratorProfile, FirestoreProfiles, ProfileStore};

/// Live Firebase clients sharing one HTTP client and access token.
pub struct Services {
    pub identity: FirebaseAuth,
    pub profiles: FirestoreProfiles,
}

impl Services {
    /// Load the credential file and build the clients. No network traffic
    /// happens until the first call.
    pub fn connect(config: &BootstrapConfig) -> Result<Self, BootstrapError> {
        let account = ServiceAccount::load(&config.credentials_path)?;
        let project_id = config
            .project_id
            .clone()
            .unwrap_or_else(|| account.project_id.clone());

        let http = Client::builder()
            .timeout(config.http_timeout())
            .user_agent(concat!("admin-bootstrap/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let tokens = Arc::new(AccessTokenProvider::new(account, http.clone()));

        let mut identity = FirebaseAuth::new(http.clone(), tokens.clone(), project_id.clone(), &config.endpoints);
        if let Some(key) = config.api_key.as_deref() {
            identity = identity.with_api_key(key);
        }

        let profiles = FirestoreProfiles::new(
            http,
            tokens,
            project_id.clone(),
            config.profile_collection.clone(),
            &config.endpoints,
        )?;

        info!(project = %project_id, "Firebase clients ready");
        Ok(Self { identity, profiles })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateAdminReport {
    pub uid: String,
    pub email: String,
    pub created: bool,
    pub claims: CustomClaims,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenReport {
    pub token: String,
    pub uid: String,
    pub email: Option<String>,
    pub admin: bool,
    pub role: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl TokenReport {
    pub fn missing_admin_claim(&self) -> bool {
        !self.admin
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClaimsReport {
    pub uid: String,
    pub claims: CustomClaims,
}

/// Create (or reuse) the administrator account, grant admin claims and
/// merge-write its profile document.
pub async fn create_admin(
    identity: &dyn IdentityBackend,
    profiles: &dyn ProfileStore,
    account: &AdminAccount,
) -> Result<CreateAdminReport, BootstrapError> {
    info!(email = %account.email, "Creating admin account");

    // Step 1: auth user
    let new_user = NewUser {
        email: account.email.clone(),
        password: account.password.clone(),
        display_name: account.display_name(),
        email_verified: true,
    };
    let (record, created) = create_or_fetch_user(identity, &new_user).await?;

    // Step 2: claims
    let claims = CustomClaims::admin();
    identity.set_custom_claims(&record.uid, &claims).await?;

    // Step 3: profile document
    let existing = profiles.fetch_profile(&record.uid).await?;
    let profile = AdministratorProfile::new(&record.uid, account, Utc::now()).preserving_created_at(existing.as_ref());
    profiles.upsert_profile(&record.uid, &profile.to_fields()?).await?;

    Ok(CreateAdminReport {
        uid: record.uid,
        email: account.email.clone(),
        created,
        claims,
    })
}

/// Sign in with the administrator's password and verify the resulting token.
pub async fn fetch_token(
    identity: &dyn IdentityBackend,
    email: &str,
    password: &str,
) -> Result<TokenReport, BootstrapError> {
    info!(%email, "Authenticating admin user");

    let session = identity.sign_in(email, password).await?;
    let decoded = identity.verify_token(&session.id_token).await?;

    let expires_at = Utc
        .timestamp_opt(decoded.exp, 0)
        .single()
        .ok_or_else(|| BootstrapError::invalid_token(format!("exp {} is out of range", decoded.exp)))?;

    let report = TokenReport {
        token: session.id_token,
        admin: decoded.is_admin(),
        uid: decoded.uid,
        email: decoded.email,
        role: decoded.role,
        expires_at,
    };

    if report.missing_admin_claim() {
        warn!(uid = %report.uid, "Token does not carry the admin claim");
    }

    Ok(report)
}

/// Grant admin claims to an existing uid.
pub async fn set_claims_only(identity: &dyn IdentityBackend, uid: &str) -> Result<ClaimsReport, BootstrapError> {
    let claims = CustomClaims::admin();
    identity.set_custom_claims(uid, &claims).await?;

    Ok(ClaimsReport {
        uid: uid.to_string(),
        claims,
    })
}
