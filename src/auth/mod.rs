use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::credentials::ServiceAccount;
use crate::error::BootstrapError;

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Scopes needed for user management and Firestore writes.
pub const ADMIN_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/cloud-platform",
    "https://www.googleapis.com/auth/firebase",
    "https://www.googleapis.com/auth/identitytoolkit",
    "https://www.googleapis.com/auth/userinfo.email",
];

/// Assertions may live at most one hour.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Refresh cached access tokens this long before they expire.
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Serialize, Deserialize)]
pub struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

impl AssertionClaims {
    pub fn new(account: &ServiceAccount, now: DateTime<Utc>) -> Self {
        Self {
            iss: account.client_email.clone(),
            scope: ADMIN_SCOPES.join(" "),
            aud: account.token_uri.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(ASSERTION_LIFETIME_SECS)).timestamp(),
        }
    }
}

/// Sign the OAuth2 JWT-bearer assertion with the service-account key.
pub fn sign_assertion(account: &ServiceAccount, now: DateTime<Utc>) -> Result<String, BootstrapError> {
    let encoding_key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())?;

    let mut header = Header::new(Algorithm::RS256);
    header.kid = account.private_key_id.clone();

    let token = encode(&header, &AssertionClaims::new(account, now), &encoding_key)?;
    Ok(token)
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Exchanges service-account assertions for access tokens and caches the
/// result until shortly before expiry.
pub struct AccessTokenProvider {
    account: ServiceAccount,
    http: Client,
    cached: RwLock<Option<CachedToken>>,
}

impl AccessTokenProvider {
    pub fn new(account: ServiceAccount, http: Client) -> Self {
        Self {
            account,
            http,
            cached: RwLock::new(None),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.account.project_id
    }

    /// Current access token, fetching a fresh one when needed.
    pub async fn access_token(&self) -> Result<String, BootstrapError> {
        let now = Utc::now();

        // Fast path: read lock
        {
            let cached = self.cached.read().await;
            if let Some(token) = cached.as_ref() {
                if token.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > now {
                    return Ok(token.value.clone());
                }
            }
        }

        let fresh = self.exchange(now).await?;
        let value = fresh.value.clone();

        {
            let mut cached = self.cached.write().await;
            *cached = Some(fresh);
        }

        Ok(value)
    }

    async fn exchange(&self, now: DateTime<Utc>) -> Result<CachedToken, BootstrapError> {
        let assertion = sign_assertion(&self.account, now)?;
        debug!(token_uri = %self.account.token_uri, "Exchanging service account assertion");

        let response = self
            .http
            .post(&self.account.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<TokenErrorResponse>().await {
                Ok(body) => match body.error_description {
                    Some(desc) => format!("{}: {}", body.error, desc),
                    None => body.error,
                },
                Err(_) => format!("token endpoint returned {}", status),
            };
            return Err(BootstrapError::backend(status.as_u16(), message));
        }

        let body: TokenResponse = response.json().await?;
        info!(client_email = %self.account.client_email, "Obtained admin access token");

        Ok(CachedToken {
            value: body.access_token,
            expires_at: now + Duration::seconds(body.expires_in),
        })
    }
}
