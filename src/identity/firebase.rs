// Firebase Authentication over the Identity Toolkit REST API

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::auth::AccessTokenProvider;
use crate::config::{ConfigError, EndpointConfig};
use crate::error::BootstrapError;
use crate::identity::{CustomClaims, DecodedToken, IdentityBackend, NewUser, SignInResult, UserRecord};

const TOKEN_ISSUER_PREFIX: &str = "https://securetoken.google.com/";

/// Error envelope returned by Google REST APIs.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountInfo {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    email_verified: bool,
    #[serde(default)]
    disabled: bool,
    #[serde(default)]
    custom_attributes: Option<String>,
}

impl From<AccountInfo> for UserRecord {
    fn from(info: AccountInfo) -> Self {
        let custom_claims = info.custom_attributes.as_deref().and_then(|raw| {
            match serde_json::from_str::<Map<String, Value>>(raw) {
                Ok(map) => Some(map),
                Err(e) => {
                    warn!(uid = %info.local_id, "Ignoring unparseable customAttributes: {}", e);
                    None
                }
            }
        });

        UserRecord {
            uid: info.local_id,
            email: info.email,
            display_name: info.display_name,
            email_verified: info.email_verified,
            disabled: info.disabled,
            custom_claims,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateAccountResponse {
    local_id: String,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<AccountInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    id_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<String>,
    local_id: String,
}

/// Firebase Authentication client.
///
/// Administrative calls carry the service-account access token; sign-in uses
/// the project's Web API key like any browser client would.
pub struct FirebaseAuth {
    http: Client,
    tokens: Arc<AccessTokenProvider>,
    project_id: String,
    base_url: String,
    jwks_url: String,
    api_key: Option<String>,
}

impl FirebaseAuth {
    pub fn new(http: Client, tokens: Arc<AccessTokenProvider>, project_id: String, endpoints: &EndpointConfig) -> Self {
        Self {
            http,
            tokens,
            project_id,
            base_url: endpoints.identity_toolkit.trim_end_matches('/').to_string(),
            jwks_url: endpoints.jwks.clone(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    fn project_url(&self, method: &str) -> String {
        format!("{}/v1/projects/{}/{}", self.base_url, self.project_id, method)
    }

    /// POST to a project-scoped admin endpoint.
    async fn admin_post<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &Value,
        subject: &str,
    ) -> Result<T, BootstrapError> {
        let token = self.tokens.access_token().await?;
        let url = self.project_url(method);
        debug!(%url, "Identity Toolkit admin request");

        let response = self.http.post(&url).bearer_auth(token).json(body).send().await?;
        read_json(response, subject).await
    }

    async fn fetch_signing_keys(&self) -> Result<JwkSet, BootstrapError> {
        let response = self.http.get(&self.jwks_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BootstrapError::backend(
                status.as_u16(),
                format!("failed to fetch token signing keys from {}", self.jwks_url),
            ));
        }
        Ok(response.json::<JwkSet>().await?)
    }
}

/// Decode a success body, or classify the provider's error envelope.
async fn read_json<T: DeserializeOwned>(response: Response, subject: &str) -> Result<T, BootstrapError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let text = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorEnvelope>(&text) {
        Ok(envelope) if !envelope.error.message.is_empty() => envelope.error.message,
        _ if text.is_empty() => status.to_string(),
        _ => text,
    };

    Err(BootstrapError::from_provider(status.as_u16(), message, subject))
}

#[async_trait]
impl IdentityBackend for FirebaseAuth {
    async fn create_user(&self, user: &NewUser) -> Result<UserRecord, BootstrapError> {
        let body = json!({
            "email": user.email,
            "password": user.password,
            "displayName": user.display_name,
            "emailVerified": user.email_verified,
        });

        let created: CreateAccountResponse = self.admin_post("accounts", &body, &user.email).await?;

        Ok(UserRecord {
            uid: created.local_id,
            email: Some(user.email.clone()),
            display_name: Some(user.display_name.clone()),
            email_verified: user.email_verified,
            disabled: false,
            custom_claims: None,
        })
    }

    async fn get_user_by_email(&self, email: &str) -> Result<UserRecord, BootstrapError> {
        let body = json!({ "email": [email] });
        let lookup: LookupResponse = self.admin_post("accounts:lookup", &body, email).await?;

        lookup
            .users
            .into_iter()
            .next()
            .map(UserRecord::from)
            .ok_or_else(|| BootstrapError::UserNotFound(email.to_string()))
    }

    async fn set_custom_claims(&self, uid: &str, claims: &CustomClaims) -> Result<(), BootstrapError> {
        let body = json!({
            "localId": uid,
            "customAttributes": serde_json::to_string(claims)?,
        });

        let _: Value = self.admin_post("accounts:update", &body, uid).await?;
        info!(%uid, admin = claims.admin, role = %claims.role, "Custom claims set");
        Ok(())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<SignInResult, BootstrapError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ConfigError::Missing("FIREBASE_API_KEY"))?;

        let url = format!("{}/v1/accounts:signInWithPassword", self.base_url);
        let response = self
            .http
            .post(&url)
            .query(&[("key", api_key)])
            .json(&json!({
                "email": email,
                "password": password,
                "returnSecureToken": true,
            }))
            .send()
            .await?;

        let body: SignInResponse = read_json(response, email).await?;
        let expires_in = body
            .expires_in
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3600);

        Ok(SignInResult {
            id_token: body.id_token,
            refresh_token: body.refresh_token,
            expires_in,
            uid: body.local_id,
        })
    }

    async fn verify_token(&self, token: &str) -> Result<DecodedToken, BootstrapError> {
        let header = decode_header(token).map_err(|e| BootstrapError::invalid_token(format!("malformed header: {}", e)))?;

        if header.alg != Algorithm::RS256 {
            return Err(BootstrapError::invalid_token(format!(
                "unexpected algorithm {:?}, expected RS256",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| BootstrapError::invalid_token("missing 'kid' header"))?;

        let keys = self.fetch_signing_keys().await?;
        let jwk = keys
            .find(&kid)
            .ok_or_else(|| BootstrapError::invalid_token(format!("no signing key matches kid '{}'", kid)))?;
        let decoding_key = DecodingKey::from_jwk(jwk).map_err(|e| BootstrapError::invalid_token(e.to_string()))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.project_id.as_str()]);
        validation.set_issuer(&[format!("{}{}", TOKEN_ISSUER_PREFIX, self.project_id)]);
        validation.set_required_spec_claims(&["exp", "iat", "sub", "aud", "iss"]);
        // Rejected at `exp`, no clock tolerance
        validation.leeway = 0;

        let data = decode::<DecodedToken>(token, &decoding_key, &validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => BootstrapError::invalid_token("token has expired"),
            ErrorKind::InvalidAudience => BootstrapError::invalid_token("token was issued for another project"),
            ErrorKind::InvalidIssuer => BootstrapError::invalid_token("token has an unexpected issuer"),
            ErrorKind::InvalidSignature => BootstrapError::invalid_token("signature does not verify"),
            _ => BootstrapError::invalid_token(e.to_string()),
        })?;

        let claims = data.claims;
        if claims.uid.trim().is_empty() {
            return Err(BootstrapError::invalid_token("empty subject"));
        }
        if let Some(auth_time) = claims.auth_time {
            if auth_time > Utc::now().timestamp() {
                return Err(BootstrapError::invalid_token("auth_time is in the future"));
            }
        }

        Ok(claims)
    }
}
