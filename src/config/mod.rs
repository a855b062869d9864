use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const DEFAULT_CREDENTIALS_PATH: &str = "firebase-service-account.json";
pub const DEFAULT_IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com";
pub const DEFAULT_FIRESTORE_URL: &str = "https://firestore.googleapis.com";
pub const DEFAULT_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

/// Value shipped in copied `.env` templates; treated as "not configured".
const API_KEY_PLACEHOLDER: &str = "YOUR_FIREBASE_WEB_API_KEY";

/// Minimum password length accepted by the identity provider.
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing configuration: {0} is not set")]
    Missing(&'static str),

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    pub credentials_path: PathBuf,
    pub project_id: Option<String>,
    pub admin: AdminSettings,
    pub api_key: Option<String>,
    pub target_uid: Option<String>,
    pub profile_collection: String,
    pub endpoints: EndpointConfig,
    pub http_timeout_secs: u64,
}

#[derive(Clone)]
pub struct AdminSettings {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: String,
    pub last_name: String,
}

impl std::fmt::Debug for AdminSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSettings")
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct EndpointConfig {
    pub identity_toolkit: String,
    pub firestore: String,
    pub jwks: String,
}

/// Validated administrator identity used by create-admin and fetch-token.
#[derive(Clone)]
pub struct AdminAccount {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl std::fmt::Debug for AdminAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminAccount")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish()
    }
}

impl AdminAccount {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl BootstrapConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::defaults().with_overrides(|key| lookup(key).filter(|v| !v.trim().is_empty()))
    }

    pub fn from_map(vars: &HashMap<&str, &str>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
    }

    fn defaults() -> Self {
        Self {
            credentials_path: PathBuf::from(DEFAULT_CREDENTIALS_PATH),
            project_id: None,
            admin: AdminSettings {
                email: None,
                password: None,
                first_name: "Admin".to_string(),
                last_name: "User".to_string(),
            },
            api_key: None,
            target_uid: None,
            profile_collection: "users".to_string(),
            endpoints: EndpointConfig {
                identity_toolkit: DEFAULT_IDENTITY_TOOLKIT_URL.to_string(),
                firestore: DEFAULT_FIRESTORE_URL.to_string(),
                jwks: DEFAULT_JWKS_URL.to_string(),
            },
            http_timeout_secs: 30,
        }
    }

    fn with_overrides<F>(mut self, var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Credentials
        if let Some(v) = var("GOOGLE_APPLICATION_CREDENTIALS") {
            self.credentials_path = PathBuf::from(v);
        }
        if let Some(v) = var("FIREBASE_PROJECT_ID") {
            self.project_id = Some(v);
        }

        // Administrator account
        self.admin.email = var("ADMIN_EMAIL").or(self.admin.email);
        self.admin.password = var("ADMIN_PASSWORD").or(self.admin.password);
        if let Some(v) = var("ADMIN_FIRST_NAME") {
            self.admin.first_name = v;
        }
        if let Some(v) = var("ADMIN_LAST_NAME") {
            self.admin.last_name = v;
        }

        self.api_key = var("FIREBASE_API_KEY").or(self.api_key);
        self.target_uid = var("ADMIN_TARGET_UID").or(self.target_uid);

        if let Some(v) = var("PROFILE_COLLECTION") {
            if v.contains('/') {
                return Err(ConfigError::Invalid {
                    var: "PROFILE_COLLECTION",
                    reason: "collection id must not contain '/'".to_string(),
                });
            }
            self.profile_collection = v;
        }

        // Endpoint overrides
        if let Some(v) = var("IDENTITY_TOOLKIT_URL") {
            self.endpoints.identity_toolkit = validate_url("IDENTITY_TOOLKIT_URL", &v)?;
        }
        if let Some(v) = var("FIRESTORE_URL") {
            self.endpoints.firestore = validate_url("FIRESTORE_URL", &v)?;
        }
        if let Some(v) = var("SECURETOKEN_JWKS_URL") {
            self.endpoints.jwks = validate_url("SECURETOKEN_JWKS_URL", &v)?;
        }

        if let Some(v) = var("HTTP_TIMEOUT_SECS") {
            self.http_timeout_secs = match v.parse::<u64>() {
                Ok(0) => {
                    return Err(ConfigError::Invalid {
                        var: "HTTP_TIMEOUT_SECS",
                        reason: "timeout must be at least 1 second".to_string(),
                    })
                }
                Ok(secs) => secs,
                Err(_) => {
                    return Err(ConfigError::Invalid {
                        var: "HTTP_TIMEOUT_SECS",
                        reason: format!("'{}' is not a whole number of seconds", v),
                    })
                }
            };
        }

        Ok(self)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Administrator email/password, validated. Needed by create-admin and
    /// fetch-token.
    pub fn admin_account(&self) -> Result<AdminAccount, ConfigError> {
        let email = self.admin.email.clone().ok_or(ConfigError::Missing("ADMIN_EMAIL"))?;
        let password = self.admin.password.clone().ok_or(ConfigError::Missing("ADMIN_PASSWORD"))?;

        if !looks_like_email(&email) {
            return Err(ConfigError::Invalid {
                var: "ADMIN_EMAIL",
                reason: format!("'{}' is not an email address", email),
            });
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ConfigError::Invalid {
                var: "ADMIN_PASSWORD",
                reason: format!("must be at least {} characters", MIN_PASSWORD_LEN),
            });
        }

        Ok(AdminAccount {
            email,
            password,
            first_name: self.admin.first_name.clone(),
            last_name: self.admin.last_name.clone(),
        })
    }

    /// Web API key for the password sign-in endpoint.
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        match self.api_key.as_deref() {
            None => Err(ConfigError::Missing("FIREBASE_API_KEY")),
            Some(API_KEY_PLACEHOLDER) => Err(ConfigError::Invalid {
                var: "FIREBASE_API_KEY",
                reason: "still set to the placeholder; copy the Web API Key from \
                         Firebase Console > Project Settings > General"
                    .to_string(),
            }),
            Some(key) => Ok(key),
        }
    }

    /// Target uid for set-claims, preferring an explicit argument.
    pub fn target_uid(&self, explicit: Option<String>) -> Result<String, ConfigError> {
        explicit
            .filter(|uid| !uid.trim().is_empty())
            .or_else(|| self.target_uid.clone())
            .ok_or(ConfigError::Missing("ADMIN_TARGET_UID"))
    }
}

fn validate_url(var: &'static str, raw: &str) -> Result<String, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::Invalid {
        var,
        reason: format!("'{}' is not a valid URL: {}", raw, e),
    })?;

    match url.scheme() {
        "https" | "http" => {}
        other => {
            return Err(ConfigError::Invalid {
                var,
                reason: format!("unsupported scheme '{}'", other),
            })
        }
    }

    Ok(raw.trim_end_matches('/').to_string())
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}
