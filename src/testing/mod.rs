use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::BootstrapError;
use crate::identity::{CustomClaims, DecodedToken, IdentityBackend, NewUser, SignInResult, UserRecord};
use crate::profile::ProfileStore;

struct StoredUser {
    record: UserRecord,
    password_hash: String,
}

#[derive(Default)]
struct State {
    users: HashMap<String, StoredUser>,
    profiles: HashMap<String, Map<String, Value>>,
    issued_tokens: usize,
    fail_next_create: Option<BootstrapError>,
}

/// In-process identity backend and profile store for orchestrator tests.
///
/// Tokens are HS256-signed with a per-instance secret and carry the user's
/// custom claims at the top level, like provider ID tokens do.
pub struct MemoryBackend {
    state: Mutex<State>,
    secret: Vec<u8>,
    token_ttl: Duration,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            secret: Uuid::new_v4().as_bytes().to_vec(),
            token_ttl: Duration::hours(1),
        }
    }

    /// Lifetime of issued tokens; negative values issue already-expired ones.
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Insert a plain (non-admin) user and return its uid.
    pub fn seed_user(&self, email: &str, password: &str) -> String {
        let uid = generate_uid();
        let mut state = self.state.lock().unwrap();
        state.users.insert(
            uid.clone(),
            StoredUser {
                record: UserRecord {
                    uid: uid.clone(),
                    email: Some(email.to_string()),
                    display_name: None,
                    email_verified: false,
                    disabled: false,
                    custom_claims: None,
                },
                password_hash: hash_password(password),
            },
        );
        uid
    }

    pub fn fail_next_create(&self, error: BootstrapError) {
        self.state.lock().unwrap().fail_next_create = Some(error);
    }

    pub fn user(&self, uid: &str) -> Option<UserRecord> {
        self.state.lock().unwrap().users.get(uid).map(|u| u.record.clone())
    }

    pub fn user_count(&self) -> usize {
        self.state.lock().unwrap().users.len()
    }

    pub fn profile(&self, uid: &str) -> Option<Map<String, Value>> {
        self.state.lock().unwrap().profiles.get(uid).cloned()
    }

    pub fn profile_count(&self) -> usize {
        self.state.lock().unwrap().profiles.len()
    }

    /// Simulate another writer touching the profile document.
    pub fn patch_profile(&self, uid: &str, field: &str, value: Value) {
        let mut state = self.state.lock().unwrap();
        state
            .profiles
            .entry(uid.to_string())
            .or_default()
            .insert(field.to_string(), value);
    }

    pub fn issued_tokens(&self) -> usize {
        self.state.lock().unwrap().issued_tokens
    }

    fn find_by_email<'a>(state: &'a State, email: &str) -> Option<&'a StoredUser> {
        state
            .users
            .values()
            .find(|u| u.record.email.as_deref() == Some(email))
    }

    fn mint_token(&self, record: &UserRecord) -> Result<String, BootstrapError> {
        let now = Utc::now();
        let mut claims = json!({
            "sub": record.uid,
            "email": record.email,
            "email_verified": record.email_verified,
            "iat": now.timestamp(),
            "auth_time": now.timestamp(),
            "exp": (now + self.token_ttl).timestamp(),
        });

        if let (Some(custom), Some(obj)) = (&record.custom_claims, claims.as_object_mut()) {
            for (k, v) in custom {
                obj.insert(k.clone(), v.clone());
            }
        }

        Ok(encode(&Header::default(), &claims, &EncodingKey::from_secret(&self.secret))?)
    }
}

fn generate_uid() -> String {
    Uuid::new_v4().simple().to_string()[..28].to_string()
}

fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[async_trait]
impl IdentityBackend for MemoryBackend {
    async fn create_user(&self, user: &NewUser) -> Result<UserRecord, BootstrapError> {
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.fail_next_create.take() {
            return Err(err);
        }
        if Self::find_by_email(&state, &user.email).is_some() {
            return Err(BootstrapError::UserAlreadyExists(user.email.clone()));
        }

        let record = UserRecord {
            uid: generate_uid(),
            email: Some(user.email.clone()),
            display_name: Some(user.display_name.clone()),
            email_verified: user.email_verified,
            disabled: false,
            custom_claims: None,
        };
        state.users.insert(
            record.uid.clone(),
            StoredUser {
                record: record.clone(),
                password_hash: hash_password(&user.password),
            },
        );
        Ok(record)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<UserRecord, BootstrapError> {
        let state = self.state.lock().unwrap();
        Self::find_by_email(&state, email)
            .map(|u| u.record.clone())
            .ok_or_else(|| BootstrapError::UserNotFound(email.to_string()))
    }

    async fn set_custom_claims(&self, uid: &str, claims: &CustomClaims) -> Result<(), BootstrapError> {
        let mut state = self.state.lock().unwrap();
        let user = state
            .users
            .get_mut(uid)
            .ok_or_else(|| BootstrapError::UserNotFound(uid.to_string()))?;

        match serde_json::to_value(claims)? {
            Value::Object(map) => user.record.custom_claims = Some(map),
            _ => unreachable!(),
        }
        Ok(())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<SignInResult, BootstrapError> {
        let record = {
            let state = self.state.lock().unwrap();
            match Self::find_by_email(&state, email) {
                Some(u) if u.password_hash == hash_password(password) => u.record.clone(),
                _ => return Err(BootstrapError::AuthenticationFailure("INVALID_LOGIN_CREDENTIALS".to_string())),
            }
        };

        let id_token = self.mint_token(&record)?;
        self.state.lock().unwrap().issued_tokens += 1;

        Ok(SignInResult {
            id_token,
            refresh_token: None,
            expires_in: self.token_ttl.num_seconds(),
            uid: record.uid,
        })
    }

    async fn verify_token(&self, token: &str) -> Result<DecodedToken, BootstrapError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<DecodedToken>(token, &DecodingKey::from_secret(&self.secret), &validation)
            .map(|data| data.claims)
            .map_err(|e| BootstrapError::invalid_token(e.to_string()))
    }
}

#[async_trait]
impl ProfileStore for MemoryBackend {
    async fn upsert_profile(&self, uid: &str, fields: &Map<String, Value>) -> Result<(), BootstrapError> {
        let mut state = self.state.lock().unwrap();
        let doc = state.profiles.entry(uid.to_string()).or_default();
        for (k, v) in fields {
            doc.insert(k.clone(), v.clone());
        }
        Ok(())
    }

    async fn fetch_profile(&self, uid: &str) -> Result<Option<Map<String, Value>>, BootstrapError> {
        Ok(self.state.lock().unwrap().profiles.get(uid).cloned())
    }
}
