// Cloud Firestore document store over the REST API

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};
use url::Url;

use crate::auth::AccessTokenProvider;
use crate::config::{ConfigError, EndpointConfig};
use crate::error::BootstrapError;
use crate::profile::codec::{decode_fields, encode_fields};
use crate::profile::ProfileStore;

#[derive(Debug, Deserialize)]
struct Document {
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Profile documents stored in one Firestore collection of the default
/// database.
pub struct FirestoreProfiles {
    http: Client,
    tokens: Arc<AccessTokenProvider>,
    base_url: Url,
    project_id: String,
    collection: String,
}

impl FirestoreProfiles {
    pub fn new(
        http: Client,
        tokens: Arc<AccessTokenProvider>,
        project_id: String,
        collection: String,
        endpoints: &EndpointConfig,
    ) -> Result<Self, BootstrapError> {
        let base_url = Url::parse(&endpoints.firestore).map_err(|e| ConfigError::Invalid {
            var: "FIRESTORE_URL",
            reason: e.to_string(),
        })?;

        Ok(Self {
            http,
            tokens,
            base_url,
            project_id,
            collection,
        })
    }

    pub fn document_url(&self, uid: &str) -> Result<Url, BootstrapError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ConfigError::Invalid {
                var: "FIRESTORE_URL",
                reason: "URL cannot be used as a base".to_string(),
            })?
            .pop_if_empty()
            .extend([
                "v1",
                "projects",
                self.project_id.as_str(),
                "databases",
                "(default)",
                "documents",
                self.collection.as_str(),
                uid,
            ]);
        Ok(url)
    }
}

/// Field paths that are not plain identifiers must be backtick-quoted.
pub fn field_path(name: &str) -> String {
    let simple = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if simple {
        name.to_string()
    } else {
        format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

async fn error_from(response: Response) -> BootstrapError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorEnvelope>(&text) {
        Ok(envelope) if !envelope.error.message.is_empty() => envelope.error.message,
        _ if text.is_empty() => status.to_string(),
        _ => text,
    };
    BootstrapError::backend(status.as_u16(), message)
}

#[async_trait]
impl ProfileStore for FirestoreProfiles {
    async fn upsert_profile(&self, uid: &str, fields: &Map<String, Value>) -> Result<(), BootstrapError> {
        let token = self.tokens.access_token().await?;
        let url = self.document_url(uid)?;

        let mask: Vec<(&str, String)> = fields
            .keys()
            .map(|name| ("updateMask.fieldPaths", field_path(name)))
            .collect();

        debug!(%url, fields = fields.len(), "Firestore merge write");

        let response = self
            .http
            .patch(url)
            .bearer_auth(token)
            .query(&mask)
            .json(&json!({ "fields": encode_fields(fields) }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from(response).await);
        }

        info!(%uid, collection = %self.collection, "Profile document written");
        Ok(())
    }

    async fn fetch_profile(&self, uid: &str) -> Result<Option<Map<String, Value>>, BootstrapError> {
        let token = self.tokens.access_token().await?;
        let url = self.document_url(uid)?;

        let response = self.http.get(url).bearer_auth(token).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => {
                let doc: Document = response.json().await?;
                Ok(Some(decode_fields(&doc.fields)))
            }
            _ => Err(error_from(response).await),
        }
    }
}
