//! Collection Sync Client.
//!
//! Pushes generated collections to a remote collection host. Sync is always an explicit,
//! blocking action run after generation; an update replaces the remote collection wholesale
//! and never merges remote edits.

use crate::collection::Collection;
use crate::error::{Error, Result};
use log::{debug, info};
use reqwest::blocking::Client;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

/// Default base URL of the Postman API
pub const POSTMAN_API_URL: &str = "https://api.getpostman.com";

/// Entry of a collection listing, also returned by create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSummary {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub uid: String,
}

/// Remote host of collections.
pub trait CollectionHost {
    fn list(&self) -> Result<Vec<CollectionSummary>>;

    /// The remote document as stored by the host. Remote collections may use any item
    /// nesting, so the raw JSON is returned.
    fn get(&self, id: &str) -> Result<Value>;

    fn create(&self, collection: &Collection) -> Result<CollectionSummary>;

    /// Replaces the remote collection `id` with `collection`.
    fn update(&self, id: &str, collection: &Collection) -> Result<CollectionSummary>;

    fn remove(&self, id: &str) -> Result<()>;
}

/// Postman API client authenticated with an `X-Api-Key`.
#[derive(Debug, Clone)]
pub struct PostmanClient {
    http: Client,
    base_url: String,
    key: Option<String>,
}

#[derive(Deserialize)]
struct ListResponse {
    #[serde(default)]
    collections: Vec<CollectionSummary>,
}

#[derive(Deserialize)]
struct SummaryResponse {
    collection: CollectionSummary,
}

#[derive(Deserialize)]
struct DocumentResponse {
    collection: Value,
}

impl PostmanClient {
    /// A client for `base_url`. A missing or blank key is accepted here and reported by
    /// every operation.
    pub fn new(base_url: impl Into<String>, key: Option<String>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("postman-from-source/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            key,
        })
    }

    fn key(&self) -> Result<&str> {
        self.key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(Error::MissingCredential)
    }

    fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let key = self.key()?;
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);

        let mut request = self.http.request(method, &url).header("X-Api-Key", key);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send()?;
        let status = response.status();
        let text = response.text()?;

        if !status.is_success() {
            return Err(Error::Sync {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

impl CollectionHost for PostmanClient {
    fn list(&self) -> Result<Vec<CollectionSummary>> {
        let value = self.send(Method::GET, "/collections", None)?;
        let list: ListResponse = serde_json::from_value(value)?;
        Ok(list.collections)
    }

    fn get(&self, id: &str) -> Result<Value> {
        let value = self.send(Method::GET, &format!("/collections/{}", id), None)?;
        let document: DocumentResponse = serde_json::from_value(value)?;
        Ok(document.collection)
    }

    fn create(&self, collection: &Collection) -> Result<CollectionSummary> {
        let body = json!({ "collection": collection });
        let value = self.send(Method::POST, "/collections", Some(body))?;
        let created: SummaryResponse = serde_json::from_value(value)?;
        info!("Created collection {}", created.collection.id);
        Ok(created.collection)
    }

    fn update(&self, id: &str, collection: &Collection) -> Result<CollectionSummary> {
        let body = json!({ "collection": collection });
        let value = self.send(Method::PUT, &format!("/collections/{}", id), Some(body))?;
        let updated: SummaryResponse = serde_json::from_value(value)?;
        info!("Updated collection {}", updated.collection.id);
        Ok(updated.collection)
    }

    fn remove(&self, id: &str) -> Result<()> {
        self.send(Method::DELETE, &format!("/collections/{}", id), None)?;
        info!("Removed collection {}", id);
        Ok(())
    }
}

/// Message of a Postman error body (`{"error": {"name", "message"}}`), or the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            let error = value.get("error")?;
            let message = error.get("message").and_then(Value::as_str)?;
            match error.get("name").and_then(Value::as_str) {
                Some(name) => Some(format!("{}: {}", name, message)),
                None => Some(message.to_string()),
            }
        })
        .unwrap_or_else(|| body.trim().to_string())
}
