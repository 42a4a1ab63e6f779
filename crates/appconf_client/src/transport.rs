//! Typed access to one store's `/kv/{key}` endpoint.
//!
//! A [`Transport`] is bound to a single endpoint and is safe to share
//! across threads. Every call builds the request URL from the endpoint, the
//! percent-encoded key, the wire spelling of the label and the API version,
//! stamps the user agent and credentials, and classifies the response:
//!
//! | status            | outcome                              |
//! |-------------------|--------------------------------------|
//! | 2xx               | decoded entry                        |
//! | 404 (GET)         | [`AppConfigError::NotFound`]         |
//! | 401 / 403 / 429   | `Unauthorized` / `Forbidden` / `Throttled` |
//! | anything else     | [`AppConfigError::UnexpectedStatus`] |

use crate::auth::Authorizer;
use crate::config::{ClientConfig, RetryPolicy};
use crate::http::{HttpClient, HttpRequest, HttpResponse, Method, ReqwestClient};
use appconf_core::wire::{KeyValueDocument, SetKeyValueBody};
use appconf_core::{
    feature_entry, feature_storage_key, AppConfigError, AppConfigResult, ContentType,
    FeatureEntry, KeyValueEntry, Label, Payload, CONTENT_TYPE_KEY_VALUE,
};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Client for a single App Configuration endpoint.
pub struct Transport {
    endpoint: String,
    client: Arc<dyn HttpClient>,
    authorizer: Arc<dyn Authorizer>,
    config: ClientConfig,
}

impl Transport {
    /// Creates a transport over an arbitrary HTTP client.
    pub fn new(
        endpoint: impl Into<String>,
        client: Arc<dyn HttpClient>,
        authorizer: Arc<dyn Authorizer>,
        config: ClientConfig,
    ) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        Self {
            endpoint,
            client,
            authorizer,
            config,
        }
    }

    /// Creates a transport that talks HTTP through `reqwest`.
    pub fn connect(
        endpoint: impl Into<String>,
        authorizer: Arc<dyn Authorizer>,
        config: ClientConfig,
    ) -> AppConfigResult<Self> {
        let client = ReqwestClient::new(&config)?;
        Ok(Self::new(endpoint, Arc::new(client), authorizer, config))
    }

    /// Returns the endpoint this transport is bound to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fetches the entry stored under `(label, key)`.
    pub fn get(&self, label: &Label, key: &str) -> AppConfigResult<KeyValueEntry> {
        let response = self.send(Method::Get, label, key, None)?;
        match response.status {
            404 => Err(AppConfigError::not_found(key)),
            _ if response.is_success() => decode_entry(&response),
            _ => Err(unexpected_status(response)),
        }
    }

    /// Like [`get`](Self::get), retrying per `policy`.
    ///
    /// Blocks the calling thread between attempts. The last error is
    /// returned once the attempts are exhausted.
    pub fn get_with_retry(
        &self,
        label: &Label,
        key: &str,
        policy: &RetryPolicy,
    ) -> AppConfigResult<KeyValueEntry> {
        let mut attempt = 0;
        loop {
            match self.get(label, key) {
                Err(err) if attempt + 1 < policy.max_attempts && policy.should_retry(&err) => {
                    attempt += 1;
                    let delay = policy.delay_for_attempt(attempt);
                    debug!(
                        "Retrying read of {} [{}] in {:?} (attempt {}/{}): {}",
                        key,
                        label,
                        delay,
                        attempt + 1,
                        policy.max_attempts,
                        err
                    );
                    std::thread::sleep(delay);
                }
                result => return result,
            }
        }
    }

    /// Creates or overwrites the entry under `(label, key)`.
    pub fn set(
        &self,
        label: &Label,
        key: &str,
        value: &str,
        content_type: &ContentType,
    ) -> AppConfigResult<KeyValueEntry> {
        let body = serde_json::to_vec(&SetKeyValueBody {
            value: value.to_string(),
            content_type: content_type.as_str().to_string(),
        })?;

        let response = self.send(Method::Put, label, key, Some(body))?;
        if response.is_success() {
            decode_entry(&response)
        } else {
            Err(unexpected_status(response))
        }
    }

    /// Encodes `payload` for the logical `key` and writes it.
    ///
    /// For feature flags `key` is the feature name; the storage prefix is
    /// added here.
    pub fn set_payload(
        &self,
        label: &Label,
        key: &str,
        payload: &Payload,
    ) -> AppConfigResult<KeyValueEntry> {
        let encoded = payload.encode(key)?;
        self.set(label, &encoded.key, &encoded.value, &encoded.content_type)
    }

    /// Deletes the entry under `(label, key)`.
    ///
    /// Returns `true` if an entry was removed and `false` if there was
    /// nothing to delete (204 or 404).
    pub fn delete(&self, label: &Label, key: &str) -> AppConfigResult<bool> {
        let response = self.send(Method::Delete, label, key, None)?;
        match response.status {
            204 | 404 => Ok(false),
            _ if response.is_success() => Ok(true),
            _ => Err(unexpected_status(response)),
        }
    }

    /// Fetches a feature flag by name.
    pub fn get_feature(&self, label: &Label, name: &str) -> AppConfigResult<FeatureEntry> {
        let entry = self.get(label, &feature_storage_key(name))?;
        feature_entry(&entry)
    }

    /// Writes a feature flag.
    pub fn set_feature(
        &self,
        label: &Label,
        name: &str,
        enabled: bool,
        description: &str,
    ) -> AppConfigResult<FeatureEntry> {
        let entry = self.set_payload(label, name, &Payload::feature(enabled, description))?;
        feature_entry(&entry)
    }

    /// Deletes a feature flag by name.
    pub fn delete_feature(&self, label: &Label, name: &str) -> AppConfigResult<bool> {
        self.delete(label, &feature_storage_key(name))
    }

    fn url(&self, label: &Label, key: &str) -> String {
        format!(
            "{}/kv/{}?label={}&api-version={}",
            self.endpoint,
            urlencoding::encode(key),
            urlencoding::encode(label.as_wire()),
            urlencoding::encode(&self.config.api_version)
        )
    }

    fn send(
        &self,
        method: Method,
        label: &Label,
        key: &str,
        body: Option<Vec<u8>>,
    ) -> AppConfigResult<HttpResponse> {
        let mut request = HttpRequest::new(method, self.url(label, key))
            .with_header("User-Agent", self.config.user_agent.as_str());
        if let Some(body) = body {
            request = request
                .with_header("Content-Type", CONTENT_TYPE_KEY_VALUE)
                .with_body(body);
        }
        self.authorizer.authorize(&mut request)?;

        let response = self.client.execute(&request)?;
        debug!("{} {} [{}] -> {}", method, key, label, response.status);

        match response.status {
            401 => {
                warn!("{} {} [{}] rejected: unauthorized", method, key, label);
                Err(AppConfigError::Unauthorized)
            }
            403 => {
                warn!("{} {} [{}] rejected: forbidden", method, key, label);
                Err(AppConfigError::Forbidden)
            }
            429 => {
                warn!("{} {} [{}] throttled by {}", method, key, label, self.endpoint);
                Err(AppConfigError::Throttled)
            }
            _ => Ok(response),
        }
    }
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("endpoint", &self.endpoint)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn decode_entry(response: &HttpResponse) -> AppConfigResult<KeyValueEntry> {
    let document: KeyValueDocument = serde_json::from_slice(&response.body)
        .map_err(|e| AppConfigError::wrap("malformed key-value response", e))?;
    Ok(document.into_entry())
}

fn unexpected_status(response: HttpResponse) -> AppConfigError {
    AppConfigError::UnexpectedStatus {
        status: response.status,
        body: response.body_text(),
    }
}
