//! In-process store speaking the `/kv/{key}` wire protocol.
//!
//! [`InMemoryStore`] implements [`HttpClient`] directly, so a
//! [`Transport`](crate::Transport) can be pointed at it without any network.
//! It can also simulate the behaviours reconciliation has to tolerate:
//! freshly written entries that stay invisible for a few reads, and
//! injected error statuses.

use crate::http::{HttpClient, HttpRequest, HttpResponse, Method};
use appconf_core::wire::{KeyValueDocument, SetKeyValueBody};
use appconf_core::{AppConfigError, AppConfigResult, ContentType, KeyValueEntry, Label};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use url::Url;

/// A request as the store understood it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// Method.
    pub method: Method,
    /// Decoded key from the path.
    pub key: String,
    /// `label` query parameter, if sent.
    pub label: Option<String>,
    /// `api-version` query parameter, if sent.
    pub api_version: Option<String>,
    /// Request headers.
    pub headers: Vec<(String, String)>,
    /// Request body as UTF-8.
    pub body: Option<String>,
}

impl RecordedRequest {
    /// Looks up a header value (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

type Slot = (String, String);

#[derive(Default)]
struct StoreState {
    entries: BTreeMap<Slot, KeyValueEntry>,
    hidden_reads: HashMap<Slot, u32>,
    visibility_lag: u32,
    injected: VecDeque<u16>,
    requests: Vec<RecordedRequest>,
    required_authorization: Option<String>,
    revision: u64,
}

/// An in-memory App Configuration store.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// After every PUT, the next `reads` GETs of that entry answer 404.
    pub fn with_visibility_lag(self, reads: u32) -> Self {
        self.state.lock().visibility_lag = reads;
        self
    }

    /// Rejects requests whose `Authorization` header differs from `value`.
    pub fn with_required_authorization(self, value: impl Into<String>) -> Self {
        self.state.lock().required_authorization = Some(value.into());
        self
    }

    /// Makes the next `reads` GETs of `(label, key)` answer 404.
    pub fn hide_next_reads(&self, label: &Label, key: &str, reads: u32) {
        let mut state = self.state.lock();
        if reads == 0 {
            state.hidden_reads.remove(&slot(label, key));
        } else {
            state.hidden_reads.insert(slot(label, key), reads);
        }
    }

    /// Answers the next request with `status` and an empty body.
    pub fn inject_status(&self, status: u16) {
        self.state.lock().injected.push_back(status);
    }

    /// Seeds an entry without going through the wire.
    pub fn insert(&self, entry: KeyValueEntry) {
        let key = slot(&entry.label, &entry.key);
        self.state.lock().entries.insert(key, entry);
    }

    /// Returns the stored entry, ignoring visibility lag.
    pub fn entry(&self, label: &Label, key: &str) -> Option<KeyValueEntry> {
        self.state.lock().entries.get(&slot(label, key)).cloned()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().requests.clone()
    }

    /// Number of requests received with `method`.
    pub fn request_count(&self, method: Method) -> usize {
        self.state
            .lock()
            .requests
            .iter()
            .filter(|r| r.method == method)
            .count()
    }
}

impl HttpClient for InMemoryStore {
    fn execute(&self, request: &HttpRequest) -> AppConfigResult<HttpResponse> {
        let recorded = parse_request(request)?;
        let mut state = self.state.lock();
        state.requests.push(recorded.clone());

        if let Some(status) = state.injected.pop_front() {
            return Ok(HttpResponse::new(status, Vec::new()));
        }

        if let Some(expected) = &state.required_authorization {
            if recorded.header("Authorization") != Some(expected.as_str()) {
                return Ok(HttpResponse::new(401, Vec::new()));
            }
        }

        let label = recorded.label.clone().unwrap_or_default();
        let key = (label, recorded.key.clone());

        match recorded.method {
            Method::Get => {
                if let Some(remaining) = state.hidden_reads.get_mut(&key) {
                    *remaining = remaining.saturating_sub(1);
                    if *remaining == 0 {
                        state.hidden_reads.remove(&key);
                    }
                    return Ok(HttpResponse::new(404, Vec::new()));
                }
                match state.entries.get(&key) {
                    Some(entry) => json_response(200, entry),
                    None => Ok(HttpResponse::new(404, Vec::new())),
                }
            }
            Method::Put => {
                let Some(body) = recorded.body.as_deref() else {
                    return Ok(HttpResponse::new(400, b"missing body".to_vec()));
                };
                let Ok(body) = serde_json::from_str::<SetKeyValueBody>(body) else {
                    return Ok(HttpResponse::new(400, b"malformed body".to_vec()));
                };

                state.revision += 1;
                let tags = state
                    .entries
                    .get(&key)
                    .map(|existing| existing.tags.clone())
                    .unwrap_or_default();
                let entry = KeyValueEntry {
                    key: key.1.clone(),
                    label: Label::from_wire(Some(key.0.as_str())),
                    value: body.value,
                    content_type: ContentType::from_wire(&body.content_type),
                    last_modified: Some(timestamp(state.revision)),
                    tags,
                };
                state.entries.insert(key.clone(), entry.clone());

                let lag = state.visibility_lag;
                if lag > 0 {
                    state.hidden_reads.insert(key, lag);
                }
                json_response(200, &entry)
            }
            Method::Delete => {
                state.hidden_reads.remove(&key);
                match state.entries.remove(&key) {
                    Some(entry) => json_response(200, &entry),
                    None => Ok(HttpResponse::new(204, Vec::new())),
                }
            }
        }
    }
}

fn slot(label: &Label, key: &str) -> Slot {
    (label.as_wire().to_string(), key.to_string())
}

fn parse_request(request: &HttpRequest) -> AppConfigResult<RecordedRequest> {
    let url = Url::parse(&request.url)
        .map_err(|e| AppConfigError::wrap(format!("invalid request URL {}", request.url), e))?;

    let encoded_key = url
        .path()
        .strip_prefix("/kv/")
        .ok_or_else(|| AppConfigError::unexpected(format!("unsupported path {}", url.path())))?;
    let key = urlencoding::decode(encoded_key)
        .map_err(|e| AppConfigError::wrap("key is not valid UTF-8", e))?
        .into_owned();

    let mut label = None;
    let mut api_version = None;
    for (name, value) in url.query_pairs() {
        match name.as_ref() {
            "label" => label = Some(value.into_owned()),
            "api-version" => api_version = Some(value.into_owned()),
            _ => {}
        }
    }

    Ok(RecordedRequest {
        method: request.method,
        key,
        label,
        api_version,
        headers: request.headers.clone(),
        body: request
            .body
            .as_ref()
            .map(|b| String::from_utf8_lossy(b).into_owned()),
    })
}

fn json_response(status: u16, entry: &KeyValueEntry) -> AppConfigResult<HttpResponse> {
    let body = serde_json::to_vec(&KeyValueDocument::from(entry))?;
    Ok(HttpResponse::new(status, body))
}

fn timestamp(revision: u64) -> String {
    let seconds = revision % 60;
    let minutes = (revision / 60) % 60;
    let hours = (revision / 3600) % 24;
    format!("2024-01-01T{hours:02}:{minutes:02}:{seconds:02}+00:00")
}
