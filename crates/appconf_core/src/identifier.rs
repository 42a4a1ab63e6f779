//! Persisted identity of a managed entry.
//!
//! A key-value (plain or Key Vault reference) is identified by
//! `host/label/key`; a feature flag by `host/feature/label/name`.
//!
//! ## Escaping
//!
//! Label and key segments escape `%` as `%25` and `/` as `%2F`, so keys
//! containing slashes survive a round trip. Segments containing neither
//! character are written verbatim, which keeps identifiers for ordinary
//! keys byte-identical to the plain slash-joined form. The "no label"
//! sentinel is written as an empty segment; a raw `%00` segment is also
//! accepted on decode.

use crate::error::{AppConfigError, AppConfigResult};
use crate::model::{Label, LABEL_NONE};
use std::fmt;
use std::str::FromStr;
use url::Url;

const FEATURE_SEGMENT: &str = "feature";

/// Which shape of identifier this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentifierKind {
    /// `host/label/key`.
    KeyValue,
    /// `host/feature/label/name`.
    Feature,
}

/// `(host, label, key)` identity of a managed entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceIdentifier {
    host: String,
    label: Label,
    key: String,
    kind: IdentifierKind,
}

impl ResourceIdentifier {
    /// Creates a key-value identifier.
    pub fn new(host: impl Into<String>, label: Label, key: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            label,
            key: key.into(),
            kind: IdentifierKind::KeyValue,
        }
    }

    /// Creates a feature identifier; `name` is the unprefixed feature name.
    pub fn feature(host: impl Into<String>, label: Label, name: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            label,
            key: name.into(),
            kind: IdentifierKind::Feature,
        }
    }

    /// Creates a key-value identifier from an endpoint URL.
    ///
    /// Fails with [`AppConfigError::InvalidIdentifier`] for an empty key.
    pub fn from_endpoint(endpoint: &str, label: Label, key: impl Into<String>) -> AppConfigResult<Self> {
        Self::new(endpoint_host(endpoint)?, label, key).validated()
    }

    /// Creates a feature identifier from an endpoint URL.
    ///
    /// Fails with [`AppConfigError::InvalidIdentifier`] for an empty name.
    pub fn feature_from_endpoint(
        endpoint: &str,
        label: Label,
        name: impl Into<String>,
    ) -> AppConfigResult<Self> {
        Self::feature(endpoint_host(endpoint)?, label, name).validated()
    }

    fn validated(self) -> AppConfigResult<Self> {
        if self.key.is_empty() {
            return Err(AppConfigError::InvalidIdentifier(format!(
                "missing key for {}",
                self.host
            )));
        }
        Ok(self)
    }

    /// Host component (network location, no scheme).
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Label component.
    pub fn label(&self) -> &Label {
        &self.label
    }

    /// Key component (feature name for feature identifiers).
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Shape of this identifier.
    pub fn kind(&self) -> IdentifierKind {
        self.kind
    }

    /// Endpoint the entry lives on, re-prefixed with `https://`.
    pub fn endpoint(&self) -> String {
        format!("https://{}", self.host)
    }

    /// Serializes to the persisted string form.
    pub fn encode(&self) -> String {
        let label = match &self.label {
            Label::None => String::new(),
            Label::Named(name) => escape_segment(name),
        };
        let key = escape_segment(&self.key);

        match self.kind {
            IdentifierKind::KeyValue => format!("{}/{}/{}", self.host, label, key),
            IdentifierKind::Feature => {
                format!("{}/{}/{}/{}", self.host, FEATURE_SEGMENT, label, key)
            }
        }
    }

    /// Parses the persisted string form.
    pub fn decode(id: &str) -> AppConfigResult<Self> {
        let segments: Vec<&str> = id.split('/').collect();

        let (kind, host, label, key) = match segments.as_slice() {
            [host, label, key] => (IdentifierKind::KeyValue, *host, *label, *key),
            [host, marker, label, key] if *marker == FEATURE_SEGMENT => {
                (IdentifierKind::Feature, *host, *label, *key)
            }
            _ => {
                return Err(AppConfigError::InvalidIdentifier(format!(
                    "expected host/label/key or host/feature/label/name, got {id:?}"
                )))
            }
        };

        if host.is_empty() {
            return Err(AppConfigError::InvalidIdentifier(format!(
                "missing host in {id:?}"
            )));
        }
        if key.is_empty() {
            return Err(AppConfigError::InvalidIdentifier(format!(
                "missing key in {id:?}"
            )));
        }

        let label = if label == LABEL_NONE {
            Label::None
        } else {
            Label::new(unescape_segment(label))
        };

        Ok(Self {
            host: host.to_string(),
            label,
            key: unescape_segment(key),
            kind,
        })
    }
}

impl fmt::Display for ResourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for ResourceIdentifier {
    type Err = AppConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

/// Extracts the network location (`host[:port]`) from an endpoint URL.
pub fn endpoint_host(endpoint: &str) -> AppConfigResult<String> {
    let url = Url::parse(endpoint).map_err(|_| AppConfigError::InvalidEndpoint(endpoint.into()))?;
    let host = url
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| AppConfigError::InvalidEndpoint(endpoint.into()))?;

    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

fn escape_segment(segment: &str) -> String {
    if !segment.contains(['%', '/']) {
        return segment.to_string();
    }

    let mut out = String::with_capacity(segment.len() + 4);
    for c in segment.chars() {
        match c {
            '%' => out.push_str("%25"),
            '/' => out.push_str("%2F"),
            other => out.push(other),
        }
    }
    out
}

fn unescape_segment(segment: &str) -> String {
    if !segment.contains('%') {
        return segment.to_string();
    }

    let mut out = String::with_capacity(segment.len());
    let mut rest = segment;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if tail.starts_with("%25") {
            out.push('%');
            rest = &tail[3..];
        } else if tail.starts_with("%2F") || tail.starts_with("%2f") {
            out.push('/');
            rest = &tail[3..];
        } else {
            out.push('%');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}
