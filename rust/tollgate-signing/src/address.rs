//! S3 storage address types.
//!
//! This module provides the [`Address`] type for specifying where objects
//! signed by the origin scheme live.

use serde::{Deserialize, Serialize};
use url::{Host, Url};

use crate::SignError;
use crate::s3::percent_encode_path;

/// Address of a bucket on AWS S3 or an S3-compatible service.
///
/// This is a plain data type: URL validation happens when a request URL is
/// built, because the region needed for the default AWS host comes from the
/// signing identity.
///
/// # Examples
///
/// ```
/// use tollgate_signing::Address;
///
/// // AWS S3, virtual-hosted style
/// let aws = Address::aws("my-bucket");
///
/// // MinIO (local development), path style is picked automatically
/// let minio = Address::new("http://localhost:9000", "my-bucket");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// S3-compatible endpoint URL; `None` means AWS itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    endpoint: Option<String>,
    /// Bucket name
    bucket: String,
    /// Explicit path-style choice; `None` picks a default from the endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    path_style: Option<bool>,
}

impl Address {
    /// Address a bucket on AWS S3.
    pub fn aws(bucket: impl Into<String>) -> Self {
        Self {
            endpoint: None,
            bucket: bucket.into(),
            path_style: None,
        }
    }

    /// Address a bucket behind a custom S3-compatible endpoint.
    pub fn new(endpoint: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            bucket: bucket.into(),
            path_style: None,
        }
    }

    /// Set whether to use path-style URLs.
    ///
    /// - `true`: Use path-style URLs (`https://endpoint/bucket/key`)
    /// - `false`: Use virtual-hosted style URLs (`https://bucket.endpoint/key`)
    ///
    /// By default, path-style is enabled for IP addresses and localhost.
    pub fn with_path_style(mut self, path_style: bool) -> Self {
        self.path_style = Some(path_style);
        self
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Resolve the scheme, host, and canonical path of `key` in this bucket.
    pub(crate) fn locate(&self, region: &str, key: &str) -> Result<Location, SignError> {
        if self.bucket.is_empty() {
            return Err(SignError::Configuration("Bucket name is empty".into()));
        }
        let key = encode_key(key)?;

        let Some(endpoint) = &self.endpoint else {
            return Ok(Location {
                scheme: "https".into(),
                host: format!("{}.s3.{}.amazonaws.com", self.bucket, region),
                path: key,
            });
        };

        let endpoint = Url::parse(endpoint)
            .map_err(|e| SignError::Configuration(format!("Invalid endpoint: {}", e)))?;
        // IP and localhost endpoints cannot resolve `{bucket}.{host}`, so
        // they default to path style.
        let (host, local) = match endpoint.host() {
            Some(Host::Domain(domain)) => (domain.to_string(), domain == "localhost"),
            Some(ip @ (Host::Ipv4(_) | Host::Ipv6(_))) => (ip.to_string(), true),
            None => {
                return Err(SignError::Configuration(format!(
                    "Endpoint {} has no host",
                    endpoint
                )));
            }
        };
        let host = match endpoint.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host,
        };
        let path_style = self.path_style.unwrap_or(local);

        Ok(if path_style {
            Location {
                scheme: endpoint.scheme().into(),
                host,
                path: format!("/{}{}", percent_encode_path(&self.bucket), key),
            }
        } else {
            Location {
                scheme: endpoint.scheme().into(),
                host: format!("{}.{}", self.bucket, host),
                path: key,
            }
        })
    }
}

/// Where a signed request points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Location {
    pub scheme: String,
    /// Host, including a port for non-standard ports
    pub host: String,
    /// Percent-encoded absolute path, used verbatim as the canonical URI
    pub path: String,
}

/// Percent-encode an object key into an absolute path.
///
/// Dot segments are refused: URL consumers normalise them away, so the path
/// a client requests would no longer be the path that was signed.
pub(crate) fn encode_key(key: &str) -> Result<String, SignError> {
    let key = key.strip_prefix('/').unwrap_or(key);
    if key.is_empty() {
        return Err(SignError::Configuration("Object key is empty".into()));
    }
    if key.split('/').any(|segment| segment == "." || segment == "..") {
        return Err(SignError::Configuration(format!(
            "Object key {:?} contains dot segments",
            key
        )));
    }
    Ok(format!("/{}", percent_encode_path(key)))
}
