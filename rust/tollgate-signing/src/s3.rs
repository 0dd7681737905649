//! AWS S3 Signature Version 4 presigning.
//!
//! Produces GET URLs for S3-compatible storage using [query string
//! authentication]. Everything here is pure computation over the clock
//! reading handed in by the caller; no request is ever sent.
//!
//! [query string authentication]: https://docs.aws.amazon.com/AmazonS3/latest/API/sigv4-query-string-auth.html

use chrono::{DateTime, Datelike, TimeDelta, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::fmt::Write as FmtWrite;
use url::Url;

use crate::time::truncate;
use crate::{Address, SignError, SignedUrl, SigningIdentity};

// AWS S3 Signing Constants
pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";
pub const ALGORITHM_QUERY_PARAM: &str = "X-Amz-Algorithm";
pub const CREDENTIAL_QUERY_PARAM: &str = "X-Amz-Credential";
pub const AMZ_DATE_QUERY_PARAM: &str = "X-Amz-Date";
pub const SIGNED_HEADERS_QUERY_PARAM: &str = "X-Amz-SignedHeaders";
pub const EXPIRES_QUERY_PARAM: &str = "X-Amz-Expires";
pub const AMZ_SECURITY_TOKEN_QUERY_PARAM: &str = "X-Amz-Security-Token";
pub const AMZ_SIGNATURE_QUERY_PARAM: &str = "X-Amz-Signature";
pub const CONTENT_DISPOSITION_QUERY_PARAM: &str = "response-content-disposition";
pub const HOST_HEADER: &str = "host";
pub const ALGORITHM_IDENTIFIER: &str = "AWS4-HMAC-SHA256";
pub const KEY_TYPE_IDENTIFIER: &str = "aws4_request";

/// Longest validity SigV4 accepts for a presigned URL: 7 days.
pub const MAX_EXPIRES: i64 = 604_800;

const METHOD: &str = "GET";

/// A GET request for a single object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetObject<'a> {
    /// Object key, used as the URL path
    pub key: &'a str,
    /// How long the URL stays valid
    pub expires: TimeDelta,
    /// Extra query parameters covered by the signature
    pub params: Vec<(String, String)>,
}

impl<'a> GetObject<'a> {
    pub fn new(key: &'a str, expires: TimeDelta) -> Self {
        Self {
            key,
            expires,
            params: Vec::new(),
        }
    }

    /// Add a query parameter, e.g. a `response-*` override.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Ask the origin to serve the object with `Content-Disposition: inline`.
    pub fn inline(self) -> Self {
        self.with_param(CONTENT_DISPOSITION_QUERY_PARAM, "inline")
    }
}

/// Origin signer: presigns object URLs with AWS SigV4.
#[derive(Debug, Clone)]
pub struct S3Signer {
    identity: SigningIdentity,
    address: Address,
}

impl S3Signer {
    pub fn new(identity: SigningIdentity, address: Address) -> Self {
        Self { identity, address }
    }

    pub fn identity(&self) -> &SigningIdentity {
        &self.identity
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Presign `request` as of `now`.
    ///
    /// The returned expiry is `now` truncated to the second plus the
    /// requested validity.
    pub fn presign(
        &self,
        request: &GetObject<'_>,
        now: DateTime<Utc>,
    ) -> Result<SignedUrl, SignError> {
        let authorization = self.authorize(request, now)?;
        Ok(SignedUrl {
            url: authorization.url,
            expires: authorization.expires,
        })
    }

    /// Run the full signing procedure, keeping every intermediate artifact.
    pub fn authorize(
        &self,
        request: &GetObject<'_>,
        now: DateTime<Utc>,
    ) -> Result<Authorization, SignError> {
        self.identity.validate()?;
        let expires = validate_expires(request.expires)?;

        let time = truncate(now);
        let expires_at = time
            .checked_add_signed(TimeDelta::seconds(expires))
            .ok_or(SignError::ExpiryOutOfRange { seconds: expires })?;
        let timestamp = format_timestamp(&time)?;
        let date = &timestamp[0..8];

        let region = self.identity.region();
        let service = self.identity.service();
        let scope = derive_scope(date, region, service);

        let location = self.address.locate(region, request.key)?;

        let mut params: Vec<(String, String)> = vec![
            (
                ALGORITHM_QUERY_PARAM.to_string(),
                ALGORITHM_IDENTIFIER.to_string(),
            ),
            (
                CREDENTIAL_QUERY_PARAM.to_string(),
                format!("{}/{}", self.identity.access_key_id(), scope),
            ),
            (AMZ_DATE_QUERY_PARAM.to_string(), timestamp.clone()),
            (EXPIRES_QUERY_PARAM.to_string(), expires.to_string()),
            (SIGNED_HEADERS_QUERY_PARAM.to_string(), HOST_HEADER.to_string()),
        ];
        if let Some(token) = self.identity.session_token() {
            params.push((
                AMZ_SECURITY_TOKEN_QUERY_PARAM.to_string(),
                token.to_string(),
            ));
        }
        params.extend(request.params.iter().cloned());

        let canonical_query = format_search_params(&params);
        let canonical_request = format!(
            "{}\n{}\n{}\n{}:{}\n\n{}\n{}",
            METHOD,
            location.path,
            canonical_query,
            HOST_HEADER,
            location.host,
            HOST_HEADER,
            UNSIGNED_PAYLOAD
        );

        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM_IDENTIFIER,
            timestamp,
            scope,
            hex_encode(&Sha256::digest(canonical_request.as_bytes()))
        );

        let signing_key =
            derive_signing_key(self.identity.secret_access_key(), date, region, service);
        let signature = hex_encode(&hmac_sign(&signing_key, string_to_sign.as_bytes()));

        let url = format!(
            "{}://{}{}?{}&{}={}",
            location.scheme,
            location.host,
            location.path,
            canonical_query,
            AMZ_SIGNATURE_QUERY_PARAM,
            signature
        );
        let url = Url::parse(&url).map_err(|error| {
            SignError::Configuration(format!("Could not build final URL: {}", error))
        })?;

        Ok(Authorization {
            url,
            expires: expires_at,
            timestamp,
            scope,
            canonical_request,
            string_to_sign,
            signature,
        })
    }
}

/// Every artifact produced while presigning one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    /// Complete URL with signature
    pub url: Url,
    /// Absolute expiry embedded in the URL
    pub expires: DateTime<Utc>,
    /// Signing time, ISO 8601 basic format
    pub timestamp: String,
    /// Credential scope
    pub scope: String,
    /// Canonical request that was hashed
    pub canonical_request: String,
    /// String that was signed
    pub string_to_sign: String,
    /// Lowercase hex signature
    pub signature: String,
}

/// Whole seconds of `expires`, if SigV4 accepts them.
fn validate_expires(expires: TimeDelta) -> Result<i64, SignError> {
    let seconds = expires.num_seconds();
    if seconds <= 0 || seconds > MAX_EXPIRES {
        return Err(SignError::ExpiryOutOfRange { seconds });
    }
    Ok(seconds)
}

/// Format timestamp in the format required by AWS.
///
/// SigV4 dates are exactly eight digits, so only years 0000 through 9999
/// can be signed.
fn format_timestamp(time: &DateTime<Utc>) -> Result<String, SignError> {
    if !(0..=9999).contains(&time.year()) {
        return Err(SignError::ClockOutOfRange {
            now: time.timestamp(),
        });
    }
    Ok(time.format("%Y%m%dT%H%M%SZ").to_string())
}

/// Calculate credential scope
fn derive_scope(date: &str, region: &str, service: &str) -> String {
    format!("{}/{}/{}/{}", date, region, service, KEY_TYPE_IDENTIFIER)
}

/// Derive the signing key:
/// `HMAC(HMAC(HMAC(HMAC("AWS4" + secret, date), region), service), "aws4_request")`
fn derive_signing_key(secret: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let key = format!("AWS4{}", secret);
    let k_date = hmac_sign(key.as_bytes(), date.as_bytes());
    let k_region = hmac_sign(&k_date, region.as_bytes());
    let k_service = hmac_sign(&k_region, service.as_bytes());
    hmac_sign(&k_service, KEY_TYPE_IDENTIFIER.as_bytes())
}

/// Encode, deduplicate (first occurrence wins) and sort query parameters.
fn format_search_params(params: &[(String, String)]) -> String {
    let mut seen = std::collections::HashSet::new();
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .filter(|(name, _)| !name.is_empty() && seen.insert(name.as_str()))
        .map(|(name, value)| (percent_encode(name), percent_encode(value)))
        .collect();

    encoded.sort();

    encoded
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("&")
}

fn hmac_sign(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Lowercase hex, as SigV4 requires for digests and signatures.
fn hex_encode(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(s, "{:02x}", byte);
    }
    s
}

/// Percent-encode everything outside the RFC 3986 unreserved set, with
/// uppercase hex digits.
pub(crate) fn percent_encode(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => {
                let _ = write!(result, "%{:02X}", byte);
            }
        }
    }
    result
}

/// Percent-encode a URL path (preserving slashes).
pub(crate) fn percent_encode_path(path: &str) -> String {
    path.split('/')
        .map(percent_encode)
        .collect::<Vec<_>>()
        .join("/")
}
