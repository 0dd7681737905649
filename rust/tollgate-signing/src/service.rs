//! The signed URL facade.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::cloudfront::{CloudFrontSigner, Distribution};
use crate::s3::{GetObject, S3Signer};
use crate::time::{Clock, SystemClock, truncate};
use crate::SignError;

/// A URL granting temporary read access, with the expiry embedded in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedUrl {
    pub url: Url,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub expires: DateTime<Utc>,
}

/// Which signing protocol to issue a URL with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// SigV4 presigned URL served by the storage origin.
    Origin,
    /// Canned-policy URL enforced by the CDN edge.
    Edge,
}

impl std::fmt::Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Origin => write!(f, "origin"),
            Self::Edge => write!(f, "edge"),
        }
    }
}

impl std::str::FromStr for Scheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "origin" | "s3" => Ok(Self::Origin),
            "edge" | "cloudfront" => Ok(Self::Edge),
            other => Err(format!("unknown scheme {:?}, expected origin or edge", other)),
        }
    }
}

/// Issues signed URLs for object keys.
///
/// Holds only immutable signing configuration, so a single instance can be
/// shared by reference across any number of threads or tasks.
#[derive(Debug, Clone)]
pub struct SignedUrlService<C = SystemClock> {
    origin: S3Signer,
    edge: CloudFrontSigner,
    distribution: Distribution,
    clock: C,
}

impl SignedUrlService<SystemClock> {
    /// # Errors
    ///
    /// Returns [`SignError::MissingCredential`] if the origin signer's
    /// identity is incomplete, so misconfiguration surfaces at startup.
    pub fn new(
        origin: S3Signer,
        edge: CloudFrontSigner,
        distribution: Distribution,
    ) -> Result<Self, SignError> {
        origin.identity().validate()?;
        Ok(Self {
            origin,
            edge,
            distribution,
            clock: SystemClock,
        })
    }
}

impl<C: Clock> SignedUrlService<C> {
    /// Replace the clock, e.g. with a [`FixedClock`](crate::FixedClock) in tests.
    pub fn with_clock<D: Clock>(self, clock: D) -> SignedUrlService<D> {
        SignedUrlService {
            origin: self.origin,
            edge: self.edge,
            distribution: self.distribution,
            clock,
        }
    }

    /// Issue a URL for `key`, valid for `ttl` from now.
    ///
    /// The clock is read once; that reading determines both the signing
    /// timestamp and the returned expiry.
    pub fn issue(&self, key: &str, ttl: TimeDelta, scheme: Scheme) -> Result<SignedUrl, SignError> {
        self.issue_at(key, ttl, scheme, self.clock.now())
    }

    /// [`issue`](Self::issue) with an explicit clock reading.
    pub fn issue_at(
        &self,
        key: &str,
        ttl: TimeDelta,
        scheme: Scheme,
        now: DateTime<Utc>,
    ) -> Result<SignedUrl, SignError> {
        let result = match scheme {
            Scheme::Origin => self.origin.presign(&GetObject::new(key, ttl).inline(), now),
            Scheme::Edge => self.sign_edge(key, ttl, now),
        };

        match &result {
            Ok(signed) => debug!(
                %scheme,
                key,
                expires = signed.expires.timestamp(),
                "Issued signed URL"
            ),
            Err(error) => warn!(%scheme, key, %error, "Refused to issue signed URL"),
        }

        result
    }

    fn sign_edge(&self, key: &str, ttl: TimeDelta, now: DateTime<Utc>) -> Result<SignedUrl, SignError> {
        let now = truncate(now);
        let seconds = ttl.num_seconds();
        let expires = TimeDelta::try_seconds(seconds)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or(SignError::ExpiryOutOfRange { seconds })?;

        let resource = self.distribution.resource(key)?;
        self.edge.sign(&resource, expires, now)
    }
}
