//! CloudFront canned-policy URL signing.
//!
//! A canned policy grants access to exactly one resource until one absolute
//! time. CloudFront recomputes the policy from the `Expires` parameter and
//! the requested URL, then checks the signature against the public key
//! registered under `Key-Pair-Id`, so the policy bytes produced here must
//! match CloudFront's byte for byte.
//!
//! The scheme mandates RSA PKCS#1 v1.5 over a SHA-1 digest; the digest is a
//! fixed external constraint.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use serde::Serialize;
use sha1::{Digest, Sha1};
use url::Url;

use crate::address::encode_key;
use crate::s3::percent_encode;
use crate::time::truncate;
use crate::{KeyMaterial, SignError, SignedUrl};

pub const EXPIRES_QUERY_PARAM: &str = "Expires";
pub const SIGNATURE_QUERY_PARAM: &str = "Signature";
pub const KEY_PAIR_ID_QUERY_PARAM: &str = "Key-Pair-Id";

/// Base URL of a CloudFront distribution, e.g. `https://d111111abcdef8.cloudfront.net`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distribution {
    base: Url,
}

impl Distribution {
    /// # Errors
    ///
    /// Returns [`SignError::Configuration`] if `base` is not an absolute
    /// http(s) URL without query or fragment.
    pub fn new(base: &str) -> Result<Self, SignError> {
        let base = Url::parse(base)
            .map_err(|e| SignError::Configuration(format!("Invalid distribution URL: {}", e)))?;

        if !matches!(base.scheme(), "http" | "https") || base.host_str().is_none() {
            return Err(SignError::Configuration(format!(
                "Distribution URL must be http(s) with a host: {}",
                base
            )));
        }
        if base.query().is_some() || base.fragment().is_some() {
            return Err(SignError::Configuration(format!(
                "Distribution URL must not carry a query or fragment: {}",
                base
            )));
        }

        Ok(Self { base })
    }

    /// Fully-qualified resource URL of `key` on this distribution.
    pub fn resource(&self, key: &str) -> Result<String, SignError> {
        Ok(format!(
            "{}{}",
            self.base.as_str().trim_end_matches('/'),
            encode_key(key)?
        ))
    }
}

/// Edge signer: signs resource URLs with a CloudFront key pair.
#[derive(Clone)]
pub struct CloudFrontSigner {
    key_pair_id: String,
    key: RsaPrivateKey,
}

impl CloudFrontSigner {
    /// # Errors
    ///
    /// [`SignError::MissingCredential`] for an empty key pair id and
    /// [`SignError::KeyAlgorithmMismatch`] if `key` is not an RSA key.
    pub fn new(key_pair_id: impl Into<String>, key: &KeyMaterial) -> Result<Self, SignError> {
        let key_pair_id = key_pair_id.into();
        if key_pair_id.trim().is_empty() {
            return Err(SignError::MissingCredential("key pair id"));
        }
        Ok(Self {
            key_pair_id,
            key: key.rsa()?.clone(),
        })
    }

    pub fn key_pair_id(&self) -> &str {
        &self.key_pair_id
    }

    /// Sign `resource` so that it is valid until `expires`.
    ///
    /// `resource` must already be in the normalised form a client will
    /// request, since CloudFront compares it against the policy verbatim.
    pub fn sign(
        &self,
        resource: &str,
        expires: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<SignedUrl, SignError> {
        let expires = truncate(expires);
        let epoch = expires.timestamp();
        let now = truncate(now).timestamp();
        if epoch <= now {
            return Err(SignError::ExpiryInPast {
                expires: epoch,
                now,
            });
        }

        let parsed = Url::parse(resource)
            .map_err(|e| SignError::Configuration(format!("Invalid resource URL: {}", e)))?;
        if parsed.as_str() != resource || parsed.fragment().is_some() {
            return Err(SignError::Configuration(format!(
                "Resource URL {:?} is not in normalised form",
                resource
            )));
        }

        let policy = canned_policy(resource, epoch)?;
        let signature = encode_signature(&self.sign_policy(policy.as_bytes())?);

        let separator = if parsed.query().is_some() { '&' } else { '?' };
        let url = format!(
            "{}{}{}={}&{}={}&{}={}",
            resource,
            separator,
            EXPIRES_QUERY_PARAM,
            epoch,
            SIGNATURE_QUERY_PARAM,
            signature,
            KEY_PAIR_ID_QUERY_PARAM,
            percent_encode(&self.key_pair_id)
        );
        let url = Url::parse(&url).map_err(|error| {
            SignError::Configuration(format!("Could not build final URL: {}", error))
        })?;

        Ok(SignedUrl { url, expires })
    }

    /// Raw RSA PKCS#1 v1.5 / SHA-1 signature over `policy`.
    pub fn sign_policy(&self, policy: &[u8]) -> Result<Vec<u8>, SignError> {
        let digest = Sha1::digest(policy);
        self.key
            .sign(Pkcs1v15Sign::new::<Sha1>(), &digest)
            .map_err(|error| SignError::SigningFailure(error.to_string()))
    }
}

impl std::fmt::Debug for CloudFrontSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudFrontSigner")
            .field("key_pair_id", &self.key_pair_id)
            .finish_non_exhaustive()
    }
}

// Field order is significant: it is the byte order of the signed policy.
#[derive(Serialize)]
struct Policy<'a> {
    #[serde(rename = "Statement")]
    statement: [Statement<'a>; 1],
}

#[derive(Serialize)]
struct Statement<'a> {
    #[serde(rename = "Resource")]
    resource: &'a str,
    #[serde(rename = "Condition")]
    condition: Condition,
}

#[derive(Serialize)]
struct Condition {
    #[serde(rename = "DateLessThan")]
    date_less_than: EpochTime,
}

#[derive(Serialize)]
struct EpochTime {
    #[serde(rename = "AWS:EpochTime")]
    epoch_time: i64,
}

/// The canned policy document for `resource` expiring at `expires` (epoch seconds).
pub fn canned_policy(resource: &str, expires: i64) -> Result<String, SignError> {
    let policy = Policy {
        statement: [Statement {
            resource,
            condition: Condition {
                date_less_than: EpochTime {
                    epoch_time: expires,
                },
            },
        }],
    };
    serde_json::to_string(&policy).map_err(|error| SignError::SigningFailure(error.to_string()))
}

/// Base64 with CloudFront's URL-safe substitutions: `+`→`-`, `=`→`_`, `/`→`~`.
pub fn encode_signature(signature: &[u8]) -> String {
    STANDARD
        .encode(signature)
        .chars()
        .map(|c| match c {
            '+' => '-',
            '=' => '_',
            '/' => '~',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    const RSA_PEM: &str = include_str!("../tests/fixtures/rsa-private-key.pem");
    const EC_PEM: &str = include_str!("../tests/fixtures/ec-private-key.pem");

    // openssl dgst -sha1 -sign rsa-private-key.pem policy.json | base64 | tr '+=/' '-_~'
    const GOLANG_SIGNATURE: &str = "pvZka1zwfzFZrJw2vP9nzmmLajDt3l3K3wMBLZ6j3HmNaUFoiG6~Pak8~XYU4B63sA1njoekf5KtffJ8-or6wd8YGAbps58xHY-MrfAwMlwBKuaomfWgOhyhPEhCSUVXJYU3e6IVlFOx0UhvJK0KRMP9CLCLidRCu7P0CBzI3GC5645MhXFiaOoQ9yvtmK-LF-4vqzYFdq5xhup-TzWSr19TVovOP5UjlwP1gzRqisV1dMF~9GF0pLAvRC3VeDTCcTxraJRVJ9DLzvJgZJeYxqVEZTBfwpYcowEJa~pCtwyrdc5ZwTSjCs7hE4s5D4yqoYQh-w6llR8SjvuBqXNt9A__";

    fn signer() -> CloudFrontSigner {
        let key = KeyMaterial::from_pem(RSA_PEM).unwrap();
        CloudFrontSigner::new("K2JCJMDEHXQW5F", &key).unwrap()
    }

    fn new_year() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn it_builds_the_canned_policy_without_whitespace() {
        assert_eq!(
            canned_policy("https://cdn.example/golang", 1_704_067_800).unwrap(),
            r#"{"Statement":[{"Resource":"https://cdn.example/golang","Condition":{"DateLessThan":{"AWS:EpochTime":1704067800}}}]}"#
        );
    }

    #[test]
    fn it_escapes_the_resource_as_a_json_string() {
        let policy = canned_policy(r#"https://cdn.example/a"b"#, 1).unwrap();
        assert!(policy.contains(r#""Resource":"https://cdn.example/a\"b""#));
    }

    #[test]
    fn it_signs_a_resource_url() {
        let expires = Utc.timestamp_opt(1_704_067_800, 0).unwrap();
        let signed = signer()
            .sign("https://cdn.example/golang", expires, new_year())
            .unwrap();

        assert_eq!(
            signed.url.as_str(),
            format!(
                "https://cdn.example/golang?Expires=1704067800&Signature={}&Key-Pair-Id=K2JCJMDEHXQW5F",
                GOLANG_SIGNATURE
            )
        );
        assert_eq!(signed.expires, expires);
    }

    #[test]
    fn it_appends_to_an_existing_query() {
        let expires = Utc.timestamp_opt(1_704_067_800, 0).unwrap();
        let signed = signer()
            .sign("https://cdn.example/golang?size=large", expires, new_year())
            .unwrap();

        assert!(
            signed
                .url
                .as_str()
                .starts_with("https://cdn.example/golang?size=large&Expires=1704067800&Signature=")
        );
    }

    #[test]
    fn it_uses_only_url_safe_signature_characters() {
        let encoded = encode_signature(&signer().sign_policy(b"policy").unwrap());
        assert!(
            encoded
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '~'))
        );
    }

    #[test]
    fn it_substitutes_base64_characters() {
        // 0xfb 0xff 0xbf encodes to "+/+/" in standard base64
        assert_eq!(encode_signature(&[0xfb, 0xff, 0xbf]), "-~-~");
        assert_eq!(encode_signature(&[0xff]), "~w__");
    }

    #[test]
    fn it_rejects_an_expiry_that_is_not_in_the_future() {
        let now = new_year();
        let error = signer()
            .sign("https://cdn.example/golang", now, now)
            .unwrap_err();
        assert_eq!(
            error,
            SignError::ExpiryInPast {
                expires: 1_704_067_200,
                now: 1_704_067_200,
            }
        );

        let error = signer()
            .sign("https://cdn.example/golang", now - chrono::TimeDelta::seconds(1), now)
            .unwrap_err();
        assert!(matches!(error, SignError::ExpiryInPast { .. }));
    }

    #[test]
    fn it_rejects_non_rsa_keys() {
        let key = KeyMaterial::from_pem(EC_PEM).unwrap();
        let error = CloudFrontSigner::new("K2JCJMDEHXQW5F", &key).unwrap_err();
        assert_eq!(error, SignError::KeyAlgorithmMismatch("EC".into()));
    }

    #[test]
    fn it_requires_a_key_pair_id() {
        let key = KeyMaterial::from_pem(RSA_PEM).unwrap();
        let error = CloudFrontSigner::new("", &key).unwrap_err();
        assert_eq!(error, SignError::MissingCredential("key pair id"));
    }

    #[test]
    fn it_rejects_resources_that_would_be_rewritten() {
        let expires = Utc.timestamp_opt(1_704_067_800, 0).unwrap();
        for resource in ["https://cdn.example", "https://cdn.example/a b", "not a url"] {
            let error = signer().sign(resource, expires, new_year()).unwrap_err();
            assert!(matches!(error, SignError::Configuration(_)), "{}", resource);
        }
    }

    #[test]
    fn it_builds_resource_urls_from_a_distribution() {
        let distribution = Distribution::new("https://d3teqayz0fq1v6.cloudfront.net").unwrap();
        assert_eq!(
            distribution.resource("golang").unwrap(),
            "https://d3teqayz0fq1v6.cloudfront.net/golang"
        );

        let distribution = Distribution::new("https://cdn.example/assets/").unwrap();
        assert_eq!(
            distribution.resource("photos/summer trip.jpg").unwrap(),
            "https://cdn.example/assets/photos/summer%20trip.jpg"
        );
    }

    #[test]
    fn it_rejects_unusable_distributions() {
        for base in ["ftp://cdn.example", "https://cdn.example/?a=b", "cdn.example"] {
            assert!(
                matches!(Distribution::new(base), Err(SignError::Configuration(_))),
                "{}",
                base
            );
        }
    }

    #[test]
    fn it_does_not_print_the_key() {
        assert_eq!(
            format!("{:?}", signer()),
            r#"CloudFrontSigner { key_pair_id: "K2JCJMDEHXQW5F", .. }"#
        );
    }
}
