//! Credentials used by the origin signing scheme.

use serde::{Deserialize, Serialize};

use crate::SignError;

/// Access key pair plus the region/service scope they sign for.
///
/// Treated as opaque input: nothing here derives or refreshes credentials.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningIdentity {
    /// AWS Access Key ID
    access_key_id: String,
    /// AWS Secret Access Key
    secret_access_key: String,
    /// Session token if using temporary credentials
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session_token: Option<String>,
    /// Region component of the credential scope
    region: String,
    /// Service component of the credential scope
    #[serde(default = "default_service")]
    service: String,
}

fn default_service() -> String {
    "s3".into()
}

impl SigningIdentity {
    /// Create an identity scoped to the `s3` service in `region`.
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
            region: region.into(),
            service: default_service(),
        }
    }

    /// Attach a session token from temporary credentials.
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    /// Sign for a service other than `s3`.
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub(crate) fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Check that every field the signature depends on is present.
    pub fn validate(&self) -> Result<(), SignError> {
        if self.access_key_id.trim().is_empty() {
            return Err(SignError::MissingCredential("access key id"));
        }
        if self.secret_access_key.is_empty() {
            return Err(SignError::MissingCredential("secret access key"));
        }
        if self.region.trim().is_empty() {
            return Err(SignError::MissingCredential("region"));
        }
        if self.service.trim().is_empty() {
            return Err(SignError::MissingCredential("service"));
        }
        Ok(())
    }
}

impl std::fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .field("region", &self.region)
            .field("service", &self.service)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_accepts_a_complete_identity() {
        let identity = SigningIdentity::new("AKIATEST", "secret123", "us-east-1");
        assert!(identity.validate().is_ok());
        assert_eq!(identity.service(), "s3");
    }

    #[test]
    fn it_reports_the_missing_field() {
        let cases = [
            (
                SigningIdentity::new("", "secret", "us-east-1"),
                "access key id",
            ),
            (
                SigningIdentity::new("AKIATEST", "", "us-east-1"),
                "secret access key",
            ),
            (SigningIdentity::new("AKIATEST", "secret", " "), "region"),
            (
                SigningIdentity::new("AKIATEST", "secret", "us-east-1").with_service(""),
                "service",
            ),
        ];

        for (identity, field) in cases {
            assert_eq!(
                identity.validate().unwrap_err(),
                SignError::MissingCredential(field)
            );
        }
    }

    #[test]
    fn it_redacts_secrets_in_debug_output() {
        let identity = SigningIdentity::new("AKIATEST", "secret123", "us-east-1")
            .with_session_token("token456");
        let debug = format!("{:?}", identity);
        assert!(debug.contains("AKIATEST"));
        assert!(!debug.contains("secret123"));
        assert!(!debug.contains("token456"));
    }

    #[test]
    fn it_defaults_the_service_when_deserializing() {
        let identity: SigningIdentity = serde_json::from_str(
            r#"{"access_key_id":"AKIATEST","secret_access_key":"s","region":"auto"}"#,
        )
        .unwrap();
        assert_eq!(identity.service(), "s3");
        assert_eq!(identity.session_token(), None);
    }
}
