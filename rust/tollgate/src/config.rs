//! Process-level signing configuration.
//!
//! Values come from flags or the environment, are validated once, and end up
//! inside an immutable [`SignedUrlService`].

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use tollgate_signing::{
    Address, CloudFrontSigner, Distribution, KeyMaterial, S3Signer, SignedUrlService,
    SigningIdentity,
};
use tracing::info;

#[derive(Debug, Clone, Args)]
pub struct Config {
    /// CloudFront key pair (public key) id
    #[arg(long, env = "KEY_ID")]
    pub key_pair_id: String,

    /// PEM encoded PKCS#8 RSA private key for CloudFront signing
    #[arg(long, env = "CF_PRIV_KEY", hide_env_values = true)]
    pub private_key: Option<String>,

    /// Path of the PEM encoded private key, used when no key is given inline
    #[arg(long, env = "PRIV_KEY_PATH")]
    pub private_key_path: Option<PathBuf>,

    #[arg(long, env = "AWS_ACCESS_KEY_ID")]
    pub access_key_id: String,

    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub secret_access_key: String,

    #[arg(long, env = "AWS_SESSION_TOKEN", hide_env_values = true)]
    pub session_token: Option<String>,

    #[arg(long, env = "AWS_REGION", default_value = "us-east-1")]
    pub region: String,

    #[arg(long, env = "TOLLGATE_BUCKET", default_value = "cloudfront-demo-asset")]
    pub bucket: String,

    /// S3-compatible endpoint; AWS itself when omitted
    #[arg(long, env = "TOLLGATE_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Force path-style (`true`) or virtual-hosted (`false`) origin URLs
    #[arg(long, env = "TOLLGATE_PATH_STYLE")]
    pub path_style: Option<bool>,

    /// Base URL of the CloudFront distribution serving the bucket
    #[arg(
        long,
        env = "TOLLGATE_DISTRIBUTION",
        default_value = "https://d3teqayz0fq1v6.cloudfront.net"
    )]
    pub distribution: String,
}

impl Config {
    /// Read the private key PEM, preferring the inline value.
    ///
    /// Inline keys copied from `.env` files often carry literal `\n`
    /// sequences instead of line breaks; those are restored.
    pub fn private_key_pem(&self) -> Result<String> {
        if let Some(pem) = &self.private_key {
            return Ok(pem.replace("\\n", "\n"));
        }
        if let Some(path) = &self.private_key_path {
            return std::fs::read_to_string(path)
                .with_context(|| format!("reading private key from {}", path.display()));
        }
        bail!("no private key configured: set CF_PRIV_KEY or PRIV_KEY_PATH")
    }

    pub fn identity(&self) -> SigningIdentity {
        let identity = SigningIdentity::new(
            &self.access_key_id,
            &self.secret_access_key,
            &self.region,
        );
        match &self.session_token {
            Some(token) => identity.with_session_token(token),
            None => identity,
        }
    }

    pub fn address(&self) -> Address {
        let address = match &self.endpoint {
            Some(endpoint) => Address::new(endpoint, &self.bucket),
            None => Address::aws(&self.bucket),
        };
        match self.path_style {
            Some(path_style) => address.with_path_style(path_style),
            None => address,
        }
    }

    /// Build the signing service this configuration describes.
    pub fn service(&self) -> Result<SignedUrlService> {
        let key = KeyMaterial::from_pem(&self.private_key_pem()?)
            .context("loading CloudFront private key")?;
        let edge = CloudFrontSigner::new(&self.key_pair_id, &key)
            .context("configuring CloudFront signer")?;
        let distribution =
            Distribution::new(&self.distribution).context("configuring distribution")?;
        let origin = S3Signer::new(self.identity(), self.address());

        let service = SignedUrlService::new(origin, edge, distribution)
            .context("configuring origin signer")?;

        info!(
            key_pair_id = %self.key_pair_id,
            access_key_id = %self.access_key_id,
            region = %self.region,
            bucket = %self.bucket,
            "Loaded signing configuration"
        );

        Ok(service)
    }
}
