use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tollgate_signing::Scheme;

use crate::config::Config;

#[derive(Debug, Parser)]
#[command(name = "tollgate")]
#[command(bin_name = "tollgate")]
#[command(about = "Issue time-boxed signed URLs for stored objects", long_about = None)]
pub struct TollgateCli {
    #[command(flatten)]
    pub config: Config,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Issue a signed URL and print it as JSON
    Issue(IssueArgs),
}

#[derive(Debug, Clone, Args)]
pub struct IssueArgs {
    /// Object key to sign
    #[arg(long, conflicts_with = "id", required_unless_present = "id")]
    pub key: Option<String>,

    /// Catalog record id whose object key is signed
    #[arg(long, requires = "catalog")]
    pub id: Option<String>,

    /// JSON file holding an array of catalog records
    #[arg(long, env = "TOLLGATE_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Signing scheme: origin (SigV4) or edge (CloudFront)
    #[arg(long, default_value_t = Scheme::Origin)]
    pub scheme: Scheme,

    /// Validity window in seconds
    #[arg(long, default_value_t = 900)]
    pub ttl: i64,
}
