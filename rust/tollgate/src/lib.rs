//! Command line front end for [`tollgate_signing`].

pub mod catalog;
pub mod cli;
pub mod config;
pub mod logging;

use anyhow::{Context, Result};
use chrono::TimeDelta;
use tollgate_signing::{Clock, SignedUrlService};
use tracing::info;

use crate::catalog::{Catalog, MemoryCatalog, ObjectRecord};
use crate::cli::{Command, IssueArgs, TollgateCli};

/// Run a parsed command line, returning what should be printed on stdout.
pub fn run(cli: TollgateCli) -> Result<String> {
    match cli.command {
        Command::Issue(args) => {
            let service = cli.config.service()?;
            let record = issue(&service, &args)?;
            Ok(serde_json::to_string_pretty(&record)?)
        }
    }
}

/// Resolve the object named by `args` and issue a signed URL for it.
pub fn issue<C: Clock>(service: &SignedUrlService<C>, args: &IssueArgs) -> Result<ObjectRecord> {
    let mut record = match (&args.key, &args.id) {
        (Some(key), _) => ObjectRecord::for_key(key),
        (None, Some(id)) => {
            let path = args.catalog.as_ref().context("--id requires --catalog")?;
            let catalog = MemoryCatalog::load(path)
                .with_context(|| format!("loading catalog {}", path.display()))?;
            catalog.resolve(id)?
        }
        (None, None) => anyhow::bail!("either --key or --id is required"),
    };

    let ttl = TimeDelta::try_seconds(args.ttl)
        .with_context(|| format!("ttl of {}s is out of range", args.ttl))?;
    let signed = service
        .issue(&record.key, ttl, args.scheme)
        .with_context(|| format!("signing {:?}", record.key))?;

    info!(
        scheme = %args.scheme,
        key = %record.key,
        expires = signed.expires.timestamp(),
        "Issued signed URL"
    );

    record.url = Some(signed.url.to_string());
    record.expires = Some(signed.expires);
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::config;
    use crate::logging::setup_test_logging;
    use chrono::{TimeZone, Utc};
    use std::io::Write;
    use tollgate_signing::{ErrorKind, FixedClock, Scheme, SignError};

    fn service() -> SignedUrlService<FixedClock> {
        let time = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        config()
            .service()
            .unwrap()
            .with_clock(FixedClock::new(time))
    }

    fn args(key: Option<&str>, scheme: Scheme, ttl: i64) -> IssueArgs {
        IssueArgs {
            key: key.map(String::from),
            id: None,
            catalog: None,
            scheme,
            ttl,
        }
    }

    #[test]
    fn it_issues_for_a_bare_key() {
        setup_test_logging();
        let record = issue(&service(), &args(Some("golang"), Scheme::Edge, 600)).unwrap();

        assert_eq!(record.key, "golang");
        assert!(
            record
                .url
                .as_deref()
                .unwrap()
                .starts_with("https://cdn.example/golang?Expires=1704067800&")
        );
        assert_eq!(record.expires.unwrap().timestamp(), 1_704_067_800);
    }

    #[test]
    fn it_issues_for_a_catalog_record() {
        setup_test_logging();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id": "files:1", "key": "golang", "name": "Gopher"}}]"#
        )
        .unwrap();

        let args = IssueArgs {
            id: Some("files:1".into()),
            catalog: Some(file.path().to_path_buf()),
            ..args(None, Scheme::Origin, 900)
        };
        let record = issue(&service(), &args).unwrap();

        assert_eq!(record.id, "files:1");
        assert_eq!(record.name, "Gopher");
        assert!(
            record
                .url
                .as_deref()
                .unwrap()
                .starts_with("https://cloudfront-demo-asset.s3.us-east-1.amazonaws.com/golang?")
        );

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["expires"], 1_704_068_100);
    }

    #[test]
    fn it_reports_unknown_catalog_ids() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[]").unwrap();

        let args = IssueArgs {
            id: Some("files:404".into()),
            catalog: Some(file.path().to_path_buf()),
            ..args(None, Scheme::Origin, 900)
        };
        let error = issue(&service(), &args).unwrap_err();
        assert!(error.to_string().contains("files:404"));
    }

    #[test]
    fn it_surfaces_signing_errors() {
        let error = issue(&service(), &args(Some("golang"), Scheme::Origin, 0)).unwrap_err();
        let cause = error.downcast_ref::<SignError>().unwrap();
        assert_eq!(cause.kind(), ErrorKind::ExpiryOutOfRange);
        assert_eq!(cause.kind().status(), 400);
    }
}
