use anyhow::Result;
use clap::Parser;
use tollgate::cli::TollgateCli;
use tracing::error;

pub fn main() -> Result<()> {
    tollgate::logging::init();

    let cli = TollgateCli::parse();
    let output = tollgate::run(cli).inspect_err(|err| error!("{:#}", err))?;
    println!("{}", output);

    Ok(())
}
