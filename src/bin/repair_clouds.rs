use std::io::Read;

use clap::Parser;
use operator::{Error, cacert::{CaCertRepairer, DEFAULT_CACERT_PATH}, telemetry};
use tracing::*;

/// Point every `cacert` of a clouds.yaml at the trusted CA bundle
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// clouds.yaml to repair, `-` for stdin
    input: String,

    /// Canonical CA bundle path
    #[arg(long, default_value = DEFAULT_CACERT_PATH)]
    cacert_path: String,

    /// Output file, stdout when omitted
    #[arg(short, long)]
    output: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    telemetry::init().await;

    let clouds = if args.input == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).map_err(Error::IoError)?;
        buf
    } else {
        std::fs::read_to_string(&args.input).map_err(Error::IoError)?
    };

    let outcome = CaCertRepairer::new(args.cacert_path).repair_report(&clouds)?;
    if outcome.changed() {
        info!("Repaired cacert of {}", outcome.corrected.join(", "));
    } else {
        info!("Nothing to repair");
    }

    match args.output {
        Some(path) => std::fs::write(path, outcome.document).map_err(Error::IoError)?,
        None => print!("{}", outcome.document),
    }
    Ok(())
}
