use anyhow::Result;
use clap::Parser;
use sb3doc_rs_core::cli::Args;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    sb3doc_rs_core::run_cli(&args)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
