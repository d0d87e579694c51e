use clap::Parser;
use screening_core::memory::MemoryPage;
use screening_r::config::ConfigLoader;
use screening_r::session;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Run a screening agent over a page fixture and connect it to a controller.
#[derive(Parser, Debug)]
#[command(name = "screening-r", version, about, long_about = None)]
struct Args {
    /// Controller origin (overrides the config file), e.g. http://127.0.0.1:9001
    #[arg(short, long)]
    controller: Option<String>,

    /// JSON page fixture to serve; an empty page when omitted
    #[arg(short, long)]
    page: Option<PathBuf>,

    /// Config file; defaults to ./screening.yaml, then ~/.screening/config.yaml
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    // The agent is single-threaded; deferred input events need a LocalSet.
    let local = tokio::task::LocalSet::new();
    local.block_on(&runtime, run(args))
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => ConfigLoader::load_from(path).await?,
        None => ConfigLoader::load_default().await?,
    };
    if let Some(controller) = args.controller {
        config.transport.controller = controller;
    }

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .init();

    let page = match &args.page {
        Some(path) => MemoryPage::from_json_str(&tokio::fs::read_to_string(path).await?)?,
        None => MemoryPage::new(""),
    };

    session::run(&config, page).await?;
    Ok(())
}
