//! Stargrid CLI - serve or render avatar collages.

use anyhow::{bail, Context as _};
use clap::{Parser, Subcommand};
use stargrid::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "stargrid", version, about)]
struct Cli {
    /// TOML configuration file; environment variables override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the collages, then serve them and keep them fresh.
    Serve,
    /// Build the collages once and write them as PNG files.
    Render {
        /// Output directory.
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    log::info!(
        "stargrid v{} for {}/{} ({} collection(s))",
        stargrid::VERSION,
        config.repository.owner,
        config.repository.name,
        config.collections.len()
    );

    let refresher = Arc::new(build_refresher(&config));

    match cli.cmd {
        Command::Serve => serve(config, refresher),
        Command::Render { out } => render(&refresher, &out),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => Config::default(),
    };
    config.apply_env().context("reading environment overrides")?;
    config.validate().context("validating configuration")?;
    Ok(config)
}

fn build_refresher(config: &Config) -> Refresher {
    let fetcher = Arc::new(HttpFetcher::from_config(config));
    let listing = Arc::new(GithubListing::from_config(config));
    let collector = FanOutCollector::from_config(fetcher, config);
    Refresher::new(config, listing, collector)
}

fn serve(config: Config, refresher: Arc<Refresher>) -> anyhow::Result<()> {
    // The first cycle runs before binding; failures still leave the server up
    // and answering 500 until a later cycle succeeds.
    let delay = refresher.tick();
    let slots = refresher.slots();
    Arc::clone(&refresher)
        .spawn(delay)
        .context("starting refresh thread")?;

    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    runtime
        .block_on(stargrid::server::serve(&config.server, slots))
        .context("HTTP server stopped")
}

fn render(refresher: &Refresher, out: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(out).with_context(|| format!("creating {}", out.display()))?;

    let report = refresher.run_cycle();
    let slots = refresher.slots();
    for name in slots.names() {
        let Some(slot) = slots.get(name) else {
            continue;
        };
        let (Some(composite), Some(png)) = (slot.snapshot(), slot.png()) else {
            continue;
        };
        let path = out.join(format!("{}.png", name));
        std::fs::write(&path, &png).with_context(|| format!("writing {}", path.display()))?;
        log::info!(
            "wrote {} ({}x{}, {} avatar(s))",
            path.display(),
            composite.width(),
            composite.height(),
            composite.tile_count()
        );
    }

    let failed: Vec<_> = report.failures().map(|o| o.name.as_str()).collect();
    if !failed.is_empty() {
        bail!("failed to render: {}", failed.join(", "));
    }
    Ok(())
}
