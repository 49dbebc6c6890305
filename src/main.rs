// site-listings/src/main.rs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};

use site_listings::{config::Config, site, ConfigManager};

#[derive(Parser)]
#[command(name = "site-listings", version, about = "Render the lecture archive and officer roster widgets")]
struct Args {
    /// Workspace whose `.site-listings/*.yaml` is merged into the config
    #[arg(long, global = true, default_value = ".")]
    workspace: PathBuf,
    /// Local static-site directory to read datasets from
    #[arg(long, global = true)]
    site_root: Option<PathBuf>,
    /// Fetch datasets over HTTP from this base URL instead of the site root
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Page hosting the widgets, relative to the site root / base URL
    #[arg(long, global = true)]
    page: Option<String>,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Load both widgets once and write their HTML fragments
    Render {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Load both widgets and print a JSON summary; exits 1 if the lecture dataset is rejected
    Check,
    /// Render, then render again whenever the configuration changes
    Watch {
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut cm = ConfigManager::load(&args.workspace)?;
    let mut overlay = Config::default();
    overlay.site.root = args.site_root.clone();
    overlay.site.base_url = args.base_url.clone();
    overlay.site.page = args.page.clone();
    if let Cmd::Render { out: Some(out) } | Cmd::Watch { out: Some(out) } = &args.cmd {
        overlay.site.out_dir = Some(out.clone());
    }
    cm.apply_runtime_overlay(overlay)?;

    match args.cmd {
        Cmd::Render { .. } => render_once(&cm.get()).await,
        Cmd::Check => check(&cm.get()).await,
        Cmd::Watch { .. } => {
            cm.start_watch()?;
            watch(&cm).await
        }
    }
}

async fn render_once(cfg: &Config) -> Result<()> {
    let fetcher = site::fetcher_for(cfg)?;
    let page = site::host_page(cfg);
    let rendered = site::render(cfg, fetcher, &page).await;
    let out_dir = cfg.out_dir();
    for p in rendered.write_fragments(&out_dir)? {
        info!(file = %p.display(), "wrote fragment");
    }
    Ok(())
}

async fn check(cfg: &Config) -> Result<()> {
    let fetcher = site::fetcher_for(cfg)?;
    let page = site::host_page(cfg);
    let rendered = site::render(cfg, fetcher, &page).await;
    let text = serde_json::to_string_pretty(&rendered.summary()).context("serialize summary")?;
    println!("{text}");
    if rendered.lectures_failed() {
        std::process::exit(1);
    }
    Ok(())
}

async fn watch(cm: &ConfigManager) -> Result<()> {
    let mut rx = cm.subscribe();
    render_once(&cm.get()).await?;
    loop {
        tokio::select! {
            changed = rx.recv() => match changed {
                Ok(cfg) => {
                    info!("configuration changed; re-rendering");
                    if let Err(e) = render_once(&cfg).await { warn!("render failed: {e:#}"); }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => warn!(skipped = n, "config updates lagged"),
                Err(tokio::sync::broadcast::error::RecvError::Closed) => return Ok(()),
            },
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                return Ok(());
            }
        }
    }
}
