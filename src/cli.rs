use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::AppConfig;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Config file (default: ~/.config/epaper-app/config.yaml when present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Root of the page cache.
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Publisher site serving `Repository/...`.
    #[arg(long, global = true)]
    pub site_url: Option<String>,

    /// Archive page listing publication and edition codes.
    #[arg(long, global = true)]
    pub archive_url: Option<String>,

    /// Minimum pause before each image request (politeness).
    #[arg(long, global = true)]
    pub delay_min_ms: Option<u64>,

    /// Maximum pause before each image request (politeness).
    #[arg(long, global = true)]
    pub delay_max_ms: Option<u64>,

    /// High-res attempts per page before falling back to low-res.
    #[arg(long, global = true)]
    pub highres_attempts: Option<u32>,

    /// Download low-res pages even when high-res succeeded.
    #[arg(long, global = true)]
    pub always_lowres: bool,

    /// Debug logging (unless RUST_LOG is set).
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

impl GlobalArgs {
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(cache_dir) = &self.cache_dir {
            config.cache_dir = cache_dir.clone();
        }
        if let Some(site_url) = &self.site_url {
            config.site_url = site_url.clone();
        }
        if let Some(archive_url) = &self.archive_url {
            config.archive_url = archive_url.clone();
        }
        if let Some(min) = self.delay_min_ms {
            config.http.request_delay_min_ms = min;
        }
        if let Some(max) = self.delay_max_ms {
            config.http.request_delay_max_ms = max;
        }
        if let Some(attempts) = self.highres_attempts {
            config.http.highres_attempts = attempts;
        }
        if self.always_lowres {
            config.http.always_fetch_lowres = true;
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Download one edition's page images into the cache.
    Download(DownloadArgs),
    /// List publication or edition codes from the archive page.
    Catalog {
        #[command(subcommand)]
        command: CatalogCommand,
    },
    /// Print the dates offered for download.
    Dates,
    /// List editions already present in the cache.
    Cached,
}

#[derive(Debug, Args)]
pub struct DownloadArgs {
    /// Publication code (default: `defaults.publication` from the config).
    #[arg(long)]
    pub publication: Option<String>,

    /// Edition code (default: `defaults.edition` from the config).
    #[arg(long)]
    pub edition: Option<String>,

    /// Edition date as YYYY-MM-DD (default: today).
    #[arg(long)]
    pub date: Option<String>,

    /// Check both codes against the archive page before downloading.
    #[arg(long)]
    pub verify_codes: bool,
}

#[derive(Debug, Subcommand)]
pub enum CatalogCommand {
    Publications,
    Editions(EditionsArgs),
}

#[derive(Debug, Args)]
pub struct EditionsArgs {
    #[arg(long)]
    pub publication: String,
}
