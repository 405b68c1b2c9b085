//! Command-line definitions.
use std::path::PathBuf;

use blogwalk_core::WalkOptions;
use clap::{Args, Parser, Subcommand};

/// Walks a blog's post feed and saves the media it finds.
#[derive(Parser, Debug)]
#[command(name = "blogwalk", version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download every image and video poster of a blog into a directory.
    Download(DownloadArgs),
}

#[derive(Args, Debug, Clone)]
pub struct DownloadArgs {
    /// Blog to walk.
    pub blog: String,

    /// Directory the media files are written to (created if missing).
    pub directory: PathBuf,

    /// Page to start from.
    #[arg(long, default_value_t = 1)]
    pub page: u32,

    /// Stop after fetching this many pages.
    #[arg(long)]
    pub max_index: Option<u32>,

    /// Do not fetch pages numbered higher than this.
    #[arg(long)]
    pub max_page: Option<u32>,

    /// Stop after the first page.
    #[arg(long)]
    pub no_auto_advance: bool,

    /// Skip media whose file already exists (default, unless configured otherwise).
    #[arg(long, conflicts_with = "no_skip_existing")]
    pub skip_existing: bool,

    /// Download media even when the file already exists.
    #[arg(long)]
    pub no_skip_existing: bool,

    /// Stop the walk when one of these posts is reached.
    #[arg(long = "until-post", value_name = "ID")]
    pub until_post: Vec<String>,

    /// RON config file.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[arg(long, value_name = "URL")]
    pub proxy_url: Option<String>,

    #[arg(long, value_name = "KEY")]
    pub api_key: Option<String>,

    /// One of off, error, warn, info, debug, trace.
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// No terminal logging.
    #[arg(short, long)]
    pub quiet: bool,
}

impl DownloadArgs {
    pub fn walk_options(&self) -> WalkOptions {
        WalkOptions {
            start_page: self.page,
            auto_advance: !self.no_auto_advance,
            max_pages: self.max_page,
            max_index: self.max_index,
            until_post_ids: self.until_post.clone(),
            ..WalkOptions::default()
        }
    }
}
