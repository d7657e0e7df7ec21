//! CLI command implementations.

pub mod build_css;
pub mod compress;
pub mod config;
pub mod env_check;
pub mod headers;
pub mod sitemap;

use clap::{Args, Subcommand};

/// Arguments for the build-css command.
#[derive(Args)]
pub struct BuildCssArgs {
    /// Critical stylesheet source (default: build.critical_src).
    #[arg(long)]
    pub critical: Option<String>,

    /// Deferred stylesheet source (default: build.deferred_src).
    #[arg(long)]
    pub deferred: Option<String>,

    /// Output directory (default: <public_dir>/css).
    #[arg(short, long)]
    pub out_dir: Option<String>,

    /// Keep whitespace and skip minification.
    #[arg(long)]
    pub dev: bool,

    /// Omit the build banner comment.
    #[arg(long)]
    pub no_banner: bool,
}

/// Arguments for the compress command.
#[derive(Args)]
pub struct CompressArgs {
    /// Directory to scan (default: build.public_dir).
    pub dir: Option<String>,

    /// Report what would be written without writing.
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the headers command.
#[derive(Args)]
pub struct HeadersArgs {
    /// Request paths, optionally with a query string.
    #[arg(required = true)]
    pub paths: Vec<String>,

    /// Accept-Encoding header to negotiate with.
    #[arg(short, long, default_value = "gzip, deflate, br")]
    pub accept_encoding: String,
}

/// Arguments for the sitemap command.
#[derive(Args)]
pub struct SitemapArgs {
    /// Output directory (default: build.public_dir).
    #[arg(short, long)]
    pub out_dir: Option<String>,

    /// Print to stdout instead of writing files.
    #[arg(long)]
    pub stdout: bool,
}

/// Arguments for the env-check command.
#[derive(Args)]
pub struct EnvCheckArgs {
    /// Exit with an error when anything is missing.
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for the mail-test command.
#[derive(Args)]
pub struct MailTestArgs {
    /// Recipient address.
    #[arg(long)]
    pub to: String,

    /// Subject line.
    #[arg(short, long, default_value = "East @ West - test email")]
    pub subject: String,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration.
    Show,
    /// Write a default mezze.toml.
    Init {
        /// Overwrite without asking.
        #[arg(short, long)]
        force: bool,
    },
}
