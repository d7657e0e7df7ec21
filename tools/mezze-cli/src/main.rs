//! Mezze CLI - build and check tooling for the restaurant site.
//!
//! Commands:
//! - `mezze build-css` - Compile the critical and deferred stylesheets
//! - `mezze compress` - Write `.br` / `.gz` siblings for static assets
//! - `mezze headers` - Show the response headers a path would get
//! - `mezze sitemap` - Write the page and image sitemaps
//! - `mezze env-check` - Report identity and mail configuration
//! - `mezze mail-test` - Send a test email through the configured providers
//! - `mezze config` - Manage configuration

mod commands;
mod config;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use mezze_observability::{init_tracing, LogFormat};

use commands::{
    BuildCssArgs, CompressArgs, ConfigArgs, EnvCheckArgs, HeadersArgs, MailTestArgs, SitemapArgs,
};

/// Mezze CLI - Build and check the East @ West site
#[derive(Parser)]
#[command(name = "mezze")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile critical and deferred CSS
    BuildCss(BuildCssArgs),

    /// Precompress static assets
    Compress(CompressArgs),

    /// Show resolved cache policy and headers for paths
    Headers(HeadersArgs),

    /// Write the XML sitemaps
    Sitemap(SitemapArgs),

    /// Check identity and mail configuration
    EnvCheck(EnvCheckArgs),

    /// Send a test email
    MailTest(MailTestArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    let format = if cli.json { LogFormat::Json } else { LogFormat::Human };
    let _ = init_tracing(format, filter);

    let output = output::Output::new(cli.verbose, cli.json);

    let config_path = cli.config.as_deref();
    let ctx = context::Context::load(config_path, output)?;

    let result = match cli.command {
        Commands::BuildCss(args) => commands::build_css::run(args, &ctx).await,
        Commands::Compress(args) => commands::compress::run(args, &ctx).await,
        Commands::Headers(args) => commands::headers::run(args, &ctx).await,
        Commands::Sitemap(args) => commands::sitemap::run(args, &ctx).await,
        Commands::EnvCheck(args) => commands::env_check::run(args, &ctx).await,
        Commands::MailTest(args) => commands::mail_test::run(args, &ctx).await,
        Commands::Config(args) => commands::config::run(args, &ctx).await,
    };

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
