//! Clap derive structures for the `mobilelink` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// mobilelink -- query Generac MobileLink generators from the terminal
#[derive(Debug, Parser)]
#[command(
    name = "mobilelink",
    version,
    about = "Query Generac MobileLink generators from the command line",
    long_about = "A small CLI over the MobileLink cloud API.\n\n\
        Authenticates with a bearer token, browser cookies, or a\n\
        username/password account, then fetches every registered\n\
        generator and its detail record.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Path to a TOML config file (default: the platform config dir)
    #[arg(long, env = "MOBILELINK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Account email (overrides config)
    #[arg(long, short = 'u', env = "MOBILELINK_USERNAME", global = true)]
    pub username: Option<String>,

    /// Account password
    #[arg(long, env = "MOBILELINK_PASSWORD", global = true, hide_env = true)]
    pub password: Option<String>,

    /// Raw browser cookie header for the app.mobilelinkgen.com domain
    #[arg(long, env = "MOBILELINK_COOKIES", global = true, hide_env = true)]
    pub cookies: Option<String>,

    /// Pre-authenticated bearer token from the mobile app
    #[arg(long, env = "MOBILELINK_TOKEN", global = true, hide_env = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(long, short = 'o', default_value = "table", global = true)]
    pub output: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// Pretty-printed JSON
    Json,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate the configured credentials against the API
    Login,
    /// Fetch every generator and its detail record
    Fetch,
    /// Dump raw per-apparatus detail JSON (protocol debugging)
    Dump,
}
