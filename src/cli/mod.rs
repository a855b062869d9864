pub mod commands;
pub mod utils;

use clap::{Args, Parser};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::config::BootstrapConfig;

#[derive(Args, Debug, Clone, Default)]
pub struct OutputArgs {
    #[arg(long, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, help = "Output in JSON format")]
    pub json: bool,
}

#[derive(Parser, Debug)]
#[command(name = "create-admin")]
#[command(about = "Create or fetch the administrator account, grant admin claims and write its profile")]
#[command(version)]
pub struct CreateAdminCli {
    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Parser, Debug)]
#[command(name = "fetch-admin-token")]
#[command(about = "Sign in as the administrator and print a verified ID token")]
#[command(version)]
pub struct FetchTokenCli {
    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Parser, Debug)]
#[command(name = "set-admin-claims")]
#[command(about = "Grant admin custom claims to an existing user")]
#[command(version)]
pub struct SetClaimsCli {
    #[arg(help = "User uid (defaults to ADMIN_TARGET_UID)")]
    pub uid: Option<String>,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_args(args: &OutputArgs) -> Self {
        if args.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Parse arguments; usage errors exit 1, `--help` and `--version` exit 0.
pub fn parse_args<T: Parser>() -> T {
    match T::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            std::process::exit(usage_exit_code(&e));
        }
    }
}

pub fn usage_exit_code(e: &clap::Error) -> i32 {
    if e.use_stderr() {
        1
    } else {
        0
    }
}

/// Shared process setup: `.env`, logging to stderr, configuration.
pub fn init() -> anyhow::Result<BootstrapConfig> {
    // Load .env if present so local runs pick up ADMIN_EMAIL, FIREBASE_API_KEY, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    Ok(BootstrapConfig::from_env()?)
}

/// Print the failure and exit 1, or return normally on success.
pub fn finish(result: anyhow::Result<()>) {
    if let Err(e) = result {
        match std::env::var("CLI_VERBOSE").as_deref() {
            Ok("true") | Ok("1") => eprintln!("Error: {e:?}"),
            _ => eprintln!("Error: {e}"),
        }
        std::process::exit(1);
    }
}
