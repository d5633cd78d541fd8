//! Engage CLI - operator tool for claim verification and minting.

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

mod commands;
mod exit_codes;
mod utils;

use exit_codes::ExitCode;

const AFTER_HELP: &str = "\
Exit codes:
  0   Success
  1   General error
  64  Invalid arguments
  65  Claim rejected (signature, keywords or already claimed)
  66  Input file or record not found
  69  Chain node, IPFS or database unavailable
  78  Missing configuration

Domain settings come from EIP712_NAME, EIP712_VERSION, EIP712_SALT,
CHAIN_ID and NFT_VERIFYING_CONTRACT.";

#[derive(Parser)]
#[command(name = "engage")]
#[command(author, version, about = "Proof-of-engagement claim verification and minting", long_about = None)]
#[command(after_help = AFTER_HELP)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true, conflicts_with = "quiet")]
    verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// When to color output
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto, global = true)]
    color: ColorChoice,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the EIP-712 document a wallet signs to claim a catalog entry
    Payload {
        /// Catalog id (xid)
        #[arg(value_name = "CATALOG_ID")]
        catalog_id: String,

        /// Claiming wallet address
        #[arg(value_name = "WALLET")]
        wallet: String,
    },

    /// Check a claim signature offline
    Verify {
        /// Catalog id (xid)
        #[arg(value_name = "CATALOG_ID")]
        catalog_id: String,

        /// Claiming wallet address
        #[arg(long)]
        wallet: String,

        /// 65-byte r||s||v signature in hex
        #[arg(long)]
        signature: String,
    },

    /// Sign a claim with a local wallet key (development only)
    Sign {
        /// Catalog id (xid)
        #[arg(value_name = "CATALOG_ID")]
        catalog_id: String,

        /// File holding the hex private key
        #[arg(long, value_name = "FILE")]
        key_file: PathBuf,
    },

    /// Check claim keywords against a catalog keyword list
    Keywords {
        /// Comma-separated catalog keywords
        #[arg(long)]
        catalog: String,

        /// Keywords supplied by the claimant
        #[arg(value_name = "WORD", required = true)]
        words: Vec<String>,
    },

    /// Decode a catalog id into its on-chain category id
    Category {
        #[arg(value_name = "CATALOG_ID")]
        catalog_id: String,
    },

    /// Verify and mint a claim request against a catalog entry
    Mint {
        /// Catalog entry (JSON)
        #[arg(long, value_name = "FILE")]
        catalog: PathBuf,

        /// Claim request (JSON)
        #[arg(long, value_name = "FILE")]
        request: PathBuf,
    },

    /// Show a wallet's claims with token ids from chain receipts
    Previews {
        #[arg(value_name = "WALLET")]
        wallet: String,

        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// List the most recent claims
    Claims {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Show the broker wallet balance
    Balance,
}

fn init_tracing(verbose: u8, quiet: bool) {
    let default_level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let quiet = cli.quiet;
    match cli.command {
        Commands::Payload { catalog_id, wallet } => {
            commands::payload::execute(&catalog_id, &wallet)
        }
        Commands::Verify {
            catalog_id,
            wallet,
            signature,
        } => commands::verify::execute(&catalog_id, &wallet, &signature, quiet),
        Commands::Sign {
            catalog_id,
            key_file,
        } => commands::sign::execute(&catalog_id, &key_file, quiet),
        Commands::Keywords { catalog, words } => {
            commands::keywords::execute(&catalog, words, quiet)
        }
        Commands::Category { catalog_id } => commands::category::execute(&catalog_id),
        Commands::Mint { catalog, request } => {
            commands::mint::execute(&catalog, &request, quiet).await
        }
        Commands::Previews { wallet, limit } => {
            commands::claims::previews(&wallet, limit, quiet).await
        }
        Commands::Claims { limit } => commands::claims::recent(limit, quiet).await,
        Commands::Balance => commands::claims::balance(quiet).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.color {
        ColorChoice::Always => colored::control::set_override(true),
        ColorChoice::Never => colored::control::set_override(false),
        ColorChoice::Auto => {}
    }
    init_tracing(cli.verbose, cli.quiet);

    let exit = match run(cli).await {
        Ok(()) => ExitCode::success(),
        Err(err) => ExitCode::from_anyhow(&err),
    };

    if let Some(message) = exit.message {
        eprintln!("{} {message}", "Error:".red().bold());
    }
    std::process::exit(exit.code);
}
