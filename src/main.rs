//! Smart-wallet co-signer CLI
//!
//! Creates smart wallets, mints a Token-2022 token through them and
//! co-signs the wrapped transaction before broadcasting it.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use smart_wallet_cosigner::chain::{CommitmentLevel, Pubkey};
use smart_wallet_cosigner::cli::{self, RunOptions};
use smart_wallet_cosigner::config::{
    AppConfig, BroadcastConfig, ChainClientConfig, GatewayConfig, DEFAULT_API_VERSION,
    DEFAULT_GATEWAY_URL, DEFAULT_RPC_URL,
};
use smart_wallet_cosigner::cosign::AssemblyPolicy;
use smart_wallet_cosigner::mint::DEFAULT_DECIMALS;

#[derive(Parser)]
#[command(name = "cosigner")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "Co-signing client for smart wallets on Solana", long_about = None)]
struct Cli {
    #[command(flatten)]
    gateway: GatewayArgs,

    /// Solana JSON-RPC endpoint
    #[arg(long, env = "SOLANA_RPC_URL", default_value = DEFAULT_RPC_URL, global = true)]
    rpc_url: String,

    /// Commitment to wait for (processed, confirmed, finalized)
    #[arg(long, default_value = "confirmed", global = true)]
    commitment: CommitmentLevel,

    /// Base58 64-byte secret of the wallet's admin signer
    #[arg(long, env = "WALLET_SECRET_KEY", hide_env_values = true, global = true)]
    wallet_secret_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GatewayArgs {
    /// Wallet service API key
    #[arg(long, env = "CROSSMINT_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// Wallet service base URL
    #[arg(long, env = "CROSSMINT_BASE_URL", default_value = DEFAULT_GATEWAY_URL, global = true)]
    base_url: String,

    /// Wallet service API version
    #[arg(long, env = "CROSSMINT_API_VERSION", default_value = DEFAULT_API_VERSION, global = true)]
    api_version: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a wallet, mint a token through it, co-sign and broadcast
    Run {
        /// Token decimals
        #[arg(short, long, default_value_t = DEFAULT_DECIMALS)]
        decimals: u8,

        /// Owner of the recipient token account (random when omitted)
        #[arg(short, long)]
        recipient: Option<Pubkey>,

        /// Broadcast even if some required signatures are missing
        #[arg(long)]
        allow_partial: bool,

        /// Send without a dry run first
        #[arg(long)]
        skip_simulation: bool,

        /// Retries the RPC node performs when sending
        #[arg(long, default_value = "5")]
        max_retries: usize,

        /// Confirmation poll interval in milliseconds
        #[arg(long, default_value = "500")]
        poll_ms: u64,
    },

    /// Smart wallet operations
    Wallet {
        #[command(subcommand)]
        action: WalletCommands,
    },

    /// Wallet transaction operations
    Tx {
        #[command(subcommand)]
        action: TxCommands,
    },

    /// Generate a new ed25519 key pair
    Keygen {
        /// Write a Solana CLI keypair file instead of printing the secret
        #[arg(short, long)]
        outfile: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum WalletCommands {
    /// Create a smart wallet administered by the admin signer
    Create,

    /// Show a wallet
    Show {
        /// Wallet id or address
        id: String,
    },
}

#[derive(Subcommand)]
enum TxCommands {
    /// Show a submitted transaction and its approvals
    Show {
        /// Wallet address
        #[arg(short, long)]
        wallet: String,

        /// Transaction id
        id: String,
    },
}

impl GatewayArgs {
    fn config(&self) -> Result<GatewayConfig, Box<dyn std::error::Error>> {
        let config = GatewayConfig::new(self.api_key.clone().unwrap_or_default())?
            .with_base_url(self.base_url.clone())?
            .with_api_version(self.api_version.clone());
        Ok(config)
    }
}

fn main() {
    dotenv::dotenv().ok();

    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    // Key generation needs neither network nor credentials
    if let Commands::Keygen { outfile } = &cli.command {
        return cli::cmd_keygen(outfile.as_deref());
    }

    let rt = tokio::runtime::Runtime::new()?;

    match cli.command {
        Commands::Keygen { .. } => unreachable!(),

        Commands::Run {
            decimals,
            recipient,
            allow_partial,
            skip_simulation,
            max_retries,
            poll_ms,
        } => {
            let config = AppConfig {
                gateway: cli.gateway.config()?,
                chain: ChainClientConfig {
                    commitment: cli.commitment,
                    ..ChainClientConfig::default()
                }
                .with_rpc_url(cli.rpc_url)?,
                broadcast: BroadcastConfig {
                    policy: if allow_partial {
                        AssemblyPolicy::PartialFill
                    } else {
                        AssemblyPolicy::Strict
                    },
                    simulate: !skip_simulation,
                    max_retries,
                    poll_interval: Duration::from_millis(poll_ms),
                },
            };
            let admin = cli::load_admin_signer(cli.wallet_secret_key.as_deref())?;
            let options = RunOptions {
                decimals,
                recipient,
            };
            rt.block_on(cli::cmd_run(&config, &admin, &options))?;
        }

        Commands::Wallet { action } => {
            let gateway = cli.gateway.config()?;
            match action {
                WalletCommands::Create => {
                    let admin = cli::load_admin_signer(cli.wallet_secret_key.as_deref())?;
                    rt.block_on(cli::cmd_wallet_create(&gateway, &admin))?;
                }
                WalletCommands::Show { id } => {
                    rt.block_on(cli::cmd_wallet_show(&gateway, &id))?;
                }
            }
        }

        Commands::Tx { action } => {
            let gateway = cli.gateway.config()?;
            match action {
                TxCommands::Show { wallet, id } => {
                    rt.block_on(cli::cmd_tx_show(&gateway, &wallet, &id))?;
                }
            }
        }
    }

    Ok(())
}
