mod builder;
mod client;
mod contract;
mod error;
mod multisig;
mod tx;
mod types;

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ed25519_dalek::SigningKey;
use rand::{rngs::OsRng, RngCore};

use crate::builder::{ReferralTxBuilder, Tier, TierAction};
use crate::client::{derive_address, AdminSigner, ChainClient, RpcClient};
use crate::contract::{CapSet, ContractRef, DEFAULT_MANIFEST};
use crate::error::AdminError;
use crate::multisig::{build_multisig_tx, MULTI_SIG_ADDRESS};
use crate::tx::{CallArg, DispatchOutcome, DispatchStrategy, TxBatch};

const DEFAULT_ENDPOINT: &str = "https://fullnode.mainnet.blocknet.dev:443";

/// Initial tier table, seeded while the program still ran under the
/// single-key admin (V1 capability).
const INITIAL_TIERS: [Tier; 6] = [
    Tier::new(0, 10, 10),
    Tier::new(100, 15, 10),
    Tier::new(1_000, 20, 10),
    Tier::new(10_000, 30, 10),
    Tier::new(100_000, 40, 10),
    Tier::new(1_000_000, 50, 10),
];

/// The table currently live on-chain, keyed in base units (1e9 per whole
/// stake token). Must match the deployed rows exactly or the removes abort.
const OLD_TIERS: [Tier; 6] = [
    Tier::new(0, 10, 10),
    Tier::new(100_000_000_000, 15, 12),
    Tier::new(1_000_000_000_000, 20, 14),
    Tier::new(10_000_000_000_000, 25, 16),
    Tier::new(100_000_000_000_000, 30, 18),
    Tier::new(1_000_000_000_000_000, 40, 20),
];

/// Replacement table applied by `update-tiers`.
const NEW_TIERS: [Tier; 6] = [
    Tier::new(0, 5, 5),
    Tier::new(100_000_000_000, 6, 7),
    Tier::new(1_000_000_000_000, 9, 12),
    Tier::new(10_000_000_000_000, 18, 25),
    Tier::new(100_000_000_000_000, 32, 50),
    Tier::new(1_000_000_000_000_000, 40, 60),
];

/// Target of the next `pump-version` run. Edit before invoking.
const NEW_VERSION: u64 = 5;

#[derive(Parser)]
#[command(
    name = "referral-admin",
    version,
    about = "Admin transactions for the on-chain borrow-referral program"
)]
struct Cli {
    /// Fullnode JSON-RPC endpoint
    #[arg(long, global = true, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Deployment manifest naming the package and shared object ids
    #[arg(long, global = true, default_value = DEFAULT_MANIFEST)]
    manifest: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Seed the initial referral tier table (single-key admin, V1 capability)
    AddTiers,
    /// Replace the live tier table: remove every old row, then add the new ones
    UpdateTiers,
    /// Prepare a contract version bump for the multisig holders
    PumpVersion,
    /// Transfer the V1 admin capability to the multisig account
    MigrateToMultisig,
    /// Mint the V2 admin capability and hand it to the multisig account
    UpgradeAdminCap,
    /// Prepare and dry-run a package upgrade authorization
    UpgradePackage,
    /// Generate a fresh admin keypair
    Keygen {
        /// Directory receiving sk.hex and address.hex
        #[arg(long)]
        out_dir: PathBuf,
    },
    /// Print the address derived from SECRET_KEY
    Whoami,
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(&cli) {
        eprintln!("error: {err}");
        std::process::exit(2);
    }
}

fn run(cli: &Cli) -> Result<(), AdminError> {
    match &cli.command {
        Command::AddTiers => cmd_add_tiers(cli),
        Command::UpdateTiers => cmd_update_tiers(cli),
        Command::PumpVersion => cmd_pump_version(cli),
        Command::MigrateToMultisig => cmd_migrate_to_multisig(cli),
        Command::UpgradeAdminCap => cmd_upgrade_admin_cap(cli),
        Command::UpgradePackage => cmd_upgrade_package(cli),
        Command::Keygen { out_dir } => cmd_keygen(out_dir),
        Command::Whoami => cmd_whoami(),
    }
}

fn load(cli: &Cli) -> Result<(ContractRef, RpcClient), AdminError> {
    let cref = ContractRef::load(&cli.manifest)?;
    let client = RpcClient::new(&cli.endpoint)?;
    Ok((cref, client))
}

/// Sign with SECRET_KEY, submit, and log the receipt.
fn submit_direct(
    label: &str,
    batch: &mut TxBatch,
    client: &dyn ChainClient,
) -> Result<(), AdminError> {
    let signer = AdminSigner::from_env();
    match batch.dispatch(DispatchStrategy::Direct(&signer), client)? {
        DispatchOutcome::Executed(receipt) => {
            println!(
                "{label} executed → digest={} status={}",
                receipt.digest, receipt.status
            );
            println!("{}", serde_json::to_string_pretty(&receipt.raw)?);
            Ok(())
        }
        DispatchOutcome::Encoded(_) => unreachable!("direct dispatch always executes"),
    }
}

fn cmd_add_tiers(cli: &Cli) -> Result<(), AdminError> {
    let (cref, client) = load(cli)?;
    let builder = ReferralTxBuilder::new(&cref, CapSet::V1);

    let mut batch = TxBatch::new();
    builder.append_for_each(&mut batch, &INITIAL_TIERS, TierAction::AddTier);
    submit_direct("add-tiers", &mut batch, &client)
}

fn cmd_update_tiers(cli: &Cli) -> Result<(), AdminError> {
    let (cref, client) = load(cli)?;
    let builder = ReferralTxBuilder::new(&cref, CapSet::V2);

    let mut batch = TxBatch::new();
    builder.migrate_tiers(&mut batch, &OLD_TIERS, &NEW_TIERS);
    submit_direct("update-tiers", &mut batch, &client)
}

fn cmd_pump_version(cli: &Cli) -> Result<(), AdminError> {
    let (cref, client) = load(cli)?;
    let builder = ReferralTxBuilder::new(&cref, CapSet::V2);

    let mut batch = TxBatch::new();
    builder.append_for_each(&mut batch, &[], TierAction::SetVersion(NEW_VERSION));
    let b64 = build_multisig_tx(&mut batch, &client)?;
    println!("pump-version v{NEW_VERSION} prepared for multisig → {b64}");
    Ok(())
}

fn cmd_migrate_to_multisig(cli: &Cli) -> Result<(), AdminError> {
    let (cref, client) = load(cli)?;

    let mut batch = TxBatch::new();
    batch.transfer_objects(vec![CallArg::Object(cref.admin_cap)], MULTI_SIG_ADDRESS);
    submit_direct("migrate-to-multisig", &mut batch, &client)
}

fn cmd_upgrade_admin_cap(cli: &Cli) -> Result<(), AdminError> {
    let (cref, client) = load(cli)?;
    let builder = ReferralTxBuilder::new(&cref, CapSet::V1);

    let mut batch = TxBatch::new();
    let minted = builder.upgrade_admin_cap(&mut batch);
    batch.transfer_objects(vec![minted], MULTI_SIG_ADDRESS);
    submit_direct("upgrade-admin-cap", &mut batch, &client)
}

fn cmd_upgrade_package(cli: &Cli) -> Result<(), AdminError> {
    let (cref, client) = load(cli)?;
    let builder = ReferralTxBuilder::new(&cref, CapSet::V2);

    let mut batch = TxBatch::new();
    builder.authorize_upgrade(&mut batch);
    let b64 = build_multisig_tx(&mut batch, &client)?;

    let dry = client.dry_run(&b64)?;
    println!("dry run:\n{}", serde_json::to_string_pretty(&dry)?);
    println!("upgrade tx (unsigned, base64) → {b64}");
    Ok(())
}

fn cmd_keygen(out_dir: &PathBuf) -> Result<(), AdminError> {
    fs::create_dir_all(out_dir)
        .map_err(|e| AdminError::Config(format!("cannot create {}: {e}", out_dir.display())))?;

    let mut sk_bytes = [0u8; 32];
    OsRng.fill_bytes(&mut sk_bytes);
    let sk = SigningKey::from_bytes(&sk_bytes);
    let address = derive_address(sk.verifying_key().as_bytes());

    let write = |name: &str, contents: String| {
        fs::write(out_dir.join(name), contents)
            .map_err(|e| AdminError::Config(format!("cannot write {name}: {e}")))
    };
    write("sk.hex", hex::encode(sk_bytes))?;
    write("address.hex", address.to_hex())?;
    println!("keypair written → {}", out_dir.display());
    Ok(())
}

fn cmd_whoami() -> Result<(), AdminError> {
    println!("{}", AdminSigner::from_env().address()?);
    Ok(())
}
