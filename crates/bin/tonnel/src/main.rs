use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

use tonnel_core::keys::{find_key_file, read_key_file};
use tonnel_core::relay::relay_fee_amount;
use tonnel_core::units::{self, format_amount, parse_amount};
use tonnel_core::{
    Address, AssetKind, ClientConfig, LeafCache, MerkleTree, PoolRegistry, PrivateKey,
    RELAYER_FEES,
};

#[derive(Parser, Debug)]
#[command(name = "tonnel")]
#[command(about = "tonnel pool keys and leaf caches", long_about = None)]
struct Cli {
    /// client config (toml)
    #[arg(long, global = true, env = "TONNEL_CONFIG")]
    config: Option<PathBuf>,

    /// leaf cache directory, overrides the config
    #[arg(long, global = true, env = "TONNEL_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// generate a deposit secret for a pool
    Keygen {
        /// TON or TONNEL
        #[arg(long, default_value = "TON")]
        asset: AssetKind,

        /// pool denomination in whole units
        #[arg(long)]
        amount: String,

        /// also write the secret to a PrivateKey file in this directory
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// decode a secret and show its commitment
    Inspect {
        /// secret string, read from the key directory when omitted
        secret: Option<String>,

        /// where to look for PrivateKey*.txt files
        #[arg(long, default_value = "key")]
        key_dir: PathBuf,
    },

    /// list known pools and relay fee tiers
    Pools,

    /// inspect or reset a pool's leaf cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    /// show cached leaves, cursor and the root they build
    Show {
        /// pool address, raw or friendly
        #[arg(long)]
        pool: Address,
    },
    /// delete the cache so the next sync rescans from genesis
    Clear {
        #[arg(long)]
        pool: Address,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tonnel=info,tonnel_core=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ClientConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ClientConfig::default(),
    };
    if let Some(dir) = cli.cache_dir {
        config.cache_dir = dir;
    }
    let registry = config.registry().context("pool registry")?;

    match cli.command {
        Commands::Keygen {
            asset,
            amount,
            out_dir,
        } => keygen(&registry, asset, &amount, out_dir.as_deref()),
        Commands::Inspect { secret, key_dir } => inspect(&registry, secret, &key_dir),
        Commands::Pools => {
            print_pools(&registry);
            Ok(())
        }
        Commands::Cache { action } => {
            let cache = LeafCache::new(&config.cache_dir);
            match action {
                CacheAction::Show { pool } => show_cache(&registry, &cache, &pool),
                CacheAction::Clear { pool } => {
                    cache.remove(&pool)?;
                    info!("cleared {}", cache.path(&pool).display());
                    Ok(())
                }
            }
        }
    }
}

fn keygen(
    registry: &PoolRegistry,
    asset: AssetKind,
    amount: &str,
    out_dir: Option<&Path>,
) -> Result<()> {
    let denomination = parse_amount(amount)?;
    let pool = registry.find(asset, denomination)?;
    let key = PrivateKey::generate();
    let encoded = key.encode(pool);

    println!("SAVE YOUR SECRET KEY!!!");
    println!("{}", encoded);
    println!();
    println!("pool:       {}", pool.label());
    println!("deposit:    {} {}", format_amount(pool.amount_with_fee()), pool.kind);
    println!("commitment: {}", key.commitment());

    if let Some(dir) = out_dir {
        fs::create_dir_all(dir)?;
        let stamp = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
        let path = dir.join(format!(
            "PrivateKey_{}_{}_{}.txt",
            pool.kind,
            format_amount(pool.denomination),
            stamp
        ));
        if path.exists() {
            bail!("{} already exists", path.display());
        }
        fs::write(&path, &encoded)?;
        info!("secret written to {}", path.display());
    }
    Ok(())
}

fn inspect(registry: &PoolRegistry, secret: Option<String>, key_dir: &Path) -> Result<()> {
    let secret = match secret {
        Some(secret) => secret,
        None => {
            let path = find_key_file(key_dir)
                .with_context(|| format!("reading {}", key_dir.display()))?
                .with_context(|| format!("no PrivateKey*.txt in {}", key_dir.display()))?;
            info!("using {}", path.display());
            read_key_file(&path)?
        }
    };
    let (key, pool) = PrivateKey::decode(&secret, registry)?;

    println!("pool:           {}", pool.label());
    println!("address:        {}", pool.address);
    println!("commitment:     {}", key.commitment());
    println!("nullifier hash: {}", key.nullifier_hash());
    Ok(())
}

fn print_pools(registry: &PoolRegistry) {
    for kind in [AssetKind::Native, AssetKind::Token] {
        for pool in registry.by_kind(kind) {
            let fee = pool.amount_with_fee() - pool.denomination;
            println!(
                "{:<8} {:>6} fee {} ({})  {}",
                pool.kind,
                format_amount(pool.denomination),
                format_amount(fee),
                units::percent_string(pool.fee),
                pool.address
            );
        }
    }
    println!();
    println!("relay fees:");
    for tier in RELAYER_FEES.iter() {
        let examples: Vec<String> = registry
            .by_kind(AssetKind::Native)
            .map(|p| {
                format!(
                    "{} on {}",
                    relay_fee_amount(p.denomination, tier.fee),
                    format_amount(p.denomination)
                )
            })
            .collect();
        println!("  {:<16} {}", tier.label(), examples.join(", "));
    }
}

fn show_cache(registry: &PoolRegistry, cache: &LeafCache, pool: &Address) -> Result<()> {
    match registry.by_address(pool) {
        Some(config) => println!("pool:   {}", config.label()),
        None => warn!("{} is not in the registry", pool),
    }
    let path = cache.path(pool);
    if !path.exists() {
        println!("no cache at {}", path.display());
        return Ok(());
    }
    let cached = cache.load(pool);
    let tree = MerkleTree::build(&cached.leaves)?;

    println!("file:   {}", path.display());
    println!("leaves: {}", cached.leaves.len());
    match cached.cursor {
        Some(lt) => println!("cursor: {}", lt),
        None => println!("cursor: none"),
    }
    println!("root:   {}", tree.root());
    Ok(())
}
