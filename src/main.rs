//! Airdrop Merkle CLI
//!
//! Builds a distribution from a CSV eligibility list, writes the manifest and
//! claims, and answers proof and verification queries against them.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use airdrop_merkle::{
    distribution::{
        deserialize, read_recipients_from_path, serialize, ClaimsExport, Distribution,
        DistributionError,
    },
    tree::{CancelToken, ProofEntry, Side, TreeSnapshot},
    verify_with, BuildConfig, Digest, HashAlgorithm, Identity, Proof, TreeBuilder, VERSION,
};

#[derive(Parser, Debug)]
#[command(name = "airdrop-merkle")]
#[command(about = "Merkle airdrop eligibility tool", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a distribution from a recipient CSV
    Build(BuildArgs),
    /// Print the claim for one address as JSON
    Prove(ProveArgs),
    /// Check a leaf and proof against a root
    Verify(VerifyArgs),
    /// Summarize a manifest and re-verify every proof
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
struct BuildArgs {
    /// CSV file with `address,amount` lines
    #[arg(short, long)]
    input: PathBuf,

    /// Output path for the binary manifest
    #[arg(short, long)]
    manifest: PathBuf,

    /// Output path for the claims JSON
    #[arg(short, long)]
    claims: Option<PathBuf>,

    /// Output path for the level cache snapshot
    #[arg(short, long)]
    snapshot: Option<PathBuf>,

    /// Hash family (overrides AIRDROP_HASH)
    #[arg(long)]
    hash: Option<HashAlgorithm>,

    /// Hash levels in parallel (overrides AIRDROP_PARALLEL)
    #[arg(long)]
    parallel: bool,
}

#[derive(Args, Debug)]
struct ProveArgs {
    /// Manifest written by `build`
    #[arg(short, long)]
    manifest: PathBuf,

    /// Recipient address
    #[arg(short, long)]
    address: Identity,

    /// Hash family the manifest was built with
    #[arg(long, default_value_t = HashAlgorithm::Sha256)]
    hash: HashAlgorithm,
}

#[derive(Args, Debug)]
struct VerifyArgs {
    /// Published root
    #[arg(long)]
    root: Digest,

    /// Leaf digest
    #[arg(long)]
    leaf: Digest,

    /// Comma-separated sibling digests, leaf level first
    #[arg(long, value_delimiter = ',', num_args = 0..)]
    proof: Vec<Digest>,

    /// Hash family of the tree
    #[arg(long, default_value_t = HashAlgorithm::Sha256)]
    hash: HashAlgorithm,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Manifest written by `build`
    #[arg(short, long)]
    manifest: PathBuf,

    /// Hash family the manifest was built with
    #[arg(long, default_value_t = HashAlgorithm::Sha256)]
    hash: HashAlgorithm,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    let cli = Cli::parse();
    match cli.command {
        Commands::Build(args) => run_build(args).await,
        Commands::Prove(args) => run_prove(&args),
        Commands::Verify(args) => run_verify(&args),
        Commands::Inspect(args) => run_inspect(&args),
    }
}

async fn run_build(args: BuildArgs) -> Result<()> {
    let mut config = BuildConfig::from_env();
    if let Some(hash) = args.hash {
        config.hash = hash;
    }
    config.parallel |= args.parallel;

    info!("airdrop-merkle v{}", VERSION);
    let recipients = read_recipients_from_path(&args.input)
        .with_context(|| format!("failed to read recipients from {}", args.input.display()))?;
    info!(
        recipients = recipients.len(),
        hash = %config.hash,
        parallel = config.parallel,
        "building distribution"
    );

    let cancel = CancelToken::new();
    let builder = TreeBuilder::from_config(&config).cancel_token(cancel.clone());
    let mut task = tokio::task::spawn_blocking(move || {
        let (distribution, tree) = Distribution::build_with(recipients, &builder)?;
        let proofs = distribution.proofs(&tree)?;
        distribution.verify_all(&proofs)?;
        Ok::<_, DistributionError>((distribution, tree, proofs))
    });

    let joined = tokio::select! {
        joined = &mut task => joined,
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupt received, cancelling build");
            cancel.cancel();
            task.await
        }
    };
    let (distribution, tree, proofs) = joined
        .context("build task failed")?
        .context("failed to build distribution")?;

    let manifest = serialize(&distribution, &proofs).context("failed to encode manifest")?;
    write_atomic(&args.manifest, &manifest)?;
    info!(path = %args.manifest.display(), bytes = manifest.len(), "wrote manifest");

    if let Some(path) = &args.claims {
        let export = ClaimsExport::new(&distribution, &proofs)?;
        write_atomic(path, export.to_json()?.as_bytes())?;
        info!(path = %path.display(), claims = export.claims.len(), "wrote claims");
    }

    if let Some(path) = &args.snapshot {
        let bytes = TreeSnapshot::from_tree(&tree).to_bytes().context("failed to encode snapshot")?;
        write_atomic(path, &bytes)?;
        info!(path = %path.display(), levels = tree.depth(), "wrote snapshot");
    }

    println!("{}", distribution.root());
    Ok(())
}

fn run_prove(args: &ProveArgs) -> Result<()> {
    let (distribution, proofs) = load_manifest(&args.manifest, args.hash)?;
    let claim = distribution
        .claim(&args.address, &proofs)
        .with_context(|| format!("no claim for {}", args.address))?;
    println!("{}", serde_json::to_string_pretty(&claim)?);
    Ok(())
}

fn run_verify(args: &VerifyArgs) -> Result<()> {
    // Sides are not consulted during verification.
    let proof = Proof {
        leaf_index: 0,
        entries: args
            .proof
            .iter()
            .map(|sibling| ProofEntry { sibling: *sibling, side: Side::Left })
            .collect(),
    };
    let valid = verify_with(&args.hash, &args.leaf, &proof, &args.root);
    println!("{}", if valid { "valid" } else { "invalid" });
    Ok(())
}

fn run_inspect(args: &InspectArgs) -> Result<()> {
    let (distribution, proofs) = load_manifest(&args.manifest, args.hash)?;
    let longest = proofs.iter().map(Proof::len).max().unwrap_or(0);

    println!("root:       {}", distribution.root());
    println!("hash:       {}", distribution.algorithm());
    println!("recipients: {}", distribution.len());
    println!("max proof:  {} entries", longest);

    if let Err(e) = distribution.verify_all(&proofs) {
        bail!("manifest does not verify: {}", e);
    }
    println!("all proofs verify");
    Ok(())
}

fn load_manifest(path: &Path, hash: HashAlgorithm) -> Result<(Distribution, Vec<Proof>)> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    deserialize(&bytes, hash).with_context(|| format!("failed to decode {}", path.display()))
}

/// Write via a sibling temp file and rename, so readers never see a partial file.
fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .with_context(|| format!("invalid output path {}", path.display()))?;
    let tmp = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));

    fs::write(&tmp, contents).with_context(|| format!("failed to write {}", tmp.display()))?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e).with_context(|| format!("failed to move {} into place", path.display()));
    }
    Ok(())
}
