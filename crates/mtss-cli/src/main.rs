//! MTSS command-line tool
//!
//! Signs txt/xml messages with a modification-tolerant signature, verifies
//! them with block-level tamper localization, and attempts automatic
//! correction of localized blocks.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Args, Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

use mtss_cff::FsDesignRepository;
use mtss_correct::{verify_and_correct, CorrectionOptions, Outcome};
use mtss_crypto::mldsa::MlDsaKeyPair;
use mtss_crypto::{load_private_key, load_public_key, HashKind, SchemeKind, SigScheme};
use mtss_protocol::{sign, verify, DesignRequest, SignatureBundle, VerificationReport};

mod blocks;

use blocks::FileType;

/// Modification-tolerant signature tool
///
/// A single signature over a block-split message that localizes tampered
/// blocks and can repair them within a small edit budget.
#[derive(Parser, Debug)]
#[command(name = "mtss")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log debug-level execution information to stderr
    #[arg(long, global = true)]
    debug: bool,

    /// Print only the total execution time in seconds
    #[arg(long = "time-only", global = true)]
    time_only: bool,

    /// Directory where CFF designs are cached
    #[arg(long, global = true, env = "MTSS_CFF_DIR", default_value = "cffs")]
    cff_dir: PathBuf,

    /// Log format (plain, json)
    #[arg(long, global = true, env = "MTSS_LOG_FORMAT", default_value = "plain")]
    log_format: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign a message file, writing `<stem>_signature.mts` next to it
    Sign(SignArgs),
    /// Verify a message against its signature, localizing modified blocks
    Verify(VerifyArgs),
    /// Verify and attempt to correct localized blocks, writing
    /// `<stem>_corrected.<ext>` on success
    VerifyCorrect(VerifyCorrectArgs),
    /// Generate an ML-DSA-65 key pair as raw key files
    Keygen(KeygenArgs),
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("design").required(true)))]
struct SignArgs {
    /// Signature scheme (rsa, ed25519, ml-dsa-65)
    scheme: String,

    /// Message file to sign (.txt or .xml)
    message: PathBuf,

    /// Private key file (PEM for rsa/ed25519, raw for ml-dsa-65)
    key: PathBuf,

    /// Pick the design with the best localization that fits this many
    /// bytes of signature
    #[arg(short = 's', long = "max-bytes", group = "design")]
    max_bytes: Option<usize>,

    /// Use the polynomial construction with this degree bound (1 selects
    /// the trivial per-block design)
    #[arg(short = 'k', long = "degree", group = "design")]
    k: Option<u32>,

    /// Hash function (SHA256, SHA512, SHA3-256, SHA3-512, BLAKE2B)
    #[arg(long)]
    hash: Option<String>,
}

#[derive(Args, Debug)]
struct VerifyArgs {
    /// Signature scheme the message was signed with
    scheme: String,

    /// Message file to verify
    message: PathBuf,

    /// Public key file
    key: PathBuf,

    /// Signature bundle path (default: `<stem>_signature.mts`)
    #[arg(long)]
    signature: Option<PathBuf>,

    /// Hash function the message was signed with
    #[arg(long)]
    hash: Option<String>,
}

#[derive(Args, Debug)]
struct VerifyCorrectArgs {
    #[command(flatten)]
    verify: VerifyArgs,

    /// Maximum byte substitutions to try per tampered block
    #[arg(long, default_value_t = 1)]
    max_edits: usize,

    /// Search worker threads (default: available parallelism)
    #[arg(long)]
    workers: Option<usize>,
}

#[derive(Args, Debug)]
struct KeygenArgs {
    /// Signature scheme (only ml-dsa-65; use openssl for rsa/ed25519)
    scheme: String,

    /// Output path prefix; writes `<prefix>.key` and `<prefix>.pub`
    #[arg(short, long, default_value = "mtss")]
    output: PathBuf,
}

fn setup_logging(debug: bool, log_format: &str) -> Result<()> {
    let level = if debug { Level::DEBUG } else { Level::WARN };
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    match log_format.to_lowercase().as_str() {
        "json" => {
            let subscriber = fmt::Subscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .json()
                .flatten_event(true)
                .with_current_span(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("failed to set subscriber")?;
        }
        _ => {
            let subscriber = fmt::Subscriber::builder()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("failed to set subscriber")?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.debug, &cli.log_format)?;

    let start = Instant::now();
    // Result lines are suppressed in time-only mode so the single printed
    // value stays machine-readable.
    let print_results = !cli.time_only;
    let repository = FsDesignRepository::new(&cli.cff_dir);

    match &cli.command {
        Command::Sign(args) => run_sign(args, &repository, print_results)?,
        Command::Verify(args) => {
            let report = run_verify(args, &repository)?;
            if print_results {
                print_localization(&report);
            }
        }
        Command::VerifyCorrect(args) => run_verify_correct(args, &repository, print_results)?,
        Command::Keygen(args) => run_keygen(args, print_results)?,
    }

    if cli.time_only {
        println!("{}", start.elapsed().as_secs_f64());
    }
    Ok(())
}

/// Build the signature scheme before touching any file, so unsupported
/// scheme or hash selections abort with no partial work.
fn scheme_from_args(scheme: &str, hash: Option<&str>) -> Result<SigScheme> {
    let kind = SchemeKind::parse(scheme)?;
    let hash = hash.map(HashKind::parse).transpose()?;
    Ok(SigScheme::new(kind, hash)?)
}

fn load_message(path: &Path) -> Result<(FileType, Vec<String>)> {
    let file_type = FileType::from_path(path)?;
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read message {}", path.display()))?;
    Ok((file_type, blocks::split_blocks(&content, file_type)))
}

fn run_sign(args: &SignArgs, repository: &FsDesignRepository, print_results: bool) -> Result<()> {
    let scheme = scheme_from_args(&args.scheme, args.hash.as_deref())?;
    let (_, message_blocks) = load_message(&args.message)?;
    let key = load_private_key(scheme.scheme(), &args.key)?;

    let request = match (args.max_bytes, args.k) {
        (Some(budget), None) => DesignRequest::MaxBytes(budget),
        (None, Some(k)) => DesignRequest::Explicit { k },
        _ => bail!("exactly one of --max-bytes and --degree must be given"),
    };
    let bundle = sign(&scheme, &key, &message_blocks, request, repository)?;

    let signature_path = blocks::signature_path(&args.message);
    fs::write(&signature_path, bundle.to_bytes())
        .with_context(|| format!("failed to write {}", signature_path.display()))?;
    info!(
        path = %signature_path.display(),
        d = bundle.d,
        t = bundle.t,
        "signature written"
    );
    if print_results {
        println!("Signature written to {}", signature_path.display());
    }
    Ok(())
}

fn run_verify(args: &VerifyArgs, repository: &FsDesignRepository) -> Result<VerificationReport> {
    let scheme = scheme_from_args(&args.scheme, args.hash.as_deref())?;
    let (_, message_blocks) = load_message(&args.message)?;
    let key = load_public_key(scheme.scheme(), &args.key)?;
    let bundle = read_bundle(args)?;
    Ok(verify(&scheme, &key, &message_blocks, &bundle, repository)?)
}

fn run_verify_correct(
    args: &VerifyCorrectArgs,
    repository: &FsDesignRepository,
    print_results: bool,
) -> Result<()> {
    let scheme = scheme_from_args(&args.verify.scheme, args.verify.hash.as_deref())?;
    let (file_type, message_blocks) = load_message(&args.verify.message)?;
    let key = load_public_key(scheme.scheme(), &args.verify.key)?;
    let bundle = read_bundle(&args.verify)?;

    let defaults = CorrectionOptions::default();
    let options = CorrectionOptions {
        max_edits: args.max_edits,
        workers: args.workers.unwrap_or(defaults.workers),
    };

    let report = verify_and_correct(&scheme, &key, &message_blocks, &bundle, repository, &options)?;
    if print_results {
        print_localization(&report.verification);
    }
    if report.verification.valid {
        return Ok(());
    }

    for correction in &report.corrections {
        if let Outcome::Corrected { collisions, .. } = &correction.outcome {
            if !collisions.is_empty() {
                warn!(
                    block = correction.index,
                    candidates = collisions.len() + 1,
                    "multiple contents validate this block; the first was kept"
                );
            }
        }
    }

    let fully_corrected = !report.corrections.is_empty()
        && report
            .corrections
            .iter()
            .all(|c| matches!(c.outcome, Outcome::Corrected { .. }));
    match (fully_corrected, report.corrected_blocks) {
        (true, Some(corrected)) => {
            let correction_path = blocks::correction_path(&args.verify.message);
            let content = blocks::rebuild_content(&corrected, file_type);
            fs::write(&correction_path, content)
                .with_context(|| format!("failed to write {}", correction_path.display()))?;
            if print_results {
                println!("Correction written to {}", correction_path.display());
            }
        }
        _ => {
            if print_results {
                println!(
                    "File {} could not be corrected",
                    args.verify.message.display()
                );
            }
        }
    }
    Ok(())
}

fn run_keygen(args: &KeygenArgs, print_results: bool) -> Result<()> {
    match SchemeKind::parse(&args.scheme)? {
        SchemeKind::MlDsa65 => {}
        other => bail!(
            "key generation is only supported for ml-dsa-65, not {other} \
             (generate rsa/ed25519 keys with openssl)"
        ),
    }
    let pair = MlDsaKeyPair::generate()?;
    let private_path = args.output.with_extension("key");
    let public_path = args.output.with_extension("pub");
    fs::write(&private_path, pair.private.as_bytes())
        .with_context(|| format!("failed to write {}", private_path.display()))?;
    fs::write(&public_path, pair.public.as_bytes())
        .with_context(|| format!("failed to write {}", public_path.display()))?;
    if print_results {
        println!("Private key written to {}", private_path.display());
        println!("Public key written to {}", public_path.display());
    }
    Ok(())
}

fn read_bundle(args: &VerifyArgs) -> Result<SignatureBundle> {
    let path = args
        .signature
        .clone()
        .unwrap_or_else(|| blocks::signature_path(&args.message));
    let bytes = fs::read(&path)
        .with_context(|| format!("failed to read signature {}", path.display()))?;
    Ok(SignatureBundle::from_bytes(&bytes)?)
}

fn print_localization(report: &VerificationReport) {
    if report.valid {
        println!("Verification result: signature is valid; message was not modified");
    } else if report.complete {
        println!(
            "Verification result: signature is valid; modified blocks = {:?}",
            report.modified_blocks
        );
    } else {
        println!("Verification result: signature could not be verified");
    }
}
