use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context};
use clap::{ArgAction, ArgGroup, Parser};
use log::{error, info, warn, LevelFilter};
use rand::rngs::StdRng;
use rand::SeedableRng;

use rsa_filecrypt::rsa::{cipher, keystore, KeyGenConfig, KeyGenerator, MillerRabin};
use rsa_filecrypt::util::file_ops::{get_file_size, has_encrypted_suffix};
use rsa_filecrypt::util::{decrypted_output_path, encrypted_output_path, format_file_size, KeyPaths};
use rsa_filecrypt::RsaError;

/// RSA Encryption/Decryption Tool
#[derive(Debug, Parser)]
#[command(name = "rsa_filecrypt", version, about)]
#[command(group(ArgGroup::new("action").required(true).args(["keygen", "encrypt", "decrypt"])))]
struct Cli {
    /// Increase output verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Generate new RSA keys with the given bit length
    #[arg(short, long, value_name = "BITS")]
    keygen: Option<u64>,

    /// Encrypt a file into <FILE>.enc
    #[arg(short, long, value_name = "FILE")]
    encrypt: Option<PathBuf>,

    /// Decrypt a <FILE>.enc file
    #[arg(short, long, value_name = "FILE")]
    decrypt: Option<PathBuf>,

    /// Directory holding public_key.bin and private_key.bin
    #[arg(long, value_name = "DIR", env = "RSA_FILECRYPT_KEY_DIR", default_value = ".")]
    key_dir: PathBuf,

    /// Seed for reproducible key generation
    #[arg(long, value_name = "U64")]
    seed: Option<u64>,

    /// Prime pair attempts before key generation gives up
    #[arg(long, value_name = "N", default_value_t = KeyGenConfig::default().max_prime_attempts)]
    max_attempts: u32,

    /// Miller-Rabin rounds per prime candidate
    #[arg(long, value_name = "N", default_value_t = MillerRabin::default().rounds())]
    rounds: u32,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::builder().filter_level(level).parse_default_env().init();
    info!("Verbosity turned on");

    if let Err(e) = run(&cli) {
        if let Some(RsaError::KeyNotFound(path)) = e.downcast_ref::<RsaError>() {
            error!("key file {} not found, please generate keys first", path.display());
        } else {
            error!("{:#}", e);
        }
        process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let paths = KeyPaths::in_dir(&cli.key_dir);

    if let Some(bits) = cli.keygen {
        generate(cli, bits, &paths)
    } else if let Some(input) = &cli.encrypt {
        encrypt(input, &paths)
    } else if let Some(input) = &cli.decrypt {
        decrypt(input, &paths)
    } else {
        bail!("one of --keygen, --encrypt or --decrypt is required")
    }
}

fn generate(cli: &Cli, bits: u64, paths: &KeyPaths) -> anyhow::Result<()> {
    info!("Generating RSA keys of length {} bits...", bits);

    let mut rng = match cli.seed {
        Some(seed) => {
            warn!("using a fixed seed, the generated keys are reproducible");
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_entropy(),
    };

    let config = KeyGenConfig::default().with_max_prime_attempts(cli.max_attempts);
    let pair = KeyGenerator::new(MillerRabin::new(cli.rounds))
        .with_config(config)
        .generate(bits, &mut rng)
        .with_context(|| format!("generating a {}-bit key pair", bits))?;

    keystore::save_key_pair(&pair, paths)?;
    Ok(())
}

fn encrypt(input: &Path, paths: &KeyPaths) -> anyhow::Result<()> {
    info!("Encrypting file: {}", input.display());
    let public_key = keystore::load_public_key(paths)?;

    let output = encrypted_output_path(input);
    let summary = cipher::encrypt_file(input, &output, &public_key)
        .with_context(|| format!("encrypting {}", input.display()))?;

    info!(
        "File encrypted to: {} ({} -> {})",
        output.display(),
        format_file_size(summary.bytes_read),
        format_file_size(summary.bytes_written)
    );
    Ok(())
}

fn decrypt(input: &Path, paths: &KeyPaths) -> anyhow::Result<()> {
    info!(
        "Decrypting file: {} ({})",
        input.display(),
        format_file_size(get_file_size(input)?)
    );
    let private_key = keystore::load_private_key(paths)?;

    let output = decrypted_output_path(input);
    if !has_encrypted_suffix(input) {
        warn!("{} has no .enc suffix, writing to {}", input.display(), output.display());
    }

    let summary = cipher::decrypt_file(input, &output, &private_key)
        .with_context(|| format!("decrypting {}", input.display()))?;

    info!(
        "File decrypted to: {} ({})",
        output.display(),
        format_file_size(summary.bytes_written)
    );
    Ok(())
}
