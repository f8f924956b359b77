// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use clap::{Parser, Subcommand, ValueEnum};
use keyattest::attestation::{Envelope, KeyObject};
use keyattest::store::{parse_certificates, MemoAnchorStore};
use keyattest::verify::cert::describe;
use keyattest::verify::{ConsensusValidator, PivValidator, TrustChain};
use std::error::Error;
use std::fs;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(author, version, long_about = None,
    about = "Decode and verify hardware key attestations")]
struct KeyAttestCli {
    /// Log decoding and chain building steps
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Decode(DecodeArgs),
    Verify(VerifyArgs),
    Key(KeyArgs),
    Piv(PivArgs),
}

#[derive(Debug, clap::Args)]
#[command(about = "Print the contents of the supplied attestation")]
struct DecodeArgs {
    /// Binary attestation, optionally gzip-compressed
    attestation: String,

    /// Print as JSON instead of text
    #[arg(short, long)]
    json: bool,
}

#[derive(Debug, clap::Args)]
#[command(about = "Cryptographically verify the supplied attestation against \
    every root in the trust anchor store")]
struct VerifyArgs {
    attestation: String,

    /// PEM bundle holding the certificates the attestation came with
    #[arg(short, long, default_value = "certs.pem")]
    certs: String,

    /// Trust anchors, as JSON or PEM
    #[arg(short = 't', long, default_value = "anchors.json")]
    anchors: String,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KeyFormat {
    Pem,
    Der,
}

#[derive(Debug, clap::Args)]
#[command(about = "Export the attested public key and optionally compare it \
    with a key, certificate or CSR")]
struct KeyArgs {
    attestation: String,

    /// Key, certificate or CSR (PEM or DER) to compare with
    #[arg(short = 'k', long)]
    compare: Option<String>,

    /// Write the key to this file instead of stdout
    #[arg(short, long)]
    output: Option<String>,

    #[arg(short, long, value_enum, default_value_t = KeyFormat::Pem)]
    format: KeyFormat,
}

#[derive(Debug, clap::Args)]
#[command(about = "Verify a smart-card (PIV) attestation certificate")]
struct PivArgs {
    /// The attestation certificate (PEM or DER)
    certificate: String,

    /// PEM bundle holding the intermediate certificates
    #[arg(short, long, default_value = "certs.pem")]
    certs: String,

    /// Trusted roots, as JSON or PEM
    #[arg(short = 't', long, default_value = "anchors.json")]
    anchors: String,
}

fn main() -> ExitCode {
    let cli = KeyAttestCli::parse();

    init_tracing(cli.verbose);

    let (what, res) = match cli.command {
        Command::Decode(args) => ("decoding", decode(&args)),
        Command::Verify(args) => ("verification", verify(&args)),
        Command::Key(args) => ("key export", key(&args)),
        Command::Piv(args) => ("PIV verification", piv(&args)),
    };

    match res {
        Ok(()) => {
            eprintln!("{what} successful");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{what} failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

fn load_anchors(path: &str) -> Result<MemoAnchorStore, Box<dyn Error>> {
    let mut tas: MemoAnchorStore = Default::default();

    if Path::new(path).extension().is_some_and(|x| x == "json") {
        tas.load_json(&fs::read_to_string(path)?)?;
    } else {
        tas.load_pem(path, &fs::read(path)?)?;
    }

    Ok(tas)
}

fn decode(args: &DecodeArgs) -> Result<(), Box<dyn Error>> {
    let e = Envelope::decode(&fs::read(&args.attestation)?)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&e)?);
        return Ok(());
    }

    let rh = &e.response_header;
    let ih = &e.info_header;

    println!("compressed: {}", e.compressed);
    println!("response code: {}", rh.response_code);
    println!("request flags: {}", rh.flag_names().join("|"));
    println!("total size: {}", rh.total_size);
    println!("buffer size: {}", rh.buffer_size);
    println!("object version: {}", ih.object_version);
    println!(
        "key offsets: {}, {}",
        ih.offset_first_key, ih.offset_second_key
    );

    print_key_object("first key", &e.first_key);
    if let Some(k) = &e.second_key {
        print_key_object("second key", k);
    }

    println!("signature: {}", hex::encode(&e.signature));

    Ok(())
}

fn print_key_object(title: &str, k: &KeyObject) {
    println!(
        "{title}: handle {:#x}, {} attributes, {} bytes",
        k.handle, k.attribute_count, k.object_size
    );

    for (tag, v) in k.attributes.iter() {
        println!("  {tag}: {v}");
    }
}

fn print_chain(chain: &TrustChain) {
    for (i, c) in chain.describe().iter().enumerate() {
        println!("  [{i}] {c}");
    }
}

fn verify(args: &VerifyArgs) -> Result<(), Box<dyn Error>> {
    let tas = load_anchors(&args.anchors)?;
    let v = ConsensusValidator::new(&tas)?;

    let pool = parse_certificates(&fs::read(&args.certs)?)?;
    let e = Envelope::decode(&fs::read(&args.attestation)?)?;

    let (chain, signer) = v.verify(&e, &pool).into_result()?;

    println!("signer: {}", describe(&signer));
    println!("chain:");
    print_chain(&chain);

    Ok(())
}

fn key(args: &KeyArgs) -> Result<(), Box<dyn Error>> {
    let e = Envelope::decode(&fs::read(&args.attestation)?)?;
    let pk = e.first_key.public_key()?;

    eprintln!("algorithm: {}", pk.algorithm);
    eprintln!("usage: {:?}", pk.usage);
    eprintln!("key id (SHA-1): {}", hex::encode(pk.key_id_sha1()));
    eprintln!("key id (SHA-256): {}", hex::encode(pk.key_id_sha256()));

    let out = match args.format {
        KeyFormat::Pem => pk.to_pem()?,
        KeyFormat::Der => pk.to_der().to_vec(),
    };

    match &args.output {
        Some(path) => fs::write(path, out)?,
        None => match args.format {
            KeyFormat::Pem => print!("{}", String::from_utf8_lossy(&out)),
            KeyFormat::Der => println!("{}", hex::encode(&out)),
        },
    }

    if let Some(path) = &args.compare {
        let other = keyattest::attestation::load_public_key(&fs::read(path)?)?;

        if !pk.matches(&other) {
            return Err(format!("attested key does not match {path}").into());
        }

        eprintln!("attested key matches {path}");
    }

    Ok(())
}

fn piv(args: &PivArgs) -> Result<(), Box<dyn Error>> {
    let tas = load_anchors(&args.anchors)?;
    let v = PivValidator::new(&tas)?;

    let att = parse_certificates(&fs::read(&args.certificate)?)?
        .into_iter()
        .next()
        .ok_or("no attestation certificate")?;

    let pool = match fs::read(&args.certs) {
        Ok(b) => parse_certificates(&b)?,
        Err(_) => vec![],
    };

    let (chain, signer) = v.verify(&att, &pool).into_result()?;

    println!("signer: {}", describe(&signer));
    println!("chain:");
    print_chain(&chain);

    Ok(())
}
