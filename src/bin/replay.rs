//! Minimal CLI replayer (replay.v1 descriptors)
//!
//! Loads a sealed bank artifact and a replay descriptor, reconstructs the
//! session, finalizes it, and compares snapshot hashes. Exit status is 0 on
//! MATCH (or UNVERIFIED), 1 on MISMATCH.
//!
//! The signing key comes from `FACEKIT_SIGNING_KEY`; the descriptor's
//! expected hash (when present) is the comparison target.

use std::{env, fs, path::Path};

use anyhow::Result;
use facekit::{Engine, EngineConfig, ReplayOutcome};
use tracing_subscriber::EnvFilter;

fn parse_flag(args: &[String], key: &str) -> Option<String> {
    let mut it = args.iter();
    while let Some(a) = it.next() {
        if a == key {
            return it.next().cloned();
        }
    }
    None
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    let bank_path = parse_flag(&args, "--bank").unwrap_or_else(|| "bank.json".to_string());
    let descriptor_path =
        parse_flag(&args, "--descriptor").unwrap_or_else(|| "replay.json".to_string());

    let key = std::env::var("FACEKIT_SIGNING_KEY")
        .map_err(|_| anyhow::anyhow!("FACEKIT_SIGNING_KEY must be set"))?;

    eprintln!("Loading bank from {bank_path}...");
    let bank_bytes = fs::read(Path::new(&bank_path))
        .map_err(|e| anyhow::anyhow!("read {bank_path}: {e}"))?;

    let engine = Engine::new(EngineConfig::new(key.as_bytes()));
    let bank = engine
        .register_bank(&bank_bytes)
        .map_err(|e| anyhow::anyhow!("bank rejected [{}]: {e}", e.code()))?;
    eprintln!("✓ Bank verified and registered");
    eprintln!("  bank_id: {}", bank.meta().bank_id);
    eprintln!("  version: {}", bank.meta().version);
    eprintln!("  hash:    {}", bank.hash());

    eprintln!();
    eprintln!("Reading descriptor from {descriptor_path}...");
    let descriptor_bytes = fs::read(Path::new(&descriptor_path))
        .map_err(|e| anyhow::anyhow!("read {descriptor_path}: {e}"))?;
    let descriptor: facekit::ReplayDescriptor = serde_json::from_slice(&descriptor_bytes)
        .map_err(|e| anyhow::anyhow!("parse descriptor: {e}"))?;
    eprintln!("✓ Descriptor parsed (seed={:?}, {} answers)", descriptor.session_seed, descriptor.answers.len());

    eprintln!();
    eprintln!("Replaying session...");
    let report = engine
        .replay(&descriptor, None)
        .map_err(|e| anyhow::anyhow!("replay failed [{}]: {e}", e.code()))?;

    eprintln!("  session_id:    {}", report.session_id);
    eprintln!("  computed hash: {}", report.computed_hash);
    if let Some(expected) = &report.expected_hash {
        eprintln!("  expected hash: {expected}");
    }

    eprintln!();
    match report.outcome {
        ReplayOutcome::Match => {
            eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
            eprintln!("✓ REPLAY MATCH");
            eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
            println!("Replay result: match");
        }
        ReplayOutcome::Unverified => {
            eprintln!("Note: descriptor carries no expected hash; nothing to verify against.");
            eprintln!("Anchor: {:?}", report.snapshot.anchor_family);
            println!("Replay result: unverified");
        }
        ReplayOutcome::Mismatch => {
            eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
            eprintln!("✗ REPLAY MISMATCH");
            eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
            for diff in &report.diff {
                eprintln!("  {}: expected {}, got {}", diff.field, diff.expected, diff.got);
            }
            eprintln!();
            eprintln!("The stored outcome was not reproduced. Either the descriptor was");
            eprintln!("edited, or the bank/constants differ from the original session's.");
            println!("Replay result: mismatch");
            std::process::exit(1);
        }
    }

    Ok(())
}
