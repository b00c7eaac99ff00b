//! Generate and seal the built-in demo bank (development fixture)

use anyhow::Result;
use std::path::PathBuf;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    let out_path = args
        .iter()
        .position(|s| s == "--output")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("bank.json"));

    let signed_by = args
        .iter()
        .position(|s| s == "--signed-by")
        .and_then(|i| args.get(i + 1))
        .cloned()
        .unwrap_or_else(|| "bankgen-dev".to_string());

    let key = match std::env::var("FACEKIT_SIGNING_KEY") {
        Ok(k) if !k.is_empty() => k,
        _ => {
            return Err(anyhow::anyhow!(
                "FACEKIT_SIGNING_KEY must be set (the per-environment HMAC key)"
            ))
        }
    };

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("⚠️  Generating the DEMO bank, a balanced development fixture.");
    println!("⚠️  Production banks are authored and reviewed, not generated.");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let mut artifact = facekit::authoring::demo_bank();
    facekit::authoring::seal(&mut artifact, key.as_bytes(), &signed_by)
        .map_err(|e| anyhow::anyhow!("seal failed: {e}"))?;

    let bank_hash = artifact["meta"]["bank_hash"]
        .as_str()
        .unwrap_or_default()
        .to_string();

    std::fs::write(&out_path, serde_json::to_string_pretty(&artifact)?)
        .map_err(|e| anyhow::anyhow!("write {}: {e}", out_path.display()))?;

    println!("✓ Demo bank sealed and written");
    println!("  path:      {}", out_path.display());
    println!("  bank_hash: {bank_hash}");
    println!("  signed_by: {signed_by}");

    Ok(())
}
