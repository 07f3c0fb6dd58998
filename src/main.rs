//! Rewind CLI

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use rewind::fingerprint::short_fingerprint;
use rewind::storage;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        eprintln!("Rewind v{}", env!("CARGO_PKG_VERSION"));
        eprintln!();
        eprintln!("Usage: rewind <command> <cassette>");
        eprintln!();
        eprintln!("Commands:");
        eprintln!("  inspect   List recorded interactions");
        eprintln!("  verify    Check that a cassette loads cleanly");
        process::exit(1);
    }

    let command = &args[1];
    let path = PathBuf::from(&args[2]);

    let result = match command.as_str() {
        "inspect" => inspect(&path),
        "verify" => verify(&path),
        _ => {
            eprintln!("Unknown command: {command}");
            eprintln!("Run 'rewind' for usage information.");
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn inspect(path: &Path) -> Result<()> {
    let cassette = storage::load(path)
        .with_context(|| format!("loading {}", path.display()))?;

    println!("Cassette: {}", path.display());
    println!("Version: {}", cassette.version);
    println!("Created by: {} mode", cassette.mode);
    println!("Interactions: {}", cassette.len());
    println!();

    for interaction in cassette.interactions() {
        let request = &interaction.request;
        let response = &interaction.response;
        println!(
            "#{:<4} {:<7} {} -> {} ({} bytes) [{}]",
            interaction.order_index,
            request.method,
            request.url,
            response.status,
            response.body.len(),
            short_fingerprint(request)
        );
    }

    Ok(())
}

fn verify(path: &Path) -> Result<()> {
    let cassette = storage::load(path)
        .with_context(|| format!("verifying {}", path.display()))?;

    // A valid cassette must also re-serialize to itself
    let document = storage::to_yaml(&cassette)?;
    let reparsed = storage::parse(path, &document)?;
    anyhow::ensure!(reparsed == cassette, "cassette does not round-trip");

    println!("{}: ok ({} interactions)", path.display(), cassette.len());
    Ok(())
}
