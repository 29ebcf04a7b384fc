use std::path::PathBuf;

use anyhow::Context;
use omniparser::{analyze_vault, render_duplicate_report, run_migration, LogFormat, OmniConfig};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let mut dry_run = false;
    let mut config_path: Option<PathBuf> = None;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--dry-run" => dry_run = true,
            _ => config_path = Some(PathBuf::from(arg)),
        }
    }

    let config = match &config_path {
        Some(path) => OmniConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => OmniConfig::default(),
    };

    if let Err(err) = init_logging(&config) {
        eprintln!("omniparser: logging disabled: {err}");
    }

    if dry_run {
        let groups = analyze_vault(&config)?;
        println!("{}", render_duplicate_report(&groups));
        return Ok(());
    }

    let summary = run_migration(&config)?;
    println!("{}", summary.render());
    println!("Vault location:     {}", config.paths.output_dir.display());
    Ok(())
}

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
fn init_logging(config: &OmniConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match config.logging.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_logging_install_reports_an_error() {
        let config = OmniConfig::default();
        // may already be installed by another test
        init_logging(&config).ok();
        assert!(init_logging(&config).is_err());
    }
}
