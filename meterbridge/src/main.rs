/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tracing::{error, info};

use meterbridge::config::Settings;
use meterbridge::pipeline::builder::build_operations;

// ── CLI argument definition ───────────────────────────────────────────────────

/// Meterbridge gateway core.
///
/// Example:
///   meterbridge --config meterbridge.yaml --describe
#[derive(Debug, Parser)]
#[command(
    name = "meterbridge",
    about = "Meterbridge – validate a gateway configuration and describe its pipelines",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML gateway configuration file.
    #[arg(short = 'c', long = "config")]
    config: PathBuf,

    /// Print the operation tree of every configured channel.
    #[arg(short = 'd', long = "describe", default_value_t = false)]
    describe: bool,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        error!("{:#}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let settings = Settings::load_from_file(&cli.config)?;
    let general = &settings.general;

    info!(
        base_topic      = %general.base_topic,
        republish_after = general.republish_after,
        wh_in_kwh       = general.wh_in_kwh,
        checksums       = ?general.checksums,
        "Configuration"
    );
    info!("Configuration is valid, {} device(s) configured", settings.devices.len());

    if !cli.describe {
        return Ok(());
    }

    let now = Local::now().naive_local();
    for (device_id, device) in &settings.devices {
        info!("[{device_id}]");
        if !device.skip.is_empty() {
            info!("  Skipped: {}", device.skip.join(", "));
        }
        for channel in &device.channels {
            let ops = build_operations(&channel.operations, now)
                .with_context(|| format!("devices.{device_id}: channel {}", channel.channel))?;
            info!("  {}", channel.channel);
            for line in ops.iter().flat_map(|op| op.describe()) {
                info!("    {line}");
            }
        }
    }
    Ok(())
}
