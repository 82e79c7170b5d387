// src/main.rs
//! Stake Logger - serial GPS recorder with operator stake annotations

use anyhow::Context;
use clap::Parser;
use stake_logger::{config::RecorderConfig, logging, recorder, StakeRecorder};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "stake-logger", version, about)]
struct Args {
    /// Serial port of the GPS receiver
    #[arg(short, long)]
    port: Option<String>,

    /// Serial baud rate
    #[arg(short, long)]
    baudrate: Option<u32>,

    /// Directory the session logs are created in
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// List available serial ports and exit
    #[arg(long)]
    list_ports: bool,

    /// Persist the effective settings as the new defaults
    #[arg(long)]
    save_config: bool,

    /// Debug-level diagnostics (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn apply(&self, config: &mut RecorderConfig) {
        if self.port.is_some() || self.baudrate.is_some() {
            let port = self.port.clone().unwrap_or_else(|| config.serial_port.clone());
            let baudrate = self.baudrate.unwrap_or(config.baudrate);
            config.update_serial(port, baudrate);
        }
        if let Some(dir) = &self.output_dir {
            config.update_output_dir(dir.clone());
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init_logging(args.verbose);

    if args.list_ports {
        recorder::list_serial_ports()?;
        return Ok(());
    }

    let mut config = RecorderConfig::load().context("Failed to load configuration")?;
    args.apply(&mut config);

    if args.save_config {
        config.save().context("Failed to save configuration")?;
        info!("configuration saved");
    }

    let recorder = StakeRecorder::new(config);

    let shutdown = recorder.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            shutdown.cancel();
        }
    });

    recorder.run().await.context("Recorder stopped")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let args = Args::parse_from(["stake-logger", "--port", "COM9", "-o", "/data"]);
        let mut config = RecorderConfig::platform_default();
        args.apply(&mut config);

        assert_eq!(config.serial_port, "COM9");
        assert_eq!(config.baudrate, 115200);
        assert_eq!(config.output_dir, PathBuf::from("/data"));
    }

    #[test]
    fn test_no_flags_keep_config() {
        let args = Args::parse_from(["stake-logger"]);
        let mut config = RecorderConfig::platform_default();
        args.apply(&mut config);
        assert_eq!(config, RecorderConfig::platform_default());
    }
}
