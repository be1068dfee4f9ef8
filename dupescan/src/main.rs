//! The canonical client binary for running duplicate scans.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(clippy::unwrap_used)]

use std::sync::Arc;

use cancel::Token;
use clap::Parser;
use dupescan::{config, progress::TotalTime};
use log::Level;
use stable_eyre::{eyre::Context, Result};
use stderrlog::ColorChoice;

#[derive(Parser, Debug)]
#[clap(version, about)]
struct Cmd {
    #[clap(flatten)]
    scan: config::Scan,

    #[clap(flatten)]
    outputs: config::Outputs,

    #[clap(flatten)]
    thresholds: config::Thresholds,
}

impl Cmd {
    fn validate(self) -> Result<Self> {
        Ok(Self {
            scan: self.scan.validate()?,
            outputs: self.outputs.validate()?,
            thresholds: self.thresholds,
        })
    }
}

fn main() -> Result<()> {
    stable_eyre::install()?;
    let total_time = TotalTime::start();

    let cmd = Cmd::parse().validate()?;
    init_logging(&cmd.scan)?;

    let token = Arc::new(Token::new());
    let handler = token.clone();
    ctrlc::set_handler(move || handler.cancel()).context("install interrupt handler")?;

    let summary = dupescan::run(cmd.scan, cmd.outputs, cmd.thresholds, &token)?;
    println!("{summary}");
    println!("Time taken: {}", total_time.string());
    Ok(())
}

/// Configures the global logger for the application based on self.
fn init_logging(scan: &config::Scan) -> Result<()> {
    stderrlog::new()
        .module(module_path!())
        .module("dupescan")
        .module("scantree")
        .module("filedb")
        .module("fingerprint")
        .color(ColorChoice::Never)
        .verbosity(if scan.debug() {
            Level::Debug
        } else {
            Level::Info
        })
        .init()?;
    Ok(())
}
