//! Printer Gateway - Stateless Facade over the Print Subsystem
//!
//! The print subsystem owns all queue state. This module only issues
//! queries and submissions through a `CommandRunner` and hands back raw
//! text or parsed snapshots.

use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, error, warn};

use crate::config::PrintOptions;
use crate::error::CommandFailure;
use crate::print::PrinterStatus;
use crate::runner::{CommandRunner, ProcessRunner};

const JOB_ID_MARKER: &str = "request id is";
const PRINTER_LINE_MARKER: &str = "printer";
const READY_MARKERS: [&str; 2] = ["is idle", "is printing"];

#[async_trait]
pub trait PrinterGateway: Send + Sync {
    /// Never fails: an unreachable subsystem is an unavailable printer.
    async fn get_status(&self, printer: &str) -> PrinterStatus;

    /// Returns raw stdout; see `extract_job_id`.
    async fn submit_job(
        &self,
        file_path: &Path,
        printer: &str,
        copies: u32,
        options: &PrintOptions,
    ) -> Result<String, CommandFailure>;

    async fn cancel_job(&self, job_id: &str) -> Result<(), CommandFailure>;

    /// Best-effort; empty on failure.
    async fn list_printers(&self) -> Vec<String>;
}

/// Gateway speaking the CUPS `lp`/`lpstat`/`cancel` command set.
pub struct LpGateway<R = ProcessRunner> {
    runner: R,
}

impl LpGateway<ProcessRunner> {
    pub fn system() -> Self {
        Self { runner: ProcessRunner }
    }
}

impl<R: CommandRunner> LpGateway<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    async fn queue_length(&self, printer: &str) -> usize {
        match self.runner.run("lpstat", &args(["-o", printer])).await {
            Ok(out) => out.stdout.lines().filter(|l| !l.trim().is_empty()).count(),
            Err(e) => {
                debug!(printer, error = %e, "queue query failed, assuming empty");
                0
            }
        }
    }
}

#[async_trait]
impl<R: CommandRunner> PrinterGateway for LpGateway<R> {
    async fn get_status(&self, printer: &str) -> PrinterStatus {
        let out = match self.runner.run("lpstat", &args(["-p", printer])).await {
            Ok(out) => out,
            Err(e) => return PrinterStatus::unavailable(e.message),
        };

        let available = READY_MARKERS.iter().any(|m| out.stdout.contains(m));
        let queue_length = self.queue_length(printer).await;

        PrinterStatus {
            available,
            status_text: out.stdout.trim().to_string(),
            queue_length,
        }
    }

    async fn submit_job(
        &self,
        file_path: &Path,
        printer: &str,
        copies: u32,
        options: &PrintOptions,
    ) -> Result<String, CommandFailure> {
        let mut argv = args(["-d", printer, "-n"]);
        argv.push(copies.to_string());
        argv.push("-o".to_string());
        argv.push(format!("media={}", options.media));
        if options.fit_to_page {
            argv.push("-o".to_string());
            argv.push("fit-to-page".to_string());
        }
        argv.push("-o".to_string());
        argv.push(format!("print-quality={}", options.quality));
        argv.push(file_path.to_string_lossy().into_owned());

        let out = self.runner.run("lp", &argv).await?;
        if !out.stderr.trim().is_empty() {
            warn!(printer, stderr = %out.stderr.trim(), "print command wrote to stderr");
        }
        Ok(out.stdout)
    }

    async fn cancel_job(&self, job_id: &str) -> Result<(), CommandFailure> {
        self.runner.run("cancel", &args([job_id])).await.map(|_| ())
    }

    async fn list_printers(&self) -> Vec<String> {
        match self.runner.run("lpstat", &args(["-p"])).await {
            Ok(out) => parse_printer_names(&out.stdout),
            Err(e) => {
                error!(error = %e, "failed to list printers");
                vec![]
            }
        }
    }
}

/// Token after `request id is` in submission output, if present.
pub fn extract_job_id(stdout: &str) -> Option<String> {
    let start = stdout.find(JOB_ID_MARKER)? + JOB_ID_MARKER.len();
    stdout[start..].split_whitespace().next().map(str::to_string)
}

fn parse_printer_names(listing: &str) -> Vec<String> {
    listing
        .lines()
        .filter(|line| line.starts_with(PRINTER_LINE_MARKER))
        .filter_map(|line| line.split(' ').nth(1))
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn args<const N: usize>(parts: [&str; N]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}
