//! Print Dispatcher - Single Entry Point for Printing
//!
//! CRITICAL: policy checks run in a fixed order and every one of them runs
//! before the gateway is asked to submit anything.
//!
//! CHECK_COPIES -> CHECK_ENABLED -> RESOLVE_ARTIFACT -> CHECK_AVAILABLE -> SUBMIT
//!
//! No step is retried. No queue state is kept here; duplicate concurrent
//! requests are both forwarded.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::classifier::{ErrorClassifier, SubstringClassifier};
use crate::config::PrintConfig;
use crate::error::ErrorKind;
use crate::gateway::{extract_job_id, PrinterGateway};
use crate::print::{PrintResult, PrinterStatus};
use crate::store::ArtifactStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStage {
    CheckCopies,
    CheckEnabled,
    ResolveArtifact,
    CheckAvailable,
    Submit,
}

impl fmt::Display for DispatchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CheckCopies => "check_copies",
            Self::CheckEnabled => "check_enabled",
            Self::ResolveArtifact => "resolve_artifact",
            Self::CheckAvailable => "check_available",
            Self::Submit => "submit",
        };
        f.write_str(name)
    }
}

pub struct PrintDispatcher<G, C = SubstringClassifier> {
    store: Arc<ArtifactStore>,
    gateway: G,
    classifier: C,
    config: PrintConfig,
}

impl<G: PrinterGateway> PrintDispatcher<G, SubstringClassifier> {
    pub fn new(store: Arc<ArtifactStore>, gateway: G, config: PrintConfig) -> Self {
        Self::with_classifier(store, gateway, SubstringClassifier::new(), config)
    }
}

impl<G: PrinterGateway, C: ErrorClassifier> PrintDispatcher<G, C> {
    pub fn with_classifier(
        store: Arc<ArtifactStore>,
        gateway: G,
        classifier: C,
        config: PrintConfig,
    ) -> Self {
        Self { store, gateway, classifier, config }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn config(&self) -> &PrintConfig {
        &self.config
    }

    /// Print `copies` of the stored artifact `id` on the configured printer.
    #[instrument(skip(self), fields(printer = %self.config.printer_name))]
    pub async fn dispatch(&self, id: &str, copies: u32) -> PrintResult {
        debug!(stage = %DispatchStage::CheckCopies);
        if copies < 1 || copies > self.config.max_copies {
            return PrintResult::failure_with(
                ErrorKind::InvalidCopyCount,
                format!(
                    "Invalid number of copies. Must be between 1 and {}",
                    self.config.max_copies
                ),
            );
        }

        debug!(stage = %DispatchStage::CheckEnabled);
        if !self.config.enabled {
            return PrintResult::failure(ErrorKind::PrintingDisabled);
        }

        debug!(stage = %DispatchStage::ResolveArtifact);
        let artifact = match self.store.locate(id) {
            Ok(artifact) => artifact,
            Err(e) => {
                warn!(error = %e, "artifact rejected for printing");
                return PrintResult::failure(e.kind());
            }
        };

        debug!(stage = %DispatchStage::CheckAvailable);
        let status = self.gateway.get_status(&self.config.printer_name).await;
        if !status.available {
            warn!(status = %status.status_text, "printer unavailable");
            return PrintResult::failure_with(
                ErrorKind::PrinterUnavailable,
                format!("{}: {}", ErrorKind::PrinterUnavailable.user_message(), status.status_text),
            )
            .with_detail(status.status_text);
        }

        debug!(stage = %DispatchStage::Submit);
        let submitted = self
            .gateway
            .submit_job(
                &artifact.absolute_path,
                &self.config.printer_name,
                copies,
                &self.config.options,
            )
            .await;

        match submitted {
            Ok(stdout) => {
                let job_id = extract_job_id(&stdout);
                info!(job_id = ?job_id, "print job accepted");
                PrintResult::success(PrintResult::printing_message(copies), job_id)
            }
            Err(e) => {
                let kind = self.classifier.classify(&e.message);
                error!(kind = %kind, error = %e, "print job failed");
                PrintResult::failure(kind).with_detail(e.message)
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn cancel(&self, job_id: &str) -> PrintResult {
        match self.gateway.cancel_job(job_id).await {
            Ok(()) => {
                info!("print job cancelled");
                PrintResult::success("The print job was cancelled", None)
            }
            Err(e) => {
                error!(error = %e, "failed to cancel print job");
                PrintResult::failure(ErrorKind::CancelFailed)
            }
        }
    }

    /// Availability check of the configured printer as a print outcome.
    pub async fn test_printer(&self) -> PrintResult {
        let status = self.status().await;
        if !status.available {
            return PrintResult::failure_with(
                ErrorKind::PrinterUnavailable,
                format!("{}: {}", ErrorKind::PrinterUnavailable.user_message(), status.status_text),
            )
            .with_detail(status.status_text);
        }
        PrintResult::success(format!("The printer is available. Status: {}", status.status_text), None)
    }

    pub async fn status(&self) -> PrinterStatus {
        self.gateway.get_status(&self.config.printer_name).await
    }

    pub async fn printers(&self) -> Vec<String> {
        self.gateway.list_printers().await
    }
}
