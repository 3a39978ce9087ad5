//! Print Outcomes
//!
//! Every print-side operation ends in a `PrintResult`. Constructors keep
//! the success/failure shape consistent so callers never assemble one by hand.

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

/// Snapshot of one printer as reported by the print subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrinterStatus {
    pub available: bool,
    /// Raw diagnostic text from the status query
    pub status_text: String,
    /// Advisory; zero when the queue could not be read
    pub queue_length: usize,
}

impl PrinterStatus {
    pub fn unavailable(status_text: impl Into<String>) -> Self {
        Self {
            available: false,
            status_text: status_text.into(),
            queue_length: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Raw subsystem text, attached only to `PrinterUnavailable` and
    /// `PrintFailedUnknown`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl PrintResult {
    pub fn success(message: impl Into<String>, job_id: Option<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            job_id,
            error_kind: None,
            detail: None,
        }
    }

    /// Failure with the kind's canonical message.
    pub fn failure(kind: ErrorKind) -> Self {
        Self::failure_with(kind, kind.user_message())
    }

    pub fn failure_with(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            job_id: None,
            error_kind: Some(kind),
            detail: None,
        }
    }

    /// Attach raw diagnostic text. Dropped for kinds that are fully
    /// described by their classification.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        if matches!(
            self.error_kind,
            Some(ErrorKind::PrinterUnavailable) | Some(ErrorKind::PrintFailedUnknown)
        ) {
            self.detail = Some(detail.into());
        }
        self
    }

    /// Message for an accepted job, depending on copy count.
    pub fn printing_message(copies: u32) -> String {
        if copies == 1 {
            "Your photo is being printed...".to_string()
        } else {
            format!("{} photos are being printed...", copies)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_only_on_diagnostic_kinds() {
        let r = PrintResult::failure(ErrorKind::OutOfPaper).with_detail("raw lp text");
        assert_eq!(r.detail, None);

        let r = PrintResult::failure(ErrorKind::PrintFailedUnknown).with_detail("raw lp text");
        assert_eq!(r.detail.as_deref(), Some("raw lp text"));
    }

    #[test]
    fn test_serialized_shape() {
        let r = PrintResult::failure(ErrorKind::InvalidCopyCount);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["errorKind"], "INVALID_COPY_COUNT");
        assert!(json.get("jobId").is_none());
    }

    #[test]
    fn test_printing_message_plural() {
        assert_eq!(PrintResult::printing_message(1), "Your photo is being printed...");
        assert_eq!(PrintResult::printing_message(3), "3 photos are being printed...");
    }
}
