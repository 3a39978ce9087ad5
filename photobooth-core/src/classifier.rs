//! Error Classifier - Raw Print Diagnostics to Typed Kinds
//!
//! The print subsystem reports failures only as text. This is the single
//! place that text gets interpreted.

use crate::error::ErrorKind;

pub trait ErrorClassifier: Send + Sync {
    fn classify(&self, raw: &str) -> ErrorKind;
}

/// Ordered, case-insensitive substring table. First match wins; the
/// fallback is `PrintFailedUnknown`.
#[derive(Debug, Clone)]
pub struct SubstringClassifier {
    table: Vec<(Vec<&'static str>, ErrorKind)>,
}

impl SubstringClassifier {
    pub fn new() -> Self {
        Self {
            table: vec![
                (vec!["no such file or directory"], ErrorKind::FileNotFound),
                (vec!["not accepting jobs"], ErrorKind::PrinterNotAccepting),
                (vec!["out of paper"], ErrorKind::OutOfPaper),
                (vec!["out of ink", "low ink", "out of toner", "low toner"], ErrorKind::LowConsumable),
                (vec!["offline"], ErrorKind::PrinterOffline),
            ],
        }
    }
}

impl Default for SubstringClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorClassifier for SubstringClassifier {
    fn classify(&self, raw: &str) -> ErrorKind {
        let haystack = raw.to_lowercase();
        self.table
            .iter()
            .find(|(needles, _)| needles.iter().any(|n| haystack.contains(n)))
            .map(|(_, kind)| *kind)
            .unwrap_or(ErrorKind::PrintFailedUnknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_diagnostics() {
        let c = SubstringClassifier::new();
        assert_eq!(
            c.classify("lp: Error - unable to access \"/x.jpg\" - No such file or directory"),
            ErrorKind::FileNotFound
        );
        assert_eq!(
            c.classify("lp: Destination \"Canon\" is not accepting jobs."),
            ErrorKind::PrinterNotAccepting
        );
        assert_eq!(c.classify("printer is OUT OF PAPER"), ErrorKind::OutOfPaper);
        assert_eq!(c.classify("cartridge reports low ink"), ErrorKind::LowConsumable);
        assert_eq!(c.classify("Canon is offline"), ErrorKind::PrinterOffline);
    }

    #[test]
    fn test_order_is_respected() {
        // Both phrases present: the earlier table row wins
        let c = SubstringClassifier::new();
        assert_eq!(
            c.classify("not accepting jobs because printer is offline"),
            ErrorKind::PrinterNotAccepting
        );
    }

    #[test]
    fn test_fallback() {
        let c = SubstringClassifier::new();
        assert_eq!(c.classify("segmentation fault"), ErrorKind::PrintFailedUnknown);
        assert_eq!(c.classify(""), ErrorKind::PrintFailedUnknown);
    }
}
