//! Per-target outcomes collected during a pass.

use tracing::{debug, warn};

use super::ObjectCoords;

/// What happened to one desired document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetOutcome {
    Applied(String),
    Skipped(String),
    Failed(String),
}

impl TargetOutcome {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetOutcome::Applied(_) => "Applied",
            TargetOutcome::Skipped(_) => "Skipped",
            TargetOutcome::Failed(_) => "Failed",
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            TargetOutcome::Applied(m) | TargetOutcome::Skipped(m) | TargetOutcome::Failed(m) => m,
        }
    }
}

/// Everything the Status Aggregator needs from one pass.
///
/// Every desired document lands here exactly once; nothing is silently
/// dropped.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub outcomes: Vec<(ObjectCoords, TargetOutcome)>,
}

impl ReconcileReport {
    pub fn record(&mut self, coords: ObjectCoords, outcome: TargetOutcome) {
        match &outcome {
            TargetOutcome::Failed(message) => warn!("target {coords}: {message}"),
            other => debug!("target {coords}: {} ({})", other.as_str(), other.message()),
        }
        self.outcomes.push((coords, outcome));
    }

    #[must_use]
    pub fn applied(&self) -> usize {
        self.count(|o| matches!(o, TargetOutcome::Applied(_)))
    }

    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, TargetOutcome::Skipped(_)))
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, TargetOutcome::Failed(_)))
    }

    /// Message of the last recorded failure, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.outcomes.iter().rev().find_map(|(_, outcome)| match outcome {
            TargetOutcome::Failed(message) => Some(message.as_str()),
            _ => None,
        })
    }

    fn count(&self, predicate: impl Fn(&TargetOutcome) -> bool) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| predicate(outcome))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coords(name: &str) -> ObjectCoords {
        ObjectCoords {
            api_version: "v1".to_string(),
            kind: "ConfigMap".to_string(),
            namespace: Some("default".to_string()),
            name: name.to_string(),
        }
    }

    #[test]
    fn counts_and_last_error() {
        let mut report = ReconcileReport::default();
        report.record(coords("a"), TargetOutcome::Applied("created".to_string()));
        report.record(coords("b"), TargetOutcome::Failed("first".to_string()));
        report.record(coords("c"), TargetOutcome::Skipped("unchanged".to_string()));
        report.record(coords("d"), TargetOutcome::Failed("second".to_string()));

        assert_eq!(report.applied(), 1);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.failed(), 2);
        assert_eq!(report.last_error(), Some("second"));
    }
}
