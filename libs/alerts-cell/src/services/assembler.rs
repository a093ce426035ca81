// libs/alerts-cell/src/services/assembler.rs
//
// Candidate validation/defaulting. Model output is best-effort JSON;
// every field gets an explicit default rather than failing the batch.

use regex::Regex;
use serde_json::{json, Value};
use tracing::warn;

use crate::models::{AlertCandidate, ValidatedAlert};

pub const DEFAULT_ALERT_TYPE: &str = "general";
pub const DEFAULT_TITLE: &str = "Health Alert";
pub const DEFAULT_MESSAGE: &str = "Abnormal health pattern detected";
pub const DEFAULT_SEVERITY: &str = "medium";

/// Apply the defaulting table to one candidate. Severity is not validated
/// against the UI's closed set here; that constraint lives upstream.
pub fn validate_candidate(candidate: AlertCandidate) -> ValidatedAlert {
    ValidatedAlert {
        alert_type: candidate
            .alert_type
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_ALERT_TYPE.to_string()),
        title: candidate
            .title
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        message: candidate
            .message
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_MESSAGE.to_string()),
        severity: candidate
            .severity
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SEVERITY.to_string()),
        metadata: candidate.metadata.unwrap_or_else(|| json!({})),
    }
}

/// Parse the model's reply into candidates. Replies often arrive wrapped
/// in a ```json fence; anything that is not a JSON array parses to an
/// empty candidate list rather than an error.
pub fn parse_candidates(raw: &str) -> Vec<AlertCandidate> {
    let fence = Regex::new(r"```json\n?|\n?```").unwrap();
    let cleaned = fence.replace_all(raw, "");
    let cleaned = cleaned.trim();

    match serde_json::from_str::<Value>(cleaned) {
        Ok(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        Ok(_) => {
            warn!("Model reply was valid JSON but not an array; ignoring");
            vec![]
        }
        Err(e) => {
            warn!("Error parsing model reply: {}", e);
            vec![]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_candidate_gets_full_default_set() {
        let alert = validate_candidate(AlertCandidate::default());

        assert_eq!(alert.alert_type, "general");
        assert_eq!(alert.title, "Health Alert");
        assert_eq!(alert.message, "Abnormal health pattern detected");
        assert_eq!(alert.severity, "medium");
        assert_eq!(alert.metadata, json!({}));
    }

    #[test]
    fn provided_fields_survive_validation() {
        let alert = validate_candidate(AlertCandidate {
            alert_type: Some("heart_rate".to_string()),
            title: Some("Elevated Heart Rate Detected".to_string()),
            message: Some("Peak 135 bpm at 14:30".to_string()),
            severity: Some("critical".to_string()),
            metadata: Some(json!({"peak_hr": 135})),
        });

        assert_eq!(alert.alert_type, "heart_rate");
        assert_eq!(alert.severity, "critical");
        assert_eq!(alert.metadata["peak_hr"], 135);
    }

    #[test]
    fn unrecognized_severity_passes_through() {
        // the closed severity set is a UI concern, not enforced here
        let alert = validate_candidate(AlertCandidate {
            severity: Some("catastrophic".to_string()),
            ..AlertCandidate::default()
        });
        assert_eq!(alert.severity, "catastrophic");
    }

    #[test]
    fn fenced_reply_parses() {
        let raw = "```json\n[{\"alert_type\": \"oxygen\", \"severity\": \"high\"}]\n```";
        let candidates = parse_candidates(raw);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].alert_type.as_deref(), Some("oxygen"));
    }

    #[test]
    fn bare_array_parses() {
        let candidates = parse_candidates("[{}, {\"title\": \"T\"}]");
        assert_eq!(candidates.len(), 2);
    }

    #[test]
    fn non_array_reply_is_empty_list() {
        assert!(parse_candidates("{\"alert_type\": \"oops\"}").is_empty());
        assert!(parse_candidates("No concerning patterns found.").is_empty());
        assert!(parse_candidates("").is_empty());
    }
}
