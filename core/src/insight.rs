// Structured advisory model and the total parser over agent output

use serde::{Deserialize, Serialize};

use crate::record::SensorRecord;

/// Text substituted for the agent reply when invocation fails outright or
/// returns nothing. Parses into a well-formed failure insight.
pub const FAILURE_SENTINEL: &str =
    r#"{"advice":"could not generate","confidence":0,"reason":"invoke failed"}"#;

/// Structured advisory derived from agent output.
///
/// All three keys are always present; `confidence` serializes as `null`
/// when the agent did not provide a usable score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub advice: String,
    pub confidence: Option<f64>,
    pub reason: String,
}

/// Parse agent output into an [`Insight`]. Total: anything that does not
/// decode as the expected object becomes the advice text verbatim, so no
/// model output is silently dropped.
pub fn parse_insight(text: &str) -> Insight {
    match serde_json::from_str::<Insight>(text) {
        Ok(insight) => insight,
        Err(_) => Insight {
            advice: text.to_string(),
            confidence: None,
            reason: String::new(),
        },
    }
}

/// Persisted bundle: the source reading, the derived insight, and the raw
/// agent text (kept for auditability). Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightRecord {
    pub sensor: SensorRecord,
    pub insight: Insight,
    pub agent_raw: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_output() {
        let insight =
            parse_insight(r#"{"advice":"irrigate now","confidence":80,"reason":"low moisture"}"#);
        assert_eq!(insight.advice, "irrigate now");
        assert_eq!(insight.confidence, Some(80.0));
        assert_eq!(insight.reason, "low moisture");
    }

    #[test]
    fn null_confidence_is_accepted() {
        let insight = parse_insight(r#"{"advice":"wait","confidence":null,"reason":"stable"}"#);
        assert_eq!(insight.confidence, None);
        assert_eq!(insight.reason, "stable");
    }

    #[test]
    fn wrong_shape_degrades_to_raw_text() {
        let text = r#"{"recommendation":"irrigate"}"#;
        let insight = parse_insight(text);
        assert_eq!(insight.advice, text);
        assert_eq!(insight.confidence, None);
        assert_eq!(insight.reason, "");
    }

    #[test]
    fn plain_text_degrades_to_raw_text() {
        let insight = parse_insight("Irrigate tomorrow morning.");
        assert_eq!(insight.advice, "Irrigate tomorrow morning.");
        assert_eq!(insight.confidence, None);
    }

    #[test]
    fn empty_input_yields_empty_fallback() {
        let insight = parse_insight("");
        assert_eq!(insight.advice, "");
        assert_eq!(insight.confidence, None);
        assert_eq!(insight.reason, "");
    }

    #[test]
    fn sentinel_parses_to_failure_insight() {
        let insight = parse_insight(FAILURE_SENTINEL);
        assert_eq!(insight.advice, "could not generate");
        assert_eq!(insight.confidence, Some(0.0));
        assert_eq!(insight.reason, "invoke failed");
    }

    #[test]
    fn confidence_serializes_as_null_when_unknown() {
        let insight = Insight {
            advice: "a".to_string(),
            confidence: None,
            reason: String::new(),
        };
        let json = serde_json::to_string(&insight).unwrap();
        assert!(json.contains(r#""confidence":null"#));
    }
}
