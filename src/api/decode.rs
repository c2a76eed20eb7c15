//! Normalization of backend JSON bodies.
//!
//! The evaluator has shipped several spellings for the same fields. Each
//! field has a fixed precedence list: the first key holding a usable value
//! wins, later keys are only consulted when earlier ones are absent or null.

use serde_json::{Map, Value};

use crate::evaluation::{CriterionResult, EvaluationResponse};

const OVERALL_SCORE_KEYS: &[&str] = &["overall_score", "overallScore"];
const BASE_SCORE_KEYS: &[&str] = &["base_score", "baseScore"];
const MULTIPLIER_KEYS: &[&str] = &["multiplier_applied", "scaling_applied"];
const EVALUATED_LEVEL_KEYS: &[&str] = &["evaluated_level"];
const CACHE_USED_KEYS: &[&str] = &["cache_used"];
const SUMMARY_KEYS: &[&str] = &["summary"];
const CRITERIA_KEYS: &[&str] = &["rubrics"];

/// Backend connectivity as shown in the header badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Connected,
    NotConfigured,
    Disconnected,
}

impl HealthStatus {
    pub fn label(self) -> &'static str {
        match self {
            HealthStatus::Connected => "Connected",
            HealthStatus::NotConfigured => "Not Configured",
            HealthStatus::Disconnected => "Disconnected",
        }
    }
}

/// `{status: "healthy", api_configured: true}` is the only connected shape.
pub fn decode_health(body: &Value) -> HealthStatus {
    let healthy = body.get("status").and_then(Value::as_str) == Some("healthy");
    let configured = body
        .get("api_configured")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if healthy && configured {
        HealthStatus::Connected
    } else {
        HealthStatus::NotConfigured
    }
}

/// Transcript text, empty when the field is absent.
pub fn decode_transcript(body: &Value) -> String {
    body.get("text")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

pub fn decode_evaluation(body: &Value) -> EvaluationResponse {
    let empty = Map::new();
    let obj = body.as_object().unwrap_or(&empty);

    EvaluationResponse {
        overall_score: first_number(obj, OVERALL_SCORE_KEYS).unwrap_or(0.0),
        base_score: first_number(obj, BASE_SCORE_KEYS),
        multiplier: first_number(obj, MULTIPLIER_KEYS),
        evaluated_level: first_string(obj, EVALUATED_LEVEL_KEYS).filter(|s| !s.is_empty()),
        cache_used: first_present(obj, CACHE_USED_KEYS).and_then(Value::as_bool),
        summary: first_string(obj, SUMMARY_KEYS).filter(|s| !s.is_empty()),
        criteria: first_present(obj, CRITERIA_KEYS)
            .and_then(Value::as_array)
            .map(|items| items.iter().map(decode_criterion).collect())
            .unwrap_or_default(),
    }
}

fn decode_criterion(item: &Value) -> CriterionResult {
    let empty = Map::new();
    let obj = item.as_object().unwrap_or(&empty);
    CriterionResult {
        criterion: first_string(obj, &["criterion"]).unwrap_or_default(),
        score: first_number(obj, &["score"]).unwrap_or(0.0),
        feedback: first_string(obj, &["feedback"]).unwrap_or_default(),
    }
}

fn first_present<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| !v.is_null())
}

fn first_number(obj: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find_map(as_number)
}

fn first_string(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find_map(|v| v.as_str().map(str::to_string))
}

/// Numbers, or strings holding a number (some model backends quote them).
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snake_case_fields() {
        let body = json!({
            "overall_score": 82,
            "base_score": 71.5,
            "multiplier_applied": 1.15,
            "evaluated_level": "Competent",
            "cache_used": true,
            "summary": "Solid answer",
            "rubrics": [
                {"criterion": "Fluency", "score": 80, "feedback": "Smooth"},
                {"criterion": "Grammar Control", "score": 65}
            ]
        });
        let r = decode_evaluation(&body);
        assert_eq!(r.overall_score, 82.0);
        assert_eq!(r.base_score, Some(71.5));
        assert_eq!(r.multiplier, Some(1.15));
        assert_eq!(r.evaluated_level.as_deref(), Some("Competent"));
        assert_eq!(r.cache_used, Some(true));
        assert_eq!(r.summary.as_deref(), Some("Solid answer"));
        assert_eq!(r.criteria.len(), 2);
        assert_eq!(r.criteria[1].feedback, "");
    }

    #[test]
    fn test_camel_case_and_scaling_fallbacks() {
        let body = json!({
            "overallScore": 64,
            "baseScore": 55,
            "scaling_applied": 1.25
        });
        let r = decode_evaluation(&body);
        assert_eq!(r.overall_score, 64.0);
        assert_eq!(r.base_score, Some(55.0));
        assert_eq!(r.multiplier, Some(1.25));
    }

    #[test]
    fn test_precedence_prefers_first_key() {
        let body = json!({
            "overall_score": 90,
            "overallScore": 10,
            "multiplier_applied": null,
            "scaling_applied": 0.85
        });
        let r = decode_evaluation(&body);
        assert_eq!(r.overall_score, 90.0);
        assert_eq!(r.multiplier, Some(0.85));
    }

    #[test]
    fn test_missing_fields_default() {
        let r = decode_evaluation(&json!({}));
        assert_eq!(r, EvaluationResponse::default());
        assert_eq!(r.overall_score, 0.0);

        // Non-object bodies decode to defaults as well.
        assert_eq!(decode_evaluation(&json!([1, 2])), EvaluationResponse::default());
    }

    #[test]
    fn test_quoted_numbers() {
        let body = json!({"overall_score": "77", "rubrics": [{"criterion": "X", "score": " 12.5 "}]});
        let r = decode_evaluation(&body);
        assert_eq!(r.overall_score, 77.0);
        assert_eq!(r.criteria[0].score, 12.5);
    }

    #[test]
    fn test_health_states() {
        assert_eq!(
            decode_health(&json!({"status": "healthy", "api_configured": true})),
            HealthStatus::Connected
        );
        assert_eq!(
            decode_health(&json!({"status": "healthy", "api_configured": false})),
            HealthStatus::NotConfigured
        );
        assert_eq!(
            decode_health(&json!({"status": "degraded", "api_configured": true})),
            HealthStatus::NotConfigured
        );
        assert_eq!(decode_health(&json!({})), HealthStatus::NotConfigured);
    }

    #[test]
    fn test_transcript_defaults_to_empty() {
        assert_eq!(decode_transcript(&json!({"text": "hello"})), "hello");
        assert_eq!(decode_transcript(&json!({})), "");
    }
}
