use std::collections::VecDeque;

use crate::rubric::LevelLabel;

const PREVIEW_CHARS: usize = 100;
const DEFAULT_BASE_SCORE: f64 = 70.0;
const DEFAULT_MULTIPLIER: f64 = 1.0;

/// Fields posted to the evaluate endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationRequest {
    pub question: String,
    pub rubrics: String,
    pub response: String,
    /// Only sent when known.
    pub level: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CriterionResult {
    pub criterion: String,
    pub score: f64,
    pub feedback: String,
}

/// Normalized body of a successful evaluate call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EvaluationResponse {
    pub overall_score: f64,
    pub base_score: Option<f64>,
    pub multiplier: Option<f64>,
    pub evaluated_level: Option<String>,
    pub cache_used: Option<bool>,
    pub summary: Option<String>,
    pub criteria: Vec<CriterionResult>,
}

/// One completed evaluation as kept in the session history.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub timestamp: String,
    pub question: String,
    pub response_preview: String,
    pub full_response: String,
    pub criteria: Vec<CriterionResult>,
    pub overall_score: f64,
    pub base_score: Option<f64>,
    pub multiplier: Option<f64>,
    pub level: Option<String>,
    pub cache_used: Option<bool>,
    pub summary: Option<String>,
}

impl Evaluation {
    pub fn new(request: &EvaluationRequest, response: EvaluationResponse, timestamp: String) -> Self {
        let level = request
            .level
            .clone()
            .filter(|l| !l.is_empty())
            .or(response.evaluated_level);
        Self {
            timestamp,
            question: request.question.clone(),
            response_preview: truncate_response(&request.response),
            full_response: request.response.clone(),
            criteria: response.criteria,
            overall_score: response.overall_score,
            base_score: response.base_score,
            multiplier: response.multiplier,
            level,
            cache_used: response.cache_used,
            summary: response.summary,
        }
    }

    pub fn base_score_or_default(&self) -> f64 {
        self.base_score.unwrap_or(DEFAULT_BASE_SCORE)
    }

    pub fn multiplier_or_default(&self) -> f64 {
        self.multiplier.unwrap_or(DEFAULT_MULTIPLIER)
    }

    pub fn level_display(&self) -> &str {
        self.level.as_deref().unwrap_or("Not specified")
    }

    pub fn cache_note(&self) -> Option<&'static str> {
        self.cache_used.map(|used| {
            if used {
                "Used cached base score"
            } else {
                "Calculated new base score"
            }
        })
    }
}

/// Session-lifetime evaluations, most recent first.
#[derive(Debug, Clone, Default)]
pub struct EvaluationHistory {
    entries: VecDeque<Evaluation>,
}

impl EvaluationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, evaluation: Evaluation) -> &Evaluation {
        self.entries.push_front(evaluation);
        &self.entries[0]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<&Evaluation> {
        self.entries.front()
    }

    /// Entries paired with their display number: N for the newest down to 1.
    pub fn numbered(&self) -> impl Iterator<Item = (usize, &Evaluation)> + '_ {
        let total = self.entries.len();
        self.entries
            .iter()
            .enumerate()
            .map(move |(i, e)| (total - i, e))
    }
}

/// First level keyword found in free-form rubric text, searched in the
/// fixed order beginner, developing, competent, proficient, advanced.
pub fn infer_level(rubrics: &str) -> Option<LevelLabel> {
    let lower = rubrics.to_lowercase();
    LevelLabel::PRIORITY
        .into_iter()
        .find(|level| lower.contains(level.keyword()))
}

/// First 100 characters plus "..." when longer.
pub fn truncate_response(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
