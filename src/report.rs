//! Display model for the evaluation history.
//!
//! `build` is a pure function of the history and scoring mode; the widget
//! layer only lays out what it returns.

use crate::config::ScoringMode;
use crate::evaluation::{Evaluation, EvaluationHistory};
use crate::rubric::catalog::{adjustment_percent, describe_adjustment};

/// Severity bucket for a 0-100 score. 60-69 counts as fair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreClass {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl ScoreClass {
    pub fn classify(score: f64) -> Self {
        if score >= 90.0 {
            ScoreClass::Excellent
        } else if score >= 80.0 {
            ScoreClass::Good
        } else if score >= 60.0 {
            ScoreClass::Fair
        } else {
            ScoreClass::Poor
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ScoreClass::Excellent => "excellent",
            ScoreClass::Good => "good",
            ScoreClass::Fair => "fair",
            ScoreClass::Poor => "poor",
        }
    }

    /// libadwaita style class used to tint the score.
    pub fn css_class(self) -> &'static str {
        match self {
            ScoreClass::Excellent | ScoreClass::Good => "success",
            ScoreClass::Fair => "warning",
            ScoreClass::Poor => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreCell {
    pub value: f64,
    pub class: ScoreClass,
}

impl ScoreCell {
    fn new(value: f64) -> Self {
        Self {
            value,
            class: ScoreClass::classify(value),
        }
    }

    /// "82/100", "82.5/100".
    pub fn text(&self) -> String {
        format!("{}/100", self.value)
    }
}

/// Level-based scaling relative to a native-speaker base score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBreakdown {
    pub base_score: f64,
    pub multiplier: f64,
    pub final_score: ScoreCell,
}

impl ScoreBreakdown {
    /// "70/100 × 1.15 → 80.5/100"
    pub fn text(&self) -> String {
        format!(
            "{}/100 \u{d7} {:.2} \u{2192} {}",
            self.base_score,
            self.multiplier,
            self.final_score.text()
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CriterionRow {
    pub criterion: String,
    pub score: ScoreCell,
    pub feedback: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportEntry {
    /// Newest entry carries the highest number.
    pub number: usize,
    pub timestamp: String,
    pub question: String,
    pub response_preview: String,
    pub full_response: String,
    pub level: String,
    /// Signed percent, omitted when there is no scaling.
    pub adjustment_percent: Option<i64>,
    pub cache_note: Option<&'static str>,
    pub overall: ScoreCell,
    pub breakdown: Option<ScoreBreakdown>,
    pub summary: Option<String>,
    pub criteria: Vec<CriterionRow>,
}

impl ReportEntry {
    pub fn title(&self) -> String {
        format!("Evaluation #{}", self.number)
    }

    /// "(+15% generous)" / "(-15% strict)".
    pub fn adjustment_text(&self) -> Option<String> {
        self.adjustment_percent.map(|pct| {
            if pct > 0 {
                format!("(+{pct}% generous)")
            } else {
                format!("({pct}% strict)")
            }
        })
    }
}

pub fn build(history: &EvaluationHistory, mode: ScoringMode) -> Vec<ReportEntry> {
    history
        .numbered()
        .map(|(number, eval)| build_entry(number, eval, mode))
        .collect()
}

/// Status line after a successful evaluation. The adjustment is the one the
/// server applied; server-side scoring leaves it out when none was reported.
pub fn completion_status(eval: &Evaluation, mode: ScoringMode) -> String {
    let adjustment = if mode.is_client_side() {
        Some(eval.multiplier_or_default())
    } else {
        eval.multiplier
    };
    let head = format!(
        "Evaluation complete: {}/100 for {}",
        eval.overall_score,
        eval.level_display()
    );
    match adjustment {
        Some(m) => format!("{head} ({})", describe_adjustment(m)),
        None => head,
    }
}

fn build_entry(number: usize, eval: &Evaluation, mode: ScoringMode) -> ReportEntry {
    let multiplier = eval.multiplier_or_default();
    let pct = adjustment_percent(multiplier);
    let overall = ScoreCell::new(eval.overall_score);

    let reported = eval.base_score.is_some() || eval.multiplier.is_some();
    let breakdown = (mode.is_client_side() || reported).then(|| ScoreBreakdown {
        base_score: eval.base_score_or_default(),
        multiplier,
        final_score: overall.clone(),
    });

    ReportEntry {
        number,
        timestamp: eval.timestamp.clone(),
        question: eval.question.clone(),
        response_preview: eval.response_preview.clone(),
        full_response: eval.full_response.clone(),
        level: eval.level_display().to_string(),
        adjustment_percent: (pct != 0).then_some(pct),
        cache_note: eval.cache_note(),
        overall,
        breakdown,
        summary: eval.summary.clone(),
        criteria: eval
            .criteria
            .iter()
            .map(|c| CriterionRow {
                criterion: c.criterion.clone(),
                score: ScoreCell::new(c.score),
                feedback: c.feedback.clone(),
            })
            .collect(),
    }
}
