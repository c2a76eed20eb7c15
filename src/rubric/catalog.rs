//! Static proficiency levels and rubric categories.

use std::fmt;

/// Number of proficiency tiers. Category descriptions are indexed by tier.
pub const LEVEL_COUNT: usize = 5;

/// Proficiency tier label, in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LevelLabel {
    Beginner,
    Developing,
    Competent,
    Proficient,
    Advanced,
}

impl LevelLabel {
    /// Keyword search order used when inferring a level from free text.
    pub const PRIORITY: [LevelLabel; LEVEL_COUNT] = [
        LevelLabel::Beginner,
        LevelLabel::Developing,
        LevelLabel::Competent,
        LevelLabel::Proficient,
        LevelLabel::Advanced,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LevelLabel::Beginner => "Beginner",
            LevelLabel::Developing => "Developing",
            LevelLabel::Competent => "Competent",
            LevelLabel::Proficient => "Proficient",
            LevelLabel::Advanced => "Advanced",
        }
    }

    /// Lowercase keyword matched against rubric text.
    pub fn keyword(self) -> &'static str {
        match self {
            LevelLabel::Beginner => "beginner",
            LevelLabel::Developing => "developing",
            LevelLabel::Competent => "competent",
            LevelLabel::Proficient => "proficient",
            LevelLabel::Advanced => "advanced",
        }
    }

    /// Score scaling factor for this tier.
    pub fn multiplier(self) -> f64 {
        match self {
            LevelLabel::Beginner => 1.40,
            LevelLabel::Developing => 1.25,
            LevelLabel::Competent => 1.15,
            LevelLabel::Proficient => 1.00,
            LevelLabel::Advanced => 0.85,
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        Self::PRIORITY
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(label.trim()))
    }
}

impl fmt::Display for LevelLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProficiencyLevel {
    pub id: &'static str,
    pub label: LevelLabel,
}

/// One evaluation dimension with an optional description per tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RubricCategory {
    pub key: &'static str,
    pub name: &'static str,
    pub descriptions: [Option<&'static str>; LEVEL_COUNT],
}

impl RubricCategory {
    /// Level indices that carry a description.
    pub fn valid_levels(&self) -> impl Iterator<Item = usize> + '_ {
        self.descriptions
            .iter()
            .enumerate()
            .filter_map(|(i, d)| d.map(|_| i))
    }

    pub fn is_valid_at(&self, level: usize) -> bool {
        self.description(level).is_some()
    }

    pub fn description(&self, level: usize) -> Option<&'static str> {
        self.descriptions.get(level).copied().flatten()
    }
}

static LEVELS: [ProficiencyLevel; LEVEL_COUNT] = [
    ProficiencyLevel { id: "1", label: LevelLabel::Beginner },
    ProficiencyLevel { id: "2", label: LevelLabel::Developing },
    ProficiencyLevel { id: "3", label: LevelLabel::Competent },
    ProficiencyLevel { id: "4", label: LevelLabel::Proficient },
    ProficiencyLevel { id: "5", label: LevelLabel::Advanced },
];

static CATEGORIES: [RubricCategory; 8] = [
    RubricCategory {
        key: "comprehensibility",
        name: "Comprehensibility",
        descriptions: [
            Some("Can be understood with effort"),
            Some("Generally understandable"),
            Some("Clear & easy to follow"),
            Some("Very clear, natural"),
            Some("Effortless clarity; polished"),
        ],
    },
    RubricCategory {
        key: "pronunciation",
        name: "Pronunciation & Intonation",
        descriptions: [
            Some("Basic sounds mostly clear"),
            Some("Mostly clear; predictable errors"),
            Some("Clear with appropriate stress"),
            Some("Natural, controlled intonation"),
            Some("Expressive, impactful intonation"),
        ],
    },
    RubricCategory {
        key: "grammar",
        name: "Grammar Control",
        descriptions: [
            Some("Simple sentences; frequent errors"),
            Some("Basic accuracy; attempts variety"),
            Some("Mostly accurate; some complexity"),
            Some("Accurate, varied structures"),
            Some("Sophisticated, precise grammar"),
        ],
    },
    RubricCategory {
        key: "vocabulary",
        name: "Vocabulary & Word Choice",
        descriptions: [
            Some("Very limited; repetitive"),
            Some("Adequate for common topics"),
            Some("Good range; mostly appropriate"),
            Some("Precise, varied vocabulary"),
            Some("Nuanced, strategic word choice"),
        ],
    },
    RubricCategory {
        key: "fluency",
        name: "Fluency",
        descriptions: [
            Some("Frequent pauses; fragmented"),
            Some("Hesitant but improving"),
            Some("Mostly smooth with some pauses"),
            Some("Smooth, confident"),
            Some("Effortless, controlled pacing"),
        ],
    },
    RubricCategory {
        key: "organization",
        name: "Organization of Ideas",
        descriptions: [
            None,
            Some("Basic sequencing"),
            Some("Clear structure"),
            Some("Well organized with transitions"),
            Some("Strategic, persuasive flow"),
        ],
    },
    RubricCategory {
        key: "audience",
        name: "Audience Awareness",
        descriptions: [
            None,
            None,
            Some("Adjusts tone occasionally"),
            Some("Adapts tone/examples to audience"),
            Some("Highly adaptive; anticipates reactions"),
        ],
    },
    RubricCategory {
        key: "interaction",
        name: "Interaction & Spontaneous Response",
        descriptions: [
            None,
            Some("Responds to simple questions"),
            Some("Handles basic Q&A"),
            Some("Strong, confident interaction"),
            Some("Agile, persuasive, diplomatic improvisation"),
        ],
    },
];

pub fn levels() -> &'static [ProficiencyLevel] {
    &LEVELS
}

pub fn level(index: usize) -> Option<&'static ProficiencyLevel> {
    LEVELS.get(index)
}

pub fn categories() -> &'static [RubricCategory] {
    &CATEGORIES
}

pub fn category(key: &str) -> Option<&'static RubricCategory> {
    CATEGORIES.iter().find(|c| c.key == key)
}

/// Multiplier for a level label as sent or received over the wire.
/// Unknown labels scale by 1.0.
pub fn multiplier_for(label: &str) -> f64 {
    LevelLabel::parse(label).map_or(1.0, LevelLabel::multiplier)
}

/// Whole-percent deviation of a multiplier from 1.0 (1.15 -> 15, 0.85 -> -15).
pub fn adjustment_percent(multiplier: f64) -> i64 {
    ((multiplier - 1.0) * 100.0).round() as i64
}

/// "+15% generous", "-15% strict" or "no adjustment".
pub fn describe_adjustment(multiplier: f64) -> String {
    let pct = adjustment_percent(multiplier);
    if pct > 0 {
        format!("+{pct}% generous")
    } else if pct < 0 {
        format!("{pct}% strict")
    } else {
        "no adjustment".to_string()
    }
}
