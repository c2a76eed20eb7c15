use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Where level-based score adjustment is worked out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    /// The client announces the level in the rubric text, shows catalog
    /// multipliers and always renders the base-score breakdown.
    #[default]
    ClientSide,
    /// Scaling is left to the server; the breakdown is rendered only when
    /// the server reports it.
    ServerSide,
}

impl ScoringMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "client" | "client_side" => Some(ScoringMode::ClientSide),
            "server" | "server_side" => Some(ScoringMode::ServerSide),
            _ => None,
        }
    }

    pub fn is_client_side(self) -> bool {
        self == ScoringMode::ClientSide
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub scoring_mode: ScoringMode,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".into(),
            scoring_mode: ScoringMode::default(),
            request_timeout_secs: 120,
        }
    }
}

impl Config {
    /// Directory: ~/.config/speech-eval/
    fn dir() -> PathBuf {
        let mut p = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push("speech-eval");
        p
    }

    fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load from disk, then apply environment overrides. Missing or invalid
    /// files fall back to defaults.
    pub fn load() -> Self {
        let path = Self::path();
        let mut config = match fs::read_to_string(&path) {
            Ok(data) => Self::from_json(&data),
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    fn from_json(data: &str) -> Self {
        serde_json::from_str(data).unwrap_or_else(|e| {
            log::warn!("Ignoring invalid config file: {e}");
            Self::default()
        })
    }

    /// Override fields from `SPEECH_EVAL_*` variables.
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("SPEECH_EVAL_API_URL").filter(|u| !u.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }
        if let Some(mode) = lookup("SPEECH_EVAL_SCORING_MODE") {
            match ScoringMode::parse(&mode) {
                Some(m) => self.scoring_mode = m,
                None => log::warn!("Unknown SPEECH_EVAL_SCORING_MODE {mode:?}, keeping {:?}", self.scoring_mode),
            }
        }
        if let Some(secs) = lookup("SPEECH_EVAL_TIMEOUT_SECS") {
            match secs.trim().parse::<u64>() {
                Ok(s) if s > 0 => self.request_timeout_secs = s,
                _ => log::warn!("Invalid SPEECH_EVAL_TIMEOUT_SECS {secs:?}"),
            }
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Persist to disk.
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let dir = Self::dir();
        fs::create_dir_all(&dir)?;
        let data = serde_json::to_string_pretty(self)?;
        fs::write(Self::path(), data)?;
        Ok(())
    }
}
