use std::env;

use crate::models::Criterion;
use crate::strategy::{GradingStrategy, StrategyKind, UnknownStrategy};

/// Settings shared by every command. Built once in `main` and passed down.
#[derive(Debug, Clone)]
pub struct ActaConfig {
    pub institution: String,
    pub faculty: String,
    pub passing_grade: f64,
    pub minimum_pass_threshold: f64,
    pub strategy: StrategyKind,
    pub log_level: String,
}

impl ActaConfig {
    /// Reads `.env` when present, then the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let institution =
            env::var("ACTA_INSTITUTION").unwrap_or_else(|_| "Universidad de Ejemplo".to_string());
        let faculty =
            env::var("ACTA_FACULTY").unwrap_or_else(|_| "Facultad de Ingeniería".to_string());
        let passing_grade = parse_grade("ACTA_PASSING_GRADE", 4.0)?;
        let minimum_pass_threshold = parse_grade(
            "ACTA_MINIMUM_PASS_THRESHOLD",
            GradingStrategy::DEFAULT_MINIMUM_PASS,
        )?;
        let strategy = match env::var("ACTA_STRATEGY") {
            Ok(value) => value.parse::<StrategyKind>()?,
            Err(_) => StrategyKind::Weighted,
        };
        let log_level = env::var("ACTA_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            institution,
            faculty,
            passing_grade,
            minimum_pass_threshold,
            strategy,
            log_level,
        })
    }

    /// Resolves the strategy to use, preferring an explicit command line choice.
    pub fn grading_strategy(&self, requested: Option<StrategyKind>) -> GradingStrategy {
        requested
            .unwrap_or(self.strategy)
            .into_strategy(self.minimum_pass_threshold)
    }

    /// Rubric applied when a bundle arrives without its own criteria.
    pub fn default_criteria(&self) -> Vec<Criterion> {
        [
            (1, "Contenido", 0.4),
            (2, "Metodología", 0.3),
            (3, "Presentación escrita", 0.2),
            (4, "Defensa oral", 0.1),
        ]
        .into_iter()
        .map(|(id, name, weight)| Criterion {
            id,
            name: name.to_string(),
            weight,
            max_score: Some(7.0),
        })
        .collect()
    }
}

fn parse_grade(key: &'static str, default: f64) -> Result<f64, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|grade| grade.is_finite())
            .ok_or(ConfigError::InvalidNumber { key, value }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be a number, got '{value}'")]
    InvalidNumber { key: &'static str, value: String },
    #[error("ACTA_STRATEGY is invalid: {0}")]
    InvalidStrategy(#[from] UnknownStrategy),
}
