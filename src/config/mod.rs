//! Configuration system (layered: CLI flags > env > defaults).

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use bon::Builder;

use crate::error::TurnloopError;
use crate::provider::openai_responses::DEFAULT_BASE_URL;
use crate::types::GenerationSettings;
use crate::util::retry::RetryPolicy;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_MAX_ROUNDS: u32 = 8;
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(120);

const API_KEY_VARS: [&str; 3] = ["TURNLOOP_API_KEY", "GROQ_API_KEY", "OPENAI_API_KEY"];
const BASE_URL_VARS: [&str; 2] = ["TURNLOOP_BASE_URL", "OPENAI_BASE_URL"];

/// Everything the turn loop needs besides its collaborators.
#[derive(Debug, Clone, Builder, PartialEq)]
pub struct LoopSettings {
    #[builder(into, default = DEFAULT_MODEL.to_string())]
    pub model: String,
    /// Model queries allowed per user message before control returns to the user.
    #[builder(default = DEFAULT_MAX_ROUNDS)]
    pub max_rounds_per_turn: u32,
    #[builder(default)]
    pub retry: RetryPolicy,
    /// Budget for one model query, retries included.
    #[builder(default = DEFAULT_QUERY_TIMEOUT)]
    pub query_timeout: Duration,
    #[builder(default)]
    pub generation: GenerationSettings,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Session configuration resolved from the environment.
#[derive(Clone, PartialEq)]
pub struct SessionConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_rounds_per_turn: u32,
    pub max_attempts: u32,
    pub query_timeout: Duration,
    pub generation: GenerationSettings,
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| ".."))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_rounds_per_turn", &self.max_rounds_per_turn)
            .field("max_attempts", &self.max_attempts)
            .field("query_timeout", &self.query_timeout)
            .field("generation", &self.generation)
            .finish()
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_rounds_per_turn: DEFAULT_MAX_ROUNDS,
            max_attempts: RetryPolicy::default().max_attempts,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            generation: GenerationSettings::default(),
        }
    }
}

impl SessionConfig {
    /// Load from environment variables, reading `.env` first if present.
    pub fn from_env() -> Result<Self, TurnloopError> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, TurnloopError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |keys: &[&str]| {
            keys.iter()
                .filter_map(|key| lookup(key))
                .map(|value| value.trim().to_string())
                .find(|value| !value.is_empty())
        };

        let mut config = Self::default();
        config.api_key = first(&API_KEY_VARS);
        if let Some(url) = first(&BASE_URL_VARS) {
            config.base_url = url;
        }
        if let Some(model) = first(&["TURNLOOP_MODEL"]) {
            config.model = model;
        }
        if let Some(rounds) = parse_var(&lookup, "TURNLOOP_MAX_ROUNDS")? {
            config.max_rounds_per_turn = rounds;
        }
        if let Some(attempts) = parse_var(&lookup, "TURNLOOP_MAX_ATTEMPTS")? {
            config.max_attempts = attempts;
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "TURNLOOP_QUERY_TIMEOUT_SECS")? {
            config.query_timeout = Duration::from_secs(secs);
        }
        config.generation.temperature = parse_var(&lookup, "TURNLOOP_TEMPERATURE")?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values the loop cannot run with.
    pub fn validate(&self) -> Result<(), TurnloopError> {
        if self.max_rounds_per_turn == 0 {
            return Err(TurnloopError::Configuration(
                "max rounds per turn must be at least 1".into(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(TurnloopError::Configuration(
                "max attempts must be at least 1".into(),
            ));
        }
        if self.query_timeout.is_zero() {
            return Err(TurnloopError::Configuration(
                "query timeout must be positive".into(),
            ));
        }
        if let Some(t) = self.generation.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(TurnloopError::Configuration(format!(
                    "temperature {t} is outside 0.0..=2.0"
                )));
            }
        }
        Ok(())
    }

    /// The API key, required by the HTTP endpoint.
    pub fn require_api_key(&self) -> Result<&str, TurnloopError> {
        self.api_key.as_deref().ok_or_else(|| {
            TurnloopError::Configuration(format!(
                "missing API key (set one of {})",
                API_KEY_VARS.join(", ")
            ))
        })
    }

    pub fn loop_settings(&self) -> LoopSettings {
        LoopSettings::builder()
            .model(self.model.clone())
            .max_rounds_per_turn(self.max_rounds_per_turn)
            .retry(RetryPolicy::with_max_attempts(self.max_attempts))
            .query_timeout(self.query_timeout)
            .generation(self.generation.clone())
            .build()
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, TurnloopError>
where
    T: FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<T>()
        .map(Some)
        .map_err(|e| TurnloopError::Configuration(format!("{key}={raw:?} is invalid: {e}")))
}
