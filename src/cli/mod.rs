//! CLI entry point for turnloop.

use clap::Parser;

use crate::config::SessionConfig;
use crate::error::TurnloopError;

/// Interactive flight-desk chat with tool calling.
#[derive(Parser, Debug, Default)]
#[command(name = "turnloop", version, about = "Chat with a model that can call local tools")]
pub struct Cli {
    /// Model identifier sent to the endpoint
    #[arg(short, long)]
    pub model: Option<String>,

    /// Base URL of an OpenAI Responses-compatible API
    #[arg(long)]
    pub base_url: Option<String>,

    /// Model rounds allowed per user message
    #[arg(long)]
    pub max_rounds: Option<u32>,

    /// Attempts per model query (first try included)
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Timeout for one model query, retries included
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Temperature (0.0 - 2.0)
    #[arg(short, long)]
    pub temperature: Option<f64>,

    /// Max output tokens
    #[arg(long)]
    pub max_output_tokens: Option<u32>,
}

impl Cli {
    /// Parse CLI arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Overlay flags on top of an environment-derived config.
    pub fn apply(&self, config: &mut SessionConfig) -> Result<(), TurnloopError> {
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        if let Some(rounds) = self.max_rounds {
            config.max_rounds_per_turn = rounds;
        }
        if let Some(attempts) = self.max_attempts {
            config.max_attempts = attempts;
        }
        if let Some(secs) = self.timeout_secs {
            config.query_timeout = std::time::Duration::from_secs(secs);
        }
        if let Some(t) = self.temperature {
            config.generation.temperature = Some(t);
        }
        if let Some(max) = self.max_output_tokens {
            config.generation.max_output_tokens = Some(max);
        }
        config.validate()
    }
}

/// A one-line hint for errors that end the program.
pub fn format_error_help(err: &TurnloopError) -> String {
    match err {
        TurnloopError::Authentication(msg) => {
            format!("Authentication failed: {msg}. Check TURNLOOP_API_KEY (or GROQ_API_KEY / OPENAI_API_KEY)")
        }
        TurnloopError::Configuration(msg) => {
            format!("Configuration error: {msg}. Check your .env or command-line flags")
        }
        TurnloopError::Timeout(ms) => {
            format!("The model did not answer within {ms}ms. Raise --timeout-secs or try again")
        }
        TurnloopError::Api { status: 404, message } => {
            format!("API error (status 404): {message}. Check --base-url and --model")
        }
        other => format!("{other}"),
    }
}
