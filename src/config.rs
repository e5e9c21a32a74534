//! Environment configuration.
//!
//! Three secrets drive the bot: the Telegram bot token and one API key per
//! upstream (Google for Gemini, OpenRouter for everything routed through
//! OpenRouter). Only the Telegram token is required at startup; a missing
//! model key only surfaces when a strategy actually invokes that backend.

use std::env;
use std::error::Error as StdError;
use std::fmt;

pub const TELEGRAM_TOKEN_VAR: &str = "TELEGRAM_TOKEN";
pub const GOOGLE_API_KEY_VAR: &str = "GOOGLE_API_KEY";
pub const OPENROUTER_API_KEY_VAR: &str = "OPENROUTER_API_KEY";

#[derive(Debug)]
pub enum ConfigError {
    /// The chat transport cannot start without its token.
    MissingTelegramToken,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingTelegramToken => {
                write!(
                    f,
                    "{TELEGRAM_TOKEN_VAR} environment variable is not set.\n\n\
                     Export your bot token before starting:\n\
                     export {TELEGRAM_TOKEN_VAR}=\"123456:your-bot-token\""
                )
            }
        }
    }
}

impl StdError for ConfigError {}

#[derive(Clone)]
pub struct Config {
    pub telegram_token: String,
    pub google_api_key: Option<String>,
    pub openrouter_api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let telegram_token = non_empty_var(TELEGRAM_TOKEN_VAR)
            .ok_or(ConfigError::MissingTelegramToken)?;

        Ok(Config {
            telegram_token,
            google_api_key: non_empty_var(GOOGLE_API_KEY_VAR),
            openrouter_api_key: non_empty_var(OPENROUTER_API_KEY_VAR),
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}
