use std::sync::Arc;

use clap::Parser;

use palaver::config::Config;
use palaver::gateway::HttpGateway;
use palaver::modes::ModeStore;
use palaver::pipeline::{humanize::ToneSoftener, Pipeline};
use palaver::telegram::{Bot, TelegramClient};

#[derive(Parser)]
#[command(name = "palaver")]
#[command(about = "A Telegram assistant bot that blends replies from multiple LLM backends")]
#[command(long_about = "Palaver answers Telegram messages by driving one or more LLM backends \
and post-processing the result into a conversational tone. Users pick a \
strategy per chat: a single backend, or a blend that queries two backends \
concurrently and merges their answers.\n\n\
Environment Variables:\n\
  TELEGRAM_TOKEN       Bot token (required)\n\
  GOOGLE_API_KEY       Gemini API key (required when a Gemini-backed mode runs)\n\
  OPENROUTER_API_KEY   OpenRouter API key (required when an OpenRouter-backed mode runs)")]
struct Args {
    /// Path of the JSON file holding per-user mode selections
    #[arg(long, default_value = "user_modes.json")]
    mode_file: String,

    /// Long-poll timeout for fetching updates, in seconds
    #[arg(long, default_value_t = 30)]
    poll_timeout: u64,

    /// Maximum characters per delivered message segment
    #[arg(long, default_value_t = 4000)]
    chunk_limit: usize,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("palaver=info")),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let gateway = Arc::new(HttpGateway::new(&config));
    let pipeline = Arc::new(Pipeline::new(gateway, Arc::new(ToneSoftener)));
    let client = TelegramClient::new(config.telegram_token.clone());
    let modes = ModeStore::new(&args.mode_file);

    let mut bot = Bot::new(client, pipeline, modes, args.chunk_limit, args.poll_timeout);
    bot.run().await;
}
