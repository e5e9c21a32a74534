//! The bot's update loop and chat-facing behavior.
//!
//! One long-poll loop dispatches commands, mode-selection callbacks, text,
//! and photos. Each text or photo request runs the pipeline with a live
//! loading message that the progress indicator keeps editing; the finished
//! reply is delivered in order as chunked segments, with the
//! return-to-menu keyboard only on the final one.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::client::TelegramClient;
use super::types::{
    CallbackQuery, InlineKeyboardButton, InlineKeyboardMarkup, Message, PhotoSize,
    ReplyKeyboardMarkup, ReplyMarkup, Update,
};
use crate::chunker;
use crate::gateway::Backend;
use crate::modes::ModeStore;
use crate::pipeline::{Outcome, Pipeline, PipelineRequest, Strategy, FAILURE_MESSAGE};
use crate::progress::{spawn_indicator, ProgressGuard, ProgressSink, WORKING_FRAMES};

const GREETING: &str = "Hi! I'm ready. \u{1f9e0}";
const CHOOSE_MODEL: &str = "Pick the model you'd like:";
const MAIN_MENU_PROMPT: &str = "\u{1f44b} Welcome! What would you like to do?";
const NO_CONTENT_MESSAGE: &str = "\u{274c} The reply came back empty.";
const RESET_MESSAGE: &str = "\u{1f504} Everything's reset. Start again with /start or /menu.";
const DEFAULT_IMAGE_CAPTION: &str = "Describe this image.";

const MENU_BUTTON: &str = "\u{1f3e0} Main menu";
const CHANGE_MODEL_BUTTON: &str = "\u{1f9e0} Change model";

pub struct Bot {
    client: TelegramClient,
    pipeline: Arc<Pipeline>,
    modes: ModeStore,
    /// Per-chat cache of the active strategy, backed by the mode store.
    sessions: HashMap<i64, Strategy>,
    chunk_limit: usize,
    poll_timeout_secs: u64,
    indicator_interval: Duration,
}

impl Bot {
    pub fn new(
        client: TelegramClient,
        pipeline: Arc<Pipeline>,
        modes: ModeStore,
        chunk_limit: usize,
        poll_timeout_secs: u64,
    ) -> Self {
        Self {
            client,
            pipeline,
            modes,
            sessions: HashMap::new(),
            chunk_limit,
            poll_timeout_secs,
            indicator_interval: Duration::from_millis(800),
        }
    }

    /// Long-poll loop; runs until the process exits.
    pub async fn run(&mut self) {
        tracing::info!("bot started");
        let mut offset = 0i64;
        loop {
            let updates = match self.client.get_updates(offset, self.poll_timeout_secs).await {
                Ok(updates) => updates,
                Err(e) => {
                    tracing::warn!("update poll failed: {e}");
                    tokio::time::sleep(Duration::from_secs(3)).await;
                    continue;
                }
            };
            for update in updates {
                offset = offset.max(update.update_id + 1);
                self.handle_update(update).await;
            }
        }
    }

    async fn handle_update(&mut self, update: Update) {
        if let Some(message) = update.message {
            self.handle_message(message).await;
        } else if let Some(query) = update.callback_query {
            self.handle_callback(query).await;
        }
    }

    async fn handle_message(&mut self, message: Message) {
        let chat_id = message.chat.id;
        let user_id = message.from.as_ref().map(|u| u.id).unwrap_or(chat_id);

        if !message.photo.is_empty() {
            let caption = message
                .caption
                .clone()
                .unwrap_or_else(|| DEFAULT_IMAGE_CAPTION.to_string());
            self.handle_photo(chat_id, user_id, &message.photo, &caption)
                .await;
            return;
        }

        let Some(text) = message.text else { return };
        match text.trim() {
            "/start" => self.handle_start(chat_id, user_id).await,
            "/menu" | MENU_BUTTON => self.show_main_menu(chat_id).await,
            "/reset" => self.handle_reset(chat_id).await,
            CHANGE_MODEL_BUTTON => self.show_mode_selection(chat_id).await,
            trimmed => self.handle_text(chat_id, user_id, trimmed).await,
        }
    }

    async fn handle_start(&mut self, chat_id: i64, user_id: i64) {
        // Warm the session from the store so the first question already
        // uses the persisted mode.
        let strategy = self.modes.load(user_id);
        self.sessions.insert(chat_id, strategy);

        let keyboard = ReplyMarkup::Keyboard(persistent_keyboard());
        if let Err(e) = self.client.send_message(chat_id, GREETING, Some(&keyboard)).await {
            tracing::warn!("greeting failed: {e}");
        }
        self.show_mode_selection(chat_id).await;
    }

    async fn handle_reset(&mut self, chat_id: i64) {
        self.sessions.remove(&chat_id);
        let keyboard = ReplyMarkup::Keyboard(persistent_keyboard());
        if let Err(e) = self
            .client
            .send_message(chat_id, RESET_MESSAGE, Some(&keyboard))
            .await
        {
            tracing::warn!("reset confirmation failed: {e}");
        }
    }

    async fn show_main_menu(&self, chat_id: i64) {
        let markup = ReplyMarkup::Inline(full_menu_markup());
        if let Err(e) = self
            .client
            .send_message(chat_id, MAIN_MENU_PROMPT, Some(&markup))
            .await
        {
            tracing::warn!("main menu failed: {e}");
        }
    }

    async fn show_mode_selection(&self, chat_id: i64) {
        let markup = ReplyMarkup::Inline(mode_selection_markup());
        if let Err(e) = self
            .client
            .send_message(chat_id, CHOOSE_MODEL, Some(&markup))
            .await
        {
            tracing::warn!("mode selection failed: {e}");
        }
    }

    async fn handle_callback(&mut self, query: CallbackQuery) {
        if let Err(e) = self.client.answer_callback_query(&query.id).await {
            tracing::debug!("callback ack failed: {e}");
        }
        let Some(data) = query.data else { return };
        let Some(origin) = query.message else { return };
        let chat_id = origin.chat.id;
        let message_id = origin.message_id;

        match data.as_str() {
            "main_menu" | "change_model" => {
                let result = self
                    .client
                    .edit_message_text(
                        chat_id,
                        message_id,
                        CHOOSE_MODEL,
                        Some(&mode_selection_markup()),
                    )
                    .await;
                if let Err(e) = result {
                    tracing::warn!("mode menu edit failed: {e}");
                }
            }
            "reset_all" => {
                self.sessions.remove(&chat_id);
                if let Err(e) = self
                    .client
                    .edit_message_text(chat_id, message_id, RESET_MESSAGE, None)
                    .await
                {
                    tracing::warn!("reset edit failed: {e}");
                }
            }
            other => {
                let Some(strategy) = parse_mode_callback(other) else {
                    tracing::debug!("ignoring unknown callback: {other}");
                    return;
                };
                self.sessions.insert(chat_id, strategy);
                if let Err(e) = self.modes.save(query.from.id, strategy) {
                    tracing::warn!("mode save failed: {e}");
                }
                let confirmation = format!("\u{2705} Model selected: {}", strategy.label());
                if let Err(e) = self
                    .client
                    .edit_message_text(chat_id, message_id, &confirmation, None)
                    .await
                {
                    tracing::warn!("selection confirm failed: {e}");
                }
            }
        }
    }

    fn strategy_for(&mut self, chat_id: i64, user_id: i64) -> Strategy {
        match self.sessions.get(&chat_id) {
            Some(strategy) => *strategy,
            None => {
                let strategy = self.modes.load(user_id);
                self.sessions.insert(chat_id, strategy);
                strategy
            }
        }
    }

    async fn handle_text(&mut self, chat_id: i64, user_id: i64, text: &str) {
        let strategy = self.strategy_for(chat_id, user_id);
        tracing::debug!(chat_id, strategy = strategy.label(), "text request");

        let Some(loading_id) = self.send_loading_message(chat_id).await else {
            return;
        };

        let request = PipelineRequest {
            text: text.to_string(),
            strategy,
        };
        let guard = ProgressGuard::new();
        let indicator = spawn_indicator(
            Arc::new(LoadingMessageSink {
                client: self.client.clone(),
                chat_id,
                message_id: loading_id,
            }),
            guard.token(),
            self.indicator_interval,
        );

        let outcome = self.pipeline.respond(request).await;

        guard.finish();
        let _ = indicator.await;
        self.deliver(chat_id, loading_id, outcome).await;
    }

    async fn handle_photo(
        &mut self,
        chat_id: i64,
        user_id: i64,
        photos: &[PhotoSize],
        caption: &str,
    ) {
        let strategy = self.strategy_for(chat_id, user_id);
        tracing::debug!(chat_id, strategy = strategy.label(), "photo request");

        let Some(loading_id) = self.send_loading_message(chat_id).await else {
            return;
        };

        let image = match self.download_largest(photos).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("photo download failed: {e}");
                self.deliver(chat_id, loading_id, Outcome::Failure(FAILURE_MESSAGE.to_string()))
                    .await;
                return;
            }
        };

        let guard = ProgressGuard::new();
        let indicator = spawn_indicator(
            Arc::new(LoadingMessageSink {
                client: self.client.clone(),
                chat_id,
                message_id: loading_id,
            }),
            guard.token(),
            self.indicator_interval,
        );

        let outcome = self
            .pipeline
            .respond_to_image(&image, "image/jpeg", caption, strategy)
            .await;

        guard.finish();
        let _ = indicator.await;
        self.deliver(chat_id, loading_id, outcome).await;
    }

    async fn send_loading_message(&self, chat_id: i64) -> Option<i64> {
        match self.client.send_message(chat_id, WORKING_FRAMES[0], None).await {
            Ok(message) => Some(message.message_id),
            Err(e) => {
                tracing::warn!("loading message failed: {e}");
                None
            }
        }
    }

    async fn download_largest(
        &self,
        photos: &[PhotoSize],
    ) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        let largest = photos
            .iter()
            .max_by_key(|p| u64::from(p.width) * u64::from(p.height))
            .ok_or("photo message without sizes")?;
        let info = self.client.get_file(&largest.file_id).await?;
        let path = info.file_path.ok_or("file info without a path")?;
        Ok(self.client.download_file(&path).await?)
    }

    /// Replace the loading message with the outcome: segments in order for
    /// success (menu keyboard only on the last), a distinct "no content"
    /// state for empty, the failure message otherwise. Every branch ends
    /// with the menu affordance present.
    async fn deliver(&self, chat_id: i64, loading_id: i64, outcome: Outcome) {
        match outcome {
            Outcome::Success(text) if !text.trim().is_empty() => {
                if let Err(e) = self.client.delete_message(chat_id, loading_id).await {
                    tracing::debug!("loading cleanup failed: {e}");
                }
                let segments = chunker::chunk(&text, self.chunk_limit);
                let last = segments.len() - 1;
                for (index, segment) in segments.iter().enumerate() {
                    let markup = (index == last).then(|| ReplyMarkup::Inline(main_menu_inline()));
                    if let Err(e) = self
                        .client
                        .send_message(chat_id, segment, markup.as_ref())
                        .await
                    {
                        tracing::warn!("segment {index} delivery failed: {e}");
                        break;
                    }
                }
            }
            Outcome::Success(_) | Outcome::Empty => {
                self.replace_loading(chat_id, loading_id, NO_CONTENT_MESSAGE).await;
            }
            Outcome::Failure(message) => {
                self.replace_loading(chat_id, loading_id, &message).await;
            }
        }
    }

    async fn replace_loading(&self, chat_id: i64, loading_id: i64, text: &str) {
        let markup = main_menu_inline();
        if self
            .client
            .edit_message_text(chat_id, loading_id, text, Some(&markup))
            .await
            .is_err()
        {
            // The loading message may be gone; fall back to a fresh one.
            let markup = ReplyMarkup::Inline(markup);
            if let Err(e) = self.client.send_message(chat_id, text, Some(&markup)).await {
                tracing::warn!("failure notice delivery failed: {e}");
            }
        }
    }
}

/// Edits the loading message with the current indicator frame.
struct LoadingMessageSink {
    client: TelegramClient,
    chat_id: i64,
    message_id: i64,
}

#[async_trait]
impl ProgressSink for LoadingMessageSink {
    async fn tick(&self, frame: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.client
            .edit_message_text(self.chat_id, self.message_id, frame, None)
            .await
            .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)
    }
}

fn parse_mode_callback(data: &str) -> Option<Strategy> {
    data.strip_prefix("set_").and_then(Strategy::parse)
}

fn mode_callback(strategy: Strategy) -> String {
    format!("set_{}", strategy.name())
}

fn mode_selection_markup() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: vec![
            vec![
                InlineKeyboardButton::callback(
                    "\u{1f31f} Gemini",
                    mode_callback(Strategy::Single(Backend::Gemini)),
                ),
                InlineKeyboardButton::callback(
                    "\u{1f9e0} OpenRouter",
                    mode_callback(Strategy::Single(Backend::OpenRouter)),
                ),
            ],
            vec![
                InlineKeyboardButton::callback(
                    "\u{1f916} DeepSeek",
                    mode_callback(Strategy::Single(Backend::DeepSeek)),
                ),
                InlineKeyboardButton::callback("\u{1f9ea} Refined", mode_callback(Strategy::Composite)),
            ],
            vec![InlineKeyboardButton::callback("\u{1f3e0} Back to the menu", "main_menu")],
        ],
    }
}

fn full_menu_markup() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: vec![
            vec![InlineKeyboardButton::callback(
                "\u{1f9e0} Choose an AI model",
                "change_model",
            )],
            vec![InlineKeyboardButton::switch_inline("\u{1f4dd} Ask a new question")],
            vec![InlineKeyboardButton::callback("\u{267b}\u{fe0f} Reset", "reset_all")],
        ],
    }
}

fn main_menu_inline() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: vec![vec![InlineKeyboardButton::callback(
            "\u{1f519} Back to the model menu",
            "main_menu",
        )]],
    }
}

fn persistent_keyboard() -> ReplyKeyboardMarkup {
    ReplyKeyboardMarkup {
        keyboard: vec![vec![MENU_BUTTON.to_string(), CHANGE_MODEL_BUTTON.to_string()]],
        resize_keyboard: true,
        one_time_keyboard: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_callbacks_round_trip() {
        for strategy in [
            Strategy::Single(Backend::Gemini),
            Strategy::Single(Backend::OpenRouter),
            Strategy::Single(Backend::DeepSeek),
            Strategy::Composite,
        ] {
            assert_eq!(parse_mode_callback(&mode_callback(strategy)), Some(strategy));
        }
        assert_eq!(parse_mode_callback("main_menu"), None);
        assert_eq!(parse_mode_callback("set_quantum"), None);
    }

    #[test]
    fn mode_selection_offers_every_strategy() {
        let markup = mode_selection_markup();
        let callbacks: Vec<String> = markup
            .inline_keyboard
            .iter()
            .flatten()
            .filter_map(|b| b.callback_data.clone())
            .collect();
        assert!(callbacks.contains(&"set_gemini".to_string()));
        assert!(callbacks.contains(&"set_openrouter".to_string()));
        assert!(callbacks.contains(&"set_deepseek".to_string()));
        assert!(callbacks.contains(&"set_refined".to_string()));
        assert!(callbacks.contains(&"main_menu".to_string()));
    }

    #[test]
    fn main_menu_has_exactly_one_return_button() {
        let markup = main_menu_inline();
        assert_eq!(markup.inline_keyboard.len(), 1);
        assert_eq!(markup.inline_keyboard[0].len(), 1);
        assert_eq!(
            markup.inline_keyboard[0][0].callback_data.as_deref(),
            Some("main_menu")
        );
    }
}
