//! Thin long-polling client for the Bot API methods this bot needs.

use std::error::Error as StdError;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::types::{ApiResponse, FileInfo, InlineKeyboardMarkup, Message, ReplyMarkup, Update};

const API_BASE_URL: &str = "https://api.telegram.org";

#[derive(Debug)]
pub enum TelegramError {
    /// Network or HTTP-level failure.
    Transport(String),
    /// The API answered with `ok: false`.
    Api(String),
    /// Body did not match the expected shape.
    Malformed(String),
}

impl fmt::Display for TelegramError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelegramError::Transport(reason) => write!(f, "telegram transport: {reason}"),
            TelegramError::Api(reason) => write!(f, "telegram api: {reason}"),
            TelegramError::Malformed(reason) => write!(f, "telegram response: {reason}"),
        }
    }
}

impl StdError for TelegramError {}

#[derive(Serialize)]
struct GetUpdatesPayload {
    offset: i64,
    timeout: u64,
    allowed_updates: [&'static str; 2],
}

#[derive(Serialize)]
struct SendMessagePayload<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<&'a ReplyMarkup>,
}

#[derive(Serialize)]
struct EditMessagePayload<'a> {
    chat_id: i64,
    message_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<&'a InlineKeyboardMarkup>,
}

#[derive(Serialize)]
struct DeleteMessagePayload {
    chat_id: i64,
    message_id: i64,
}

#[derive(Serialize)]
struct AnswerCallbackPayload<'a> {
    callback_query_id: &'a str,
}

#[derive(Serialize)]
struct GetFilePayload<'a> {
    file_id: &'a str,
}

#[derive(Clone)]
pub struct TelegramClient {
    client: reqwest::Client,
    token: String,
}

impl TelegramClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token: token.into(),
        }
    }

    async fn call<T: DeserializeOwned, P: Serialize>(
        &self,
        method: &str,
        payload: &P,
    ) -> Result<T, TelegramError> {
        let url = format!("{API_BASE_URL}/bot{}/{method}", self.token);
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| TelegramError::Transport(e.to_string()))?;

        let body: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| TelegramError::Malformed(e.to_string()))?;

        if !body.ok {
            return Err(TelegramError::Api(
                body.description
                    .unwrap_or_else(|| "no description".to_string()),
            ));
        }
        body.result
            .ok_or_else(|| TelegramError::Malformed("ok response without result".to_string()))
    }

    /// Long-poll for updates after `offset`.
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, TelegramError> {
        self.call(
            "getUpdates",
            &GetUpdatesPayload {
                offset,
                timeout: timeout_secs,
                allowed_updates: ["message", "callback_query"],
            },
        )
        .await
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_markup: Option<&ReplyMarkup>,
    ) -> Result<Message, TelegramError> {
        self.call(
            "sendMessage",
            &SendMessagePayload {
                chat_id,
                text,
                reply_markup,
            },
        )
        .await
    }

    pub async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        reply_markup: Option<&InlineKeyboardMarkup>,
    ) -> Result<(), TelegramError> {
        // The result is the edited message (or `true` for inline ones);
        // neither is interesting here.
        self.call::<serde_json::Value, _>(
            "editMessageText",
            &EditMessagePayload {
                chat_id,
                message_id,
                text,
                reply_markup,
            },
        )
        .await
        .map(|_| ())
    }

    pub async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), TelegramError> {
        self.call::<serde_json::Value, _>(
            "deleteMessage",
            &DeleteMessagePayload {
                chat_id,
                message_id,
            },
        )
        .await
        .map(|_| ())
    }

    pub async fn answer_callback_query(&self, callback_id: &str) -> Result<(), TelegramError> {
        self.call::<serde_json::Value, _>(
            "answerCallbackQuery",
            &AnswerCallbackPayload {
                callback_query_id: callback_id,
            },
        )
        .await
        .map(|_| ())
    }

    pub async fn get_file(&self, file_id: &str) -> Result<FileInfo, TelegramError> {
        self.call("getFile", &GetFilePayload { file_id }).await
    }

    /// Fetch a file's bytes by the path `getFile` returned.
    pub async fn download_file(&self, file_path: &str) -> Result<Vec<u8>, TelegramError> {
        let url = format!("{API_BASE_URL}/file/bot{}/{file_path}", self.token);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TelegramError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TelegramError::Transport(format!(
                "file download failed with HTTP {}",
                response.status().as_u16()
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TelegramError::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
