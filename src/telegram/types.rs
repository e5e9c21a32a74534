//! Telegram Bot API payloads — just the slice of the surface this bot uses.

use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
    pub caption: Option<String>,
    #[serde(default)]
    pub photo: Vec<PhotoSize>,
}

#[derive(Deserialize)]
pub struct User {
    pub id: i64,
}

#[derive(Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// One size variant of an uploaded photo; Telegram lists them smallest first.
#[derive(Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub message: Option<Message>,
    pub data: Option<String>,
}

#[derive(Deserialize)]
pub struct FileInfo {
    pub file_id: String,
    pub file_path: Option<String>,
}

#[derive(Serialize, Clone)]
pub struct InlineKeyboardButton {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub switch_inline_query_current_chat: Option<String>,
}

impl InlineKeyboardButton {
    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: Some(data.into()),
            switch_inline_query_current_chat: None,
        }
    }

    pub fn switch_inline(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: None,
            switch_inline_query_current_chat: Some(String::new()),
        }
    }
}

#[derive(Serialize, Clone)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

/// Persistent keyboard under the input field; rows of plain text buttons.
#[derive(Serialize, Clone)]
pub struct ReplyKeyboardMarkup {
    pub keyboard: Vec<Vec<String>>,
    pub resize_keyboard: bool,
    pub one_time_keyboard: bool,
}

#[derive(Serialize, Clone)]
#[serde(untagged)]
pub enum ReplyMarkup {
    Inline(InlineKeyboardMarkup),
    Keyboard(ReplyKeyboardMarkup),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_deserializes_text_message() {
        let raw = r#"{
            "update_id": 10,
            "message": {
                "message_id": 5,
                "from": {"id": 42},
                "chat": {"id": -100},
                "text": "hello"
            }
        }"#;
        let update: Update = serde_json::from_str(raw).unwrap();
        let message = update.message.unwrap();
        assert_eq!(message.chat.id, -100);
        assert_eq!(message.text.as_deref(), Some("hello"));
        assert!(message.photo.is_empty());
    }

    #[test]
    fn update_deserializes_callback_query() {
        let raw = r#"{
            "update_id": 11,
            "callback_query": {
                "id": "abc",
                "from": {"id": 42},
                "data": "set_gemini"
            }
        }"#;
        let update: Update = serde_json::from_str(raw).unwrap();
        let query = update.callback_query.unwrap();
        assert_eq!(query.data.as_deref(), Some("set_gemini"));
        assert_eq!(query.from.id, 42);
    }

    #[test]
    fn inline_button_serializes_only_set_fields() {
        let button = InlineKeyboardButton::callback("Back", "main_menu");
        let value = serde_json::to_value(&button).unwrap();
        assert_eq!(value["callback_data"], "main_menu");
        assert!(value.as_object().unwrap().get("switch_inline_query_current_chat").is_none());
    }
}
