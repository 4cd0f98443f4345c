//! Turns raw `getUpdates` entries into dialogue events.

use sticker_core::{Callback, Command, Event, UserId};

/// One update addressed to a user's conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    pub user_id: UserId,
    pub username: Option<String>,
    pub chat_id: i64,
    /// Callback query to acknowledge, for button presses
    pub callback_id: Option<String>,
    /// None when the update carries nothing the dialogue understands
    pub event: Option<Event>,
}

impl Inbound {
    /// Identities checked against `allowed_users`.
    pub fn identities(&self) -> Vec<String> {
        let mut ids = vec![self.user_id.to_string()];
        if let Some(name) = &self.username {
            ids.push(name.clone());
        }
        ids
    }
}

pub fn update_id(update: &serde_json::Value) -> Option<i64> {
    update.get("update_id").and_then(serde_json::Value::as_i64)
}

/// Parse one update. Returns None for updates without a sender or chat.
pub fn parse_update(update: &serde_json::Value) -> Option<Inbound> {
    if let Some(callback) = update.get("callback_query") {
        return parse_callback_query(callback);
    }
    parse_message(update.get("message")?)
}

fn sender(from: &serde_json::Value) -> Option<(UserId, Option<String>)> {
    let id = from.get("id")?.as_i64()?;
    let username = from
        .get("username")
        .and_then(|u| u.as_str())
        .map(String::from);
    Some((id, username))
}

fn parse_callback_query(callback: &serde_json::Value) -> Option<Inbound> {
    let id = callback.get("id")?.as_str()?.to_string();
    let (user_id, username) = sender(callback.get("from")?)?;
    let chat_id = callback
        .get("message")
        .and_then(|m| m.get("chat"))
        .and_then(|c| c.get("id"))
        .and_then(serde_json::Value::as_i64)
        .unwrap_or(user_id);

    let event = callback
        .get("data")
        .and_then(|d| d.as_str())
        .and_then(Callback::parse)
        .map(Event::Callback);

    Some(Inbound {
        user_id,
        username,
        chat_id,
        callback_id: Some(id),
        event,
    })
}

fn parse_message(message: &serde_json::Value) -> Option<Inbound> {
    let (user_id, username) = sender(message.get("from")?)?;
    let chat_id = message.get("chat")?.get("id")?.as_i64()?;

    Some(Inbound {
        user_id,
        username,
        chat_id,
        callback_id: None,
        event: message_event(message),
    })
}

fn message_event(message: &serde_json::Value) -> Option<Event> {
    if let Some(sticker) = message.get("sticker") {
        let collection_id = sticker
            .get("set_name")
            .and_then(|s| s.as_str())
            .map(String::from);
        return Some(Event::Forwarded { collection_id });
    }

    let (text, entities) = match message.get("text").and_then(|t| t.as_str()) {
        Some(text) => (text, message.get("entities")),
        None => (
            message.get("caption")?.as_str()?,
            message.get("caption_entities"),
        ),
    };

    if let Some(command) = Command::parse(text) {
        return Some(Event::Command(command));
    }

    Some(Event::Text {
        text: text.to_string(),
        tag_ids: custom_emoji_ids(entities),
    })
}

/// Custom emoji ids referenced by message entities, in order.
pub fn custom_emoji_ids(entities: Option<&serde_json::Value>) -> Vec<String> {
    entities
        .and_then(serde_json::Value::as_array)
        .map(|list| {
            list.iter()
                .filter(|e| e.get("type").and_then(|t| t.as_str()) == Some("custom_emoji"))
                .filter_map(|e| e.get("custom_emoji_id").and_then(|id| id.as_str()))
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}
