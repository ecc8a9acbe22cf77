//! Small helpers shared across handlers.

/// Decide whether a free-form text message addresses the bot, and strip the
/// `@username` mention from it.
///
/// In group chats the bot only answers when mentioned; private chats always
/// address the bot, with any mention removed all the same.
pub fn extract_addressed_text(
    text: &str,
    bot_username: Option<&str>,
    is_group: bool,
) -> Option<String> {
    let Some(username) = bot_username else {
        // Without a configured username the bot cannot be mentioned
        return if is_group { None } else { Some(text.to_string()) };
    };
    let mention = format!("@{username}");

    if is_group && !text.contains(&mention) {
        return None;
    }
    Some(text.replace(&mention, "").trim().to_string())
}

/// Telegram rejects messages longer than 4096 characters; stay under it.
pub const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4000;

/// Split text into chunks small enough for one Telegram message, cutting on
/// character boundaries.
pub fn split_message(text: &str) -> Vec<String> {
    if text.is_empty() {
        return vec![String::new()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0;
    for ch in text.chars() {
        if count == TELEGRAM_MAX_MESSAGE_LENGTH {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
        current.push(ch);
        count += 1;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
