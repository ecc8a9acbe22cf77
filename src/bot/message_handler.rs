//! Message Handler module for processing incoming Telegram messages

use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, FileId, InputFile};
use tracing::{debug, error, info, warn};

// Import localization
use crate::localization::t_lang;

// Import flow and session types
use crate::flow::{validate_description, FlowState};
use crate::gemini::SYSTEM_PROMPT;
use crate::storage::sniff_extension;
use crate::utils::{extract_addressed_text, split_message};

// Import UI builder functions
use super::ui_builder::{create_image_review_keyboard, format_image_review_caption};
use super::AppDeps;

/// Fetch a Telegram file's raw bytes through the file API.
pub async fn download_file(bot: &Bot, file_id: FileId) -> Result<Vec<u8>> {
    let file = bot.get_file(file_id).await?;
    let url = format!(
        "https://api.telegram.org/file/bot{}/{}",
        bot.token(),
        file.path
    );

    let response = reqwest::get(&url).await?;
    let bytes = response.bytes().await?;
    Ok(bytes.to_vec())
}

async fn handle_command(
    bot: &Bot,
    msg: &Message,
    deps: &Arc<AppDeps>,
    command: &str,
    language_code: Option<&str>,
) -> Result<()> {
    bot.send_chat_action(msg.chat.id, ChatAction::Typing).await?;

    match command {
        "/create_post" => {
            debug!(user_id = %msg.chat.id, "Starting post creation flow");
            deps.sessions.reset(msg.chat.id).await;
            bot.send_message(msg.chat.id, t_lang("create-ask-image", language_code))
                .await?;
        }
        "/cancel" => {
            if deps.sessions.get(msg.chat.id).await.is_some() {
                deps.sessions.clear(msg.chat.id).await;
                bot.send_message(msg.chat.id, t_lang("post-cancelled", language_code))
                    .await?;
            } else {
                bot.send_message(msg.chat.id, t_lang("nothing-to-cancel", language_code))
                    .await?;
            }
        }
        "/start" => {
            let history = deps.histories.reset(msg.chat.id, SYSTEM_PROMPT).await;
            match deps.gemini.chat_response(&history).await {
                Ok(reply) => {
                    deps.histories.push_model_turn(msg.chat.id, &reply).await;
                    for chunk in split_message(&reply) {
                        bot.send_message(msg.chat.id, chunk).await?;
                    }
                }
                Err(e) => {
                    warn!(user_id = %msg.chat.id, error = %e, "Greeting generation failed, using fallback");
                    bot.send_message(msg.chat.id, t_lang("welcome-fallback", language_code))
                        .await?;
                }
            }
            info!(user_id = %msg.chat.id, "Chat history initialized");
        }
        "/clear" => {
            deps.histories.reset(msg.chat.id, SYSTEM_PROMPT).await;
            info!(user_id = %msg.chat.id, "Chat history cleared");
            bot.send_message(msg.chat.id, t_lang("chat-cleared", language_code))
                .await?;
        }
        _ => {
            // Unknown commands get the command overview
            let help_message = vec![
                t_lang("help-title", language_code),
                t_lang("help-start", language_code),
                t_lang("help-clear", language_code),
                t_lang("help-create-post", language_code),
                t_lang("help-cancel", language_code),
                t_lang("help-help", language_code),
            ]
            .join("\n");
            bot.send_message(msg.chat.id, help_message).await?;
        }
    }

    Ok(())
}

/// Handle the description step: validate, generate variant images and enter
/// the image review step, or end the flow on generation failure.
async fn handle_description_input(
    bot: &Bot,
    msg: &Message,
    deps: &Arc<AppDeps>,
    session: &mut crate::session::Session,
    text: &str,
    language_code: Option<&str>,
) -> Result<()> {
    let description = match validate_description(text) {
        Ok(description) => description,
        Err("too_long") => {
            bot.send_message(msg.chat.id, t_lang("error-description-too-long", language_code))
                .await?;
            return Ok(());
        }
        Err(_) => {
            bot.send_message(msg.chat.id, t_lang("error-invalid-description", language_code))
                .await?;
            return Ok(());
        }
    };

    // Session corruption: the description step requires a stored image
    let Some(image_path) = session.product_image.clone() else {
        warn!(user_id = %msg.chat.id, "Description received without a stored product image");
        bot.send_message(msg.chat.id, t_lang("error-missing-image", language_code))
            .await?;
        deps.sessions.clear(msg.chat.id).await;
        return Ok(());
    };

    session.description = Some(description.clone());

    bot.send_chat_action(msg.chat.id, ChatAction::Typing).await?;
    bot.send_message(msg.chat.id, t_lang("generating-images", language_code))
        .await?;

    match deps
        .gemini
        .generate_product_images(&image_path, &description, &deps.media)
        .await
    {
        Ok(images) if !images.is_empty() => {
            info!(user_id = %msg.chat.id, image_count = images.len(), "Product images generated");
            session.replace_generated_images(images);
            session.state = FlowState::ChooseImage;

            let Some(image) = session.current_image() else {
                return Ok(());
            };
            bot.send_photo(msg.chat.id, InputFile::file(&image.file_path))
                .caption(format_image_review_caption(
                    0,
                    session.generated_images.len(),
                    language_code,
                ))
                .reply_markup(create_image_review_keyboard(language_code))
                .await?;
        }
        Ok(_) => {
            warn!(user_id = %msg.chat.id, "Image generation returned no images");
            bot.send_message(msg.chat.id, t_lang("error-no-images", language_code))
                .await?;
            deps.sessions.clear(msg.chat.id).await;
        }
        Err(e) => {
            error!(user_id = %msg.chat.id, error = %e, "Image generation failed");
            bot.send_message(
                msg.chat.id,
                crate::localization::t_args_lang(
                    "error-generation",
                    &[("error", &e.to_string())],
                    language_code,
                ),
            )
            .await?;
            deps.sessions.clear(msg.chat.id).await;
        }
    }

    Ok(())
}

async fn handle_text_message(bot: &Bot, msg: &Message, deps: Arc<AppDeps>) -> Result<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    debug!(user_id = %msg.chat.id, message_length = text.len(), "Received text message from user");

    // Extract user's language code from Telegram
    let language_code = msg
        .from
        .as_ref()
        .and_then(|user| user.language_code.as_ref())
        .map(|s| s.as_str());

    // Commands first, so /cancel works from any flow state and a command is
    // never swallowed as a description
    if text.starts_with('/') {
        // Group-style "/cmd@BotName arg" still resolves to the bare command
        let command = text
            .split_whitespace()
            .next()
            .unwrap_or(text)
            .split('@')
            .next()
            .unwrap_or(text);
        return handle_command(bot, msg, &deps, command, language_code).await;
    }

    // Route by flow state while a post creation session is active
    if let Some(session) = deps.sessions.get(msg.chat.id).await {
        let mut session = session.lock().await;
        match session.state {
            FlowState::AwaitImage => {
                // Wrong input kind: re-prompt, no state change
                bot.send_message(msg.chat.id, t_lang("error-not-image", language_code))
                    .await?;
            }
            FlowState::AwaitDescription => {
                handle_description_input(bot, msg, &deps, &mut session, text, language_code)
                    .await?;
            }
            FlowState::ChooseImage | FlowState::ChooseCaption => {
                debug!(user_id = %msg.chat.id, state = ?session.state, "Ignoring text during review step");
            }
        }
        return Ok(());
    }

    // No active flow: free-form assistant chat over stored history. Group
    // chats are only answered when the bot is mentioned, and the mention is
    // stripped before it enters the history
    let is_group = msg.chat.is_group() || msg.chat.is_supergroup();
    let Some(user_message) =
        extract_addressed_text(text, deps.bot_username.as_deref(), is_group)
    else {
        debug!(user_id = %msg.chat.id, "Group message does not mention the bot; ignoring");
        return Ok(());
    };

    bot.send_chat_action(msg.chat.id, ChatAction::Typing).await?;
    let history = deps
        .histories
        .push_user_turn(msg.chat.id, SYSTEM_PROMPT, &user_message)
        .await;
    match deps.gemini.chat_response(&history).await {
        Ok(reply) => {
            deps.histories.push_model_turn(msg.chat.id, &reply).await;
            for chunk in split_message(&reply) {
                bot.send_message(msg.chat.id, chunk).await?;
            }
        }
        Err(e) => {
            error!(user_id = %msg.chat.id, error = %e, "Chat completion failed");
            bot.send_message(msg.chat.id, t_lang("chat-error", language_code))
                .await?;
        }
    }

    Ok(())
}

async fn handle_photo_message(bot: &Bot, msg: &Message, deps: Arc<AppDeps>) -> Result<()> {
    let language_code = msg
        .from
        .as_ref()
        .and_then(|user| user.language_code.as_ref())
        .map(|s| s.as_str());

    debug!(user_id = %msg.chat.id, "Received photo message from user");

    let Some(session) = deps.sessions.get(msg.chat.id).await else {
        bot.send_message(msg.chat.id, t_lang("chat-photo-hint", language_code))
            .await?;
        return Ok(());
    };
    let mut session = session.lock().await;

    if session.state != FlowState::AwaitImage {
        debug!(user_id = %msg.chat.id, state = ?session.state, "Ignoring photo outside the upload step");
        return Ok(());
    }

    // Highest resolution rendition comes last
    let Some(photo) = msg.photo().and_then(|photos| photos.last()) else {
        return Ok(());
    };

    let bytes = match download_file(bot, photo.file.id.clone()).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(user_id = %msg.chat.id, error = %e, "Failed to download product image");
            bot.send_message(msg.chat.id, t_lang("error-download-failed", language_code))
                .await?;
            return Ok(());
        }
    };

    let path = deps.media.save_received(&bytes, sniff_extension(&bytes))?;
    debug!(user_id = %msg.chat.id, path = %path.display(), "Product image stored");

    session.product_image = Some(path);
    session.state = FlowState::AwaitDescription;

    bot.send_chat_action(msg.chat.id, ChatAction::Typing).await?;
    bot.send_message(msg.chat.id, t_lang("create-ask-description", language_code))
        .await?;

    Ok(())
}

/// Reply key for a message kind the bot cannot work with. During the upload
/// step this is the flow's re-prompt rather than the generic hint, so a
/// sticker or document still tells the user what the flow expects.
fn unsupported_reply_key(awaiting_image: bool) -> &'static str {
    if awaiting_image {
        "error-not-image"
    } else {
        "unsupported-message"
    }
}

async fn handle_unsupported_message(bot: &Bot, msg: &Message, deps: Arc<AppDeps>) -> Result<()> {
    let language_code = msg
        .from
        .as_ref()
        .and_then(|user| user.language_code.as_ref())
        .map(|s| s.as_str());

    debug!(user_id = %msg.chat.id, "Received unsupported message type from user");

    let awaiting_image = match deps.sessions.get(msg.chat.id).await {
        Some(session) => session.lock().await.state == FlowState::AwaitImage,
        None => false,
    };
    bot.send_message(
        msg.chat.id,
        t_lang(unsupported_reply_key(awaiting_image), language_code),
    )
    .await?;
    Ok(())
}

pub async fn message_handler(bot: Bot, msg: Message, deps: Arc<AppDeps>) -> Result<()> {
    if msg.text().is_some() {
        handle_text_message(&bot, &msg, deps).await?;
    } else if msg.photo().is_some() {
        handle_photo_message(&bot, &msg, deps).await?;
    } else {
        handle_unsupported_message(&bot, &msg, deps).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_reply_reprompts_during_upload_step() {
        assert_eq!(unsupported_reply_key(true), "error-not-image");
        assert_eq!(unsupported_reply_key(false), "unsupported-message");
    }
}
