//! Callback Handler module for processing inline keyboard callback queries

use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, InputFile, InputMedia, InputMediaPhoto, MessageId};
use tracing::{debug, error, info, warn};

// Import localization
use crate::localization::{t_args_lang, t_lang};

// Import flow and session types
use crate::flow::{CallbackAction, FlowState, NavDirection};
use crate::session::Session;

// Import UI builder functions
use super::ui_builder::{
    create_caption_choice_keyboard, create_image_review_keyboard, format_caption_list,
    format_image_review_caption,
};
use super::AppDeps;

/// Handle callback queries from inline keyboards
pub async fn callback_handler(bot: Bot, q: CallbackQuery, deps: Arc<AppDeps>) -> Result<()> {
    debug!(user_id = %q.from.id, "Received callback query from user");

    // Remove the loading state before doing any slow work
    bot.answer_callback_query(q.id.clone()).await?;

    // Decode the payload once at the boundary; unknown payloads are no-ops
    let Some(action) = q.data.as_deref().and_then(CallbackAction::parse) else {
        debug!(user_id = %q.from.id, data = ?q.data, "Ignoring unrecognized callback payload");
        return Ok(());
    };

    let Some(msg) = &q.message else {
        warn!(user_id = %q.from.id, "Callback query without a message; ignoring");
        return Ok(());
    };
    let chat_id = msg.chat().id;
    let message_id = msg.id();

    // Callbacks outside an active flow (e.g. after /cancel) are ignored
    let Some(session) = deps.sessions.get(chat_id).await else {
        debug!(user_id = %q.from.id, "Callback without an active session; ignoring");
        return Ok(());
    };
    let mut session = session.lock().await;

    let language_code = q.from.language_code.as_deref();

    match (session.state, action) {
        (FlowState::ChooseImage, CallbackAction::PrevImage) => {
            session.step_image(NavDirection::Prev);
            update_image_display(&bot, chat_id, message_id, &session, language_code).await?;
        }
        (FlowState::ChooseImage, CallbackAction::NextImage) => {
            session.step_image(NavDirection::Next);
            update_image_display(&bot, chat_id, message_id, &session, language_code).await?;
        }
        (FlowState::ChooseImage, CallbackAction::SelectImage) => {
            let Some(selected) = session.select_current_image() else {
                warn!(user_id = %q.from.id, "Select with no generated images; ignoring");
                return Ok(());
            };
            info!(user_id = %q.from.id, file = %selected.file_name, "Image selected");
            generate_and_present_captions(&bot, chat_id, &deps, &mut session, language_code)
                .await?;
        }
        (FlowState::ChooseImage, CallbackAction::RegenerateImages) => {
            regenerate_images(&bot, chat_id, message_id, &deps, &mut session, language_code)
                .await?;
        }
        (FlowState::ChooseCaption, CallbackAction::ChooseCaption(index)) => {
            let Some(caption) = session.captions.get(index).cloned() else {
                // Invalid index - ignore silently
                debug!(user_id = %q.from.id, index, "Caption index out of range; ignoring");
                return Ok(());
            };

            let final_caption = super::ui_builder::compose_final_post(&caption);
            let Some(post_image) = session.post_image().cloned() else {
                warn!(user_id = %q.from.id, "No image available for the final post");
                bot.send_message(chat_id, t_lang("error-missing-image", language_code))
                    .await?;
                deps.sessions.clear(chat_id).await;
                return Ok(());
            };

            bot.send_photo(chat_id, InputFile::file(post_image))
                .caption(final_caption)
                .await?;
            bot.send_message(chat_id, t_lang("post-success", language_code))
                .await?;
            info!(user_id = %q.from.id, index, "Post created");
            deps.sessions.clear(chat_id).await;
        }
        (FlowState::ChooseCaption, CallbackAction::RegenerateCaptions) => {
            bot.send_message(chat_id, t_lang("regenerating-captions", language_code))
                .await?;
            generate_and_present_captions(&bot, chat_id, &deps, &mut session, language_code)
                .await?;
        }
        (_, CallbackAction::CancelPost) => {
            bot.send_message(chat_id, t_lang("post-cancelled", language_code))
                .await?;
            deps.sessions.clear(chat_id).await;
        }
        (state, action) => {
            debug!(user_id = %q.from.id, state = ?state, action = ?action, "Ignoring callback in current state");
        }
    }

    Ok(())
}

/// Show the image under the cursor: edit the review message in place, and
/// fall back to sending a fresh photo message when the edit is rejected.
async fn update_image_display(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    session: &Session,
    language_code: Option<&str>,
) -> Result<()> {
    let Some(image) = session.current_image() else {
        return Ok(());
    };
    let caption = format_image_review_caption(
        session.current_image_index,
        session.generated_images.len(),
        language_code,
    );
    let keyboard = create_image_review_keyboard(language_code);

    let media = InputMedia::Photo(
        InputMediaPhoto::new(InputFile::file(&image.file_path)).caption(caption.clone()),
    );
    match bot
        .edit_message_media(chat_id, message_id, media)
        .reply_markup(keyboard.clone())
        .await
    {
        Ok(_) => Ok(()),
        Err(e) => {
            // The transport can reject edits (e.g. message too old); the
            // navigation step must still show the image
            warn!(user_id = %chat_id, error = %e, "Edit rejected, sending a fresh review message");
            bot.send_photo(chat_id, InputFile::file(&image.file_path))
                .caption(caption)
                .reply_markup(keyboard)
                .await?;
            Ok(())
        }
    }
}

/// Re-invoke image generation with the stored inputs, replacing the current
/// list and resetting navigation. Failure ends the flow.
async fn regenerate_images(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    deps: &Arc<AppDeps>,
    session: &mut Session,
    language_code: Option<&str>,
) -> Result<()> {
    let (Some(image_path), Some(description)) =
        (session.product_image.clone(), session.description.clone())
    else {
        warn!(user_id = %chat_id, "Regeneration without stored image or description");
        bot.send_message(chat_id, t_lang("error-missing-image", language_code))
            .await?;
        deps.sessions.clear(chat_id).await;
        return Ok(());
    };

    bot.send_chat_action(chat_id, ChatAction::Typing).await?;
    bot.send_message(chat_id, t_lang("regenerating-images", language_code))
        .await?;

    match deps
        .gemini
        .generate_product_images(&image_path, &description, &deps.media)
        .await
    {
        Ok(images) if !images.is_empty() => {
            info!(user_id = %chat_id, image_count = images.len(), "Product images regenerated");
            session.replace_generated_images(images);
            update_image_display(bot, chat_id, message_id, session, language_code).await?;
        }
        Ok(_) => {
            warn!(user_id = %chat_id, "Image regeneration returned no images");
            bot.send_message(chat_id, t_lang("error-no-images", language_code))
                .await?;
            deps.sessions.clear(chat_id).await;
        }
        Err(e) => {
            error!(user_id = %chat_id, error = %e, "Image regeneration failed");
            bot.send_message(
                chat_id,
                t_args_lang("error-generation", &[("error", &e.to_string())], language_code),
            )
            .await?;
            deps.sessions.clear(chat_id).await;
        }
    }

    Ok(())
}

/// Generate captions for the selected image (or the upload as fallback) and
/// present them for selection. Failure ends the flow.
async fn generate_and_present_captions(
    bot: &Bot,
    chat_id: ChatId,
    deps: &Arc<AppDeps>,
    session: &mut Session,
    language_code: Option<&str>,
) -> Result<()> {
    let (Some(image_path), Some(description)) =
        (session.post_image().cloned(), session.description.clone())
    else {
        warn!(user_id = %chat_id, "Caption generation without stored image or description");
        bot.send_message(chat_id, t_lang("error-missing-image", language_code))
            .await?;
        deps.sessions.clear(chat_id).await;
        return Ok(());
    };

    bot.send_chat_action(chat_id, ChatAction::Typing).await?;
    bot.send_message(chat_id, t_lang("generating-captions", language_code))
        .await?;

    match deps
        .gemini
        .generate_marketing_captions(&image_path, &description)
        .await
    {
        Ok(captions) if !captions.is_empty() => {
            info!(user_id = %chat_id, caption_count = captions.len(), "Captions generated");
            let keyboard = create_caption_choice_keyboard(captions.len(), language_code);
            let listing = format_caption_list(&captions, language_code);
            session.captions = captions;
            session.state = FlowState::ChooseCaption;

            bot.send_message(chat_id, listing)
                .reply_markup(keyboard)
                .await?;
        }
        Ok(_) => {
            warn!(user_id = %chat_id, "Caption generation returned no captions");
            bot.send_message(chat_id, t_lang("error-no-captions", language_code))
                .await?;
            deps.sessions.clear(chat_id).await;
        }
        Err(e) => {
            error!(user_id = %chat_id, error = %e, "Caption generation failed");
            bot.send_message(
                chat_id,
                t_args_lang("error-generation", &[("error", &e.to_string())], language_code),
            )
            .await?;
            deps.sessions.clear(chat_id).await;
        }
    }

    Ok(())
}
