//! UI Builder module for creating keyboards and formatting messages

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

// Import localization
use crate::localization::{t_args_lang, t_lang};

// Import flow and session types
use crate::flow::CallbackAction;
use crate::session::Caption;

/// Position label for the image review caption, e.g. "2/3".
pub fn image_position_label(index: usize, count: usize) -> String {
    format!("{}/{}", index + 1, count)
}

/// Caption text shown under a variant image in the review step.
pub fn format_image_review_caption(
    index: usize,
    count: usize,
    language_code: Option<&str>,
) -> String {
    t_args_lang(
        "image-review-caption",
        &[("position", &image_position_label(index, count))],
        language_code,
    )
}

/// Create the inline keyboard for image review: navigation, selection,
/// regeneration and cancellation.
pub fn create_image_review_keyboard(language_code: Option<&str>) -> InlineKeyboardMarkup {
    let buttons = vec![
        vec![
            InlineKeyboardButton::callback(
                t_lang("btn-prev", language_code),
                CallbackAction::PrevImage.payload(),
            ),
            InlineKeyboardButton::callback(
                t_lang("btn-next", language_code),
                CallbackAction::NextImage.payload(),
            ),
        ],
        vec![InlineKeyboardButton::callback(
            t_lang("btn-select", language_code),
            CallbackAction::SelectImage.payload(),
        )],
        vec![
            InlineKeyboardButton::callback(
                t_lang("btn-regenerate-images", language_code),
                CallbackAction::RegenerateImages.payload(),
            ),
            InlineKeyboardButton::callback(
                t_lang("btn-cancel", language_code),
                CallbackAction::CancelPost.payload(),
            ),
        ],
    ];

    InlineKeyboardMarkup::new(buttons)
}

/// Create the inline keyboard for caption selection.
pub fn create_caption_choice_keyboard(
    caption_count: usize,
    language_code: Option<&str>,
) -> InlineKeyboardMarkup {
    let mut buttons: Vec<Vec<InlineKeyboardButton>> = (0..caption_count)
        .map(|i| {
            vec![InlineKeyboardButton::callback(
                t_args_lang("caption-option", &[("index", &(i + 1).to_string())], language_code),
                CallbackAction::ChooseCaption(i).payload(),
            )]
        })
        .collect();

    buttons.push(vec![
        InlineKeyboardButton::callback(
            t_lang("btn-regenerate-captions", language_code),
            CallbackAction::RegenerateCaptions.payload(),
        ),
        InlineKeyboardButton::callback(
            t_lang("btn-cancel", language_code),
            CallbackAction::CancelPost.payload(),
        ),
    ]);

    InlineKeyboardMarkup::new(buttons)
}

/// Format the generated captions as a numbered list for review.
pub fn format_caption_list(captions: &[Caption], language_code: Option<&str>) -> String {
    let mut result = format!("{}\n\n", t_lang("choose-caption-title", language_code));

    for (i, caption) in captions.iter().enumerate() {
        result.push_str(&format!(
            "{}:\n{}\n{} {}\n\n",
            t_args_lang("caption-option", &[("index", &(i + 1).to_string())], language_code),
            caption.text,
            caption.emojis.concat(),
            caption.hashtags.join(" ")
        ));
    }

    result
}

/// Compose the final post text from the chosen caption.
pub fn compose_final_post(caption: &Caption) -> String {
    format!(
        "{}\n\n{}\n{}",
        caption.text,
        caption.emojis.concat(),
        caption.hashtags.join(" ")
    )
}
