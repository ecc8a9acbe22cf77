//! Conversation flow core for the guided post-creation dialogue.
//!
//! The `/create_post` flow walks a user through uploading a product image,
//! describing it, picking one of several generated variant images and one of
//! several generated captions. State lives in a [`crate::session::Session`];
//! this module holds the state enum, the decoded callback actions and the
//! navigation arithmetic so the transitions stay testable without a bot.

use serde::{Deserialize, Serialize};

/// States of the `/create_post` conversation. The terminal state has no
/// variant: reaching it removes the session from the store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowState {
    #[default]
    AwaitImage,
    AwaitDescription,
    ChooseImage,
    ChooseCaption,
}

/// Direction of image navigation in the review step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavDirection {
    Prev,
    Next,
}

/// Inline keyboard actions, decoded once at the callback boundary.
///
/// Keyboards are built from [`CallbackAction::payload`] so the wire tokens and
/// the parser cannot drift apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackAction {
    PrevImage,
    NextImage,
    SelectImage,
    RegenerateImages,
    RegenerateCaptions,
    ChooseCaption(usize),
    CancelPost,
}

impl CallbackAction {
    /// Decode a callback payload. Unknown payloads yield `None` and are
    /// ignored by the caller.
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            "prev_image" => Some(Self::PrevImage),
            "next_image" => Some(Self::NextImage),
            "select_image" => Some(Self::SelectImage),
            "regenerate_images" => Some(Self::RegenerateImages),
            "regenerate_captions" => Some(Self::RegenerateCaptions),
            "cancel_post" => Some(Self::CancelPost),
            other => other
                .strip_prefix("caption_")
                .and_then(|index| index.parse::<usize>().ok())
                .map(Self::ChooseCaption),
        }
    }

    /// The wire token placed in the inline keyboard button.
    pub fn payload(&self) -> String {
        match self {
            Self::PrevImage => "prev_image".to_string(),
            Self::NextImage => "next_image".to_string(),
            Self::SelectImage => "select_image".to_string(),
            Self::RegenerateImages => "regenerate_images".to_string(),
            Self::RegenerateCaptions => "regenerate_captions".to_string(),
            Self::ChooseCaption(index) => format!("caption_{index}"),
            Self::CancelPost => "cancel_post".to_string(),
        }
    }
}

/// Wrap-around index movement over `count` generated images.
///
/// `count == 0` leaves the index untouched; callers never present navigation
/// controls without at least one image.
pub fn step_index(index: usize, count: usize, direction: NavDirection) -> usize {
    if count == 0 {
        return index;
    }
    match direction {
        NavDirection::Next => (index + 1) % count,
        NavDirection::Prev => (index + count - 1) % count,
    }
}

/// Validates a product description input.
pub fn validate_description(input: &str) -> Result<String, &'static str> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err("empty");
    }

    if trimmed.len() > 2000 {
        return Err("too_long");
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_action_parsing() {
        assert_eq!(CallbackAction::parse("prev_image"), Some(CallbackAction::PrevImage));
        assert_eq!(CallbackAction::parse("next_image"), Some(CallbackAction::NextImage));
        assert_eq!(CallbackAction::parse("select_image"), Some(CallbackAction::SelectImage));
        assert_eq!(
            CallbackAction::parse("regenerate_images"),
            Some(CallbackAction::RegenerateImages)
        );
        assert_eq!(
            CallbackAction::parse("regenerate_captions"),
            Some(CallbackAction::RegenerateCaptions)
        );
        assert_eq!(CallbackAction::parse("cancel_post"), Some(CallbackAction::CancelPost));
        assert_eq!(CallbackAction::parse("caption_0"), Some(CallbackAction::ChooseCaption(0)));
        assert_eq!(CallbackAction::parse("caption_2"), Some(CallbackAction::ChooseCaption(2)));

        // Unknown payloads decode to nothing
        assert_eq!(CallbackAction::parse(""), None);
        assert_eq!(CallbackAction::parse("caption_"), None);
        assert_eq!(CallbackAction::parse("caption_x"), None);
        assert_eq!(CallbackAction::parse("confirm"), None);
    }

    #[test]
    fn test_payload_round_trip() {
        let actions = [
            CallbackAction::PrevImage,
            CallbackAction::NextImage,
            CallbackAction::SelectImage,
            CallbackAction::RegenerateImages,
            CallbackAction::RegenerateCaptions,
            CallbackAction::ChooseCaption(1),
            CallbackAction::CancelPost,
        ];
        for action in actions {
            assert_eq!(CallbackAction::parse(&action.payload()), Some(action));
        }
    }

    #[test]
    fn test_step_index_wraps_both_ways() {
        assert_eq!(step_index(0, 3, NavDirection::Next), 1);
        assert_eq!(step_index(2, 3, NavDirection::Next), 0);
        assert_eq!(step_index(0, 3, NavDirection::Prev), 2);
        assert_eq!(step_index(1, 3, NavDirection::Prev), 0);
    }

    #[test]
    fn test_step_index_single_image() {
        assert_eq!(step_index(0, 1, NavDirection::Next), 0);
        assert_eq!(step_index(0, 1, NavDirection::Prev), 0);
    }

    #[test]
    fn test_step_index_empty_list_is_noop() {
        assert_eq!(step_index(0, 0, NavDirection::Next), 0);
        assert_eq!(step_index(0, 0, NavDirection::Prev), 0);
    }

    #[test]
    fn test_description_validation() {
        assert!(validate_description("Clay Vase - elegant").is_ok());
        assert_eq!(validate_description("  trimmed  ").unwrap(), "trimmed");

        assert!(validate_description("").is_err());
        assert!(validate_description("   ").is_err());
        assert!(validate_description(&"a".repeat(2001)).is_err());
    }
}
