//! Tests for keyboards and message formatting in the review steps.

use craftpost::bot::ui_builder::{
    compose_final_post, create_caption_choice_keyboard, create_image_review_keyboard,
    format_caption_list, format_image_review_caption, image_position_label,
};
use craftpost::flow::CallbackAction;
use craftpost::localization::init_localization;
use craftpost::session::Caption;
use teloxide::types::{InlineKeyboardButtonKind, InlineKeyboardMarkup};

fn setup_localization() {
    init_localization().expect("Failed to initialize localization");
}

fn callback_payloads(keyboard: &InlineKeyboardMarkup) -> Vec<String> {
    keyboard
        .inline_keyboard
        .iter()
        .flatten()
        .filter_map(|button| match &button.kind {
            InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_image_position_label() {
    assert_eq!(image_position_label(0, 3), "1/3");
    assert_eq!(image_position_label(2, 3), "3/3");
    assert_eq!(image_position_label(0, 1), "1/1");
}

#[test]
fn test_image_review_caption_contains_position() {
    setup_localization();

    let caption = format_image_review_caption(1, 3, Some("en"));
    assert!(caption.contains("2/3"));
}

#[test]
fn test_image_review_keyboard_payloads_decode() {
    setup_localization();

    let keyboard = create_image_review_keyboard(Some("en"));
    let payloads = callback_payloads(&keyboard);

    assert_eq!(payloads.len(), 5);
    for payload in &payloads {
        assert!(
            CallbackAction::parse(payload).is_some(),
            "keyboard emitted unparseable payload {payload}"
        );
    }
    assert!(payloads.contains(&"prev_image".to_string()));
    assert!(payloads.contains(&"next_image".to_string()));
    assert!(payloads.contains(&"select_image".to_string()));
    assert!(payloads.contains(&"regenerate_images".to_string()));
    assert!(payloads.contains(&"cancel_post".to_string()));
}

#[test]
fn test_caption_choice_keyboard_payloads_decode() {
    setup_localization();

    let keyboard = create_caption_choice_keyboard(3, Some("en"));
    let payloads = callback_payloads(&keyboard);

    assert_eq!(payloads.len(), 5);
    assert!(payloads.contains(&"caption_0".to_string()));
    assert!(payloads.contains(&"caption_1".to_string()));
    assert!(payloads.contains(&"caption_2".to_string()));
    assert!(payloads.contains(&"regenerate_captions".to_string()));
    assert!(payloads.contains(&"cancel_post".to_string()));
    for payload in &payloads {
        assert!(CallbackAction::parse(payload).is_some());
    }
}

#[test]
fn test_caption_list_formatting() {
    setup_localization();

    let captions = vec![
        Caption {
            text: "Shaped by hand".to_string(),
            hashtags: vec!["#pottery".to_string()],
            emojis: vec!["🏺".to_string()],
        },
        Caption {
            text: "Warm tones".to_string(),
            hashtags: vec!["#decor".to_string(), "#handmade".to_string()],
            emojis: vec!["✨".to_string(), "🧡".to_string()],
        },
    ];

    let listing = format_caption_list(&captions, Some("en"));
    assert!(listing.contains("Shaped by hand"));
    assert!(listing.contains("Warm tones"));
    assert!(listing.contains("#decor #handmade"));
    assert!(listing.contains("✨🧡"));
}

#[test]
fn test_compose_final_post() {
    let caption = Caption {
        text: "Shaped by hand, made to last".to_string(),
        hashtags: vec!["#pottery".to_string(), "#artisan".to_string()],
        emojis: vec!["🏺".to_string(), "✨".to_string()],
    };

    let post = compose_final_post(&caption);
    assert_eq!(post, "Shaped by hand, made to last\n\n🏺✨\n#pottery #artisan");
}
