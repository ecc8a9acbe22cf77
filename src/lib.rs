//! # CraftPost Telegram Bot
//!
//! A Telegram bot that helps artisans produce marketing content for their
//! products: a guided conversation turns an uploaded product photo and a
//! short description into AI-generated variant images and captions, composed
//! into a ready-to-publish social media post.

pub mod bot;
pub mod flow;
pub mod gemini;
pub mod localization;
pub mod session;
pub mod storage;
pub mod utils;
