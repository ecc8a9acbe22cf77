//! Fluent-based localization for all user-facing bot messages.

use std::collections::HashMap;
use std::fs;
use std::sync::{Arc, OnceLock};

use anyhow::Result;
use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use unic_langid::LanguageIdentifier;

const FALLBACK_LANGUAGE: &str = "en";
const SUPPORTED_LANGUAGES: &[&str] = &["en"];

/// Localization manager for the CraftPost bot
pub struct LocalizationManager {
    bundles: HashMap<String, Arc<FluentBundle<FluentResource>>>,
}

impl LocalizationManager {
    /// Create a new localization manager, loading every supported bundle.
    pub fn new() -> Result<Self> {
        let mut bundles = HashMap::new();

        for language in SUPPORTED_LANGUAGES {
            let locale: LanguageIdentifier = language.parse()?;
            let bundle = Self::create_bundle(&locale)?;
            bundles.insert(language.to_string(), Arc::new(bundle));
        }

        Ok(Self { bundles })
    }

    fn create_bundle(locale: &LanguageIdentifier) -> Result<FluentBundle<FluentResource>> {
        let mut bundle = FluentBundle::new_concurrent(vec![locale.clone()]);

        let resource_path = format!("./locales/{locale}/main.ftl");
        let content = fs::read_to_string(&resource_path)?;
        let resource = FluentResource::try_new(content)
            .map_err(|_| anyhow::anyhow!("failed to parse fluent resource {resource_path}"))?;
        bundle
            .add_resource(resource)
            .map_err(|_| anyhow::anyhow!("conflicting messages in {resource_path}"))?;

        Ok(bundle)
    }

    /// Get a localized message in a specific language, falling back to
    /// English for unsupported languages.
    pub fn get_message_in_language(
        &self,
        key: &str,
        language: &str,
        args: Option<&HashMap<&str, &str>>,
    ) -> String {
        let bundle = self
            .bundles
            .get(language)
            .or_else(|| self.bundles.get(FALLBACK_LANGUAGE));
        let Some(bundle) = bundle else {
            return format!("Missing translation: {key}");
        };

        let msg = match bundle.get_message(key) {
            Some(msg) => msg,
            None => return format!("Missing translation: {key}"),
        };

        let pattern = match msg.value() {
            Some(pattern) => pattern,
            None => return format!("Missing value for key: {key}"),
        };

        let mut value = String::new();

        if let Some(args) = args {
            let fluent_args =
                FluentArgs::from_iter(args.iter().map(|(k, v)| (*k, FluentValue::from(*v))));
            let _ = bundle.write_pattern(&mut value, pattern, Some(&fluent_args), &mut vec![]);
        } else {
            let _ = bundle.write_pattern(&mut value, pattern, None, &mut vec![]);
        }

        value
    }
}

/// Global localization instance
static LOCALIZATION_MANAGER: OnceLock<LocalizationManager> = OnceLock::new();

/// Initialize the global localization manager
pub fn init_localization() -> Result<()> {
    if LOCALIZATION_MANAGER.get().is_some() {
        return Ok(());
    }
    let manager = LocalizationManager::new()?;
    let _ = LOCALIZATION_MANAGER.set(manager);
    Ok(())
}

fn get_localization_manager() -> &'static LocalizationManager {
    LOCALIZATION_MANAGER
        .get()
        .expect("Localization manager not initialized")
}

/// Normalize a Telegram language code to a supported bundle language.
pub fn detect_language(language_code: Option<&str>) -> &'static str {
    let Some(code) = language_code else {
        return FALLBACK_LANGUAGE;
    };
    let base = code.split('-').next().unwrap_or(code);
    SUPPORTED_LANGUAGES
        .iter()
        .find(|supported| **supported == base)
        .copied()
        .unwrap_or(FALLBACK_LANGUAGE)
}

/// Get a localized message for a user's Telegram language code.
pub fn t_lang(key: &str, language_code: Option<&str>) -> String {
    get_localization_manager().get_message_in_language(key, detect_language(language_code), None)
}

/// Get a localized message with arguments for a user's language code.
pub fn t_args_lang(key: &str, args: &[(&str, &str)], language_code: Option<&str>) -> String {
    let args_map: HashMap<&str, &str> = args.iter().cloned().collect();
    get_localization_manager().get_message_in_language(
        key,
        detect_language(language_code),
        Some(&args_map),
    )
}
