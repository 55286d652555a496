use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Display theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

/// User-facing settings carried inside the progress aggregate.
///
/// Every enumerated setting has a default, so a cached copy written by an
/// older build deep-merges cleanly against the current shape. Keys this
/// build does not know about land in `extra` instead of being dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub theme: Theme,
    pub speech_rate: f32,
    pub auto_play: bool,
    pub reverse_mode: bool,
    pub translation_languages: Vec<String>,
    pub certification_key: Option<String>,
    pub swipe_enabled: bool,
    pub show_front_translation: bool,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: Theme::System,
            speech_rate: 1.0,
            auto_play: true,
            reverse_mode: false,
            translation_languages: vec!["es".to_string()],
            certification_key: None,
            swipe_enabled: true,
            show_front_translation: true,
            extra: BTreeMap::new(),
        }
    }
}

/// A single settable preference, as exposed on the store surface.
///
/// The certification key is deliberately absent: activating it requires a
/// server-side uniqueness check and goes through its own remote-only
/// operation.
#[derive(Debug, Clone, PartialEq)]
pub enum PreferenceUpdate {
    Theme(Theme),
    SpeechRate(f32),
    AutoPlay(bool),
    ReverseMode(bool),
    TranslationLanguages(Vec<String>),
    SwipeEnabled(bool),
    ShowFrontTranslation(bool),
    /// Forward-compatibility escape hatch for keys this build does not
    /// enumerate.
    Custom(String, Value),
}

impl PreferenceUpdate {
    /// The wire key for the fine-grained remote preference endpoint.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            PreferenceUpdate::Theme(_) => "theme",
            PreferenceUpdate::SpeechRate(_) => "speechRate",
            PreferenceUpdate::AutoPlay(_) => "autoPlay",
            PreferenceUpdate::ReverseMode(_) => "reverseMode",
            PreferenceUpdate::TranslationLanguages(_) => "translationLanguages",
            PreferenceUpdate::SwipeEnabled(_) => "swipeEnabled",
            PreferenceUpdate::ShowFrontTranslation(_) => "showFrontTranslation",
            PreferenceUpdate::Custom(key, _) => key,
        }
    }

    /// The wire value for the fine-grained remote preference endpoint.
    #[must_use]
    pub fn value(&self) -> Value {
        match self {
            PreferenceUpdate::Theme(theme) => {
                serde_json::to_value(theme).unwrap_or(Value::Null)
            }
            PreferenceUpdate::SpeechRate(rate) => {
                serde_json::to_value(rate).unwrap_or(Value::Null)
            }
            PreferenceUpdate::AutoPlay(flag)
            | PreferenceUpdate::ReverseMode(flag)
            | PreferenceUpdate::SwipeEnabled(flag)
            | PreferenceUpdate::ShowFrontTranslation(flag) => Value::Bool(*flag),
            PreferenceUpdate::TranslationLanguages(langs) => {
                serde_json::to_value(langs).unwrap_or(Value::Null)
            }
            PreferenceUpdate::Custom(_, value) => value.clone(),
        }
    }

    /// Apply this update to a preferences struct. A pure key-set: always
    /// overwrites, no idempotence check needed.
    pub fn apply(self, prefs: &mut Preferences) {
        match self {
            PreferenceUpdate::Theme(theme) => prefs.theme = theme,
            PreferenceUpdate::SpeechRate(rate) => prefs.speech_rate = rate,
            PreferenceUpdate::AutoPlay(flag) => prefs.auto_play = flag,
            PreferenceUpdate::ReverseMode(flag) => prefs.reverse_mode = flag,
            PreferenceUpdate::TranslationLanguages(langs) => {
                prefs.translation_languages = langs;
            }
            PreferenceUpdate::SwipeEnabled(flag) => prefs.swipe_enabled = flag,
            PreferenceUpdate::ShowFrontTranslation(flag) => {
                prefs.show_front_translation = flag;
            }
            PreferenceUpdate::Custom(key, value) => {
                prefs.extra.insert(key, value);
            }
        }
    }
}
