//! Server-supplied custom emoji.
//!
//! Descriptors arrive in the shape the server's custom emoji endpoint returns
//! them. They are mapped into the catalog's entry shape for the picker and
//! into a shortcode map for substitution.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A custom emoji as returned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomEmojiEntry {
    pub shortcode: String,
    pub static_url: String,
    /// Animated source, when the server provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default = "default_visible")]
    pub visible_in_picker: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

const fn default_visible() -> bool {
    true
}

impl CustomEmojiEntry {
    pub fn new(shortcode: impl Into<String>, static_url: impl Into<String>) -> Self {
        Self {
            shortcode: shortcode.into(),
            static_url: static_url.into(),
            url: None,
            visible_in_picker: true,
            category: None,
        }
    }

    /// Shortcode with surrounding colons removed.
    pub fn bare_shortcode(&self) -> &str {
        strip_colons(&self.shortcode)
    }
}

/// Image skin of a custom catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomSkin {
    pub src: String,
}

/// A custom emoji in the catalog's entry shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomCatalogEntry {
    pub id: String,
    pub name: String,
    pub keywords: Vec<String>,
    pub skins: Vec<CustomSkin>,
}

/// Map custom emoji descriptors into catalog entries, one for one, in order.
pub fn build_custom_emojis(custom_emojis: &[CustomEmojiEntry]) -> Vec<CustomCatalogEntry> {
    custom_emojis
        .iter()
        .map(|emoji| {
            let id = emoji.bare_shortcode().to_string();
            CustomCatalogEntry {
                name: id.clone(),
                keywords: vec![id.clone()],
                skins: vec![CustomSkin {
                    src: emoji.static_url.clone(),
                }],
                id,
            }
        })
        .collect()
}

/// Custom emoji keyed by bare shortcode, for substitution.
#[derive(Debug, Clone, Default)]
pub struct CustomEmojiMap {
    by_shortcode: HashMap<String, CustomEmojiEntry>,
}

impl CustomEmojiMap {
    pub fn new(custom_emojis: &[CustomEmojiEntry]) -> Self {
        let by_shortcode = custom_emojis
            .iter()
            .map(|emoji| (emoji.bare_shortcode().to_string(), emoji.clone()))
            .collect();
        Self { by_shortcode }
    }

    pub fn get(&self, shortcode: &str) -> Option<&CustomEmojiEntry> {
        self.by_shortcode.get(shortcode)
    }

    pub fn is_empty(&self) -> bool {
        self.by_shortcode.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_shortcode.len()
    }
}

fn strip_colons(shortcode: &str) -> &str {
    shortcode.trim_matches(':')
}
