// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. custom::CustomEmojiMap)
    clippy::module_name_repetitions
)]

//! # Fedimoji
//!
//! Emoji recognition and substitution for fediverse post and profile HTML,
//! plus the emoji picker's search index.
//!
//! - Replaces `:shortcode:` runs and literal Unicode emoji (ZWJ sequences,
//!   keycaps, flags, subdivision flags, skin tones) with inline `<img>` tags
//! - Leaves tag interiors alone, so attributes are never rewritten
//! - Searches native and server-supplied custom emoji together
//!
//! ## Modules
//!
//! - [`catalog`]: Native emoji metadata, loaded once
//! - [`custom`]: Server-supplied custom emoji
//! - [`emojify`]: Text substitution
//! - [`search`]: Picker search index
//! - [`frequency`]: Frequently used emoji
//! - [`config`]: rc-file and command-line flags
//! - [`perf`]: Timing scopes

pub mod catalog;
pub mod config;
pub mod custom;
pub mod emojify;
pub mod frequency;
pub mod perf;
pub mod search;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::catalog::{Catalog, NativeEmojiEntry};
    pub use crate::custom::{build_custom_emojis, CustomEmojiEntry, CustomEmojiMap};
    pub use crate::emojify::{emojify, emojify_with_custom, valid_emoji_char, Emojifier};
    pub use crate::search::{Emoji, EmojiIndex};
}
