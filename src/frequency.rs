//! Frequently used emoji for the top row of the picker.

use std::collections::HashMap;

use crate::custom::CustomEmojiEntry;
use crate::search::{Emoji, EmojiIndex, CUSTOM_NAMESPACE, NATIVE_NAMESPACE};

/// Shown when the user has not used enough emoji yet.
pub const DEFAULT_FREQUENT: &[&str] = &[
    "+1",
    "grinning",
    "kissing_heart",
    "heart_eyes",
    "laughing",
    "stuck_out_tongue_winking_eye",
    "sweat_smile",
    "joy",
    "yum",
    "disappointed",
    "thinking_face",
    "weary",
    "sob",
    "sunglasses",
    "heart",
    "ok_hand",
];

/// Source of usage-ranked emoji ids.
pub trait FrequencyService {
    /// The `n` most used ids, most used first. Ties are ordered consistently
    /// across calls as long as the underlying counts do not change.
    fn top_n(&self, n: usize) -> Vec<String>;
}

/// In-memory usage counts keyed by emoji id (native id or custom shortcode).
#[derive(Debug, Clone, Default)]
pub struct UsageCounter {
    counts: HashMap<String, u64>,
    /// ids in order of first use, for tie breaking
    first_seen: Vec<String>,
}

impl UsageCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, id: &str) {
        if let Some(count) = self.counts.get_mut(id) {
            *count += 1;
            return;
        }
        self.counts.insert(id.to_string(), 1);
        self.first_seen.push(id.to_string());
    }

    pub fn count(&self, id: &str) -> u64 {
        self.counts.get(id).copied().unwrap_or(0)
    }
}

impl FrequencyService for UsageCounter {
    fn top_n(&self, n: usize) -> Vec<String> {
        let mut ranked: Vec<&String> = self.first_seen.iter().collect();
        ranked.sort_by_key(|id| std::cmp::Reverse(self.count(id)));
        ranked.into_iter().take(n).cloned().collect()
    }
}

/// Up to `n` emoji for the picker: most used first, padded with defaults.
///
/// Ids are looked up among `custom_emojis` first, then the catalog. Unknown
/// ids are skipped.
pub fn frequently_used(
    service: &dyn FrequencyService,
    index: &EmojiIndex<'_>,
    n: usize,
    custom_emojis: &[CustomEmojiEntry],
) -> Vec<Emoji> {
    let mut picked: Vec<Emoji> = Vec::with_capacity(n);
    let candidates = service
        .top_n(n)
        .into_iter()
        .chain(DEFAULT_FREQUENT.iter().map(ToString::to_string));

    for id in candidates {
        if picked.len() >= n {
            break;
        }
        if picked.iter().any(|emoji| emoji.id() == id) {
            continue;
        }
        if let Some(emoji) = resolve_id(index, &id, custom_emojis) {
            picked.push(emoji);
        }
    }
    picked
}

fn resolve_id(
    index: &EmojiIndex<'_>,
    id: &str,
    custom_emojis: &[CustomEmojiEntry],
) -> Option<Emoji> {
    if let Some(ordinal) = custom_emojis
        .iter()
        .position(|emoji| emoji.bare_shortcode() == id)
    {
        return index.resolve_key(&format!("{CUSTOM_NAMESPACE}{ordinal}"), custom_emojis);
    }
    index.resolve_key(&format!("{NATIVE_NAMESPACE}{id}"), custom_emojis)
}
