//! Emoji search for the picker.
//!
//! One index with two key namespaces:
//! - `n<id>`: native emoji, built once from the catalog.
//! - `c<ordinal>`: custom emoji, replaced wholesale by [`EmojiIndex::add_custom_to_pool`].
//!
//! Custom ordinals are positions in the array that was last registered, so
//! they are only meaningful against that exact array.

use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};

use serde::Serialize;

use crate::catalog::{Catalog, NativeEmojiEntry};
use crate::custom::CustomEmojiEntry;

pub const NATIVE_NAMESPACE: &str = "n";
pub const CUSTOM_NAMESPACE: &str = "c";
pub const DEFAULT_MAX_RESULTS: usize = 5;

const SCORE_EXACT: u32 = 3;
const SCORE_PREFIX: u32 = 2;
const SCORE_SUBSTRING: u32 = 1;
/// Multiplier for matches against the identifier field.
const ID_WEIGHT: u32 = 2;

/// A built-in emoji search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NativeEmoji {
    pub id: String,
    pub colons: String,
    pub unified: String,
    pub native: String,
}

/// A server-supplied emoji search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomEmoji {
    pub id: String,
    pub colons: String,
    pub image_url: String,
}

/// Either kind of emoji, as consumed by the picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Emoji {
    Native(NativeEmoji),
    Custom(CustomEmoji),
}

impl Emoji {
    pub fn id(&self) -> &str {
        match self {
            Self::Native(emoji) => &emoji.id,
            Self::Custom(emoji) => &emoji.id,
        }
    }

    pub fn colons(&self) -> &str {
        match self {
            Self::Native(emoji) => &emoji.colons,
            Self::Custom(emoji) => &emoji.colons,
        }
    }

    /// `None` for an entry without skins.
    pub fn from_native(entry: &NativeEmojiEntry) -> Option<Self> {
        let skin = entry.default_skin()?;
        Some(Self::Native(NativeEmoji {
            id: entry.id.clone(),
            colons: format!(":{}:", entry.id),
            unified: skin.unified.clone(),
            native: skin.native.clone(),
        }))
    }

    pub fn from_custom(entry: &CustomEmojiEntry) -> Self {
        let id = entry.bare_shortcode().to_string();
        Self::Custom(CustomEmoji {
            colons: format!(":{id}:"),
            image_url: entry.static_url.clone(),
            id,
        })
    }
}

/// A ranked key returned by [`TextIndex::search`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub key: String,
    pub score: u32,
}

/// Which part of a document a token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Field {
    Text,
    Id,
}

impl Field {
    const fn weight(self) -> u32 {
        match self {
            Self::Text => 1,
            Self::Id => ID_WEIGHT,
        }
    }
}

#[derive(Debug, Clone)]
struct Document {
    key: String,
    tokens: Vec<(String, Field)>,
}

/// Inverted index over lowercased tokens with substring matching.
///
/// Each document has an identifier (a shortcode) and free text (name,
/// keywords). Keys are opaque strings; a leading namespace prefix lets whole
/// groups be removed at once.
#[derive(Debug, Clone, Default)]
pub struct TextIndex {
    /// Slot order is insertion order. Removed slots stay as `None`.
    docs: Vec<Option<Document>>,
    slots: HashMap<String, usize>,
    vocabulary: BTreeMap<String, Vec<(usize, Field)>>,
}

impl TextIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index `id` and `text` under `key`, replacing any document already there.
    pub fn add(&mut self, key: impl Into<String>, id: &str, text: &str) {
        let key = key.into();
        self.remove(&key);

        let slot = self.docs.len();
        let mut tokens: Vec<(String, Field)> = tokenize(id)
            .into_iter()
            .map(|token| (token, Field::Id))
            .chain(tokenize(text).into_iter().map(|token| (token, Field::Text)))
            .collect();
        tokens.sort();
        tokens.dedup();
        for (token, field) in &tokens {
            self.vocabulary
                .entry(token.clone())
                .or_default()
                .push((slot, *field));
        }
        self.slots.insert(key.clone(), slot);
        self.docs.push(Some(Document { key, tokens }));
    }

    pub fn remove(&mut self, key: &str) -> bool {
        let Some(slot) = self.slots.remove(key) else {
            return false;
        };
        let Some(doc) = self.docs.get_mut(slot).and_then(Option::take) else {
            return false;
        };
        for (token, _) in doc.tokens {
            if let Some(slots) = self.vocabulary.get_mut(&token) {
                slots.retain(|&(s, _)| s != slot);
                if slots.is_empty() {
                    self.vocabulary.remove(&token);
                }
            }
        }
        true
    }

    /// Remove every document whose key starts with `prefix`. Returns how many went.
    pub fn remove_namespace(&mut self, prefix: &str) -> usize {
        let doomed: Vec<String> = self
            .slots
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        let removed = doomed.iter().filter(|key| self.remove(key)).count();
        if self.slots.is_empty() {
            self.docs.clear();
        }
        removed
    }

    /// Keys matching every query token, best first, at most `limit`.
    ///
    /// A query token scores 3 against an identical token, 2 against a token
    /// it prefixes and 1 against a token containing it, doubled when the
    /// token is part of the identifier. Ties keep insertion order.
    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        let mut terms = tokenize(query);
        terms.sort();
        terms.dedup();
        if terms.is_empty() || limit == 0 {
            return Vec::new();
        }

        let mut totals: HashMap<usize, (u32, usize)> = HashMap::new();
        for term in &terms {
            let mut best: HashMap<usize, u32> = HashMap::new();
            for (token, slots) in &self.vocabulary {
                let score = if token == term {
                    SCORE_EXACT
                } else if token.starts_with(term.as_str()) {
                    SCORE_PREFIX
                } else if token.contains(term.as_str()) {
                    SCORE_SUBSTRING
                } else {
                    continue;
                };
                for &(slot, field) in slots {
                    let entry = best.entry(slot).or_default();
                    *entry = (*entry).max(score * field.weight());
                }
            }
            for (slot, score) in best {
                let total = totals.entry(slot).or_default();
                total.0 += score;
                total.1 += 1;
            }
        }

        let mut ranked: Vec<(usize, u32)> = totals
            .into_iter()
            .filter(|(_, (_, matched))| *matched == terms.len())
            .map(|(slot, (score, _))| (slot, score))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        ranked
            .into_iter()
            .filter_map(|(slot, score)| {
                let doc = self.docs.get(slot)?.as_ref()?;
                Some(SearchHit {
                    key: doc.key.clone(),
                    score,
                })
            })
            .take(limit)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || matches!(c, '_' | '-' | '+')))
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[derive(Debug, Default)]
struct CustomPartition {
    index: TextIndex,
    /// The array the ordinals in `index` refer to.
    pool: Vec<CustomEmojiEntry>,
}

/// Search over native and custom emoji.
#[derive(Debug)]
pub struct EmojiIndex<'a> {
    catalog: &'a Catalog,
    native: TextIndex,
    custom: RwLock<CustomPartition>,
}

impl<'a> EmojiIndex<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        let _scope = crate::perf::scope("search.build_native");
        let mut native = TextIndex::new();
        for entry in catalog.entries() {
            let text = format!("{} {}", entry.name, entry.keywords.join(" "));
            native.add(format!("{NATIVE_NAMESPACE}{}", entry.id), &entry.id, &text);
        }
        tracing::debug!(entries = native.len(), "built native emoji index");
        Self {
            catalog,
            native,
            custom: RwLock::new(CustomPartition::default()),
        }
    }

    /// Replace the custom partition with `custom_emojis`.
    ///
    /// Existing custom keys are swept before the new ones go in, under a
    /// single write lock, so readers never see a partial partition.
    pub fn add_custom_to_pool(&self, custom_emojis: &[CustomEmojiEntry]) {
        let mut partition = self
            .custom
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let removed = partition.index.remove_namespace(CUSTOM_NAMESPACE);
        for (ordinal, emoji) in custom_emojis.iter().enumerate() {
            partition.index.add(
                format!("{CUSTOM_NAMESPACE}{ordinal}"),
                emoji.bare_shortcode(),
                "",
            );
        }
        partition.pool = custom_emojis.to_vec();
        tracing::debug!(
            removed,
            added = custom_emojis.len(),
            "re-registered custom emoji"
        );
    }

    /// Up to `max_results` emoji matching `query`, best first.
    ///
    /// Custom hits resolve against `custom_emojis` by position. Pass the
    /// array given to the last [`Self::add_custom_to_pool`] call, or `None` to
    /// use the copy stored at registration. Hits that no longer resolve are
    /// dropped.
    pub fn search(
        &self,
        query: &str,
        max_results: usize,
        custom_emojis: Option<&[CustomEmojiEntry]>,
    ) -> Vec<Emoji> {
        let partition = self.custom.read().unwrap_or_else(PoisonError::into_inner);
        let pool = custom_emojis.unwrap_or(partition.pool.as_slice());

        let mut hits = self.native.search(query, max_results);
        hits.extend(partition.index.search(query, max_results));
        // Stable: natives stay ahead of customs on equal scores.
        hits.sort_by(|a, b| b.score.cmp(&a.score));
        hits.truncate(max_results);

        hits.into_iter()
            .filter_map(|hit| self.resolve_key(&hit.key, pool))
            .collect()
    }

    /// Turn an index key back into a result. `None` for stale or unknown keys.
    pub fn resolve_key(&self, key: &str, pool: &[CustomEmojiEntry]) -> Option<Emoji> {
        if let Some(ordinal) = key.strip_prefix(CUSTOM_NAMESPACE) {
            let emoji = ordinal.parse::<usize>().ok().and_then(|i| pool.get(i));
            if emoji.is_none() {
                tracing::debug!(key, pool = pool.len(), "dropping stale custom emoji hit");
            }
            return emoji.map(Emoji::from_custom);
        }
        let id = key.strip_prefix(NATIVE_NAMESPACE)?;
        self.catalog.lookup_by_id(id).and_then(Emoji::from_native)
    }

    /// Custom emoji currently registered.
    pub fn custom_pool(&self) -> Vec<CustomEmojiEntry> {
        self.custom
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .pool
            .clone()
    }

    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> EmojiIndex<'static> {
        EmojiIndex::new(Catalog::global())
    }

    fn ids(results: &[Emoji]) -> Vec<&str> {
        results.iter().map(Emoji::id).collect()
    }

    #[test]
    fn test_text_index_ranks_exact_before_prefix_before_substring() {
        let mut index = TextIndex::new();
        index.add("a", "", "unsmileable");
        index.add("b", "", "smiley");
        index.add("c", "", "smile");
        let keys: Vec<_> = index.search("smil", 10).into_iter().map(|h| h.key).collect();
        assert_eq!(keys, vec!["b", "c", "a"]);
        let keys: Vec<_> = index.search("smile", 10).into_iter().map(|h| h.key).collect();
        assert_eq!(keys, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_text_index_ranks_id_above_text() {
        let mut index = TextIndex::new();
        index.add("blush", "blush", "smiling face smile");
        index.add("grin", "grin", "beaming face smile");
        index.add("smile", "smile", "grinning face");
        index.add("smiley", "smiley", "happy");
        let hits = index.search("smile", 10);
        let keys: Vec<_> = hits.iter().map(|h| h.key.as_str()).collect();
        assert_eq!(keys, vec!["smile", "smiley", "blush", "grin"]);
        assert_eq!(
            hits.iter().map(|h| h.score).collect::<Vec<_>>(),
            vec![6, 4, 3, 3]
        );
    }

    #[test]
    fn test_text_index_requires_every_term() {
        let mut index = TextIndex::new();
        index.add("a", "", "red heart");
        index.add("b", "", "blue heart");
        let hits = index.search("heart blue", 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].key, "b");
    }

    #[test]
    fn test_text_index_remove_namespace() {
        let mut index = TextIndex::new();
        index.add("n1", "alpha", "");
        index.add("c0", "alpha", "");
        index.add("c1", "beta", "");
        assert_eq!(index.remove_namespace("c"), 2);
        assert_eq!(index.len(), 1);
        let keys: Vec<_> = index.search("alpha", 10).into_iter().map(|h| h.key).collect();
        assert_eq!(keys, vec!["n1"]);
        assert!(index.search("beta", 10).is_empty());
    }

    #[test]
    fn test_text_index_add_replaces_existing_key() {
        let mut index = TextIndex::new();
        index.add("k", "old", "");
        index.add("k", "", "new");
        assert_eq!(index.len(), 1);
        assert!(index.search("old", 10).is_empty());
        assert_eq!(index.search("new", 10).len(), 1);
    }

    #[test]
    fn test_text_index_empty_query_and_zero_limit() {
        let mut index = TextIndex::new();
        index.add("k", "value", "");
        assert!(index.search("   ", 10).is_empty());
        assert!(index.search("value", 0).is_empty());
    }

    #[test]
    fn test_search_native_by_id_name_and_keyword() {
        let index = index();
        let results = index.search("rainbow", DEFAULT_MAX_RESULTS, None);
        assert_eq!(results[0].id(), "rainbow");
        assert!(ids(&index.search("pizza", 5, None)).contains(&"pizza"));
        assert!(ids(&index.search("applause", 5, None)).contains(&"clap"));
    }

    #[test]
    fn test_search_exact_id_comes_first() {
        let index = index();
        for id in ["smile", "heart", "cat", "joy", "fire", "star", "pizza", "apple"] {
            let results = index.search(id, 1, None);
            assert_eq!(ids(&results), vec![id], "query {id:?}");
        }
    }

    #[test]
    fn test_search_full_catalog_names() {
        let index = index();
        assert!(ids(&index.search("cake", 10, None)).contains(&"birthday"));
        assert!(ids(&index.search("apple", 10, None)).contains(&"green_apple"));
        assert_eq!(index.search("guard", 1, None)[0].id(), "guard");
    }

    #[test]
    fn test_search_native_result_shape() {
        let results = index().search("ok_hand", 1, None);
        assert_eq!(
            results,
            vec![Emoji::Native(NativeEmoji {
                id: "ok_hand".to_string(),
                colons: ":ok_hand:".to_string(),
                unified: "1f44c".to_string(),
                native: "👌".to_string(),
            })]
        );
    }

    #[test]
    fn test_search_caps_results() {
        let results = index().search("heart", 3, None);
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn test_search_custom_with_supplied_array() {
        let index = index();
        let pool = vec![CustomEmojiEntry::new("foo", "/u/foo.png")];
        index.add_custom_to_pool(&pool);
        let results = index.search("foo", DEFAULT_MAX_RESULTS, Some(pool.as_slice()));
        assert_eq!(
            results[0],
            Emoji::Custom(CustomEmoji {
                id: "foo".to_string(),
                colons: ":foo:".to_string(),
                image_url: "/u/foo.png".to_string(),
            })
        );
    }

    #[test]
    fn test_search_custom_with_stored_array() {
        let index = index();
        index.add_custom_to_pool(&[CustomEmojiEntry::new("blobcat", "/u/blobcat.png")]);
        let results = index.search("blob", DEFAULT_MAX_RESULTS, None);
        assert_eq!(ids(&results), vec!["blobcat"]);
    }

    #[test]
    fn test_stale_ordinals_are_dropped() {
        let index = index();
        index.add_custom_to_pool(&[
            CustomEmojiEntry::new("blob_a", "/a.png"),
            CustomEmojiEntry::new("blob_b", "/b.png"),
        ]);
        let shorter = vec![CustomEmojiEntry::new("blob_a", "/a.png")];
        let results = index.search("blob", DEFAULT_MAX_RESULTS, Some(shorter.as_slice()));
        assert_eq!(ids(&results), vec!["blob_a"]);
    }

    #[test]
    fn test_re_registration_leaves_no_residue() {
        let index = index();
        index.add_custom_to_pool(&[
            CustomEmojiEntry::new("oldblob", "/old.png"),
            CustomEmojiEntry::new("otherblob", "/other.png"),
        ]);
        let fresh = vec![CustomEmojiEntry::new("newcat", "/new.png")];
        index.add_custom_to_pool(&fresh);
        assert!(index.search("oldblob", 5, Some(fresh.as_slice())).is_empty());
        assert!(index.search("otherblob", 5, None).is_empty());
        assert_eq!(ids(&index.search("newcat", 5, None)), vec!["newcat"]);
        assert_eq!(index.custom_pool(), fresh);
    }

    #[test]
    fn test_exact_custom_outranks_substring_native() {
        let index = index();
        index.add_custom_to_pool(&[CustomEmojiEntry::new("eart", "/eart.png")]);
        let results = index.search("eart", 5, None);
        assert_eq!(results[0].id(), "eart");
        assert!(results[1..].iter().all(|emoji| matches!(emoji, Emoji::Native(_))));
    }

    #[test]
    fn test_resolve_key_unknown_native_is_dropped() {
        assert!(index().resolve_key("nnot_an_emoji", &[]).is_none());
        assert!(index().resolve_key("cxyz", &[]).is_none());
        assert!(index().resolve_key("zzz", &[]).is_none());
    }

    #[test]
    fn test_from_native_without_skins_is_none() {
        let entry = NativeEmojiEntry {
            id: "blank".to_string(),
            name: "Blank".to_string(),
            keywords: Vec::new(),
            skins: Vec::new(),
            version: None,
        };
        assert!(Emoji::from_native(&entry).is_none());
    }

    #[test]
    fn test_emoji_serializes_image_url_camel_case() {
        let emoji = Emoji::from_custom(&CustomEmojiEntry::new(":foo:", "/foo.png"));
        let json = serde_json::to_string(&emoji).unwrap();
        assert_eq!(json, r#"{"id":"foo","colons":":foo:","imageUrl":"/foo.png"}"#);
    }

    #[test]
    fn test_concurrent_re_registration_is_atomic() {
        let index = index();
        let first: Vec<_> = (0..3)
            .map(|i| CustomEmojiEntry::new(format!("blob{i}"), format!("/a{i}.png")))
            .collect();
        let second: Vec<_> = (0..3)
            .map(|i| CustomEmojiEntry::new(format!("blobx{i}"), format!("/b{i}.png")))
            .collect();
        index.add_custom_to_pool(&first);

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for round in 0..200 {
                    let pool = if round % 2 == 0 { &second } else { &first };
                    index.add_custom_to_pool(pool);
                }
            });
            scope.spawn(|| {
                for _ in 0..200 {
                    let results = index.search("blob", 10, None);
                    assert_eq!(results.len(), 3);
                    let all_first = results.iter().all(|e| !e.id().starts_with("blobx"));
                    let all_second = results.iter().all(|e| e.id().starts_with("blobx"));
                    assert!(all_first || all_second);
                }
            });
        });
    }
}
