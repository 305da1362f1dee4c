//! Native emoji catalog.
//!
//! The catalog is static data shipped with the build (`data/emoji.json`, in
//! the emoji-mart layout). It is parsed once, validated, and never mutated
//! afterwards, so a shared reference can be handed to any number of readers.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::OnceLock;

use serde::Deserialize;
use thiserror::Error;

const BUNDLED_CATALOG: &str = include_str!("../data/emoji.json");

/// Errors produced while loading catalog data.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed catalog data: {0}")]
    Json(#[from] serde_json::Error),
    #[error("emoji `{0}` has no skins")]
    NoSkins(String),
    #[error("emoji `{id}` has an invalid unified code `{unified}`")]
    InvalidUnified { id: String, unified: String },
    #[error("emoji `{id}` unified code `{unified}` does not match its native sequence")]
    NativeMismatch { id: String, unified: String },
    #[error("emoji `{id}` is keyed as `{key}`")]
    KeyMismatch { id: String, key: String },
    #[error("alias `{alias}` points at unknown emoji `{target}`")]
    DanglingAlias { alias: String, target: String },
}

/// One presentation of a native emoji.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Skin {
    /// Lowercase, hyphen-joined hex codepoints.
    pub unified: String,
    /// The literal character sequence.
    pub native: String,
    /// Sprite sheet column.
    #[serde(default)]
    pub x: u32,
    /// Sprite sheet row.
    #[serde(default)]
    pub y: u32,
}

/// Metadata for a built-in emoji. The first skin is the default.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NativeEmojiEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub skins: Vec<Skin>,
    #[serde(default)]
    pub version: Option<f64>,
}

impl NativeEmojiEntry {
    /// The default skin. Always present for entries loaded through [`Catalog`].
    pub fn default_skin(&self) -> Option<&Skin> {
        self.skins.first()
    }
}

#[derive(Debug, Deserialize)]
struct RawCatalog {
    emojis: BTreeMap<String, NativeEmojiEntry>,
    #[serde(default)]
    aliases: BTreeMap<String, String>,
}

/// A native sequence resolved to its catalog entry and skin.
#[derive(Debug, Clone, Copy)]
pub struct NativeMatch<'a> {
    pub entry: &'a NativeEmojiEntry,
    pub skin: &'a Skin,
}

/// Immutable table of native emoji metadata.
#[derive(Debug)]
pub struct Catalog {
    entries: BTreeMap<String, NativeEmojiEntry>,
    aliases: BTreeMap<String, String>,
    /// native sequence -> (entry id, skin index)
    natives: HashMap<String, (String, usize)>,
}

impl Catalog {
    /// The catalog bundled with the build.
    ///
    /// # Panics
    /// Panics if the bundled data is malformed. That is a packaging defect,
    /// not a runtime condition.
    pub fn global() -> &'static Self {
        static CATALOG: OnceLock<Catalog> = OnceLock::new();
        CATALOG.get_or_init(|| {
            let _scope = crate::perf::scope("catalog.load_bundled");
            match Self::from_json(BUNDLED_CATALOG) {
                Ok(catalog) => catalog,
                Err(err) => panic!("bundled emoji catalog is invalid: {err}"),
            }
        })
    }

    /// Load a catalog from a file in the emoji-mart data layout.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or fails validation.
    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Parse and validate catalog JSON.
    ///
    /// # Errors
    /// Returns an error if the JSON is malformed or an entry is inconsistent.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let raw: RawCatalog = serde_json::from_str(json)?;
        let mut entries = BTreeMap::new();
        let mut natives = HashMap::new();

        for (key, mut entry) in raw.emojis {
            if key != entry.id {
                return Err(CatalogError::KeyMismatch { id: entry.id, key });
            }
            if entry.skins.is_empty() {
                return Err(CatalogError::NoSkins(entry.id));
            }
            for (index, skin) in entry.skins.iter_mut().enumerate() {
                let Some(unified) = canonical_unified(&skin.unified) else {
                    return Err(CatalogError::InvalidUnified {
                        id: entry.id.clone(),
                        unified: skin.unified.clone(),
                    });
                };
                if unified != unified_for(&skin.native) {
                    return Err(CatalogError::NativeMismatch {
                        id: entry.id.clone(),
                        unified: skin.unified.clone(),
                    });
                }
                skin.unified = unified;
                natives
                    .entry(skin.native.clone())
                    .or_insert_with(|| (entry.id.clone(), index));
            }
            entries.insert(key, entry);
        }

        for (alias, target) in &raw.aliases {
            if !entries.contains_key(target) {
                return Err(CatalogError::DanglingAlias {
                    alias: alias.clone(),
                    target: target.clone(),
                });
            }
        }

        tracing::debug!(
            entries = entries.len(),
            aliases = raw.aliases.len(),
            sequences = natives.len(),
            "loaded emoji catalog"
        );

        Ok(Self {
            entries,
            aliases: raw.aliases,
            natives,
        })
    }

    pub fn lookup_by_id(&self, id: &str) -> Option<&NativeEmojiEntry> {
        self.entries.get(id)
    }

    /// Resolve a bare shortcode (no colons), following aliases.
    pub fn resolve_shortcode(&self, name: &str) -> Option<&NativeEmojiEntry> {
        self.entries.get(name).or_else(|| {
            self.aliases
                .get(name)
                .and_then(|target| self.entries.get(target))
        })
    }

    /// Find the entry whose default or skin-tone variant is exactly `sequence`.
    pub fn lookup_native(&self, sequence: &str) -> Option<NativeMatch<'_>> {
        let (id, index) = self.natives.get(sequence)?;
        let entry = self.entries.get(id)?;
        let skin = entry.skins.get(*index)?;
        Some(NativeMatch { entry, skin })
    }

    /// All entries in id order.
    pub fn entries(&self) -> impl Iterator<Item = &NativeEmojiEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Unified code for a literal sequence: lowercase hex codepoints joined by `-`.
pub fn unified_for(native: &str) -> String {
    native
        .chars()
        .map(|c| format!("{:x}", u32::from(c)))
        .collect::<Vec<_>>()
        .join("-")
}

/// Canonicalize a unified code as found in data files (`1F3F4-E0067`,
/// `U+0023-FE0F-20E3`, ...). Returns `None` if any part is not a codepoint.
pub fn canonical_unified(unified: &str) -> Option<String> {
    let parts = unified
        .split('-')
        .map(|part| {
            let hex = part
                .strip_prefix("U+")
                .or_else(|| part.strip_prefix("u+"))
                .unwrap_or(part);
            let value = u32::from_str_radix(hex, 16).ok()?;
            char::from_u32(value).map(|c| format!("{:x}", u32::from(c)))
        })
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join("-"))
}
