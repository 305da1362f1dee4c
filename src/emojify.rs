//! Emoji substitution for HTML-bearing text.
//!
//! A single pass over the input alternates between two modes:
//! - **Tag mode**: from `<` up to the matching unquoted `>`. Copied verbatim.
//! - **Text mode**: everything else. `:shortcode:` runs and literal Unicode
//!   emoji sequences are replaced by inline `<img>` markup.
//!
//! Literal matching works on one extended grapheme cluster at a time and
//! picks the longest codepoint prefix of that cluster the catalog knows.
//! Whatever is not recognised is copied through unchanged.

use std::borrow::Cow;
use std::sync::OnceLock;

use unicode_segmentation::UnicodeSegmentation;

use crate::catalog::{Catalog, NativeMatch};
use crate::custom::CustomEmojiMap;

/// Where emoji artwork is served from.
pub const DEFAULT_ASSET_BASE: &str = "/packs/emoji";

const TEXT_PRESENTATION: char = '\u{FE0E}';
const EMOJI_PRESENTATION: char = '\u{FE0F}';

/// Copyright, registered and trade mark signs are ordinary text unless
/// followed by an emoji presentation selector.
const TEXT_SYMBOLS: [char; 3] = ['\u{A9}', '\u{AE}', '\u{2122}'];

/// Fediverse servers wrap the elided part of long links in this span.
const INVISIBLE_SPAN: &str = "<span class=\"invisible\">";

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Whether `c` may appear between the colons of a shortcode.
///
/// Shared with shortcode autocompletion, which must agree on the grammar.
pub const fn valid_emoji_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')
}

/// Maps a unified code (`1f44c`, `1f469-200d-1f469-200d-1f466`) to an image URL.
pub trait AssetResolver {
    fn resolve(&self, unified: &str) -> String;
}

impl<F> AssetResolver for F
where
    F: Fn(&str) -> String,
{
    fn resolve(&self, unified: &str) -> String {
        self(unified)
    }
}

/// Resolves to `<base>/<unified>.svg`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackAssetResolver {
    base: String,
}

impl PackAssetResolver {
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }
}

impl Default for PackAssetResolver {
    fn default() -> Self {
        Self::new(DEFAULT_ASSET_BASE)
    }
}

impl AssetResolver for PackAssetResolver {
    fn resolve(&self, unified: &str) -> String {
        format!("{}/{unified}.svg", self.base)
    }
}

/// Replaces emoji in text with inline image markup.
pub struct Emojifier<'a> {
    catalog: &'a Catalog,
    resolver: Box<dyn AssetResolver + Send + Sync>,
}

impl std::fmt::Debug for Emojifier<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emojifier")
            .field("catalog_len", &self.catalog.len())
            .finish_non_exhaustive()
    }
}

/// A literal sequence matched at the scan position.
struct LiteralMatch<'a> {
    found: NativeMatch<'a>,
    alt: String,
    len: usize,
}

impl<'a> Emojifier<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self {
            catalog,
            resolver: Box::new(PackAssetResolver::default()),
        }
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: impl AssetResolver + Send + Sync + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    /// Substitute native emoji only.
    pub fn emojify(&self, text: &str) -> String {
        self.emojify_with_custom(text, &CustomEmojiMap::default())
    }

    /// Substitute native emoji and the supplied custom shortcodes.
    /// Custom shortcodes shadow native ones of the same name.
    pub fn emojify_with_custom(&self, text: &str, custom: &CustomEmojiMap) -> String {
        let mut out = String::with_capacity(text.len());
        let mut pos = 0;
        let mut invisible_depth = 0usize;

        while let Some(c) = text[pos..].chars().next() {
            let rest = &text[pos..];

            if c == '<' {
                let Some(end) = tag_end(rest) else {
                    // Unclosed tag: nothing after it is safe to touch.
                    out.push_str(rest);
                    break;
                };
                let tag = &rest[..end];
                invisible_depth = next_invisible_depth(invisible_depth, tag);
                out.push_str(tag);
                pos += end;
                continue;
            }

            if invisible_depth == 0 {
                if c == ':' {
                    if let Some((len, html)) = self.match_shortcode(rest, custom) {
                        out.push_str(&html);
                        pos += len;
                        continue;
                    }
                } else if may_start_emoji(c) {
                    if let Some(found) = self.match_literal(rest) {
                        out.push_str(&self.native_img(&found.alt, found.found));
                        pos += found.len;
                        continue;
                    }
                }
            }

            out.push(c);
            pos += c.len_utf8();
        }

        out
    }

    /// `rest` starts with `:`. Returns the consumed length and the markup.
    fn match_shortcode(&self, rest: &str, custom: &CustomEmojiMap) -> Option<(usize, String)> {
        let body = &rest[1..];
        let name_len = body.find(|c| !valid_emoji_char(c)).unwrap_or(body.len());
        if name_len == 0 || !body[name_len..].starts_with(':') {
            return None;
        }
        let name = &body[..name_len];
        let consumed = name_len + 2;

        if let Some(emoji) = custom.get(name) {
            return Some((consumed, custom_img(name, &emoji.static_url)));
        }

        let entry = self.catalog.resolve_shortcode(name)?;
        let skin = entry.default_skin()?;
        let found = NativeMatch { entry, skin };
        Some((consumed, self.native_img(&skin.native, found)))
    }

    fn match_literal(&self, rest: &str) -> Option<LiteralMatch<'a>> {
        let grapheme = rest.graphemes(true).next()?;
        if grapheme.starts_with(TEXT_SYMBOLS) && !grapheme.contains(EMOJI_PRESENTATION) {
            return None;
        }

        // Prefix ends in bytes, longest first.
        let mut ends: Vec<usize> = grapheme.char_indices().map(|(i, _)| i).skip(1).collect();
        ends.push(grapheme.len());

        ends.into_iter().rev().find_map(|end| {
            let (found, alt) = self.resolve_sequence(&grapheme[..end])?;
            let mut alt = alt.into_owned();
            let mut len = end;
            if rest[len..].starts_with(TEXT_PRESENTATION) {
                len += TEXT_PRESENTATION.len_utf8();
                if !alt.ends_with(EMOJI_PRESENTATION) {
                    alt.push(EMOJI_PRESENTATION);
                }
            }
            Some(LiteralMatch { found, alt, len })
        })
    }

    /// Look a candidate up as written, with text presentation selectors
    /// swapped for emoji presentation, and with an emoji presentation
    /// selector appended (unqualified form). Returns the match and its alt.
    fn resolve_sequence<'s>(
        &self,
        candidate: &'s str,
    ) -> Option<(NativeMatch<'a>, Cow<'s, str>)> {
        if let Some(found) = self.catalog.lookup_native(candidate) {
            return Some((found, Cow::Borrowed(candidate)));
        }
        if candidate.contains(TEXT_PRESENTATION) {
            let normalized: String = candidate
                .chars()
                .map(|c| {
                    if c == TEXT_PRESENTATION {
                        EMOJI_PRESENTATION
                    } else {
                        c
                    }
                })
                .collect();
            if let Some(found) = self.catalog.lookup_native(&normalized) {
                return Some((found, Cow::Owned(normalized)));
            }
        }
        if !candidate.ends_with(EMOJI_PRESENTATION) {
            let qualified = format!("{candidate}{EMOJI_PRESENTATION}");
            if let Some(found) = self.catalog.lookup_native(&qualified) {
                return Some((found, Cow::Borrowed(candidate)));
            }
        }
        None
    }

    fn native_img(&self, alt: &str, found: NativeMatch<'_>) -> String {
        format!(
            r#"<img draggable="false" class="emojione" alt="{alt}" title=":{}:" src="{}" />"#,
            escape_attr(&found.entry.id),
            escape_attr(&self.resolver.resolve(&found.skin.unified)),
        )
    }
}

fn custom_img(shortcode: &str, src: &str) -> String {
    let shortcode = escape_attr(shortcode);
    format!(
        r#"<img draggable="false" class="emojione custom-emoji" alt=":{shortcode}:" title=":{shortcode}:" src="{}" />"#,
        escape_attr(src),
    )
}

/// ASCII characters other than keycap bases never begin an emoji.
fn may_start_emoji(c: char) -> bool {
    !c.is_ascii() || matches!(c, '#' | '*' | '0'..='9')
}

/// Byte length of the tag starting at `rest[0] == '<'`, including the
/// closing `>`. Quoted attribute values may contain `>`.
fn tag_end(rest: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in rest.char_indices().skip(1) {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '>') => return Some(i + 1),
            (None, _) => {}
        }
    }
    None
}

fn next_invisible_depth(depth: usize, tag: &str) -> usize {
    if depth == 0 {
        return usize::from(tag.starts_with(INVISIBLE_SPAN));
    }
    if tag.starts_with("</") {
        depth - 1
    } else if tag.ends_with("/>") || tag.starts_with("<!") || is_void_element(tag) {
        depth
    } else {
        depth + 1
    }
}

fn is_void_element(tag: &str) -> bool {
    let name: String = tag[1..]
        .chars()
        .take_while(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    VOID_ELEMENTS.contains(&name.as_str())
}

fn escape_attr(value: &str) -> Cow<'_, str> {
    if !value.contains(['&', '"', '<', '>']) {
        return Cow::Borrowed(value);
    }
    let mut escaped = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

fn default_emojifier() -> &'static Emojifier<'static> {
    static EMOJIFIER: OnceLock<Emojifier<'static>> = OnceLock::new();
    EMOJIFIER.get_or_init(|| Emojifier::new(Catalog::global()))
}

/// Substitute native emoji using the bundled catalog.
pub fn emojify(text: &str) -> String {
    default_emojifier().emojify(text)
}

/// Substitute native emoji and custom shortcodes using the bundled catalog.
pub fn emojify_with_custom(text: &str, custom: &CustomEmojiMap) -> String {
    default_emojifier().emojify_with_custom(text, custom)
}
