//! Genre classification
//!
//! Servers report genres as free text: comma-joined lists, inconsistent
//! spelling, diacritics, `&` vs `and`. The classifier turns those strings into
//! stable normalized keys and maps each key onto a small fixed set of umbrella
//! categories used for browsing.
//!
//! ```
//! use core_library::genre::classify_genres;
//!
//! let genres = classify_genres(&["Drum & Bass, Liquid Funk", "Música Electrónica"]);
//! assert_eq!(genres.normalized, vec!["drum and bass", "liquid funk", "musica electronica"]);
//! assert_eq!(genres.umbrella, vec!["Electronic"]);
//! ```

mod table;

use std::collections::HashSet;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

pub use table::UMBRELLA_GENRES;

/// Display name of the synthetic genre and umbrella for untagged tracks
pub const UNKNOWN: &str = "Unknown";

/// Normalized key of [`UNKNOWN`]
pub const UNKNOWN_KEY: &str = "unknown";

/// Separators that join several genres into one server-side string
const GENRE_SEPARATORS: [char; 3] = [',', ';', '/'];

/// Genre lists derived from one track's raw genre strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenreClassification {
    /// Split and trimmed display strings
    pub raw: Vec<String>,
    /// Distinct normalized keys in first-seen order
    pub normalized: Vec<String>,
    /// Distinct umbrella categories in first-seen order
    pub umbrella: Vec<String>,
}

impl GenreClassification {
    fn unknown() -> Self {
        Self {
            raw: vec![UNKNOWN.to_string()],
            normalized: vec![UNKNOWN_KEY.to_string()],
            umbrella: vec![UNKNOWN.to_string()],
        }
    }
}

/// Flatten comma-joined entries into individual trimmed genre strings.
///
/// Empty fragments are dropped and exact duplicates removed; order of first
/// appearance is kept.
pub fn split_genres<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for entry in raw {
        for part in entry.as_ref().split(GENRE_SEPARATORS) {
            let part = part.trim();
            if !part.is_empty() && seen.insert(part) {
                out.push(part.to_string());
            }
        }
    }

    out
}

/// Canonical key for one genre string.
///
/// Lowercases, rewrites `&`, `+` and `'n'` to `and`, folds diacritics, drops
/// bracketed qualifiers such as `(live)`, turns `-`, `.` and `_` into spaces,
/// strips trailing punctuation and collapses whitespace. Applying it twice
/// gives the same result as applying it once.
pub fn normalize(genre: &str) -> String {
    let lowered = genre
        .to_lowercase()
        .replace(['\u{2019}', '\u{2018}', '`'], "'")
        .replace("'n'", " and ")
        .replace(['&', '+'], " and ");

    let folded: String = lowered.nfd().filter(|c| !is_combining_mark(*c)).collect();

    let mut unbracketed = String::with_capacity(folded.len());
    let mut depth = 0usize;
    for ch in folded.chars() {
        match ch {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            '-' | '.' | '_' if depth == 0 => unbracketed.push(' '),
            _ if depth == 0 => unbracketed.push(ch),
            _ => {}
        }
    }

    let collapsed = unbracketed.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_end_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace())
        .to_string()
}

/// Umbrella category for a normalized key, or [`UNKNOWN`] when unmapped.
pub fn resolve(normalized: &str) -> &'static str {
    table::UMBRELLA_INDEX
        .get(normalized)
        .copied()
        .unwrap_or(UNKNOWN)
}

/// `(display, key)` pairs for every distinct key, keeping the first spelling seen.
pub fn genre_entries<S: AsRef<str>>(raw: &[S]) -> Vec<(String, String)> {
    let mut seen = HashSet::new();
    split_genres(raw)
        .into_iter()
        .filter_map(|display| {
            let key = normalize(&display);
            if key.is_empty() || !seen.insert(key.clone()) {
                return None;
            }
            Some((display, key))
        })
        .collect()
}

/// Split, normalize and resolve a track's raw genre strings.
///
/// A track with no usable genre is classified as [`UNKNOWN`] in all three lists.
pub fn classify_genres<S: AsRef<str>>(raw: &[S]) -> GenreClassification {
    let entries = genre_entries(raw);
    if entries.is_empty() {
        return GenreClassification::unknown();
    }

    let mut classification = GenreClassification {
        raw: split_genres(raw),
        normalized: Vec::with_capacity(entries.len()),
        umbrella: Vec::new(),
    };

    for (_, key) in entries {
        let umbrella = resolve(&key);
        if !classification.umbrella.iter().any(|u| u == umbrella) {
            classification.umbrella.push(umbrella.to_string());
        }
        classification.normalized.push(key);
    }

    classification
}
