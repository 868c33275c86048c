//! Deterministic post-processing of stock metadata returned by the model.
//!
//! Titles get sentence casing plus the phrases of the enabled
//! [`AdvanceTitle`] toggles; keywords are cleaned, forced to contain those
//! phrases, de-duplicated and capped at `keywords_count`.

use std::collections::HashSet;

use crate::ai::MetadataResult;
use crate::config::{AdvanceTitle, ControlSettings};

pub const TRANSPARENT_BG_PHRASE: &str = "isolated on transparent background";
pub const WHITE_BG_PHRASE: &str = "isolated on white background";
pub const VECTOR_PHRASE: &str = "Vector";
pub const ILLUSTRATION_PHRASE: &str = "illustration";

/// Phrases of the enabled toggles, in their fixed order.
pub fn decoration_phrases(toggles: &AdvanceTitle) -> Vec<&'static str> {
    [
        (toggles.transparent_bg, TRANSPARENT_BG_PHRASE),
        (toggles.white_bg, WHITE_BG_PHRASE),
        (toggles.vector, VECTOR_PHRASE),
        (toggles.illustration, ILLUSTRATION_PHRASE),
    ]
    .into_iter()
    .filter_map(|(enabled, phrase)| enabled.then_some(phrase))
    .collect()
}

/// Apply title and keyword rules to a freshly parsed metadata result.
///
/// Running it again on its own output with the same settings is a no-op.
///
/// # Example
///
/// ```rust
/// use stock_meta_ai::ai::MetadataResult;
/// use stock_meta_ai::config::{AdvanceTitle, ControlSettings};
/// use stock_meta_ai::normalize::normalize_metadata;
///
/// let settings = ControlSettings {
///     keywords_count: 3,
///     advance_title: AdvanceTitle { white_bg: true, ..Default::default() },
///     ..Default::default()
/// };
/// let raw = MetadataResult {
///     title: "red BIKE".into(),
///     keywords: vec!["Bike".into(), "bike".into(), " Red ".into(), "".into()],
///     ..Default::default()
/// };
///
/// let out = normalize_metadata(raw, &settings);
/// assert_eq!(out.title, "Red bike isolated on white background");
/// assert_eq!(out.keywords, ["bike", "red", "isolated on white background"]);
/// ```
pub fn normalize_metadata(mut metadata: MetadataResult, settings: &ControlSettings) -> MetadataResult {
    let phrases = decoration_phrases(&settings.advance_title);

    metadata.title = decorate_title(&metadata.title, &phrases);
    metadata.keywords = normalize_keywords(metadata.keywords, &phrases, settings.keywords_count);
    metadata
}

fn decorate_title(title: &str, phrases: &[&str]) -> String {
    if phrases.is_empty() {
        return sentence_case(title);
    }

    let suffix = format!(" {}", phrases.join(", "));
    let base = strip_suffix_ignore_ascii_case(title, &suffix).unwrap_or(title);
    format!("{}{suffix}", sentence_case(base))
}

/// Uppercase the first character and lowercase everything after it.
fn sentence_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

fn strip_suffix_ignore_ascii_case<'a>(s: &'a str, suffix: &str) -> Option<&'a str> {
    let cut = s.len().checked_sub(suffix.len())?;
    if !s.is_char_boundary(cut) {
        return None;
    }
    let (head, tail) = s.split_at(cut);
    tail.eq_ignore_ascii_case(suffix).then_some(head)
}

fn normalize_keywords(keywords: Vec<String>, phrases: &[&str], limit: usize) -> Vec<String> {
    let mut combined: Vec<String> = keywords
        .iter()
        .map(|kw| kw.trim().to_lowercase())
        .filter(|kw| !kw.is_empty())
        .collect();

    for phrase in phrases {
        let phrase = phrase.to_lowercase();
        if !combined.contains(&phrase) {
            combined.push(phrase);
        }
    }

    let mut seen = HashSet::new();
    combined
        .into_iter()
        .filter(|kw| seen.insert(kw.clone()))
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(advance_title: AdvanceTitle, keywords_count: usize) -> ControlSettings {
        ControlSettings {
            advance_title,
            keywords_count,
            ..Default::default()
        }
    }

    fn metadata(title: &str, keywords: &[&str]) -> MetadataResult {
        MetadataResult {
            title: title.into(),
            description: "A red bicycle.".into(),
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            category: "Transport".into(),
        }
    }

    const WHITE: AdvanceTitle = AdvanceTitle {
        transparent_bg: false,
        white_bg: true,
        vector: false,
        illustration: false,
    };

    const ALL: AdvanceTitle = AdvanceTitle {
        transparent_bg: true,
        white_bg: true,
        vector: true,
        illustration: true,
    };

    // ── title ────────────────────────────────────────────────────────

    #[test]
    fn title_with_white_background() {
        let out = normalize_metadata(metadata("red BIKE", &[]), &settings(WHITE, 10));
        assert_eq!(out.title, "Red bike isolated on white background");
    }

    #[test]
    fn title_without_toggles_is_only_recased() {
        let out = normalize_metadata(metadata("rED Bike On GRASS", &[]), &settings(AdvanceTitle::default(), 10));
        assert_eq!(out.title, "Red bike on grass");
    }

    #[test]
    fn title_all_toggles_in_fixed_order() {
        let out = normalize_metadata(metadata("flower", &[]), &settings(ALL, 10));
        assert_eq!(
            out.title,
            "Flower isolated on transparent background, isolated on white background, Vector, illustration"
        );
    }

    #[test]
    fn empty_title_still_decorated() {
        let out = normalize_metadata(metadata("", &[]), &settings(WHITE, 10));
        assert_eq!(out.title, " isolated on white background");
        let out = normalize_metadata(metadata("", &[]), &settings(AdvanceTitle::default(), 10));
        assert_eq!(out.title, "");
    }

    #[test]
    fn non_ascii_title() {
        let out = normalize_metadata(metadata("éCLAIR AU CHOCOLAT", &[]), &settings(AdvanceTitle::default(), 10));
        assert_eq!(out.title, "Éclair au chocolat");
    }

    // ── keywords ─────────────────────────────────────────────────────

    #[test]
    fn keywords_cleaned_deduped_and_capped() {
        let out = normalize_metadata(metadata("x", &["Bike", "bike", " Red ", ""]), &settings(WHITE, 3));
        assert_eq!(out.keywords, ["bike", "red", "isolated on white background"]);
    }

    #[test]
    fn decoration_keywords_lowercased_and_not_duplicated() {
        let out = normalize_metadata(
            metadata("x", &["Vector", "ISOLATED ON WHITE BACKGROUND", "art"]),
            &settings(ALL, 10),
        );
        assert_eq!(
            out.keywords,
            [
                "vector",
                "isolated on white background",
                "art",
                "isolated on transparent background",
                "illustration"
            ]
        );
    }

    #[test]
    fn small_cap_drops_decoration_keywords() {
        let out = normalize_metadata(metadata("x", &["bike", "red"]), &settings(ALL, 3));
        assert_eq!(out.keywords, ["bike", "red", "isolated on transparent background"]);
    }

    #[test]
    fn zero_cap_yields_no_keywords() {
        let out = normalize_metadata(metadata("x", &["bike"]), &settings(WHITE, 0));
        assert!(out.keywords.is_empty());
    }

    #[test]
    fn description_and_category_untouched() {
        let out = normalize_metadata(metadata("x", &[]), &settings(ALL, 5));
        assert_eq!(out.description, "A red bicycle.");
        assert_eq!(out.category, "Transport");
    }

    // ── idempotence ──────────────────────────────────────────────────

    #[test]
    fn normalizing_twice_is_stable() {
        for toggles in [AdvanceTitle::default(), WHITE, ALL] {
            let s = settings(toggles, 4);
            let once = normalize_metadata(
                metadata("BIG red Bike", &["Bike", "wheel", "bike", " Red ", "spoke", "frame"]),
                &s,
            );
            let twice = normalize_metadata(once.clone(), &s);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn decoration_phrases_order() {
        assert!(decoration_phrases(&AdvanceTitle::default()).is_empty());
        assert_eq!(
            decoration_phrases(&AdvanceTitle { vector: true, transparent_bg: true, ..Default::default() }),
            [TRANSPARENT_BG_PHRASE, VECTOR_PHRASE]
        );
    }
}
