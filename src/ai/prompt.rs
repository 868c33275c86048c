use std::fmt::Write;

use super::Mode;
use crate::config::{ControlSettings, CustomPromptSelect};

const PREAMBLE: &str = "Act as an expert metadata generator specializing in stock media requirements.
Analyze this image.
IMPORTANT: If the subject is isolated, assume it's on a white or transparent background. Never describe the background as black or dark, and avoid similar phrasing.
";

const CAPTION_JSON: &str = "Provide JSON object with only 'description'.";
const METADATA_JSON: &str = "Provide JSON object with 'title', 'description', 'keywords', and 'category'.";

/// Build the instruction text sent to the model alongside the image.
///
/// Custom prompts win when their switch is on and their text is non-empty
/// after trimming: `prompt_switches.custom_prompt` with
/// `custom_prompt_entry_prompt` in caption mode, `CustomPromptSelect::SetCustom`
/// with `custom_prompt_entry` in metadata mode. Otherwise the stock template is
/// filled with the exact targets from `settings`.
///
/// # Example
///
/// ```rust
/// use stock_meta_ai::ai::{Mode, build_prompt};
/// use stock_meta_ai::config::ControlSettings;
///
/// let settings = ControlSettings { desc_words: 25, ..Default::default() };
/// let prompt = build_prompt(&settings, Mode::Caption);
/// assert!(prompt.contains("EXACTLY 25 words"));
/// ```
pub fn build_prompt(settings: &ControlSettings, mode: Mode) -> String {
    match mode {
        Mode::Caption => {
            let custom = settings.custom_prompt_entry_prompt.trim();
            if settings.prompt_switches.custom_prompt && !custom.is_empty() {
                return custom_prompt(custom, CAPTION_JSON);
            }
            caption_prompt(settings)
        }
        Mode::Metadata => {
            let custom = settings.custom_prompt_entry.trim();
            if settings.custom_prompt_select == CustomPromptSelect::SetCustom && !custom.is_empty() {
                return custom_prompt(
                    custom,
                    "Provide JSON object with 'title', 'description', 'keywords', and a relevant 'category'.",
                );
            }
            metadata_prompt(settings)
        }
    }
}

fn custom_prompt(instructions: &str, json_request: &str) -> String {
    format!("Analyze this image based on the following instructions:\n{instructions}\n\n{json_request}")
}

fn caption_prompt(settings: &ControlSettings) -> String {
    let switches = &settings.prompt_switches;
    let mut prompt = String::from(PREAMBLE);

    prompt.push_str("Generate only a compelling description.\n");
    let _ = writeln!(
        prompt,
        "Target Description Length: MUST BE EXACTLY {} words. Provide the exact word count requested.",
        settings.desc_words
    );
    if switches.silhouette {
        prompt.push_str("Style: Silhouette. Emphasize this.\n");
    }
    if switches.white_bg {
        prompt.push_str("Background: Plain white. Mention 'white background', 'isolated'.\n");
    }
    if switches.transparent_bg {
        prompt.push_str("Background: Transparent. Mention 'transparent background', 'isolated'.\n");
    }
    prompt.push_str("Focus on facts and concepts, avoiding subjective words (e.g., beautiful, amazing).\n\n");
    prompt.push_str(CAPTION_JSON);
    prompt
}

fn metadata_prompt(settings: &ControlSettings) -> String {
    let mut prompt = String::from(PREAMBLE);

    prompt.push_str("Generate Title, Description, Keywords, and Category for stock media sites.\n");
    let _ = writeln!(
        prompt,
        "Title: MUST BE EXACTLY {} characters long. Provide the exact character count requested. Be descriptive, accurate, concise.",
        settings.title_length
    );
    let _ = writeln!(
        prompt,
        "Description: MUST BE EXACTLY {} characters long. Provide the exact character count requested. Be informative.",
        settings.desc_length
    );
    let _ = writeln!(
        prompt,
        "Keywords: MUST BE EXACTLY {} keywords. Provide the exact number of keywords requested. Order by importance (most relevant first), include conceptual keywords.",
        settings.keywords_count
    );
    prompt.push_str("Category: Select the single most relevant category (e.g., Nature, Business, People, Technology, Food, Abstract).\n");
    prompt.push_str("Rules: Keywords must be relevant and specific. Avoid spamming, subjective words (beautiful, amazing), plurals if singular exists, technical details unless essential. Capitalize only the first letter of the Title.\n\n");
    prompt.push_str(METADATA_JSON);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PromptSwitches;

    fn settings() -> ControlSettings {
        ControlSettings {
            title_length: 73,
            desc_length: 181,
            keywords_count: 37,
            desc_words: 29,
            ..Default::default()
        }
    }

    // ── caption mode ─────────────────────────────────────────────────

    #[test]
    fn caption_contains_word_count() {
        let prompt = build_prompt(&settings(), Mode::Caption);
        assert!(prompt.contains("EXACTLY 29 words"));
        assert!(prompt.ends_with("Provide JSON object with only 'description'."));
    }

    #[test]
    fn caption_never_mentions_dark_background() {
        let mut s = settings();
        for (silhouette, white_bg, transparent_bg) in
            [(false, false, false), (true, false, false), (true, true, true)]
        {
            s.prompt_switches = PromptSwitches {
                custom_prompt: false,
                silhouette,
                white_bg,
                transparent_bg,
            };
            let prompt = build_prompt(&s, Mode::Caption).to_lowercase();
            assert!(!prompt.contains("dark background"));
            assert!(!prompt.contains("black background"));
        }
    }

    #[test]
    fn caption_style_switches() {
        let mut s = settings();
        let plain = build_prompt(&s, Mode::Caption);
        assert!(!plain.contains("Silhouette"));
        assert!(!plain.contains("Plain white"));
        assert!(!plain.contains("Transparent."));

        s.prompt_switches.silhouette = true;
        s.prompt_switches.transparent_bg = true;
        let styled = build_prompt(&s, Mode::Caption);
        assert!(styled.contains("Style: Silhouette."));
        assert!(styled.contains("Background: Transparent."));
        assert!(!styled.contains("Plain white"));
    }

    #[test]
    fn caption_custom_prompt() {
        let mut s = settings();
        s.custom_prompt_entry_prompt = "a red bike".into();
        s.prompt_switches.custom_prompt = true;

        let prompt = build_prompt(&s, Mode::Caption);
        assert!(prompt.contains("\na red bike\n"));
        assert!(prompt.contains("only 'description'"));
        assert!(!prompt.contains("'title'"));
        assert!(!prompt.contains("EXACTLY"));
    }

    #[test]
    fn caption_custom_prompt_is_trimmed() {
        let mut s = settings();
        s.custom_prompt_entry_prompt = "   a red bike \n".into();
        s.prompt_switches.custom_prompt = true;
        let prompt = build_prompt(&s, Mode::Caption);
        assert!(prompt.contains("instructions:\na red bike\n\n"));
    }

    #[test]
    fn caption_custom_prompt_needs_switch_and_text() {
        let mut s = settings();
        s.custom_prompt_entry_prompt = "a red bike".into();
        assert!(!build_prompt(&s, Mode::Caption).contains("a red bike"));

        s.custom_prompt_entry_prompt = "   ".into();
        s.prompt_switches.custom_prompt = true;
        assert!(build_prompt(&s, Mode::Caption).contains("EXACTLY 29 words"));
    }

    // ── metadata mode ────────────────────────────────────────────────

    #[test]
    fn metadata_contains_all_targets() {
        let prompt = build_prompt(&settings(), Mode::Metadata);
        assert!(prompt.contains("EXACTLY 73 characters"));
        assert!(prompt.contains("EXACTLY 181 characters"));
        assert!(prompt.contains("EXACTLY 37 keywords"));
        assert!(prompt.contains("'title', 'description', 'keywords', and 'category'"));
        assert!(prompt.contains("Capitalize only the first letter of the Title"));
    }

    #[test]
    fn metadata_custom_prompt() {
        let mut s = settings();
        s.custom_prompt_select = CustomPromptSelect::SetCustom;
        s.custom_prompt_entry = " focus on the vintage look ".into();

        let prompt = build_prompt(&s, Mode::Metadata);
        assert!(prompt.starts_with("Analyze this image based on the following instructions:\nfocus on the vintage look\n"));
        assert!(prompt.contains("'keywords', and a relevant 'category'"));
        assert!(!prompt.contains("EXACTLY"));
    }

    #[test]
    fn metadata_ignores_caption_custom_prompt() {
        let mut s = settings();
        s.custom_prompt_entry_prompt = "a red bike".into();
        s.prompt_switches.custom_prompt = true;
        let prompt = build_prompt(&s, Mode::Metadata);
        assert!(!prompt.contains("a red bike"));
        assert!(prompt.contains("EXACTLY 37 keywords"));
    }

    #[test]
    fn metadata_custom_select_with_empty_text_uses_template() {
        let mut s = settings();
        s.custom_prompt_select = CustomPromptSelect::SetCustom;
        let prompt = build_prompt(&s, Mode::Metadata);
        assert!(prompt.contains("EXACTLY 73 characters"));
    }

    #[test]
    fn shared_preamble_in_both_modes() {
        for mode in [Mode::Metadata, Mode::Caption] {
            let prompt = build_prompt(&settings(), mode);
            assert!(prompt.starts_with("Act as an expert metadata generator"));
            assert!(prompt.contains("white or transparent background"));
        }
    }
}
