//! Keyword-based batch themes

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Theme {
    Installation,
    Configuration,
    #[serde(rename = "API Reference")]
    ApiReference,
    Tutorial,
    Testing,
}

/// Themes in detection order with their keywords
const VOCABULARY: [(Theme, &[&str]); 5] = [
    (Theme::Installation, &["install", "setup", "requirement", "pip", "npm"]),
    (Theme::Configuration, &["config", "setting", "option", "parameter"]),
    (Theme::ApiReference, &["api", "function", "method", "class", "return"]),
    (Theme::Tutorial, &["example", "step", "first", "create", "build"]),
    (Theme::Testing, &["test", "assert", "expect", "mock", "fixture"]),
];

/// Distinct keywords that must occur before a theme is assigned
const MIN_KEYWORD_HITS: usize = 2;

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Installation => "Installation",
            Theme::Configuration => "Configuration",
            Theme::ApiReference => "API Reference",
            Theme::Tutorial => "Tutorial",
            Theme::Testing => "Testing",
        }
    }

    /// First theme with at least two distinct keywords in `texts`
    ///
    /// Keywords match as lowercase substrings, so `installation` counts for
    /// `install` and `configure` for `config`.
    pub fn detect<'a>(texts: impl IntoIterator<Item = &'a str>) -> Option<Theme> {
        let content = texts
            .into_iter()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(" ");

        VOCABULARY.iter().find_map(|(theme, keywords)| {
            let hits = keywords.iter().filter(|kw| content.contains(**kw)).count();
            (hits >= MIN_KEYWORD_HITS).then_some(*theme)
        })
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_hits_required() {
        assert_eq!(Theme::detect(["Run pip to install it."]), Some(Theme::Installation));
        assert_eq!(Theme::detect(["Run pip."]), None);
    }

    #[test]
    fn test_hits_across_texts() {
        let texts = ["Each method", "may return a value"];
        assert_eq!(Theme::detect(texts), Some(Theme::ApiReference));
    }

    #[test]
    fn test_first_theme_wins() {
        // matches both installation and testing
        let texts = ["Setup with npm, then assert and mock"];
        assert_eq!(Theme::detect(texts), Some(Theme::Installation));
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(Theme::detect(["CONFIG OPTION"]), Some(Theme::Configuration));
    }

    #[test]
    fn test_serializes_display_name() {
        assert_eq!(
            serde_json::to_string(&Theme::ApiReference).unwrap(),
            "\"API Reference\""
        );
    }
}
