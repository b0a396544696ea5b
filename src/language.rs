//! Language code and language-directory helpers
//!
//! Documentation trees keep one directory per language (`docs/en/...`,
//! `docs/ja/...`). Cost estimation only cares about the base language, and
//! the matcher needs to compare file paths with the language segment removed.

use crate::error::{DocDiffError, DocDiffResult};
use icu_locale::Locale;
use std::path::{Path, PathBuf};

/// Normalize a language code to its base language subtag
///
/// Uses ICU locale parsing so that script and region subtags are dropped:
/// - `en-US` → `en`
/// - `zh-Hans` → `zh`
/// - `ja` → `ja`
///
/// Codes ICU cannot parse (e.g. `de_DE`) fall back to everything before the
/// first `-` or `_`, lowercased.
///
/// # Example
///
/// ```ignore
/// assert_eq!(normalize_language("en-US"), "en");
/// assert_eq!(normalize_language("zh-Hans"), "zh");
/// ```
pub fn normalize_language(code: &str) -> String {
    match code.parse::<Locale>() {
        Ok(locale) => locale.id.language.as_str().to_string(),
        Err(_) => code
            .split(['-', '_'])
            .next()
            .unwrap_or(code)
            .to_lowercase(),
    }
}

/// Validate that a language code is in acceptable format
///
/// Accepts ASCII alphanumerics, hyphens and underscores only.
///
/// # Example
///
/// ```ignore
/// validate_language("en")?; // OK
/// validate_language("pt_BR")?; // OK
/// validate_language("en@US").unwrap_err();
/// ```
pub fn validate_language(code: &str) -> DocDiffResult<()> {
    if code.is_empty() {
        return Err(DocDiffError::InvalidLanguage(
            "Language code is empty".to_string(),
        ));
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(DocDiffError::InvalidLanguage(format!(
            "Invalid characters in language code: {}",
            code
        )));
    }

    Ok(())
}

/// Strip the leading `<root>/<language>/` segments from a document path
///
/// `docs/en/guide/index.md` → `guide/index.md`. Paths with two or fewer
/// components reduce to their file name, so `en/index.md` → `index.md`.
pub fn strip_language_segment(path: &Path) -> PathBuf {
    let components: Vec<_> = path.components().collect();
    if components.len() > 2 {
        components[2..].iter().collect()
    } else {
        path.file_name().map(PathBuf::from).unwrap_or_default()
    }
}

/// Whether two document paths name the same file in different language trees
pub fn are_corresponding_files(source: &Path, target: &Path) -> bool {
    if source.as_os_str().is_empty() || target.as_os_str().is_empty() {
        return false;
    }
    strip_language_segment(source) == strip_language_segment(target)
}
