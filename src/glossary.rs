//! Terminology glossary
//!
//! A glossary only annotates batches and feeds quality metrics; it never
//! changes how nodes are matched or grouped.
//!
//! The file format is JSON:
//!
//! ```json
//! {
//!     "terms": [
//!         { "term": "Sphinx", "definition": "Documentation generator", "maintain_original": true },
//!         { "term": "toctree", "definition": "Table of contents tree", "aliases": ["toc tree"] }
//!     ],
//!     "rules": { "preserve_references": true }
//! }
//! ```

use crate::error::DocDiffResult;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlossaryTerm {
    pub term: String,
    #[serde(default)]
    pub definition: String,
    /// Mandated translation, if any
    #[serde(default)]
    pub translation: Option<String>,
    /// Keep the term untranslated
    #[serde(default)]
    pub maintain_original: bool,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl GlossaryTerm {
    pub fn new(term: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            definition: definition.into(),
            translation: None,
            maintain_original: false,
            aliases: Vec::new(),
            context: None,
            category: None,
        }
    }

    pub fn with_translation(mut self, translation: impl Into<String>) -> Self {
        self.translation = Some(translation.into());
        self
    }

    pub fn keep_original(mut self) -> Self {
        self.maintain_original = true;
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    fn format_line(&self) -> String {
        let mut line = format!("- {}", self.term);
        match (&self.translation, self.maintain_original) {
            (Some(t), true) => line.push_str(&format!(" → {} (keep original)", t)),
            (Some(t), false) => line.push_str(&format!(" → {}", t)),
            (None, true) => line.push_str(" (do not translate)"),
            (None, false) => {}
        }
        if !self.definition.is_empty() {
            line.push_str(&format!(" // {}", self.definition));
        }
        line
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationRules {
    #[serde(default = "default_true")]
    pub preserve_code_terms: bool,
    #[serde(default = "default_true")]
    pub translate_ui_elements: bool,
    #[serde(default = "default_true")]
    pub keep_product_names: bool,
    #[serde(default = "default_true")]
    pub maintain_formatting: bool,
    #[serde(default = "default_true")]
    pub preserve_references: bool,
}

impl Default for TranslationRules {
    fn default() -> Self {
        Self {
            preserve_code_terms: true,
            translate_ui_elements: true,
            keep_product_names: true,
            maintain_formatting: true,
            preserve_references: true,
        }
    }
}

/// Problems found when checking a translation against the glossary
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GlossaryIssues {
    /// Terms that had to stay untranslated but are absent
    pub missing_terms: Vec<String>,
    /// Terms whose mandated translation is absent
    pub incorrect_terms: Vec<String>,
}

impl GlossaryIssues {
    pub fn is_empty(&self) -> bool {
        self.missing_terms.is_empty() && self.incorrect_terms.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GlossaryStatistics {
    pub total_terms: usize,
    pub categories: usize,
    pub maintain_original: usize,
    pub has_translation: usize,
    pub total_aliases: usize,
}

#[derive(Serialize, Deserialize)]
struct GlossaryFile {
    #[serde(default)]
    terms: Vec<GlossaryTerm>,
    #[serde(default)]
    rules: TranslationRules,
}

/// Terms in insertion order with case-insensitive lookup
#[derive(Debug, Clone, Default)]
pub struct Glossary {
    terms: Vec<GlossaryTerm>,
    pub rules: TranslationRules,
    term_index: HashMap<String, usize>,
    alias_index: HashMap<String, usize>,
}

impl Glossary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a term, replacing any term with the same spelling
    pub fn add_term(&mut self, term: GlossaryTerm) {
        let key = term.term.to_lowercase();
        let position = match self.term_index.get(&key) {
            Some(&existing) => {
                self.alias_index.retain(|_, &mut position| position != existing);
                self.terms[existing] = term;
                existing
            }
            None => {
                self.terms.push(term);
                self.terms.len() - 1
            }
        };
        self.term_index.insert(key, position);
        for alias in &self.terms[position].aliases {
            self.alias_index.insert(alias.to_lowercase(), position);
        }
    }

    /// Look up a term by its spelling or one of its aliases, ignoring case
    pub fn get_term(&self, text: &str) -> Option<&GlossaryTerm> {
        let key = text.to_lowercase();
        self.term_index
            .get(&key)
            .or_else(|| self.alias_index.get(&key))
            .map(|&i| &self.terms[i])
    }

    pub fn terms(&self) -> &[GlossaryTerm] {
        &self.terms
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Terms occurring in `text`, each once, in glossary order
    ///
    /// Matching is a case-insensitive substring test against the term and
    /// each of its aliases.
    pub fn find_terms_in_text(&self, text: &str) -> Vec<&GlossaryTerm> {
        let haystack = text.to_lowercase();
        self.terms
            .iter()
            .filter(|term| {
                haystack.contains(&term.term.to_lowercase())
                    || term
                        .aliases
                        .iter()
                        .any(|alias| haystack.contains(&alias.to_lowercase()))
            })
            .collect()
    }

    /// Check that preserved and mandated terms survived translation
    pub fn validate_translation(&self, source: &str, translation: &str) -> GlossaryIssues {
        let mut issues = GlossaryIssues::default();

        for term in self.find_terms_in_text(source) {
            if term.maintain_original {
                if !translation.contains(&term.term) {
                    issues
                        .missing_terms
                        .push(format!("Term '{}' should be preserved", term.term));
                }
            } else if let Some(expected) = &term.translation {
                if !translation.contains(expected.as_str()) {
                    issues.incorrect_terms.push(format!(
                        "Term '{}' should be translated as '{}'",
                        term.term, expected
                    ));
                }
            }
        }

        issues
    }

    pub fn statistics(&self) -> GlossaryStatistics {
        let categories: BTreeSet<&str> = self
            .terms
            .iter()
            .filter_map(|t| t.category.as_deref())
            .collect();

        GlossaryStatistics {
            total_terms: self.terms.len(),
            categories: categories.len(),
            maintain_original: self.terms.iter().filter(|t| t.maintain_original).count(),
            has_translation: self.terms.iter().filter(|t| t.translation.is_some()).count(),
            total_aliases: self.terms.iter().map(|t| t.aliases.len()).sum(),
        }
    }

    /// Glossary and rules rendered as instructions for a translator
    pub fn prompt_context(&self) -> String {
        if self.terms.is_empty() {
            return "No glossary terms defined.".to_string();
        }

        let mut categorized: std::collections::BTreeMap<&str, Vec<&GlossaryTerm>> =
            std::collections::BTreeMap::new();
        let mut general: Vec<&GlossaryTerm> = Vec::new();
        for term in &self.terms {
            match term.category.as_deref() {
                Some(category) => categorized.entry(category).or_default().push(term),
                None => general.push(term),
            }
        }

        let mut lines = vec!["GLOSSARY TERMS:".to_string()];
        for (category, mut terms) in categorized {
            lines.push(format!("\n{}:", category));
            terms.sort_by(|a, b| a.term.cmp(&b.term));
            lines.extend(terms.iter().map(|t| t.format_line()));
        }
        if !general.is_empty() {
            lines.push("\nGeneral Terms:".to_string());
            general.sort_by(|a, b| a.term.cmp(&b.term));
            lines.extend(general.iter().map(|t| t.format_line()));
        }

        lines.push("\nTRANSLATION RULES:".to_string());
        let rules = [
            (self.rules.preserve_code_terms, "- Preserve all code terms exactly as written"),
            (self.rules.translate_ui_elements, "- Translate UI elements and labels"),
            (self.rules.keep_product_names, "- Keep product names unchanged"),
            (self.rules.maintain_formatting, "- Maintain all markdown formatting"),
            (self.rules.preserve_references, "- Preserve all {ref} and {term} references exactly"),
        ];
        lines.extend(
            rules
                .into_iter()
                .filter(|(enabled, _)| *enabled)
                .map(|(_, line)| line.to_string()),
        );

        lines.join("\n")
    }

    /// Load a glossary file
    ///
    /// A file that does not exist yields an empty glossary.
    ///
    /// # Errors
    /// Read errors other than a missing file, and invalid JSON.
    pub fn load_from_file(path: &Path) -> DocDiffResult<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "glossary file not found, using an empty glossary");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let file: GlossaryFile = serde_json::from_str(&content)?;

        let mut glossary = Glossary {
            rules: file.rules,
            ..Self::default()
        };
        for term in file.terms {
            glossary.add_term(term);
        }

        debug!(path = %path.display(), terms = glossary.len(), "loaded glossary");
        Ok(glossary)
    }

    /// Write the glossary as pretty-printed JSON, creating parent directories
    pub fn save_to_file(&self, path: &Path) -> DocDiffResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = GlossaryFile {
            terms: self.terms.clone(),
            rules: self.rules.clone(),
        };
        fs::write(path, serde_json::to_string_pretty(&file)?)?;
        Ok(())
    }
}
