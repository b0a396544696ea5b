//! Structural document nodes
//!
//! A [`StructuralNode`] is one typed, positioned unit of a document as
//! produced by a markup parser: a heading, a paragraph, a code block and so
//! on. Nodes are immutable once created; everything downstream works on
//! borrowed slices of them.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Section,
    Paragraph,
    CodeBlock,
    MathBlock,
    Table,
    Figure,
    Admonition,
    List,
    ListItem,
}

impl NodeKind {
    pub const ALL: [NodeKind; 9] = [
        NodeKind::Section,
        NodeKind::Paragraph,
        NodeKind::CodeBlock,
        NodeKind::MathBlock,
        NodeKind::Table,
        NodeKind::Figure,
        NodeKind::Admonition,
        NodeKind::List,
        NodeKind::ListItem,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Section => "section",
            NodeKind::Paragraph => "paragraph",
            NodeKind::CodeBlock => "code_block",
            NodeKind::MathBlock => "math_block",
            NodeKind::Table => "table",
            NodeKind::Figure => "figure",
            NodeKind::Admonition => "admonition",
            NodeKind::List => "list",
            NodeKind::ListItem => "list_item",
        }
    }

    pub fn is_section(&self) -> bool {
        matches!(self, NodeKind::Section)
    }

    /// Content class used by the cost estimator
    pub fn content_class(&self) -> ContentClass {
        match self {
            NodeKind::CodeBlock => ContentClass::Code,
            NodeKind::MathBlock => ContentClass::Equation,
            NodeKind::Table => ContentClass::Table,
            NodeKind::List | NodeKind::ListItem => ContentClass::List,
            _ => ContentClass::Text,
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Broad class of content, each with its own cost adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentClass {
    Text,
    Code,
    Equation,
    Table,
    List,
    Metadata,
}

/// One structural unit of a document
///
/// `label` and `name` are structural anchors, not prose: within one
/// language tree two nodes carrying the same label are the same anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuralNode {
    /// Stable identifier derived from file, position and content
    #[serde(default)]
    pub id: String,
    #[serde(alias = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub content: String,
    /// Nesting depth, meaningful for sections only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children_ids: Vec<String>,
    #[serde(default, alias = "file_path")]
    pub source_file: PathBuf,
    #[serde(default)]
    pub line_number: usize,
    #[serde(default)]
    pub content_hash: String,
}

impl StructuralNode {
    /// Create a node with derived `id` and `content_hash`
    pub fn new(
        kind: NodeKind,
        content: impl Into<String>,
        source_file: impl Into<PathBuf>,
        line_number: usize,
    ) -> Self {
        let mut node = StructuralNode {
            id: String::new(),
            kind,
            content: content.into(),
            level: None,
            label: None,
            name: None,
            caption: None,
            parent_id: None,
            children_ids: Vec::new(),
            source_file: source_file.into(),
            line_number,
            content_hash: String::new(),
        };
        node.normalize();
        node
    }

    /// Shorthand for a section node at `level`
    pub fn section(
        title: impl Into<String>,
        level: u32,
        source_file: impl Into<PathBuf>,
        line_number: usize,
    ) -> Self {
        StructuralNode::new(NodeKind::Section, title, source_file, line_number).with_level(level)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Fill in `content_hash` and `id` when a collaborator left them empty
    pub fn normalize(&mut self) {
        if self.content_hash.is_empty() {
            self.content_hash = content_hash(&self.content);
        }
        if self.id.is_empty() {
            self.id = derive_node_id(
                self.kind,
                &self.source_file,
                self.line_number,
                &self.content_hash,
            );
        }
    }

    /// Label as a lookup key; empty labels count as absent
    pub fn label_key(&self) -> Option<&str> {
        self.label.as_deref().filter(|l| !l.is_empty())
    }

    /// Name as a lookup key; empty names count as absent
    pub fn name_key(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }

    /// Source file as a string key, `unknown` when the parser gave none
    pub fn file_key(&self) -> String {
        if self.source_file.as_os_str().is_empty() {
            "unknown".to_string()
        } else {
            self.source_file.display().to_string()
        }
    }
}

/// SHA-256 of the content as lowercase hex
pub fn content_hash(content: &str) -> String {
    format!("{:x}", Sha256::digest(content.as_bytes()))
}

/// `<kind>-<12 hex digits>` over file, line and content hash
pub fn derive_node_id(kind: NodeKind, file: &Path, line_number: usize, hash: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(file.display().to_string().as_bytes());
    hasher.update(b":");
    hasher.update(line_number.to_string().as_bytes());
    hasher.update(b":");
    hasher.update(hash.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("{}-{}", kind.as_str(), &digest[..12])
}

/// Truncate to at most `max_chars` characters on a char boundary
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
