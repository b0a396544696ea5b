//! Hierarchy Builder
//!
//! Regroups a flat list of correspondences into one tree per source file.
//! Sections nest by level; every other node hangs off the innermost open
//! section. Each node also receives a bounded window of neighbouring text
//! so a translator sees what surrounds it.
//!
//! The tree of each file is an arena: nodes live in a `Vec` in document
//! order and refer to each other by id, with an id-to-position index for
//! lookups.

pub mod context;

use crate::matcher::{Correspondence, MatchStatus};
use crate::node::{NodeKind, StructuralNode};
use context::{following_text, preceding_text};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

/// Where a node sits and what surrounds it
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NodeContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preceding_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub following_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enclosing_section_title: Option<String>,
    pub file_path: String,
    pub line_number: usize,
}

/// A correspondence placed in its file's reconstructed tree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslationTreeNode {
    /// Unique within the file; the source id, suffixed when repeated
    pub id: String,
    pub kind: NodeKind,
    pub level: u32,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub status: MatchStatus,
    pub similarity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub children_ids: Vec<String>,
    pub context: NodeContext,
    /// Structural markers of the source node (`label`, `name`, `caption`)
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl TranslationTreeNode {
    fn from_correspondence(id: String, c: &Correspondence, file_path: &str) -> Self {
        let source = &c.source;
        let mut metadata = BTreeMap::new();
        if let Some(label) = source.label_key() {
            metadata.insert("label".to_string(), label.to_string());
        }
        if let Some(name) = source.name_key() {
            metadata.insert("name".to_string(), name.to_string());
        }
        if let Some(caption) = source.caption.as_deref().filter(|c| !c.is_empty()) {
            metadata.insert("caption".to_string(), caption.to_string());
        }

        TranslationTreeNode {
            id,
            kind: source.kind,
            level: source.level.unwrap_or(0),
            source: source.content.clone(),
            target: c.target.as_ref().map(|t| t.content.clone()),
            status: c.status,
            similarity: c.similarity,
            parent_id: None,
            children_ids: Vec::new(),
            context: NodeContext {
                file_path: file_path.to_string(),
                line_number: source.line_number,
                ..NodeContext::default()
            },
            metadata,
        }
    }

    pub fn is_section(&self) -> bool {
        self.kind.is_section()
    }

    pub fn line_number(&self) -> usize {
        self.context.line_number
    }

    pub fn needs_translation(&self) -> bool {
        self.status.needs_translation()
    }
}

/// The reconstructed tree of one source file
#[derive(Debug, Clone, Serialize)]
pub struct DocumentTree {
    pub file_path: String,
    /// `sha256:` followed by 16 hex digits over the concatenated contents
    pub file_hash: String,
    pub relative_path: String,
    pub root_ids: Vec<String>,
    /// All nodes in document order
    pub nodes: Vec<TranslationTreeNode>,
    pub total_nodes: usize,
    pub missing_nodes: usize,
    pub fuzzy_nodes: usize,
    #[serde(skip)]
    positions: HashMap<String, usize>,
}

impl DocumentTree {
    pub fn get(&self, id: &str) -> Option<&TranslationTreeNode> {
        self.positions.get(id).map(|&i| &self.nodes[i])
    }

    /// Position of a node in document order
    pub fn position(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn parent(&self, node: &TranslationTreeNode) -> Option<&TranslationTreeNode> {
        node.parent_id.as_deref().and_then(|id| self.get(id))
    }

    /// The innermost section containing `node`, or `node` itself for a section
    pub fn enclosing_section<'a>(
        &'a self,
        node: &'a TranslationTreeNode,
    ) -> Option<&'a TranslationTreeNode> {
        if node.is_section() {
            return Some(node);
        }
        self.parent(node).filter(|p| p.is_section())
    }

    pub fn roots(&self) -> impl Iterator<Item = &TranslationTreeNode> {
        self.root_ids.iter().filter_map(|id| self.get(id))
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Trees of all files, ordered by path
#[derive(Debug, Clone, Default, Serialize)]
pub struct DocumentHierarchy {
    pub files: BTreeMap<String, DocumentTree>,
    pub total_files: usize,
    pub total_nodes: usize,
}

impl DocumentHierarchy {
    pub fn file(&self, path: &str) -> Option<&DocumentTree> {
        self.files.get(path)
    }

    pub fn trees(&self) -> impl Iterator<Item = &DocumentTree> {
        self.files.values()
    }
}

/// Builds per-file translation trees from correspondences
#[derive(Debug, Clone)]
pub struct HierarchyBuilder {
    context_window: usize,
}

impl Default for HierarchyBuilder {
    fn default() -> Self {
        Self::new(3)
    }
}

impl HierarchyBuilder {
    pub fn new(context_window: usize) -> Self {
        Self { context_window }
    }

    pub fn build(&self, correspondences: &[Correspondence]) -> DocumentHierarchy {
        let mut groups: BTreeMap<String, Vec<&Correspondence>> = BTreeMap::new();
        for c in correspondences {
            groups.entry(c.source.file_key()).or_default().push(c);
        }

        let mut hierarchy = DocumentHierarchy::default();
        for (file_path, group) in groups {
            let tree = self.build_file(&file_path, &group);
            debug!(
                file = %file_path,
                nodes = tree.total_nodes,
                roots = tree.root_ids.len(),
                "built file tree"
            );
            hierarchy.total_files += 1;
            hierarchy.total_nodes += tree.total_nodes;
            hierarchy.files.insert(file_path, tree);
        }

        info!(
            files = hierarchy.total_files,
            nodes = hierarchy.total_nodes,
            "hierarchy built"
        );
        hierarchy
    }

    fn build_file(&self, file_path: &str, group: &[&Correspondence]) -> DocumentTree {
        let ids = unique_ids(group.iter().map(|c| &c.source));
        let mut nodes: Vec<TranslationTreeNode> = group
            .iter()
            .zip(ids)
            .map(|(c, id)| TranslationTreeNode::from_correspondence(id, c, file_path))
            .collect();

        link_sections(&mut nodes);
        self.attach_context(&mut nodes, group);

        let positions: HashMap<String, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();
        let root_ids = nodes
            .iter()
            .filter(|n| n.parent_id.is_none())
            .map(|n| n.id.clone())
            .collect();

        DocumentTree {
            file_path: file_path.to_string(),
            file_hash: file_hash(group.iter().map(|c| c.source.content.as_str())),
            relative_path: relative_path(file_path),
            root_ids,
            total_nodes: nodes.len(),
            missing_nodes: count_status(&nodes, MatchStatus::Missing),
            fuzzy_nodes: count_status(&nodes, MatchStatus::Fuzzy),
            nodes,
            positions,
        }
    }

    fn attach_context(&self, nodes: &mut [TranslationTreeNode], group: &[&Correspondence]) {
        let entries: Vec<(NodeKind, &str)> = group
            .iter()
            .map(|c| (c.source.kind, c.source.content.as_str()))
            .collect();
        let titles: HashMap<String, String> = nodes
            .iter()
            .filter(|n| n.is_section())
            .map(|n| (n.id.clone(), n.source.clone()))
            .collect();

        for (i, node) in nodes.iter_mut().enumerate() {
            node.context.preceding_text = preceding_text(&entries, i, self.context_window);
            node.context.following_text = following_text(&entries, i, self.context_window);
            node.context.enclosing_section_title = node
                .parent_id
                .as_ref()
                .and_then(|parent| titles.get(parent))
                .cloned();
        }
    }
}

/// Assign parents with a stack of open sections
///
/// A section at level `L` closes every open section at level `L` or
/// deeper, so the stack never holds two entries at the same level.
fn link_sections(nodes: &mut [TranslationTreeNode]) {
    let mut open: Vec<(usize, u32)> = Vec::new();

    for i in 0..nodes.len() {
        if nodes[i].is_section() {
            let level = nodes[i].level;
            while open.last().is_some_and(|&(_, l)| l >= level) {
                open.pop();
            }
            if let Some(&(parent, _)) = open.last() {
                adopt(nodes, parent, i);
            }
            open.push((i, level));
        } else if let Some(&(parent, _)) = open.last() {
            adopt(nodes, parent, i);
        }
    }
}

fn adopt(nodes: &mut [TranslationTreeNode], parent: usize, child: usize) {
    let child_id = nodes[child].id.clone();
    nodes[child].parent_id = Some(nodes[parent].id.clone());
    nodes[parent].children_ids.push(child_id);
}

/// Source ids, with `-2`, `-3`, ... appended to repeats
fn unique_ids<'a>(sources: impl Iterator<Item = &'a StructuralNode>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut ids = Vec::new();

    for source in sources {
        let mut id = source.id.clone();
        let mut n = 2;
        while seen.contains(&id) {
            id = format!("{}-{}", source.id, n);
            n += 1;
        }
        seen.insert(id.clone());
        ids.push(id);
    }

    ids
}

fn count_status(nodes: &[TranslationTreeNode], status: MatchStatus) -> usize {
    nodes.iter().filter(|n| n.status == status).count()
}

fn file_hash<'a>(contents: impl Iterator<Item = &'a str>) -> String {
    let mut hasher = Sha256::new();
    for content in contents {
        hasher.update(content.as_bytes());
    }
    let digest = format!("{:x}", hasher.finalize());
    format!("sha256:{}", &digest[..16])
}

/// Path from the first `docs`, `documentation` or `doc` directory on
fn relative_path(file_path: &str) -> String {
    let path = Path::new(file_path);
    let components: Vec<_> = path.components().collect();

    let docs_root = components.iter().position(|c| {
        matches!(
            c.as_os_str().to_str(),
            Some("docs") | Some("documentation") | Some("doc")
        )
    });

    match docs_root {
        Some(start) => components[start..]
            .iter()
            .collect::<std::path::PathBuf>()
            .display()
            .to_string(),
        None => path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_path.to_string()),
    }
}
