//! Node stores
//!
//! Node lists come from a markup parser that runs outside this crate. A
//! [`NodeStore`] is where they are kept between runs, one list per
//! language.
//!
//! # Example
//!
//! ```ignore
//! use docdiff::store::{JsonNodeStore, NodeStore};
//!
//! let store = JsonNodeStore::new(".docdiff");
//! let source = store.load_nodes("en").await?;
//! let target = store.load_nodes("ja").await?;
//! ```

use crate::error::{DocDiffError, DocDiffResult};
use crate::language::{normalize_language, validate_language};
use crate::node::StructuralNode;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;

/// Persistence for per-language node lists
#[async_trait]
pub trait NodeStore: Send + Sync {
    /// Nodes stored for `language`, in document order
    ///
    /// A language with nothing stored yields an empty list.
    async fn load_nodes(&self, language: &str) -> DocDiffResult<Vec<StructuralNode>>;

    /// Replace the nodes stored for `language`
    async fn save_nodes(&self, language: &str, nodes: &[StructuralNode]) -> DocDiffResult<()>;

    /// Name of the store, used in logs
    fn store_name(&self) -> &str;
}

/// Either a bare array of nodes or an object with a `nodes` array
#[derive(Deserialize)]
#[serde(untagged)]
enum NodeFile {
    List(Vec<StructuralNode>),
    Wrapped { nodes: Vec<StructuralNode> },
}

impl NodeFile {
    fn into_nodes(self) -> Vec<StructuralNode> {
        let mut nodes = match self {
            NodeFile::List(nodes) | NodeFile::Wrapped { nodes } => nodes,
        };
        for node in &mut nodes {
            node.normalize();
        }
        nodes
    }
}

/// Parse a node list from JSON text, filling in missing ids and hashes
pub fn parse_nodes(json: &str) -> DocDiffResult<Vec<StructuralNode>> {
    let file: NodeFile = serde_json::from_str(json)?;
    Ok(file.into_nodes())
}

/// Load a node list from a JSON file
///
/// # Errors
/// `Store` when the file cannot be read, `Json` when it is not a node list.
pub async fn load_nodes_from_file(path: &Path) -> DocDiffResult<Vec<StructuralNode>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| DocDiffError::Store(format!("cannot read {}: {}", path.display(), e)))?;
    let nodes = parse_nodes(&content)?;
    debug!(path = %path.display(), nodes = nodes.len(), "loaded node list");
    Ok(nodes)
}

/// One `<root>/<language>.json` file per language
#[derive(Debug, Clone)]
pub struct JsonNodeStore {
    root: PathBuf,
}

impl JsonNodeStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, language: &str) -> DocDiffResult<PathBuf> {
        validate_language(language)?;
        Ok(self.root.join(format!("{}.json", normalize_language(language))))
    }
}

#[async_trait]
impl NodeStore for JsonNodeStore {
    async fn load_nodes(&self, language: &str) -> DocDiffResult<Vec<StructuralNode>> {
        let path = self.path_for(language)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => parse_nodes(&content),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no stored nodes");
                Ok(Vec::new())
            }
            Err(e) => Err(DocDiffError::Store(format!(
                "cannot read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn save_nodes(&self, language: &str, nodes: &[StructuralNode]) -> DocDiffResult<()> {
        let path = self.path_for(language)?;
        tokio::fs::create_dir_all(&self.root).await?;
        let json = serde_json::to_string_pretty(nodes)?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| DocDiffError::Store(format!("cannot write {}: {}", path.display(), e)))?;
        debug!(path = %path.display(), nodes = nodes.len(), "saved nodes");
        Ok(())
    }

    fn store_name(&self) -> &str {
        "json"
    }
}

/// In-memory store, keyed by base language
#[derive(Debug, Default)]
pub struct MemoryNodeStore {
    nodes: RwLock<BTreeMap<String, Vec<StructuralNode>>>,
}

impl MemoryNodeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NodeStore for MemoryNodeStore {
    async fn load_nodes(&self, language: &str) -> DocDiffResult<Vec<StructuralNode>> {
        validate_language(language)?;
        let nodes = self.nodes.read().await;
        Ok(nodes
            .get(&normalize_language(language))
            .cloned()
            .unwrap_or_default())
    }

    async fn save_nodes(&self, language: &str, nodes: &[StructuralNode]) -> DocDiffResult<()> {
        validate_language(language)?;
        let mut stored: Vec<StructuralNode> = nodes.to_vec();
        for node in &mut stored {
            node.normalize();
        }
        self.nodes
            .write()
            .await
            .insert(normalize_language(language), stored);
        Ok(())
    }

    fn store_name(&self) -> &str {
        "memory"
    }
}
