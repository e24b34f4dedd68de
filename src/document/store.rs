//! The document tree.
//!
//! [`DocumentStore`] keeps a forest of document nodes keyed by [`DocumentId`].
//! Each node records its identity, an optional parent edge, its children and
//! a free-form property bag. Registration is idempotent on identity: a URL
//! document is identified by its URL, a named document by
//! `(scheme, parent, name)`.
//!
//! Removing a node orphans its children; they become roots. Nothing
//! cascades.

use std::collections::{BTreeMap, BTreeSet};

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::document::DocumentId;
use crate::error::{Result, TesseraError};

/// The identity fields a node is registered with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeIdentity {
    pub scheme: Option<String>,
    pub name: String,
    pub url: Option<String>,
    pub parent: Option<DocumentId>,
}

impl NodeIdentity {
    /// Identity of a URL document.
    pub fn url(url: &str, scheme: &str, name: &str) -> Self {
        NodeIdentity {
            scheme: Some(scheme.to_string()),
            name: name.to_string(),
            url: Some(url.to_string()),
            parent: None,
        }
    }

    /// Identity of a named document.
    pub fn named(scheme: Option<&str>, parent: Option<DocumentId>, name: &str) -> Self {
        NodeIdentity {
            scheme: scheme.map(str::to_string),
            name: name.to_string(),
            url: None,
            parent,
        }
    }

    pub(crate) fn key(&self) -> IdentityKey {
        match &self.url {
            Some(url) => IdentityKey::Url(url.clone()),
            None => IdentityKey::Named {
                scheme: self.scheme.clone(),
                parent: self.parent,
                name: self.name.clone(),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub(crate) enum IdentityKey {
    Url(String),
    Named {
        scheme: Option<String>,
        parent: Option<DocumentId>,
        name: String,
    },
}

/// A node in the document tree.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocumentNode {
    pub id: DocumentId,
    pub identity: NodeIdentity,
    pub children: BTreeSet<DocumentId>,
    #[serde(with = "json_text")]
    pub properties: Option<serde_json::Value>,
}

/// A forest of documents with monotonic ID allocation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocumentStore {
    nodes: BTreeMap<DocumentId, DocumentNode>,
    by_identity: AHashMap<IdentityKey, DocumentId>,
    next_id: u64,
}

impl Default for DocumentStore {
    fn default() -> Self {
        DocumentStore {
            nodes: BTreeMap::new(),
            by_identity: AHashMap::new(),
            next_id: 1,
        }
    }
}

impl DocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document, returning its ID.
    ///
    /// Registering an identity that is already present returns the existing
    /// ID. The parent, if any, must already be registered.
    pub fn register(&mut self, identity: NodeIdentity) -> Result<DocumentId> {
        if identity.name.is_empty() {
            return Err(TesseraError::invalid_document("document name is empty"));
        }
        if let Some(parent) = identity.parent {
            if !self.nodes.contains_key(&parent) {
                return Err(TesseraError::invalid_document(format!(
                    "parent document {parent} is not registered in this index"
                )));
            }
        }

        let key = identity.key();
        if let Some(&existing) = self.by_identity.get(&key) {
            return Ok(existing);
        }

        let id = DocumentId(self.next_id);
        self.next_id += 1;

        if let Some(parent) = identity.parent {
            if let Some(parent_node) = self.nodes.get_mut(&parent) {
                parent_node.children.insert(id);
            }
        }

        self.by_identity.insert(key, id);
        self.nodes.insert(
            id,
            DocumentNode {
                id,
                identity,
                children: BTreeSet::new(),
                properties: None,
            },
        );

        Ok(id)
    }

    /// Find the ID registered for an identity.
    pub fn lookup(&self, identity: &NodeIdentity) -> Option<DocumentId> {
        self.by_identity.get(&identity.key()).copied()
    }

    /// Get a node by ID.
    pub fn get(&self, id: DocumentId) -> Option<&DocumentNode> {
        self.nodes.get(&id)
    }

    fn node(&self, id: DocumentId) -> Result<&DocumentNode> {
        self.nodes
            .get(&id)
            .ok_or_else(|| TesseraError::not_indexed(format!("document {id}")))
    }

    fn node_mut(&mut self, id: DocumentId) -> Result<&mut DocumentNode> {
        self.nodes
            .get_mut(&id)
            .ok_or_else(|| TesseraError::not_indexed(format!("document {id}")))
    }

    /// Check if a document is registered.
    pub fn contains(&self, id: DocumentId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of registered documents.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The highest ID allocated so far (0 when none).
    pub fn max_allocated_id(&self) -> DocumentId {
        DocumentId(self.next_id - 1)
    }

    /// IDs of the children of a document, ascending.
    pub fn children(&self, id: DocumentId) -> Result<Vec<DocumentId>> {
        Ok(self.node(id)?.children.iter().copied().collect())
    }

    /// IDs of all root documents, ascending.
    pub fn roots(&self) -> Vec<DocumentId> {
        self.nodes
            .values()
            .filter(|node| node.identity.parent.is_none())
            .map(|node| node.id)
            .collect()
    }

    /// Rename a document.
    pub fn rename(&mut self, id: DocumentId, new_name: &str) -> Result<()> {
        if new_name.is_empty() {
            return Err(TesseraError::invalid_document("new name is empty"));
        }

        let mut identity = self.node(id)?.identity.clone();
        identity.name = new_name.to_string();
        self.rekey(id, identity)
    }

    /// Move a document under `new_parent`, or make it a root with `None`.
    pub fn move_to(&mut self, id: DocumentId, new_parent: Option<DocumentId>) -> Result<()> {
        let current = self.node(id)?.identity.clone();

        if let Some(parent) = new_parent {
            if current.url.is_some() {
                return Err(TesseraError::invalid_document(format!(
                    "document {id} is identified by its URL and cannot have a parent"
                )));
            }
            if !self.nodes.contains_key(&parent) {
                return Err(TesseraError::invalid_document(format!(
                    "parent document {parent} is not registered in this index"
                )));
            }
            if self.is_ancestor_or_self(id, parent) {
                return Err(TesseraError::cycle(format!(
                    "moving document {id} under {parent} would create a cycle"
                )));
            }
        }

        if current.parent == new_parent {
            return Ok(());
        }

        let mut identity = current.clone();
        identity.parent = new_parent;
        self.rekey(id, identity)?;

        if let Some(old_parent) = current.parent {
            if let Some(node) = self.nodes.get_mut(&old_parent) {
                node.children.remove(&id);
            }
        }
        if let Some(parent) = new_parent {
            if let Some(node) = self.nodes.get_mut(&parent) {
                node.children.insert(id);
            }
        }

        Ok(())
    }

    /// Whether `candidate` is `id` or lies inside the subtree of `id`.
    fn is_ancestor_or_self(&self, id: DocumentId, candidate: DocumentId) -> bool {
        let mut current = Some(candidate);
        while let Some(node_id) = current {
            if node_id == id {
                return true;
            }
            current = self.nodes.get(&node_id).and_then(|n| n.identity.parent);
        }
        false
    }

    /// Replace a node's identity, keeping the identity index consistent.
    fn rekey(&mut self, id: DocumentId, identity: NodeIdentity) -> Result<()> {
        let new_key = identity.key();
        if let Some(&other) = self.by_identity.get(&new_key) {
            if other != id {
                return Err(TesseraError::invalid_document(format!(
                    "another document ({other}) already has this identity"
                )));
            }
        }

        let node = self.node_mut(id)?;
        let old_key = node.identity.key();
        node.identity = identity;

        if self.by_identity.get(&old_key) == Some(&id) {
            self.by_identity.remove(&old_key);
        }
        self.by_identity.insert(new_key, id);
        Ok(())
    }

    /// Remove a document. Its children become roots.
    ///
    /// An orphan whose root identity collides with an existing document stays
    /// reachable by ID but not by identity.
    pub fn remove(&mut self, id: DocumentId) -> Result<DocumentNode> {
        let node = self
            .nodes
            .remove(&id)
            .ok_or_else(|| TesseraError::not_indexed(format!("document {id}")))?;

        let key = node.identity.key();
        if self.by_identity.get(&key) == Some(&id) {
            self.by_identity.remove(&key);
        }

        if let Some(parent) = node.identity.parent {
            if let Some(parent_node) = self.nodes.get_mut(&parent) {
                parent_node.children.remove(&id);
            }
        }

        for child in &node.children {
            let Some(child_node) = self.nodes.get_mut(child) else {
                continue;
            };
            let old_key = child_node.identity.key();
            child_node.identity.parent = None;
            let new_key = child_node.identity.key();

            if self.by_identity.get(&old_key) == Some(child) {
                self.by_identity.remove(&old_key);
            }
            if self.by_identity.contains_key(&new_key) {
                log::debug!("Orphaned document {child} shadows an existing root identity");
            } else {
                self.by_identity.insert(new_key, *child);
            }
        }

        Ok(node)
    }

    /// The property bag of a document.
    pub fn properties(&self, id: DocumentId) -> Result<Option<&serde_json::Value>> {
        Ok(self.node(id)?.properties.as_ref())
    }

    /// Replace the property bag of a document.
    pub fn set_properties(
        &mut self,
        id: DocumentId,
        properties: Option<serde_json::Value>,
    ) -> Result<()> {
        self.node_mut(id)?.properties = properties;
        Ok(())
    }
}

/// Property bags travel as JSON text so non-self-describing encoders can
/// carry them.
mod json_text {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<serde_json::Value>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let text = match value {
            Some(value) => Some(serde_json::to_string(value).map_err(serde::ser::Error::custom)?),
            None => None,
        };
        text.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<serde_json::Value>, D::Error> {
        let text = Option::<String>::deserialize(deserializer)?;
        text.map(|t| serde_json::from_str(&t).map_err(serde::de::Error::custom))
            .transpose()
    }
}
