//! Documents and their identities.
//!
//! A [`Document`] is a value: an identity (a URL, or a scheme/parent/name
//! triple) plus a binding that says whether, and how, the document belongs to
//! an index.
//!
//! - **Unbound**: created by the caller, no numeric ID yet.
//! - **Bound**: obtained from a read-only [`Index`](crate::index::Index); carries its
//!   [`DocumentId`] and a weak reference to the index.
//! - **Mutable bound**: obtained from a [`WritableIndex`](crate::index::WritableIndex);
//!   additionally permits [`rename`](Document::rename), [`move_to`](Document::move_to),
//!   [`set_properties`](Document::set_properties) and [`remove`](Document::remove).
//!
//! Bound documents never keep their index alive. Using one after the index
//! was closed or dropped fails with [`TesseraError::IndexClosed`].
//!
//! # Examples
//!
//! ```
//! use tessera::document::Document;
//!
//! let doc = Document::from_url("https://example.com").unwrap();
//! assert_eq!(doc.scheme(), Some("https"));
//! assert_eq!(doc.name(), "example.com");
//! assert!(doc.parent().is_none());
//! assert!(doc.id().is_none());
//! ```

use std::fmt;
use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, TesseraError};
use crate::index::shared::IndexShared;

pub mod sequence;
pub mod store;

pub use sequence::{DocumentIter, DocumentSequence};
pub use store::{DocumentNode, DocumentStore, NodeIdentity};

/// Numeric document ID, unique within one index.
///
/// IDs start at 1, are allocated monotonically and are never reused.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct DocumentId(pub u64);

impl DocumentId {
    /// The raw numeric value.
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for DocumentId {
    fn from(value: u64) -> Self {
        DocumentId(value)
    }
}

/// The identity of a document.
#[derive(Clone, Debug, PartialEq)]
pub enum Identity {
    /// A document identified by its source URL.
    Url {
        url: String,
        scheme: String,
        name: String,
    },

    /// A document identified by scheme, parent and name.
    Named {
        scheme: Option<String>,
        parent: Option<Arc<Document>>,
        name: String,
    },
}

/// A non-owning reference from a document to the index that assigned its ID.
#[derive(Clone)]
pub(crate) struct IndexRef {
    pub(crate) index: Weak<IndexShared>,
    pub(crate) index_uuid: Uuid,
    pub(crate) id: DocumentId,
}

impl IndexRef {
    pub(crate) fn new(shared: &Arc<IndexShared>, id: DocumentId) -> Self {
        IndexRef {
            index: Arc::downgrade(shared),
            index_uuid: shared.uuid(),
            id,
        }
    }

    /// Upgrade to the owning index, failing fast once it is gone.
    pub(crate) fn upgrade(&self) -> Result<Arc<IndexShared>> {
        let shared = self.index.upgrade().ok_or(TesseraError::IndexClosed)?;
        if shared.is_closed() {
            return Err(TesseraError::IndexClosed);
        }
        Ok(shared)
    }
}

impl fmt::Debug for IndexRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexRef")
            .field("index_uuid", &self.index_uuid)
            .field("id", &self.id)
            .finish()
    }
}

/// How a document is attached to an index.
#[derive(Clone, Debug)]
pub(crate) enum Binding {
    Unbound,
    Bound(IndexRef),
    MutableBound(IndexRef),
}

/// A document identity, optionally bound to an index.
#[derive(Clone, Debug)]
pub struct Document {
    identity: Identity,
    binding: Binding,
}

impl Document {
    /// Create a document from scheme, optional parent and name.
    ///
    /// The name must be non-empty.
    pub fn new(scheme: Option<&str>, parent: Option<&Document>, name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(TesseraError::invalid_document("document name is empty"));
        }

        Ok(Document {
            identity: Identity::Named {
                scheme: scheme.map(str::to_string),
                parent: parent.map(|p| Arc::new(p.clone())),
                name: name.to_string(),
            },
            binding: Binding::Unbound,
        })
    }

    /// Create a document from a URL.
    ///
    /// The scheme is everything before the first `:`. The name is the last
    /// non-empty path segment, or the host when the path is empty.
    pub fn from_url(url: &str) -> Result<Self> {
        let (scheme, name) = parse_url(url)?;

        Ok(Document {
            identity: Identity::Url {
                url: url.to_string(),
                scheme,
                name,
            },
            binding: Binding::Unbound,
        })
    }

    pub(crate) fn bound(identity: Identity, binding: Binding) -> Self {
        Document { identity, binding }
    }

    /// The document identity.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The document name.
    pub fn name(&self) -> &str {
        match &self.identity {
            Identity::Url { name, .. } | Identity::Named { name, .. } => name,
        }
    }

    /// The document scheme, inherited from the parent when not set.
    pub fn scheme(&self) -> Option<&str> {
        match &self.identity {
            Identity::Url { scheme, .. } => Some(scheme),
            Identity::Named { scheme, parent, .. } => match (scheme, parent) {
                (Some(scheme), _) => Some(scheme),
                (None, Some(parent)) => parent.scheme(),
                (None, None) => None,
            },
        }
    }

    /// The parent document, if any.
    pub fn parent(&self) -> Option<&Document> {
        match &self.identity {
            Identity::Url { .. } => None,
            Identity::Named { parent, .. } => parent.as_deref(),
        }
    }

    /// The document URL.
    ///
    /// Named documents derive one from their parent chain; `None` when no
    /// ancestor carries a scheme or URL.
    pub fn url(&self) -> Option<String> {
        match &self.identity {
            Identity::Url { url, .. } => Some(url.clone()),
            Identity::Named {
                scheme,
                parent,
                name,
            } => {
                match (parent, scheme) {
                    (Some(parent), _) => {
                        let base = parent.url()?;
                        Some(format!("{}/{}", base.trim_end_matches('/'), name))
                    }
                    (None, Some(scheme)) => Some(format!("{scheme}://{name}")),
                    (None, None) => None,
                }
            }
        }
    }

    /// The numeric ID, when the document is bound to an index.
    pub fn id(&self) -> Option<DocumentId> {
        self.index_ref().map(|r| r.id)
    }

    /// Whether the document is bound to an index.
    pub fn is_bound(&self) -> bool {
        !matches!(self.binding, Binding::Unbound)
    }

    /// Whether the document was obtained from a writable index.
    pub fn is_mutable(&self) -> bool {
        matches!(self.binding, Binding::MutableBound(_))
    }

    pub(crate) fn index_ref(&self) -> Option<&IndexRef> {
        match &self.binding {
            Binding::Unbound => None,
            Binding::Bound(r) | Binding::MutableBound(r) => Some(r),
        }
    }

    fn mutable_ref(&self) -> Result<&IndexRef> {
        match &self.binding {
            Binding::MutableBound(r) => Ok(r),
            Binding::Bound(_) => Err(TesseraError::read_only(format!(
                "document {} belongs to a read-only index",
                self.name()
            ))),
            Binding::Unbound => Err(TesseraError::not_indexed(format!(
                "document {} is not bound to an index",
                self.name()
            ))),
        }
    }

    /// Rename the document in its index.
    pub fn rename(&mut self, new_name: &str) -> Result<()> {
        let index_ref = self.mutable_ref()?;
        let id = index_ref.id;
        let shared = index_ref.upgrade()?;
        shared.rename_document(id, new_name)?;

        match &mut self.identity {
            Identity::Url { name, .. } | Identity::Named { name, .. } => {
                *name = new_name.to_string()
            }
        }
        Ok(())
    }

    /// Move the document under a new parent, or to the root with `None`.
    ///
    /// The new parent must belong to the same index and must not be a
    /// descendant of this document. Documents identified by a URL are
    /// always roots and fail with [`TesseraError::InvalidDocument`].
    pub fn move_to(&mut self, new_parent: Option<&Document>) -> Result<()> {
        let index_ref = self.mutable_ref()?;
        let id = index_ref.id;
        let shared = index_ref.upgrade()?;
        shared.move_document(id, new_parent)?;
        self.identity = shared.identity_of(id)?;
        Ok(())
    }

    /// The document's property bag.
    pub fn properties(&self) -> Result<Option<serde_json::Value>> {
        let index_ref = self
            .index_ref()
            .ok_or_else(|| TesseraError::not_indexed(self.name().to_string()))?;
        index_ref.upgrade()?.properties(index_ref.id)
    }

    /// Replace the document's property bag.
    pub fn set_properties(&self, properties: Option<serde_json::Value>) -> Result<()> {
        let index_ref = self.mutable_ref()?;
        index_ref
            .upgrade()?
            .set_properties(index_ref.id, properties)
    }

    /// Remove the document from its index. Children become roots.
    pub fn remove(self) -> Result<()> {
        let index_ref = self.mutable_ref()?;
        index_ref.upgrade()?.remove_document(index_ref.id)
    }

    /// The children of this document in its index.
    pub fn children(&self) -> Result<DocumentSequence> {
        let index_ref = self
            .index_ref()
            .ok_or_else(|| TesseraError::not_indexed(self.name().to_string()))?;
        let shared = index_ref.upgrade()?;
        shared.children(index_ref.id, self.is_mutable())
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        match (self.index_ref(), other.index_ref()) {
            (Some(a), Some(b)) if a.index_uuid == b.index_uuid => a.id == b.id,
            _ => self.identity == other.identity,
        }
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.url() {
            Some(url) => write!(f, "{url}"),
            None => write!(f, "{}", self.name()),
        }
    }
}

fn parse_url(url: &str) -> Result<(String, String)> {
    let (scheme, rest) = url
        .split_once(':')
        .ok_or_else(|| TesseraError::invalid_document(format!("URL has no scheme: {url}")))?;

    let valid_scheme = scheme
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !valid_scheme {
        return Err(TesseraError::invalid_document(format!(
            "invalid URL scheme: {url}"
        )));
    }

    let rest = rest.split(['?', '#']).next().unwrap_or_default();
    let (host, path) = match rest.strip_prefix("//") {
        Some(authority_and_path) => match authority_and_path.find('/') {
            Some(slash) => authority_and_path.split_at(slash),
            None => (authority_and_path, ""),
        },
        None => ("", rest),
    };

    let name = path
        .split('/')
        .rev()
        .find(|segment| !segment.is_empty())
        .unwrap_or(host);

    if name.is_empty() {
        return Err(TesseraError::invalid_document(format!(
            "URL has no name: {url}"
        )));
    }

    Ok((scheme.to_ascii_lowercase(), name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_url_uses_host_when_path_is_empty() {
        let doc = Document::from_url("https://example.com").unwrap();
        assert_eq!(doc.scheme(), Some("https"));
        assert_eq!(doc.name(), "example.com");
        assert!(doc.parent().is_none());
        assert_eq!(doc.url().as_deref(), Some("https://example.com"));
    }

    #[test]
    fn test_from_url_uses_last_path_segment() {
        let doc = Document::from_url("file:///Users/me/notes.txt?x=1").unwrap();
        assert_eq!(doc.scheme(), Some("file"));
        assert_eq!(doc.name(), "notes.txt");

        let doc = Document::from_url("https://example.com/a/b/").unwrap();
        assert_eq!(doc.name(), "b");
    }

    #[test]
    fn test_invalid_urls() {
        assert!(matches!(
            Document::from_url("no scheme here"),
            Err(TesseraError::InvalidDocument(_))
        ));
        assert!(Document::from_url("https://").is_err());
        assert!(Document::from_url("1http://x").is_err());
    }

    #[test]
    fn test_named_document_requires_name() {
        assert!(matches!(
            Document::new(Some("mem"), None, ""),
            Err(TesseraError::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_named_document_inherits_scheme_and_builds_url() {
        let root = Document::new(Some("mem"), None, "root").unwrap();
        let child = Document::new(None, Some(&root), "child").unwrap();

        assert_eq!(child.scheme(), Some("mem"));
        assert_eq!(child.parent(), Some(&root));
        assert_eq!(child.url().as_deref(), Some("mem://root/child"));
        assert!(Document::new(None, None, "loose").unwrap().url().is_none());
    }

    #[test]
    fn test_unbound_document_cannot_mutate() {
        let mut doc = Document::new(Some("mem"), None, "a").unwrap();
        assert!(!doc.is_bound());
        assert!(matches!(doc.rename("b"), Err(TesseraError::NotIndexed(_))));
    }
}
