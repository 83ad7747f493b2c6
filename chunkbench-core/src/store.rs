//! Document stores: catalog metadata plus raw payloads by document id.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::StoreError;
use crate::types::Document;

pub const CATALOG_FILE: &str = "catalog.json";

/// Read access to documents and their raw payloads.
pub trait DocumentStore: Send + Sync {
    /// Catalog entries in catalog order.
    fn documents(&self) -> Vec<Document>;

    /// Raw payload for `document_id`, if the store has one.
    fn get_raw_bytes(&self, document_id: &str) -> Option<Vec<u8>>;
}

/// Store held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocumentStore {
    documents: Vec<Document>,
    payloads: HashMap<String, Vec<u8>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document, replacing any earlier entry with the same id.
    pub fn insert(&mut self, document: Document, raw: impl Into<Vec<u8>>) {
        self.payloads.insert(document.id.clone(), raw.into());
        self.documents.retain(|d| d.id != document.id);
        self.documents.push(document);
    }

    /// Add a catalog entry with no payload.
    pub fn insert_metadata(&mut self, document: Document) {
        self.documents.retain(|d| d.id != document.id);
        self.documents.push(document);
    }

    pub fn with_document(mut self, document: Document, raw: impl Into<Vec<u8>>) -> Self {
        self.insert(document, raw);
        self
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn documents(&self) -> Vec<Document> {
        self.documents.clone()
    }

    fn get_raw_bytes(&self, document_id: &str) -> Option<Vec<u8>> {
        self.payloads.get(document_id).cloned()
    }
}

/// Store backed by a directory: `catalog.json` (an array of documents) plus
/// one raw file per document, named after the id with `/` replaced by `_`.
/// Raw files may sit in subdirectories and may have any extension or none.
/// A file whose full name equals the id wins over one whose stem does.
#[derive(Debug, Clone)]
pub struct DirectoryDocumentStore {
    root: PathBuf,
    documents: Vec<Document>,
    raw_by_name: HashMap<String, PathBuf>,
    raw_by_stem: HashMap<String, PathBuf>,
}

/// File stem used for a document id.
pub fn file_stem_for(document_id: &str) -> String {
    document_id.replace(['/', '\\'], "_")
}

impl DirectoryDocumentStore {
    pub fn open(root: &Path) -> Result<Self, StoreError> {
        let catalog_path = root.join(CATALOG_FILE);
        if !catalog_path.exists() {
            return Err(StoreError::CatalogNotFound { path: catalog_path });
        }
        let catalog = std::fs::read_to_string(&catalog_path)?;
        let documents: Vec<Document> =
            serde_json::from_str(&catalog).map_err(|e| StoreError::CatalogParse {
                path: catalog_path.clone(),
                message: e.to_string(),
            })?;

        let mut raw_by_name = HashMap::new();
        let mut raw_by_stem = HashMap::new();
        for entry in WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            if path == catalog_path {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|s| s.to_str()) {
                raw_by_name
                    .entry(name.to_string())
                    .or_insert_with(|| path.to_path_buf());
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                raw_by_stem
                    .entry(stem.to_string())
                    .or_insert_with(|| path.to_path_buf());
            }
        }

        info!(
            root = %root.display(),
            documents = documents.len(),
            raw_files = raw_by_name.len(),
            "Opened document store"
        );
        Ok(Self {
            root: root.to_path_buf(),
            documents,
            raw_by_name,
            raw_by_stem,
        })
    }

    /// Write `entries` as a new store under `root` and open it.
    pub fn create(root: &Path, entries: &[(Document, Vec<u8>)]) -> Result<Self, StoreError> {
        std::fs::create_dir_all(root)?;
        for (document, raw) in entries {
            let path = root.join(format!("{}.txt", file_stem_for(&document.id)));
            std::fs::write(path, raw)?;
        }
        let documents: Vec<&Document> = entries.iter().map(|(d, _)| d).collect();
        let catalog = serde_json::to_string_pretty(&documents).map_err(|e| {
            StoreError::CatalogParse {
                path: root.join(CATALOG_FILE),
                message: e.to_string(),
            }
        })?;
        std::fs::write(root.join(CATALOG_FILE), catalog)?;
        Self::open(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl DocumentStore for DirectoryDocumentStore {
    fn documents(&self) -> Vec<Document> {
        self.documents.clone()
    }

    fn get_raw_bytes(&self, document_id: &str) -> Option<Vec<u8>> {
        let key = file_stem_for(document_id);
        let path = self
            .raw_by_name
            .get(&key)
            .or_else(|| self.raw_by_stem.get(&key))?;
        match std::fs::read(path) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                debug!(document_id, path = %path.display(), error = %e, "Raw file unreadable");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_store() {
        let mut store = InMemoryDocumentStore::new();
        store.insert(Document::new("d1", "T1", "A1"), "body one");
        store.insert_metadata(Document::new("d2", "T2", "A2"));
        store.insert(Document::new("d1", "T1b", "A1"), b"body two".to_vec());

        assert_eq!(store.len(), 2);
        assert_eq!(store.get_raw_bytes("d1").unwrap(), b"body two");
        assert!(store.get_raw_bytes("d2").is_none());
        assert!(store.get_raw_bytes("missing").is_none());
        let ids: Vec<_> = store.documents().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["d2", "d1"]);
    }

    #[test]
    fn test_directory_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let entries = vec![
            (Document::new("2501.00001", "First", "Abstract one"), b"text one".to_vec()),
            (Document::new("hep-th/9901001", "Second", "Abstract two"), b"text two".to_vec()),
        ];
        let store = DirectoryDocumentStore::create(dir.path(), &entries).unwrap();

        assert_eq!(store.documents().len(), 2);
        assert_eq!(store.get_raw_bytes("2501.00001").unwrap(), b"text one");
        assert_eq!(store.get_raw_bytes("hep-th/9901001").unwrap(), b"text two");
        assert!(store.get_raw_bytes("nope").is_none());
    }

    #[test]
    fn test_directory_store_finds_nested_raw_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CATALOG_FILE),
            r#"[{"id":"p1","title":"T","abstract":"A"}]"#,
        )
        .unwrap();
        std::fs::create_dir_all(dir.path().join("raw")).unwrap();
        std::fs::write(dir.path().join("raw").join("p1.md"), "nested").unwrap();

        let store = DirectoryDocumentStore::open(dir.path()).unwrap();
        assert_eq!(store.get_raw_bytes("p1").unwrap(), b"nested");
    }

    #[test]
    fn test_directory_store_matches_extensionless_dotted_ids() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CATALOG_FILE),
            r#"[{"id":"2501.00001","title":"T","abstract":"A"},{"id":"2502.00002","title":"U","abstract":"B"}]"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("2501.00001"), "bare").unwrap();
        std::fs::write(dir.path().join("2502.00002.txt"), "suffixed").unwrap();

        let store = DirectoryDocumentStore::open(dir.path()).unwrap();
        assert_eq!(store.get_raw_bytes("2501.00001").unwrap(), b"bare");
        assert_eq!(store.get_raw_bytes("2502.00002").unwrap(), b"suffixed");
    }

    #[test]
    fn test_directory_store_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            DirectoryDocumentStore::open(dir.path()),
            Err(StoreError::CatalogNotFound { .. })
        ));

        std::fs::write(dir.path().join(CATALOG_FILE), "{not json").unwrap();
        assert!(matches!(
            DirectoryDocumentStore::open(dir.path()),
            Err(StoreError::CatalogParse { .. })
        ));
    }
}
