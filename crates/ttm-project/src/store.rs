//! Generic structured configuration store.
//!
//! The solver's configuration is a set of documents, each a nested
//! mapping. A [`KeyPath`] names one value inside one document. The core
//! only touches the store through [`crate::slots::BoundarySlots`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::debug;

use crate::{ProjectError, ProjectResult};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyPath {
    pub document: String,
    pub keys: Vec<String>,
}

impl KeyPath {
    /// The whole document.
    pub fn document(document: impl Into<String>) -> Self {
        Self {
            document: document.into(),
            keys: Vec::new(),
        }
    }

    pub fn new(document: impl Into<String>, keys: &[&str]) -> Self {
        Self {
            document: document.into(),
            keys: keys.iter().map(|k| k.to_string()).collect(),
        }
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.keys.push(key.into());
        self
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.document)?;
        for key in &self.keys {
            write!(f, ":{key}")?;
        }
        Ok(())
    }
}

pub trait ConfigStore {
    fn read(&self, path: &KeyPath) -> ProjectResult<Option<Value>>;

    /// Write a value, creating intermediate mappings as needed.
    fn write(&mut self, path: &KeyPath, value: Value) -> ProjectResult<()>;

    fn remove(&mut self, path: &KeyPath) -> ProjectResult<Option<Value>>;

    /// Persist every modified document.
    fn flush(&mut self) -> ProjectResult<()>;
}

/// Store persisting each document as `<root>/<document>.json`.
#[derive(Debug)]
pub struct FileConfigStore {
    root: PathBuf,
    documents: BTreeMap<String, Value>,
    dirty: BTreeSet<String>,
}

impl FileConfigStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            documents: BTreeMap::new(),
            dirty: BTreeSet::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn document_path(&self, document: &str) -> PathBuf {
        self.root.join(format!("{document}.json"))
    }

    fn load(&self, document: &str) -> ProjectResult<Value> {
        let path = self.document_path(document);
        if !path.exists() {
            return Ok(Value::Object(Map::new()));
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn document_mut(&mut self, document: &str) -> ProjectResult<&mut Value> {
        if !self.documents.contains_key(document) {
            let value = self.load(document)?;
            self.documents.insert(document.to_string(), value);
        }
        self.documents.get_mut(document).ok_or_else(|| ProjectError::Store {
            document: document.to_string(),
            what: "document could not be loaded".to_string(),
        })
    }
}

fn lookup<'a>(mut value: &'a Value, keys: &[String]) -> Option<&'a Value> {
    for key in keys {
        value = value.as_object()?.get(key)?;
    }
    Some(value)
}

impl ConfigStore for FileConfigStore {
    fn read(&self, path: &KeyPath) -> ProjectResult<Option<Value>> {
        match self.documents.get(&path.document) {
            Some(doc) => Ok(lookup(doc, &path.keys).cloned()),
            None => Ok(lookup(&self.load(&path.document)?, &path.keys).cloned()),
        }
    }

    fn write(&mut self, path: &KeyPath, value: Value) -> ProjectResult<()> {
        let doc = self.document_mut(&path.document)?;
        let Some((last, parents)) = path.keys.split_last() else {
            *doc = value;
            self.dirty.insert(path.document.clone());
            return Ok(());
        };
        let mut node = doc;
        for key in parents {
            node = node
                .as_object_mut()
                .map(|m| m.entry(key.clone()).or_insert_with(|| Value::Object(Map::new())))
                .ok_or_else(|| ProjectError::Store {
                    document: path.document.clone(),
                    what: format!("{path}: '{key}' is below a non-mapping value"),
                })?;
        }
        let map = node.as_object_mut().ok_or_else(|| ProjectError::Store {
            document: path.document.clone(),
            what: format!("{path}: parent is not a mapping"),
        })?;
        map.insert(last.clone(), value);
        self.dirty.insert(path.document.clone());
        Ok(())
    }

    fn remove(&mut self, path: &KeyPath) -> ProjectResult<Option<Value>> {
        let doc = self.document_mut(&path.document)?;
        let Some((last, parents)) = path.keys.split_last() else {
            let old = std::mem::replace(doc, Value::Object(Map::new()));
            self.dirty.insert(path.document.clone());
            return Ok(Some(old));
        };
        let mut node = doc;
        for key in parents {
            match node.as_object_mut().and_then(|m| m.get_mut(key)) {
                Some(child) => node = child,
                None => return Ok(None),
            }
        }
        let removed = node.as_object_mut().and_then(|m| m.remove(last));
        if removed.is_some() {
            self.dirty.insert(path.document.clone());
        }
        Ok(removed)
    }

    fn flush(&mut self) -> ProjectResult<()> {
        for document in std::mem::take(&mut self.dirty) {
            let Some(value) = self.documents.get(&document) else {
                continue;
            };
            let path = self.document_path(&document);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, serde_json::to_string_pretty(value)?)?;
            debug!(document = %document, "config document written");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn write_creates_nested_mappings() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileConfigStore::new(dir.path());
        let path = KeyPath::new("system/controlDict", &["functions", "average_airInside", "enabled"]);
        store.write(&path, json!(false)).unwrap();
        assert_eq!(store.read(&path).unwrap(), Some(json!(false)));
        assert_eq!(
            store
                .read(&KeyPath::new("system/controlDict", &["functions", "missing"]))
                .unwrap(),
            None
        );
    }

    #[test]
    fn flush_persists_documents() {
        let dir = tempfile::tempdir().unwrap();
        let path = KeyPath::new("constant/airInside/radiationProperties", &["radiation"]);
        {
            let mut store = FileConfigStore::new(dir.path());
            store.write(&path, json!("on")).unwrap();
            store.flush().unwrap();
        }
        assert!(
            dir.path()
                .join("constant/airInside/radiationProperties.json")
                .exists()
        );
        let store = FileConfigStore::new(dir.path());
        assert_eq!(store.read(&path).unwrap(), Some(json!("on")));
    }

    #[test]
    fn remove_returns_old_value() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileConfigStore::new(dir.path());
        let path = KeyPath::new("doc", &["a", "b"]);
        store.write(&path, json!(1.5)).unwrap();
        assert_eq!(store.remove(&path).unwrap(), Some(json!(1.5)));
        assert_eq!(store.remove(&path).unwrap(), None);
        assert_eq!(store.read(&KeyPath::new("doc", &["a"])).unwrap(), Some(json!({})));
    }

    #[test]
    fn writing_below_scalar_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileConfigStore::new(dir.path());
        store.write(&KeyPath::new("doc", &["a"]), json!(3)).unwrap();
        let err = store.write(&KeyPath::new("doc", &["a", "b"]), json!(1));
        assert!(matches!(err, Err(ProjectError::Store { .. })));
    }

    #[test]
    fn key_path_display() {
        let path = KeyPath::document("system/controlDict").key("endTime");
        assert_eq!(path.to_string(), "system/controlDict:endTime");
    }
}
