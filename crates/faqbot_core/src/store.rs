use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::{FaqbotError, Result};
use crate::model::{FaqPatch, FaqRecord, QueryLogEntry};

/// Persistence for FAQ records and the append-only query log.
pub trait KnowledgeStore: Send + Sync {
    /// Snapshot of every FAQ in store order.
    fn get_all_faqs(&self) -> Result<Vec<FaqRecord>>;
    fn get_faq(&self, id: &str) -> Result<Option<FaqRecord>>;
    fn add_faq(&self, faq: FaqRecord) -> Result<FaqRecord>;
    /// `None` when no FAQ has `id`. A blank or empty patch is `InvalidInput`.
    fn update_faq(&self, id: &str, patch: &FaqPatch) -> Result<Option<FaqRecord>>;
    fn delete_faq(&self, id: &str) -> Result<bool>;
    fn log_query(&self, entry: QueryLogEntry) -> Result<()>;
    fn query_logs(&self) -> Result<Vec<QueryLogEntry>>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    faqs: Vec<FaqRecord>,
    #[serde(default)]
    logs: Vec<QueryLogEntry>,
}

fn unavailable(action: &str, path: &Path, err: impl std::fmt::Display) -> FaqbotError {
    FaqbotError::KnowledgeStoreUnavailable(format!("{action} {}: {err}", path.display()))
}

/// Single JSON document holding `faqs` and `logs`, re-read on every call.
///
/// Writes go to a sibling temp file that is renamed over the document, so a
/// concurrent reader sees either the previous or the next version, never a partial one.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Opens `path`, creating parent directories and an empty document if missing.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| unavailable("create", parent, err))?;
        }
        let store = Self {
            path,
            write_lock: Mutex::new(()),
        };
        if !store.path.exists() {
            store.write(&StoreDocument::default())?;
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<StoreDocument> {
        let file = File::open(&self.path).map_err(|err| unavailable("open", &self.path, err))?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|err| unavailable("parse", &self.path, err))
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!(".{}.tmp", std::process::id()));
        self.path.with_file_name(name)
    }

    fn write(&self, doc: &StoreDocument) -> Result<()> {
        let tmp = self.temp_path();
        let file = File::create(&tmp).map_err(|err| unavailable("create", &tmp, err))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, doc)
            .map_err(|err| unavailable("write", &tmp, err))?;
        writer
            .flush()
            .map_err(|err| unavailable("flush", &tmp, err))?;
        drop(writer);
        fs::rename(&tmp, &self.path).map_err(|err| {
            let _ = fs::remove_file(&tmp);
            unavailable("replace", &self.path, err)
        })
    }

    fn modify<T>(&self, f: impl FnOnce(&mut StoreDocument) -> (T, bool)) -> Result<T> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| FaqbotError::KnowledgeStoreUnavailable("store lock poisoned".into()))?;
        let mut doc = self.read()?;
        let (out, changed) = f(&mut doc);
        if changed {
            self.write(&doc)?;
        }
        Ok(out)
    }
}

impl KnowledgeStore for JsonFileStore {
    fn get_all_faqs(&self) -> Result<Vec<FaqRecord>> {
        Ok(self.read()?.faqs)
    }

    fn get_faq(&self, id: &str) -> Result<Option<FaqRecord>> {
        Ok(self.read()?.faqs.into_iter().find(|f| f.id == id))
    }

    fn add_faq(&self, faq: FaqRecord) -> Result<FaqRecord> {
        faq.validate()?;
        self.modify(|doc| {
            doc.faqs.push(faq.clone());
            (faq, true)
        })
    }

    fn update_faq(&self, id: &str, patch: &FaqPatch) -> Result<Option<FaqRecord>> {
        patch.validate()?;
        self.modify(|doc| match doc.faqs.iter_mut().find(|f| f.id == id) {
            Some(faq) => {
                patch.apply(faq);
                (Some(faq.clone()), true)
            }
            None => (None, false),
        })
    }

    fn delete_faq(&self, id: &str) -> Result<bool> {
        self.modify(|doc| {
            let before = doc.faqs.len();
            doc.faqs.retain(|f| f.id != id);
            let removed = doc.faqs.len() < before;
            (removed, removed)
        })
    }

    fn log_query(&self, entry: QueryLogEntry) -> Result<()> {
        self.modify(|doc| {
            doc.logs.push(entry);
            ((), true)
        })
    }

    fn query_logs(&self) -> Result<Vec<QueryLogEntry>> {
        Ok(self.read()?.logs)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    faqs: Mutex<Vec<FaqRecord>>,
    logs: Mutex<Vec<QueryLogEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_faqs(faqs: Vec<FaqRecord>) -> Self {
        Self {
            faqs: Mutex::new(faqs),
            logs: Mutex::default(),
        }
    }

    fn faqs(&self) -> Result<std::sync::MutexGuard<'_, Vec<FaqRecord>>> {
        self.faqs
            .lock()
            .map_err(|_| FaqbotError::KnowledgeStoreUnavailable("faq lock poisoned".into()))
    }

    fn logs(&self) -> Result<std::sync::MutexGuard<'_, Vec<QueryLogEntry>>> {
        self.logs
            .lock()
            .map_err(|_| FaqbotError::KnowledgeStoreUnavailable("log lock poisoned".into()))
    }
}

impl KnowledgeStore for MemoryStore {
    fn get_all_faqs(&self) -> Result<Vec<FaqRecord>> {
        Ok(self.faqs()?.clone())
    }

    fn get_faq(&self, id: &str) -> Result<Option<FaqRecord>> {
        Ok(self.faqs()?.iter().find(|f| f.id == id).cloned())
    }

    fn add_faq(&self, faq: FaqRecord) -> Result<FaqRecord> {
        faq.validate()?;
        self.faqs()?.push(faq.clone());
        Ok(faq)
    }

    fn update_faq(&self, id: &str, patch: &FaqPatch) -> Result<Option<FaqRecord>> {
        patch.validate()?;
        let mut faqs = self.faqs()?;
        Ok(faqs.iter_mut().find(|f| f.id == id).map(|faq| {
            patch.apply(faq);
            faq.clone()
        }))
    }

    fn delete_faq(&self, id: &str) -> Result<bool> {
        let mut faqs = self.faqs()?;
        let before = faqs.len();
        faqs.retain(|f| f.id != id);
        Ok(faqs.len() < before)
    }

    fn log_query(&self, entry: QueryLogEntry) -> Result<()> {
        self.logs()?.push(entry);
        Ok(())
    }

    fn query_logs(&self) -> Result<Vec<QueryLogEntry>> {
        Ok(self.logs()?.clone())
    }
}

/// First `limit` questions in store order.
pub fn suggested_questions(store: &dyn KnowledgeStore, limit: usize) -> Result<Vec<String>> {
    Ok(store
        .get_all_faqs()?
        .into_iter()
        .take(limit)
        .map(|f| f.question)
        .collect())
}
