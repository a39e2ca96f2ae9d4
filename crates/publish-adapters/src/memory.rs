//! Stores en memoria para tests y modo offline.
//!
//! Ambos admiten inyección de fallos (cola de errores que consumen las
//! siguientes llamadas). `InMemoryVersionedStore` además puede simular un
//! escritor concurrente que cambia el archivo justo antes de la próxima
//! escritura condicional, y registra cada commit aceptado.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use publish_core::hashing::hash_str;
use publish_core::CoreEngineError;
use publish_domain::{Draft, DraftStatus, VersionToken};

use crate::ports::{DraftStore, VersionedStore, WriteReceipt};

fn locked<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Cola de fallos programados.
#[derive(Default)]
struct Faults(Mutex<VecDeque<CoreEngineError>>);

impl Faults {
    fn push(&self, times: usize, error: CoreEngineError) {
        let mut q = locked(&self.0);
        for _ in 0..times {
            q.push_back(error.clone());
        }
    }

    fn take(&self) -> Result<(), CoreEngineError> {
        match locked(&self.0).pop_front() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct InMemoryDraftStore {
    drafts: DashMap<String, Draft>,
    fetch_faults: Faults,
    update_faults: Faults,
    fetch_calls: AtomicU32,
    update_calls: AtomicU32,
}

impl InMemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_drafts(drafts: impl IntoIterator<Item = Draft>) -> Self {
        let store = Self::default();
        for d in drafts {
            store.insert(d);
        }
        store
    }

    /// Inserta o reemplaza (simula una edición del editor).
    pub fn insert(&self, draft: Draft) {
        self.drafts.insert(draft.id.clone(), draft);
    }

    pub fn get(&self, draft_id: &str) -> Option<Draft> {
        self.drafts.get(draft_id).map(|d| d.clone())
    }

    pub fn fail_next_fetches(&self, times: usize, error: CoreEngineError) {
        self.fetch_faults.push(times, error);
    }

    pub fn fail_next_updates(&self, times: usize, error: CoreEngineError) {
        self.update_faults.push(times, error);
    }

    pub fn fetch_calls(&self) -> u32 {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> u32 {
        self.update_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DraftStore for InMemoryDraftStore {
    async fn fetch_draft(&self, draft_id: &str) -> Result<Draft, CoreEngineError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.fetch_faults.take()?;
        self.get(draft_id)
            .ok_or_else(|| CoreEngineError::NotFound(format!("draft {draft_id}")))
    }

    async fn update_status(&self,
                           draft_id: &str,
                           status: DraftStatus,
                           published_at: Option<i64>)
                           -> Result<(), CoreEngineError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.update_faults.take()?;
        let mut draft = self.drafts
                            .get_mut(draft_id)
                            .ok_or_else(|| CoreEngineError::NotFound(format!("draft {draft_id}")))?;
        draft.status = status;
        if published_at.is_some() {
            draft.published_at = published_at;
        }
        Ok(())
    }
}

/// Commit aceptado por `InMemoryVersionedStore`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub path: String,
    pub message: String,
    pub content: String,
    pub prior: Option<VersionToken>,
    pub version: VersionToken,
}

#[derive(Debug, Clone)]
struct StoredFile {
    content: String,
    version: VersionToken,
}

#[derive(Default)]
pub struct InMemoryVersionedStore {
    files: DashMap<String, StoredFile>,
    commits: Mutex<Vec<CommitRecord>>,
    read_faults: Faults,
    write_faults: Faults,
    races: Mutex<VecDeque<(String, String)>>,
}

impl InMemoryVersionedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token del contenido (direccionado por contenido, como un blob git).
    pub fn token_for(content: &str) -> VersionToken {
        VersionToken::new(hash_str(content))
    }

    /// Coloca un archivo sin registrar commit (estado previo del repo).
    pub fn seed(&self, path: &str, content: &str) -> VersionToken {
        let version = Self::token_for(content);
        self.files.insert(path.to_string(),
                          StoredFile { content: content.to_string(),
                                       version: version.clone() });
        version
    }

    pub fn content_of(&self, path: &str) -> Option<String> {
        self.files.get(path).map(|f| f.content.clone())
    }

    pub fn version_of(&self, path: &str) -> Option<VersionToken> {
        self.files.get(path).map(|f| f.version.clone())
    }

    pub fn commits(&self) -> Vec<CommitRecord> {
        locked(&self.commits).clone()
    }

    pub fn commit_count(&self) -> usize {
        locked(&self.commits).len()
    }

    pub fn fail_next_reads(&self, times: usize, error: CoreEngineError) {
        self.read_faults.push(times, error);
    }

    pub fn fail_next_writes(&self, times: usize, error: CoreEngineError) {
        self.write_faults.push(times, error);
    }

    /// Simula que otro escritor deja `content` en `path` justo antes de la
    /// próxima escritura, invalidando el token que leyó el step.
    pub fn race_next_write(&self, path: &str, content: &str) {
        locked(&self.races).push_back((path.to_string(), content.to_string()));
    }

    fn apply_pending_race(&self) {
        let race = locked(&self.races).pop_front();
        if let Some((path, content)) = race {
            self.seed(&path, &content);
        }
    }
}

#[async_trait]
impl VersionedStore for InMemoryVersionedStore {
    async fn read_version(&self, path: &str) -> Result<Option<VersionToken>, CoreEngineError> {
        self.read_faults.take()?;
        Ok(self.version_of(path))
    }

    async fn write(&self,
                   path: &str,
                   content: &str,
                   message: &str,
                   expected: Option<&VersionToken>)
                   -> Result<WriteReceipt, CoreEngineError> {
        self.write_faults.take()?;
        self.apply_pending_race();
        let version = Self::token_for(content);
        let stored = StoredFile { content: content.to_string(),
                                  version: version.clone() };
        // El entry retiene el lock del shard: comparar y escribir es atómico.
        let prior = match self.files.entry(path.to_string()) {
            Entry::Vacant(slot) => {
                if let Some(token) = expected {
                    return Err(CoreEngineError::Conflict(format!("{path}: expected {token}, found absent")));
                }
                slot.insert(stored);
                None
            }
            Entry::Occupied(mut slot) => {
                let current = slot.get().version.clone();
                if expected != Some(&current) {
                    return Err(CoreEngineError::Conflict(format!("{path}: stale token, current {current}")));
                }
                slot.insert(stored);
                Some(current)
            }
        };
        let mut commits = locked(&self.commits);
        commits.push(CommitRecord { path: path.to_string(),
                                    message: message.to_string(),
                                    content: content.to_string(),
                                    prior,
                                    version: version.clone() });
        Ok(WriteReceipt { version,
                          commit_id: Some(format!("mem-{}", commits.len())) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn conditional_write_semantics() {
        let store = InMemoryVersionedStore::new();
        let v1 = store.write("p.md", "a", "m", None).await.unwrap().version;
        assert!(matches!(store.write("p.md", "b", "m", None).await, Err(CoreEngineError::Conflict(_))));
        let v2 = store.write("p.md", "b", "m", Some(&v1)).await.unwrap().version;
        assert_eq!(store.version_of("p.md"), Some(v2));
        assert_eq!(store.commit_count(), 2);
        assert_eq!(store.commits()[1].prior, Some(v1));
    }

    #[tokio::test]
    async fn injected_race_invalidates_read_token() {
        let store = InMemoryVersionedStore::new();
        let read = store.read_version("p.md").await.unwrap();
        store.race_next_write("p.md", "theirs");
        let err = store.write("p.md", "ours", "m", read.as_ref()).await.unwrap_err();
        assert!(matches!(err, CoreEngineError::Conflict(_)));
        assert_eq!(store.content_of("p.md").as_deref(), Some("theirs"));
        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test]
    async fn draft_store_faults_are_consumed_in_order() {
        let store = InMemoryDraftStore::new();
        store.fail_next_fetches(1, CoreEngineError::TransientIo("reset".into()));
        assert!(matches!(store.fetch_draft("d1").await, Err(CoreEngineError::TransientIo(_))));
        assert!(matches!(store.fetch_draft("d1").await, Err(CoreEngineError::NotFound(_))));
        assert_eq!(store.fetch_calls(), 2);
    }
}
