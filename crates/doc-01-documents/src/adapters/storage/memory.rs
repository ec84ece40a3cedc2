use crate::ports::outbound::{DocumentRepository, RepositoryError};
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{Document, Validation};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Default)]
struct Inner {
    /// `documentId` -> (insertion sequence, document)
    documents: HashMap<String, (u64, Document)>,
    next_seq: u64,
}

/// In-memory document store.
///
/// Key uniqueness is enforced under the write lock. `replace` keeps the
/// original insertion position even when the `documentId` changes.
#[derive(Default)]
pub struct InMemoryDocumentRepository {
    inner: RwLock<Inner>,
    unavailable: AtomicBool,
}

impl InMemoryDocumentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation fail with a backend error (tests).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.inner.read().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check(&self) -> Result<(), RepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::Backend("in-memory store offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentRepository for InMemoryDocumentRepository {
    async fn insert(&self, document: Document) -> Result<Document, RepositoryError> {
        self.check()?;
        let mut inner = self.inner.write();
        if inner.documents.contains_key(&document.document_id) {
            return Err(RepositoryError::Duplicate(document.document_id));
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner
            .documents
            .insert(document.document_id.clone(), (seq, document.clone()));
        Ok(document)
    }

    async fn find_all(&self) -> Result<Vec<Document>, RepositoryError> {
        self.check()?;
        let inner = self.inner.read();
        let mut entries: Vec<&(u64, Document)> = inner.documents.values().collect();
        entries.sort_by_key(|(seq, _)| *seq);
        Ok(entries.into_iter().map(|(_, doc)| doc.clone()).collect())
    }

    async fn find_by_id(&self, document_id: &str) -> Result<Option<Document>, RepositoryError> {
        self.check()?;
        Ok(self
            .inner
            .read()
            .documents
            .get(document_id)
            .map(|(_, doc)| doc.clone()))
    }

    async fn replace(
        &self,
        document_id: &str,
        document: Document,
    ) -> Result<Document, RepositoryError> {
        self.check()?;
        let mut inner = self.inner.write();
        let Some((seq, _)) = inner.documents.get(document_id) else {
            return Err(RepositoryError::NotFound(document_id.to_string()));
        };
        let seq = *seq;
        if document.document_id != document_id && inner.documents.contains_key(&document.document_id)
        {
            return Err(RepositoryError::Duplicate(document.document_id));
        }
        inner.documents.remove(document_id);
        inner
            .documents
            .insert(document.document_id.clone(), (seq, document.clone()));
        Ok(document)
    }

    async fn record_validation(
        &self,
        document_id: &str,
        validation: Validation,
    ) -> Result<(), RepositoryError> {
        self.check()?;
        let mut inner = self.inner.write();
        match inner.documents.get_mut(document_id) {
            Some((_, doc)) => {
                doc.validation = Some(validation);
                Ok(())
            }
            None => Err(RepositoryError::NotFound(document_id.to_string())),
        }
    }

    async fn remove(&self, document_id: &str) -> Result<(), RepositoryError> {
        self.check()?;
        match self.inner.write().documents.remove(document_id) {
            Some(_) => Ok(()),
            None => Err(RepositoryError::NotFound(document_id.to_string())),
        }
    }
}
