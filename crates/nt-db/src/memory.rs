//! In-memory collection
//!
//! Documents live in a `Vec` behind a read/write lock. Each operation holds
//! the lock for its whole read-modify-write, so single-document writes are
//! atomic.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use nt_core::{document_id, Document};
use nt_models::Schema;
use nt_queries::{DocumentQuery, Projection};
use parking_lot::RwLock;
use tracing::debug;

use crate::collection::{
    check_id, duplicate_id, find_duplicate, merge_changes, prepare_for_write, present, stamp_new,
    Collection, StoreResult,
};

pub struct MemoryCollection {
    name: &'static str,
    schema: Arc<dyn Schema>,
    documents: RwLock<Vec<Document>>,
}

impl MemoryCollection {
    pub fn new(name: &'static str, schema: Arc<dyn Schema>) -> Self {
        Self {
            name,
            schema,
            documents: RwLock::new(Vec::new()),
        }
    }

    /// Number of stored documents, including ones hidden by the schema
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    /// Position of a visible document
    fn position(&self, documents: &[Document], id: &str) -> Option<usize> {
        let visible = self.schema.base_filter();
        documents
            .iter()
            .position(|doc| document_id(doc) == Some(id) && visible.matches(doc))
    }
}

#[async_trait]
impl Collection for MemoryCollection {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn find(&self, query: DocumentQuery) -> StoreResult<Vec<Document>> {
        let start = Instant::now();
        let projection = query.projection.clone();
        let query = query
            .and_all(self.schema.base_filter())
            .select(Projection::All);

        let matched = query.run(self.documents.read().iter());
        let results: Vec<Document> = matched
            .into_iter()
            .map(|doc| present(self.schema.as_ref(), doc, &projection))
            .collect();

        debug!(
            collection = self.name,
            results = results.len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "find"
        );
        Ok(results)
    }

    async fn find_by_id(&self, id: &str, projection: Projection) -> StoreResult<Option<Document>> {
        check_id(id)?;
        let start = Instant::now();
        let documents = self.documents.read();
        let found = self
            .position(&documents, id)
            .map(|index| present(self.schema.as_ref(), documents[index].clone(), &projection));

        debug!(
            collection = self.name,
            id,
            found = found.is_some(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "find_by_id"
        );
        Ok(found)
    }

    async fn create(&self, mut doc: Document) -> StoreResult<Document> {
        stamp_new(&mut doc)?;
        prepare_for_write(self.schema.as_ref(), &mut doc)?;

        let mut documents = self.documents.write();
        if let Some(id) = document_id(&doc) {
            if documents.iter().any(|other| document_id(other) == Some(id)) {
                return Err(duplicate_id(id));
            }
        }
        if let Some(err) = find_duplicate(self.schema.as_ref(), &doc, documents.iter()) {
            return Err(err);
        }
        documents.push(doc.clone());

        debug!(collection = self.name, id = document_id(&doc), "created");
        Ok(present(self.schema.as_ref(), doc, &Projection::All))
    }

    async fn find_by_id_and_update(&self, id: &str, changes: Document) -> StoreResult<Option<Document>> {
        check_id(id)?;
        let mut documents = self.documents.write();
        let Some(index) = self.position(&documents, id) else {
            return Ok(None);
        };

        let mut merged = merge_changes(&documents[index], changes);
        prepare_for_write(self.schema.as_ref(), &mut merged)?;
        if let Some(err) = find_duplicate(self.schema.as_ref(), &merged, documents.iter()) {
            return Err(err);
        }
        documents[index] = merged.clone();

        debug!(collection = self.name, id, "updated");
        Ok(Some(present(self.schema.as_ref(), merged, &Projection::All)))
    }

    async fn find_by_id_and_delete(&self, id: &str) -> StoreResult<Option<Document>> {
        check_id(id)?;
        let mut documents = self.documents.write();
        let removed = self
            .position(&documents, id)
            .map(|index| documents.remove(index));

        debug!(collection = self.name, id, removed = removed.is_some(), "deleted");
        Ok(removed.map(|doc| present(self.schema.as_ref(), doc, &Projection::All)))
    }
}
