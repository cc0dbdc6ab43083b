//! Relation population
//!
//! Replaces references with the documents they point to, running one extra
//! query per relation against the related collection.

use std::collections::HashMap;
use std::sync::Arc;

use nt_core::{document_id, Document, ID_FIELD, VERSION_FIELD};
use nt_queries::{DocumentQuery, Filter, FilterSet, Projection};
use serde_json::Value;

use crate::collection::{Collection, StoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// Documents of the related collection whose `foreign_field` holds this
    /// document's id (a tour's reviews)
    Virtual { foreign_field: &'static str },
    /// An array of ids replaced by the referenced documents (a tour's guides)
    References,
}

#[derive(Clone)]
pub struct Relation {
    pub path: &'static str,
    pub kind: RelationKind,
    pub collection: Arc<dyn Collection>,
    pub projection: Projection,
}

impl std::fmt::Debug for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relation")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("collection", &self.collection.name())
            .finish()
    }
}

impl Relation {
    pub fn virtual_many(
        path: &'static str,
        collection: Arc<dyn Collection>,
        foreign_field: &'static str,
    ) -> Self {
        Self {
            path,
            kind: RelationKind::Virtual { foreign_field },
            collection,
            projection: Projection::Exclude(vec![VERSION_FIELD.to_string()]),
        }
    }

    pub fn references(path: &'static str, collection: Arc<dyn Collection>) -> Self {
        Self {
            path,
            kind: RelationKind::References,
            collection,
            projection: Projection::Exclude(vec![VERSION_FIELD.to_string()]),
        }
    }

    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    /// Fill `path` on one document
    pub async fn populate(&self, doc: &mut Document) -> StoreResult<()> {
        match self.kind {
            RelationKind::Virtual { foreign_field } => {
                let Some(id) = document_id(doc).map(str::to_string) else {
                    return Ok(());
                };
                let query = DocumentQuery::find(FilterSet::new().with(Filter::eq(foreign_field, id)))
                    .select(self.projection.clone());
                let related = self.collection.find(query).await?;
                doc.insert(
                    self.path.to_string(),
                    Value::Array(related.into_iter().map(Value::Object).collect()),
                );
            }
            RelationKind::References => {
                let Some(Value::Array(ids)) = doc.get(self.path) else {
                    return Ok(());
                };
                let ids: Vec<Value> = ids.iter().filter(|v| v.is_string()).cloned().collect();
                if ids.is_empty() {
                    return Ok(());
                }

                let query = DocumentQuery::find(FilterSet::new().with(Filter::one_of(ID_FIELD, ids.clone())))
                    .select(self.projection.clone());
                let mut by_id: HashMap<String, Document> = self
                    .collection
                    .find(query)
                    .await?
                    .into_iter()
                    .filter_map(|found| document_id(&found).map(str::to_string).map(|id| (id, found)))
                    .collect();

                // keep the referencing order; dangling ids are dropped
                let populated: Vec<Value> = ids
                    .iter()
                    .filter_map(Value::as_str)
                    .filter_map(|id| by_id.remove(id))
                    .map(Value::Object)
                    .collect();
                doc.insert(self.path.to_string(), Value::Array(populated));
            }
        }
        Ok(())
    }
}

/// Populate every relation on one document
pub async fn populate_all(relations: &[Relation], doc: &mut Document) -> StoreResult<()> {
    for relation in relations {
        relation.populate(doc).await?;
    }
    Ok(())
}
