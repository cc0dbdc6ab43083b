//! Resource handler factory
//!
//! Five uniform handlers (list, get one, create, update, delete) generated
//! for any resource. Each performs one storage operation and shapes one
//! response; every failure is returned as an `ApiError`.

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post, MethodRouter},
};
use nt_core::Document;
use nt_db::{populate_all, Collection, Relation};
use nt_queries::{ApiFeatures, DocumentQuery, Filter, Projection, QueryParams};
use serde_json::Value;
use tracing::debug;

use crate::envelope::Envelope;
use crate::error::{ApiError, ApiResult};
use crate::extractors::{JsonBody, RequestQuery, RouteParams};

/// Success status of `update_one`.
///
/// Updates answer 201 rather than 200; clients already depend on it.
pub const UPDATE_STATUS: StatusCode = StatusCode::CREATED;

/// Restricts a nested resource to the children of the parent named in the path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentScope {
    /// Path parameter holding the parent id
    pub param: &'static str,
    /// Child field referencing the parent
    pub field: &'static str,
}

/// Everything the generated handlers need to know about a resource
#[derive(Clone)]
pub struct Resource {
    /// Singular name: envelope key and error wording ("tour")
    pub name: &'static str,
    /// List envelope key ("tours")
    pub plural: &'static str,
    pub collection: Arc<dyn Collection>,
    pub parent: Option<ParentScope>,
    /// Populated on every read
    pub relations: Vec<Relation>,
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.name)
            .field("plural", &self.plural)
            .field("collection", &self.collection.name())
            .field("parent", &self.parent)
            .field("relations", &self.relations)
            .finish()
    }
}

impl Resource {
    pub fn new(name: &'static str, plural: &'static str, collection: Arc<dyn Collection>) -> Self {
        Self {
            name,
            plural,
            collection,
            parent: None,
            relations: Vec::new(),
        }
    }

    pub fn nested_under(mut self, param: &'static str, field: &'static str) -> Self {
        self.parent = Some(ParentScope { param, field });
        self
    }

    pub fn with_relation(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn not_found(&self) -> ApiError {
        ApiError::not_found(self.name)
    }

    /// (child field, parent id) when nested and the path names a parent
    fn parent_filter<'a>(&self, params: &'a RouteParams) -> Option<(&'static str, &'a str)> {
        let scope = self.parent?;
        params.get(scope.param).map(|id| (scope.field, id))
    }

    async fn populate(&self, doc: &mut Document, extra: &[Relation]) -> ApiResult<()> {
        populate_all(&self.relations, doc).await?;
        populate_all(extra, doc).await?;
        Ok(())
    }
}

/// List documents: parent scope, then filter, sort, field selection, pagination
pub async fn list(resource: &Resource, params: &RouteParams, query: QueryParams) -> ApiResult<Response> {
    let mut base = DocumentQuery::all();
    if let Some((field, parent_id)) = resource.parent_filter(params) {
        base = base.and(Filter::eq(field, parent_id));
    }

    let query = ApiFeatures::new(base, query)
        .filter()
        .sort()
        .limit_fields()
        .paginate()
        .into_query();

    let mut docs = resource.collection.find(query).await?;
    for doc in docs.iter_mut() {
        resource.populate(doc, &[]).await?;
    }

    debug!(resource = resource.name, results = docs.len(), "listed");
    Ok(Envelope::list(resource.plural, docs).into_response())
}

/// Fetch one document by the `id` path parameter
pub async fn fetch(resource: &Resource, params: &RouteParams, relations: &[Relation]) -> ApiResult<Response> {
    let id = params.id()?;
    let mut doc = resource
        .collection
        .find_by_id(id, Projection::default())
        .await?
        .ok_or_else(|| resource.not_found())?;
    resource.populate(&mut doc, relations).await?;

    Ok(Envelope::single(resource.name, doc).into_response())
}

/// Create a document from the request body.
///
/// Nested resources take a missing parent reference from the path.
pub async fn insert(resource: &Resource, params: &RouteParams, mut body: Document) -> ApiResult<Response> {
    if let Some((field, parent_id)) = resource.parent_filter(params) {
        if body.get(field).map_or(true, Value::is_null) {
            body.insert(field.to_string(), Value::String(parent_id.to_string()));
        }
    }

    let doc = resource.collection.create(body).await?;
    debug!(resource = resource.name, id = nt_core::document_id(&doc), "created");
    Ok(Envelope::single(resource.name, doc).with_status(StatusCode::CREATED))
}

/// Partially update a document; validators run against the merged result
pub async fn update(resource: &Resource, params: &RouteParams, body: Document) -> ApiResult<Response> {
    let id = params.id()?;
    let mut doc = resource
        .collection
        .find_by_id_and_update(id, body)
        .await?
        .ok_or_else(|| resource.not_found())?;
    resource.populate(&mut doc, &[]).await?;

    Ok(Envelope::single(resource.name, doc).with_status(UPDATE_STATUS))
}

/// Delete a document; 204 with an empty body
pub async fn remove(resource: &Resource, params: &RouteParams) -> ApiResult<Response> {
    let id = params.id()?;
    resource
        .collection
        .find_by_id_and_delete(id)
        .await?
        .ok_or_else(|| resource.not_found())?;

    Ok(StatusCode::NO_CONTENT.into_response())
}

/// GET handler listing `resource`
pub fn get_all<S>(resource: Arc<Resource>) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    get(move |params: RouteParams, RequestQuery(query): RequestQuery| async move {
        list(&resource, &params, query).await
    })
}

/// GET handler for one document, populating `relations` on top of the
/// resource's own
pub fn get_one<S>(resource: Arc<Resource>, relations: Vec<Relation>) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    get(move |params: RouteParams| async move { fetch(&resource, &params, &relations).await })
}

pub fn create_one<S>(resource: Arc<Resource>) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    post(move |params: RouteParams, JsonBody(body): JsonBody| async move {
        insert(&resource, &params, body).await
    })
}

pub fn update_one<S>(resource: Arc<Resource>) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    patch(move |params: RouteParams, JsonBody(body): JsonBody| async move {
        update(&resource, &params, body).await
    })
}

pub fn delete_one<S>(resource: Arc<Resource>) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    delete(move |params: RouteParams| async move { remove(&resource, &params).await })
}
