//! PostgreSQL collection
//!
//! Documents are stored whole in a JSONB column. Filters and sorts are
//! translated to SQL over `body #> path`; field paths and values are always
//! bound, never spliced into the statement. Only the unique index DDL names
//! fields, and those come from the schema.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use nt_core::{document_id, path_segments, Document};
use nt_models::Schema;
use nt_queries::{DocumentQuery, Filter, FilterOperator, FilterSet, Projection, SortDirection, SortOrder};
use serde_json::Value;
use sqlx::{Executor, PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::debug;

use crate::collection::{
    check_id, duplicate_id, merge_changes, prepare_for_write, present, stamp_new, Collection,
    StoreError, StoreResult,
};

pub struct PgCollection {
    name: &'static str,
    schema: Arc<dyn Schema>,
    pool: PgPool,
}

impl PgCollection {
    fn new(name: &'static str, schema: Arc<dyn Schema>, pool: PgPool) -> Self {
        Self { name, schema, pool }
    }

    /// `SELECT body ... WHERE collection = $1` with the schema's base filter applied
    fn select(&self) -> QueryBuilder<'static, Postgres> {
        let mut builder = QueryBuilder::new("SELECT body FROM documents WHERE collection = ");
        builder.push_bind(self.name);
        push_filters(&mut builder, &self.schema.base_filter());
        builder
    }

    fn select_by_id(&self, id: &str) -> QueryBuilder<'static, Postgres> {
        let mut builder = self.select();
        builder.push(" AND id = ");
        builder.push_bind(id.to_string());
        builder
    }

    /// Open a collection and create the unique indexes its schema asks for
    pub async fn open(name: &'static str, schema: Arc<dyn Schema>, pool: PgPool) -> StoreResult<Self> {
        let collection = Self::new(name, schema, pool);
        for field in collection.schema.unique_fields() {
            collection.pool.execute(unique_index_sql(name, field)?.as_str()).await?;
        }
        debug!(collection = name, unique = ?collection.schema.unique_fields(), "collection ready");
        Ok(collection)
    }

    /// Reject the document when one of its unique values is already taken.
    ///
    /// Runs on the writing connection; the unique indexes settle races
    /// between concurrent writers.
    async fn check_unique(&self, conn: &mut PgConnection, doc: &Document) -> StoreResult<()> {
        let own_id = document_id(doc).unwrap_or_default().to_string();
        for field in self.schema.unique_fields() {
            let Some(value) = doc.get(*field).filter(|v| !v.is_null()) else {
                continue;
            };
            let taken: bool = sqlx::query_scalar(
                "SELECT EXISTS (SELECT 1 FROM documents \
                 WHERE collection = $1 AND body -> $2 = $3 AND id <> $4)",
            )
            .bind(self.name)
            .bind(*field)
            .bind(value.clone())
            .bind(&own_id)
            .fetch_one(&mut *conn)
            .await?;

            if taken {
                return Err(StoreError::DuplicateKey {
                    field: field.to_string(),
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Translate a failed write; unique violations name the clashing field
    fn write_error(&self, err: sqlx::Error, doc: &Document) -> StoreError {
        let sqlx::Error::Database(db) = &err else {
            return StoreError::from(err);
        };
        if !db.is_unique_violation() {
            return StoreError::from(err);
        }

        let constraint = db.constraint().unwrap_or_default();
        let clash = self
            .schema
            .unique_fields()
            .iter()
            .find(|field| unique_index_name(self.name, field) == constraint);
        match (clash, document_id(doc)) {
            (Some(field), _) => StoreError::DuplicateKey {
                field: field.to_string(),
                value: doc.get(*field).map(Value::to_string).unwrap_or_default(),
            },
            (None, Some(id)) => duplicate_id(id),
            (None, None) => StoreError::from(err),
        }
    }
}

#[async_trait]
impl Collection for PgCollection {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn find(&self, query: DocumentQuery) -> StoreResult<Vec<Document>> {
        let start = Instant::now();
        let mut builder = self.select();
        push_filters(&mut builder, &query.filter);
        push_order(&mut builder, &query.sort);
        builder.push(" OFFSET ");
        builder.push_bind(to_i64(query.skip));
        if let Some(limit) = query.limit {
            builder.push(" LIMIT ");
            builder.push_bind(to_i64(limit));
        }

        let rows: Vec<Value> = builder.build_query_scalar().fetch_all(&self.pool).await?;
        let results = rows
            .into_iter()
            .map(|row| into_document(row).map(|doc| present(self.schema.as_ref(), doc, &query.projection)))
            .collect::<StoreResult<Vec<_>>>()?;

        debug!(
            collection = self.name,
            results = results.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "find"
        );
        Ok(results)
    }

    async fn find_by_id(&self, id: &str, projection: Projection) -> StoreResult<Option<Document>> {
        check_id(id)?;
        let start = Instant::now();
        let row: Option<Value> = self
            .select_by_id(id)
            .build_query_scalar()
            .fetch_optional(&self.pool)
            .await?;

        debug!(
            collection = self.name,
            id,
            found = row.is_some(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "find_by_id"
        );
        row.map(|body| into_document(body).map(|doc| present(self.schema.as_ref(), doc, &projection)))
            .transpose()
    }

    async fn create(&self, mut doc: Document) -> StoreResult<Document> {
        stamp_new(&mut doc)?;
        prepare_for_write(self.schema.as_ref(), &mut doc)?;

        let mut conn = self.pool.acquire().await?;
        self.check_unique(&mut *conn, &doc).await?;

        let id = document_id(&doc).unwrap_or_default().to_string();
        sqlx::query("INSERT INTO documents (collection, id, body, created_at) VALUES ($1, $2, $3, $4)")
            .bind(self.name)
            .bind(&id)
            .bind(Value::Object(doc.clone()))
            .bind(Utc::now())
            .execute(&mut *conn)
            .await
            .map_err(|err| self.write_error(err, &doc))?;

        debug!(collection = self.name, id = %id, "created");
        Ok(present(self.schema.as_ref(), doc, &Projection::All))
    }

    async fn find_by_id_and_update(&self, id: &str, changes: Document) -> StoreResult<Option<Document>> {
        check_id(id)?;
        let mut tx = self.pool.begin().await?;

        let mut builder = self.select_by_id(id);
        builder.push(" FOR UPDATE");
        let row: Option<Value> = builder.build_query_scalar().fetch_optional(&mut *tx).await?;
        let Some(stored) = row.map(into_document).transpose()? else {
            return Ok(None);
        };

        let mut merged = merge_changes(&stored, changes);
        prepare_for_write(self.schema.as_ref(), &mut merged)?;
        self.check_unique(&mut *tx, &merged).await?;

        sqlx::query("UPDATE documents SET body = $1 WHERE collection = $2 AND id = $3")
            .bind(Value::Object(merged.clone()))
            .bind(self.name)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|err| self.write_error(err, &merged))?;
        tx.commit().await?;

        debug!(collection = self.name, id, "updated");
        Ok(Some(present(self.schema.as_ref(), merged, &Projection::All)))
    }

    async fn find_by_id_and_delete(&self, id: &str) -> StoreResult<Option<Document>> {
        check_id(id)?;
        let mut builder = QueryBuilder::new("DELETE FROM documents WHERE collection = ");
        builder.push_bind(self.name);
        builder.push(" AND id = ");
        builder.push_bind(id.to_string());
        push_filters(&mut builder, &self.schema.base_filter());
        builder.push(" RETURNING body");

        let row: Option<Value> = builder.build_query_scalar().fetch_optional(&self.pool).await?;
        debug!(collection = self.name, id, removed = row.is_some(), "deleted");
        row.map(|body| into_document(body).map(|doc| present(self.schema.as_ref(), doc, &Projection::All)))
            .transpose()
    }
}

fn into_document(body: Value) -> StoreResult<Document> {
    match body {
        Value::Object(doc) => Ok(doc),
        other => Err(StoreError::Serialization(format!(
            "stored body is not an object: {}",
            other
        ))),
    }
}

/// Name of the unique index over `field` of `collection`
fn unique_index_name(collection: &str, field: &str) -> String {
    format!("documents_{}_{}_key", collection, field)
}

/// Partial unique index over one top-level field of one collection.
///
/// Names come from code, never from requests, but are still restricted to
/// identifier characters since they are spliced into DDL.
fn unique_index_sql(collection: &str, field: &str) -> StoreResult<String> {
    let is_identifier = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !is_identifier(collection) || !is_identifier(field) {
        return Err(StoreError::Database(format!(
            "cannot index {}.{}: not a plain identifier",
            collection, field
        )));
    }
    Ok(format!(
        "CREATE UNIQUE INDEX IF NOT EXISTS {index} ON documents ((body -> '{field}')) \
         WHERE collection = '{collection}' AND jsonb_typeof(body -> '{field}') <> 'null'",
        index = unique_index_name(collection, field),
        field = field,
        collection = collection,
    ))
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn path_of(field: &str) -> Vec<String> {
    path_segments(field).into_iter().map(str::to_string).collect()
}

/// Text form used to compare against `body #>> path`
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn push_json(builder: &mut QueryBuilder<'static, Postgres>, path: &[String]) {
    builder.push("(body #> ");
    builder.push_bind(path.to_vec());
    builder.push("::text[])");
}

fn push_text(builder: &mut QueryBuilder<'static, Postgres>, path: &[String]) {
    builder.push("(body #>> ");
    builder.push_bind(path.to_vec());
    builder.push("::text[])");
}

fn push_filters(builder: &mut QueryBuilder<'static, Postgres>, filters: &FilterSet) {
    for filter in filters.filters() {
        builder.push(" AND ");
        push_filter(builder, filter);
    }
}

fn push_filter(builder: &mut QueryBuilder<'static, Postgres>, filter: &Filter) {
    let path = path_of(&filter.field);
    match filter.operator {
        FilterOperator::Eq => push_equals(builder, &path, &filter.value),
        FilterOperator::Ne => {
            builder.push("NOT COALESCE(");
            push_equals(builder, &path, &filter.value);
            builder.push(", FALSE)");
        }
        FilterOperator::In => {
            let options = filter.value.as_array().cloned().unwrap_or_default();
            if options.is_empty() {
                builder.push("FALSE");
                return;
            }
            builder.push("(");
            for (i, option) in options.iter().enumerate() {
                if i > 0 {
                    builder.push(" OR ");
                }
                push_equals(builder, &path, option);
            }
            builder.push(")");
        }
        op => push_comparison(builder, &path, op, &filter.value),
    }
}

/// Equality on the text form; array fields match when any element does
fn push_equals(builder: &mut QueryBuilder<'static, Postgres>, path: &[String], value: &Value) {
    if value.is_null() {
        builder.push("(");
        push_json(builder, path);
        builder.push(" IS NULL OR jsonb_typeof(");
        push_json(builder, path);
        builder.push(") = 'null')");
        return;
    }

    let text = value_text(value);
    builder.push("(CASE WHEN jsonb_typeof(");
    push_json(builder, path);
    builder.push(") = 'array' THEN EXISTS (SELECT 1 FROM jsonb_array_elements_text(");
    push_json(builder, path);
    builder.push(") AS e(element) WHERE element = ");
    builder.push_bind(text.clone());
    builder.push(") ELSE ");
    push_text(builder, path);
    builder.push(" = ");
    builder.push_bind(text);
    builder.push(" END)");
}

/// Numbers compare numerically, strings lexically, other types never match
fn push_comparison(
    builder: &mut QueryBuilder<'static, Postgres>,
    path: &[String],
    operator: FilterOperator,
    value: &Value,
) {
    let sql_operator = match operator {
        FilterOperator::Gt => " > ",
        FilterOperator::Gte => " >= ",
        FilterOperator::Lt => " < ",
        _ => " <= ",
    };
    let text = value_text(value);

    builder.push("(CASE jsonb_typeof(");
    push_json(builder, path);
    builder.push(")");
    if let Ok(number) = text.trim().parse::<f64>() {
        builder.push(" WHEN 'number' THEN ");
        push_text(builder, path);
        builder.push("::float8");
        builder.push(sql_operator);
        builder.push_bind(number);
    }
    builder.push(" WHEN 'string' THEN ");
    push_text(builder, path);
    builder.push(sql_operator);
    builder.push_bind(text);
    builder.push(" ELSE FALSE END)");
}

/// Missing values sort first ascending; `id` breaks ties
fn push_order(builder: &mut QueryBuilder<'static, Postgres>, sort: &SortOrder) {
    builder.push(" ORDER BY ");
    for criterion in sort.criteria() {
        push_json(builder, &path_of(&criterion.field));
        builder.push(match criterion.direction {
            SortDirection::Asc => " ASC NULLS FIRST, ",
            SortDirection::Desc => " DESC NULLS LAST, ",
        });
    }
    builder.push("id ASC");
}

#[cfg(test)]
mod tests {
    use super::*;
    use nt_queries::QueryParams;
    use serde_json::json;

    fn sql_for(filters: &FilterSet) -> String {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT body FROM documents WHERE TRUE");
        push_filters(&mut builder, filters);
        builder.sql().to_string()
    }

    #[test]
    fn test_values_are_bound() {
        let set = FilterSet::from_params(&QueryParams::parse("name=x'; DROP TABLE documents; --&price[gte]=500"));
        let sql = sql_for(&set);
        assert!(!sql.contains("DROP TABLE"));
        assert!(!sql.contains("500"));
        assert!(sql.contains("::float8 >= $"));
    }

    #[test]
    fn test_non_numeric_comparison_skips_number_branch() {
        let set = FilterSet::new().with(Filter::new("name", FilterOperator::Lt, json!("M")));
        let sql = sql_for(&set);
        assert!(!sql.contains("'number'"));
        assert!(sql.contains("WHEN 'string'"));
    }

    #[test]
    fn test_ne_is_null_safe() {
        let sql = sql_for(&FilterSet::new().with(Filter::ne("secretTour", true)));
        assert!(sql.starts_with("SELECT body FROM documents WHERE TRUE AND NOT COALESCE("));
    }

    #[test]
    fn test_empty_membership_matches_nothing() {
        let sql = sql_for(&FilterSet::new().with(Filter::one_of("duration", vec![])));
        assert!(sql.ends_with("AND FALSE"));
    }

    #[test]
    fn test_order_always_ends_with_id() {
        let mut builder = QueryBuilder::<Postgres>::new("");
        push_order(&mut builder, &SortOrder::parse("-ratingsAverage,price"));
        let sql = builder.sql().to_string();
        assert!(sql.contains("DESC NULLS LAST"));
        assert!(sql.contains("ASC NULLS FIRST"));
        assert!(sql.ends_with("id ASC"));

        let mut builder = QueryBuilder::<Postgres>::new("");
        push_order(&mut builder, &SortOrder::new());
        assert_eq!(builder.sql(), " ORDER BY id ASC");
    }

    #[test]
    fn test_unique_index_is_partial_per_collection() {
        let sql = unique_index_sql("tours", "name").unwrap();
        assert!(sql.starts_with("CREATE UNIQUE INDEX IF NOT EXISTS documents_tours_name_key"));
        assert!(sql.contains("((body -> 'name'))"));
        assert!(sql.contains("WHERE collection = 'tours'"));
        assert!(sql.contains("<> 'null'"));

        assert!(unique_index_sql("tours", "name') OR ('1").is_err());
        assert!(unique_index_sql("", "email").is_err());
    }

    #[test]
    fn test_into_document() {
        assert!(into_document(json!({ "a": 1 })).is_ok());
        assert!(matches!(into_document(json!([1])), Err(StoreError::Serialization(_))));
    }

    mod live {
        //! Run against a real server with
        //! `TEST_DATABASE_URL=postgres://... cargo test -p nt-db live`.

        use super::*;
        use crate::pool::Database;
        use nt_core::config::DatabaseConfig;
        use nt_models::TourSchema;
        use nt_queries::ApiFeatures;

        async fn connect(pool_size: u32) -> Option<PgPool> {
            let url = std::env::var("TEST_DATABASE_URL").ok()?;
            let config = DatabaseConfig {
                url: Some(url),
                pool_size,
                pool_timeout_seconds: 5,
            };
            let db = Database::connect(&config).await.unwrap();
            db.migrate().await.unwrap();
            Some(db.pool().clone())
        }

        async fn fresh(name: &'static str, pool: PgPool) -> PgCollection {
            sqlx::query("DELETE FROM documents WHERE collection = $1")
                .bind(name)
                .execute(&pool)
                .await
                .unwrap();
            PgCollection::open(name, Arc::new(TourSchema), pool).await.unwrap()
        }

        fn tour(name: &str, price: u64) -> Document {
            json!({
                "name": name,
                "duration": 5,
                "maxGroupSize": 25,
                "difficulty": "easy",
                "price": price,
                "summary": "Breathtaking hike through the Canadian Banff National Park"
            })
            .as_object()
            .cloned()
            .unwrap()
        }

        #[tokio::test]
        async fn test_round_trip_on_a_single_connection() {
            let Some(pool) = connect(1).await else {
                return;
            };
            let tours = fresh("live_round_trip", pool).await;

            let hiker = tours.create(tour("The Forest Hiker", 397)).await.unwrap();
            tours.create(tour("The Sea Explorer", 497)).await.unwrap();
            tours.create(tour("The Snow Adventurer", 997)).await.unwrap();

            let duplicate = tours.create(tour("The Forest Hiker", 1)).await;
            assert!(matches!(duplicate, Err(StoreError::DuplicateKey { ref field, .. }) if field == "name"));

            let query = ApiFeatures::new(
                DocumentQuery::all(),
                QueryParams::parse("price%5Bgte%5D=450&sort=-price&fields=name,price"),
            )
            .filter()
            .sort()
            .limit_fields()
            .paginate()
            .into_query();
            let names: Vec<Value> = tours
                .find(query)
                .await
                .unwrap()
                .iter()
                .map(|doc| doc["name"].clone())
                .collect();
            assert_eq!(names, vec![json!("The Snow Adventurer"), json!("The Sea Explorer")]);

            let id = document_id(&hiker).unwrap().to_string();
            let mut changes = Document::new();
            changes.insert("price".into(), json!(497));
            let updated = tours.find_by_id_and_update(&id, changes).await.unwrap().unwrap();
            assert_eq!(updated["price"], json!(497));
            assert_eq!(updated["__v"], json!(1));

            let mut rename = Document::new();
            rename.insert("name".into(), json!("The Sea Explorer"));
            assert!(matches!(
                tours.find_by_id_and_update(&id, rename).await,
                Err(StoreError::DuplicateKey { .. })
            ));

            let found = tours.find_by_id(&id, Projection::default()).await.unwrap().unwrap();
            assert_eq!(found["name"], json!("The Forest Hiker"));
            assert!(found.get("__v").is_none());

            assert!(tours.find_by_id_and_delete(&id).await.unwrap().is_some());
            assert!(tours.find_by_id(&id, Projection::All).await.unwrap().is_none());
        }

        #[tokio::test]
        async fn test_concurrent_creates_keep_names_unique() {
            let Some(pool) = connect(4).await else {
                return;
            };
            let tours = fresh("live_concurrent", pool).await;

            let (a, b) = tokio::join!(
                tours.create(tour("The City Wanderer", 1197)),
                tours.create(tour("The City Wanderer", 1197)),
            );
            assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
            let failure = if a.is_err() { a } else { b };
            assert!(matches!(failure, Err(StoreError::DuplicateKey { ref field, .. }) if field == "name"));
        }
    }
}
