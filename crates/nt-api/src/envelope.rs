//! Success response envelope
//!
//! `{status: "success", results?, data}`

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use nt_core::Document;
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Envelope {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<usize>,
    pub data: Value,
}

impl Envelope {
    /// `data` holding named payloads
    pub fn data(data: Value) -> Self {
        Self {
            status: "success",
            results: None,
            data,
        }
    }

    /// `{data: {<name>: doc}}`
    pub fn single(name: &str, doc: Document) -> Self {
        Self::keyed(name, Value::Object(doc))
    }

    /// `{results, data: {<plural>: [..]}}`
    pub fn list(plural: &str, docs: Vec<Document>) -> Self {
        let results = docs.len();
        Self::keyed(plural, Value::Array(docs.into_iter().map(Value::Object).collect()))
            .with_results(results)
    }

    pub fn keyed(key: &str, payload: Value) -> Self {
        let mut data = Map::new();
        data.insert(key.to_string(), payload);
        Self::data(Value::Object(data))
    }

    pub fn with_results(mut self, results: usize) -> Self {
        self.results = Some(results);
        self
    }

    /// Respond with `status` and this envelope as the JSON body
    pub fn with_status(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        self.with_status(StatusCode::OK)
    }
}
