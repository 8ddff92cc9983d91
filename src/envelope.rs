//! Request envelopes and content-shape bookkeeping.

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::record::Record;

/// Default chunk size for streaming submission.
pub const DEFAULT_BATCH_SIZE: usize = 1;

/// Whether the caller supplied structured records or plain values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeMode {
    Structured,
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Single,
    List,
}

/// Client-side bookkeeping of the caller's input shape, consumed by the
/// result unboxers to mirror it on the way out. Never transmitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentShape {
    pub mode: ShapeMode,
    pub cardinality: Cardinality,
}

impl ContentShape {
    /// Structured-record mode; cardinality is single regardless of count.
    pub fn structured() -> Self {
        Self {
            mode: ShapeMode::Structured,
            cardinality: Cardinality::Single,
        }
    }

    pub fn plain_single() -> Self {
        Self {
            mode: ShapeMode::Plain,
            cardinality: Cardinality::Single,
        }
    }

    pub fn plain_list() -> Self {
        Self {
            mode: ShapeMode::Plain,
            cardinality: Cardinality::List,
        }
    }

    pub fn plain(is_list: bool) -> Self {
        if is_list {
            Self::plain_list()
        } else {
            Self::plain_single()
        }
    }

    pub fn is_structured(&self) -> bool {
        self.mode == ShapeMode::Structured
    }
}

/// One logical request against a task endpoint.
#[derive(Debug, Clone)]
pub struct RequestEnvelope {
    /// Task route, e.g. `/encode`.
    pub endpoint: String,
    pub records: Vec<Record>,
    /// Declared record count; retained for logging and progress.
    pub total_count: Option<usize>,
    /// Chunk size for streaming submission.
    pub batch_size: usize,
    /// Ask the service to keep response order aligned with input order.
    pub results_in_order: bool,
    pub auth_token: Option<String>,
    /// Correlation id attached as a request header.
    pub request_id: Uuid,
    /// Task-specific option mapping.
    pub parameters: Map<String, Value>,
}

impl RequestEnvelope {
    pub fn new(endpoint: impl Into<String>, auth_token: Option<&str>) -> Self {
        let mut parameters = Map::new();
        // Echoed inputs do not need to carry image bytes back.
        parameters.insert("drop_image_content".to_string(), Value::Bool(true));
        Self {
            endpoint: endpoint.into(),
            records: Vec::new(),
            total_count: None,
            batch_size: DEFAULT_BATCH_SIZE,
            results_in_order: false,
            auth_token: auth_token.map(str::to_string),
            request_id: Uuid::new_v4(),
            parameters,
        }
    }

    pub fn with_records(mut self, records: Vec<Record>) -> Self {
        self.total_count = Some(records.len());
        self.records = records;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_results_in_order(mut self, in_order: bool) -> Self {
        self.results_in_order = in_order;
        self
    }

    /// Merge caller parameters over the defaults.
    pub fn with_parameters(mut self, parameters: Map<String, Value>) -> Self {
        for (key, value) in parameters {
            self.parameters.insert(key, value);
        }
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_drop_image_content() {
        let envelope = RequestEnvelope::new("/encode", Some("tok"));
        assert_eq!(
            envelope.parameters.get("drop_image_content"),
            Some(&Value::Bool(true))
        );
        assert_eq!(envelope.batch_size, DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn caller_parameters_win() {
        let mut params = Map::new();
        params.insert("drop_image_content".into(), Value::Bool(false));
        params.insert("steps".into(), Value::from(20));
        let envelope = RequestEnvelope::new("/upscale", None).with_parameters(params);
        assert_eq!(
            envelope.parameters.get("drop_image_content"),
            Some(&Value::Bool(false))
        );
        assert_eq!(envelope.parameters.get("steps"), Some(&Value::from(20)));
    }

    #[test]
    fn record_count_is_tracked() {
        let envelope = RequestEnvelope::new("/caption", None)
            .with_records(vec![Record::text("a"), Record::text("b")]);
        assert_eq!(envelope.total_count, Some(2));
    }
}
