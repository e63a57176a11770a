//! Per-task execution context.
//!
//! Every executor call receives an `ExecutionContext`: the execution id, the
//! input payload, a read-only snapshot of the results of the task's completed
//! prerequisites, and (inside a Loop) the current item. The context also
//! carries the validated task graph so containers can look up their sub-tasks.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value, json};
use uuid::Uuid;

use super::expression::{Expression, ExpressionError};
use super::graph::TaskGraph;

/// Read-only view handed to every task executor.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    execution_id: Uuid,
    input: Value,
    results: BTreeMap<String, Value>,
    item: Option<(usize, Value)>,
    graph: Arc<TaskGraph>,
}

impl ExecutionContext {
    pub fn new(
        execution_id: Uuid,
        input: Value,
        results: BTreeMap<String, Value>,
        graph: Arc<TaskGraph>,
    ) -> Self {
        Self {
            execution_id,
            input,
            results,
            item: None,
            graph,
        }
    }

    pub fn execution_id(&self) -> Uuid {
        self.execution_id
    }

    /// The input payload of this task.
    pub fn input(&self) -> &Value {
        &self.input
    }

    /// Results of completed prerequisites, keyed by task id.
    pub fn results(&self) -> &BTreeMap<String, Value> {
        &self.results
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// Index of the Loop iteration this context belongs to.
    pub fn item_index(&self) -> Option<usize> {
        self.item.as_ref().map(|(index, _)| *index)
    }

    /// Context for one Loop iteration: the input gains `item` and `index`.
    ///
    /// Object inputs are extended in place; any other input is kept under
    /// `value`.
    pub fn for_item(&self, index: usize, item: Value) -> Self {
        let mut input = match &self.input {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other.clone());
                map
            }
        };
        input.insert("item".to_string(), item.clone());
        input.insert("index".to_string(), json!(index));

        Self {
            execution_id: self.execution_id,
            input: Value::Object(input),
            results: self.results.clone(),
            item: Some((index, item)),
            graph: Arc::clone(&self.graph),
        }
    }

    /// The JSON scope expressions are evaluated against:
    /// `{input, results, item?, index?}`.
    pub fn scope(&self) -> Value {
        let mut scope = Map::new();
        scope.insert("input".to_string(), self.input.clone());
        scope.insert(
            "results".to_string(),
            Value::Object(self.results.clone().into_iter().collect()),
        );
        if let Some((index, item)) = &self.item {
            scope.insert("item".to_string(), item.clone());
            scope.insert("index".to_string(), json!(index));
        }
        Value::Object(scope)
    }

    /// Resolve a field path (`text`, `input.records`, `results.fetch.body`)
    /// against this context. Missing fields resolve to `None`.
    pub fn lookup(&self, path: &str) -> Result<Option<Value>, ExpressionError> {
        let value = Expression::parse(path)?.evaluate(&self.scope())?;
        Ok((!value.is_null()).then_some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(input: Value) -> ExecutionContext {
        let mut results = BTreeMap::new();
        results.insert("fetch".to_string(), json!({ "body": "hello" }));
        let graph = Arc::new(TaskGraph::build(vec![]).unwrap());
        ExecutionContext::new(Uuid::nil(), input, results, graph)
    }

    #[test]
    fn lookup_reads_input_and_results() {
        let c = ctx(json!({ "text": "abc", "records": [1, 2] }));
        assert_eq!(c.lookup("text").unwrap(), Some(json!("abc")));
        assert_eq!(c.lookup("input.records").unwrap(), Some(json!([1, 2])));
        assert_eq!(c.lookup("results.fetch.body").unwrap(), Some(json!("hello")));
        assert_eq!(c.lookup("missing").unwrap(), None);
        assert!(c.lookup("bad path(").is_err());
    }

    #[test]
    fn for_item_extends_object_input() {
        let c = ctx(json!({ "text": "abc" })).for_item(2, json!("x"));
        assert_eq!(c.input(), &json!({ "text": "abc", "item": "x", "index": 2 }));
        assert_eq!(c.scope()["item"], json!("x"));
        assert_eq!(c.scope()["index"], json!(2));
        assert_eq!(c.results().len(), 1);
        assert_eq!(c.item_index(), Some(2));
        assert_eq!(ctx(json!({})).item_index(), None);
    }

    #[test]
    fn for_item_wraps_scalar_input() {
        let c = ctx(json!(42)).for_item(0, json!({ "id": 1 }));
        assert_eq!(c.input(), &json!({ "value": 42, "item": { "id": 1 }, "index": 0 }));

        let c = ctx(Value::Null).for_item(0, json!(1));
        assert_eq!(c.input(), &json!({ "item": 1, "index": 0 }));
    }
}
