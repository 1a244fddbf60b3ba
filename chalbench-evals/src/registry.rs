// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Assertion engine: a registry of named evaluators plus the glue to
//! evaluate one or many assertions against a value map.

use chalbench_core::{AssertionDef, AssertionResult, Value};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// A pure function `(AssertionDef, actual) -> (passed, message)`.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, def: &AssertionDef, value: &Value) -> (bool, String);
}

impl<F> Evaluator for F
where
    F: Fn(&AssertionDef, &Value) -> (bool, String) + Send + Sync,
{
    fn evaluate(&self, def: &AssertionDef, value: &Value) -> (bool, String) {
        (self)(def, value)
    }
}

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("assertion evaluator already registered: {0}")]
    AlreadyRegistered(String),
}

/// Registry mapping assertion type -> evaluator. Safe for concurrent
/// readers; writers serialize on the same `RwLock`.
pub struct AssertionEngine {
    evaluators: RwLock<HashMap<String, Arc<dyn Evaluator>>>,
}

impl AssertionEngine {
    pub fn new() -> Self {
        Self {
            evaluators: RwLock::new(HashMap::new()),
        }
    }

    pub fn register(
        &self,
        assertion_type: impl Into<String>,
        evaluator: Arc<dyn Evaluator>,
    ) -> Result<(), EvalError> {
        let assertion_type = assertion_type.into();
        let mut evaluators = self.evaluators.write();
        if evaluators.contains_key(&assertion_type) {
            return Err(EvalError::AlreadyRegistered(assertion_type));
        }
        tracing::debug!(assertion_type = %assertion_type, "registering assertion evaluator");
        evaluators.insert(assertion_type, evaluator);
        Ok(())
    }

    pub fn has_evaluator(&self, assertion_type: &str) -> bool {
        self.evaluators.read().contains_key(assertion_type)
    }

    /// Evaluates a single assertion against an already-resolved value.
    pub fn evaluate(&self, def: &AssertionDef, value: &Value) -> AssertionResult {
        let evaluator = self.evaluators.read().get(&def.assertion_type).cloned();
        match evaluator {
            None => AssertionResult {
                assertion_type: def.assertion_type.clone(),
                target: def.target.clone(),
                expected: def.value.clone(),
                actual: Some(value.clone()),
                passed: false,
                message: format!("unknown assertion type: {}", def.assertion_type),
            },
            Some(evaluator) => {
                // Evaluation itself runs without holding the registry lock.
                let (passed, message) = evaluator.evaluate(def, value);
                AssertionResult {
                    assertion_type: def.assertion_type.clone(),
                    target: def.target.clone(),
                    expected: def.value.clone(),
                    actual: Some(value.clone()),
                    passed,
                    message,
                }
            }
        }
    }

    /// Evaluates every def against `values[def.target]`, emitting a
    /// non-pass result with a "target not found" message when absent.
    pub fn evaluate_all(
        &self,
        defs: &[AssertionDef],
        values: &HashMap<String, Value>,
    ) -> Vec<AssertionResult> {
        defs.iter()
            .map(|def| match values.get(&def.target) {
                Some(value) => self.evaluate(def, value),
                None => AssertionResult {
                    assertion_type: def.assertion_type.clone(),
                    target: def.target.clone(),
                    expected: def.value.clone(),
                    actual: None,
                    passed: false,
                    message: format!("target not found: {}", def.target),
                },
            })
            .collect()
    }
}

impl Default for AssertionEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn always_pass(_: &AssertionDef, _: &Value) -> (bool, String) {
        (true, "ok".to_string())
    }

    #[test]
    fn register_rejects_duplicates() {
        let engine = AssertionEngine::new();
        engine.register("always", Arc::new(always_pass)).unwrap();
        let err = engine.register("always", Arc::new(always_pass)).unwrap_err();
        assert!(matches!(err, EvalError::AlreadyRegistered(t) if t == "always"));
    }

    #[test]
    fn evaluate_unknown_type_fails_closed() {
        let engine = AssertionEngine::new();
        let def = AssertionDef {
            assertion_type: "missing".into(),
            target: "x".into(),
            value: None,
            values: None,
            message: None,
        };
        let result = engine.evaluate(&def, &Value::Null);
        assert!(!result.passed);
        assert!(result.message.contains("unknown assertion type"));
    }

    #[test]
    fn evaluate_all_reports_missing_targets() {
        let engine = AssertionEngine::new();
        engine.register("always", Arc::new(always_pass)).unwrap();
        let defs = vec![AssertionDef {
            assertion_type: "always".into(),
            target: "missing_target".into(),
            value: None,
            values: None,
            message: None,
        }];
        let results = engine.evaluate_all(&defs, &HashMap::new());
        assert_eq!(results.len(), 1);
        assert!(!results[0].passed);
        assert!(results[0].message.contains("target not found"));
    }
}
