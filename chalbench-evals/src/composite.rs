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

//! All-pass / any-pass composition over a list of sub-assertions.

use crate::registry::{AssertionEngine, Evaluator};
use chalbench_core::{AssertionDef, AssertionResult, Value};
use std::collections::HashMap;
use std::sync::Arc;

fn sub_label(result: &AssertionResult) -> String {
    format!("{}:{}", result.assertion_type, result.target)
}

/// Binds a value map, evaluates every sub-assertion, and aggregates into a
/// single result that passes only if every sub-assertion passed.
pub fn all_pass_composite(
    engine: &AssertionEngine,
    defs: &[AssertionDef],
    values: &HashMap<String, Value>,
) -> AssertionResult {
    let results = engine.evaluate_all(defs, values);
    let failing: Vec<String> = results.iter().filter(|r| !r.passed).map(sub_label).collect();
    let passed = failing.is_empty();
    let message = if passed {
        "all sub-assertions passed".to_string()
    } else {
        format!("failing sub-assertions: {}", failing.join(", "))
    };
    AssertionResult {
        assertion_type: "all_pass_composite".to_string(),
        target: "*".to_string(),
        expected: None,
        actual: None,
        passed,
        message,
    }
}

/// Binds a value map, evaluates every sub-assertion, and aggregates into a
/// single result that passes if any sub-assertion passed.
pub fn any_pass_composite(
    engine: &AssertionEngine,
    defs: &[AssertionDef],
    values: &HashMap<String, Value>,
) -> AssertionResult {
    let results = engine.evaluate_all(defs, values);
    let passing: Vec<String> = results.iter().filter(|r| r.passed).map(sub_label).collect();
    let passed = !passing.is_empty();
    let message = if passed {
        format!("passing sub-assertions: {}", passing.join(", "))
    } else {
        "no sub-assertions passed".to_string()
    };
    AssertionResult {
        assertion_type: "any_pass_composite".to_string(),
        target: "*".to_string(),
        expected: None,
        actual: None,
        passed,
        message,
    }
}

struct CompositeEvaluator {
    engine: Arc<AssertionEngine>,
    defs: Vec<AssertionDef>,
    any: bool,
}

impl Evaluator for CompositeEvaluator {
    fn evaluate(&self, _def: &AssertionDef, value: &Value) -> (bool, String) {
        // Every sub-target is bound to the same incoming value.
        let values: HashMap<String, Value> = self
            .defs
            .iter()
            .map(|d| (d.target.clone(), value.clone()))
            .collect();
        let aggregated = if self.any {
            any_pass_composite(&self.engine, &self.defs, &values)
        } else {
            all_pass_composite(&self.engine, &self.defs, &values)
        };
        (aggregated.passed, aggregated.message)
    }
}

/// Returns an `Evaluator` closure that treats its incoming value as the
/// value of every sub-assertion's target, passing only if all pass.
pub fn composite_all_pass(engine: Arc<AssertionEngine>, defs: Vec<AssertionDef>) -> Arc<dyn Evaluator> {
    Arc::new(CompositeEvaluator {
        engine,
        defs,
        any: false,
    })
}

/// As `composite_all_pass`, but passes if any sub-assertion passes.
pub fn composite_any_pass(engine: Arc<AssertionEngine>, defs: Vec<AssertionDef>) -> Arc<dyn Evaluator> {
    Arc::new(CompositeEvaluator {
        engine,
        defs,
        any: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluators::register_builtins;

    fn def(assertion_type: &str, target: &str, value: Value) -> AssertionDef {
        AssertionDef {
            assertion_type: assertion_type.to_string(),
            target: target.to_string(),
            value: Some(value),
            values: None,
            message: None,
        }
    }

    #[test]
    fn all_pass_composite_fails_closed_on_one_bad_sub_assertion() {
        let engine = AssertionEngine::new();
        register_builtins(&engine).unwrap();
        let defs = vec![
            def("not_empty", "a", Value::Null),
            def("min_length", "b", Value::Int(1)),
        ];
        let mut values = HashMap::new();
        values.insert("a".to_string(), Value::String("hi".into()));
        values.insert("b".to_string(), Value::String("hi".into()));
        let result = all_pass_composite(&engine, &defs, &values);
        assert!(result.passed);

        values.insert("a".to_string(), Value::String("".into()));
        let result = all_pass_composite(&engine, &defs, &values);
        assert!(!result.passed);
        assert!(result.message.contains("not_empty:a"));
    }

    #[test]
    fn any_pass_composite_passes_if_one_sub_assertion_passes() {
        let engine = AssertionEngine::new();
        register_builtins(&engine).unwrap();
        let defs = vec![
            def("min_length", "a", Value::Int(100)),
            def("not_empty", "a", Value::Null),
        ];
        let mut values = HashMap::new();
        values.insert("a".to_string(), Value::String("short".into()));
        let result = any_pass_composite(&engine, &defs, &values);
        assert!(result.passed);
        assert!(result.message.contains("not_empty:a"));
    }
}
