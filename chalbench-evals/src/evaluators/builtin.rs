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

//! The sixteen built-in evaluators.

use crate::registry::{AssertionEngine, EvalError};
use chalbench_core::{AssertionDef, Value};
use regex::Regex;
use std::sync::Arc;
use std::sync::OnceLock;

const MOCK_MARKERS: &[&str] = &[
    "lorem ipsum",
    "placeholder",
    "mock response",
    "todo",
    "not implemented",
    "[mock]",
    "test response",
    "dummy",
    "sample output",
];

const REASONING_MARKERS: &[&str] = &[
    "because",
    "therefore",
    "since",
    "thus",
    "step",
    "first",
    "then",
    "next",
    "reason",
    "explanation",
    "conclude",
    "let me",
    "let's",
];

fn code_regexes() -> &'static [Regex] {
    static REGEXES: OnceLock<Vec<Regex>> = OnceLock::new();
    REGEXES.get_or_init(|| {
        [
            r"func\s+\w+",
            r"def\s+\w+",
            r"class\s+\w+",
            r"function\s+\w+",
            r"=>\s*\{",
            r"public\s+\w+",
            r"import\s+",
            r"return\s+",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("static regex is valid"))
        .collect()
    })
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn expected_string(def: &AssertionDef) -> String {
    def.value
        .as_ref()
        .map(|v| v.to_canonical_string())
        .unwrap_or_default()
}

fn not_empty(_def: &AssertionDef, value: &Value) -> (bool, String) {
    match value {
        Value::Null => (false, "value is null".to_string()),
        Value::String(s) => {
            if s.trim().is_empty() {
                (false, "string is empty".to_string())
            } else {
                (true, "string is non-empty".to_string())
            }
        }
        Value::List(items) => {
            if items.is_empty() {
                (false, "list is empty".to_string())
            } else {
                (true, format!("list has {} items", items.len()))
            }
        }
        Value::Map(map) => {
            if map.is_empty() {
                (false, "map is empty".to_string())
            } else {
                (true, format!("map has {} entries", map.len()))
            }
        }
        _ => (true, "value is non-empty".to_string()),
    }
}

fn not_mock_str(s: &str) -> (bool, String) {
    for marker in MOCK_MARKERS {
        if contains_ci(s, marker) {
            return (false, format!("value looks like a mock response (matched \"{marker}\")"));
        }
    }
    (true, "no mock markers found".to_string())
}

fn not_mock(_def: &AssertionDef, value: &Value) -> (bool, String) {
    match value.as_str() {
        Some(s) => not_mock_str(s),
        None => (true, "non-string value auto-passes not_mock".to_string()),
    }
}

fn contains(def: &AssertionDef, value: &Value) -> (bool, String) {
    let expected = expected_string(def);
    match value.as_str() {
        Some(s) if contains_ci(s, &expected) => (true, format!("contains \"{expected}\"")),
        Some(_) => (false, format!("does not contain \"{expected}\"")),
        None => (false, "value is not a string".to_string()),
    }
}

fn contains_any_candidates(def: &AssertionDef) -> Vec<String> {
    if let Some(values) = &def.values {
        return values.iter().map(|v| v.to_canonical_string()).collect();
    }
    if let Some(Value::List(items)) = &def.value {
        return items.iter().map(|v| v.to_canonical_string()).collect();
    }
    expected_string(def)
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn contains_any(def: &AssertionDef, value: &Value) -> (bool, String) {
    let candidates = contains_any_candidates(def);
    let s = match value.as_str() {
        Some(s) => s,
        None => return (false, "value is not a string".to_string()),
    };
    for candidate in &candidates {
        if contains_ci(s, candidate) {
            return (true, format!("contains \"{candidate}\""));
        }
    }
    (false, format!("contains none of {candidates:?}"))
}

fn min_length(def: &AssertionDef, value: &Value) -> (bool, String) {
    let min = def.value.as_ref().and_then(|v| v.as_i64()).unwrap_or(0);
    let len = value.as_str().map(|s| s.chars().count() as i64).unwrap_or(0);
    if len >= min {
        (true, format!("length {len} >= {min}"))
    } else {
        (false, format!("length {len} < {min}"))
    }
}

fn quality_score(def: &AssertionDef, value: &Value) -> (bool, String) {
    let threshold = def.value.as_ref().and_then(|v| v.as_f64()).unwrap_or(0.0);
    let score = value.as_f64().unwrap_or(f64::MIN);
    if score >= threshold {
        (true, format!("score {score} >= {threshold}"))
    } else {
        (false, format!("score {score} < {threshold}"))
    }
}

fn reasoning_present(_def: &AssertionDef, value: &Value) -> (bool, String) {
    let s = match value.as_str() {
        Some(s) => s,
        None => return (false, "value is not a string".to_string()),
    };
    for marker in REASONING_MARKERS {
        if contains_ci(s, marker) {
            return (true, format!("found reasoning marker \"{marker}\""));
        }
    }
    (false, "no reasoning markers found".to_string())
}

fn code_valid(_def: &AssertionDef, value: &Value) -> (bool, String) {
    let s = match value.as_str() {
        Some(s) => s,
        None => return (false, "value is not a string".to_string()),
    };
    if s.contains("```") {
        return (true, "contains a fenced code block".to_string());
    }
    if s.lines().any(|line| line.starts_with("    ")) {
        return (true, "contains a 4-space-indented line".to_string());
    }
    for regex in code_regexes() {
        if regex.is_match(s) {
            return (true, format!("matched code pattern /{}/", regex.as_str()));
        }
    }
    (false, "no recognizable code markers found".to_string())
}

fn countable_count(value: &Value) -> Option<i64> {
    match value {
        Value::Int(i) => Some(*i),
        Value::Float(f) => Some(*f as i64),
        Value::List(items) => Some(items.len() as i64),
        Value::Map(map) => Some(map.len() as i64),
        _ => None,
    }
}

fn min_count(def: &AssertionDef, value: &Value) -> (bool, String) {
    let expected = def.value.as_ref().and_then(|v| v.as_i64()).unwrap_or(0);
    match countable_count(value) {
        Some(count) if count >= expected => (true, format!("count {count} >= {expected}")),
        Some(count) => (false, format!("count {count} < {expected}")),
        None => (false, "value has no countable length".to_string()),
    }
}

fn exact_count(def: &AssertionDef, value: &Value) -> (bool, String) {
    let expected = def.value.as_ref().and_then(|v| v.as_i64()).unwrap_or(0);
    match countable_count(value) {
        Some(count) if count == expected => (true, format!("count {count} == {expected}")),
        Some(count) => (false, format!("count {count} != {expected}")),
        None => (false, "value has no countable length".to_string()),
    }
}

fn max_latency(def: &AssertionDef, value: &Value) -> (bool, String) {
    let max = def.value.as_ref().and_then(|v| v.as_i64()).unwrap_or(i64::MAX);
    match value.as_i64() {
        Some(actual) if actual <= max => (true, format!("latency {actual}ms <= {max}ms")),
        Some(actual) => (false, format!("latency {actual}ms > {max}ms")),
        None => (false, "value is not an integer-convertible latency".to_string()),
    }
}

fn all_valid(_def: &AssertionDef, value: &Value) -> (bool, String) {
    let items = match value.as_list() {
        Some(items) => items,
        None => return (false, "value is not a list".to_string()),
    };
    for (idx, item) in items.iter().enumerate() {
        let invalid = match item {
            Value::Null => true,
            Value::String(s) => s.trim().is_empty(),
            _ => false,
        };
        if invalid {
            return (false, format!("item {idx} is invalid"));
        }
    }
    (true, format!("all {} items valid", items.len()))
}

fn no_duplicates(_def: &AssertionDef, value: &Value) -> (bool, String) {
    let items = match value.as_list() {
        Some(items) => items,
        None => return (false, "value is not a list".to_string()),
    };
    let mut seen = std::collections::HashSet::new();
    for item in items {
        let key = item.to_canonical_string();
        if !seen.insert(key.clone()) {
            return (false, format!("duplicate value: {key}"));
        }
    }
    (true, "no duplicates found".to_string())
}

fn item_passed(item: &Value) -> Option<bool> {
    match item {
        Value::Bool(b) => Some(*b),
        Value::Map(map) => match map.get("passed") {
            Some(Value::Bool(b)) => Some(*b),
            _ => None,
        },
        _ => None,
    }
}

fn all_pass(_def: &AssertionDef, value: &Value) -> (bool, String) {
    let items = match value.as_list() {
        Some(items) => items,
        None => return (false, "value is not a list".to_string()),
    };
    for (idx, item) in items.iter().enumerate() {
        match item_passed(item) {
            Some(true) => continue,
            Some(false) => return (false, format!("item {idx} failed")),
            None => return (false, format!("item {idx} has no recognizable passed field")),
        }
    }
    (true, format!("all {} items passed", items.len()))
}

fn no_mock_responses(_def: &AssertionDef, value: &Value) -> (bool, String) {
    match value {
        Value::List(items) => {
            for (idx, item) in items.iter().enumerate() {
                if let Some(s) = item.as_str() {
                    let (passed, msg) = not_mock_str(s);
                    if !passed {
                        return (false, format!("item {idx}: {msg}"));
                    }
                }
            }
            (true, "no mock responses found".to_string())
        }
        Value::String(s) => not_mock_str(s),
        _ => (true, "non-list/string value auto-passes".to_string()),
    }
}

/// Registers all sixteen built-in evaluators onto `engine`.
pub fn register_builtins(engine: &AssertionEngine) -> Result<(), EvalError> {
    engine.register("not_empty", Arc::new(not_empty))?;
    engine.register("not_mock", Arc::new(not_mock))?;
    engine.register("contains", Arc::new(contains))?;
    engine.register("contains_any", Arc::new(contains_any))?;
    engine.register("min_length", Arc::new(min_length))?;
    engine.register("quality_score", Arc::new(quality_score))?;
    engine.register("min_score", Arc::new(quality_score))?;
    engine.register("reasoning_present", Arc::new(reasoning_present))?;
    engine.register("code_valid", Arc::new(code_valid))?;
    engine.register("min_count", Arc::new(min_count))?;
    engine.register("exact_count", Arc::new(exact_count))?;
    engine.register("max_latency", Arc::new(max_latency))?;
    engine.register("all_valid", Arc::new(all_valid))?;
    engine.register("no_duplicates", Arc::new(no_duplicates))?;
    engine.register("all_pass", Arc::new(all_pass))?;
    engine.register("no_mock_responses", Arc::new(no_mock_responses))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(assertion_type: &str, value: Option<Value>) -> AssertionDef {
        AssertionDef {
            assertion_type: assertion_type.to_string(),
            target: "out".to_string(),
            value,
            values: None,
            message: None,
        }
    }

    #[test]
    fn contains_is_case_insensitive() {
        let d = def("contains", Some(Value::String("hello".into())));
        let (passed, _) = contains(&d, &Value::String("Hello World".into()));
        assert!(passed);
    }

    #[test]
    fn min_length_boundary() {
        let d = def("min_length", Some(Value::Int(5)));
        assert!(!min_length(&d, &Value::String("hi".into())).0);
        assert!(min_length(&d, &Value::String("hello".into())).0);
    }

    #[test]
    fn no_duplicates_cites_the_dup() {
        let value = Value::List(vec!["a".into(), "b".into(), "a".into()]);
        let (passed, msg) = no_duplicates(&def("no_duplicates", None), &value);
        assert!(!passed);
        assert!(msg.contains('a'));
    }

    #[test]
    fn all_pass_cites_failing_item() {
        let mut failing = std::collections::HashMap::new();
        failing.insert("passed".to_string(), Value::Bool(false));
        let mut passing = std::collections::HashMap::new();
        passing.insert("passed".to_string(), Value::Bool(true));
        let value = Value::List(vec![Value::Map(passing), Value::Map(failing)]);
        let (passed, msg) = all_pass(&def("all_pass", None), &value);
        assert!(!passed);
        assert!(msg.contains("item 1"));
    }

    #[test]
    fn contains_any_accepts_value_or_values() {
        let via_value = def("contains_any", Some(Value::String("go,rust".into())));
        assert!(contains_any(&via_value, &Value::String("I love rust".into())).0);

        let mut via_values = def("contains_any", None);
        via_values.values = Some(vec!["go".into(), "rust".into()]);
        assert!(contains_any(&via_values, &Value::String("I love rust".into())).0);
    }

    #[test]
    fn not_mock_flags_known_markers() {
        assert!(!not_mock(&def("not_mock", None), &Value::String("this is a placeholder".into())).0);
        assert!(not_mock(&def("not_mock", None), &Value::String("real content".into())).0);
        assert!(not_mock(&def("not_mock", None), &Value::Int(42)).0);
    }

    #[test]
    fn code_valid_detects_function_definitions_and_fences() {
        assert!(code_valid(&def("code_valid", None), &Value::String("def foo(): pass".into())).0);
        assert!(code_valid(&def("code_valid", None), &Value::String("```\ncode\n```".into())).0);
        assert!(!code_valid(&def("code_valid", None), &Value::String("just prose".into())).0);
    }

    #[test]
    fn min_count_and_exact_count_use_the_right_countable() {
        let min = def("min_count", Some(Value::Int(2)));
        assert!(min_count(&min, &Value::List(vec![1i64.into(), 2i64.into()])).0);
        assert!(!min_count(&min, &Value::List(vec![1i64.into()])).0);

        let exact = def("exact_count", Some(Value::Int(3)));
        assert!(exact_count(&exact, &Value::Int(3)).0);
        assert!(!exact_count(&exact, &Value::Int(2)).0);
    }
}
