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

//! # chalbench-evals
//!
//! The assertion engine: a registry of named evaluators, sixteen built-ins,
//! all-pass/any-pass composition, and the `"type:value"` shorthand parser.

pub mod composite;
pub mod evaluators;
pub mod parser;
pub mod registry;

pub use composite::{all_pass_composite, any_pass_composite, composite_all_pass, composite_any_pass};
pub use evaluators::register_builtins;
pub use parser::parse_assertion_string;
pub use registry::{AssertionEngine, EvalError, Evaluator};

use std::sync::{Arc, OnceLock};

/// Lazily-built process-wide default engine with all built-ins registered,
/// kept around for single-binary CLI convenience. Embedders and tests
/// should prefer an explicit `AssertionEngine::new()` instance passed to the
/// runner, not this global.
pub fn default_engine() -> Arc<AssertionEngine> {
    static DEFAULT: OnceLock<Arc<AssertionEngine>> = OnceLock::new();
    DEFAULT
        .get_or_init(|| {
            let engine = AssertionEngine::new();
            register_builtins(&engine).expect("built-in evaluator IDs are unique");
            Arc::new(engine)
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_engine_has_all_sixteen_builtins() {
        let engine = default_engine();
        let types = [
            "not_empty",
            "not_mock",
            "contains",
            "contains_any",
            "min_length",
            "quality_score",
            "min_score",
            "reasoning_present",
            "code_valid",
            "min_count",
            "exact_count",
            "max_latency",
            "all_valid",
            "no_duplicates",
            "all_pass",
            "no_mock_responses",
        ];
        for t in types {
            assert!(engine.has_evaluator(t), "missing evaluator: {t}");
        }
    }
}
