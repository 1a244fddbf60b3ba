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

//! Dependency resolver: Kahn's algorithm with deterministic,
//! sorted tie-breaking, and a deterministic DFS-based cycle reporter for
//! when Kahn's algorithm falls short.

use chalbench_core::ChallengeId;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolverError {
    #[error("dependency cycle detected: {0}")]
    CycleDetected(String),
}

/// Sentinel returned by `detect_cycle` when probed on a graph that turns
/// out to be acyclic (it is only meant to be called after Kahn's algorithm
/// reports a shortfall).
pub const UNKNOWN_CYCLE: &str = "unknown cycle";

/// Computes a topological order over `deps` (challenge ID -> its declared
/// dependency IDs). Ties at every dequeue step are broken by sorted ID,
/// making the output deterministic across repeated calls on the same input.
pub fn dependency_order(
    deps: &BTreeMap<ChallengeId, Vec<ChallengeId>>,
) -> Result<Vec<ChallengeId>, ResolverError> {
    let mut indegree: HashMap<&str, usize> = HashMap::new();
    let mut successors: HashMap<&str, Vec<&str>> = HashMap::new();

    for (id, d) in deps {
        indegree.entry(id.as_str()).or_insert(0);
        *indegree.entry(id.as_str()).or_insert(0) = d.len();
        for dep in d {
            successors.entry(dep.as_str()).or_default().push(id.as_str());
        }
    }

    let mut queue: BTreeSet<&str> = indegree
        .iter()
        .filter(|(_, &deg)| deg == 0)
        .map(|(id, _)| *id)
        .collect();

    let mut order: Vec<ChallengeId> = Vec::with_capacity(deps.len());

    while let Some(&id) = queue.iter().next() {
        queue.remove(id);
        order.push(id.to_string());

        if let Some(dependents) = successors.get(id) {
            let mut dependents = dependents.clone();
            dependents.sort_unstable();
            for dependent in dependents {
                if let Some(deg) = indegree.get_mut(dependent) {
                    *deg -= 1;
                    if *deg == 0 {
                        queue.insert(dependent);
                    }
                }
            }
        }
    }

    if order.len() != deps.len() {
        return Err(ResolverError::CycleDetected(detect_cycle(deps)));
    }

    Ok(order)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    Gray,
    Black,
}

/// Deterministic iterative DFS (three-color) cycle finder, starting from
/// sorted IDs. Only meaningful after `dependency_order` reports a
/// shortfall; on an acyclic graph it returns the `UNKNOWN_CYCLE` sentinel.
pub fn detect_cycle(deps: &BTreeMap<ChallengeId, Vec<ChallengeId>>) -> String {
    let mut color: HashMap<&str, Color> = HashMap::new();

    for start in deps.keys() {
        if color.contains_key(start.as_str()) {
            continue;
        }

        let mut path: Vec<&str> = vec![start.as_str()];
        let mut stack: Vec<(&str, usize)> = vec![(start.as_str(), 0)];
        color.insert(start.as_str(), Color::Gray);

        while let Some(&(node, idx)) = stack.last() {
            let neighbors = deps.get(node).map(|v| v.as_slice()).unwrap_or(&[]);
            if idx < neighbors.len() {
                stack.last_mut().unwrap().1 += 1;
                let neighbor = neighbors[idx].as_str();

                match color.get(neighbor) {
                    None if !deps.contains_key(neighbor) => {
                        // Dependency on an unregistered ID: report it directly.
                        let mut desc: Vec<&str> = path.clone();
                        desc.push(neighbor);
                        return desc.join(" -> ");
                    }
                    Some(Color::Gray) => {
                        let pos = path.iter().position(|&n| n == neighbor).expect("gray node is on the current path");
                        let mut cycle: Vec<&str> = path[pos..].to_vec();
                        cycle.push(neighbor);
                        return cycle.join(" -> ");
                    }
                    Some(Color::Black) => {
                        // Fully explored elsewhere; no cycle through it.
                    }
                    None => {
                        color.insert(neighbor, Color::Gray);
                        path.push(neighbor);
                        stack.push((neighbor, 0));
                    }
                }
            } else {
                color.insert(node, Color::Black);
                path.pop();
                stack.pop();
            }
        }
    }

    UNKNOWN_CYCLE.to_string()
}

/// Scans `deps` and returns the first unregistered dependency found, in
/// sorted-ID order, as `Err("challenge X has unregistered dependency: Y")`.
pub fn validate_dependencies(deps: &BTreeMap<ChallengeId, Vec<ChallengeId>>) -> Result<(), String> {
    for (id, declared) in deps {
        for dep in declared {
            if !deps.contains_key(dep) {
                return Err(format!(
                    "challenge {id} has unregistered dependency: {dep}"
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(pairs: &[(&str, &[&str])]) -> BTreeMap<ChallengeId, Vec<ChallengeId>> {
        pairs
            .iter()
            .map(|(id, deps)| (id.to_string(), deps.iter().map(|s| s.to_string()).collect()))
            .collect()
    }

    #[test]
    fn linear_chain_respects_edge_order() {
        let deps = graph(&[("a", &[]), ("b", &["a"]), ("c", &["b"])]);
        let order = dependency_order(&deps).unwrap();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn diamond_places_root_first_and_leaf_last_with_id_tiebreak() {
        let deps = graph(&[("d", &[]), ("b", &["d"]), ("c", &["d"]), ("a", &["b", "c"])]);
        let order = dependency_order(&deps).unwrap();
        assert_eq!(order, vec!["d", "b", "c", "a"]);
    }

    #[test]
    fn order_is_deterministic_across_repeated_calls() {
        let deps = graph(&[("d", &[]), ("b", &["d"]), ("c", &["d"]), ("a", &["b", "c"])]);
        let first = dependency_order(&deps).unwrap();
        let second = dependency_order(&deps).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn two_node_cycle_is_reported_as_a_rotation() {
        let deps = graph(&[("a", &["b"]), ("b", &["a"])]);
        let err = dependency_order(&deps).unwrap_err();
        match err {
            ResolverError::CycleDetected(path) => {
                assert!(path == "a -> b -> a" || path == "b -> a -> b");
            }
        }
    }

    #[test]
    fn self_dependency_is_self_arrow_self() {
        let deps = graph(&[("a", &["a"])]);
        let err = dependency_order(&deps).unwrap_err();
        match err {
            ResolverError::CycleDetected(path) => assert_eq!(path, "a -> a"),
        }
    }

    #[test]
    fn unregistered_dependency_is_reported_as_a_cycle_involving_it() {
        let deps = graph(&[("a", &["missing"])]);
        let err = dependency_order(&deps).unwrap_err();
        match err {
            ResolverError::CycleDetected(path) => assert_eq!(path, "a -> missing"),
        }
    }

    #[test]
    fn detect_cycle_on_acyclic_graph_returns_sentinel() {
        let deps = graph(&[("a", &[]), ("b", &["a"])]);
        assert_eq!(detect_cycle(&deps), UNKNOWN_CYCLE);
    }

    #[test]
    fn validate_dependencies_reports_first_unregistered() {
        let deps = graph(&[("a", &["x"])]);
        let err = validate_dependencies(&deps).unwrap_err();
        assert_eq!(err, "challenge a has unregistered dependency: x");
    }

    #[test]
    fn topological_order_respects_every_edge() {
        let deps = graph(&[
            ("e", &[]),
            ("d", &["e"]),
            ("c", &["d"]),
            ("b", &["d"]),
            ("a", &["b", "c"]),
        ]);
        let order = dependency_order(&deps).unwrap();
        let pos = |id: &str| order.iter().position(|x| x == id).unwrap();
        for (id, d) in &deps {
            for dep in d {
                assert!(pos(dep) < pos(id), "{dep} should precede {id}");
            }
        }
    }
}
