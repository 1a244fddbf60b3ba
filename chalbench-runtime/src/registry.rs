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

//! Thread-safe challenge registry: challenges and their declarative
//! `Definition` twins live in separate namespaces of the same registry.

use crate::resolver::{self, ResolverError};
use chalbench_core::{Challenge, ChallengeId, Definition};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("challenge already registered: {0}")]
    AlreadyRegistered(ChallengeId),

    #[error("challenge not found: {0}")]
    NotFound(ChallengeId),

    #[error(transparent)]
    Cycle(#[from] ResolverError),
}

/// Shared handle to one registered challenge instance. A challenge's
/// lifecycle methods take `&mut self`, so exclusive access is mediated by
/// an async mutex rather than handed out as a bare reference.
pub type ChallengeHandle = Arc<AsyncMutex<Box<dyn Challenge>>>;

/// Registry mapping challenge ID -> `Challenge` impl and, separately,
/// challenge ID -> `Definition`. Safe for multiple concurrent readers and
/// serialized writers via `RwLock`.
pub struct Registry {
    challenges: RwLock<HashMap<ChallengeId, ChallengeHandle>>,
    /// Captured once at `register` time so dependency-graph queries never
    /// need to contend with a challenge's execution lock.
    dependency_edges: RwLock<HashMap<ChallengeId, Vec<ChallengeId>>>,
    definitions: RwLock<HashMap<ChallengeId, Definition>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            challenges: RwLock::new(HashMap::new()),
            dependency_edges: RwLock::new(HashMap::new()),
            definitions: RwLock::new(HashMap::new()),
        }
    }

    pub fn register(&self, challenge: Box<dyn Challenge>) -> Result<(), RegistryError> {
        let id = challenge.id().to_string();
        let deps = challenge.dependencies();

        let mut challenges = self.challenges.write();
        if challenges.contains_key(&id) {
            return Err(RegistryError::AlreadyRegistered(id));
        }
        tracing::debug!(challenge_id = %id, "registering challenge");
        self.dependency_edges.write().insert(id.clone(), deps);
        challenges.insert(id, Arc::new(AsyncMutex::new(challenge)));
        Ok(())
    }

    pub fn register_definition(&self, definition: Definition) -> Result<(), RegistryError> {
        let mut definitions = self.definitions.write();
        if definitions.contains_key(&definition.id) {
            return Err(RegistryError::AlreadyRegistered(definition.id));
        }
        definitions.insert(definition.id.clone(), definition);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<ChallengeHandle, RegistryError> {
        self.challenges
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// The dependency IDs declared by one registered challenge, captured at
    /// `register` time.
    pub fn dependencies_of(&self, id: &str) -> Result<Vec<ChallengeId>, RegistryError> {
        self.dependency_edges
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    pub fn get_definition(&self, id: &str) -> Result<Definition, RegistryError> {
        self.definitions
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// Registered challenge IDs, sorted.
    pub fn list(&self) -> Vec<ChallengeId> {
        let mut ids: Vec<ChallengeId> = self.challenges.read().keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    pub fn list_definitions(&self) -> Vec<Definition> {
        let mut defs: Vec<Definition> = self.definitions.read().values().cloned().collect();
        defs.sort_by(|a, b| a.id.cmp(&b.id));
        defs
    }

    /// Definitions whose `category` matches, sorted by ID.
    pub fn list_by_category(&self, category: &str) -> Vec<Definition> {
        let mut defs: Vec<Definition> = self
            .definitions
            .read()
            .values()
            .filter(|d| d.category == category)
            .cloned()
            .collect();
        defs.sort_by(|a, b| a.id.cmp(&b.id));
        defs
    }

    fn dependency_graph(&self) -> BTreeMap<ChallengeId, Vec<ChallengeId>> {
        self.dependency_edges
            .read()
            .iter()
            .map(|(id, deps)| (id.clone(), deps.clone()))
            .collect()
    }

    /// Delegates to the resolver over the currently-registered
    /// challenges' declared dependency edges.
    pub fn dependency_order(&self) -> Result<Vec<ChallengeId>, RegistryError> {
        let graph = self.dependency_graph();
        Ok(resolver::dependency_order(&graph)?)
    }

    pub fn validate_dependencies(&self) -> Result<(), String> {
        let graph = self.dependency_graph();
        resolver::validate_dependencies(&graph)
    }

    pub fn clear(&self) {
        self.challenges.write().clear();
        self.dependency_edges.write().clear();
        self.definitions.write().clear();
    }

    pub fn count(&self) -> usize {
        self.challenges.read().len()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
