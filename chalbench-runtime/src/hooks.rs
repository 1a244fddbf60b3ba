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

//! Runner-level pre/post hooks. A hook implements whichever side it
//! cares about; the unused side defaults to a no-op, same as the optional
//! progress-aware capability a challenge can opt into.

use async_trait::async_trait;
use chalbench_core::{Config, ExecutionResult};

#[async_trait]
pub trait RunnerHook: Send + Sync {
    /// Runs before `Configure`. A failure here is a hard `error` outcome:
    /// `Execute` and `Cleanup` never run.
    async fn pre(&self, _config: &Config) -> Result<(), String> {
        Ok(())
    }

    /// Runs after classification, before `Cleanup`. Errors are logged as
    /// warnings and never change the challenge's terminal `Status`.
    async fn post(&self, _result: &ExecutionResult) -> Result<(), String> {
        Ok(())
    }
}

/// Adapts a plain synchronous closure pair into a `RunnerHook`, for the
/// common case of a hook that doesn't need to await anything.
pub struct FnHook<Pre, Post> {
    pre: Pre,
    post: Post,
}

impl<Pre, Post> FnHook<Pre, Post>
where
    Pre: Fn(&Config) -> Result<(), String> + Send + Sync,
    Post: Fn(&ExecutionResult) -> Result<(), String> + Send + Sync,
{
    pub fn new(pre: Pre, post: Post) -> Self {
        Self { pre, post }
    }
}

#[async_trait]
impl<Pre, Post> RunnerHook for FnHook<Pre, Post>
where
    Pre: Fn(&Config) -> Result<(), String> + Send + Sync,
    Post: Fn(&ExecutionResult) -> Result<(), String> + Send + Sync,
{
    async fn pre(&self, config: &Config) -> Result<(), String> {
        (self.pre)(config)
    }

    async fn post(&self, result: &ExecutionResult) -> Result<(), String> {
        (self.post)(result)
    }
}

/// A pre-hook that never fails, paired with a no-op post-hook.
pub fn pre_only(
    pre: impl Fn(&Config) -> Result<(), String> + Send + Sync,
) -> FnHook<impl Fn(&Config) -> Result<(), String> + Send + Sync, impl Fn(&ExecutionResult) -> Result<(), String> + Send + Sync>
{
    FnHook::new(pre, |_: &ExecutionResult| Ok(()))
}

/// A post-hook paired with a no-op pre-hook.
pub fn post_only(
    post: impl Fn(&ExecutionResult) -> Result<(), String> + Send + Sync,
) -> FnHook<impl Fn(&Config) -> Result<(), String> + Send + Sync, impl Fn(&ExecutionResult) -> Result<(), String> + Send + Sync>
{
    FnHook::new(|_: &Config| Ok(()), post)
}
