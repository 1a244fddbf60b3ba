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

//! Cancellation plumbing. Stands in for a cancellable context: two
//! independent sources (deadline timer, liveness monitor) may each cancel
//! an execution; both close over the same token.

pub use tokio_util::sync::CancellationToken;

/// Runs `fut` to completion, or returns `Err(Elapsed)` once `deadline`
/// elapses or `token` is cancelled, whichever comes first.
pub async fn run_cancellable<F, T>(
    token: &CancellationToken,
    deadline: std::time::Duration,
    fut: F,
) -> Result<T, Elapsed>
where
    F: std::future::Future<Output = T>,
{
    tokio::select! {
        biased;
        result = fut => Ok(result),
        _ = token.cancelled() => Err(Elapsed),
        _ = tokio::time::sleep(deadline) => {
            token.cancel();
            Err(Elapsed)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elapsed;

impl std::fmt::Display for Elapsed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "execution cancelled or timed out")
    }
}

impl std::error::Error for Elapsed {}
