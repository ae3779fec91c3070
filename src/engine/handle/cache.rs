//! Single-flight cache for the inspection snapshot of one container.
//!
//! The first caller to find the slot empty starts the inspection; callers
//! arriving while it is in flight await the same shared future. A success is
//! stored until [`InspectionCache::invalidate`] is called. A failure leaves
//! the slot empty so the next caller retries.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bollard::models::ContainerInspectResponse;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};

use crate::error::ContainerError;

/// Result shared between every caller of one in-flight inspection.
pub(crate) type SnapshotResult = Result<Arc<ContainerInspectResponse>, ContainerError>;

type SharedInspection = Shared<BoxFuture<'static, SnapshotResult>>;

enum Slot {
    Empty,
    Pending {
        generation: u64,
        inspection: SharedInspection,
    },
    Ready(Arc<ContainerInspectResponse>),
}

struct CacheState {
    slot: Slot,
    generation: u64,
}

pub(crate) struct InspectionCache {
    state: Mutex<CacheState>,
}

impl InspectionCache {
    pub(crate) const fn new() -> Self {
        Self {
            state: Mutex::new(CacheState {
                slot: Slot::Empty,
                generation: 0,
            }),
        }
    }

    /// Return the cached snapshot, joining or starting an inspection as
    /// needed. `fetch` is only invoked when no snapshot and no in-flight
    /// inspection exist.
    pub(crate) async fn get_or_fetch<F>(&self, fetch: F) -> SnapshotResult
    where
        F: FnOnce() -> BoxFuture<'static, Result<ContainerInspectResponse, ContainerError>>,
    {
        let (generation, inspection) = {
            let mut state = self.lock();
            match &state.slot {
                Slot::Ready(snapshot) => return Ok(Arc::clone(snapshot)),
                Slot::Pending {
                    generation,
                    inspection,
                } => (*generation, inspection.clone()),
                Slot::Empty => {
                    state.generation = state.generation.wrapping_add(1);
                    let generation = state.generation;
                    let inspection = fetch().map(|result| result.map(Arc::new)).boxed().shared();
                    state.slot = Slot::Pending {
                        generation,
                        inspection: inspection.clone(),
                    };
                    (generation, inspection)
                }
            }
        };

        let result = inspection.await;

        let mut state = self.lock();
        let still_current = matches!(
            &state.slot,
            Slot::Pending { generation: pending, .. } if *pending == generation
        );
        if still_current {
            state.slot = match &result {
                Ok(snapshot) => Slot::Ready(Arc::clone(snapshot)),
                Err(_) => Slot::Empty,
            };
        }

        result
    }

    /// Drop the cached snapshot or in-flight inspection.
    pub(crate) fn invalidate(&self) {
        self.lock().slot = Slot::Empty;
    }

    /// Returns `true` when a snapshot is stored.
    #[cfg(test)]
    pub(crate) fn is_populated(&self) -> bool {
        matches!(self.lock().slot, Slot::Ready(_))
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
