//! In-process store guarded by a mutex and a wakeup notifier.

use super::{QueueStore, StoreError, StoreResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::Notify;
use tracing::debug;

#[derive(Default)]
struct State {
    items: VecDeque<Vec<u8>>,
    closed: bool,
}

/// In-memory blocking FIFO, for single-process deployments and tests.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    available: Notify,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QueueStore for MemoryStore {
    async fn push(&self, value: Vec<u8>) -> StoreResult<()> {
        {
            let mut state = self.state.lock();
            if state.closed {
                return Err(StoreError::Closed);
            }
            state.items.push_back(value);
        }
        self.available.notify_one();
        Ok(())
    }

    async fn blocking_pop(&self) -> StoreResult<Vec<u8>> {
        loop {
            // Register interest before inspecting state so a push or close
            // landing in between is not missed.
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.state.lock();
                if state.closed {
                    return Err(StoreError::Closed);
                }
                if let Some(value) = state.items.pop_front() {
                    return Ok(value);
                }
            }

            notified.await;
        }
    }

    async fn size(&self) -> StoreResult<u64> {
        Ok(self.state.lock().items.len() as u64)
    }

    async fn close(&self) -> StoreResult<()> {
        let remaining = {
            let mut state = self.state.lock();
            state.closed = true;
            state.items.len()
        };
        self.available.notify_waiters();
        debug!(remaining, "Closed in-process store");
        Ok(())
    }
}
