// ── Reactive state stream ──
//
// Subscription type for consuming `SyncState` transitions.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::state::SyncState;

/// A subscription to the coordinator's read model.
///
/// Provides both point-in-time snapshot access and change notification
/// via [`changed`](Self::changed) or by converting into a `Stream`.
pub struct StateStream {
    current: Arc<SyncState>,
    receiver: watch::Receiver<Arc<SyncState>>,
}

impl StateStream {
    pub(crate) fn new(receiver: watch::Receiver<Arc<SyncState>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// Snapshot captured at creation or at the last `changed()`.
    pub fn current(&self) -> &Arc<SyncState> {
        &self.current
    }

    /// Latest published snapshot.
    pub fn latest(&self) -> Arc<SyncState> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next transition. `None` once the coordinator is gone.
    pub async fn changed(&mut self) -> Option<Arc<SyncState>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = Arc::clone(&snap);
        Some(snap)
    }

    /// Convert into a `Stream` that yields the current snapshot first,
    /// then one per transition.
    pub fn into_stream(self) -> StateWatchStream {
        StateWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by the state `watch::Receiver`.
pub struct StateWatchStream {
    inner: WatchStream<Arc<SyncState>>,
}

impl Stream for StateWatchStream {
    type Item = Arc<SyncState>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
