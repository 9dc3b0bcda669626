// ABOUTME: Session state shared between the read loop and caller handles.
// ABOUTME: Every mutation notifies waiters so handles can await terminal state.

use parking_lot::Mutex;
use tokio::sync::Notify;

use super::Session;

/// A session plus change notification.
///
/// The lock only shares the session with handle readers; event application
/// is still serialized by the single read loop.
pub(crate) struct SharedSession<S> {
    session: Mutex<S>,
    changed: Notify,
}

impl<S: Session> SharedSession<S> {
    pub(crate) fn new(session: S) -> Self {
        Self {
            session: Mutex::new(session),
            changed: Notify::new(),
        }
    }

    /// Mutate the session and wake anyone waiting on it.
    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let result = {
            let mut session = self.session.lock();
            f(&mut session)
        };
        self.changed.notify_waiters();
        result
    }

    pub(crate) fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.session.lock())
    }

    /// Resolve once the session reaches a terminal state.
    pub(crate) async fn wait_terminal(&self) -> S::State {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(state) = self.read(|s| s.is_terminal().then(|| s.snapshot())) {
                return state;
            }
            notified.await;
        }
    }

    /// Resolve on the next mutation.
    pub(crate) async fn changed(&self) {
        self.changed.notified().await;
    }
}
