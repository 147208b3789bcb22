use std::sync::atomic::{Ordering, AtomicBool};
use std::sync::Arc;

use tracing::trace;
use event_listener::Event;

const ORDERING: Ordering = Ordering::SeqCst;

/// Signal raised once and never cleared, used to stop long running loops.
/// Listening after it was raised returns at once.
#[derive(Debug, Default)]
pub struct StickyEvent {
    raised: AtomicBool,
    wakeup: Event,
}

impl StickyEvent {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn is_set(&self) -> bool {
        self.raised.load(ORDERING)
    }

    pub async fn listen(&self) {
        // listener registered first, a later notify wakes it
        let listener = self.wakeup.listen();
        if self.is_set() {
            trace!("signal already raised");
            return;
        }
        listener.await
    }

    pub fn notify(&self) {
        if !self.raised.swap(true, ORDERING) {
            trace!("signal raised");
        }
        self.wakeup.notify(usize::MAX);
    }
}

pub mod changes {
    use std::fmt;
    use std::sync::atomic::AtomicU64;
    use std::sync::Arc;

    use tracing::trace;
    use event_listener::{Event, EventListener};

    pub type SharedChangePublisher = Arc<ChangePublisher>;

    /// Publishes a monotonically increasing change epoch.
    /// Publishing never waits for listeners.
    #[derive(Debug, Default)]
    pub struct ChangePublisher {
        epoch: AtomicU64,
        event: Event,
    }

    impl ChangePublisher {
        pub fn shared() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn epoch(&self) -> u64 {
            self.epoch.load(super::ORDERING)
        }

        fn listen(&self) -> EventListener {
            self.event.listen()
        }

        /// bump epoch and wake every listener
        pub fn notify(&self) -> u64 {
            let epoch = self.epoch.fetch_add(1, super::ORDERING) + 1;
            self.event.notify(usize::MAX);
            epoch
        }

        pub fn change_listener(self: &Arc<Self>) -> ChangeListener {
            ChangeListener {
                last_epoch: self.epoch(),
                publisher: self.clone(),
            }
        }
    }

    pub struct ChangeListener {
        publisher: Arc<ChangePublisher>,
        last_epoch: u64,
    }

    impl fmt::Debug for ChangeListener {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "ChangeListener{}", self.last_epoch)
        }
    }

    impl ChangeListener {
        #[inline]
        pub fn last_epoch(&self) -> u64 {
            self.last_epoch
        }

        #[inline]
        pub fn has_change(&self) -> bool {
            self.publisher.epoch() != self.last_epoch
        }

        /// wait until epoch moves past the last seen one
        pub async fn listen(&mut self) -> u64 {
            if self.has_change() {
                self.last_epoch = self.publisher.epoch();
                return self.last_epoch;
            }

            let listener = self.publisher.listen();

            if self.has_change() {
                self.last_epoch = self.publisher.epoch();
                return self.last_epoch;
            }

            listener.await;

            self.last_epoch = self.publisher.epoch();
            trace!(epoch = self.last_epoch);
            self.last_epoch
        }
    }
}
