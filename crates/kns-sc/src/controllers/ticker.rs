use std::time::{Duration, Instant};

use fluvio_future::timer::sleep;

/// Fixed interval schedule. Ticks missed while a cycle was still running are
/// dropped instead of fired back to back.
#[derive(Debug)]
pub struct Ticker {
    interval: Duration,
    next: Instant,
}

impl Ticker {
    /// first tick fires immediately
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now(),
        }
    }

    /// wait for the next tick, returns how many ticks were skipped
    pub async fn tick(&mut self) -> u32 {
        let now = Instant::now();
        if self.next > now {
            sleep(self.next - now).await;
        }

        let now = Instant::now();
        if self.interval.is_zero() {
            self.next = now;
            return 0;
        }

        let mut skipped = 0;
        self.next += self.interval;
        while self.next <= now {
            self.next += self.interval;
            skipped += 1;
        }
        skipped
    }
}
