//! Rolling-window rate gate for primary provider calls.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Admits at most `max_calls` calls in any rolling `window`.
///
/// Callers beyond the budget wait until the oldest admitted call leaves the
/// window; they are never dropped. Each resolver owns its own gate, so
/// separate resolvers never share throttling state.
pub struct RateGate {
    admitted: Mutex<VecDeque<Instant>>,
    max_calls: usize,
    window: Duration,
}

impl RateGate {
    pub fn new(max_calls: usize, window: Duration) -> Self {
        RateGate {
            admitted: Mutex::new(VecDeque::with_capacity(max_calls)),
            max_calls: max_calls.max(1),
            window,
        }
    }

    /// Waits for a slot in the window.
    ///
    /// Returns `false` without taking a slot if `cancel` fires first.
    pub async fn acquire(&self, cancel: &CancellationToken) -> bool {
        loop {
            if cancel.is_cancelled() {
                return false;
            }

            let wait = {
                let mut admitted = self.admitted.lock().await;
                let now = Instant::now();

                // Remove calls that have left the window
                while let Some(front) = admitted.front() {
                    if now.duration_since(*front) >= self.window {
                        admitted.pop_front();
                    } else {
                        break;
                    }
                }

                if admitted.len() < self.max_calls {
                    admitted.push_back(now);
                    return true;
                }

                match admitted.front() {
                    Some(oldest) => (*oldest + self.window).saturating_duration_since(now),
                    None => Duration::ZERO,
                }
            };

            log::debug!("Rate budget exhausted, waiting {:?}", wait);
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = cancel.cancelled() => return false,
            }
        }
    }

    /// Calls admitted within the current window.
    pub async fn in_window(&self) -> usize {
        let admitted = self.admitted.lock().await;
        let now = Instant::now();
        admitted
            .iter()
            .filter(|t| now.duration_since(**t) < self.window)
            .count()
    }
}
