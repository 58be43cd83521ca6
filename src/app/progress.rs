//! Progress logging.

use std::time::Instant;

use log::info;

/// Progress sink that logs every `interval` completions and at the end.
pub struct LogProgress {
    label: &'static str,
    interval: usize,
    start_time: Instant,
    last_logged: usize,
}

impl LogProgress {
    pub fn new(label: &'static str, interval: usize) -> Self {
        LogProgress {
            label,
            interval: interval.max(1),
            start_time: Instant::now(),
            last_logged: 0,
        }
    }

    /// Records `done` of `total`; returns true if a line was logged.
    pub fn update(&mut self, done: usize, total: usize) -> bool {
        let due = done >= total || done - self.last_logged.min(done) >= self.interval;
        if !due || done == self.last_logged {
            return false;
        }
        self.last_logged = done;

        let elapsed_secs = self.start_time.elapsed().as_secs_f64();
        let rate = if elapsed_secs > 0.0 {
            done as f64 / elapsed_secs
        } else {
            0.0
        };
        info!(
            "{} {}/{} addresses in {:.2} seconds (~{:.2}/sec)",
            self.label, done, total, elapsed_secs, rate
        );
        true
    }

    /// Callback form for `AddressResolver::resolve_many`.
    pub fn sink(&mut self) -> impl FnMut(usize, usize) + Send + '_ {
        move |done, total| {
            self.update(done, total);
        }
    }
}
