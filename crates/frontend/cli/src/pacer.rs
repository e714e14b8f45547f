use std::thread;
use std::time::{Duration, Instant};

/// Lag after which the pacer stops trying to catch up and restarts the
/// schedule from now.
const MAX_CATCH_UP: Duration = Duration::from_millis(100);

/// Fixed-rate frame scheduler. Frames that run late are not skipped; the
/// pacer just stops sleeping until it is back on schedule.
pub struct FramePacer {
    period: Duration,
    next: Instant,
}

impl FramePacer {
    pub fn new(rate_hz: f64) -> Self {
        Self::starting_at(rate_hz, Instant::now())
    }

    fn starting_at(rate_hz: f64, start: Instant) -> Self {
        let rate_hz = if rate_hz.is_finite() && rate_hz > 0.0 {
            rate_hz
        } else {
            60.0
        };
        Self {
            period: Duration::from_secs_f64(1.0 / rate_hz),
            next: start,
        }
    }

    /// Block until the next frame is due.
    pub fn wait(&mut self) {
        if let Some(delay) = self.advance(Instant::now()) {
            thread::sleep(delay);
        }
    }

    /// Schedule the next frame and return how long to sleep before it.
    fn advance(&mut self, now: Instant) -> Option<Duration> {
        let delay = if now < self.next {
            Some(self.next - now)
        } else {
            if now - self.next > MAX_CATCH_UP {
                self.next = now;
            }
            None
        };
        self.next += self.period;
        delay
    }
}
