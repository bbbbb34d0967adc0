use std::time::{Duration, Instant};

/// Timing snapshot handed to update callbacks.
#[derive(Debug, Copy, Clone)]
pub struct TickTime {
    /// Seconds since the previous tick, clamped.
    pub dt: f32,

    /// Seconds since the clock was created or last reset.
    pub elapsed: f32,

    /// Monotonic tick counter, starting at zero.
    pub tick: u64,
}

/// Per-window tick clock.
///
/// Delta time is clamped so a paused debugger or a minimized window does not
/// produce pathological values downstream.
#[derive(Debug, Clone)]
pub struct TickClock {
    origin: Instant,
    last: Instant,
    tick: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl TickClock {
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        let now = Instant::now();
        Self {
            origin: now,
            last: now,
            tick: 0,
            dt_min,
            dt_max,
        }
    }

    /// Restarts both the delta baseline and `elapsed`.
    pub fn reset(&mut self) {
        let now = Instant::now();
        self.origin = now;
        self.last = now;
    }

    pub fn tick(&mut self) -> TickTime {
        let now = Instant::now();
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.dt_min, self.dt_max);
        self.last = now;

        let time = TickTime {
            dt: dt.as_secs_f32(),
            elapsed: now.saturating_duration_since(self.origin).as_secs_f32(),
            tick: self.tick,
        };
        self.tick = self.tick.wrapping_add(1);
        time
    }

    /// Number of ticks produced so far.
    pub fn ticks(&self) -> u64 {
        self.tick
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new()
    }
}
