use std::time::{Duration, Instant};

/// Per-step timing and occurrence counters, tagged by solver phase.
/// Produced for display only; nothing in the solver reads these back to
/// make decisions.
#[derive(Debug, Clone, Default)]
pub struct SolverStats {
    start: Option<Instant>,
    last: Option<Instant>,
    times: Vec<(&'static str, Duration)>,
    occurred: Vec<(&'static str, u64)>,
}

impl SolverStats {
    pub fn new() -> Self { Self::default() }

    /// Mark the clock, optionally attributing the elapsed time since the
    /// last mark to `tag`.
    pub fn tick(&mut self, tag: Option<&'static str>) {
        let now = Instant::now();
        if self.start.is_none() { self.start = Some(now); }

        if let Some(tag) = tag {
            let elapsed = now.duration_since(self.last.unwrap_or(now));
            match self.times.iter_mut().find(|(t, _)| *t == tag) {
                Some((_, d)) => *d += elapsed,
                None => self.times.push((tag, elapsed)),
            }
            match self.occurred.iter_mut().find(|(t, _)| *t == tag) {
                Some((_, c)) => *c += 1,
                None => self.occurred.push((tag, 1)),
            }
        }
        self.last = Some(now);
    }

    /// Seconds since the first `tick`, or -1 if never ticked.
    pub fn elapsed_seconds(&self) -> f64 {
        match self.start {
            None => -1.0,
            Some(start) => self.last.unwrap_or(start).duration_since(start).as_secs_f64(),
        }
    }

    pub fn times(&self) -> &[(&'static str, Duration)] { &self.times }

    pub fn occurred(&self) -> &[(&'static str, u64)] { &self.occurred }

    /// Render a one-line plain-text summary (no progress-bar/color crate).
    pub fn summarize(&self, placed: usize, total: usize, failures: usize) -> String {
        let total_time: f64 = self.times.iter().map(|(_, d)| d.as_secs_f64()).sum();
        let mut parts = vec![format!("placed {}/{}", placed, total), format!("failures {}", failures)];
        for (tag, duration) in &self.times {
            let pct = if total_time > 0.0 { 100.0 * duration.as_secs_f64() / total_time } else { 0.0 };
            parts.push(format!("{}: {:.1}%", tag, pct));
        }
        parts.join(" | ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_is_negative_one_before_first_tick() {
        let stats = SolverStats::new();
        assert_eq!(stats.elapsed_seconds(), -1.0);
    }

    #[test]
    fn tick_accumulates_tagged_durations() {
        let mut stats = SolverStats::new();
        stats.tick(None);
        stats.tick(Some("place"));
        stats.tick(Some("place"));
        assert_eq!(stats.occurred().iter().find(|(t, _)| *t == "place").unwrap().1, 2);
        assert!(stats.elapsed_seconds() >= 0.0);
    }
}
