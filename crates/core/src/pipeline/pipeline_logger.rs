use std::collections::BTreeMap;
use std::time::Instant;

/// Observer for detection-loop and scan events.
///
/// Keeps the loop free of any particular output mechanism; the CLI logs
/// through the `log` facade while tests discard everything.
pub trait PipelineLogger: Send {
    /// Count one completed detection cycle.
    fn cycle(&mut self);

    /// Record how long a named stage took, in milliseconds.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time value such as the track stability.
    fn metric(&mut self, name: &str, value: f64);

    /// A discrete lifecycle event (scan started, result discarded, ...).
    fn event(&mut self, message: &str);

    /// Emit an end-of-session summary. Default: no-op.
    fn summary(&self) {}
}

pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn cycle(&mut self) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn event(&mut self, _message: &str) {}
}

#[derive(Default)]
struct Series {
    count: usize,
    total: f64,
    min: f64,
    max: f64,
}

impl Series {
    fn push(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.total += value;
    }

    fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }
}

/// Aggregates timings and metrics and reports them through `log`.
///
/// Series are kept as running aggregates so long sessions stay bounded in
/// memory.
pub struct LogPipelineLogger {
    timings: BTreeMap<String, Series>,
    metrics: BTreeMap<String, Series>,
    cycles: usize,
    events: usize,
    start_time: Instant,
}

impl LogPipelineLogger {
    pub fn new() -> Self {
        Self {
            timings: BTreeMap::new(),
            metrics: BTreeMap::new(),
            cycles: 0,
            events: 0,
            start_time: Instant::now(),
        }
    }

    pub fn cycles(&self) -> usize {
        self.cycles
    }

    pub fn events(&self) -> usize {
        self.events
    }

    /// `(count, avg)` for a stage.
    pub fn timing_stats(&self, stage: &str) -> Option<(usize, f64)> {
        self.timings.get(stage).map(|s| (s.count, s.avg()))
    }

    /// `(min, avg, max)` for a metric.
    pub fn metric_stats(&self, name: &str) -> Option<(f64, f64, f64)> {
        self.metrics.get(name).map(|s| (s.min, s.avg(), s.max))
    }

    /// Returns the formatted summary, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.cycles == 0 && self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }
        let elapsed_s = self.start_time.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Session summary ({} cycles, {} events, {elapsed_s:.1}s):",
            self.cycles, self.events
        )];

        for (stage, s) in &self.timings {
            lines.push(format!(
                "  {stage:12}: avg {:6.1}ms  max {:6.1}ms  ({} samples)",
                s.avg(),
                s.max,
                s.count
            ));
        }
        for (name, s) in &self.metrics {
            lines.push(format!(
                "  {name}: avg {:.1}  min {:.1}  max {:.1}",
                s.avg(),
                s.min,
                s.max
            ));
        }
        if self.cycles > 0 && elapsed_s > 0.0 {
            lines.push(format!(
                "  Detection rate: {:.1} cycles/s",
                self.cycles as f64 / elapsed_s
            ));
        }
        Some(lines.join("\n"))
    }
}

impl Default for LogPipelineLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineLogger for LogPipelineLogger {
    fn cycle(&mut self) {
        self.cycles += 1;
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_string()).or_default().push(value);
    }

    fn event(&mut self, message: &str) {
        self.events += 1;
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
