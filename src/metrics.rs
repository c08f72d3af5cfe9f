//! Curation metrics — Prometheus collectors behind a small trait.

use std::time::{Duration, Instant};

use prometheus::{
    Encoder, HistogramOpts, HistogramTimer, HistogramVec, IntCounterVec, Opts, Registry,
    TextEncoder,
};

/// Metrics sink injected into the curator.
pub trait Metrics: Send + Sync {
    /// Start timing a curation run for the given channel label.
    fn start_timer(&self, label: &str) -> RunTimer;

    /// Add `amount` to the candidate counter for the given channel label.
    fn increment_counter(&self, label: &str, amount: u64);
}

/// Running timer for one curation run.
pub struct RunTimer {
    started: Instant,
    histogram: Option<HistogramTimer>,
}

impl RunTimer {
    fn new(histogram: Option<HistogramTimer>) -> Self {
        Self {
            started: Instant::now(),
            histogram,
        }
    }

    /// Record the elapsed time and return it.
    pub fn observe_duration(self) -> Duration {
        if let Some(timer) = self.histogram {
            timer.observe_duration();
        }
        self.started.elapsed()
    }
}

/// Metrics sink used when metrics are disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl Metrics for NoopMetrics {
    fn start_timer(&self, _label: &str) -> RunTimer {
        RunTimer::new(None)
    }

    fn increment_counter(&self, _label: &str, _amount: u64) {}
}

/// Prometheus-backed metrics.
pub struct PrometheusMetrics {
    registry: Registry,
    /// Curation run duration per channel.
    pub curator_length_seconds: HistogramVec,
    /// Candidate threads seen per channel.
    pub curator_messages_amount: IntCounterVec,
}

impl PrometheusMetrics {
    /// Create and register curation metrics on a fresh registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let curator_length_seconds = HistogramVec::new(
            HistogramOpts::new("curator_length_seconds", "Length of a curation run")
                .buckets(vec![0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0]),
            &["channel"],
        )?;
        registry.register(Box::new(curator_length_seconds.clone()))?;

        let curator_messages_amount = IntCounterVec::new(
            Opts::new(
                "curator_messages_amount",
                "Forum posts considered by the curator",
            ),
            &["channel"],
        )?;
        registry.register(Box::new(curator_messages_amount.clone()))?;

        Ok(Self {
            registry,
            curator_length_seconds,
            curator_messages_amount,
        })
    }

    /// Text exposition of every registered metric.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl Metrics for PrometheusMetrics {
    fn start_timer(&self, label: &str) -> RunTimer {
        RunTimer::new(Some(
            self.curator_length_seconds
                .with_label_values(&[label])
                .start_timer(),
        ))
    }

    fn increment_counter(&self, label: &str, amount: u64) {
        self.curator_messages_amount
            .with_label_values(&[label])
            .inc_by(amount);
    }
}
