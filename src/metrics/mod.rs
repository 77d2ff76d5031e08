use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

// ============================================================================
// Metrics Module - Prometheus metrics for the aggregate store
// ============================================================================
//
// Provides metrics for:
// - Events appended and streams started, per aggregate type
// - Failed record attempts, per failure reason
// - Reconstructions: count, replayed events, replay latency
//
// The registry is owned here; exposing it (HTTP or otherwise) is up to
// the embedding application.
// ============================================================================

pub struct Metrics {
    registry: Registry,

    // Write side
    pub events_appended: IntCounterVec,
    pub streams_started: IntCounterVec,
    pub append_failures: IntCounterVec,

    // Read side
    pub aggregates_reconstructed: IntCounterVec,
    pub replayed_events: IntCounterVec,
    pub replay_duration: HistogramVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let events_appended = IntCounterVec::new(
            Opts::new("events_appended_total", "Total events handed to the event log"),
            &["aggregate_type"],
        )?;
        registry.register(Box::new(events_appended.clone()))?;

        let streams_started = IntCounterVec::new(
            Opts::new("streams_started_total", "Total streams created in the event log"),
            &["aggregate_type"],
        )?;
        registry.register(Box::new(streams_started.clone()))?;

        let append_failures = IntCounterVec::new(
            Opts::new("append_failures_total", "Total record attempts rejected or failed"),
            &["aggregate_type", "reason"],
        )?;
        registry.register(Box::new(append_failures.clone()))?;

        let aggregates_reconstructed = IntCounterVec::new(
            Opts::new("aggregates_reconstructed_total", "Total aggregates rebuilt by replay"),
            &["aggregate_type"],
        )?;
        registry.register(Box::new(aggregates_reconstructed.clone()))?;

        let replayed_events = IntCounterVec::new(
            Opts::new("replayed_events_total", "Total events folded during replay"),
            &["aggregate_type"],
        )?;
        registry.register(Box::new(replayed_events.clone()))?;

        let replay_duration = HistogramVec::new(
            HistogramOpts::new("replay_duration_seconds", "Time to read and fold one stream")
                .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
            &["aggregate_type"],
        )?;
        registry.register(Box::new(replay_duration.clone()))?;

        Ok(Self {
            registry,
            events_appended,
            streams_started,
            append_failures,
            aggregates_reconstructed,
            replayed_events,
            replay_duration,
        })
    }

    /// Get the Prometheus registry for exposing metrics
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Helper to record a successful append
    pub fn record_append(&self, aggregate_type: &str, event_count: usize, started_stream: bool) {
        self.events_appended
            .with_label_values(&[aggregate_type])
            .inc_by(event_count as u64);
        if started_stream {
            self.streams_started.with_label_values(&[aggregate_type]).inc();
        }
    }

    /// Helper to record a failed append
    pub fn record_append_failure(&self, aggregate_type: &str, reason: &str) {
        self.append_failures
            .with_label_values(&[aggregate_type, reason])
            .inc();
    }

    /// Helper to record one reconstruction
    pub fn record_replay(&self, aggregate_type: &str, event_count: usize, duration_secs: f64) {
        self.aggregates_reconstructed
            .with_label_values(&[aggregate_type])
            .inc();
        self.replayed_events
            .with_label_values(&[aggregate_type])
            .inc_by(event_count as u64);
        self.replay_duration
            .with_label_values(&[aggregate_type])
            .observe(duration_secs);
    }

    /// Text exposition format of every registered metric
    pub fn render(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        // vectors without observed labels are not gathered yet
        metrics.record_append("Account", 1, true);
        assert!(!metrics.registry().gather().is_empty());
    }

    #[test]
    fn test_record_append() {
        let metrics = Metrics::new().unwrap();
        metrics.record_append("Account", 3, true);
        metrics.record_append("Account", 2, false);

        assert_eq!(metrics.events_appended.with_label_values(&["Account"]).get(), 5);
        assert_eq!(metrics.streams_started.with_label_values(&["Account"]).get(), 1);
    }

    #[test]
    fn test_record_append_failure_by_reason() {
        let metrics = Metrics::new().unwrap();
        metrics.record_append_failure("Account", "conflict");
        metrics.record_append_failure("Account", "conflict");
        metrics.record_append_failure("Account", "database");

        let conflicts = metrics.append_failures.with_label_values(&["Account", "conflict"]);
        assert_eq!(conflicts.get(), 2);
    }

    #[test]
    fn test_record_replay() {
        let metrics = Metrics::new().unwrap();
        metrics.record_replay("Account", 4, 0.002);

        assert_eq!(metrics.aggregates_reconstructed.with_label_values(&["Account"]).get(), 1);
        assert_eq!(metrics.replayed_events.with_label_values(&["Account"]).get(), 4);
        assert_eq!(
            metrics.replay_duration.with_label_values(&["Account"]).get_sample_count(),
            1
        );
    }

    #[test]
    fn test_render_exposition() {
        let metrics = Metrics::new().unwrap();
        metrics.record_append("Account", 1, true);

        let text = metrics.render().unwrap();
        assert!(text.contains("events_appended_total{aggregate_type=\"Account\"} 1"));
    }
}
