use prometheus::{
    Counter, CounterVec, Encoder, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Prometheus metrics for query compilation and search execution
#[derive(Clone)]
pub struct SearchMetrics {
    // Counters
    pub queries_compiled: Counter,
    pub searches_total: CounterVec,
    pub search_errors: Counter,
    pub unreconciled_results: Counter,
    pub entity_fetches: CounterVec,

    // Histograms
    pub highlight_latency: Histogram,

    // Registry
    registry: Arc<Registry>,
}

impl SearchMetrics {
    /// Create a new SearchMetrics instance
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Counters
        let queries_compiled = Counter::with_opts(Opts::new(
            "filterql_queries_compiled_total",
            "Total number of query documents compiled",
        ))?;
        registry.register(Box::new(queries_compiled.clone()))?;

        let searches_total = CounterVec::new(
            Opts::new("filterql_searches_total", "Total number of searches by kind"),
            &["kind"],
        )?;
        registry.register(Box::new(searches_total.clone()))?;

        let search_errors = Counter::with_opts(Opts::new(
            "filterql_search_errors_total",
            "Total number of failed searches",
        ))?;
        registry.register(Box::new(search_errors.clone()))?;

        let unreconciled_results = Counter::with_opts(Opts::new(
            "filterql_unreconciled_results_total",
            "Highlighted results returned without an entity",
        ))?;
        registry.register(Box::new(unreconciled_results.clone()))?;

        let entity_fetches = CounterVec::new(
            Opts::new(
                "filterql_entity_fetches_total",
                "Bulk entity fetches issued by the highlighter",
            ),
            &["entity_type"],
        )?;
        registry.register(Box::new(entity_fetches.clone()))?;

        // Histograms
        let highlight_latency = Histogram::with_opts(
            HistogramOpts::new(
                "filterql_highlight_latency_seconds",
                "End-to-end highlight search latency",
            )
            .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
        )?;
        registry.register(Box::new(highlight_latency.clone()))?;

        Ok(Self {
            queries_compiled,
            searches_total,
            search_errors,
            unreconciled_results,
            entity_fetches,
            highlight_latency,
            registry: Arc::new(registry),
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Record a compiled query document
    pub fn record_compile(&self) {
        self.queries_compiled.inc();
    }

    /// Record a search of the given kind (`list` or `highlight`)
    pub fn record_search(&self, kind: &str) {
        self.searches_total.with_label_values(&[kind]).inc();
    }

    /// Record a search error
    pub fn record_search_error(&self) {
        self.search_errors.inc();
    }

    /// Record the end-to-end duration of a highlight search
    pub fn record_highlight(&self, duration_secs: f64) {
        self.highlight_latency.observe(duration_secs);
    }

    /// Record one bulk entity fetch
    pub fn record_fetch(&self, entity_type: &str) {
        self.entity_fetches.with_label_values(&[entity_type]).inc();
    }

    pub fn record_unreconciled(&self, count: usize) {
        self.unreconciled_results.inc_by(count as f64);
    }

    /// Text exposition of every registered metric
    pub fn gather(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if encoder.encode(&self.registry.gather(), &mut buffer).is_err() {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_exposition() {
        let metrics = SearchMetrics::new().unwrap();
        metrics.record_compile();
        metrics.record_search("highlight");
        metrics.record_fetch("Invoice");
        metrics.record_unreconciled(3);
        metrics.record_highlight(0.02);

        let text = metrics.gather();
        assert!(text.contains("filterql_queries_compiled_total 1"));
        assert!(text.contains("filterql_searches_total{kind=\"highlight\"} 1"));
        assert!(text.contains("filterql_entity_fetches_total{entity_type=\"Invoice\"} 1"));
        assert!(text.contains("filterql_unreconciled_results_total 3"));
        assert!(text.contains("filterql_highlight_latency_seconds_count 1"));
    }

    #[test]
    fn test_independent_registries() {
        let a = SearchMetrics::new().unwrap();
        let b = SearchMetrics::new().unwrap();
        a.record_search_error();
        assert!(a.gather().contains("filterql_search_errors_total 1"));
        assert!(b.gather().contains("filterql_search_errors_total 0"));
    }
}
