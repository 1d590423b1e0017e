//! Prometheus text dump of the core metrics.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use prometheus::{Encoder, Registry, TextEncoder};

/// Registry holding every core collector.
static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    for metric in trackline_core::metrics::all_metrics() {
        if let Err(e) = registry.register(metric) {
            tracing::warn!(error = %e, "Failed to register metric");
        }
    }
    registry
});

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .context("Failed to encode metrics")?;
    String::from_utf8(buffer).context("Metrics output is not UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_includes_core_metrics() {
        trackline_core::metrics::RELOGINS
            .with_label_values(&["cli-test"])
            .inc();

        let text = encode_metrics().unwrap();
        assert!(text.contains("trackline_relogins_total"));
    }
}
