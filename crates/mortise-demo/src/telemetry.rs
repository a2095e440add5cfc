//! Metrics recorder for the demo runner
//!
//! The core crate only emits counters through the `metrics` facade. The demo
//! installs a Prometheus recorder without an HTTP listener and renders a
//! snapshot of the `mortise_*` counters once the jobs are done.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the global Prometheus recorder
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Log the current counters in Prometheus text format
pub fn log_snapshot(handle: &PrometheusHandle) {
    let rendered = handle.render();
    if rendered.is_empty() {
        tracing::info!("No lock metrics recorded");
        return;
    }
    tracing::info!("Lock metrics\n{}", rendered);
}

#[cfg(test)]
mod tests {
    use metrics_exporter_prometheus::PrometheusBuilder;

    #[test]
    fn test_lock_counters_rendered() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            metrics::counter!("mortise_unlock_total", "result" => "released").increment(2);
        });

        let rendered = handle.render();
        assert!(rendered.contains("mortise_unlock_total"));
        assert!(rendered.contains("result=\"released\""));
    }
}
