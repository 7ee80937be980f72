use std::sync::OnceLock;

use metrics::{describe_counter, describe_histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

pub(crate) const ATTEMPTS_STARTED: &str = "attempts_started_total";
pub(crate) const ATTEMPTS_SUBMITTED: &str = "attempts_submitted_total";
pub(crate) const SUBMISSION_CONFLICTS: &str = "submission_conflicts_total";
pub(crate) const QUESTION_SHORTFALL: &str = "question_shortfall_total";

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled || PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    describe();
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

fn describe() {
    describe_counter!("http_requests_total", "HTTP responses by status code");
    describe_histogram!(
        "http_request_duration_seconds",
        Unit::Seconds,
        "HTTP request latency by status code"
    );
    describe_counter!(ATTEMPTS_STARTED, "Attempts created, by outcome");
    describe_counter!(ATTEMPTS_SUBMITTED, "Attempts finalized and scored");
    describe_counter!(SUBMISSION_CONFLICTS, "Submits rejected because the attempt was already scored");
    describe_counter!(QUESTION_SHORTFALL, "Sections generated with fewer questions than requested");
}
