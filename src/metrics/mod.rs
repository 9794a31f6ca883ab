use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::Encoder;
use prometheus::IntCounterVec;
use prometheus::Opts;
use prometheus::Registry;
use tracing::warn;

pub(crate) const RESULT_ACCEPTED: &str = "accepted";
pub(crate) const RESULT_REJECTED: &str = "rejected";
pub(crate) const RESULT_FAILED: &str = "failed";
pub(crate) const RESULT_OK: &str = "ok";
pub(crate) const RESULT_REPEATED: &str = "repeated";

lazy_static! {
    pub static ref PREPARE_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("dconf_prepare_total", "Prepare requests handled by this node"),
        &["result"]
    )
    .expect("metric can not be created");

    pub static ref COMMIT_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("dconf_commit_total", "Commit requests handled by this node"),
        &["result"]
    )
    .expect("metric can not be created");

    pub static ref ROLLBACK_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("dconf_rollback_total", "Rollback requests handled by this node"),
        &["result"]
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = Registry::new();
}

static REGISTER_ONCE: Once = Once::new();

pub fn register_custom_metrics(registry: &Registry) -> prometheus::Result<()> {
    registry.register(Box::new(PREPARE_TOTAL.clone()))?;
    registry.register(Box::new(COMMIT_TOTAL.clone()))?;
    registry.register(Box::new(ROLLBACK_TOTAL.clone()))?;
    Ok(())
}

/// Registers the protocol counters in [`REGISTRY`]; later calls are no-ops
pub fn init_metrics() {
    REGISTER_ONCE.call_once(|| {
        if let Err(e) = register_custom_metrics(&REGISTRY) {
            warn!("could not register dconf metrics: {}", e);
        }
    });
}

/// Text exposition of everything in `registry`
pub fn gather_metrics(registry: &Registry) -> String {
    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&registry.gather(), &mut buffer) {
        warn!("could not encode custom metrics: {}", e);
    }
    match String::from_utf8(buffer) {
        Ok(v) => v,
        Err(e) => {
            warn!("custom metrics could not be from_utf8'd: {}", e);
            String::default()
        }
    }
}
