//! Honeypot service binary entrypoint.
//! Boots the Axum HTTP server: config, tracing, engine, background jobs, metrics.

use honeypot_intel::config::HoneypotConfig;
use honeypot_intel::metrics::Metrics;
use honeypot_intel::session::store::spawn_ttl_sweeper;
use honeypot_intel::{build_state, logging, router};
use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    logging::init_tracing();

    let cfg = HoneypotConfig::from_env();
    let state = build_state(&cfg)?;
    let store = state.engine.store().clone();

    if let Some(ttl) = cfg.session_ttl {
        spawn_ttl_sweeper(store.clone(), ttl);
        tracing::info!(target: "honeypot", ttl_secs = ttl.as_secs(), "session ttl sweep enabled");
    }

    let mut app = router(state);
    match Metrics::init() {
        Ok(m) => app = app.merge(m.router(store)),
        Err(e) => tracing::warn!(target: "honeypot", "metrics disabled: {e:#}"),
    }

    Ok(app.into())
}
