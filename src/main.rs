// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Registrar Admission Service
//!
//! Public domain registration endpoint guarded by layered admission control.
//!
//! ## Endpoints
//!
//! - `POST /domain`: anonymous registration, limited per client IP
//! - `POST /domainapi/{key}`: registration by an authorized integrator
//! - `GET /domain/{name}/{tld}`: look up a registered domain
//! - `GET /tlds`: registrable TLDs
//! - `GET /health`, `GET /metrics`
//!
//! ## Configuration
//!
//! Read from `REGISTRAR_CONFIG` (default `registrar.toml`) and `REGISTRAR__*`
//! environment variables, e.g.:
//!
//! - `REGISTRAR__BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `REGISTRAR__TRUST_PROXY_HEADER`: use `CF-Connecting-IP` (default: false)
//! - `REGISTRAR__CLASSIFIER__API_KEY`: classifier bearer token

use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use registrar_admission::{
    classifier::{ChatClassifier, Classifier, PermissiveClassifier},
    config::Config,
    handlers::{router, AppState},
    store::MemoryStore,
    validator::RegistrationValidator,
    AdmissionDecider, BackgroundJobs,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    let config_path =
        std::env::var("REGISTRAR_CONFIG").unwrap_or_else(|_| "registrar.toml".to_string());
    let config = Config::load(&config_path)?;
    info!(
        bind_addr = %config.bind_addr,
        public_burst = config.admission.public_identity_burst,
        public_quota = config.admission.public_hourly_quota,
        global_burst = config.admission.global_burst,
        global_hourly = config.admission.global_hourly_capacity,
        api_keys = config.api_keys.len(),
        "Starting registrar admission service"
    );

    let classifier: Arc<dyn Classifier> = match &config.classifier.api_key {
        Some(key) => Arc::new(ChatClassifier::new(
            &config.classifier,
            key.clone(),
            config.admission.classifier_timeout(),
        )?),
        None => {
            warn!("No classifier API key configured, content and spam screening disabled");
            Arc::new(PermissiveClassifier)
        }
    };

    let decider = AdmissionDecider::new(&config.admission, classifier, Arc::new(MemoryStore::new()))?;
    let jobs = BackgroundJobs::for_admission(&decider, &config.admission);
    let validator = RegistrationValidator::new(&config.tlds);

    let state = Arc::new(AppState {
        decider,
        validator,
        config: config.clone(),
    });

    let app: Router = router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    jobs.shutdown().await;
    info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
