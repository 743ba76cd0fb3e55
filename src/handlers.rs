// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the registrar admission service.
//!
//! The handlers validate the request body, resolve the caller's identity and
//! policy, and hand the decision to [`AdmissionDecider`].

use crate::admission::{AdmissionDecider, AdmissionPolicy, Rejection, RejectionCategory, Verdict};
use crate::config::Config;
use crate::identity::{Candidate, Identity};
use crate::validator::{RegistrationValidator, ValidationResult};
use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Header set by Cloudflare with the original client address.
pub const CLIENT_IP_HEADER: &str = "CF-Connecting-IP";

/// Non-standard status used for content the registry refuses to host.
const UNAVAILABLE_CONTENT: u16 = 450;

/// Shared application state.
pub struct AppState {
    pub decider: AdmissionDecider,
    pub validator: RegistrationValidator,
    pub config: Config,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Successful registration.
#[derive(Debug, Serialize)]
pub struct RegistrationResponse {
    pub name: String,
    pub tld: String,
    pub ip: String,
    pub secret_key: String,
}

/// New target for an existing domain.
#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub ip: String,
}

#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub ip: String,
}

/// Public view of a registered domain.
#[derive(Debug, Serialize)]
pub struct DomainResponse {
    pub name: String,
    pub tld: String,
    pub ip: String,
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/domain", post(register))
        .route("/domainapi/:key", post(register_api))
        .route("/domain/:key", put(update_domain).delete(delete_domain))
        .route("/domain/:name/:tld", get(lookup))
        .route("/tlds", get(tlds));

    if state.config.metrics.enabled {
        router = router.route(&state.config.metrics.path, get(metrics));
    }

    router.with_state(state)
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "registrar-admission",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Public registration: identity is the client address.
pub async fn register(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Result<Json<Candidate>, JsonRejection>,
) -> Response {
    let peer = connect_info.map(|ConnectInfo(addr)| addr);
    let identity = match client_identity(&headers, peer, state.config.trust_proxy_header) {
        Some(identity) => identity,
        None => {
            warn!("Could not determine client address");
            return error_response(
                StatusCode::BAD_REQUEST,
                "Could not determine client address".to_string(),
                "UNKNOWN_CLIENT",
            );
        }
    };

    let candidate = match parse_candidate(&state.validator, body) {
        Ok(candidate) => candidate,
        Err(response) => return response,
    };

    let policy = AdmissionPolicy::public(&state.config.admission);
    decide(&state, &identity, &candidate, &policy).await
}

/// Authorized registration: identity is the API key.
pub async fn register_api(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    body: Result<Json<Candidate>, JsonRejection>,
) -> Response {
    let Some(api_key) = state.config.api_keys.get(&key) else {
        info!("Unknown API key presented");
        return invalid_api_key();
    };
    let Ok(identity) = Identity::api_key(key.as_str(), api_key.owner.as_str()) else {
        return invalid_api_key();
    };

    let candidate = match parse_candidate(&state.validator, body) {
        Ok(candidate) => candidate,
        Err(response) => return response,
    };

    debug!(owner = %api_key.owner, domain = %candidate.domain(), "Authorized registration");
    let policy = AdmissionPolicy::authorized(&state.config.admission, api_key);
    decide(&state, &identity, &candidate, &policy).await
}

/// Point a domain at a new target, authorized by its secret key.
pub async fn update_domain(
    State(state): State<Arc<AppState>>,
    Path(secret_key): Path<String>,
    body: Result<Json<UpdateRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(request)) = body else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Invalid request".to_string(),
            "INVALID_REQUEST",
        );
    };

    if let ValidationResult::Invalid(err) = state.validator.validate_target(&request.ip) {
        return error_response(StatusCode::BAD_REQUEST, err.to_string(), "INVALID_TARGET");
    }

    match state.decider.store().update_target(&secret_key, &request.ip).await {
        Ok(Some(record)) => {
            info!(
                domain = %format!("{}.{}", record.name, record.tld),
                target = %record.target,
                "Domain updated"
            );
            Json(UpdateResponse { ip: record.target }).into_response()
        }
        Ok(None) => domain_not_found(),
        Err(e) => {
            error!(error = %e, "Domain update failed");
            store_error("Failed to update domain")
        }
    }
}

/// Remove a domain, authorized by its secret key.
pub async fn delete_domain(
    State(state): State<Arc<AppState>>,
    Path(secret_key): Path<String>,
) -> Response {
    match state.decider.store().delete(&secret_key).await {
        Ok(true) => {
            info!("Domain deleted");
            StatusCode::OK.into_response()
        }
        Ok(false) => domain_not_found(),
        Err(e) => {
            error!(error = %e, "Domain delete failed");
            store_error("Failed to delete domain")
        }
    }
}

/// Look up a registered domain.
pub async fn lookup(
    State(state): State<Arc<AppState>>,
    Path((name, tld)): Path<(String, String)>,
) -> Response {
    match state.decider.store().get(&name, &tld).await {
        Ok(Some(record)) => Json(DomainResponse {
            name: record.name,
            tld: record.tld,
            ip: record.target,
        })
        .into_response(),
        Ok(None) => domain_not_found(),
        Err(e) => {
            error!(error = %e, "Domain lookup failed");
            store_error("Failed to look up domain")
        }
    }
}

/// Registrable TLDs.
pub async fn tlds(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.validator.tlds().to_vec())
}

/// Prometheus metrics.
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.decider.render_metrics().await,
    )
}

async fn decide(
    state: &AppState,
    identity: &Identity,
    candidate: &Candidate,
    policy: &AdmissionPolicy,
) -> Response {
    match state.decider.decide(identity, candidate, policy).await {
        Ok(Verdict::Admitted(record)) => Json(RegistrationResponse {
            name: record.name,
            tld: record.tld,
            ip: record.target,
            secret_key: record.secret_key,
        })
        .into_response(),
        Ok(Verdict::Rejected(rejection)) => rejection_response(&rejection),
        Err(e) => {
            error!(error = %e, domain = %candidate.domain(), "Failed to create domain");
            store_error("Failed to create domain")
        }
    }
}

fn parse_candidate(
    validator: &RegistrationValidator,
    body: Result<Json<Candidate>, JsonRejection>,
) -> Result<Candidate, Response> {
    let Json(candidate) = body.map_err(|e| {
        debug!(error = %e, "Malformed registration body");
        error_response(
            StatusCode::BAD_REQUEST,
            "Invalid request".to_string(),
            "INVALID_REQUEST",
        )
    })?;

    if let ValidationResult::Invalid(err) = validator.validate(&candidate) {
        info!(domain = %candidate.domain(), error = %err, "Validation failed");
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            err.to_string(),
            "INVALID_DOMAIN",
        ));
    }
    Ok(candidate)
}

/// Resolve the caller's identity: the proxy header when trusted and present,
/// otherwise the peer address.
pub fn client_identity(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_proxy_header: bool,
) -> Option<Identity> {
    if trust_proxy_header {
        let forwarded = headers
            .get(CLIENT_IP_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(ip) = forwarded {
            return Identity::new(ip).ok();
        }
    }
    peer.and_then(|addr| Identity::new(addr.ip().to_string()).ok())
}

fn rejection_response(rejection: &Rejection) -> Response {
    let (status, code) = match (rejection.category(), rejection) {
        (RejectionCategory::RateLimited, Rejection::BudgetExhausted) => {
            (StatusCode::TOO_MANY_REQUESTS, "BUDGET_EXHAUSTED")
        }
        (RejectionCategory::RateLimited, _) => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
        (_, Rejection::UnsafeContent) => (
            StatusCode::from_u16(UNAVAILABLE_CONTENT).unwrap_or(StatusCode::FORBIDDEN),
            "INAPPROPRIATE_CONTENT",
        ),
        (RejectionCategory::SpamOrAbuse, _) => (StatusCode::NOT_ACCEPTABLE, "SPAM"),
        (RejectionCategory::Conflict, _) => (StatusCode::CONFLICT, "ALREADY_REGISTERED"),
    };

    let retry_after_secs = rejection.retry_after().map(|d| d.as_secs().max(1));
    let body = Json(ErrorResponse {
        error: rejection.to_string(),
        code,
        retry_after_secs,
    });

    match retry_after_secs {
        Some(secs) => (status, [(header::RETRY_AFTER, secs.to_string())], body).into_response(),
        None => (status, body).into_response(),
    }
}

fn invalid_api_key() -> Response {
    error_response(
        StatusCode::FORBIDDEN,
        "Invalid API key".to_string(),
        "INVALID_API_KEY",
    )
}

fn domain_not_found() -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        "Domain not found".to_string(),
        "NOT_FOUND",
    )
}

fn store_error(message: &str) -> Response {
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        message.to_string(),
        "STORE_ERROR",
    )
}

fn error_response(status: StatusCode, error: String, code: &'static str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error,
            code,
            retry_after_secs: None,
        }),
    )
        .into_response()
}
