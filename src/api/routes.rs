use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use http::HeaderName;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::services::{AccountService, TransactionHandler};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub account_service: Arc<AccountService>,
    pub transaction_handler: Arc<TransactionHandler>,
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        account_service: Arc<AccountService>,
        transaction_handler: Arc<TransactionHandler>,
    ) -> Self {
        Self {
            account_service,
            transaction_handler,
            metrics_handle: None,
        }
    }

    /// Adds metrics handle to the state.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }
}

/// Creates the main API router with all routes.
pub fn create_router(state: AppState) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        // Account endpoints
        .route(
            "/account",
            post(handlers::create_account)
                .delete(handlers::delete_account)
                .get(handlers::list_accounts),
        )
        // Transaction endpoints
        .route("/transaction/use", post(handlers::use_balance))
        .route("/transaction/cancel", post(handlers::cancel_balance))
        .route("/transaction/:transaction_id", get(handlers::query_transaction))
        .route_layer(middleware::from_fn(handlers::track_http_metrics))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .with_state(state)
}
