use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use validator::{Validate, ValidationErrors};

use crate::api::requests::{
    CancelBalanceRequest, CreateAccountRequest, DeleteAccountRequest, ListAccountsQuery,
    UseBalanceRequest,
};
use crate::api::responses::{
    AccountInfo, CancelBalanceResponse, CreateAccountResponse, DeleteAccountResponse,
    ErrorResponse, HealthResponse, QueryTransactionResponse, UseBalanceResponse,
    ValidationErrorDetail,
};
use crate::error::{AppError, ErrorCode};
use crate::observability::get_metrics;

use super::routes::AppState;

/// Error half of every handler result.
pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Maps an application error to its HTTP status and body.
pub fn error_response(error: AppError) -> ApiError {
    match error {
        AppError::Account(e) => {
            let status = if e.code == ErrorCode::LockAcquisitionTimeout {
                StatusCode::CONFLICT
            } else {
                StatusCode::BAD_REQUEST
            };
            (status, Json(ErrorResponse::new(e.code.as_str(), e.message)))
        }
        AppError::Validation(msg) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(ErrorCode::InvalidRequest.as_str(), msg)),
        ),
        e => {
            tracing::error!("Request failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(
                    ErrorCode::InternalServerError.as_str(),
                    ErrorCode::InternalServerError.description(),
                )),
            )
        }
    }
}

fn validation_error(errors: ValidationErrors) -> ApiError {
    let details: Vec<ValidationErrorDetail> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| ValidationErrorDetail {
                field: field.to_string(),
                message: e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string()),
            })
        })
        .collect();

    (
        StatusCode::BAD_REQUEST,
        Json(
            ErrorResponse::new(ErrorCode::InvalidRequest.as_str(), "Request validation failed")
                .with_details(details),
        ),
    )
}

/// Health check endpoint.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Prometheus scrape endpoint.
pub async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics_handle {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        ),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            "metrics recorder not installed".to_string(),
        ),
    }
}

// ============================================================================
// Account Handlers
// ============================================================================

/// Open a new account.
pub async fn create_account(
    State(state): State<AppState>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<CreateAccountResponse>), ApiError> {
    request.validate().map_err(validation_error)?;

    let account = state
        .account_service
        .create_account(request.into())
        .await
        .map_err(error_response)?;

    Ok((StatusCode::CREATED, Json(CreateAccountResponse::from(account))))
}

/// Unregister an account.
pub async fn delete_account(
    State(state): State<AppState>,
    Json(request): Json<DeleteAccountRequest>,
) -> Result<Json<DeleteAccountResponse>, ApiError> {
    request.validate().map_err(validation_error)?;

    let account = state
        .account_service
        .delete_account(request.into())
        .await
        .map_err(error_response)?;

    Ok(Json(DeleteAccountResponse::from(account)))
}

/// List a user's accounts.
pub async fn list_accounts(
    State(state): State<AppState>,
    Query(query): Query<ListAccountsQuery>,
) -> Result<Json<Vec<AccountInfo>>, ApiError> {
    query.validate().map_err(validation_error)?;

    let accounts = state
        .account_service
        .get_accounts_by_user(query.user_id)
        .await
        .map_err(error_response)?;

    Ok(Json(accounts.into_iter().map(AccountInfo::from).collect()))
}

// ============================================================================
// Transaction Handlers
// ============================================================================

/// Use part of an account balance.
pub async fn use_balance(
    State(state): State<AppState>,
    Json(request): Json<UseBalanceRequest>,
) -> Result<Json<UseBalanceResponse>, ApiError> {
    request.validate().map_err(validation_error)?;

    let tx = state
        .transaction_handler
        .use_balance(request.into())
        .await
        .map_err(error_response)?;

    Ok(Json(UseBalanceResponse::from(tx)))
}

/// Cancel a previous use in full.
pub async fn cancel_balance(
    State(state): State<AppState>,
    Json(request): Json<CancelBalanceRequest>,
) -> Result<Json<CancelBalanceResponse>, ApiError> {
    request.validate().map_err(validation_error)?;

    let tx = state
        .transaction_handler
        .cancel_balance(request.into())
        .await
        .map_err(error_response)?;

    Ok(Json(CancelBalanceResponse::from(tx)))
}

/// Look up a transaction by id.
pub async fn query_transaction(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> Result<Json<QueryTransactionResponse>, ApiError> {
    let tx = state
        .transaction_handler
        .query_transaction(&transaction_id)
        .await
        .map_err(error_response)?;

    Ok(Json(QueryTransactionResponse::from(tx)))
}

/// Records request count and latency for every routed request.
pub async fn track_http_metrics(
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<axum::extract::MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let timer = crate::observability::LatencyTimer::new();

    let response = next.run(request).await;

    get_metrics().record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        timer.elapsed_ms(),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AccountError;

    #[test]
    fn test_business_error_maps_to_bad_request() {
        let (status, Json(body)) = error_response(AppError::account(ErrorCode::CancelMustFully));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error_code, "CANCEL_MUST_FULLY");
    }

    #[test]
    fn test_lock_timeout_maps_to_conflict() {
        let (status, Json(body)) = error_response(AppError::Account(AccountError::new(
            ErrorCode::LockAcquisitionTimeout,
        )));
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.error_code, "LOCK_ACQUISITION_TIMEOUT");
    }

    #[test]
    fn test_infrastructure_error_hides_details() {
        let (status, Json(body)) =
            error_response(AppError::Internal(anyhow::anyhow!("connection refused")));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error_code, "INTERNAL_SERVER_ERROR");
        assert!(!body.error_message.contains("connection refused"));
    }

    #[test]
    fn test_validation_error_maps_to_invalid_request() {
        let (status, Json(body)) = error_response(AppError::Validation("bad amount".to_string()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error_code, "INVALID_REQUEST");
    }
}
