//! Error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use loyalty_core::ledger::LedgerError;
use loyalty_shared::AppError;
use serde_json::json;
use tracing::error;

/// An `AppError` rendered as a JSON response.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = match &err {
            AppError::InsufficientBalance {
                amount,
                requested_amount,
            } => json!({
                "error": err.error_code(),
                "message": err.to_string(),
                "amount": amount.to_string(),
                "requestedAmount": requested_amount.to_string(),
            }),
            _ if err.is_server_fault() => {
                error!(error = %err, "Request failed");
                json!({
                    "error": err.error_code(),
                    "message": "An internal error occurred",
                })
            }
            _ => json!({
                "error": err.error_code(),
                "message": err.to_string(),
            }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    async fn render(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = ApiError(err).into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[rstest]
    #[case(AppError::Forbidden, StatusCode::FORBIDDEN, "FORBIDDEN")]
    #[case(AppError::NotFound("x".into()), StatusCode::NOT_FOUND, "NOT_FOUND")]
    #[case(AppError::Conflict("x".into()), StatusCode::CONFLICT, "CONFLICT")]
    #[case(
        AppError::BusinessRule("x".into()),
        StatusCode::UNPROCESSABLE_ENTITY,
        "BUSINESS_RULE_VIOLATION"
    )]
    #[tokio::test]
    async fn test_status_and_code(
        #[case] err: AppError,
        #[case] status: StatusCode,
        #[case] code: &str,
    ) {
        let (actual, body) = render(err).await;
        assert_eq!(actual, status);
        assert_eq!(body["error"], code);
    }

    #[tokio::test]
    async fn test_insufficient_balance_body() {
        let (status, body) = render(AppError::InsufficientBalance {
            amount: dec!(50),
            requested_amount: dec!(60),
        })
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "INSUFFICIENT_BALANCE");
        assert_eq!(body["amount"], "50");
        assert_eq!(body["requestedAmount"], "60");
    }

    #[tokio::test]
    async fn test_server_fault_message_is_generic() {
        let (status, body) = render(AppError::Database("connection refused".into())).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "An internal error occurred");
    }
}
