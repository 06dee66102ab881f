use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

use crate::domain::order::OrderError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("missing or malformed X-Tenant-Id header")]
    MissingTenant,

    #[error(transparent)]
    Order(#[from] OrderError),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

impl ApiError {
    fn kind(&self) -> &'static str {
        match self {
            ApiError::MissingTenant => "unauthorized",
            ApiError::Order(error) => error.kind(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingTenant => StatusCode::UNAUTHORIZED,
            ApiError::Order(OrderError::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Order(OrderError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Order(OrderError::InvalidTransition { .. })
            | ApiError::Order(OrderError::Conflict(_)) => StatusCode::CONFLICT,
            ApiError::Order(OrderError::Database(_)) | ApiError::Order(OrderError::Other(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Storage details stay in the logs.
        let message = match self.status_code() {
            StatusCode::INTERNAL_SERVER_ERROR => "internal error".to_string(),
            _ => self.to_string(),
        };

        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.kind(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use actix_web::body::to_bytes;
    use serde_json::Value;
    use uuid::Uuid;

    use super::*;
    use crate::domain::order::OrderStatus;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::MissingTenant, StatusCode::UNAUTHORIZED),
            (OrderError::validation("bad").into(), StatusCode::BAD_REQUEST),
            (OrderError::order_not_found(Uuid::new_v4()).into(), StatusCode::NOT_FOUND),
            (
                OrderError::InvalidTransition {
                    from: OrderStatus::Delivered,
                    to: OrderStatus::Cancelled,
                }
                .into(),
                StatusCode::CONFLICT,
            ),
            (OrderError::Conflict("delivered".into()).into(), StatusCode::CONFLICT),
            (
                OrderError::Database(sqlx::Error::PoolTimedOut).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.status_code(), expected, "{}", error);
        }
    }

    #[actix_web::test]
    async fn test_internal_error_body_hides_details() {
        let error = ApiError::from(OrderError::Database(sqlx::Error::PoolTimedOut));
        let body = to_bytes(error.error_response().into_body()).await.unwrap();
        let body: Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(body["error"], "internal");
        assert_eq!(body["message"], "internal error");
    }

    #[actix_web::test]
    async fn test_validation_body_carries_message() {
        let error = ApiError::from(OrderError::validation("at least one item is required"));
        let body = to_bytes(error.error_response().into_body()).await.unwrap();
        let body: Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(body["error"], "validation");
        assert!(body["message"].as_str().unwrap().contains("at least one item is required"));
    }
}
