use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::cache::CacheError;
use crate::application::error::ErrorReport;
use crate::application::goods::GoodsError;
use crate::application::repos::RepoError;

/// Every failure leaves the service as `{"error": "..."}`.
#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: String,
}

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const NOT_FOUND: &str = "not_found";
    pub const DB_TIMEOUT: &str = "db_timeout";
    pub const REPO: &str = "repo_error";
    pub const CACHE: &str = "cache_error";
    pub const CACHE_REFRESH: &str = "cache_refresh_failed";
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    detail: Vec<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            detail: Vec::new(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message)
    }

    fn with_detail(mut self, error: &dyn std::error::Error) -> Self {
        let report = ErrorReport::from_error("infra::http", self.status, error);
        self.detail = report.messages;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<GoodsError> for ApiError {
    fn from(err: GoodsError) -> Self {
        match err {
            GoodsError::Validation(message) => {
                ApiError::new(StatusCode::BAD_REQUEST, codes::INVALID_INPUT, message)
            }
            // Kept in the 4xx range; callers already treat unknown ids as bad requests.
            GoodsError::NotFound => {
                ApiError::new(StatusCode::BAD_REQUEST, codes::NOT_FOUND, "good not found")
            }
            GoodsError::Store(repo) => repo_to_api(repo),
            GoodsError::Cache(cache) => cache_to_api(cache),
            err @ GoodsError::CacheRefresh { .. } => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::CACHE_REFRESH,
                err.to_string(),
            )
            .with_detail(&err),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(format!("invalid query: {}", rejection.body_text()))
            .with_detail(&rejection)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(format!("invalid JSON body: {}", rejection.body_text()))
            .with_detail(&rejection)
    }
}

pub(crate) fn repo_to_api(err: RepoError) -> ApiError {
    let api = match &err {
        RepoError::Timeout => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::DB_TIMEOUT,
            "database timeout",
        ),
        RepoError::NotFound => {
            ApiError::new(StatusCode::BAD_REQUEST, codes::NOT_FOUND, "good not found")
        }
        RepoError::InvalidInput { message } => {
            ApiError::new(StatusCode::BAD_REQUEST, codes::INVALID_INPUT, message.clone())
        }
        RepoError::Persistence(_) | RepoError::Integrity { .. } => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::REPO,
            "storage failure",
        ),
    };
    api.with_detail(&err)
}

pub(crate) fn cache_to_api(err: CacheError) -> ApiError {
    ApiError::new(
        StatusCode::SERVICE_UNAVAILABLE,
        codes::CACHE,
        "cache unavailable",
    )
    .with_detail(&err)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.message.clone(),
        };
        let mut response = (self.status, Json(body)).into_response();
        let mut messages = vec![format!("{}: {}", self.code, self.message)];
        messages.extend(self.detail);
        ErrorReport {
            source: "infra::http::goods",
            status: self.status,
            messages,
        }
        .attach(&mut response);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_and_missing_goods_are_client_errors() {
        let api = ApiError::from(GoodsError::Validation("name must not be empty".into()));
        assert_eq!(api.status(), StatusCode::BAD_REQUEST);
        assert_eq!(api.message(), "name must not be empty");

        let api = ApiError::from(GoodsError::NotFound);
        assert_eq!(api.status(), StatusCode::BAD_REQUEST);
        assert_eq!(api.message(), "good not found");
    }

    #[test]
    fn infrastructure_failures_are_server_errors() {
        let api = ApiError::from(GoodsError::Store(RepoError::Timeout));
        assert_eq!(api.status(), StatusCode::SERVICE_UNAVAILABLE);

        let api = ApiError::from(GoodsError::Store(RepoError::from_persistence("boom")));
        assert_eq!(api.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.message(), "storage failure");

        let api = ApiError::from(GoodsError::Cache(CacheError::transport("refused")));
        assert_eq!(api.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn cache_refresh_failure_says_the_good_was_saved() {
        let api = ApiError::from(GoodsError::CacheRefresh {
            id: 7,
            source: CacheError::transport("refused"),
        });
        assert_eq!(api.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(api.message().contains("good 7 was saved"));
    }

    #[test]
    fn response_carries_error_report() {
        let response = ApiError::bad_request("missing id").into_response();
        let report = response
            .extensions()
            .get::<ErrorReport>()
            .expect("report attached");
        assert_eq!(report.messages[0], "bad_request: missing id");
    }
}
