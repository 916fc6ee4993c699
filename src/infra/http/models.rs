//! Request extractors for the goods endpoints.
//!
//! Rejections from `Query` and `Json` are converted into [`ApiError`], so a
//! malformed request still answers with the `{"error": "..."}` body.

use axum::extract::{FromRequest, FromRequestParts};
use serde::Deserialize;

use crate::application::goods::{DEFAULT_LIST_LIMIT, DEFAULT_LIST_OFFSET, GoodInput, ListRequest};
use crate::domain::entities::GoodKey;

use super::error::ApiError;

/// `?projectId=` on create.
#[derive(Debug, Deserialize, FromRequestParts)]
#[serde(rename_all = "camelCase")]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ProjectQuery {
    pub project_id: i32,
}

/// `?id=&projectId=` addressing a single good.
#[derive(Debug, Deserialize, FromRequestParts)]
#[serde(rename_all = "camelCase")]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct GoodKeyQuery {
    pub id: i32,
    pub project_id: i32,
}

impl From<GoodKeyQuery> for GoodKey {
    fn from(query: GoodKeyQuery) -> Self {
        GoodKey::new(query.id, query.project_id)
    }
}

#[derive(Debug, Default, Deserialize, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl From<ListQuery> for ListRequest {
    fn from(query: ListQuery) -> Self {
        Self {
            limit: query.limit.unwrap_or(DEFAULT_LIST_LIMIT),
            offset: query.offset.unwrap_or(DEFAULT_LIST_OFFSET),
        }
    }
}

/// Body of create and update. A missing `name` fails validation in the service.
#[derive(Debug, Default, Deserialize, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct GoodPayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl From<GoodPayload> for GoodInput {
    fn from(payload: GoodPayload) -> Self {
        Self {
            name: payload.name.unwrap_or_default(),
            description: payload.description,
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};

    use super::*;

    async fn query<T>(uri: &str) -> Result<T, ApiError>
    where
        T: FromRequestParts<(), Rejection = ApiError>,
    {
        let (mut parts, _) = Request::builder()
            .uri(uri)
            .body(())
            .expect("request")
            .into_parts();
        T::from_request_parts(&mut parts, &()).await
    }

    async fn payload(body: &'static str) -> Result<GoodPayload, ApiError> {
        let request = Request::builder()
            .method("POST")
            .uri("/good?projectId=1")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .expect("request");
        GoodPayload::from_request(request, &()).await
    }

    #[tokio::test]
    async fn good_key_reads_camel_case_parameters() {
        let key: GoodKey = query::<GoodKeyQuery>("/good?id=5&projectId=1")
            .await
            .expect("valid query")
            .into();
        assert_eq!(key, GoodKey::new(5, 1));
    }

    #[tokio::test]
    async fn missing_or_malformed_parameters_are_bad_requests() {
        for uri in ["/good?id=5", "/good?id=abc&projectId=1", "/good"] {
            let err = query::<GoodKeyQuery>(uri).await.expect_err(uri);
            assert_eq!(err.status(), StatusCode::BAD_REQUEST, "{uri}");
            assert!(err.message().starts_with("invalid query"), "{uri}");
        }
    }

    #[tokio::test]
    async fn list_window_falls_back_to_defaults() {
        let request: ListRequest = query::<ListQuery>("/goods?limit=3")
            .await
            .expect("valid query")
            .into();
        assert_eq!(request.limit, 3);
        assert_eq!(request.offset, DEFAULT_LIST_OFFSET);

        assert!(query::<ListQuery>("/goods?offset=x").await.is_err());
    }

    #[tokio::test]
    async fn payload_keeps_description_absent() {
        let input = GoodInput::from(payload(r#"{"name":"Widget"}"#).await.expect("json"));
        assert_eq!(input.name, "Widget");
        assert_eq!(input.description, None);
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let err = payload("{name:").await.expect_err("bad json");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.message().starts_with("invalid JSON body"));
    }
}
