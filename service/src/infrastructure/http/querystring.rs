use axum::{extract::FromRequestParts, http::request::Parts};

use crate::domain::filter::FilterParams;
use crate::infrastructure::http::api::ApiError;

/// Every `key=value` pair of the query string, repeated keys included.
/// Rejections use the common error body.
#[derive(Debug, Clone, Default)]
pub struct FilterQuery(pub FilterParams);

impl<S> FromRequestParts<S> for FilterQuery
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let query = parts.uri.query().unwrap_or_default();
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).map_err(|e| {
            tracing::debug!("failed to deserialize query string: {}", e);
            ApiError::BadRequest("Failed to deserialize query string".to_string())
        })?;
        Ok(FilterQuery(FilterParams::new(pairs)))
    }
}

impl From<FilterQuery> for FilterParams {
    fn from(query: FilterQuery) -> Self {
        query.0
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    async fn extract(uri: &str) -> Result<FilterParams, ApiError> {
        let (mut parts, _) = Request::builder().uri(uri).body(()).unwrap().into_parts();
        FilterQuery::from_request_parts(&mut parts, &())
            .await
            .map(FilterParams::from)
    }

    #[tokio::test]
    async fn repeated_keys_are_kept() {
        let params = extract("/x?status=DRAFT&status=PUBLISHED&search=soil%20carbon")
            .await
            .unwrap();
        assert_eq!(params.get_list("status"), vec!["DRAFT", "PUBLISHED"]);
        assert_eq!(params.get("search"), Some("soil carbon"));
    }

    #[tokio::test]
    async fn missing_query_is_empty() {
        assert_eq!(extract("/x").await.unwrap(), FilterParams::default());
    }
}
