//! Authenticated reverse proxy: `/proxy/{cluster_id}/{*path}`
//!
//! Any method. The remaining path is rebuilt from the raw request path, so
//! the upstream receives exactly the percent-encoding the client sent.
//! Request bodies are buffered up to [`PROXY_BODY_LIMIT`].

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::rejection::{BytesRejection, PathRejection};
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::{HeaderMap, Method, Uri};
use axum::response::Response;
use axum::routing::any;
use axum::Router;

use garage_console_core::forward::InboundRequest;
use garage_console_core::routing::RemainingPath;

use crate::error::AppError;
use crate::state::AppState;

/// Largest request body forwarded to a cluster.
pub const PROXY_BODY_LIMIT: usize = 16 * 1024 * 1024;

/// Build the `/proxy` router. Both `/proxy/{id}` and `/proxy/{id}/` address
/// the cluster root.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/proxy/{cluster_id}", any(forward))
        .route("/proxy/{cluster_id}/", any(forward))
        .route("/proxy/{cluster_id}/{*path}", any(forward))
        .layer(DefaultBodyLimit::max(PROXY_BODY_LIMIT))
}

async fn forward(
    State(state): State<Arc<AppState>>,
    params: Result<Path<Vec<(String, String)>>, PathRejection>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, AppError> {
    let Path(params) = params?;
    let body = body?;
    let cluster_id = params
        .into_iter()
        .find_map(|(name, value)| (name == "cluster_id").then_some(value))
        .ok_or_else(|| AppError::BadRequest("missing cluster id".to_owned()))?;

    let path = remaining_path(uri.path());
    let inbound = InboundRequest {
        method,
        query: uri.query().map(str::to_owned),
        headers,
        body,
    };

    let upstream = state.proxy.proxy(&cluster_id, &path, inbound).await?;

    let mut response = Response::new(Body::from(upstream.body));
    *response.status_mut() = upstream.status;
    *response.headers_mut() = upstream.headers;
    Ok(response)
}

/// Everything after `/proxy/{cluster_id}` in the raw request path.
fn remaining_path(raw: &str) -> RemainingPath {
    let after_prefix = raw.strip_prefix("/proxy/").unwrap_or_default();
    match after_prefix.split_once('/') {
        Some((_, rest)) => RemainingPath::from_segments(rest.split('/')),
        None => RemainingPath::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_forms_are_empty() {
        assert_eq!(remaining_path("/proxy/c1").as_str(), "");
        assert_eq!(remaining_path("/proxy/c1/").as_str(), "");
    }

    #[test]
    fn nested_path_is_preserved() {
        assert_eq!(
            remaining_path("/proxy/c1/v1/layout/apply").as_str(),
            "v1/layout/apply"
        );
        assert_eq!(remaining_path("/proxy/c1/v2/Status/").as_str(), "v2/Status/");
    }

    #[test]
    fn percent_encoding_is_kept_raw() {
        assert_eq!(
            remaining_path("/proxy/c1/v2/GetBucketInfo%2Fx").as_str(),
            "v2/GetBucketInfo%2Fx"
        );
    }

    #[test]
    fn metrics_is_recognized() {
        assert!(remaining_path("/proxy/c1/metrics").is_metrics());
        assert!(!remaining_path("/proxy/c1/metrics/").is_metrics());
    }
}
