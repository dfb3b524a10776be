//! Cluster bookkeeping routes: `/clusters/*`
//!
//! Tokens are encrypted with the token cipher before they reach the
//! registry. Responses carry a [`ClusterSummary`], which has no token
//! material at all, not even ciphertext. Tokens are stored exactly as
//! entered, so one with surrounding whitespace or characters an HTTP header
//! cannot carry is rejected rather than altered.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode, Uri};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use garage_console_storage::ClusterRecord;

use crate::error::AppError;
use crate::state::AppState;

/// Build the session-gated `/clusters` router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/clusters", get(list_clusters).post(create_cluster))
        .route(
            "/clusters/{id}",
            get(get_cluster).put(update_cluster).delete(delete_cluster),
        )
}

// ── Request / Response types ─────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateClusterRequest {
    pub name: String,
    pub endpoint: String,
    pub admin_token: String,
    pub metric_token: Option<String>,
}

/// Partial update. Absent fields are left untouched; an empty
/// `metric_token` removes the metrics credential.
#[derive(Deserialize)]
pub struct UpdateClusterRequest {
    pub name: Option<String>,
    pub endpoint: Option<String>,
    pub admin_token: Option<String>,
    pub metric_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub id: String,
    pub name: String,
    pub endpoint: String,
    pub has_metric_token: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&ClusterRecord> for ClusterSummary {
    fn from(record: &ClusterRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            endpoint: record.endpoint.clone(),
            has_metric_token: record.has_metric_token(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────

async fn list_clusters(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ClusterSummary>>, AppError> {
    let clusters = state.registry.list().await?;
    Ok(Json(clusters.iter().map(ClusterSummary::from).collect()))
}

async fn get_cluster(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ClusterSummary>, AppError> {
    let record = state
        .registry
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("cluster '{id}' not found")))?;
    Ok(Json(ClusterSummary::from(&record)))
}

async fn create_cluster(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateClusterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ClusterSummary>), AppError> {
    let Json(body) = body?;

    let name = required("name", &body.name)?;
    let endpoint = validate_endpoint(&body.endpoint)?;
    let admin_token = credential("admin_token", &body.admin_token)?;
    let metric_token = match body.metric_token.as_deref() {
        Some(token) if !token.trim().is_empty() => {
            Some(state.cipher.encrypt(&credential("metric_token", token)?)?)
        }
        _ => None,
    };

    let now = Utc::now();
    let record = ClusterRecord {
        id: uuid::Uuid::new_v4().to_string(),
        name,
        endpoint,
        admin_token: state.cipher.encrypt(&admin_token)?,
        metric_token,
        created_at: now,
        updated_at: now,
    };
    state.registry.create(record.clone()).await?;

    info!(cluster_id = %record.id, endpoint = %record.endpoint, "cluster registered");
    Ok((StatusCode::CREATED, Json(ClusterSummary::from(&record))))
}

async fn update_cluster(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<UpdateClusterRequest>, JsonRejection>,
) -> Result<Json<ClusterSummary>, AppError> {
    let Json(body) = body?;

    let mut record = state
        .registry
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("cluster '{id}' not found")))?;

    if let Some(name) = body.name {
        record.name = required("name", &name)?;
    }
    if let Some(endpoint) = body.endpoint {
        record.endpoint = validate_endpoint(&endpoint)?;
    }
    if let Some(admin_token) = body.admin_token {
        let admin_token = credential("admin_token", &admin_token)?;
        record.admin_token = state.cipher.encrypt(&admin_token)?;
    }
    if let Some(metric_token) = body.metric_token {
        record.metric_token = if metric_token.trim().is_empty() {
            None
        } else {
            let metric_token = credential("metric_token", &metric_token)?;
            Some(state.cipher.encrypt(&metric_token)?)
        };
    }
    record.updated_at = Utc::now();

    state.registry.update(record.clone()).await?;

    info!(cluster_id = %id, "cluster updated");
    Ok(Json(ClusterSummary::from(&record)))
}

async fn delete_cluster(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.registry.delete(&id).await? {
        info!(cluster_id = %id, "cluster removed");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("cluster '{id}' not found")))
    }
}

// ── Validation ───────────────────────────────────────────────────────

fn required(field: &str, value: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::BadRequest(format!("{field} must not be empty")));
    }
    Ok(value.to_owned())
}

/// A cluster token, kept verbatim. It must be sendable as
/// `Authorization: Bearer <token>`.
fn credential(field: &str, value: &str) -> Result<String, AppError> {
    required(field, value)?;
    if value.trim() != value {
        return Err(AppError::BadRequest(format!(
            "{field} must not have leading or trailing whitespace"
        )));
    }
    if HeaderValue::from_str(&format!("Bearer {value}")).is_err() {
        return Err(AppError::BadRequest(format!(
            "{field} contains characters not allowed in an HTTP header"
        )));
    }
    Ok(value.to_owned())
}

/// Accept only absolute `http`/`https` URLs with a host.
fn validate_endpoint(endpoint: &str) -> Result<String, AppError> {
    let endpoint = required("endpoint", endpoint)?;
    let uri: Uri = endpoint
        .parse()
        .map_err(|_| AppError::BadRequest(format!("endpoint '{endpoint}' is not a valid URL")))?;

    let scheme_ok = matches!(uri.scheme_str(), Some("http" | "https"));
    if !scheme_ok || uri.authority().is_none() {
        return Err(AppError::BadRequest(format!(
            "endpoint '{endpoint}' must be an http or https URL"
        )));
    }
    Ok(endpoint)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_must_be_http_url() {
        assert_eq!(
            validate_endpoint(" http://garage:3903/ ").unwrap(),
            "http://garage:3903/"
        );
        assert!(validate_endpoint("https://garage.example.com").is_ok());

        for bad in ["", "garage:3903", "ftp://garage", "/v2/Status", "not a url"] {
            assert!(
                matches!(validate_endpoint(bad), Err(AppError::BadRequest(_))),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn required_trims_and_rejects_blank() {
        assert_eq!(required("name", "  primary ").unwrap(), "primary");
        assert!(matches!(required("name", "   "), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn credential_is_kept_verbatim() {
        assert_eq!(
            credential("admin_token", "s3cr3t/+=token").unwrap(),
            "s3cr3t/+=token"
        );
    }

    #[test]
    fn credential_rejects_whitespace_and_header_breaking_characters() {
        for bad in ["", "   ", " padded", "padded\t", "abc\ndef", "abc\rdef", "nul\0byte"] {
            assert!(
                matches!(credential("admin_token", bad), Err(AppError::BadRequest(_))),
                "{bad:?}"
            );
        }
    }
}
