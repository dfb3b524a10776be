use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered upstream cluster.
///
/// `admin_token` and `metric_token` hold the cipher's wire format
/// (`hex(iv):hex(tag):hex(ciphertext)`), never plaintext.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres-backend", derive(sqlx::FromRow))]
pub struct ClusterRecord {
    pub id: String,
    pub name: String,
    pub endpoint: String,
    pub admin_token: String,
    pub metric_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ClusterRecord {
    /// Whether a dedicated metrics credential is configured.
    #[must_use]
    pub fn has_metric_token(&self) -> bool {
        self.metric_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

impl fmt::Debug for ClusterRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterRecord")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .field("admin_token", &"[REDACTED]")
            .field(
                "metric_token",
                &self.metric_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(metric: Option<&str>) -> ClusterRecord {
        let now = Utc::now();
        ClusterRecord {
            id: "c1".to_owned(),
            name: "primary".to_owned(),
            endpoint: "http://garage:3903".to_owned(),
            admin_token: "aa:bb:cc".to_owned(),
            metric_token: metric.map(str::to_owned),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn debug_redacts_tokens() {
        let debug = format!("{:?}", record(Some("dd:ee:ff")));
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("aa:bb:cc"));
        assert!(!debug.contains("dd:ee:ff"));
    }

    #[test]
    fn empty_metric_token_counts_as_absent() {
        assert!(!record(None).has_metric_token());
        assert!(!record(Some("")).has_metric_token());
        assert!(record(Some("dd:ee:ff")).has_metric_token());
    }
}
