//! Credential-aware routing.
//!
//! Turns `(cluster, remaining path)` into an [`UpstreamTarget`]: the exact
//! destination URL and the decrypted bearer credential to present.

use std::fmt;

use garage_console_storage::ClusterRecord;

use crate::crypto::{SecretToken, TokenCipher};
use crate::error::CipherError;

/// Sub-path that selects the metrics credential.
pub const METRICS_PATH: &str = "metrics";

/// The part of an inbound path after the cluster id, with no leading slash.
///
/// Built once at the HTTP boundary from ordered path segments so the rest of
/// the proxy never cares whether the router captured one segment or many.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemainingPath(String);

impl RemainingPath {
    /// Rejoin captured segments with `/`, preserving order and empty
    /// segments (a trailing slash survives as a trailing empty segment).
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = segments
            .into_iter()
            .map(|s| s.as_ref().to_owned())
            .collect::<Vec<_>>()
            .join("/");
        Self(joined)
    }

    /// Take a single captured path verbatim, dropping one leading `/`.
    #[must_use]
    pub fn from_capture(capture: &str) -> Self {
        Self(capture.strip_prefix('/').unwrap_or(capture).to_owned())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_metrics(&self) -> bool {
        self.0 == METRICS_PATH
    }
}

impl fmt::Display for RemainingPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which stored credential a request is authorized with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    Admin,
    Metric,
}

impl CredentialKind {
    /// Metric credential on the metrics path when one is configured, admin
    /// credential everywhere else.
    #[must_use]
    pub fn select(cluster: &ClusterRecord, path: &RemainingPath) -> Self {
        if path.is_metrics() && cluster.has_metric_token() {
            Self::Metric
        } else {
            Self::Admin
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Metric => "metric",
        }
    }
}

/// Where to send a proxied request and with which credential.
#[derive(Debug, Clone)]
pub struct UpstreamTarget {
    pub url: String,
    pub credential: CredentialKind,
    pub token: SecretToken,
}

/// Join an endpoint and a remaining path with exactly one `/`.
#[must_use]
pub fn destination_url(endpoint: &str, path: &RemainingPath) -> String {
    format!("{}/{}", endpoint.trim_end_matches('/'), path.as_str())
}

/// Select and decrypt the credential for `path`, then build the target.
///
/// # Errors
///
/// Returns the [`CipherError`] from decrypting the selected token.
pub fn resolve_target(
    cipher: &TokenCipher,
    cluster: &ClusterRecord,
    path: &RemainingPath,
) -> Result<UpstreamTarget, CipherError> {
    let credential = CredentialKind::select(cluster, path);
    let wire = match credential {
        CredentialKind::Metric => cluster.metric_token.as_deref().unwrap_or_default(),
        CredentialKind::Admin => cluster.admin_token.as_str(),
    };

    Ok(UpstreamTarget {
        url: destination_url(&cluster.endpoint, path),
        credential,
        token: cipher.decrypt_token(wire)?,
    })
}
