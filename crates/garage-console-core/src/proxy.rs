//! Proxy service: the per-request pipeline behind `/proxy/{cluster_id}/...`.
//!
//! Lookup, credential selection, decryption and forwarding run in that
//! order, and each stage short-circuits. No upstream call is made unless the
//! cluster exists and its selected credential decrypts.

use std::sync::Arc;

use garage_console_storage::ClusterRegistry;
use tracing::{debug, error, warn};

use crate::crypto::TokenCipher;
use crate::error::{ForwardError, ProxyError};
use crate::forward::{Forwarder, InboundRequest, ProxyResponse};
use crate::routing::{resolve_target, RemainingPath};

/// Resolves clusters and forwards requests to them.
#[derive(Clone)]
pub struct ProxyService {
    registry: Arc<dyn ClusterRegistry>,
    cipher: Arc<TokenCipher>,
    forwarder: Forwarder,
}

impl ProxyService {
    #[must_use]
    pub fn new(
        registry: Arc<dyn ClusterRegistry>,
        cipher: Arc<TokenCipher>,
        forwarder: Forwarder,
    ) -> Self {
        Self {
            registry,
            cipher,
            forwarder,
        }
    }

    /// Forward `inbound` to `path` on cluster `cluster_id`.
    ///
    /// # Errors
    ///
    /// - [`ProxyError::ClusterNotFound`] if the id is not registered.
    /// - [`ProxyError::Registry`] if the lookup itself fails.
    /// - [`ProxyError::Credential`] if the selected token does not decrypt.
    /// - [`ProxyError::UnusableCredential`] if the decrypted token cannot be
    ///   sent as a header.
    /// - [`ProxyError::BadGateway`] if the upstream cannot be reached.
    pub async fn proxy(
        &self,
        cluster_id: &str,
        path: &RemainingPath,
        inbound: InboundRequest,
    ) -> Result<ProxyResponse, ProxyError> {
        let cluster = self
            .registry
            .get(cluster_id)
            .await?
            .ok_or_else(|| ProxyError::ClusterNotFound {
                id: cluster_id.to_owned(),
            })?;

        let target = resolve_target(&self.cipher, &cluster, path).map_err(|source| {
            error!(cluster_id, error = %source, "stored credential failed to decrypt");
            ProxyError::Credential {
                cluster_id: cluster_id.to_owned(),
                source,
            }
        })?;

        debug!(
            cluster_id,
            method = %inbound.method,
            path = %path,
            credential = target.credential.as_str(),
            "forwarding to upstream"
        );

        let response = self
            .forwarder
            .forward(&target, inbound)
            .await
            .map_err(|e| match e {
                ForwardError::UnusableCredential => {
                    error!(cluster_id, "stored credential is not a valid header value");
                    ProxyError::UnusableCredential {
                        cluster_id: cluster_id.to_owned(),
                    }
                }
                ForwardError::Transport(source) => {
                    warn!(cluster_id, error = %source, "upstream unreachable");
                    ProxyError::BadGateway(source)
                }
            })?;

        debug!(cluster_id, status = response.status.as_u16(), "upstream responded");
        Ok(response)
    }
}

impl std::fmt::Debug for ProxyService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyService")
            .field("forwarder", &self.forwarder)
            .finish_non_exhaustive()
    }
}
