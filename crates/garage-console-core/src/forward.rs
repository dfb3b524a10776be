//! Forwarding engine.
//!
//! Shapes the outbound call from an inbound request and an
//! [`UpstreamTarget`], hands it to the transport, and shapes the response:
//!
//! - method, raw query string and body bytes pass through untouched;
//! - only `Content-Type` and `Accept` are copied from the inbound request;
//! - `Authorization` is always the decrypted cluster credential;
//! - only [`RESPONSE_HEADER_ALLOW_LIST`] is copied back;
//! - the upstream status and body are relayed verbatim.
//!
//! A call is attempted exactly once.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::{
    ACCEPT, AUTHORIZATION, CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_TYPE, ETAG, LAST_MODIFIED,
};
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};

use crate::error::ForwardError;
use crate::routing::UpstreamTarget;
use crate::transport::{UpstreamRequest, UpstreamTransport};

/// Default bound on a single upstream call.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Inbound request headers copied to the upstream when present.
pub const REQUEST_HEADER_ALLOW_LIST: [HeaderName; 2] = [CONTENT_TYPE, ACCEPT];

/// Upstream response headers copied back to the console when present.
pub const RESPONSE_HEADER_ALLOW_LIST: [HeaderName; 5] =
    [CONTENT_TYPE, CONTENT_DISPOSITION, CACHE_CONTROL, ETAG, LAST_MODIFIED];

/// The parts of an inbound request the engine is allowed to see.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    /// Raw query string without the leading `?`.
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// A relayed upstream response.
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Executes proxied calls against a transport with a fixed timeout.
#[derive(Clone)]
pub struct Forwarder {
    transport: Arc<dyn UpstreamTransport>,
    timeout: Duration,
}

impl Forwarder {
    #[must_use]
    pub fn new(transport: Arc<dyn UpstreamTransport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Forward `inbound` to `target` and shape the reply.
    ///
    /// # Errors
    ///
    /// Returns [`ForwardError::UnusableCredential`] before any call if the
    /// token cannot be a header value, and [`ForwardError::Transport`] for
    /// network-level failures. Every upstream status code is an `Ok`
    /// response.
    pub async fn forward(
        &self,
        target: &UpstreamTarget,
        inbound: InboundRequest,
    ) -> Result<ProxyResponse, ForwardError> {
        let request = self.build_request(target, inbound)?;
        let response = self.transport.send(request).await?;

        Ok(ProxyResponse {
            status: response.status,
            headers: filter_headers(&response.headers, &RESPONSE_HEADER_ALLOW_LIST),
            body: response.body,
        })
    }

    fn build_request(
        &self,
        target: &UpstreamTarget,
        inbound: InboundRequest,
    ) -> Result<UpstreamRequest, ForwardError> {
        let mut headers = filter_headers(&inbound.headers, &REQUEST_HEADER_ALLOW_LIST);
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", target.token.expose()))
            .map_err(|_| ForwardError::UnusableCredential)?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        let url = match inbound.query.as_deref() {
            Some(query) if !query.is_empty() => format!("{}?{query}", target.url),
            _ => target.url.clone(),
        };

        let body = (!inbound.body.is_empty()).then_some(inbound.body);

        Ok(UpstreamRequest {
            method: inbound.method,
            url,
            headers,
            body,
            timeout: self.timeout,
        })
    }
}

impl std::fmt::Debug for Forwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Forwarder")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Copy every value of each allow-listed header, in order.
fn filter_headers(source: &HeaderMap, allow: &[HeaderName]) -> HeaderMap {
    let mut out = HeaderMap::new();
    for name in allow {
        for value in source.get_all(name) {
            out.append(name.clone(), value.clone());
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::crypto::SecretToken;
    use crate::error::TransportError;
    use crate::routing::CredentialKind;
    use crate::transport::UpstreamResponse;

    /// Records every request and answers with a canned response or failure.
    pub(crate) struct RecordingTransport {
        pub calls: Mutex<Vec<UpstreamRequest>>,
        reply: Result<UpstreamResponse, String>,
    }

    impl RecordingTransport {
        pub(crate) fn replying(response: UpstreamResponse) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                reply: Ok(response),
            })
        }

        pub(crate) fn failing(reason: &str) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                reply: Err(reason.to_owned()),
            })
        }

        pub(crate) fn calls(&self) -> Vec<UpstreamRequest> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl UpstreamTransport for RecordingTransport {
        async fn send(
            &self,
            request: UpstreamRequest,
        ) -> Result<UpstreamResponse, TransportError> {
            let url = request.url.clone();
            self.calls.lock().unwrap().push(request);
            self.reply.clone().map_err(|reason| TransportError::Connect { url, reason })
        }
    }

    pub(crate) fn ok_response(status: StatusCode, body: &'static [u8]) -> UpstreamResponse {
        UpstreamResponse {
            status,
            headers: HeaderMap::new(),
            body: Bytes::from_static(body),
        }
    }

    fn target() -> UpstreamTarget {
        UpstreamTarget {
            url: "http://up:9999/v2/Status".to_owned(),
            credential: CredentialKind::Admin,
            token: SecretToken::new("admin-secret".to_owned()),
        }
    }

    fn inbound(method: Method, body: &'static [u8]) -> InboundRequest {
        InboundRequest {
            method,
            query: None,
            headers: HeaderMap::new(),
            body: Bytes::from_static(body),
        }
    }

    #[tokio::test]
    async fn authorization_is_replaced_and_other_headers_dropped() {
        let transport = RecordingTransport::replying(ok_response(StatusCode::OK, b"{}"));
        let forwarder = Forwarder::new(transport.clone(), DEFAULT_UPSTREAM_TIMEOUT);

        let mut req = inbound(Method::GET, b"");
        req.headers
            .insert(AUTHORIZATION, HeaderValue::from_static("Bearer console-session"));
        req.headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        req.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        req.headers.insert("cookie", HeaderValue::from_static("sid=abc"));
        req.headers.insert("x-forwarded-for", HeaderValue::from_static("10.0.0.1"));

        forwarder.forward(&target(), req).await.unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        let sent = &calls[0].headers;
        assert_eq!(sent.get(AUTHORIZATION).unwrap(), "Bearer admin-secret");
        assert_eq!(sent.get(ACCEPT).unwrap(), "application/json");
        assert_eq!(sent.get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(sent.len(), 3);
        assert_eq!(calls[0].timeout, DEFAULT_UPSTREAM_TIMEOUT);
    }

    #[tokio::test]
    async fn method_query_and_body_pass_through() {
        let transport = RecordingTransport::replying(ok_response(StatusCode::OK, b""));
        let forwarder = Forwarder::new(transport.clone(), DEFAULT_UPSTREAM_TIMEOUT);

        let mut req = inbound(Method::POST, b"[1,2,3]");
        req.query = Some("id=b1&globalAlias=photos%20raw".to_owned());
        forwarder.forward(&target(), req).await.unwrap();

        let calls = transport.calls();
        assert_eq!(calls[0].method, Method::POST);
        assert_eq!(
            calls[0].url,
            "http://up:9999/v2/Status?id=b1&globalAlias=photos%20raw"
        );
        assert_eq!(calls[0].body.as_deref(), Some(&b"[1,2,3]"[..]));
    }

    #[tokio::test]
    async fn raw_json_string_body_is_untouched() {
        let transport = RecordingTransport::replying(ok_response(StatusCode::OK, b""));
        let forwarder = Forwarder::new(transport.clone(), DEFAULT_UPSTREAM_TIMEOUT);

        forwarder
            .forward(&target(), inbound(Method::PUT, br#""plain string""#))
            .await
            .unwrap();

        assert_eq!(
            transport.calls()[0].body.as_deref(),
            Some(&br#""plain string""#[..])
        );
    }

    #[tokio::test]
    async fn empty_body_is_not_sent() {
        let transport = RecordingTransport::replying(ok_response(StatusCode::OK, b""));
        let forwarder = Forwarder::new(transport.clone(), DEFAULT_UPSTREAM_TIMEOUT);

        let mut req = inbound(Method::GET, b"");
        req.query = Some(String::new());
        forwarder.forward(&target(), req).await.unwrap();

        let calls = transport.calls();
        assert!(calls[0].body.is_none());
        assert_eq!(calls[0].url, "http://up:9999/v2/Status");
    }

    #[tokio::test]
    async fn response_headers_are_allow_listed() {
        let mut upstream = ok_response(StatusCode::OK, b"file contents");
        upstream.headers.insert(
            CONTENT_DISPOSITION,
            HeaderValue::from_static("attachment; filename=\"r.txt\""),
        );
        upstream
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        upstream.headers.insert(ETAG, HeaderValue::from_static("\"abc\""));
        upstream
            .headers
            .insert("x-internal-debug", HeaderValue::from_static("secret"));
        upstream
            .headers
            .insert("set-cookie", HeaderValue::from_static("upstream=1"));

        let forwarder = Forwarder::new(
            RecordingTransport::replying(upstream),
            DEFAULT_UPSTREAM_TIMEOUT,
        );
        let response = forwarder
            .forward(&target(), inbound(Method::GET, b""))
            .await
            .unwrap();

        assert_eq!(
            response.headers.get(CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"r.txt\""
        );
        assert_eq!(response.headers.get(CONTENT_TYPE).unwrap(), "text/plain");
        assert_eq!(response.headers.get(ETAG).unwrap(), "\"abc\"");
        assert!(response.headers.get("x-internal-debug").is_none());
        assert!(response.headers.get("set-cookie").is_none());
        assert_eq!(response.body, Bytes::from_static(b"file contents"));
    }

    #[tokio::test]
    async fn upstream_error_status_is_relayed() {
        let forwarder = Forwarder::new(
            RecordingTransport::replying(ok_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                b"{\"code\":\"InternalError\"}",
            )),
            DEFAULT_UPSTREAM_TIMEOUT,
        );
        let response = forwarder
            .forward(&target(), inbound(Method::GET, b""))
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.body, Bytes::from_static(b"{\"code\":\"InternalError\"}"));
    }

    #[tokio::test]
    async fn transport_failure_is_attempted_once() {
        let transport = RecordingTransport::failing("connection refused");
        let forwarder = Forwarder::new(transport.clone(), DEFAULT_UPSTREAM_TIMEOUT);

        let result = forwarder.forward(&target(), inbound(Method::GET, b"")).await;
        assert!(matches!(
            result,
            Err(ForwardError::Transport(TransportError::Connect { .. }))
        ));
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn credential_with_control_characters_is_not_sent() {
        let transport = RecordingTransport::replying(ok_response(StatusCode::OK, b""));
        let forwarder = Forwarder::new(transport.clone(), DEFAULT_UPSTREAM_TIMEOUT);

        let mut bad = target();
        bad.token = SecretToken::new("abc\ndef".to_owned());
        let result = forwarder.forward(&bad, inbound(Method::GET, b"")).await;

        assert!(matches!(result, Err(ForwardError::UnusableCredential)));
        assert!(transport.calls().is_empty());
    }
}
