//! Stateless console sessions.
//!
//! A session is an HS256 JWT carrying a role marker and an expiry, signed
//! with a secret known only to this deployment. The authenticator has exactly
//! two operations, [`issue`](SessionAuthenticator::issue) and
//! [`verify`](SessionAuthenticator::verify). Nothing is stored server-side:
//! there is no revocation list, and a session ends only when it expires or
//! the signing secret is rotated, which invalidates every outstanding
//! session at once.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Minimum signing secret length in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Default session lifetime.
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24;

/// Role carried by a console session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
}

/// Claims of a verified session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub role: Role,
    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

impl SessionClaims {
    /// Expiry as a timestamp.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// Issues and verifies signed session tokens.
pub struct SessionAuthenticator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl SessionAuthenticator {
    /// Build an authenticator from the shared signing secret.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::WeakSecret`] if the secret is shorter than
    /// [`MIN_SECRET_LEN`] bytes.
    pub fn new(secret: &[u8], ttl: Duration) -> Result<Self, SessionError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(SessionError::WeakSecret {
                min: MIN_SECRET_LEN,
                actual: secret.len(),
            });
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl,
        })
    }

    /// Session lifetime applied by [`issue`](Self::issue).
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign a new session for `role`, valid from now for the configured TTL.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Signing`] if encoding fails.
    pub fn issue(&self, role: Role) -> Result<(String, SessionClaims), SessionError> {
        self.issue_at(role, Utc::now())
    }

    /// Sign a session as if issued at `issued_at`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Signing`] if encoding fails.
    pub fn issue_at(
        &self,
        role: Role,
        issued_at: DateTime<Utc>,
    ) -> Result<(String, SessionClaims), SessionError> {
        let claims = SessionClaims {
            role,
            iat: issued_at.timestamp(),
            exp: (issued_at + self.ttl).timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| SessionError::Signing {
                reason: e.to_string(),
            })?;
        Ok((token, claims))
    }

    /// Check signature and expiry and return the claims.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Expired`] if the token is past its expiry.
    /// - [`SessionError::Invalid`] for any other failure (bad signature,
    ///   malformed token, wrong algorithm, unknown role).
    pub fn verify(&self, token: &str) -> Result<SessionClaims, SessionError> {
        decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => SessionError::Expired,
                _ => SessionError::Invalid {
                    reason: e.to_string(),
                },
            })
    }
}

impl fmt::Debug for SessionAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionAuthenticator")
            .field("secret", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"an-adequately-long-session-secret-0123";

    fn authenticator() -> SessionAuthenticator {
        SessionAuthenticator::new(SECRET, Duration::hours(DEFAULT_SESSION_TTL_HOURS)).unwrap()
    }

    #[test]
    fn issue_then_verify() {
        let auth = authenticator();
        let (token, issued) = auth.issue(Role::Admin).unwrap();
        let verified = auth.verify(&token).unwrap();
        assert_eq!(verified, issued);
        assert_eq!(verified.role, Role::Admin);
        assert_eq!(verified.exp - verified.iat, 24 * 3600);
    }

    #[test]
    fn token_from_other_secret_is_invalid() {
        let other =
            SessionAuthenticator::new(b"a-completely-different-secret-value!!", Duration::hours(1))
                .unwrap();
        let (token, _) = other.issue(Role::Admin).unwrap();
        assert!(matches!(
            authenticator().verify(&token),
            Err(SessionError::Invalid { .. })
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let auth = authenticator();
        let (token, _) = auth
            .issue_at(Role::Admin, Utc::now() - Duration::hours(25))
            .unwrap();
        assert!(matches!(auth.verify(&token), Err(SessionError::Expired)));
    }

    #[test]
    fn garbage_token_is_invalid() {
        let auth = authenticator();
        for garbage in ["", "not-a-jwt", "a.b.c"] {
            assert!(matches!(
                auth.verify(garbage),
                Err(SessionError::Invalid { .. })
            ));
        }
    }

    #[test]
    fn tampered_payload_is_invalid() {
        let auth = authenticator();
        let (token, _) = auth.issue(Role::Admin).unwrap();
        let mut parts: Vec<String> = token.split('.').map(str::to_owned).collect();
        parts[1].push('A');
        assert!(matches!(
            auth.verify(&parts.join(".")),
            Err(SessionError::Invalid { .. })
        ));
    }

    #[test]
    fn short_secret_is_rejected() {
        assert!(matches!(
            SessionAuthenticator::new(b"short", Duration::hours(1)),
            Err(SessionError::WeakSecret { min: 32, actual: 5 })
        ));
    }

    #[test]
    fn debug_hides_secret() {
        let debug = format!("{:?}", authenticator());
        assert!(debug.contains("[REDACTED]"));
    }
}
