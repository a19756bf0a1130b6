//! HMAC-signed session cookies.
//!
//! The cookie value is `base64url(payload).base64url(tag)`: the payload is
//! the JSON-encoded session user, the tag an HMAC-SHA256 over the encoded
//! payload under the configured secret. Verification is constant-time.
//! Dropping the cookie ends the session; nothing is stored server-side.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use domains::{Error, Result, SessionUser};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Cookie carrying the signed session payload.
pub const SESSION_COOKIE: &str = "session";

const SESSION_MAX_AGE_SECS: u64 = 24 * 60 * 60;

/// Mints and verifies the signed session cookie.
#[derive(Clone)]
pub struct SessionCodec {
    secret: SecretString,
}

impl SessionCodec {
    pub fn new(secret: SecretString) -> Self {
        SessionCodec { secret }
    }

    fn mac(&self) -> Result<HmacSha256> {
        HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| Error::Internal("unusable session secret".into()))
    }

    /// Serializes and signs a session user into a cookie value.
    pub fn encode(&self, user: &SessionUser) -> Result<String> {
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(user)?);
        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let tag = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        Ok(format!("{payload}.{tag}"))
    }

    /// Verifies a cookie value and recovers the session user. Anything
    /// malformed, tampered with, or signed under another key reads as no
    /// session.
    pub fn decode(&self, value: &str) -> Option<SessionUser> {
        let (payload, tag) = value.split_once('.')?;
        let tag = URL_SAFE_NO_PAD.decode(tag).ok()?;

        let mut mac = self.mac().ok()?;
        mac.update(payload.as_bytes());
        if mac.verify_slice(&tag).is_err() {
            tracing::debug!("session cookie failed signature verification");
            return None;
        }

        let raw = URL_SAFE_NO_PAD.decode(payload).ok()?;
        serde_json::from_slice(&raw).ok()
    }

    /// Extracts the session user from a `Cookie` request header.
    pub fn user_from_cookie_header(&self, header: &str) -> Option<SessionUser> {
        header.split(';').find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            if name == SESSION_COOKIE {
                self.decode(value)
            } else {
                None
            }
        })
    }

    /// `Set-Cookie` value establishing a session.
    pub fn login_cookie(&self, user: &SessionUser) -> Result<String> {
        let value = self.encode(user)?;
        Ok(format!(
            "{SESSION_COOKIE}={value}; Path=/; Max-Age={SESSION_MAX_AGE_SECS}; HttpOnly; SameSite=Lax"
        ))
    }

    /// `Set-Cookie` value dropping the session.
    pub fn logout_cookie(&self) -> String {
        format!("{SESSION_COOKIE}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax")
    }
}
