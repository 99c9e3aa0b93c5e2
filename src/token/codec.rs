//! Signed share-token codec
//!
//! A token is three base64url segments joined by `.`: a fixed header naming the
//! signing algorithm, the section list as JSON, and an HMAC-SHA256 tag over
//! `header.payload`. The payload is readable by anyone; only tampering is
//! detected.

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::debug;

use crate::{
    error::{ConfigError, EncodeError, TokenError},
    schedule::Section,
};

type HmacSha256 = Hmac<Sha256>;

/// Segment delimiter
pub const DELIMITER: char = '.';

/// The only signing algorithm this codec produces and accepts
pub const ALGORITHM: &str = "HS256";

#[derive(Debug, Serialize, Deserialize)]
struct TokenHeader {
    alg: String,
    typ: String,
}

impl TokenHeader {
    fn current() -> Self {
        Self {
            alg: ALGORITHM.to_string(),
            typ: "JWT".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct PayloadOut<'a> {
    sections: &'a [Section],
}

#[derive(Debug, Deserialize)]
struct PayloadIn {
    sections: Vec<Section>,
}

/// Encodes and verifies share tokens with an injected signing secret.
///
/// A codec without a secret cannot encode and rejects every token it decodes.
#[derive(Clone, Default)]
pub struct TokenCodec {
    secret: Option<String>,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl TokenCodec {
    /// Create a codec; an empty secret counts as not configured
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    pub fn has_secret(&self) -> bool {
        self.secret.is_some()
    }

    /// Serialize and sign a section list
    pub fn encode(&self, sections: &[Section]) -> Result<String, EncodeError> {
        let secret = self.secret.as_deref().ok_or(ConfigError::MissingSecret)?;

        let header = encode_json(&TokenHeader::current())?;
        let payload = encode_json(&PayloadOut { sections })?;
        let signing_input = format!("{}{}{}", header, DELIMITER, payload);
        let tag = URL_SAFE_NO_PAD.encode(sign(secret, &signing_input));

        debug!("Encoded share token for {} sections", sections.len());
        Ok(format!("{}{}{}", signing_input, DELIMITER, tag))
    }

    /// Verify and parse a token.
    ///
    /// Returns `None` for any malformed, tampered, or invalid token; the cause
    /// is only logged.
    pub fn decode(&self, token: &str) -> Option<Vec<Section>> {
        match self.try_decode(token) {
            Ok(sections) => Some(sections),
            Err(e) => {
                debug!("Rejected share token: {}", e);
                None
            }
        }
    }

    /// Like `decode`, but reports why a token was rejected
    pub fn try_decode(&self, token: &str) -> Result<Vec<Section>, TokenError> {
        let segments: Vec<&str> = token.split(DELIMITER).collect();
        if segments.len() < 3 {
            return Err(TokenError::Malformed {
                reason: format!("expected 3 segments, found {}", segments.len()),
            });
        }
        if segments.len() > 3 {
            return Err(TokenError::Malformed {
                reason: format!("unexpected extra segments ({})", segments.len()),
            });
        }
        let (header, payload, tag) = (segments[0], segments[1], segments[2]);

        // Without a secret nothing can verify
        let secret = self.secret.as_deref().ok_or(TokenError::BadSignature)?;

        let tag = URL_SAFE_NO_PAD
            .decode(tag)
            .map_err(|_| TokenError::BadSignature)?;
        let signing_input = &token[..header.len() + 1 + payload.len()];
        verify(secret, signing_input, &tag)?;

        let header: TokenHeader = decode_json(header).map_err(|reason| TokenError::Malformed {
            reason: format!("header: {}", reason),
        })?;
        if header.alg != ALGORITHM {
            return Err(TokenError::UnsupportedHeader { alg: header.alg });
        }

        let payload: PayloadIn =
            decode_json(payload).map_err(|reason| TokenError::InvalidPayload { reason })?;
        for (index, section) in payload.sections.iter().enumerate() {
            section.validate().map_err(|e| TokenError::InvalidPayload {
                reason: format!("section {}: {}", index, e),
            })?;
        }

        Ok(payload.sections)
    }
}

fn mac_for(secret: &str) -> HmacSha256 {
    // HMAC takes keys of any length, so this cannot fail
    <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"))
}

fn sign(secret: &str, data: &str) -> Vec<u8> {
    let mut mac = mac_for(secret);
    mac.update(data.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

fn verify(secret: &str, data: &str, tag: &[u8]) -> Result<(), TokenError> {
    let mut mac = mac_for(secret);
    mac.update(data.as_bytes());
    mac.verify_slice(tag).map_err(|_| TokenError::BadSignature)
}

fn encode_json<T: Serialize>(value: &T) -> Result<String, EncodeError> {
    let json = serde_json::to_vec(value).map_err(|e| EncodeError::Serialize {
        reason: e.to_string(),
    })?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode_json<T: for<'de> Deserialize<'de>>(segment: &str) -> Result<T, String> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| format!("invalid base64url: {}", e))?;
    serde_json::from_slice(&bytes).map_err(|e| format!("invalid JSON: {}", e))
}
