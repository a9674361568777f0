//! # Compact JWS (EdDSA)
//!
//! Both trust artifacts the issuer handles are compact JSON Web Signatures
//! with `alg = EdDSA`:
//!
//! - incoming signed id aliases, produced by the identity provider;
//! - outgoing credentials, produced by this issuer.
//!
//! An [`UnsignedJws`] is `base64url(header) "." base64url(claims)`. When built
//! locally, header and claims go through `CanonicalBytes` first, so the same
//! claims always yield the same signing input and therefore the same
//! signature-map key. When parsed from the wire, the received segments are
//! kept byte-for-byte since that is what the signer committed to.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use eai_core::CanonicalBytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ed25519::{self, Ed25519PublicKey, Ed25519Signature};
use crate::error::CryptoError;

/// The only JWS algorithm the issuer produces or accepts.
pub const ALG_EDDSA: &str = "EdDSA";

/// Protected JWS header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwsHeader {
    /// Signature algorithm. Always `EdDSA`.
    pub alg: String,
    /// Media type, `JWT` for everything this issuer signs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
    /// Key identifier. The idp id for aliases, the issuer key hex for credentials.
    pub kid: String,
}

impl JwsHeader {
    /// EdDSA JWT header for the given key id.
    pub fn eddsa(kid: impl Into<String>) -> Self {
        Self {
            alg: ALG_EDDSA.to_string(),
            typ: Some("JWT".to_string()),
            kid: kid.into(),
        }
    }
}

/// Bytes an Ed25519 signature is computed over.
///
/// Constructed only by [`UnsignedJws`], never from arbitrary bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JwsSigningInput(String);

impl JwsSigningInput {
    /// The ASCII signing input.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The signing input as bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

/// Header and claims of a JWS, without a signature.
#[derive(Debug, Clone)]
pub struct UnsignedJws {
    header: JwsHeader,
    claims: Value,
    signing_input: JwsSigningInput,
}

impl UnsignedJws {
    /// Build from a header and claims, canonicalizing both.
    pub fn new(header: &JwsHeader, claims: &impl Serialize) -> Result<Self, CryptoError> {
        let header_bytes = CanonicalBytes::new(header)?;
        let claims_value = serde_json::to_value(claims)
            .map_err(|e| CryptoError::MalformedJws(format!("claims not serializable: {e}")))?;
        let claims_bytes = CanonicalBytes::from_value(claims_value.clone())?;
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header_bytes.as_bytes()),
            URL_SAFE_NO_PAD.encode(claims_bytes.as_bytes())
        );
        Ok(Self {
            header: header.clone(),
            claims: claims_value,
            signing_input: JwsSigningInput(signing_input),
        })
    }

    /// Parse `header.claims` as produced by [`UnsignedJws::as_str`].
    pub fn parse(compact: &str) -> Result<Self, CryptoError> {
        let mut parts = compact.split('.');
        let (Some(h), Some(c), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(CryptoError::MalformedJws(
                "expected 2 dot-separated segments".to_string(),
            ));
        };
        Self::from_segments(h, c)
    }

    fn from_segments(header_b64: &str, claims_b64: &str) -> Result<Self, CryptoError> {
        let header: JwsHeader = decode_segment(header_b64, "header")?;
        if header.alg != ALG_EDDSA {
            return Err(CryptoError::UnsupportedAlgorithm(header.alg));
        }
        let claims: Value = decode_segment(claims_b64, "claims")?;
        if !claims.is_object() {
            return Err(CryptoError::MalformedJws(
                "claims must be a JSON object".to_string(),
            ));
        }
        Ok(Self {
            header,
            claims,
            signing_input: JwsSigningInput(format!("{header_b64}.{claims_b64}")),
        })
    }

    /// Protected header.
    pub fn header(&self) -> &JwsHeader {
        &self.header
    }

    /// Claims as untyped JSON.
    pub fn claims(&self) -> &Value {
        &self.claims
    }

    /// Deserialize the claims into a typed structure.
    pub fn claims_as<T: DeserializeOwned>(&self) -> Result<T, CryptoError> {
        serde_json::from_value(self.claims.clone())
            .map_err(|e| CryptoError::MalformedJws(format!("unexpected claims: {e}")))
    }

    /// Input to the signature.
    pub fn signing_input(&self) -> &JwsSigningInput {
        &self.signing_input
    }

    /// Compact form without the signature segment.
    pub fn as_str(&self) -> &str {
        self.signing_input.as_str()
    }

    /// Append a signature, producing the compact `header.claims.signature` form.
    pub fn attach_signature(&self, signature: &Ed25519Signature) -> String {
        format!(
            "{}.{}",
            self.signing_input.as_str(),
            URL_SAFE_NO_PAD.encode(signature.as_bytes())
        )
    }
}

/// A parsed compact JWS with its signature.
#[derive(Debug, Clone)]
pub struct CompactJws {
    unsigned: UnsignedJws,
    signature: Ed25519Signature,
}

impl CompactJws {
    /// Parse `header.claims.signature`. Does not verify.
    pub fn parse(compact: &str) -> Result<Self, CryptoError> {
        let mut parts = compact.trim().split('.');
        let (Some(h), Some(c), Some(s), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(CryptoError::MalformedJws(
                "expected 3 dot-separated segments".to_string(),
            ));
        };
        let unsigned = UnsignedJws::from_segments(h, c)?;
        let sig_bytes = URL_SAFE_NO_PAD
            .decode(s)
            .map_err(|e| CryptoError::MalformedJws(format!("signature segment: {e}")))?;
        let signature = Ed25519Signature::from_slice(&sig_bytes)?;
        Ok(Self {
            unsigned,
            signature,
        })
    }

    /// Verify the signature against `public_key`.
    pub fn verify(&self, public_key: &Ed25519PublicKey) -> Result<(), CryptoError> {
        ed25519::verify(self.unsigned.signing_input(), &self.signature, public_key)
    }

    /// Protected header.
    pub fn header(&self) -> &JwsHeader {
        self.unsigned.header()
    }

    /// Claims as untyped JSON.
    pub fn claims(&self) -> &Value {
        self.unsigned.claims()
    }

    /// Deserialize the claims into a typed structure.
    pub fn claims_as<T: DeserializeOwned>(&self) -> Result<T, CryptoError> {
        self.unsigned.claims_as()
    }

    /// The unsigned part.
    pub fn unsigned(&self) -> &UnsignedJws {
        &self.unsigned
    }

    /// The detached signature.
    pub fn signature(&self) -> &Ed25519Signature {
        &self.signature
    }
}

fn decode_segment<T: DeserializeOwned>(segment: &str, what: &str) -> Result<T, CryptoError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| CryptoError::MalformedJws(format!("{what} segment: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| CryptoError::MalformedJws(format!("{what} segment: {e}")))
}
