//! Stripe webhook authentication and event extraction.
//!
//! Stripe signs every delivery with the endpoint secret:
//! `Stripe-Signature: t=<unix>,v1=<hex hmac>[,v1=...]` where the HMAC-SHA256
//! covers `"<t>.<raw body>"`.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

use crate::core::error::{AppError, AppResult};
use crate::domain::Money;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the signature
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Event type that confirms a paid checkout
pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("request has no Stripe-Signature header")]
    MissingHeader,
    #[error("signature header has no timestamp")]
    MissingTimestamp,
    #[error("signature header timestamp is not a number")]
    InvalidTimestamp,
    #[error("signature header has no v1 signature")]
    MissingSignature,
    #[error("timestamp is outside the tolerance window")]
    Expired,
    #[error("no signature matches the payload")]
    Mismatch,
    #[error("webhook secret is not usable as an HMAC key")]
    InvalidKey,
}

struct ParsedHeader<'a> {
    timestamp: i64,
    signatures: Vec<&'a str>,
}

fn parse_header(header: &str) -> Result<ParsedHeader<'_>, SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = Some(value.parse::<i64>().map_err(|_| SignatureError::InvalidTimestamp)?),
            "v1" => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MissingTimestamp)?;
    if signatures.is_empty() {
        return Err(SignatureError::MissingSignature);
    }
    Ok(ParsedHeader { timestamp, signatures })
}

fn signed_mac(payload: &[u8], secret: &str, timestamp: i64) -> Result<HmacSha256, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::InvalidKey)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Hex signature Stripe would send for `payload` at `timestamp`.
pub fn compute_signature(payload: &[u8], secret: &str, timestamp: i64) -> Result<String, SignatureError> {
    Ok(hex::encode(signed_mac(payload, secret, timestamp)?.finalize().into_bytes()))
}

/// Full `Stripe-Signature` header value for `payload`.
pub fn signature_header(payload: &[u8], secret: &str, timestamp: i64) -> Result<String, SignatureError> {
    Ok(format!("t={},v1={}", timestamp, compute_signature(payload, secret, timestamp)?))
}

/// Verifies a `Stripe-Signature` header against the raw request body.
///
/// Any of the `v1` entries may match (Stripe sends several while a secret is
/// being rolled). The comparison is constant-time.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
    tolerance_secs: i64,
) -> Result<(), SignatureError> {
    let parsed = parse_header(header)?;

    let age = now.abs_diff(parsed.timestamp);
    if age > tolerance_secs.unsigned_abs() {
        return Err(SignatureError::Expired);
    }

    let base = signed_mac(payload, secret, parsed.timestamp)?;
    let matched = parsed
        .signatures
        .iter()
        .filter_map(|sig| hex::decode(sig).ok())
        .any(|expected| base.clone().verify_slice(&expected).is_ok());

    if matched {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Envelope of every Stripe event.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

pub fn parse_event(payload: &[u8]) -> AppResult<StripeEvent> {
    Ok(serde_json::from_slice(payload)?)
}

#[derive(Debug, Deserialize)]
struct SessionObject {
    id: String,
    #[serde(default)]
    metadata: std::collections::HashMap<String, String>,
    #[serde(default)]
    amount_total: Option<i64>,
    #[serde(default)]
    currency: Option<String>,
}

/// A paid checkout session reduced to what the bot needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedCheckout {
    pub session_id: String,
    pub email: String,
    pub chat_id: i64,
    pub money: Money,
}

impl CompletedCheckout {
    /// `Ok(None)` for event types other than a completed checkout.
    ///
    /// A completed checkout without email or chat id in its metadata is a
    /// validation error.
    pub fn from_event(event: &StripeEvent) -> AppResult<Option<Self>> {
        if event.event_type != CHECKOUT_COMPLETED {
            return Ok(None);
        }

        let session: SessionObject = serde_json::from_value(event.data.object.clone())?;

        let email = session
            .metadata
            .get("email")
            .map(|e| e.trim())
            .filter(|e| !e.is_empty())
            .ok_or_else(|| AppError::Validation(format!("session {} has no email metadata", session.id)))?
            .to_string();

        let chat_id = session
            .metadata
            .get("chat_id")
            .ok_or_else(|| AppError::Validation(format!("session {} has no chat_id metadata", session.id)))?
            .trim()
            .parse::<i64>()
            .map_err(|_| AppError::Validation(format!("session {} has a non-numeric chat_id", session.id)))?;

        Ok(Some(Self {
            session_id: session.id,
            email,
            chat_id,
            money: Money::new(session.amount_total.unwrap_or(0), session.currency.unwrap_or_default()),
        }))
    }
}
