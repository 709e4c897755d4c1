//! Cheque wire format
//!
//! A cheque travels as a definite-length CBOR array of four fields:
//!
//! | # | Field        | CBOR type                                |
//! |---|--------------|------------------------------------------|
//! | 1 | `channel_id` | Bytes (32)                               |
//! | 2 | `sender`     | Uint (0 = Party, 1 = Counterparty)       |
//! | 3 | `amount`     | Uint, or tag-2 bignum above 2⁶⁴ − 1      |
//! | 4 | `signature`  | Bytes (64)                               |
//!
//! Integers use the shortest encoding, so a canonical payload
//! round-trips byte-for-byte and matches what the channel counterpart
//! validates on-chain.

use ciborium::value::{Integer, Value};
use lightrail_core::Signature;
use num_bigint::BigUint;
use thiserror::Error;

use crate::cheque::{ChannelId, Cheque, ChequeBody, ChequeContent, Sender, CHANNEL_ID_LEN};

/// Fields in the cheque tuple.
const FIELD_COUNT: usize = 4;

/// CBOR tag for an unsigned bignum (RFC 8949 §3.4.3).
const BIGNUM_TAG: u64 = 2;

/// Ed25519 signature width on the wire.
const SIGNATURE_LEN: usize = 64;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("cheque deserialization failed: {reason}")]
pub struct ChequeContentDeserializationError {
    pub reason: String,
}

fn malformed(reason: impl Into<String>) -> ChequeContentDeserializationError {
    ChequeContentDeserializationError {
        reason: reason.into(),
    }
}

/// Serialize a verified cheque to its wire bytes.
///
/// Only verified cheques go on the wire; unverified content is
/// something we received, not something we send.
pub fn serialize_cheque(cheque: &Cheque) -> Vec<u8> {
    let content = cheque.content();
    let tuple = Value::Array(vec![
        Value::Bytes(content.body.channel_id.as_bytes().to_vec()),
        Value::Integer(Integer::from(content.body.sender.tag())),
        amount_to_value(&content.body.amount),
        Value::Bytes(content.signature.as_bytes().to_vec()),
    ]);

    let mut bytes = Vec::new();
    ciborium::into_writer(&tuple, &mut bytes)
        .expect("CBOR serialization into a Vec cannot fail");
    bytes
}

fn amount_to_value(amount: &BigUint) -> Value {
    match u64::try_from(amount) {
        Ok(small) => Value::Integer(Integer::from(small)),
        Err(_) => Value::Tag(BIGNUM_TAG, Box::new(Value::Bytes(amount.to_bytes_be()))),
    }
}

/// Parse wire bytes into unverified cheque content.
///
/// Structural validation only (arity, types, widths, tag range). The
/// signature is *not* checked here; pass the result through
/// [`crate::verify_cheque`] before trusting it.
pub fn deserialize_cheque_content(
    bytes: &[u8],
) -> Result<ChequeContent, ChequeContentDeserializationError> {
    let value: Value =
        ciborium::from_reader(bytes).map_err(|e| malformed(format!("invalid CBOR: {e}")))?;

    let Value::Array(fields) = value else {
        return Err(malformed("top-level value must be an array"));
    };
    if fields.len() != FIELD_COUNT {
        return Err(malformed(format!(
            "expected {FIELD_COUNT} fields, got {}",
            fields.len()
        )));
    }
    let [channel_id, sender, amount, signature]: [Value; FIELD_COUNT] = fields
        .try_into()
        .map_err(|_| malformed("expected a 4-tuple"))?;

    let channel_id = match channel_id {
        Value::Bytes(bytes) => {
            let bytes: [u8; CHANNEL_ID_LEN] = bytes.try_into().map_err(|b: Vec<u8>| {
                malformed(format!(
                    "channel id must be {CHANNEL_ID_LEN} bytes, got {}",
                    b.len()
                ))
            })?;
            ChannelId::from_bytes(bytes)
        }
        _ => return Err(malformed("channel id must be a byte string")),
    };

    let sender = match sender {
        Value::Integer(tag) => u8::try_from(tag)
            .ok()
            .and_then(Sender::from_tag)
            .ok_or_else(|| malformed("sender tag must be 0 or 1"))?,
        _ => return Err(malformed("sender must be an integer")),
    };

    let amount = match amount {
        Value::Integer(small) => {
            let small = u64::try_from(small)
                .map_err(|_| malformed("amount must be non-negative"))?;
            BigUint::from(small)
        }
        Value::Tag(BIGNUM_TAG, boxed) => match *boxed {
            Value::Bytes(bytes) => BigUint::from_bytes_be(&bytes),
            _ => return Err(malformed("bignum amount must carry a byte string")),
        },
        _ => return Err(malformed("amount must be an integer or a tag-2 bignum")),
    };

    let signature = match signature {
        Value::Bytes(bytes) => {
            let bytes: [u8; SIGNATURE_LEN] = bytes.try_into().map_err(|b: Vec<u8>| {
                malformed(format!(
                    "signature must be {SIGNATURE_LEN} bytes, got {}",
                    b.len()
                ))
            })?;
            Signature::from_bytes(bytes)
        }
        _ => return Err(malformed("signature must be a byte string")),
    };

    Ok(ChequeContent {
        body: ChequeBody {
            channel_id,
            sender,
            amount,
        },
        signature,
    })
}
