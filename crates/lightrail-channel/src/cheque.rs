//! Cheque types and canonical signing bytes
//!
//! The signing byte layout is consensus-critical: the validator script
//! rebuilds it from the channel state and checks the signature against
//! it. Any reordering or padding change breaks settlement.

use std::ops::Deref;

use lightrail_core::{Signature, VerificationKey};
use num_bigint::BigUint;
use thiserror::Error;

/// Fixed channel identifier width
pub const CHANNEL_ID_LEN: usize = 32;

/// Identifies one payment channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId([u8; CHANNEL_ID_LEN]);

impl ChannelId {
    pub fn from_bytes(bytes: [u8; CHANNEL_ID_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; CHANNEL_ID_LEN] {
        &self.0
    }
}

/// Which side of the channel issued the cheque.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    Party = 0,
    Counterparty = 1,
}

impl Sender {
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Party),
            1 => Some(Self::Counterparty),
            _ => None,
        }
    }
}

/// The signed fields of a cheque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChequeBody {
    pub channel_id: ChannelId,
    pub sender: Sender,
    /// Cumulative amount, unbounded and non-negative.
    pub amount: BigUint,
}

impl ChequeBody {
    /// Canonical signing bytes:
    ///
    /// ```text
    /// channel id (32B) || sender tag (1B) || amount (minimal big-endian)
    /// ```
    ///
    /// The amount carries no leading zero byte; zero itself encodes as
    /// the single byte `0x00`.
    pub fn signing_bytes(&self) -> Vec<u8> {
        let amount = self.amount.to_bytes_be();
        let mut bytes = Vec::with_capacity(CHANNEL_ID_LEN + 1 + amount.len());
        bytes.extend_from_slice(self.channel_id.as_bytes());
        bytes.push(self.sender.tag());
        bytes.extend_from_slice(&amount);
        bytes
    }
}

/// A cheque whose signature has not been checked yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChequeContent {
    pub body: ChequeBody,
    pub signature: Signature,
}

/// A cheque whose signature has been checked.
///
/// Only obtainable through [`verify_cheque`]; holding one is proof the
/// check ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cheque(ChequeContent);

impl Cheque {
    pub fn content(&self) -> &ChequeContent {
        &self.0
    }

    pub fn into_content(self) -> ChequeContent {
        self.0
    }
}

impl Deref for Cheque {
    type Target = ChequeContent;

    fn deref(&self) -> &ChequeContent {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("cheque does not verify against the claimed sender key")]
pub struct ChequeValidationError;

/// Check `content`'s signature against `sender_key` over the canonical
/// signing bytes.
///
/// Success reinterprets the same content as a [`Cheque`] without
/// copying. Failure is a single undifferentiated error: encoding and
/// signature faults are indistinguishable to the caller.
pub fn verify_cheque(
    content: ChequeContent,
    sender_key: &VerificationKey,
) -> Result<Cheque, ChequeValidationError> {
    let signing_bytes = content.body.signing_bytes();
    if !sender_key.verify(&signing_bytes, &content.signature) {
        return Err(ChequeValidationError);
    }
    Ok(Cheque(content))
}
