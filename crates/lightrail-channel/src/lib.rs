//! # Lightrail Channel
//!
//! Canonical encoding and verification for payment-channel cheques.
//!
//! A cheque is a signed off-chain statement of balance transfer within
//! a channel. The signature covers a fixed byte layout that the
//! on-chain validator reconstructs independently, so the encoding here
//! must be byte-exact. The wire format is a compact CBOR 4-tuple
//! carried between channel parties and into transactions.
//!
//! Signing and key custody live in `lightrail-core`; this crate only
//! frames and checks bytes.

pub mod cheque;
pub mod codec;

pub use cheque::{
    verify_cheque, ChannelId, Cheque, ChequeBody, ChequeContent, ChequeValidationError, Sender,
    CHANNEL_ID_LEN,
};
pub use codec::{deserialize_cheque_content, serialize_cheque, ChequeContentDeserializationError};
