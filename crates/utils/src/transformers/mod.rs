//! Built-in message rewrites applied before routing.
//!
//! [`RecipientTransformer`] folds recipients given on the command line into
//! the `to` header, [`TransferDecodeTransformer`] reverses quoted-printable
//! escapes left in the body by upstream senders.

pub mod recipients;
pub mod transfer_decode;

pub use recipients::*;
pub use transfer_decode::*;
