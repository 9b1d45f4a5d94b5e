//! Concrete [`TransportFactory`](crate::TransportFactory) implementations.
//!
//! Contains [`SmtpTransportFactory`], delivering through an SMTP relay with
//! the async `lettre` transport.

pub mod smtp;

pub use smtp::*;
