//! Request middleware.

#![allow(missing_docs)]

mod signature_verification;

pub use signature_verification::{verify_inbox_request, SignatureVerifier};
