//! Signature token issuance.
//!
//! Tokens are `sign_<128 random bits as hex>_<unix millis>`. The random half alone
//! carries the uniqueness guarantee; the timestamp only helps when reading logs.

use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;

use super::domain::SignatureToken;

const TOKEN_PREFIX: &str = "sign";
const RANDOM_BYTES: usize = 16;

/// Issue a fresh token. Panics only if the operating system entropy source fails.
pub fn issue(now: DateTime<Utc>) -> SignatureToken {
    let mut bytes = [0u8; RANDOM_BYTES];
    OsRng.fill_bytes(&mut bytes);
    SignatureToken(format!(
        "{TOKEN_PREFIX}_{}_{}",
        hex::encode(bytes),
        now.timestamp_millis()
    ))
}
