use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;

use shared_models::auth::Operator;

type HmacSha256 = Hmac<Sha256>;

const CREDENTIAL_CONTEXT: &[u8] = b"clinic-console/operator-credential/v1";

fn credential_tag(secret: &[u8]) -> Result<HmacSha256, String> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|_| "Failed to create HMAC".to_string())?;
    mac.update(CREDENTIAL_CONTEXT);
    Ok(mac)
}

/// Checks the presented bearer token against the shared operator credential.
///
/// Both sides are reduced to HMAC tags so the final comparison runs in
/// constant time regardless of token length.
pub fn validate_operator_token(presented: &str, expected: &str) -> Result<Operator, String> {
    if expected.is_empty() {
        return Err("Operator credential is not configured".to_string());
    }

    if presented.is_empty() {
        return Err("Empty operator credential".to_string());
    }

    let expected_tag = credential_tag(expected.as_bytes())?.finalize().into_bytes();

    if credential_tag(presented.as_bytes())?.verify_slice(&expected_tag).is_err() {
        debug!("Operator credential verification failed");
        return Err("Invalid operator credential".to_string());
    }

    Ok(Operator::shared())
}
