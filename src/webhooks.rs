use hmac::{Hmac, Mac};
use rand_core::{OsRng, RngCore};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the signature of outbound webhook deliveries.
pub const SIGNATURE_HEADER: &str = "X-Helpdesk-Signature";

const SIGNATURE_PREFIX: &str = "sha256=";

/// key: webhooks-secret -> 16 random bytes, hex encoded
pub fn generate_webhook_secret() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Signs a delivery body with the account's webhook secret.
pub fn sign_payload(secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can use any key length");
    mac.update(body);
    format!("{SIGNATURE_PREFIX}{}", hex::encode(mac.finalize().into_bytes()))
}

/// Checks a `sha256=<hex>` signature against `body` in constant time.
pub fn verify_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    let Some(encoded) = signature.trim().strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };
    let Ok(expected) = hex::decode(encoded) else {
        return false;
    };
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can use any key length");
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}
