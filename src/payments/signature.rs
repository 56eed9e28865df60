//! Gateway callback signatures: hex encoded HMAC-SHA256 of `order_id|payment_id`
use hex;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn mac_for(secret: &str, order_id: &str, payment_id: &str) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(format!("{}|{}", order_id, payment_id).as_bytes());
    Some(mac)
}

pub fn sign(secret: &str, order_id: &str, payment_id: &str) -> Option<String> {
    mac_for(secret, order_id, payment_id).map(|mac| hex::encode(mac.finalize().into_bytes()))
}

/// Constant time comparison against the signature posted by the checkout widget.
pub fn verify_signature(secret: &str, order_id: &str, payment_id: &str, signature: &str) -> bool {
    let expected = match hex::decode(signature.trim()) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    mac_for(secret, order_id, payment_id).map_or(false, |mac| mac.verify_slice(&expected).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "rzp_test_secret";
    const ORDER_ID: &str = "order_9A33XWu170gUtm";
    const PAYMENT_ID: &str = "pay_29QQoUBi66xm2f";
    const SIGNATURE: &str = "3260a4f62b64907cfd92766c15dea1480ad753cedc90248b8346f48f243993c1";

    #[test]
    fn test_sign_known_vector() {
        assert_eq!(sign(SECRET, ORDER_ID, PAYMENT_ID), Some(SIGNATURE.to_string()));
    }

    #[test]
    fn test_verify_signature() {
        assert!(verify_signature(SECRET, ORDER_ID, PAYMENT_ID, SIGNATURE));
        assert!(verify_signature(SECRET, ORDER_ID, PAYMENT_ID, &SIGNATURE.to_uppercase()));
        assert!(!verify_signature("other_secret", ORDER_ID, PAYMENT_ID, SIGNATURE));
        assert!(!verify_signature(SECRET, ORDER_ID, "pay_other", SIGNATURE));
        assert!(!verify_signature(SECRET, ORDER_ID, PAYMENT_ID, "not hex"));
        assert!(!verify_signature(SECRET, ORDER_ID, PAYMENT_ID, &SIGNATURE[..32]));
    }
}
