//! VNPay 签名工具
//!
//! Request and callback parameters are sorted by key, encoded as
//! `key=value` pairs joined with `&`, and signed with HMAC-SHA512.

use crate::utils::{AppError, AppResult};
use hmac::{Hmac, Mac};
use sha2::Sha512;
use shared::models::RawParams;

type HmacSha512 = Hmac<Sha512>;

const SECURE_HASH: &str = "vnp_SecureHash";
const SECURE_HASH_TYPE: &str = "vnp_SecureHashType";

/// VNPay 网关配置
#[derive(Debug, Clone, Default)]
pub struct VnpayConfig {
    pub tmn_code: String,
    pub hash_secret: String,
    pub pay_url: String,
    pub return_url: String,
}

impl VnpayConfig {
    pub const SANDBOX_URL: &'static str = "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html";

    pub fn from_env() -> Self {
        Self {
            tmn_code: std::env::var("VNPAY_TMN_CODE").unwrap_or_default(),
            hash_secret: std::env::var("VNPAY_HASH_SECRET").unwrap_or_default(),
            pay_url: std::env::var("VNPAY_URL").unwrap_or_else(|_| Self::SANDBOX_URL.into()),
            return_url: std::env::var("VNPAY_RETURN_URL")
                .unwrap_or_else(|_| "http://localhost:5173/payment/vnpay-return".into()),
        }
    }

    /// Terminal code and secret are both set
    pub fn is_configured(&self) -> bool {
        !self.tmn_code.is_empty() && !self.hash_secret.is_empty()
    }
}

/// Keep only the gateway's `vnp_*` parameters
pub fn pick_vnp_params<'a, I>(all: I) -> RawParams
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    all.into_iter()
        .filter(|(k, _)| k.starts_with("vnp_"))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// URI component encoding as browsers do it: `!'()*` stay literal
pub fn encode_component(raw: &str) -> String {
    urlencoding::encode(raw)
        .replace("%21", "!")
        .replace("%27", "'")
        .replace("%28", "(")
        .replace("%29", ")")
        .replace("%2A", "*")
}

/// `k1=v1&k2=v2...` in key order
pub fn build_query(params: &RawParams) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Lowercase hex HMAC-SHA512 of `data`
pub fn sign(secret: &str, data: &str) -> AppResult<String> {
    let mut mac = HmacSha512::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::internal("HMAC key error"))?;
    mac.update(data.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Signed redirect URL, hash appended last; returns the URL and the hash
pub fn payment_url(config: &VnpayConfig, params: &RawParams) -> AppResult<(String, String)> {
    let query = build_query(params);
    let secure_hash = sign(&config.hash_secret, &query)?;
    let url = format!("{}?{}&{}={}", config.pay_url, query, SECURE_HASH, secure_hash);
    Ok((url, secure_hash))
}

/// Check `vnp_SecureHash` against the remaining parameters
///
/// A missing hash never verifies. Comparison ignores hex case.
pub fn verify(params: &RawParams, secret: &str) -> bool {
    let Some(provided) = params.get(SECURE_HASH).filter(|h| !h.is_empty()) else {
        return false;
    };
    let mut unsigned = params.clone();
    unsigned.remove(SECURE_HASH);
    unsigned.remove(SECURE_HASH_TYPE);

    sign(secret, &build_query(&unsigned))
        .is_ok_and(|expected| expected.eq_ignore_ascii_case(provided))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> RawParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn config() -> VnpayConfig {
        VnpayConfig {
            tmn_code: "TMN01".into(),
            hash_secret: "secret".into(),
            pay_url: VnpayConfig::SANDBOX_URL.into(),
            return_url: "http://localhost/return".into(),
        }
    }

    #[test]
    fn test_query_is_sorted_and_encoded() {
        let p = params(&[
            ("vnp_OrderInfo", "Thanh toan bill 7 - Ban A1"),
            ("vnp_Amount", "120000"),
            ("vnp_ReturnUrl", "http://x/y?z=1"),
        ]);
        assert_eq!(
            build_query(&p),
            "vnp_Amount=120000&vnp_OrderInfo=Thanh%20toan%20bill%207%20-%20Ban%20A1&vnp_ReturnUrl=http%3A%2F%2Fx%2Fy%3Fz%3D1"
        );
    }

    #[test]
    fn test_encode_component_keeps_reserved_marks() {
        assert_eq!(encode_component("a(b)*!'c"), "a(b)*!'c");
        assert_eq!(encode_component("a b&c"), "a%20b%26c");
    }

    #[test]
    fn test_sign_is_hex_sha512() {
        let sig = sign("secret", "vnp_Amount=100").unwrap();
        assert_eq!(sig.len(), 128);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(sig, sign("other", "vnp_Amount=100").unwrap());
    }

    #[test]
    fn test_sign_with_empty_secret_is_still_a_digest() {
        let sig = sign("", "vnp_Amount=100").unwrap();
        assert_eq!(sig.len(), 128);
        assert_ne!(sig, sign("secret", "vnp_Amount=100").unwrap());
    }

    #[test]
    fn test_verify_accepts_own_signature_any_case() {
        let mut p = params(&[("vnp_TxnRef", "7_1700000000000"), ("vnp_ResponseCode", "00")]);
        let hash = sign("secret", &build_query(&p)).unwrap();
        p.insert(SECURE_HASH.into(), hash.to_uppercase());
        p.insert(SECURE_HASH_TYPE.into(), "HmacSHA512".into());
        assert!(verify(&p, "secret"));
    }

    #[test]
    fn test_verify_rejects_tampering_and_missing_hash() {
        let mut p = params(&[("vnp_TxnRef", "7_1"), ("vnp_ResponseCode", "00")]);
        let hash = sign("secret", &build_query(&p)).unwrap();
        p.insert(SECURE_HASH.into(), hash);
        assert!(!verify(&p, "wrong"));

        p.insert("vnp_ResponseCode".into(), "24".into());
        assert!(!verify(&p, "secret"));

        assert!(!verify(&params(&[("vnp_TxnRef", "7_1")]), "secret"));
    }

    #[test]
    fn test_payment_url_round_trips_through_verify() {
        let cfg = config();
        let p = params(&[("vnp_TxnRef", "7_1"), ("vnp_Amount", "5000000")]);
        let (url, hash) = payment_url(&cfg, &p).unwrap();
        assert!(url.starts_with(VnpayConfig::SANDBOX_URL));
        assert!(url.ends_with(&format!("vnp_SecureHash={}", hash)));

        let mut back = p.clone();
        back.insert(SECURE_HASH.into(), hash);
        assert!(verify(&back, &cfg.hash_secret));
    }

    #[test]
    fn test_pick_vnp_params() {
        let all = params(&[("vnp_TxnRef", "1_1"), ("foo", "bar")]);
        let picked = pick_vnp_params(&all);
        assert_eq!(picked.len(), 1);
        assert!(picked.contains_key("vnp_TxnRef"));
    }
}
