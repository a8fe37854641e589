/*
 * Responsibility
 * - identity token (JWT) の payload を取り出して UnverifiedClaims に変換する
 * - 署名検証 / exp チェックは行わない (API Gateway の Cognito authorizer 側の責務)
 *
 * Notes
 * - ここは trust boundary ではない。戻り値の型名 (Unverified) でそれを明示する
 * - 純粋関数。状態を持たない
 */
use base64::{
    Engine,
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use serde_json::{Map, Value};
use thiserror::Error;

/// Standard alphabet, padding optional: JWT segments are normally unpadded.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token: expected 3 segments, got {segments}")]
    Malformed { segments: usize },

    #[error("invalid token payload: {0}")]
    InvalidPayload(String),
}

/// Claims read from a token whose signature has NOT been checked.
///
/// Anything in here is only as trustworthy as the layer that authorized the request
/// before it reached this service. Do not use it to make authorization decisions on
/// its own; tenant isolation is enforced by the record store's policy on the
/// session tags derived from these claims.
#[derive(Debug, Clone, PartialEq)]
pub struct UnverifiedClaims {
    claims: Map<String, Value>,
}

/// Registered claim names (RFC 7519 + `scope`). Recognized, never validated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegisteredClaims {
    pub exp: Option<i64>,
    pub iss: Option<String>,
    // string or array of strings
    pub aud: Option<Value>,
    pub nbf: Option<i64>,
    pub iat: Option<i64>,
    pub scope: Option<String>,
    pub jti: Option<String>,
    pub sub: Option<String>,
}

impl UnverifiedClaims {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.claims.get(name).and_then(Value::as_str)
    }

    #[cfg(test)]
    pub fn into_map(self) -> Map<String, Value> {
        self.claims
    }

    /// Registered claims with lenient typing: a claim of the wrong JSON type is
    /// reported as absent rather than failing the whole decode.
    pub fn registered(&self) -> RegisteredClaims {
        let int = |name: &str| self.claims.get(name).and_then(Value::as_i64);
        let string = |name: &str| self.get_str(name).map(str::to_owned);

        RegisteredClaims {
            exp: int("exp"),
            iss: string("iss"),
            aud: self
                .claims
                .get("aud")
                .filter(|v| v.is_string() || v.is_array())
                .cloned(),
            nbf: int("nbf"),
            iat: int("iat"),
            scope: string("scope"),
            jti: string("jti"),
            sub: string("sub"),
        }
    }
}

impl From<Map<String, Value>> for UnverifiedClaims {
    fn from(claims: Map<String, Value>) -> Self {
        Self { claims }
    }
}

/// Decode the payload segment of `header.payload.signature`.
pub fn decode_unverified(token: &str) -> Result<UnverifiedClaims, TokenError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(TokenError::Malformed {
            segments: segments.len(),
        });
    }

    // base64url -> base64
    let payload = segments[1].replace('-', "+").replace('_', "/");

    let bytes = PAYLOAD_ENGINE
        .decode(payload.as_bytes())
        .map_err(|e| TokenError::InvalidPayload(format!("base64: {e}")))?;

    let text = std::str::from_utf8(&bytes)
        .map_err(|e| TokenError::InvalidPayload(format!("utf-8: {e}")))?;

    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(claims)) => Ok(UnverifiedClaims { claims }),
        Ok(_) => Err(TokenError::InvalidPayload(
            "payload is not a JSON object".to_string(),
        )),
        Err(e) => Err(TokenError::InvalidPayload(format!("json: {e}"))),
    }
}

#[cfg(test)]
pub(crate) mod test_tokens {
    use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
    use serde_json::Value;

    /// Unsigned token whose payload is `payload`; header and signature are fillers.
    pub fn fabricate(payload: &Value) -> String {
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("header.{body}.sig")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header};
    use serde_json::json;

    use super::test_tokens::fabricate;

    #[test]
    fn given_fabricated_token_when_decoded_then_claims_equal_payload() {
        let payload = json!({"custom:tenantId": "acme"});

        let claims = decode_unverified(&fabricate(&payload)).unwrap();

        assert_eq!(claims.get_str("custom:tenantId"), Some("acme"));
        assert_eq!(Value::Object(claims.into_map()), payload);
    }

    #[test]
    fn given_known_token_when_decoded_then_tenant_claim_is_read() {
        let token = "header.eyJjdXN0b206dGVuYW50SWQiOiJhY21lIn0.sig";

        let claims = decode_unverified(token).unwrap();

        assert_eq!(claims.get_str("custom:tenantId"), Some("acme"));
    }

    #[test]
    fn given_nested_payload_when_decoded_then_all_json_types_survive() {
        let payload = json!({
            "sub": "0f0e",
            "n": 3,
            "flag": true,
            "nothing": null,
            "groups": ["a", "b"],
            "nested": {"k": 1.5}
        });

        let claims = decode_unverified(&fabricate(&payload)).unwrap();

        assert_eq!(Value::Object(claims.into_map()), payload);
    }

    #[test]
    fn given_multibyte_characters_when_decoded_then_utf8_is_preserved() {
        let payload = json!({"name": "日本語テナント", "emoji": "🦀"});

        let claims = decode_unverified(&fabricate(&payload)).unwrap();

        assert_eq!(claims.get_str("name"), Some("日本語テナント"));
        assert_eq!(claims.get_str("emoji"), Some("🦀"));
    }

    #[test]
    fn given_url_safe_characters_when_decoded_then_substitution_is_reversed() {
        // "?>" and "~~" encode to segments containing '-' and '_' in base64url
        let payload = json!({"q": "??>>~~~"});
        let token = fabricate(&payload);
        let middle = token.split('.').nth(1).unwrap();
        assert!(middle.contains('_') || middle.contains('-'));

        let claims = decode_unverified(&token).unwrap();

        assert_eq!(claims.get_str("q"), Some("??>>~~~"));
    }

    #[test]
    fn given_padded_segment_when_decoded_then_padding_is_accepted() {
        // {"a":1} -> eyJhIjoxfQ== (padded form)
        let claims = decode_unverified("h.eyJhIjoxfQ==.s").unwrap();

        assert_eq!(claims.get("a"), Some(&json!(1)));
    }

    #[test]
    fn given_wrong_segment_count_when_decoded_then_malformed() {
        for token in ["", "abc", "a.b", "a.b.c.d", "a.b.c.d.e"] {
            let err = decode_unverified(token).unwrap_err();
            assert!(
                matches!(err, TokenError::Malformed { .. }),
                "{token:?} -> {err:?}"
            );
        }
    }

    #[test]
    fn given_invalid_base64_when_decoded_then_invalid_payload() {
        let err = decode_unverified("h.!!!not-base64!!!.s").unwrap_err();

        assert!(matches!(err, TokenError::InvalidPayload(_)));
    }

    #[test]
    fn given_non_json_payload_when_decoded_then_invalid_payload() {
        // "not json"
        let err = decode_unverified("h.bm90IGpzb24.s").unwrap_err();

        assert!(matches!(err, TokenError::InvalidPayload(_)));
    }

    #[test]
    fn given_json_scalar_payload_when_decoded_then_invalid_payload() {
        let err = decode_unverified(&fabricate(&json!([1, 2, 3]))).unwrap_err();

        assert!(matches!(err, TokenError::InvalidPayload(_)));
    }

    #[test]
    fn given_invalid_utf8_when_decoded_then_invalid_payload() {
        // 0xff 0xfe 0xfd
        let err = decode_unverified("h.__79.s").unwrap_err();

        assert!(matches!(err, TokenError::InvalidPayload(_)));
    }

    #[test]
    fn given_same_token_when_decoded_twice_then_claims_are_identical() {
        let token = fabricate(&json!({"custom:tenantId": "acme", "iat": 1}));

        assert_eq!(
            decode_unverified(&token).unwrap(),
            decode_unverified(&token).unwrap()
        );
    }

    #[test]
    fn given_signed_jwt_when_decoded_then_signature_is_not_required_to_match() {
        let claims = json!({"sub": "user-1", "custom:tenantId": "acme", "exp": 1});
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret-key-at-least-32-bytes"),
        )
        .unwrap();

        // expired and signed with a key this service has never seen
        let decoded = decode_unverified(&token).unwrap();

        assert_eq!(decoded.get_str("custom:tenantId"), Some("acme"));
        assert_eq!(decoded.registered().exp, Some(1));
    }

    #[test]
    fn given_registered_claims_when_read_then_wrong_types_are_absent() {
        let token = fabricate(&json!({
            "iss": "https://issuer",
            "aud": ["a", "b"],
            "sub": 42,
            "exp": "soon",
            "iat": 1700000000
        }));

        let registered = decode_unverified(&token).unwrap().registered();

        assert_eq!(registered.iss.as_deref(), Some("https://issuer"));
        assert_eq!(registered.aud, Some(json!(["a", "b"])));
        assert_eq!(registered.sub, None);
        assert_eq!(registered.exp, None);
        assert_eq!(registered.iat, Some(1700000000));
    }
}
