/*
 * Responsibility
 * - REQUEST_TAG_KEYS_MAPPING_ATTRIBUTES (tag key -> claim name) の解釈
 * - claims に mapping を適用して session tag の列を作る
 *
 * Notes
 * - 順序は JSON object の記述順 (serde_json preserve_order) をそのまま使う
 * - mapping 先の claim が無い場合は tag を作らずエラー (fail-closed)
 */
use serde_json::Value;

use crate::services::credentials::CredentialError;
use crate::services::token::UnverifiedClaims;

/// Ordered `(tag key, claim name)` pairs, fixed at process start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimTagMapping {
    pairs: Vec<(String, String)>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MappingError {
    #[error("mapping is not valid JSON: {0}")]
    Json(String),
    #[error("mapping must be a JSON object")]
    NotAnObject,
    #[error("mapping must contain at least one tag")]
    Empty,
    #[error("claim name for tag '{0}' must be a non-empty string")]
    InvalidClaimName(String),
    #[error("tag key must be non-empty")]
    EmptyTagKey,
}

impl ClaimTagMapping {
    #[cfg(test)]
    pub fn new<K, C>(pairs: impl IntoIterator<Item = (K, C)>) -> Self
    where
        K: Into<String>,
        C: Into<String>,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(k, c)| (k.into(), c.into()))
                .collect(),
        }
    }

    /// Parse `{"TenantId":"custom:tenantId", ...}`.
    pub fn from_json(raw: &str) -> Result<Self, MappingError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| MappingError::Json(e.to_string()))?;
        let Value::Object(object) = value else {
            return Err(MappingError::NotAnObject);
        };
        if object.is_empty() {
            return Err(MappingError::Empty);
        }

        let mut pairs = Vec::with_capacity(object.len());
        for (tag, claim) in object {
            if tag.is_empty() {
                return Err(MappingError::EmptyTagKey);
            }
            match claim {
                Value::String(claim) if !claim.is_empty() => pairs.push((tag, claim)),
                _ => return Err(MappingError::InvalidClaimName(tag)),
            }
        }

        Ok(Self { pairs })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, c)| (k.as_str(), c.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTag {
    pub key: String,
    pub value: String,
}

/// Apply `mapping` to `claims`, in mapping order.
pub fn session_tags(
    mapping: &ClaimTagMapping,
    claims: &UnverifiedClaims,
) -> Result<Vec<SessionTag>, CredentialError> {
    mapping
        .iter()
        .map(|(tag, claim)| -> Result<SessionTag, CredentialError> {
            let value = claims
                .get(claim)
                .and_then(tag_value)
                .ok_or_else(|| CredentialError::MissingClaim {
                    tag: tag.to_string(),
                    claim: claim.to_string(),
                })?;

            Ok(SessionTag {
                key: tag.to_string(),
                value,
            })
        })
        .collect()
}

// Scalars only. An empty string would tag the session with a value no row can match.
fn tag_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims(value: Value) -> UnverifiedClaims {
        match value {
            Value::Object(map) => UnverifiedClaims::from(map),
            _ => unreachable!("test claims must be an object"),
        }
    }

    #[test]
    fn given_mapping_json_when_parsed_then_order_is_preserved() {
        let mapping =
            ClaimTagMapping::from_json(r#"{"TenantId":"custom:tenantId","Zone":"zone","Dept":"custom:dept"}"#)
                .unwrap();

        let keys: Vec<_> = mapping.iter().map(|(k, _)| k).collect();

        assert_eq!(keys, ["TenantId", "Zone", "Dept"]);
    }

    #[test]
    fn given_invalid_mapping_json_when_parsed_then_rejected() {
        assert!(matches!(
            ClaimTagMapping::from_json("not json"),
            Err(MappingError::Json(_))
        ));
        assert_eq!(
            ClaimTagMapping::from_json(r#"["TenantId"]"#),
            Err(MappingError::NotAnObject)
        );
        assert_eq!(ClaimTagMapping::from_json("{}"), Err(MappingError::Empty));
        assert_eq!(
            ClaimTagMapping::from_json(r#"{"TenantId":1}"#),
            Err(MappingError::InvalidClaimName("TenantId".into()))
        );
        assert_eq!(
            ClaimTagMapping::from_json(r#"{"":"custom:tenantId"}"#),
            Err(MappingError::EmptyTagKey)
        );
    }

    #[test]
    fn given_claims_when_tags_built_then_pairs_match_mapping_in_order() {
        let mapping = ClaimTagMapping::new([
            ("TenantId", "custom:tenantId"),
            ("Tier", "custom:tier"),
            ("Admin", "custom:admin"),
        ]);
        let claims = claims(json!({
            "custom:admin": false,
            "custom:tier": 3,
            "custom:tenantId": "acme",
            "sub": "user-1"
        }));

        let tags = session_tags(&mapping, &claims).unwrap();

        assert_eq!(
            tags,
            vec![
                SessionTag { key: "TenantId".into(), value: "acme".into() },
                SessionTag { key: "Tier".into(), value: "3".into() },
                SessionTag { key: "Admin".into(), value: "false".into() },
            ]
        );
    }

    #[test]
    fn given_missing_claim_when_tags_built_then_issuance_is_refused() {
        let mapping = ClaimTagMapping::new([("TenantId", "custom:tenantId")]);

        let err = session_tags(&mapping, &claims(json!({"sub": "user-1"}))).unwrap_err();

        assert!(matches!(
            err,
            CredentialError::MissingClaim { ref tag, ref claim }
                if tag == "TenantId" && claim == "custom:tenantId"
        ));
    }

    #[test]
    fn given_unusable_claim_values_when_tags_built_then_each_is_refused() {
        let mapping = ClaimTagMapping::new([("TenantId", "custom:tenantId")]);

        for value in [json!(null), json!(""), json!(["acme"]), json!({"id": "acme"})] {
            let result = session_tags(&mapping, &claims(json!({"custom:tenantId": value})));

            assert!(
                matches!(result, Err(CredentialError::MissingClaim { .. })),
                "{value}"
            );
        }
    }
}
