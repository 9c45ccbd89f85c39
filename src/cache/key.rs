//! Cache Key Module
//!
//! Builds cache keys of the form `endpoint:<json params>`.
//!
//! The params are serialized as-is, so two maps with the same contents but a
//! different iteration order can yield different keys. Callers whose params
//! come from an unordered map should use a `BTreeMap` or a struct.

use serde::Serialize;

use crate::error::KeyError;

/// Builds the cache key for `endpoint` called with `params`.
pub fn generate_key<P>(endpoint: &str, params: &P) -> Result<String, KeyError>
where
    P: Serialize + ?Sized,
{
    let params = serde_json::to_string(params).map_err(|source| KeyError::Serialize {
        endpoint: endpoint.to_string(),
        source,
    })?;
    Ok(format!("{endpoint}:{params}"))
}

/// Key for an endpoint called without parameters (`endpoint:{}`).
pub fn generate_key_default(endpoint: &str) -> String {
    format!("{endpoint}:{{}}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, HashMap};

    #[derive(Serialize)]
    struct RiskParams<'a> {
        customer_code: &'a str,
        months: u32,
    }

    #[test]
    fn test_key_from_struct_params() {
        let key = generate_key(
            "risk",
            &RiskParams {
                customer_code: "0000012345",
                months: 12,
            },
        )
        .unwrap();
        assert_eq!(key, r#"risk:{"customer_code":"0000012345","months":12}"#);
    }

    #[test]
    fn test_key_is_deterministic() {
        let params = serde_json::json!({ "status": "open", "page": 1 });
        assert_eq!(
            generate_key("orders", &params).unwrap(),
            generate_key("orders", &params).unwrap()
        );
    }

    #[test]
    fn test_key_from_scalar_params() {
        assert_eq!(generate_key("customer", "42").unwrap(), r#"customer:"42""#);
        assert_eq!(generate_key("customer", &42).unwrap(), "customer:42");
    }

    #[test]
    fn test_default_key_matches_empty_map() {
        let empty: BTreeMap<String, String> = BTreeMap::new();
        assert_eq!(generate_key_default("auth:session"), "auth:session:{}");
        assert_eq!(
            generate_key("auth:session", &empty).unwrap(),
            generate_key_default("auth:session")
        );
    }

    #[test]
    fn test_key_rejects_unserializable_params() {
        let mut params: HashMap<(u8, u8), u8> = HashMap::new();
        params.insert((1, 2), 3);

        let err = generate_key("lookup", &params).unwrap_err();
        assert!(matches!(err, KeyError::Serialize { ref endpoint, .. } if endpoint == "lookup"));
    }
}
