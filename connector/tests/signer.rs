//! Signer round-trip property: the emitted query starts with the url-encoded
//! parameters (timestamp last) and ends with the hex HMAC-SHA256 of exactly
//! that prefix under the account secret.

use connector::utils::sign_hmac_sha256;
use proptest::prelude::*;
use serde::Serialize;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitParams {
    symbol: String,
    side: String,
    #[serde(rename = "type")]
    order_type: String,
    quantity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    new_client_order_id: Option<String>,
    timestamp: i64,
}

fn signed_query<P: Serialize>(params: &P, secret: &str) -> String {
    let query = serde_qs::to_string(params).unwrap();
    let signature = sign_hmac_sha256(secret, &query);
    format!("{query}&signature={signature}")
}

proptest! {
    #[test]
    fn query_prefix_and_signature_suffix_agree(
        symbol in "[A-Z]{3,10}",
        buy in any::<bool>(),
        units in 1u64..1_000_000,
        scale in 0u32..8,
        client_order_id in prop::option::of("[A-Za-z0-9-]{1,24}"),
        timestamp in 1_500_000_000_000i64..2_000_000_000_000,
        secret in "[A-Za-z0-9]{8,64}",
    ) {
        let params = SubmitParams {
            symbol,
            side: if buy { "BUY" } else { "SELL" }.to_string(),
            order_type: "LIMIT".to_string(),
            quantity: rust_decimal::Decimal::new(units as i64, scale).to_string(),
            new_client_order_id: client_order_id,
            timestamp,
        };
        let full = signed_query(&params, &secret);

        let encoded = serde_qs::to_string(&params).unwrap();
        prop_assert!(full.starts_with(&encoded));

        // timestamp and signature are the final two fields.
        let (prefix, signature) = full.split_once("&signature=").unwrap();
        prop_assert_eq!(prefix, encoded.as_str());
        let timestamp_field = format!("timestamp={}", timestamp);
        prop_assert!(prefix.contains(&timestamp_field));
        prop_assert!(prefix.ends_with(&timestamp_field));

        prop_assert_eq!(signature.len(), 64);
        prop_assert_eq!(signature, sign_hmac_sha256(&secret, prefix));

        // The quantity rides in fixed-point notation.
        prop_assert!(!params.quantity.contains(['e', 'E']));
    }
}
