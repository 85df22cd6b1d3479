// Property tests for scanned payload handling

use payment::{scan_payload, PaymentLimits, PaymentRequestParser, PaymentUri};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::Network;

const DESTINATION: &str = "GAAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQDZ7H";
const OWNER: &str = "GA5WUJ54Z23KILLCUOUNAKTPBVZWKMQVO4O6EQ5GHLAERIMLLHNCSKYH";

fn limits() -> PaymentLimits {
    PaymentLimits {
        max_amount: Decimal::from(10_000),
        network: Network::Testnet,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Any generated URI parses back to the same destination, amount and memo
    #[test]
    fn prop_generated_uri_parses_back(
        units in 1u64..=9_999,
        fraction in 0u32..10_000_000,
        memo in prop_oneof!["[ -~]{0,28}", "[ -~éü€漢字😀]{0,7}"],
        with_side_channel in any::<bool>(),
    ) {
        let amount = Decimal::from(units) + Decimal::new(fraction as i64, 7);
        let uri = PaymentUri::new(DESTINATION).amount(amount).msg(memo.clone());
        let payload = if with_side_channel {
            scan_payload(OWNER, &uri)
        } else {
            uri.to_string()
        };

        let request = PaymentRequestParser::parse(&payload).unwrap();

        prop_assert_eq!(request.recipient_address.as_str(), DESTINATION);
        prop_assert_eq!(request.amount, amount);
        prop_assert_eq!(request.memo.as_str(), memo.as_str());
        prop_assert_eq!(request.scanned_key.is_some(), with_side_channel);
        prop_assert!(limits().validate(&request).is_ok());
    }

    /// Multi-byte memos survive percent encoding byte for byte
    #[test]
    fn prop_non_ascii_memo_round_trips(memo in "[éü€漢字😀]{1,7}") {
        let uri = PaymentUri::new(DESTINATION).amount(Decimal::ONE).msg(memo.clone());
        let text = uri.to_string();
        prop_assert!(text.is_ascii());

        let request = PaymentRequestParser::parse(&text).unwrap();
        prop_assert_eq!(request.memo.as_bytes(), memo.as_bytes());
    }

    /// More than seven significant fractional digits never pass validation
    #[test]
    fn prop_excess_precision_rejected(
        units in 0u64..1_000,
        fraction in 1u64..=9,
        extra in 1usize..=6,
    ) {
        let input = format!("{}.0000000{}{}", units, "0".repeat(extra - 1), fraction);
        prop_assert!(limits().parse_amount(&input).is_err());
    }

    /// Arbitrary text never panics the parser
    #[test]
    fn prop_parser_total(raw in ".{0,200}") {
        let _ = PaymentRequestParser::parse(&raw);
    }
}
