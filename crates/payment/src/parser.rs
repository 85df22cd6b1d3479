// Decoding of scanned payment payloads

use blockchain::strkey::{is_base32_char, looks_like_account_id, STRKEY_LEN};
use rust_decimal::Decimal;
use shared::{PaymentRequest, NATIVE_ASSET_CODE, NATIVE_ISSUER};
use std::borrow::Cow;
use std::str::FromStr;
use tracing::debug;

/// URI scheme for ledger payment requests
pub const URI_SCHEME: &str = "web+stellar:";

/// Separates the side-channel public key from the URI in a scan payload
pub const SIDE_CHANNEL_DELIMITER: char = '|';

/// Parser for scanned payment payloads.
///
/// Accepted formats, tried in order:
/// 1. `web+stellar:<address>?<query>` or `web+stellar:pay?destination=<address>&<query>`
/// 2. a bare 56-character account ID
/// 3. any text containing an account ID
///
/// A `publicKey|uri` payload has its side channel split off first.
pub struct PaymentRequestParser;

impl PaymentRequestParser {
    pub fn parse(raw_payload: &str) -> Option<PaymentRequest> {
        let raw = raw_payload.trim();
        if raw.is_empty() {
            return None;
        }

        let (body, side_channel) = split_side_channel(raw);

        let mut request = parse_uri(body)
            .or_else(|| parse_bare_address(body))
            .or_else(|| find_embedded_address(body))?;

        request.scanned_key = side_channel
            .filter(|key| looks_like_account_id(key))
            .map(str::to_string);

        debug!(
            "Parsed payment request to {} ({} {})",
            request.recipient_address, request.amount, request.asset_code
        );
        Some(request)
    }
}

/// Returns the payload part to parse and the side channel, if any
fn split_side_channel(raw: &str) -> (&str, Option<&str>) {
    match raw.split_once(SIDE_CHANNEL_DELIMITER) {
        None => (raw, None),
        Some((head, tail)) => {
            let (head, tail) = (head.trim(), tail.trim());
            if tail.is_empty() || has_scheme(head) {
                (head, Some(tail).filter(|t| !t.is_empty()))
            } else {
                (tail, Some(head).filter(|h| !h.is_empty()))
            }
        }
    }
}

fn has_scheme(text: &str) -> bool {
    text.len() >= URI_SCHEME.len()
        && text.as_bytes()[..URI_SCHEME.len()].eq_ignore_ascii_case(URI_SCHEME.as_bytes())
}

fn decode(component: &str) -> Cow<'_, str> {
    urlencoding::decode(component).unwrap_or(Cow::Borrowed(component))
}

fn parse_uri(body: &str) -> Option<PaymentRequest> {
    if !has_scheme(body) {
        return None;
    }

    let rest = &body[URI_SCHEME.len()..];
    let (path, query) = rest.split_once('?').unwrap_or((rest, ""));
    let path = decode(path.trim_start_matches('/'));

    let mut destination = if path.eq_ignore_ascii_case("pay") {
        None
    } else {
        Some(path.into_owned())
    };
    let mut request = PaymentRequest::to_address(String::new());
    let mut memo = None;
    let mut msg = None;

    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let value = decode(value).into_owned();

        match decode(key).as_ref() {
            "destination" => destination = Some(value),
            "amount" => match Decimal::from_str(value.trim()) {
                Ok(amount) => request.amount = amount,
                Err(e) => debug!("Ignoring unparseable amount {:?}: {}", value, e),
            },
            "memo" => memo = Some(value),
            "msg" => msg = Some(value),
            "asset_code" if !value.is_empty() => request.asset_code = value,
            "asset_issuer" if !value.is_empty() => request.issuer_public_key = value,
            "network" if !value.is_empty() => request.network_passphrase = Some(value),
            other => debug!("Ignoring payment URI parameter {:?}", other),
        }
    }

    request.recipient_address = destination.filter(|d| !d.is_empty())?;
    request.memo = memo.or(msg).unwrap_or_default();

    if request.asset_code.eq_ignore_ascii_case(NATIVE_ASSET_CODE)
        && request.issuer_public_key == NATIVE_ISSUER
    {
        request.asset_code = NATIVE_ASSET_CODE.to_string();
    }

    Some(request)
}

fn parse_bare_address(body: &str) -> Option<PaymentRequest> {
    looks_like_account_id(body).then(|| PaymentRequest::to_address(body))
}

/// First `G` followed by 55 base32 characters anywhere in the text
fn find_embedded_address(text: &str) -> Option<PaymentRequest> {
    let bytes = text.as_bytes();
    if bytes.len() < STRKEY_LEN {
        return None;
    }

    (0..=bytes.len() - STRKEY_LEN)
        .find(|&start| {
            bytes[start] == b'G'
                && bytes[start + 1..start + STRKEY_LEN]
                    .iter()
                    .all(|&b| is_base32_char(b))
        })
        .map(|start| PaymentRequest::to_address(&text[start..start + STRKEY_LEN]))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: &str = "GAAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQDZ7H";
    const SENDER: &str = "GA5WUJ54Z23KILLCUOUNAKTPBVZWKMQVO4O6EQ5GHLAERIMLLHNCSKYH";

    #[test]
    fn test_pay_uri_with_destination() {
        let request =
            PaymentRequestParser::parse("web+stellar:pay?destination=GABC...&amount=50&asset_code=XLM")
                .unwrap();

        assert_eq!(request.recipient_address, "GABC...");
        assert_eq!(request.amount, Decimal::from(50));
        assert_eq!(request.asset_code, "XLM");
        assert!(request.is_native());
    }

    #[test]
    fn test_address_path_uri() {
        let uri = format!(
            "web+stellar:{}?amount=1.25&memo=lunch%20split&asset_code=USDC&asset_issuer={}",
            ADDR, SENDER
        );
        let request = PaymentRequestParser::parse(&uri).unwrap();

        assert_eq!(request.recipient_address, ADDR);
        assert_eq!(request.amount, Decimal::new(125, 2));
        assert_eq!(request.memo, "lunch split");
        assert_eq!(request.asset_code, "USDC");
        assert_eq!(request.issuer_public_key, SENDER);
        assert!(!request.is_native());
    }

    #[test]
    fn test_msg_used_when_memo_absent() {
        let uri = format!("web+stellar:pay?destination={}&msg=Thanks%21", ADDR);
        let request = PaymentRequestParser::parse(&uri).unwrap();
        assert_eq!(request.memo, "Thanks!");

        let uri = format!("web+stellar:pay?destination={}&msg=a&memo=b", ADDR);
        assert_eq!(PaymentRequestParser::parse(&uri).unwrap().memo, "b");
    }

    #[test]
    fn test_network_passphrase_decoded() {
        let uri = format!(
            "web+stellar:pay?destination={}&network=Test%20SDF%20Network%20%3B%20September%202015",
            ADDR
        );
        let request = PaymentRequestParser::parse(&uri).unwrap();
        assert_eq!(
            request.network_passphrase.as_deref(),
            Some("Test SDF Network ; September 2015")
        );
    }

    #[test]
    fn test_scheme_is_case_insensitive() {
        let uri = format!("WEB+STELLAR:pay?destination={}", ADDR);
        assert_eq!(PaymentRequestParser::parse(&uri).unwrap().recipient_address, ADDR);
    }

    #[test]
    fn test_pay_uri_without_destination_falls_back() {
        assert!(PaymentRequestParser::parse("web+stellar:pay?amount=5").is_none());
    }

    #[test]
    fn test_bad_amount_is_ignored() {
        let uri = format!("web+stellar:pay?destination={}&amount=ten", ADDR);
        assert_eq!(PaymentRequestParser::parse(&uri).unwrap().amount, Decimal::ZERO);
    }

    #[test]
    fn test_bare_address() {
        let request = PaymentRequestParser::parse(&format!("  {}\n", ADDR)).unwrap();

        assert_eq!(request.recipient_address, ADDR);
        assert_eq!(request.amount, Decimal::ZERO);
        assert_eq!(request.asset_code, "XLM");
        assert!(request.memo.is_empty());
    }

    #[test]
    fn test_embedded_address() {
        let text = format!("Pay me at {} before Friday", ADDR);
        let request = PaymentRequestParser::parse(&text).unwrap();
        assert_eq!(request.recipient_address, ADDR);
    }

    #[test]
    fn test_side_channel_split() {
        let payload = format!("{}|web+stellar:pay?destination={}&amount=3", SENDER, ADDR);
        let request = PaymentRequestParser::parse(&payload).unwrap();

        assert_eq!(request.recipient_address, ADDR);
        assert_eq!(request.amount, Decimal::from(3));
        assert_eq!(request.scanned_key.as_deref(), Some(SENDER));
    }

    #[test]
    fn test_side_channel_after_uri() {
        let payload = format!("web+stellar:pay?destination={}|extra", ADDR);
        let request = PaymentRequestParser::parse(&payload).unwrap();

        assert_eq!(request.recipient_address, ADDR);
        assert!(request.scanned_key.is_none());
    }

    #[test]
    fn test_unrecognized_payloads() {
        assert!(PaymentRequestParser::parse("").is_none());
        assert!(PaymentRequestParser::parse("   ").is_none());
        assert!(PaymentRequestParser::parse("hello world").is_none());
        assert!(PaymentRequestParser::parse("GABC").is_none());
        // Lowercase is not base32 in the StrKey alphabet
        assert!(PaymentRequestParser::parse(&ADDR.to_lowercase()).is_none());
    }
}
