// ── Pairing token codec ──
//
// API-supplied tokens are base64 of `region-secret-token`. The radio stack
// wants the three parts glued as `region + token + secret`; the status
// endpoint wants the bare token.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};

/// A decoded API-supplied pairing token.
#[derive(Clone, PartialEq, Eq)]
pub struct PairingToken {
    region: String,
    secret: String,
    token: String,
}

impl PairingToken {
    /// Decode a base64 `region-secret-token` triple.
    ///
    /// Returns `None` for invalid base64, non-UTF-8 content, or anything
    /// other than exactly three non-empty hyphen-separated parts.
    pub fn decode(encoded: &str) -> Option<Self> {
        let encoded = encoded.trim();
        let bytes = STANDARD
            .decode(encoded)
            .or_else(|_| STANDARD_NO_PAD.decode(encoded))
            .ok()?;
        let text = String::from_utf8(bytes).ok()?;

        let mut parts = text.split('-').filter(|p| !p.is_empty());
        let (Some(region), Some(secret), Some(token), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return None;
        };

        Some(Self {
            region: region.to_owned(),
            secret: secret.to_owned(),
            token: token.to_owned(),
        })
    }

    /// Form handed to the radio stack.
    pub fn radio_form(&self) -> String {
        format!("{}{}{}", self.region, self.token, self.secret)
    }

    /// Form used to poll the status endpoint.
    pub fn polling_form(&self) -> &str {
        &self.token
    }

    pub fn region(&self) -> &str {
        &self.region
    }
}

impl fmt::Debug for PairingToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PairingToken")
            .field("region", &self.region)
            .field("secret", &"[REDACTED]")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Radio form of an encoded token, or empty when it does not decode.
pub fn decode_radio_token(encoded: &str) -> String {
    PairingToken::decode(encoded)
        .map(|t| t.radio_form())
        .unwrap_or_default()
}

/// Polling form of an encoded token, or empty when it does not decode.
pub fn decode_polling_token(encoded: &str) -> String {
    PairingToken::decode(encoded)
        .map(|t| t.polling_form().to_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(raw: &str) -> String {
        STANDARD.encode(raw)
    }

    #[test]
    fn decodes_triple() {
        let encoded = encode("kr-s1-t1");
        assert_eq!(decode_radio_token(&encoded), "krt1s1");
        assert_eq!(decode_polling_token(&encoded), "t1");
        assert_eq!(PairingToken::decode(&encoded).map(|t| t.region().to_owned()), Some("kr".into()));
    }

    #[test]
    fn rejects_wrong_part_count() {
        assert_eq!(decode_radio_token(&encode("kr-s1")), "");
        assert_eq!(decode_polling_token(&encode("kr-s1-t1-x")), "");
    }

    #[test]
    fn empty_parts_are_skipped() {
        assert_eq!(decode_polling_token(&encode("kr--s1-t1")), "t1");
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(decode_radio_token("not base64!!"), "");
        assert_eq!(decode_polling_token(""), "");
    }

    #[test]
    fn accepts_unpadded_input() {
        let padded = encode("eu-secret-tok");
        let unpadded = padded.trim_end_matches('=');
        assert_eq!(decode_polling_token(unpadded), "tok");
    }

    #[test]
    fn debug_hides_secret_parts() {
        let token = PairingToken::decode(&encode("kr-s1-t1")).expect("decodes");
        let rendered = format!("{token:?}");
        assert!(!rendered.contains("s1"));
        assert!(rendered.contains("kr"));
    }
}
