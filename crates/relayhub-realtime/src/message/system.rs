//! Welcome and displacement notices.
//!
//! Everything else on the wire is an opaque payload supplied by the
//! control plane and is never parsed.

use bytes::Bytes;
use serde::Serialize;

use relayhub_core::result::AppResult;

/// Sent to a connection that is being replaced by a newer one for the
/// same user, immediately before its outbound queue is closed.
pub const DISPLACED_BY_OTHER_CLIENT: &str = r#"{"type":"disconnect","subtype":"other_client","message":"You have been disconnected by another connection"}"#;

/// Shape of the gateway-originated disconnect notice.
#[derive(Debug, Serialize)]
pub struct DisconnectNotice<'a> {
    #[serde(rename = "type")]
    pub kind: &'a str,
    pub subtype: &'a str,
    pub message: &'a str,
}

/// First frame a freshly admitted client receives.
#[derive(Debug, Serialize)]
struct Welcome<'a> {
    message: &'a str,
    user: &'a str,
}

pub fn displacement_frame() -> Bytes {
    Bytes::from_static(DISPLACED_BY_OTHER_CLIENT.as_bytes())
}

/// `{"message":"Welcome!","user":"<username>"}`, with the username
/// JSON-escaped.
pub fn welcome_frame(username: &str) -> AppResult<Bytes> {
    let body = serde_json::to_vec(&Welcome {
        message: "Welcome!",
        user: username,
    })?;
    Ok(Bytes::from(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displacement_frame_matches_notice_shape() {
        let notice = DisconnectNotice {
            kind: "disconnect",
            subtype: "other_client",
            message: "You have been disconnected by another connection",
        };
        let encoded = serde_json::to_string(&notice).unwrap();
        assert_eq!(encoded, DISPLACED_BY_OTHER_CLIENT);
        assert_eq!(&displacement_frame()[..], encoded.as_bytes());
    }

    #[test]
    fn welcome_frame_keeps_key_order() {
        let frame = welcome_frame("alice").unwrap();
        assert_eq!(&frame[..], br#"{"message":"Welcome!","user":"alice"}"#);
    }

    #[test]
    fn welcome_frame_escapes_username() {
        let frame = welcome_frame("a\"b").unwrap();
        assert_eq!(&frame[..], br#"{"message":"Welcome!","user":"a\"b"}"#);
    }
}
