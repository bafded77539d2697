//! Codec trait and the JSON implementation.
//!
//! The engine and room never look at bytes. A transport picks a [`Codec`]
//! and uses it to turn inbound frames into [`GameAction`]s and outbound
//! views and results into frames.

use serde::{Serialize, de::DeserializeOwned};

use crate::{GameAction, ProtocolError};

/// Encodes values to bytes and decodes them back.
///
/// `Send + Sync + 'static` so one codec can be shared by every connection
/// task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or don't
    /// match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;

    /// Decodes one inbound action frame.
    ///
    /// Empty or whitespace-only frames are rejected before they reach the
    /// decoder so the error says what actually happened.
    fn decode_action(&self, data: &[u8]) -> Result<GameAction, ProtocolError> {
        if data.iter().all(u8::is_ascii_whitespace) {
            return Err(ProtocolError::InvalidMessage("empty action frame".into()));
        }
        self.decode(data)
    }
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`.
///
/// Behind the `json` feature (enabled by default).
///
/// ## Example
///
/// ```rust
/// use bunker_protocol::{Codec, GameAction, JsonCodec, PlayerId};
///
/// let codec = JsonCodec;
/// let action = GameAction::Vote { target_player_id: PlayerId::new("p2") };
///
/// let bytes = codec.encode(&action).unwrap();
/// let decoded = codec.decode_action(&bytes).unwrap();
/// assert_eq!(action, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;

    #[test]
    fn test_decode_action_from_client_frame() {
        let codec = JsonCodec;
        let action = codec
            .decode_action(br#"{"type":"revealCard","payload":{"cardId":"p1-3"}}"#)
            .unwrap();
        assert_eq!(
            action,
            GameAction::RevealCard {
                card_id: "p1-3".into()
            }
        );
    }

    #[test]
    fn test_empty_frame_is_invalid_message() {
        let err = JsonCodec.decode_action(b"  \n").unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidMessage(_)));
    }

    #[test]
    fn test_malformed_frame_is_decode_error() {
        let err = JsonCodec.decode_action(b"{not json").unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }

    #[test]
    fn test_missing_required_field_is_decode_error() {
        let err = JsonCodec
            .decode_action(br#"{"type":"vote","payload":{}}"#)
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }
}
