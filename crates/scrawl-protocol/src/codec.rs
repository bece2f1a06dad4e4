//! Codec trait and implementations for serializing/deserializing messages.
//!
//! A codec converts between protocol types and raw frame bytes. The rest
//! of the stack only sees the [`Codec`] trait, so the wire format can be
//! swapped without touching transport or engine code. [`JsonCodec`] is the
//! default (and currently only) implementation.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes protocol values to bytes and decodes them back.
///
/// `Send + Sync + 'static` because the codec is shared by every
/// connection task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or do
    /// not match the expected shape.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that speaks JSON via `serde_json`.
///
/// Text frames keep the protocol inspectable from browser DevTools, which
/// matters more here than wire size: game messages are small and
/// infrequent compared to the strokes they carry.
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
    use crate::{ClientCommand, Mode};

    #[test]
    fn test_json_codec_round_trips_commands() {
        let codec = JsonCodec;
        let cmd = ClientCommand::CreateRoom { mode: Mode::Single, cap: 4 };
        let bytes = codec.encode(&cmd).unwrap();
        let back: ClientCommand = codec.decode(&bytes).unwrap();
        assert_eq!(back, cmd);
    }

    #[test]
    fn test_json_codec_rejects_garbage() {
        let codec = JsonCodec;
        let err = codec.decode::<ClientCommand>(b"{not json");
        assert!(matches!(err, Err(ProtocolError::Decode(_))));
    }
}
