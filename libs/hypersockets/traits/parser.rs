use crate::error::{HyperSocketError, Result};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::marker::PhantomData;

/// Payload of a data frame received from (or sent to) the socket
#[derive(Debug, Clone, PartialEq)]
pub enum WsMessage {
    Text(String),
    Binary(Vec<u8>),
}

impl WsMessage {
    /// Borrow the frame as UTF-8, accepting binary frames that happen to be valid text
    pub fn as_utf8(&self) -> Option<&str> {
        match self {
            WsMessage::Text(s) => Some(s),
            WsMessage::Binary(b) => std::str::from_utf8(b).ok(),
        }
    }

    /// Lossy text rendering used when a frame has to be surfaced raw
    pub fn to_raw_string(&self) -> String {
        match self {
            WsMessage::Text(s) => s.clone(),
            WsMessage::Binary(b) => String::from_utf8_lossy(b).into_owned(),
        }
    }
}

/// Result of decoding one frame
///
/// A frame that fails structured decoding is not dropped: it is surfaced
/// unmodified as [`Decoded::RawFallback`], so consumers must handle both arms.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded<T> {
    /// Frame parsed into the decoder's output type
    Value(T),
    /// Frame that could not be parsed, as received
    RawFallback(String),
}

impl<T> Decoded<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Decoded::Value(v) => Some(v),
            Decoded::RawFallback(_) => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Decoded::Value(v) => Some(v),
            Decoded::RawFallback(_) => None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Decoded::RawFallback(_))
    }
}

/// Turns raw socket frames into structured messages
///
/// Decoding runs inline on the connection task, so frames of one connection
/// are decoded and published strictly in arrival order. Keep it cheap.
pub trait FrameDecoder: Send + Sync + 'static {
    /// The structured message type
    type Output: Send + Sync + Clone + Debug + 'static;

    /// Decode a single text frame
    ///
    /// Returning `Err` does not stop the connection; the caller publishes the
    /// frame as [`Decoded::RawFallback`] instead.
    fn decode(&self, frame: &str) -> Result<Self::Output>;

    /// Decode any data frame, falling back to the raw payload on failure
    fn decode_frame(&self, frame: &WsMessage) -> Decoded<Self::Output> {
        match frame.as_utf8() {
            Some(text) => match self.decode(text) {
                Ok(value) => Decoded::Value(value),
                Err(_) => Decoded::RawFallback(text.to_string()),
            },
            None => Decoded::RawFallback(frame.to_raw_string()),
        }
    }
}

/// Decodes frames as untyped JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl FrameDecoder for JsonDecoder {
    type Output = serde_json::Value;

    fn decode(&self, frame: &str) -> Result<Self::Output> {
        serde_json::from_str(frame).map_err(|e| HyperSocketError::Decode(e.to_string()))
    }
}

/// Decodes frames as JSON directly into `T`
///
/// A frame that is valid JSON but does not match `T` is treated as a decode
/// failure and surfaces raw.
pub struct TypedJsonDecoder<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedJsonDecoder<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for TypedJsonDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FrameDecoder for TypedJsonDecoder<T>
where
    T: DeserializeOwned + Send + Sync + Clone + Debug + 'static,
{
    type Output = T;

    fn decode(&self, frame: &str) -> Result<Self::Output> {
        serde_json::from_str(frame).map_err(|e| HyperSocketError::Decode(e.to_string()))
    }
}
