//! Value Codec Module
//!
//! Converts cache payloads to and from the single string column of a
//! [`CacheEntry`](crate::cache::CacheEntry). Structured payloads go through
//! serde_json; payloads that carry their own binary layout go through
//! [`Externalizable`] and are wrapped as base64 text.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

// == Codec Error ==
/// Failure while encoding or decoding a payload.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The structured (JSON) encoder or decoder rejected the payload
    #[error("structured payload error: {0}")]
    Structured(#[from] serde_json::Error),

    /// The stored text is not valid base64
    #[error("base64 payload error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The self-describing binary layout is malformed
    #[error("binary payload error: {0}")]
    Binary(String),
}

/// Result type returned by every codec operation.
pub type CodecResult<T> = std::result::Result<T, CodecError>;

// == Payload Format ==
/// Storage path a codec routes payloads through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadFormat {
    /// serde_json text
    Structured,
    /// `Externalizable` bytes wrapped as base64
    SelfDescribing,
}

// == Externalizable ==
/// A payload that writes and reads its own binary layout.
pub trait Externalizable: Sized {
    /// Appends the binary form of `self` to `out`.
    fn write_external(&self, out: &mut Vec<u8>) -> CodecResult<()>;

    /// Reads one value from the front of `input`, advancing the slice.
    fn read_external(input: &mut &[u8]) -> CodecResult<Self>;
}

/// Writes a u32 length prefix followed by the UTF-8 bytes of `value`.
pub fn write_str(out: &mut Vec<u8>, value: &str) {
    out.extend_from_slice(&(value.len() as u32).to_be_bytes());
    out.extend_from_slice(value.as_bytes());
}

/// Reads a string written by [`write_str`].
pub fn read_str(input: &mut &[u8]) -> CodecResult<String> {
    let len = read_u32(input)? as usize;
    if input.len() < len {
        return Err(CodecError::Binary(format!(
            "expected {} string bytes, {} remaining",
            len,
            input.len()
        )));
    }

    let (head, rest) = input.split_at(len);
    let value = std::str::from_utf8(head)
        .map_err(|e| CodecError::Binary(e.to_string()))?
        .to_string();
    *input = rest;
    Ok(value)
}

/// Writes a boolean as a single byte.
pub fn write_bool(out: &mut Vec<u8>, value: bool) {
    out.push(u8::from(value));
}

/// Reads a boolean written by [`write_bool`].
pub fn read_bool(input: &mut &[u8]) -> CodecResult<bool> {
    match input.split_first() {
        Some((&byte, rest)) if byte <= 1 => {
            *input = rest;
            Ok(byte == 1)
        }
        Some((&byte, _)) => Err(CodecError::Binary(format!("invalid bool byte {}", byte))),
        None => Err(CodecError::Binary("unexpected end of input".to_string())),
    }
}

fn read_u32(input: &mut &[u8]) -> CodecResult<u32> {
    if input.len() < 4 {
        return Err(CodecError::Binary("unexpected end of input".to_string()));
    }

    let (head, rest) = input.split_at(4);
    let value = u32::from_be_bytes([head[0], head[1], head[2], head[3]]);
    *input = rest;
    Ok(value)
}

// == Value Codec ==
/// Encoder/decoder pair bound to one payload type.
///
/// The decode target is chosen once, when the codec is built, and stays fixed
/// for the lifetime of the cache instance that owns it.
pub struct ValueCodec<V> {
    format: PayloadFormat,
    target: &'static str,
    encoder: fn(&V) -> CodecResult<String>,
    decoder: fn(&str) -> CodecResult<V>,
}

impl<V: Serialize + DeserializeOwned> ValueCodec<V> {
    /// Codec routing `V` through serde_json.
    ///
    /// Container types such as `Vec<NodeId>` decode through their own serde
    /// implementation, so the element type is preserved.
    pub fn structured() -> Self {
        Self {
            format: PayloadFormat::Structured,
            target: std::any::type_name::<V>(),
            encoder: encode_structured::<V>,
            decoder: decode_structured::<V>,
        }
    }
}

impl<V: Externalizable> ValueCodec<V> {
    /// Codec routing `V` through its own binary layout, stored as base64.
    pub fn self_describing() -> Self {
        Self {
            format: PayloadFormat::SelfDescribing,
            target: std::any::type_name::<V>(),
            encoder: encode_external::<V>,
            decoder: decode_external::<V>,
        }
    }
}

impl<V> ValueCodec<V> {
    // == Encode ==
    /// Converts a payload into its storable text form.
    pub fn encode(&self, value: &V) -> CodecResult<String> {
        (self.encoder)(value)
    }

    // == Decode ==
    /// Rebuilds a payload from its storable text form.
    pub fn decode(&self, stored: &str) -> CodecResult<V> {
        (self.decoder)(stored)
    }

    /// Storage path this codec uses.
    pub fn format(&self) -> PayloadFormat {
        self.format
    }

    /// Name of the bound decode target, for logging.
    pub fn target_type(&self) -> &'static str {
        self.target
    }
}

impl<V> Clone for ValueCodec<V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for ValueCodec<V> {}

impl<V> fmt::Debug for ValueCodec<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueCodec")
            .field("format", &self.format)
            .field("target", &self.target)
            .finish()
    }
}

fn encode_structured<V: Serialize>(value: &V) -> CodecResult<String> {
    Ok(serde_json::to_string(value)?)
}

fn decode_structured<V: DeserializeOwned>(stored: &str) -> CodecResult<V> {
    Ok(serde_json::from_str(stored)?)
}

fn encode_external<V: Externalizable>(value: &V) -> CodecResult<String> {
    let mut out = Vec::new();
    value.write_external(&mut out)?;
    Ok(STANDARD.encode(out))
}

fn decode_external<V: Externalizable>(stored: &str) -> CodecResult<V> {
    let bytes = STANDARD.decode(stored)?;
    let mut input = bytes.as_slice();
    let value = V::read_external(&mut input)?;

    if !input.is_empty() {
        return Err(CodecError::Binary(format!(
            "{} trailing bytes after payload",
            input.len()
        )));
    }

    Ok(value)
}
