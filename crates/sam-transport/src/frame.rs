//! Frame codec.
//!
//! Wire format: `<decimal return code><payload>`. An empty payload means no
//! payload, a payload starting with `[` or `{` is JSON, anything else is raw
//! text carried as [`Value::String`].

use serde_json::Value;

use crate::errors::ProtocolError;

/// Engine ping; also carries the `probe` on connection open.
pub const CODE_PING: u32 = 2;
/// Engine pong; answers the probe and acknowledges the handshake.
pub const CODE_HANDSHAKE_ACK: u32 = 3;
/// Engine upgrade.
pub const CODE_UPGRADE: u32 = 5;
/// Server is closing the connection.
pub const CODE_CLOSING: u32 = 41;
/// Application event.
pub const CODE_EVENT: u32 = 42;

/// One protocol message.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    /// Return code selecting the meaning of the frame.
    pub code: u32,
    /// Raw text as [`Value::String`], or parsed JSON.
    pub payload: Option<Value>,
}

impl Frame {
    /// Frame without payload.
    pub fn bare(code: u32) -> Self {
        Self {
            code,
            payload: None,
        }
    }

    /// Frame with a payload.
    pub fn new(code: u32, payload: impl Into<Value>) -> Self {
        Self {
            code,
            payload: Some(payload.into()),
        }
    }

    /// Serialize for the wire.
    ///
    /// Strings are written verbatim; everything else as compact JSON. Empty
    /// strings are written as no payload.
    pub fn encode(&self) -> String {
        let mut out = self.code.to_string();
        match &self.payload {
            None => {}
            Some(Value::String(raw)) => out.push_str(raw),
            Some(value) => out.push_str(&value.to_string()),
        }
        out
    }

    /// Parse a frame received from the wire.
    pub fn decode(raw: &str) -> Result<Self, ProtocolError> {
        let split = raw
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(raw.len());
        if split == 0 {
            return Err(ProtocolError::MissingReturnCode(raw.to_string()));
        }

        let (digits, rest) = raw.split_at(split);
        let code = digits
            .parse::<u32>()
            .map_err(|_| ProtocolError::InvalidReturnCode(digits.to_string()))?;

        let payload = match rest.as_bytes().first() {
            None => None,
            Some(b'[' | b'{') => Some(serde_json::from_str(rest)?),
            Some(_) => Some(Value::String(rest.to_string())),
        };

        Ok(Self { code, payload })
    }

    /// Payload as a JSON array, if it is one.
    pub fn array(&self) -> Option<&Vec<Value>> {
        self.payload.as_ref().and_then(Value::as_array)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
