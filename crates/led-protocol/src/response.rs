//! Command outcomes and their wire encoding

use bytes::{BufMut, BytesMut};

/// Result of executing one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// OK [payload]
    Success(String),

    /// FAILED
    Failure,
}

impl Outcome {
    pub fn success(payload: impl Into<String>) -> Self {
        Outcome::Success(payload.into())
    }

    /// Encode the outcome to bytes
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::new();
        self.encode_into(&mut buf);
        buf
    }

    /// Encode the outcome into an existing buffer
    pub fn encode_into(&self, buf: &mut BytesMut) {
        match self {
            Outcome::Success(payload) if payload.is_empty() => {
                buf.put_slice(b"OK\n");
            }
            Outcome::Success(payload) => {
                buf.put_slice(b"OK ");
                buf.put_slice(payload.as_bytes());
                buf.put_slice(b"\n");
            }
            Outcome::Failure => {
                buf.put_slice(b"FAILED\n");
            }
        }
    }
}
