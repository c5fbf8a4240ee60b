//! Request body payloads.
//!
//! A `ByteView` is a window over a larger shared buffer. Only the viewed
//! range is ever transmitted; the rest of the backing allocation stays local.

use bytes::Bytes;

use crate::error::ViewError;

/// Payload sent with a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RequestBody {
    /// No body; the request is sent with zero bytes.
    #[default]
    Empty,
    Text(String),
    Bytes(Bytes),
    View(ByteView),
}

impl RequestBody {
    /// Number of bytes that will be transmitted.
    pub fn len(&self) -> usize {
        match self {
            RequestBody::Empty => 0,
            RequestBody::Text(text) => text.len(),
            RequestBody::Bytes(bytes) => bytes.len(),
            RequestBody::View(view) => view.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert into the exact bytes to transmit.
    pub fn into_bytes(self) -> Bytes {
        match self {
            RequestBody::Empty => Bytes::new(),
            RequestBody::Text(text) => Bytes::from(text),
            RequestBody::Bytes(bytes) => bytes,
            RequestBody::View(view) => view.to_bytes(),
        }
    }
}

impl From<&str> for RequestBody {
    fn from(text: &str) -> Self {
        RequestBody::Text(text.to_string())
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        RequestBody::Text(text)
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(bytes: Vec<u8>) -> Self {
        RequestBody::Bytes(Bytes::from(bytes))
    }
}

impl From<Bytes> for RequestBody {
    fn from(bytes: Bytes) -> Self {
        RequestBody::Bytes(bytes)
    }
}

impl From<ByteView> for RequestBody {
    fn from(view: ByteView) -> Self {
        RequestBody::View(view)
    }
}

impl From<&serde_json::Value> for RequestBody {
    fn from(value: &serde_json::Value) -> Self {
        RequestBody::Text(value.to_string())
    }
}

/// A `[offset, offset + len)` window over a shared backing buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteView {
    backing: Bytes,
    offset: usize,
    len: usize,
}

impl ByteView {
    pub fn new(backing: impl Into<Bytes>, offset: usize, len: usize) -> Result<Self, ViewError> {
        let backing = backing.into();
        let available = backing.len();
        match offset.checked_add(len) {
            Some(end) if end <= available => Ok(Self {
                backing,
                offset,
                len,
            }),
            _ => Err(ViewError::OutOfBounds {
                offset,
                len,
                available,
            }),
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The whole backing buffer, including bytes outside the view.
    pub fn backing(&self) -> &Bytes {
        &self.backing
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.backing[self.offset..self.offset + self.len]
    }

    /// The viewed range as a zero-copy `Bytes` handle.
    pub fn to_bytes(&self) -> Bytes {
        self.backing.slice(self.offset..self.offset + self.len)
    }
}
