//! Binary framing for outbound image transfers.
//!
//! Wire format:
//! ```text
//! [length:4][image:N]
//! ```
//! `length` is an unsigned 32-bit little-endian integer equal to `N`.  The
//! image bytes follow verbatim; there is no checksum and no trailer.  A zero
//! length is a well-formed frame.
//!
//! The device firmware allocates its receive buffer from the prefix before it
//! acknowledges, which is why the prefix travels on its own (see
//! `markers::DEFAULT_ACK_MARKER`) instead of being concatenated with the payload.

use thiserror::Error;

/// Size of the length prefix in bytes.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Errors that can occur while framing an image.
#[derive(Debug, Error, PartialEq)]
pub enum FrameError {
    /// The image is larger than a 32-bit length prefix can describe.
    #[error("image of {len} bytes does not fit a 32-bit length prefix")]
    TooLarge { len: usize },

    /// Fewer than four bytes were supplied to the prefix decoder.
    #[error("insufficient data: need 4 bytes, got {available}")]
    InsufficientData { available: usize },
}

/// Encodes the 4-byte little-endian length prefix for an image of `len` bytes.
///
/// # Errors
///
/// Returns [`FrameError::TooLarge`] if `len` exceeds `u32::MAX`.
///
/// # Examples
///
/// ```rust
/// use deck_core::protocol::frame::encode_length_prefix;
///
/// assert_eq!(encode_length_prefix(0x0102).unwrap(), [0x02, 0x01, 0x00, 0x00]);
/// ```
pub fn encode_length_prefix(len: usize) -> Result<[u8; LENGTH_PREFIX_SIZE], FrameError> {
    let len32 = u32::try_from(len).map_err(|_| FrameError::TooLarge { len })?;
    Ok(len32.to_le_bytes())
}

/// Decodes a length prefix from the first four bytes of `bytes`.
///
/// Trailing bytes are ignored so a caller can hand over a whole frame.
///
/// # Errors
///
/// Returns [`FrameError::InsufficientData`] if fewer than four bytes are given.
pub fn decode_length_prefix(bytes: &[u8]) -> Result<u32, FrameError> {
    let prefix: [u8; LENGTH_PREFIX_SIZE] = bytes
        .get(..LENGTH_PREFIX_SIZE)
        .and_then(|b| b.try_into().ok())
        .ok_or(FrameError::InsufficientData {
            available: bytes.len(),
        })?;
    Ok(u32::from_le_bytes(prefix))
}

/// Encodes a complete frame (prefix followed by the image) into one buffer.
///
/// The transfer protocol writes the two halves separately; this helper exists
/// for diagnostics and for tests that inspect the full wire image.
///
/// # Errors
///
/// Returns [`FrameError::TooLarge`] if the image exceeds `u32::MAX` bytes.
pub fn encode_frame(image: &[u8]) -> Result<Vec<u8>, FrameError> {
    let prefix = encode_length_prefix(image.len())?;
    let mut buf = Vec::with_capacity(LENGTH_PREFIX_SIZE + image.len());
    buf.extend_from_slice(&prefix);
    buf.extend_from_slice(image);
    Ok(buf)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
