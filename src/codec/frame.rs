//! WebSocket frame encoding and decoding.
//!
//! Pure functions over byte slices, no I/O. Frame layout (RFC 6455 §5.2):
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
//! |I|S|S|S|  (4)  |A|     (7)     |             (16/64)           |
//! |N|V|V|V|       |S|             |   (if payload len==126/127)   |
//! | |1|2|3|       |K|             |                               |
//! +-+-+-+-+-------+-+-------------+ - - - - - - - - - - - - - - - +
//! |     Extended payload length continued, if payload len == 127  |
//! + - - - - - - - - - - - - - - - +-------------------------------+
//! |                               |Masking-key, if MASK set to 1  |
//! +-------------------------------+-------------------------------+
//! | Masking-key (continued)       |          Payload Data         |
//! +-------------------------------- - - - - - - - - - - - - - - - +
//! ```
//!
//! Outgoing frames are always final (FIN set); fragmentation is never
//! produced. On decode the FIN bit is reported but not acted upon.

// ============================================================================
// Imports
// ============================================================================

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Largest possible header: 2 bytes + 8 byte length + 4 byte mask key.
pub const MAX_HEADER_LEN: usize = 14;

/// Largest payload expressible in the 7-bit length field.
const LEN_7BIT_MAX: usize = 125;

/// Length-class marker for a 16-bit extended length.
const LEN_CLASS_16: u8 = 126;

/// Length-class marker for a 64-bit extended length.
const LEN_CLASS_64: u8 = 127;

const FIN_BIT: u8 = 0x80;
const MASK_BIT: u8 = 0x80;

// ============================================================================
// Opcode
// ============================================================================

/// 4-bit frame type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Continuation of a fragmented message (0x0).
    Continuation,
    /// UTF-8 text payload (0x1).
    Text,
    /// Binary payload (0x2).
    Binary,
    /// Connection close (0x8).
    Close,
    /// Ping (0x9).
    Ping,
    /// Pong (0xA).
    Pong,
    /// Any opcode RFC 6455 reserves.
    Reserved(u8),
}

impl Opcode {
    /// Maps the low 4 bits of `bits` to an opcode.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x0F {
            0x0 => Self::Continuation,
            0x1 => Self::Text,
            0x2 => Self::Binary,
            0x8 => Self::Close,
            0x9 => Self::Ping,
            0xA => Self::Pong,
            other => Self::Reserved(other),
        }
    }

    /// Returns the wire value.
    #[must_use]
    pub const fn bits(self) -> u8 {
        match self {
            Self::Continuation => 0x0,
            Self::Text => 0x1,
            Self::Binary => 0x2,
            Self::Close => 0x8,
            Self::Ping => 0x9,
            Self::Pong => 0xA,
            Self::Reserved(bits) => bits & 0x0F,
        }
    }

    /// Returns `true` for close, ping and pong.
    #[inline]
    #[must_use]
    pub const fn is_control(self) -> bool {
        self.bits() & 0x08 != 0
    }
}

// ============================================================================
// FrameHeader
// ============================================================================

/// Decoded header of one inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Final fragment flag.
    pub fin: bool,
    /// RSV1..RSV3, not validated.
    pub rsv: u8,
    /// Frame type.
    pub opcode: Opcode,
    /// Payload length as declared on the wire.
    pub payload_len: u64,
    /// Mask key for masked frames.
    pub mask_key: Option<[u8; 4]>,
    /// Byte offset where the payload begins.
    pub payload_offset: usize,
}

impl FrameHeader {
    /// Parses a frame header from the front of `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IncompleteFrame`] if `buf` ends before the header
    /// (including extended length and mask key) is complete.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < 2 {
            return Err(Error::incomplete_frame(2, buf.len()));
        }

        let fin = buf[0] & FIN_BIT != 0;
        let rsv = (buf[0] >> 4) & 0x07;
        let opcode = Opcode::from_bits(buf[0]);
        let masked = buf[1] & MASK_BIT != 0;
        let len_class = buf[1] & 0x7F;

        let (payload_len, mut offset) = match len_class {
            LEN_CLASS_16 => {
                if buf.len() < 4 {
                    return Err(Error::incomplete_frame(4, buf.len()));
                }
                (u64::from(u16::from_be_bytes([buf[2], buf[3]])), 4)
            }
            LEN_CLASS_64 => {
                if buf.len() < 10 {
                    return Err(Error::incomplete_frame(10, buf.len()));
                }
                let mut be = [0u8; 8];
                be.copy_from_slice(&buf[2..10]);
                (u64::from_be_bytes(be), 10)
            }
            literal => (u64::from(literal), 2),
        };

        let mask_key = if masked {
            if buf.len() < offset + 4 {
                return Err(Error::incomplete_frame(offset + 4, buf.len()));
            }
            let key = [buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]];
            offset += 4;
            Some(key)
        } else {
            None
        };

        Ok(Self {
            fin,
            rsv,
            opcode,
            payload_len,
            mask_key,
            payload_offset: offset,
        })
    }

    /// Total frame size (header plus payload).
    ///
    /// `None` if the declared length does not fit in a `u64` once the
    /// header is added.
    #[inline]
    #[must_use]
    pub fn frame_len(&self) -> Option<u64> {
        self.payload_len.checked_add(self.payload_offset as u64)
    }

    /// Returns the payload slice of a fully buffered frame.
    ///
    /// `buf` must start at this frame's first byte and hold the whole frame;
    /// otherwise the slice is empty.
    #[inline]
    #[must_use]
    pub fn payload<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        usize::try_from(self.payload_len)
            .ok()
            .and_then(|len| self.payload_offset.checked_add(len))
            .and_then(|end| buf.get(self.payload_offset..end))
            .unwrap_or_default()
    }
}

// ============================================================================
// Masking
// ============================================================================

/// XORs every byte with `key[i % 4]`. Applying it twice restores the input.
#[inline]
pub fn apply_mask(data: &mut [u8], key: [u8; 4]) {
    for (i, byte) in data.iter_mut().enumerate() {
        *byte ^= key[i % 4];
    }
}

// ============================================================================
// Encoding
// ============================================================================

/// Header size for a payload of `payload_len` bytes.
#[must_use]
pub const fn header_len(payload_len: usize, masked: bool) -> usize {
    let base = if payload_len <= LEN_7BIT_MAX {
        2
    } else if payload_len <= u16::MAX as usize {
        4
    } else {
        10
    };
    if masked { base + 4 } else { base }
}

/// Encodes one final frame into `dst`, generating a random mask key when
/// `masked` is set.
///
/// Returns the number of bytes written.
///
/// # Errors
///
/// Returns [`Error::BufferOverflow`] if the frame does not fit `dst`; in
/// that case `dst` is left untouched.
pub fn encode_frame(opcode: Opcode, payload: &[u8], masked: bool, dst: &mut [u8]) -> Result<usize> {
    let mask_key = masked.then(rand::random::<[u8; 4]>);
    encode_frame_with_key(opcode, payload, mask_key, dst)
}

/// Encodes one final frame into `dst` using the given mask key.
///
/// # Errors
///
/// Returns [`Error::BufferOverflow`] if the frame does not fit `dst`.
pub fn encode_frame_with_key(
    opcode: Opcode,
    payload: &[u8],
    mask_key: Option<[u8; 4]>,
    dst: &mut [u8],
) -> Result<usize> {
    let len = payload.len();
    let header = header_len(len, mask_key.is_some());
    let total = header + len;
    if total > dst.len() {
        return Err(Error::buffer_overflow(total, dst.len()));
    }

    dst[0] = FIN_BIT | opcode.bits();
    let mask_flag = if mask_key.is_some() { MASK_BIT } else { 0 };

    let mut offset = if len <= LEN_7BIT_MAX {
        dst[1] = mask_flag | len as u8;
        2
    } else if len <= u16::MAX as usize {
        dst[1] = mask_flag | LEN_CLASS_16;
        dst[2..4].copy_from_slice(&(len as u16).to_be_bytes());
        4
    } else {
        dst[1] = mask_flag | LEN_CLASS_64;
        dst[2..10].copy_from_slice(&(len as u64).to_be_bytes());
        10
    };

    if let Some(key) = mask_key {
        dst[offset..offset + 4].copy_from_slice(&key);
        offset += 4;
    }

    let body = &mut dst[offset..offset + len];
    body.copy_from_slice(payload);
    if let Some(key) = mask_key {
        apply_mask(body, key);
    }

    Ok(total)
}

// ============================================================================
// Decoding
// ============================================================================

/// Decodes the frame at the front of `buf`, unmasking its payload in place.
///
/// # Errors
///
/// - [`Error::IncompleteFrame`] if the header or payload is not fully buffered
/// - [`Error::PayloadTooLarge`] if the declared length cannot be addressed
pub fn decode_frame(buf: &mut [u8]) -> Result<FrameHeader> {
    let header = FrameHeader::parse(buf)?;

    let frame_len = header
        .frame_len()
        .and_then(|len| usize::try_from(len).ok())
        .ok_or_else(|| Error::payload_too_large(header.payload_len, buf.len()))?;
    if buf.len() < frame_len {
        return Err(Error::incomplete_frame(frame_len, buf.len()));
    }

    if let Some(key) = header.mask_key {
        apply_mask(&mut buf[header.payload_offset..frame_len], key);
    }

    Ok(header)
}

// ============================================================================
// Tests
// ============================================================================
