//! WebSocket frame codec.
//!
//! Stateless serialisation of outgoing frames and parsing of inbound
//! frame headers. The connection layer owns all buffers; this module only
//! reads and writes the slices it is handed.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `frame` | Opcodes, header parsing, masking, encode/decode |

// ============================================================================
// Submodules
// ============================================================================

/// Frame layout, masking and encode/decode.
pub mod frame;

// ============================================================================
// Re-exports
// ============================================================================

pub use frame::{
    FrameHeader, MAX_HEADER_LEN, Opcode, apply_mask, decode_frame, encode_frame,
    encode_frame_with_key, header_len,
};
