//! Sinric Pro protocol session.
//!
//! Sits between the connection and the host application: clock sync,
//! action dispatch and signed replies and events.
//!
//! # Message intake
//!
//! 1. `{"timestamp": n}` - Re-anchor the server clock, no reply
//! 2. Otherwise read `deviceId`, `clientId`, `replyToken`, `createdAt`, `action`
//! 3. Look the action up in the action table, drop unknown actions
//! 4. Read the action's value field, drop the request if it is missing
//! 5. Call the handler, then sign and return a success response
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `clock` | Server time estimate |
//! | `core` | `Session` and `ActionRequest` |
//! | `identity` | Upgrade request headers |

// ============================================================================
// Submodules
// ============================================================================

/// Server clock estimate.
pub mod clock;

/// Session implementation.
pub mod core;

/// Device identity headers.
pub mod identity;

// ============================================================================
// Re-exports
// ============================================================================

pub use clock::ServerClock;
pub use core::{ActionHandler, ActionRequest, Session};
pub use identity::{DEFAULT_PLATFORM, DeviceIdentity};
