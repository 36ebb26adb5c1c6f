//! Network Layer
//!
//! WebSocket server for real-time quiz and duel clients.
//! All game rules run through `engine/`; this layer only routes.

pub mod cooldown;
pub mod protocol;
pub mod registry;
pub mod server;

pub use cooldown::Cooldown;
pub use protocol::{ClientMessage, ErrorCode, IdentifyRequest, ServerError, ServerMessage};
pub use registry::{ClientRegistry, ResultPost};
pub use server::{GameServer, GameServerError};
