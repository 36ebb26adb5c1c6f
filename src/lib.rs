//! # Glyph Duel Server
//!
//! Quiz and duel engine for a glyph alphabet: solo rounds, timed
//! head-to-head duels, persistent stats and ranked leaderboards.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    GLYPH DUEL SERVER                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/             - Deterministic primitives                │
//! │  ├── glyph.rs      - Letter <-> glyph translation            │
//! │  └── rng.rs        - Seeded Xorshift128+ PRNG                │
//! │                                                              │
//! │  game/             - Rules (pure)                            │
//! │  ├── rank.rs       - Points to rank tier                     │
//! │  ├── scoring.rs    - Round awards and penalties              │
//! │  ├── words.rs      - Vocabulary and round draws              │
//! │  ├── session.rs    - One user's live round                   │
//! │  └── events.rs     - Outbound events                         │
//! │                                                              │
//! │  engine/           - Shared state and timers                 │
//! │  ├── orchestrator.rs - Solo, challenge and duel flows        │
//! │  ├── store.rs      - Live sessions                           │
//! │  ├── challenge.rs  - Pending challenges                      │
//! │  ├── stats.rs      - Stats gateway and leaderboard           │
//! │  └── notify.rs     - Event delivery seam                     │
//! │                                                              │
//! │  network/          - Networking (non-deterministic)          │
//! │  ├── server.rs     - WebSocket server                        │
//! │  ├── protocol.rs   - Message types                           │
//! │  ├── registry.rs   - Connected users and results feed        │
//! │  └── cooldown.rs   - Per-user request spacing                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism
//!
//! `core/` and `game/` read no clocks and hold no shared state. With a
//! fixed seed the engine draws the same rounds in the same order.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod engine;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use config::ServerConfig;
pub use core::glyph::Direction;
pub use core::rng::DeterministicRng;
pub use engine::{DuelEngine, EngineConfig, EngineError};
pub use game::{GameEvent, Identity, UserId};
pub use network::GameServer;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
