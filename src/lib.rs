//! Minimal harness for browser canvas games.
//!
//! Owns the animation loop, canvas sizing and attachment, keyboard event
//! normalization, and delta-time computation. Game logic lives in a caller
//! type implementing [`Game`]; [`run_game`] wires it to the page and starts
//! stepping. The returned [`LoopHandle`] is the only way to halt the loop.

// ==================== Modules ====================
#[macro_use]
mod browser;
mod debounce;
pub mod engine;
mod vec2;

// ==================== Exports ====================
pub use debounce::debounce;
pub use engine::{run_game, Game, GameConfig, GameLoop, LoopHandle, Mount, Renderer};
pub use vec2::Vec2;
