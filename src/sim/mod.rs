//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by actor ID)
//! - Delayed effects run on the tick clock, never on wall time
//! - No rendering or platform dependencies

pub mod actor;
pub mod gun;
pub mod lifecycle;
pub mod player;
pub mod registry;
pub mod schedule;
pub mod state;
pub mod tick;
pub mod view;

pub use actor::{Actor, ActorId, ActorKind, ActorTag, ActorView};
pub use gun::{GunOutput, GunRay, GunState, NO_HIT_FRACTION, RayHit, magnetic_force};
pub use lifecycle::RocketHit;
pub use player::{MoveIntent, Player};
pub use registry::ActorRegistry;
pub use schedule::{DeferredAction, Scheduler};
pub use state::{GameEvent, GamePhase, GameState, Prompt};
pub use tick::{TickInput, tick};
pub use view::{FrameView, GuidanceArrow, PlayerView};
