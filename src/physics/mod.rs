//! 2D rigid-body physics
//!
//! Dynamic bodies with boxes and a static body carrying capsule-shaped map
//! walls, simulated by rapier. Adds per-body contact lists with first-contact
//! flags and thick segment queries on top.

pub mod geometry;
pub mod space;

pub use geometry::{Geometry, SegmentHit, segment_query};
pub use space::{Arbiter, Body, BodyHandle, BodyKind, Contact, ShapeHandle, Space};
