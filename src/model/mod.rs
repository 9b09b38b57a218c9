//! Typed scene model
//!
//! Entities carry a process-unique [`EntityId`] and are distinguished by the
//! closed [`Entity`] sum type. Animation curves are the only entity kind so
//! far.

pub mod animation;
pub mod arrays;
pub mod entity;

pub use animation::{AnimationCurve, CurveDefect, InterpolationType, TangentSide};
pub use arrays::{NumericArray, NumericType, Ownership, TypedArray};
pub use entity::{Entity, EntityId, EntityKind};
