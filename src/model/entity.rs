//! Entity identity and the closed set of entity kinds.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use super::animation::AnimationCurve;

static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique entity identifier. Never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u64);

impl EntityId {
    /// Allocate a fresh identifier.
    pub fn allocate() -> Self {
        EntityId(NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw value, for diagnostics.
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind tag of an [`Entity`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Key-framed animation curve
    Curve,
}

impl EntityKind {
    /// Lowercase name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Curve => "curve",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Every entity the model knows about.
#[derive(Debug)]
pub enum Entity<'a> {
    /// Animation curve
    AnimationCurve(AnimationCurve<'a>),
}

impl<'a> Entity<'a> {
    /// Identifier of the wrapped entity.
    pub fn id(&self) -> EntityId {
        match self {
            Entity::AnimationCurve(curve) => curve.id(),
        }
    }

    /// Kind tag of the wrapped entity.
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::AnimationCurve(_) => EntityKind::Curve,
        }
    }

    /// The curve, if this is one.
    pub fn as_animation_curve(&self) -> Option<&AnimationCurve<'a>> {
        match self {
            Entity::AnimationCurve(curve) => Some(curve),
        }
    }

    /// The curve, mutably, if this is one.
    pub fn as_animation_curve_mut(&mut self) -> Option<&mut AnimationCurve<'a>> {
        match self {
            Entity::AnimationCurve(curve) => Some(curve),
        }
    }

    /// Take the curve out of the entity, or hand the entity back.
    pub fn into_animation_curve(self) -> Result<AnimationCurve<'a>, Self> {
        match self {
            Entity::AnimationCurve(curve) => Ok(curve),
        }
    }
}

impl<'a> From<AnimationCurve<'a>> for Entity<'a> {
    fn from(curve: AnimationCurve<'a>) -> Self {
        Entity::AnimationCurve(curve)
    }
}
