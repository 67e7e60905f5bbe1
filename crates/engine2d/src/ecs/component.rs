//! Component kinds, masks and the component trait
//!
//! Every component kind owns one bit of the per-entity [`ComponentMask`]. The
//! bit is derived from the [`ComponentKind`] discriminant, so adding a kind can
//! never silently reuse another kind's bit. Discriminants match the flag values
//! used by scene files (`type: 1` is a transform, `type: 2` a sprite, ...).

use super::Entity;
use bitflags::bitflags;
use std::fmt;
use std::str::FromStr;

/// Every component kind known to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ComponentKind {
    /// Position, scale and angle
    Transform2d = 0,
    /// Textured quad drawn at the entity's transform
    Sprite = 1,
    /// Simulated rigid body
    Body2d = 3,
    /// Collision shape attached to a body
    Collider2d = 4,
    /// Script-driven behaviours
    Behavior = 6,
    /// One square of a tilemap
    Tile = 7,
}

impl ComponentKind {
    /// All kinds, in bit order
    pub const ALL: [Self; 6] = [
        Self::Transform2d,
        Self::Sprite,
        Self::Body2d,
        Self::Collider2d,
        Self::Behavior,
        Self::Tile,
    ];

    /// Bit index inside a [`ComponentMask`]
    pub const fn bit(self) -> u32 {
        self as u32
    }

    /// Single-bit mask for this kind
    pub const fn mask(self) -> ComponentMask {
        ComponentMask::from_bits_retain(1 << self.bit())
    }

    /// Resolve a scene-file flag value (`1 << bit`)
    pub fn from_flag(flag: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| u64::from(kind.mask().bits()) == flag)
    }

    /// Human-readable name, also accepted by [`FromStr`]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Transform2d => "transform2d",
            Self::Sprite => "sprite",
            Self::Body2d => "body2d",
            Self::Collider2d => "collider2d",
            Self::Behavior => "behavior",
            Self::Tile => "tile",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ComponentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_ascii_lowercase();
        let name = match lowered.as_str() {
            "transform" => "transform2d",
            "body" => "body2d",
            "collider" => "collider2d",
            "script" | "pycomponent" => "behavior",
            other => other,
        };
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| s.to_string())
    }
}

bitflags! {
    /// Set of component kinds attached to one entity
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ComponentMask: u32 {
        /// [`ComponentKind::Transform2d`]
        const TRANSFORM_2D = 1 << ComponentKind::Transform2d.bit();
        /// [`ComponentKind::Sprite`]
        const SPRITE = 1 << ComponentKind::Sprite.bit();
        /// [`ComponentKind::Body2d`]
        const BODY_2D = 1 << ComponentKind::Body2d.bit();
        /// [`ComponentKind::Collider2d`]
        const COLLIDER_2D = 1 << ComponentKind::Collider2d.bit();
        /// [`ComponentKind::Behavior`]
        const BEHAVIOR = 1 << ComponentKind::Behavior.bit();
        /// [`ComponentKind::Tile`]
        const TILE = 1 << ComponentKind::Tile.bit();
    }
}

impl ComponentMask {
    /// Whether the kind's bit is set
    pub fn has(self, kind: ComponentKind) -> bool {
        self.contains(kind.mask())
    }

    /// Kinds present in this mask
    pub fn kinds(self) -> impl Iterator<Item = ComponentKind> {
        ComponentKind::ALL.into_iter().filter(move |kind| self.has(*kind))
    }
}

impl From<ComponentKind> for ComponentMask {
    fn from(kind: ComponentKind) -> Self {
        kind.mask()
    }
}

/// Trait implemented by every component payload
///
/// Components are plain data stored densely by entity index. `Default` is the
/// freshly-added state; the hooks run when the kind bit is set or cleared.
pub trait Component: Default + 'static {
    /// Kind (and mask bit) of this component
    const KIND: ComponentKind;

    /// Called right after the default payload is written for `entity`
    fn on_create(&mut self, _entity: Entity) {}

    /// Called before the kind bit of `entity` is cleared
    fn on_destroy(&mut self, _entity: Entity) {}
}
