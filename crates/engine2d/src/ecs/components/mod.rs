//! Built-in components and their managers
//!
//! Every manager owns the dense store of one component kind, acts as a system
//! in the frame schedule, and builds its component from scene descriptors.

pub mod behavior;
pub mod body;
pub mod collider;
pub mod sprite;
pub mod tile;
pub mod transform;

pub use behavior::{Behavior, BehaviorManager};
pub use body::{Body2d, Body2dManager, BodyType};
pub use collider::{shapes_overlap, Collider2d, Collider2dManager, ColliderShape, ContactEvent, ContactPhase};
pub use sprite::{Sprite, SpriteManager};
pub use tile::{Tile, TileManager, TileTypeId};
pub use transform::{Transform2d, Transform2dManager};
