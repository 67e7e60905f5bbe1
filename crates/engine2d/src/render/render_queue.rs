//! # Render Queue
//!
//! Collects the draw commands emitted during the draw phase of a frame. The
//! engine itself never rasterizes anything; a rendering backend consumes the
//! sorted commands once the draw phase is over.
//!
//! Commands are ordered by layer (lowest first) and, inside a layer, by entity
//! id so the output is deterministic frame to frame.

use crate::assets::TextureId;
use crate::ecs::Entity;
use crate::foundation::math::{Mat3, Vec2};

/// Everything a backend needs to draw one sprite
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCommand {
    /// Entity that owns the sprite
    pub entity: Entity,
    /// Texture to draw; `None` draws the placeholder
    pub texture: Option<TextureId>,
    /// Texture path as written in the scene, kept for placeholders
    pub texture_path: String,
    /// World transform (translation, rotation, scale)
    pub transform: Mat3,
    /// World position in pixels
    pub position: Vec2,
    /// Draw layer; higher layers are drawn on top
    pub layer: i32,
}

/// Draw commands of one frame
#[derive(Debug, Default)]
pub struct RenderQueue {
    commands: Vec<DrawCommand>,
    sorted: bool,
}

impl RenderQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a queue with room for `capacity` commands
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            commands: Vec::with_capacity(capacity),
            sorted: true,
        }
    }

    /// Add a draw command
    pub fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
        self.sorted = false;
    }

    /// Sort commands into draw order
    pub fn sort_commands(&mut self) {
        if !self.sorted {
            self.commands.sort_by_key(|command| (command.layer, command.entity));
            self.sorted = true;
        }
    }

    /// Commands in draw order
    pub fn commands(&mut self) -> &[DrawCommand] {
        self.sort_commands();
        &self.commands
    }

    /// Take the commands in draw order, leaving the queue empty
    pub fn drain(&mut self) -> Vec<DrawCommand> {
        self.sort_commands();
        std::mem::take(&mut self.commands)
    }

    /// Number of queued commands
    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    /// Clear all commands for the next frame
    pub fn clear(&mut self) {
        self.commands.clear();
        self.sorted = true;
    }

    /// Check if queue is empty
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(id: u32, layer: i32) -> DrawCommand {
        DrawCommand {
            entity: Entity::new(id),
            texture: None,
            texture_path: String::new(),
            transform: Mat3::identity(),
            position: Vec2::zeros(),
            layer,
        }
    }

    #[test]
    fn test_render_queue_creation() {
        let queue = RenderQueue::new();
        assert!(queue.is_empty());
        assert_eq!(queue.command_count(), 0);
    }

    #[test]
    fn test_layer_then_entity_order() {
        let mut queue = RenderQueue::new();
        queue.push(command(3, 1));
        queue.push(command(2, 0));
        queue.push(command(1, 1));

        let order: Vec<_> = queue.commands().iter().map(|c| (c.layer, c.entity.id())).collect();
        assert_eq!(order, vec![(0, 2), (1, 1), (1, 3)]);
    }

    #[test]
    fn test_drain_empties_queue() {
        let mut queue = RenderQueue::with_capacity(4);
        queue.push(command(1, 0));
        assert_eq!(queue.drain().len(), 1);
        assert!(queue.is_empty());
    }
}
