//! Draw submission
//!
//! The core does not own a graphics backend. Sprites are turned into
//! [`DrawCommand`]s every draw phase; a backend drains the [`RenderQueue`].

pub mod render_queue;

pub use render_queue::{DrawCommand, RenderQueue};
