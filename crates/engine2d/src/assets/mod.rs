//! Asset management
//!
//! Only textures are resolved by the core: sprites need a handle and the
//! texture size, the pixels themselves belong to the rendering backend.

pub mod texture;

pub use texture::{FileTextureCatalog, TextureCatalog, TextureId, TextureInfo};

use std::path::PathBuf;
use thiserror::Error;

/// Asset loading errors
#[derive(Error, Debug)]
pub enum AssetError {
    /// Asset file not found
    #[error("Asset not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The file exists but could not be decoded
    #[error("Failed to decode {}: {reason}", path.display())]
    Decode {
        /// Resolved file path
        path: PathBuf,
        /// Decoder message
        reason: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
