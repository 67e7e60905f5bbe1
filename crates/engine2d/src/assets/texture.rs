//! Texture catalog
//!
//! Resolves texture paths to stable [`TextureId`] handles. Loading the same
//! path twice returns the same handle.

use super::AssetError;
use slotmap::{new_key_type, SlotMap};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

new_key_type! {
    /// Handle to a resolved texture
    pub struct TextureId;
}

/// What the core knows about a texture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureInfo {
    /// Path as requested by the scene
    pub path: String,
    /// Resolved file on disk
    pub resolved: PathBuf,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// Source of texture handles used by sprites
pub trait TextureCatalog {
    /// Resolve `path`, loading it on first use
    fn load(&mut self, path: &str) -> Result<TextureId, AssetError>;

    /// Info of a resolved texture
    fn get(&self, id: TextureId) -> Option<&TextureInfo>;

    /// Forget every texture
    fn clear(&mut self);

    /// Number of resolved textures
    fn len(&self) -> usize;

    /// Whether nothing is resolved
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Catalog reading image headers from a data directory
#[derive(Debug, Default)]
pub struct FileTextureCatalog {
    root: PathBuf,
    textures: SlotMap<TextureId, TextureInfo>,
    by_path: HashMap<String, TextureId>,
}

impl FileTextureCatalog {
    /// Create a catalog resolving relative paths against `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            textures: SlotMap::with_key(),
            by_path: HashMap::new(),
        }
    }

    /// Directory relative paths are resolved against
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl TextureCatalog for FileTextureCatalog {
    fn load(&mut self, path: &str) -> Result<TextureId, AssetError> {
        if let Some(id) = self.by_path.get(path) {
            return Ok(*id);
        }

        let resolved = self.resolve(path);
        if !resolved.is_file() {
            return Err(AssetError::NotFound(resolved));
        }
        let (width, height) = image::image_dimensions(&resolved).map_err(|e| AssetError::Decode {
            path: resolved.clone(),
            reason: e.to_string(),
        })?;

        log::debug!("Loaded texture {}x{} from {}", width, height, resolved.display());
        let id = self.textures.insert(TextureInfo {
            path: path.to_string(),
            resolved,
            width,
            height,
        });
        self.by_path.insert(path.to_string(), id);
        Ok(id)
    }

    fn get(&self, id: TextureId) -> Option<&TextureInfo> {
        self.textures.get(id)
    }

    fn clear(&mut self) {
        self.textures.clear();
        self.by_path.clear();
    }

    fn len(&self) -> usize {
        self.textures.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_texture() {
        let mut catalog = FileTextureCatalog::new(std::env::temp_dir());
        let result = catalog.load("engine2d_definitely_missing.png");
        assert!(matches!(result, Err(AssetError::NotFound(_))));
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_png_is_cached() {
        let dir = std::env::temp_dir().join(format!("engine2d_textures_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        image::RgbaImage::new(4, 2).save(dir.join("dwarf.png")).unwrap();

        let mut catalog = FileTextureCatalog::new(&dir);
        let first = catalog.load("dwarf.png").unwrap();
        let second = catalog.load("dwarf.png").unwrap();
        assert_eq!(first, second);
        assert_eq!(catalog.len(), 1);

        let info = catalog.get(first).unwrap();
        assert_eq!((info.width, info.height), (4, 2));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_garbage_fails_to_decode() {
        let dir = std::env::temp_dir().join(format!("engine2d_garbage_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("broken.png"), b"not an image").unwrap();

        let mut catalog = FileTextureCatalog::new(&dir);
        assert!(matches!(catalog.load("broken.png"), Err(AssetError::Decode { .. })));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
