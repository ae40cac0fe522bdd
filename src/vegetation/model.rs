//! Placeable model assets and the loaders that resolve them by name.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};

/// File name of a model library index inside its directory.
pub const LIBRARY_INDEX_FILE: &str = "index.json";

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Spheres touching at a single point count as intersecting.
    pub fn intersects(&self, other: &BoundingSphere) -> bool {
        let r = self.radius + other.radius;
        (self.center - other.center).length_squared() <= r * r
    }

    /// Bounds after scaling, rotating about Z, then translating.
    pub fn transformed(&self, position: Vec3, yaw: f32, scale: Vec3) -> BoundingSphere {
        let center = position + Quat::from_rotation_z(yaw) * (self.center * scale);
        BoundingSphere::new(center, self.radius * scale.max_element())
    }
}

/// A loaded model; placement only needs its local bounds.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelAsset {
    pub name: String,
    pub bounds: BoundingSphere,
}

/// Resolves model names to assets.
pub trait ModelLoader: Send + Sync {
    fn load(&self, name: &str) -> Result<ModelAsset>;
}

/// Library index entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    /// Bounding sphere center relative to the model origin.
    pub center: [f32; 3],
    pub radius: f32,
}

/// JSON index of model bounds keyed by name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelLibrary {
    pub models: HashMap<String, ModelEntry>,
}

impl ModelLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, center: [f32; 3], radius: f32) {
        self.models.insert(name.into(), ModelEntry { center, radius });
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Save to file (sync)
    pub fn save_sync(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, json)?;
        Ok(())
    }

    /// Load from file (sync)
    pub fn load_sync(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Load `index.json` from a library directory.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let library = Self::load_sync(&dir.join(LIBRARY_INDEX_FILE))?;
        log::info!("Loaded model library {} ({} models)", dir.display(), library.len());
        Ok(library)
    }
}

impl ModelLoader for ModelLibrary {
    fn load(&self, name: &str) -> Result<ModelAsset> {
        let entry = self.models.get(name).ok_or_else(|| Error::ModelLoad {
            name: name.to_string(),
            reason: "not in library".to_string(),
        })?;
        if !(entry.radius > 0.0) {
            return Err(Error::ModelLoad { name: name.to_string(), reason: "empty bounds".to_string() });
        }
        Ok(ModelAsset {
            name: name.to_string(),
            bounds: BoundingSphere::new(Vec3::from_array(entry.center), entry.radius),
        })
    }
}
