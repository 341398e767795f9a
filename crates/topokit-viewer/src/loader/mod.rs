//! Asset loading
//!
//! Formats are chosen by extension before any I/O happens. Local paths are
//! read with `tokio::fs`, `http(s)` URLs are fetched with `reqwest`, and
//! parsing runs on the blocking pool.

mod gltf_import;
mod obj_import;

use std::fmt;
use std::path::{Path, PathBuf};

use topokit_core::ViewerError;
use tracing::{debug, info};

use crate::scene::{Aabb, Mesh};

/// Supported asset formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    Gltf,
    Glb,
    Obj,
}

impl ModelFormat {
    /// Pick the loader for a path or URL by its extension
    pub fn from_path(path: &str) -> Result<Self, ViewerError> {
        let without_query = path.split(['?', '#']).next().unwrap_or(path);
        let extension = Path::new(without_query)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("gltf") => Ok(ModelFormat::Gltf),
            Some("glb") => Ok(ModelFormat::Glb),
            Some("obj") => Ok(ModelFormat::Obj),
            _ => Err(ViewerError::UnsupportedFormat {
                path: path.to_string(),
            }),
        }
    }
}

impl fmt::Display for ModelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gltf => write!(f, "glTF"),
            Self::Glb => write!(f, "GLB"),
            Self::Obj => write!(f, "OBJ"),
        }
    }
}

/// One mesh of a loaded asset, in asset space
#[derive(Debug, Clone)]
pub struct ModelPart {
    pub name: String,
    pub mesh: Mesh,
}

/// A parsed asset ready to be added to a scene
#[derive(Debug, Clone)]
pub struct ModelAsset {
    pub source: String,
    pub format: ModelFormat,
    pub parts: Vec<ModelPart>,
}

impl ModelAsset {
    pub fn bounds(&self) -> Aabb {
        self.parts
            .iter()
            .fold(Aabb::EMPTY, |acc, part| acc.union(&part.mesh.geometry.bounds()))
    }

    pub fn triangle_count(&self) -> usize {
        self.parts
            .iter()
            .map(|p| p.mesh.geometry.triangle_count())
            .sum()
    }
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Load and parse an asset from a local path or URL
pub async fn load_asset(source: &str) -> Result<ModelAsset, ViewerError> {
    let format = ModelFormat::from_path(source)?;
    let failed = |reason: String| ViewerError::LoadFailed {
        path: source.to_string(),
        reason,
    };

    let (bytes, base_dir) = if is_url(source) {
        (fetch_bytes(source).await.map_err(failed)?, None)
    } else {
        let path = PathBuf::from(source);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| failed(e.to_string()))?;
        debug!("Model {} 100% loaded ({} bytes)", source, bytes.len());
        (bytes, path.parent().map(Path::to_path_buf))
    };

    let parts = tokio::task::spawn_blocking(move || match format {
        ModelFormat::Gltf | ModelFormat::Glb => gltf_import::parse(&bytes, base_dir.as_deref()),
        ModelFormat::Obj => obj_import::parse(&bytes, base_dir.as_deref()),
    })
    .await
    .map_err(|e| failed(e.to_string()))?
    .map_err(failed)?;

    let asset = ModelAsset {
        source: source.to_string(),
        format,
        parts,
    };
    if asset.triangle_count() == 0 {
        return Err(failed("model contains no triangle geometry".to_string()));
    }

    info!(
        "Loaded {} model {} ({} meshes, {} triangles)",
        format,
        source,
        asset.parts.len(),
        asset.triangle_count()
    );
    Ok(asset)
}

async fn fetch_bytes(url: &str) -> Result<Vec<u8>, String> {
    let mut response = reqwest::get(url).await.map_err(|e| e.to_string())?;
    let status = response.status();
    if !status.is_success() {
        return Err(format!("HTTP {}", status.as_u16()));
    }

    let total = response.content_length();
    let mut bytes = Vec::with_capacity(total.unwrap_or(0) as usize);
    while let Some(chunk) = response.chunk().await.map_err(|e| e.to_string())? {
        bytes.extend_from_slice(&chunk);
        if let Some(total) = total.filter(|t| *t > 0) {
            let percent = bytes.len() as f64 / total as f64 * 100.0;
            debug!("Model {} {}% loaded", url, percent.round());
        }
    }
    Ok(bytes)
}
