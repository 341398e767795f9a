//! Wavefront OBJ import, with MTL materials resolved next to the file.

use std::path::Path;

use glam::Vec3;
use tracing::{debug, warn};

use super::ModelPart;
use crate::scene::{Geometry, Material, MaterialSlot, Mesh, Texture, TextureMaps};

const DEFAULT_COLOR: [f32; 4] = [0.8, 0.8, 0.8, 1.0];

pub(super) fn parse(bytes: &[u8], base: Option<&Path>) -> Result<Vec<ModelPart>, String> {
    let mut reader: &[u8] = bytes;
    let options = tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ..Default::default()
    };
    let (models, materials) = tobj::load_obj_buf(&mut reader, &options, |mtl_path| match base {
        Some(dir) => tobj::load_mtl(dir.join(mtl_path)),
        None => Err(tobj::LoadError::OpenFileFailed),
    })
    .map_err(|e| e.to_string())?;

    let materials = materials.unwrap_or_else(|e| {
        warn!("OBJ materials unavailable: {}", e);
        Vec::new()
    });

    let parts = models
        .into_iter()
        .filter(|model| !model.mesh.indices.is_empty())
        .map(|model| {
            let positions = model
                .mesh
                .positions
                .chunks_exact(3)
                .map(|p| Vec3::new(p[0], p[1], p[2]))
                .collect();
            let material = model
                .mesh
                .material_id
                .and_then(|id| materials.get(id))
                .map(|m| convert_material(m, base))
                .unwrap_or_else(|| Material::new("default", DEFAULT_COLOR));

            ModelPart {
                name: model.name,
                mesh: Mesh {
                    geometry: Geometry::new(positions, model.mesh.indices),
                    material: MaterialSlot::Single(material),
                },
            }
        })
        .collect();
    Ok(parts)
}

fn convert_material(material: &tobj::Material, base: Option<&Path>) -> Material {
    let [r, g, b] = material.diffuse.unwrap_or([0.8, 0.8, 0.8]);
    let alpha = material.dissolve.unwrap_or(1.0);
    let texture = |name: &Option<String>| name.as_deref().map(|n| load_texture(n, base));

    Material::new(material.name.clone(), [r, g, b, alpha]).with_maps(TextureMaps {
        map: texture(&material.diffuse_texture),
        specular_map: texture(&material.specular_texture),
        normal_map: texture(&material.normal_texture),
        emissive_map: None,
        ao_map: texture(&material.ambient_texture),
    })
}

fn load_texture(name: &str, base: Option<&Path>) -> Texture {
    let image = base.and_then(|dir| match image::open(dir.join(name)) {
        Ok(image) => Some(image.to_rgba8()),
        Err(e) => {
            debug!("Texture {} not loaded: {}", name, e);
            None
        }
    });
    Texture::new(name, image)
}
