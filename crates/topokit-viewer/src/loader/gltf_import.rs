//! glTF 2.0 (`.gltf` and `.glb`) import.

use std::path::Path;

use glam::{Mat4, Vec3};
use gltf::image::Format;
use image::RgbaImage;
use tracing::warn;

use super::ModelPart;
use crate::scene::{Geometry, GeometryGroup, Material, MaterialSlot, Mesh, Texture, TextureMaps};

struct Imported {
    buffers: Vec<gltf::buffer::Data>,
    images: Vec<gltf::image::Data>,
}

/// Parse a glTF document or GLB container
///
/// Node transforms are baked into vertex positions; each glTF mesh becomes
/// one part, with one geometry group per triangle primitive.
pub(super) fn parse(bytes: &[u8], base: Option<&Path>) -> Result<Vec<ModelPart>, String> {
    let gltf::Gltf { document, blob } = gltf::Gltf::from_slice(bytes).map_err(|e| e.to_string())?;
    let buffers = gltf::import_buffers(&document, base, blob).map_err(|e| e.to_string())?;
    let images = gltf::import_images(&document, base, &buffers).unwrap_or_else(|e| {
        warn!("Skipping glTF textures: {}", e);
        Vec::new()
    });
    let imported = Imported { buffers, images };

    let mut parts = Vec::new();
    match document.default_scene().or_else(|| document.scenes().next()) {
        Some(scene) => {
            for node in scene.nodes() {
                visit(&node, Mat4::IDENTITY, &imported, &mut parts);
            }
        }
        None => {
            for mesh in document.meshes() {
                if let Some(part) = convert_mesh(&mesh, None, Mat4::IDENTITY, &imported) {
                    parts.push(part);
                }
            }
        }
    }
    Ok(parts)
}

fn visit(node: &gltf::Node<'_>, parent: Mat4, imported: &Imported, parts: &mut Vec<ModelPart>) {
    let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
    if let Some(mesh) = node.mesh() {
        if let Some(part) = convert_mesh(&mesh, node.name(), world, imported) {
            parts.push(part);
        }
    }
    for child in node.children() {
        visit(&child, world, imported, parts);
    }
}

fn convert_mesh(
    mesh: &gltf::Mesh<'_>,
    node_name: Option<&str>,
    transform: Mat4,
    imported: &Imported,
) -> Option<ModelPart> {
    let mut positions = Vec::new();
    let mut indices = Vec::new();
    let mut groups = Vec::new();
    let mut materials = Vec::new();

    for primitive in mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            continue;
        }
        let reader = primitive
            .reader(|buffer| imported.buffers.get(buffer.index()).map(|data| data.0.as_slice()));
        let Some(read) = reader.read_positions() else {
            continue;
        };

        let base = positions.len() as u32;
        positions.extend(read.map(|p| transform.transform_point3(Vec3::from(p))));
        let vertex_count = positions.len() as u32 - base;

        let start = indices.len();
        match reader.read_indices() {
            Some(read) => indices.extend(read.into_u32().map(|i| i + base)),
            None => indices.extend(base..base + vertex_count),
        }
        groups.push(GeometryGroup {
            start,
            count: indices.len() - start,
            material_index: materials.len(),
        });
        materials.push(convert_material(&primitive.material(), imported));
    }

    if groups.is_empty() {
        return None;
    }

    let material = if materials.len() == 1 {
        MaterialSlot::Single(materials.remove(0))
    } else {
        MaterialSlot::Multi(materials)
    };
    let name = node_name
        .or_else(|| mesh.name())
        .map(str::to_string)
        .unwrap_or_else(|| format!("mesh {}", mesh.index()));

    Some(ModelPart {
        name,
        mesh: Mesh {
            geometry: Geometry::new(positions, indices).with_groups(groups),
            material,
        },
    })
}

fn convert_material(material: &gltf::Material<'_>, imported: &Imported) -> Material {
    let pbr = material.pbr_metallic_roughness();
    let maps = TextureMaps {
        map: pbr
            .base_color_texture()
            .map(|info| convert_texture(&info.texture(), imported)),
        specular_map: None,
        normal_map: material
            .normal_texture()
            .map(|normal| convert_texture(&normal.texture(), imported)),
        emissive_map: material
            .emissive_texture()
            .map(|info| convert_texture(&info.texture(), imported)),
        ao_map: material
            .occlusion_texture()
            .map(|occlusion| convert_texture(&occlusion.texture(), imported)),
    };

    Material::new(
        material.name().unwrap_or("gltf material"),
        pbr.base_color_factor(),
    )
    .with_maps(maps)
}

fn convert_texture(texture: &gltf::Texture<'_>, imported: &Imported) -> Texture {
    let source = texture.source();
    let name = source
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("image {}", source.index()));
    let image = imported.images.get(source.index()).and_then(to_rgba);
    Texture::new(name, image)
}

fn to_rgba(data: &gltf::image::Data) -> Option<RgbaImage> {
    match data.format {
        Format::R8G8B8A8 => RgbaImage::from_raw(data.width, data.height, data.pixels.clone()),
        Format::R8G8B8 => {
            let pixels = data
                .pixels
                .chunks_exact(3)
                .flat_map(|rgb| [rgb[0], rgb[1], rgb[2], 0xff])
                .collect();
            RgbaImage::from_raw(data.width, data.height, pixels)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One triangle, positions embedded as a base64 data URI
    const TRIANGLE_GLTF: &str = r#"{
        "asset": {"version": "2.0"},
        "scene": 0,
        "scenes": [{"nodes": [0]}],
        "nodes": [{"mesh": 0, "name": "tri", "translation": [10.0, 0.0, 0.0]}],
        "meshes": [{"primitives": [{"attributes": {"POSITION": 0}}]}],
        "accessors": [{
            "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
            "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]
        }],
        "bufferViews": [{"buffer": 0, "byteLength": 36}],
        "buffers": [{
            "byteLength": 36,
            "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAA"
        }]
    }"#;

    #[test]
    fn test_parses_embedded_triangle() {
        let parts = parse(TRIANGLE_GLTF.as_bytes(), None).unwrap();
        assert_eq!(parts.len(), 1);

        let part = &parts[0];
        assert_eq!(part.name, "tri");
        assert_eq!(part.mesh.geometry.triangle_count(), 1);

        let bounds = part.mesh.geometry.bounds();
        assert_eq!(bounds.min, Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(bounds.max, Vec3::new(11.0, 1.0, 0.0));
        assert!(matches!(part.mesh.material, MaterialSlot::Single(_)));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse(b"definitely not gltf", None).is_err());
    }
}
