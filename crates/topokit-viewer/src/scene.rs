//! Scene graph
//!
//! Nodes live in an arena owned by [`Scene`] and form a tree under a single
//! root group. Meshes own their geometry and materials; GPU-side handles are
//! created lazily by [`Scene::prepare`] and handed back to the renderer by
//! [`Scene::release_resources`]. Handles are moved out with `Option::take`,
//! so no resource is ever released twice.

use std::sync::Arc;

use glam::Vec3;
use image::RgbaImage;

use crate::backend::{GpuHandle, RenderBackend};

/// Index of a node in its scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// An inverted box that any point expands
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        points.into_iter().fold(Self::EMPTY, |mut acc, p| {
            acc.expand(p);
            acc
        })
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn expand(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn translated(&self, offset: Vec3) -> Aabb {
        if self.is_empty() {
            return *self;
        }
        Aabb {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            self.max - self.min
        }
    }

    pub fn diagonal(&self) -> f32 {
        self.size().length()
    }
}

/// Contiguous triangle range drawn with one material of a multi-material mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryGroup {
    /// First index into `Geometry::indices`
    pub start: usize,
    /// Number of indices
    pub count: usize,
    pub material_index: usize,
}

/// Indexed triangle list
#[derive(Debug, Clone, Default)]
pub struct Geometry {
    pub positions: Vec<Vec3>,
    pub indices: Vec<u32>,
    pub groups: Vec<GeometryGroup>,
    pub(crate) handle: Option<GpuHandle>,
}

impl Geometry {
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self {
            positions,
            indices,
            groups: Vec::new(),
            handle: None,
        }
    }

    pub fn with_groups(mut self, groups: Vec<GeometryGroup>) -> Self {
        self.groups = groups;
        self
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Triangles as vertex triples; out-of-range indices are skipped
    pub fn triangles(&self) -> impl Iterator<Item = (usize, [Vec3; 3])> + '_ {
        self.indices
            .chunks_exact(3)
            .enumerate()
            .filter_map(move |(i, tri)| {
                let a = *self.positions.get(tri[0] as usize)?;
                let b = *self.positions.get(tri[1] as usize)?;
                let c = *self.positions.get(tri[2] as usize)?;
                Some((i, [a, b, c]))
            })
    }

    /// Material slot for the triangle at `triangle_index`
    pub fn material_index_for(&self, triangle_index: usize) -> usize {
        let first_index = triangle_index * 3;
        self.groups
            .iter()
            .find(|g| first_index >= g.start && first_index < g.start + g.count)
            .map(|g| g.material_index)
            .unwrap_or(0)
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(self.positions.iter().copied())
    }

    pub fn is_uploaded(&self) -> bool {
        self.handle.is_some()
    }
}

/// Image map attached to a material
#[derive(Debug, Clone, Default)]
pub struct Texture {
    pub name: String,
    /// Decoded pixels; `None` when the image could not be decoded
    pub image: Option<Arc<RgbaImage>>,
    pub(crate) handle: Option<GpuHandle>,
}

impl Texture {
    pub fn new(name: impl Into<String>, image: Option<RgbaImage>) -> Self {
        Self {
            name: name.into(),
            image: image.map(Arc::new),
            handle: None,
        }
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.image.as_ref().map(|img| img.dimensions())
    }
}

/// Texture maps a material may carry
#[derive(Debug, Clone, Default)]
pub struct TextureMaps {
    /// Diffuse
    pub map: Option<Texture>,
    pub specular_map: Option<Texture>,
    pub normal_map: Option<Texture>,
    pub emissive_map: Option<Texture>,
    /// Ambient occlusion
    pub ao_map: Option<Texture>,
}

impl TextureMaps {
    pub fn iter(&self) -> impl Iterator<Item = &Texture> {
        [
            &self.map,
            &self.specular_map,
            &self.normal_map,
            &self.emissive_map,
            &self.ao_map,
        ]
        .into_iter()
        .flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Texture> {
        [
            &mut self.map,
            &mut self.specular_map,
            &mut self.normal_map,
            &mut self.emissive_map,
            &mut self.ao_map,
        ]
        .into_iter()
        .flatten()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Surface appearance
#[derive(Debug, Clone)]
pub struct Material {
    pub name: String,
    /// Linear RGBA base color
    pub color: [f32; 4],
    pub maps: TextureMaps,
    pub(crate) handle: Option<GpuHandle>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            color: [0.8, 0.8, 0.8, 1.0],
            maps: TextureMaps::default(),
            handle: None,
        }
    }
}

impl Material {
    pub fn new(name: impl Into<String>, color: [f32; 4]) -> Self {
        Self {
            name: name.into(),
            color,
            ..Default::default()
        }
    }

    pub fn with_maps(mut self, maps: TextureMaps) -> Self {
        self.maps = maps;
        self
    }
}

/// One material or one per geometry group
#[derive(Debug, Clone)]
pub enum MaterialSlot {
    Single(Material),
    Multi(Vec<Material>),
}

impl MaterialSlot {
    pub fn iter(&self) -> std::slice::Iter<'_, Material> {
        match self {
            MaterialSlot::Single(m) => std::slice::from_ref(m).iter(),
            MaterialSlot::Multi(list) => list.iter(),
        }
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Material> {
        match self {
            MaterialSlot::Single(m) => std::slice::from_mut(m).iter_mut(),
            MaterialSlot::Multi(list) => list.iter_mut(),
        }
    }

    /// Material for a group index, falling back to the first one
    pub fn get(&self, index: usize) -> Option<&Material> {
        match self {
            MaterialSlot::Single(m) => Some(m),
            MaterialSlot::Multi(list) => list.get(index).or_else(|| list.first()),
        }
    }
}

/// Renderable geometry with its materials
#[derive(Debug, Clone)]
pub struct Mesh {
    pub geometry: Geometry,
    pub material: MaterialSlot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    Ambient,
    Point,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub color: [f32; 3],
    pub intensity: f32,
}

impl Light {
    pub fn ambient(color: u32, intensity: f32) -> Self {
        Self {
            kind: LightKind::Ambient,
            color: rgb(color),
            intensity,
        }
    }

    pub fn point(color: u32, intensity: f32) -> Self {
        Self {
            kind: LightKind::Point,
            color: rgb(color),
            intensity,
        }
    }
}

fn rgb(hex: u32) -> [f32; 3] {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Group,
    Mesh(Mesh),
    Light(Light),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    /// Translation relative to the parent
    pub position: Vec3,
    pub kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn group(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Group)
    }

    pub fn mesh(name: impl Into<String>, mesh: Mesh) -> Self {
        Self::new(name, NodeKind::Mesh(mesh))
    }

    pub fn light(name: impl Into<String>, light: Light) -> Self {
        Self::new(name, NodeKind::Light(light))
    }

    fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            position: Vec3::ZERO,
            kind,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn as_mesh(&self) -> Option<&Mesh> {
        match &self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn as_light(&self) -> Option<&Light> {
        match &self.kind {
            NodeKind::Light(light) => Some(light),
            _ => None,
        }
    }
}

/// Resources handed back to the renderer by a release pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReleaseSummary {
    pub geometries: usize,
    pub materials: usize,
    pub textures: usize,
}

impl ReleaseSummary {
    pub fn total(&self) -> usize {
        self.geometries + self.materials + self.textures
    }

    pub(crate) fn add(&mut self, other: ReleaseSummary) {
        self.geometries += other.geometries;
        self.materials += other.materials;
        self.textures += other.textures;
    }
}

/// Scene graph
#[derive(Debug, Clone)]
pub struct Scene {
    nodes: Vec<Option<Node>>,
    root: NodeId,
    revision: u64,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(Node::group("root"))],
            root: NodeId(0),
            revision: 0,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Incremented on every structural or transform change
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.revision += 1;
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Attach `node` under `parent`; a missing parent attaches to the root
    pub fn add(&mut self, parent: NodeId, mut node: Node) -> NodeId {
        let parent = if self.get(parent).is_some() {
            parent
        } else {
            self.root
        };
        let id = NodeId(self.nodes.len());
        node.parent = Some(parent);
        node.children.clear();
        self.nodes.push(Some(node));
        if let Some(Some(p)) = self.nodes.get_mut(parent.0) {
            p.children.push(id);
        }
        self.revision += 1;
        id
    }

    /// Detach a subtree and return its nodes; the root cannot be removed
    pub fn remove(&mut self, id: NodeId) -> Vec<Node> {
        if id == self.root || self.get(id).is_none() {
            return Vec::new();
        }

        if let Some(parent) = self.get(id).and_then(|n| n.parent) {
            if let Some(Some(p)) = self.nodes.get_mut(parent.0) {
                p.children.retain(|c| *c != id);
            }
        }

        let mut removed = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(next.0).and_then(Option::take) {
                stack.extend(node.children.iter().copied());
                removed.push(node);
            }
        }
        self.revision += 1;
        removed
    }

    /// Depth-first walk from the root with each node's world position
    pub fn traverse(&self, mut visit: impl FnMut(NodeId, &Node, Vec3)) {
        let mut stack = vec![(self.root, Vec3::ZERO)];
        while let Some((id, parent_pos)) = stack.pop() {
            let Some(node) = self.get(id) else {
                continue;
            };
            let world = parent_pos + node.position;
            visit(id, node, world);
            stack.extend(node.children.iter().rev().map(|c| (*c, world)));
        }
    }

    /// World position of a node
    pub fn world_position(&self, id: NodeId) -> Vec3 {
        let mut position = Vec3::ZERO;
        let mut current = self.get(id);
        while let Some(node) = current {
            position += node.position;
            current = node.parent.and_then(|p| self.get(p));
        }
        position
    }

    /// World-space bounds of the meshes under `id`
    pub fn bounds_of(&self, id: NodeId) -> Aabb {
        let mut bounds = Aabb::EMPTY;
        let mut stack = vec![(id, self.world_position(id))];
        while let Some((next, world)) = stack.pop() {
            let Some(node) = self.get(next) else {
                continue;
            };
            if let NodeKind::Mesh(mesh) = &node.kind {
                bounds = bounds.union(&mesh.geometry.bounds().translated(world));
            }
            for child in &node.children {
                let child_pos = self.get(*child).map(|c| c.position).unwrap_or(Vec3::ZERO);
                stack.push((*child, world + child_pos));
            }
        }
        bounds
    }

    pub fn node_count(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    pub fn mesh_count(&self) -> usize {
        self.nodes
            .iter()
            .flatten()
            .filter(|n| matches!(n.kind, NodeKind::Mesh(_)))
            .count()
    }

    pub fn triangle_count(&self) -> usize {
        self.nodes
            .iter()
            .flatten()
            .filter_map(Node::as_mesh)
            .map(|m| m.geometry.triangle_count())
            .sum()
    }

    /// Upload any geometry, material or texture that has no GPU handle yet
    pub fn prepare(&mut self, backend: &mut dyn RenderBackend) {
        for node in self.nodes.iter_mut().flatten() {
            let NodeKind::Mesh(mesh) = &mut node.kind else {
                continue;
            };
            if mesh.geometry.handle.is_none() {
                mesh.geometry.handle = Some(backend.create_geometry(&mesh.geometry));
            }
            for material in mesh.material.iter_mut() {
                for texture in material.maps.iter_mut() {
                    if texture.handle.is_none() {
                        texture.handle = Some(backend.create_texture(texture));
                    }
                }
                if material.handle.is_none() {
                    material.handle = Some(backend.create_material(material));
                }
            }
        }
    }

    /// Release every uploaded resource in the graph
    ///
    /// Running it again releases nothing.
    pub fn release_resources(&mut self, backend: &mut dyn RenderBackend) -> ReleaseSummary {
        let mut summary = ReleaseSummary::default();
        for node in self.nodes.iter_mut().flatten() {
            summary.add(release_node(node, backend));
        }
        summary
    }

    /// Number of resources currently holding a GPU handle
    pub fn uploaded_resources(&self) -> usize {
        self.nodes
            .iter()
            .flatten()
            .filter_map(Node::as_mesh)
            .map(|mesh| {
                let materials: usize = mesh
                    .material
                    .iter()
                    .map(|m| {
                        usize::from(m.handle.is_some())
                            + m.maps.iter().filter(|t| t.handle.is_some()).count()
                    })
                    .sum();
                usize::from(mesh.geometry.handle.is_some()) + materials
            })
            .sum()
    }
}

/// Release the handles held by one detached or live node
pub fn release_node(node: &mut Node, backend: &mut dyn RenderBackend) -> ReleaseSummary {
    let mut summary = ReleaseSummary::default();
    let NodeKind::Mesh(mesh) = &mut node.kind else {
        return summary;
    };

    if let Some(handle) = mesh.geometry.handle.take() {
        backend.release_geometry(handle);
        summary.geometries += 1;
    }
    for material in mesh.material.iter_mut() {
        for texture in material.maps.iter_mut() {
            if let Some(handle) = texture.handle.take() {
                backend.release_texture(handle);
                summary.textures += 1;
            }
        }
        if let Some(handle) = material.handle.take() {
            backend.release_material(handle);
            summary.materials += 1;
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Geometry {
        Geometry::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            vec![0, 1, 2],
        )
    }

    #[test]
    fn test_aabb_basics() {
        assert!(Aabb::EMPTY.is_empty());
        assert_eq!(Aabb::EMPTY.size(), Vec3::ZERO);

        let bounds = Aabb::from_points([Vec3::new(-1.0, 0.0, 2.0), Vec3::new(3.0, 4.0, 2.0)]);
        assert_eq!(bounds.center(), Vec3::new(1.0, 2.0, 2.0));
        assert_eq!(bounds.size(), Vec3::new(4.0, 4.0, 0.0));
    }

    #[test]
    fn test_add_and_remove_subtree() {
        let mut scene = Scene::new();
        let group = scene.add(scene.root(), Node::group("asset"));
        let mesh = Mesh {
            geometry: triangle(),
            material: MaterialSlot::Single(Material::default()),
        };
        scene.add(group, Node::mesh("part", mesh));
        assert_eq!(scene.node_count(), 3);
        assert_eq!(scene.mesh_count(), 1);

        let removed = scene.remove(group);
        assert_eq!(removed.len(), 2);
        assert_eq!(scene.node_count(), 1);
        assert!(scene.get(scene.root()).unwrap().children().is_empty());
        assert!(scene.remove(scene.root()).is_empty());
    }

    #[test]
    fn test_bounds_follow_translation() {
        let mut scene = Scene::new();
        let group = scene.add(scene.root(), Node::group("asset").at(Vec3::new(10.0, 0.0, 0.0)));
        let mesh = Mesh {
            geometry: triangle(),
            material: MaterialSlot::Single(Material::default()),
        };
        scene.add(group, Node::mesh("part", mesh).at(Vec3::new(0.0, 5.0, 0.0)));

        let bounds = scene.bounds_of(scene.root());
        assert_eq!(bounds.min, Vec3::new(10.0, 5.0, 0.0));
        assert_eq!(bounds.max, Vec3::new(11.0, 6.0, 0.0));
    }

    #[test]
    fn test_group_material_lookup() {
        let geometry = Geometry::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z],
            vec![0, 1, 2, 0, 2, 3],
        )
        .with_groups(vec![
            GeometryGroup {
                start: 0,
                count: 3,
                material_index: 0,
            },
            GeometryGroup {
                start: 3,
                count: 3,
                material_index: 1,
            },
        ]);
        assert_eq!(geometry.material_index_for(0), 0);
        assert_eq!(geometry.material_index_for(1), 1);
    }

    #[test]
    fn test_texture_maps_iteration() {
        let maps = TextureMaps {
            map: Some(Texture::new("diffuse", None)),
            ao_map: Some(Texture::new("ao", None)),
            ..Default::default()
        };
        assert_eq!(maps.len(), 2);
        let names: Vec<&str> = maps.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["diffuse", "ao"]);
    }

    #[test]
    fn test_light_colors() {
        let ambient = Light::ambient(0x404040, 1.0);
        assert!((ambient.color[0] - 64.0 / 255.0).abs() < 1e-6);
        assert_eq!(ambient.kind, LightKind::Ambient);
    }
}
