//! Headless software renderer.
//!
//! Z-buffered triangle rasterizer with flat Lambert shading into an RGBA
//! framebuffer. Materials contribute their base color; texture maps are
//! uploaded and released like on a GPU backend but are not sampled.

use std::sync::Arc;

use glam::{Mat4, Vec3};
use image::{Rgba, RgbaImage};
use topokit_core::ViewerError;
use tracing::{debug, trace};

use super::{GpuHandle, OutputElement, RenderBackend, RendererFactory, ResourceKind, ResourceLedger};
use crate::camera::PerspectiveCamera;
use crate::scene::{Geometry, LightKind, Material, NodeKind, Scene, Texture};

/// Lights flattened to world space for one frame
struct FrameLights {
    ambient: Vec3,
    points: Vec<(Vec3, Vec3)>,
}

impl FrameLights {
    fn collect(scene: &Scene) -> Self {
        let mut lights = FrameLights {
            ambient: Vec3::ZERO,
            points: Vec::new(),
        };
        scene.traverse(|_, node, world| {
            if let NodeKind::Light(light) = &node.kind {
                let color = Vec3::from_array(light.color) * light.intensity;
                match light.kind {
                    LightKind::Ambient => lights.ambient += color,
                    LightKind::Point => lights.points.push((world, color)),
                }
            }
        });
        lights
    }

    fn shade(&self, base: Vec3, normal: Vec3, point: Vec3) -> Vec3 {
        let mut light = self.ambient;
        for (position, color) in &self.points {
            let to_light = (*position - point).normalize_or_zero();
            light += *color * normal.dot(to_light).max(0.0);
        }
        (base * light).clamp(Vec3::ZERO, Vec3::ONE)
    }
}

/// CPU rasterizer implementing [`RenderBackend`]
pub struct SoftwareRenderer {
    width: u32,
    height: u32,
    pixel_ratio: f32,
    background: Rgba<u8>,
    color: RgbaImage,
    depth: Vec<f32>,
    ledger: Arc<ResourceLedger>,
    element: OutputElement,
    frames: u64,
    disposed: bool,
}

impl SoftwareRenderer {
    pub fn new(width: u32, height: u32, ledger: Arc<ResourceLedger>) -> Self {
        ledger.renderer_created();
        let mut renderer = Self {
            width,
            height,
            pixel_ratio: 1.0,
            background: Rgba([0xf0, 0xf0, 0xf0, 0xff]),
            color: RgbaImage::new(1, 1),
            depth: Vec::new(),
            ledger,
            element: OutputElement::new(),
            frames: 0,
            disposed: false,
        };
        renderer.resize_buffers();
        renderer
    }

    pub fn with_background(mut self, rgba: [u8; 4]) -> Self {
        self.background = Rgba(rgba);
        self
    }

    /// Drawing buffer size in device pixels
    pub fn buffer_size(&self) -> (u32, u32) {
        self.color.dimensions()
    }

    pub fn framebuffer(&self) -> &RgbaImage {
        &self.color
    }

    fn resize_buffers(&mut self) {
        let w = ((self.width as f32 * self.pixel_ratio).round() as u32).max(1);
        let h = ((self.height as f32 * self.pixel_ratio).round() as u32).max(1);
        if self.color.dimensions() != (w, h) {
            self.color = RgbaImage::new(w, h);
            self.depth = vec![f32::INFINITY; (w * h) as usize];
            debug!("Software framebuffer resized to {}x{}", w, h);
        }
    }

    fn clear(&mut self) {
        for pixel in self.color.pixels_mut() {
            *pixel = self.background;
        }
        self.depth.fill(f32::INFINITY);
    }

    fn draw_triangle(&mut self, view_proj: &Mat4, world: [Vec3; 3], color: Rgba<u8>) {
        let (w, h) = self.color.dimensions();
        let mut screen = [Vec3::ZERO; 3];
        for (i, p) in world.iter().enumerate() {
            let clip = *view_proj * p.extend(1.0);
            if clip.w <= 1e-6 {
                return;
            }
            let ndc = clip.truncate() / clip.w;
            screen[i] = Vec3::new(
                (ndc.x * 0.5 + 0.5) * w as f32,
                (1.0 - (ndc.y * 0.5 + 0.5)) * h as f32,
                ndc.z,
            );
        }

        let [a, b, c] = screen;
        let area = edge(a, b, c);
        if area.abs() < 1e-8 {
            return;
        }

        let min_x = a.x.min(b.x).min(c.x).floor().max(0.0) as u32;
        let min_y = a.y.min(b.y).min(c.y).floor().max(0.0) as u32;
        let max_x = a.x.max(b.x).max(c.x).ceil().min(w as f32 - 1.0);
        let max_y = a.y.max(b.y).max(c.y).ceil().min(h as f32 - 1.0);
        if max_x < 0.0 || max_y < 0.0 {
            return;
        }
        let (max_x, max_y) = (max_x as u32, max_y as u32);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let p = Vec3::new(x as f32 + 0.5, y as f32 + 0.5, 0.0);
                let w0 = edge(b, c, p) / area;
                let w1 = edge(c, a, p) / area;
                let w2 = edge(a, b, p) / area;
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }

                let z = w0 * a.z + w1 * b.z + w2 * c.z;
                if !(0.0..=1.0).contains(&z) {
                    continue;
                }
                let index = (y * w + x) as usize;
                if z < self.depth[index] {
                    self.depth[index] = z;
                    self.color.put_pixel(x, y, color);
                }
            }
        }
    }
}

fn edge(a: Vec3, b: Vec3, p: Vec3) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

impl RenderBackend for SoftwareRenderer {
    fn name(&self) -> &str {
        "software"
    }

    fn output_element(&self) -> OutputElement {
        self.element
    }

    fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.resize_buffers();
    }

    fn set_pixel_ratio(&mut self, ratio: f32) {
        if ratio > 0.0 {
            self.pixel_ratio = ratio;
            self.resize_buffers();
        }
    }

    fn create_geometry(&mut self, geometry: &Geometry) -> GpuHandle {
        trace!("Uploading geometry with {} triangles", geometry.triangle_count());
        self.ledger.allocate(ResourceKind::Geometry)
    }

    fn create_material(&mut self, material: &Material) -> GpuHandle {
        trace!("Uploading material {}", material.name);
        self.ledger.allocate(ResourceKind::Material)
    }

    fn create_texture(&mut self, texture: &Texture) -> GpuHandle {
        trace!("Uploading texture {} {:?}", texture.name, texture.dimensions());
        self.ledger.allocate(ResourceKind::Texture)
    }

    fn release_geometry(&mut self, handle: GpuHandle) {
        self.ledger.release(handle, ResourceKind::Geometry);
    }

    fn release_material(&mut self, handle: GpuHandle) {
        self.ledger.release(handle, ResourceKind::Material);
    }

    fn release_texture(&mut self, handle: GpuHandle) {
        self.ledger.release(handle, ResourceKind::Texture);
    }

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), ViewerError> {
        if self.disposed {
            return Err(ViewerError::SessionDisposed);
        }

        self.clear();
        let view_proj = camera.view_projection();
        let lights = FrameLights::collect(scene);

        let mut triangles = Vec::new();
        scene.traverse(|_, node, world| {
            let NodeKind::Mesh(mesh) = &node.kind else {
                return;
            };
            for (index, [a, b, c]) in mesh.geometry.triangles() {
                let (a, b, c) = (a + world, b + world, c + world);
                let centroid = (a + b + c) / 3.0;

                let mut normal = (b - a).cross(c - a).normalize_or_zero();
                if normal.dot(camera.position - centroid) < 0.0 {
                    normal = -normal;
                }

                let base = mesh
                    .material
                    .get(mesh.geometry.material_index_for(index))
                    .map(|m| Vec3::new(m.color[0], m.color[1], m.color[2]))
                    .unwrap_or(Vec3::splat(0.8));
                let shaded = lights.shade(base, normal, centroid);
                let rgba = Rgba([
                    (shaded.x * 255.0) as u8,
                    (shaded.y * 255.0) as u8,
                    (shaded.z * 255.0) as u8,
                    0xff,
                ]);
                triangles.push(([a, b, c], rgba));
            }
        });

        for (world, rgba) in triangles {
            self.draw_triangle(&view_proj, world, rgba);
        }

        self.frames += 1;
        Ok(())
    }

    fn frames_rendered(&self) -> u64 {
        self.frames
    }

    fn snapshot(&self) -> Option<RgbaImage> {
        Some(self.color.clone())
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.color = RgbaImage::new(1, 1);
        self.depth = Vec::new();
        self.ledger.renderer_disposed();
        debug!("Software renderer {} disposed", self.element);
    }
}

/// Creates [`SoftwareRenderer`]s that share one ledger
#[derive(Debug, Clone)]
pub struct SoftwareRendererFactory {
    ledger: Arc<ResourceLedger>,
    background: [u8; 4],
}

impl SoftwareRendererFactory {
    pub fn new(background: [u8; 4]) -> Self {
        Self {
            ledger: Arc::new(ResourceLedger::new()),
            background,
        }
    }

    pub fn ledger(&self) -> Arc<ResourceLedger> {
        Arc::clone(&self.ledger)
    }
}

impl Default for SoftwareRendererFactory {
    fn default() -> Self {
        Self::new([0xf0, 0xf0, 0xf0, 0xff])
    }
}

impl RendererFactory for SoftwareRendererFactory {
    fn create(&self, width: u32, height: u32) -> Result<Box<dyn RenderBackend>, ViewerError> {
        if width == 0 || height == 0 {
            return Err(ViewerError::RenderContextUnavailable {
                reason: format!("surface is {}x{}", width, height),
            });
        }
        Ok(Box::new(
            SoftwareRenderer::new(width, height, Arc::clone(&self.ledger))
                .with_background(self.background),
        ))
    }
}
