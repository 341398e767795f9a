//! Renderer backends
//!
//! A backend owns the rendering context bound to one surface and the GPU-side
//! copies of scene resources. Backends report every allocation and release to
//! a shared [`ResourceLedger`], which makes leaks and double releases
//! observable after the backend itself is gone.

mod software;

pub use software::{SoftwareRenderer, SoftwareRendererFactory};

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use image::RgbaImage;
use parking_lot::Mutex;
use topokit_core::ViewerError;
use tracing::warn;

use crate::camera::PerspectiveCamera;
use crate::scene::{Geometry, Material, Scene, Texture};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Handle to a backend-side resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GpuHandle(u64);

impl GpuHandle {
    pub fn new() -> Self {
        Self(next_id())
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for GpuHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// The element a renderer draws into, attached to the host surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputElement(u64);

impl OutputElement {
    pub fn new() -> Self {
        Self(next_id())
    }
}

impl Default for OutputElement {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OutputElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "canvas#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Geometry,
    Material,
    Texture,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Geometry => write!(f, "geometry"),
            Self::Material => write!(f, "material"),
            Self::Texture => write!(f, "texture"),
        }
    }
}

/// Snapshot of a ledger
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceStats {
    pub live_geometries: usize,
    pub live_materials: usize,
    pub live_textures: usize,
    pub created: usize,
    pub released: usize,
    /// Releases of handles that were unknown or already released
    pub invalid_releases: usize,
    pub renderers_created: usize,
    pub renderers_disposed: usize,
}

impl ResourceStats {
    pub fn live_total(&self) -> usize {
        self.live_geometries + self.live_materials + self.live_textures
    }

    pub fn live_renderers(&self) -> usize {
        self.renderers_created.saturating_sub(self.renderers_disposed)
    }
}

#[derive(Debug, Default)]
struct LedgerState {
    live: HashMap<GpuHandle, ResourceKind>,
    created: usize,
    released: usize,
    invalid_releases: usize,
    renderers_created: usize,
    renderers_disposed: usize,
}

/// Allocation bookkeeping shared between a factory and its renderers
#[derive(Debug, Default)]
pub struct ResourceLedger {
    state: Mutex<LedgerState>,
}

impl ResourceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&self, kind: ResourceKind) -> GpuHandle {
        let handle = GpuHandle::new();
        let mut state = self.state.lock();
        state.live.insert(handle, kind);
        state.created += 1;
        handle
    }

    /// Returns false if the handle was not live as `kind`
    pub fn release(&self, handle: GpuHandle, kind: ResourceKind) -> bool {
        let mut state = self.state.lock();
        match state.live.get(&handle) {
            Some(live_kind) if *live_kind == kind => {
                state.live.remove(&handle);
                state.released += 1;
                true
            }
            _ => {
                state.invalid_releases += 1;
                warn!("Release of unknown {} handle {}", kind, handle.raw());
                false
            }
        }
    }

    pub fn renderer_created(&self) {
        self.state.lock().renderers_created += 1;
    }

    pub fn renderer_disposed(&self) {
        self.state.lock().renderers_disposed += 1;
    }

    pub fn stats(&self) -> ResourceStats {
        let state = self.state.lock();
        let count = |kind| state.live.values().filter(|k| **k == kind).count();
        ResourceStats {
            live_geometries: count(ResourceKind::Geometry),
            live_materials: count(ResourceKind::Material),
            live_textures: count(ResourceKind::Texture),
            created: state.created,
            released: state.released,
            invalid_releases: state.invalid_releases,
            renderers_created: state.renderers_created,
            renderers_disposed: state.renderers_disposed,
        }
    }
}

/// A rendering context bound to one surface
pub trait RenderBackend: Send {
    fn name(&self) -> &str;

    /// Element to attach to the host surface
    fn output_element(&self) -> OutputElement;

    /// Resize the drawing buffer, in CSS pixels
    fn set_size(&mut self, width: u32, height: u32);

    fn set_pixel_ratio(&mut self, ratio: f32);

    fn create_geometry(&mut self, geometry: &Geometry) -> GpuHandle;
    fn create_material(&mut self, material: &Material) -> GpuHandle;
    fn create_texture(&mut self, texture: &Texture) -> GpuHandle;

    fn release_geometry(&mut self, handle: GpuHandle);
    fn release_material(&mut self, handle: GpuHandle);
    fn release_texture(&mut self, handle: GpuHandle);

    /// Draw one frame
    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), ViewerError>;

    /// Frames drawn so far
    fn frames_rendered(&self) -> u64;

    /// Copy of the last frame, if the backend can read it back
    fn snapshot(&self) -> Option<RgbaImage> {
        None
    }

    /// Release the rendering context; later renders fail
    fn dispose(&mut self);
}

/// Creates renderers for a surface
///
/// Failure here is the "rendering context unavailable" condition.
pub trait RendererFactory: Send + Sync {
    fn create(&self, width: u32, height: u32) -> Result<Box<dyn RenderBackend>, ViewerError>;
}

impl<F> RendererFactory for F
where
    F: Fn(u32, u32) -> Result<Box<dyn RenderBackend>, ViewerError> + Send + Sync,
{
    fn create(&self, width: u32, height: u32) -> Result<Box<dyn RenderBackend>, ViewerError> {
        self(width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_counts_live_resources() {
        let ledger = ResourceLedger::new();
        let geometry = ledger.allocate(ResourceKind::Geometry);
        let texture = ledger.allocate(ResourceKind::Texture);
        assert_eq!(ledger.stats().live_total(), 2);

        assert!(ledger.release(geometry, ResourceKind::Geometry));
        assert!(ledger.release(texture, ResourceKind::Texture));
        let stats = ledger.stats();
        assert_eq!(stats.live_total(), 0);
        assert_eq!(stats.released, 2);
        assert_eq!(stats.invalid_releases, 0);
    }

    #[test]
    fn test_double_release_is_counted() {
        let ledger = ResourceLedger::new();
        let handle = ledger.allocate(ResourceKind::Material);
        assert!(ledger.release(handle, ResourceKind::Material));
        assert!(!ledger.release(handle, ResourceKind::Material));
        assert_eq!(ledger.stats().invalid_releases, 1);
    }

    #[test]
    fn test_kind_mismatch_is_invalid() {
        let ledger = ResourceLedger::new();
        let handle = ledger.allocate(ResourceKind::Geometry);
        assert!(!ledger.release(handle, ResourceKind::Texture));
        assert_eq!(ledger.stats().live_geometries, 1);
    }

    #[test]
    fn test_closure_factory() {
        let factory = |_w: u32, _h: u32| -> Result<Box<dyn RenderBackend>, ViewerError> {
            Err(ViewerError::RenderContextUnavailable {
                reason: "no GPU adapter".to_string(),
            })
        };
        let err = factory.create(200, 200).err().unwrap();
        assert_eq!(
            err.to_string(),
            "Error creating rendering context: no GPU adapter"
        );
    }
}
