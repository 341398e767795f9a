//! # TopoKit Viewer
//!
//! Interactive 3D viewport for `.gltf`, `.glb` and `.obj` assets.
//!
//! A [`ViewportSession`] exclusively owns one scene graph, camera, set of
//! orbit controls and renderer bound to a host [`Surface`]. Sessions are
//! created on mount, fitted to the loaded asset, driven by a cancellable
//! render loop and torn down explicitly, releasing every geometry, material
//! and texture they uploaded. [`ModelViewer`] is the component that replaces
//! sessions when its asset or surface size changes.

pub mod backend;
pub mod camera;
pub mod controls;
pub mod loader;
pub mod render_loop;
pub mod scene;
pub mod session;
pub mod surface;
pub mod viewer;

pub use backend::{
    GpuHandle, OutputElement, RenderBackend, RendererFactory, ResourceKind, ResourceLedger,
    ResourceStats, SoftwareRenderer, SoftwareRendererFactory,
};
pub use camera::{fit_distance, PerspectiveCamera, FIT_MARGIN};
pub use controls::OrbitControls;
pub use loader::{load_asset, ModelAsset, ModelFormat, ModelPart};
pub use render_loop::{spawn_render_loop, FrameControl};
pub use scene::{
    Aabb, Geometry, GeometryGroup, Light, LightKind, Material, MaterialSlot, Mesh, Node, NodeId,
    NodeKind, ReleaseSummary, Scene, Texture, TextureMaps,
};
pub use session::{LoadState, ViewerStatus, ViewportSession};
pub use surface::{HostSurface, Surface};
pub use viewer::ModelViewer;
