//! Viewport sessions
//!
//! A session is created when a viewer mounts onto a surface and lives until
//! [`ViewportSession::teardown`]. It exclusively owns its scene, camera,
//! controls and renderer. All mutation happens under one lock; the liveness
//! flag is checked before and after taking it, so nothing a session does can
//! touch the scene, the renderer or the shared status once teardown began.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use glam::Vec3;
use image::RgbaImage;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use topokit_core::{
    AppEvent, EventBus, EventCategory, EventFilter, SubscriptionId, ViewerError, ViewerEvent,
    WindowEvent,
};
use topokit_settings::ViewerSettings;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::backend::{OutputElement, RenderBackend, RendererFactory};
use crate::camera::PerspectiveCamera;
use crate::controls::OrbitControls;
use crate::loader::{load_asset, ModelFormat};
use crate::render_loop::{spawn_render_loop, FrameControl};
use crate::scene::{release_node, Aabb, Light, Node, NodeId, ReleaseSummary, Scene};
use crate::surface::Surface;

/// Asset loading state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Loaded,
    Errored,
}

/// What the viewer shows besides the canvas
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewerStatus {
    pub load_state: LoadState,
    /// Message for the error panel
    pub error: Option<String>,
}

impl ViewerStatus {
    pub fn loading() -> Self {
        Self {
            load_state: LoadState::Loading,
            error: None,
        }
    }

    pub fn loaded() -> Self {
        Self {
            load_state: LoadState::Loaded,
            error: None,
        }
    }

    pub fn errored(error: &ViewerError) -> Self {
        Self {
            load_state: LoadState::Errored,
            error: Some(error.to_string()),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.load_state == LoadState::Loading
    }
}

struct SessionState {
    scene: Scene,
    camera: PerspectiveCamera,
    controls: OrbitControls,
    renderer: Option<Box<dyn RenderBackend>>,
    element: Option<OutputElement>,
    asset_root: Option<NodeId>,
    frames: u64,
}

/// One mounted viewport
pub struct ViewportSession {
    id: String,
    live: Arc<AtomicBool>,
    state: Arc<Mutex<SessionState>>,
    surface: Arc<dyn Surface>,
    bus: Arc<EventBus>,
    status: Arc<watch::Sender<ViewerStatus>>,
    resize_subscription: Mutex<Option<SubscriptionId>>,
    render_task: Mutex<Option<JoinHandle<()>>>,
    frame_interval: Duration,
}

impl ViewportSession {
    /// Build the scene, camera, renderer, controls and lights for `surface`
    ///
    /// The renderer's output element is attached to the surface and a resize
    /// listener is registered on `bus`. The render loop is not started.
    pub fn mount(
        surface: Arc<dyn Surface>,
        factory: &dyn RendererFactory,
        settings: &ViewerSettings,
        bus: Arc<EventBus>,
        status: Arc<watch::Sender<ViewerStatus>>,
    ) -> Result<Arc<Self>, ViewerError> {
        let (width, height) = surface.size();
        if width == 0 || height == 0 {
            return Err(ViewerError::InvalidSurface { width, height });
        }

        let mut renderer = factory.create(width, height)?;
        renderer.set_pixel_ratio(settings.pixel_ratio);
        renderer.set_size(width, height);
        let element = renderer.output_element();
        surface.attach(element);

        let mut scene = Scene::new();
        let root = scene.root();
        scene.add(root, Node::light("ambient", Light::ambient(0x404040, 1.0)));
        scene.add(
            root,
            Node::light("point", Light::point(0xffffff, 1.0)).at(Vec3::new(5.0, 5.0, 5.0)),
        );

        let id = Uuid::new_v4().to_string();
        let live = Arc::new(AtomicBool::new(true));
        let state = Arc::new(Mutex::new(SessionState {
            scene,
            camera: PerspectiveCamera::for_surface(settings, width, height),
            controls: OrbitControls::from_settings(settings),
            renderer: Some(renderer),
            element: Some(element),
            asset_root: None,
            frames: 0,
        }));

        let subscription = {
            let weak: Weak<Mutex<SessionState>> = Arc::downgrade(&state);
            let live = Arc::clone(&live);
            bus.subscribe(
                EventFilter::Categories(vec![EventCategory::Window]),
                move |event| {
                    let AppEvent::Window(WindowEvent::Resized { width, height }) = event else {
                        return;
                    };
                    if !live.load(Ordering::SeqCst) {
                        return;
                    }
                    if let Some(state) = weak.upgrade() {
                        apply_resize(&mut state.lock(), width, height);
                    }
                },
            )
        };

        debug!("Viewport session {} mounted at {}x{}", id, width, height);
        Ok(Arc::new(Self {
            id,
            live,
            state,
            surface,
            bus,
            status,
            resize_subscription: Mutex::new(Some(subscription)),
            render_task: Mutex::new(None),
            frame_interval: Duration::from_millis(settings.frame_interval_ms),
        }))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    /// Start the per-frame task; a second call is a no-op
    ///
    /// The task holds only a weak reference and stops on the first frame
    /// after teardown.
    pub fn start_render_loop(self: &Arc<Self>) {
        if !self.is_live() {
            return;
        }
        let mut task = self.render_task.lock();
        if task.is_some() {
            return;
        }
        let weak = Arc::downgrade(self);
        *task = Some(spawn_render_loop(self.frame_interval, move || {
            match weak.upgrade() {
                Some(session) => session.render_frame(),
                None => FrameControl::Stop,
            }
        }));
    }

    /// Update controls and draw one frame
    pub fn render_frame(&self) -> FrameControl {
        if !self.is_live() {
            return FrameControl::Stop;
        }
        let mut guard = self.state.lock();
        if !self.is_live() {
            return FrameControl::Stop;
        }

        let state = &mut *guard;
        let Some(renderer) = state.renderer.as_mut() else {
            return FrameControl::Stop;
        };
        state.controls.update(&mut state.camera);
        state.scene.prepare(renderer.as_mut());
        match renderer.render(&state.scene, &state.camera) {
            Ok(()) => {
                state.frames += 1;
                FrameControl::Continue
            }
            Err(e) => {
                error!("Viewport session {} stopped rendering: {}", self.id, e);
                FrameControl::Stop
            }
        }
    }

    /// Apply a new surface size; the field of view is unchanged
    pub fn resize(&self, width: u32, height: u32) {
        if !self.is_live() {
            return;
        }
        let mut state = self.state.lock();
        if self.is_live() {
            apply_resize(&mut state, width, height);
        }
    }

    /// Load an asset, replacing the current one on success
    ///
    /// The outcome is also written to the shared status. Unsupported formats
    /// are rejected before any I/O. A failed load keeps the previous asset.
    /// If the session is torn down while the asset is in flight, the result
    /// is dropped and nothing is written.
    pub async fn load(&self, source: &str) -> Result<(), ViewerError> {
        if !self.is_live() {
            return Err(ViewerError::SessionDisposed);
        }
        if let Err(e) = ModelFormat::from_path(source) {
            warn!("Rejected model {}: {}", source, e);
            self.set_status(ViewerStatus::errored(&e));
            return Err(e);
        }

        self.set_status(ViewerStatus::loading());
        let result = load_asset(source).await;

        if !self.is_live() {
            debug!("Dropping load of {} for disposed session {}", source, self.id);
            return Err(ViewerError::SessionDisposed);
        }

        let asset = match result {
            Ok(asset) => asset,
            Err(e) => {
                error!("{}", e);
                self.set_status(ViewerStatus::errored(&e));
                self.bus
                    .publish(AppEvent::Viewer(ViewerEvent::ModelFailed {
                        path: source.to_string(),
                        error: e.to_string(),
                    }))
                    .ok();
                return Err(e);
            }
        };

        let triangles = asset.triangle_count();
        {
            let mut guard = self.state.lock();
            if !self.is_live() {
                return Err(ViewerError::SessionDisposed);
            }
            let state = &mut *guard;

            if let Some(previous) = state.asset_root.take() {
                let mut summary = ReleaseSummary::default();
                if let Some(renderer) = state.renderer.as_mut() {
                    for mut node in state.scene.remove(previous) {
                        summary.add(release_node(&mut node, renderer.as_mut()));
                    }
                }
                debug!("Released {} resources of previous asset", summary.total());
            }

            let bounds = asset.bounds();
            let center = bounds.center();
            let root = state.scene.root();
            let group = state.scene.add(root, Node::group(asset.source.clone()).at(-center));
            for part in asset.parts {
                state.scene.add(group, Node::mesh(part.name, part.mesh));
            }
            state.asset_root = Some(group);

            let distance = state.camera.frame(Vec3::ZERO, bounds.size());
            state.controls.target = Vec3::ZERO;
            debug!(
                "Framed {} at distance {:.3} (extent {:?})",
                source,
                distance,
                bounds.size()
            );
        }

        self.set_status(ViewerStatus::loaded());
        self.bus
            .publish(AppEvent::Viewer(ViewerEvent::ModelLoaded {
                path: source.to_string(),
                triangles,
            }))
            .ok();
        Ok(())
    }

    /// Release everything the session owns
    ///
    /// Steps run in a fixed order: stop rendering, drop the resize listener,
    /// release scene resources, dispose the controls, then detach and
    /// dispose the renderer. Returns false when already torn down.
    pub fn teardown(&self) -> bool {
        if !self.live.swap(false, Ordering::SeqCst) {
            return false;
        }
        if let Some(task) = self.render_task.lock().take() {
            task.abort();
        }

        if let Some(subscription) = self.resize_subscription.lock().take() {
            self.bus.unsubscribe(subscription);
        }

        {
            let mut guard = self.state.lock();
            let state = &mut *guard;

            if let Some(renderer) = state.renderer.as_mut() {
                let summary = state.scene.release_resources(renderer.as_mut());
                debug!(
                    "Session {} released {} geometries, {} materials, {} textures",
                    self.id, summary.geometries, summary.materials, summary.textures
                );
            }

            state.controls.dispose();

            if let Some(element) = state.element.take() {
                if !self.surface.detach(element) {
                    warn!("Output element {} was not attached", element);
                }
            }
            if let Some(mut renderer) = state.renderer.take() {
                renderer.dispose();
            }
        }

        self.bus
            .publish(AppEvent::Viewer(ViewerEvent::SessionDisposed {
                session: self.id.clone(),
            }))
            .ok();
        info!("Viewport session {} torn down", self.id);
        true
    }

    pub fn camera(&self) -> PerspectiveCamera {
        self.state.lock().camera
    }

    pub fn controls_target(&self) -> Vec3 {
        self.state.lock().controls.target
    }

    /// Incremented on every scene graph change
    pub fn scene_revision(&self) -> u64 {
        self.state.lock().scene.revision()
    }

    /// World-space bounds of the loaded asset
    pub fn asset_bounds(&self) -> Option<Aabb> {
        let state = self.state.lock();
        state.asset_root.map(|root| state.scene.bounds_of(root))
    }

    pub fn triangle_count(&self) -> usize {
        self.state.lock().scene.triangle_count()
    }

    /// Frames drawn by this session
    pub fn frames_rendered(&self) -> u64 {
        self.state.lock().frames
    }

    /// Copy of the last drawn frame, if the renderer supports read-back
    pub fn snapshot(&self) -> Option<RgbaImage> {
        self.state.lock().renderer.as_ref().and_then(|r| r.snapshot())
    }

    fn set_status(&self, status: ViewerStatus) {
        if self.is_live() {
            self.status.send_replace(status);
        }
    }
}

fn apply_resize(state: &mut SessionState, width: u32, height: u32) {
    if width == 0 || height == 0 {
        return;
    }
    state.camera.update_aspect_ratio(width, height);
    if let Some(renderer) = state.renderer.as_mut() {
        renderer.set_size(width, height);
    }
    debug!("Viewport resized to {}x{}", width, height);
}

impl Drop for ViewportSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for ViewportSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewportSession")
            .field("id", &self.id)
            .field("live", &self.is_live())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SoftwareRendererFactory;
    use crate::surface::HostSurface;

    fn mount(factory: &SoftwareRendererFactory) -> (Arc<HostSurface>, Arc<ViewportSession>) {
        let surface = Arc::new(HostSurface::new(200, 200));
        let (status, _) = watch::channel(ViewerStatus::default());
        let session = ViewportSession::mount(
            surface.clone(),
            factory,
            &ViewerSettings::default(),
            Arc::new(EventBus::new()),
            Arc::new(status),
        )
        .unwrap();
        (surface, session)
    }

    #[test]
    fn test_mount_attaches_and_lights_scene() {
        let factory = SoftwareRendererFactory::default();
        let (surface, session) = mount(&factory);

        assert!(session.is_live());
        assert_eq!(surface.children().len(), 1);
        let camera = session.camera();
        assert_eq!(camera.fov, 75.0);
        assert_eq!(camera.aspect, 1.0);
        assert_eq!(factory.ledger().stats().live_renderers(), 1);
    }

    #[test]
    fn test_zero_surface_is_rejected() {
        let factory = SoftwareRendererFactory::default();
        let (status, _) = watch::channel(ViewerStatus::default());
        let err = ViewportSession::mount(
            Arc::new(HostSurface::new(0, 200)),
            &factory,
            &ViewerSettings::default(),
            Arc::new(EventBus::new()),
            Arc::new(status),
        )
        .unwrap_err();
        assert_eq!(err, ViewerError::InvalidSurface { width: 0, height: 200 });
        assert_eq!(factory.ledger().stats().renderers_created, 0);
    }

    #[test]
    fn test_teardown_detaches_and_disposes() {
        let factory = SoftwareRendererFactory::default();
        let (surface, session) = mount(&factory);
        assert_eq!(session.render_frame(), FrameControl::Continue);

        assert!(session.teardown());
        assert!(!session.teardown());
        assert!(surface.children().is_empty());
        assert_eq!(session.render_frame(), FrameControl::Stop);

        let stats = factory.ledger().stats();
        assert_eq!(stats.live_renderers(), 0);
        assert_eq!(stats.invalid_releases, 0);
    }

    #[test]
    fn test_drop_tears_down() {
        let factory = SoftwareRendererFactory::default();
        let (surface, session) = mount(&factory);
        drop(session);
        assert!(surface.children().is_empty());
        assert_eq!(factory.ledger().stats().live_renderers(), 0);
    }
}
