use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use glam::Vec3;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::{oneshot, watch};
use topokit_core::{EventBus, ViewerError};
use topokit_settings::ViewerSettings;
use topokit_viewer::{
    HostSurface, LoadState, ModelViewer, RenderBackend, SoftwareRendererFactory, Surface,
    ViewerStatus, ViewportSession,
};

const UNSUPPORTED: &str = "Unsupported model format. Please use .gltf, .glb, or .obj.";

/// Axis-aligned box OBJ of edge `size`, with its minimum corner at `origin`
fn box_obj(size: f32, origin: Vec3) -> String {
    let mut obj = String::from("o box\n");
    for corner in 0..8 {
        let x = origin.x + if corner & 1 != 0 { size } else { 0.0 };
        let y = origin.y + if corner & 2 != 0 { size } else { 0.0 };
        let z = origin.z + if corner & 4 != 0 { size } else { 0.0 };
        obj.push_str(&format!("v {x} {y} {z}\n"));
    }
    for face in [
        "1 2 4 3", "5 7 8 6", "1 5 6 2", "3 4 8 7", "1 3 7 5", "2 6 8 4",
    ] {
        obj.push_str(&format!("f {face}\n"));
    }
    obj
}

fn write_model(dir: &Path, name: &str, contents: &str) -> String {
    let path: PathBuf = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path.to_string_lossy().into_owned()
}

fn settings() -> ViewerSettings {
    ViewerSettings {
        frame_interval_ms: 2,
        ..Default::default()
    }
}

struct Harness {
    surface: Arc<HostSurface>,
    factory: SoftwareRendererFactory,
    bus: Arc<EventBus>,
}

impl Harness {
    fn new(width: u32, height: u32) -> Self {
        Self {
            surface: Arc::new(HostSurface::new(width, height)),
            factory: SoftwareRendererFactory::default(),
            bus: Arc::new(EventBus::new()),
        }
    }

    fn viewer(&self) -> ModelViewer {
        ModelViewer::new(
            self.surface.clone(),
            Arc::new(self.factory.clone()),
            settings(),
            Arc::clone(&self.bus),
        )
    }

    fn session(&self) -> (Arc<ViewportSession>, watch::Receiver<ViewerStatus>) {
        let (status, rx) = watch::channel(ViewerStatus::default());
        let session = ViewportSession::mount(
            self.surface.clone(),
            &self.factory,
            &settings(),
            Arc::clone(&self.bus),
            Arc::new(status),
        )
        .unwrap();
        (session, rx)
    }
}

#[tokio::test]
async fn test_obj_in_200_square_surface() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_model(dir.path(), "model.obj", &box_obj(2.0, Vec3::ZERO));
    let harness = Harness::new(200, 200);
    let mut viewer = harness.viewer();

    let mut rx = viewer.watch_status();
    rx.borrow_and_update();
    let observe = async move {
        let mut seen = Vec::new();
        while rx.changed().await.is_ok() {
            let status = rx.borrow_and_update().clone();
            let terminal = matches!(status.load_state, LoadState::Loaded | LoadState::Errored);
            seen.push(status);
            if terminal {
                break;
            }
        }
        seen
    };

    let (result, seen) = tokio::join!(viewer.show(Some(path.as_str())), observe);
    result.unwrap();

    assert!(seen.iter().any(ViewerStatus::is_loading));
    let status = viewer.status();
    assert!(!status.is_loading());
    assert_eq!(status.error, None);
    assert_eq!(status.load_state, LoadState::Loaded);

    let session = viewer.session().unwrap();
    assert!(session.camera().position.z > 0.1);
    assert_eq!(session.triangle_count(), 12);
}

#[tokio::test]
async fn test_unsupported_extension_leaves_scene_untouched() {
    let harness = Harness::new(200, 200);
    let (session, rx) = harness.session();
    let revision = session.scene_revision();
    let camera = session.camera();

    let err = session.load("model.xyz").await.unwrap_err();

    assert_eq!(err.to_string(), UNSUPPORTED);
    assert_eq!(session.scene_revision(), revision);
    assert_eq!(session.camera(), camera);
    let status = rx.borrow().clone();
    assert_eq!(status.error.as_deref(), Some(UNSUPPORTED));
    assert!(!status.is_loading());
}

#[tokio::test]
async fn test_viewer_reports_unsupported_format() {
    let harness = Harness::new(200, 200);
    let mut viewer = harness.viewer();

    assert!(viewer.show(Some("model.xyz")).await.is_err());
    let status = viewer.status();
    assert_eq!(status.error.as_deref(), Some(UNSUPPORTED));
    assert!(!status.is_loading());
    assert_eq!(viewer.session().unwrap().triangle_count(), 0);
}

#[tokio::test]
async fn test_asset_is_centered_and_framed() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_model(dir.path(), "offset.obj", &box_obj(4.0, Vec3::new(10.0, 2.0, -6.0)));
    let harness = Harness::new(200, 200);
    let (session, _rx) = harness.session();

    session.load(&path).await.unwrap();

    let bounds = session.asset_bounds().unwrap();
    assert!(bounds.center().length() < 1e-4);
    assert_eq!(session.controls_target(), Vec3::ZERO);
    let camera = session.camera();
    assert_eq!(camera.target, Vec3::ZERO);
    assert_eq!(camera.position.x, 0.0);
    assert_eq!(camera.position.y, 0.0);
}

#[tokio::test]
async fn test_camera_distance_grows_with_extent() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::new(320, 200);
    let mut viewer = harness.viewer();

    let mut last = 0.0;
    for (i, size) in [0.25, 1.0, 3.0, 40.0].into_iter().enumerate() {
        let path = write_model(dir.path(), &format!("box{i}.obj"), &box_obj(size, Vec3::ZERO));
        viewer.show(Some(path.as_str())).await.unwrap();

        let distance = viewer.session().unwrap().camera().position.z;
        assert!(distance > 0.0);
        assert!(distance > last, "{distance} should exceed {last}");
        last = distance;
    }
}

#[tokio::test]
async fn test_failed_load_keeps_previous_asset() {
    let dir = tempfile::tempdir().unwrap();
    let good = write_model(dir.path(), "good.obj", &box_obj(1.0, Vec3::ZERO));
    let missing = dir.path().join("missing.glb").to_string_lossy().into_owned();
    let harness = Harness::new(200, 200);
    let (session, rx) = harness.session();

    session.load(&good).await.unwrap();
    let camera = session.camera();

    let err = session.load(&missing).await.unwrap_err();
    assert!(matches!(err, ViewerError::LoadFailed { .. }));

    let status = rx.borrow().clone();
    assert_eq!(status.load_state, LoadState::Errored);
    let message = status.error.unwrap();
    assert!(message.starts_with(&format!("Error loading model {missing}: ")));
    assert_eq!(session.triangle_count(), 12);
    assert_eq!(session.camera(), camera);
}

#[tokio::test]
async fn test_teardown_twice_releases_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_model(dir.path(), "model.obj", &box_obj(1.0, Vec3::ZERO));
    let harness = Harness::new(200, 200);
    let ledger = harness.factory.ledger();
    let (session, _rx) = harness.session();

    session.load(&path).await.unwrap();
    session.render_frame();
    assert!(ledger.stats().live_total() > 0);

    assert!(session.teardown());
    assert!(!session.teardown());

    let stats = ledger.stats();
    assert_eq!(stats.live_total(), 0);
    assert_eq!(stats.invalid_releases, 0);
    assert_eq!(stats.created, stats.released);
    assert_eq!(stats.live_renderers(), 0);
    assert!(harness.surface.children().is_empty());
}

#[tokio::test]
async fn test_no_frames_after_teardown() {
    let harness = Harness::new(64, 64);
    let (session, _rx) = harness.session();

    session.start_render_loop();
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert!(session.frames_rendered() > 0);

    session.teardown();
    let frames = session.frames_rendered();
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert_eq!(session.frames_rendered(), frames);
}

#[tokio::test]
async fn test_rendering_context_unavailable() {
    let surface = Arc::new(HostSurface::new(200, 200));
    let factory = |_w: u32, _h: u32| -> Result<Box<dyn RenderBackend>, ViewerError> {
        Err(ViewerError::RenderContextUnavailable {
            reason: "WebGL not supported".to_string(),
        })
    };
    let mut viewer = ModelViewer::new(
        surface.clone(),
        Arc::new(factory),
        settings(),
        Arc::new(EventBus::new()),
    );

    assert!(viewer.show(Some("model.obj")).await.is_err());
    let status = viewer.status();
    assert!(!status.is_loading());
    assert_eq!(
        status.error.as_deref(),
        Some("Error creating rendering context: WebGL not supported")
    );
    assert!(viewer.session().is_none());
    assert!(surface.children().is_empty());
}

#[tokio::test]
async fn test_replacement_never_shares_surface() {
    let dir = tempfile::tempdir().unwrap();
    let first = write_model(dir.path(), "a.obj", &box_obj(1.0, Vec3::ZERO));
    let second = write_model(dir.path(), "b.obj", &box_obj(2.0, Vec3::ZERO));
    let harness = Harness::new(200, 200);
    let ledger = harness.factory.ledger();
    let mut viewer = harness.viewer();

    viewer.show(Some(first.as_str())).await.unwrap();
    let first_id = viewer.session().unwrap().id().to_string();
    tokio::time::sleep(Duration::from_millis(10)).await;

    viewer.show(Some(second.as_str())).await.unwrap();
    harness.surface.resize(300, 150, &harness.bus);
    viewer.show(Some(second.as_str())).await.unwrap();

    assert_ne!(viewer.session().unwrap().id(), first_id);
    assert_eq!(harness.surface.peak_children(), 1);
    assert_eq!(harness.surface.children().len(), 1);

    let stats = ledger.stats();
    assert_eq!(stats.renderers_created, 3);
    assert_eq!(stats.live_renderers(), 1);
    assert_eq!(stats.invalid_releases, 0);
}

#[tokio::test]
async fn test_resize_event_updates_aspect() {
    let harness = Harness::new(200, 200);
    let (session, _rx) = harness.session();
    let fov = session.camera().fov;

    harness.surface.resize(400, 200, &harness.bus);

    let camera = session.camera();
    assert_eq!(camera.aspect, 2.0);
    assert_eq!(camera.fov, fov);
    assert_eq!(harness.surface.size(), (400, 200));

    session.teardown();
    assert_eq!(harness.bus.subscriber_count(), 0);
    harness.surface.resize(100, 400, &harness.bus);
    assert_eq!(session.camera().aspect, 2.0);
}

#[tokio::test]
async fn test_load_finishing_after_teardown_is_dropped() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/model.obj", listener.local_addr().unwrap());
    let (accepted_tx, accepted_rx) = oneshot::channel();
    let (release_tx, release_rx) = oneshot::channel::<()>();

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 1024];
        let _ = socket.read(&mut buf).await.unwrap();
        accepted_tx.send(()).unwrap();
        release_rx.await.ok();

        let body = box_obj(1.0, Vec3::ZERO);
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
    });

    let harness = Harness::new(200, 200);
    let ledger = harness.factory.ledger();
    let (session, rx) = harness.session();
    let loading = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.load(&url).await })
    };

    accepted_rx.await.unwrap();
    assert!(rx.borrow().is_loading());
    assert!(session.teardown());
    release_tx.send(()).unwrap();

    let result = loading.await.unwrap();
    assert_eq!(result, Err(ViewerError::SessionDisposed));
    assert_eq!(session.triangle_count(), 0);
    assert_eq!(ledger.stats().live_total(), 0);
    server.await.unwrap();
}
