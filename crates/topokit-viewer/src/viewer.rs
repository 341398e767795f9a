//! Model viewer component
//!
//! Owns at most one [`ViewportSession`] at a time. A change of asset or
//! surface size tears the current session down completely before the next
//! one mounts, so two sessions never draw into the same surface.

use std::sync::Arc;

use tokio::sync::watch;
use topokit_core::{EventBus, ViewerError};
use topokit_settings::ViewerSettings;
use tracing::{debug, warn};

use crate::backend::RendererFactory;
use crate::session::{ViewerStatus, ViewportSession};
use crate::surface::Surface;

pub struct ModelViewer {
    surface: Arc<dyn Surface>,
    factory: Arc<dyn RendererFactory>,
    settings: ViewerSettings,
    bus: Arc<EventBus>,
    status: Arc<watch::Sender<ViewerStatus>>,
    session: Option<Arc<ViewportSession>>,
    model_src: Option<String>,
    size: (u32, u32),
}

impl ModelViewer {
    pub fn new(
        surface: Arc<dyn Surface>,
        factory: Arc<dyn RendererFactory>,
        settings: ViewerSettings,
        bus: Arc<EventBus>,
    ) -> Self {
        let (status, _) = watch::channel(ViewerStatus::default());
        Self {
            surface,
            factory,
            settings,
            bus,
            status: Arc::new(status),
            session: None,
            model_src: None,
            size: (0, 0),
        }
    }

    /// Show `model_src` on the surface at its current size
    ///
    /// Does nothing when neither the asset nor the surface size changed.
    /// Otherwise the previous session is torn down, a new one is mounted and
    /// its render loop started, and the asset (if any) is loaded. Failures
    /// end up in [`status`](Self::status) and are also returned.
    pub async fn show(&mut self, model_src: Option<&str>) -> Result<(), ViewerError> {
        let size = self.surface.size();
        let unchanged = self.session.is_some()
            && self.model_src.as_deref() == model_src
            && self.size == size;
        if unchanged {
            debug!("Viewer inputs unchanged, keeping session");
            return Ok(());
        }

        self.unmount();
        self.model_src = model_src.map(str::to_string);
        self.size = size;
        self.status.send_replace(ViewerStatus::default());

        let session = match ViewportSession::mount(
            Arc::clone(&self.surface),
            self.factory.as_ref(),
            &self.settings,
            Arc::clone(&self.bus),
            Arc::clone(&self.status),
        ) {
            Ok(session) => session,
            Err(e) => {
                warn!("Viewer could not mount: {}", e);
                self.status.send_replace(ViewerStatus::errored(&e));
                return Err(e);
            }
        };
        session.start_render_loop();
        self.session = Some(Arc::clone(&session));

        match model_src {
            Some(src) => session.load(src).await,
            None => Ok(()),
        }
    }

    /// Tear down the current session, if any
    pub fn unmount(&mut self) -> bool {
        match self.session.take() {
            Some(session) => session.teardown(),
            None => false,
        }
    }

    pub fn status(&self) -> ViewerStatus {
        self.status.borrow().clone()
    }

    /// Receiver that observes every status change
    pub fn watch_status(&self) -> watch::Receiver<ViewerStatus> {
        self.status.subscribe()
    }

    pub fn session(&self) -> Option<&Arc<ViewportSession>> {
        self.session.as_ref()
    }

    pub fn model_src(&self) -> Option<&str> {
        self.model_src.as_deref()
    }
}

impl Drop for ModelViewer {
    fn drop(&mut self) {
        self.unmount();
    }
}
