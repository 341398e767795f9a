//! Host surfaces that renderer output elements attach to.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use topokit_core::{AppEvent, EventBus, WindowEvent};
use tracing::debug;

use crate::backend::OutputElement;

/// Host container for a renderer's output element
pub trait Surface: Send + Sync {
    /// Current client size in pixels
    fn size(&self) -> (u32, u32);

    fn attach(&self, element: OutputElement);

    /// Returns false if the element was not attached
    fn detach(&self, element: OutputElement) -> bool;
}

/// In-process surface that records attached elements
#[derive(Debug)]
pub struct HostSurface {
    size: Mutex<(u32, u32)>,
    children: Mutex<Vec<OutputElement>>,
    peak_children: AtomicUsize,
}

impl HostSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: Mutex::new((width, height)),
            children: Mutex::new(Vec::new()),
            peak_children: AtomicUsize::new(0),
        }
    }

    /// Change the client size and notify resize listeners
    pub fn resize(&self, width: u32, height: u32, bus: &EventBus) {
        *self.size.lock() = (width, height);
        bus.publish(AppEvent::Window(WindowEvent::Resized { width, height }))
            .ok();
    }

    pub fn children(&self) -> Vec<OutputElement> {
        self.children.lock().clone()
    }

    /// Most elements ever attached at the same time
    pub fn peak_children(&self) -> usize {
        self.peak_children.load(Ordering::SeqCst)
    }
}

impl Surface for HostSurface {
    fn size(&self) -> (u32, u32) {
        *self.size.lock()
    }

    fn attach(&self, element: OutputElement) {
        let mut children = self.children.lock();
        if !children.contains(&element) {
            children.push(element);
        }
        self.peak_children.fetch_max(children.len(), Ordering::SeqCst);
        debug!("Attached {} ({} on surface)", element, children.len());
    }

    fn detach(&self, element: OutputElement) -> bool {
        let mut children = self.children.lock();
        let before = children.len();
        children.retain(|e| *e != element);
        let removed = children.len() != before;
        if removed {
            debug!("Detached {}", element);
        }
        removed
    }
}
