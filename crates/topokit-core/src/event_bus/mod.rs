//! # Event Bus Module
//!
//! Publish/subscribe hub decoupling the viewer, the bridge and the views.
//!
//! ```rust,ignore
//! use topokit_core::event_bus::{event_bus, AppEvent, EventCategory, EventFilter, WindowEvent};
//!
//! let subscription = event_bus().subscribe(
//!     EventFilter::Categories(vec![EventCategory::Window]),
//!     |event| {
//!         if let AppEvent::Window(WindowEvent::Resized { width, height }) = event {
//!             println!("surface is now {width}x{height}");
//!         }
//!     },
//! );
//!
//! event_bus().publish(AppEvent::Window(WindowEvent::Resized { width: 800, height: 600 })).ok();
//! event_bus().unsubscribe(subscription);
//! ```

mod bus;
mod events;

pub use bus::*;
pub use events::*;
