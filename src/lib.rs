//! # evhub
//!
//! Linux input acquisition core: evdev device discovery and multiplexed
//! event reading, plus a richly-typed input event model with a raw-vs-window
//! coordinate transform pipeline.
//!
//! # Architecture
//!
//! ```text
//! evhub
//!   ├─> Device Hub (epoll + inotify + eventfd multiplexing)
//!   │     └─> Device Registry (open devices, identity, capabilities)
//!   ├─> Event Model (MotionEvent / KeyEvent, sample history, transforms)
//!   └─> Virtual Device Injection (uinput collaborator for tests)
//! ```
//!
//! # Data Flow
//!
//! **Acquisition Path:** /dev/input nodes → Device Hub → `RawEvent` stream
//!
//! **Event Path:** `RawEvent` → (external builder layer) → `MotionEvent` /
//! `KeyEvent` → transformed getters

#![warn(missing_docs)]
#![warn(clippy::all)]

// =============================================================================
// Modules
// =============================================================================

/// Fixed-capacity capability bitmask
pub mod bitarray;

/// Hub configuration
pub mod config;

/// Error types
pub mod error;

/// Input event model: coordinates, transforms, motion/key events
pub mod event;

/// Device discovery and multiplexed event acquisition
pub mod hub;

/// Virtual-device injection over uinput (test/simulation collaborator)
pub mod uinput;

// =============================================================================
// Convenience re-exports
// =============================================================================

pub use bitarray::BitArray;
pub use config::DeviceHubConfig;
pub use error::{EvhubError, Result};
pub use event::builders::{KeyEventBuilder, MotionEventBuilder, PointerBuilder};
pub use event::coords::{PointerCoords, PointerProperties};
pub use event::key::KeyEvent;
pub use event::motion::MotionEvent;
pub use event::transform::Transform;
pub use event::{DisplayId, KeyAction, MotionAction, Source};
pub use hub::registry::InputDeviceIdentifier;
pub use hub::{DeviceHub, RawEvent};
