//! Tab navigation
//!
//! Several independent tab histories share one visible screen region. Each
//! tab owns a [`TabStack`] of [`ViewTag`]s; the [`NavigationController`]
//! decides which tag is on screen and builds views through the
//! [`ViewRegistry`] the first time a tag is shown.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  NavigationController                                        │
//! │  - active tab, mode flags, saved search state                │
//! │  - view cache (tag -> View), exactly one visible             │
//! ├──────────────────────────────────────────────────────────────┤
//! │  TabStack x 5          │  ViewRegistry                        │
//! │  - anchor first        │  - total factory, fresh instance no. │
//! │  - anchor never popped │  - unknown tags degrade to home      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The controller is synchronous and single-threaded. It never talks to
//! the store; screens populate themselves.

mod controller;
mod registry;
mod stack;
mod tab;
mod tag;

pub use controller::{BackOutcome, NavSnapshot, NavigationController};
pub use registry::{View, ViewKind, ViewRegistry};
pub use stack::TabStack;
pub use tab::TabId;
pub use tag::{Overlay, TagFamily, ViewTag};
