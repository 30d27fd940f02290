//! Filament Core
//!
//! This crate provides the core reconciler for the Filament incremental UI
//! runtime. It implements:
//!
//! - An ephemeral element tree describing the desired UI shape
//! - A persistent, arena-backed fiber tree spanning two generations
//! - A cooperative, interruptible work scheduler with a positional diff
//! - A synchronous commit phase applying minimal host-tree mutations
//! - Hooks: per-fiber state and effect records surviving across renders
//!
//! The host tree itself (a DOM, a scene graph, a widget tree) is not owned
//! by this crate; it is reached through the small mutation contract in
//! [`host`], and an in-memory reference backend is provided for tests and
//! embedding experiments.
//!
//! # Architecture
//!
//! The crate is organized into four modules:
//!
//! - `element`: desired-tree descriptions and the builder API
//! - `host`: the host backend contract and the in-memory reference backend
//! - `fiber`: the persistent fiber tree and its arena
//! - `engine`: scheduler, diff, commit phase, and hooks
//!
//! # Example
//!
//! ```rust,ignore
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use filament_core::element::{Element, Props};
//! use filament_core::engine::{Engine, RenderCx};
//! use filament_core::host::MemoryHost;
//!
//! fn counter(cx: &mut RenderCx, _props: &Props) -> Element {
//!     let (count, set_count) = cx.use_state(0i64);
//!     Element::host("button")
//!         .attr("label", format!("clicked {count} times"))
//!         .on("click", move |_| set_count.update(|c| c + 1))
//! }
//!
//! let host = Rc::new(RefCell::new(MemoryHost::new()));
//! let container = host.borrow().container();
//! let engine = Engine::new(host.clone(), container);
//!
//! engine.render(Element::component(counter));
//! engine.run_to_completion()?;
//! ```

pub mod element;
pub mod engine;
pub mod fiber;
pub mod host;
