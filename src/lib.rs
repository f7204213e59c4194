//! Strata compositor core.
//!
//! This library contains the decision making part of a Wayland compositor:
//! output and window layout, layer shell arrangement, damage tracking and
//! input routing. Backends feed it decoded [`strata_ipc::Event`]s and execute
//! the [`protocol::Request`]s it emits.

pub mod backend;
pub mod config;
pub mod cursor;
pub mod daemon;
pub mod damage;
pub mod geometry;
mod input;
pub mod keybindings;
pub mod layer;
pub mod output;
pub mod protocol;
pub mod seat;
pub mod strata;
pub mod views;

pub use strata_ipc::Event;

pub use crate::strata::Strata;
