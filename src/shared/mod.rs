//! Types shared by every part of the window manager.

pub mod geometry;

pub use geometry::{Geometry, Strut};
