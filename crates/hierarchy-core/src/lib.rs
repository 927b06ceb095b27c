mod acceptance;
mod config;
mod dnd;
mod error;
mod feedback;
mod hierarchy;
mod mutator;
mod node;
mod session;

pub use crate::acceptance::*;
pub use crate::config::*;
pub use crate::dnd::*;
pub use crate::error::*;
pub use crate::feedback::*;
pub use crate::hierarchy::*;
pub use crate::hit_test::*;
pub use crate::mutator::*;
pub use crate::node::*;
pub use crate::session::*;

pub use kurbo::{Point, Rect};
