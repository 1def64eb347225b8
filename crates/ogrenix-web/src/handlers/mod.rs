//! HTTP handlers, one module per page or API group.

pub mod generate;
pub mod image;
pub mod index;
pub mod logs;
pub mod system;
