pub mod factory;
pub mod graph;
pub mod link;
pub mod shape;

pub use factory::*;
pub use graph::*;
pub use link::*;
pub use shape::*;
