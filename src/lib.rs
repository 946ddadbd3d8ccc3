pub mod api;
pub mod builder;
pub mod error;
pub mod export;
pub mod format;
pub mod inherit;
pub mod members;
pub mod model;
pub mod options;
pub mod resolver;
pub mod typeexpr;

pub use api::{analyze, Analysis, Backend};
