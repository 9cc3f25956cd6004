#![doc = include_str!("../README.md")]

pub mod distance;
mod error;
pub mod kdtree;
pub mod knn;
mod r#type;

pub use error::{KdError, Result};
pub use r#type::CoordNum;
