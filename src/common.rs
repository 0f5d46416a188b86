mod dtype;
mod element;
pub mod rng;
mod shape;

pub use dtype::{DType, DTypeTensor};
pub use element::Element;
pub use shape::{Shape, TType};
