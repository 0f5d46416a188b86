/// Contains kernels, buffer descriptors, the `KernelRegistry` and the CPU builders.
pub mod backend;
/// Contains shapes, element types and host tensor storage.
pub mod common;
pub mod error;
/// Contains the arena `Graph` that operators are added to.
pub mod graph;
/// Contains the lowering driver and the sequential executor.
pub mod lower;
/// Contains the `Operation` trait and the provided operators.
pub mod operation;

pub use backend::{BufferArgs, BufferDesc, Kernel, KernelRegistry};
pub use common::{DType, DTypeTensor, Shape, TType};
pub use graph::{Graph, NodeId, Output};
pub use lower::{lower, LowerArgs, LoweredGraph};
pub use operation::Operation;
