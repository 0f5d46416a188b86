pub mod cpu;
mod kernel;
mod registry;

pub use kernel::{BufferArgs, BufferDesc, Kernel, KernelFn};
pub use registry::KernelRegistry;
