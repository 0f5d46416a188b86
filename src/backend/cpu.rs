//! Reference CPU kernels.

mod reduce;
mod rnn;

pub use reduce::build_reduction;
pub use rnn::build_rnn;

use crate::{
    error::LowerError,
    operation::{Input, Max, Min, Operation, Product, Reduce, Rnn, Sum},
};

use super::{BufferArgs, Kernel, KernelRegistry};

pub fn register_builders(registry: &mut KernelRegistry) {
    registry.register::<Input, _>(build_input);
    registry.register::<Reduce<Max>, _>(build_reduction::<Max>);
    registry.register::<Reduce<Min>, _>(build_reduction::<Min>);
    registry.register::<Reduce<Sum>, _>(build_reduction::<Sum>);
    registry.register::<Reduce<Product>, _>(build_reduction::<Product>);
    registry.register::<Rnn, _>(build_rnn);
}

/// Leaves are seeded by the executor.
fn build_input(op: &Input, args: &BufferArgs) -> Result<Kernel, LowerError> {
    args.check(op)?;
    Ok(Kernel::noop(op.opname()))
}
