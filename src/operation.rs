mod input;
mod reduce;
mod rnn;

pub use input::Input;
pub use reduce::{Max, Min, Product, Reduce, ReduceMax, ReduceMin, ReduceProduct, ReduceSum, Reducer, Sum};
pub use rnn::{CellType, Rnn, RnnInputs, RnnParams, RnnVariant};

use std::{any::Any, fmt::Debug, sync::Arc};

use crate::{
    common::{DType, TType},
    error::OperationError,
    graph::Output,
};

/// A graph vertex whose outputs are fixed once construction succeeds.
///
/// Implementors only hand out values that passed validation, so anything
/// holding an `Operation` may trust its `outputs`.
pub trait Operation: Any + Debug + Send + Sync + 'static {
    fn opname(&self) -> String;

    fn inputs(&self) -> &[Output];

    fn outputs(&self) -> &[TType];

    fn supported_arities(&self) -> Vec<usize>;

    /// Builds a fresh operator with the same parameters bound to `inputs`,
    /// re-running full validation.
    fn recreate_with_new_inputs(&self, inputs: &[Output]) -> Result<Arc<dyn Operation>, OperationError>;
}

impl dyn Operation {
    pub fn downcast<T: Operation>(&self) -> Option<&T> {
        let op: &dyn Any = self;
        op.downcast_ref::<T>()
    }

    pub fn is<T: Operation>(&self) -> bool {
        self.downcast::<T>().is_some()
    }
}

pub(crate) fn check_arity(op: &dyn Operation, actual: usize) -> Result<(), OperationError> {
    let expected = op.supported_arities();

    if expected.contains(&actual) {
        Ok(())
    } else {
        Err(OperationError::ArityMismatch { op: op.opname(), expected, actual })
    }
}

/// Exact division of derived extents, `what` names the relation in the error.
pub(crate) fn exact_div(op: &str, what: &str, num: usize, den: usize) -> Result<usize, OperationError> {
    if den == 0 {
        return Err(OperationError::shape_mismatch(op, format!("{what}: divisor is zero")));
    }

    if num % den != 0 {
        return Err(OperationError::shape_mismatch(op, format!("{what}: {num} is not divisible by {den}")));
    }

    Ok(num / den)
}

/// Overflow-checked product of derived extents.
pub(crate) fn exact_mul(op: &str, what: &str, factors: &[usize]) -> Result<usize, OperationError> {
    factors
        .iter()
        .try_fold(1usize, |acc, &x| acc.checked_mul(x))
        .ok_or_else(|| OperationError::shape_mismatch(op, format!("{what}: {factors:?} overflows")))
}

/// Every input must share the element type of the first.
pub(crate) fn check_homogeneous(op: &str, inputs: &[Output]) -> Result<DType, OperationError> {
    let Some(first) = inputs.first() else {
        return Err(OperationError::ArityMismatch { op: op.to_string(), expected: vec![1], actual: 0 });
    };

    let expected = first.dtype();

    for (input, output) in inputs.iter().enumerate().skip(1) {
        let found = output.dtype();

        if found != expected {
            return Err(OperationError::TypeMismatch { op: op.to_string(), input, expected, found });
        }
    }

    Ok(expected)
}
