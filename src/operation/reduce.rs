use std::{fmt::Debug, marker::PhantomData, sync::Arc};

use crate::{
    common::{DType, Element, Shape, TType},
    error::OperationError,
    graph::Output,
};

use super::{check_arity, Operation};

/// Associative & commutative fold with an identity element.
pub trait Reducer: Clone + Copy + Debug + Default + PartialEq + Eq + Send + Sync + 'static {
    const NAME: &'static str;

    fn identity<T: Element>() -> T;

    fn combine<T: Element>(acc: T, x: T) -> T;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Max;

impl Reducer for Max {
    const NAME: &'static str = "max";

    fn identity<T: Element>() -> T {
        T::lowest()
    }

    fn combine<T: Element>(acc: T, x: T) -> T {
        acc.max(x)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Min;

impl Reducer for Min {
    const NAME: &'static str = "min";

    fn identity<T: Element>() -> T {
        T::highest()
    }

    fn combine<T: Element>(acc: T, x: T) -> T {
        acc.min(x)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Sum;

impl Reducer for Sum {
    const NAME: &'static str = "sum";

    fn identity<T: Element>() -> T {
        T::zero()
    }

    fn combine<T: Element>(acc: T, x: T) -> T {
        acc.add(x)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Product;

impl Reducer for Product {
    const NAME: &'static str = "product";

    fn identity<T: Element>() -> T {
        T::one()
    }

    fn combine<T: Element>(acc: T, x: T) -> T {
        acc.mul(x)
    }
}

pub type ReduceMax = Reduce<Max>;
pub type ReduceMin = Reduce<Min>;
pub type ReduceSum = Reduce<Sum>;
pub type ReduceProduct = Reduce<Product>;

/// Folds `R` over a set of axes, removing them from the shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reduce<R: Reducer> {
    inputs: [Output; 1],
    axes: Vec<usize>,
    outputs: [TType; 1],
    reducer: PhantomData<R>,
}

impl<R: Reducer> Reduce<R> {
    pub fn new(input: Output, axes: impl AsRef<[usize]>) -> Result<Self, OperationError> {
        let opname = format!("reduce.{}", R::NAME);
        let shape = input.shape();
        let rank = shape.rank();

        let mut axes = axes.as_ref().to_vec();
        axes.sort_unstable();

        for (i, &axis) in axes.iter().enumerate() {
            if axis >= rank {
                let relation = format!("axis {axis} out of bounds for input of rank {rank} ({shape:?})");
                return Err(OperationError::shape_mismatch(opname, relation));
            }

            if i > 0 && axes[i - 1] == axis {
                return Err(OperationError::shape_mismatch(opname, format!("axis {axis} reduced more than once")));
            }
        }

        let kept = shape.dims().iter().enumerate().filter(|(i, _)| axes.binary_search(i).is_err()).map(|(_, &d)| d);
        let output = TType::new(kept.collect::<Vec<_>>(), input.dtype());

        Ok(Self { inputs: [input], axes, outputs: [output], reducer: PhantomData })
    }

    pub fn input(&self) -> &Output {
        &self.inputs[0]
    }

    /// Reduced axes in ascending order.
    pub fn axes(&self) -> &[usize] {
        &self.axes
    }

    pub fn output_shape(&self) -> &Shape {
        self.outputs[0].shape()
    }

    pub fn dtype(&self) -> DType {
        self.outputs[0].dtype()
    }
}

impl<R: Reducer> Operation for Reduce<R> {
    fn opname(&self) -> String {
        format!("reduce.{}<axes={:?}>", R::NAME, self.axes)
    }

    fn inputs(&self) -> &[Output] {
        &self.inputs
    }

    fn outputs(&self) -> &[TType] {
        &self.outputs
    }

    fn supported_arities(&self) -> Vec<usize> {
        vec![1]
    }

    fn recreate_with_new_inputs(&self, inputs: &[Output]) -> Result<Arc<dyn Operation>, OperationError> {
        check_arity(self, inputs.len())?;
        Ok(Arc::new(Self::new(inputs[0].clone(), &self.axes)?))
    }
}
