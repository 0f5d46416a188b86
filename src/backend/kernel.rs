use std::fmt;

use crate::{
    common::{DType, DTypeTensor, Shape, TType},
    error::{KernelError, LowerError},
    operation::Operation,
};

/// Layout of one buffer a kernel reads or writes, strides are in elements.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BufferDesc {
    dtype: DType,
    shape: Shape,
    strides: Vec<usize>,
}

impl BufferDesc {
    pub fn contiguous(ty: &TType) -> Self {
        Self { dtype: ty.dtype(), shape: ty.shape().clone(), strides: ty.shape().strides() }
    }

    /// Returns `None` if there is not exactly one stride per axis.
    pub fn with_strides(ty: &TType, strides: impl Into<Vec<usize>>) -> Option<Self> {
        let strides = strides.into();
        (strides.len() == ty.shape().rank()).then(|| Self { dtype: ty.dtype(), shape: ty.shape().clone(), strides })
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Minimum number of elements backing storage must hold.
    pub fn required_len(&self) -> usize {
        if self.shape.size() == 0 {
            return 0;
        }

        1 + self.shape.dims().iter().zip(&self.strides).map(|(&d, &s)| (d - 1) * s).sum::<usize>()
    }

    pub fn offset(&self, coord: &[usize]) -> usize {
        coord.iter().zip(&self.strides).map(|(c, s)| c * s).sum()
    }

    pub fn matches(&self, ty: &TType) -> bool {
        self.dtype == ty.dtype() && &self.shape == ty.shape()
    }

    pub fn is_contiguous(&self) -> bool {
        self.strides == self.shape.strides()
    }

    /// No two coordinates share an offset.
    pub fn is_non_overlapping(&self) -> bool {
        let mut axes = self.shape.dims().iter().zip(&self.strides).filter(|(&d, _)| d > 1).collect::<Vec<_>>();
        axes.sort_by_key(|(_, &s)| s);

        let mut span = 1;

        for (&d, &s) in axes {
            if s < span {
                return false;
            }

            span = s * d;
        }

        true
    }
}

/// Buffer descriptors in the declared input and output order of a node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BufferArgs {
    pub inputs: Vec<BufferDesc>,
    pub outputs: Vec<BufferDesc>,
}

impl BufferArgs {
    pub fn contiguous(op: &dyn Operation) -> Self {
        Self {
            inputs: op.inputs().iter().map(|x| BufferDesc::contiguous(x.ty())).collect(),
            outputs: op.outputs().iter().map(BufferDesc::contiguous).collect(),
        }
    }

    pub fn is_contiguous(&self) -> bool {
        self.inputs.iter().chain(&self.outputs).all(BufferDesc::is_contiguous)
    }

    /// Descriptors must agree with the types declared by `op`.
    pub fn check(&self, op: &dyn Operation) -> Result<(), LowerError> {
        let invalid = |reason: String| LowerError::InvalidBuffers { op: op.opname(), reason };

        let inputs = op.inputs();
        if self.inputs.len() != inputs.len() {
            return Err(invalid(format!("expected {} input buffers, got {}", inputs.len(), self.inputs.len())));
        }

        for (i, (desc, input)) in self.inputs.iter().zip(inputs).enumerate() {
            if !desc.matches(input.ty()) {
                return Err(invalid(format!("input {i} is {:?}[{:?}], expected {:?}", desc.dtype, desc.shape, input.ty())));
            }
        }

        let outputs = op.outputs();
        if self.outputs.len() != outputs.len() {
            return Err(invalid(format!("expected {} output buffers, got {}", outputs.len(), self.outputs.len())));
        }

        for (i, (desc, ty)) in self.outputs.iter().zip(outputs).enumerate() {
            if !desc.matches(ty) {
                return Err(invalid(format!("output {i} is {:?}[{:?}], expected {ty:?}", desc.dtype, desc.shape)));
            }

            if !desc.is_non_overlapping() {
                return Err(invalid(format!("output {i} has overlapping strides {:?}", desc.strides)));
            }
        }

        Ok(())
    }

    /// Checks concrete storage against the descriptors before a kernel touches it.
    pub fn check_tensors(&self, inputs: &[&DTypeTensor], outputs: &[&mut DTypeTensor]) -> Result<(), KernelError> {
        fn check<'a>(
            kind: &str,
            descs: &[BufferDesc],
            tensors: impl ExactSizeIterator<Item = &'a DTypeTensor>,
        ) -> Result<(), KernelError> {
            if descs.len() != tensors.len() {
                let msg = format!("expected {} {kind} buffers, got {}", descs.len(), tensors.len());
                return Err(KernelError::InvalidBuffers(msg));
            }

            for (i, (desc, tensor)) in descs.iter().zip(tensors).enumerate() {
                if desc.dtype != tensor.dtype() {
                    let msg = format!("{kind} {i} has element type {}, expected {}", tensor.dtype(), desc.dtype);
                    return Err(KernelError::InvalidBuffers(msg));
                }

                if tensor.size() < desc.required_len() {
                    let msg = format!("{kind} {i} holds {} elements, needs {}", tensor.size(), desc.required_len());
                    return Err(KernelError::InvalidBuffers(msg));
                }
            }

            Ok(())
        }

        check("input", &self.inputs, inputs.iter().copied())?;
        check("output", &self.outputs, outputs.iter().map(|x| &**x))
    }
}

pub type KernelFn = dyn Fn(&[&DTypeTensor], &mut [&mut DTypeTensor]) -> Result<(), KernelError> + Send + Sync;

/// Reentrant closure doing the numeric work of one node.
pub struct Kernel {
    name: String,
    func: Box<KernelFn>,
}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kernel").field("name", &self.name).finish_non_exhaustive()
    }
}

impl Kernel {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[&DTypeTensor], &mut [&mut DTypeTensor]) -> Result<(), KernelError> + Send + Sync + 'static,
    {
        Self { name: name.into(), func: Box::new(func) }
    }

    pub fn noop(name: impl Into<String>) -> Self {
        Self::new(name, |_, _| Ok(()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn execute(&self, inputs: &[&DTypeTensor], outputs: &mut [&mut DTypeTensor]) -> Result<(), KernelError> {
        (self.func)(inputs, outputs)
    }
}
