use crate::{
    backend::{BufferArgs, BufferDesc, Kernel},
    common::{DType, DTypeTensor, Element},
    error::{KernelError, LowerError},
    operation::{Operation, Reduce, Reducer},
};

/// Generic reduction kernel over arbitrary rank and strides.
///
/// Every output element is seeded with `R::identity` and then combined with
/// each input element that projects onto it. Fold order follows the input
/// iteration order, which only matters for reducers that are not associative.
pub fn build_reduction<R: Reducer>(op: &Reduce<R>, args: &BufferArgs) -> Result<Kernel, LowerError> {
    args.check(op)?;

    let plan = ReducePlan::new(op.axes(), &args.inputs[0], &args.outputs[0]);
    let dtype = op.dtype();
    let args = args.clone();

    Ok(Kernel::new(op.opname(), move |inputs, outputs| {
        args.check_tensors(inputs, outputs)?;

        match dtype {
            DType::F32 => plan.run::<R, f32>(inputs[0], outputs[0]),
            DType::F64 => plan.run::<R, f64>(inputs[0], outputs[0]),
            DType::I32 => plan.run::<R, i32>(inputs[0], outputs[0]),
            DType::I64 => plan.run::<R, i64>(inputs[0], outputs[0]),
        }
    }))
}

struct ReducePlan {
    input_dims: Vec<usize>,
    input_strides: Vec<usize>,
    output_dims: Vec<usize>,
    output_strides: Vec<usize>,
    /// Output stride of each input axis, zero for reduced axes.
    projection: Vec<usize>,
}

impl ReducePlan {
    fn new(axes: &[usize], input: &BufferDesc, output: &BufferDesc) -> Self {
        let mut kept = output.strides().iter();

        let projection = (0..input.shape().rank())
            .map(|axis| if axes.contains(&axis) { 0 } else { kept.next().copied().unwrap_or(0) })
            .collect();

        Self {
            input_dims: input.shape().dims().to_vec(),
            input_strides: input.strides().to_vec(),
            output_dims: output.shape().dims().to_vec(),
            output_strides: output.strides().to_vec(),
            projection,
        }
    }

    fn run<R: Reducer, T: Element>(&self, input: &DTypeTensor, output: &mut DTypeTensor) -> Result<(), KernelError> {
        let src = T::slice(input).ok_or_else(|| mismatch(input.dtype()))?;
        let dtype = output.dtype();
        let dst = T::slice_mut(output).ok_or_else(|| mismatch(dtype))?;

        for_each_offset(&self.output_dims, &self.output_strides, &self.output_strides, |o, _| {
            dst[o] = R::identity();
        });

        for_each_offset(&self.input_dims, &self.input_strides, &self.projection, |i, o| {
            dst[o] = R::combine(dst[o], src[i]);
        });

        Ok(())
    }
}

fn mismatch(found: DType) -> KernelError {
    KernelError::InvalidBuffers(format!("unexpected element type {found}"))
}

/// Calls `f` with the offsets of every coordinate of `dims` under two sets of
/// strides, last axis fastest.
fn for_each_offset(dims: &[usize], a_strides: &[usize], b_strides: &[usize], mut f: impl FnMut(usize, usize)) {
    if dims.contains(&0) {
        return;
    }

    let mut coord = vec![0; dims.len()];
    let (mut a, mut b) = (0, 0);

    loop {
        f(a, b);

        let mut axis = dims.len();

        loop {
            if axis == 0 {
                return;
            }

            axis -= 1;
            coord[axis] += 1;
            a += a_strides[axis];
            b += b_strides[axis];

            if coord[axis] < dims[axis] {
                break;
            }

            a -= a_strides[axis] * dims[axis];
            b -= b_strides[axis] * dims[axis];
            coord[axis] = 0;
        }
    }
}
