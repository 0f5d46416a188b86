use crate::{
    backend::{BufferArgs, Kernel},
    common::{DType, DTypeTensor, Element},
    error::{KernelError, LowerError},
    operation::{CellType, Operation, Rnn, RnnVariant},
};

/// Reference kernel for the fused recurrent cell.
///
/// Layouts, with `b = layer * D + direction` indexing a weight block:
/// - `src_layer` row `t * N + n`
/// - `weights_layer` rows `[b * C, (b + 1) * C)`, `weights_iter` rows
///   `[b * H, (b + 1) * H)`, gate `g` in columns `[g * H, (g + 1) * H)`
/// - `bias` element `b * G * H + g * H + j`
/// - hidden form state row `(b * S + s) * N + n`, cell state form row `b * N + n`
///
/// The second direction runs backwards in time and its hidden states are
/// written to the right half of the layer output.
pub fn build_rnn(op: &Rnn, args: &BufferArgs) -> Result<Kernel, LowerError> {
    args.check(op)?;

    let plan = RnnPlan::new(op, args)?;
    let dtype = op.dtype();
    let args = args.clone();

    Ok(Kernel::new(op.opname(), move |inputs, outputs| {
        args.check_tensors(inputs, outputs)?;

        match dtype {
            DType::F32 => plan.run::<f32>(inputs, outputs),
            DType::F64 => plan.run::<f64>(inputs, outputs),
            DType::I32 | DType::I64 => Err(KernelError::InvalidBuffers(format!("unsupported element type {dtype}"))),
        }
    }))
}

#[derive(Clone, Copy, Debug)]
struct RnnPlan {
    cell: CellType,
    variant: RnnVariant,
    timesteps: usize,
    batch: usize,
    channels: usize,
    hidden: usize,
    gates: usize,
    directions: usize,
    layers: usize,
    states: usize,
}

impl RnnPlan {
    fn new(op: &Rnn, args: &BufferArgs) -> Result<Self, LowerError> {
        let unsupported = |reason: String| LowerError::UnsupportedConfiguration { op: op.opname(), reason };

        let params = op.params();
        let cell = params.cell_type;

        if !args.is_contiguous() {
            return Err(unsupported("buffers must be contiguous".to_string()));
        }

        if !op.dtype().is_float() {
            return Err(unsupported(format!("element type {} is not a float", op.dtype())));
        }

        if params.num_gates_per_cell != cell.num_gates() {
            let reason = format!("{cell:?} cell has {} gates, got {}", cell.num_gates(), params.num_gates_per_cell);
            return Err(unsupported(reason));
        }

        if params.src_sequence_length != params.num_timesteps {
            let reason = format!(
                "src_sequence_length ({}) != num_timesteps ({})",
                params.src_sequence_length, params.num_timesteps
            );
            return Err(unsupported(reason));
        }

        if !matches!(params.direction, 1 | 2) {
            return Err(unsupported(format!("direction must be 1 or 2, got {}", params.direction)));
        }

        let hidden = op.src_iter_feature_size();
        if op.dst_iter_feature_size() != hidden || op.dst_layer_feature_size() != hidden {
            let reason = format!(
                "gate width ({}, {}) != hidden size ({hidden})",
                op.dst_layer_feature_size(),
                op.dst_iter_feature_size()
            );
            return Err(unsupported(reason));
        }

        let channels = op.src_layer_feature_size();
        if params.num_fused_layers > 1 && channels != params.direction * hidden {
            let expected = params.direction * hidden;
            let reason = format!("stacked layers need input width direction * hidden ({expected}), got {channels}");
            return Err(unsupported(reason));
        }

        let states = match op.variant() {
            RnnVariant::Hidden if params.num_cell_states != cell.num_states() => {
                let reason =
                    format!("{cell:?} cell carries {} states, got {}", cell.num_states(), params.num_cell_states);
                return Err(unsupported(reason));
            }
            RnnVariant::Hidden => params.num_cell_states,
            RnnVariant::WithCellState if cell != CellType::Lstm => {
                return Err(unsupported(format!("separate cell state input with {cell:?} cell")));
            }
            RnnVariant::WithCellState => 1,
        };

        let plan = Self {
            cell,
            variant: op.variant(),
            timesteps: params.num_timesteps,
            batch: op.batch_size(),
            channels,
            hidden,
            gates: params.num_gates_per_cell,
            directions: params.direction,
            layers: params.num_fused_layers,
            states,
        };

        let state_inputs = match plan.variant {
            RnnVariant::Hidden => 1..2,
            RnnVariant::WithCellState => 1..3,
        };

        for i in state_inputs {
            let found = op.inputs()[i].ty().size();
            if found != plan.state_size() {
                let reason = format!("state input {i} has {found} elements, expected {}", plan.state_size());
                return Err(unsupported(reason));
            }
        }

        Ok(plan)
    }

    fn blocks(&self) -> usize {
        self.directions * self.layers
    }

    fn state_size(&self) -> usize {
        self.states * self.blocks() * self.batch * self.hidden
    }

    /// Offsets of the hidden and cell state rows of block `b`, batch row `n`.
    fn state_rows(&self, b: usize, n: usize) -> (usize, usize) {
        let h = self.hidden;

        match self.variant {
            RnnVariant::Hidden => ((b * self.states * self.batch + n) * h, ((b * self.states + 1) * self.batch + n) * h),
            RnnVariant::WithCellState => ((b * self.batch + n) * h, (b * self.batch + n) * h),
        }
    }

    fn run<T: Activation>(&self, inputs: &[&DTypeTensor], outputs: &mut [&mut DTypeTensor]) -> Result<(), KernelError> {
        let get = |i: usize| {
            T::slice(inputs[i]).ok_or_else(|| KernelError::InvalidBuffers(format!("input {i} has unexpected type")))
        };

        let (offset, cell_state) = match self.variant {
            RnnVariant::Hidden => (0, None),
            RnnVariant::WithCellState => (1, Some(get(2)?)),
        };

        let src_layer = get(0)?;
        let src_iter = get(1)?;
        let weights = Weights {
            layer: get(2 + offset)?,
            iter: get(3 + offset)?,
            bias: get(4 + offset)?,
        };

        let (h, n_dirs) = (self.hidden, self.directions);
        let row = n_dirs * h;

        let mut layer_input = src_layer[..self.timesteps * self.batch * self.channels].to_vec();
        let mut width = self.channels;
        let mut layer_output = Vec::new();

        let mut dst_iter = vec![T::zero(); self.state_size()];
        let mut dst_iter_c = vec![T::zero(); cell_state.map_or(0, |_| self.state_size())];

        for l in 0..self.layers {
            layer_output = vec![T::zero(); self.timesteps * self.batch * row];

            for d in 0..n_dirs {
                let b = l * n_dirs + d;

                for n in 0..self.batch {
                    let (hrow, crow) = self.state_rows(b, n);

                    let mut state = src_iter[hrow..hrow + h].to_vec();
                    let mut cell = match (self.cell, cell_state) {
                        (CellType::Lstm, Some(c)) => c[crow..crow + h].to_vec(),
                        (CellType::Lstm, None) => src_iter[crow..crow + h].to_vec(),
                        _ => Vec::new(),
                    };

                    for step in 0..self.timesteps {
                        let t = if d == 0 { step } else { self.timesteps - 1 - step };
                        let x = &layer_input[(t * self.batch + n) * width..][..width];

                        self.step(&weights, b, width, x, &mut state, &mut cell);

                        layer_output[(t * self.batch + n) * row + d * h..][..h].copy_from_slice(&state);
                    }

                    dst_iter[hrow..hrow + h].copy_from_slice(&state);

                    if self.cell == CellType::Lstm {
                        match self.variant {
                            RnnVariant::Hidden => dst_iter[crow..crow + h].copy_from_slice(&cell),
                            RnnVariant::WithCellState => dst_iter_c[crow..crow + h].copy_from_slice(&cell),
                        }
                    }
                }
            }

            layer_input = layer_output.clone();
            width = row;
        }

        write::<T>(outputs, 0, &layer_output)?;
        write::<T>(outputs, 1, &dst_iter)?;

        if self.variant == RnnVariant::WithCellState {
            write::<T>(outputs, 2, &dst_iter_c)?;
        }

        Ok(())
    }

    /// Advances one batch row by one timestep.
    fn step<T: Activation>(&self, w: &Weights<T>, b: usize, width: usize, x: &[T], state: &mut [T], cell: &mut [T]) {
        let h = self.hidden;
        let gh = self.gates * h;

        // input and bias contribution of every gate column
        let mut xw = w.bias[b * gh..(b + 1) * gh].to_vec();
        for (k, &xk) in x.iter().enumerate() {
            let wrow = &w.layer[(b * width + k) * gh..][..gh];
            for (acc, &wv) in xw.iter_mut().zip(wrow) {
                *acc = acc.add(xk.mul(wv));
            }
        }

        let recurrent = |input: &[T], gate: usize| {
            let mut out = vec![T::zero(); h];
            for (k, &hk) in input.iter().enumerate() {
                let wrow = &w.iter[(b * h + k) * gh + gate * h..][..h];
                for (acc, &wv) in out.iter_mut().zip(wrow) {
                    *acc = acc.add(hk.mul(wv));
                }
            }
            out
        };

        let pre = |gate: usize, hu: &[T]| -> Vec<T> {
            xw[gate * h..(gate + 1) * h].iter().zip(hu).map(|(&a, &b)| a.add(b)).collect()
        };

        match self.cell {
            CellType::Rnn => {
                let a = pre(0, &recurrent(state, 0));
                for (s, a) in state.iter_mut().zip(a) {
                    *s = a.tanh();
                }
            }
            CellType::Lstm => {
                let i = pre(0, &recurrent(state, 0));
                let f = pre(1, &recurrent(state, 1));
                let c = pre(2, &recurrent(state, 2));
                let o = pre(3, &recurrent(state, 3));

                for j in 0..h {
                    cell[j] = f[j].sigmoid().mul(cell[j]).add(i[j].sigmoid().mul(c[j].tanh()));
                    state[j] = o[j].sigmoid().mul(cell[j].tanh());
                }
            }
            CellType::Gru => {
                let u = pre(0, &recurrent(state, 0));
                let r = pre(1, &recurrent(state, 1));

                let gated = state.iter().zip(&r).map(|(&s, &r)| r.sigmoid().mul(s)).collect::<Vec<_>>();
                let o = pre(2, &recurrent(&gated, 2));

                for j in 0..h {
                    let u = u[j].sigmoid();
                    state[j] = u.mul(state[j]).add(T::one().sub(u).mul(o[j].tanh()));
                }
            }
        }
    }
}

struct Weights<'a, T> {
    layer: &'a [T],
    iter: &'a [T],
    bias: &'a [T],
}

fn write<T: Element>(outputs: &mut [&mut DTypeTensor], index: usize, values: &[T]) -> Result<(), KernelError> {
    let dst = T::slice_mut(outputs[index])
        .ok_or_else(|| KernelError::InvalidBuffers(format!("output {index} has unexpected type")))?;

    dst[..values.len()].copy_from_slice(values);
    Ok(())
}

trait Activation: Element {
    fn sub(self, rhs: Self) -> Self;

    fn tanh(self) -> Self;

    fn sigmoid(self) -> Self;
}

impl Activation for f32 {
    fn sub(self, rhs: Self) -> Self {
        self - rhs
    }

    fn tanh(self) -> Self {
        f32::tanh(self)
    }

    fn sigmoid(self) -> Self {
        1.0 / (1.0 + (-self).exp())
    }
}

impl Activation for f64 {
    fn sub(self, rhs: Self) -> Self {
        self - rhs
    }

    fn tanh(self) -> Self {
        f64::tanh(self)
    }

    fn sigmoid(self) -> Self {
        1.0 / (1.0 + (-self).exp())
    }
}

#[cfg(test)]
mod tests;
