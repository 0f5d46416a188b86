use crate::{
    common::TType,
    graph::{Graph, Output},
    operation::{RnnInputs, RnnParams},
};

use super::*;

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn rnn(shapes: &[&[usize]], dtype: DType, params: RnnParams) -> Rnn {
    let mut graph = Graph::default();
    let inputs = shapes.iter().map(|&shape| graph.add_input(TType::new(shape, dtype))).collect::<Vec<Output>>();
    Rnn::new(RnnInputs::try_from(&inputs[..]).unwrap(), params).unwrap()
}

fn execute(rnn: &Rnn, data: &[&[f64]]) -> Vec<Vec<f64>> {
    let args = BufferArgs::contiguous(rnn);
    let kernel = build_rnn(rnn, &args).unwrap();

    let inputs = data.iter().map(|x| DTypeTensor::F64(x.to_vec())).collect::<Vec<_>>();
    let mut outputs = rnn.outputs().iter().map(|ty| DTypeTensor::zeroed(ty.dtype(), ty.size())).collect::<Vec<_>>();

    kernel.execute(&inputs.iter().collect::<Vec<_>>(), &mut outputs.iter_mut().collect::<Vec<_>>()).unwrap();

    outputs
        .into_iter()
        .map(|x| match x {
            DTypeTensor::F64(x) => x,
            _ => panic!("unexpected element type"),
        })
        .collect()
}

fn assert_close(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len());

    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 1e-12, "{actual:?} != {expected:?}");
    }
}

#[test]
fn vanilla_cell() {
    let op = rnn(&[&[2, 1], &[1, 1], &[1, 1], &[1, 1], &[1]], DType::F64, RnnParams::new(CellType::Rnn, 2));
    let out = execute(&op, &[&[1.0, 2.0], &[0.5], &[0.3], &[0.2], &[0.1]]);

    let h1 = f64::tanh(0.5);
    let h2 = f64::tanh(0.1 + 2.0 * 0.3 + 0.2 * h1);

    assert_close(&out[0], &[h1, h2]);
    assert_close(&out[1], &[h2]);
}

#[test]
fn lstm_single_step() {
    let op = rnn(&[&[1, 1], &[2, 1], &[1, 4], &[1, 4], &[4]], DType::F64, RnnParams::new(CellType::Lstm, 1));

    let (x, h0, c0) = (0.7, 0.1, -0.3);
    let wl = [0.5, -0.4, 0.3, 0.2];
    let wi = [0.1, 0.2, -0.3, 0.4];
    let bias = [0.05, 0.1, -0.05, 0.0];

    let out = execute(&op, &[&[x], &[h0, c0], &wl, &wi, &bias]);

    let pre = |g: usize| bias[g] + x * wl[g] + h0 * wi[g];
    let c1 = sigmoid(pre(1)) * c0 + sigmoid(pre(0)) * pre(2).tanh();
    let h1 = sigmoid(pre(3)) * c1.tanh();

    assert_close(&out[0], &[h1]);
    assert_close(&out[1], &[h1, c1]);
}

#[test]
fn gru_single_step() {
    let op = rnn(&[&[1, 1], &[1, 1], &[1, 3], &[1, 3], &[3]], DType::F64, RnnParams::new(CellType::Gru, 1));

    let (x, h0) = (-0.6, 0.4);
    let wl = [0.3, -0.2, 0.8];
    let wi = [0.5, 0.1, -0.7];
    let bias = [0.0, 0.2, 0.1];

    let out = execute(&op, &[&[x], &[h0], &wl, &wi, &bias]);

    let u = sigmoid(bias[0] + x * wl[0] + h0 * wi[0]);
    let r = sigmoid(bias[1] + x * wl[1] + h0 * wi[1]);
    let o = (bias[2] + x * wl[2] + r * h0 * wi[2]).tanh();
    let h1 = u * h0 + (1.0 - u) * o;

    assert_close(&out[0], &[h1]);
    assert_close(&out[1], &[h1]);
}

#[test]
fn bidirectional() {
    let params = RnnParams::new(CellType::Rnn, 3).direction(2);
    let op = rnn(&[&[3, 1], &[2, 1], &[2, 1], &[2, 1], &[2]], DType::F64, params);

    let xs = [0.2, -0.5, 0.9];
    let state = [0.1, -0.2];
    let wl = [0.7, -0.3];
    let wi = [0.4, 0.6];
    let bias = [0.05, -0.1];

    let out = execute(&op, &[&xs, &state, &wl, &wi, &bias]);

    let mut fwd = [0.0; 3];
    let mut h = state[0];
    for t in 0..3 {
        h = (bias[0] + xs[t] * wl[0] + h * wi[0]).tanh();
        fwd[t] = h;
    }

    let mut bwd = [0.0; 3];
    let mut h = state[1];
    for t in (0..3).rev() {
        h = (bias[1] + xs[t] * wl[1] + h * wi[1]).tanh();
        bwd[t] = h;
    }

    assert_close(&out[0], &[fwd[0], bwd[0], fwd[1], bwd[1], fwd[2], bwd[2]]);
    assert_close(&out[1], &[fwd[2], bwd[0]]);
}

#[test]
fn stacked_layers() {
    let params = RnnParams::new(CellType::Rnn, 2).fused_layers(2);
    let op = rnn(&[&[2, 1], &[2, 1], &[2, 1], &[2, 1], &[2]], DType::F64, params);

    let xs = [1.0, -1.0];
    let state = [0.3, -0.4];
    let wl = [0.5, 0.9];
    let wi = [-0.2, 0.1];
    let bias = [0.0, 0.2];

    let out = execute(&op, &[&xs, &state, &wl, &wi, &bias]);

    let cell = |b: usize, x: f64, h: f64| (bias[b] + x * wl[b] + h * wi[b]).tanh();

    let l0 = [cell(0, xs[0], state[0]), 0.0];
    let l0 = [l0[0], cell(0, xs[1], l0[0])];
    let l1 = [cell(1, l0[0], state[1]), 0.0];
    let l1 = [l1[0], cell(1, l0[1], l1[0])];

    assert_close(&out[0], &l1);
    assert_close(&out[1], &[l0[1], l1[1]]);
}

#[test]
fn separate_cell_state_matches_packed() {
    let packed = rnn(&[&[2, 1], &[2, 1], &[1, 4], &[1, 4], &[4]], DType::F64, RnnParams::new(CellType::Lstm, 2));
    let split = rnn(&[&[2, 1], &[1, 1], &[1, 1], &[1, 4], &[1, 4], &[4]], DType::F64, RnnParams::new(CellType::Lstm, 2));

    let xs = [0.4, -0.8];
    let wl = [0.1, 0.2, 0.3, 0.4];
    let wi = [-0.1, 0.5, 0.2, -0.3];
    let bias = [0.0, 0.1, 0.0, -0.1];

    let a = execute(&packed, &[&xs, &[0.25, 0.5], &wl, &wi, &bias]);
    let b = execute(&split, &[&xs, &[0.25], &[0.5], &wl, &wi, &bias]);

    assert_eq!(b.len(), 3);
    assert_close(&a[0], &b[0]);
    assert_close(&a[1], &[b[1][0], b[2][0]]);
}

#[test]
fn unsupported_configurations() {
    let unsupported = |op: &Rnn| {
        let err = build_rnn(op, &BufferArgs::contiguous(op));
        assert!(matches!(err, Err(LowerError::UnsupportedConfiguration { .. })), "{err:?}");
    };

    // valid node, but an lstm needs two packed states
    let params = RnnParams::new(CellType::Lstm, 4).cell_states(1);
    unsupported(&rnn(&[&[8, 16], &[2, 8], &[16, 32], &[8, 32], &[32]], DType::F32, params));

    let params = RnnParams { num_gates_per_cell: 4, ..RnnParams::new(CellType::Rnn, 1) };
    unsupported(&rnn(&[&[1, 1], &[1, 1], &[1, 4], &[1, 4], &[4]], DType::F32, params));

    unsupported(&rnn(&[&[1, 1], &[1, 1], &[1, 1], &[1, 1], &[1]], DType::I32, RnnParams::new(CellType::Rnn, 1)));

    let params = RnnParams::new(CellType::Gru, 1);
    unsupported(&rnn(&[&[1, 1], &[1, 1], &[1, 1], &[1, 3], &[1, 3], &[3]], DType::F64, params));
}

#[test]
fn rejects_mismatched_buffers() {
    let op = rnn(&[&[2, 1], &[1, 1], &[1, 1], &[1, 1], &[1]], DType::F64, RnnParams::new(CellType::Rnn, 2));

    let mut args = BufferArgs::contiguous(&op);
    args.inputs.pop();

    assert!(matches!(build_rnn(&op, &args), Err(LowerError::InvalidBuffers { .. })));
}
