use std::sync::Arc;

use crate::{
    common::{DType, TType},
    error::OperationError,
    graph::Output,
};

use super::{check_arity, check_homogeneous, exact_div, exact_mul, Operation};

const OPNAME: &str = "rnn";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellType {
    Rnn,
    Lstm,
    Gru,
}

impl CellType {
    pub fn num_gates(&self) -> usize {
        match self {
            Self::Rnn => 1,
            Self::Lstm => 4,
            Self::Gru => 3,
        }
    }

    /// Number of recurrent state tensors the cell carries between timesteps.
    pub fn num_states(&self) -> usize {
        match self {
            Self::Lstm => 2,
            Self::Rnn | Self::Gru => 1,
        }
    }
}

/// Static configuration of a fused recurrent cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RnnParams {
    pub num_timesteps: usize,
    pub num_gates_per_cell: usize,
    pub src_sequence_length: usize,
    pub num_cell_states: usize,
    pub direction: usize,
    pub num_fused_layers: usize,
    pub cell_type: CellType,
}

impl RnnParams {
    /// Single layer, unidirectional cell whose gate and state counts follow `cell_type`.
    pub fn new(cell_type: CellType, num_timesteps: usize) -> Self {
        Self {
            num_timesteps,
            num_gates_per_cell: cell_type.num_gates(),
            src_sequence_length: num_timesteps,
            num_cell_states: cell_type.num_states(),
            direction: 1,
            num_fused_layers: 1,
            cell_type,
        }
    }

    pub fn direction(mut self, direction: usize) -> Self {
        self.direction = direction;
        self
    }

    pub fn fused_layers(mut self, num_fused_layers: usize) -> Self {
        self.num_fused_layers = num_fused_layers;
        self
    }

    pub fn cell_states(mut self, num_cell_states: usize) -> Self {
        self.num_cell_states = num_cell_states;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RnnVariant {
    /// All recurrent state packed into `src_iter`.
    Hidden,
    /// Separate `src_iter_c` input for the cell state.
    WithCellState,
}

impl RnnVariant {
    pub fn num_inputs(&self) -> usize {
        match self {
            Self::Hidden => 5,
            Self::WithCellState => 6,
        }
    }

    pub fn num_outputs(&self) -> usize {
        match self {
            Self::Hidden => 2,
            Self::WithCellState => 3,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RnnInputs {
    Hidden { src_layer: Output, src_iter: Output, weights_layer: Output, weights_iter: Output, bias: Output },
    WithCellState {
        src_layer: Output,
        src_iter: Output,
        src_iter_c: Output,
        weights_layer: Output,
        weights_iter: Output,
        bias: Output,
    },
}

impl RnnInputs {
    pub fn variant(&self) -> RnnVariant {
        match self {
            Self::Hidden { .. } => RnnVariant::Hidden,
            Self::WithCellState { .. } => RnnVariant::WithCellState,
        }
    }

    pub fn src_layer(&self) -> &Output {
        match self {
            Self::Hidden { src_layer, .. } | Self::WithCellState { src_layer, .. } => src_layer,
        }
    }

    pub fn src_iter(&self) -> &Output {
        match self {
            Self::Hidden { src_iter, .. } | Self::WithCellState { src_iter, .. } => src_iter,
        }
    }

    pub fn src_iter_c(&self) -> Option<&Output> {
        match self {
            Self::Hidden { .. } => None,
            Self::WithCellState { src_iter_c, .. } => Some(src_iter_c),
        }
    }

    pub fn weights_layer(&self) -> &Output {
        match self {
            Self::Hidden { weights_layer, .. } | Self::WithCellState { weights_layer, .. } => weights_layer,
        }
    }

    pub fn weights_iter(&self) -> &Output {
        match self {
            Self::Hidden { weights_iter, .. } | Self::WithCellState { weights_iter, .. } => weights_iter,
        }
    }

    pub fn bias(&self) -> &Output {
        match self {
            Self::Hidden { bias, .. } | Self::WithCellState { bias, .. } => bias,
        }
    }

    /// Inputs in node order.
    pub fn into_vec(self) -> Vec<Output> {
        match self {
            Self::Hidden { src_layer, src_iter, weights_layer, weights_iter, bias } => {
                vec![src_layer, src_iter, weights_layer, weights_iter, bias]
            }
            Self::WithCellState { src_layer, src_iter, src_iter_c, weights_layer, weights_iter, bias } => {
                vec![src_layer, src_iter, src_iter_c, weights_layer, weights_iter, bias]
            }
        }
    }
}

impl TryFrom<&[Output]> for RnnInputs {
    type Error = OperationError;

    fn try_from(inputs: &[Output]) -> Result<Self, Self::Error> {
        match inputs {
            [src_layer, src_iter, weights_layer, weights_iter, bias] => Ok(Self::Hidden {
                src_layer: src_layer.clone(),
                src_iter: src_iter.clone(),
                weights_layer: weights_layer.clone(),
                weights_iter: weights_iter.clone(),
                bias: bias.clone(),
            }),
            [src_layer, src_iter, src_iter_c, weights_layer, weights_iter, bias] => Ok(Self::WithCellState {
                src_layer: src_layer.clone(),
                src_iter: src_iter.clone(),
                src_iter_c: src_iter_c.clone(),
                weights_layer: weights_layer.clone(),
                weights_iter: weights_iter.clone(),
                bias: bias.clone(),
            }),
            _ => Err(OperationError::ArityMismatch { op: OPNAME.to_string(), expected: vec![5, 6], actual: inputs.len() }),
        }
    }
}

/// Multi-timestep, multi-layer, optionally bidirectional recurrent layer fused
/// into a single node.
///
/// Outputs are the per-timestep hidden states `[T * N, D * H]` followed by the
/// final recurrent state(s): `[S * D * L * N, H]` for the 5 input form, or two
/// `[D * L * N, H]` tensors (hidden, cell) for the 6 input form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rnn {
    params: RnnParams,
    variant: RnnVariant,
    inputs: Vec<Output>,
    outputs: Vec<TType>,
    batch_size: usize,
    src_layer_feature_size: usize,
    src_iter_feature_size: usize,
    dst_layer_feature_size: usize,
    dst_iter_feature_size: usize,
}

impl Rnn {
    pub fn new(inputs: RnnInputs, params: RnnParams) -> Result<Self, OperationError> {
        let src_layer = inputs.src_layer().shape();
        let src_iter = inputs.src_iter().shape();
        let weights_layer = inputs.weights_layer().shape();
        let weights_iter = inputs.weights_iter().shape();
        let bias = inputs.bias().shape();

        let mismatch = |relation: String| OperationError::shape_mismatch(OPNAME, relation);

        if src_layer.rank() != weights_layer.rank() {
            return Err(mismatch(format!("rank of src_layer ({src_layer:?}) != rank of weights_layer ({weights_layer:?})")));
        }

        if src_iter.rank() != weights_iter.rank() {
            return Err(mismatch(format!("rank of src_iter ({src_iter:?}) != rank of weights_iter ({weights_iter:?})")));
        }

        if src_layer.rank() != 2 {
            return Err(mismatch(format!("src_layer must have rank 2, got {src_layer:?}")));
        }

        if weights_iter.rank() != 2 {
            return Err(mismatch(format!("weights_iter must have rank 2, got {weights_iter:?}")));
        }

        if bias.rank() != 1 {
            return Err(mismatch(format!("bias must have rank 1, got {bias:?}")));
        }

        let RnnParams { num_timesteps, num_gates_per_cell, src_sequence_length, direction, num_fused_layers, .. } =
            params;

        let blocks = exact_mul(OPNAME, "direction * num_fused_layers", &[direction, num_fused_layers])?;

        let batch_size = exact_div(OPNAME, "src_layer[0] / num_timesteps", src_layer[0], num_timesteps)?;
        let dst_iter_feature_size =
            exact_div(OPNAME, "weights_iter[1] / num_gates_per_cell", weights_iter[1], num_gates_per_cell)?;
        let dst_layer_feature_size =
            exact_div(OPNAME, "weights_layer[1] / num_gates_per_cell", weights_layer[1], num_gates_per_cell)?;
        let src_iter_feature_size =
            exact_div(OPNAME, "weights_iter[0] / (direction * num_fused_layers)", weights_iter[0], blocks)?;
        let src_layer_feature_size =
            exact_div(OPNAME, "weights_layer[0] / (direction * num_fused_layers)", weights_layer[0], blocks)?;

        let expected = exact_mul(
            OPNAME,
            "src_sequence_length * batch * src_layer_feature",
            &[src_sequence_length, batch_size, src_layer_feature_size],
        )?;
        if src_layer.checked_size() != Some(expected) {
            return Err(mismatch(format!(
                "size of src_layer ({src_layer:?}) != src_sequence_length * batch * src_layer_feature ({expected})"
            )));
        }

        let bias_per_block = exact_div(OPNAME, "bias[0] / (direction * num_fused_layers)", bias[0], blocks)?;
        if bias_per_block != weights_layer[1] || bias_per_block != weights_iter[1] {
            return Err(mismatch(format!(
                "bias ({bias:?}) per block is {bias_per_block}, weights_layer ({weights_layer:?}) and weights_iter ({weights_iter:?}) need {} and {}",
                weights_layer[1], weights_iter[1],
            )));
        }

        let variant = inputs.variant();
        let inputs = inputs.into_vec();
        let dtype = check_homogeneous(OPNAME, &inputs)?;

        let hidden = [
            exact_mul(OPNAME, "num_timesteps * batch", &[num_timesteps, batch_size])?,
            exact_mul(OPNAME, "direction * src_iter_feature", &[direction, src_iter_feature_size])?,
        ];
        let outputs = match variant {
            RnnVariant::Hidden => {
                let factors = [params.num_cell_states, blocks, batch_size];
                let rows = exact_mul(OPNAME, "num_cell_states * blocks * batch", &factors)?;
                let state = [rows, src_iter_feature_size];
                vec![TType::new(hidden, dtype), TType::new(state, dtype)]
            }
            RnnVariant::WithCellState => {
                let rows = exact_mul(OPNAME, "blocks * batch", &[blocks, batch_size])?;
                let state = TType::new([rows, src_iter_feature_size], dtype);
                vec![TType::new(hidden, dtype), state.clone(), state]
            }
        };

        Ok(Self {
            params,
            variant,
            inputs,
            outputs,
            batch_size,
            src_layer_feature_size,
            src_iter_feature_size,
            dst_layer_feature_size,
            dst_iter_feature_size,
        })
    }

    pub fn params(&self) -> &RnnParams {
        &self.params
    }

    pub fn variant(&self) -> RnnVariant {
        self.variant
    }

    pub fn cell_type(&self) -> CellType {
        self.params.cell_type
    }

    pub fn dtype(&self) -> DType {
        self.outputs[0].dtype()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn src_layer_feature_size(&self) -> usize {
        self.src_layer_feature_size
    }

    pub fn src_iter_feature_size(&self) -> usize {
        self.src_iter_feature_size
    }

    pub fn dst_layer_feature_size(&self) -> usize {
        self.dst_layer_feature_size
    }

    pub fn dst_iter_feature_size(&self) -> usize {
        self.dst_iter_feature_size
    }
}

impl Operation for Rnn {
    fn opname(&self) -> String {
        let p = &self.params;
        format!(
            "rnn.{:?}<timesteps={}, gates={}, states={}, direction={}, layers={}>",
            p.cell_type, p.num_timesteps, p.num_gates_per_cell, p.num_cell_states, p.direction, p.num_fused_layers,
        )
        .to_lowercase()
    }

    fn inputs(&self) -> &[Output] {
        &self.inputs
    }

    fn outputs(&self) -> &[TType] {
        &self.outputs
    }

    fn supported_arities(&self) -> Vec<usize> {
        vec![RnnVariant::Hidden.num_inputs(), RnnVariant::WithCellState.num_inputs()]
    }

    fn recreate_with_new_inputs(&self, inputs: &[Output]) -> Result<Arc<dyn Operation>, OperationError> {
        check_arity(self, inputs.len())?;
        let inputs = RnnInputs::try_from(inputs)?;
        Ok(Arc::new(Self::new(inputs, self.params)?))
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use crate::graph::Graph;

    use super::*;

    fn input(graph: &mut Graph, shape: &[usize]) -> Output {
        graph.add_input(TType::new(shape, DType::F32))
    }

    fn lstm_inputs(graph: &mut Graph, bias: usize) -> RnnInputs {
        RnnInputs::Hidden {
            src_layer: input(graph, &[8, 16]),
            src_iter: input(graph, &[2, 8]),
            weights_layer: input(graph, &[16, 32]),
            weights_iter: input(graph, &[8, 32]),
            bias: input(graph, &[bias]),
        }
    }

    fn lstm_params() -> RnnParams {
        RnnParams::new(CellType::Lstm, 4).cell_states(1)
    }

    #[test]
    fn hidden_state_variant() -> Result<(), OperationError> {
        let mut graph = Graph::default();
        let rnn = Rnn::new(lstm_inputs(&mut graph, 32), lstm_params())?;

        assert_eq!(rnn.batch_size(), 2);
        assert_eq!(rnn.src_layer_feature_size(), 16);
        assert_eq!(rnn.src_iter_feature_size(), 8);
        assert_eq!(rnn.dst_layer_feature_size(), 8);
        assert_eq!(rnn.dst_iter_feature_size(), 8);
        assert_eq!(rnn.outputs(), &[TType::new([8usize, 8], DType::F32), TType::new([2usize, 8], DType::F32)]);

        Ok(())
    }

    #[test]
    fn cell_state_variant() -> Result<(), OperationError> {
        let mut graph = Graph::default();
        let inputs = RnnInputs::WithCellState {
            src_layer: input(&mut graph, &[8, 16]),
            src_iter: input(&mut graph, &[2, 8]),
            src_iter_c: input(&mut graph, &[2, 8]),
            weights_layer: input(&mut graph, &[16, 32]),
            weights_iter: input(&mut graph, &[8, 32]),
            bias: input(&mut graph, &[32]),
        };

        let rnn = Rnn::new(inputs, lstm_params())?;
        let outputs = rnn.outputs();

        assert_eq!(outputs.len(), RnnVariant::WithCellState.num_outputs());
        assert_eq!(outputs[0], TType::new([8usize, 8], DType::F32));
        assert_eq!(outputs[1], outputs[2]);
        assert_eq!(outputs[1], TType::new([2usize, 8], DType::F32));

        Ok(())
    }

    #[test]
    fn stacked_bidirectional_shapes() -> Result<(), OperationError> {
        let mut graph = Graph::default();
        let inputs = RnnInputs::Hidden {
            src_layer: input(&mut graph, &[6, 2]),
            src_iter: input(&mut graph, &[8, 4]),
            weights_layer: input(&mut graph, &[8, 4]),
            weights_iter: input(&mut graph, &[16, 4]),
            bias: input(&mut graph, &[16]),
        };

        let params = RnnParams::new(CellType::Rnn, 3).direction(2).fused_layers(2);
        let rnn = Rnn::new(inputs, params)?;

        assert_eq!(rnn.batch_size(), 2);
        assert_eq!(rnn.outputs(), &[TType::new([6usize, 8], DType::F32), TType::new([8usize, 4], DType::F32)]);

        Ok(())
    }

    #[test]
    fn bias_breaking_division() {
        let mut graph = Graph::default();

        for bias in [33, 64] {
            let err = Rnn::new(lstm_inputs(&mut graph, bias), lstm_params());
            assert!(matches!(err, Err(OperationError::ShapeMismatch { .. })), "{err:?}");
        }
    }

    #[test]
    fn inexact_divisions() {
        let mut graph = Graph::default();

        // 9 rows cannot be split over 4 timesteps
        let inputs = RnnInputs::Hidden {
            src_layer: input(&mut graph, &[9, 16]),
            src_iter: input(&mut graph, &[2, 8]),
            weights_layer: input(&mut graph, &[16, 32]),
            weights_iter: input(&mut graph, &[8, 32]),
            bias: input(&mut graph, &[32]),
        };
        assert!(matches!(Rnn::new(inputs, lstm_params()), Err(OperationError::ShapeMismatch { .. })));

        let params = RnnParams { num_gates_per_cell: 3, ..lstm_params() };
        assert!(matches!(Rnn::new(lstm_inputs(&mut graph, 32), params), Err(OperationError::ShapeMismatch { .. })));

        let params = lstm_params().direction(0);
        assert!(matches!(Rnn::new(lstm_inputs(&mut graph, 32), params), Err(OperationError::ShapeMismatch { .. })));

        let params = RnnParams { src_sequence_length: 3, ..lstm_params() };
        assert!(matches!(Rnn::new(lstm_inputs(&mut graph, 32), params), Err(OperationError::ShapeMismatch { .. })));
    }

    #[test]
    fn rank_checks() {
        let mut graph = Graph::default();
        let inputs = RnnInputs::Hidden {
            src_layer: input(&mut graph, &[8, 16]),
            src_iter: input(&mut graph, &[2, 8]),
            weights_layer: input(&mut graph, &[16, 32, 1]),
            weights_iter: input(&mut graph, &[8, 32]),
            bias: input(&mut graph, &[32]),
        };

        assert!(matches!(Rnn::new(inputs, lstm_params()), Err(OperationError::ShapeMismatch { .. })));
    }

    #[test]
    fn heterogeneous_element_types() {
        let mut graph = Graph::default();
        let inputs = RnnInputs::Hidden {
            src_layer: input(&mut graph, &[8, 16]),
            src_iter: input(&mut graph, &[2, 8]),
            weights_layer: input(&mut graph, &[16, 32]),
            weights_iter: input(&mut graph, &[8, 32]),
            bias: graph.add_input(TType::new([32usize], DType::F64)),
        };

        let err = Rnn::new(inputs, lstm_params());
        let expected =
            OperationError::TypeMismatch { op: "rnn".to_string(), input: 4, expected: DType::F32, found: DType::F64 };
        assert_eq!(err, Err(expected));
    }

    #[test]
    fn recreate_dispatches_on_arity() -> Result<(), OperationError> {
        let mut graph = Graph::default();
        let rnn = Rnn::new(lstm_inputs(&mut graph, 32), lstm_params())?;

        let same = rnn.recreate_with_new_inputs(&lstm_inputs(&mut graph, 32).into_vec())?;
        assert_eq!(same.outputs(), rnn.outputs());

        let mut six = lstm_inputs(&mut graph, 32).into_vec();
        six.insert(2, input(&mut graph, &[2, 8]));
        let with_cell = rnn.recreate_with_new_inputs(&six)?;
        assert_eq!(with_cell.outputs().len(), 3);
        assert_eq!(with_cell.downcast::<Rnn>().map(Rnn::variant), Some(RnnVariant::WithCellState));

        let four = &six[..4];
        let err = rnn.recreate_with_new_inputs(four);
        assert!(matches!(err, Err(OperationError::ArityMismatch { actual: 4, .. })));

        Ok(())
    }

    #[test]
    fn overflowing_parameters() {
        let mut graph = Graph::default();

        let params = [
            lstm_params().direction(usize::MAX).fused_layers(2),
            RnnParams { src_sequence_length: usize::MAX, ..lstm_params() },
            lstm_params().cell_states(usize::MAX),
        ];

        for params in params {
            let err = Rnn::new(lstm_inputs(&mut graph, 32), params);
            assert!(matches!(err, Err(OperationError::ShapeMismatch { .. })), "{params:?}: {err:?}");
        }

        let inputs = RnnInputs::Hidden {
            src_layer: input(&mut graph, &[8, usize::MAX]),
            src_iter: input(&mut graph, &[2, 8]),
            weights_layer: input(&mut graph, &[16, 32]),
            weights_iter: input(&mut graph, &[8, 32]),
            bias: input(&mut graph, &[32]),
        };
        assert!(matches!(Rnn::new(inputs, lstm_params()), Err(OperationError::ShapeMismatch { .. })));
    }

    /// Extents of a well formed node, `[T, N, C, H, G, D, L, S]`.
    #[derive(Clone, Copy, Debug)]
    struct Extents([usize; 8]);

    impl Extents {
        fn random(rng: &mut StdRng) -> Self {
            let mut extent = |hi: usize| rng.gen_range(1..hi);
            Self([extent(5), extent(5), extent(5), extent(5), extent(5), extent(3), extent(3), extent(3)])
        }

        fn params(&self) -> RnnParams {
            let [t, _, _, _, g, d, l, s] = self.0;
            RnnParams { num_gates_per_cell: g, ..RnnParams::new(CellType::Rnn, t) }
                .direction(d)
                .fused_layers(l)
                .cell_states(s)
        }

        /// `src_layer`, `src_iter`, `weights_layer`, `weights_iter`, `bias`.
        fn shapes(&self) -> [Vec<usize>; 5] {
            let [t, n, c, h, g, d, l, s] = self.0;
            let blocks = d * l;
            [vec![t * n, c], vec![s * blocks * n, h], vec![blocks * c, g * h], vec![blocks * h, g * h], vec![blocks * g * h]]
        }

        fn inputs(&self, graph: &mut Graph, shapes: &[Vec<usize>; 5], with_cell: bool) -> RnnInputs {
            let [src_layer, src_iter, weights_layer, weights_iter, bias] = shapes.clone().map(|x| input(graph, &x));

            if with_cell {
                let [_, n, _, h, _, d, l, _] = self.0;
                let src_iter_c = input(graph, &[d * l * n, h]);
                RnnInputs::WithCellState { src_layer, src_iter, src_iter_c, weights_layer, weights_iter, bias }
            } else {
                RnnInputs::Hidden { src_layer, src_iter, weights_layer, weights_iter, bias }
            }
        }
    }

    fn random_check(rng: &mut StdRng, graph: &mut Graph) {
        let extents = Extents::random(rng);
        let [t, n, c, h, _, d, l, s] = extents.0;
        let shapes = extents.shapes();
        let ty = |dims: [usize; 2]| TType::new(dims, DType::F32);

        let rnn = Rnn::new(extents.inputs(graph, &shapes, false), extents.params()).unwrap();
        assert_eq!((rnn.batch_size(), rnn.src_layer_feature_size()), (n, c), "{extents:?}");
        assert_eq!((rnn.src_iter_feature_size(), rnn.dst_layer_feature_size(), rnn.dst_iter_feature_size()), (h, h, h));
        assert_eq!(rnn.outputs(), &[ty([t * n, d * h]), ty([s * d * l * n, h])], "{extents:?}");

        let rnn = Rnn::new(extents.inputs(graph, &shapes, true), extents.params()).unwrap();
        assert_eq!(rnn.outputs(), &[ty([t * n, d * h]), ty([d * l * n, h]), ty([d * l * n, h])], "{extents:?}");

        // (input, axis) pairs where one extra element always breaks a relation
        let mut breaking = vec![(0, 1), (2, 0), (2, 1), (3, 1), (4, 0)];
        if t > 1 {
            breaking.push((0, 0));
        }
        if d * l > 1 {
            breaking.push((3, 0));
        }

        let (i, axis) = breaking[rng.gen_range(0..breaking.len())];
        let mut perturbed = shapes.clone();
        perturbed[i][axis] += 1;

        let err = Rnn::new(extents.inputs(graph, &perturbed, rng.gen_bool(0.5)), extents.params());
        assert!(matches!(err, Err(OperationError::ShapeMismatch { .. })), "{extents:?}, input {i} axis {axis}: {err:?}");

        let params = RnnParams { src_sequence_length: t + 1, ..extents.params() };
        let err = Rnn::new(extents.inputs(graph, &shapes, false), params);
        assert!(matches!(err, Err(OperationError::ShapeMismatch { .. })), "{extents:?}: {err:?}");
    }

    #[test]
    fn randomised_extents() {
        let mut rng = StdRng::seed_from_u64(0x7272);
        let mut graph = Graph::default();

        for _ in 0..256 {
            random_check(&mut rng, &mut graph);
        }
    }

    #[test]
    fn inexact_gate_split_of_layer_weights() {
        let mut graph = Graph::default();
        let inputs = RnnInputs::Hidden {
            src_layer: input(&mut graph, &[8, 16]),
            src_iter: input(&mut graph, &[2, 8]),
            weights_layer: input(&mut graph, &[16, 33]),
            weights_iter: input(&mut graph, &[8, 32]),
            bias: input(&mut graph, &[32]),
        };

        match Rnn::new(inputs, lstm_params()) {
            Err(OperationError::ShapeMismatch { relation, .. }) => assert!(relation.starts_with("weights_layer[1]")),
            other => panic!("expected a shape mismatch, got {other:?}"),
        }
    }
}
