mod args;

pub use args::LowerArgs;

use std::{collections::HashMap, time::Instant};

use tracing::{debug, info, trace};

use crate::{
    backend::{BufferArgs, Kernel, KernelRegistry},
    common::{DTypeTensor, TType},
    error::{ExecutionError, GraphError, LowerError},
    graph::{Graph, NodeId},
};

struct LoweredNode {
    id: NodeId,
    kernel: Kernel,
    inputs: Vec<(NodeId, usize)>,
    outputs: Vec<TType>,
    is_input: bool,
    time_spent: Option<(u128, u64)>,
}

/// Kernels for every node of a graph, in execution order.
pub struct LoweredGraph {
    nodes: Vec<LoweredNode>,
    profile: bool,
}

/// Builds one kernel per node with contiguous buffers, stopping at the first
/// node that cannot be lowered.
pub fn lower(graph: &Graph, registry: &KernelRegistry, args: LowerArgs) -> Result<LoweredGraph, LowerError> {
    if args.emit_ir {
        info!("lowering graph\n{graph}");
    }

    let mut nodes = Vec::with_capacity(graph.num_nodes());

    for node in graph.nodes() {
        let op = node.op();
        let buffers = BufferArgs::contiguous(op);

        let kernel =
            registry.build(op, &buffers).map_err(|source| LowerError::Node { node: node.id(), source: Box::new(source) })?;

        debug!(node = ?node.id(), kernel = kernel.name(), "lowered");

        nodes.push(LoweredNode {
            id: node.id(),
            kernel,
            inputs: op.inputs().iter().map(|x| (x.node(), x.index())).collect(),
            outputs: op.outputs().to_vec(),
            is_input: node.is_input(),
            time_spent: None,
        });
    }

    Ok(LoweredGraph { nodes, profile: args.profile })
}

impl LoweredGraph {
    pub fn num_kernels(&self) -> usize {
        self.nodes.len()
    }

    pub fn kernel(&self, node: NodeId) -> Option<&Kernel> {
        self.nodes.get(node.inner()).map(|x| &x.kernel)
    }

    /// Runs every kernel in order, `inputs` must seed exactly the leaves.
    ///
    /// Returns the outputs of every node.
    pub fn execute(
        &mut self,
        mut inputs: HashMap<NodeId, DTypeTensor>,
    ) -> Result<HashMap<NodeId, Vec<DTypeTensor>>, ExecutionError> {
        for &id in inputs.keys() {
            match self.nodes.get(id.inner()) {
                None => return Err(GraphError::NodeDoesNotExist(id).into()),
                Some(node) if !node.is_input => return Err(ExecutionError::SeededNonLeaf(id)),
                Some(_) => {}
            }
        }

        let mut values: Vec<Vec<DTypeTensor>> = Vec::with_capacity(self.nodes.len());

        for node in &mut self.nodes {
            let mut outputs = if node.is_input {
                let seed = inputs.remove(&node.id).ok_or(ExecutionError::MissingInput(node.id))?;
                let ty = &node.outputs[0];

                if seed.dtype() != ty.dtype() || seed.size() != ty.size() {
                    return Err(ExecutionError::InvalidSeed(node.id));
                }

                vec![seed]
            } else {
                node.outputs.iter().map(|ty| DTypeTensor::zeroed(ty.dtype(), ty.size())).collect()
            };

            let args = node
                .inputs
                .iter()
                .map(|&(id, index)| {
                    values
                        .get(id.inner())
                        .and_then(|x| x.get(index))
                        .ok_or(GraphError::OutputOutOfBounds { node: id, index })
                })
                .collect::<Result<Vec<_>, _>>()?;

            trace!(node = ?node.id, kernel = node.kernel.name(), "executing");

            let start = self.profile.then(Instant::now);

            let mut refs = outputs.iter_mut().collect::<Vec<_>>();
            node.kernel.execute(&args, &mut refs).map_err(|source| ExecutionError::Kernel { node: node.id, source })?;

            if let Some(start) = start {
                let (time, runs) = node.time_spent.get_or_insert((0, 0));
                *time += start.elapsed().as_micros();
                *runs += 1;
            }

            values.push(outputs);
        }

        Ok(self.nodes.iter().map(|x| x.id).zip(values).collect())
    }

    pub fn report_profiles(&self) {
        println!("---------------------------- Profile ----------------------------");
        println!("Kernel                                   Node      Avg (us)");
        println!("-----------------------------------------------------------------");
        let mut count = 0;

        for node in &self.nodes {
            if let Some((time, runs)) = node.time_spent {
                count += 1;
                let avg = time / u128::from(runs);
                let name = node.kernel.name();
                let id = format!("{:?}", node.id);
                println!("{name: <40} {id: <9} {avg}");
            }
        }

        if count == 0 {
            println!("No profiling data!");
        }

        println!("-----------------------------------------------------------------");
    }
}
