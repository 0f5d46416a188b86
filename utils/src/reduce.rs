use std::collections::HashMap;

use anyhow::Context;
use kernel_lowering::{
    common::rng,
    lower,
    operation::{ReduceMax, ReduceMin, ReduceProduct, ReduceSum},
    DType, DTypeTensor, Graph, KernelRegistry, LowerArgs, TType,
};
use rand::{rngs::StdRng, SeedableRng};
use structopt::StructOpt;

#[derive(StructOpt)]
pub struct ReduceOptions {
    /// One of `max`, `min`, `sum` or `product`.
    #[structopt(short, long, default_value = "sum")]
    reducer: String,
    #[structopt(required = true, short, long, use_delimiter = true)]
    shape: Vec<usize>,
    #[structopt(short, long, use_delimiter = true)]
    axes: Vec<usize>,
    /// Row-major input values, sampled from N(0, 1) if omitted.
    #[structopt(long, use_delimiter = true, allow_hyphen_values = true)]
    values: Vec<f32>,
    #[structopt(long, default_value = "0")]
    seed: u64,
    #[structopt(long)]
    emit_ir: bool,
}

impl ReduceOptions {
    pub fn run(&self) -> anyhow::Result<()> {
        let ty = TType::new(&self.shape, DType::F32);

        let mut graph = Graph::default();
        let input = graph.add_input(ty.clone());

        let node = match self.reducer.as_str() {
            "max" => graph.add_op(ReduceMax::new(input.clone(), &self.axes)?)?,
            "min" => graph.add_op(ReduceMin::new(input.clone(), &self.axes)?)?,
            "sum" => graph.add_op(ReduceSum::new(input.clone(), &self.axes)?)?,
            "product" => graph.add_op(ReduceProduct::new(input.clone(), &self.axes)?)?,
            other => anyhow::bail!("Unknown reducer '{other}'!"),
        };

        if self.emit_ir {
            println!("{graph}");
        }

        let values = if self.values.is_empty() {
            let mut rng = StdRng::seed_from_u64(self.seed);
            rng::vec_f32(&mut rng, ty.size(), 0.0, 1.0, true)?
        } else {
            self.values.clone()
        };

        anyhow::ensure!(values.len() == ty.size(), "Expected {} values, got {}!", ty.size(), values.len());

        let mut lowered =
            lower(&graph, &KernelRegistry::cpu(), LowerArgs::default()).with_context(|| "Failed to lower graph.")?;

        let seeds = HashMap::from([(input.node(), DTypeTensor::F32(values.clone()))]);
        let outputs = lowered.execute(seeds).with_context(|| "Failed to execute graph.")?;

        let result = outputs.get(&node).and_then(|x| x.first()).with_context(|| "Missing reduction output.")?;
        let output_ty = graph.output(node, 0)?;

        println!("Input  : {ty:?} {values:?}");
        println!("Output : {:?} {result:?}", output_ty.ty());

        Ok(())
    }
}
