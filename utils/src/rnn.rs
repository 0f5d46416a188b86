use std::collections::HashMap;

use anyhow::Context;
use kernel_lowering::{
    common::rng,
    lower,
    operation::{CellType, Rnn, RnnInputs, RnnParams},
    DType, DTypeTensor, Graph, KernelRegistry, LowerArgs, Operation, TType,
};
use rand::{rngs::StdRng, SeedableRng};
use structopt::StructOpt;

fn parse_cell(cell: &str) -> anyhow::Result<CellType> {
    match cell {
        "rnn" => Ok(CellType::Rnn),
        "lstm" => Ok(CellType::Lstm),
        "gru" => Ok(CellType::Gru),
        _ => anyhow::bail!("Unknown cell type '{cell}'!"),
    }
}

#[derive(StructOpt)]
pub struct RnnOptions {
    /// One of `rnn`, `lstm` or `gru`.
    #[structopt(short, long, default_value = "lstm", parse(try_from_str = parse_cell))]
    cell: CellType,
    #[structopt(short, long, default_value = "4")]
    timesteps: usize,
    #[structopt(short, long, default_value = "2")]
    batch: usize,
    #[structopt(long, default_value = "16")]
    channels: usize,
    #[structopt(long, default_value = "8")]
    hidden: usize,
    #[structopt(long, default_value = "1")]
    direction: usize,
    #[structopt(long, default_value = "1")]
    layers: usize,
    /// Pass the lstm cell state as a separate input.
    #[structopt(long)]
    cell_state_input: bool,
    /// Lower and run the cell on random data.
    #[structopt(long)]
    run: bool,
    #[structopt(long)]
    profile: bool,
    #[structopt(long, default_value = "0")]
    seed: u64,
}

impl RnnOptions {
    pub fn run(&self) -> anyhow::Result<()> {
        let (t, n, c, h) = (self.timesteps, self.batch, self.channels, self.hidden);
        let blocks = self.direction * self.layers;
        let gates = self.cell.num_gates();

        let mut graph = Graph::default();
        let mut add = |shape: &[usize]| graph.add_input(TType::new(shape, DType::F32));

        let src_layer = add(&[t * n, c]);

        let inputs = if self.cell_state_input {
            RnnInputs::WithCellState {
                src_layer,
                src_iter: add(&[blocks * n, h]),
                src_iter_c: add(&[blocks * n, h]),
                weights_layer: add(&[blocks * c, gates * h]),
                weights_iter: add(&[blocks * h, gates * h]),
                bias: add(&[blocks * gates * h]),
            }
        } else {
            RnnInputs::Hidden {
                src_layer,
                src_iter: add(&[self.cell.num_states() * blocks * n, h]),
                weights_layer: add(&[blocks * c, gates * h]),
                weights_iter: add(&[blocks * h, gates * h]),
                bias: add(&[blocks * gates * h]),
            }
        };

        let params = RnnParams::new(self.cell, t).direction(self.direction).fused_layers(self.layers);
        let rnn = Rnn::new(inputs, params).with_context(|| "Invalid recurrent cell configuration.")?;

        println!("Operation : {}", rnn.opname());
        for (i, input) in rnn.inputs().iter().enumerate() {
            println!("Input {i}   : {:?}", input.ty());
        }
        for (i, output) in rnn.outputs().iter().enumerate() {
            println!("Output {i}  : {output:?}");
        }

        if !self.run {
            return Ok(());
        }

        let leaves = rnn.inputs().to_vec();
        let node = graph.add_op(rnn)?;

        let mut args = LowerArgs::default();
        if self.profile {
            args = args.profile();
        }

        let mut lowered = lower(&graph, &KernelRegistry::cpu(), args).with_context(|| "Failed to lower graph.")?;

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut seeds = HashMap::new();
        for leaf in &leaves {
            let values = rng::vec_f32(&mut rng, leaf.ty().size(), 0.0, 0.5, false)?;
            seeds.insert(leaf.node(), DTypeTensor::F32(values));
        }

        let outputs = lowered.execute(seeds).with_context(|| "Failed to execute graph.")?;
        let results = outputs.get(&node).with_context(|| "Missing cell outputs.")?;

        for (i, result) in results.iter().enumerate() {
            let DTypeTensor::F32(values) = result else { anyhow::bail!("Unexpected element type!") };
            let shown = values.len().min(8);
            println!("Output {i}  : {:?}{}", &values[..shown], if values.len() > shown { " ..." } else { "" });
        }

        if self.profile {
            lowered.report_profiles();
        }

        Ok(())
    }
}
