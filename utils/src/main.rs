mod reduce;
mod rnn;

use structopt::StructOpt;

#[derive(StructOpt)]
pub enum Options {
    Reduce(reduce::ReduceOptions),
    Rnn(rnn::RnnOptions),
}

fn main() -> anyhow::Result<()> {
    match Options::from_args() {
        Options::Reduce(options) => options.run(),
        Options::Rnn(options) => options.run(),
    }
}
