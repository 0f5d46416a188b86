use std::fmt;

use super::Graph;

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in self.nodes() {
            let op = node.op();

            write!(f, "{:?} = {}(", node.id(), op.opname())?;

            for (i, input) in op.inputs().iter().enumerate() {
                if i != 0 {
                    write!(f, ", ")?;
                }

                write!(f, "{input:?}")?;
            }

            write!(f, ") -> ")?;

            let outputs = op.outputs();

            if outputs.len() != 1 {
                write!(f, "(")?;
            }

            for (i, ty) in outputs.iter().enumerate() {
                if i != 0 {
                    write!(f, ", ")?;
                }

                write!(f, "{ty:?}")?;
            }

            if outputs.len() != 1 {
                write!(f, ")")?;
            }

            writeln!(f)?;
        }

        Ok(())
    }
}
