use std::sync::Arc;

use crate::{common::TType, error::OperationError, graph::Output};

use super::{check_arity, Operation};

/// Graph leaf, seeded by the executor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Input {
    outputs: [TType; 1],
}

impl Input {
    pub fn new(ty: TType) -> Self {
        Self { outputs: [ty] }
    }

    pub fn ty(&self) -> &TType {
        &self.outputs[0]
    }
}

impl Operation for Input {
    fn opname(&self) -> String {
        format!("input<{:?}>", self.outputs[0])
    }

    fn inputs(&self) -> &[Output] {
        &[]
    }

    fn outputs(&self) -> &[TType] {
        &self.outputs
    }

    fn supported_arities(&self) -> Vec<usize> {
        vec![0]
    }

    fn recreate_with_new_inputs(&self, inputs: &[Output]) -> Result<Arc<dyn Operation>, OperationError> {
        check_arity(self, inputs.len())?;
        Ok(Arc::new(self.clone()))
    }
}
