mod display;
#[cfg(test)]
mod tests;

use std::{fmt, sync::Arc};

use crate::{
    common::{DType, Shape, TType},
    error::GraphError,
    operation::{Input, Operation},
};

#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) fn from_inner(id: usize) -> Self {
        Self(id)
    }

    pub fn inner(self) -> usize {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Typed reference to one result slot of a node.
///
/// Does not own its producer, it is resolved through the [`Graph`] that
/// handed it out.
#[derive(Clone, Hash, PartialEq, Eq)]
pub struct Output {
    node: NodeId,
    index: usize,
    ty: TType,
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.index == 0 {
            write!(f, "{:?}", self.node)
        } else {
            write!(f, "{:?}.{}", self.node, self.index)
        }
    }
}

impl Output {
    pub(crate) fn new(node: NodeId, index: usize, ty: TType) -> Self {
        Self { node, index, ty }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn ty(&self) -> &TType {
        &self.ty
    }

    pub fn shape(&self) -> &Shape {
        self.ty.shape()
    }

    pub fn dtype(&self) -> DType {
        self.ty.dtype()
    }
}

#[derive(Clone, Debug)]
pub struct Node {
    id: NodeId,
    op: Arc<dyn Operation>,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn op(&self) -> &dyn Operation {
        self.op.as_ref()
    }

    pub fn output(&self, index: usize) -> Option<Output> {
        self.op.outputs().get(index).map(|ty| Output::new(self.id, index, ty.clone()))
    }

    pub fn outputs(&self) -> Vec<Output> {
        self.op.outputs().iter().enumerate().map(|(i, ty)| Output::new(self.id, i, ty.clone())).collect()
    }

    pub fn is_input(&self) -> bool {
        self.op().is::<Input>()
    }
}

/// Arena of validated operators, ids are insertion indices so iteration
/// order is a topological order.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    nodes: Vec<Node>,
}

impl Graph {
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Ids of every leaf node.
    pub fn inputs(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().filter(|node| node.is_input()).map(Node::id)
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, GraphError> {
        self.nodes.get(id.0).ok_or(GraphError::NodeDoesNotExist(id))
    }

    pub fn output(&self, id: NodeId, index: usize) -> Result<Output, GraphError> {
        self.node(id)?.output(index).ok_or(GraphError::OutputOutOfBounds { node: id, index })
    }

    pub fn outputs(&self, id: NodeId) -> Result<Vec<Output>, GraphError> {
        self.node(id).map(Node::outputs)
    }

    #[must_use]
    pub fn add_input(&mut self, ty: TType) -> Output {
        let id = self.push(Arc::new(Input::new(ty.clone())));
        Output::new(id, 0, ty)
    }

    pub fn add_op(&mut self, op: impl Operation) -> Result<NodeId, GraphError> {
        self.add_op_dyn(Arc::new(op))
    }

    pub fn add_op_dyn(&mut self, op: Arc<dyn Operation>) -> Result<NodeId, GraphError> {
        for input in op.inputs() {
            self.check_output(input)?;
        }

        Ok(self.push(op))
    }

    /// Rebuilds the operator of `id` on `inputs` and appends it as a new node.
    pub fn replace_inputs(&mut self, id: NodeId, inputs: &[Output]) -> Result<NodeId, GraphError> {
        let op = self.node(id)?.op().recreate_with_new_inputs(inputs)?;
        self.add_op_dyn(op)
    }

    fn check_output(&self, output: &Output) -> Result<(), GraphError> {
        let (node, index) = (output.node, output.index);
        let producer = self.output(node, index)?;

        if producer.ty != output.ty {
            return Err(GraphError::InvalidOutput { node, index });
        }

        Ok(())
    }

    fn push(&mut self, op: Arc<dyn Operation>) -> NodeId {
        let id = NodeId::from_inner(self.nodes.len());
        self.nodes.push(Node { id, op });
        id
    }
}
