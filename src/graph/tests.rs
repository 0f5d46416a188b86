use crate::operation::{ReduceMax, ReduceSum};

use super::*;

#[test]
fn construct() -> Result<(), GraphError> {
    let mut graph = Graph::default();

    let x = graph.add_input(TType::new([2usize, 3], DType::F32));
    let y = graph.add_op(ReduceMax::new(x.clone(), [1])?)?;
    let z = graph.add_op(ReduceSum::new(graph.output(y, 0)?, [0])?)?;

    assert_eq!(graph.num_nodes(), 3);
    assert_eq!(graph.inputs().collect::<Vec<_>>(), vec![x.node()]);
    assert_eq!(graph.output(z, 0)?.ty(), &TType::new(Shape::scalar(), DType::F32));
    assert!(graph.node(x.node())?.is_input());
    assert!(!graph.node(z)?.is_input());

    let order = graph.nodes().map(Node::id).collect::<Vec<_>>();
    assert_eq!(order, vec![x.node(), y, z]);

    Ok(())
}

#[test]
fn rejects_foreign_outputs() -> Result<(), GraphError> {
    let mut graph = Graph::default();
    let x = graph.add_input(TType::new([4usize], DType::F32));

    let mut other = Graph::default();
    let _ = other.add_input(TType::new([4usize], DType::F32));
    let foreign = other.add_input(TType::new([4usize, 4], DType::I32));

    let err = graph.add_op(ReduceMax::new(foreign, [0])?);
    assert_eq!(err, Err(GraphError::NodeDoesNotExist(NodeId(1))));

    let fake = Output::new(x.node(), 0, TType::new([5usize], DType::F32));
    let err = graph.add_op(ReduceMax::new(fake, [0])?);
    assert_eq!(err, Err(GraphError::InvalidOutput { node: x.node(), index: 0 }));

    let fake = Output::new(x.node(), 1, TType::new([4usize], DType::F32));
    let err = graph.add_op(ReduceMax::new(fake, [0])?);
    assert_eq!(err, Err(GraphError::OutputOutOfBounds { node: x.node(), index: 1 }));

    assert_eq!(graph.num_nodes(), 1);

    Ok(())
}

#[test]
fn replace_inputs() -> Result<(), GraphError> {
    let mut graph = Graph::default();

    let x = graph.add_input(TType::new([3usize, 5], DType::F64));
    let y = graph.add_input(TType::new([3usize, 5], DType::F64));
    let z = graph.add_op(ReduceMax::new(x, [0])?)?;

    let new = graph.replace_inputs(z, &[y.clone()])?;
    let node = graph.node(new)?;

    assert_eq!(node.op().inputs(), &[y]);
    assert_eq!(node.op().outputs(), graph.node(z)?.op().outputs());

    let bad = graph.add_input(TType::new([3usize], DType::F64));
    let err = graph.replace_inputs(z, &[bad]);
    assert!(matches!(err, Err(GraphError::Operation(_))));

    Ok(())
}

#[test]
fn display() -> Result<(), GraphError> {
    let mut graph = Graph::default();

    let x = graph.add_input(TType::new([2usize, 3], DType::F32));
    let _ = graph.add_op(ReduceMax::new(x, [1])?)?;

    let expected = "%0 = input<f32[2x3]>() -> f32[2x3]\n%1 = reduce.max<axes=[1]>(%0) -> f32[2]\n";
    assert_eq!(format!("{graph}"), expected);

    Ok(())
}
