//! Benchmarks for the SEMI-NCA dominator engine over synthetic CFG shapes.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use logicscript::utils::graph::{
    algorithms::compute_dominators, DirectedGraph, GraphBase, NodeId, Predecessors, RootedGraph,
    Successors,
};

struct Rooted {
    graph: DirectedGraph<()>,
    entry: NodeId,
}

impl GraphBase for Rooted {
    fn node_count(&self) -> usize {
        self.graph.node_count()
    }
    fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        self.graph.node_ids()
    }
}
impl Successors for Rooted {
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.graph.successors(node)
    }
}
impl Predecessors for Rooted {
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.graph.predecessors(node)
    }
}
impl RootedGraph for Rooted {
    fn entry(&self) -> NodeId {
        self.entry
    }
}

/// A ladder of if/else diamonds with a back edge every eighth rung — the shape real
/// logic resources take, scaled up.
fn diamond_ladder(rungs: usize) -> Rooted {
    let mut graph: DirectedGraph<()> = DirectedGraph::new();
    let entry = graph.add_node(());
    let mut tail = entry;
    let mut headers = Vec::new();

    for rung in 0..rungs {
        let split = graph.add_node(());
        let left = graph.add_node(());
        let right = graph.add_node(());
        let join = graph.add_node(());
        graph.add_edge(tail, split).unwrap();
        graph.add_edge(split, left).unwrap();
        graph.add_edge(split, right).unwrap();
        graph.add_edge(left, join).unwrap();
        graph.add_edge(right, join).unwrap();

        headers.push(split);
        if rung % 8 == 7 {
            let back_to = headers[rung / 2];
            graph.add_edge(join, back_to).unwrap();
        }
        tail = join;
    }

    Rooted { graph, entry }
}

fn bench_dominators(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_dominators");
    for rungs in [16usize, 64, 256] {
        let rooted = diamond_ladder(rungs);
        group.bench_with_input(
            BenchmarkId::from_parameter(rooted.node_count()),
            &rooted,
            |b, rooted| b.iter(|| compute_dominators(rooted)),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_dominators);
criterion_main!(benches);
