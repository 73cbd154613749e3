#![no_main]

use libfuzzer_sys::fuzz_target;
use strata_analytics::coarsen::coarsen;
use strata_core::graph::{Edge, Graph, Orientation};

fuzz_target!(|data: &[u8]| {
    let Some((&n, rest)) = data.split_first() else {
        return;
    };
    let n = usize::from(n % 32) + 1;
    let (labels, edge_bytes) = rest.split_at(rest.len().min(n));
    if labels.len() != n {
        return;
    }
    let edges: Vec<Edge> = edge_bytes
        .chunks_exact(2)
        .map(|pair| Edge::unit(u32::from(pair[0]) % n as u32, u32::from(pair[1]) % n as u32))
        .collect();
    let graph = Graph::from_edges(n, &edges, false, Orientation::Forward).unwrap();
    let result = coarsen(&graph, labels).unwrap();

    assert!(result.coarse_vertex_count() <= n);
    assert_eq!(result.member_vertices.len(), n);
    assert!(result.graph.edge_count() <= graph.edge_count());
});
