#![no_main]

use libfuzzer_sys::fuzz_target;
use strata_core::graph::Graph;

fuzz_target!(|data: &[u8]| {
    // Anything that decodes must already satisfy the CSR invariants.
    if let Ok(graph) = serde_json::from_slice::<Graph>(data) {
        let n = graph.vertex_count();
        assert_eq!(graph.offsets()[n], graph.edge_count());
        assert!(graph.indices().iter().all(|&i| (i as usize) < n));

        let encoded = serde_json::to_vec(&graph).unwrap();
        let back: Graph = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(back, graph);
    }
});
