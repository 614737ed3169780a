//! Sharded runs must agree with the single-rank result
//!
//! Every algorithm is run on 1 to 4 in-process ranks over the same graph and
//! compared against a `SingleComms` run on the unpartitioned shard.

use shardgraph::{
    bfs, coarsen_graph, core_number, k_core, katz_centrality, pagerank,
    weakly_connected_components, BfsConfig, CompressedShard, Comms, CooEdges, KatzConfig,
    Orientation, PageRankConfig, SingleComms, ThreadComms, VertexId,
};

const N: u32 = 64;

/// Deterministic sparse graph with a few isolated and dangling vertices
fn test_graph() -> CooEdges<f64> {
    let mut state: u64 = 0x5eed;
    let mut next = || {
        state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
        (state >> 33) as u32
    };
    let mut src = Vec::new();
    let mut dst = Vec::new();
    let mut weights = Vec::new();
    for _ in 0..256 {
        // Vertices 56.. never get out-edges
        let s = next() % 56;
        let d = next() % (N - 4);
        src.push(s);
        dst.push(d);
        weights.push(f64::from(next() % 9 + 1));
    }
    CooEdges::new(src, dst, Some(weights)).unwrap()
}

fn shards(coo: &CooEdges<f64>, ranks: usize, orientation: Orientation) -> Vec<CompressedShard<f64>> {
    CompressedShard::build_partitioned(coo, N as usize, ranks, orientation).unwrap()
}

#[test]
fn test_bfs_distances_match() {
    let coo = test_graph();
    let single = CompressedShard::from_coo(&coo, N as usize, Orientation::Out).unwrap();
    let sources = [VertexId(0), VertexId(17)];
    let expected = bfs(&single.view(), &SingleComms, &sources, &BfsConfig::default()).unwrap();

    for ranks in 1..=4 {
        let parts = shards(&coo, ranks, Orientation::Out);
        let results = ThreadComms::launch(ranks, |comms| {
            bfs(&parts[comms.rank()].view(), &comms, &sources, &BfsConfig::default())
        })
        .unwrap();

        for result in &results {
            assert_eq!(result.distances, expected.distances, "{ranks} ranks");
        }
        // Every rank agrees on the predecessor choice
        for result in &results[1..] {
            assert_eq!(result.predecessors, results[0].predecessors);
        }
        // And every predecessor is one level closer along a real edge
        for (v, &p) in results[0].predecessors.iter().enumerate() {
            if p >= 0 {
                let p = p as u32;
                assert_eq!(results[0].distances[p as usize] + 1, results[0].distances[v]);
                assert!(coo.iter().any(|(s, d, _)| s == p && d as usize == v));
            }
        }
    }
}

#[test]
fn test_bfs_depth_limit_matches() {
    let coo = test_graph();
    let config = BfsConfig { max_depth: Some(2) };
    let single = CompressedShard::from_coo(&coo, N as usize, Orientation::Out).unwrap();
    let expected = bfs(&single.view(), &SingleComms, &[VertexId(3)], &config).unwrap();

    let parts = shards(&coo, 3, Orientation::Out);
    let results = ThreadComms::launch(3, |comms| {
        bfs(&parts[comms.rank()].view(), &comms, &[VertexId(3)], &config)
    })
    .unwrap();
    for result in results {
        assert_eq!(result.distances, expected.distances);
        assert!(result.distances.iter().all(|&d| d <= 2 || d == u32::MAX));
    }
}

#[test]
fn test_pagerank_matches() {
    let coo = test_graph();
    let config = PageRankConfig::default();
    let single = CompressedShard::from_coo(&coo, N as usize, Orientation::In).unwrap();
    let expected = pagerank(&single.view(), &SingleComms, &config).unwrap();
    assert!(expected.warning.is_none());

    for ranks in 1..=4 {
        let parts = shards(&coo, ranks, Orientation::In);
        let results = ThreadComms::launch(ranks, |comms| {
            pagerank(&parts[comms.rank()].view(), &comms, &config)
        })
        .unwrap();

        for result in &results {
            for (a, b) in result.scores.iter().zip(&expected.scores) {
                assert!((a - b).abs() < 1e-9, "{ranks} ranks: {a} vs {b}");
            }
        }
        // All ranks reduce in the same order, so the replicas are identical
        for result in &results[1..] {
            assert_eq!(result.scores, results[0].scores);
            assert_eq!(result.iterations, results[0].iterations);
        }
    }
}

#[test]
fn test_katz_matches() {
    let coo = test_graph();
    let config = KatzConfig {
        alpha: 0.005,
        normalize: true,
        ..KatzConfig::default()
    };
    let single = CompressedShard::from_coo(&coo, N as usize, Orientation::In).unwrap();
    let expected = katz_centrality(&single.view(), &SingleComms, &config).unwrap();
    assert!(expected.warning.is_none());

    for ranks in 2..=4 {
        let parts = shards(&coo, ranks, Orientation::In);
        let results = ThreadComms::launch(ranks, |comms| {
            katz_centrality(&parts[comms.rank()].view(), &comms, &config)
        })
        .unwrap();
        for result in results {
            for (a, b) in result.scores.iter().zip(&expected.scores) {
                assert!((a - b).abs() < 1e-9, "{ranks} ranks: {a} vs {b}");
            }
        }
    }
}

#[test]
fn test_components_match() {
    let coo = test_graph().symmetrized();
    let single = CompressedShard::from_coo(&coo, N as usize, Orientation::Out).unwrap();
    let expected = weakly_connected_components(&single.view(), &SingleComms).unwrap();
    // Vertices 60.. have no edges at all
    for v in 60..N as usize {
        assert_eq!(expected.labels[v], v as u32);
    }

    for ranks in 1..=4 {
        let parts = shards(&coo, ranks, Orientation::Out);
        let results = ThreadComms::launch(ranks, |comms| {
            weakly_connected_components(&parts[comms.rank()].view(), &comms)
        })
        .unwrap();
        for result in results {
            assert_eq!(result, expected, "{ranks} ranks");
        }
    }
}

#[test]
fn test_core_numbers_match() {
    let coo = test_graph().symmetrized();
    let single = CompressedShard::from_coo(&coo, N as usize, Orientation::Out).unwrap();
    let expected = core_number(&single.view(), &SingleComms).unwrap();
    assert!(expected.max_core >= 2);
    for v in 60..N as usize {
        assert_eq!(expected.core_numbers[v], 0);
    }
    let k = expected.max_core;
    let mut expected_edges: Vec<(u32, u32)> = k_core(&single, &SingleComms, k, None)
        .unwrap()
        .edge_list()
        .iter()
        .map(|(s, d, _)| (s, d))
        .collect();
    expected_edges.sort_unstable();

    for ranks in 2..=4 {
        let parts = shards(&coo, ranks, Orientation::Out);
        let results = ThreadComms::launch(ranks, |comms| {
            let shard = &parts[comms.rank()];
            let cores = core_number(&shard.view(), &comms)?;
            let sub = k_core(shard, &comms, k, None)?;
            Ok((cores, sub.edge_list()))
        })
        .unwrap();

        let mut edges: Vec<(u32, u32)> = Vec::new();
        for (cores, part) in &results {
            assert_eq!(cores, &expected, "{ranks} ranks");
            edges.extend(part.iter().map(|(s, d, _)| (s, d)));
        }
        edges.sort_unstable();
        assert_eq!(edges, expected_edges, "{ranks} ranks");
    }
}

#[test]
fn test_coarsen_matches() {
    let coo = test_graph();
    let labels: Vec<u32> = (0..N).map(|v| v % 5 * 10).collect();
    let single = CompressedShard::from_coo(&coo, N as usize, Orientation::Out).unwrap();
    let expected = coarsen_graph(&single, &SingleComms, &labels).unwrap();
    let expected_edges: Vec<(u32, u32, f64)> = expected.shard.edge_list().iter().collect();

    for ranks in 2..=4 {
        let parts = shards(&coo, ranks, Orientation::Out);
        let results = ThreadComms::launch(ranks, |comms| {
            let coarse = coarsen_graph(&parts[comms.rank()], &comms, &labels)?;
            Ok((coarse.coarse_vertex_labels, coarse.shard.edge_list()))
        })
        .unwrap();

        let mut edges: Vec<(u32, u32, f64)> = Vec::new();
        for (coarse_labels, part) in &results {
            assert_eq!(coarse_labels, &expected.coarse_vertex_labels);
            edges.extend(part.iter());
        }
        edges.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        assert_eq!(edges.len(), expected_edges.len(), "{ranks} ranks");
        for (a, b) in edges.iter().zip(&expected_edges) {
            assert_eq!((a.0, a.1), (b.0, b.1));
            assert!((a.2 - b.2).abs() < 1e-9);
        }
    }
}

#[test]
fn test_transpose_covers_every_edge() {
    let coo = test_graph();
    let out = shards(&coo, 3, Orientation::Out);

    let transposed = ThreadComms::launch(3, |comms| out[comms.rank()].materialize_transpose(&comms))
        .unwrap();

    let mut all: Vec<(u32, u32)> = Vec::new();
    for shard in &transposed {
        assert_eq!(shard.orientation(), Orientation::In);
        let range = shard.view().local_vertex_range();
        let edges = shard.edge_list();
        assert!(edges.dst().iter().all(|d| range.contains(d)));
        all.extend(edges.iter().map(|(s, d, _)| (s, d)));
    }
    let mut expected: Vec<(u32, u32)> = coo.iter().map(|(s, d, _)| (s, d)).collect();
    all.sort_unstable();
    expected.sort_unstable();
    assert_eq!(all, expected);
}
