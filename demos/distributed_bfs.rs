//! Distributed BFS and PageRank over in-process ranks
//!
//! Builds a grid road network keyed by sparse 64-bit ids, renumbers it,
//! shards it across four ranks and runs BFS plus PageRank collectively.
//!
//! Run with: `SHARDGRAPH_LOG=debug cargo run --example distributed_bfs`

use anyhow::{bail, Context};
use shardgraph::storage::{build_edge_list, TypedEdges, VertexColumn};
use shardgraph::{
    bfs, pagerank, BfsConfig, CompressedShard, Comms, Orientation, PageRankConfig, ThreadComms,
};
use tracing_subscriber::{fmt, EnvFilter};

const SIDE: i64 = 24;
const RANKS: usize = 4;

fn init_logging() {
    let filter =
        EnvFilter::try_from_env("SHARDGRAPH_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init();
}

/// Intersection ids look like 1_000_000 + row * 1000 + col
fn grid_edges() -> (Vec<i64>, Vec<i64>) {
    let id = |r: i64, c: i64| 1_000_000 + r * 1000 + c;
    let mut src = Vec::new();
    let mut dst = Vec::new();
    for r in 0..SIDE {
        for c in 0..SIDE {
            for (dr, dc) in [(0, 1), (1, 0), (0, -1), (-1, 0)] {
                let (nr, nc) = (r + dr, c + dc);
                if (0..SIDE).contains(&nr) && (0..SIDE).contains(&nc) {
                    src.push(id(r, c));
                    dst.push(id(nr, nc));
                }
            }
        }
    }
    (src, dst)
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let (src, dst) = grid_edges();
    let built = build_edge_list(VertexColumn::from(&src[..]), VertexColumn::from(&dst[..]), None)
        .context("renumbering grid edges")?;
    let n = built.num_vertices();
    let TypedEdges::Float32(edges) = built.edges else {
        bail!("unweighted edges should be float32");
    };
    println!("✓ Renumbered {} edges over {n} intersections", edges.len());

    let out_shards = CompressedShard::build_partitioned(&edges, n, RANKS, Orientation::Out)?;
    for shard in &out_shards {
        let view = shard.view();
        println!(
            "   rank {}: vertices {:?}, {} edges",
            shard.rank(),
            view.local_vertex_range(),
            view.num_local_edges()
        );
    }

    let origin = built
        .numbering_map
        .dense_id(1_000_000)
        .context("corner intersection missing")?;

    let results = ThreadComms::launch(RANKS, |comms| {
        let shard = &out_shards[comms.rank()];
        let reach = bfs(&shard.view(), &comms, &[origin], &BfsConfig::default())?;
        let transposed = shard.materialize_transpose(&comms)?;
        let ranks = pagerank(&transposed.view(), &comms, &PageRankConfig::default())?;
        Ok((reach, ranks))
    })?;

    // Every rank holds the full replicated result
    let (reach, ranks) = &results[0];
    let farthest = reach
        .distances
        .iter()
        .enumerate()
        .max_by_key(|&(_, &d)| d)
        .map(|(v, _)| v)
        .context("empty result")?;
    let path = reach
        .path_to(shardgraph::VertexId(u32::try_from(farthest)?))
        .context("farthest intersection unreachable")?;
    let original_path = built.numbering_map.unrenumber(&path)?;
    println!(
        "\n🔍 BFS from 1000000: farthest intersection {} at {} hops",
        original_path.last().copied().unwrap_or_default(),
        path.len() - 1
    );
    println!("   route: {original_path:?}");

    let mut top: Vec<(usize, f64)> = ranks.scores.iter().copied().enumerate().collect();
    top.sort_by(|a, b| b.1.total_cmp(&a.1));
    println!(
        "\n📈 PageRank converged in {} iterations (residual {:.2e})",
        ranks.iterations, ranks.residual
    );
    for &(v, score) in top.iter().take(5) {
        let original = built.numbering_map.unrenumber(&[u32::try_from(v)?])?;
        println!("   {:>8}  {score:.6}", original[0]);
    }
    if let Some(warning) = &ranks.warning {
        println!("   ⚠️  {warning}");
    }

    Ok(())
}
