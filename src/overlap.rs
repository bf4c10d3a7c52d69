//! Overlap scoring and resolution.
//!
//! The overlap score sums, over all drawn vertex pairs, how far inside
//! one bond length the pair sits (normalized by the bond length). It is
//! the objective the resolvers reduce — never required to reach zero.
//!
//! Three passes, strictly local:
//! 1. primary — substituents placed symmetrically off a ring atom and
//!    therefore coinciding exactly are rotated apart, trying both
//!    directions and keeping the better one;
//! 2. rotatable edges — the shorter subtree of an overlapping rotatable
//!    bond is rotated ~120 degrees away, kept only when the global score
//!    does not get worse;
//! 3. terminal nudges — overlapping terminal vertices are rotated ~20
//!    degrees away from their nearest vertex, unconditionally.
//!
//! Rejected rotations are undone by restoring a position snapshot, so a
//! revert is bit-for-bit exact.

use petgraph::graph::{EdgeIndex, NodeIndex};
use tracing::debug;

use crate::geometry::{Vec2, to_rad};
use crate::graph::{BondKind, MolGraph};
use crate::layout::LayoutOptions;
use crate::rings::RingModel;

/// Global and per-vertex overlap totals.
pub struct OverlapScore {
    pub total: f64,
    /// Indexed by vertex index.
    pub vertex_scores: Vec<f64>,
    /// `(vertex, score)`, highest first.
    pub sorted: Vec<(NodeIndex, f64)>,
}

/// Score the current positions. Non-negative; each pair contributes
/// symmetrically to both vertices.
pub fn overlap_score(graph: &MolGraph, opts: &LayoutOptions) -> OverlapScore {
    let n = graph.vertex_count();
    let bond_length_sq = opts.bond_length * opts.bond_length;
    let mut total = 0.0;
    let mut vertex_scores = vec![0.0; n];

    let vertices: Vec<NodeIndex> = graph.vertices().collect();
    for (i, &a) in vertices.iter().enumerate() {
        for &b in vertices.iter().skip(i + 1) {
            if !graph.vertex(a).is_drawn || !graph.vertex(b).is_drawn {
                continue;
            }
            let dist_sq = graph.vertex(a).position.distance_sq(graph.vertex(b).position);
            if dist_sq < bond_length_sq {
                let weighted = (opts.bond_length - dist_sq.sqrt()) / opts.bond_length;
                total += weighted;
                vertex_scores[a.index()] += weighted;
                vertex_scores[b.index()] += weighted;
            }
        }
    }

    let mut sorted: Vec<(NodeIndex, f64)> = vertices
        .iter()
        .map(|&v| (v, vertex_scores[v.index()]))
        .collect();
    sorted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    OverlapScore {
        total,
        vertex_scores,
        sorted,
    }
}

/// Run all three resolution passes and return the final total score.
pub fn resolve(graph: &mut MolGraph, rings: &mut RingModel, opts: &LayoutOptions) -> f64 {
    resolve_primary(graph, rings, opts);
    resolve_rotatable_edges(graph, rings, opts);
    let score = overlap_score(graph, opts);
    resolve_terminal_nudges(graph, &score, opts);
    let total = overlap_score(graph, opts).total;
    debug!(total, "overlap resolution finished");
    total
}

/// Saved positions of a set of vertices plus the anchored ring centers,
/// for exact restore after a rejected rotation.
struct Snapshot {
    positions: Vec<(NodeIndex, Vec2)>,
    ring_centers: Vec<(usize, Vec2)>,
}

fn snapshot(graph: &MolGraph, rings: &RingModel, vertices: &[NodeIndex]) -> Snapshot {
    let mut ring_centers = Vec::new();
    for &v in vertices {
        for &rid in &graph.vertex(v).anchored_rings {
            if let Some(r) = rings.get(rid) {
                ring_centers.push((rid, r.center));
            }
        }
    }
    Snapshot {
        positions: vertices
            .iter()
            .map(|&v| (v, graph.vertex(v).position))
            .collect(),
        ring_centers,
    }
}

fn restore(graph: &mut MolGraph, rings: &mut RingModel, snap: &Snapshot) {
    for &(v, pos) in &snap.positions {
        graph.vertex_mut(v).position = pos;
    }
    for &(rid, center) in &snap.ring_centers {
        if let Some(r) = rings.get_mut(rid) {
            r.center = center;
        }
    }
}

/// Rotate the subtree rooted at `start` (not crossing `exclude`) around
/// `center`, dragging anchored ring centers along.
pub(crate) fn rotate_subtree(
    graph: &mut MolGraph,
    rings: &mut RingModel,
    start: NodeIndex,
    exclude: NodeIndex,
    angle: f64,
    center: Vec2,
) {
    for v in graph.subtree_vertices(start, exclude) {
        let anchored = graph.vertex(v).anchored_rings.clone();
        let vert = graph.vertex_mut(v);
        vert.position = vert.position.rotated_around(angle, center);
        for rid in anchored {
            if let Some(r) = rings.get_mut(rid) {
                r.center = r.center.rotated_around(angle, center);
            }
        }
    }
}

/// Mean above-threshold overlap of the subtree at `start`.
fn subtree_overlap(
    graph: &MolGraph,
    start: NodeIndex,
    exclude: NodeIndex,
    scores: &[f64],
    opts: &LayoutOptions,
) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for v in graph.subtree_vertices(start, exclude) {
        if !graph.vertex(v).is_drawn {
            continue;
        }
        let s = scores[v.index()];
        if s > opts.overlap_sensitivity {
            sum += s;
            count += 1;
        }
    }
    if count == 0 { 0.0 } else { sum / count as f64 }
}

/// Substituents placed off a ring atom from a symmetric start coincide
/// exactly; rotate them apart by an angle derived from the ring's
/// interior angle, keeping whichever direction scores lower.
fn resolve_primary(graph: &mut MolGraph, rings: &mut RingModel, opts: &LayoutOptions) {
    struct Overlap {
        common: NodeIndex,
        ring: usize,
        vertices: Vec<NodeIndex>,
    }

    let mut done = vec![false; graph.vertex_count()];
    let mut overlaps: Vec<Overlap> = Vec::new();

    for ring in &rings.rings {
        for &member in &ring.members {
            if done[member.index()] {
                continue;
            }
            done[member.index()] = true;

            let non_ring = graph.non_ring_neighbors(member);
            let member_rings = &graph.vertex(member).rings;
            let Some(&first_ring) = member_rings.first() else {
                continue;
            };
            // More than one free substituent, or one substituent on a
            // two-ring junction: both start from symmetric positions.
            if non_ring.len() > 1 || (non_ring.len() == 1 && member_rings.len() == 2) {
                overlaps.push(Overlap {
                    common: member,
                    ring: first_ring,
                    vertices: non_ring,
                });
            }
        }
    }

    for overlap in overlaps {
        if overlap.vertices.len() != 2 {
            // Single-substituent junctions are left to the later passes.
            continue;
        }
        let a = overlap.vertices[0];
        let b = overlap.vertices[1];
        if !graph.vertex(a).is_drawn || !graph.vertex(b).is_drawn {
            continue;
        }
        let Some(ring) = rings.get(overlap.ring) else {
            continue;
        };
        let angle = (2.0 * std::f64::consts::PI - ring.interior_angle()) / 6.0;
        let center = graph.vertex(overlap.common).position;

        let mut affected = graph.subtree_vertices(a, overlap.common);
        affected.extend(graph.subtree_vertices(b, overlap.common));
        let base = snapshot(graph, rings, &affected);

        rotate_subtree(graph, rings, a, overlap.common, angle, center);
        rotate_subtree(graph, rings, b, overlap.common, -angle, center);
        let scores = overlap_score(graph, opts);
        let plus_total = subtree_overlap(graph, a, overlap.common, &scores.vertex_scores, opts)
            + subtree_overlap(graph, b, overlap.common, &scores.vertex_scores, opts);
        let plus = snapshot(graph, rings, &affected);

        restore(graph, rings, &base);
        rotate_subtree(graph, rings, a, overlap.common, -angle, center);
        rotate_subtree(graph, rings, b, overlap.common, angle, center);
        let scores = overlap_score(graph, opts);
        let minus_total = subtree_overlap(graph, a, overlap.common, &scores.vertex_scores, opts)
            + subtree_overlap(graph, b, overlap.common, &scores.vertex_scores, opts);

        if minus_total > plus_total {
            restore(graph, rings, &plus);
        }
    }
}

fn is_edge_rotatable(graph: &MolGraph, edge: EdgeIndex) -> bool {
    if graph.edge(edge).kind != BondKind::Single {
        return false;
    }
    let (a, b) = graph.endpoints(edge);
    if graph.is_terminal(a) || graph.is_terminal(b) {
        return false;
    }
    // A ring bond cannot rotate.
    if !graph.vertex(a).rings.is_empty()
        && !graph.vertex(b).rings.is_empty()
        && graph.in_same_ring(a, b)
    {
        return false;
    }
    true
}

/// Sweep the rotatable edges, rotating the shorter subtree away from its
/// overlap and keeping the rotation only when the global score does not
/// increase.
fn resolve_rotatable_edges(graph: &mut MolGraph, rings: &mut RingModel, opts: &LayoutOptions) {
    let mut score = overlap_score(graph, opts);
    let mut total = score.total;

    for _ in 0..opts.overlap_resolution_iterations {
        let edges: Vec<EdgeIndex> = graph.edges().collect();
        for edge in edges {
            if !is_edge_rotatable(graph, edge) {
                continue;
            }
            let (source, target) = graph.endpoints(edge);
            let depth_source = graph.tree_depth(source, target);
            let depth_target = graph.tree_depth(target, source);

            // Rotate only the shorter side.
            let (anchor, pivot) = if depth_source > depth_target {
                (source, target)
            } else {
                (target, source)
            };

            let sub = subtree_overlap(graph, pivot, anchor, &score.vertex_scores, opts);
            if sub <= opts.overlap_sensitivity {
                continue;
            }

            let free: Vec<NodeIndex> = graph
                .neighbors(pivot)
                .into_iter()
                .filter(|&nb| nb != anchor)
                .collect();

            if free.len() == 1 {
                let nb = free[0];
                let angle = graph.vertex(nb).position.rotate_away_from_angle(
                    graph.vertex(anchor).position,
                    graph.vertex(pivot).position,
                    to_rad(120.0),
                );
                let affected = graph.subtree_vertices(nb, pivot);
                let base = snapshot(graph, rings, &affected);
                let center = graph.vertex(pivot).position;
                rotate_subtree(graph, rings, nb, pivot, angle, center);

                let new_total = overlap_score(graph, opts).total;
                if new_total > total {
                    restore(graph, rings, &base);
                } else {
                    total = new_total;
                }
            } else if free.len() == 2 {
                // Two free branches: swap their sides, unless rings pin
                // either one down.
                if !graph.vertex(pivot).rings.is_empty()
                    && !graph.vertex(anchor).rings.is_empty()
                {
                    continue;
                }
                let nb_a = free[0];
                let nb_b = free[1];
                let rings_a = graph.vertex(nb_a).rings.clone();
                let rings_b = graph.vertex(nb_b).rings.clone();
                if rings_a.len() == 1 && rings_b.len() == 1 {
                    if rings_a[0] != rings_b[0] {
                        continue;
                    }
                } else if !rings_a.is_empty() || !rings_b.is_empty() {
                    continue;
                } else {
                    let center = graph.vertex(pivot).position;
                    let anchor_pos = graph.vertex(anchor).position;
                    let angle_a = graph.vertex(nb_a).position.rotate_away_from_angle(
                        anchor_pos,
                        center,
                        to_rad(120.0),
                    );
                    let angle_b = graph.vertex(nb_b).position.rotate_away_from_angle(
                        anchor_pos,
                        center,
                        to_rad(120.0),
                    );

                    let mut affected = graph.subtree_vertices(nb_a, pivot);
                    affected.extend(graph.subtree_vertices(nb_b, pivot));
                    let base = snapshot(graph, rings, &affected);

                    rotate_subtree(graph, rings, nb_a, pivot, angle_a, center);
                    rotate_subtree(graph, rings, nb_b, pivot, angle_b, center);

                    let new_total = overlap_score(graph, opts).total;
                    if new_total > total {
                        restore(graph, rings, &base);
                    } else {
                        total = new_total;
                    }
                }
            }

            score = overlap_score(graph, opts);
        }
    }
}

/// Decorative pass: rotate overlapping terminal vertices a small step
/// away from whatever sits closest. No revert check.
fn resolve_terminal_nudges(graph: &mut MolGraph, score: &OverlapScore, opts: &LayoutOptions) {
    if graph.vertex_count() < 2 {
        return;
    }
    let second = NodeIndex::new(1);

    for &(vertex, s) in &score.sorted {
        if s <= opts.overlap_sensitivity {
            continue;
        }
        if !graph.is_terminal(vertex) {
            continue;
        }
        let Some(closest) = graph.closest_vertex(vertex) else {
            continue;
        };

        // Vertex 0 has a synthetic previous position; use its first
        // neighbour's instead.
        let closest_position = if closest.index() == 0 {
            graph.vertex(second).position
        } else if graph.is_terminal(closest) {
            graph.vertex(closest).previous_position
        } else {
            graph.vertex(closest).position
        };
        let pivot = if vertex.index() == 0 {
            graph.vertex(second).position
        } else {
            graph.vertex(vertex).previous_position
        };

        let pos = graph.vertex(vertex).position;
        graph.vertex_mut(vertex).position =
            pos.rotated_away_from(closest_position, pivot, to_rad(20.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout;
    use crate::rings::RingModel;
    use crate::smiles::parse;

    fn laid_out(s: &str) -> (MolGraph, RingModel) {
        let mut graph = MolGraph::from_tree(&parse(s).unwrap()).unwrap();
        let mut rings = RingModel::analyze(&mut graph);
        layout::position(&mut graph, &mut rings, &LayoutOptions::default());
        rings.restore(&mut graph);
        (graph, rings)
    }

    #[test]
    fn score_non_negative() {
        let (graph, _) = laid_out("CCCC");
        let score = overlap_score(&graph, &LayoutOptions::default());
        assert!(score.total >= 0.0);
        assert!(score.vertex_scores.iter().all(|&s| s >= 0.0));
    }

    #[test]
    fn clean_layouts_score_zero() {
        for s in ["CCCC", "C1CCCCC1"] {
            let (graph, _) = laid_out(s);
            let score = overlap_score(&graph, &LayoutOptions::default());
            assert!(score.total < 1e-6, "{} scored {}", s, score.total);
        }
    }

    #[test]
    fn pair_contribution_symmetric() {
        // Two coincident substituents: both vertices see the same score.
        let (graph, _) = laid_out("CC1(C)CCCC1");
        let score = overlap_score(&graph, &LayoutOptions::default());
        let a = score.vertex_scores[0];
        let b = score.vertex_scores[2];
        assert!((a - b).abs() < 1e-9);
        assert!(score.total > 0.0);
    }

    #[test]
    fn primary_resolution_separates_gem_substituents() {
        let (mut graph, mut rings) = laid_out("CC1(C)CCCC1");
        let opts = LayoutOptions::default();
        let before = graph
            .vertex(NodeIndex::new(0))
            .position
            .distance(graph.vertex(NodeIndex::new(2)).position);
        assert!(before < 1e-6, "gem substituents start coincident");
        resolve(&mut graph, &mut rings, &opts);
        let after = graph
            .vertex(NodeIndex::new(0))
            .position
            .distance(graph.vertex(NodeIndex::new(2)).position);
        assert!(after > 1.0, "substituents still coincident: {}", after);
    }

    #[test]
    fn resolve_never_returns_nan() {
        for s in ["CCCC", "CC1(C)CCCC1", "C1CC2CC1CC2", "CC(C)(C)C(C)(C)CC(C)(C)O"] {
            let (mut graph, mut rings) = laid_out(s);
            let total = resolve(&mut graph, &mut rings, &LayoutOptions::default());
            assert!(total.is_finite() && total >= 0.0, "{} gave {}", s, total);
            for v in graph.vertices() {
                let p = graph.vertex(v).position;
                assert!(p.x.is_finite() && p.y.is_finite());
            }
        }
    }

    #[test]
    fn rotatable_edge_detection() {
        let (graph, _) = laid_out("CCCCCC");
        let rotatable = graph
            .edges()
            .filter(|&e| is_edge_rotatable(&graph, e))
            .count();
        // Terminal bonds excluded: 5 bonds, 2 terminal.
        assert_eq!(rotatable, 3);
    }

    #[test]
    fn ring_bonds_not_rotatable() {
        let (graph, _) = laid_out("C1CCCCC1");
        assert_eq!(
            graph
                .edges()
                .filter(|&e| is_edge_rotatable(&graph, e))
                .count(),
            0
        );
    }

    #[test]
    fn snapshot_restore_is_bit_exact() {
        let (mut graph, mut rings) = laid_out("CC1(C)CCCC1");
        let all: Vec<NodeIndex> = graph.vertices().collect();
        let before: Vec<u64> = all
            .iter()
            .flat_map(|&v| {
                let p = graph.vertex(v).position;
                [p.x.to_bits(), p.y.to_bits()]
            })
            .collect();
        let snap = snapshot(&graph, &rings, &all);
        let pivot = graph.vertex(NodeIndex::new(1)).position;
        rotate_subtree(
            &mut graph,
            &mut rings,
            NodeIndex::new(0),
            NodeIndex::new(1),
            0.7,
            pivot,
        );
        restore(&mut graph, &mut rings, &snap);
        let after: Vec<u64> = all
            .iter()
            .flat_map(|&v| {
                let p = graph.vertex(v).position;
                [p.x.to_bits(), p.y.to_bits()]
            })
            .collect();
        assert_eq!(before, after);
    }
}
