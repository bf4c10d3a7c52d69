//! Stereochemistry annotation: pick one wedge bond per stereocenter.
//!
//! For each parsed stereocenter the substituents are ranked by a
//! breadth-limited priority walk (a 2D-depiction heuristic in the spirit
//! of CIP ranking, not a certified implementation): level by level, the
//! walk records the atomic numbers reachable through each substituent,
//! weighting every entry by its parent's atomic number and padding
//! unfilled valences with hydrogen placeholders so branches of unequal
//! length compare over equal-length vectors. The sweep direction of the
//! two top-ranked substituents around the already-positioned center,
//! combined with the parsed `@`/`@@` token and the parity of the ranking
//! permutation, yields a best-effort R/S label and the wedge sense.

use petgraph::graph::NodeIndex;
use tracing::debug;

use crate::graph::{MolGraph, StereoDescriptor, Wedge};
use crate::smiles::ChiralityTok;

/// Bound on the priority walk; substituents identical to this depth tie.
const MAX_DEPTH: usize = 10;

/// Annotate every flagged stereocenter with exactly one wedge bond.
pub fn annotate(graph: &mut MolGraph) {
    let centers: Vec<NodeIndex> = graph
        .vertices()
        .filter(|&v| graph.vertex(v).is_stereo_center)
        .collect();
    for center in centers {
        annotate_center(graph, center);
    }
}

fn annotate_center(graph: &mut MolGraph, center: NodeIndex) {
    let neighbours = graph.neighbors(center);
    if neighbours.len() < 2 {
        return;
    }

    // Rank the substituents: one padded level-vector per neighbour.
    let mut priorities: Vec<(usize, Vec<Vec<u32>>)> = Vec::with_capacity(neighbours.len());
    for (slot, &nb) in neighbours.iter().enumerate() {
        let mut visited = vec![false; graph.vertex_count()];
        visited[center.index()] = true;
        let mut levels: Vec<Vec<u32>> = Vec::new();
        visit_priority(graph, nb, center, visited, &mut levels, 0, 0);
        for level in &mut levels {
            level.sort_unstable_by(|a, b| b.cmp(a));
        }
        priorities.push((slot, levels));
    }

    let max_levels = priorities.iter().map(|p| p.1.len()).max().unwrap_or(0);
    let max_entries = priorities
        .iter()
        .flat_map(|p| p.1.iter().map(|l| l.len()))
        .max()
        .unwrap_or(0);

    for (slot, levels) in &mut priorities {
        while levels.len() < max_levels {
            levels.push(Vec::new());
        }
        // Remaining ties break on parse-order position.
        levels.push(vec![neighbours[*slot].index() as u32]);
        for level in levels.iter_mut() {
            while level.len() < max_entries {
                level.push(0);
            }
        }
    }

    priorities.sort_by(|a, b| {
        for (la, lb) in a.1.iter().zip(b.1.iter()) {
            for (ea, eb) in la.iter().zip(lb.iter()) {
                match eb.cmp(ea) {
                    std::cmp::Ordering::Equal => continue,
                    other => return other,
                }
            }
        }
        std::cmp::Ordering::Equal
    });

    // order[rank] = neighbour slot.
    let order: Vec<usize> = priorities.iter().map(|p| p.0).collect();

    // Sweep direction of the two highest-priority substituents around
    // the center, read off the assigned 2D positions.
    let pos_a = graph.vertex(neighbours[order[0]]).position;
    let pos_b = graph.vertex(neighbours[order[1]]).position;
    let center_pos = graph.vertex(center).position;
    let is_cw = pos_a.relative_clockwise(pos_b, center_pos) == -1;

    let rotation = if graph.vertex(center).chirality == ChiralityTok::CounterClockwise {
        -1
    } else {
        1
    };
    let descriptor = if permutation_parity_sign(&order) * rotation == 1 {
        StereoDescriptor::R
    } else {
        StereoDescriptor::S
    };

    // When the drawn sweep disagrees with the descriptor the wedge
    // senses flip.
    let (wedge_a, wedge_b) = if (is_cw && descriptor != StereoDescriptor::R)
        || (!is_cw && descriptor != StereoDescriptor::S)
    {
        (Wedge::Up, Wedge::Down)
    } else {
        (Wedge::Down, Wedge::Up)
    };

    // Wedge candidate preference: not a stereocenter, outside the
    // center's rings, heteroatom, shallow subtree.
    let mut wedge_order: Vec<(u32, NodeIndex)> = Vec::with_capacity(order.len());
    for &slot in &order {
        let nb = neighbours[slot];
        let depth = graph.tree_depth(nb, center);
        let mut score: u32 = 0;
        if !graph.vertex(nb).is_stereo_center {
            score += 100_000;
        }
        if !graph.in_same_ring(nb, center) {
            score += 10_000;
        }
        if graph.vertex(nb).element.is_heteroatom() {
            score += 1_000;
        }
        if depth == 1 {
            score += 1_000;
        }
        score += 1_000u32.saturating_sub(depth as u32);
        wedge_order.push((score, nb));
    }
    wedge_order.sort_by(|a, b| b.0.cmp(&a.0));
    let wedge_target = wedge_order[0].1;

    // Walk up the priority list flipping the sense at each rank, so the
    // wedge direction stays consistent with the sweep computed above.
    let mut wedge = wedge_b;
    for &slot in order.iter().rev() {
        wedge = if wedge == wedge_a { wedge_b } else { wedge_a };
        if neighbours[slot] == wedge_target {
            break;
        }
    }

    if let Some(edge) = graph.edge_between(center, wedge_target) {
        graph.edge_mut(edge).wedge = wedge;
    }
    graph.vertex_mut(center).descriptor = Some(descriptor);
    debug!(?center, ?descriptor, "stereocenter annotated");
}

/// Collect `parent * 1000 + atomic` entries level by level through one
/// substituent. Each branch explores on its own copy of the visited set;
/// unfilled valences append hydrogen placeholders at the next level so
/// short branches still compare against long ones.
fn visit_priority(
    graph: &MolGraph,
    vertex: NodeIndex,
    previous: NodeIndex,
    mut visited: Vec<bool>,
    levels: &mut Vec<Vec<u32>>,
    depth: usize,
    parent_num: u32,
) {
    visited[vertex.index()] = true;
    let atomic = graph.vertex(vertex).element.atomic_num() as u32;

    if levels.len() <= depth {
        levels.push(Vec::new());
    }
    let Some(edge) = graph.edge_between(vertex, previous) else {
        return;
    };
    for _ in 0..graph.edge(edge).kind.order() {
        levels[depth].push(parent_num * 1000 + atomic);
    }

    let neighbours = graph.neighbors(vertex);
    for &nb in &neighbours {
        if !visited[nb.index()] && depth < MAX_DEPTH - 1 {
            visit_priority(graph, nb, vertex, visited.clone(), levels, depth + 1, atomic);
        }
    }

    if depth < MAX_DEPTH - 1 {
        let bonds: u8 = neighbours
            .iter()
            .filter_map(|&nb| graph.edge_between(vertex, nb))
            .map(|e| graph.edge(e).kind.order())
            .sum();
        let free = graph.vertex(vertex).element.max_bonds().saturating_sub(bonds);
        for _ in 0..free {
            if levels.len() <= depth + 1 {
                levels.push(Vec::new());
            }
            levels[depth + 1].push(atomic * 1000 + 1);
        }
    }
}

/// +1 for an even permutation of `0..n`, −1 for an odd one. Cycle
/// decomposition, counting the transpositions each cycle needs.
fn permutation_parity_sign(perm: &[usize]) -> i32 {
    let n = perm.len();
    let mut visited = vec![false; n];
    let mut swaps = 0usize;
    for start in 0..n {
        if visited[start] {
            continue;
        }
        let mut len = 0usize;
        let mut j = start;
        while !visited[j] {
            visited[j] = true;
            j = perm[j];
            len += 1;
        }
        swaps += len - 1;
    }
    if swaps % 2 == 0 { 1 } else { -1 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{self, LayoutOptions};
    use crate::rings::RingModel;
    use crate::smiles::parse;

    fn annotated(s: &str) -> MolGraph {
        let mut graph = MolGraph::from_tree(&parse(s).unwrap()).unwrap();
        let mut rings = RingModel::analyze(&mut graph);
        layout::position(&mut graph, &mut rings, &LayoutOptions::default());
        rings.restore(&mut graph);
        annotate(&mut graph);
        graph
    }

    fn wedge_count(graph: &MolGraph) -> usize {
        graph
            .edges()
            .filter(|&e| graph.edge(e).wedge != Wedge::None)
            .count()
    }

    #[test]
    fn parity_signs() {
        assert_eq!(permutation_parity_sign(&[0, 1, 2, 3]), 1);
        assert_eq!(permutation_parity_sign(&[1, 0, 2, 3]), -1);
        assert_eq!(permutation_parity_sign(&[1, 2, 0]), 1);
        assert_eq!(permutation_parity_sign(&[3, 2, 1, 0]), 1);
    }

    #[test]
    fn exactly_one_wedge_per_center() {
        for s in ["C[C@H](N)O", "F[C@H](Cl)Br", "C[C@@](F)(Cl)Br"] {
            let graph = annotated(s);
            assert_eq!(wedge_count(&graph), 1, "{}", s);
        }
    }

    #[test]
    fn no_wedges_without_stereocenters() {
        for s in ["CCCC", "C1CCCCC1", "CC(C)O"] {
            let graph = annotated(s);
            assert_eq!(wedge_count(&graph), 0, "{}", s);
        }
    }

    #[test]
    fn wedge_touches_the_center() {
        let graph = annotated("C[C@H](N)O");
        let center = graph
            .vertices()
            .find(|&v| graph.vertex(v).is_stereo_center)
            .unwrap();
        let edge = graph
            .edges()
            .find(|&e| graph.edge(e).wedge != Wedge::None)
            .unwrap();
        let (a, b) = graph.endpoints(edge);
        assert!(a == center || b == center);
    }

    #[test]
    fn wedge_prefers_terminal_substituent() {
        let graph = annotated("CC(C)(C)[C@H](F)CCCC");
        let edge = graph
            .edges()
            .find(|&e| graph.edge(e).wedge != Wedge::None)
            .unwrap();
        let (a, b) = graph.endpoints(edge);
        let center = graph
            .vertices()
            .find(|&v| graph.vertex(v).is_stereo_center)
            .unwrap();
        let target = if a == center { b } else { a };
        // F is terminal and a heteroatom; the long chains lose.
        assert_eq!(graph.vertex(target).element, crate::element::Element::F);
    }

    #[test]
    fn descriptor_assigned() {
        let graph = annotated("F[C@H](Cl)Br");
        let center = graph
            .vertices()
            .find(|&v| graph.vertex(v).is_stereo_center)
            .unwrap();
        assert!(graph.vertex(center).descriptor.is_some());
    }

    #[test]
    fn opposite_tokens_give_opposite_wedges() {
        let up_down = |s: &str| {
            let graph = annotated(s);
            graph
                .edges()
                .map(|e| graph.edge(e).wedge)
                .find(|&w| w != Wedge::None)
                .unwrap()
        };
        let a = up_down("C[C@H](N)O");
        let b = up_down("C[C@@H](N)O");
        assert_ne!(a, b);
    }

    #[test]
    fn two_centers_two_wedges() {
        let graph = annotated("C[C@H](O)[C@H](N)C");
        assert_eq!(wedge_count(&graph), 2);
    }
}
