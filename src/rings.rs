//! Ring perception and the ring model.
//!
//! Three stages, run in order by [`RingModel::analyze`]:
//!
//! 1. [`close_ring_markers`] matches the parse tree's ring-bond markers
//!    and adds one closing edge per matched pair.
//! 2. [`sssr`] extracts the smallest set of smallest rings (a minimal
//!    cycle basis over the edge set, Horton candidate cycles filtered by
//!    GF(2) independence).
//! 3. Ring connections are classified spiro/fused/bridge and every
//!    bridge-connected component is consolidated into one synthetic
//!    bridged ring, to a fixed point.
//!
//! Bridged consolidation rewrites vertex ring memberships; the pre-merge
//! state is backed up so [`RingModel::restore`] can bring the original
//! rings back once layout is done.

use std::collections::VecDeque;

use petgraph::graph::NodeIndex;
use tracing::debug;

use crate::geometry::Vec2;
use crate::graph::{BondKind, Edge, MolGraph};
use crate::smiles::BondSym;

/// A detected cycle, or a synthesized bridged super-ring.
#[derive(Debug, Clone)]
pub struct Ring {
    pub id: usize,
    /// Member vertices, in cycle order for detected rings. Bridged rings
    /// hold their members in consolidation order; they are positioned by
    /// the force sub-layout, which does not need cycle order.
    pub members: Vec<NodeIndex>,
    /// Ids of rings sharing at least one vertex.
    pub neighbours: Vec<usize>,
    pub positioned: bool,
    pub center: Vec2,
    pub central_angle: f64,
    pub is_bridged: bool,
    pub is_part_of_bridged: bool,
    pub is_fused: bool,
    pub is_spiro: bool,
    /// For bridged rings: the original sub-rings this ring replaced.
    pub subrings: Vec<Ring>,
    /// For bridged rings: vertices interior to the bridge, not on the
    /// outer perimeter.
    pub insiders: Vec<NodeIndex>,
}

impl Ring {
    fn new(id: usize, members: Vec<NodeIndex>) -> Self {
        Self {
            id,
            members,
            neighbours: Vec::new(),
            positioned: false,
            center: Vec2::ZERO,
            central_angle: 0.0,
            is_bridged: false,
            is_part_of_bridged: false,
            is_fused: false,
            is_spiro: false,
            subrings: Vec::new(),
            insiders: Vec::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }

    /// Interior angle of the ring polygon.
    pub fn interior_angle(&self) -> f64 {
        std::f64::consts::PI - self.central_angle
    }

    /// Members in placement order: starting at `start`, walking the cycle
    /// in the direction that does not step onto `previous` first.
    pub fn members_starting_at(
        &self,
        start: NodeIndex,
        previous: Option<NodeIndex>,
    ) -> Vec<NodeIndex> {
        let n = self.members.len();
        let Some(start_idx) = self.members.iter().position(|&m| m == start) else {
            return self.members.clone();
        };
        let forward = match previous {
            Some(prev) => self.members[(start_idx + 1) % n] != prev,
            None => true,
        };
        (0..n)
            .map(|i| {
                if forward {
                    self.members[(start_idx + i) % n]
                } else {
                    self.members[(start_idx + n - i) % n]
                }
            })
            .collect()
    }
}

/// How two rings touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingConnectionKind {
    /// One shared vertex.
    Spiro,
    /// Two shared vertices joined by a shared edge.
    Fused,
    /// Anything more entangled; triggers consolidation.
    Bridge,
}

/// The set of vertices shared between exactly two rings.
#[derive(Debug, Clone)]
pub struct RingConnection {
    pub id: usize,
    pub first: usize,
    pub second: usize,
    pub vertices: Vec<NodeIndex>,
}

impl RingConnection {
    pub fn involves(&self, ring_id: usize) -> bool {
        self.first == ring_id || self.second == ring_id
    }

    pub fn other(&self, ring_id: usize) -> Option<usize> {
        if self.first == ring_id {
            Some(self.second)
        } else if self.second == ring_id {
            Some(self.first)
        } else {
            None
        }
    }

    /// Re-point the end that is not `keep` at `new_id` (used when a
    /// consolidated ring takes over its sub-rings' external connections).
    pub fn update_other(&mut self, new_id: usize, keep: usize) {
        if self.first == keep {
            self.second = new_id;
        } else {
            self.first = new_id;
        }
    }

    /// The consolidation trigger: more than two shared vertices, or a
    /// shared vertex that belongs to more than two rings.
    pub fn is_bridge(&self, graph: &MolGraph) -> bool {
        if self.vertices.len() > 2 {
            return true;
        }
        self.vertices
            .iter()
            .any(|&v| graph.vertex(v).rings.len() > 2)
    }

    pub fn kind(&self, graph: &MolGraph) -> RingConnectionKind {
        if self.is_bridge(graph) {
            return RingConnectionKind::Bridge;
        }
        match self.vertices.len() {
            1 => RingConnectionKind::Spiro,
            2 if graph
                .edge_between(self.vertices[0], self.vertices[1])
                .is_some() =>
            {
                RingConnectionKind::Fused
            }
            _ => RingConnectionKind::Bridge,
        }
    }
}

/// Rings and ring connections of one molecule.
#[derive(Debug, Default)]
pub struct RingModel {
    pub rings: Vec<Ring>,
    pub connections: Vec<RingConnection>,
    original_rings: Vec<Ring>,
    original_connections: Vec<RingConnection>,
    ring_id_counter: usize,
    connection_id_counter: usize,
    /// Whether any bridged consolidation happened.
    pub has_bridged: bool,
}

impl RingModel {
    /// Run full ring perception on the graph: close markers, extract the
    /// SSSR, build connections, consolidate bridged systems.
    pub fn analyze(graph: &mut MolGraph) -> Self {
        let mut model = RingModel::default();

        close_ring_markers(graph);

        for members in sssr(graph) {
            let id = model.add_ring(members.clone());
            for v in members {
                graph.vertex_mut(v).rings.push(id);
            }
        }

        // Shared-vertex connections for every ring pair.
        for i in 0..model.rings.len() {
            for j in (i + 1)..model.rings.len() {
                let a = &model.rings[i];
                let b = &model.rings[j];
                let shared: Vec<NodeIndex> = a
                    .members
                    .iter()
                    .copied()
                    .filter(|m| b.members.contains(m))
                    .collect();
                if !shared.is_empty() {
                    let connection = RingConnection {
                        id: model.connection_id_counter,
                        first: a.id,
                        second: b.id,
                        vertices: shared,
                    };
                    model.connection_id_counter += 1;
                    model.connections.push(connection);
                }
            }
        }

        for ring in &mut model.rings {
            ring.neighbours = model
                .connections
                .iter()
                .filter_map(|c| c.other(ring.id))
                .collect();
        }

        // Anchor each ring to its first member so subtree rotations can
        // drag ring centers along.
        for ring in &model.rings {
            graph
                .vertex_mut(ring.members[0])
                .anchored_rings
                .push(ring.id);
        }

        model.backup(graph);
        model.consolidate_bridged(graph);
        model
    }

    fn add_ring(&mut self, members: Vec<NodeIndex>) -> usize {
        let id = self.ring_id_counter;
        self.ring_id_counter += 1;
        self.rings.push(Ring::new(id, members));
        id
    }

    pub fn get(&self, id: usize) -> Option<&Ring> {
        self.rings.iter().find(|r| r.id == id)
    }

    pub fn get_mut(&mut self, id: usize) -> Option<&mut Ring> {
        self.rings.iter_mut().find(|r| r.id == id)
    }

    pub fn ring_count(&self) -> usize {
        self.rings.len()
    }

    fn remove_ring(&mut self, id: usize) {
        self.rings.retain(|r| r.id != id);
        self.connections
            .retain(|c| c.first != id && c.second != id);
        for ring in &mut self.rings {
            ring.neighbours.retain(|&n| n != id);
        }
    }

    /// Shared vertices of the connection between two rings, if any.
    pub fn connection_vertices(&self, a: usize, b: usize) -> Vec<NodeIndex> {
        self.connections
            .iter()
            .find(|c| (c.first == a && c.second == b) || (c.first == b && c.second == a))
            .map(|c| c.vertices.clone())
            .unwrap_or_default()
    }

    /// Neighbour ring ids of `ring_id`, most-connected first.
    pub fn ordered_neighbours(&self, ring_id: usize) -> Vec<usize> {
        let mut with_counts: Vec<(usize, usize)> = self
            .connections
            .iter()
            .filter_map(|c| c.other(ring_id).map(|other| (other, c.vertices.len())))
            .collect();
        with_counts.sort_by(|a, b| b.1.cmp(&a.1));
        with_counts.into_iter().map(|(other, _)| other).collect()
    }

    /// Whether every member of the ring carries the aromatic flag.
    pub fn is_aromatic(&self, graph: &MolGraph, ring: &Ring) -> bool {
        ring.members.iter().all(|&m| graph.vertex(m).is_aromatic)
    }

    pub fn bridged_rings(&self) -> impl Iterator<Item = &Ring> + '_ {
        self.rings.iter().filter(|r| r.is_bridged)
    }

    pub fn fused_rings(&self) -> impl Iterator<Item = &Ring> + '_ {
        self.rings.iter().filter(|r| r.is_fused)
    }

    pub fn spiro_rings(&self) -> impl Iterator<Item = &Ring> + '_ {
        self.rings.iter().filter(|r| r.is_spiro)
    }

    fn backup(&mut self, graph: &mut MolGraph) {
        self.original_rings = self.rings.clone();
        self.original_connections = self.connections.clone();
        for idx in graph.vertices().collect::<Vec<_>>() {
            let v = graph.vertex_mut(idx);
            v.original_rings = v.rings.clone();
        }
    }

    /// Bring the pre-consolidation rings back after layout, carrying over
    /// the layout state of the rings that survived consolidation and the
    /// sub-ring centers computed by the force sub-layout.
    pub fn restore(&mut self, graph: &mut MolGraph) {
        let mut subring_centers: Vec<(usize, Vec2)> = Vec::new();
        for ring in self.rings.iter().filter(|r| r.is_bridged) {
            for sub in &ring.subrings {
                subring_centers.push((sub.id, sub.center));
            }
        }
        let live: Vec<Ring> = std::mem::take(&mut self.rings);

        self.rings = self.original_rings.clone();
        self.connections = self.original_connections.clone();

        for ring in &mut self.rings {
            if let Some(placed) = live.iter().find(|r| r.id == ring.id) {
                ring.positioned = placed.positioned;
                ring.center = placed.center;
                ring.central_angle = placed.central_angle;
                ring.is_fused = placed.is_fused;
                ring.is_spiro = placed.is_spiro;
            }
        }

        for (id, center) in subring_centers {
            if let Some(ring) = self.get_mut(id) {
                ring.center = center;
                ring.positioned = true;
            }
        }

        for idx in graph.vertices().collect::<Vec<_>>() {
            let v = graph.vertex_mut(idx);
            v.rings = v.original_rings.clone();
        }
    }

    /// Fixed-point loop replacing every bridge-connected ring component
    /// with one synthetic ring. Terminates because each step strictly
    /// decreases the active ring count.
    fn consolidate_bridged(&mut self, graph: &mut MolGraph) {
        loop {
            let Some(seed) = self
                .rings
                .iter()
                .filter(|r| !r.is_bridged && self.is_part_of_bridge(graph, r.id))
                .map(|r| r.id)
                .next_back()
            else {
                break;
            };

            let component = self.bridged_component(graph, seed);
            debug!(rings = ?component, "consolidating bridged ring system");
            self.has_bridged = true;
            self.create_bridged_ring(graph, &component);

            for id in component {
                self.remove_ring(id);
            }
        }
    }

    fn is_part_of_bridge(&self, graph: &MolGraph, ring_id: usize) -> bool {
        self.connections
            .iter()
            .any(|c| c.involves(ring_id) && c.is_bridge(graph))
    }

    /// Closure of `seed` over bridge-type connections, deduplicated.
    fn bridged_component(&self, graph: &MolGraph, seed: usize) -> Vec<usize> {
        let mut involved = vec![seed];
        let mut stack = vec![seed];
        while let Some(current) = stack.pop() {
            let Some(ring) = self.get(current) else {
                continue;
            };
            for &nb in &ring.neighbours {
                if involved.contains(&nb) || nb == current {
                    continue;
                }
                let bridged = self
                    .connections
                    .iter()
                    .any(|c| {
                        c.involves(current) && c.other(current) == Some(nb) && c.is_bridge(graph)
                    });
                if bridged {
                    involved.push(nb);
                    stack.push(nb);
                }
            }
        }
        involved
    }

    /// Number of active rings each endpoint of the edge belongs to, taking
    /// the minimum — 1 means the edge lies on exactly one ring perimeter.
    fn edge_ring_count(&self, graph: &MolGraph, a: NodeIndex, b: NodeIndex) -> usize {
        graph
            .vertex(a)
            .rings
            .len()
            .min(graph.vertex(b).rings.len())
    }

    fn create_bridged_ring(&mut self, graph: &mut MolGraph, component: &[usize]) -> usize {
        let mut vertices: Vec<NodeIndex> = Vec::new();
        let mut outside_neighbours: Vec<usize> = Vec::new();

        for &ring_id in component {
            let Some(ring) = self.get_mut(ring_id) else {
                continue;
            };
            ring.is_part_of_bridged = true;
            let members = ring.members.clone();
            let neighbours = ring.neighbours.clone();
            for m in members {
                if !vertices.contains(&m) {
                    vertices.push(m);
                }
            }
            for nb in neighbours {
                if !component.contains(&nb) && !outside_neighbours.contains(&nb) {
                    outside_neighbours.push(nb);
                }
            }
        }

        // Vertices on exactly one component ring form the perimeter
        // immediately; the rest are split by whether they still touch an
        // edge lying on a single ring (perimeter node) or not (insider).
        let mut members: Vec<NodeIndex> = Vec::new();
        let mut leftovers: Vec<NodeIndex> = Vec::new();
        for &v in &vertices {
            let vertex = graph.vertex(v);
            let in_component = vertex
                .rings
                .iter()
                .filter(|r| component.contains(r))
                .count();
            if vertex.rings.len() == 1 || in_component == 1 {
                members.push(v);
            } else {
                leftovers.push(v);
            }
        }

        let mut insiders: Vec<NodeIndex> = Vec::new();
        for &v in &leftovers {
            let on_perimeter = graph.incident_edges(v).into_iter().any(|e| {
                let (a, b) = graph.endpoints(e);
                self.edge_ring_count(graph, a, b) == 1
            });
            if on_perimeter {
                graph.vertex_mut(v).is_bridge_node = true;
            } else {
                graph.vertex_mut(v).is_bridge = true;
                insiders.push(v);
            }
            members.push(v);
        }

        let id = self.add_ring(members.clone());
        {
            let subrings: Vec<Ring> = component
                .iter()
                .filter_map(|&rid| self.get(rid).cloned())
                .collect();
            let ring = self.get_mut(id).expect("ring just added");
            ring.is_bridged = true;
            ring.neighbours = outside_neighbours.clone();
            ring.subrings = subrings;
            ring.insiders = insiders;
        }

        for &v in &members {
            let vertex = graph.vertex_mut(v);
            vertex.bridged_ring = Some(id);
            vertex.rings.retain(|r| !component.contains(r));
            vertex.rings.push(id);
        }

        // External connections now belong to the new ring.
        for &outside in &outside_neighbours {
            let connection_ids: Vec<usize> = self
                .connections
                .iter()
                .filter(|c| {
                    component
                        .iter()
                        .any(|&rid| c.involves(rid) && c.other(rid) == Some(outside))
                })
                .map(|c| c.id)
                .collect();
            for cid in connection_ids {
                if let Some(c) = self.connections.iter_mut().find(|c| c.id == cid) {
                    c.update_other(id, outside);
                }
            }
            if let Some(ring) = self.get_mut(outside) {
                ring.neighbours.push(id);
            }
        }

        id
    }
}

/// Match the ring-bond markers left on the vertices, adding one closing
/// edge per matched pair. Walks vertices in reverse index order, opening a
/// marker on first sight and closing it on the second. Unmatched markers
/// are left as they are: no ring, no error.
///
/// Returns the number of closing edges added.
pub fn close_ring_markers(graph: &mut MolGraph) -> usize {
    let mut open: Vec<(u16, NodeIndex, Option<BondSym>)> = Vec::new();
    let mut added = 0usize;

    let mut order: Vec<NodeIndex> = graph.vertices().collect();
    order.reverse();

    for idx in order {
        let markers = graph.vertex(idx).ring_markers.clone();
        for marker in markers {
            match open.iter().position(|(id, _, _)| *id == marker.id) {
                None => open.push((marker.id, idx, marker.bond)),
                Some(pos) => {
                    let (_, other, other_bond) = open.remove(pos);
                    if other == idx {
                        continue;
                    }
                    let kind = match other_bond.or(marker.bond) {
                        Some(sym) => BondKind::from_sym(sym),
                        None => {
                            if graph.vertex(idx).is_aromatic && graph.vertex(other).is_aromatic {
                                BondKind::Aromatic
                            } else {
                                BondKind::Single
                            }
                        }
                    };
                    let edge = Edge {
                        kind,
                        is_ring_closure: true,
                        ..Edge::default()
                    };
                    graph.add_edge(idx, other, edge);
                    added += 1;
                }
            }
        }
    }

    added
}

/// Smallest set of smallest rings: Horton candidate cycles filtered down
/// to a minimal cycle basis by GF(2) independence over edge bitvectors.
pub fn sssr(graph: &MolGraph) -> Vec<Vec<NodeIndex>> {
    let expected = cyclomatic_number(graph);
    if expected == 0 {
        return Vec::new();
    }

    let candidates = candidate_cycles(graph);
    let num_edges = graph.edge_count();
    let mut basis: Vec<Vec<u64>> = Vec::with_capacity(expected);
    let mut rings: Vec<Vec<NodeIndex>> = Vec::with_capacity(expected);

    for ring in &candidates {
        if rings.len() >= expected {
            break;
        }
        let bv = edge_bitvector(ring, num_edges, graph);
        if bv.iter().all(|&w| w == 0) {
            continue;
        }
        if add_to_basis(&mut basis, bv) {
            rings.push(normalize_cycle(ring));
        }
    }

    rings.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    rings
}

/// Number of independent cycles: `edges - vertices + components`.
pub fn cyclomatic_number(graph: &MolGraph) -> usize {
    let v = graph.vertex_count();
    let e = graph.edge_count();
    (e + component_count(graph)).saturating_sub(v)
}

fn component_count(graph: &MolGraph) -> usize {
    let n = graph.vertex_count();
    let mut visited = vec![false; n];
    let mut count = 0;
    for start in graph.vertices() {
        if visited[start.index()] {
            continue;
        }
        count += 1;
        let mut stack = vec![start];
        visited[start.index()] = true;
        while let Some(current) = stack.pop() {
            for nb in graph.neighbors(current) {
                if !visited[nb.index()] {
                    visited[nb.index()] = true;
                    stack.push(nb);
                }
            }
        }
    }
    count
}

/// Horton's candidate set: for every edge (u, v) and every vertex w, the
/// cycle formed by the shortest paths w→u, w→v plus the edge, kept when
/// the two paths share no internal vertex.
fn candidate_cycles(graph: &MolGraph) -> Vec<Vec<NodeIndex>> {
    let n = graph.vertex_count();
    let (dist, pred) = all_pairs_shortest(graph, n);

    let mut candidates: Vec<Vec<NodeIndex>> = Vec::new();

    for edge in graph.edges() {
        let (u, v) = graph.endpoints(edge);
        for w_idx in 0..n {
            let w = NodeIndex::new(w_idx);
            let du = dist[w_idx][u.index()];
            let dv = dist[w_idx][v.index()];
            if du == u32::MAX || dv == u32::MAX {
                continue;
            }
            if (du + dv + 1) < 3 {
                continue;
            }
            let path_u = walk_back(&pred, w, u);
            let path_v = walk_back(&pred, w, v);
            if share_internal_vertex(&path_u, &path_v) {
                continue;
            }
            let mut cycle = path_u;
            for &node in path_v[1..].iter().rev() {
                cycle.push(node);
            }
            candidates.push(cycle);
        }
    }

    candidates.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    candidates.dedup();
    candidates
}

fn all_pairs_shortest(
    graph: &MolGraph,
    n: usize,
) -> (Vec<Vec<u32>>, Vec<Vec<Option<NodeIndex>>>) {
    let mut dist = vec![vec![u32::MAX; n]; n];
    let mut pred = vec![vec![None; n]; n];

    for src_idx in 0..n {
        let src = NodeIndex::new(src_idx);
        dist[src_idx][src_idx] = 0;
        let mut queue = VecDeque::new();
        queue.push_back(src);
        while let Some(current) = queue.pop_front() {
            let d = dist[src_idx][current.index()];
            for nb in graph.neighbors(current) {
                if dist[src_idx][nb.index()] == u32::MAX {
                    dist[src_idx][nb.index()] = d + 1;
                    pred[src_idx][nb.index()] = Some(current);
                    queue.push_back(nb);
                }
            }
        }
    }

    (dist, pred)
}

fn walk_back(
    pred: &[Vec<Option<NodeIndex>>],
    src: NodeIndex,
    dst: NodeIndex,
) -> Vec<NodeIndex> {
    let mut path = vec![dst];
    let mut cur = dst;
    while cur != src {
        match pred[src.index()][cur.index()] {
            Some(p) => {
                path.push(p);
                cur = p;
            }
            None => return vec![],
        }
    }
    path.reverse();
    path
}

fn share_internal_vertex(path_u: &[NodeIndex], path_v: &[NodeIndex]) -> bool {
    if path_u.len() < 2 || path_v.len() < 2 {
        return false;
    }
    path_u[1..].iter().any(|node| path_v[1..].contains(node))
}

fn edge_bitvector(cycle: &[NodeIndex], num_edges: usize, graph: &MolGraph) -> Vec<u64> {
    let words = num_edges.div_ceil(64);
    let mut bv = vec![0u64; words];
    let len = cycle.len();
    for i in 0..len {
        let a = cycle[i];
        let b = cycle[(i + 1) % len];
        if let Some(edge) = graph.edge_between(a, b) {
            let idx = edge.index();
            bv[idx / 64] |= 1u64 << (idx % 64);
        }
    }
    bv
}

/// Gaussian elimination over GF(2). Returns false when the candidate is
/// dependent on the basis.
fn add_to_basis(basis: &mut Vec<Vec<u64>>, candidate: Vec<u64>) -> bool {
    let mut v = candidate;
    for row in basis.iter() {
        if let Some(p) = leading_bit(row) {
            if v[p / 64] & (1u64 << (p % 64)) != 0 {
                for (vw, rw) in v.iter_mut().zip(row.iter()) {
                    *vw ^= *rw;
                }
            }
        }
    }
    if v.iter().all(|&w| w == 0) {
        return false;
    }
    basis.push(v);
    true
}

fn leading_bit(bv: &[u64]) -> Option<usize> {
    for (i, &word) in bv.iter().enumerate() {
        if word != 0 {
            return Some(i * 64 + word.trailing_zeros() as usize);
        }
    }
    None
}

/// Rotate the cycle so the smallest vertex id leads, and fix the winding
/// so the second entry is smaller than the last. Keeps cycle order while
/// making member lists comparable.
fn normalize_cycle(cycle: &[NodeIndex]) -> Vec<NodeIndex> {
    if cycle.is_empty() {
        return Vec::new();
    }
    let min_pos = cycle
        .iter()
        .enumerate()
        .min_by_key(|&(_, idx)| idx)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let len = cycle.len();
    let mut normalized: Vec<NodeIndex> = (0..len).map(|i| cycle[(min_pos + i) % len]).collect();
    if len > 2 && normalized[1] > normalized[len - 1] {
        normalized[1..].reverse();
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smiles::parse;

    fn n(i: usize) -> NodeIndex {
        NodeIndex::new(i)
    }

    fn graph(s: &str) -> MolGraph {
        MolGraph::from_tree(&parse(s).unwrap()).unwrap()
    }

    fn analyzed(s: &str) -> (MolGraph, RingModel) {
        let mut g = graph(s);
        let model = RingModel::analyze(&mut g);
        (g, model)
    }

    #[test]
    fn marker_closure_adds_one_edge_per_pair() {
        let mut g = graph("C1CCCCC1");
        assert_eq!(close_ring_markers(&mut g), 1);
        assert_eq!(g.edge_count(), 6);
    }

    #[test]
    fn unmatched_marker_ignored() {
        let mut g = graph("C1CC");
        assert_eq!(close_ring_markers(&mut g), 0);
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn marker_closure_two_pairs() {
        let mut g = graph("C1CC2CC1CC2");
        assert_eq!(close_ring_markers(&mut g), 2);
    }

    #[test]
    fn closure_edge_flagged() {
        let mut g = graph("C1CCCCC1");
        close_ring_markers(&mut g);
        let closures = g
            .edges()
            .filter(|&e| g.edge(e).is_ring_closure)
            .count();
        assert_eq!(closures, 1);
    }

    #[test]
    fn sssr_cyclohexane() {
        let mut g = graph("C1CCCCC1");
        close_ring_markers(&mut g);
        let rings = sssr(&g);
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].len(), 6);
    }

    #[test]
    fn sssr_acyclic() {
        let mut g = graph("CCCC");
        close_ring_markers(&mut g);
        assert!(sssr(&g).is_empty());
    }

    #[test]
    fn sssr_naphthalene() {
        let mut g = graph("c1ccc2ccccc2c1");
        close_ring_markers(&mut g);
        let rings = sssr(&g);
        assert_eq!(rings.len(), 2);
        assert!(rings.iter().all(|r| r.len() == 6));
    }

    #[test]
    fn sssr_members_in_cycle_order() {
        let mut g = graph("C1CCCCC1");
        close_ring_markers(&mut g);
        let ring = &sssr(&g)[0];
        for i in 0..6 {
            let a = ring[i];
            let b = ring[(i + 1) % 6];
            assert!(g.edge_between(a, b).is_some(), "{:?}-{:?} not bonded", a, b);
        }
    }

    #[test]
    fn cyclomatic_norbornane() {
        let mut g = graph("C1CC2CC1CC2");
        close_ring_markers(&mut g);
        assert_eq!(cyclomatic_number(&g), 2);
    }

    #[test]
    fn spiro_classification() {
        let (g, model) = analyzed("C1CCC2(CC1)CCC2");
        assert_eq!(model.ring_count(), 2);
        assert_eq!(model.connections.len(), 1);
        assert_eq!(model.connections[0].kind(&g), RingConnectionKind::Spiro);
    }

    #[test]
    fn fused_classification() {
        let (g, model) = analyzed("C1CCC2CCCCC2C1");
        assert_eq!(model.ring_count(), 2);
        assert_eq!(model.connections.len(), 1);
        assert_eq!(model.connections[0].kind(&g), RingConnectionKind::Fused);
        assert!(!model.has_bridged);
    }

    #[test]
    fn bridged_consolidation_norbornane() {
        let (g, model) = analyzed("C1CC2CC1CC2");
        assert!(model.has_bridged);
        assert_eq!(model.ring_count(), 1);
        let bridged = model.rings.iter().find(|r| r.is_bridged).unwrap();
        assert_eq!(bridged.members.len(), 7);
        assert!(!bridged.insiders.is_empty());
        assert_eq!(bridged.subrings.len(), 2);
        // Every consolidated vertex belongs to exactly the new ring.
        for &m in &bridged.members {
            assert_eq!(g.vertex(m).rings, vec![bridged.id]);
        }
    }

    #[test]
    fn consolidation_is_strictly_shrinking() {
        // Adamantane: 3 SSSR rings, all bridge-connected.
        let (_, model) = analyzed("C1C2CC3CC1CC(C2)C3");
        assert!(model.has_bridged);
        assert_eq!(model.ring_count(), 1);
    }

    #[test]
    fn fused_membership_unchanged() {
        let (g, model) = analyzed("C1CCC2CCCCC2C1");
        let shared: Vec<NodeIndex> = g
            .vertices()
            .filter(|&v| g.vertex(v).rings.len() == 2)
            .collect();
        assert_eq!(shared.len(), 2);
        assert_eq!(model.connection_vertices(0, 1).len(), 2);
    }

    #[test]
    fn restore_brings_back_subrings() {
        let (mut g, mut model) = analyzed("C1CC2CC1CC2");
        assert_eq!(model.ring_count(), 1);
        model.restore(&mut g);
        assert_eq!(model.ring_count(), 2);
        assert!(g.vertices().all(|v| g
            .vertex(v)
            .rings
            .iter()
            .all(|&r| model.get(r).is_some())));
    }

    #[test]
    fn aromatic_ring_query() {
        let (g, model) = analyzed("c1ccccc1");
        assert!(model.is_aromatic(&g, &model.rings[0]));
        let (g2, model2) = analyzed("C1CCCCC1");
        assert!(!model2.is_aromatic(&g2, &model2.rings[0]));
    }

    #[test]
    fn members_starting_at_walks_both_ways() {
        let (_, model) = analyzed("C1CCCCC1");
        let ring = &model.rings[0];
        let start = ring.members[2];
        let prev = ring.members[3];
        let order = ring.members_starting_at(start, Some(prev));
        assert_eq!(order[0], start);
        assert_eq!(order[1], ring.members[1]);
        let order = ring.members_starting_at(start, Some(ring.members[1]));
        assert_eq!(order[1], ring.members[3]);
    }

    #[test]
    fn ordered_neighbours_most_connected_first() {
        let (_, model) = analyzed("C1CCC2CCCCC2C1");
        assert_eq!(model.ordered_neighbours(0), vec![1]);
    }
}
