//! The molecular graph being laid out.
//!
//! [`MolGraph`] wraps a petgraph [`UnGraph`] whose node weights are
//! [`Vertex`] (atom data plus layout state) and whose edge weights are
//! [`Edge`] (bond kind plus drawing annotations). All cross references —
//! vertex to ring, ring to ring, edge to vertex — are integer ids, never
//! live references, so ring rewrites can invalidate ids without dangling
//! anything.

use std::collections::VecDeque;
use std::fmt;

use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;

use crate::element::Element;
use crate::geometry::Vec2;
use crate::smiles::{BondSym, ChiralityTok, ParseTree, RingMarker};

/// Bond kind carried on a graph edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BondKind {
    #[default]
    Single,
    Double,
    Triple,
    Aromatic,
    /// `/` directional single bond.
    Up,
    /// `\` directional single bond.
    Down,
}

impl BondKind {
    pub fn from_sym(sym: BondSym) -> Self {
        match sym {
            BondSym::Single => BondKind::Single,
            BondSym::Double => BondKind::Double,
            BondSym::Triple => BondKind::Triple,
            BondSym::Aromatic => BondKind::Aromatic,
            BondSym::Up => BondKind::Up,
            BondSym::Down => BondKind::Down,
        }
    }

    /// Bond order as used for implicit hydrogen counts and the stereo
    /// priority walk. Aromatic and directional bonds count as one.
    pub fn order(self) -> u8 {
        match self {
            BondKind::Double => 2,
            BondKind::Triple => 3,
            _ => 1,
        }
    }
}

/// Wedge annotation on a stereo-relevant edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Wedge {
    #[default]
    None,
    /// Solid wedge, substituent points out of the plane.
    Up,
    /// Dashed wedge, substituent points into the plane.
    Down,
}

/// Best-effort R/S label computed by the stereo annotator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StereoDescriptor {
    R,
    S,
}

/// One atom, with its depiction state.
///
/// The chemistry fields are immutable after construction; the layout
/// fields are written by the pipeline stages in order (positions once
/// during placement, then adjusted by overlap resolution).
#[derive(Debug, Clone)]
pub struct Vertex {
    pub element: Element,
    pub is_aromatic: bool,
    pub isotope: u16,
    pub charge: i8,
    /// Explicit hydrogen count for bracket atoms; `None` means implicit.
    pub hcount: Option<u8>,
    pub is_bracket: bool,
    pub chirality: ChiralityTok,
    /// Unresolved ring-bond markers from the parse tree.
    pub ring_markers: Vec<RingMarker>,
    /// Bond symbol written between this atom and its spanning-tree parent.
    pub bond_to_parent: Option<BondSym>,
    /// Whether this atom opens a parenthesized branch.
    pub from_branch: bool,
    /// Spanning-tree parent (parse order), `None` for fragment roots.
    pub parent: Option<NodeIndex>,

    pub position: Vec2,
    /// Position of the spanning-tree parent at placement time; the local
    /// bond angle is derived from it.
    pub previous_position: Vec2,
    /// Placement angle relative to the parent direction.
    pub angle: f64,
    pub positioned: bool,
    pub is_drawn: bool,
    /// Active ring ids this vertex belongs to.
    pub rings: Vec<usize>,
    /// Ring ids before bridged consolidation, for restore.
    pub original_rings: Vec<usize>,
    /// Id of the bridged super-ring, if this vertex was consolidated.
    pub bridged_ring: Option<usize>,
    /// Interior vertex of a bridged system (an "insider").
    pub is_bridge: bool,
    /// Perimeter vertex of a bridged system.
    pub is_bridge_node: bool,
    /// Rings whose center must rotate together with this vertex.
    pub anchored_rings: Vec<usize>,
    pub is_stereo_center: bool,
    pub descriptor: Option<StereoDescriptor>,
    /// Cache filled during layout branch decisions.
    pub subtree_depth: usize,
}

impl Vertex {
    fn new(element: Element) -> Self {
        Self {
            element,
            is_aromatic: false,
            isotope: 0,
            charge: 0,
            hcount: None,
            is_bracket: false,
            chirality: ChiralityTok::None,
            ring_markers: Vec::new(),
            bond_to_parent: None,
            from_branch: false,
            parent: None,
            position: Vec2::ZERO,
            previous_position: Vec2::ZERO,
            angle: 0.0,
            positioned: false,
            is_drawn: true,
            rings: Vec::new(),
            original_rings: Vec::new(),
            bridged_ring: None,
            is_bridge: false,
            is_bridge_node: false,
            anchored_rings: Vec::new(),
            is_stereo_center: false,
            descriptor: None,
            subtree_depth: 0,
        }
    }

    /// Bond symbol this atom's branch opened with, when it opened one.
    /// Directional markers written on branches steer the E/Z layout.
    pub fn branch_bond(&self) -> Option<BondSym> {
        if self.from_branch {
            self.bond_to_parent
        } else {
            None
        }
    }
}

/// One bond.
#[derive(Debug, Clone, Default)]
pub struct Edge {
    pub kind: BondKind,
    pub wedge: Wedge,
    /// Draw a double bond symmetrically instead of offset to one side
    /// (set for linear cumulated/triple-bond geometry).
    pub center: bool,
    /// Edge created by matching two ring-bond markers, as opposed to a
    /// spanning-tree edge from the parse tree.
    pub is_ring_closure: bool,
}

impl Edge {
    pub fn new(kind: BondKind) -> Self {
        Self {
            kind,
            ..Edge::default()
        }
    }
}

/// Errors from building a [`MolGraph`] out of an externally supplied tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A tree atom references a parent or child index that does not exist.
    AtomIndexOutOfRange { index: usize },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AtomIndexOutOfRange { index } => {
                write!(f, "tree atom references out-of-range index {}", index)
            }
        }
    }
}

impl std::error::Error for GraphError {}

/// The molecule's structural model.
pub struct MolGraph {
    graph: UnGraph<Vertex, Edge>,
}

impl MolGraph {
    /// Build the graph from a parse tree: one vertex per tree atom, one
    /// spanning-tree edge per parent/child pair. Ring markers stay on the
    /// vertices; [`crate::rings::close_ring_markers`] turns them into edges.
    pub fn from_tree(tree: &ParseTree) -> Result<Self, GraphError> {
        let mut graph = UnGraph::default();
        let n = tree.atoms.len();

        for atom in &tree.atoms {
            let mut vertex = Vertex::new(atom.element);
            vertex.is_aromatic = atom.is_aromatic;
            vertex.isotope = atom.isotope;
            vertex.charge = atom.charge;
            vertex.hcount = atom.hcount;
            vertex.is_bracket = atom.is_bracket;
            vertex.chirality = atom.chirality;
            vertex.ring_markers = atom.ring_markers.clone();
            vertex.bond_to_parent = atom.bond_to_parent;
            vertex.from_branch = atom.from_branch;
            vertex.is_stereo_center = atom.chirality != ChiralityTok::None;
            graph.add_node(vertex);
        }

        for (idx, atom) in tree.atoms.iter().enumerate() {
            let Some(parent) = atom.parent else {
                continue;
            };
            if parent >= n {
                return Err(GraphError::AtomIndexOutOfRange { index: parent });
            }
            let kind = match atom.bond_to_parent {
                Some(sym) => BondKind::from_sym(sym),
                None => {
                    if atom.is_aromatic && tree.atoms[parent].is_aromatic {
                        BondKind::Aromatic
                    } else {
                        BondKind::Single
                    }
                }
            };
            let parent_idx = NodeIndex::new(parent);
            graph[NodeIndex::new(idx)].parent = Some(parent_idx);
            graph.add_edge(parent_idx, NodeIndex::new(idx), Edge::new(kind));
        }

        Ok(Self { graph })
    }

    pub fn vertex(&self, idx: NodeIndex) -> &Vertex {
        &self.graph[idx]
    }

    pub fn vertex_mut(&mut self, idx: NodeIndex) -> &mut Vertex {
        &mut self.graph[idx]
    }

    pub fn edge(&self, idx: EdgeIndex) -> &Edge {
        &self.graph[idx]
    }

    pub fn edge_mut(&mut self, idx: EdgeIndex) -> &mut Edge {
        &mut self.graph[idx]
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn vertices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    pub fn edges(&self) -> impl Iterator<Item = EdgeIndex> + '_ {
        self.graph.edge_indices()
    }

    pub fn add_edge(&mut self, a: NodeIndex, b: NodeIndex, edge: Edge) -> EdgeIndex {
        self.graph.add_edge(a, b, edge)
    }

    pub fn edge_between(&self, a: NodeIndex, b: NodeIndex) -> Option<EdgeIndex> {
        self.graph.find_edge(a, b)
    }

    pub fn endpoints(&self, idx: EdgeIndex) -> (NodeIndex, NodeIndex) {
        self.graph
            .edge_endpoints(idx)
            .expect("edge indices are never removed")
    }

    /// Neighbors in insertion (parse) order.
    ///
    /// petgraph iterates adjacency most-recent-first; layout decisions
    /// depend on source order, so reverse.
    pub fn neighbors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut result: Vec<NodeIndex> = self.graph.neighbors(idx).collect();
        result.reverse();
        result
    }

    pub fn neighbor_count(&self, idx: NodeIndex) -> usize {
        self.graph.neighbors(idx).count()
    }

    pub fn is_terminal(&self, idx: NodeIndex) -> bool {
        self.neighbor_count(idx) <= 1
    }

    pub fn incident_edges(&self, idx: NodeIndex) -> Vec<EdgeIndex> {
        let mut result: Vec<EdgeIndex> = self.graph.edges(idx).map(|e| e.id()).collect();
        result.reverse();
        result
    }

    /// Whether the two vertices share an active ring id.
    pub fn in_same_ring(&self, a: NodeIndex, b: NodeIndex) -> bool {
        let va = &self.graph[a];
        let vb = &self.graph[b];
        va.rings.iter().any(|r| vb.rings.contains(r))
    }

    /// Ring ids shared by both vertices.
    pub fn common_rings(&self, a: NodeIndex, b: NodeIndex) -> Vec<usize> {
        let va = &self.graph[a];
        let vb = &self.graph[b];
        va.rings
            .iter()
            .copied()
            .filter(|r| vb.rings.contains(r))
            .collect()
    }

    /// Neighbors that share no ring with `idx` and are not bridged-system
    /// interiors.
    pub fn non_ring_neighbors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.neighbors(idx)
            .into_iter()
            .filter(|&nb| {
                let shares_ring = self.graph[idx]
                    .rings
                    .iter()
                    .any(|r| self.graph[nb].rings.contains(r));
                !shares_ring && !self.graph[nb].is_bridge
            })
            .collect()
    }

    /// Sum of bond orders on the incident edges.
    pub fn bond_order_sum(&self, idx: NodeIndex) -> u8 {
        self.graph
            .edges(idx)
            .map(|e| e.weight().kind.order())
            .sum()
    }

    /// Hydrogens to report for this atom: the bracket count when explicit,
    /// otherwise free valence, less one for aromatic ring members.
    pub fn implicit_hydrogens(&self, idx: NodeIndex) -> u8 {
        let v = &self.graph[idx];
        if let Some(h) = v.hcount {
            return h;
        }
        let mut free = v
            .element
            .max_bonds()
            .saturating_sub(self.bond_order_sum(idx));
        if v.is_aromatic && free > 0 {
            free -= 1;
        }
        free
    }

    /// Depth of the subtree rooted at `start`, not crossing `exclude`.
    /// A leaf has depth 1. Cycles are cut by the visited set, so ring
    /// membership cannot recurse forever.
    pub fn tree_depth(&self, start: NodeIndex, exclude: NodeIndex) -> usize {
        let mut visited = vec![false; self.graph.node_count()];
        visited[exclude.index()] = true;
        visited[start.index()] = true;
        let mut queue = VecDeque::new();
        queue.push_back((start, 1usize));
        let mut max_depth = 1;
        while let Some((current, depth)) = queue.pop_front() {
            max_depth = max_depth.max(depth);
            for nb in self.graph.neighbors(current) {
                if !visited[nb.index()] {
                    visited[nb.index()] = true;
                    queue.push_back((nb, depth + 1));
                }
            }
        }
        max_depth
    }

    /// All vertices reachable from `start` without crossing `exclude`,
    /// in BFS order. This is the subtree a rotation or scoring pass
    /// operates on.
    pub fn subtree_vertices(&self, start: NodeIndex, exclude: NodeIndex) -> Vec<NodeIndex> {
        let mut visited = vec![false; self.graph.node_count()];
        visited[exclude.index()] = true;
        visited[start.index()] = true;
        let mut queue = VecDeque::new();
        queue.push_back(start);
        let mut result = Vec::new();
        while let Some(current) = queue.pop_front() {
            result.push(current);
            for nb in self.graph.neighbors(current) {
                if !visited[nb.index()] {
                    visited[nb.index()] = true;
                    queue.push_back(nb);
                }
            }
        }
        result
    }

    /// Center of mass of the vertices positioned so far.
    pub fn center_of_positioned(&self) -> Vec2 {
        let mut total = Vec2::ZERO;
        let mut count = 0usize;
        for idx in self.graph.node_indices() {
            let v = &self.graph[idx];
            if v.positioned {
                total += v.position;
                count += 1;
            }
        }
        if count == 0 {
            Vec2::ZERO
        } else {
            total * (1.0 / count as f64)
        }
    }

    /// The drawn vertex closest to `idx`, by Euclidean distance.
    pub fn closest_vertex(&self, idx: NodeIndex) -> Option<NodeIndex> {
        let pos = self.graph[idx].position;
        self.graph
            .node_indices()
            .filter(|&other| other != idx && self.graph[other].is_drawn)
            .min_by(|&a, &b| {
                let da = self.graph[a].position.distance_sq(pos);
                let db = self.graph[b].position.distance_sq(pos);
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })
    }
}

impl fmt::Debug for MolGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MolGraph")
            .field("vertex_count", &self.vertex_count())
            .field("edge_count", &self.edge_count())
            .finish()
    }
}
