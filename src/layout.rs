//! Recursive 2D coordinate assignment.
//!
//! Layout is one depth-first walk over the graph, seeded at a bridged
//! ring if there is one, else at any ring, else at vertex 0. Chains
//! advance by relative angles off the running direction; rings are
//! placed as regular polygons (or force-relaxed when bridged) and then
//! recurse into their fused/spiro neighbours and substituents. Every
//! vertex is placed exactly once, guarded by its `positioned` flag.

use petgraph::graph::NodeIndex;
use tracing::debug;

use crate::forces;
use crate::geometry::{Vec2, apothem, central_angle, circumradius, to_rad};
use crate::graph::MolGraph;
use crate::rings::RingModel;
use crate::smiles::BondSym;

/// Drawing constants and pass budgets.
#[derive(Debug, Clone)]
pub struct LayoutOptions {
    /// Target bond length in drawing units.
    pub bond_length: f64,
    /// Run the stereochemistry annotation pass.
    pub isomeric: bool,
    /// Per-vertex overlap below this is ignored by the resolvers.
    pub overlap_sensitivity: f64,
    /// Number of rotatable-edge resolution sweeps.
    pub overlap_resolution_iterations: usize,
    /// Iteration budget of the force sub-layout.
    pub force_iterations: usize,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            bond_length: 25.0,
            isomeric: true,
            overlap_sensitivity: 0.01,
            overlap_resolution_iterations: 2,
            force_iterations: 1000,
        }
    }
}

/// How a chain vertex's placement direction is determined.
///
/// The two call shapes — "continue at this angle" from a chain, and
/// "point away from this ring" when stepping off a ring member — are
/// statically distinguished instead of overloading one parameter.
#[derive(Debug, Clone, Copy)]
pub enum PlacementContext {
    /// Continue the chain at this global angle.
    Angle(f64),
    /// First bond off a ring; the center is the fallback reference when
    /// the local ring geometry degenerates.
    Center(Vec2),
}

/// Assign a position to every vertex.
pub fn position(graph: &mut MolGraph, rings: &mut RingModel, opts: &LayoutOptions) {
    if graph.vertex_count() == 0 {
        return;
    }
    let mut layouter = Layouter {
        graph,
        rings,
        opts,
        double_bond_config: None,
        double_bond_config_count: 0,
    };
    layouter.position();
}

struct Layouter<'a> {
    graph: &'a mut MolGraph,
    rings: &'a mut RingModel,
    opts: &'a LayoutOptions,
    /// First `/` or `\` seen on the current double-bond configuration.
    double_bond_config: Option<BondSym>,
    double_bond_config_count: usize,
}

impl Layouter<'_> {
    fn position(&mut self) {
        let mut start = self
            .graph
            .vertices()
            .find(|&v| self.graph.vertex(v).bridged_ring.is_some());
        if let Some(bridged) = self.rings.rings.iter().filter(|r| r.is_bridged).next_back() {
            start = Some(bridged.members[0]);
        }
        if start.is_none() {
            start = self.rings.rings.first().map(|r| r.members[0]);
        }
        let start = start.unwrap_or_else(|| NodeIndex::new(0));
        debug!(?start, "layout start vertex");
        self.place_next(start, None, PlacementContext::Angle(0.0), false);
    }

    /// Global direction the chain is running at `vertex`.
    fn global_angle(&self, vertex: NodeIndex) -> f64 {
        let v = self.graph.vertex(vertex);
        (v.position - v.previous_position).angle()
    }

    /// Walk up the spanning tree to the nearest ancestor with a non-zero
    /// relative angle.
    fn last_angle_up_tree(&self, vertex: NodeIndex) -> f64 {
        let mut current = Some(vertex);
        while let Some(idx) = current {
            let v = self.graph.vertex(idx);
            if v.angle != 0.0 {
                return v.angle;
            }
            current = v.parent;
        }
        0.0
    }

    /// Position `vertex` relative to `previous` and recurse into its
    /// unplaced neighbours. Idempotent: a positioned vertex is left
    /// untouched.
    fn place_next(
        &mut self,
        vertex: NodeIndex,
        previous: Option<NodeIndex>,
        ctx: PlacementContext,
        origin_shortest: bool,
    ) {
        if self.graph.vertex(vertex).positioned {
            return;
        }

        let bond_length = self.opts.bond_length;

        // Track `/` and `\` markers so the E/Z choice below can compare
        // against the first marker of the configuration.
        let mut double_bond_config_set = false;
        if let Some(prev) = previous {
            if let Some(edge) = self.graph.edge_between(vertex, prev) {
                let kind = self.graph.edge(edge).kind;
                let sym = match kind {
                    crate::graph::BondKind::Up => Some(BondSym::Up),
                    crate::graph::BondKind::Down => Some(BondSym::Down),
                    _ => None,
                };
                if let Some(sym) = sym {
                    self.double_bond_config_count += 1;
                    if self.double_bond_config_count % 2 == 1 && self.double_bond_config.is_none()
                    {
                        let mut config = sym;
                        double_bond_config_set = true;
                        // A marker on a branch straight off the root reads
                        // mirrored.
                        if self.graph.vertex(prev).parent.is_none()
                            && self.graph.vertex(vertex).branch_bond().is_some()
                        {
                            config = match config {
                                BondSym::Up => BondSym::Down,
                                BondSym::Down => BondSym::Up,
                                other => other,
                            };
                        }
                        self.double_bond_config = Some(config);
                    }
                }
            }
        }

        match previous {
            None => {
                // Seed the walk: a dummy previous position gives the root
                // a defined inbound direction.
                let dummy = Vec2::new(bond_length, 0.0).rotated(to_rad(-60.0));
                let v = self.graph.vertex_mut(vertex);
                v.previous_position = dummy;
                v.position = Vec2::new(bond_length, 0.0);
                v.angle = to_rad(-60.0);
                // Bridged-ring members are positioned by the force layout.
                if v.bridged_ring.is_none() {
                    v.positioned = true;
                }
            }
            Some(prev) if !self.graph.vertex(prev).rings.is_empty() => {
                self.place_off_ring(vertex, prev, ctx);
            }
            Some(prev) => {
                let angle = match ctx {
                    PlacementContext::Angle(a) => a,
                    PlacementContext::Center(_) => 0.0,
                };
                let prev_pos = self.graph.vertex(prev).position;
                let pos = Vec2::new(bond_length, 0.0).rotated(angle) + prev_pos;
                let v = self.graph.vertex_mut(vertex);
                v.position = pos;
                v.previous_position = prev_pos;
                v.positioned = true;
            }
        }

        // Recurse: an unpositioned ring comes first, then chain children.
        let (bridged_ring, first_ring) = {
            let v = self.graph.vertex(vertex);
            (v.bridged_ring, v.rings.first().copied())
        };

        if let Some(ring_id) = bridged_ring {
            if !self.ring_positioned(ring_id) {
                self.enter_ring(ring_id, vertex);
            }
        } else if let Some(ring_id) = first_ring {
            if !self.ring_positioned(ring_id) {
                self.enter_ring(ring_id, vertex);
            }
        } else {
            self.place_chain_neighbours(vertex, previous, double_bond_config_set, origin_shortest);
        }
    }

    fn ring_positioned(&self, ring_id: usize) -> bool {
        self.rings.get(ring_id).is_none_or(|r| r.positioned)
    }

    /// Place the ring `vertex` belongs to, centered one circumradius
    /// ahead of the inbound direction.
    fn enter_ring(&mut self, ring_id: usize, vertex: NodeIndex) {
        let Some(ring) = self.rings.get(ring_id) else {
            return;
        };
        let size = ring.size();
        let v = self.graph.vertex(vertex);
        let mut dir = (v.position - v.previous_position).normalized();
        if dir == Vec2::ZERO {
            dir = Vec2::new(1.0, 0.0);
        }
        let center = dir * circumradius(self.opts.bond_length, size) + v.position;
        self.place_ring(ring_id, center, vertex, None);
    }

    /// First bond off a ring member: away from the ring interior(s).
    fn place_off_ring(&mut self, vertex: NodeIndex, prev: NodeIndex, ctx: PlacementContext) {
        let prev_v = self.graph.vertex(prev);
        let prev_pos = prev_v.position;
        let prev_rings = prev_v.rings.clone();

        // A member of two rings points away from the vertex joining both,
        // which keeps the substituent off both interiors.
        let mut joined: Option<NodeIndex> = None;
        if prev_v.bridged_ring.is_none() && prev_rings.len() > 1 {
            joined = self.graph.neighbors(prev).into_iter().find(|&nb| {
                let nb_rings = &self.graph.vertex(nb).rings;
                prev_rings.iter().all(|r| nb_rings.contains(r))
            });
        }

        let pos = match joined {
            Some(j) => self
                .graph
                .vertex(j)
                .position
                .rotated_around(std::f64::consts::PI, prev_pos),
            None => {
                let mut sum = Vec2::ZERO;
                for nb in self.graph.neighbors(prev) {
                    let nb_v = self.graph.vertex(nb);
                    if nb_v.positioned && self.graph.in_same_ring(nb, prev) {
                        sum += nb_v.position - prev_pos;
                    }
                }
                let mut dir = (-sum).normalized();
                if dir == Vec2::ZERO {
                    // Symmetric neighbours cancelled out; fall back to the
                    // ring-center reference when the caller gave one.
                    dir = match ctx {
                        PlacementContext::Center(c) => (prev_pos - c).normalized(),
                        PlacementContext::Angle(_) => Vec2::ZERO,
                    };
                    if dir == Vec2::ZERO {
                        dir = Vec2::new(1.0, 0.0);
                    }
                }
                dir * self.opts.bond_length + prev_pos
            }
        };

        let v = self.graph.vertex_mut(vertex);
        v.previous_position = prev_pos;
        v.position = pos;
        v.positioned = true;
    }

    /// Lay out the drawn, unplaced neighbours of a chain vertex according
    /// to how many there are.
    fn place_chain_neighbours(
        &mut self,
        vertex: NodeIndex,
        previous: Option<NodeIndex>,
        double_bond_config_set: bool,
        origin_shortest: bool,
    ) {
        let neighbours: Vec<NodeIndex> = self
            .graph
            .neighbors(vertex)
            .into_iter()
            .filter(|&nb| self.graph.vertex(nb).is_drawn && Some(nb) != previous)
            .collect();

        let previous_angle = self.global_angle(vertex);

        match neighbours.len() {
            0 => {}
            1 => self.place_single_neighbour(
                vertex,
                previous,
                neighbours[0],
                previous_angle,
                double_bond_config_set,
                origin_shortest,
            ),
            2 => self.place_two_neighbours(vertex, previous, &neighbours, previous_angle),
            3 => self.place_three_neighbours(vertex, previous, &neighbours, previous_angle),
            4 => self.place_four_neighbours(vertex, &neighbours, previous_angle),
            // Five or more substituents have no sensible 2D projection;
            // they are left for the overlap resolver to untangle.
            _ => {}
        }
    }

    fn place_single_neighbour(
        &mut self,
        vertex: NodeIndex,
        previous: Option<NodeIndex>,
        next: NodeIndex,
        previous_angle: f64,
        double_bond_config_set: bool,
        origin_shortest: bool,
    ) {
        let vertex_bond = self.graph.vertex(vertex).bond_to_parent;
        let prev_bond = previous.and_then(|p| self.graph.vertex(p).bond_to_parent);
        let prev_in_ring =
            previous.is_some_and(|p| !self.graph.vertex(p).rings.is_empty());

        let triple =
            vertex_bond == Some(BondSym::Triple) || prev_bond == Some(BondSym::Triple);
        // Two double bonds back to back (=C=) are linear, unless an
        // explicit single branch bond breaks the cumulation.
        let cumulated = vertex_bond == Some(BondSym::Double)
            && prev_bond == Some(BondSym::Double)
            && previous.is_some()
            && !prev_in_ring
            && self.graph.vertex(vertex).branch_bond() != Some(BondSym::Single);

        if triple || cumulated {
            if let Some(prev) = previous {
                if let Some(e) = self.graph.edge_between(vertex, prev) {
                    self.graph.edge_mut(e).center = true;
                }
            }
            if let Some(e) = self.graph.edge_between(vertex, next) {
                self.graph.edge_mut(e).center = true;
            }
            if triple {
                self.graph.vertex_mut(next).angle = 0.0;
            }
            let next_angle = self.graph.vertex(next).angle;
            self.place_next(
                next,
                Some(vertex),
                PlacementContext::Angle(previous_angle + next_angle),
                false,
            );
        } else if prev_in_ring {
            // Second hop out of a ring: of the two zig-zag choices take
            // the one pointing away from the drawing's center of mass.
            let proposed = to_rad(60.0);
            let pos = self.graph.vertex(vertex).position;
            let candidate_a = Vec2::new(self.opts.bond_length, 0.0).rotated(proposed) + pos;
            let candidate_b = Vec2::new(self.opts.bond_length, 0.0).rotated(-proposed) + pos;
            let com = self.graph.center_of_positioned();
            let next_angle = if candidate_a.distance_sq(com) < candidate_b.distance_sq(com) {
                -proposed
            } else {
                proposed
            };
            self.graph.vertex_mut(next).angle = next_angle;
            self.place_next(
                next,
                Some(vertex),
                PlacementContext::Angle(previous_angle + next_angle),
                false,
            );
        } else {
            let mut a = self.graph.vertex(vertex).angle;
            if previous.is_some_and(|p| self.graph.neighbor_count(p) > 3) {
                // Continuing off a 4-way center: pin the zig-zag back to 60.
                if a > 0.0 {
                    a = a.min(1.0472);
                } else if a < 0.0 {
                    a = a.max(-1.0472);
                } else {
                    a = 1.0472;
                }
            } else if a == 0.0 {
                a = self.last_angle_up_tree(vertex);
                if a == 0.0 {
                    a = 1.0472;
                }
            }

            if previous.is_some() && !double_bond_config_set {
                if let Some(e) = self.graph.edge_between(vertex, next) {
                    match self.graph.edge(e).kind {
                        crate::graph::BondKind::Up => {
                            if self.double_bond_config == Some(BondSym::Down) {
                                a = -a;
                            }
                            self.double_bond_config = None;
                        }
                        crate::graph::BondKind::Down => {
                            if self.double_bond_config == Some(BondSym::Up) {
                                a = -a;
                            }
                            self.double_bond_config = None;
                        }
                        _ => {}
                    }
                }
            }

            let next_angle = if origin_shortest { a } else { -a };
            self.graph.vertex_mut(next).angle = next_angle;
            self.place_next(
                next,
                Some(vertex),
                PlacementContext::Angle(previous_angle + next_angle),
                false,
            );
        }
    }

    fn place_two_neighbours(
        &mut self,
        vertex: NodeIndex,
        previous: Option<NodeIndex>,
        neighbours: &[NodeIndex],
        previous_angle: f64,
    ) {
        let mut a = self.graph.vertex(vertex).angle;
        if a == 0.0 {
            a = 1.0472;
        }

        let depth_a = self.graph.tree_depth(neighbours[0], vertex);
        let depth_b = self.graph.tree_depth(neighbours[1], vertex);
        self.graph.vertex_mut(neighbours[0]).subtree_depth = depth_a;
        self.graph.vertex_mut(neighbours[1]).subtree_depth = depth_b;

        let depth_c = previous.map_or(0, |p| self.graph.tree_depth(p, vertex));
        if let Some(p) = previous {
            self.graph.vertex_mut(p).subtree_depth = depth_c;
        }

        let left = self.graph.vertex(neighbours[0]).element;
        let right = self.graph.vertex(neighbours[1]).element;

        // The longer subtree goes cis; all else equal the carbon branch
        // reads as the main chain.
        let (cis_slot, trans_slot) = if right == crate::element::Element::C
            && left != crate::element::Element::C
            && depth_b > 1
            && depth_a < 5
        {
            (1, 0)
        } else if right != crate::element::Element::C
            && left == crate::element::Element::C
            && depth_a > 1
            && depth_b < 5
        {
            (0, 1)
        } else if depth_b > depth_a {
            (1, 0)
        } else {
            (0, 1)
        };

        let cis = neighbours[cis_slot];
        let trans = neighbours[trans_slot];

        let origin_shortest = depth_c < depth_a && depth_c < depth_b;

        let mut trans_angle = a;
        let mut cis_angle = -a;

        // Recorded slash markers override the default trans choice.
        if let Some(config) = self.double_bond_config {
            if self.graph.vertex(trans).branch_bond() == Some(config) {
                trans_angle = -a;
                cis_angle = a;
            }
        }

        self.graph.vertex_mut(trans).angle = trans_angle;
        self.graph.vertex_mut(cis).angle = cis_angle;

        self.place_next(
            trans,
            Some(vertex),
            PlacementContext::Angle(previous_angle + trans_angle),
            origin_shortest,
        );
        self.place_next(
            cis,
            Some(vertex),
            PlacementContext::Angle(previous_angle + cis_angle),
            origin_shortest,
        );
    }

    fn place_three_neighbours(
        &mut self,
        vertex: NodeIndex,
        previous: Option<NodeIndex>,
        neighbours: &[NodeIndex],
        previous_angle: f64,
    ) {
        let d1 = self.graph.tree_depth(neighbours[0], vertex);
        let d2 = self.graph.tree_depth(neighbours[1], vertex);
        let d3 = self.graph.tree_depth(neighbours[2], vertex);
        self.graph.vertex_mut(neighbours[0]).subtree_depth = d1;
        self.graph.vertex_mut(neighbours[1]).subtree_depth = d2;
        self.graph.vertex_mut(neighbours[2]).subtree_depth = d3;

        // The uniquely longest subtree continues straight.
        let (straight, left, right) = if d2 > d1 && d2 > d3 {
            (neighbours[1], neighbours[0], neighbours[2])
        } else if d3 > d1 && d3 > d2 {
            (neighbours[2], neighbours[0], neighbours[1])
        } else {
            (neighbours[0], neighbours[1], neighbours[2])
        };

        let all_off_ring = previous.is_some_and(|p| self.graph.vertex(p).rings.is_empty())
            && self.graph.vertex(straight).rings.is_empty()
            && self.graph.vertex(left).rings.is_empty()
            && self.graph.vertex(right).rings.is_empty();

        let cross = all_off_ring
            && self.graph.tree_depth(left, vertex) == 1
            && self.graph.tree_depth(right, vertex) == 1
            && self.graph.tree_depth(straight, vertex) > 1;

        let (straight_angle, left_angle, right_angle) = if cross {
            let vertex_angle = self.graph.vertex(vertex).angle;
            if vertex_angle >= 0.0 {
                (-vertex_angle, to_rad(30.0), to_rad(90.0))
            } else {
                (-vertex_angle, -to_rad(30.0), -to_rad(90.0))
            }
        } else {
            (0.0, to_rad(90.0), -to_rad(90.0))
        };

        self.graph.vertex_mut(straight).angle = straight_angle;
        self.graph.vertex_mut(left).angle = left_angle;
        self.graph.vertex_mut(right).angle = right_angle;

        self.place_next(
            straight,
            Some(vertex),
            PlacementContext::Angle(previous_angle + straight_angle),
            false,
        );
        self.place_next(
            left,
            Some(vertex),
            PlacementContext::Angle(previous_angle + left_angle),
            false,
        );
        self.place_next(
            right,
            Some(vertex),
            PlacementContext::Angle(previous_angle + right_angle),
            false,
        );
    }

    fn place_four_neighbours(
        &mut self,
        vertex: NodeIndex,
        neighbours: &[NodeIndex],
        previous_angle: f64,
    ) {
        let d1 = self.graph.tree_depth(neighbours[0], vertex);
        let d2 = self.graph.tree_depth(neighbours[1], vertex);
        let d3 = self.graph.tree_depth(neighbours[2], vertex);
        let d4 = self.graph.tree_depth(neighbours[3], vertex);
        self.graph.vertex_mut(neighbours[0]).subtree_depth = d1;
        self.graph.vertex_mut(neighbours[1]).subtree_depth = d2;
        self.graph.vertex_mut(neighbours[2]).subtree_depth = d3;
        self.graph.vertex_mut(neighbours[3]).subtree_depth = d4;

        // The deepest subtree takes the near-opposite slot of the
        // tetrahedral projection.
        let (w, x, y, z) = if d2 > d1 && d2 > d3 && d2 > d4 {
            (neighbours[1], neighbours[0], neighbours[2], neighbours[3])
        } else if d3 > d1 && d3 > d2 && d3 > d4 {
            (neighbours[2], neighbours[0], neighbours[1], neighbours[3])
        } else if d4 > d1 && d4 > d2 && d4 > d3 {
            (neighbours[3], neighbours[0], neighbours[1], neighbours[2])
        } else {
            (neighbours[0], neighbours[1], neighbours[2], neighbours[3])
        };

        let assignments = [
            (w, -to_rad(36.0)),
            (x, to_rad(36.0)),
            (y, -to_rad(108.0)),
            (z, to_rad(108.0)),
        ];
        for (nb, angle) in assignments {
            self.graph.vertex_mut(nb).angle = angle;
            self.place_next(
                nb,
                Some(vertex),
                PlacementContext::Angle(previous_angle + angle),
                false,
            );
        }
    }

    /// Position a ring and recurse into its neighbours and substituents.
    /// Idempotent: positioned rings are skipped.
    fn place_ring(
        &mut self,
        ring_id: usize,
        center: Vec2,
        start: NodeIndex,
        previous: Option<NodeIndex>,
    ) {
        let Some(ring) = self.rings.get(ring_id) else {
            return;
        };
        if ring.positioned {
            return;
        }
        let ring = ring.clone();
        let mut center = center;

        let ordered_neighbours = self.rings.ordered_neighbours(ring_id);
        let starting_angle =
            (self.graph.vertex(start).position - center).angle();
        let radius = circumradius(self.opts.bond_length, ring.size());
        let angle = central_angle(ring.size());

        if let Some(r) = self.rings.get_mut(ring_id) {
            r.central_angle = angle;
        }

        let mut start_id = start;
        if !ring.members.contains(&start) {
            self.graph.vertex_mut(start).positioned = false;
            start_id = ring.members[0];
        }

        if ring.is_bridged {
            forces::force_layout(self.graph, &ring, center, start, self.opts);
            // The relaxed geometry defines the real centers.
            center = self.member_centroid(&ring.members);
            if let Some(r) = self.rings.get_mut(ring_id) {
                r.positioned = true;
                r.center = center;
            }
            let sub_centers: Vec<Vec2> = ring
                .subrings
                .iter()
                .map(|sub| self.member_centroid(&sub.members))
                .collect();
            if let Some(r) = self.rings.get_mut(ring_id) {
                for (sub, c) in r.subrings.iter_mut().zip(sub_centers) {
                    sub.center = c;
                }
            }
        } else {
            let mut a = starting_angle;
            for member in ring.members_starting_at(start_id, previous) {
                let v = self.graph.vertex_mut(member);
                if !v.positioned {
                    v.position = center + Vec2::new(a.cos(), a.sin()) * radius;
                }
                a += angle;
                v.angle = a;
                v.positioned = true;
            }
            if let Some(r) = self.rings.get_mut(ring_id) {
                r.positioned = true;
                r.center = center;
            }
        }

        // Neighbour rings, most-connected first.
        for nb_id in ordered_neighbours {
            if self.rings.get(nb_id).is_none_or(|r| r.positioned) {
                continue;
            }
            let shared = self.rings.connection_vertices(ring_id, nb_id);
            match shared.len() {
                2 => self.place_fused_neighbour(ring_id, nb_id, center, &shared),
                1 => self.place_spiro_neighbour(ring_id, nb_id, center, shared[0]),
                // Bridge connections were consolidated away before layout.
                _ => {}
            }
        }

        // Substituent chains off the ring members.
        for &member in &ring.members {
            for nb in self.graph.neighbors(member) {
                if self.graph.vertex(nb).positioned {
                    continue;
                }
                self.place_next(nb, Some(member), PlacementContext::Center(center), false);
            }
        }
    }

    fn member_centroid(&self, members: &[NodeIndex]) -> Vec2 {
        if members.is_empty() {
            return Vec2::ZERO;
        }
        let mut total = Vec2::ZERO;
        for &m in members {
            total += self.graph.vertex(m).position;
        }
        total * (1.0 / members.len() as f64)
    }

    fn place_fused_neighbour(
        &mut self,
        ring_id: usize,
        nb_id: usize,
        center: Vec2,
        shared: &[NodeIndex],
    ) {
        if let Some(r) = self.rings.get_mut(ring_id) {
            r.is_fused = true;
        }
        let nb_size = match self.rings.get_mut(nb_id) {
            Some(r) => {
                r.is_fused = true;
                r.size()
            }
            None => return,
        };

        let pos_a = self.graph.vertex(shared[0]).position;
        let pos_b = self.graph.vertex(shared[1]).position;
        let midpoint = Vec2::midpoint(pos_a, pos_b);
        let normals = Vec2::unit_normals(pos_a, pos_b);

        // Candidate centers sit one apothem off the shared edge, on
        // either side; take the one farther from the current center.
        let r = circumradius(self.opts.bond_length, nb_size);
        let ap = apothem(r, nb_size);
        let candidate_a = normals[0] * ap + midpoint;
        let candidate_b = normals[1] * ap + midpoint;
        let next_center = if (center - candidate_b).length_sq() > (center - candidate_a).length_sq()
        {
            candidate_b
        } else {
            candidate_a
        };

        // Enter the neighbour with consistent winding.
        let rel_a = pos_a - next_center;
        let rel_b = pos_b - next_center;
        if rel_a.clockwise(rel_b) == -1 {
            self.place_ring(nb_id, next_center, shared[0], Some(shared[1]));
        } else {
            self.place_ring(nb_id, next_center, shared[1], Some(shared[0]));
        }
    }

    fn place_spiro_neighbour(
        &mut self,
        ring_id: usize,
        nb_id: usize,
        center: Vec2,
        shared: NodeIndex,
    ) {
        if let Some(r) = self.rings.get_mut(ring_id) {
            r.is_spiro = true;
        }
        let nb_size = match self.rings.get_mut(nb_id) {
            Some(r) => {
                r.is_spiro = true;
                r.size()
            }
            None => return,
        };

        // Reflect the current center through the shared vertex, rescaled
        // to the neighbour's circumradius.
        let shared_pos = self.graph.vertex(shared).position;
        let mut dir = (-(center - shared_pos)).normalized();
        if dir == Vec2::ZERO {
            dir = Vec2::new(1.0, 0.0);
        }
        let next_center = dir * circumradius(self.opts.bond_length, nb_size) + shared_pos;
        self.place_ring(nb_id, next_center, shared, None);
    }
}

/// Rotate the finished drawing so its widest dimension runs horizontal,
/// snapped to 30 degree steps.
pub fn rotate_drawing(graph: &mut MolGraph, rings: &mut RingModel) {
    let drawn: Vec<NodeIndex> = graph
        .vertices()
        .filter(|&v| graph.vertex(v).is_drawn)
        .collect();

    let mut max_dist = 0.0;
    let mut pair: Option<(NodeIndex, NodeIndex)> = None;
    for (i, &a) in drawn.iter().enumerate() {
        for &b in drawn.iter().skip(i + 1) {
            let dist = graph.vertex(a).position.distance_sq(graph.vertex(b).position);
            if dist > max_dist {
                max_dist = dist;
                pair = Some((a, b));
            }
        }
    }
    let Some((a, b)) = pair else {
        return;
    };

    let mut angle = -(graph.vertex(a).position - graph.vertex(b).position).angle();
    if !angle.is_finite() {
        return;
    }
    let step = to_rad(30.0);
    let remainder = angle % step;
    if remainder < step / 2.0 {
        angle -= remainder;
    } else {
        angle += step - remainder;
    }

    let pivot = graph.vertex(b).position;
    for v in graph.vertices().collect::<Vec<_>>() {
        if v == b {
            continue;
        }
        let vert = graph.vertex_mut(v);
        vert.position = vert.position.rotated_around(angle, pivot);
    }
    for ring in &mut rings.rings {
        ring.center = ring.center.rotated_around(angle, pivot);
    }
}
