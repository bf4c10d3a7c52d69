//! Force-directed sub-layout for bridged ring interiors.
//!
//! Bridged systems have no closed-form polygon layout, so their members
//! are relaxed with a small fixed-budget force simulation: pairwise
//! inverse-square repulsion, spring attraction along real bonds toward
//! the bond length, weak gravity toward the target center, and an extra
//! repulsion from each sub-ring's centroid that keeps five- and
//! six-membered sub-rings compact. There is no convergence criterion —
//! the iteration budget bounds the work and the result is accepted as is.

use petgraph::graph::NodeIndex;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::geometry::Vec2;
use crate::graph::MolGraph;
use crate::layout::LayoutOptions;
use crate::rings::Ring;

const REPULSION: f64 = 6000.0;
const SPRING: f64 = 5.0;
const GRAVITY: f64 = 0.5;
const DAMPING: f64 = 0.1;
const MAX_STEP_SQ: f64 = 500.0;

/// Fixed RNG seed for the position jitter: layout must be reproducible
/// run to run.
const JITTER_SEED: u64 = 0x6d6f_6c64;

/// Relax the members of `ring` around `center`. Vertices that are already
/// positioned (notably the entry vertex `seed`) are held fixed; everyone
/// else starts at the center plus jitter. Forces and positions live in a
/// local buffer and are written back to the graph only at the end.
pub fn force_layout(
    graph: &mut MolGraph,
    ring: &Ring,
    center: Vec2,
    seed: NodeIndex,
    opts: &LayoutOptions,
) {
    let members = &ring.members;
    let n = members.len();
    if n == 0 {
        return;
    }
    debug!(members = n, subrings = ring.subrings.len(), "force sub-layout");

    // Large fused assemblies relax with gentler constants, as the
    // polygon-sized forces overshoot there.
    let (kr, ks, g) = if ring.subrings.len() > 2 {
        (1000.0, 1.5, 0.0)
    } else {
        (REPULSION, SPRING, GRAVITY)
    };
    let l = opts.bond_length;

    let mut rng = SmallRng::seed_from_u64(JITTER_SEED);
    let mut positions: Vec<Vec2> = Vec::with_capacity(n);
    let mut fixed: Vec<bool> = Vec::with_capacity(n);

    for &m in members {
        let v = graph.vertex(m);
        let is_fixed = v.positioned || m == seed;
        if is_fixed {
            positions.push(v.position);
        } else {
            positions.push(center + Vec2::new(rng.r#gen::<f64>(), rng.r#gen::<f64>()));
        }
        fixed.push(is_fixed);
    }

    // Sub-ring member slots, resolved once outside the iteration loop.
    let subring_slots: Vec<Vec<usize>> = ring
        .subrings
        .iter()
        .map(|sub| {
            sub.members
                .iter()
                .filter_map(|m| members.iter().position(|x| x == m))
                .collect()
        })
        .collect();

    let bonded: Vec<(usize, usize)> = {
        let mut pairs = Vec::new();
        for u in 0..n {
            for v in (u + 1)..n {
                if graph.edge_between(members[u], members[v]).is_some() {
                    pairs.push((u, v));
                }
            }
        }
        pairs
    };

    let mut forces = vec![Vec2::ZERO; n];

    for _ in 0..opts.force_iterations {
        for f in forces.iter_mut() {
            *f = Vec2::ZERO;
        }

        // Pairwise repulsion.
        for u in 0..n {
            for v in (u + 1)..n {
                let delta = positions[v] - positions[u];
                if delta.x == 0.0 || delta.y == 0.0 {
                    continue;
                }
                let d_sq = delta.length_sq();
                let d = d_sq.sqrt();
                let f = delta * (kr / (d_sq * d));
                if !fixed[u] {
                    forces[u] -= f;
                }
                if !fixed[v] {
                    forces[v] += f;
                }
            }
        }

        // Sub-ring centroid repulsion keeps the small rings compact.
        if ring.subrings.len() > 2 {
            for (sub, slots) in ring.subrings.iter().zip(&subring_slots) {
                if slots.is_empty() {
                    continue;
                }
                let mut centroid = Vec2::ZERO;
                for &s in slots {
                    centroid += positions[s];
                }
                centroid = centroid * (1.0 / slots.len() as f64);

                for &s in slots {
                    let delta = centroid - positions[s];
                    if delta.x == 0.0 || delta.y == 0.0 {
                        continue;
                    }
                    let d_sq = delta.length_sq();
                    let d = d_sq.sqrt();
                    let mut force = kr / d_sq;
                    if sub.size() == 5 || sub.size() == 6 {
                        force *= 10.0;
                    }
                    if !fixed[s] {
                        forces[s] -= delta * (force / d);
                    }
                }
            }
        }

        // Spring attraction along real bonds.
        for &(u, v) in &bonded {
            let delta = positions[v] - positions[u];
            if delta.x == 0.0 || delta.y == 0.0 {
                continue;
            }
            let d = delta.length();
            let mut force = ks * (d - l);
            if d < l {
                force *= 0.5;
            } else {
                force *= 2.0;
            }
            let f = delta * (force / d);
            if !fixed[u] {
                forces[u] += f;
            }
            if !fixed[v] {
                forces[v] -= f;
            }
        }

        // Weak gravity toward the target center.
        for u in 0..n {
            if fixed[u] {
                continue;
            }
            let delta = center - positions[u];
            if delta.x == 0.0 || delta.y == 0.0 {
                continue;
            }
            let d = delta.length();
            forces[u] += delta * (g / (d * d));
        }

        // One damped update per iteration, with the step clamped so a
        // bad iteration cannot fling a vertex away.
        for u in 0..n {
            if fixed[u] {
                continue;
            }
            let mut step = forces[u] * DAMPING;
            let step_sq = step.length_sq();
            if step_sq > MAX_STEP_SQ {
                step = step * (MAX_STEP_SQ / step_sq).sqrt();
            }
            positions[u] += step;
        }
    }

    // Merge the buffer back into the vertex arena.
    for (slot, &m) in members.iter().enumerate() {
        let v = graph.vertex_mut(m);
        v.position = positions[slot];
        v.positioned = true;
    }
}
