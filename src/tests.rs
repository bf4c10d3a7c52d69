use crate::graph::Wedge;
use crate::layout::LayoutOptions;
use crate::rings::RingConnectionKind;
use crate::smiles::parse;
use crate::{Depiction, depict, depict_smiles};

fn laid_out(s: &str) -> Depiction {
    depict_smiles(s, &LayoutOptions::default()).unwrap()
}

fn position_bits(d: &Depiction) -> Vec<(u64, u64)> {
    d.graph
        .vertices()
        .map(|v| {
            let p = d.graph.vertex(v).position;
            (p.x.to_bits(), p.y.to_bits())
        })
        .collect()
}

#[test]
fn butane_linear_chain() {
    let d = laid_out("CCCC");
    assert_eq!(d.graph.vertex_count(), 4);
    assert_eq!(d.rings.ring_count(), 0);
    assert_eq!(d.formula, "C4H10");

    for e in d.graph.edges() {
        let (a, b) = d.graph.endpoints(e);
        let dist = d
            .graph
            .vertex(a)
            .position
            .distance(d.graph.vertex(b).position);
        assert!((dist - 25.0).abs() < 1e-6, "bond length {}", dist);
    }

    // Zig-zag: consecutive bond directions differ by 60 degrees,
    // alternating sign.
    let pos: Vec<_> = d
        .graph
        .vertices()
        .map(|v| d.graph.vertex(v).position)
        .collect();
    let turn1 = (pos[2] - pos[1]).angle() - (pos[1] - pos[0]).angle();
    let turn2 = (pos[3] - pos[2]).angle() - (pos[2] - pos[1]).angle();
    assert!((turn1.abs() - 1.0472).abs() < 1e-4, "turn {}", turn1);
    assert!((turn2.abs() - 1.0472).abs() < 1e-4, "turn {}", turn2);
    assert!(turn1.signum() != turn2.signum());
}

#[test]
fn cyclohexane_regular_hexagon() {
    let d = laid_out("C1CCCCC1");
    assert_eq!(d.rings.ring_count(), 1);
    let ring = &d.rings.rings[0];
    assert_eq!(ring.size(), 6);

    let radius = crate::geometry::circumradius(25.0, 6);
    for &m in &ring.members {
        let dist = d.graph.vertex(m).position.distance(ring.center);
        assert!((dist - radius).abs() < 1e-6, "circumradius {}", dist);
    }
    assert!(d.overlap_score < 1e-6);
    assert_eq!(d.formula, "C6H12");
}

#[test]
fn fused_bicycle_classified_fused() {
    let d = laid_out("C1CCC2CCCCC2C1");
    assert_eq!(d.rings.ring_count(), 2);
    assert_eq!(d.rings.connections.len(), 1);
    assert_eq!(
        d.rings.connections[0].kind(&d.graph),
        RingConnectionKind::Fused
    );
    assert!(!d.rings.has_bridged);
    assert!(d.rings.fused_rings().count() >= 1);
}

#[test]
fn bridged_bicycle_consolidates_and_relaxes() {
    let d = laid_out("C1CC2CC1CC2");
    assert!(d.rings.has_bridged);
    // The original two rings are restored for the renderer.
    assert_eq!(d.rings.ring_count(), 2);
    // Consolidation left its marks on the vertices.
    let insiders = d
        .graph
        .vertices()
        .filter(|&v| d.graph.vertex(v).is_bridge)
        .count();
    assert!(insiders > 0);
    let in_bridged = d
        .graph
        .vertices()
        .filter(|&v| d.graph.vertex(v).bridged_ring.is_some())
        .count();
    assert_eq!(in_bridged, 7);

    for v in d.graph.vertices() {
        let p = d.graph.vertex(v).position;
        assert!(p.x.is_finite() && p.y.is_finite(), "non-finite at {:?}", v);
        assert!(d.graph.vertex(v).positioned);
    }
}

#[test]
fn tagged_stereocenter_gets_one_wedge() {
    let d = laid_out("N[C@@H](C)C(=O)O");
    let wedges: Vec<_> = d
        .graph
        .edges()
        .filter(|&e| d.graph.edge(e).wedge != Wedge::None)
        .collect();
    assert_eq!(wedges.len(), 1);

    let center = d
        .graph
        .vertices()
        .find(|&v| d.graph.vertex(v).is_stereo_center)
        .unwrap();
    let (a, b) = d.graph.endpoints(wedges[0]);
    assert!(a == center || b == center);
    assert!(d.graph.vertex(center).descriptor.is_some());
}

#[test]
fn pipeline_is_deterministic() {
    for s in [
        "N[C@@H](C)C(=O)O",
        "C1CC2CC1CC2",
        "Cn1cnc2c1c(=O)n(C)c(=O)n2C",
        "CC(C)Cc1ccc(cc1)C(C)C(=O)O",
    ] {
        let first = laid_out(s);
        let second = laid_out(s);
        assert_eq!(position_bits(&first), position_bits(&second), "{}", s);
        let wedges = |d: &Depiction| {
            d.graph
                .edges()
                .map(|e| d.graph.edge(e).wedge)
                .collect::<Vec<_>>()
        };
        assert_eq!(wedges(&first), wedges(&second), "{}", s);
    }
}

#[test]
fn unmatched_ring_marker_is_benign() {
    let d = laid_out("C1CCC");
    assert_eq!(d.rings.ring_count(), 0);
    assert_eq!(d.graph.edge_count(), 3);
    for v in d.graph.vertices() {
        assert!(d.graph.vertex(v).positioned);
    }
}

#[test]
fn isomeric_off_skips_wedges() {
    let opts = LayoutOptions {
        isomeric: false,
        ..LayoutOptions::default()
    };
    let d = depict_smiles("N[C@@H](C)C(=O)O", &opts).unwrap();
    assert!(d.graph.edges().all(|e| d.graph.edge(e).wedge == Wedge::None));
}

#[test]
fn depict_from_tree_directly() {
    let tree = parse("CCO").unwrap();
    let d = depict(&tree, &LayoutOptions::default()).unwrap();
    assert_eq!(d.graph.vertex_count(), 3);
    assert_eq!(d.formula, "C2H6O");
}

#[test]
fn larger_molecules_stay_finite() {
    for s in [
        "Cn1cnc2c1c(=O)n(C)c(=O)n2C",
        "CC(C)c1c(C(=O)Nc2ccccc2)c(c2ccccc2)c(c2ccc(F)cc2)n1CC",
        "C1CC2CCC1CC2",
        "c1ccc2c(c1)ccc1ccccc12",
    ] {
        let d = laid_out(s);
        for v in d.graph.vertices() {
            let p = d.graph.vertex(v).position;
            assert!(p.x.is_finite() && p.y.is_finite(), "{} broke at {:?}", s, v);
        }
        assert!(d.overlap_score.is_finite());
    }
}

#[test]
fn aromatic_rings_reported_for_renderer() {
    let d = laid_out("c1ccc2ccccc2c1");
    assert_eq!(d.rings.ring_count(), 2);
    for ring in &d.rings.rings {
        assert!(d.rings.is_aromatic(&d.graph, ring));
    }
}

#[test]
fn spiro_reported() {
    let d = laid_out("C1CCC2(CC1)CCC2");
    assert_eq!(d.rings.ring_count(), 2);
    assert_eq!(d.rings.spiro_rings().count(), 2);
}
