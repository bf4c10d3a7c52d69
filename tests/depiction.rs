use serde::Deserialize;

use moldraw::{LayoutOptions, Wedge, depict_smiles};

#[derive(Deserialize)]
struct Entry {
    smiles: String,
    formula: String,
    rings: usize,
    bridged: bool,
}

fn dataset() -> Vec<Entry> {
    serde_json::from_str(include_str!("data/molecules.json")).unwrap()
}

#[test]
fn formulas_match() {
    for entry in dataset() {
        let d = depict_smiles(&entry.smiles, &LayoutOptions::default()).unwrap();
        assert_eq!(d.formula, entry.formula, "formula of {}", entry.smiles);
    }
}

#[test]
fn ring_counts_match() {
    for entry in dataset() {
        let d = depict_smiles(&entry.smiles, &LayoutOptions::default()).unwrap();
        assert_eq!(
            d.rings.ring_count(),
            entry.rings,
            "ring count of {}",
            entry.smiles
        );
        assert_eq!(
            d.rings.has_bridged, entry.bridged,
            "bridged flag of {}",
            entry.smiles
        );
    }
}

#[test]
fn every_vertex_positioned_and_finite() {
    for entry in dataset() {
        let d = depict_smiles(&entry.smiles, &LayoutOptions::default()).unwrap();
        for v in d.graph.vertices() {
            let p = d.graph.vertex(v).position;
            assert!(
                p.x.is_finite() && p.y.is_finite(),
                "{} vertex {:?} at {:?}",
                entry.smiles,
                v,
                p
            );
        }
        assert!(d.overlap_score.is_finite() && d.overlap_score >= 0.0);
    }
}

#[test]
fn bond_lengths_reasonable() {
    // Rotations and force relaxation may stretch a bridged bond, but
    // nothing should collapse or explode.
    for entry in dataset() {
        let d = depict_smiles(&entry.smiles, &LayoutOptions::default()).unwrap();
        let opts = LayoutOptions::default();
        for e in d.graph.edges() {
            let (a, b) = d.graph.endpoints(e);
            let dist = d
                .graph
                .vertex(a)
                .position
                .distance(d.graph.vertex(b).position);
            assert!(
                dist > 0.2 * opts.bond_length && dist < 4.0 * opts.bond_length,
                "{} bond {:?}-{:?} length {}",
                entry.smiles,
                a,
                b,
                dist
            );
        }
    }
}

#[test]
fn stereocenters_get_exactly_one_wedge() {
    for entry in dataset() {
        let d = depict_smiles(&entry.smiles, &LayoutOptions::default()).unwrap();
        let centers = d
            .graph
            .vertices()
            .filter(|&v| d.graph.vertex(v).is_stereo_center)
            .count();
        let wedges = d
            .graph
            .edges()
            .filter(|&e| d.graph.edge(e).wedge != Wedge::None)
            .count();
        assert_eq!(wedges, centers, "wedges of {}", entry.smiles);
    }
}

#[test]
fn reruns_are_byte_identical() {
    for entry in dataset() {
        let bits = |d: &moldraw::Depiction| {
            d.graph
                .vertices()
                .map(|v| {
                    let p = d.graph.vertex(v).position;
                    (p.x.to_bits(), p.y.to_bits())
                })
                .collect::<Vec<_>>()
        };
        let first = depict_smiles(&entry.smiles, &LayoutOptions::default()).unwrap();
        let second = depict_smiles(&entry.smiles, &LayoutOptions::default()).unwrap();
        assert_eq!(bits(&first), bits(&second), "{}", entry.smiles);
    }
}
