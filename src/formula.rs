//! Molecular formula derived from the depiction graph.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::graph::MolGraph;

/// Hill-system formula string: C first, then H, then the remaining
/// elements alphabetically (all alphabetical when there is no carbon).
///
/// Hydrogen counts come from the graph's drawing rules: bracket atoms
/// contribute their explicit count, everything else its free valence
/// (less one for aromatic ring members).
pub fn molecular_formula(graph: &MolGraph) -> String {
    let mut counts: BTreeMap<&'static str, u32> = BTreeMap::new();

    for idx in graph.vertices() {
        let v = graph.vertex(idx);
        *counts.entry(v.element.symbol()).or_default() += 1;
        let h = graph.implicit_hydrogens(idx) as u32;
        if h > 0 {
            *counts.entry("H").or_default() += h;
        }
    }

    let mut result = String::new();

    if counts.contains_key("C") {
        append_element(&mut result, "C", counts.remove("C").unwrap_or(0));
        if let Some(h) = counts.remove("H") {
            append_element(&mut result, "H", h);
        }
    }

    for (symbol, count) in &counts {
        append_element(&mut result, symbol, *count);
    }

    result
}

fn append_element(buf: &mut String, symbol: &str, count: u32) {
    buf.push_str(symbol);
    if count > 1 {
        write!(buf, "{count}").unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smiles::parse;

    fn formula(s: &str) -> String {
        let mut graph = MolGraph::from_tree(&parse(s).unwrap()).unwrap();
        crate::rings::close_ring_markers(&mut graph);
        molecular_formula(&graph)
    }

    #[test]
    fn methane() {
        assert_eq!(formula("C"), "CH4");
    }

    #[test]
    fn butane() {
        assert_eq!(formula("CCCC"), "C4H10");
    }

    #[test]
    fn ethanol() {
        assert_eq!(formula("CCO"), "C2H6O");
    }

    #[test]
    fn benzene() {
        assert_eq!(formula("c1ccccc1"), "C6H6");
    }

    #[test]
    fn cyclohexane() {
        assert_eq!(formula("C1CCCCC1"), "C6H12");
    }

    #[test]
    fn bracket_hydrogens_explicit() {
        assert_eq!(formula("[CH3]O"), "CH4O");
    }

    #[test]
    fn no_carbon_alphabetical() {
        assert_eq!(formula("O"), "H2O");
        assert_eq!(formula("[Na+].[Cl-]"), "ClNa");
    }

    #[test]
    fn chiral_bracket_counts_its_hydrogen() {
        assert_eq!(formula("F[C@H](Cl)Br"), "CHBrClF");
    }

    #[test]
    fn empty_graph() {
        let graph = MolGraph::from_tree(&Default::default()).unwrap();
        assert_eq!(molecular_formula(&graph), "");
    }
}
