use crate::element::Element;
use crate::smiles::error::SmilesError;
use crate::smiles::tokenizer::{AtomToken, BondSym, ChiralityTok, Token};

/// An unresolved ring-bond marker on a tree atom.
///
/// Two markers with the same `id` anywhere in the tree designate one bond;
/// matching them up is the depiction engine's job, not the parser's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingMarker {
    pub id: u16,
    pub bond: Option<BondSym>,
}

/// One atom of the parsed molecule tree.
#[derive(Debug, Clone)]
pub struct TreeAtom {
    pub element: Element,
    pub is_aromatic: bool,
    pub isotope: u16,
    pub chirality: ChiralityTok,
    /// Explicit hydrogen count for bracket atoms; `None` means implicit.
    pub hcount: Option<u8>,
    pub charge: i8,
    pub is_bracket: bool,
    /// Index of the atom this one branches off, `None` for a root.
    pub parent: Option<usize>,
    /// Bond symbol written between this atom and its parent.
    pub bond_to_parent: Option<BondSym>,
    /// Whether this atom opens a parenthesized branch.
    pub from_branch: bool,
    /// Child atom indices in source order.
    pub children: Vec<usize>,
    /// Ring-bond markers in source order, unresolved.
    pub ring_markers: Vec<RingMarker>,
}

/// The parsed molecule tree handed to the depiction engine.
///
/// Atoms are stored in source order; index equals parse order. The
/// engine's contract: every tree atom yields exactly one graph vertex,
/// and every matched [`RingMarker`] pair yields exactly one extra edge.
#[derive(Debug, Clone, Default)]
pub struct ParseTree {
    pub atoms: Vec<TreeAtom>,
}

pub fn build_tree(tokens: &[Token]) -> Result<ParseTree, SmilesError> {
    let mut atoms: Vec<TreeAtom> = Vec::new();
    let mut stack: Vec<usize> = Vec::new();
    let mut current: Option<usize> = None;
    let mut pending_bond: Option<BondSym> = None;
    let mut branch_start = false;

    for token in tokens {
        match token {
            Token::Atom(tok) => {
                let idx = atoms.len();
                let bond = pending_bond.take();
                atoms.push(tree_atom(tok, current, bond, branch_start));
                branch_start = false;
                if let Some(cur) = current {
                    atoms[cur].children.push(idx);
                }
                current = Some(idx);
            }
            Token::Bond(b) => {
                pending_bond = Some(*b);
            }
            Token::RingClosure { bond, id } => {
                let cur = current.ok_or(SmilesError::DanglingRingBond { pos: 0 })?;
                atoms[cur].ring_markers.push(RingMarker {
                    id: *id,
                    bond: bond.or(pending_bond.take()),
                });
            }
            Token::OpenParen(pos) => {
                let cur = current.ok_or(SmilesError::UnmatchedParen { pos: *pos })?;
                stack.push(cur);
                branch_start = true;
            }
            Token::CloseParen(pos) => {
                current = Some(stack.pop().ok_or(SmilesError::UnmatchedParen { pos: *pos })?);
                pending_bond = None;
            }
            Token::Dot => {
                current = None;
                pending_bond = None;
            }
        }
    }

    if !stack.is_empty() {
        return Err(SmilesError::UnmatchedParen { pos: 0 });
    }
    if pending_bond.is_some() {
        return Err(SmilesError::DanglingBond { pos: 0 });
    }

    Ok(ParseTree { atoms })
}

fn tree_atom(
    tok: &AtomToken,
    parent: Option<usize>,
    bond: Option<BondSym>,
    from_branch: bool,
) -> TreeAtom {
    TreeAtom {
        element: tok.element,
        is_aromatic: tok.is_aromatic,
        isotope: tok.isotope,
        chirality: tok.chirality,
        hcount: tok.hcount,
        charge: tok.charge,
        is_bracket: tok.is_bracket,
        parent,
        bond_to_parent: bond,
        from_branch,
        children: Vec::new(),
        ring_markers: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smiles::tokenizer::tokenize;

    fn tree(s: &str) -> ParseTree {
        build_tree(&tokenize(s).unwrap()).unwrap()
    }

    #[test]
    fn butane_chain() {
        let t = tree("CCCC");
        assert_eq!(t.atoms.len(), 4);
        assert_eq!(t.atoms[0].parent, None);
        assert_eq!(t.atoms[3].parent, Some(2));
        assert_eq!(t.atoms[1].children, vec![2]);
    }

    #[test]
    fn branches() {
        let t = tree("CC(C)(C)C");
        assert_eq!(t.atoms[1].children, vec![2, 3, 4]);
        assert_eq!(t.atoms[4].parent, Some(1));
        assert!(t.atoms[2].from_branch);
        assert!(t.atoms[3].from_branch);
        assert!(!t.atoms[4].from_branch);
    }

    #[test]
    fn ring_markers_left_unresolved() {
        let t = tree("C1CCCCC1");
        assert_eq!(t.atoms[0].ring_markers.len(), 1);
        assert_eq!(t.atoms[5].ring_markers.len(), 1);
        assert_eq!(t.atoms[0].ring_markers[0].id, 1);
        // No extra child edges for ring bonds: the tree stays a tree.
        assert!(t.atoms[5].children.is_empty());
        assert_eq!(t.atoms[0].children, vec![1]);
    }

    #[test]
    fn ring_marker_bond_kind() {
        let t = tree("C=1CCCCC=1");
        assert_eq!(t.atoms[0].ring_markers[0].bond, Some(BondSym::Double));
    }

    #[test]
    fn double_bond_to_parent() {
        let t = tree("C=O");
        assert_eq!(t.atoms[1].bond_to_parent, Some(BondSym::Double));
    }

    #[test]
    fn dot_starts_new_root() {
        let t = tree("[Na+].[Cl-]");
        assert_eq!(t.atoms.len(), 2);
        assert_eq!(t.atoms[1].parent, None);
        assert!(t.atoms[0].children.is_empty());
    }

    #[test]
    fn unmatched_paren() {
        let tokens = tokenize("C(C").unwrap();
        assert!(build_tree(&tokens).is_err());
    }

    #[test]
    fn unmatched_close_paren() {
        let tokens = tokenize("CC)C").unwrap();
        assert!(build_tree(&tokens).is_err());
    }

    #[test]
    fn unclosed_ring_marker_is_not_an_error() {
        // Left for the engine to ignore, per the depiction contract.
        let t = tree("C1CC");
        assert_eq!(t.atoms[0].ring_markers.len(), 1);
    }
}
