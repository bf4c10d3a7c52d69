//! SMILES front-end: string → [`ParseTree`].
//!
//! The depiction engine itself consumes a [`ParseTree`]; any parser that
//! produces one can drive it. This module is the bundled reference
//! front-end. Note that ring-bond markers are deliberately *not* resolved
//! here — matching them into edges is part of ring perception.

pub mod error;
mod tokenizer;
mod tree;

pub use error::SmilesError;
pub use tokenizer::{BondSym, ChiralityTok};
pub use tree::{ParseTree, RingMarker, TreeAtom};

/// Parse a SMILES string into the engine's input tree.
pub fn parse(s: &str) -> Result<ParseTree, SmilesError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(SmilesError::EmptyInput);
    }
    let tokens = tokenizer::tokenize(trimmed)?;
    if tokens.is_empty() {
        return Err(SmilesError::EmptyInput);
    }
    tree::build_tree(&tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input() {
        assert!(matches!(parse(""), Err(SmilesError::EmptyInput)));
        assert!(matches!(parse("   "), Err(SmilesError::EmptyInput)));
    }

    #[test]
    fn caffeine_parses() {
        let tree = parse("Cn1cnc2c1c(=O)n(C)c(=O)n2C").unwrap();
        assert_eq!(tree.atoms.len(), 14);
    }
}
