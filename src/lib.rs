//! 2D depiction engine for molecular graphs.
//!
//! Takes a parsed molecule tree (atoms, bonds, ring-bond markers — the
//! shape any SMILES parser produces) and assigns every atom a 2D
//! position suitable for rendering: ring perception and bridged-ring
//! consolidation, recursive coordinate assignment, iterative overlap
//! resolution, and wedge-bond annotation for stereocenters. Rendering
//! itself (SVG, canvas, pixels) is out of scope; the output is the
//! positioned graph plus ring metadata a renderer can walk.
//!
//! ```
//! use moldraw::{LayoutOptions, depict_smiles};
//!
//! let depiction = depict_smiles("C1CCCCC1", &LayoutOptions::default()).unwrap();
//! assert_eq!(depiction.formula, "C6H12");
//! assert_eq!(depiction.rings.ring_count(), 1);
//! ```

pub mod element;
pub mod forces;
pub mod formula;
pub mod geometry;
pub mod graph;
pub mod layout;
pub mod overlap;
pub mod rings;
pub mod smiles;
pub mod stereo;

use std::fmt;

pub use element::Element;
pub use formula::molecular_formula;
pub use geometry::Vec2;
pub use graph::{BondKind, Edge, GraphError, MolGraph, StereoDescriptor, Vertex, Wedge};
pub use layout::{LayoutOptions, PlacementContext};
pub use rings::{Ring, RingConnection, RingConnectionKind, RingModel};
pub use smiles::{ParseTree, SmilesError};

/// A fully laid-out molecule.
pub struct Depiction {
    /// The graph, every drawn vertex holding a final position and every
    /// stereo-relevant edge a wedge direction.
    pub graph: MolGraph,
    /// Rings with centers and fused/spiro/bridged classification.
    pub rings: RingModel,
    /// Residual overlap after resolution (diagnostic, not zero).
    pub overlap_score: f64,
    /// Hill-system molecular formula.
    pub formula: String,
}

/// Errors from the string-input convenience entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepictError {
    Smiles(SmilesError),
    Graph(GraphError),
}

impl fmt::Display for DepictError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Smiles(e) => write!(f, "{}", e),
            Self::Graph(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for DepictError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Smiles(e) => Some(e),
            Self::Graph(e) => Some(e),
        }
    }
}

impl From<SmilesError> for DepictError {
    fn from(e: SmilesError) -> Self {
        Self::Smiles(e)
    }
}

impl From<GraphError> for DepictError {
    fn from(e: GraphError) -> Self {
        Self::Graph(e)
    }
}

/// Lay out a parsed molecule tree.
///
/// The full pipeline: graph construction, ring perception and bridged
/// consolidation, recursive placement, overlap resolution, stereo
/// annotation (when [`LayoutOptions::isomeric`] is set), and a final
/// rotation that puts the widest dimension horizontal.
pub fn depict(tree: &ParseTree, opts: &LayoutOptions) -> Result<Depiction, GraphError> {
    let mut graph = MolGraph::from_tree(tree)?;
    let mut rings = RingModel::analyze(&mut graph);

    layout::position(&mut graph, &mut rings, opts);
    rings.restore(&mut graph);

    let overlap_score = overlap::resolve(&mut graph, &mut rings, opts);

    if opts.isomeric {
        stereo::annotate(&mut graph);
    }

    layout::rotate_drawing(&mut graph, &mut rings);

    let formula = molecular_formula(&graph);
    Ok(Depiction {
        graph,
        rings,
        overlap_score,
        formula,
    })
}

/// Parse a SMILES string and lay it out.
pub fn depict_smiles(s: &str, opts: &LayoutOptions) -> Result<Depiction, DepictError> {
    let tree = smiles::parse(s)?;
    Ok(depict(&tree, opts)?)
}

#[cfg(test)]
mod tests;
