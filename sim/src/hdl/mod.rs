//! Hardware description and simulation.
//!
//! A [`ChipDef`] (usually parsed from an `.hdl` file) is elaborated by a
//! [`ChipLibrary`] into a [`CircuitGraph`], which a [`ChipSim`] evaluates and
//! clocks.
mod ast;
mod chip;
mod error;
mod gates;
mod graph;
mod library;
mod parse;
pub mod stdlib;

pub use ast::{Actual, Binding, ChipDef, PartDecl, PinDecl, PinRef};
pub use chip::{ChipSim, Trace, TraceRow};
pub use error::{DefinitionError, EvalError, HdlError};
pub use gates::Primitive;
pub use graph::{CircuitGraph, Port};
pub use library::{ChipLibrary, Resolved};
pub use parse::parse_chip;
