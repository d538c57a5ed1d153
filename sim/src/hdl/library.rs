use std::{collections::BTreeMap, path::Path, rc::Rc};

use anyhow::Context;

use super::{
    ast::ChipDef, gates::Primitive, graph::CircuitGraph, parse::parse_chip, stdlib, ChipSim,
    HdlError,
};

/// What a chip name refers to.
#[derive(Debug, Clone, Copy)]
pub enum Resolved<'a> {
    Composite(&'a ChipDef),
    Primitive(Primitive),
}

/// Registry of chip definitions. A definition with the name of a primitive
/// shadows the primitive.
#[derive(Debug, Default, Clone)]
pub struct ChipLibrary {
    defs: BTreeMap<String, ChipDef>,
}

impl ChipLibrary {
    /// A library with only the primitives.
    pub fn new() -> Self {
        Self::default()
    }

    /// The primitives plus the shipped composite chips (ALU, PC, memories and
    /// CPU).
    pub fn standard() -> Result<Self, HdlError> {
        let mut lib = Self::new();
        for src in stdlib::STANDARD {
            lib.add_source(src)?;
        }
        Ok(lib)
    }

    /// Register a definition, returning the one it replaces.
    pub fn add(&mut self, def: ChipDef) -> Option<ChipDef> {
        tracing::trace!(chip = def.name, "register chip");
        self.defs.insert(def.name.clone(), def)
    }

    /// Parse and register one `.hdl` source, returning the chip name.
    pub fn add_source(&mut self, src: &str) -> Result<String, HdlError> {
        let def = parse_chip(src)?;
        let name = def.name.clone();
        self.add(def);
        Ok(name)
    }

    /// Register every `.hdl` file of a directory.
    pub fn load_dir(&mut self, dir: &Path) -> anyhow::Result<Vec<String>> {
        let mut paths = std::fs::read_dir(dir)
            .with_context(|| format!("could not read directory `{}`", dir.display()))?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "hdl"))
            .collect::<Vec<_>>();
        paths.sort();
        let mut names = Vec::new();
        for path in paths {
            let src = std::fs::read_to_string(&path)
                .with_context(|| format!("could not read file `{}`", path.display()))?;
            let name = self
                .add_source(&src)
                .with_context(|| format!("in `{}`", path.display()))?;
            names.push(name);
        }
        tracing::debug!(dir = %dir.display(), chips = names.len(), "loaded HDL directory");
        Ok(names)
    }

    pub fn get(&self, name: &str) -> Option<&ChipDef> {
        self.defs.get(name)
    }

    pub fn resolve(&self, name: &str) -> Option<Resolved<'_>> {
        if let Some(def) = self.defs.get(name) {
            Some(Resolved::Composite(def))
        } else {
            Primitive::from_name(name).map(Resolved::Primitive)
        }
    }

    pub fn build(&self, name: &str) -> Result<CircuitGraph, HdlError> {
        CircuitGraph::build(name, self)
    }

    /// Build chip `name` and wrap it in a fresh simulator.
    pub fn simulate(&self, name: &str) -> Result<ChipSim, HdlError> {
        Ok(ChipSim::new(Rc::new(self.build(name)?)))
    }
}
