//! Elaboration of a chip definition into a flat circuit.
//!
//! Every use of a sub-chip becomes its own instance: each of its pins is a
//! net named after the instance path (`CPU.ALU[9].Add16[6].out`), every
//! binding becomes a wire node copying bits between nets, and every primitive
//! becomes a gate node or a latch node. The nodes are then scheduled once, in
//! dependency order.

use std::collections::{BTreeSet, HashMap, HashSet};

use super::{
    ast::{Actual, ChipDef, PinRef},
    gates::Primitive,
    library::{ChipLibrary, Resolved},
    DefinitionError, EvalError, HdlError,
};
use crate::framework::PropOrderBuilder;

pub(crate) type NetId = usize;

/// Bit mask of the lowest `width` bits.
pub(crate) fn mask(width: u8) -> u16 {
    if width >= 16 {
        u16::MAX
    } else {
        (1 << width) - 1
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Net {
    pub name: String,
    pub width: u8,
}

/// Bits `lo..lo + width` of a net.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Slice {
    pub net: NetId,
    pub lo: u8,
    pub width: u8,
}

impl Slice {
    pub fn read(&self, values: &[u16]) -> u16 {
        (values[self.net] >> self.lo) & mask(self.width)
    }
    pub fn write(&self, values: &mut [u16], value: u16) {
        let m = mask(self.width) << self.lo;
        let v = &mut values[self.net];
        *v = (*v & !m) | ((value << self.lo) & m);
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Source {
    Slice(Slice),
    Const(u16),
}

#[derive(Debug, Clone)]
pub(crate) enum Node {
    /// Copy a slice (or constant) into another slice.
    Wire { src: Source, dst: Slice },
    /// Evaluate a combinational primitive.
    Gate {
        gate: Primitive,
        inputs: Vec<NetId>,
        outputs: Vec<NetId>,
    },
    /// Expose the current value of a sequential cell.
    Latch { cell: usize, out: NetId },
}

impl Node {
    fn reads(&self) -> Vec<NetId> {
        match self {
            Node::Wire {
                src: Source::Slice(s),
                ..
            } => vec![s.net],
            Node::Wire { .. } | Node::Latch { .. } => Vec::new(),
            Node::Gate { inputs, .. } => inputs.clone(),
        }
    }
    fn writes(&self) -> Vec<NetId> {
        match self {
            Node::Wire { dst, .. } => vec![dst.net],
            Node::Gate { outputs, .. } => outputs.clone(),
            Node::Latch { out, .. } => vec![*out],
        }
    }
}

/// A state-holding primitive instance.
#[derive(Debug, Clone)]
pub(crate) struct CellDef {
    pub path: String,
    pub kind: Primitive,
    pub inputs: Vec<NetId>,
    pub width: u8,
}

/// A top-level pin of the circuit.
#[derive(Debug, Clone)]
pub struct Port {
    pub name: String,
    pub width: u8,
    pub(crate) net: NetId,
}

/// The elaborated, scheduled circuit of a chip. Its topology never changes
/// after construction; values live in [`super::ChipSim`].
#[derive(Debug)]
pub struct CircuitGraph {
    name: String,
    pub(crate) inputs: Vec<Port>,
    pub(crate) outputs: Vec<Port>,
    pub(crate) nets: Vec<Net>,
    /// in evaluation order
    pub(crate) nodes: Vec<Node>,
    pub(crate) cells: Vec<CellDef>,
    depth: i32,
}

impl CircuitGraph {
    /// Elaborate chip `name` from `library` and schedule its evaluation.
    pub fn build(name: &str, library: &ChipLibrary) -> Result<Self, HdlError> {
        let mut el = Elaborator {
            library,
            nets: Vec::new(),
            nodes: Vec::new(),
            cells: Vec::new(),
            stack: Vec::new(),
        };
        let top = el.instantiate(name, "<top>", name.to_string())?;

        let mut builder = PropOrderBuilder::new();
        for node in &el.nodes {
            builder.add_node(node.reads(), node.writes());
        }
        let order = builder.build().map_err(|rest| {
            let mut pins: Vec<String> = cycle_core(&el.nodes, rest)
                .iter()
                .flat_map(|n| el.nodes[*n].writes())
                .map(|net| el.nets[net].name.clone())
                .collect();
            pins.sort();
            pins.dedup();
            pins.truncate(8);
            DefinitionError::Cycle {
                chip: name.to_string(),
                pins,
            }
        })?;

        let mut nodes: Vec<Option<Node>> = el.nodes.into_iter().map(Some).collect();
        let nodes = order
            .order()
            .iter()
            .filter_map(|i| nodes[*i].take())
            .collect::<Vec<_>>();
        tracing::debug!(
            chip = name,
            nets = el.nets.len(),
            nodes = nodes.len(),
            cells = el.cells.len(),
            depth = order.depth(),
            "elaborated circuit"
        );

        Ok(Self {
            name: name.to_string(),
            inputs: top.inputs,
            outputs: top.outputs,
            nets: el.nets,
            nodes,
            cells: el.cells,
            depth: order.depth(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn inputs(&self) -> &[Port] {
        &self.inputs
    }
    pub fn outputs(&self) -> &[Port] {
        &self.outputs
    }
    pub fn input(&self, name: &str) -> Option<&Port> {
        self.inputs.iter().find(|p| p.name == name)
    }
    pub fn output(&self, name: &str) -> Option<&Port> {
        self.outputs.iter().find(|p| p.name == name)
    }
    pub fn net_count(&self) -> usize {
        self.nets.len()
    }
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
    /// Longest chain of dependent nodes.
    pub fn depth(&self) -> i32 {
        self.depth
    }
    pub(crate) fn net_id(&self, name: &str) -> Option<NetId> {
        self.nets.iter().position(|n| n.name == name)
    }
}

/// Drop the nodes that are only blocked by a cycle, keeping those on it.
fn cycle_core(nodes: &[Node], rest: Vec<usize>) -> Vec<usize> {
    let mut rest: BTreeSet<usize> = rest.into_iter().collect();
    loop {
        let read: HashSet<NetId> = rest.iter().flat_map(|n| nodes[*n].reads()).collect();
        let before = rest.len();
        rest.retain(|n| nodes[*n].writes().iter().any(|w| read.contains(w)));
        if rest.len() == before {
            return rest.into_iter().collect();
        }
    }
}

/// Pins of one instance, as seen by the chip that uses it.
struct Scope {
    chip: String,
    inputs: Vec<Port>,
    outputs: Vec<Port>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PinKind {
    Input,
    Output,
    Internal,
}

#[derive(Debug, Clone, Copy)]
struct Local {
    net: NetId,
    width: u8,
    kind: PinKind,
}

/// Resolve an optional bit range against a pin width, as `(lo, width)`.
fn bit_range(chip: &str, pin: &PinRef, width: u8) -> Result<(u8, u8), DefinitionError> {
    match pin.range {
        None => Ok((0, width)),
        Some((lo, hi)) if lo <= hi && hi < width => Ok((lo, hi - lo + 1)),
        Some((lo, hi)) => Err(DefinitionError::BadRange {
            chip: chip.to_string(),
            pin: pin.name.clone(),
            lo: lo as u16,
            hi: hi as u16,
        }),
    }
}

struct Elaborator<'a> {
    library: &'a ChipLibrary,
    nets: Vec<Net>,
    nodes: Vec<Node>,
    cells: Vec<CellDef>,
    /// chips being elaborated, outermost first
    stack: Vec<String>,
}

impl<'a> Elaborator<'a> {
    fn new_net(&mut self, name: String, width: u8) -> NetId {
        self.nets.push(Net { name, width });
        self.nets.len() - 1
    }

    fn new_ports(&mut self, path: &str, sig: &[(&str, u8)]) -> Vec<Port> {
        sig.iter()
            .map(|(name, width)| Port {
                name: name.to_string(),
                width: *width,
                net: self.new_net(format!("{path}.{name}"), *width),
            })
            .collect()
    }

    fn instantiate(&mut self, chip: &str, parent: &str, path: String) -> Result<Scope, HdlError> {
        match self.library.resolve(chip) {
            Some(Resolved::Composite(def)) => {
                if self.stack.iter().any(|c| c == &def.name) {
                    return Err(DefinitionError::Recursive(def.name.clone()).into());
                }
                self.stack.push(def.name.clone());
                let scope = self.composite(def, &path)?;
                self.stack.pop();
                Ok(scope)
            }
            Some(Resolved::Primitive(p)) => Ok(self.primitive(p, &path)),
            None => Err(DefinitionError::UnknownChip {
                name: chip.to_string(),
                parent: parent.to_string(),
            }
            .into()),
        }
    }

    fn primitive(&mut self, p: Primitive, path: &str) -> Scope {
        let inputs = self.new_ports(path, p.inputs());
        let outputs = self.new_ports(path, p.outputs());
        if p.is_sequential() {
            self.cells.push(CellDef {
                path: path.to_string(),
                kind: p,
                inputs: inputs.iter().map(|p| p.net).collect(),
                width: outputs[0].width,
            });
            self.nodes.push(Node::Latch {
                cell: self.cells.len() - 1,
                out: outputs[0].net,
            });
        } else {
            self.nodes.push(Node::Gate {
                gate: p,
                inputs: inputs.iter().map(|p| p.net).collect(),
                outputs: outputs.iter().map(|p| p.net).collect(),
            });
        }
        Scope {
            chip: p.name().to_string(),
            inputs,
            outputs,
        }
    }

    fn composite(&mut self, def: &'a ChipDef, path: &str) -> Result<Scope, HdlError> {
        let chip = def.name.as_str();
        let mut locals: HashMap<&'a str, Local> = HashMap::new();
        let mut inputs = Vec::new();
        let mut outputs = Vec::new();
        for (decls, kind) in [(&def.inputs, PinKind::Input), (&def.outputs, PinKind::Output)] {
            for decl in decls {
                if decl.width == 0 || decl.width > 16 {
                    return Err(DefinitionError::BadWidth {
                        chip: chip.to_string(),
                        pin: decl.name.clone(),
                        width: decl.width as u16,
                    }
                    .into());
                }
                if locals.contains_key(decl.name.as_str()) {
                    return Err(DefinitionError::DuplicatePin {
                        chip: chip.to_string(),
                        pin: decl.name.clone(),
                    }
                    .into());
                }
                let net = self.new_net(format!("{path}.{}", decl.name), decl.width);
                locals.insert(
                    &decl.name,
                    Local {
                        net,
                        width: decl.width,
                        kind,
                    },
                );
                let port = Port {
                    name: decl.name.clone(),
                    width: decl.width,
                    net,
                };
                match kind {
                    PinKind::Input => inputs.push(port),
                    _ => outputs.push(port),
                }
            }
        }

        let mut parts = Vec::with_capacity(def.parts.len());
        for (i, part) in def.parts.iter().enumerate() {
            parts.push(self.instantiate(&part.chip, chip, format!("{path}.{}[{i}]", part.chip))?);
        }

        // internal pins take the width of the part output driving them
        for (part, child) in def.parts.iter().zip(&parts) {
            for b in &part.bindings {
                let Some(port) = child.outputs.iter().find(|p| p.name == b.formal.name) else {
                    continue;
                };
                let Actual::Pin(actual) = &b.actual else {
                    return Err(DefinitionError::ConstantOutput {
                        chip: chip.to_string(),
                        part: part.chip.clone(),
                        pin: b.formal.name.clone(),
                    }
                    .into());
                };
                if locals.contains_key(actual.name.as_str()) {
                    continue;
                }
                if let Some((lo, hi)) = actual.range {
                    return Err(DefinitionError::BadRange {
                        chip: chip.to_string(),
                        pin: actual.name.clone(),
                        lo: lo as u16,
                        hi: hi as u16,
                    }
                    .into());
                }
                let (_, width) = bit_range(&child.chip, &b.formal, port.width)?;
                let net = self.new_net(format!("{path}.{}", actual.name), width);
                locals.insert(
                    &actual.name,
                    Local {
                        net,
                        width,
                        kind: PinKind::Internal,
                    },
                );
            }
        }

        let mut driven: HashMap<NetId, u16> = HashMap::new();
        let mut reads: Vec<(NetId, u16, String)> = Vec::new();
        for (part, child) in def.parts.iter().zip(&parts) {
            let mut bound = vec![0u16; child.inputs.len()];
            for b in &part.bindings {
                let width_mismatch = |actual: &PinRef, expected: u8, found: u8| -> HdlError {
                    EvalError::WidthMismatch {
                        chip: chip.to_string(),
                        formal: format!("{}.{}", part.chip, b.formal),
                        actual: actual.to_string(),
                        expected,
                        found,
                    }
                    .into()
                };
                if let Some(k) = child.inputs.iter().position(|p| p.name == b.formal.name) {
                    let port = &child.inputs[k];
                    let (flo, fw) = bit_range(&child.chip, &b.formal, port.width)?;
                    let fmask = mask(fw) << flo;
                    if bound[k] & fmask != 0 {
                        return Err(DefinitionError::MultipleDrivers {
                            chip: chip.to_string(),
                            pin: format!("{}.{}", part.chip, b.formal),
                        }
                        .into());
                    }
                    bound[k] |= fmask;
                    let src = match &b.actual {
                        Actual::Const(v) => Source::Const(if *v { mask(fw) } else { 0 }),
                        Actual::Pin(actual) => {
                            let Some(local) = locals.get(actual.name.as_str()) else {
                                return Err(DefinitionError::Undriven {
                                    chip: chip.to_string(),
                                    pin: actual.name.clone(),
                                }
                                .into());
                            };
                            let (alo, aw) = bit_range(chip, actual, local.width)?;
                            if aw != fw {
                                return Err(width_mismatch(actual, fw, aw));
                            }
                            if local.kind != PinKind::Input {
                                reads.push((local.net, mask(aw) << alo, actual.name.clone()));
                            }
                            Source::Slice(Slice {
                                net: local.net,
                                lo: alo,
                                width: aw,
                            })
                        }
                    };
                    self.nodes.push(Node::Wire {
                        src,
                        dst: Slice {
                            net: port.net,
                            lo: flo,
                            width: fw,
                        },
                    });
                } else if let Some(port) = child.outputs.iter().find(|p| p.name == b.formal.name) {
                    let (flo, fw) = bit_range(&child.chip, &b.formal, port.width)?;
                    // constants were rejected while collecting internal pins
                    let Actual::Pin(actual) = &b.actual else {
                        unreachable!()
                    };
                    let local = locals[actual.name.as_str()];
                    if local.kind == PinKind::Input {
                        return Err(DefinitionError::DrivesInput {
                            chip: chip.to_string(),
                            pin: actual.name.clone(),
                        }
                        .into());
                    }
                    let (alo, aw) = bit_range(chip, actual, local.width)?;
                    if aw != fw {
                        return Err(width_mismatch(actual, fw, aw));
                    }
                    let amask = mask(aw) << alo;
                    let bits = driven.entry(local.net).or_default();
                    if *bits & amask != 0 {
                        return Err(DefinitionError::MultipleDrivers {
                            chip: chip.to_string(),
                            pin: actual.to_string(),
                        }
                        .into());
                    }
                    *bits |= amask;
                    self.nodes.push(Node::Wire {
                        src: Source::Slice(Slice {
                            net: port.net,
                            lo: flo,
                            width: fw,
                        }),
                        dst: Slice {
                            net: local.net,
                            lo: alo,
                            width: aw,
                        },
                    });
                } else {
                    return Err(DefinitionError::UnknownPin {
                        chip: part.chip.clone(),
                        pin: b.formal.name.clone(),
                    }
                    .into());
                }
            }
            for (port, bits) in child.inputs.iter().zip(&bound) {
                if *bits != mask(port.width) {
                    return Err(DefinitionError::UnboundInput {
                        chip: chip.to_string(),
                        part: part.chip.clone(),
                        pin: port.name.clone(),
                    }
                    .into());
                }
            }
        }

        for (net, bits, name) in reads {
            if driven.get(&net).copied().unwrap_or(0) & bits != bits {
                return Err(DefinitionError::Undriven {
                    chip: chip.to_string(),
                    pin: name,
                }
                .into());
            }
        }
        for port in &outputs {
            if driven.get(&port.net).copied().unwrap_or(0) != mask(port.width) {
                return Err(DefinitionError::Undriven {
                    chip: chip.to_string(),
                    pin: port.name.clone(),
                }
                .into());
            }
        }
        tracing::trace!(chip, path, parts = parts.len(), "elaborated instance");

        Ok(Scope {
            chip: chip.to_string(),
            inputs,
            outputs,
        })
    }
}
