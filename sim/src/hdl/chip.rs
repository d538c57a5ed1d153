use std::{collections::BTreeMap, fmt::Display, rc::Rc};

use super::{
    gates::MAX_PINS,
    graph::{mask, CircuitGraph, Node, Source},
    EvalError,
};
use crate::framework::{ClockedSim, Latch};

/// One evaluation pass of a traced chip.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TraceRow {
    pub cycle: u64,
    /// inputs first, then outputs, in declaration order
    pub values: Vec<u16>,
}

/// Pin values recorded at each evaluation.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Trace {
    pub pins: Vec<(String, u8)>,
    pub rows: Vec<TraceRow>,
}

impl Display for Trace {
    /// `.out`-style table
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let widths: Vec<usize> = self
            .pins
            .iter()
            .map(|(name, width)| name.len().max(if *width == 1 { 1 } else { 5 }))
            .collect();
        write!(f, "| time |")?;
        for ((name, _), w) in self.pins.iter().zip(&widths) {
            write!(f, " {:^w$} |", name)?;
        }
        writeln!(f)?;
        for row in &self.rows {
            write!(f, "| {:>4} |", row.cycle)?;
            for (v, w) in row.values.iter().zip(&widths) {
                write!(f, " {:>w$} |", v)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Clocked simulation of a [`CircuitGraph`].
///
/// - [`ChipSim::evaluate`] recomputes every net from the input pins and the
///   current state of the sequential cells. No cell changes.
/// - [`ChipSim::tick`] computes the next state of every cell from the last
///   evaluation, then commits all of them at once.
#[derive(Debug, Clone)]
pub struct ChipSim {
    graph: Rc<CircuitGraph>,
    values: Vec<u16>,
    cells: Vec<Latch<u16>>,
    cycle_count: u64,
    evaluated: bool,
    trace: Option<Trace>,
}

impl ChipSim {
    pub fn new(graph: Rc<CircuitGraph>) -> Self {
        Self {
            values: vec![0; graph.nets.len()],
            cells: vec![Latch::default(); graph.cells.len()],
            graph,
            cycle_count: 0,
            evaluated: false,
            trace: None,
        }
    }

    pub fn graph(&self) -> &Rc<CircuitGraph> {
        &self.graph
    }

    /// Start recording a row per evaluation.
    pub fn enable_trace(&mut self) {
        let pins = self
            .graph
            .inputs
            .iter()
            .chain(&self.graph.outputs)
            .map(|p| (p.name.clone(), p.width))
            .collect();
        self.trace = Some(Trace {
            pins,
            rows: Vec::new(),
        });
    }

    pub fn trace(&self) -> Option<&Trace> {
        self.trace.as_ref()
    }

    /// Set one input pin. Takes effect at the next evaluation.
    pub fn set_input(&mut self, pin: &str, value: u16) -> Result<(), EvalError> {
        let port = self
            .graph
            .input(pin)
            .ok_or_else(|| EvalError::UnknownInput {
                chip: self.graph.name().to_string(),
                pin: pin.to_string(),
            })?;
        if value & !mask(port.width) != 0 {
            return Err(EvalError::Overflow {
                pin: pin.to_string(),
                value: value as u64,
                width: port.width,
            });
        }
        self.values[port.net] = value;
        Ok(())
    }

    /// Value of a top-level input or output pin.
    pub fn get(&self, pin: &str) -> Option<u16> {
        let port = self.graph.input(pin).or_else(|| self.graph.output(pin))?;
        Some(self.values[port.net])
    }

    /// Value of any net by its hierarchical name, e.g. `RAM8.Register[3].out`.
    pub fn peek(&self, net: &str) -> Option<u16> {
        self.graph.net_id(net).map(|id| self.values[id])
    }

    /// Current state of the first sequential cell built from primitive
    /// `chip` (e.g. `ARegister`).
    pub fn cell_state(&self, chip: &str) -> Option<u16> {
        self.graph
            .cells
            .iter()
            .position(|c| c.kind.name() == chip)
            .map(|i| self.cells[i].get())
    }

    /// (instance path, current value) of every sequential cell.
    pub fn cells(&self) -> impl Iterator<Item = (&str, u16)> + '_ {
        self.graph
            .cells
            .iter()
            .zip(&self.cells)
            .map(|(def, latch)| (def.path.as_str(), latch.get()))
    }

    pub fn outputs(&self) -> BTreeMap<String, u16> {
        self.graph
            .outputs
            .iter()
            .map(|p| (p.name.clone(), self.values[p.net]))
            .collect()
    }

    /// Evaluate the combinational logic under a complete input assignment
    /// and return every output pin.
    pub fn evaluate<K: AsRef<str>>(
        &mut self,
        inputs: impl IntoIterator<Item = (K, u16)>,
    ) -> Result<BTreeMap<String, u16>, EvalError> {
        let mut assigned = vec![None; self.graph.inputs.len()];
        for (name, value) in inputs {
            let name = name.as_ref();
            let Some(k) = self.graph.inputs.iter().position(|p| p.name == name) else {
                return Err(EvalError::UnknownInput {
                    chip: self.graph.name().to_string(),
                    pin: name.to_string(),
                });
            };
            let width = self.graph.inputs[k].width;
            if value & !mask(width) != 0 {
                return Err(EvalError::Overflow {
                    pin: name.to_string(),
                    value: value as u64,
                    width,
                });
            }
            assigned[k] = Some(value);
        }
        if let Some(k) = assigned.iter().position(Option::is_none) {
            return Err(EvalError::MissingInput {
                chip: self.graph.name().to_string(),
                pin: self.graph.inputs[k].name.clone(),
            });
        }
        // nothing is written until the whole assignment is valid
        for (port, value) in self.graph.inputs.iter().zip(assigned) {
            self.values[port.net] = value.unwrap_or_default();
        }
        self.propagate_signals();
        Ok(self.outputs())
    }

    /// Clock edge. Every cell reads its inputs from the last evaluation
    /// before any cell changes.
    pub fn tick(&mut self) {
        if !self.evaluated {
            tracing::warn!(chip = self.graph.name(), "clock tick without evaluation");
        }
        let mut ins = [0u16; MAX_PINS];
        for (def, latch) in self.graph.cells.iter().zip(self.cells.iter_mut()) {
            for (slot, net) in ins.iter_mut().zip(&def.inputs) {
                *slot = self.values[*net];
            }
            let next = def.kind.next_state(latch.get(), &ins[..def.inputs.len()]);
            latch.set_next(next & mask(def.width));
        }
        for latch in &mut self.cells {
            latch.commit();
        }
        self.cycle_count += 1;
        self.evaluated = false;
    }

    /// `evaluate` followed by `tick`; returns the outputs seen before the
    /// clock edge.
    pub fn step<K: AsRef<str>>(
        &mut self,
        inputs: impl IntoIterator<Item = (K, u16)>,
    ) -> Result<BTreeMap<String, u16>, EvalError> {
        let out = self.evaluate(inputs)?;
        self.tick();
        Ok(out)
    }

    /// Zero every sequential cell.
    pub fn reset_state(&mut self) {
        for latch in &mut self.cells {
            latch.force(0);
        }
        self.evaluated = false;
    }

    fn record(&mut self) {
        let Some(trace) = &mut self.trace else { return };
        let values = self
            .graph
            .inputs
            .iter()
            .chain(&self.graph.outputs)
            .map(|p| self.values[p.net])
            .collect();
        trace.rows.push(TraceRow {
            cycle: self.cycle_count,
            values,
        });
    }
}

impl ClockedSim for ChipSim {
    /// Evaluate with the inputs last given to [`ChipSim::set_input`].
    fn propagate_signals(&mut self) {
        let mut ins = [0u16; MAX_PINS];
        let mut outs = [0u16; MAX_PINS];
        for node in &self.graph.nodes {
            match node {
                Node::Wire { src, dst } => {
                    let v = match src {
                        Source::Slice(s) => s.read(&self.values),
                        Source::Const(c) => *c,
                    };
                    dst.write(&mut self.values, v);
                }
                Node::Gate {
                    gate,
                    inputs,
                    outputs,
                } => {
                    for (slot, net) in ins.iter_mut().zip(inputs) {
                        *slot = self.values[*net];
                    }
                    gate.eval(&ins[..inputs.len()], &mut outs[..outputs.len()]);
                    for (net, v) in outputs.iter().zip(outs) {
                        self.values[*net] = v & mask(self.graph.nets[*net].width);
                    }
                }
                Node::Latch { cell, out } => self.values[*out] = self.cells[*cell].get(),
            }
        }
        self.evaluated = true;
        self.record();
    }

    fn initiate_next_cycle(&mut self) {
        self.tick()
    }

    fn cycle_count(&self) -> u64 {
        self.cycle_count
    }
}
