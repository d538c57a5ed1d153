//! Discrete-time simulation framework shared by the chip simulator and the
//! Hack machine.
mod propagate;

pub use propagate::{topo, PropOrder, PropOrderBuilder};

/// Size of the instruction memory and of the data memory, in words.
pub const MEM_SIZE: usize = 1 << 15;

/// State of a sequential element. The current value is what the rest of the
/// circuit observes during a cycle; the next value is only copied into it by
/// [`Latch::commit`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Latch<T: Copy> {
    cur: T,
    nex: T,
}

impl<T: Copy> Latch<T> {
    pub fn new(value: T) -> Self {
        Self {
            cur: value,
            nex: value,
        }
    }
    pub fn get(&self) -> T {
        self.cur
    }
    pub fn pending(&self) -> T {
        self.nex
    }
    pub fn set_next(&mut self, value: T) {
        self.nex = value
    }
    pub fn commit(&mut self) {
        self.cur = self.nex
    }
    /// Overwrite both phases.
    pub fn force(&mut self, value: T) {
        self.cur = value;
        self.nex = value;
    }
}

/// During a cycle, signals are propagated from the current state of the
/// sequential elements through the combinational logic. The clock edge then
/// latches the computed next state. Both simulators are driven by these two
/// operations.
pub trait ClockedSim {
    /// Propagate signals through the combinational logic. Sequential state is
    /// only read.
    fn propagate_signals(&mut self);

    /// Clock edge: compute every next state from the last propagation, then
    /// commit them all at once. Should be called after
    /// [`ClockedSim::propagate_signals`].
    fn initiate_next_cycle(&mut self);

    /// Number of clock edges since construction.
    fn cycle_count(&self) -> u64;

    /// One full cycle.
    fn step(&mut self) {
        self.propagate_signals();
        self.initiate_next_cycle();
    }

    fn run(&mut self, cycles: u64) {
        for _ in 0..cycles {
            self.step()
        }
    }
}
