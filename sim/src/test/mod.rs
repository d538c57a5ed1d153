//! This module contains utilities for verifying the correctness of a CPU
//! circuit against the reference instruction-set simulator.


use anyhow::Context;

use crate::asm::{assemble, AssembleOption};
use crate::hdl::ChipLibrary;
use crate::isa::StandardResult;
use crate::machine::HackMachine;
use crate::object::ObjectExt;

pub struct SimTester {
    library: ChipLibrary,
    cpu: String,
}

impl SimTester {
    /// Test chip `cpu` of `library`. Returns `None` if there is no such chip.
    pub fn new(library: ChipLibrary, cpu: &str) -> Option<Self> {
        library.resolve(cpu)?;
        Some(Self {
            library,
            cpu: cpu.into(),
        })
    }

    /// Test the `CPU` of the standard library.
    pub fn standard() -> anyhow::Result<Self> {
        let library = ChipLibrary::standard()?;
        Self::new(library, "CPU").context("no CPU chip in the standard library")
    }

    fn simulate(
        &self,
        obj: &ObjectExt,
        ram: &[u16],
        max_cycles: u64,
    ) -> anyhow::Result<StandardResult> {
        let cpu = self.library.simulate(&self.cpu)?;
        let mut machine = HackMachine::with_cpu(cpu, &obj.obj.binary)?;
        let n = ram.len().min(machine.ram().len());
        machine.ram_mut()[..n].copy_from_slice(&ram[..n]);
        Ok(machine.run_program(max_cycles))
    }
}

fn make_obj(src: &str) -> anyhow::Result<ObjectExt> {
    let obj = assemble(src, AssembleOption::default().set_verbose(false))?;

    Ok(obj)
}
