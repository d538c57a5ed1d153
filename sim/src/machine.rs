//! The Hack computer: a CPU circuit wired to host-side instruction and data
//! memories.

use crate::framework::{ClockedSim, MEM_SIZE};
use crate::hdl::{ChipLibrary, ChipSim, DefinitionError, HdlError};
use crate::isa::{self, StandardResult};

const ROLE: &str = "the Hack machine";

const CPU_INPUTS: &[(&str, u8)] = &[("inM", 16), ("instruction", 16), ("reset", 1)];
const CPU_OUTPUTS: &[(&str, u8)] = &[("outM", 16), ("writeM", 1), ("addressM", 15), ("pc", 15)];

/// Registers and memory as seen by the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MachineState {
    pub a: u16,
    pub d: u16,
    pub pc: u16,
    pub cycles: u64,
}

pub struct HackMachine {
    cpu: ChipSim,
    rom: Vec<u16>,
    /// words of the loaded program; the rest of `rom` is padding
    len: usize,
    ram: Vec<u16>,
    reset: bool,
}

impl HackMachine {
    /// Build the `CPU` chip of `library` and load `program` into ROM.
    pub fn new(library: &ChipLibrary, program: &[u16]) -> Result<Self, HdlError> {
        Self::with_cpu(library.simulate("CPU")?, program)
    }

    /// Use `cpu` as processor. It must expose the pins of the Hack CPU.
    pub fn with_cpu(cpu: ChipSim, program: &[u16]) -> Result<Self, HdlError> {
        let graph = cpu.graph();
        let checks = CPU_INPUTS
            .iter()
            .map(|(name, width)| (graph.input(name), name, width))
            .chain(
                CPU_OUTPUTS
                    .iter()
                    .map(|(name, width)| (graph.output(name), name, width)),
            );
        for (port, name, width) in checks {
            if port.map(|p| p.width) != Some(*width) {
                return Err(DefinitionError::MissingPin {
                    chip: graph.name().to_string(),
                    pin: format!("{name}[{width}]"),
                    role: ROLE,
                }
                .into());
            }
        }
        let mut rom = program.to_vec();
        rom.truncate(MEM_SIZE);
        if rom.len() < program.len() {
            tracing::warn!("program truncated to {} words", MEM_SIZE);
        }
        let len = rom.len();
        rom.resize(MEM_SIZE, 0);
        Ok(Self {
            cpu,
            rom,
            len,
            ram: vec![0; MEM_SIZE],
            reset: false,
        })
    }

    pub fn ram(&self) -> &[u16] {
        &self.ram
    }

    pub fn ram_mut(&mut self) -> &mut [u16] {
        &mut self.ram
    }

    pub fn rom(&self) -> &[u16] {
        &self.rom
    }

    pub fn cpu(&self) -> &ChipSim {
        &self.cpu
    }

    /// Hold `reset` high during the next cycles.
    pub fn set_reset(&mut self, reset: bool) {
        self.reset = reset;
    }

    /// Program counter after the last clock edge.
    pub fn pc(&mut self) -> u16 {
        self.fetch().0
    }

    pub fn state(&mut self) -> MachineState {
        let pc = self.pc();
        MachineState {
            a: self.cpu.cell_state("ARegister").unwrap_or_default(),
            d: self.cpu.cell_state("DRegister").unwrap_or_default(),
            pc,
            cycles: self.cpu.cycle_count(),
        }
    }

    fn inputs(&self, in_m: u16, instruction: u16) -> [(&'static str, u16); 3] {
        [
            ("inM", in_m),
            ("instruction", instruction),
            ("reset", self.reset as u16),
        ]
    }

    /// (pc, addressM) of the current state. Both only depend on registers.
    fn fetch(&mut self) -> (u16, u16) {
        match self.cpu.evaluate(self.inputs(0, 0)) {
            Ok(out) => (out["pc"], out["addressM"]),
            // pins were checked at construction
            Err(e) => unreachable!("{e}"),
        }
    }

    /// Run until a halt loop, the end of the program or `max_cycles` cycles,
    /// and report in the shape of the reference simulator.
    pub fn run_program(&mut self, max_cycles: u64) -> StandardResult {
        let mut cycles = 0;
        let stat = loop {
            let pc = self.pc() as usize;
            if isa::is_halt_loop(&self.rom, pc) {
                break isa::Stat::Hlt;
            }
            if pc >= self.len {
                break isa::Stat::End;
            }
            if cycles >= max_cycles {
                break isa::Stat::Lim;
            }
            self.step();
            cycles += 1;
        };
        let state = self.state();
        tracing::debug!(cycles, ?stat, pc = state.pc, "machine stopped");
        StandardResult {
            a: state.a,
            d: state.d,
            pc: state.pc,
            ram: self.ram.clone(),
            cycles,
            stat,
        }
    }
}

impl ClockedSim for HackMachine {
    /// Fetch the instruction and memory operand, then settle the CPU on them.
    fn propagate_signals(&mut self) {
        let (pc, addr) = self.fetch();
        let instruction = self.rom[pc as usize];
        let in_m = self.ram[addr as usize];
        if let Err(e) = self.cpu.evaluate(self.inputs(in_m, instruction)) {
            unreachable!("{e}")
        }
        tracing::trace!(pc, instruction = %isa::Inst::decode(instruction), "cycle");
    }

    /// Write memory if requested, then clock the CPU.
    fn initiate_next_cycle(&mut self) {
        let out = self.cpu.outputs();
        if out["writeM"] != 0 {
            self.ram[out["addressM"] as usize] = out["outM"];
        }
        self.cpu.tick();
    }

    fn cycle_count(&self) -> u64 {
        self.cpu.cycle_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::{assemble, AssembleOption};

    #[test]
    fn test_rejects_wrong_chip() {
        let lib = ChipLibrary::standard().unwrap();
        let err = HackMachine::with_cpu(lib.simulate("ALU").unwrap(), &[]).err();
        assert!(matches!(
            err,
            Some(HdlError::Definition(DefinitionError::MissingPin { .. }))
        ));
    }

    #[test]
    fn test_counts_down() {
        let src = "@3\nD=A\n@i\nM=D\n(LOOP)\n@i\nMD=M-1\n@LOOP\nD;JGT\n(END)\n@END\n0;JMP";
        let obj = assemble(src, AssembleOption::default()).unwrap().obj;
        let lib = ChipLibrary::standard().unwrap();
        let mut machine = HackMachine::new(&lib, &obj.binary).unwrap();
        let res = machine.run_program(100);
        assert_eq!(res.stat, isa::Stat::Hlt);
        assert_eq!(res.ram[16], 0);
        assert_eq!(res.pc, 8);
        let reference = isa::simulate(&obj.binary, &[], 100).unwrap();
        assert_eq!(res.cycles, reference.cycles);
        assert_eq!((res.a, res.d), (reference.a, reference.d));
    }

    #[test]
    fn test_stops_after_last_instruction() {
        let lib = ChipLibrary::standard().unwrap();
        // @5 D=A @0 M=D
        let program = [5, 0b1110110000010000, 0, 0b1110001100001000];
        let mut machine = HackMachine::new(&lib, &program).unwrap();
        let res = machine.run_program(100);
        assert_eq!(res.stat, isa::Stat::End);
        assert_eq!((res.pc, res.cycles), (4, 4));
        assert_eq!(res.ram[0], 5);
    }

    #[test]
    fn test_reset() {
        let lib = ChipLibrary::standard().unwrap();
        let mut machine = HackMachine::new(&lib, &[1, 2, 3, 4]).unwrap();
        machine.run(3);
        assert_eq!(machine.pc(), 3);
        machine.set_reset(true);
        machine.step();
        machine.set_reset(false);
        assert_eq!(machine.pc(), 0);
        // the instruction under reset still executes
        assert_eq!(machine.state().a, 4);
    }
}
