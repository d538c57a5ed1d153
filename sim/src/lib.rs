//! Toolchain of the Hack computer: an HDL chip simulator, a VM-to-assembly
//! translator and an assembler.

pub mod asm;
pub mod framework;
pub mod hdl;
pub mod isa;
pub mod machine;
pub mod object;
pub mod test;
mod utils;
pub mod vm;

pub use asm::{assemble, AssembleOption};
pub use hdl::{ChipLibrary, ChipSim};
pub use machine::HackMachine;
pub use object::{Object, ObjectExt};
pub use utils::{mem_diff, mem_print, rom_print};
pub use vm::{translate, TranslateOption};
