//! HDL sources shipped with the simulator.

pub const ALU: &str = include_str!("../../chips/ALU.hdl");
pub const PC: &str = include_str!("../../chips/PC.hdl");
pub const RAM8: &str = include_str!("../../chips/RAM8.hdl");
pub const RAM64: &str = include_str!("../../chips/RAM64.hdl");
pub const RAM512: &str = include_str!("../../chips/RAM512.hdl");
pub const RAM4K: &str = include_str!("../../chips/RAM4K.hdl");
pub const RAM16K: &str = include_str!("../../chips/RAM16K.hdl");
pub const CPU: &str = include_str!("../../chips/CPU.hdl");

/// Composite chips of [`super::ChipLibrary::standard`].
pub const STANDARD: &[&str] = &[ALU, PC, RAM8, RAM64, RAM512, RAM4K, RAM16K, CPU];

/// Basic gates and the 1-bit register built from `Nand` and `DFF`. Loading
/// them into a library shadows the matching primitives.
pub const NAND_GATES: &[&str] = &[
    include_str!("../../chips/nand/Not.hdl"),
    include_str!("../../chips/nand/And.hdl"),
    include_str!("../../chips/nand/Or.hdl"),
    include_str!("../../chips/nand/Xor.hdl"),
    include_str!("../../chips/nand/Mux.hdl"),
    include_str!("../../chips/nand/DMux.hdl"),
    include_str!("../../chips/nand/Or8Way.hdl"),
    include_str!("../../chips/nand/HalfAdder.hdl"),
    include_str!("../../chips/nand/FullAdder.hdl"),
    include_str!("../../chips/nand/Bit.hdl"),
];
