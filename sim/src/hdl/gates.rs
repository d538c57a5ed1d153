//! Built-in chips. Combinational gates are evaluated by their truth
//! functions; sequential primitives hold state across clock edges.

/// (pin name, width)
pub type PinSig = &'static [(&'static str, u8)];

/// Most pins a primitive has on one side (`Mux8Way16` inputs, `DMux8Way`
/// outputs).
pub const MAX_PINS: usize = 9;

macro_rules! define_primitives {
    {
        $( $name:ident = $text:literal : in $ins:expr, out $outs:expr; )*
    } => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Primitive {
            $( $name, )*
        }

        impl Primitive {
            pub const ALL: &'static [Primitive] = &[ $( Primitive::$name, )* ];

            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $( $text => Some(Self::$name), )*
                    _ => None,
                }
            }
            pub fn name(self) -> &'static str {
                match self {
                    $( Self::$name => $text, )*
                }
            }
            pub fn inputs(self) -> PinSig {
                match self {
                    $( Self::$name => $ins, )*
                }
            }
            pub fn outputs(self) -> PinSig {
                match self {
                    $( Self::$name => $outs, )*
                }
            }
        }
    };
}

const A_B: PinSig = &[("a", 1), ("b", 1)];
const OUT: PinSig = &[("out", 1)];
const OUT16: PinSig = &[("out", 16)];
const A_B16: PinSig = &[("a", 16), ("b", 16)];
const SUM_CARRY: PinSig = &[("sum", 1), ("carry", 1)];
const LOAD16: PinSig = &[("in", 16), ("load", 1)];

define_primitives! {
    Nand = "Nand": in A_B, out OUT;
    Not = "Not": in &[("in", 1)], out OUT;
    And = "And": in A_B, out OUT;
    Or = "Or": in A_B, out OUT;
    Xor = "Xor": in A_B, out OUT;
    Mux = "Mux": in &[("a", 1), ("b", 1), ("sel", 1)], out OUT;
    DMux = "DMux": in &[("in", 1), ("sel", 1)], out A_B;
    Not16 = "Not16": in &[("in", 16)], out OUT16;
    And16 = "And16": in A_B16, out OUT16;
    Or16 = "Or16": in A_B16, out OUT16;
    Mux16 = "Mux16": in &[("a", 16), ("b", 16), ("sel", 1)], out OUT16;
    Or8Way = "Or8Way": in &[("in", 8)], out OUT;
    Mux4Way16 = "Mux4Way16":
        in &[("a", 16), ("b", 16), ("c", 16), ("d", 16), ("sel", 2)], out OUT16;
    Mux8Way16 = "Mux8Way16":
        in &[
            ("a", 16), ("b", 16), ("c", 16), ("d", 16),
            ("e", 16), ("f", 16), ("g", 16), ("h", 16), ("sel", 3),
        ],
        out OUT16;
    DMux4Way = "DMux4Way":
        in &[("in", 1), ("sel", 2)], out &[("a", 1), ("b", 1), ("c", 1), ("d", 1)];
    DMux8Way = "DMux8Way":
        in &[("in", 1), ("sel", 3)],
        out &[
            ("a", 1), ("b", 1), ("c", 1), ("d", 1),
            ("e", 1), ("f", 1), ("g", 1), ("h", 1),
        ];
    HalfAdder = "HalfAdder": in A_B, out SUM_CARRY;
    FullAdder = "FullAdder": in &[("a", 1), ("b", 1), ("c", 1)], out SUM_CARRY;
    Add16 = "Add16": in A_B16, out OUT16;
    Inc16 = "Inc16": in &[("in", 16)], out OUT16;
    Dff = "DFF": in &[("in", 1)], out OUT;
    Bit = "Bit": in &[("in", 1), ("load", 1)], out OUT;
    Register = "Register": in LOAD16, out OUT16;
    ARegister = "ARegister": in LOAD16, out OUT16;
    DRegister = "DRegister": in LOAD16, out OUT16;
}

impl Primitive {
    /// Whether the chip keeps state between clock edges. Its outputs only
    /// depend on that state, never on the current inputs.
    pub fn is_sequential(self) -> bool {
        matches!(
            self,
            Self::Dff | Self::Bit | Self::Register | Self::ARegister | Self::DRegister
        )
    }

    /// Evaluate a combinational gate. `ins` and `outs` follow the order of
    /// [`Primitive::inputs`] and [`Primitive::outputs`]; every input value is
    /// already masked to its pin width.
    pub fn eval(self, ins: &[u16], outs: &mut [u16]) {
        use Primitive::*;
        let bit = |i: usize| ins[i] & 1;
        match self {
            Nand => outs[0] = !(ins[0] & ins[1]) & 1,
            Not => outs[0] = !ins[0] & 1,
            And => outs[0] = ins[0] & ins[1],
            Or => outs[0] = ins[0] | ins[1],
            Xor => outs[0] = ins[0] ^ ins[1],
            Mux | Mux16 => outs[0] = if bit(2) == 0 { ins[0] } else { ins[1] },
            DMux => {
                outs[0] = if bit(1) == 0 { ins[0] } else { 0 };
                outs[1] = if bit(1) == 1 { ins[0] } else { 0 };
            }
            Not16 => outs[0] = !ins[0],
            And16 => outs[0] = ins[0] & ins[1],
            Or16 => outs[0] = ins[0] | ins[1],
            Or8Way => outs[0] = (ins[0] & 0xff != 0) as u16,
            Mux4Way16 => outs[0] = ins[(ins[4] & 0b11) as usize],
            Mux8Way16 => outs[0] = ins[(ins[8] & 0b111) as usize],
            DMux4Way | DMux8Way => {
                let sel = ins[1] as usize;
                for (i, out) in outs.iter_mut().enumerate() {
                    *out = if i == sel { ins[0] } else { 0 };
                }
            }
            HalfAdder => {
                outs[0] = ins[0] ^ ins[1];
                outs[1] = ins[0] & ins[1];
            }
            FullAdder => {
                let s = ins[0] + ins[1] + ins[2];
                outs[0] = s & 1;
                outs[1] = s >> 1;
            }
            Add16 => outs[0] = ins[0].wrapping_add(ins[1]),
            Inc16 => outs[0] = ins[0].wrapping_add(1),
            Dff | Bit | Register | ARegister | DRegister => {
                unreachable!("sequential primitive {} has no truth function", self.name())
            }
        }
    }

    /// Next state of a sequential primitive given its inputs at the clock
    /// edge.
    pub fn next_state(self, cur: u16, ins: &[u16]) -> u16 {
        use Primitive::*;
        match self {
            Dff => ins[0] & 1,
            Bit | Register | ARegister | DRegister => {
                if ins[1] & 1 == 1 {
                    ins[0]
                } else {
                    cur
                }
            }
            _ => cur,
        }
    }
}
