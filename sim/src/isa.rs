//! Instruction Set definition for the Hack computer

use crate::framework::MEM_SIZE;

macro_rules! define_code {
    {
        @mod $modname:ident;
        @type $typ:ty;
        $( $cname:ident = $cval:expr; )*
    } => {
        pub mod $modname {
            #[allow(unused_imports)]
            use super::*;
            $(pub const $cname : $typ = $cval; )*
            #[allow(unused)]
            pub fn name_of(code: $typ) -> &'static str {
                match code {
                    $($cname => stringify!($cname), )*
                    _ => "no name"
                }
            }
        }
    };
}

// Control bits of the ALU, `C1` being the most significant of the six.
const C6: u16 = 0b1;
const C5: u16 = 0b10;
const C4: u16 = 0b100;
const C3: u16 = 0b1000;
const C2: u16 = 0b10000;
const C1: u16 = 0b100000;
/// Selects `M` instead of `A` as the second operand.
const A_BIT: u16 = 0b1000000;

define_code! {
    @mod comp_code;
    @type u16;
    ZERO = C5 | C3 | C1;
    ONE = C6 | C5 | C4 | C3 | C2 | C1;
    NEG_ONE = C5 | C3 | C2 | C1;
    D = C4 | C3;
    A = C2 | C1;
    NOT_D = C6 | C4 | C3;
    NOT_A = C6 | C2 | C1;
    NEG_D = C6 | C5 | C4 | C3;
    NEG_A = C6 | C5 | C2 | C1;
    D_PLUS_ONE = C6 | C5 | C4 | C3 | C2;
    A_PLUS_ONE = C6 | C5 | C4 | C2 | C1;
    D_MINUS_ONE = C5 | C4 | C3;
    A_MINUS_ONE = C5 | C2 | C1;
    D_PLUS_A = C5;
    D_MINUS_A = C6 | C5 | C2;
    A_MINUS_D = C6 | C5 | C4;
    D_AND_A = 0;
    D_OR_A = C6 | C4 | C2;
    M = A_BIT | C2 | C1;
    NOT_M = A_BIT | C6 | C2 | C1;
    NEG_M = A_BIT | C6 | C5 | C2 | C1;
    M_PLUS_ONE = A_BIT | C6 | C5 | C4 | C2 | C1;
    M_MINUS_ONE = A_BIT | C5 | C2 | C1;
    D_PLUS_M = A_BIT | C5;
    D_MINUS_M = A_BIT | C6 | C5 | C2;
    M_MINUS_D = A_BIT | C6 | C5 | C4;
    D_AND_M = A_BIT;
    D_OR_M = A_BIT | C6 | C4 | C2;
}

/// Mnemonic of every valid computation, with its 7-bit `a cccccc` code.
pub const COMP_TABLE: &[(&str, u16)] = {
    use comp_code::*;
    &[
        ("0", ZERO),
        ("1", ONE),
        ("-1", NEG_ONE),
        ("D", D),
        ("A", A),
        ("!D", NOT_D),
        ("!A", NOT_A),
        ("-D", NEG_D),
        ("-A", NEG_A),
        ("D+1", D_PLUS_ONE),
        ("A+1", A_PLUS_ONE),
        ("D-1", D_MINUS_ONE),
        ("A-1", A_MINUS_ONE),
        ("D+A", D_PLUS_A),
        ("D-A", D_MINUS_A),
        ("A-D", A_MINUS_D),
        ("D&A", D_AND_A),
        ("D|A", D_OR_A),
        ("M", M),
        ("!M", NOT_M),
        ("-M", NEG_M),
        ("M+1", M_PLUS_ONE),
        ("M-1", M_MINUS_ONE),
        ("D+M", D_PLUS_M),
        ("D-M", D_MINUS_M),
        ("M-D", M_MINUS_D),
        ("D&M", D_AND_M),
        ("D|M", D_OR_M),
    ]
};

pub fn comp_of(mnemonic: &str) -> Option<u16> {
    COMP_TABLE
        .iter()
        .find(|(m, _)| *m == mnemonic)
        .map(|(_, c)| *c)
}

define_code! {
    @mod dest_code;
    @type u16;
    NULL = 0b000;
    M = 0b001;
    D = 0b010;
    A = 0b100;
}

/// Parse a destination in any letter order (`MD`, `DM`, `AMD`, ...). Each
/// register may appear once.
pub fn dest_of(mnemonic: &str) -> Option<u16> {
    let mut code = dest_code::NULL;
    for c in mnemonic.chars() {
        let bit = match c {
            'M' => dest_code::M,
            'D' => dest_code::D,
            'A' => dest_code::A,
            _ => return None,
        };
        if code & bit != 0 {
            return None;
        }
        code |= bit;
    }
    Some(code)
}

define_code! {
    @mod jump_code;
    @type u16;
    NULL = 0b000;
    JGT = 0b001;
    JEQ = 0b010;
    JGE = 0b011;
    JLT = 0b100;
    JNE = 0b101;
    JLE = 0b110;
    JMP = 0b111;
}

pub fn jump_of(mnemonic: &str) -> Option<u16> {
    use jump_code::*;
    match mnemonic {
        "JGT" => Some(JGT),
        "JEQ" => Some(JEQ),
        "JGE" => Some(JGE),
        "JLT" => Some(JLT),
        "JNE" => Some(JNE),
        "JLE" => Some(JLE),
        "JMP" => Some(JMP),
        _ => None,
    }
}

/// Fixed prefix `111` of every compute instruction.
pub const C_PREFIX: u16 = 0b1110_0000_0000_0000;

/// Largest value an address instruction can carry.
pub const MAX_LITERAL: u16 = 0x7fff;

/// Predefined assembler symbols.
pub const PREDEFINED: &[(&str, u16)] = &[
    ("SP", 0),
    ("LCL", 1),
    ("ARG", 2),
    ("THIS", 3),
    ("THAT", 4),
    ("R0", 0),
    ("R1", 1),
    ("R2", 2),
    ("R3", 3),
    ("R4", 4),
    ("R5", 5),
    ("R6", 6),
    ("R7", 7),
    ("R8", 8),
    ("R9", 9),
    ("R10", 10),
    ("R11", 11),
    ("R12", 12),
    ("R13", 13),
    ("R14", 14),
    ("R15", 15),
    ("SCREEN", 0x4000),
    ("KBD", 0x6000),
];

/// First RAM address handed out to assembler variables.
pub const VARIABLE_BASE: u16 = 16;

pub fn encode_a(value: u16) -> u16 {
    value & MAX_LITERAL
}

pub fn encode_c(comp: u16, dest: u16, jump: u16) -> u16 {
    C_PREFIX | comp << 6 | dest << 3 | jump
}

/// Decoded form of one instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inst {
    A(u16),
    C { comp: u16, dest: u16, jump: u16 },
}

impl Inst {
    pub fn decode(word: u16) -> Self {
        if word & 0x8000 == 0 {
            Self::A(word)
        } else {
            Self::C {
                comp: (word >> 6) & 0x7f,
                dest: (word >> 3) & 0b111,
                jump: word & 0b111,
            }
        }
    }
}

impl std::fmt::Display for Inst {
    /// assembly form
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Inst::A(v) => write!(f, "@{v}"),
            Inst::C { comp, dest, jump } => {
                if dest != dest_code::NULL {
                    let letters = [(dest_code::A, 'A'), (dest_code::M, 'M'), (dest_code::D, 'D')];
                    for (bit, c) in letters {
                        if dest & bit != 0 {
                            write!(f, "{c}")?;
                        }
                    }
                    write!(f, "=")?;
                }
                match COMP_TABLE.iter().find(|(_, c)| *c == comp) {
                    Some((m, _)) => write!(f, "{m}")?,
                    None => write!(f, "?{comp:#09b}")?,
                }
                if jump != jump_code::NULL {
                    write!(f, ";{}", jump_code::name_of(jump))?;
                }
                Ok(())
            }
        }
    }
}

/// The Hack ALU driven by the six control bits `zx nx zy ny f no` (in that
/// order from the most significant bit). Returns (out, zr, ng).
pub fn alu(x: u16, y: u16, control: u16) -> (u16, bool, bool) {
    let bit = |c: u16| control & c != 0;
    let x = if bit(C1) { 0 } else { x };
    let x = if bit(C2) { !x } else { x };
    let y = if bit(C3) { 0 } else { y };
    let y = if bit(C4) { !y } else { y };
    let out = if bit(C5) { x.wrapping_add(y) } else { x & y };
    let out = if bit(C6) { !out } else { out };
    (out, out == 0, out & 0x8000 != 0)
}

/// Whether the jump condition holds for an ALU result.
pub fn jump_taken(jump: u16, zr: bool, ng: bool) -> bool {
    (jump & 0b100 != 0 && ng) || (jump & 0b010 != 0 && zr) || (jump & 0b001 != 0 && !zr && !ng)
}

/// Why the reference simulation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Stat {
    /// reached a `(L) @L 0;JMP` self loop
    Hlt,
    /// program counter ran past the end of the program
    End,
    /// cycle limit
    Lim,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StandardResult {
    pub a: u16,
    pub d: u16,
    pub pc: u16,
    pub ram: Vec<u16>,
    pub cycles: u64,
    pub stat: Stat,
}

/// Whether `pc` sits on a `@pc; 0;JMP` loop.
pub fn is_halt_loop(rom: &[u16], pc: usize) -> bool {
    rom.get(pc) == Some(&(pc as u16))
        && rom.get(pc + 1).copied()
            == Some(encode_c(comp_code::ZERO, dest_code::NULL, jump_code::JMP))
}

/// Execute a program directly, as a ground truth for the CPU circuit.
///
/// `ram` is the initial data memory (missing words are zero). Stops at a halt
/// loop, when the program counter leaves the program, or after `max_cycles`
/// instructions.
pub fn simulate(rom: &[u16], ram: &[u16], max_cycles: u64) -> anyhow::Result<StandardResult> {
    if rom.len() > MEM_SIZE {
        anyhow::bail!("program of {} words does not fit in ROM", rom.len());
    }
    let mut mem = vec![0u16; MEM_SIZE];
    let n = ram.len().min(MEM_SIZE);
    mem[..n].copy_from_slice(&ram[..n]);
    let (mut a, mut d, mut pc) = (0u16, 0u16, 0u16);
    let mut cycles = 0;

    let stat = loop {
        if is_halt_loop(rom, pc as usize) {
            break Stat::Hlt;
        }
        let Some(&word) = rom.get(pc as usize) else {
            break Stat::End;
        };
        if cycles >= max_cycles {
            break Stat::Lim;
        }
        cycles += 1;
        match Inst::decode(word) {
            Inst::A(v) => {
                a = v;
                pc += 1;
            }
            Inst::C { comp, dest, jump } => {
                let addr = (a as usize) % MEM_SIZE;
                let y = if comp & A_BIT != 0 { mem[addr] } else { a };
                let (out, zr, ng) = alu(d, y, comp & 0b111111);
                // M is written at the address held by A before this instruction
                if dest & dest_code::M != 0 {
                    mem[addr] = out;
                }
                let target = a;
                if dest & dest_code::A != 0 {
                    a = out;
                }
                if dest & dest_code::D != 0 {
                    d = out;
                }
                pc = if jump_taken(jump, zr, ng) {
                    target & MAX_LITERAL
                } else {
                    pc + 1
                };
            }
        }
    };
    tracing::debug!(cycles, ?stat, pc, "reference simulation finished");

    Ok(StandardResult {
        a,
        d,
        pc,
        ram: mem,
        cycles,
        stat,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comp_codes_match_alu() {
        // D = 7, and A = M = 3
        let (d, a) = (7u16, 3u16);
        let expect = |m: &str| -> u16 {
            match m.replace('M', "A").as_str() {
                "0" => 0,
                "1" => 1,
                "-1" => u16::MAX,
                "D" => d,
                "A" => a,
                "!D" => !d,
                "!A" => !a,
                "-D" => d.wrapping_neg(),
                "-A" => a.wrapping_neg(),
                "D+1" => d + 1,
                "A+1" => a + 1,
                "D-1" => d - 1,
                "A-1" => a - 1,
                "D+A" => d + a,
                "D-A" => d - a,
                "A-D" => a.wrapping_sub(d),
                "D&A" => d & a,
                "D|A" => d | a,
                other => unreachable!("{other}"),
            }
        };
        for (m, code) in COMP_TABLE {
            let (out, zr, ng) = alu(d, a, code & 0b111111);
            assert_eq!(out, expect(m), "comp {m}");
            assert_eq!(zr, out == 0);
            assert_eq!(ng, (out as i16) < 0);
        }
        assert_eq!(COMP_TABLE.len(), 28);
        assert_eq!(comp_code::name_of(comp_code::D_PLUS_A), "D_PLUS_A");
    }

    #[test]
    fn test_fields() {
        assert_eq!(dest_of("MD"), dest_of("DM"));
        assert_eq!(dest_of("AMD"), Some(0b111));
        assert_eq!(dest_of("MM"), None);
        assert_eq!(dest_of("X"), None);
        assert_eq!(jump_of("JLE"), Some(0b110));
        assert_eq!(jump_of("JXX"), None);
        assert_eq!(encode_c(comp_of("A").unwrap(), dest_of("D").unwrap(), 0), 0b1110110000010000);
    }

    #[test]
    fn test_decode_display() {
        assert_eq!(Inst::decode(2), Inst::A(2));
        assert_eq!(Inst::decode(0b1110110000010000).to_string(), "D=A");
        let w = encode_c(comp_of("M+1").unwrap(), dest_of("MD").unwrap(), 0);
        assert_eq!(Inst::decode(w).to_string(), "MD=M+1");
        let w = encode_c(comp_of("D").unwrap(), 0, jump_of("JGT").unwrap());
        assert_eq!(Inst::decode(w).to_string(), "D;JGT");
    }

    #[test]
    fn test_simulate_sum() {
        // RAM[2] = RAM[0] + RAM[1], then halt
        let rom = [
            0,                                       // @0
            encode_c(comp_code::M, dest_code::D, 0), // D=M
            1,                                       // @1
            encode_c(comp_code::D_PLUS_M, dest_code::D, 0),
            2,
            encode_c(comp_code::D, dest_code::M, 0),
            6,
            encode_c(comp_code::ZERO, 0, jump_code::JMP),
        ];
        let res = simulate(&rom, &[20, 22], 100).unwrap();
        assert_eq!(res.ram[2], 42);
        assert_eq!(res.stat, Stat::Hlt);
        assert_eq!(res.pc, 6);
        assert_eq!(res.cycles, 6);
    }

    #[test]
    fn test_simulate_limits() {
        let jmp = encode_c(comp_code::ZERO, 0, jump_code::JMP);
        assert_eq!(simulate(&[0, jmp], &[], 10).unwrap().stat, Stat::Hlt);
        let res = simulate(&[1, 2], &[], 10).unwrap();
        assert_eq!((res.stat, res.a, res.pc), (Stat::End, 2, 2));
        // a two-block loop is not a halt loop
        let res = simulate(&[2, jmp, 0, jmp], &[], 10).unwrap();
        assert_eq!((res.stat, res.cycles), (Stat::Lim, 10));
    }

    #[test]
    fn test_dest_am_writes_old_address() {
        // @5, AM=M+1 with RAM[5] = 9: RAM[5] = 10 and A = 10
        let rom = [5, encode_c(comp_code::M_PLUS_ONE, dest_code::A | dest_code::M, 0)];
        let mut ram = vec![0; 6];
        ram[5] = 9;
        let res = simulate(&rom, &ram, 10).unwrap();
        assert_eq!((res.ram[5], res.a), (10, 10));
    }
}
