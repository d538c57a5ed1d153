//! This module provides the Hack assembler.
//!
//! Assembling is done in two passes: the first records the ROM address of
//! every label, the second encodes one word per instruction and hands out RAM
//! addresses to variables in first-use order.

mod parse;
mod symbols;

pub use parse::parse;
pub use symbols::SymbolTable;

use crate::framework::MEM_SIZE;
use crate::isa::{self, comp_of, dest_of, jump_of};
use crate::object::{Object, ObjectExt, SourceInfo};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssemblyError {
    #[error("line {line}: syntax error\n{message}")]
    Syntax { line: usize, message: String },
    #[error("line {line}: literal `{literal}` does not fit in 15 bits")]
    LiteralTooLarge { line: usize, literal: String },
    #[error("line {line}: unknown computation `{comp}`")]
    UnknownComp { line: usize, comp: String },
    #[error("line {line}: unknown destination `{dest}`")]
    UnknownDest { line: usize, dest: String },
    #[error("line {line}: unknown jump `{jump}`")]
    UnknownJump { line: usize, jump: String },
    #[error("line {line}: jump target `{label}` is never declared")]
    UndeclaredLabel { line: usize, label: String },
    #[error("line {line}: label `{label}` is already declared on line {first}")]
    DuplicateLabel {
        line: usize,
        label: String,
        first: usize,
    },
    #[error("line {line}: label `{label}` shadows a predefined symbol")]
    PredefinedLabel { line: usize, label: String },
    #[error("line {line}: no RAM left for variable `{name}`")]
    TooManyVariables { line: usize, name: String },
    #[error("program of {0} instructions does not fit in ROM")]
    ProgramTooLarge(usize),
}

/// Operand of an address instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Num(u16),
    Symbol(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Label(String),
    A(Value),
    C {
        dest: Option<String>,
        comp: String,
        jump: Option<String>,
    },
}

impl Statement {
    fn has_jump(&self) -> bool {
        matches!(self, Statement::C { jump: Some(_), .. })
    }
}

/// One non-empty source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub lineno: usize,
    pub stmt: Statement,
    pub src: String,
}

#[derive(Default, Debug, Clone)]
pub struct AssembleOption {
    verbose: bool,
}

impl AssembleOption {
    pub fn set_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// transform assembly code to binary object code
pub fn assemble(src: &str, option: AssembleOption) -> Result<ObjectExt, AssemblyError> {
    let lines = parse(src)?;
    assemble_lines(&lines, option)
}

/// Assemble already parsed lines.
pub fn assemble_lines(lines: &[Line], option: AssembleOption) -> Result<ObjectExt, AssemblyError> {
    macro_rules! verbo {
        ($($arg:tt)*) => {
            if option.verbose {
                tracing::trace!($($arg)*);
            }
        };
    }

    // first pass
    let mut symbols = SymbolTable::new();
    let mut addr = 0usize;
    for line in lines {
        match &line.stmt {
            Statement::Label(label) => {
                let addr = u16::try_from(addr).map_err(|_| AssemblyError::ProgramTooLarge(addr))?;
                symbols.declare_label(label, addr, line.lineno)?;
                verbo!("label {} = {:#06x}", label, addr);
            }
            _ => addr += 1,
        }
    }
    if addr > MEM_SIZE {
        return Err(AssemblyError::ProgramTooLarge(addr));
    }
    tracing::debug!("first pass: {} instructions, {} labels", addr, symbols.label_count());

    // second pass
    let mut binary = Vec::with_capacity(addr);
    let mut source = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        let mut info = SourceInfo {
            lineno: line.lineno,
            addr: binary.len() as u16,
            word: None,
            label: None,
            src: line.src.clone(),
        };
        match &line.stmt {
            Statement::Label(label) => info.label = Some(label.clone()),
            Statement::A(value) => {
                let value = match value {
                    Value::Num(n) => *n,
                    Value::Symbol(name) => {
                        let next = lines[i + 1..]
                            .iter()
                            .find(|l| !matches!(l.stmt, Statement::Label(_)));
                        if next.is_some_and(|l| l.stmt.has_jump()) {
                            symbols
                                .get(name)
                                .ok_or_else(|| AssemblyError::UndeclaredLabel {
                                    line: line.lineno,
                                    label: name.clone(),
                                })?
                        } else {
                            symbols.resolve(name, line.lineno)?
                        }
                    }
                };
                info.word = Some(isa::encode_a(value));
            }
            Statement::C { dest, comp, jump } => {
                info.word = Some(encode_c_fields(
                    line.lineno,
                    dest.as_deref(),
                    comp,
                    jump.as_deref(),
                )?);
            }
        }
        if let Some(word) = info.word {
            verbo!("{:#06x}: {:016b} | {}", info.addr, word, info.src);
            binary.push(word);
        }
        source.push(info);
    }
    tracing::debug!("second pass: {} variables", symbols.variable_count());

    Ok(ObjectExt {
        obj: Object {
            binary,
            symbols: symbols.into_map(),
        },
        source,
    })
}

fn encode_c_fields(
    line: usize,
    dest: Option<&str>,
    comp: &str,
    jump: Option<&str>,
) -> Result<u16, AssemblyError> {
    let comp_bits = comp_of(comp).ok_or_else(|| AssemblyError::UnknownComp {
        line,
        comp: comp.to_string(),
    })?;
    let dest_bits = match dest {
        Some(dest) => dest_of(dest).ok_or_else(|| AssemblyError::UnknownDest {
            line,
            dest: dest.to_string(),
        })?,
        None => isa::dest_code::NULL,
    };
    let jump_bits = match jump {
        Some(jump) => jump_of(jump).ok_or_else(|| AssemblyError::UnknownJump {
            line,
            jump: jump.to_string(),
        })?,
        None => isa::jump_code::NULL,
    };
    Ok(isa::encode_c(comp_bits, dest_bits, jump_bits))
}
