//! Translator from the stack-based VM language to Hack assembly.
//!
//! Commands are lowered one at a time into fixed instruction templates. A
//! [`FrameContext`] per translation unit keeps generated labels unique, and a
//! [`Translator`] checks what only the whole program can tell: duplicate or
//! undefined functions.

mod codegen;
mod context;
mod parse;
mod translator;

use std::{fmt::Display, path::Path};

use anyhow::{Context, Result};

pub use codegen::emit;
pub use context::FrameContext;
pub use parse::parse;
pub use translator::{TranslateOption, Translator};

/// Where a command comes from: translation unit and 1-based line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub unit: String,
    pub line: usize,
}

impl Origin {
    pub fn new(unit: impl Into<String>, line: usize) -> Self {
        Self {
            unit: unit.into(),
            line,
        }
    }
}

impl Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.vm:{}", self.unit, self.line)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranslationError {
    #[error("{at}: syntax error\n{message}")]
    Syntax { at: Origin, message: String },
    #[error("{at}: unknown command `{command}`")]
    UnknownCommand { at: Origin, command: String },
    #[error("{at}: unknown segment `{segment}`")]
    UnknownSegment { at: Origin, segment: String },
    #[error("{at}: `{token}` is not a valid number")]
    NotANumber { at: Origin, token: String },
    #[error("{at}: cannot pop into the constant segment")]
    PopConstant { at: Origin },
    #[error("{at}: constant {value} does not fit in 15 bits")]
    ConstantTooLarge { at: Origin, value: u16 },
    #[error("{at}: index {index} is out of range for segment `{segment}`")]
    IndexOutOfRange {
        at: Origin,
        segment: Segment,
        index: u16,
    },
    #[error("{at}: call passes {count} arguments, more than a frame can address")]
    TooManyArguments { at: Origin, count: u16 },
    #[error("{at}: `{name}` is not a valid label or function name")]
    InvalidName { at: Origin, name: String },
    #[error("{at}: label `{label}` is reserved for generated code")]
    ReservedLabel { at: Origin, label: String },
    #[error("{at}: `return` outside of a function")]
    ReturnOutsideFunction { at: Origin },
    #[error("{at}: function `{name}` is already declared at {first}")]
    DuplicateFunction {
        at: Origin,
        name: String,
        first: Origin,
    },
    #[error("{at}: label `{label}` is already declared in `{scope}`")]
    DuplicateLabel {
        at: Origin,
        scope: String,
        label: String,
    },
    #[error("{at}: label `{label}` is never declared in `{scope}`")]
    UndeclaredLabel {
        at: Origin,
        scope: String,
        label: String,
    },
    #[error("{at}: call to undefined function `{name}`")]
    UndefinedFunction { at: Origin, name: String },
    #[error("translation unit `{0}` is given twice")]
    DuplicateUnit(String),
    #[error("translation unit name `{0}` is not a valid symbol")]
    InvalidUnit(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Segment {
    Argument,
    Local,
    Static,
    Constant,
    This,
    That,
    Pointer,
    Temp,
}

impl Segment {
    pub const ALL: [Segment; 8] = [
        Segment::Argument,
        Segment::Local,
        Segment::Static,
        Segment::Constant,
        Segment::This,
        Segment::That,
        Segment::Pointer,
        Segment::Temp,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Segment::Argument => "argument",
            Segment::Local => "local",
            Segment::Static => "static",
            Segment::Constant => "constant",
            Segment::This => "this",
            Segment::That => "that",
            Segment::Pointer => "pointer",
            Segment::Temp => "temp",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }
}

impl Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ArithOp {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
}

impl ArithOp {
    pub const ALL: [ArithOp; 9] = [
        ArithOp::Add,
        ArithOp::Sub,
        ArithOp::Neg,
        ArithOp::Eq,
        ArithOp::Gt,
        ArithOp::Lt,
        ArithOp::And,
        ArithOp::Or,
        ArithOp::Not,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ArithOp::Add => "add",
            ArithOp::Sub => "sub",
            ArithOp::Neg => "neg",
            ArithOp::Eq => "eq",
            ArithOp::Gt => "gt",
            ArithOp::Lt => "lt",
            ArithOp::And => "and",
            ArithOp::Or => "or",
            ArithOp::Not => "not",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }
}

/// One VM command.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Command {
    Arithmetic(ArithOp),
    Push(Segment, u16),
    Pop(Segment, u16),
    Label(String),
    Goto(String),
    IfGoto(String),
    /// name and number of locals
    Function(String, u16),
    /// name and number of arguments
    Call(String, u16),
    Return,
}

impl Display for Command {
    /// VM source form
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Arithmetic(op) => write!(f, "{}", op.name()),
            Command::Push(seg, i) => write!(f, "push {seg} {i}"),
            Command::Pop(seg, i) => write!(f, "pop {seg} {i}"),
            Command::Label(l) => write!(f, "label {l}"),
            Command::Goto(l) => write!(f, "goto {l}"),
            Command::IfGoto(l) => write!(f, "if-goto {l}"),
            Command::Function(name, n) => write!(f, "function {name} {n}"),
            Command::Call(name, n) => write!(f, "call {name} {n}"),
            Command::Return => write!(f, "return"),
        }
    }
}

/// A command with its source line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub lineno: usize,
    pub cmd: Command,
}

impl Line {
    /// Number a command list from 1, for commands built in memory.
    pub fn number(cmds: impl IntoIterator<Item = Command>) -> Vec<Line> {
        cmds.into_iter()
            .enumerate()
            .map(|(i, cmd)| Line { lineno: i + 1, cmd })
            .collect()
    }
}

/// Translate every `(unit name, source)` pair into one assembly program.
pub fn translate<N, S>(
    units: impl IntoIterator<Item = (N, S)>,
    option: TranslateOption,
) -> Result<String, TranslationError>
where
    N: AsRef<str>,
    S: AsRef<str>,
{
    let mut translator = Translator::new(option);
    for (name, src) in units {
        translator.translate_source(name.as_ref(), src.as_ref())?;
    }
    translator.finish()
}

/// Load a `.vm` file, or every `.vm` file of a directory in name order. Units
/// are named by file stem.
pub fn load_units(path: &Path) -> Result<Vec<(String, String)>> {
    let files = if path.is_dir() {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(path)
            .with_context(|| format!("could not read directory `{}`", path.display()))?
        {
            let p = entry?.path();
            if p.extension().is_some_and(|e| e == "vm") {
                files.push(p);
            }
        }
        files.sort();
        anyhow::ensure!(!files.is_empty(), "no .vm file in `{}`", path.display());
        files
    } else {
        vec![path.to_path_buf()]
    };

    let mut units = Vec::with_capacity(files.len());
    for file in files {
        let name = file
            .file_stem()
            .and_then(|s| s.to_str())
            .with_context(|| format!("bad file name `{}`", file.display()))?
            .to_string();
        let src = std::fs::read_to_string(&file)
            .with_context(|| format!("could not read file `{}`", file.display()))?;
        units.push((name, src));
    }
    Ok(units)
}
