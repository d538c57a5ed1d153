//! Assembled Hack programs: the binary image, its symbols and the source
//! listing.

use std::{collections::BTreeMap, fmt::Display};

use crate::asm::AssemblyError;
use crate::framework::MEM_SIZE;

pub type SymbolMap = BTreeMap<String, u16>;

/// Assembly source line annotated with what it assembled to.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SourceInfo {
    pub lineno: usize,
    /// ROM address of the instruction, or of the next instruction for a label
    pub addr: u16,
    pub word: Option<u16>,
    pub label: Option<String>,
    pub src: String,
}

/// Object file: one word per instruction, starting at ROM address 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Object {
    pub binary: Vec<u16>,
    /// labels and variables
    pub symbols: SymbolMap,
}

impl Object {
    /// Read the `.hack` text format. Blank lines are ignored.
    pub fn from_hack(text: &str) -> Result<Self, AssemblyError> {
        let mut binary = Vec::new();
        for (i, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line.len() != 16 || !line.bytes().all(|b| b == b'0' || b == b'1') {
                return Err(AssemblyError::Syntax {
                    line: i + 1,
                    message: format!("`{line}` is not a 16-bit binary word"),
                });
            }
            // checked above
            binary.push(u16::from_str_radix(line, 2).unwrap_or_default());
        }
        if binary.len() > MEM_SIZE {
            return Err(AssemblyError::ProgramTooLarge(binary.len()));
        }
        Ok(Self {
            binary,
            symbols: SymbolMap::new(),
        })
    }

    /// ROM image padded with zeros to the full address space.
    pub fn rom(&self) -> Vec<u16> {
        let mut rom = self.binary.clone();
        rom.resize(MEM_SIZE, 0);
        rom
    }
}

impl Display for Object {
    /// display hack format
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for word in &self.binary {
            writeln!(f, "{:016b}", word)?
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ObjectExt {
    pub obj: Object,
    /// annotate each line with its address
    pub source: Vec<SourceInfo>,
}

impl Display for ObjectExt {
    /// display annotated listing
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for src in &self.source {
            match src.word {
                Some(word) => write!(f, "{:#06x}: {:016b} ", src.addr, word)?,
                None => write!(f, "{: <25}", "")?,
            }
            writeln!(f, "| {}", src.src)?
        }
        Ok(())
    }
}
