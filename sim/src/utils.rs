use ansi_term::Colour::{Green, Red};

use crate::isa::Inst;

/// Print every word that differs between two memories as `addr: left -> right`.
/// Returns the number of differing words.
pub fn mem_diff(left: &[u16], right: &[u16]) -> usize {
    let mut count = 0;
    let len = left.len().max(right.len());
    for i in 0..len {
        let l = left.get(i).copied().unwrap_or_default();
        let r = right.get(i).copied().unwrap_or_default();
        if l != r {
            eprintln!(
                "{:#06x}: {} -> {}",
                i,
                Red.paint(format!("{:#06x}", l)),
                Green.paint(format!("{:#06x}", r))
            );
            count += 1;
        }
    }
    count
}

/// Print memory up to the last non-zero word.
pub fn mem_print(mem: &[u16]) {
    let end = mem.iter().rposition(|w| *w != 0).map_or(0, |i| i + 1);
    for (i, word) in mem[..end].iter().enumerate() {
        eprintln!("{:#06x}: {:#06x} ({})", i, word, *word as i16)
    }
}

/// Print a ROM image as disassembly up to the last non-zero word.
pub fn rom_print(rom: &[u16]) {
    let end = rom.iter().rposition(|w| *w != 0).map_or(0, |i| i + 1);
    for (i, word) in rom[..end].iter().enumerate() {
        eprintln!("{:#06x}: {:016b} {}", i, word, Inst::decode(*word))
    }
}
