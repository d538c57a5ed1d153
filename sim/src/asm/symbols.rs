use std::collections::BTreeMap;

use super::AssemblyError;
use crate::isa::{PREDEFINED, VARIABLE_BASE};
use crate::object::SymbolMap;

/// Assembler symbol table. Predefined symbols are always visible but never
/// exported with the object.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    predefined: SymbolMap,
    /// user symbols with the line that introduced them
    user: BTreeMap<String, (u16, usize)>,
    labels: usize,
    next_var: u16,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            predefined: PREDEFINED.iter().map(|(s, v)| (s.to_string(), *v)).collect(),
            user: BTreeMap::new(),
            labels: 0,
            next_var: VARIABLE_BASE,
        }
    }

    pub fn declare_label(
        &mut self,
        label: &str,
        addr: u16,
        line: usize,
    ) -> Result<(), AssemblyError> {
        if self.predefined.contains_key(label) {
            return Err(AssemblyError::PredefinedLabel {
                line,
                label: label.to_string(),
            });
        }
        if let Some((_, first)) = self.user.get(label) {
            return Err(AssemblyError::DuplicateLabel {
                line,
                label: label.to_string(),
                first: *first,
            });
        }
        self.user.insert(label.to_string(), (addr, line));
        self.labels += 1;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<u16> {
        self.predefined
            .get(name)
            .copied()
            .or_else(|| self.user.get(name).map(|(v, _)| *v))
    }

    /// Look up `name`, allocating the next variable address on first use.
    pub fn resolve(&mut self, name: &str, line: usize) -> Result<u16, AssemblyError> {
        if let Some(v) = self.get(name) {
            return Ok(v);
        }
        // variables live below the memory-mapped screen
        if self.next_var >= 0x4000 {
            return Err(AssemblyError::TooManyVariables {
                line,
                name: name.to_string(),
            });
        }
        let addr = self.next_var;
        self.next_var += 1;
        self.user.insert(name.to_string(), (addr, line));
        tracing::trace!("variable {} = {}", name, addr);
        Ok(addr)
    }

    pub fn label_count(&self) -> usize {
        self.labels
    }

    pub fn variable_count(&self) -> usize {
        (self.next_var - VARIABLE_BASE) as usize
    }

    pub fn into_map(self) -> SymbolMap {
        self.user.into_iter().map(|(k, (v, _))| (k, v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variables_in_first_use_order() {
        let mut table = SymbolTable::new();
        table.declare_label("LOOP", 7, 1).unwrap();
        assert_eq!(table.resolve("x", 2).unwrap(), 16);
        assert_eq!(table.resolve("LOOP", 3).unwrap(), 7);
        assert_eq!(table.resolve("y", 4).unwrap(), 17);
        assert_eq!(table.resolve("x", 5).unwrap(), 16);
        assert_eq!(table.resolve("KBD", 6).unwrap(), 0x6000);
        assert_eq!(table.variable_count(), 2);
        let map = table.into_map();
        assert_eq!(map.len(), 3);
    }
}
