//! In-memory form of a chip definition.

use std::fmt::Display;

/// A declared input or output pin of a chip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinDecl {
    pub name: String,
    pub width: u8,
}

/// A pin, optionally restricted to an inclusive bit range `[lo..hi]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinRef {
    pub name: String,
    pub range: Option<(u8, u8)>,
}

impl PinRef {
    pub fn bit(name: &str, index: u8) -> Self {
        Self {
            name: name.to_string(),
            range: Some((index, index)),
        }
    }
    pub fn slice(name: &str, lo: u8, hi: u8) -> Self {
        Self {
            name: name.to_string(),
            range: Some((lo, hi)),
        }
    }
}

impl From<&str> for PinRef {
    fn from(name: &str) -> Self {
        Self {
            name: name.to_string(),
            range: None,
        }
    }
}

impl Display for PinRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.range {
            None => write!(f, "{}", self.name),
            Some((lo, hi)) if lo == hi => write!(f, "{}[{}]", self.name, lo),
            Some((lo, hi)) => write!(f, "{}[{}..{}]", self.name, lo, hi),
        }
    }
}

/// Right hand side of a binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actual {
    Pin(PinRef),
    Const(bool),
}

impl From<&str> for Actual {
    fn from(name: &str) -> Self {
        Self::Pin(name.into())
    }
}

impl From<PinRef> for Actual {
    fn from(pin: PinRef) -> Self {
        Self::Pin(pin)
    }
}

impl From<bool> for Actual {
    fn from(value: bool) -> Self {
        Self::Const(value)
    }
}

impl Display for Actual {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Actual::Pin(p) => p.fmt(f),
            Actual::Const(b) => write!(f, "{}", b),
        }
    }
}

/// `formal=actual` inside a part declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub formal: PinRef,
    pub actual: Actual,
}

/// One use of a sub-chip inside a definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartDecl {
    pub chip: String,
    pub bindings: Vec<Binding>,
}

impl PartDecl {
    pub fn new(chip: &str) -> Self {
        Self {
            chip: chip.to_string(),
            bindings: Vec::new(),
        }
    }
    pub fn bind(mut self, formal: impl Into<PinRef>, actual: impl Into<Actual>) -> Self {
        self.bindings.push(Binding {
            formal: formal.into(),
            actual: actual.into(),
        });
        self
    }
}

/// A chip composed of parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChipDef {
    pub name: String,
    pub inputs: Vec<PinDecl>,
    pub outputs: Vec<PinDecl>,
    pub parts: Vec<PartDecl>,
}

impl ChipDef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            parts: Vec::new(),
        }
    }
    pub fn input(mut self, name: &str, width: u8) -> Self {
        self.inputs.push(PinDecl {
            name: name.to_string(),
            width,
        });
        self
    }
    pub fn output(mut self, name: &str, width: u8) -> Self {
        self.outputs.push(PinDecl {
            name: name.to_string(),
            width,
        });
        self
    }
    pub fn part(mut self, part: PartDecl) -> Self {
        self.parts.push(part);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_pin_ref() {
        assert_eq!(PinRef::from("a").to_string(), "a");
        assert_eq!(PinRef::bit("a", 3).to_string(), "a[3]");
        assert_eq!(PinRef::slice("a", 0, 7).to_string(), "a[0..7]");
        assert_eq!(Actual::from(true).to_string(), "true");
    }
}
