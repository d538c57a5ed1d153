/// A chip definition that cannot be turned into a circuit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DefinitionError {
    #[error("syntax error in HDL source\n{0}")]
    Syntax(String),
    #[error("unknown chip `{name}` used in `{parent}`")]
    UnknownChip { name: String, parent: String },
    #[error("chip `{0}` instantiates itself")]
    Recursive(String),
    #[error("pin `{pin}` is declared twice in `{chip}`")]
    DuplicatePin { chip: String, pin: String },
    #[error("pin `{pin}` of `{chip}` has invalid width {width}")]
    BadWidth { chip: String, pin: String, width: u16 },
    #[error("chip `{chip}` has no pin `{pin}`")]
    UnknownPin { chip: String, pin: String },
    #[error("bit range [{lo}..{hi}] is out of bounds for `{pin}` in `{chip}`")]
    BadRange {
        chip: String,
        pin: String,
        lo: u16,
        hi: u16,
    },
    #[error("input `{pin}` of part `{part}` in `{chip}` is not connected")]
    UnboundInput {
        chip: String,
        part: String,
        pin: String,
    },
    #[error("output `{pin}` of part `{part}` in `{chip}` is bound to a constant")]
    ConstantOutput {
        chip: String,
        part: String,
        pin: String,
    },
    #[error("input pin `{pin}` of `{chip}` cannot be driven by a part")]
    DrivesInput { chip: String, pin: String },
    #[error("`{pin}` in `{chip}` is read but not driven")]
    Undriven { chip: String, pin: String },
    #[error("`{pin}` in `{chip}` is driven more than once")]
    MultipleDrivers { chip: String, pin: String },
    #[error("combinational cycle in `{chip}` through {}", .pins.join(", "))]
    Cycle { chip: String, pins: Vec<String> },
    #[error("chip `{chip}` lacks pin `{pin}` required by {role}")]
    MissingPin {
        chip: String,
        pin: String,
        role: &'static str,
    },
}

/// A problem with the values flowing through a circuit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    #[error("`{formal}` ({expected} bits) bound to `{actual}` ({found} bits) in `{chip}`")]
    WidthMismatch {
        chip: String,
        formal: String,
        actual: String,
        expected: u8,
        found: u8,
    },
    #[error("chip `{chip}` has no input `{pin}`")]
    UnknownInput { chip: String, pin: String },
    #[error("input `{pin}` of `{chip}` is not assigned")]
    MissingInput { chip: String, pin: String },
    #[error("value {value} does not fit in {width}-bit pin `{pin}`")]
    Overflow { pin: String, value: u64, width: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HdlError {
    #[error(transparent)]
    Definition(#[from] DefinitionError),
    #[error(transparent)]
    Evaluation(#[from] EvalError),
}
