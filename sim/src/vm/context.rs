use std::collections::BTreeSet;

use super::{Origin, TranslationError};

/// Whether `name` can be used in a generated symbol. This is the assembler's
/// symbol alphabet without `$`, which separates a scope from its labels.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    let symbol_char = |c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':');
    match chars.next() {
        Some(c) if symbol_char(c) && !c.is_ascii_digit() => chars.all(symbol_char),
        _ => false,
    }
}

/// Whether `label` has the shape of a label the code generator synthesizes in
/// a scope: `ret.N`, `cmp.N.true` or `cmp.N.end`.
fn is_reserved_label(label: &str) -> bool {
    let numeric = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if let Some(n) = label.strip_prefix("ret.") {
        return numeric(n);
    }
    match label.strip_prefix("cmp.").and_then(|rest| rest.split_once('.')) {
        Some((n, kind)) => numeric(n) && matches!(kind, "true" | "end"),
        None => false,
    }
}

/// Reject names the assembler cannot read back.
pub fn check_name(name: &str, at: &Origin) -> Result<(), TranslationError> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(TranslationError::InvalidName {
            at: at.clone(),
            name: name.to_string(),
        })
    }
}

fn check_label(label: &str, at: &Origin) -> Result<(), TranslationError> {
    check_name(label, at)?;
    if is_reserved_label(label) {
        return Err(TranslationError::ReservedLabel {
            at: at.clone(),
            label: label.to_string(),
        });
    }
    Ok(())
}

/// Per-unit translation state: the enclosing function and a counter for
/// synthesized labels.
#[derive(Debug, Clone)]
pub struct FrameContext {
    unit: String,
    function: Option<String>,
    counter: usize,
    /// labels declared in the current scope
    labels: BTreeSet<String>,
    /// jump targets of the current scope, checked when the scope closes
    gotos: Vec<(String, Origin)>,
}

impl FrameContext {
    pub fn new(unit: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            function: None,
            counter: 0,
            labels: BTreeSet::new(),
            gotos: Vec::new(),
        }
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn function(&self) -> Option<&str> {
        self.function.as_deref()
    }

    /// The function name, or the unit name outside of any function.
    pub fn scope(&self) -> &str {
        self.function.as_deref().unwrap_or(&self.unit)
    }

    /// Next value of the per-unit counter.
    pub fn next_id(&mut self) -> usize {
        let id = self.counter;
        self.counter += 1;
        id
    }

    /// Scoped name of a user label.
    pub fn mangle(&self, label: &str) -> String {
        format!("{}${}", self.scope(), label)
    }

    /// Assembler variable of `static i`.
    pub fn static_var(&self, index: u16) -> String {
        format!("{}.{}", self.unit, index)
    }

    pub fn declare_label(&mut self, label: &str, at: &Origin) -> Result<String, TranslationError> {
        check_label(label, at)?;
        if !self.labels.insert(label.to_string()) {
            return Err(TranslationError::DuplicateLabel {
                at: at.clone(),
                scope: self.scope().to_string(),
                label: label.to_string(),
            });
        }
        Ok(self.mangle(label))
    }

    pub fn reference_label(
        &mut self,
        label: &str,
        at: &Origin,
    ) -> Result<String, TranslationError> {
        check_label(label, at)?;
        self.gotos.push((label.to_string(), at.clone()));
        Ok(self.mangle(label))
    }

    /// Close the current scope and open the one of `function`.
    pub fn enter_function(&mut self, function: &str) -> Result<(), TranslationError> {
        self.close_scope()?;
        self.function = Some(function.to_string());
        Ok(())
    }

    /// Check that every jump target of the current scope was declared.
    pub fn close_scope(&mut self) -> Result<(), TranslationError> {
        for (label, at) in self.gotos.drain(..) {
            if !self.labels.contains(&label) {
                return Err(TranslationError::UndeclaredLabel {
                    at,
                    scope: self.function.clone().unwrap_or_else(|| self.unit.clone()),
                    label,
                });
            }
        }
        self.labels.clear();
        Ok(())
    }
}
