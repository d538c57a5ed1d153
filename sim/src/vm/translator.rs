use std::collections::{BTreeMap, BTreeSet};

use super::{
    codegen::emit, context::is_valid_name, parse, Command, FrameContext, Line, Origin,
    TranslationError,
};

/// Name of the context the bootstrap code is generated in.
const BOOTSTRAP_UNIT: &str = "__bootstrap";
const ENTRY: &str = "Sys.init";
const STACK_BASE: u16 = 256;

#[derive(Default, Debug, Clone)]
pub struct TranslateOption {
    bootstrap: bool,
    comments: bool,
    verbose: bool,
}

impl TranslateOption {
    /// Start with `SP = 256; call Sys.init 0`.
    pub fn set_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    /// Precede the code of each command with the command as a comment.
    pub fn set_comments(mut self, comments: bool) -> Self {
        self.comments = comments;
        self
    }

    pub fn set_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Translates a program unit by unit into one assembly text.
#[derive(Debug)]
pub struct Translator {
    option: TranslateOption,
    out: Vec<String>,
    units: BTreeSet<String>,
    functions: BTreeMap<String, Origin>,
    calls: Vec<(String, Origin)>,
}

impl Translator {
    pub fn new(option: TranslateOption) -> Self {
        let mut this = Self {
            option,
            out: Vec::new(),
            units: BTreeSet::new(),
            functions: BTreeMap::new(),
            calls: Vec::new(),
        };
        if this.option.bootstrap {
            this.bootstrap();
        }
        this
    }

    fn bootstrap(&mut self) {
        if self.option.comments {
            self.out.push("// bootstrap".into());
        }
        for line in [format!("@{STACK_BASE}"), "D=A".into(), "@SP".into(), "M=D".into()] {
            self.out.push(line);
        }
        let mut ctx = FrameContext::new(BOOTSTRAP_UNIT);
        let at = Origin::new(BOOTSTRAP_UNIT, 0);
        let call = Command::Call(ENTRY.into(), 0);
        // a call never fails to generate
        if let Ok(code) = emit(&mut ctx, &call, &at) {
            self.out.extend(code);
        }
        self.calls.push((ENTRY.into(), at));
    }

    /// Translate the commands of unit `unit`, in program order.
    pub fn translate_unit(&mut self, unit: &str, lines: &[Line]) -> Result<(), TranslationError> {
        if !is_valid_name(unit) {
            return Err(TranslationError::InvalidUnit(unit.to_string()));
        }
        if !self.units.insert(unit.to_string()) {
            return Err(TranslationError::DuplicateUnit(unit.to_string()));
        }
        let mut ctx = FrameContext::new(unit);
        for line in lines {
            let at = Origin::new(unit, line.lineno);
            match &line.cmd {
                Command::Function(name, _) => {
                    if let Some(first) = self.functions.get(name) {
                        return Err(TranslationError::DuplicateFunction {
                            at,
                            name: name.clone(),
                            first: first.clone(),
                        });
                    }
                    self.functions.insert(name.clone(), at.clone());
                }
                Command::Call(name, _) => self.calls.push((name.clone(), at.clone())),
                _ => {}
            }
            let code = emit(&mut ctx, &line.cmd, &at)?;
            if self.option.verbose {
                tracing::trace!("{}: {} => {} lines", at, line.cmd, code.len());
            }
            if self.option.comments {
                self.out.push(format!("// {}", line.cmd));
            }
            self.out.extend(code);
        }
        ctx.close_scope()?;
        tracing::debug!("translated unit {} ({} commands)", unit, lines.len());
        Ok(())
    }

    /// Parse and translate the source text of unit `unit`.
    pub fn translate_source(&mut self, unit: &str, src: &str) -> Result<(), TranslationError> {
        let lines = parse(unit, src)?;
        self.translate_unit(unit, &lines)
    }

    /// Check program-wide references and return the assembly text.
    pub fn finish(self) -> Result<String, TranslationError> {
        for (name, at) in &self.calls {
            if !self.functions.contains_key(name) {
                return Err(TranslationError::UndefinedFunction {
                    at: at.clone(),
                    name: name.clone(),
                });
            }
        }
        tracing::info!(
            "translated {} units, {} functions, {} lines of assembly",
            self.units.len(),
            self.functions.len(),
            self.out.len()
        );
        let mut text = self.out.join("\n");
        text.push('\n');
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::translate;

    #[test]
    fn test_bootstrap() {
        let asm = translate(
            [("Sys", "function Sys.init 0\nlabel L\ngoto L")],
            TranslateOption::default().set_bootstrap(true),
        )
        .unwrap();
        let lines: Vec<_> = asm.lines().collect();
        assert_eq!(&lines[..4], &["@256", "D=A", "@SP", "M=D"]);
        assert_eq!(lines[4], "@__bootstrap$ret.0");
        assert!(lines.contains(&"(Sys.init)"));
        assert!(lines.contains(&"(Sys.init$L)"));
    }

    #[test]
    fn test_missing_entry() {
        let err = translate(
            [("Main", "push constant 1")],
            TranslateOption::default().set_bootstrap(true),
        )
        .unwrap_err();
        assert_eq!(
            err,
            TranslationError::UndefinedFunction {
                at: Origin::new(BOOTSTRAP_UNIT, 0),
                name: "Sys.init".into()
            }
        );
    }

    #[test]
    fn test_program_wide_checks() {
        let err = translate(
            [("A", "function F 0\nreturn"), ("B", "function F 0\nreturn")],
            TranslateOption::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            TranslationError::DuplicateFunction {
                at: Origin::new("B", 1),
                name: "F".into(),
                first: Origin::new("A", 1)
            }
        );

        let err = translate(
            [("A", "function F 0\ncall G 0\nreturn")],
            TranslateOption::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            TranslationError::UndefinedFunction {
                at: Origin::new("A", 2),
                name: "G".into()
            }
        );

        let err = translate([("A", ""), ("A", "")], TranslateOption::default()).unwrap_err();
        assert_eq!(err, TranslationError::DuplicateUnit("A".into()));

        let err = translate([("my-prog", "")], TranslateOption::default()).unwrap_err();
        assert_eq!(err, TranslationError::InvalidUnit("my-prog".into()));
    }

    #[test]
    fn test_undeclared_goto_at_end_of_unit() {
        let err = translate(
            [("A", "function F 0\ngoto NOWHERE")],
            TranslateOption::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            TranslationError::UndeclaredLabel {
                at: Origin::new("A", 2),
                scope: "F".into(),
                label: "NOWHERE".into()
            }
        );
    }

    #[test]
    fn test_comments() {
        let asm = translate(
            [("Main", "push constant 7\nadd")],
            TranslateOption::default().set_comments(true),
        )
        .unwrap();
        assert!(asm.starts_with("// push constant 7\n@7\n"));
        assert!(asm.contains("// add\n"));
    }
}
