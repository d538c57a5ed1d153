use pest::{error::LineColLocation, Parser};
use pest_derive::Parser;

use super::{AssemblyError, Line, Statement, Value};
use crate::isa::MAX_LITERAL;

#[derive(Parser)]
#[grammar = "asm/asm.pest"] // relative to src
struct HackAsmParser;

fn error_line(e: &pest::error::Error<Rule>) -> usize {
    match e.line_col {
        LineColLocation::Pos((line, _)) | LineColLocation::Span((line, _), _) => line,
    }
}

/// Parse assembly source into statements, skipping blank lines and comments.
pub fn parse(src: &str) -> Result<Vec<Line>, AssemblyError> {
    let main = HackAsmParser::parse(Rule::main, src)
        .map_err(|e| AssemblyError::Syntax {
            line: error_line(&e),
            message: e.to_string(),
        })?
        .next()
        .ok_or_else(|| AssemblyError::Syntax {
            line: 1,
            message: "empty input".into(),
        })?;

    let mut lines = Vec::new();
    for line in main.into_inner() {
        if line.as_rule() != Rule::line {
            continue;
        }
        let lineno = line.as_span().start_pos().line_col().0;
        let src = line.as_str().trim().to_string();
        let Some(inst) = line.into_inner().next() else {
            continue;
        };
        let stmt = match inst.as_rule() {
            Rule::label => {
                let name = inst.into_inner().as_str().to_string();
                Statement::Label(name)
            }
            Rule::a_inst => {
                let Some(operand) = inst.into_inner().next() else {
                    unreachable!()
                };
                let s = operand.as_str();
                match operand.as_rule() {
                    Rule::number => match s.parse::<u64>() {
                        Ok(n) if n <= MAX_LITERAL as u64 => Statement::A(Value::Num(n as u16)),
                        _ => {
                            return Err(AssemblyError::LiteralTooLarge {
                                line: lineno,
                                literal: s.to_string(),
                            })
                        }
                    },
                    _ => Statement::A(Value::Symbol(s.to_string())),
                }
            }
            Rule::c_inst => {
                let (mut dest, mut comp, mut jump) = (None, String::new(), None);
                for field in inst.into_inner() {
                    let text = field.as_str().to_string();
                    match field.as_rule() {
                        Rule::dest => dest = Some(text),
                        Rule::comp => comp = text,
                        Rule::jump => jump = Some(text),
                        _ => unreachable!(),
                    }
                }
                Statement::C { dest, comp, jump }
            }
            _ => unreachable!(),
        };
        lines.push(Line { lineno, stmt, src });
    }
    Ok(lines)
}
