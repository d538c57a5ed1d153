use pest::{error::LineColLocation, Parser};
use pest_derive::Parser;

use super::{ArithOp, Command, Line, Origin, Segment, TranslationError};

#[derive(Parser)]
#[grammar = "vm/vm.pest"]
struct VmParser;

fn number(at: &Origin, token: &str) -> Result<u16, TranslationError> {
    token.parse().map_err(|_| TranslationError::NotANumber {
        at: at.clone(),
        token: token.to_string(),
    })
}

fn segment(at: &Origin, token: &str) -> Result<Segment, TranslationError> {
    Segment::from_name(token).ok_or_else(|| TranslationError::UnknownSegment {
        at: at.clone(),
        segment: token.to_string(),
    })
}

fn command(at: &Origin, words: &[&str]) -> Result<Command, TranslationError> {
    Ok(match *words {
        ["return"] => Command::Return,
        [op] => match ArithOp::from_name(op) {
            Some(op) => Command::Arithmetic(op),
            None => {
                return Err(TranslationError::UnknownCommand {
                    at: at.clone(),
                    command: op.to_string(),
                })
            }
        },
        ["push", seg, i] => Command::Push(segment(at, seg)?, number(at, i)?),
        ["pop", seg, i] => Command::Pop(segment(at, seg)?, number(at, i)?),
        ["label", l] => Command::Label(l.to_string()),
        ["goto", l] => Command::Goto(l.to_string()),
        ["if-goto", l] => Command::IfGoto(l.to_string()),
        ["function", name, n] => Command::Function(name.to_string(), number(at, n)?),
        ["call", name, n] => Command::Call(name.to_string(), number(at, n)?),
        _ => {
            return Err(TranslationError::UnknownCommand {
                at: at.clone(),
                command: words.join(" "),
            })
        }
    })
}

/// Parse the source of translation unit `unit`.
pub fn parse(unit: &str, src: &str) -> Result<Vec<Line>, TranslationError> {
    let main = VmParser::parse(Rule::main, src)
        .map_err(|e| {
            let line = match e.line_col {
                LineColLocation::Pos((l, _)) | LineColLocation::Span((l, _), _) => l,
            };
            TranslationError::Syntax {
                at: Origin::new(unit, line),
                message: e.to_string(),
            }
        })?
        .next()
        .ok_or_else(|| TranslationError::Syntax {
            at: Origin::new(unit, 1),
            message: "empty input".into(),
        })?;

    let mut lines = Vec::new();
    for line in main.into_inner().filter(|p| p.as_rule() == Rule::line) {
        let lineno = line.as_span().start_pos().line_col().0;
        let Some(cmd) = line.into_inner().next() else {
            continue;
        };
        let words: Vec<&str> = cmd.into_inner().map(|w| w.as_str()).collect();
        let cmd = command(&Origin::new(unit, lineno), &words)?;
        lines.push(Line { lineno, cmd });
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        let src = r#"
// SimpleFunction
function SimpleFunction.test 2
    push local 0
    push local 1   // second
    add
    not
    pop static 3
    label LOOP_START
    if-goto LOOP_START
    goto END$1
    call Math.multiply 2
    return
"#;
        let cmds: Vec<_> = parse("SimpleFunction", src)
            .unwrap()
            .into_iter()
            .map(|l| l.cmd)
            .collect();
        assert_eq!(
            cmds,
            vec![
                Command::Function("SimpleFunction.test".into(), 2),
                Command::Push(Segment::Local, 0),
                Command::Push(Segment::Local, 1),
                Command::Arithmetic(ArithOp::Add),
                Command::Arithmetic(ArithOp::Not),
                Command::Pop(Segment::Static, 3),
                Command::Label("LOOP_START".into()),
                Command::IfGoto("LOOP_START".into()),
                Command::Goto("END$1".into()),
                Command::Call("Math.multiply".into(), 2),
                Command::Return,
            ]
        );
    }

    #[test]
    fn test_display_round_trip() {
        let src = "push constant 7\npop that 2\nlabel L\nif-goto L\n\
                   function F 0\ncall F 1\nreturn\neq";
        let lines = parse("Main", src).unwrap();
        let text: Vec<String> = lines.iter().map(|l| l.cmd.to_string()).collect();
        assert_eq!(text.join("\n"), src);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            parse("Main", "push constant 1\npush heap 0").unwrap_err(),
            TranslationError::UnknownSegment {
                at: Origin::new("Main", 2),
                segment: "heap".into()
            }
        );
        assert_eq!(
            parse("Main", "\n\nmul").unwrap_err(),
            TranslationError::UnknownCommand {
                at: Origin::new("Main", 3),
                command: "mul".into()
            }
        );
        assert_eq!(
            parse("Main", "push local x").unwrap_err(),
            TranslationError::NotANumber {
                at: Origin::new("Main", 1),
                token: "x".into()
            }
        );
        assert!(matches!(
            parse("Main", "push constant 1 # 2"),
            Err(TranslationError::Syntax { .. })
        ));
    }
}
