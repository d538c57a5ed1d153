//! Assembly templates of the VM commands.
//!
//! `SP` points one past the top of stack. `R13` and `R14` are scratch
//! registers used by `pop` and `return`.

use super::{
    context::check_name, ArithOp, Command, FrameContext, Origin, Segment, TranslationError,
};
use crate::isa::MAX_LITERAL;

macro_rules! asm {
    ($out:ident; $($line:expr),* $(,)?) => {
        $( $out.push($line.to_string()); )*
    };
}

const TEMP_BASE: u16 = 5;
const TEMP_SIZE: u16 = 8;
const POINTER_BASE: u16 = 3;
/// Saved return address, `LCL`, `ARG`, `THIS` and `THAT`.
const FRAME_SIZE: u16 = 5;

fn push_d(out: &mut Vec<String>) {
    asm!(out; "@SP", "AM=M+1", "A=A-1", "M=D");
}

fn pop_d(out: &mut Vec<String>) {
    asm!(out; "@SP", "AM=M-1", "D=M");
}

/// Base register of a relocatable segment.
fn base_register(seg: Segment) -> Option<&'static str> {
    match seg {
        Segment::Local => Some("LCL"),
        Segment::Argument => Some("ARG"),
        Segment::This => Some("THIS"),
        Segment::That => Some("THAT"),
        _ => None,
    }
}

/// Offsets from a base register are loaded as literals.
fn check_offset(seg: Segment, index: u16, at: &Origin) -> Result<(), TranslationError> {
    if index > MAX_LITERAL {
        return Err(TranslationError::IndexOutOfRange {
            at: at.clone(),
            segment: seg,
            index,
        });
    }
    Ok(())
}

/// Symbol or address of a fixed segment slot.
fn fixed_address(
    ctx: &FrameContext,
    seg: Segment,
    index: u16,
    at: &Origin,
) -> Result<String, TranslationError> {
    let out_of_range = || TranslationError::IndexOutOfRange {
        at: at.clone(),
        segment: seg,
        index,
    };
    match seg {
        Segment::Temp if index < TEMP_SIZE => Ok((TEMP_BASE + index).to_string()),
        Segment::Pointer if index < 2 => Ok((POINTER_BASE + index).to_string()),
        Segment::Static => Ok(ctx.static_var(index)),
        _ => Err(out_of_range()),
    }
}

fn arithmetic(ctx: &mut FrameContext, op: ArithOp, out: &mut Vec<String>) {
    let binary = |out: &mut Vec<String>, comp: &str| {
        asm!(out; "@SP", "AM=M-1", "D=M", "A=A-1", format!("M={comp}"));
    };
    let unary = |out: &mut Vec<String>, comp: &str| {
        asm!(out; "@SP", "A=M-1", format!("M={comp}"));
    };
    match op {
        ArithOp::Add => binary(out, "D+M"),
        ArithOp::Sub => binary(out, "M-D"),
        ArithOp::And => binary(out, "D&M"),
        ArithOp::Or => binary(out, "D|M"),
        ArithOp::Neg => unary(out, "-M"),
        ArithOp::Not => unary(out, "!M"),
        ArithOp::Eq | ArithOp::Gt | ArithOp::Lt => {
            let jump = match op {
                ArithOp::Eq => "JEQ",
                ArithOp::Gt => "JGT",
                _ => "JLT",
            };
            let id = ctx.next_id();
            let label_true = format!("{}$cmp.{}.true", ctx.unit(), id);
            let label_end = format!("{}$cmp.{}.end", ctx.unit(), id);
            asm!(out;
                "@SP", "AM=M-1", "D=M", "A=A-1", "D=M-D",
                format!("@{label_true}"), format!("D;{jump}"),
                "@SP", "A=M-1", "M=0",
                format!("@{label_end}"), "0;JMP",
                format!("({label_true})"),
                "@SP", "A=M-1", "M=-1",
                format!("({label_end})"),
            );
        }
    }
}

fn push(
    ctx: &FrameContext,
    seg: Segment,
    index: u16,
    at: &Origin,
    out: &mut Vec<String>,
) -> Result<(), TranslationError> {
    if seg == Segment::Constant {
        if index > MAX_LITERAL {
            return Err(TranslationError::ConstantTooLarge {
                at: at.clone(),
                value: index,
            });
        }
        asm!(out; format!("@{index}"), "D=A");
    } else if let Some(base) = base_register(seg) {
        check_offset(seg, index, at)?;
        asm!(out; format!("@{base}"), "D=M", format!("@{index}"), "A=D+A", "D=M");
    } else {
        let addr = fixed_address(ctx, seg, index, at)?;
        asm!(out; format!("@{addr}"), "D=M");
    }
    push_d(out);
    Ok(())
}

fn pop(
    ctx: &FrameContext,
    seg: Segment,
    index: u16,
    at: &Origin,
    out: &mut Vec<String>,
) -> Result<(), TranslationError> {
    if seg == Segment::Constant {
        return Err(TranslationError::PopConstant { at: at.clone() });
    }
    if let Some(base) = base_register(seg) {
        check_offset(seg, index, at)?;
        asm!(out; format!("@{base}"), "D=M", format!("@{index}"), "D=D+A", "@R13", "M=D");
        pop_d(out);
        asm!(out; "@R13", "A=M", "M=D");
    } else {
        let addr = fixed_address(ctx, seg, index, at)?;
        pop_d(out);
        asm!(out; format!("@{addr}"), "M=D");
    }
    Ok(())
}

/// Push a return address and the caller's frame, reposition `ARG` and `LCL`
/// and jump to `function`.
fn call(
    ctx: &mut FrameContext,
    function: &str,
    nargs: u16,
    at: &Origin,
    out: &mut Vec<String>,
) -> Result<(), TranslationError> {
    check_name(function, at)?;
    if nargs > MAX_LITERAL - FRAME_SIZE {
        return Err(TranslationError::TooManyArguments {
            at: at.clone(),
            count: nargs,
        });
    }
    let id = ctx.next_id();
    let ret = format!("{}$ret.{}", ctx.scope(), id);
    asm!(out; format!("@{ret}"), "D=A");
    push_d(out);
    for reg in ["LCL", "ARG", "THIS", "THAT"] {
        asm!(out; format!("@{reg}"), "D=M");
        push_d(out);
    }
    // ARG = SP - 5 - nargs
    asm!(out;
        "@SP", "D=M", format!("@{}", FRAME_SIZE + nargs), "D=D-A", "@ARG", "M=D",
        "@SP", "D=M", "@LCL", "M=D",
        format!("@{function}"), "0;JMP",
        format!("({ret})"),
    );
    Ok(())
}

fn ret(out: &mut Vec<String>) {
    // R13 = endFrame, R14 = return address
    asm!(out;
        "@LCL", "D=M", "@R13", "M=D",
        format!("@{FRAME_SIZE}"), "A=D-A", "D=M", "@R14", "M=D",
    );
    pop_d(out);
    asm!(out; "@ARG", "A=M", "M=D", "@ARG", "D=M+1", "@SP", "M=D");
    for reg in ["THAT", "THIS", "ARG", "LCL"] {
        asm!(out; "@R13", "AM=M-1", "D=M", format!("@{reg}"), "M=D");
    }
    asm!(out; "@R14", "A=M", "0;JMP");
}

/// Generate the assembly of one command. Commands of a unit must be emitted in
/// program order with the same context.
pub fn emit(
    ctx: &mut FrameContext,
    cmd: &Command,
    at: &Origin,
) -> Result<Vec<String>, TranslationError> {
    let mut out = Vec::new();
    match cmd {
        Command::Arithmetic(op) => arithmetic(ctx, *op, &mut out),
        Command::Push(seg, i) => push(ctx, *seg, *i, at, &mut out)?,
        Command::Pop(seg, i) => pop(ctx, *seg, *i, at, &mut out)?,
        Command::Label(label) => {
            let label = ctx.declare_label(label, at)?;
            asm!(out; format!("({label})"));
        }
        Command::Goto(label) => {
            let label = ctx.reference_label(label, at)?;
            asm!(out; format!("@{label}"), "0;JMP");
        }
        Command::IfGoto(label) => {
            let label = ctx.reference_label(label, at)?;
            pop_d(&mut out);
            asm!(out; format!("@{label}"), "D;JNE");
        }
        Command::Function(name, nlocals) => {
            check_name(name, at)?;
            ctx.enter_function(name)?;
            asm!(out; format!("({name})"));
            for _ in 0..*nlocals {
                asm!(out; "@SP", "AM=M+1", "A=A-1", "M=0");
            }
        }
        Command::Call(name, nargs) => call(ctx, name, *nargs, at, &mut out)?,
        Command::Return => {
            if ctx.function().is_none() {
                return Err(TranslationError::ReturnOutsideFunction { at: at.clone() });
            }
            ret(&mut out);
        }
    }
    Ok(out)
}
