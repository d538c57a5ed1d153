//! Text front-end for chip definitions (`.hdl` files).
use pest::{iterators::Pair, Parser};
use pest_derive::Parser;

use super::{
    ast::{Actual, Binding, ChipDef, PartDecl, PinDecl, PinRef},
    DefinitionError,
};

#[derive(Parser)]
#[grammar = "hdl/hdl.pest"] // relative to src
struct HdlParser;

/// Parse the source of one `CHIP` definition.
pub fn parse_chip(src: &str) -> Result<ChipDef, DefinitionError> {
    let mut pairs = HdlParser::parse(Rule::main, src)
        .map_err(|e| DefinitionError::Syntax(e.to_string()))?;
    let chip = pairs
        .next()
        .and_then(|main| main.into_inner().next())
        .ok_or_else(|| DefinitionError::Syntax("empty HDL source".into()))?;
    chip_def(chip)
}

fn chip_def(pair: Pair<'_, Rule>) -> Result<ChipDef, DefinitionError> {
    let mut def = ChipDef::new("");
    for item in pair.into_inner() {
        match item.as_rule() {
            Rule::ident => def.name = item.as_str().to_string(),
            Rule::inputs => def.inputs = pin_decls(item)?,
            Rule::outputs => def.outputs = pin_decls(item)?,
            Rule::parts => {
                def.parts = item.into_inner().map(part).collect::<Result<_, _>>()?;
            }
            _ => unreachable!(),
        }
    }
    tracing::trace!(chip = def.name, parts = def.parts.len(), "parsed chip");
    Ok(def)
}

fn number(pair: Pair<'_, Rule>) -> Result<u8, DefinitionError> {
    let s = pair.as_str();
    s.parse().map_err(|_| {
        let (line, col) = pair.as_span().start_pos().line_col();
        DefinitionError::Syntax(format!("{line}:{col}: number `{s}` is out of range"))
    })
}

fn pin_decls(pair: Pair<'_, Rule>) -> Result<Vec<PinDecl>, DefinitionError> {
    pair.into_inner()
        .map(|decl| {
            let mut it = decl.into_inner();
            let name = it.next().map(|p| p.as_str().to_string()).unwrap_or_default();
            let width = match it.next().and_then(|w| w.into_inner().next()) {
                Some(n) => number(n)?,
                None => 1,
            };
            Ok(PinDecl { name, width })
        })
        .collect()
}

fn pin_ref(pair: Pair<'_, Rule>) -> Result<PinRef, DefinitionError> {
    let mut it = pair.into_inner();
    let name = it.next().map(|p| p.as_str().to_string()).unwrap_or_default();
    let range = match it.next() {
        Some(range) => {
            let mut nums = range.into_inner();
            let lo = nums.next().map(number).transpose()?.unwrap_or(0);
            let hi = nums.next().map(number).transpose()?.unwrap_or(lo);
            Some((lo, hi))
        }
        None => None,
    };
    Ok(PinRef { name, range })
}

fn part(pair: Pair<'_, Rule>) -> Result<PartDecl, DefinitionError> {
    let mut it = pair.into_inner();
    let chip = it.next().map(|p| p.as_str()).unwrap_or_default();
    let mut part = PartDecl::new(chip);
    for binding in it {
        let mut sides = binding.into_inner();
        let (Some(formal), Some(actual)) = (sides.next(), sides.next()) else {
            unreachable!()
        };
        let actual = match actual.as_rule() {
            Rule::constant => Actual::Const(actual.as_str() == "true"),
            _ => Actual::Pin(pin_ref(actual)?),
        };
        part.bindings.push(Binding {
            formal: pin_ref(formal)?,
            actual,
        });
    }
    Ok(part)
}
