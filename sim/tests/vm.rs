// Translate VM programs, assemble them and run them on the reference
// simulator and on the CPU circuit.

use hack_sim::{
    assemble, isa,
    test::SimTester,
    translate,
    vm::{Command, FrameContext, Line, Origin, TranslationError, Translator},
    AssembleOption, TranslateOption,
};

const STACK_BASE: u16 = 256;

/// Translate a single unit without bootstrap and append a halt loop.
fn program(unit: &str, src: &str) -> anyhow::Result<String> {
    let mut text = translate([(unit, src)], TranslateOption::default())?;
    text.push_str("(__HALT)\n@__HALT\n0;JMP\n");
    Ok(text)
}

fn run_both(asm: &str, ram: &[u16], max_cycles: u64) -> anyhow::Result<isa::StandardResult> {
    let res = SimTester::standard()?.test_isa(asm, ram, max_cycles)?;
    anyhow::ensure!(res.stat == isa::Stat::Hlt, "program did not halt: {:?}", res.stat);
    Ok(res)
}

#[test]
fn test_eq() -> anyhow::Result<()> {
    let asm = program(
        "Main",
        "push constant 5\npush constant 5\neq\npush constant 5\npush constant 6\neq",
    )?;
    let res = run_both(&asm, &[STACK_BASE], 1000)?;
    assert_eq!(res.ram[0], STACK_BASE + 2);
    assert_eq!(res.ram[256], 0xffff);
    assert_eq!(res.ram[257], 0);
    Ok(())
}

#[test]
fn test_arithmetic_and_comparisons() -> anyhow::Result<()> {
    let src = r#"
        push constant 17
        push constant 10
        sub
        push constant 3
        neg
        lt
        push constant 3
        push constant 4
        gt
        push constant 12
        push constant 10
        and
        push constant 12
        push constant 10
        or
        not
        push constant 100
        push constant 23
        add
    "#;
    let res = run_both(&program("Main", src)?, &[STACK_BASE], 1000)?;
    // 7 < -3 is false
    assert_eq!(&res.ram[256..261], &[0, 0, 8, !14u16, 123]);
    assert_eq!(res.ram[0], 261);
    Ok(())
}

#[test]
fn test_segments() -> anyhow::Result<()> {
    let src = r#"
        push constant 10
        pop local 0
        push constant 21
        push constant 22
        pop argument 2
        pop argument 1
        push constant 3030
        pop pointer 0
        push constant 3040
        pop pointer 1
        push constant 32
        pop this 2
        push constant 46
        pop that 6
        push constant 510
        pop temp 6
        push constant 7
        pop static 1
        push local 0
        push that 6
        add
        push argument 1
        sub
        push this 2
        push this 2
        add
        sub
        push temp 6
        add
        push static 1
        add
    "#;
    // SP, LCL, ARG
    let mut ram = vec![0u16; 400];
    ram[0] = STACK_BASE;
    ram[1] = 300;
    ram[2] = 350;
    let res = run_both(&program("Main", src)?, &ram, 2000)?;
    assert_eq!(res.ram[300], 10);
    assert_eq!((res.ram[351], res.ram[352]), (21, 22));
    assert_eq!((res.ram[3], res.ram[4]), (3030, 3040));
    assert_eq!(res.ram[3032], 32);
    assert_eq!(res.ram[3046], 46);
    assert_eq!(res.ram[11], 510);
    // static 1 is the first variable
    assert_eq!(res.ram[16], 7);
    // 10 + 46 - 21 - 64 + 510 + 7
    assert_eq!(res.ram[256], 488);
    assert_eq!(res.ram[0], 257);
    Ok(())
}

const SYS_VM: &str = r#"
function Sys.init 0
    push constant 3
    call Count.down 1
    pop temp 0
    push constant 4
    call Count.twice 1
    pop temp 1
label HALT
    goto HALT
"#;

const COUNT_VM: &str = r#"
// n + (n - 1) + ... + 1
function Count.down 1
    push constant 0
    pop local 0
label LOOP
    push argument 0
    push local 0
    add
    pop local 0
    push argument 0
    push constant 1
    sub
    pop argument 0
    push argument 0
    if-goto LOOP
    push local 0
    return

// Count.down(n) twice, from its own loop
function Count.twice 2
    push constant 2
    pop local 1
label LOOP
    push local 0
    push argument 0
    call Count.down 1
    add
    pop local 0
    push local 1
    push constant 1
    sub
    pop local 1
    push local 1
    if-goto LOOP
    push local 0
    return
"#;

#[test]
fn test_functions_with_same_label() -> anyhow::Result<()> {
    let asm = translate(
        [("Sys", SYS_VM), ("Count", COUNT_VM)],
        TranslateOption::default().set_bootstrap(true),
    )?;
    assert!(asm.contains("(Count.down$LOOP)"));
    assert!(asm.contains("(Count.twice$LOOP)"));
    assert!(asm.contains("(Sys.init$ret.0)"));
    assert!(asm.contains("(Count.twice$ret.0)"));

    let obj = assemble(&asm, AssembleOption::default())?;
    let fast = isa::simulate(&obj.obj.binary, &[], 100_000)?;
    assert_eq!(fast.stat, isa::Stat::Hlt);
    assert_eq!((fast.ram[5], fast.ram[6]), (6, 20));

    let res = run_both(&asm, &[], 100_000)?;
    assert_eq!((res.ram[5], res.ram[6]), (6, 20));
    Ok(())
}

#[test]
fn test_frame_context_threading() -> anyhow::Result<()> {
    // the same context across emits yields distinct comparison labels
    let mut ctx = FrameContext::new("Main");
    let at = Origin::new("Main", 1);
    let eq = Command::Arithmetic(hack_sim::vm::ArithOp::Eq);
    let first = hack_sim::vm::emit(&mut ctx, &eq, &at)?;
    let second = hack_sim::vm::emit(&mut ctx, &eq, &at)?;
    assert_ne!(first, second);

    let mut translator = Translator::new(TranslateOption::default());
    translator.translate_unit(
        "Main",
        &Line::number([
            Command::Function("Main.f".into(), 0),
            Command::Return,
            Command::Function("Main.g".into(), 0),
            Command::Call("Main.h".into(), 0),
            Command::Return,
        ]),
    )?;
    assert_eq!(
        translator.finish(),
        Err(TranslationError::UndefinedFunction {
            at: Origin::new("Main", 4),
            name: "Main.h".into()
        })
    );
    Ok(())
}

#[test]
fn test_rejects_what_the_assembler_cannot_read() -> anyhow::Result<()> {
    let at = |line| Origin::new("Main", line);
    let translate_main = |src: &str| translate([("Main", src)], TranslateOption::default());

    assert_eq!(
        translate_main("function Main.f 0\nlabel my-loop\ngoto my-loop\nreturn"),
        Err(TranslationError::InvalidName {
            at: at(2),
            name: "my-loop".into()
        })
    );
    // would collide with the return label of the call
    assert_eq!(
        translate_main("function Main.f 0\ncall Main.f 0\nlabel ret.0\nreturn"),
        Err(TranslationError::ReservedLabel {
            at: at(3),
            label: "ret.0".into()
        })
    );
    assert_eq!(
        translate_main("function Main.f 0\npush local 40000\nreturn"),
        Err(TranslationError::IndexOutOfRange {
            at: at(2),
            segment: hack_sim::vm::Segment::Local,
            index: 40000
        })
    );

    // whatever translates also assembles
    let asm = translate_main(
        "function Main.f 0\ncall Main.f 0\nlabel ret\nlabel my_loop:1\n\
         push local 32767\npop that 32767\ngoto my_loop:1\nreturn",
    )?;
    assemble(&asm, AssembleOption::default())?;
    Ok(())
}
