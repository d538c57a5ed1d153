// Round trips through the command-line tools.

use std::{ffi::OsStr, process::Command};

use anyhow::Context;
use hack_sim::{isa, Object};

fn run(bin: &str, args: &[&OsStr]) -> anyhow::Result<String> {
    let out = Command::new(bin)
        .args(args)
        .output()
        .with_context(|| format!("could not run `{}`", bin))?;
    anyhow::ensure!(
        out.status.success(),
        "`{}` failed: {}",
        bin,
        String::from_utf8_lossy(&out.stderr)
    );
    Ok(String::from_utf8_lossy(&out.stdout).to_string())
}

#[test]
fn test_hasm_writes_hack() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("Add.asm");
    std::fs::write(&input, "// R0 = 2 + 3\n@2\nD=A\n@3\nD=D+A\n@0\nM=D\n")?;

    run(env!("CARGO_BIN_EXE_hasm"), &[input.as_os_str()])?;

    let text = std::fs::read_to_string(dir.path().join("Add.hack"))?;
    assert_eq!(
        text,
        "0000000000000010\n1110110000010000\n0000000000000011\n\
         1110000010010000\n0000000000000000\n1110001100001000\n"
    );
    Ok(())
}

#[test]
fn test_hvm_directory_then_hasm() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let prog = dir.path().join("Prog");
    std::fs::create_dir(&prog)?;
    std::fs::write(
        prog.join("Sys.vm"),
        "function Sys.init 0\npush constant 8\ncall Main.double 1\n\
         pop static 0\nlabel END\ngoto END\n",
    )?;
    std::fs::write(
        prog.join("Main.vm"),
        "function Main.double 0\npush argument 0\npush argument 0\nadd\nreturn\n",
    )?;

    run(env!("CARGO_BIN_EXE_hvm"), &[prog.as_os_str()])?;
    let asm = prog.join("Prog.asm");
    assert!(asm.exists());
    let hack = dir.path().join("prog.hack");
    run(
        env!("CARGO_BIN_EXE_hasm"),
        &[asm.as_os_str(), OsStr::new("-o"), hack.as_os_str()],
    )?;

    let obj = Object::from_hack(&std::fs::read_to_string(&hack)?)?;
    let res = isa::simulate(&obj.binary, &[], 10_000)?;
    assert_eq!(res.stat, isa::Stat::Hlt);
    // Sys.0 is the first variable
    assert_eq!(res.ram[16], 16);
    Ok(())
}

#[test]
fn test_hvm_reports_errors() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("Bad.vm");
    std::fs::write(&input, "push constant 1\npop constant 0\n")?;
    let out = Command::new(env!("CARGO_BIN_EXE_hvm"))
        .arg(&input)
        .output()?;
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Bad.vm:2"), "{stderr}");
    Ok(())
}

#[test]
fn test_hsim_chip_and_rom() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let chip = dir.path().join("Add3.hdl");
    std::fs::write(
        &chip,
        "CHIP Add3 {\n IN a[16], b[16], c[16];\n OUT out[16];\n PARTS:\n \
         Add16(a=a, b=b, out=ab);\n Add16(a=ab, b=c, out=out);\n}\n",
    )?;
    let stdout = run(
        env!("CARGO_BIN_EXE_hsim"),
        &[
            chip.as_os_str(),
            OsStr::new("--set"),
            OsStr::new("a=1"),
            OsStr::new("--set"),
            OsStr::new("b=0x10"),
            OsStr::new("--set"),
            OsStr::new("c=-2"),
        ],
    )?;
    assert!(stdout.contains("out"), "{stdout}");
    assert!(stdout.contains("= 15 "), "{stdout}");

    let rom = dir.path().join("Inc.hack");
    let jmp = isa::encode_c(isa::comp_code::ZERO, 0, isa::jump_code::JMP);
    let obj = Object {
        // @7 D=A @0 M=D @4 0;JMP
        binary: vec![
            7,
            0b1110110000010000,
            0,
            0b1110001100001000,
            4,
            jmp,
        ],
        symbols: Default::default(),
    };
    std::fs::write(&rom, obj.to_string())?;
    let stdout = run(env!("CARGO_BIN_EXE_hsim"), &[OsStr::new("--rom"), rom.as_os_str()])?;
    assert!(stdout.starts_with("Hlt"), "{stdout}");
    Ok(())
}
