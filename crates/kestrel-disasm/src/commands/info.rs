//! Info command - describe the operand layout of one bytecode.

use anyhow::Result;
use clap::Args;
use kestrel_bytecode::{Bytecode, BytecodeError, OperandScale};
use std::io::{self, Write};

#[derive(Args)]
pub struct InfoCommand {
    /// Bytecode name, e.g. `CallProperty` (a `.Wide`/`.ExtraWide` suffix is ignored)
    pub mnemonic: String,
}

impl InfoCommand {
    pub fn run(&self) -> Result<()> {
        let bytecode = lookup(&self.mnemonic)?;
        tracing::debug!(bytecode = bytecode.name(), "describing bytecode");
        let mut out = io::stdout().lock();
        write_info(bytecode, &mut out)?;
        Ok(())
    }
}

/// Resolve a (possibly scaled) mnemonic to its bytecode
pub fn lookup(mnemonic: &str) -> Result<Bytecode, BytecodeError> {
    let name = match mnemonic.rsplit_once('.') {
        Some((name, "Wide" | "ExtraWide")) => name,
        _ => mnemonic,
    };
    Bytecode::from_name(name).ok_or_else(|| BytecodeError::UnknownMnemonic(mnemonic.to_string()))
}

pub fn write_info(bytecode: Bytecode, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "{} (0x{:02x})", bytecode.name(), bytecode.to_byte())?;

    let types = bytecode.operand_types();
    if types.is_empty() {
        writeln!(out, "operands: none")?;
    } else {
        let names: Vec<_> = types.iter().map(|t| t.name()).collect();
        writeln!(out, "operands: {}", names.join(", "))?;
    }

    let mut flags = Vec::new();
    if let Some(scale) = OperandScale::from_prefix(bytecode) {
        flags.push(format!("prefix ({}x operands)", scale.multiplier()));
    }
    if bytecode.is_jump() {
        flags.push("jump".to_string());
    }
    if bytecode.is_debug_break() {
        flags.push("debug break".to_string());
    }
    if !flags.is_empty() {
        writeln!(out, "flags: {}", flags.join(", "))?;
    }

    // a prefix cannot itself be prefixed
    let scales: &[OperandScale] = if bytecode.is_prefix_scaling() {
        &[OperandScale::Single]
    } else {
        &OperandScale::ALL
    };

    writeln!(out)?;
    writeln!(out, "{:<10} {:<24} {:>6}  offsets", "scale", "mnemonic", "length")?;
    for &scale in scales {
        let prefix_len = usize::from(scale != OperandScale::Single);
        let offsets: Vec<_> = (0..types.len())
            .map(|i| (prefix_len + bytecode.operand_offset(i, scale)).to_string())
            .collect();
        writeln!(
            out,
            "{:<10} {:<24} {:>6}  {}",
            format!("{scale:?}"),
            bytecode.mnemonic(scale).to_string(),
            prefix_len + bytecode.size(scale),
            offsets.join(", ")
        )?;
    }
    Ok(())
}
