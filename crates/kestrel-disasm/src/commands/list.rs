//! List command - disassemble a bytecode buffer.

use anyhow::{Context, Result};
use clap::Args;
use kestrel_bytecode::hex::parse_hex;
use kestrel_bytecode::{Bytecode, OperandScale};
use kestrel_decoder::{BytecodeIterator, InstructionRef, Operand};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use crate::config::{Config, MAX_PARAMETER_COUNT, OutputFormat};

#[derive(Args)]
pub struct ListCommand {
    /// Raw bytecode file (reads stdin when neither FILE nor --hex is given)
    pub file: Option<PathBuf>,

    /// Bytecode as hex text, e.g. "0b 05 02 03"
    #[arg(long, conflicts_with = "file")]
    pub hex: Option<String>,

    /// Parameter count of the function, receiver included
    #[arg(long, value_parser = clap::value_parser!(i32).range(0..=MAX_PARAMETER_COUNT as i64))]
    pub parameter_count: Option<i32>,

    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Print opcode frequencies after the listing
    #[arg(long)]
    pub stats: bool,
}

/// Effective listing settings (flags over config)
#[derive(Debug, Clone, Copy)]
pub struct ListingOptions {
    pub parameter_count: i32,
    pub format: OutputFormat,
    pub stats: bool,
}

impl ListCommand {
    pub fn run(&self, config: &Config) -> Result<()> {
        let bytes = self.read_input()?;
        let options = self.options(config);
        tracing::debug!(len = bytes.len(), ?options, "listing bytecode");

        let mut out = io::BufWriter::new(io::stdout().lock());
        let result = write_listing(&bytes, &options, &mut out);
        out.flush()?;
        result
    }

    fn options(&self, config: &Config) -> ListingOptions {
        ListingOptions {
            parameter_count: self
                .parameter_count
                .unwrap_or(config.listing.parameter_count),
            format: self.format.unwrap_or(config.listing.format),
            stats: self.stats || config.listing.stats,
        }
    }

    fn read_input(&self) -> Result<Vec<u8>> {
        if let Some(hex) = &self.hex {
            return parse_hex(hex).context("Invalid --hex input");
        }

        match &self.file {
            Some(path) => {
                std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
            }
            None => {
                let mut bytes = Vec::new();
                io::stdin()
                    .read_to_end(&mut bytes)
                    .context("Failed to read stdin")?;
                Ok(bytes)
            }
        }
    }
}

/// JSON record for one instruction
#[derive(Serialize)]
struct JsonInstruction {
    offset: usize,
    bytes: String,
    bytecode: Bytecode,
    scale: OperandScale,
    mnemonic: String,
    operands: Vec<Operand>,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    jump_target: Option<isize>,
}

impl JsonInstruction {
    fn new(insn: &InstructionRef<'_>, parameter_count: i32) -> Self {
        let bytes = insn
            .bytes()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            offset: insn.offset(),
            bytes,
            bytecode: insn.bytecode(),
            scale: insn.scale(),
            mnemonic: insn.bytecode().mnemonic(insn.scale()).to_string(),
            operands: insn.operands(),
            text: insn.display(parameter_count).to_string(),
            jump_target: insn.jump_target(),
        }
    }
}

#[derive(Serialize)]
struct StatEntry {
    bytecode: Bytecode,
    count: usize,
}

/// Write the listing of `bytes` to `out`.
///
/// Instructions before a decode error are still written; the error is
/// returned afterwards.
pub fn write_listing(bytes: &[u8], options: &ListingOptions, out: &mut impl Write) -> Result<()> {
    let mut counts: FxHashMap<Bytecode, usize> = FxHashMap::default();
    let mut listed = 0usize;

    for insn in BytecodeIterator::new(bytes) {
        let insn = insn.context("Failed to decode bytecode")?;
        *counts.entry(insn.bytecode()).or_default() += 1;
        listed += 1;

        match options.format {
            OutputFormat::Text => {
                write!(
                    out,
                    "@ {:>4} : {}",
                    insn.offset(),
                    insn.display(options.parameter_count)
                )?;
                if let Some(target) = insn.jump_target() {
                    write!(out, " (@ {target})")?;
                }
                writeln!(out)?;
            }
            OutputFormat::Json => {
                let record = JsonInstruction::new(&insn, options.parameter_count);
                serde_json::to_writer(&mut *out, &record)?;
                writeln!(out)?;
            }
        }
    }

    tracing::debug!(instructions = listed, bytes = bytes.len(), "listing complete");

    if options.stats {
        write_stats(counts, options.format, out)?;
    }
    Ok(())
}

fn write_stats(
    counts: FxHashMap<Bytecode, usize>,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    let mut stats: Vec<StatEntry> = counts
        .into_iter()
        .map(|(bytecode, count)| StatEntry { bytecode, count })
        .collect();
    stats.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then(a.bytecode.to_byte().cmp(&b.bytecode.to_byte()))
    });

    match format {
        OutputFormat::Text => {
            writeln!(out)?;
            writeln!(out, "{:<24} {:>6}", "Bytecode", "Count")?;
            for entry in &stats {
                writeln!(out, "{:<24} {:>6}", entry.bytecode.name(), entry.count)?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer(&mut *out, &serde_json::json!({ "stats": stats }))?;
            writeln!(out)?;
        }
    }
    Ok(())
}
