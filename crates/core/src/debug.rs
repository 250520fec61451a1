//! Human-readable bytecode listings.
//!
//! Renders a chunk (or a single instruction) into a `String` for the CLI's
//! `--dump-bytecode` flag and the VM's execution tracer. The format is the
//! classic one: byte offset, source line (`|` when unchanged), mnemonic, and
//! for constant instructions the operand plus the pooled value.

use crate::chunk::{Chunk, OpCode};
use std::fmt::Write;

pub fn disassemble_chunk(chunk: &Chunk, name: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {} ==", name);
    let mut offset = 0;
    while offset < chunk.code().len() {
        offset = disassemble_instruction(chunk, offset, &mut out);
    }
    out
}

/// Append one instruction's listing to `out`; returns the next offset.
pub fn disassemble_instruction(chunk: &Chunk, offset: usize, out: &mut String) -> usize {
    let _ = write!(out, "{:04} ", offset);
    if offset > 0 && chunk.line(offset) == chunk.line(offset - 1) {
        let _ = write!(out, "   | ");
    } else {
        let _ = write!(out, "{:4} ", chunk.line(offset));
    }

    let byte = chunk.code()[offset];
    match OpCode::try_from(byte) {
        Ok(OpCode::Constant) => constant_instruction("CONSTANT", chunk, offset, out),
        Ok(op) => {
            let _ = writeln!(out, "{}", mnemonic(op));
            offset + 1
        }
        Err(_) => {
            let _ = writeln!(out, "Unknown opcode {}", byte);
            offset + 1
        }
    }
}

fn constant_instruction(name: &str, chunk: &Chunk, offset: usize, out: &mut String) -> usize {
    let index = chunk.code()[offset + 1];
    let _ = write!(out, "{:<16} {:4} '", name, index);
    match chunk.constants().get(index as usize) {
        Some(value) => {
            let _ = write!(out, "{}", value);
        }
        None => {
            let _ = write!(out, "<bad constant index>");
        }
    }
    let _ = writeln!(out, "'");
    offset + 2
}

fn mnemonic(op: OpCode) -> &'static str {
    match op {
        OpCode::Constant => "CONSTANT",
        OpCode::Nil => "NIL",
        OpCode::True => "TRUE",
        OpCode::False => "FALSE",
        OpCode::Equal => "EQUAL",
        OpCode::Greater => "GREATER",
        OpCode::GreaterEqual => "GREATER_EQUAL",
        OpCode::Less => "LESS",
        OpCode::LessEqual => "LESS_EQUAL",
        OpCode::Add => "ADD",
        OpCode::Subtract => "SUBTRACT",
        OpCode::Multiply => "MULTIPLY",
        OpCode::Divide => "DIVIDE",
        OpCode::Not => "NOT",
        OpCode::Negate => "NEGATE",
        OpCode::Return => "RETURN",
    }
}
