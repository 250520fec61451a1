//! Bytecode chunks.
//!
//! A `Chunk` is the unit of compilation: a contiguous, append-only byte
//! sequence, a parallel line table (one source line per byte, used for
//! runtime error reporting), and the constant pool referenced by
//! `OpCode::Constant` operands.

use crate::value::Value;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// The constant pool is addressed by a single operand byte, so a chunk can
/// hold at most 256 constants. A wide-operand `ConstantLong` instruction is
/// the anticipated follow-up once that limit bites.
pub const MAX_CONSTANTS: usize = 256;

/// One bytecode instruction.
///
/// Every opcode is a single byte. `Constant` is followed by one operand byte
/// (the constant-pool index); all other opcodes take no operands.
///
/// `GreaterEqual` and `LessEqual` are dedicated instructions rather than
/// `Less, Not` / `Greater, Not` pairs: negating the opposite comparison is
/// wrong under IEEE-754, where any comparison with NaN must stay false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum OpCode {
    Constant,
    Nil,
    True,
    False,
    Equal,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    Not,
    Negate,
    Return,
}

/// Bytecode plus its constant pool and line table.
#[derive(Debug, Default)]
pub struct Chunk {
    code: Vec<u8>,
    lines: Vec<u32>,
    constants: Vec<Value>,
}

impl Chunk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one byte emitted from the given source line. Code and line
    /// table grow in lock-step: `code.len() == lines.len()` always holds.
    pub fn write(&mut self, byte: u8, line: u32) {
        self.code.push(byte);
        self.lines.push(line);
    }

    pub fn write_op(&mut self, op: OpCode, line: u32) {
        self.write(op.into(), line);
    }

    /// Append a value to the constant pool and return its index.
    ///
    /// The pool is append-only and never reordered, so the index returned is
    /// always the pool length before the call. Enforcing the
    /// [`MAX_CONSTANTS`] limit is the compiler's job; the chunk itself keeps
    /// appending.
    pub fn add_constant(&mut self, value: Value) -> usize {
        self.constants.push(value);
        self.constants.len() - 1
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn constants(&self) -> &[Value] {
        &self.constants
    }

    /// The source line on which the byte at `offset` was emitted.
    pub fn line(&self, offset: usize) -> u32 {
        self.lines[offset]
    }

    pub fn lines(&self) -> &[u32] {
        &self.lines
    }
}
