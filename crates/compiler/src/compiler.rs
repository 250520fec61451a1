//! Single-pass Pratt compiler.
//!
//! There is no AST: expression structure is discovered by the Pratt
//! precedence climb and bytecode is emitted directly from within the parse
//! rules. Each token kind maps to an optional prefix rule, an optional infix
//! rule, and an infix precedence; `parse_precedence` drives the climb.
//!
//! Error handling follows the panic-mode scheme: the first diagnostic in a
//! bad region is printed to stderr and later ones are suppressed until a
//! synchronization point (for a single expression, end of input). The token
//! stream is always drained so the scanner stays consistent.

use crate::scanner::{Scanner, Token, TokenKind};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use siew_core::{Chunk, Heap, MAX_CONSTANTS, OpCode, Value};
use std::fmt;

/// Compilation failed; the diagnostics already went to stderr.
#[derive(Debug)]
pub struct CompileError;

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("compilation failed")
    }
}

impl std::error::Error for CompileError {}

/// Binding strength ladder, lowest to highest. `next()` is used to make
/// binary operators left-associative: the right operand is parsed one level
/// tighter than the operator itself.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, IntoPrimitive, TryFromPrimitive,
)]
#[repr(u8)]
enum Precedence {
    None,
    Assignment, // =
    Or,         // or
    And,        // and
    Equality,   // == !=
    Comparison, // < > <= >=
    Term,       // + -
    Factor,     // * /
    Unary,      // ! -
    Call,       // . ()
    Primary,
}

impl Precedence {
    fn next(self) -> Precedence {
        Precedence::try_from(u8::from(self) + 1).unwrap_or(Precedence::Primary)
    }
}

type ParseFn<'src, 'ctx> = fn(&mut Compiler<'src, 'ctx>);

struct ParseRule<'src, 'ctx> {
    prefix: Option<ParseFn<'src, 'ctx>>,
    infix: Option<ParseFn<'src, 'ctx>>,
    precedence: Precedence,
}

/// One row per token kind. Kinds without rules parse as nothing, which the
/// driver turns into "Expect expression.".
fn rule<'src, 'ctx>(kind: TokenKind) -> ParseRule<'src, 'ctx> {
    let (prefix, infix, precedence): (
        Option<ParseFn<'src, 'ctx>>,
        Option<ParseFn<'src, 'ctx>>,
        Precedence,
    ) = match kind {
        TokenKind::LeftParen => (Some(Compiler::grouping), None, Precedence::None),
        TokenKind::Minus => (
            Some(Compiler::unary),
            Some(Compiler::binary),
            Precedence::Term,
        ),
        TokenKind::Plus => (None, Some(Compiler::binary), Precedence::Term),
        TokenKind::Slash | TokenKind::Star => (None, Some(Compiler::binary), Precedence::Factor),
        TokenKind::Bang => (Some(Compiler::unary), None, Precedence::None),
        TokenKind::BangEqual | TokenKind::EqualEqual => {
            (None, Some(Compiler::binary), Precedence::Equality)
        }
        TokenKind::Greater
        | TokenKind::GreaterEqual
        | TokenKind::Less
        | TokenKind::LessEqual => (None, Some(Compiler::binary), Precedence::Comparison),
        TokenKind::Number => (Some(Compiler::number), None, Precedence::None),
        TokenKind::String => (Some(Compiler::string), None, Precedence::None),
        TokenKind::False | TokenKind::True | TokenKind::Nil => {
            (Some(Compiler::literal), None, Precedence::None)
        }
        _ => (None, None, Precedence::None),
    };
    ParseRule {
        prefix,
        infix,
        precedence,
    }
}

struct Compiler<'src, 'ctx> {
    scanner: Scanner<'src>,
    current: Token<'src>,
    previous: Token<'src>,
    had_error: bool,
    panic_mode: bool,
    chunk: &'ctx mut Chunk,
    heap: &'ctx mut Heap,
}

/// Compile a single top-level expression into `chunk`.
///
/// String literals are interned through `heap` so the emitted constants obey
/// the identity-equality invariant. Diagnostics go to stderr; the returned
/// error only says that at least one was emitted.
pub fn compile(source: &str, chunk: &mut Chunk, heap: &mut Heap) -> Result<(), CompileError> {
    let placeholder = Token {
        kind: TokenKind::Eof,
        lexeme: "",
        line: 1,
    };
    let mut compiler = Compiler {
        scanner: Scanner::new(source),
        current: placeholder,
        previous: placeholder,
        had_error: false,
        panic_mode: false,
        chunk,
        heap,
    };

    compiler.advance();
    compiler.expression();
    compiler.consume(TokenKind::Eof, "Expect end of expression.");
    compiler.emit_op(OpCode::Return);

    if compiler.had_error {
        return Err(CompileError);
    }
    tracing::debug!(
        code_bytes = compiler.chunk.code().len(),
        constants = compiler.chunk.constants().len(),
        "compiled expression"
    );
    Ok(())
}

impl<'src, 'ctx> Compiler<'src, 'ctx> {
    /// Move to the next real token, reporting and skipping any `Error`
    /// tokens so the parse rules only ever see well-formed input.
    fn advance(&mut self) {
        self.previous = self.current;
        loop {
            self.current = self.scanner.next_token();
            if self.current.kind != TokenKind::Error {
                break;
            }
            let message = self.current.lexeme;
            self.error_at_current(message);
        }
    }

    fn consume(&mut self, kind: TokenKind, message: &str) {
        if self.current.kind == kind {
            self.advance();
            return;
        }
        self.error_at_current(message);
    }

    fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    /// The Pratt driver: run the prefix rule for the token just consumed,
    /// then fold in infix rules as long as they bind at least as tightly as
    /// `precedence`.
    fn parse_precedence(&mut self, precedence: Precedence) {
        self.advance();
        let Some(prefix) = rule(self.previous.kind).prefix else {
            self.error("Expect expression.");
            return;
        };
        prefix(self);

        while precedence <= rule(self.current.kind).precedence {
            self.advance();
            if let Some(infix) = rule(self.previous.kind).infix {
                infix(self);
            }
        }
    }

    fn grouping(&mut self) {
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after expression.");
    }

    /// The operand is compiled first; the operator instruction follows it,
    /// matching the execution order on the value stack.
    fn unary(&mut self) {
        let operator = self.previous.kind;
        self.parse_precedence(Precedence::Unary);
        match operator {
            TokenKind::Minus => self.emit_op(OpCode::Negate),
            TokenKind::Bang => self.emit_op(OpCode::Not),
            _ => {}
        }
    }

    fn binary(&mut self) {
        let operator = self.previous.kind;
        // One level tighter on the right makes `a - b - c` left-associative.
        let precedence = rule(operator).precedence;
        self.parse_precedence(precedence.next());

        match operator {
            TokenKind::Plus => self.emit_op(OpCode::Add),
            TokenKind::Minus => self.emit_op(OpCode::Subtract),
            TokenKind::Star => self.emit_op(OpCode::Multiply),
            TokenKind::Slash => self.emit_op(OpCode::Divide),
            TokenKind::EqualEqual => self.emit_op(OpCode::Equal),
            // `!=` negates equality, which IEEE-754 permits.
            TokenKind::BangEqual => self.emit_ops(OpCode::Equal, OpCode::Not),
            TokenKind::Greater => self.emit_op(OpCode::Greater),
            TokenKind::Less => self.emit_op(OpCode::Less),
            // `<=`/`>=` must be their own instructions: `!(a > b)` is true
            // for NaN operands, `a <= b` is not.
            TokenKind::GreaterEqual => self.emit_op(OpCode::GreaterEqual),
            TokenKind::LessEqual => self.emit_op(OpCode::LessEqual),
            _ => {}
        }
    }

    fn number(&mut self) {
        match self.previous.lexeme.parse::<f64>() {
            Ok(value) => self.emit_constant(Value::Number(value)),
            Err(_) => self.error("Invalid number literal."),
        }
    }

    fn string(&mut self) {
        // The scanner already stripped the quotes.
        let obj = self.heap.copy_string(self.previous.lexeme);
        self.emit_constant(Value::Obj(obj));
    }

    fn literal(&mut self) {
        match self.previous.kind {
            TokenKind::Nil => self.emit_op(OpCode::Nil),
            TokenKind::True => self.emit_op(OpCode::True),
            TokenKind::False => self.emit_op(OpCode::False),
            _ => {}
        }
    }

    fn emit_byte(&mut self, byte: u8) {
        self.chunk.write(byte, self.previous.line);
    }

    fn emit_op(&mut self, op: OpCode) {
        self.emit_byte(op.into());
    }

    fn emit_ops(&mut self, first: OpCode, second: OpCode) {
        self.emit_op(first);
        self.emit_op(second);
    }

    fn emit_constant(&mut self, value: Value) {
        let index = self.make_constant(value);
        self.emit_op(OpCode::Constant);
        self.emit_byte(index);
    }

    fn make_constant(&mut self, value: Value) -> u8 {
        let index = self.chunk.add_constant(value);
        if index >= MAX_CONSTANTS {
            self.error("Too many constants in one chunk.");
            return 0;
        }
        index as u8
    }

    fn error_at_current(&mut self, message: &str) {
        let token = self.current;
        self.error_at(token, message);
    }

    /// Report at the token just consumed.
    fn error(&mut self, message: &str) {
        let token = self.previous;
        self.error_at(token, message);
    }

    fn error_at(&mut self, token: Token<'src>, message: &str) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;

        eprint!("[line {}] Error", token.line);
        match token.kind {
            TokenKind::Eof => eprint!(" at end"),
            // Error tokens carry the message themselves; no location clause.
            TokenKind::Error => {}
            _ => eprint!(" at '{}'", token.lexeme),
        }
        eprintln!(": {}", message);
        self.had_error = true;
    }
}
