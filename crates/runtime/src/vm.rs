//! The bytecode interpreter.
//!
//! A register-less stack machine: every instruction reads its operands from
//! the top of the value stack and leaves its result there. The dispatch loop
//! is a direct match over the decoded opcode; the instruction pointer is a
//! plain index into the chunk local to one `run`.
//!
//! The VM is an explicit context value. It owns the value stack and the heap
//! (object list + intern table); the chunk under execution is borrowed for
//! the duration of one `interpret` call and dropped afterwards. Nothing here
//! is process-global, so independent `Vm`s can coexist.

use siew_core::{Chunk, Heap, OpCode, Value, debug};
use std::fmt;
use std::fmt::Write as _;

/// Depth limit of the value stack.
pub const STACK_MAX: usize = 256;

/// Knobs for diagnostics output. Both print to stderr so stdout carries only
/// the evaluated result.
#[derive(Debug, Clone, Copy, Default)]
pub struct VmOptions {
    /// Print the value stack and the disassembled instruction before each
    /// dispatch step.
    pub trace_execution: bool,
    /// Print a disassembly of the chunk after a successful compile.
    pub print_code: bool,
}

/// Why an `interpret` call failed.
///
/// Diagnostics have already been written to stderr by the time this is
/// returned; the payload exists for embedders that want to inspect the
/// failure.
#[derive(Debug)]
pub enum InterpretError {
    /// The source did not compile.
    Compile,
    /// Execution hit a fatal error (a type mismatch, for instance).
    Runtime { message: String, line: u32 },
}

impl fmt::Display for InterpretError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterpretError::Compile => f.write_str("compile error"),
            InterpretError::Runtime { message, line } => {
                write!(f, "runtime error at line {}: {}", line, message)
            }
        }
    }
}

impl std::error::Error for InterpretError {}

/// The virtual machine: value stack plus heap.
///
/// Dropping the VM drops the heap, which frees every object allocated during
/// its lifetime; there is no per-operation collection.
pub struct Vm {
    stack: Vec<Value>,
    heap: Heap,
    options: VmOptions,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    pub fn new() -> Self {
        Self::with_options(VmOptions::default())
    }

    pub fn with_options(options: VmOptions) -> Self {
        Vm {
            stack: Vec::with_capacity(STACK_MAX),
            heap: Heap::new(),
            options,
        }
    }

    /// Compile and run one expression.
    ///
    /// On success the result has been printed to stdout and is also
    /// returned. On failure the diagnostics went to stderr and the chunk is
    /// discarded; the VM remains usable for the next call (the REPL relies
    /// on this).
    pub fn interpret(&mut self, source: &str) -> Result<Value, InterpretError> {
        let mut chunk = Chunk::new();
        if siew_compiler::compile(source, &mut chunk, &mut self.heap).is_err() {
            return Err(InterpretError::Compile);
        }
        if self.options.print_code {
            eprint!("{}", debug::disassemble_chunk(&chunk, "code"));
        }
        tracing::debug!(code_bytes = chunk.code().len(), "running chunk");
        self.run(&chunk)
    }

    /// Push a value onto the stack. Exposed for embedders; the run loop uses
    /// a checked variant.
    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    /// Pop the top of the stack. Yields `nil` when the stack is empty; the
    /// compiler never emits code that underflows.
    pub fn pop(&mut self) -> Value {
        self.stack.pop().unwrap_or(Value::Nil)
    }

    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    fn peek(&self, distance: usize) -> Value {
        self.stack[self.stack.len() - 1 - distance]
    }

    fn reset_stack(&mut self) {
        self.stack.clear();
    }

    /// Report a fatal error: message and source line to stderr, stack
    /// cleared so the next interpret starts fresh.
    fn runtime_error(&mut self, chunk: &Chunk, ip: usize, message: &str) -> InterpretError {
        let line = chunk.line(ip - 1);
        eprintln!("{}", message);
        eprintln!("[line {}] in script", line);
        self.reset_stack();
        InterpretError::Runtime {
            message: message.to_string(),
            line,
        }
    }

    fn push_checked(
        &mut self,
        chunk: &Chunk,
        ip: usize,
        value: Value,
    ) -> Result<(), InterpretError> {
        if self.stack.len() >= STACK_MAX {
            return Err(self.runtime_error(chunk, ip, "Stack overflow."));
        }
        self.stack.push(value);
        Ok(())
    }

    /// Pop two numeric operands, or fail without disturbing the stack.
    ///
    /// The type check peeks rather than pops so that on error the operands
    /// are still rooted on the stack for the reporter (and, later, for a
    /// collector).
    fn number_operands(&mut self, chunk: &Chunk, ip: usize) -> Result<(f64, f64), InterpretError> {
        match (self.peek(1), self.peek(0)) {
            (Value::Number(a), Value::Number(b)) => {
                self.pop();
                self.pop();
                Ok((a, b))
            }
            _ => Err(self.runtime_error(chunk, ip, "Operands must be numbers.")),
        }
    }

    fn arithmetic(
        &mut self,
        chunk: &Chunk,
        ip: usize,
        op: fn(f64, f64) -> f64,
    ) -> Result<(), InterpretError> {
        let (a, b) = self.number_operands(chunk, ip)?;
        self.push(Value::Number(op(a, b)));
        Ok(())
    }

    fn comparison(
        &mut self,
        chunk: &Chunk,
        ip: usize,
        op: fn(f64, f64) -> bool,
    ) -> Result<(), InterpretError> {
        let (a, b) = self.number_operands(chunk, ip)?;
        self.push(Value::Bool(op(a, b)));
        Ok(())
    }

    /// `Add` is the one polymorphic instruction: numbers add, strings
    /// concatenate (through the intern table, so equal results share one
    /// object), anything else is a type error.
    fn add(&mut self, chunk: &Chunk, ip: usize) -> Result<(), InterpretError> {
        let (a, b) = (self.peek(1), self.peek(0));
        if a.is_string() && b.is_string() {
            self.concatenate(a, b);
            Ok(())
        } else if let (Value::Number(a), Value::Number(b)) = (a, b) {
            self.pop();
            self.pop();
            self.push(Value::Number(a + b));
            Ok(())
        } else {
            Err(self.runtime_error(chunk, ip, "Operands must be numbers or strings."))
        }
    }

    fn concatenate(&mut self, a: Value, b: Value) {
        let mut chars = String::new();
        if let (Some(a), Some(b)) = (a.as_string(), b.as_string()) {
            chars.reserve(a.len() + b.len());
            chars.push_str(a.as_str());
            chars.push_str(b.as_str());
        }
        self.pop();
        self.pop();
        let obj = self.heap.take_string(chars);
        self.push(Value::Obj(obj));
    }

    fn trace(&self, chunk: &Chunk, ip: usize) {
        let mut line = String::from("          ");
        for slot in &self.stack {
            let _ = write!(line, "[ {} ]", slot);
        }
        eprintln!("{}", line);
        let mut out = String::new();
        debug::disassemble_instruction(chunk, ip, &mut out);
        eprint!("{}", out);
    }

    fn run(&mut self, chunk: &Chunk) -> Result<Value, InterpretError> {
        let code = chunk.code();
        let mut ip = 0;

        loop {
            if self.options.trace_execution {
                self.trace(chunk, ip);
            }

            // The instruction pointer moves past each byte as it is read;
            // operand reads below do the same.
            let byte = code[ip];
            ip += 1;

            let op = match OpCode::try_from(byte) {
                Ok(op) => op,
                Err(_) => {
                    let message = format!("Unknown opcode {}.", byte);
                    return Err(self.runtime_error(chunk, ip, &message));
                }
            };

            match op {
                OpCode::Constant => {
                    let index = code[ip] as usize;
                    ip += 1;
                    let value = chunk.constants()[index];
                    self.push_checked(chunk, ip, value)?;
                }
                OpCode::Nil => self.push_checked(chunk, ip, Value::Nil)?,
                OpCode::True => self.push_checked(chunk, ip, Value::Bool(true))?,
                OpCode::False => self.push_checked(chunk, ip, Value::Bool(false))?,
                OpCode::Equal => {
                    let b = self.pop();
                    let a = self.pop();
                    self.push(Value::Bool(a == b));
                }
                OpCode::Greater => self.comparison(chunk, ip, |a, b| a > b)?,
                OpCode::GreaterEqual => self.comparison(chunk, ip, |a, b| a >= b)?,
                OpCode::Less => self.comparison(chunk, ip, |a, b| a < b)?,
                OpCode::LessEqual => self.comparison(chunk, ip, |a, b| a <= b)?,
                OpCode::Add => self.add(chunk, ip)?,
                OpCode::Subtract => self.arithmetic(chunk, ip, |a, b| a - b)?,
                OpCode::Multiply => self.arithmetic(chunk, ip, |a, b| a * b)?,
                OpCode::Divide => self.arithmetic(chunk, ip, |a, b| a / b)?,
                OpCode::Not => {
                    let value = self.pop();
                    self.push(Value::Bool(value.is_falsey()));
                }
                OpCode::Negate => {
                    // Peek for the check so the operand stays rooted if the
                    // error path runs.
                    let Value::Number(n) = self.peek(0) else {
                        return Err(self.runtime_error(chunk, ip, "Operand must be a number."));
                    };
                    self.pop();
                    self.push(Value::Number(-n));
                }
                OpCode::Return => {
                    let value = self.pop();
                    println!("{}", value);
                    return Ok(value);
                }
            }
        }
    }
}
