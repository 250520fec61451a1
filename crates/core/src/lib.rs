//! Siew Core: the shared foundation of the Siew compiler and VM.
//!
//! This crate holds everything both halves of the interpreter need to agree
//! on:
//!
//! - `value`: the `Value` tagged union (nil, bool, number, heap object)
//! - `chunk`: bytecode chunks (opcodes, code bytes, line table, constants)
//! - `object`: heap-object ownership and string interning
//! - `table`: the open-addressed hash table backing the intern set
//! - `debug`: bytecode disassembly for dumps and tracing
//!
//! The heap is an explicit [`Heap`] value rather than process-global state,
//! so a host can run several independent interpreters.

pub mod chunk;
pub mod debug;
pub mod object;
pub mod table;
pub mod value;

pub use chunk::{Chunk, MAX_CONSTANTS, OpCode};
pub use object::{Heap, Obj, ObjBody, ObjRef, ObjString, hash_string};
pub use table::Table;
pub use value::Value;
