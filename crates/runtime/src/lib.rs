//! Siew Runtime
//!
//! The stack-based virtual machine that executes chunks produced by
//! `siew-compiler`. The [`Vm`] is an explicit context: it owns the value
//! stack, the heap-object list, and the string intern table, and it frees
//! all of it when dropped. Hosts embed it like so:
//!
//! ```
//! use siew_runtime::Vm;
//!
//! let mut vm = Vm::new();
//! let value = vm.interpret("1 + 2 * 3").expect("evaluates");
//! assert_eq!(value, siew_core::Value::Number(7.0));
//! ```

pub mod vm;

pub use vm::{InterpretError, STACK_MAX, Vm, VmOptions};
