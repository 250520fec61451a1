//! Heap objects and string interning.
//!
//! Every heap allocation made by the compiler or the VM is an `Obj`, owned by
//! the [`Heap`] through an intrusive singly-linked list. Values hold
//! non-owning [`ObjRef`] handles; nothing is freed per-operation, the whole
//! list is released when the heap is dropped. A future collector would walk
//! the same list.
//!
//! Strings are interned: the heap keeps a [`Table`] used as a set, and
//! [`Heap::copy_string`] / [`Heap::take_string`] return the existing object
//! whenever an equal byte sequence has been seen before. The payoff is that
//! string equality everywhere else is pointer identity.

use crate::table::Table;
use crate::value::Value;
use std::fmt;
use std::ptr::NonNull;

/// 32-bit FNV-1a over the string bytes.
pub fn hash_string(chars: &str) -> u32 {
    let mut hash: u32 = 2166136261;
    for &byte in chars.as_bytes() {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(16777619);
    }
    hash
}

/// The concrete payload of a heap object.
///
/// Strings are the only kind so far; the enum replaces the classic
/// header-at-offset-zero inheritance trick, so adding a kind is adding a
/// variant.
#[derive(Debug)]
pub enum ObjBody {
    String(ObjString),
}

/// An interned, immutable string object.
///
/// Invariant: for any two `ObjString`s reachable from the same heap, the byte
/// sequences are distinct. Textual equality therefore coincides with handle
/// identity.
#[derive(Debug)]
pub struct ObjString {
    chars: Box<str>,
    hash: u32,
}

impl ObjString {
    pub fn as_str(&self) -> &str {
        &self.chars
    }

    pub fn hash(&self) -> u32 {
        self.hash
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }
}

/// A heap object: the intrusive list link plus the tagged payload.
#[derive(Debug)]
pub struct Obj {
    next: Option<NonNull<Obj>>,
    body: ObjBody,
}

/// A copyable, non-owning handle to a heap object.
///
/// # Safety invariants
///
/// - A handle is only created by [`Heap`] allocation and only dereferenced
///   while that heap is alive. The heap frees objects exclusively in its
///   `Drop`, so every handle obtained from a live heap points at a live
///   object.
/// - An object's body is never mutated after allocation, so shared
///   references handed out here cannot alias a mutation.
#[derive(Clone, Copy)]
pub struct ObjRef(NonNull<Obj>);

impl ObjRef {
    pub fn body(&self) -> &ObjBody {
        // Safety: see the type-level invariants above.
        unsafe { &self.0.as_ref().body }
    }

    /// The string payload. Total while strings are the only object kind.
    pub fn as_string(&self) -> &ObjString {
        match self.body() {
            ObjBody::String(s) => s,
        }
    }
}

// Identity, not content: interning makes the two agree for strings.
impl PartialEq for ObjRef {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for ObjRef {}

impl fmt::Debug for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.body() {
            ObjBody::String(s) => write!(f, "ObjRef(String {:?})", s.as_str()),
        }
    }
}

/// Owner of every heap object plus the string intern table.
#[derive(Debug, Default)]
pub struct Heap {
    objects: Option<NonNull<Obj>>,
    strings: Table,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern the given byte sequence, copying it on first sight.
    pub fn copy_string(&mut self, chars: &str) -> ObjRef {
        let hash = hash_string(chars);
        if let Some(existing) = self.strings.find_string(chars, hash) {
            return existing;
        }
        self.intern(Box::from(chars), hash)
    }

    /// Intern a string the caller already owns. On an intern hit the buffer
    /// is dropped and the existing object returned; on a miss the buffer is
    /// adopted without another copy. Concatenation uses this.
    pub fn take_string(&mut self, chars: String) -> ObjRef {
        let hash = hash_string(&chars);
        if let Some(existing) = self.strings.find_string(&chars, hash) {
            return existing;
        }
        self.intern(chars.into_boxed_str(), hash)
    }

    fn intern(&mut self, chars: Box<str>, hash: u32) -> ObjRef {
        let obj = self.allocate(ObjBody::String(ObjString { chars, hash }));
        // The table doubles as a set; the value slot is unused.
        self.strings.set(obj, Value::Nil);
        obj
    }

    /// Allocate an object and prepend it to the heap list in O(1).
    fn allocate(&mut self, body: ObjBody) -> ObjRef {
        let obj = Box::new(Obj {
            next: self.objects.take(),
            body,
        });
        let ptr = NonNull::from(Box::leak(obj));
        self.objects = Some(ptr);
        ObjRef(ptr)
    }

    /// Number of live heap objects (walks the list).
    pub fn object_count(&self) -> usize {
        let mut count = 0;
        let mut cursor = self.objects;
        while let Some(ptr) = cursor {
            count += 1;
            // Safety: objects on the list are live until the heap drops.
            cursor = unsafe { ptr.as_ref().next };
        }
        count
    }
}

impl Drop for Heap {
    fn drop(&mut self) {
        let mut cursor = self.objects.take();
        while let Some(ptr) = cursor {
            // Safety: every node was produced by Box::leak in `allocate` and
            // is freed exactly once, here. Outstanding ObjRefs must not be
            // dereferenced past this point, which the ownership rule on
            // `Heap` guarantees for the compiler and VM.
            let obj = unsafe { Box::from_raw(ptr.as_ptr()) };
            cursor = obj.next;
        }
    }
}
