//! `smartstep-bytecode` - JVM class data consumed by smart step-into resolution.
//!
//! The debugger host hands the engine already-loaded classes: resolved
//! constant pools, raw `Code` bytes with their line tables, and the metadata
//! the Kotlin compiler leaves behind (file facades, extension receivers,
//! singleton fields). This crate models that data and decodes instruction
//! streams; it never loads class files from disk.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

/// Code assembler and textual listings.
pub mod asm;
/// Class, field and method metadata.
pub mod class;
/// Resolved constant pool.
pub mod constant_pool;
/// Instruction decoding.
pub mod decode;
/// Method and field descriptors.
pub mod descriptor;
/// Bytecode errors.
pub mod error;
/// JVM opcodes.
pub mod opcode;
/// Metadata provider contract and an in-memory class pool.
pub mod provider;

mod reader;

pub use asm::{parse_listing, CodeBuilder};
pub use class::{
    AccessFlags, ClassInfo, ClassKind, FieldInfo, LineEntry, LineNumberTable, MethodBody,
    MethodInfo,
};
pub use constant_pool::{ConstantEntry, ConstantPool, FieldRef, MethodRef};
pub use decode::{decode_code, Insn, Operand};
pub use descriptor::{FieldType, MethodDescriptor};
pub use error::{BytecodeError, DescriptorError, ListingError};
pub use opcode::InvokeKind;
pub use provider::{ClassPool, MetadataProvider};
