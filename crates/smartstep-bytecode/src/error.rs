//! Bytecode errors.

#![allow(missing_docs)]

use smol_str::SmolStr;
use thiserror::Error;

/// Instruction stream and constant pool errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BytecodeError {
    #[error("unexpected end of code at offset {0}")]
    UnexpectedEof(usize),
    #[error("invalid opcode 0x{opcode:02X} at offset {offset}")]
    InvalidOpcode { opcode: u8, offset: usize },
    #[error("invalid wide operand 0x{opcode:02X} at offset {offset}")]
    InvalidWide { opcode: u8, offset: usize },
    #[error("invalid switch at offset {offset}: {reason}")]
    InvalidSwitch { offset: usize, reason: SmolStr },
    #[error("code length {0} exceeds the 65535 byte limit")]
    CodeTooLong(usize),
    #[error("constant pool index {0} is out of range")]
    InvalidPoolIndex(u16),
    #[error("constant pool entry {index} is not a {expected}")]
    UnexpectedPoolEntry { index: u16, expected: SmolStr },
    #[error("constant pool is full")]
    PoolOverflow,
}

/// Descriptor parse errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("empty descriptor")]
    Empty,
    #[error("method descriptor '{0}' must start with '('")]
    MissingParams(SmolStr),
    #[error("unterminated class name in '{0}'")]
    UnterminatedClass(SmolStr),
    #[error("unexpected character '{ch}' at {pos} in '{descriptor}'")]
    UnexpectedChar {
        descriptor: SmolStr,
        ch: char,
        pos: usize,
    },
    #[error("trailing characters in '{0}'")]
    Trailing(SmolStr),
    #[error("array type in '{descriptor}' has more than {max} dimensions")]
    TooManyDimensions { descriptor: SmolStr, max: usize },
}

/// Listing (textual assembly) errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListingError {
    #[error("line {line}: unknown mnemonic '{mnemonic}'")]
    UnknownMnemonic { line: usize, mnemonic: SmolStr },
    #[error("line {line}: {message}")]
    InvalidOperand { line: usize, message: SmolStr },
    #[error("line {line}: {source}")]
    Descriptor {
        line: usize,
        #[source]
        source: DescriptorError,
    },
    #[error(transparent)]
    Bytecode(#[from] BytecodeError),
}
