//! JVM opcodes.
//!
//! Only the opcodes the decoder has to treat specially get a name; everything
//! else is classified by [`operand_shape`].

#![allow(missing_docs)]

use serde::{Deserialize, Serialize};

pub const NOP: u8 = 0x00;
pub const ACONST_NULL: u8 = 0x01;
pub const ICONST_M1: u8 = 0x02;
pub const ICONST_5: u8 = 0x08;
pub const BIPUSH: u8 = 0x10;
pub const SIPUSH: u8 = 0x11;
pub const LDC: u8 = 0x12;
pub const LDC_W: u8 = 0x13;
pub const LDC2_W: u8 = 0x14;
pub const ILOAD: u8 = 0x15;
pub const ALOAD: u8 = 0x19;
pub const ILOAD_0: u8 = 0x1A;
pub const ALOAD_0: u8 = 0x2A;
pub const ISTORE: u8 = 0x36;
pub const ASTORE: u8 = 0x3A;
pub const ISTORE_0: u8 = 0x3B;
pub const ASTORE_0: u8 = 0x4B;
pub const POP: u8 = 0x57;
pub const DUP: u8 = 0x59;
pub const IINC: u8 = 0x84;
pub const IFEQ: u8 = 0x99;
pub const GOTO: u8 = 0xA7;
pub const JSR: u8 = 0xA8;
pub const RET: u8 = 0xA9;
pub const TABLESWITCH: u8 = 0xAA;
pub const LOOKUPSWITCH: u8 = 0xAB;
pub const IRETURN: u8 = 0xAC;
pub const ARETURN: u8 = 0xB0;
pub const RETURN: u8 = 0xB1;
pub const GETSTATIC: u8 = 0xB2;
pub const PUTSTATIC: u8 = 0xB3;
pub const GETFIELD: u8 = 0xB4;
pub const PUTFIELD: u8 = 0xB5;
pub const INVOKEVIRTUAL: u8 = 0xB6;
pub const INVOKESPECIAL: u8 = 0xB7;
pub const INVOKESTATIC: u8 = 0xB8;
pub const INVOKEINTERFACE: u8 = 0xB9;
pub const INVOKEDYNAMIC: u8 = 0xBA;
pub const NEW: u8 = 0xBB;
pub const NEWARRAY: u8 = 0xBC;
pub const ANEWARRAY: u8 = 0xBD;
pub const ATHROW: u8 = 0xBF;
pub const CHECKCAST: u8 = 0xC0;
pub const INSTANCEOF: u8 = 0xC1;
pub const WIDE: u8 = 0xC4;
pub const MULTIANEWARRAY: u8 = 0xC5;
pub const IFNULL: u8 = 0xC6;
pub const IFNONNULL: u8 = 0xC7;
pub const GOTO_W: u8 = 0xC8;
pub const JSR_W: u8 = 0xC9;
/// Reserved for debuggers; may appear in patched code.
pub const BREAKPOINT: u8 = 0xCA;

/// Call-family opcodes that can become step-into candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InvokeKind {
    Virtual,
    Special,
    Static,
    Interface,
}

impl InvokeKind {
    #[must_use]
    pub fn from_opcode(opcode: u8) -> Option<Self> {
        match opcode {
            INVOKEVIRTUAL => Some(Self::Virtual),
            INVOKESPECIAL => Some(Self::Special),
            INVOKESTATIC => Some(Self::Static),
            INVOKEINTERFACE => Some(Self::Interface),
            _ => None,
        }
    }

    #[must_use]
    pub fn opcode(self) -> u8 {
        match self {
            Self::Virtual => INVOKEVIRTUAL,
            Self::Special => INVOKESPECIAL,
            Self::Static => INVOKESTATIC,
            Self::Interface => INVOKEINTERFACE,
        }
    }

    #[must_use]
    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Virtual => "invokevirtual",
            Self::Special => "invokespecial",
            Self::Static => "invokestatic",
            Self::Interface => "invokeinterface",
        }
    }

    /// Whether the runtime target may be an override in a subtype.
    #[must_use]
    pub fn is_dynamic_dispatch(self) -> bool {
        matches!(self, Self::Virtual | Self::Interface)
    }
}

/// Operand layout following an opcode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OperandShape {
    None,
    /// Signed byte immediate (`bipush`).
    Byte,
    /// Signed short immediate (`sipush`).
    Short,
    /// One-byte local index (`iload`, `ret`, ...).
    Local,
    /// One-byte constant pool index (`ldc`).
    PoolByte,
    /// Two-byte constant pool index.
    Pool,
    /// `iinc`: local index and signed byte delta.
    Iinc,
    /// Signed 16-bit branch offset.
    Branch,
    /// Signed 32-bit branch offset.
    BranchWide,
    /// `newarray` element type tag.
    ArrayType,
    /// `invokeinterface`: pool index, arg count, zero byte.
    Interface,
    /// `invokedynamic`: pool index, two zero bytes.
    Dynamic,
    /// `multianewarray`: pool index and dimension count.
    MultiArray,
    TableSwitch,
    LookupSwitch,
    Wide,
}

pub(crate) fn operand_shape(opcode: u8) -> Option<OperandShape> {
    use OperandShape as S;
    let shape = match opcode {
        0x00..=0x0F => S::None,
        BIPUSH => S::Byte,
        SIPUSH => S::Short,
        LDC => S::PoolByte,
        LDC_W | LDC2_W => S::Pool,
        0x15..=0x19 => S::Local,
        0x1A..=0x35 => S::None,
        0x36..=0x3A => S::Local,
        0x3B..=0x83 => S::None,
        IINC => S::Iinc,
        0x85..=0x98 => S::None,
        0x99..=JSR => S::Branch,
        RET => S::Local,
        TABLESWITCH => S::TableSwitch,
        LOOKUPSWITCH => S::LookupSwitch,
        IRETURN..=RETURN => S::None,
        GETSTATIC..=INVOKESTATIC => S::Pool,
        INVOKEINTERFACE => S::Interface,
        INVOKEDYNAMIC => S::Dynamic,
        NEW => S::Pool,
        NEWARRAY => S::ArrayType,
        ANEWARRAY => S::Pool,
        0xBE | ATHROW => S::None,
        CHECKCAST | INSTANCEOF => S::Pool,
        0xC2 | 0xC3 => S::None,
        WIDE => S::Wide,
        MULTIANEWARRAY => S::MultiArray,
        IFNULL | IFNONNULL => S::Branch,
        GOTO_W | JSR_W => S::BranchWide,
        BREAKPOINT => S::None,
        _ => return None,
    };
    Some(shape)
}

/// Opcodes `wide` may prefix.
pub(crate) fn is_widenable(opcode: u8) -> bool {
    matches!(opcode, 0x15..=0x19 | 0x36..=0x3A | RET | IINC)
}
