//! Instruction decoding.

#![allow(missing_docs)]

use super::opcode::{self, is_widenable, operand_shape, InvokeKind, OperandShape};
use super::reader::CodeReader;
use super::BytecodeError;

const MAX_CODE_LENGTH: usize = 65_535;

/// Decoded operand of a single instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    None,
    Int(i32),
    Local(u16),
    Pool(u16),
    Iinc { local: u16, delta: i16 },
    /// Branch target relative to the instruction offset.
    Branch(i32),
    ArrayType(u8),
    Interface { index: u16, count: u8 },
    MultiArray { index: u16, dims: u8 },
    TableSwitch { default: i32, low: i32, targets: Vec<i32> },
    LookupSwitch { default: i32, pairs: Vec<(i32, i32)> },
}

/// One decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insn {
    /// Byte offset from the start of the code array.
    pub offset: u32,
    pub opcode: u8,
    /// Set when the instruction was prefixed by `wide`.
    pub wide: bool,
    pub operand: Operand,
}

impl Insn {
    #[must_use]
    pub fn invoke_kind(&self) -> Option<InvokeKind> {
        InvokeKind::from_opcode(self.opcode)
    }

    /// Constant pool index for invokes, field access, `new` and friends.
    #[must_use]
    pub fn pool_index(&self) -> Option<u16> {
        match self.operand {
            Operand::Pool(index)
            | Operand::Interface { index, .. }
            | Operand::MultiArray { index, .. } => Some(index),
            _ => None,
        }
    }
}

/// Decode a complete `Code` array into instructions in offset order.
pub fn decode_code(code: &[u8]) -> Result<Vec<Insn>, BytecodeError> {
    if code.len() > MAX_CODE_LENGTH {
        return Err(BytecodeError::CodeTooLong(code.len()));
    }
    let mut reader = CodeReader::new(code);
    let mut insns = Vec::with_capacity(code.len() / 2);
    while !reader.is_empty() {
        insns.push(decode_one(&mut reader)?);
    }
    Ok(insns)
}

fn decode_one(reader: &mut CodeReader<'_>) -> Result<Insn, BytecodeError> {
    let start = reader.pos();
    let opcode = reader.read_u8()?;
    let shape = operand_shape(opcode).ok_or(BytecodeError::InvalidOpcode {
        opcode,
        offset: start,
    })?;
    let offset = u32::try_from(start).map_err(|_| BytecodeError::CodeTooLong(start))?;

    if shape == OperandShape::Wide {
        let inner = reader.read_u8()?;
        if !is_widenable(inner) {
            return Err(BytecodeError::InvalidWide {
                opcode: inner,
                offset: start,
            });
        }
        let local = reader.read_u16()?;
        let operand = if inner == opcode::IINC {
            Operand::Iinc {
                local,
                delta: reader.read_i16()?,
            }
        } else {
            Operand::Local(local)
        };
        return Ok(Insn {
            offset,
            opcode: inner,
            wide: true,
            operand,
        });
    }

    let operand = match shape {
        OperandShape::None => Operand::None,
        OperandShape::Byte => Operand::Int(i32::from(reader.read_i8()?)),
        OperandShape::Short => Operand::Int(i32::from(reader.read_i16()?)),
        OperandShape::Local => Operand::Local(u16::from(reader.read_u8()?)),
        OperandShape::PoolByte => Operand::Pool(u16::from(reader.read_u8()?)),
        OperandShape::Pool => Operand::Pool(reader.read_u16()?),
        OperandShape::Iinc => Operand::Iinc {
            local: u16::from(reader.read_u8()?),
            delta: i16::from(reader.read_i8()?),
        },
        OperandShape::Branch => Operand::Branch(i32::from(reader.read_i16()?)),
        OperandShape::BranchWide => Operand::Branch(reader.read_i32()?),
        OperandShape::ArrayType => Operand::ArrayType(reader.read_u8()?),
        OperandShape::Interface => {
            let index = reader.read_u16()?;
            let count = reader.read_u8()?;
            let _zero = reader.read_u8()?;
            Operand::Interface { index, count }
        }
        OperandShape::Dynamic => {
            let index = reader.read_u16()?;
            let _zero = reader.read_u16()?;
            Operand::Pool(index)
        }
        OperandShape::MultiArray => Operand::MultiArray {
            index: reader.read_u16()?,
            dims: reader.read_u8()?,
        },
        OperandShape::TableSwitch => decode_table_switch(reader, start)?,
        OperandShape::LookupSwitch => decode_lookup_switch(reader, start)?,
        OperandShape::Wide => unreachable!("wide handled above"),
    };

    Ok(Insn {
        offset,
        opcode,
        wide: false,
        operand,
    })
}

fn decode_table_switch(
    reader: &mut CodeReader<'_>,
    start: usize,
) -> Result<Operand, BytecodeError> {
    reader.align4()?;
    let default = reader.read_i32()?;
    let low = reader.read_i32()?;
    let high = reader.read_i32()?;
    if high < low {
        return Err(BytecodeError::InvalidSwitch {
            offset: start,
            reason: "high below low".into(),
        });
    }
    let count = usize::try_from(i64::from(high) - i64::from(low) + 1).map_err(|_| {
        BytecodeError::InvalidSwitch {
            offset: start,
            reason: "jump table too large".into(),
        }
    })?;
    if count > MAX_CODE_LENGTH / 4 {
        return Err(BytecodeError::InvalidSwitch {
            offset: start,
            reason: "jump table too large".into(),
        });
    }
    let mut targets = Vec::with_capacity(count);
    for _ in 0..count {
        targets.push(reader.read_i32()?);
    }
    Ok(Operand::TableSwitch {
        default,
        low,
        targets,
    })
}

fn decode_lookup_switch(
    reader: &mut CodeReader<'_>,
    start: usize,
) -> Result<Operand, BytecodeError> {
    reader.align4()?;
    let default = reader.read_i32()?;
    let npairs = reader.read_i32()?;
    let count = usize::try_from(npairs).map_err(|_| BytecodeError::InvalidSwitch {
        offset: start,
        reason: "negative pair count".into(),
    })?;
    if count > MAX_CODE_LENGTH / 8 {
        return Err(BytecodeError::InvalidSwitch {
            offset: start,
            reason: "too many pairs".into(),
        });
    }
    let mut pairs = Vec::with_capacity(count);
    for _ in 0..count {
        let key = reader.read_i32()?;
        let target = reader.read_i32()?;
        pairs.push((key, target));
    }
    Ok(Operand::LookupSwitch { default, pairs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::{ALOAD_0, INVOKEVIRTUAL, RETURN};

    #[test]
    fn decodes_invoke_operands() {
        let code = [ALOAD_0, INVOKEVIRTUAL, 0x00, 0x07, RETURN];
        let insns = decode_code(&code).unwrap();
        assert_eq!(insns.len(), 3);
        assert_eq!(insns[1].offset, 1);
        assert_eq!(insns[1].invoke_kind(), Some(InvokeKind::Virtual));
        assert_eq!(insns[1].pool_index(), Some(7));
        assert_eq!(insns[2].offset, 4);
    }

    #[test]
    fn truncated_operand_is_an_error() {
        let code = [INVOKEVIRTUAL, 0x00];
        assert_eq!(decode_code(&code), Err(BytecodeError::UnexpectedEof(1)));
    }

    #[test]
    fn unknown_opcode_is_an_error() {
        assert_eq!(
            decode_code(&[0xFE]),
            Err(BytecodeError::InvalidOpcode {
                opcode: 0xFE,
                offset: 0
            })
        );
    }
}
