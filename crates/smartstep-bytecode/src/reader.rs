//! Big-endian code reader.

use super::BytecodeError;

#[derive(Debug, Clone)]
pub(crate) struct CodeReader<'a> {
    data: &'a [u8],
    cursor: usize,
}

impl<'a> CodeReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, cursor: 0 }
    }

    pub(crate) fn pos(&self) -> usize {
        self.cursor
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.cursor >= self.data.len()
    }

    pub(crate) fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], BytecodeError> {
        let end = self
            .cursor
            .checked_add(len)
            .ok_or(BytecodeError::UnexpectedEof(self.cursor))?;
        if end > self.data.len() {
            return Err(BytecodeError::UnexpectedEof(self.cursor));
        }
        let start = self.cursor;
        self.cursor = end;
        Ok(&self.data[start..end])
    }

    /// Skip `tableswitch`/`lookupswitch` padding up to the next 4-byte boundary.
    pub(crate) fn align4(&mut self) -> Result<(), BytecodeError> {
        let padding = (4 - self.cursor % 4) % 4;
        self.read_bytes(padding).map(|_| ())
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, BytecodeError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub(crate) fn read_i8(&mut self) -> Result<i8, BytecodeError> {
        Ok(i8::from_be_bytes([self.read_u8()?]))
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, BytecodeError> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub(crate) fn read_i16(&mut self) -> Result<i16, BytecodeError> {
        let bytes = self.read_bytes(2)?;
        Ok(i16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub(crate) fn read_i32(&mut self) -> Result<i32, BytecodeError> {
        let bytes = self.read_bytes(4)?;
        Ok(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}
