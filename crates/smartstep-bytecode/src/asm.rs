//! Code assembler and textual listings.
//!
//! Test fixtures and the CLI describe method bodies as listings:
//!
//! ```text
//! line 7
//! aload 1
//! invokestatic com/example/AppKt.topLevelFun ()I
//! invokevirtual com/example/A.member (I)V
//! return
//! ```
//!
//! `line N` and `column N` are pseudo instructions that annotate the offset of
//! the next real instruction.

#![allow(missing_docs)]

use smol_str::SmolStr;

use super::opcode::{self, InvokeKind};
use super::{
    BytecodeError, ConstantEntry, ConstantPool, DescriptorError, FieldRef, LineEntry,
    LineNumberTable, ListingError, MethodBody, MethodDescriptor, MethodRef,
};

/// Incremental emitter for a single method body.
///
/// Operations never fail eagerly; the first error is kept and reported by
/// [`CodeBuilder::finish`].
#[derive(Debug)]
pub struct CodeBuilder<'p> {
    pool: &'p mut ConstantPool,
    code: Vec<u8>,
    lines: Vec<LineEntry>,
    columns: Vec<(u32, u32)>,
    error: Option<ListingError>,
}

impl<'p> CodeBuilder<'p> {
    pub fn new(pool: &'p mut ConstantPool) -> Self {
        Self {
            pool,
            code: Vec::new(),
            lines: Vec::new(),
            columns: Vec::new(),
            error: None,
        }
    }

    /// Offset the next instruction will be emitted at.
    #[must_use]
    pub fn offset(&self) -> u32 {
        u32::try_from(self.code.len()).unwrap_or(u32::MAX)
    }

    /// Start a new line-table entry at the current offset.
    pub fn line(&mut self, line: u32) -> &mut Self {
        let start_pc = self.offset();
        match self.lines.last_mut() {
            Some(last) if last.start_pc == start_pc => last.line = line,
            _ => self.lines.push(LineEntry { start_pc, line }),
        }
        self
    }

    /// Start a new column-table entry at the current offset.
    pub fn column(&mut self, column: u32) -> &mut Self {
        let start = self.offset();
        match self.columns.last_mut() {
            Some(last) if last.0 == start => last.1 = column,
            _ => self.columns.push((start, column)),
        }
        self
    }

    /// Emit an opcode without operands.
    pub fn op(&mut self, opcode: u8) -> &mut Self {
        self.code.push(opcode);
        self
    }

    pub fn iconst(&mut self, value: i32) -> &mut Self {
        if let Some(Ok(delta @ 0..=6)) = value.checked_add(1).map(u8::try_from) {
            return self.op(opcode::ICONST_M1 + delta);
        }
        if let Ok(byte) = i8::try_from(value) {
            self.code.push(opcode::BIPUSH);
            self.code.extend_from_slice(&byte.to_be_bytes());
            return self;
        }
        if let Ok(short) = i16::try_from(value) {
            self.code.push(opcode::SIPUSH);
            self.code.extend_from_slice(&short.to_be_bytes());
            return self;
        }
        let Some(index) = self.intern(ConstantEntry::Integer(value)) else {
            return self;
        };
        match u8::try_from(index) {
            Ok(short) => {
                self.code.push(opcode::LDC);
                self.code.push(short);
            }
            Err(_) => {
                self.code.push(opcode::LDC_W);
                self.code.extend_from_slice(&index.to_be_bytes());
            }
        }
        self
    }

    /// Emit a typed local load/store; `base` is one of `iload..aload` or
    /// `istore..astore`.
    pub fn local(&mut self, base: u8, index: u16) -> &mut Self {
        let short_base = match base {
            0x15..=0x19 => Some(opcode::ILOAD_0 + (base - opcode::ILOAD) * 4),
            0x36..=0x3A => Some(opcode::ISTORE_0 + (base - opcode::ISTORE) * 4),
            _ => None,
        };
        let Some(short_base) = short_base else {
            self.fail(BytecodeError::InvalidOpcode {
                opcode: base,
                offset: self.code.len(),
            });
            return self;
        };
        match u8::try_from(index) {
            Ok(slot @ 0..=3) => self.op(short_base + slot),
            Ok(slot) => {
                self.code.push(base);
                self.code.push(slot);
                self
            }
            Err(_) => {
                self.code.push(opcode::WIDE);
                self.code.push(base);
                self.code.extend_from_slice(&index.to_be_bytes());
                self
            }
        }
    }

    pub fn aload(&mut self, index: u16) -> &mut Self {
        self.local(opcode::ALOAD, index)
    }

    pub fn iload(&mut self, index: u16) -> &mut Self {
        self.local(opcode::ILOAD, index)
    }

    pub fn iinc(&mut self, index: u16, delta: i16) -> &mut Self {
        match (u8::try_from(index), i8::try_from(delta)) {
            (Ok(index), Ok(delta)) => {
                self.code.push(opcode::IINC);
                self.code.push(index);
                self.code.extend_from_slice(&delta.to_be_bytes());
            }
            _ => {
                self.code.push(opcode::WIDE);
                self.code.push(opcode::IINC);
                self.code.extend_from_slice(&index.to_be_bytes());
                self.code.extend_from_slice(&delta.to_be_bytes());
            }
        }
        self
    }

    /// Emit a 16-bit branch; `delta` is relative to this instruction.
    pub fn branch(&mut self, opcode: u8, delta: i16) -> &mut Self {
        self.code.push(opcode);
        self.code.extend_from_slice(&delta.to_be_bytes());
        self
    }

    pub fn invoke(&mut self, kind: InvokeKind, method: MethodRef) -> &mut Self {
        let interface_count = if kind == InvokeKind::Interface {
            match MethodDescriptor::parse(&method.descriptor) {
                Ok(desc) => Some(u8::try_from(desc.arg_slots() + 1).unwrap_or(u8::MAX)),
                Err(err) => {
                    self.fail_descriptor(err);
                    return self;
                }
            }
        } else {
            None
        };
        let method = if kind == InvokeKind::Interface {
            method.interface()
        } else {
            method
        };
        let Some(index) = self.intern(ConstantEntry::Method(method)) else {
            return self;
        };
        self.code.push(kind.opcode());
        self.code.extend_from_slice(&index.to_be_bytes());
        if let Some(count) = interface_count {
            self.code.push(count);
            self.code.push(0);
        }
        self
    }

    pub fn invoke_dynamic(&mut self, name: &str, descriptor: &str) -> &mut Self {
        let entry = ConstantEntry::InvokeDynamic {
            name: name.into(),
            descriptor: descriptor.into(),
        };
        let Some(index) = self.intern(entry) else {
            return self;
        };
        self.code.push(opcode::INVOKEDYNAMIC);
        self.code.extend_from_slice(&index.to_be_bytes());
        self.code.extend_from_slice(&[0, 0]);
        self
    }

    /// `getstatic`, `putstatic`, `getfield` or `putfield`.
    pub fn field(&mut self, opcode: u8, field: FieldRef) -> &mut Self {
        self.pool_op(opcode, ConstantEntry::Field(field))
    }

    /// `new`, `checkcast`, `instanceof` or `anewarray`.
    pub fn class_op(&mut self, opcode: u8, class: &str) -> &mut Self {
        self.pool_op(opcode, ConstantEntry::Class(class.into()))
    }

    pub fn table_switch(&mut self, default: i32, low: i32, targets: &[i32]) -> &mut Self {
        self.code.push(opcode::TABLESWITCH);
        self.pad4();
        let count = i32::try_from(targets.len()).unwrap_or(i32::MAX);
        let high = low.saturating_add(count).saturating_sub(1);
        for word in [default, low, high].into_iter().chain(targets.iter().copied()) {
            self.code.extend_from_slice(&word.to_be_bytes());
        }
        self
    }

    pub fn lookup_switch(&mut self, default: i32, pairs: &[(i32, i32)]) -> &mut Self {
        self.code.push(opcode::LOOKUPSWITCH);
        self.pad4();
        let npairs = i32::try_from(pairs.len()).unwrap_or(i32::MAX);
        self.code.extend_from_slice(&default.to_be_bytes());
        self.code.extend_from_slice(&npairs.to_be_bytes());
        for (key, target) in pairs {
            self.code.extend_from_slice(&key.to_be_bytes());
            self.code.extend_from_slice(&target.to_be_bytes());
        }
        self
    }

    /// Finish the body, reporting the first error hit while emitting.
    pub fn finish(self) -> Result<MethodBody, ListingError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if self.code.len() > 65_535 {
            return Err(BytecodeError::CodeTooLong(self.code.len()).into());
        }
        Ok(MethodBody {
            code: self.code,
            lines: LineNumberTable::new(self.lines),
            columns: self.columns,
        })
    }

    fn pool_op(&mut self, opcode: u8, entry: ConstantEntry) -> &mut Self {
        let Some(index) = self.intern(entry) else {
            return self;
        };
        self.code.push(opcode);
        self.code.extend_from_slice(&index.to_be_bytes());
        self
    }

    fn pad4(&mut self) {
        while self.code.len() % 4 != 0 {
            self.code.push(0);
        }
    }

    fn intern(&mut self, entry: ConstantEntry) -> Option<u16> {
        match self.pool.intern(entry) {
            Ok(index) => Some(index),
            Err(err) => {
                self.fail(err);
                None
            }
        }
    }

    fn fail(&mut self, err: BytecodeError) {
        self.error.get_or_insert(ListingError::Bytecode(err));
    }

    fn fail_descriptor(&mut self, source: DescriptorError) {
        self.error
            .get_or_insert(ListingError::Descriptor { line: 0, source });
    }
}

/// Assemble a textual listing into a method body, interning references into
/// `pool`.
pub fn parse_listing(text: &str, pool: &mut ConstantPool) -> Result<MethodBody, ListingError> {
    let mut builder = CodeBuilder::new(pool);
    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let content = raw.split("//").next().unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }
        let mut tokens = content.split_whitespace();
        let Some(mnemonic) = tokens.next() else {
            continue;
        };
        let operands: Vec<&str> = tokens.collect();
        assemble_line(&mut builder, line_no, mnemonic, &operands)?;
        if let Some(ListingError::Descriptor { line, .. }) = builder.error.as_mut() {
            if *line == 0 {
                *line = line_no;
            }
        }
    }
    builder.finish()
}

fn assemble_line(
    builder: &mut CodeBuilder<'_>,
    line: usize,
    mnemonic: &str,
    operands: &[&str],
) -> Result<(), ListingError> {
    let lower = mnemonic.to_ascii_lowercase();
    if let Some(opcode) = simple_opcode(&lower) {
        expect_operands(line, &lower, operands, 0)?;
        builder.op(opcode);
        return Ok(());
    }
    match lower.as_str() {
        "line" | "column" => {
            expect_operands(line, &lower, operands, 1)?;
            let value = parse_number::<u32>(line, operands[0])?;
            if lower == "line" {
                builder.line(value);
            } else {
                builder.column(value);
            }
        }
        "iconst" | "bipush" | "sipush" => {
            expect_operands(line, &lower, operands, 1)?;
            builder.iconst(parse_number::<i32>(line, operands[0])?);
        }
        "iload" | "lload" | "fload" | "dload" | "aload" | "istore" | "lstore" | "fstore"
        | "dstore" | "astore" => {
            expect_operands(line, &lower, operands, 1)?;
            let base = local_base(&lower);
            builder.local(base, parse_number::<u16>(line, operands[0])?);
        }
        "iinc" => {
            expect_operands(line, &lower, operands, 2)?;
            let local = parse_number::<u16>(line, operands[0])?;
            let delta = parse_number::<i16>(line, operands[1])?;
            builder.iinc(local, delta);
        }
        "goto" | "ifeq" | "ifne" | "ifnull" | "ifnonnull" => {
            expect_operands(line, &lower, operands, 1)?;
            let opcode = match lower.as_str() {
                "goto" => opcode::GOTO,
                "ifeq" => opcode::IFEQ,
                "ifne" => opcode::IFEQ + 1,
                "ifnull" => opcode::IFNULL,
                _ => opcode::IFNONNULL,
            };
            builder.branch(opcode, parse_number::<i16>(line, operands[0])?);
        }
        "new" | "checkcast" | "instanceof" | "anewarray" => {
            expect_operands(line, &lower, operands, 1)?;
            let opcode = match lower.as_str() {
                "new" => opcode::NEW,
                "checkcast" => opcode::CHECKCAST,
                "instanceof" => opcode::INSTANCEOF,
                _ => opcode::ANEWARRAY,
            };
            builder.class_op(opcode, operands[0]);
        }
        "getstatic" | "putstatic" | "getfield" | "putfield" => {
            expect_operands(line, &lower, operands, 2)?;
            let (owner, name) = split_member(line, operands[0])?;
            let opcode = match lower.as_str() {
                "getstatic" => opcode::GETSTATIC,
                "putstatic" => opcode::PUTSTATIC,
                "getfield" => opcode::GETFIELD,
                _ => opcode::PUTFIELD,
            };
            let field = FieldRef {
                owner: owner.into(),
                name: name.into(),
                descriptor: operands[1].into(),
            };
            builder.field(opcode, field);
        }
        "invokevirtual" | "invokespecial" | "invokestatic" | "invokeinterface" => {
            expect_operands(line, &lower, operands, 2)?;
            let (owner, name) = split_member(line, operands[0])?;
            MethodDescriptor::parse(operands[1])
                .map_err(|source| ListingError::Descriptor { line, source })?;
            let kind = match lower.as_str() {
                "invokevirtual" => InvokeKind::Virtual,
                "invokespecial" => InvokeKind::Special,
                "invokestatic" => InvokeKind::Static,
                _ => InvokeKind::Interface,
            };
            builder.invoke(kind, MethodRef::new(owner, name, operands[1]));
        }
        "invokedynamic" => {
            expect_operands(line, &lower, operands, 2)?;
            builder.invoke_dynamic(operands[0], operands[1]);
        }
        _ => {
            return Err(ListingError::UnknownMnemonic {
                line,
                mnemonic: mnemonic.into(),
            })
        }
    }
    Ok(())
}

fn simple_opcode(mnemonic: &str) -> Option<u8> {
    let opcode = match mnemonic {
        "nop" => opcode::NOP,
        "aconst_null" => opcode::ACONST_NULL,
        "pop" => opcode::POP,
        "pop2" => opcode::POP + 1,
        "dup" => opcode::DUP,
        "swap" => 0x5F,
        "iadd" => 0x60,
        "isub" => 0x64,
        "imul" => 0x68,
        "ireturn" => opcode::IRETURN,
        "lreturn" => opcode::IRETURN + 1,
        "areturn" => opcode::ARETURN,
        "return" => opcode::RETURN,
        "arraylength" => 0xBE,
        "athrow" => opcode::ATHROW,
        "monitorenter" => 0xC2,
        "monitorexit" => 0xC3,
        _ => return None,
    };
    Some(opcode)
}

fn local_base(mnemonic: &str) -> u8 {
    let offset = match mnemonic.as_bytes()[0] {
        b'i' => 0,
        b'l' => 1,
        b'f' => 2,
        b'd' => 3,
        _ => 4,
    };
    if mnemonic.ends_with("load") {
        opcode::ILOAD + offset
    } else {
        opcode::ISTORE + offset
    }
}

fn expect_operands(
    line: usize,
    mnemonic: &str,
    operands: &[&str],
    count: usize,
) -> Result<(), ListingError> {
    if operands.len() == count {
        return Ok(());
    }
    Err(ListingError::InvalidOperand {
        line,
        message: SmolStr::new(format!(
            "{mnemonic} takes {count} operand(s), found {}",
            operands.len()
        )),
    })
}

fn parse_number<T: std::str::FromStr>(line: usize, text: &str) -> Result<T, ListingError> {
    text.parse().map_err(|_| ListingError::InvalidOperand {
        line,
        message: SmolStr::new(format!("invalid number '{text}'")),
    })
}

fn split_member<'t>(line: usize, text: &'t str) -> Result<(&'t str, &'t str), ListingError> {
    match text.rsplit_once('.') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() => Ok((owner, name)),
        _ => Err(ListingError::InvalidOperand {
            line,
            message: SmolStr::new(format!("expected Owner.member, found '{text}'")),
        }),
    }
}
