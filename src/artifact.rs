use std::fmt::Write;

use crate::bytecode::{Operand, OperationCode};
use crate::encoding::ByteReader;
use crate::error::FormatError;
use crate::source::SourcePosition;
use crate::translation::{TranslationTable, DEFAULT_LANGUAGE};
use crate::writer::MAGIC;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelRecord {
    pub id: u32,
    pub offset: u32,
    pub position: SourcePosition,
}

/// Source position attributed to the code from `offset` up to the next record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionRecord {
    pub offset: usize,
    pub position: SourcePosition,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OperandValue {
    None,
    Index(u32),
    Integer(i32),
    Float(f32),
    Key(u32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Instruction {
    pub offset: usize,
    pub operation: OperationCode,
    pub operand: OperandValue,
}

/// A compiled script read back into its segments.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub hash: u32,
    pub translations: TranslationTable,
    pub strings: Vec<String>,
    pub labels: Vec<LabelRecord>,
    pub positions: Vec<PositionRecord>,
    pub code: Vec<u8>,
}

impl Artifact {
    pub fn from_bytes(data: &[u8]) -> Result<Self, FormatError> {
        let mut reader = ByteReader::new(data);

        let magic = reader.read_u32("magic")?;
        if magic != MAGIC {
            return Err(FormatError::InvalidMagic(magic));
        }
        let hash = reader.read_u32("source hash")?;

        let translations = TranslationTable::read_segment(&mut reader, DEFAULT_LANGUAGE)?;

        let count = reader.read_7bit("string count")?;
        let mut strings = Vec::new();
        for _ in 0..count {
            strings.push(reader.read_string("string")?);
        }

        let count = reader.read_7bit("label count")?;
        let mut labels = Vec::new();
        for _ in 0..count {
            let id = reader.read_7bit("label id")?;
            let offset = reader.read_7bit("label offset")?;
            let line = reader.read_7bit("label line")?;
            let column = reader.read_7bit("label column")?;
            labels.push(LabelRecord {
                id,
                offset,
                position: SourcePosition::new(line, column),
            });
        }

        let count = reader.read_7bit("position count")?;
        let mut positions = Vec::new();
        let mut offset = 0;
        for _ in 0..count {
            offset += reader.read_u8("position delta")? as usize;
            let line = reader.read_7bit("position line")?;
            let column = reader.read_7bit("position column")?;
            positions.push(PositionRecord {
                offset,
                position: SourcePosition::new(line, column),
            });
        }

        let code = reader.read_bytes(reader.remaining(), "code")?.to_vec();

        Ok(Self {
            hash,
            translations,
            strings,
            labels,
            positions,
            code,
        })
    }

    /// Decodes the code segment front to back.
    pub fn instructions(&self) -> Result<Vec<Instruction>, FormatError> {
        let mut reader = ByteReader::new(&self.code);
        let mut instructions = Vec::new();

        while reader.remaining() > 0 {
            let offset = reader.offset();
            let byte = reader.read_u8("opcode")?;
            let operation = OperationCode::from_byte(byte)
                .ok_or(FormatError::UnknownOpcode { opcode: byte, offset })?;

            let operand = match operation.operand() {
                Operand::None => OperandValue::None,
                Operand::Index => OperandValue::Index(reader.read_7bit("operand index")?),
                Operand::Integer => OperandValue::Integer(reader.read_i32("integer operand")?),
                Operand::Float => OperandValue::Float(reader.read_f32("float operand")?),
                Operand::Key => OperandValue::Key(reader.read_u32("translation key")?),
            };

            instructions.push(Instruction {
                offset,
                operation,
                operand,
            });
        }

        Ok(instructions)
    }

    pub fn position_at(&self, offset: usize) -> Option<SourcePosition> {
        let index = self.positions.partition_point(|record| record.offset <= offset);
        index.checked_sub(1).map(|index| self.positions[index].position)
    }

    fn labels_at(&self, offset: usize) -> Vec<u32> {
        let mut ids: Vec<u32> = self
            .labels
            .iter()
            .filter(|label| label.offset as usize == offset)
            .map(|label| label.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    fn string(&self, index: u32) -> String {
        match self.strings.get(index as usize) {
            Some(value) => format!("{:?}", value),
            None => format!("#{}", index),
        }
    }

    /// One instruction with its operand resolved against the pools.
    pub fn render(&self, instruction: &Instruction) -> String {
        let name = format!("{:?}", instruction.operation);
        match instruction.operand {
            OperandValue::None => name,
            OperandValue::Index(id) if instruction.operation.is_branch() => {
                format!("{} L{}", name, id)
            }
            OperandValue::Index(id) if instruction.operation == OperationCode::LoadFunction => {
                format!("{} L{}", name, id)
            }
            OperandValue::Index(index) => format!("{} {}", name, self.string(index)),
            OperandValue::Integer(value) => format!("{} {}", name, value),
            OperandValue::Float(value) => format!("{} {:?}", name, value),
            OperandValue::Key(key) => match self.translations.get(key) {
                Some(text) => format!("{} 0x{:08X} {:?}", name, key, text),
                None => format!("{} 0x{:08X}", name, key),
            },
        }
    }

    /// Label markers and rendered instructions in code order.
    pub fn listing(&self) -> Result<Vec<String>, FormatError> {
        let mut lines = Vec::new();
        for instruction in self.instructions()? {
            for id in self.labels_at(instruction.offset) {
                lines.push(format!("L{}:", id));
            }
            lines.push(self.render(&instruction));
        }
        for id in self.labels_at(self.code.len()) {
            lines.push(format!("L{}:", id));
        }
        Ok(lines)
    }

    /// Human-readable dump with code offsets and source positions.
    pub fn disassemble(&self) -> Result<String, FormatError> {
        let mut out = String::new();
        let _ = writeln!(out, "; hash {:08X}", self.hash);
        let _ = writeln!(
            out,
            "; {} string(s), {} label(s), {} translation(s), {} byte(s) of code",
            self.strings.len(),
            self.labels.len(),
            self.translations.len(),
            self.code.len()
        );

        for instruction in self.instructions()? {
            for id in self.labels_at(instruction.offset) {
                let _ = writeln!(out, "L{}:", id);
            }
            let position = self
                .position_at(instruction.offset)
                .map(|position| position.to_string())
                .unwrap_or_default();
            let _ = writeln!(
                out,
                "  {:04}  {:<40} ; {}",
                instruction.offset,
                self.render(&instruction),
                position
            );
        }
        for id in self.labels_at(self.code.len()) {
            let _ = writeln!(out, "L{}:", id);
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Identifier;
    use crate::writer::BinaryWriter;
    use pretty_assertions::assert_eq;

    fn sample() -> Vec<u8> {
        let mut writer = BinaryWriter::new(&Identifier::new("sample.vns", 0xABCD));
        let top = writer.create_label(SourcePosition::new(0, 0));
        writer.define_label(top).unwrap();
        writer.write_op(OperationCode::PushInteger, SourcePosition::new(0, 0));
        writer.write_integer(1_000);
        let name = writer.add_string("hero");
        writer.write_op(OperationCode::StoreVariable, SourcePosition::new(0, 4));
        writer.write_index(name);
        writer.write_op(OperationCode::Branch, SourcePosition::new(1, 0));
        writer.write_index(top);
        writer.finish(0xABCD).unwrap().0
    }

    #[test]
    fn test_read_back_segments() {
        let artifact = Artifact::from_bytes(&sample()).unwrap();
        assert_eq!(artifact.hash, 0xABCD);
        assert_eq!(artifact.strings, vec!["hero".to_string()]);
        assert_eq!(
            artifact.labels,
            vec![LabelRecord {
                id: 0,
                offset: 0,
                position: SourcePosition::new(0, 0)
            }]
        );
        assert_eq!(artifact.position_at(0), Some(SourcePosition::new(0, 0)));
        assert_eq!(artifact.position_at(5), Some(SourcePosition::new(0, 4)));
        assert_eq!(artifact.position_at(7), Some(SourcePosition::new(1, 0)));
    }

    #[test]
    fn test_listing() {
        let artifact = Artifact::from_bytes(&sample()).unwrap();
        assert_eq!(
            artifact.listing().unwrap(),
            vec![
                "L0:".to_string(),
                "PushInteger 1000".to_string(),
                "StoreVariable \"hero\"".to_string(),
                "Branch L0".to_string(),
            ]
        );
        let text = artifact.disassemble().unwrap();
        assert!(text.starts_with("; hash 0000ABCD\n"));
        assert!(text.contains("  0005  StoreVariable \"hero\""));
    }

    #[test]
    fn test_rejects_bad_input() {
        let mut bytes = sample();
        bytes[0] = b'X';
        assert!(matches!(
            Artifact::from_bytes(&bytes),
            Err(FormatError::InvalidMagic(_))
        ));

        let bytes = sample();
        assert_eq!(
            Artifact::from_bytes(&bytes[..6]),
            Err(FormatError::Truncated("source hash"))
        );

        let mut bytes = sample();
        bytes.push(0xF0);
        let artifact = Artifact::from_bytes(&bytes).unwrap();
        assert!(matches!(
            artifact.instructions(),
            Err(FormatError::UnknownOpcode { opcode: 0xF0, offset: 9 })
        ));
    }
}
