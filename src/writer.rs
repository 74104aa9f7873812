use indexmap::IndexSet;

use crate::bytecode::OperationCode;
use crate::encoding;
use crate::error::CompileError;
use crate::source::{Identifier, SourcePosition};
use crate::translation::{translation_key, TranslationTable};

/// `"VNSB"` read as a little-endian u32.
pub const MAGIC: u32 = u32::from_le_bytes(*b"VNSB");

/// Largest code distance one position record can cover.
pub const MAX_POSITION_DELTA: usize = u8::MAX as usize;

#[derive(Debug, Clone, Copy)]
struct Label {
    position: SourcePosition,
    offset: Option<u32>,
}

#[derive(Debug, Clone, Copy)]
struct PositionRecord {
    delta: u8,
    position: SourcePosition,
}

/// Accumulates the code buffer and its side tables for one compile and serializes
/// them into an artifact.
pub struct BinaryWriter {
    identifier: Identifier,
    code: Vec<u8>,
    strings: IndexSet<String>,
    labels: Vec<Label>,
    positions: Vec<PositionRecord>,
    last_position: Option<SourcePosition>,
    last_record_offset: usize,
    translations: TranslationTable,
    translation_count: u32,
}

impl BinaryWriter {
    pub fn new(identifier: &Identifier) -> Self {
        Self {
            identifier: identifier.clone(),
            code: Vec::new(),
            strings: IndexSet::new(),
            labels: Vec::new(),
            positions: Vec::new(),
            last_position: None,
            last_record_offset: 0,
            translations: TranslationTable::default(),
            translation_count: 0,
        }
    }

    pub fn set_language(&mut self, language: &str) {
        self.translations.language = language.to_string();
    }

    pub fn write_op(&mut self, operation: OperationCode, position: SourcePosition) {
        self.record_position(position);
        self.code.push(operation as u8);
    }

    fn record_position(&mut self, position: SourcePosition) {
        if self.last_position == Some(position) {
            return;
        }

        let mut delta = self.code.len() - self.last_record_offset;
        if let Some(previous) = self.last_position {
            while delta > MAX_POSITION_DELTA {
                self.positions.push(PositionRecord {
                    delta: u8::MAX,
                    position: previous,
                });
                delta -= MAX_POSITION_DELTA;
            }
        }

        self.positions.push(PositionRecord {
            delta: delta as u8,
            position,
        });
        self.last_record_offset = self.code.len();
        self.last_position = Some(position);
    }

    pub fn write_index(&mut self, index: u32) {
        encoding::write_7bit(&mut self.code, index);
    }

    pub fn write_integer(&mut self, value: i32) {
        encoding::write_i32(&mut self.code, value);
    }

    pub fn write_float(&mut self, value: f32) {
        encoding::write_f32(&mut self.code, value);
    }

    pub fn write_key(&mut self, key: u32) {
        encoding::write_u32(&mut self.code, key);
    }

    /// Index of `value` in the string pool. Equal strings share one entry.
    pub fn add_string(&mut self, value: &str) -> u32 {
        match self.strings.get_index_of(value) {
            Some(index) => index as u32,
            None => self.strings.insert_full(value.to_string()).0 as u32,
        }
    }

    /// Registers one translatable literal. Every occurrence gets its own key, even
    /// when the text repeats. The occurrence index must fit in the key's upper 16 bits.
    pub fn add_translation(&mut self, text: &str, position: SourcePosition) -> Result<u32, CompileError> {
        if self.translation_count > u32::from(u16::MAX) {
            return Err(CompileError::new(
                &self.identifier,
                position,
                format!(
                    "too many translatable literals (at most {} per script)",
                    u32::from(u16::MAX) + 1
                ),
            ));
        }
        let key = translation_key(self.translation_count, text);
        self.translation_count += 1;
        self.translations.insert(key, text);
        Ok(key)
    }

    pub fn create_label(&mut self, position: SourcePosition) -> u32 {
        self.labels.push(Label {
            position,
            offset: None,
        });
        (self.labels.len() - 1) as u32
    }

    /// Binds `id` to the current end of the code buffer.
    pub fn define_label(&mut self, id: u32) -> Result<(), CompileError> {
        let offset = self.code.len() as u32;
        let label = self.labels.get_mut(id as usize).ok_or_else(|| {
            CompileError::new(
                &self.identifier,
                SourcePosition::default(),
                format!("label {} was never created", id),
            )
        })?;

        if label.offset.is_some() {
            return Err(CompileError::new(
                &self.identifier,
                label.position,
                format!("label {} is defined twice", id),
            ));
        }
        label.offset = Some(offset);
        log::trace!("{}: label {} at offset {}", self.identifier.name, id, offset);
        Ok(())
    }

    /// Serializes the artifact and hands back the translation table collected
    /// while writing.
    pub fn finish(self, hash: u32) -> Result<(Vec<u8>, TranslationTable), CompileError> {
        let mut out = Vec::with_capacity(self.code.len() + 64);
        encoding::write_u32(&mut out, MAGIC);
        encoding::write_u32(&mut out, hash);

        self.translations.write_segment(&mut out);

        encoding::write_7bit(&mut out, self.strings.len() as u32);
        for value in &self.strings {
            encoding::write_string(&mut out, value);
        }

        encoding::write_7bit(&mut out, self.labels.len() as u32);
        for (id, label) in self.labels.iter().enumerate() {
            let offset = label.offset.ok_or_else(|| {
                CompileError::new(
                    &self.identifier,
                    label.position,
                    format!("label {} is never defined", id),
                )
            })?;
            encoding::write_7bit(&mut out, id as u32);
            encoding::write_7bit(&mut out, offset);
            encoding::write_7bit(&mut out, label.position.line);
            encoding::write_7bit(&mut out, label.position.column);
        }

        encoding::write_7bit(&mut out, self.positions.len() as u32);
        for record in &self.positions {
            out.push(record.delta);
            encoding::write_7bit(&mut out, record.position.line);
            encoding::write_7bit(&mut out, record.position.column);
        }

        out.extend_from_slice(&self.code);

        log::debug!(
            "{}: {} byte(s) of code, {} label(s), {} string(s), {} translation(s)",
            self.identifier.name,
            self.code.len(),
            self.labels.len(),
            self.strings.len(),
            self.translations.len()
        );
        Ok((out, self.translations))
    }
}
