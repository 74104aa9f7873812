use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::encoding::{self, ByteReader};
use crate::error::FormatError;

pub const DEFAULT_LANGUAGE: &str = "default";

/// CRC-16/ARC of the UTF-8 bytes of `text`.
pub fn crc16(text: &str) -> u16 {
    let mut crc: u16 = 0;
    for byte in text.bytes() {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            crc = if crc & 1 != 0 { (crc >> 1) ^ 0xA001 } else { crc >> 1 };
        }
    }
    crc
}

/// Key of the `occurrence`-th translatable literal of a script.
pub fn translation_key(occurrence: u32, text: &str) -> u32 {
    (occurrence << 16) | u32::from(crc16(text))
}

/// Translatable literals of one script, keyed by `(occurrence << 16) | crc16(text)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationTable {
    pub language: String,
    pub entries: IndexMap<u32, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MergeReport {
    pub kept: usize,
    pub added: usize,
    pub removed: usize,
}

impl Default for TranslationTable {
    fn default() -> Self {
        Self::new(DEFAULT_LANGUAGE)
    }
}

impl TranslationTable {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            entries: IndexMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: u32) -> Option<&str> {
        self.entries.get(&key).map(String::as_str)
    }

    pub fn insert(&mut self, key: u32, text: impl Into<String>) {
        self.entries.insert(key, text.into());
    }

    /// Writes the entries in artifact segment layout: count, then (u32 key, string) pairs.
    pub fn write_segment(&self, out: &mut Vec<u8>) {
        encoding::write_7bit(out, self.entries.len() as u32);
        for (key, text) in &self.entries {
            encoding::write_u32(out, *key);
            encoding::write_string(out, text);
        }
    }

    pub fn read_segment(reader: &mut ByteReader, language: &str) -> Result<Self, FormatError> {
        let count = reader.read_7bit("translation count")?;
        let mut table = Self::new(language);
        for _ in 0..count {
            let key = reader.read_u32("translation key")?;
            let text = reader.read_string("translation text")?;
            table.entries.insert(key, text);
        }
        Ok(table)
    }

    /// Standalone form: the language followed by the segment layout.
    pub fn pack(&self) -> Vec<u8> {
        let mut out = Vec::new();
        encoding::write_string(&mut out, &self.language);
        self.write_segment(&mut out);
        out
    }

    pub fn unpack(data: &[u8]) -> Result<Self, FormatError> {
        let mut reader = ByteReader::new(data);
        let language = reader.read_string("translation language")?;
        Self::read_segment(&mut reader, &language)
    }

    /// Brings an edited table up to date with a freshly compiled one. Texts of keys present
    /// in both are kept, new keys take the compiled source text and keys the script no
    /// longer has are dropped. The result follows the compiled order.
    pub fn merge(&mut self, compiled: &TranslationTable) -> MergeReport {
        let mut report = MergeReport::default();
        let mut merged = IndexMap::with_capacity(compiled.entries.len());

        for (key, source_text) in &compiled.entries {
            match self.entries.get(key) {
                Some(existing) => {
                    merged.insert(*key, existing.clone());
                    report.kept += 1;
                }
                None => {
                    merged.insert(*key, source_text.clone());
                    report.added += 1;
                }
            }
        }

        report.removed = self
            .entries
            .keys()
            .filter(|key| !compiled.entries.contains_key(*key))
            .count();
        self.entries = merged;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_crc16_check_value() {
        assert_eq!(crc16("123456789"), 0xBB3D);
        assert_eq!(crc16(""), 0);
    }

    #[test]
    fn test_key_layout() {
        let key = translation_key(3, "Hello");
        assert_eq!(key >> 16, 3);
        assert_eq!(key & 0xFFFF, u32::from(crc16("Hello")));
        assert_ne!(translation_key(0, "Hello"), translation_key(1, "Hello"));
    }

    #[test]
    fn test_pack_unpack() {
        let mut table = TranslationTable::new("ja");
        table.insert(translation_key(0, "Hi"), "Hi");
        table.insert(translation_key(1, "Bye"), "Bye");

        let restored = TranslationTable::unpack(&table.pack()).unwrap();
        assert_eq!(restored, table);
    }

    #[test]
    fn test_unpack_truncated() {
        let mut table = TranslationTable::new("en");
        table.insert(1, "text");
        let packed = table.pack();
        assert!(TranslationTable::unpack(&packed[..packed.len() - 1]).is_err());
    }

    #[test]
    fn test_merge_keeps_edits() {
        let mut edited = TranslationTable::new("fr");
        edited.insert(translation_key(0, "Hello"), "Bonjour");
        edited.insert(translation_key(1, "Old line"), "Vieille ligne");

        let mut compiled = TranslationTable::new("fr");
        compiled.insert(translation_key(0, "Hello"), "Hello");
        compiled.insert(translation_key(1, "New line"), "New line");

        let report = edited.merge(&compiled);
        assert_eq!(
            report,
            MergeReport {
                kept: 1,
                added: 1,
                removed: 1
            }
        );
        assert_eq!(edited.get(translation_key(0, "Hello")), Some("Bonjour"));
        assert_eq!(edited.get(translation_key(1, "New line")), Some("New line"));
        assert_eq!(edited.get(translation_key(1, "Old line")), None);
    }
}
