use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Zero-based location of a character in a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct SourcePosition {
    pub line: u32,
    pub column: u32,
}

impl SourcePosition {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Names a compilation unit. The hash is embedded in the compiled artifact so the
/// runtime can match a binary against the source it was built from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    pub name: String,
    pub hash: u32,
}

impl Identifier {
    pub fn new(name: impl Into<String>, hash: u32) -> Self {
        Self {
            name: name.into(),
            hash,
        }
    }

    /// Builds an identifier for a file on disk, hashing the path as written.
    pub fn from_path(path: &Path) -> Self {
        let name = path.to_string_lossy().replace('\\', "/");
        let hash = crc32fast::hash(name.as_bytes());
        Self { name, hash }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}[{:08X}]", self.name, self.hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_identifier_from_path_is_stable() {
        let first = Identifier::from_path(&PathBuf::from("scripts/intro.vns"));
        let second = Identifier::from_path(&PathBuf::from("scripts\\intro.vns"));
        assert_eq!(first, second);
        assert_eq!(first.name, "scripts/intro.vns");
    }

    #[test]
    fn test_identifier_display() {
        let id = Identifier::new("intro", 0xAB);
        assert_eq!(id.to_string(), "intro[000000AB]");
    }
}
