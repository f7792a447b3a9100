use std::fmt;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentErrorCode {
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    MissingElement,
    MissingAttribute,
    InvalidValue,
    DuplicateName,
    UnknownScreen,
    MissingStartScreen,
    TileCountMismatch,
}

/// A content file that could not be turned into runtime data.
///
/// Always names the file; carries a line/column when the problem can be pinned
/// to an element.
#[derive(Debug, Clone)]
pub struct ContentError {
    pub code: ContentErrorCode,
    pub message: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl ContentError {
    pub(crate) fn without_location(
        code: ContentErrorCode,
        message: String,
        file_path: &Path,
    ) -> Self {
        Self {
            code,
            message,
            file_path: file_path.to_path_buf(),
            location: None,
        }
    }

    pub(crate) fn at_node(
        code: ContentErrorCode,
        message: String,
        file_path: &Path,
        doc: &Document<'_>,
        node: Node<'_, '_>,
    ) -> Self {
        let pos = doc.text_pos_at(node.range().start);
        Self {
            code,
            message,
            file_path: file_path.to_path_buf(),
            location: Some(SourceLocation {
                line: pos.row as usize,
                column: pos.col as usize,
            }),
        }
    }
}

impl fmt::Display for ContentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (file={}, line={}, column={})",
                self.code,
                self.message,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (file={})",
                self.code,
                self.message,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for ContentError {}
