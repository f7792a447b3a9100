use std::fs;
use std::path::Path;
use std::str::FromStr;

use roxmltree::{Document, Node};

use super::error::{ContentError, ContentErrorCode, SourceLocation};

pub(crate) fn read_source(path: &Path) -> Result<String, ContentError> {
    fs::read_to_string(path).map_err(|error| {
        ContentError::without_location(
            ContentErrorCode::ReadFile,
            format!("failed to read file: {error}"),
            path,
        )
    })
}

pub(crate) fn parse_document<'input>(
    raw: &'input str,
    path: &Path,
) -> Result<Document<'input>, ContentError> {
    Document::parse(raw).map_err(|error| ContentError {
        code: ContentErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        file_path: path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })
}

/// Attribute and child lookups that report failures against one source file.
pub(crate) struct XmlFile<'a, 'input> {
    pub doc: &'a Document<'input>,
    pub path: &'a Path,
}

impl<'a, 'input> XmlFile<'a, 'input> {
    pub fn new(doc: &'a Document<'input>, path: &'a Path) -> Self {
        Self { doc, path }
    }

    pub fn error(&self, code: ContentErrorCode, message: String, node: Node<'_, '_>) -> ContentError {
        ContentError::at_node(code, message, self.path, self.doc, node)
    }

    pub fn root_named(&self, expected: &str) -> Result<Node<'a, 'input>, ContentError> {
        let root = self.doc.root_element();
        if root.tag_name().name() != expected {
            return Err(self.error(
                ContentErrorCode::InvalidRoot,
                format!(
                    "root element must be <{expected}>, found <{}>",
                    root.tag_name().name()
                ),
                root,
            ));
        }
        Ok(root)
    }

    pub fn required_attr<'n>(
        &self,
        node: Node<'n, 'input>,
        name: &str,
    ) -> Result<&'n str, ContentError> {
        node.attribute(name).ok_or_else(|| {
            self.error(
                ContentErrorCode::MissingAttribute,
                format!(
                    "<{}> is missing required attribute '{name}'",
                    node.tag_name().name()
                ),
                node,
            )
        })
    }

    /// Parses an optional attribute; present-but-malformed values are errors.
    pub fn parse_attr<T: FromStr>(
        &self,
        node: Node<'_, 'input>,
        name: &str,
        expected: &str,
    ) -> Result<Option<T>, ContentError> {
        let Some(raw) = node.attribute(name) else {
            return Ok(None);
        };
        raw.trim().parse::<T>().map(Some).map_err(|_| {
            self.error(
                ContentErrorCode::InvalidValue,
                format!(
                    "attribute '{name}' on <{}> must be {expected}, got '{raw}'",
                    node.tag_name().name()
                ),
                node,
            )
        })
    }

    pub fn required_parse<T: FromStr>(
        &self,
        node: Node<'_, 'input>,
        name: &str,
        expected: &str,
    ) -> Result<T, ContentError> {
        self.required_attr(node, name)?;
        self.parse_attr(node, name, expected)?.ok_or_else(|| {
            self.error(
                ContentErrorCode::MissingAttribute,
                format!(
                    "<{}> is missing required attribute '{name}'",
                    node.tag_name().name()
                ),
                node,
            )
        })
    }

    pub fn required_child(
        &self,
        parent: Node<'a, 'input>,
        tag: &str,
    ) -> Result<Node<'a, 'input>, ContentError> {
        child(parent, tag).ok_or_else(|| {
            self.error(
                ContentErrorCode::MissingElement,
                format!(
                    "<{}> is missing required element <{tag}>",
                    parent.tag_name().name()
                ),
                parent,
            )
        })
    }
}

pub(crate) fn child<'a, 'input>(parent: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    parent
        .children()
        .find(|node| node.is_element() && node.tag_name().name() == tag)
}

pub(crate) fn children<'a, 'input: 'a>(
    parent: Node<'a, 'input>,
    tag: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    parent
        .children()
        .filter(move |node| node.is_element() && node.tag_name().name() == tag)
}
