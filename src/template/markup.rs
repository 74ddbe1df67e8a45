//! Recursive descent parser for the template markup.
//!
//! The markup is a small XML-like subset: elements, quoted attributes, text
//! content, and self-closing tags. No entities, comments, namespaces, or
//! processing instructions. Text content is whitespace-normalized.

use super::ast::{ContainerKind, Element, LeafKind, TemplateNode};

pub const DEFAULT_GAP: f64 = 30.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MarkupError {
    #[error("unexpected end of markup")]
    UnexpectedEnd,
    #[error("unexpected '{found}' at byte {pos}, expected {expected}")]
    Unexpected { found: char, pos: usize, expected: &'static str },
    #[error("closing </{close}> does not match <{open}>")]
    MismatchedClose { open: String, close: String },
    #[error("trailing content at byte {pos}")]
    TrailingContent { pos: usize },
    #[error("root element must be <template>, found <{0}>")]
    NotATemplate(String),
    #[error("template has no content")]
    EmptyTemplate,
    #[error("unknown element <{0}>")]
    UnknownTag(String),
    #[error("<{tag}> requires attribute '{attr}'")]
    MissingAttr { tag: String, attr: &'static str },
}

impl crate::error::ErrorCode for MarkupError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnexpectedEnd | Self::Unexpected { .. } | Self::MismatchedClose { .. } | Self::TrailingContent { .. } => {
                "E_MARKUP_SYNTAX"
            }
            Self::NotATemplate(_) | Self::EmptyTemplate => "E_MARKUP_ROOT",
            Self::UnknownTag(_) => "E_MARKUP_UNKNOWN_TAG",
            Self::MissingAttr { .. } => "E_MARKUP_MISSING_ATTR",
        }
    }
}

// =============================================================================
// SYNTAX
// =============================================================================

/// Parse markup text into an element tree.
///
/// # Errors
///
/// Returns a [`MarkupError`] describing the first syntax problem.
pub fn parse_markup(input: &str) -> Result<Element, MarkupError> {
    let mut parser = Parser { src: input, pos: 0 };
    parser.skip_ws();
    let root = parser.element()?;
    parser.skip_ws();
    if parser.pos < parser.src.len() {
        return Err(MarkupError::TrailingContent { pos: parser.pos });
    }
    Ok(root)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn rest(&self) -> &str {
        &self.src[self.pos..]
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek().filter(|c| c.is_whitespace()) {
            self.pos += c.len_utf8();
        }
    }

    fn expect_char(&mut self, want: char, expected: &'static str) -> Result<(), MarkupError> {
        match self.bump() {
            Some(c) if c == want => Ok(()),
            Some(found) => Err(MarkupError::Unexpected { found, pos: self.pos - found.len_utf8(), expected }),
            None => Err(MarkupError::UnexpectedEnd),
        }
    }

    fn name(&mut self) -> Result<String, MarkupError> {
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            Some(found) => return Err(MarkupError::Unexpected { found, pos: self.pos, expected: "a name" }),
            None => return Err(MarkupError::UnexpectedEnd),
        }
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        {
            self.pos += 1;
        }
        Ok(self.src[start..self.pos].to_owned())
    }

    fn quoted(&mut self) -> Result<String, MarkupError> {
        let quote = match self.bump() {
            Some(q @ ('"' | '\'')) => q,
            Some(found) => {
                return Err(MarkupError::Unexpected { found, pos: self.pos - found.len_utf8(), expected: "a quote" });
            }
            None => return Err(MarkupError::UnexpectedEnd),
        };
        let start = self.pos;
        let len = self.rest().find(quote).ok_or(MarkupError::UnexpectedEnd)?;
        self.pos += len + 1;
        Ok(self.src[start..start + len].to_owned())
    }

    fn element(&mut self) -> Result<Element, MarkupError> {
        self.expect_char('<', "'<'")?;
        let mut el = Element::new(self.name()?);

        loop {
            self.skip_ws();
            match self.peek() {
                Some('/') => {
                    self.pos += 1;
                    self.expect_char('>', "'>'")?;
                    return Ok(el);
                }
                Some('>') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => {
                    let key = self.name()?;
                    self.skip_ws();
                    self.expect_char('=', "'='")?;
                    self.skip_ws();
                    let value = self.quoted()?;
                    el.set_attr(&key, value);
                }
                None => return Err(MarkupError::UnexpectedEnd),
            }
        }

        let src = self.src;
        let mut text: Vec<&str> = Vec::new();
        loop {
            let rest = self.rest();
            if rest.is_empty() {
                return Err(MarkupError::UnexpectedEnd);
            }
            if rest.starts_with("</") {
                self.pos += 2;
                let close = self.name()?;
                self.skip_ws();
                self.expect_char('>', "'>'")?;
                if close != el.tag {
                    return Err(MarkupError::MismatchedClose { open: el.tag, close });
                }
                break;
            }
            if rest.starts_with('<') {
                el.children.push(self.element()?);
                continue;
            }
            let len = rest.find('<').unwrap_or(rest.len());
            text.push(&src[self.pos..self.pos + len]);
            self.pos += len;
        }
        el.text = text
            .iter()
            .flat_map(|t| t.split_whitespace())
            .collect::<Vec<_>>()
            .join(" ");
        Ok(el)
    }
}

// =============================================================================
// TYPED TREE
// =============================================================================

/// Convert a parsed `<template>` element into the layout tree.
///
/// A template (or frame) with several children lays them out as an implicit stack.
///
/// # Errors
///
/// Returns a [`MarkupError`] for a non-template root, an empty template, an
/// unknown element, or a connector missing its endpoints.
pub fn build_tree(root: &Element) -> Result<TemplateNode, MarkupError> {
    if root.tag != "template" {
        return Err(MarkupError::NotATemplate(root.tag.clone()));
    }
    wrap_children(&root.children)?.ok_or(MarkupError::EmptyTemplate)
}

fn wrap_children(children: &[Element]) -> Result<Option<TemplateNode>, MarkupError> {
    match children {
        [] => Ok(None),
        [only] => convert(only).map(Some),
        many => {
            let children = many.iter().map(convert).collect::<Result<Vec<_>, _>>()?;
            Ok(Some(TemplateNode::Container { kind: ContainerKind::Stack, children, gap: DEFAULT_GAP, cols: None }))
        }
    }
}

fn convert(el: &Element) -> Result<TemplateNode, MarkupError> {
    if let Some(kind) = LeafKind::from_tag(&el.tag) {
        return Ok(TemplateNode::Leaf {
            kind,
            width: positive(el.attr("w")),
            height: positive(el.attr("h")),
            text: el.text.clone(),
            color: el.attr("color").map(str::to_owned),
            key: el.attr("key").map(str::to_owned),
        });
    }
    if let Some(kind) = ContainerKind::from_tag(&el.tag) {
        let children = el.children.iter().map(convert).collect::<Result<Vec<_>, _>>()?;
        let gap = el
            .attr("gap")
            .and_then(|g| g.trim().parse::<f64>().ok())
            .filter(|g| g.is_finite() && *g >= 0.0)
            .unwrap_or(DEFAULT_GAP);
        let cols = match kind {
            ContainerKind::Grid => el
                .attr("cols")
                .and_then(|c| c.trim().parse::<usize>().ok())
                .filter(|c| *c > 0),
            ContainerKind::Row | ContainerKind::Stack => None,
        };
        return Ok(TemplateNode::Container { kind, children, gap, cols });
    }
    match el.tag.as_str() {
        "frame" => Ok(TemplateNode::Frame {
            title: el.attr("title").unwrap_or_default().to_owned(),
            color: el.attr("color").map(str::to_owned),
            child: wrap_children(&el.children)?.map(Box::new),
        }),
        "connector" => {
            let endpoint = |attr: &'static str| {
                el.attr(attr)
                    .map(str::to_owned)
                    .ok_or_else(|| MarkupError::MissingAttr { tag: el.tag.clone(), attr })
            };
            Ok(TemplateNode::Connector {
                from_key: endpoint("from")?,
                to_key: endpoint("to")?,
                style: el.attr("style").unwrap_or("arrow").to_owned(),
                color: el.attr("color").map(str::to_owned),
            })
        }
        other => Err(MarkupError::UnknownTag(other.to_owned())),
    }
}

/// Parse a size override; non-positive or unparseable values mean "use the default".
fn positive(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v > 0.0)
}

#[cfg(test)]
#[path = "markup_test.rs"]
mod tests;
