//! Path-addressed edits to a parsed template.
//!
//! Path syntax: `seg(/seg)*[/@attr]` with `seg = tag | tag[N]` (1-indexed).
//! The first segment matches the Nth descendant of the root in document
//! order; each later segment matches the Nth direct child of the previous
//! match. Without `/@attr` the patch replaces the element's text.
//!
//! A path that fails to parse or resolve skips that patch and nothing else.

use tracing::debug;

use super::ast::Element;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub tag: String,
    /// 1-based position among matching elements.
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchPath {
    pub segments: Vec<PathSegment>,
    pub attr: Option<String>,
}

/// A resolved element plus the attribute to write, or `None` for text content.
#[derive(Debug)]
pub struct PatchTarget<'a> {
    pub element: &'a mut Element,
    pub attr: Option<String>,
}

impl PatchTarget<'_> {
    pub fn set(self, value: &str) {
        match self.attr {
            Some(attr) => self.element.set_attr(&attr, value),
            None => value.clone_into(&mut self.element.text),
        }
    }
}

// =============================================================================
// PARSE
// =============================================================================

/// Parse a patch path. `None` for anything malformed.
#[must_use]
pub fn parse_path(path: &str) -> Option<PatchPath> {
    let mut parts: Vec<&str> = path.trim().split('/').collect();
    let attr = match parts.last() {
        Some(last) if last.starts_with('@') => {
            let name = &last[1..];
            if name.is_empty() {
                return None;
            }
            let name = name.to_owned();
            parts.pop();
            Some(name)
        }
        _ => None,
    };
    if parts.is_empty() {
        return None;
    }
    let segments = parts.into_iter().map(parse_segment).collect::<Option<Vec<_>>>()?;
    Some(PatchPath { segments, attr })
}

fn parse_segment(seg: &str) -> Option<PathSegment> {
    let (tag, index) = match seg.split_once('[') {
        Some((tag, rest)) => {
            let n = rest.strip_suffix(']')?.trim().parse::<usize>().ok()?;
            (tag, n)
        }
        None => (seg, 1),
    };
    let tag = tag.trim();
    if tag.is_empty() || index == 0 {
        return None;
    }
    Some(PathSegment { tag: tag.to_owned(), index })
}

// =============================================================================
// RESOLVE
// =============================================================================

/// Resolve `path` against `root`. `None` when any segment has no match.
pub fn resolve<'a>(root: &'a mut Element, path: &PatchPath) -> Option<PatchTarget<'a>> {
    let (first, rest) = path.segments.split_first()?;

    let mut route = Vec::new();
    let mut seen = 0;
    if !find_descendant(root, first, &mut seen, &mut route) {
        return None;
    }

    let mut node: &Element = root;
    for &i in &route {
        node = &node.children[i];
    }
    for seg in rest {
        let i = node
            .children
            .iter()
            .enumerate()
            .filter(|(_, c)| c.tag == seg.tag)
            .nth(seg.index - 1)
            .map(|(i, _)| i)?;
        route.push(i);
        node = &node.children[i];
    }

    let mut element = root;
    for i in route {
        element = &mut element.children[i];
    }
    Some(PatchTarget { element, attr: path.attr.clone() })
}

/// Pre-order search below `node` (excluding `node`) for the `seg.index`-th `seg.tag`.
fn find_descendant(node: &Element, seg: &PathSegment, seen: &mut usize, route: &mut Vec<usize>) -> bool {
    for (i, child) in node.children.iter().enumerate() {
        route.push(i);
        if child.tag == seg.tag {
            *seen += 1;
            if *seen == seg.index {
                return true;
            }
        }
        if find_descendant(child, seg, seen, route) {
            return true;
        }
        route.pop();
    }
    false
}

// =============================================================================
// APPLY
// =============================================================================

/// Apply one patch. Returns whether it resolved.
pub fn apply_patch(root: &mut Element, path: &str, value: &str) -> bool {
    let Some(parsed) = parse_path(path) else {
        debug!(path, "template: skipping malformed patch path");
        return false;
    };
    match resolve(root, &parsed) {
        Some(target) => {
            target.set(value);
            true
        }
        None => {
            debug!(path, "template: patch path did not resolve");
            false
        }
    }
}

/// Apply patches in order; returns how many resolved.
pub fn apply_patches<'p>(root: &mut Element, patches: impl IntoIterator<Item = (&'p str, &'p str)>) -> usize {
    patches
        .into_iter()
        .filter(|(path, value)| apply_patch(root, path, value))
        .count()
}

#[cfg(test)]
#[path = "patch_test.rs"]
mod tests;
