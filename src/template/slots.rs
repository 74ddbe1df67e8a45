//! Slot filling and titling: pre-layout edits driven by an apply line.
//!
//! The layout container is the first grid/row/stack reached by descending
//! through the template root and single-child frames; a node with several
//! children acts as an implicit stack. Its non-connector children are the
//! slot groups, filled in order.
//!
//! Within a group an empty value leaves the existing text alone. Values past
//! the last leaf clone that leaf (attributes kept, `key` dropped so connector
//! keys stay unique) and insert the clones right after it.

use tracing::debug;

use super::TemplateError;
use super::ast::Element;

/// Fill the template's slot groups with `groups`, in order.
///
/// # Errors
///
/// Returns [`TemplateError::LeaflessSlot`] when a group without leaves is
/// given any non-empty value.
pub fn fill_slots(root: &mut Element, groups: &[Vec<String>]) -> Result<(), TemplateError> {
    if groups.is_empty() {
        return Ok(());
    }
    let Some(route) = container_route(root) else {
        debug!("template: no layout container; slots ignored");
        return Ok(());
    };
    let container = walk_mut(root, &route);
    let group_indices: Vec<usize> = content_indices(container);
    if groups.len() > group_indices.len() {
        debug!(supplied = groups.len(), available = group_indices.len(), "template: extra slot groups ignored");
    }

    // Groups only grow inside themselves, so sibling indices stay valid.
    for (n, (&gi, values)) in group_indices.iter().zip(groups).enumerate() {
        let group = &mut container.children[gi];
        if group.is_leaf() {
            if let Some(first) = values.first().filter(|v| !v.is_empty()) {
                first.clone_into(&mut group.text);
            }
            continue;
        }
        if !fill_group(group, values) {
            return Err(TemplateError::LeaflessSlot { group: n + 1, tag: group.tag.clone() });
        }
    }
    Ok(())
}

/// Returns `false` when the group has no leaves but was given text.
fn fill_group(group: &mut Element, values: &[String]) -> bool {
    let mut leaves = Vec::new();
    collect_leaves(group, &mut Vec::new(), &mut leaves);

    let Some(last) = leaves.last().cloned() else {
        return values.iter().all(String::is_empty);
    };

    for (route, value) in leaves.iter().zip(values) {
        if !value.is_empty() {
            value.clone_into(&mut walk_mut(group, route).text);
        }
    }

    if values.len() > leaves.len() {
        let (parent_route, last_index) = last.split_at(last.len() - 1);
        let parent = walk_mut(group, parent_route);
        let mut template = parent.children[last_index[0]].clone();
        template.remove_attr("key");
        for (k, value) in values[leaves.len()..].iter().enumerate() {
            let mut clone = template.clone();
            value.clone_into(&mut clone.text);
            parent.children.insert(last_index[0] + 1 + k, clone);
        }
    }
    true
}

/// Set the title of the outermost frame, wrapping the content in a new frame
/// when the template has none.
pub fn set_title(root: &mut Element, title: &str) {
    if let Some(route) = first_frame(root, &mut Vec::new()) {
        walk_mut(root, &route).set_attr("title", title);
        return;
    }
    let mut frame = Element::new("frame");
    frame.set_attr("title", title);
    frame.children = std::mem::take(&mut root.children);
    root.children.push(frame);
}

// =============================================================================
// NAVIGATION
// =============================================================================

fn walk_mut<'a>(mut node: &'a mut Element, route: &[usize]) -> &'a mut Element {
    for &i in route {
        node = &mut node.children[i];
    }
    node
}

fn content_indices(node: &Element) -> Vec<usize> {
    node.children
        .iter()
        .enumerate()
        .filter(|(_, c)| !c.is_connector())
        .map(|(i, _)| i)
        .collect()
}

/// Route to the element whose children are the slot groups.
fn container_route(root: &Element) -> Option<Vec<usize>> {
    let mut route = Vec::new();
    let mut node = root;
    loop {
        if node.is_container() {
            return Some(route);
        }
        if node.is_leaf() {
            route.pop();
            return Some(route);
        }
        match content_indices(node).as_slice() {
            [] => return None,
            [only] => {
                route.push(*only);
                node = &node.children[*only];
            }
            _ => return Some(route),
        }
    }
}

fn collect_leaves(node: &Element, route: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
    for (i, child) in node.children.iter().enumerate() {
        route.push(i);
        if child.is_leaf() {
            out.push(route.clone());
        } else {
            collect_leaves(child, route, out);
        }
        route.pop();
    }
}

fn first_frame(node: &Element, route: &mut Vec<usize>) -> Option<Vec<usize>> {
    for (i, child) in node.children.iter().enumerate() {
        route.push(i);
        if child.tag == "frame" {
            return Some(route.clone());
        }
        if let Some(found) = first_frame(child, route) {
            return Some(found);
        }
        route.pop();
    }
    None
}

#[cfg(test)]
#[path = "slots_test.rs"]
mod tests;
