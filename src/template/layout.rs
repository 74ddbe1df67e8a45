//! Two-pass layout: measure bottom-up, then place top-down.
//!
//! DESIGN
//! ======
//! Pass 1 (`measure`) computes every node's size purely from its children.
//! Pass 2 (`place`) walks the measured tree from a top-left anchor and emits
//! center-point specs in document order, frames before their contents.
//! Connectors take no space; they are collected during placement and
//! appended after every object.
//!
//! Children of grids sit at the top-left of their cell; rows top-align and
//! stacks left-align.

use super::ast::{ConnectorSpec, ContainerKind, ObjectSpec, Placed, TemplateNode};

pub const FRAME_PAD_X: f64 = 30.0;
pub const FRAME_PAD_TOP: f64 = 50.0;
pub const FRAME_PAD_BOTTOM: f64 = 30.0;

/// A node with its computed size. Read-only after measuring.
#[derive(Debug)]
pub struct MeasuredNode<'a> {
    pub node: &'a TemplateNode,
    pub width: f64,
    pub height: f64,
    pub children: Vec<MeasuredNode<'a>>,
}

/// Layout output plus the overall footprint.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub placed: Vec<Placed>,
    pub width: f64,
    pub height: f64,
}

/// Lay out `root` centered on `(origin_x, origin_y)`.
#[must_use]
pub fn layout_template(root: &TemplateNode, origin_x: f64, origin_y: f64) -> Layout {
    let measured = measure(root);
    let mut objects = Vec::new();
    let mut connectors = Vec::new();
    place(
        &measured,
        origin_x - measured.width / 2.0,
        origin_y - measured.height / 2.0,
        &mut objects,
        &mut connectors,
    );
    let placed = objects
        .into_iter()
        .map(Placed::Object)
        .chain(connectors.into_iter().map(Placed::Connector))
        .collect();
    Layout { placed, width: measured.width, height: measured.height }
}

// =============================================================================
// PASS 1: MEASURE
// =============================================================================

#[must_use]
pub fn measure(node: &TemplateNode) -> MeasuredNode<'_> {
    match node {
        TemplateNode::Leaf { kind, width, height, .. } => {
            let (dw, dh) = kind.default_size();
            MeasuredNode { node, width: width.unwrap_or(dw), height: height.unwrap_or(dh), children: Vec::new() }
        }
        TemplateNode::Connector { .. } => MeasuredNode { node, width: 0.0, height: 0.0, children: Vec::new() },
        TemplateNode::Frame { child, .. } => {
            let inner = child.as_deref().map(measure);
            let (w, h) = inner.as_ref().map_or((0.0, 0.0), |m| (m.width, m.height));
            MeasuredNode {
                node,
                width: w + 2.0 * FRAME_PAD_X,
                height: h + FRAME_PAD_TOP + FRAME_PAD_BOTTOM,
                children: inner.into_iter().collect(),
            }
        }
        TemplateNode::Container { kind, children, gap, cols } => {
            let children: Vec<MeasuredNode<'_>> = children.iter().map(measure).collect();
            let sized: Vec<&MeasuredNode<'_>> = children.iter().filter(|c| !c.node.is_connector()).collect();
            let (width, height) = measure_container(*kind, &sized, *gap, *cols);
            MeasuredNode { node, width, height, children }
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn measure_container(kind: ContainerKind, sized: &[&MeasuredNode<'_>], gap: f64, cols: Option<usize>) -> (f64, f64) {
    let n = sized.len();
    if n == 0 {
        return (0.0, 0.0);
    }
    let max_w = sized.iter().map(|c| c.width).fold(0.0, f64::max);
    let max_h = sized.iter().map(|c| c.height).fold(0.0, f64::max);
    let total_gap = gap * (n - 1) as f64;
    match kind {
        ContainerKind::Row => (sized.iter().map(|c| c.width).sum::<f64>() + total_gap, max_h),
        ContainerKind::Stack => (max_w, sized.iter().map(|c| c.height).sum::<f64>() + total_gap),
        ContainerKind::Grid => {
            let cols = grid_cols(cols, n).min(n);
            let rows = n.div_ceil(cols);
            (
                cols as f64 * max_w + (cols - 1) as f64 * gap,
                rows as f64 * max_h + (rows - 1) as f64 * gap,
            )
        }
    }
}

/// Explicit column count, else the smallest square that fits.
#[must_use]
pub fn grid_cols(cols: Option<usize>, n: usize) -> usize {
    cols.unwrap_or_else(|| {
        let mut c = 1;
        while c * c < n {
            c += 1;
        }
        c
    })
    .max(1)
}

// =============================================================================
// PASS 2: PLACE
// =============================================================================

#[allow(clippy::cast_precision_loss)]
fn place(m: &MeasuredNode<'_>, left: f64, top: f64, objects: &mut Vec<ObjectSpec>, connectors: &mut Vec<ConnectorSpec>) {
    match m.node {
        TemplateNode::Leaf { kind, text, color, key, .. } => objects.push(ObjectSpec {
            kind: kind.object_kind(),
            x: left + m.width / 2.0,
            y: top + m.height / 2.0,
            width: m.width,
            height: m.height,
            text: (!text.is_empty()).then(|| text.clone()),
            color: color.clone(),
            title: None,
            key: key.clone(),
        }),
        TemplateNode::Connector { from_key, to_key, style, color } => connectors.push(ConnectorSpec {
            from_key: from_key.clone(),
            to_key: to_key.clone(),
            style: style.clone(),
            color: color.clone(),
        }),
        TemplateNode::Frame { title, color, .. } => {
            objects.push(ObjectSpec {
                kind: "frame",
                x: left + m.width / 2.0,
                y: top + m.height / 2.0,
                width: m.width,
                height: m.height,
                text: None,
                color: color.clone(),
                title: Some(title.clone()),
                key: None,
            });
            for child in &m.children {
                place(child, left + FRAME_PAD_X, top + FRAME_PAD_TOP, objects, connectors);
            }
        }
        TemplateNode::Container { kind, gap, cols, .. } => {
            let sized = m.children.iter().filter(|c| !c.node.is_connector()).count();
            let cell_w = m.children.iter().map(|c| c.width).fold(0.0, f64::max);
            let cell_h = m.children.iter().map(|c| c.height).fold(0.0, f64::max);
            let grid_cols = grid_cols(*cols, sized).min(sized.max(1));

            let mut idx = 0;
            let mut x = left;
            let mut y = top;
            for child in &m.children {
                if child.node.is_connector() {
                    place(child, left, top, objects, connectors);
                    continue;
                }
                match kind {
                    ContainerKind::Grid => {
                        let (row, col) = (idx / grid_cols, idx % grid_cols);
                        let cx = left + col as f64 * (cell_w + gap);
                        let cy = top + row as f64 * (cell_h + gap);
                        place(child, cx, cy, objects, connectors);
                    }
                    ContainerKind::Row => {
                        place(child, x, top, objects, connectors);
                        x += child.width + gap;
                    }
                    ContainerKind::Stack => {
                        place(child, left, y, objects, connectors);
                        y += child.height + gap;
                    }
                }
                idx += 1;
            }
        }
    }
}

#[cfg(test)]
#[path = "layout_test.rs"]
mod tests;
