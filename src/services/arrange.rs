//! Arrangement tools: fit a frame to its contents, and grid / distribute /
//! align layouts over existing objects.
//!
//! All references resolve before the first write; a bad reference aborts
//! the whole call with nothing moved.

use futures::future::join_all;
use serde_json::{Value, json};
use tracing::{info, warn};
use uuid::Uuid;

use super::executor::{ToolError, ToolExecutor, describe, f64_arg, invalid, refs_arg, required_str, str_arg};
use super::resolve::{resolve, resolve_all};
use crate::state::{BoardObject, Fields, Rect};
use crate::template::layout::grid_cols;

const DEFAULT_FRAME_PADDING: f64 = 30.0;
/// Extra space above the contents for the frame's title.
const TITLE_BAND: f64 = 20.0;
const DEFAULT_LAYOUT_GAP: f64 = 20.0;

// =============================================================================
// FIT FRAME
// =============================================================================

pub(crate) async fn fit_frame_to_contents(ctx: &ToolExecutor, input: &Value) -> Result<Value, ToolError> {
    let objects = ctx.store.get_objects().await;
    let frame = resolve(&objects, required_str(input, "frame")?)?;
    if !frame.is_frame() {
        return Err(invalid(format!("'{}' is a {}, not a frame", frame.id, frame.kind)));
    }
    let padding = f64_arg(input, "padding")
        .filter(|p| *p >= 0.0)
        .unwrap_or(DEFAULT_FRAME_PADDING);

    let contents: Vec<&BoardObject> = match refs_arg(input, "contents") {
        Some(refs) if !refs.is_empty() => resolve_all(&objects, &refs)?
            .into_iter()
            .filter(|o| o.id != frame.id)
            .collect(),
        _ => {
            let area = frame.bounds();
            objects
                .values()
                .filter(|o| o.id != frame.id && !o.is_connector() && area.intersects(&o.bounds()))
                .collect()
        }
    };
    let bounds: Vec<Rect> = contents.iter().map(|o| o.bounds()).collect();
    let Some(bbox) = Rect::union_all(&bounds) else {
        return Err(invalid("frame has no contents to fit"));
    };

    let mut fields = Fields::new();
    fields.insert("x".into(), json!(bbox.x - padding));
    fields.insert("y".into(), json!(bbox.y - padding - TITLE_BAND));
    fields.insert("width".into(), json!(bbox.width + 2.0 * padding));
    fields.insert("height".into(), json!(bbox.height + 2.0 * padding + TITLE_BAND));
    ctx.store.update_object(frame.id, &fields).await?;
    info!(frame = %frame.id, contents = contents.len(), "tool: frame fitted");

    let fresh = ctx.store.get_objects().await;
    Ok(json!({ "ok": true, "frame": fresh.get(&frame.id).map(describe), "contents": contents.len() }))
}

// =============================================================================
// LAYOUT
// =============================================================================

pub(crate) async fn layout_objects(ctx: &ToolExecutor, input: &Value) -> Result<Value, ToolError> {
    let refs = refs_arg(input, "targets")
        .filter(|r| !r.is_empty())
        .ok_or_else(|| invalid("'targets' is required"))?;
    let mode = required_str(input, "mode")?;
    let gap = f64_arg(input, "gap")
        .filter(|g| *g >= 0.0)
        .unwrap_or(DEFAULT_LAYOUT_GAP);

    let objects = ctx.store.get_objects().await;
    let targets = resolve_all(&objects, &refs)?;

    let moves = match mode {
        "grid" => {
            let columns = input
                .get("columns")
                .and_then(Value::as_u64)
                .and_then(|c| usize::try_from(c).ok());
            grid_moves(&targets, columns, gap)
        }
        "distribute" => distribute_moves(&targets, str_arg(input, "axis").unwrap_or("horizontal"))?,
        "align" => align_moves(&targets, required_str(input, "alignment")?)?,
        other => return Err(invalid(format!("unknown mode '{other}'; expected grid, distribute, or align"))),
    };

    let results = join_all(moves.iter().map(|(id, x, y)| {
        let mut fields = Fields::new();
        fields.insert("x".into(), json!(x));
        fields.insert("y".into(), json!(y));
        async move { ctx.store.update_object(*id, &fields).await }
    }))
    .await;

    let mut moved = 0;
    let mut failed = Vec::new();
    for ((id, _, _), result) in moves.iter().zip(results) {
        match result {
            Ok(()) => moved += 1,
            Err(e) => {
                warn!(%id, error = %e, "tool: layout move failed");
                failed.push(json!({ "id": id, "error": e.to_string() }));
            }
        }
    }
    info!(mode, moved, failed = failed.len(), "tool: objects laid out");
    Ok(json!({ "ok": true, "mode": mode, "moved": moved, "failed": failed }))
}

/// New top-left positions as `(id, x, y)`.
type Moves = Vec<(Uuid, f64, f64)>;

fn bbox(targets: &[&BoardObject]) -> Option<Rect> {
    let bounds: Vec<Rect> = targets.iter().map(|o| o.bounds()).collect();
    Rect::union_all(&bounds)
}

/// Grid in the given order, anchored at the targets' current top-left corner.
/// Cells are sized to the largest target.
#[allow(clippy::cast_precision_loss)]
fn grid_moves(targets: &[&BoardObject], columns: Option<usize>, gap: f64) -> Moves {
    let Some(anchor) = bbox(targets) else {
        return Vec::new();
    };
    let cols = grid_cols(columns, targets.len()).min(targets.len().max(1));
    let cell_w = targets.iter().map(|o| o.width).fold(0.0, f64::max);
    let cell_h = targets.iter().map(|o| o.height).fold(0.0, f64::max);
    targets
        .iter()
        .enumerate()
        .map(|(i, o)| {
            let (col, row) = ((i % cols) as f64, (i / cols) as f64);
            (o.id, anchor.x + col * (cell_w + gap), anchor.y + row * (cell_h + gap))
        })
        .collect()
}

/// Equal gaps between neighbours along one axis, keeping the outer span.
#[allow(clippy::cast_precision_loss)]
fn distribute_moves(targets: &[&BoardObject], axis: &str) -> Result<Moves, ToolError> {
    let horizontal = match axis {
        "horizontal" | "x" => true,
        "vertical" | "y" => false,
        other => return Err(invalid(format!("unknown axis '{other}'; expected horizontal or vertical"))),
    };
    if targets.len() < 2 {
        return Ok(Vec::new());
    }

    let start = |o: &BoardObject| if horizontal { o.x } else { o.y };
    let extent = |o: &BoardObject| if horizontal { o.width } else { o.height };

    let mut ordered: Vec<&BoardObject> = targets.to_vec();
    ordered.sort_by(|a, b| start(*a).total_cmp(&start(*b)).then(a.id.cmp(&b.id)));
    let first = ordered.iter().map(|o| start(*o)).fold(f64::INFINITY, f64::min);
    let last = ordered
        .iter()
        .map(|o| start(*o) + extent(*o))
        .fold(f64::NEG_INFINITY, f64::max);
    let total: f64 = ordered.iter().map(|o| extent(*o)).sum();
    let spacing = (last - first - total) / (ordered.len() - 1) as f64;

    let mut cursor = first;
    Ok(ordered
        .into_iter()
        .map(|o| {
            let pos = cursor;
            cursor += extent(o) + spacing;
            if horizontal { (o.id, pos, o.y) } else { (o.id, o.x, pos) }
        })
        .collect())
}

/// Snap one edge or center line of every target to the group's.
fn align_moves(targets: &[&BoardObject], alignment: &str) -> Result<Moves, ToolError> {
    let Some(area) = bbox(targets) else {
        return Ok(Vec::new());
    };
    let (cx, cy) = area.center();
    let place: fn(&BoardObject, &Rect, f64, f64) -> (f64, f64) = match alignment {
        "left" => |o, a, _, _| (a.x, o.y),
        "right" => |o, a, _, _| (a.right() - o.width, o.y),
        "center" => |o, _, cx, _| (cx - o.width / 2.0, o.y),
        "top" => |o, a, _, _| (o.x, a.y),
        "bottom" => |o, a, _, _| (o.x, a.bottom() - o.height),
        "middle" => |o, _, _, cy| (o.x, cy - o.height / 2.0),
        other => {
            return Err(invalid(format!(
                "unknown alignment '{other}'; expected left, right, center, top, bottom, or middle"
            )));
        }
    };
    Ok(targets
        .iter()
        .map(|o| {
            let (x, y) = place(*o, &area, cx, cy);
            (o.id, x, y)
        })
        .collect())
}

#[cfg(test)]
#[path = "arrange_test.rs"]
mod tests;
