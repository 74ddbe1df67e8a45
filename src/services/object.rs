//! Object tools: create, update, delete.

use std::collections::{HashMap, HashSet};

use futures::future::join_all;
use serde_json::{Map, Value, json};
use tracing::{info, warn};
use uuid::Uuid;

use super::executor::{
    ToolError, ToolExecutor, connector_anchor, describe, f64_arg, invalid, next_z, positive_arg, refs_arg,
    required_str, str_arg,
};
use super::resolve::{resolve, resolve_all};
use crate::state::{BoardObject, Fields, NewObject};

const DEFAULT_STICKY_COLOR: &str = "#FFEB3B";
const DEFAULT_CONNECTOR_STYLE: &str = "arrow";

/// Default `(width, height, color)` for each creatable kind.
fn kind_defaults(kind: &str) -> Option<(f64, f64, Option<&'static str>)> {
    match kind {
        "sticky" => Some((200.0, 200.0, Some(DEFAULT_STICKY_COLOR))),
        "rectangle" => Some((200.0, 120.0, None)),
        "circle" => Some((120.0, 120.0, None)),
        "text" => Some((200.0, 50.0, None)),
        "frame" => Some((400.0, 300.0, None)),
        "connector" => Some((0.0, 0.0, None)),
        "embed" => Some((480.0, 270.0, None)),
        _ => None,
    }
}

// =============================================================================
// CREATE
// =============================================================================

pub(crate) async fn create_object(ctx: &ToolExecutor, input: &Value) -> Result<Value, ToolError> {
    let kind = required_str(input, "kind")?.trim().to_ascii_lowercase();
    let (default_width, default_height, default_color) = kind_defaults(&kind).ok_or_else(|| {
        invalid(format!(
            "unknown kind '{kind}'; expected sticky, rectangle, circle, text, frame, connector, or embed"
        ))
    })?;

    let objects = ctx.store.get_objects().await;
    let mut props = Map::new();
    for key in ["text", "title", "url"] {
        if let Some(value) = str_arg(input, key) {
            props.insert(key.into(), json!(value));
        }
    }
    if let Some(color) = str_arg(input, "color").or(default_color) {
        props.insert("color".into(), json!(color));
    }

    let (width, height, cx, cy) = if kind == "connector" {
        let from = resolve(&objects, required_str(input, "from")?)?;
        let to = resolve(&objects, required_str(input, "to")?)?;
        props.insert("fromId".into(), json!(from.id));
        props.insert("toId".into(), json!(to.id));
        props.insert("style".into(), json!(str_arg(input, "style").unwrap_or(DEFAULT_CONNECTOR_STYLE)));
        let (cx, cy) = connector_anchor(&from.bounds(), &to.bounds());
        (0.0, 0.0, cx, cy)
    } else {
        let (vx, vy) = ctx.default_center().await;
        (
            positive_arg(input, "width").unwrap_or(default_width),
            positive_arg(input, "height").unwrap_or(default_height),
            f64_arg(input, "x").unwrap_or(vx),
            f64_arg(input, "y").unwrap_or(vy),
        )
    };

    let z_index = input
        .get("zIndex")
        .and_then(Value::as_i64)
        .unwrap_or_else(|| next_z(objects.values(), &kind));

    let created = ctx
        .store
        .create_object(NewObject {
            kind,
            x: cx - width / 2.0,
            y: cy - height / 2.0,
            width,
            height,
            rotation: f64_arg(input, "rotation").unwrap_or(0.0),
            z_index,
            props: Value::Object(props),
        })
        .await?;
    info!(id = %created.id, kind = %created.kind, "tool: object created");
    Ok(json!({ "ok": true, "object": describe(&created) }))
}

// =============================================================================
// UPDATE
// =============================================================================

struct UpdateOutcome {
    id: Uuid,
    cascaded: usize,
}

pub(crate) async fn update_objects(ctx: &ToolExecutor, input: &Value) -> Result<Value, ToolError> {
    let objects = ctx.store.get_objects().await;

    let Some(entries) = input.get("updates").and_then(Value::as_array) else {
        let outcome = update_one(ctx, &objects, input).await?;
        let fresh = ctx.store.get_objects().await;
        return Ok(json!({
            "ok": true,
            "object": fresh.get(&outcome.id).map(describe),
            "cascaded": outcome.cascaded,
        }));
    };
    if entries.is_empty() {
        return Err(invalid("'updates' is empty"));
    }

    let outcomes = join_all(entries.iter().map(|entry| update_one(ctx, &objects, entry))).await;
    let mut results = Vec::with_capacity(entries.len());
    let mut failed = 0usize;
    for (entry, outcome) in entries.iter().zip(outcomes) {
        let target = str_arg(entry, "target").unwrap_or_default();
        match outcome {
            Ok(done) => {
                results.push(json!({ "target": target, "ok": true, "id": done.id, "cascaded": done.cascaded }));
            }
            Err(e) => {
                warn!(reference = target, error = %e, "tool: batch update entry failed");
                failed += 1;
                let mut result = e.to_result();
                result["target"] = json!(target);
                results.push(result);
            }
        }
    }
    Ok(json!({ "ok": true, "updated": entries.len() - failed, "failed": failed, "results": results }))
}

async fn update_one(
    ctx: &ToolExecutor,
    objects: &HashMap<Uuid, BoardObject>,
    entry: &Value,
) -> Result<UpdateOutcome, ToolError> {
    let target = resolve(objects, required_str(entry, "target")?)?;
    let fields = entry
        .get("fields")
        .and_then(Value::as_object)
        .ok_or_else(|| invalid("'fields' must be an object"))?;
    let (store_fields, (dx, dy)) = plan_update(target, fields)?;
    ctx.store.update_object(target.id, &store_fields).await?;

    let mut cascaded = 0;
    if target.is_frame() && (dx != 0.0 || dy != 0.0) {
        let old = target.bounds();
        let moves: Vec<(Uuid, Fields)> = objects
            .values()
            .filter(|o| o.id != target.id && !o.is_connector() && old.contains(&o.bounds()))
            .map(|o| {
                let mut f = Fields::new();
                f.insert("x".into(), json!(o.x + dx));
                f.insert("y".into(), json!(o.y + dy));
                (o.id, f)
            })
            .collect();
        let results = join_all(moves.iter().map(|(id, f)| ctx.store.update_object(*id, f))).await;
        for ((id, _), result) in moves.iter().zip(results) {
            match result {
                Ok(()) => cascaded += 1,
                Err(e) => warn!(frame = %target.id, %id, error = %e, "tool: frame cascade move failed"),
            }
        }
    }
    Ok(UpdateOutcome { id: target.id, cascaded })
}

/// Translate tool fields (center-based) into store fields (top-left based).
/// Returns the fields plus the center translation.
fn plan_update(obj: &BoardObject, fields: &Map<String, Value>) -> Result<(Fields, (f64, f64)), ToolError> {
    if fields.contains_key("id") || fields.contains_key("kind") {
        return Err(invalid("'id' and 'kind' cannot be changed"));
    }

    let mut out: Fields = fields
        .iter()
        .filter(|(k, _)| !matches!(k.as_str(), "x" | "y" | "width" | "height"))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    if !["x", "y", "width", "height"].iter().any(|k| fields.contains_key(*k)) {
        return Ok((out, (0.0, 0.0)));
    }

    let positive = |key: &str, current: f64| {
        fields
            .get(key)
            .and_then(Value::as_f64)
            .filter(|v| *v > 0.0)
            .unwrap_or(current)
    };
    let width = positive("width", obj.width);
    let height = positive("height", obj.height);
    let (old_cx, old_cy) = obj.bounds().center();
    let cx = fields.get("x").and_then(Value::as_f64).unwrap_or(old_cx);
    let cy = fields.get("y").and_then(Value::as_f64).unwrap_or(old_cy);

    out.insert("x".into(), json!(cx - width / 2.0));
    out.insert("y".into(), json!(cy - height / 2.0));
    out.insert("width".into(), json!(width));
    out.insert("height".into(), json!(height));
    Ok((out, (cx - old_cx, cy - old_cy)))
}

// =============================================================================
// DELETE
// =============================================================================

pub(crate) async fn delete_objects(ctx: &ToolExecutor, input: &Value) -> Result<Value, ToolError> {
    let refs = refs_arg(input, "targets")
        .or_else(|| refs_arg(input, "target"))
        .filter(|r| !r.is_empty())
        .ok_or_else(|| invalid("'targets' is required"))?;

    let objects = ctx.store.get_objects().await;
    let targets: HashSet<Uuid> = resolve_all(&objects, &refs)?
        .into_iter()
        .map(|o| o.id)
        .collect();

    let mut attached: Vec<Uuid> = objects
        .values()
        .filter(|o| o.is_connector() && !targets.contains(&o.id))
        .filter(|o| {
            let (from, to) = o.endpoints();
            from.is_some_and(|id| targets.contains(&id)) || to.is_some_and(|id| targets.contains(&id))
        })
        .map(|o| o.id)
        .collect();
    attached.sort();
    let mut ids: Vec<Uuid> = targets.into_iter().collect();
    ids.sort();
    let direct = ids.len();
    ids.extend(attached);

    let results = join_all(ids.iter().map(|id| ctx.store.delete_object(*id))).await;
    let mut deleted = Vec::new();
    let mut failed = Vec::new();
    let mut connectors_removed = 0;
    for (i, (id, result)) in ids.iter().zip(results).enumerate() {
        match result {
            Ok(()) => {
                deleted.push(*id);
                if i >= direct {
                    connectors_removed += 1;
                }
            }
            Err(e) => {
                warn!(%id, error = %e, "tool: delete failed");
                failed.push(json!({ "id": id, "error": e.to_string() }));
            }
        }
    }
    info!(deleted = deleted.len(), connectors_removed, "tool: objects deleted");
    Ok(json!({ "ok": true, "deleted": deleted, "connectorsRemoved": connectors_removed, "failed": failed }))
}

#[cfg(test)]
#[path = "object_test.rs"]
mod tests;
