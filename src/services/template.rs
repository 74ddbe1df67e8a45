//! Template tools: apply DSL to the board, search the catalog.
//!
//! DESIGN
//! ======
//! Application runs in two phases. The pure phase renders every apply line
//! (catalog lookup, markup, title, slots, patches, layout); any failure there
//! rejects the whole call before the board is touched. The write phase
//! creates objects in layout order, then connectors by key. Store failures
//! in the write phase are collected, not raised, so one refused object does
//! not hide what did get created.

use std::collections::HashMap;

use serde_json::{Value, json};
use tracing::{info, warn};
use uuid::Uuid;

use super::executor::{ToolError, ToolExecutor, connector_anchor, f64_arg, invalid, required_str, str_arg};
use crate::state::{NewObject, Rect};
use crate::template::ast::{ConnectorSpec, ObjectSpec, Placed};
use crate::template::catalog::search;
use crate::template::{Rendered, parse_dsl, plan, render};

/// Horizontal space between templates applied in one call.
const TEMPLATE_SPACING: f64 = 100.0;

// =============================================================================
// APPLY
// =============================================================================

pub(crate) async fn apply_template(ctx: &ToolExecutor, input: &Value) -> Result<Value, ToolError> {
    let dsl = required_str(input, "dsl")?;
    let (plans, orphans) = plan(parse_dsl(dsl));
    if plans.is_empty() {
        return Err(invalid("no template apply line in 'dsl'"));
    }
    if !orphans.is_empty() {
        warn!(?orphans, "tool: patches before the first apply line were ignored");
    }

    let rendered: Vec<Rendered> = plans
        .iter()
        .map(|p| render(ctx.catalog(), p, 0.0, 0.0))
        .collect::<Result<_, _>>()?;

    let (default_x, default_y) = ctx.default_center().await;
    let origin_x = f64_arg(input, "x").unwrap_or(default_x);
    let origin_y = f64_arg(input, "y").unwrap_or(default_y);

    // Side by side, the whole row centered on the origin.
    let total_width = rendered.iter().map(|r| r.layout.width).sum::<f64>()
        + rendered.iter().skip(1).map(|_| TEMPLATE_SPACING).sum::<f64>();
    let mut left = origin_x - total_width / 2.0;

    let objects = ctx.store.get_objects().await;
    let mut z_index = objects.values().map(|o| o.z_index).max().unwrap_or(0);

    let mut created: Vec<Uuid> = Vec::new();
    let mut failed: Vec<Value> = Vec::new();
    let mut applied = Vec::with_capacity(plans.len());

    for (apply, output) in plans.iter().zip(&rendered) {
        let dx = left + output.layout.width / 2.0;
        left += output.layout.width + TEMPLATE_SPACING;

        let mut keyed: HashMap<&str, (Uuid, Rect)> = HashMap::new();
        let mut count = 0;
        let (shapes, edges): (Vec<&Placed>, Vec<&Placed>) = output
            .layout
            .placed
            .iter()
            .partition(|p| matches!(p, Placed::Object(_)));

        for placed in shapes {
            let Placed::Object(spec) = placed else { continue };
            z_index += 1;
            match ctx.store.create_object(new_object(spec, dx, origin_y, z_index)).await {
                Ok(obj) => {
                    if let Some(key) = &spec.key {
                        keyed.insert(key.as_str(), (obj.id, obj.bounds()));
                    }
                    created.push(obj.id);
                    count += 1;
                }
                Err(e) => {
                    warn!(template = %apply.name, kind = spec.kind, error = %e, "tool: template object refused");
                    failed.push(json!({ "template": apply.name, "kind": spec.kind, "error": e.to_string() }));
                }
            }
        }

        for placed in edges {
            let Placed::Connector(spec) = placed else { continue };
            let (Some(from), Some(to)) = (keyed.get(spec.from_key.as_str()), keyed.get(spec.to_key.as_str())) else {
                failed.push(json!({
                    "template": apply.name,
                    "kind": "connector",
                    "error": format!("unresolved connector key {} -> {}", spec.from_key, spec.to_key),
                }));
                continue;
            };
            z_index += 1;
            match ctx.store.create_object(connector_object(spec, from, to, z_index)).await {
                Ok(obj) => {
                    created.push(obj.id);
                    count += 1;
                }
                Err(e) => {
                    warn!(template = %apply.name, error = %e, "tool: template connector refused");
                    failed.push(json!({ "template": apply.name, "kind": "connector", "error": e.to_string() }));
                }
            }
        }

        applied.push(json!({
            "name": apply.name,
            "created": count,
            "patchesApplied": output.patches_applied,
            "patchesSkipped": apply.patches.len() - output.patches_applied,
        }));
    }

    info!(templates = plans.len(), created = created.len(), failed = failed.len(), "tool: templates applied");
    let mut out = json!({ "ok": true, "templates": applied, "created": created, "failed": failed });
    if !orphans.is_empty() {
        out["ignoredPatches"] = json!(orphans);
    }
    Ok(out)
}

/// Store object for a spec rendered at the origin, shifted by `(dx, dy)`.
fn new_object(spec: &ObjectSpec, dx: f64, dy: f64, z_index: i64) -> NewObject {
    let mut props = serde_json::Map::new();
    if let Some(text) = &spec.text {
        props.insert("text".into(), json!(text));
    }
    if let Some(title) = &spec.title {
        props.insert("title".into(), json!(title));
    }
    if let Some(color) = &spec.color {
        props.insert("color".into(), json!(color));
    }
    NewObject {
        kind: spec.kind.to_owned(),
        x: spec.x + dx - spec.width / 2.0,
        y: spec.y + dy - spec.height / 2.0,
        width: spec.width,
        height: spec.height,
        rotation: 0.0,
        z_index,
        props: Value::Object(props),
    }
}

/// Store object for a keyed edge, anchored between its endpoints like
/// connectors made by `createObject`.
fn connector_object(spec: &ConnectorSpec, from: &(Uuid, Rect), to: &(Uuid, Rect), z_index: i64) -> NewObject {
    let (x, y) = connector_anchor(&from.1, &to.1);
    let mut props = serde_json::Map::new();
    props.insert("fromId".into(), json!(from.0));
    props.insert("toId".into(), json!(to.0));
    props.insert("style".into(), json!(spec.style));
    if let Some(color) = &spec.color {
        props.insert("color".into(), json!(color));
    }
    NewObject {
        kind: "connector".into(),
        x,
        y,
        width: 0.0,
        height: 0.0,
        rotation: 0.0,
        z_index,
        props: Value::Object(props),
    }
}

// =============================================================================
// SEARCH
// =============================================================================

pub(crate) fn search_templates(ctx: &ToolExecutor, input: &Value) -> Value {
    let query = str_arg(input, "query").unwrap_or_default();
    let hits: Vec<Value> = search(ctx.catalog(), query)
        .into_iter()
        .map(|e| json!({ "name": e.name, "description": e.description, "tags": e.tags }))
        .collect();
    json!({ "ok": true, "count": hits.len(), "templates": hits })
}

#[cfg(test)]
#[path = "template_test.rs"]
mod tests;
