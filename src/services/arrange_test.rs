use serde_json::json;

use super::*;
use crate::services::test_helpers::{board, fetch};
use crate::state::test_helpers::{connector, frame, object, sticky};

fn ids(objects: &[&BoardObject]) -> Vec<String> {
    objects.iter().map(|o| o.id.to_string()).collect()
}

// =============================================================================
// fitFrameToContents
// =============================================================================

#[tokio::test]
async fn fit_frame_wraps_explicit_contents_with_padding_and_title_band() {
    let group = frame("Group", 0.0, 0.0, 100.0, 100.0);
    let a = sticky("a", 200.0, 200.0);
    let b = object("circle", 500.0, 300.0, 120.0, 120.0);
    let frame_id = group.id;
    let refs = ids(&[&a, &b]);
    let (store, exec) = board(vec![group, a, b]);

    let result = fit_frame_to_contents(&exec, &json!({"frame": frame_id.to_string(), "contents": refs}))
        .await
        .unwrap();
    assert_eq!(result["contents"], 2);

    let fitted = fetch(&store, frame_id).await;
    assert_eq!(fitted.bounds(), Rect { x: 170.0, y: 150.0, width: 480.0, height: 300.0 });
}

#[tokio::test]
async fn fit_frame_defaults_to_intersecting_objects() {
    let group = frame("Group", 0.0, 0.0, 300.0, 300.0);
    let inside = sticky("in", 50.0, 50.0);
    let far = sticky("far", 2000.0, 2000.0);
    let link = connector(inside.id, far.id);
    let frame_id = group.id;
    let (store, exec) = board(vec![group, inside, far, link]);

    fit_frame_to_contents(&exec, &json!({"frame": frame_id.to_string(), "padding": 10}))
        .await
        .unwrap();
    let fitted = fetch(&store, frame_id).await;
    assert_eq!(fitted.bounds(), Rect { x: 40.0, y: 20.0, width: 220.0, height: 240.0 });
}

#[tokio::test]
async fn fit_frame_rejects_non_frames_and_empty_frames() {
    let note = sticky("n", 0.0, 0.0);
    let empty = frame("Empty", 5000.0, 5000.0, 100.0, 100.0);
    let (note_id, empty_id) = (note.id, empty.id);
    let (_, exec) = board(vec![note, empty]);

    let err = fit_frame_to_contents(&exec, &json!({"frame": note_id.to_string()}))
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::InvalidInput(_)));
    let err = fit_frame_to_contents(&exec, &json!({"frame": empty_id.to_string()}))
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::InvalidInput(_)));
}

// =============================================================================
// layoutObjects
// =============================================================================

#[tokio::test]
async fn grid_defaults_to_square_columns() {
    let notes: Vec<BoardObject> = (0..4)
        .map(|i| sticky("n", f64::from(i) * 1000.0, 100.0))
        .collect();
    let refs = ids(&notes.iter().collect::<Vec<_>>());
    let note_ids: Vec<Uuid> = notes.iter().map(|n| n.id).collect();
    let (store, exec) = board(notes);

    let result = layout_objects(&exec, &json!({"targets": refs, "mode": "grid", "gap": 10}))
        .await
        .unwrap();
    assert_eq!(result["moved"], 4);

    let positions = [(0.0, 100.0), (210.0, 100.0), (0.0, 310.0), (210.0, 310.0)];
    for (id, (x, y)) in note_ids.iter().zip(positions) {
        let obj = fetch(&store, *id).await;
        assert_eq!((obj.x, obj.y), (x, y));
    }
}

#[tokio::test]
async fn distribute_spreads_gaps_evenly() {
    let a = object("rectangle", 0.0, 0.0, 100.0, 50.0);
    let b = object("rectangle", 120.0, 30.0, 50.0, 50.0);
    let c = object("rectangle", 500.0, 60.0, 100.0, 50.0);
    let b_id = b.id;
    let refs = ids(&[&c, &a, &b]);
    let (store, exec) = board(vec![a, b, c]);

    layout_objects(&exec, &json!({"targets": refs, "mode": "distribute"}))
        .await
        .unwrap();
    // Span 600, extents 250, two gaps of 175.
    let middle = fetch(&store, b_id).await;
    assert_eq!((middle.x, middle.y), (275.0, 30.0));
}

#[tokio::test]
async fn distribute_vertical() {
    let a = object("rectangle", 0.0, 0.0, 50.0, 100.0);
    let b = object("rectangle", 40.0, 10.0, 50.0, 100.0);
    let c = object("rectangle", 80.0, 400.0, 50.0, 100.0);
    let b_id = b.id;
    let refs = ids(&[&a, &b, &c]);
    let (store, exec) = board(vec![a, b, c]);

    layout_objects(&exec, &json!({"targets": refs, "mode": "distribute", "axis": "vertical"}))
        .await
        .unwrap();
    let middle = fetch(&store, b_id).await;
    assert_eq!((middle.x, middle.y), (40.0, 200.0));
}

#[tokio::test]
async fn align_edges_and_centers() {
    let a = object("rectangle", 0.0, 0.0, 100.0, 100.0);
    let b = object("rectangle", 300.0, 50.0, 200.0, 50.0);
    let (a_id, b_id) = (a.id, b.id);
    let refs = ids(&[&a, &b]);
    let (store, exec) = board(vec![a, b]);

    layout_objects(&exec, &json!({"targets": refs, "mode": "align", "alignment": "right"}))
        .await
        .unwrap();
    assert_eq!(fetch(&store, a_id).await.x, 400.0);
    assert_eq!(fetch(&store, b_id).await.x, 300.0);

    layout_objects(&exec, &json!({"targets": refs, "mode": "align", "alignment": "middle"}))
        .await
        .unwrap();
    assert_eq!(fetch(&store, a_id).await.y, 0.0);
    assert_eq!(fetch(&store, b_id).await.y, 25.0);
}

#[tokio::test]
async fn layout_aborts_before_any_write_on_bad_reference() {
    let a = object("rectangle", 0.0, 0.0, 100.0, 100.0);
    let a_id = a.id;
    let (store, exec) = board(vec![a]);
    let err = layout_objects(
        &exec,
        &json!({"targets": [a_id.to_string(), "missing thing"], "mode": "align", "alignment": "left"}),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ToolError::Resolve(_)));
    assert_eq!(fetch(&store, a_id).await.x, 0.0);
}

#[tokio::test]
async fn layout_rejects_unknown_modes() {
    let a = object("rectangle", 0.0, 0.0, 100.0, 100.0);
    let refs = ids(&[&a]);
    let (_, exec) = board(vec![a]);
    let err = layout_objects(&exec, &json!({"targets": refs, "mode": "spiral"}))
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::InvalidInput(_)));
    let err = layout_objects(&exec, &json!({"targets": refs, "mode": "align", "alignment": "diagonal"}))
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::InvalidInput(_)));
}
