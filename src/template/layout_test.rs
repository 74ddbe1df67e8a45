use super::*;
use crate::template::markup::{build_tree, parse_markup};

fn tree(markup: &str) -> TemplateNode {
    build_tree(&parse_markup(markup).unwrap()).unwrap()
}

fn objects(layout: &Layout) -> Vec<&ObjectSpec> {
    layout
        .placed
        .iter()
        .filter_map(|p| match p {
            Placed::Object(o) => Some(o),
            Placed::Connector(_) => None,
        })
        .collect()
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn framed_two_by_two_grid_is_490_by_430() {
    let node = tree(r#"<template><frame title="F"><grid cols="2"><sticky/><sticky/><sticky/><sticky/></grid></frame></template>"#);
    let layout = layout_template(&node, 0.0, 0.0);
    let objs = objects(&layout);

    assert_eq!(objs[0].kind, "frame");
    assert!(close(objs[0].width, 490.0));
    assert!(close(objs[0].height, 430.0));
    assert!(close(layout.width, 490.0) && close(layout.height, 430.0));
    assert!(close(objs[0].x, 0.0) && close(objs[0].y, 0.0));

    // First cell: frame left (-245) + 30 padding + half width.
    assert!(close(objs[1].x, -245.0 + 30.0 + 100.0));
    assert!(close(objs[1].y, -215.0 + 50.0 + 80.0));
    // Second column is one cell plus gap to the right.
    assert!(close(objs[2].x - objs[1].x, 230.0));
    assert!(close(objs[3].y - objs[1].y, 190.0));
    assert!(objs[1..].iter().all(|o| o.kind == "sticky" && close(o.width, 200.0) && close(o.height, 160.0)));
}

#[test]
fn translation_invariance() {
    let node = tree(
        r#"<template><frame title="T"><row gap="12"><stack><text>a</text><rect w="90"/></stack><grid><circle/><circle/><circle/></grid></row></frame></template>"#,
    );
    let a = layout_template(&node, 0.0, 0.0);
    let b = layout_template(&node, 317.5, -42.0);
    let (oa, ob) = (objects(&a), objects(&b));
    assert_eq!(oa.len(), ob.len());
    for (p, q) in oa.iter().zip(&ob) {
        assert!(close(q.x - p.x, 317.5));
        assert!(close(q.y - p.y, -42.0));
        assert!(close(p.width, q.width) && close(p.height, q.height));
    }
}

#[test]
fn row_and_stack_advance_with_gap() {
    let node = tree(r#"<template><row gap="10"><rect w="100" h="50"/><rect w="40" h="80"/></row></template>"#);
    let layout = layout_template(&node, 0.0, 0.0);
    assert!(close(layout.width, 150.0) && close(layout.height, 80.0));
    let objs = objects(&layout);
    // Top-aligned: both tops at -40.
    assert!(close(objs[0].y - 25.0, -40.0));
    assert!(close(objs[1].y - 40.0, -40.0));
    assert!(close(objs[1].x - 20.0, -75.0 + 110.0));

    let node = tree(r#"<template><stack gap="5"><text/><text h="10"/></stack></template>"#);
    let layout = layout_template(&node, 0.0, 0.0);
    assert!(close(layout.width, 200.0) && close(layout.height, 55.0));
}

#[test]
fn grid_defaults_to_square_columns_and_clamps_to_children() {
    assert_eq!(grid_cols(None, 5), 3);
    assert_eq!(grid_cols(None, 4), 2);
    assert_eq!(grid_cols(None, 0), 1);
    assert_eq!(grid_cols(Some(4), 2), 4);

    let node = tree(r#"<template><grid cols="4" gap="0"><rect/><rect/></grid></template>"#);
    let layout = layout_template(&node, 0.0, 0.0);
    assert!(close(layout.width, 400.0) && close(layout.height, 100.0));
}

#[test]
fn leaves_fall_back_to_positive_defaults() {
    let node = tree(r#"<template><row><sticky w="0" h="-1"/><circle w="abc"/><text/><rect/></row></template>"#);
    let layout = layout_template(&node, 0.0, 0.0);
    let sizes: Vec<(f64, f64)> = objects(&layout).iter().map(|o| (o.width, o.height)).collect();
    assert_eq!(sizes, vec![(200.0, 160.0), (120.0, 120.0), (200.0, 40.0), (200.0, 100.0)]);
}

#[test]
fn order_preserved_frames_first_connectors_last() {
    let node = tree(
        r#"<template><frame title="Flow"><row><rect key="a">A</rect><connector from="a" to="b" style="dashed"/><rect key="b">B</rect></row></frame></template>"#,
    );
    let layout = layout_template(&node, 0.0, 0.0);
    let kinds: Vec<&str> = layout
        .placed
        .iter()
        .map(|p| match p {
            Placed::Object(o) => o.kind,
            Placed::Connector(_) => "connector",
        })
        .collect();
    assert_eq!(kinds, vec!["frame", "rectangle", "rectangle", "connector"]);
    let objs = objects(&layout);
    assert_eq!(objs[1].text.as_deref(), Some("A"));
    assert_eq!(objs[2].key.as_deref(), Some("b"));
    assert!(objs[1].x < objs[2].x);
    // The connector takes no room: two rects and one gap.
    assert!(close(layout.width, 200.0 + 30.0 + 200.0 + 60.0));
    let Placed::Connector(c) = &layout.placed[3] else {
        panic!("expected connector");
    };
    assert_eq!((c.from_key.as_str(), c.to_key.as_str(), c.style.as_str()), ("a", "b", "dashed"));
}

#[test]
fn empty_frame_is_padding_only() {
    let node = tree(r#"<template><frame title="Empty"/></template>"#);
    let layout = layout_template(&node, 0.0, 0.0);
    assert!(close(layout.width, 60.0) && close(layout.height, 80.0));
}
