use super::*;

#[test]
fn board_tools_cover_every_kind() {
    let tools = board_tools();
    assert_eq!(tools.len(), ToolKind::ALL.len());
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "createObject",
            "updateObjects",
            "deleteObjects",
            "getBoardState",
            "fitFrameToContents",
            "layoutObjects",
            "applyTemplate",
            "searchTemplates"
        ]
    );
}

#[test]
fn names_round_trip() {
    for kind in ToolKind::ALL {
        assert_eq!(ToolKind::from_name(kind.name()), Some(kind));
    }
    assert_eq!(ToolKind::from_name("create_objects"), None);
}

#[test]
fn schemas_are_objects_with_descriptions() {
    for tool in board_tools() {
        assert_eq!(tool.input_schema["type"], "object", "{}", tool.name);
        assert!(!tool.description.is_empty());
    }
}

#[test]
fn required_fields_match_handlers() {
    let tools = board_tools();
    let required = |name: &str| {
        tools
            .iter()
            .find(|t| t.name == name)
            .and_then(|t| t.input_schema.get("required").cloned())
    };
    assert_eq!(required("createObject"), Some(serde_json::json!(["kind"])));
    assert_eq!(required("applyTemplate"), Some(serde_json::json!(["dsl"])));
    assert_eq!(required("layoutObjects"), Some(serde_json::json!(["targets", "mode"])));
    assert_eq!(required("searchTemplates"), None);
}
