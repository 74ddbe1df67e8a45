//! Tree types for diagram templates.
//!
//! `Element` is the generic owned markup tree that patches and slot filling
//! edit. `TemplateNode` is the typed tree the layout engine walks, built from
//! an `Element` once edits are done.

// =============================================================================
// MARKUP TREE
// =============================================================================

/// One markup element with ordered attributes, text content, and children.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into(), ..Self::default() }
    }

    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing an existing value in place or appending.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name.to_owned(), value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) {
        self.attrs.retain(|(k, _)| k != name);
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        LeafKind::from_tag(&self.tag).is_some()
    }

    #[must_use]
    pub fn is_container(&self) -> bool {
        ContainerKind::from_tag(&self.tag).is_some()
    }

    #[must_use]
    pub fn is_connector(&self) -> bool {
        self.tag == "connector"
    }
}

// =============================================================================
// TYPED TREE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafKind {
    Sticky,
    Rect,
    Circle,
    Text,
}

impl LeafKind {
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "sticky" => Some(Self::Sticky),
            "rect" => Some(Self::Rect),
            "circle" => Some(Self::Circle),
            "text" => Some(Self::Text),
            _ => None,
        }
    }

    /// Default `(width, height)` when the markup gives none.
    #[must_use]
    pub fn default_size(self) -> (f64, f64) {
        match self {
            Self::Sticky => (200.0, 160.0),
            Self::Rect => (200.0, 100.0),
            Self::Circle => (120.0, 120.0),
            Self::Text => (200.0, 40.0),
        }
    }

    /// Board object kind this leaf becomes.
    #[must_use]
    pub fn object_kind(self) -> &'static str {
        match self {
            Self::Sticky => "sticky",
            Self::Rect => "rectangle",
            Self::Circle => "circle",
            Self::Text => "text",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Grid,
    Row,
    Stack,
}

impl ContainerKind {
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "grid" => Some(Self::Grid),
            "row" => Some(Self::Row),
            "stack" => Some(Self::Stack),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplateNode {
    Leaf {
        kind: LeafKind,
        width: Option<f64>,
        height: Option<f64>,
        text: String,
        color: Option<String>,
        key: Option<String>,
    },
    Container {
        kind: ContainerKind,
        children: Vec<TemplateNode>,
        gap: f64,
        cols: Option<usize>,
    },
    Frame {
        title: String,
        color: Option<String>,
        child: Option<Box<TemplateNode>>,
    },
    Connector {
        from_key: String,
        to_key: String,
        style: String,
        color: Option<String>,
    },
}

impl TemplateNode {
    #[must_use]
    pub fn is_connector(&self) -> bool {
        matches!(self, Self::Connector { .. })
    }
}

// =============================================================================
// LAYOUT OUTPUT
// =============================================================================

/// A positioned object. `x`/`y` are the center point.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSpec {
    pub kind: &'static str,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub text: Option<String>,
    pub color: Option<String>,
    pub title: Option<String>,
    pub key: Option<String>,
}

/// An edge between two keyed objects, resolved after placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorSpec {
    pub from_key: String,
    pub to_key: String,
    pub style: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Placed {
    Object(ObjectSpec),
    Connector(ConnectorSpec),
}

// =============================================================================
// DSL
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DslOperation {
    Apply { name: String, title: Option<String>, slots: Vec<Vec<String>> },
    Patch { path: String, value: String },
}
