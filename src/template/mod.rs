//! Diagram templates: markup, DSL, patches, slot filling, and layout.
//!
//! DESIGN
//! ======
//! Everything here is pure. A DSL submission becomes a list of
//! [`ApplyPlan`]s (each apply with the patches that follow it); [`render`]
//! turns one plan into positioned specs. Creating board objects from those
//! specs is the tool layer's job.
//!
//! Edit order per plan: title, then slots, then patches, so a patch can
//! override anything the slots wrote.

pub mod ast;
pub mod catalog;
pub mod dsl;
pub mod layout;
pub mod markup;
pub mod patch;
pub mod slots;

use tracing::debug;

use crate::error::ErrorCode;
use ast::DslOperation;
pub use catalog::{TemplateCatalog, TemplateEntry, YamlCatalog};
pub use dsl::parse_dsl;
pub use layout::{Layout, layout_template};
pub use markup::MarkupError;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TemplateError {
    #[error("unknown template: {0}")]
    UnknownTemplate(String),
    #[error("invalid template markup: {0}")]
    Markup(#[from] MarkupError),
    #[error("slot group {group} (<{tag}>) has no leaves to fill")]
    LeaflessSlot { group: usize, tag: String },
    #[error("template catalog error: {0}")]
    Catalog(String),
}

impl ErrorCode for TemplateError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownTemplate(_) => "E_UNKNOWN_TEMPLATE",
            Self::Markup(inner) => inner.error_code(),
            Self::LeaflessSlot { .. } => "E_SLOT_LEAFLESS",
            Self::Catalog(_) => "E_CATALOG",
        }
    }
}

// =============================================================================
// PLANS
// =============================================================================

/// One apply line plus the patch lines that follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyPlan {
    pub name: String,
    pub title: Option<String>,
    pub slots: Vec<Vec<String>>,
    pub patches: Vec<(String, String)>,
}

/// Group DSL operations into plans. Patches before the first apply have
/// nothing to attach to; their paths are returned separately.
#[must_use]
pub fn plan(ops: Vec<DslOperation>) -> (Vec<ApplyPlan>, Vec<String>) {
    let mut plans: Vec<ApplyPlan> = Vec::new();
    let mut orphans = Vec::new();
    for op in ops {
        match op {
            DslOperation::Apply { name, title, slots } => {
                plans.push(ApplyPlan { name, title, slots, patches: Vec::new() });
            }
            DslOperation::Patch { path, value } => match plans.last_mut() {
                Some(current) => current.patches.push((path, value)),
                None => orphans.push(path),
            },
        }
    }
    (plans, orphans)
}

/// Output of rendering one plan.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub layout: Layout,
    pub patches_applied: usize,
}

/// Look up, edit, and lay out one plan centered on `(origin_x, origin_y)`.
///
/// # Errors
///
/// Returns a [`TemplateError`] for an unknown template, invalid markup, or a
/// leafless slot group given values.
pub fn render(
    catalog: &dyn TemplateCatalog,
    plan: &ApplyPlan,
    origin_x: f64,
    origin_y: f64,
) -> Result<Rendered, TemplateError> {
    let entry = catalog
        .get(&plan.name)
        .ok_or_else(|| TemplateError::UnknownTemplate(plan.name.clone()))?;

    let mut root = markup::parse_markup(&entry.markup)?;
    if let Some(title) = &plan.title {
        slots::set_title(&mut root, title);
    }
    slots::fill_slots(&mut root, &plan.slots)?;
    let patches_applied = patch::apply_patches(
        &mut root,
        plan.patches
            .iter()
            .map(|(path, value)| (path.as_str(), value.as_str())),
    );
    if patches_applied < plan.patches.len() {
        debug!(template = %plan.name, skipped = plan.patches.len() - patches_applied, "template: patches skipped");
    }

    let tree = markup::build_tree(&root)?;
    Ok(Rendered { layout: layout_template(&tree, origin_x, origin_y), patches_applied })
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
