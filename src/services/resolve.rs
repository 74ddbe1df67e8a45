//! Object reference resolution.
//!
//! A reference is either a full UUID or a three-word label. An exact id on
//! the board always wins. Labels are a convenience alias and are never
//! trusted on their own: a label shared by several objects is ambiguous.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use uuid::Uuid;

use crate::label::{normalize_label, uuid_to_label};
use crate::state::BoardObject;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub id: Uuid,
    pub label: String,
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("no object matches '{reference}' ({object_count} objects on the board)")]
    NotFound { reference: String, object_count: usize, kinds: BTreeMap<String, usize> },
    #[error("'{reference}' matches {} objects; use the id", candidates.len())]
    Ambiguous { reference: String, candidates: Vec<Candidate> },
}

impl crate::error::ErrorCode for ResolveError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "E_OBJECT_NOT_FOUND",
            Self::Ambiguous { .. } => "E_AMBIGUOUS_REFERENCE",
        }
    }
}

/// Resolve one reference against a board snapshot.
///
/// # Errors
///
/// [`ResolveError::NotFound`] with a kind histogram when nothing matches;
/// [`ResolveError::Ambiguous`] listing every candidate when a label is shared.
pub fn resolve<'a>(objects: &'a HashMap<Uuid, BoardObject>, reference: &str) -> Result<&'a BoardObject, ResolveError> {
    let trimmed = reference.trim();
    if let Ok(id) = Uuid::try_parse(trimmed) {
        if let Some(obj) = objects.get(&id) {
            return Ok(obj);
        }
    }

    let wanted = normalize_label(trimmed);
    let mut matches: Vec<&BoardObject> = objects
        .values()
        .filter(|obj| uuid_to_label(&obj.id) == wanted)
        .collect();

    match matches.len() {
        0 => {
            let mut kinds = BTreeMap::new();
            for obj in objects.values() {
                *kinds.entry(obj.kind.clone()).or_insert(0) += 1;
            }
            Err(ResolveError::NotFound { reference: trimmed.to_owned(), object_count: objects.len(), kinds })
        }
        1 => Ok(matches[0]),
        _ => {
            matches.sort_by_key(|obj| obj.id);
            let candidates = matches
                .into_iter()
                .map(|obj| Candidate { id: obj.id, label: wanted.clone(), kind: obj.kind.clone() })
                .collect();
            Err(ResolveError::Ambiguous { reference: trimmed.to_owned(), candidates })
        }
    }
}

/// Resolve every reference, stopping at the first failure.
///
/// # Errors
///
/// The first reference that fails to resolve.
pub fn resolve_all<'a, S: AsRef<str>>(
    objects: &'a HashMap<Uuid, BoardObject>,
    references: &[S],
) -> Result<Vec<&'a BoardObject>, ResolveError> {
    references
        .iter()
        .map(|r| resolve(objects, r.as_ref()))
        .collect()
}

#[cfg(test)]
#[path = "resolve_test.rs"]
mod tests;
