//! Line-oriented template DSL.
//!
//! ```text
//! kanban "Sprint 12"; Todo | Write docs | Review; Doing | Build; Done
//! @frame/@color #E3F2FD
//! ```
//!
//! An apply line is `name ["title"] (; slot)*` where each slot splits on `|`.
//! A patch line is `@path value`. Parsing never fails: every non-blank line
//! yields exactly one operation.

use super::ast::DslOperation;

/// Parse DSL text into one operation per non-blank line.
#[must_use]
pub fn parse_dsl(input: &str) -> Vec<DslOperation> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(parse_line)
        .collect()
}

fn parse_line(line: &str) -> DslOperation {
    if let Some(patch) = line.strip_prefix('@') {
        let (path, value) = split_token(patch);
        return DslOperation::Patch { path: path.to_owned(), value: value.to_owned() };
    }

    let (name, mut rest) = split_token(line);
    let mut title = None;
    if let Some(quoted) = rest.strip_prefix('"') {
        // Without a closing quote the whole remainder, opening quote
        // included, is slot text.
        if let Some(end) = quoted.find('"') {
            title = Some(quoted[..end].to_owned());
            rest = &quoted[end + 1..];
        }
    }

    DslOperation::Apply { name: name.to_owned(), title, slots: split_slots(rest) }
}

/// Split off the leading whitespace-delimited token; the remainder is trimmed.
fn split_token(s: &str) -> (&str, &str) {
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim()),
        None => (s, ""),
    }
}

fn split_slots(rest: &str) -> Vec<Vec<String>> {
    rest.split(';')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(|piece| piece.split('|').map(|v| v.trim().to_owned()).collect())
        .collect()
}

#[cfg(test)]
#[path = "dsl_test.rs"]
mod tests;
