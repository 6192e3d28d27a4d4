//! A constrained jq-subset evaluator for the `non_opml_blogroll_urls`
//! `handler: jq` config entries. Supports the path language real blogroll
//! aggregators actually publish against: dotted field access, `[]` array
//! iteration, and `|` pipes between steps -- e.g. `.feeds[].url` or
//! `.data | .items[] | .link`. Not a general jq implementation: no
//! filters, no arithmetic, no `select()`. Anything outside this subset is
//! a query-author error, reported rather than silently ignored.

use serde_json::Value;

#[derive(Debug, PartialEq, Eq)]
enum Step {
    Field(String),
    Iterate,
}

/// Parse a jq-subset query into pipeline steps. `.` alone yields no steps
/// (identity). `.a.b[].c` yields [Field(a), Field(b), Iterate, Field(c)].
fn parse(query: &str) -> Result<Vec<Step>, String> {
    let mut steps = Vec::new();
    for stage in query.split('|').map(|s| s.trim()) {
        let mut chars = stage.chars().peekable();
        if chars.peek() != Some(&'.') {
            return Err(format!("jq query stage must start with '.': {stage}"));
        }
        chars.next();
        let mut current = String::new();
        while let Some(&c) = chars.peek() {
            match c {
                '.' => {
                    if !current.is_empty() {
                        steps.push(Step::Field(std::mem::take(&mut current)));
                    }
                    chars.next();
                }
                '[' => {
                    if !current.is_empty() {
                        steps.push(Step::Field(std::mem::take(&mut current)));
                    }
                    chars.next();
                    match chars.next() {
                        Some(']') => steps.push(Step::Iterate),
                        other => return Err(format!("unsupported bracket expression: [{other:?}")),
                    }
                }
                _ => {
                    current.push(c);
                    chars.next();
                }
            }
        }
        if !current.is_empty() {
            steps.push(Step::Field(current));
        }
    }
    Ok(steps)
}

fn apply(values: Vec<Value>, step: &Step) -> Vec<Value> {
    match step {
        Step::Field(name) => values
            .into_iter()
            .filter_map(|v| v.as_object().and_then(|o| o.get(name)).cloned())
            .collect(),
        Step::Iterate => values
            .into_iter()
            .flat_map(|v| match v {
                Value::Array(items) => items,
                other => vec![other],
            })
            .collect(),
    }
}

/// Run a jq-subset query against a decoded JSON document, returning every
/// string-typed leaf the query selects. Non-string leaves are skipped with
/// an error message rather than aborting the whole batch.
pub fn run(document: &Value, query: &str) -> Result<Vec<String>, String> {
    let steps = parse(query)?;
    let mut current = vec![document.clone()];
    for step in &steps {
        current = apply(current, step);
    }
    Ok(current
        .into_iter()
        .filter_map(|v| v.as_str().map(|s| s.to_string()))
        .collect())
}
