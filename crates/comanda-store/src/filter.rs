use bson::{Bson, Document};
use regex::Regex;

use crate::document::{compare_values, path_values, values_eq};
use crate::error::StoreError;

/// A recursive filter expression tree, parsed once per request.
#[derive(Debug, Clone)]
pub enum Expression {
    // Logical
    And(Vec<Expression>),
    Or(Vec<Expression>),
    // Comparison (field path + owned value)
    Eq(String, Bson),
    Ne(String, Bson),
    In(String, Vec<Bson>),
    Nin(String, Vec<Bson>),
    Gt(String, Bson),
    Gte(String, Bson),
    Lt(String, Bson),
    Lte(String, Bson),
    // Pattern
    Regex(String, Regex),
    // Existence
    Exists(String, bool),
}

/// Parse a filter document into an `Expression`. An empty document matches
/// every record.
pub fn parse_filter(filter: &Document) -> Result<Expression, StoreError> {
    let mut children = Vec::with_capacity(filter.len());
    for (key, value) in filter {
        match key.as_str() {
            "$and" => children.push(Expression::And(parse_logical(key, value)?)),
            "$or" => children.push(Expression::Or(parse_logical(key, value)?)),
            k if k.starts_with('$') => {
                return Err(StoreError::InvalidFilter(format!(
                    "unknown top-level operator: {k}"
                )));
            }
            _ => parse_field_condition(key, value, &mut children)?,
        }
    }

    if children.len() == 1 {
        if let Some(only) = children.pop() {
            return Ok(only);
        }
    }
    Ok(Expression::And(children))
}

fn parse_logical(op: &str, value: &Bson) -> Result<Vec<Expression>, StoreError> {
    let Bson::Array(items) = value else {
        return Err(StoreError::InvalidFilter(format!("{op} value must be an array")));
    };
    if items.is_empty() {
        return Err(StoreError::InvalidFilter(format!("{op} array must not be empty")));
    }
    items
        .iter()
        .map(|item| match item {
            Bson::Document(sub) => parse_filter(sub),
            _ => Err(StoreError::InvalidFilter(format!(
                "{op} array elements must be documents"
            ))),
        })
        .collect()
}

/// Either an implicit `$eq` or an operator sub-document such as
/// `{ "$gte": 10, "$lte": 20 }`.
fn parse_field_condition(
    field: &str,
    value: &Bson,
    out: &mut Vec<Expression>,
) -> Result<(), StoreError> {
    let ops = match value {
        Bson::Document(sub) if sub.keys().next().is_some_and(|k| k.starts_with('$')) => sub,
        Bson::RegularExpression(re) => {
            out.push(Expression::Regex(
                field.to_string(),
                compile_regex(&re.pattern, &re.options)?,
            ));
            return Ok(());
        }
        _ => {
            out.push(Expression::Eq(field.to_string(), value.clone()));
            return Ok(());
        }
    };

    let options = match ops.get("$options") {
        Some(Bson::String(opts)) => opts.as_str(),
        Some(_) => {
            return Err(StoreError::InvalidFilter("$options must be a string".into()));
        }
        None => "",
    };

    let field = field.to_string();
    for (op, operand) in ops {
        let expr = match op.as_str() {
            "$eq" => Expression::Eq(field.clone(), operand.clone()),
            "$ne" => Expression::Ne(field.clone(), operand.clone()),
            "$gt" => Expression::Gt(field.clone(), operand.clone()),
            "$gte" => Expression::Gte(field.clone(), operand.clone()),
            "$lt" => Expression::Lt(field.clone(), operand.clone()),
            "$lte" => Expression::Lte(field.clone(), operand.clone()),
            "$in" => match operand {
                Bson::Array(items) => Expression::In(field.clone(), items.clone()),
                _ => return Err(StoreError::InvalidFilter("$in value must be an array".into())),
            },
            "$nin" => match operand {
                Bson::Array(items) => Expression::Nin(field.clone(), items.clone()),
                _ => return Err(StoreError::InvalidFilter("$nin value must be an array".into())),
            },
            "$exists" => match operand {
                Bson::Boolean(b) => Expression::Exists(field.clone(), *b),
                _ => {
                    return Err(StoreError::InvalidFilter(
                        "$exists value must be a boolean".into(),
                    ));
                }
            },
            "$regex" => match operand {
                Bson::String(pattern) => {
                    Expression::Regex(field.clone(), compile_regex(pattern, options)?)
                }
                Bson::RegularExpression(re) => {
                    Expression::Regex(field.clone(), compile_regex(&re.pattern, &re.options)?)
                }
                _ => return Err(StoreError::InvalidFilter("$regex value must be a string".into())),
            },
            "$options" => continue,
            other => {
                return Err(StoreError::InvalidFilter(format!("unknown operator: {other}")));
            }
        };
        out.push(expr);
    }
    Ok(())
}

fn compile_regex(pattern: &str, options: &str) -> Result<Regex, StoreError> {
    let mut flags = String::new();
    for c in options.chars() {
        match c {
            'i' | 'm' | 's' | 'x' => flags.push(c),
            other => {
                return Err(StoreError::InvalidFilter(format!(
                    "unsupported regex option: {other}"
                )));
            }
        }
    }
    let full = if flags.is_empty() {
        pattern.to_string()
    } else {
        format!("(?{flags}){pattern}")
    };
    Regex::new(&full).map_err(|e| StoreError::InvalidFilter(format!("invalid regex: {e}")))
}

/// Evaluate an expression against a document.
///
/// Array-valued fields match when any element matches, except for `$eq`
/// against an array operand, which also compares the array as a whole.
pub fn matches(doc: &Document, expr: &Expression) -> bool {
    match expr {
        Expression::And(children) => children.iter().all(|c| matches(doc, c)),
        Expression::Or(children) => children.iter().any(|c| matches(doc, c)),
        Expression::Eq(field, target) => eq_matches(doc, field, target),
        Expression::Ne(field, target) => !eq_matches(doc, field, target),
        Expression::In(field, targets) => targets.iter().any(|t| eq_matches(doc, field, t)),
        Expression::Nin(field, targets) => !targets.iter().any(|t| eq_matches(doc, field, t)),
        Expression::Gt(field, target) => cmp_matches(doc, field, target, |o| o.is_gt()),
        Expression::Gte(field, target) => cmp_matches(doc, field, target, |o| o.is_ge()),
        Expression::Lt(field, target) => cmp_matches(doc, field, target, |o| o.is_lt()),
        Expression::Lte(field, target) => cmp_matches(doc, field, target, |o| o.is_le()),
        Expression::Regex(field, re) => any_candidate(doc, field, |v| match v {
            Bson::String(s) => re.is_match(s),
            _ => false,
        }),
        Expression::Exists(field, should_exist) => {
            !path_values(doc, field).is_empty() == *should_exist
        }
    }
}

fn eq_matches(doc: &Document, field: &str, target: &Bson) -> bool {
    let values = path_values(doc, field);
    if values.is_empty() {
        return matches!(target, Bson::Null);
    }
    values.iter().any(|v| {
        values_eq(v, target)
            || match v {
                Bson::Array(items) => items.iter().any(|item| values_eq(item, target)),
                _ => false,
            }
    })
}

/// Range operators only compare values of the same kind, so `{"$gt": 5}` never
/// matches a string.
fn cmp_matches(
    doc: &Document,
    field: &str,
    target: &Bson,
    accept: impl Fn(std::cmp::Ordering) -> bool,
) -> bool {
    any_candidate(doc, field, |v| {
        same_kind(v, target) && accept(compare_values(Some(v), Some(target)))
    })
}

fn same_kind(a: &Bson, b: &Bson) -> bool {
    let numeric = |v: &Bson| matches!(v, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_));
    (numeric(a) && numeric(b)) || std::mem::discriminant(a) == std::mem::discriminant(b)
}

/// Scalars at the path, with leaf arrays flattened one level.
fn any_candidate(doc: &Document, field: &str, pred: impl Fn(&Bson) -> bool) -> bool {
    path_values(doc, field).into_iter().any(|v| match v {
        Bson::Array(items) => items.iter().any(&pred),
        other => pred(other),
    })
}
