//! Built-in collection methods.
//!
//! These answer member calls on arrays and objects when the collection has
//! no entry of that name, so `pages.count` works and `{count: 3}.count`
//! still reads the key.

use std::cmp::Ordering;

use crate::{evaluator::EvalError, value::Value};

/// Reads a member of an element, through the engine's interceptor.
pub(crate) type ReadMember<'a> = dyn Fn(&Value, &str) -> Result<Value, EvalError> + 'a;

/// Runs the built-in `name` on `target`; `None` when there is no such built-in.
pub(crate) fn call(
    target: &Value,
    name: &str,
    args: &[Value],
    read: &ReadMember<'_>,
) -> Option<Result<Value, EvalError>> {
    match target {
        Value::Array(items) => array_method(items, name, args, read),
        Value::Object(map) => {
            let result = match name {
                "count" | "length" => Value::Integer(map.len() as i64),
                "keys" => Value::Array(map.keys().map(|k| Value::String(k.clone())).collect()),
                "values" => Value::Array(map.values().cloned().collect()),
                "first" => map.values().next().cloned().unwrap_or(Value::Null),
                "last" => map.values().last().cloned().unwrap_or(Value::Null),
                "isEmpty" => Value::Boolean(map.is_empty()),
                "isNotEmpty" => Value::Boolean(!map.is_empty()),
                _ => return None,
            };
            Some(Ok(result))
        }
        _ => None,
    }
}

fn array_method(
    items: &[Value],
    name: &str,
    args: &[Value],
    read: &ReadMember<'_>,
) -> Option<Result<Value, EvalError>> {
    let result = match name {
        "count" | "length" => Ok(Value::Integer(items.len() as i64)),
        "first" => Ok(items.first().cloned().unwrap_or(Value::Null)),
        "last" => Ok(items.last().cloned().unwrap_or(Value::Null)),
        "isEmpty" => Ok(Value::Boolean(items.is_empty())),
        "isNotEmpty" => Ok(Value::Boolean(!items.is_empty())),
        "filter" => filter(items, args, read),
        "map" => map(items, args, read),
        "pluck" => pluck(items, args, read),
        "any" => any(items, args, read),
        "all" => all(items, args, read),
        "sum" => sum(items, args, read),
        "min" => Ok(extreme(items, Ordering::Less)),
        "max" => Ok(extreme(items, Ordering::Greater)),
        "avg" => avg(items, args, read),
        "unique" => Ok(unique(items)),
        "sort" => sort(items, args, read),
        "reverse" => Ok(Value::Array(items.iter().rev().cloned().collect())),
        "flatten" => Ok(flatten(items)),
        "join" => Ok(join(items, args)),
        _ => return None,
    };
    Some(result)
}

/// Applies a selector argument to one element: a function is called with the
/// element, a string names a member of it.
fn select(item: &Value, selector: &Value, method: &str, read: &ReadMember<'_>) -> Result<Value, EvalError> {
    match selector {
        Value::Function(f) => f.call(std::slice::from_ref(item)),
        Value::String(member) => read(item, member),
        other => Err(EvalError::TypeError(format!(
            ".{}() expects a function or member name, got {}",
            method,
            other.kind()
        ))),
    }
}

fn required<'v>(args: &'v [Value], method: &str) -> Result<&'v Value, EvalError> {
    args.first().ok_or_else(|| {
        EvalError::TypeError(format!(".{}() requires a predicate argument", method))
    })
}

fn filter(items: &[Value], args: &[Value], read: &ReadMember<'_>) -> Result<Value, EvalError> {
    let predicate = required(args, "filter")?;
    let mut result = Vec::new();
    for item in items {
        if select(item, predicate, "filter", read)?.is_truthy() {
            result.push(item.clone());
        }
    }
    Ok(Value::Array(result))
}

fn map(items: &[Value], args: &[Value], read: &ReadMember<'_>) -> Result<Value, EvalError> {
    let mapper = required(args, "map")?;
    items
        .iter()
        .map(|item| select(item, mapper, "map", read))
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

fn pluck(items: &[Value], args: &[Value], read: &ReadMember<'_>) -> Result<Value, EvalError> {
    match args.first() {
        Some(Value::String(member)) => items
            .iter()
            .map(|item| read(item, member))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        _ => Err(EvalError::TypeError(
            ".pluck() requires a member name".to_string(),
        )),
    }
}

/// `.any()` - true if any element (or its selection) is truthy
fn any(items: &[Value], args: &[Value], read: &ReadMember<'_>) -> Result<Value, EvalError> {
    for item in items {
        let value = match args.first() {
            Some(predicate) => select(item, predicate, "any", read)?,
            None => item.clone(),
        };
        if value.is_truthy() {
            return Ok(Value::Boolean(true));
        }
    }
    Ok(Value::Boolean(false))
}

/// `.all()` - true if every element (or its selection) is truthy; true for
/// an empty array
fn all(items: &[Value], args: &[Value], read: &ReadMember<'_>) -> Result<Value, EvalError> {
    for item in items {
        let value = match args.first() {
            Some(predicate) => select(item, predicate, "all", read)?,
            None => item.clone(),
        };
        if !value.is_truthy() {
            return Ok(Value::Boolean(false));
        }
    }
    Ok(Value::Boolean(true))
}

/// Elements (or their selections) coerced the way arithmetic coerces its
/// operands.
fn numbers(items: &[Value], args: &[Value], method: &str, read: &ReadMember<'_>) -> Result<Vec<Value>, EvalError> {
    items
        .iter()
        .map(|item| {
            let value = match args.first() {
                Some(selector) => select(item, selector, method, read)?,
                None => item.clone(),
            };
            value.to_number().ok_or_else(|| {
                EvalError::TypeError(format!(
                    ".{}() requires numeric values, got {}",
                    method,
                    value.kind()
                ))
            })
        })
        .collect()
}

fn sum(items: &[Value], args: &[Value], read: &ReadMember<'_>) -> Result<Value, EvalError> {
    let mut sum_int: i64 = 0;
    let mut sum_float: f64 = 0.0;
    let mut has_float = false;

    for value in numbers(items, args, "sum", read)? {
        match value {
            Value::Integer(n) if !has_float => match sum_int.checked_add(n) {
                Some(total) => sum_int = total,
                None => {
                    sum_float = sum_int as f64 + n as f64;
                    has_float = true;
                }
            },
            Value::Integer(n) => sum_float += n as f64,
            Value::Float(n) => {
                if !has_float {
                    sum_float = sum_int as f64;
                    has_float = true;
                }
                sum_float += n;
            }
            _ => {}
        }
    }

    if has_float {
        Ok(Value::Float(sum_float))
    } else {
        Ok(Value::Integer(sum_int))
    }
}

/// Smallest (`Less`) or largest (`Greater`) element; null for an empty array.
fn extreme(items: &[Value], wanted: Ordering) -> Value {
    let mut best: Option<&Value> = None;
    for item in items {
        match best {
            Some(current) if compare_values(item, current) != wanted => {}
            _ => best = Some(item),
        }
    }
    best.cloned().unwrap_or(Value::Null)
}

/// Mean of the elements (or their selections); null for an empty array.
fn avg(items: &[Value], args: &[Value], read: &ReadMember<'_>) -> Result<Value, EvalError> {
    let values = numbers(items, args, "avg", read)?;
    if values.is_empty() {
        return Ok(Value::Null);
    }
    let total: f64 = values.iter().filter_map(Value::as_float).sum();
    Ok(Value::Float(total / values.len() as f64))
}

fn unique(items: &[Value]) -> Value {
    let mut result: Vec<Value> = Vec::new();
    for item in items {
        if !result.contains(item) {
            result.push(item.clone());
        }
    }
    Value::Array(result)
}

fn sort(items: &[Value], args: &[Value], read: &ReadMember<'_>) -> Result<Value, EvalError> {
    let mut keyed = Vec::with_capacity(items.len());
    for item in items {
        let key = match args.first() {
            Some(selector) => select(item, selector, "sort", read)?,
            None => item.clone(),
        };
        keyed.push((item.clone(), key));
    }

    keyed.sort_by(|(_, a), (_, b)| compare_values(a, b));
    Ok(Value::Array(keyed.into_iter().map(|(item, _)| item).collect()))
}

/// One level of flattening.
fn flatten(items: &[Value]) -> Value {
    let mut result = Vec::new();
    for item in items {
        match item {
            Value::Array(inner) => result.extend(inner.iter().cloned()),
            other => result.push(other.clone()),
        }
    }
    Value::Array(result)
}

fn join(items: &[Value], args: &[Value]) -> Value {
    let separator = args
        .first()
        .map(Value::as_string)
        .unwrap_or_else(|| ", ".to_string());
    let parts: Vec<String> = items.iter().map(Value::as_string).collect();
    Value::String(parts.join(&separator))
}

/// Ordering used by sorting and min/max: numbers numerically, strings
/// lexicographically, booleans false first; mixed kinds compare equal.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
        (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => a
            .as_float()
            .zip(b.as_float())
            .and_then(|(a, b)| a.partial_cmp(&b))
            .unwrap_or(Ordering::Equal),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
        _ => Ordering::Equal,
    }
}
