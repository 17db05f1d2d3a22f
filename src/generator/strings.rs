// src/generator/strings.rs

//! `{token}` interpolation over spec records.
//!
//! Every string inside a record (nested lists and mappings included) has its
//! `{name}` tokens replaced from a substitution table. `{{` and `}}` stand for
//! literal braces. A token with no entry in the table is an `InvalidJob`.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::errors::{BuildclothError, Result};

/// Token name -> replacement text.
pub type Substitutions = BTreeMap<String, String>;

/// Grammar of a `{token}` name.
const TOKEN_NAME: &str = r"[A-Za-z_][A-Za-z0-9_.-]*";

static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\{{\{{|\}}\}}|\{{({TOKEN_NAME})\}}")).expect("token pattern is valid")
});

static WHOLE_TOKEN_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{TOKEN_NAME}$")).expect("token name pattern is valid")
});

/// Whether `name` can be written as `{name}` in a record.
pub fn is_token_name(name: &str) -> bool {
    WHOLE_TOKEN_NAME.is_match(name)
}

/// Apply `strings` to every string value in `value`. Mapping keys are left
/// alone.
pub fn substitute(value: Value, strings: &Substitutions) -> Result<Value> {
    Ok(match value {
        Value::String(s) => Value::String(substitute_str(&s, strings)?),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| substitute(item, strings))
                .collect::<Result<Vec<_>>>()?,
        ),
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, item) in map {
                out.insert(key, substitute(item, strings)?);
            }
            Value::Object(out)
        }
        other => other,
    })
}

pub fn substitute_str(input: &str, strings: &Substitutions) -> Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut last = 0;

    for caps in TOKEN.captures_iter(input) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&input[last..whole.start()]);
        match caps.get(1) {
            Some(key) => match strings.get(key.as_str()) {
                Some(replacement) => out.push_str(replacement),
                None => {
                    return Err(BuildclothError::InvalidJob(format!(
                        "no substitution for '{}' in \"{input}\"",
                        key.as_str()
                    )));
                }
            },
            // `{{` or `}}`
            None => out.push_str(&whole.as_str()[..1]),
        }
        last = whole.end();
    }

    out.push_str(&input[last..]);
    Ok(out)
}
