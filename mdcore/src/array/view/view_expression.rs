//! The view expression syntax.
//!
//! A view expression is a chain of brackets, each either
//!  - a comma-separated list of per-axis selections: an integer index, a `start:stop:step` range (any part omittable), at most one `...`, or `newaxis`, or
//!  - a single quoted compound field name, e.g. `["temperature"]`.
//!
//! Negative indices count from the end of an axis as in `numpy`.

use std::fmt::Display;

use itertools::Itertools;

use crate::array::ArrayError;

/// A selection along one axis of a sliced view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewSelection {
    /// Select a single index and collapse the axis.
    Index(i64),
    /// Select a range of indices.
    Range {
        /// The start index, defaults to the first index in the direction of `step`.
        start: Option<i64>,
        /// The exclusive stop index, defaults to past the last index in the direction of `step`.
        stop: Option<i64>,
        /// The step, defaults to `1`. Must not be zero.
        step: Option<i64>,
    },
    /// Select all indices of as many axes as needed to cover the array.
    Ellipsis,
    /// Insert an axis of size `1`.
    NewAxis,
}

impl Display for ViewSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let part = |value: &Option<i64>| value.map(|value| value.to_string()).unwrap_or_default();
        match self {
            Self::Index(index) => write!(f, "{index}"),
            Self::Range { start, stop, step } => {
                write!(f, "{}:{}", part(start), part(stop))?;
                if step.is_some() {
                    write!(f, ":{}", part(step))?;
                }
                Ok(())
            }
            Self::Ellipsis => write!(f, "..."),
            Self::NewAxis => write!(f, "newaxis"),
        }
    }
}

/// One bracket of a view expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewExpression {
    /// Per-axis selections.
    Slice(Vec<ViewSelection>),
    /// A compound field.
    Field(String),
}

impl Display for ViewExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Slice(selections) => write!(f, "[{}]", selections.iter().join(",")),
            Self::Field(field) => write!(
                f,
                "[\"{}\"]",
                field.replace('\\', "\\\\").replace('"', "\\\"")
            ),
        }
    }
}

impl ViewExpression {
    /// Parse a chain of brackets.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidViewExpression`] if the expression is malformed.
    pub fn parse(expression: &str) -> Result<Vec<Self>, ArrayError> {
        let invalid = |reason: &str| ArrayError::InvalidViewExpression {
            expression: expression.to_string(),
            reason: reason.to_string(),
        };

        let mut brackets = Vec::new();
        let mut rest = expression.trim_start();
        if rest.is_empty() {
            return Err(invalid("the expression is empty"));
        }
        while !rest.is_empty() {
            let Some(body) = rest.strip_prefix('[') else {
                return Err(invalid("expected `[`"));
            };
            let end = find_closing_bracket(body).ok_or_else(|| invalid("missing `]`"))?;
            brackets.push(Self::parse_bracket(&body[..end]).map_err(|reason| invalid(&reason))?);
            rest = body[end + 1..].trim_start();
        }
        Ok(brackets)
    }

    fn parse_bracket(body: &str) -> Result<Self, String> {
        let body = body.trim();
        if let Some(quote) = body.chars().next().filter(|c| *c == '"' || *c == '\'') {
            return parse_quoted(body, quote).map(Self::Field);
        }
        if body.is_empty() {
            return Err("empty brackets".to_string());
        }
        let selections = body
            .split(',')
            .map(parse_selection)
            .collect::<Result<Vec<_>, _>>()?;
        if selections
            .iter()
            .filter(|selection| **selection == ViewSelection::Ellipsis)
            .count()
            > 1
        {
            return Err("more than one `...`".to_string());
        }
        Ok(Self::Slice(selections))
    }
}

/// Find the byte index of the `]` closing a bracket, skipping quoted text.
fn find_closing_bracket(body: &str) -> Option<usize> {
    let mut quote = None;
    let mut escaped = false;
    for (index, c) in body.char_indices() {
        match quote {
            Some(_) if escaped => escaped = false,
            Some(_) if c == '\\' => escaped = true,
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == ']' => return Some(index),
            None => {}
        }
    }
    None
}

fn parse_quoted(body: &str, quote: char) -> Result<String, String> {
    let mut field = String::new();
    let mut chars = body.chars().skip(1);
    while let Some(c) = chars.next() {
        match c {
            '\\' => field.push(chars.next().ok_or("unterminated escape")?),
            c if c == quote => {
                return if chars.next().is_none() {
                    Ok(field)
                } else {
                    Err("a field name must be alone in its brackets".to_string())
                };
            }
            c => field.push(c),
        }
    }
    Err("unterminated quote".to_string())
}

fn parse_integer(token: &str) -> Result<i64, String> {
    token
        .parse()
        .map_err(|_| format!("`{token}` is not an integer"))
}

fn parse_selection(token: &str) -> Result<ViewSelection, String> {
    let token = token.trim();
    match token {
        "" => Err("empty selection".to_string()),
        "..." => Ok(ViewSelection::Ellipsis),
        "newaxis" | "np.newaxis" => Ok(ViewSelection::NewAxis),
        _ if token.contains(':') => {
            let parts: Vec<&str> = token.split(':').map(str::trim).collect();
            if parts.len() > 3 {
                return Err(format!("`{token}` has too many `:`"));
            }
            let part = |i: usize| -> Result<Option<i64>, String> {
                match parts.get(i) {
                    Some(part) if !part.is_empty() => parse_integer(part).map(Some),
                    _ => Ok(None),
                }
            };
            let step = part(2)?;
            if step == Some(0) {
                return Err("the step of a range cannot be zero".to_string());
            }
            Ok(ViewSelection::Range {
                start: part(0)?,
                stop: part(1)?,
                step,
            })
        }
        _ => parse_integer(token).map(ViewSelection::Index),
    }
}
