//! Parser for the GraphQL-inspired query language.
//!
//! Accepted shapes:
//!
//! ```text
//! { logs { dt, message } }
//! { logs(limit: 50, level: 'error') { * } }
//! { logs(since: '2h', where: { requestId: "abc" }) { dt, message } }
//! ```
//!
//! Whitespace and newlines are insignificant, trailing commas are
//! tolerated, and string literals take single or double quotes. There are
//! no escape sequences: a quote character always terminates the literal.
//!
//! Parsing happens in three passes: the grammar pass lexes the envelope
//! into raw arguments and field names, the argument pass types and applies
//! each argument (resolving time expressions against the caller's clock),
//! and the field pass folds the names into a [`FieldSelection`]. The first
//! error anywhere aborts the whole parse.

use super::error::QueryError;
use super::options::{FieldSelection, QueryOptions};
use crate::time;
use chrono::{DateTime, Utc};
use nom::branch::alt;
use nom::bytes::complete::{tag, take_while, take_while1};
use nom::character::complete::{char, digit1, multispace0};
use nom::combinator::{cut, map, map_res, opt};
use nom::multi::separated_list0;
use nom::sequence::{preceded, terminated};
use nom::IResult;

/// The only recognized query root.
const QUERY_ROOT: &str = "logs";

/// Longest fragment echoed back in syntax errors.
const FRAGMENT_LEN: usize = 32;

/// A raw argument value, typed by its literal form.
#[derive(Debug, Clone, PartialEq)]
enum ArgValue {
    Integer(u64),
    Text(String),
    Object(Vec<(String, String)>),
}

impl ArgValue {
    const fn describe(&self) -> &'static str {
        match self {
            Self::Integer(_) => "an integer",
            Self::Text(_) => "a quoted string",
            Self::Object(_) => "an object",
        }
    }
}

/// Parses a complete query into validated [`QueryOptions`].
///
/// Relative time expressions in `since`/`until` resolve against `now`, so
/// parsing is pure: the same input and clock always produce the same
/// options.
///
/// # Errors
///
/// Returns the [`QueryError`] variant matching the first problem found:
/// unknown root or argument names, malformed syntax, truncated input, bad
/// time expressions, an inverted time range, or an invalid field selection.
///
/// # Example
///
/// ```
/// use chrono::Utc;
/// use shared::query::parse_query;
///
/// let options = parse_query("{ logs(limit: 5) { dt, message } }", Utc::now()).unwrap();
/// assert_eq!(options.limit, Some(5));
/// ```
pub fn parse_query(input: &str, now: DateTime<Utc>) -> Result<QueryOptions, QueryError> {
    let source = input.trim();
    if source.is_empty() {
        return Err(QueryError::UnexpectedEof {
            expected: "'{'".to_string(),
        });
    }

    let (rest, _) = section(preceded(multispace0, char('{')), source, "'{'")?;
    let (rest, root) = section(preceded(multispace0, identifier), rest, "a query root")?;
    if root != QUERY_ROOT {
        return Err(QueryError::UnknownRoot(root.to_string()));
    }

    let (rest, arguments) = section(opt(preceded(multispace0, argument_list)), rest, "')'")?;
    let (rest, fields) = section(preceded(multispace0, field_block), rest, "'}'")?;
    let (rest, _) = section(preceded(multispace0, char('}')), rest, "'}'")?;

    let trailing = rest.trim();
    if !trailing.is_empty() {
        return Err(QueryError::Syntax(format!(
            "unexpected trailing content: '{}'",
            fragment(trailing)
        )));
    }

    let mut options = QueryOptions::new();
    for (name, value) in arguments.unwrap_or_default() {
        apply_argument(&mut options, name, value, now)?;
    }
    options.fields = field_selection(&fields)?;
    options.validated()
}

/// Runs one grammar section, translating nom's error levels into
/// [`QueryError`]: exhausted input becomes [`QueryError::UnexpectedEof`]
/// naming the delimiter that would have completed the section, anything
/// else becomes [`QueryError::Syntax`] around the offending fragment.
fn section<'a, T, P>(
    mut parser: P,
    input: &'a str,
    expected: &str,
) -> Result<(&'a str, T), QueryError>
where
    P: FnMut(&'a str) -> IResult<&'a str, T>,
{
    match parser(input) {
        Ok(parsed) => Ok(parsed),
        Err(nom::Err::Error(failure) | nom::Err::Failure(failure)) => {
            if failure.input.trim_start().is_empty() {
                Err(QueryError::UnexpectedEof {
                    expected: expected.to_string(),
                })
            } else {
                Err(QueryError::Syntax(format!(
                    "unexpected input near '{}'",
                    fragment(failure.input)
                )))
            }
        }
        Err(nom::Err::Incomplete(_)) => Err(QueryError::UnexpectedEof {
            expected: expected.to_string(),
        }),
    }
}

fn fragment(input: &str) -> String {
    let trimmed = input.trim();
    let short: String = trimmed.chars().take(FRAGMENT_LEN).collect();
    if trimmed.chars().count() > FRAGMENT_LEN {
        format!("{short}...")
    } else {
        short
    }
}

// ============================================================================
// Grammar pass
// ============================================================================

fn identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(input)
}

fn integer(input: &str) -> IResult<&str, u64> {
    map_res(digit1, str::parse)(input)
}

/// A string literal in either quote style. Once the opening quote is seen
/// the closing one is mandatory, so a runaway literal fails hard instead
/// of backtracking into nonsense.
fn quoted_text(input: &str) -> IResult<&str, &str> {
    alt((
        preceded(
            char('\''),
            cut(terminated(take_while(|c| c != '\''), char('\''))),
        ),
        preceded(
            char('"'),
            cut(terminated(take_while(|c| c != '"'), char('"'))),
        ),
    ))(input)
}

fn comma(input: &str) -> IResult<&str, char> {
    preceded(multispace0, char(','))(input)
}

fn where_entry(input: &str) -> IResult<&str, (String, String)> {
    let (input, _) = multispace0(input)?;
    let (input, key) = identifier(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = char(':')(input)?;
    let (input, _) = multispace0(input)?;
    let (input, value) = cut(quoted_text)(input)?;
    Ok((input, (key.to_string(), value.to_string())))
}

fn object_value(input: &str) -> IResult<&str, ArgValue> {
    let (input, entries) = preceded(
        char('{'),
        cut(terminated(
            terminated(separated_list0(comma, where_entry), opt(comma)),
            preceded(multispace0, char('}')),
        )),
    )(input)?;
    Ok((input, ArgValue::Object(entries)))
}

fn argument_value(input: &str) -> IResult<&str, ArgValue> {
    alt((
        map(integer, ArgValue::Integer),
        map(quoted_text, |text| ArgValue::Text(text.to_string())),
        object_value,
    ))(input)
}

fn argument(input: &str) -> IResult<&str, (&str, ArgValue)> {
    let (input, _) = multispace0(input)?;
    let (input, name) = identifier(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = char(':')(input)?;
    let (input, _) = multispace0(input)?;
    let (input, value) = cut(argument_value)(input)?;
    Ok((input, (name, value)))
}

fn argument_list(input: &str) -> IResult<&str, Vec<(&str, ArgValue)>> {
    preceded(
        char('('),
        cut(terminated(
            terminated(separated_list0(comma, argument), opt(comma)),
            preceded(multispace0, char(')')),
        )),
    )(input)
}

fn field_name(input: &str) -> IResult<&str, &str> {
    preceded(multispace0, alt((tag("*"), identifier)))(input)
}

fn field_block(input: &str) -> IResult<&str, Vec<&str>> {
    preceded(
        char('{'),
        cut(terminated(
            terminated(separated_list0(comma, field_name), opt(comma)),
            preceded(multispace0, char('}')),
        )),
    )(input)
}

// ============================================================================
// Argument and field passes
// ============================================================================

fn apply_argument(
    options: &mut QueryOptions,
    name: &str,
    value: ArgValue,
    now: DateTime<Utc>,
) -> Result<(), QueryError> {
    match (name, value) {
        ("limit", ArgValue::Integer(0)) => {
            Err(QueryError::Syntax("limit must be at least 1".to_string()))
        }
        ("limit", ArgValue::Integer(limit)) => {
            options.limit = Some(limit);
            Ok(())
        }
        ("level", ArgValue::Text(level)) => {
            options.level = Some(level.to_lowercase());
            Ok(())
        }
        ("subsystem", ArgValue::Text(subsystem)) => {
            options.subsystem = Some(subsystem);
            Ok(())
        }
        ("since", ArgValue::Text(expression)) => {
            options.since = Some(time::resolve(&expression, now)?);
            Ok(())
        }
        ("until", ArgValue::Text(expression)) => {
            options.until = Some(time::resolve(&expression, now)?);
            Ok(())
        }
        ("search", ArgValue::Text(pattern)) => {
            options.search_pattern = Some(pattern);
            Ok(())
        }
        ("where", ArgValue::Object(entries)) => {
            for (key, value) in entries {
                options.insert_where(key, value);
            }
            Ok(())
        }
        (
            recognized @ ("limit" | "level" | "subsystem" | "since" | "until" | "search"
            | "where"),
            value,
        ) => Err(QueryError::Syntax(format!(
            "argument '{recognized}' does not accept {}",
            value.describe()
        ))),
        _ => Err(QueryError::UnknownArgument(name.to_string())),
    }
}

fn field_selection(fields: &[&str]) -> Result<FieldSelection, QueryError> {
    if fields.is_empty() {
        return Err(QueryError::FieldSelection(
            "field selection cannot be empty".to_string(),
        ));
    }
    if fields.contains(&"*") {
        if fields.len() > 1 {
            return Err(QueryError::FieldSelection(
                "'*' cannot be combined with named fields".to_string(),
            ));
        }
        return Ok(FieldSelection::All);
    }
    Ok(FieldSelection::columns(fields.iter().copied()))
}

// ============================================================================
// Tests
// ============================================================================
