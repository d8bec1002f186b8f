//! Route pattern parsing.
//!
//! Accepts both brace placeholders (`/todos/{id:int:min(1)}`, `{slug?}`, `{*rest}`)
//! and colon placeholders (`/todos/:id`, `/files/*path`). The documented path always
//! uses plain `{name}` placeholders.

use crate::schema::Schema;
use log::debug;
use std::fmt;

/// Constraint attached to a route placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteConstraint {
    Min(i64),
    Max(i64),
    Range(i64, i64),
    MinLength(usize),
    MaxLength(usize),
    Length(usize, usize),
    Regex(String),
    Alpha,
    /// Type constraints (`int`, `guid`, ...) and anything unrecognized
    Named(String),
}

impl RouteConstraint {
    /// Parses one constraint such as `min(1)` or `length(2,8)`.
    pub fn parse(text: &str) -> Self {
        let (name, argument) = match text.split_once('(') {
            Some((name, rest)) => (name, rest.strip_suffix(')').unwrap_or(rest)),
            None => (text, ""),
        };
        let parsed = match name.to_ascii_lowercase().as_str() {
            "min" => argument.trim().parse().ok().map(RouteConstraint::Min),
            "max" => argument.trim().parse().ok().map(RouteConstraint::Max),
            "range" => parse_pair(argument).map(|(a, b)| RouteConstraint::Range(a, b)),
            "minlength" => argument.trim().parse().ok().map(RouteConstraint::MinLength),
            "maxlength" => argument.trim().parse().ok().map(RouteConstraint::MaxLength),
            "length" => match parse_pair(argument) {
                Some((a, b)) => Some(RouteConstraint::Length(a, b)),
                None => argument
                    .trim()
                    .parse()
                    .ok()
                    .map(|n| RouteConstraint::Length(n, n)),
            },
            "regex" => Some(RouteConstraint::Regex(argument.to_string())),
            "alpha" => Some(RouteConstraint::Alpha),
            _ => None,
        };
        parsed.unwrap_or_else(|| {
            debug!("Keeping route constraint as a name: {}", text);
            RouteConstraint::Named(text.to_string())
        })
    }

    /// Narrows a parameter schema with this constraint.
    pub fn apply(&self, schema: &mut Schema) {
        match self {
            RouteConstraint::Min(min) => schema.minimum = Some(*min as f64),
            RouteConstraint::Max(max) => schema.maximum = Some(*max as f64),
            RouteConstraint::Range(min, max) => {
                schema.minimum = Some(*min as f64);
                schema.maximum = Some(*max as f64);
            }
            RouteConstraint::MinLength(min) => schema.min_length = Some(*min),
            RouteConstraint::MaxLength(max) => schema.max_length = Some(*max),
            RouteConstraint::Length(min, max) => {
                schema.min_length = Some(*min);
                schema.max_length = Some(*max);
            }
            RouteConstraint::Regex(pattern) => schema.pattern = Some(pattern.clone()),
            RouteConstraint::Alpha => schema.pattern = Some("^[A-Za-z]*$".to_string()),
            RouteConstraint::Named(_) => {}
        }
    }
}

fn parse_pair<T: std::str::FromStr>(argument: &str) -> Option<(T, T)> {
    let (a, b) = argument.split_once(',')?;
    Some((a.trim().parse().ok()?, b.trim().parse().ok()?))
}

/// A placeholder in a route pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteParameter {
    pub name: String,
    pub constraints: Vec<RouteConstraint>,
    /// `{name?}`: the segment may be omitted
    pub optional: bool,
    /// `{*name}`, `{**name}` or `*name`
    pub catch_all: bool,
    /// `{name=value}`
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Parameter(RouteParameter),
}

/// A parsed route pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    pub fn parse(raw: &str) -> Self {
        let segments = raw
            .split('/')
            .filter(|part| !part.is_empty())
            .map(parse_segment)
            .collect();
        Self {
            raw: raw.to_string(),
            segments,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn parameters(&self) -> impl Iterator<Item = &RouteParameter> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Parameter(parameter) => Some(parameter),
            Segment::Literal(_) => None,
        })
    }

    /// Placeholder named `name`, if the pattern declares one.
    pub fn parameter(&self, name: &str) -> Option<&RouteParameter> {
        self.parameters().find(|p| p.name == name)
    }

    /// Path as documented: `{name}` placeholders, constraints and markers removed.
    pub fn openapi_path(&self) -> String {
        if self.segments.is_empty() {
            return "/".to_string();
        }
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(text) => format!("/{}", text),
                Segment::Parameter(parameter) => format!("/{{{}}}", parameter.name),
            })
            .collect()
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn parse_segment(part: &str) -> Segment {
    if let Some(inner) = part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
        return Segment::Parameter(parse_placeholder(inner));
    }
    if let Some(name) = part.strip_prefix(':') {
        return Segment::Parameter(RouteParameter {
            name: name.to_string(),
            constraints: Vec::new(),
            optional: false,
            catch_all: false,
            default: None,
        });
    }
    if let Some(name) = part.strip_prefix('*') {
        return Segment::Parameter(RouteParameter {
            name: name.to_string(),
            constraints: Vec::new(),
            optional: false,
            catch_all: true,
            default: None,
        });
    }
    Segment::Literal(part.to_string())
}

fn parse_placeholder(inner: &str) -> RouteParameter {
    let mut parts = split_constraints(inner).into_iter();
    let head = parts.next().unwrap_or_default();

    let catch_all = head.starts_with('*');
    let head = head.trim_start_matches('*');
    let (head, default) = match head.split_once('=') {
        Some((name, value)) => (name, Some(value.to_string())),
        None => (head, None),
    };

    let mut constraints: Vec<String> = parts.collect();
    let mut optional = head.ends_with('?');
    let name = head.trim_end_matches('?').to_string();
    // `{id:int?}` puts the optional marker after the last constraint.
    if let Some(last) = constraints.last_mut() {
        if let Some(stripped) = last.strip_suffix('?') {
            *last = stripped.to_string();
            optional = true;
        }
    }

    RouteParameter {
        name,
        constraints: constraints.iter().map(|c| RouteConstraint::parse(c)).collect(),
        optional,
        catch_all,
        default,
    }
}

/// Splits `name:c1:c2(a:b)` on colons outside parentheses.
fn split_constraints(inner: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    for c in inner.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ':' if depth == 0 => parts.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    parts.push(current);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_convert_path_format() {
        assert_eq!(RoutePattern::parse("/users/:id").openapi_path(), "/users/{id}");
        assert_eq!(
            RoutePattern::parse("/users/:user_id/posts/:post_id").openapi_path(),
            "/users/{user_id}/posts/{post_id}"
        );
        assert_eq!(RoutePattern::parse("/users/{id}").openapi_path(), "/users/{id}");
        assert_eq!(RoutePattern::parse("/users").openapi_path(), "/users");
        assert_eq!(RoutePattern::parse("/").openapi_path(), "/");
    }

    #[test]
    fn test_constraints_are_stripped_from_path() {
        let pattern = RoutePattern::parse("/todos/{id:int:min(1)}/{slug?}/{**rest}");
        assert_eq!(pattern.openapi_path(), "/todos/{id}/{slug}/{rest}");

        let id = pattern.parameter("id").unwrap();
        assert_eq!(
            id.constraints,
            vec![RouteConstraint::Named("int".to_string()), RouteConstraint::Min(1)]
        );
        assert!(pattern.parameter("slug").unwrap().optional);
        assert!(pattern.parameter("rest").unwrap().catch_all);
        assert!(pattern.parameter("missing").is_none());
    }

    #[test]
    fn test_optional_after_constraint_and_default() {
        let pattern = RoutePattern::parse("/pages/{page:int?}/{size=20}");
        let page = pattern.parameter("page").unwrap();
        assert!(page.optional);
        assert_eq!(page.constraints, vec![RouteConstraint::Named("int".to_string())]);
        assert_eq!(pattern.parameter("size").unwrap().default.as_deref(), Some("20"));
    }

    #[test]
    fn test_regex_with_colon() {
        let pattern = RoutePattern::parse("/at/{time:regex(^\\d{{2}}:\\d{{2}}$)}");
        let time = pattern.parameter("time").unwrap();
        assert_eq!(
            time.constraints,
            vec![RouteConstraint::Regex("^\\d{{2}}:\\d{{2}}$".to_string())]
        );
    }

    #[test]
    fn test_apply_constraints() {
        let mut schema = Schema::of_type("integer");
        RouteConstraint::parse("range(1,10)").apply(&mut schema);
        assert_eq!(schema.minimum, Some(1.0));
        assert_eq!(schema.maximum, Some(10.0));

        let mut schema = Schema::of_type("string");
        RouteConstraint::parse("length(3)").apply(&mut schema);
        RouteConstraint::parse("alpha").apply(&mut schema);
        assert_eq!(schema.min_length, Some(3));
        assert_eq!(schema.max_length, Some(3));
        assert_eq!(schema.pattern.as_deref(), Some("^[A-Za-z]*$"));
    }
}
