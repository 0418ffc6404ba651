//! Bracket-string template parsing (§4.1): `list[int]`, `dict[str, list[int]]`.
//!
//! Grounded on `examples/original_source/egpcommon/egpcommon/type_string_parser.py`
//! — a recursive split on the outermost `[...]`, comma-separated at depth 1.

use egp_common::{CommonError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// A parsed (but not yet resolved) template expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateExpr {
    pub base: String,
    pub args: Vec<TemplateExpr>,
}

impl TemplateExpr {
    pub fn leaf(name: impl Into<String>) -> Self {
        TemplateExpr {
            base: name.into(),
            args: Vec::new(),
        }
    }
}

/// Parses `"dict[str, list[int]]"` into a [`TemplateExpr`] tree.
///
/// Malformed input (unbalanced brackets, empty argument, invalid base name)
/// is reported as `CommonError::Parse` — the Type Registry maps this to a
/// `ParseError` failure mode (§4.1).
pub fn parse(input: &str) -> Result<TemplateExpr> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CommonError::Parse("empty type expression".into()));
    }
    let (expr, rest) = parse_one(input)?;
    if !rest.trim().is_empty() {
        return Err(CommonError::Parse(format!(
            "trailing input after type expression: {rest:?}"
        )));
    }
    Ok(expr)
}

fn parse_one(input: &str) -> Result<(TemplateExpr, &str)> {
    let open = input.find('[');
    let bracket_pos = match open {
        None => None,
        Some(pos) => {
            // A `[` only starts an argument list if it appears before any
            // top-level comma/close-bracket that would end this term.
            Some(pos)
        }
    };

    match bracket_pos {
        None => {
            let end = input
                .find(|c: char| c == ',' || c == ']')
                .unwrap_or(input.len());
            let name = &input[..end];
            validate_name(name)?;
            Ok((TemplateExpr::leaf(name), &input[end..]))
        }
        Some(open_pos) => {
            let name = &input[..open_pos];
            validate_name(name)?;
            let mut rest = &input[open_pos + 1..];
            let mut args = Vec::new();
            loop {
                let (arg, tail) = parse_one(rest)?;
                args.push(arg);
                let tail = tail.trim_start();
                if let Some(after_comma) = tail.strip_prefix(',') {
                    rest = after_comma.trim_start();
                    continue;
                }
                if let Some(after_close) = tail.strip_prefix(']') {
                    rest = after_close;
                    break;
                }
                return Err(CommonError::Parse(format!(
                    "expected ',' or ']' in {input:?}, found {tail:?}"
                )));
            }
            if args.is_empty() {
                return Err(CommonError::Parse(format!(
                    "template {name:?} has no type arguments"
                )));
            }
            Ok((
                TemplateExpr {
                    base: name.to_string(),
                    args,
                },
                rest,
            ))
        }
    }
}

fn validate_name(name: &str) -> Result<()> {
    if !NAME_RE.is_match(name) {
        return Err(CommonError::Parse(format!("invalid type name {name:?}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_leaf() {
        assert_eq!(parse("int").unwrap(), TemplateExpr::leaf("int"));
    }

    #[test]
    fn parses_single_arg_template() {
        let expr = parse("list[int]").unwrap();
        assert_eq!(expr.base, "list");
        assert_eq!(expr.args, vec![TemplateExpr::leaf("int")]);
    }

    #[test]
    fn parses_nested_multi_arg_template() {
        let expr = parse("dict[str, list[int]]").unwrap();
        assert_eq!(expr.base, "dict");
        assert_eq!(expr.args.len(), 2);
        assert_eq!(expr.args[0], TemplateExpr::leaf("str"));
        assert_eq!(expr.args[1].base, "list");
    }

    #[test]
    fn rejects_unbalanced_brackets() {
        assert!(parse("list[int").is_err());
    }

    #[test]
    fn rejects_empty_args() {
        assert!(parse("list[]").is_err());
    }

    #[test]
    fn rejects_invalid_name() {
        assert!(parse("1list[int]").is_err());
    }
}
