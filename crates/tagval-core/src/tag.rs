//! Tag grammar: `rule[=param][,rule[=param]]*`.
//!
//! Tokens are trimmed. Each is resolved against the field it annotates,
//! so a literal is parsed as the field's kind exactly once.

use crate::constraint::{Constraint, Rejection, RuleKind};
use crate::error::CompileError;
use crate::reflect::Kind;

/// The field a tag is being compiled for.
#[derive(Debug, Clone, Copy)]
pub struct FieldContext<'a> {
    /// Cache key of the owning record, for error messages.
    pub record: &'a str,
    pub field: &'a str,
    /// Dereferenced kind of the declared type.
    pub kind: Kind,
    /// Dereferenced element kind for arrays and slices.
    pub elem: Option<Kind>,
    /// Whether the declared type had at least one pointer layer.
    pub declared_pointer: bool,
}

/// Parses one field's tag into constraints, in declaration order.
///
/// An empty (or all-whitespace) tag yields no constraints.
pub fn parse_tag(tag: &str, ctx: &FieldContext<'_>) -> Result<Vec<Constraint>, CompileError> {
    if tag.trim().is_empty() {
        return Ok(Vec::new());
    }

    tag.split(',')
        .map(|token| parse_token(tag, token.trim(), ctx))
        .collect()
}

fn parse_token(tag: &str, token: &str, ctx: &FieldContext<'_>) -> Result<Constraint, CompileError> {
    if token.is_empty() {
        return Err(CompileError::MalformedTag {
            record: ctx.record.to_string(),
            field: ctx.field.to_string(),
            tag: tag.to_string(),
            reason: "empty rule token".into(),
        });
    }

    let (name, param) = match token.split_once('=') {
        Some((name, param)) => (name.trim(), Some(param.trim())),
        None => (token, None),
    };

    let Some(rule) = RuleKind::from_name(name) else {
        return Err(CompileError::UnsupportedRule {
            record: ctx.record.to_string(),
            field: ctx.field.to_string(),
            fragment: token.to_string(),
            reason: "unknown rule name".into(),
        });
    };

    Constraint::compile(rule, param, token, ctx).map_err(|rejection| match rejection {
        Rejection::Unsupported(reason) => CompileError::UnsupportedRule {
            record: ctx.record.to_string(),
            field: ctx.field.to_string(),
            fragment: token.to_string(),
            reason,
        },
        Rejection::InvalidLiteral(target) => CompileError::InvalidLiteral {
            record: ctx.record.to_string(),
            field: ctx.field.to_string(),
            fragment: token.to_string(),
            target,
        },
        Rejection::Malformed(reason) => CompileError::MalformedTag {
            record: ctx.record.to_string(),
            field: ctx.field.to_string(),
            tag: tag.to_string(),
            reason,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::Param;

    fn ctx(kind: Kind) -> FieldContext<'static> {
        FieldContext {
            record: "app::Order",
            field: "qty",
            kind,
            elem: None,
            declared_pointer: false,
        }
    }

    #[test]
    fn test_empty_tag_yields_no_constraints() {
        assert!(parse_tag("", &ctx(Kind::Int)).unwrap().is_empty());
        assert!(parse_tag("   ", &ctx(Kind::Int)).unwrap().is_empty());
    }

    #[test]
    fn test_tokens_keep_declaration_order() {
        let constraints = parse_tag("gt=1, ls=10 ,eq=5", &ctx(Kind::Int)).unwrap();
        let rules: Vec<_> = constraints.iter().map(|c| c.rule()).collect();
        assert_eq!(rules, vec![RuleKind::Gt, RuleKind::Ls, RuleKind::Eq]);
        let fragments: Vec<_> = constraints.iter().map(|c| c.fragment()).collect();
        assert_eq!(fragments, vec!["gt=1", "ls=10", "eq=5"]);
        assert_eq!(constraints[1].param(), &Param::Int(10));
    }

    #[test]
    fn test_unknown_rule_names_the_fragment() {
        let err = parse_tag("gt=1,bogus", &ctx(Kind::Int)).unwrap_err();
        match err {
            CompileError::UnsupportedRule { fragment, record, field, .. } => {
                assert_eq!(fragment, "bogus");
                assert_eq!(record, "app::Order");
                assert_eq!(field, "qty");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_colon_separator_is_an_unknown_rule() {
        let err = parse_tag("gt:10", &ctx(Kind::Int)).unwrap_err();
        assert_eq!(err.fragment(), Some("gt:10"));
        assert!(matches!(err, CompileError::UnsupportedRule { .. }));
    }

    #[test]
    fn test_invalid_literal_names_target_kind() {
        let err = parse_tag("gt=ten", &ctx(Kind::Int)).unwrap_err();
        assert_eq!(
            err,
            CompileError::InvalidLiteral {
                record: "app::Order".into(),
                field: "qty".into(),
                fragment: "gt=ten".into(),
                target: Kind::Int,
            }
        );
    }

    #[test]
    fn test_missing_parameter_is_invalid_literal() {
        assert!(matches!(
            parse_tag("gt", &ctx(Kind::Int)),
            Err(CompileError::InvalidLiteral { .. })
        ));
        assert!(matches!(
            parse_tag("len=", &ctx(Kind::String)),
            Err(CompileError::InvalidLiteral { target: Kind::Uint, .. })
        ));
    }

    #[test]
    fn test_empty_token_is_malformed() {
        for tag in ["gt=1,,ls=5", "gt=1,", ",gt=1"] {
            match parse_tag(tag, &ctx(Kind::Int)) {
                Err(CompileError::MalformedTag { tag: reported, .. }) => assert_eq!(reported, tag),
                other => panic!("expected malformed tag for {tag:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_required_with_parameter_is_malformed() {
        assert!(matches!(
            parse_tag("required=yes", &ctx(Kind::String)),
            Err(CompileError::MalformedTag { .. })
        ));
    }

    #[test]
    fn test_required_records_declared_pointer() {
        let ptr = FieldContext {
            declared_pointer: true,
            ..ctx(Kind::Int)
        };
        let constraints = parse_tag("required", &ptr).unwrap();
        assert_eq!(constraints[0].param(), &Param::Pointer(true));
    }

    #[test]
    fn test_rule_not_applicable_to_kind() {
        let err = parse_tag("min=1", &ctx(Kind::Int)).unwrap_err();
        assert_eq!(err.fragment(), Some("min=1"));
        assert!(matches!(err, CompileError::UnsupportedRule { .. }));
    }
}
