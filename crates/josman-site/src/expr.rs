//! The macro language expanded in Markdown before rendering.
//!
//! - `$eval{a.b.C.member}` looks the expression up in the precomputed
//!   [`ExpressionResultMap`].
//! - `$evalNow{a.b.C.member()}` resolves it through the [`Evaluator`] at
//!   render time.
//! - `$'eval{..}` and `$'evalNow{..}` are emitted literally without the quote.
//! - `${name}` and `#{name}` are replaced from a property map, `$'{name}` and
//!   `#'{name}` are their literal forms.
//!
//! Expansion is a single left-to-right pass, so text produced by a
//! substitution or an unescape is never scanned again.
//!
//! [`Evaluator`]: crate::evaluator::Evaluator

use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use crate::error::{Error, Result};
use crate::evaluator::EvaluationContext;

/// Expression source text to its precomputed result.
pub type ExpressionResultMap = BTreeMap<String, String>;

/// Which macro introduced an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroKind {
    /// `$eval{}`: precomputed.
    Eval,
    /// `$evalNow{}`: evaluated during rendering.
    EvalNow,
}

/// Openers, longest first so `$evalNow{` never matches as `$eval`.
const OPENERS: [(&str, MacroKind, bool); 4] = [
    ("$'evalNow{", MacroKind::EvalNow, true),
    ("$'eval{", MacroKind::Eval, true),
    ("$evalNow{", MacroKind::EvalNow, false),
    ("$eval{", MacroKind::Eval, false),
];

#[derive(Debug, PartialEq, Eq)]
enum Segment<'a> {
    Literal(&'a str),
    Macro {
        kind: MacroKind,
        escaped: bool,
        /// Full macro text, opener to closing brace.
        raw: &'a str,
        body: &'a str,
    },
}

/// Split text into literals and closed macros. An opener without a closing
/// brace is literal text.
fn scan(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut literal_start = 0;
    let mut pos = 0;

    while let Some(offset) = text[pos..].find('$') {
        let start = pos + offset;
        let rest = &text[start..];
        let opener = OPENERS
            .iter()
            .find(|(prefix, _, _)| rest.starts_with(prefix));
        let Some(&(prefix, kind, escaped)) = opener else {
            pos = start + 1;
            continue;
        };
        let body_start = start + prefix.len();
        let Some(close) = text[body_start..].find('}') else {
            break;
        };
        let end = body_start + close + 1;

        if literal_start < start {
            segments.push(Segment::Literal(&text[literal_start..start]));
        }
        segments.push(Segment::Macro {
            kind,
            escaped,
            raw: &text[start..end],
            body: &text[body_start..end - 1],
        });
        literal_start = end;
        pos = end;
    }
    if literal_start < text.len() {
        segments.push(Segment::Literal(&text[literal_start..]));
    }
    segments
}

/// A parsed `identifier(.identifier)*` reference with optional `()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expr {
    text: String,
    class_path: String,
    member: String,
    is_method: bool,
}

impl Expr {
    /// Parse a macro body. Surrounding whitespace is ignored.
    ///
    /// Argument lists are never supported: `a.B.m(4)` is an
    /// [`Error::UnsupportedExpression`] whatever the error policy.
    pub fn parse(raw: &str, rel_path: &str) -> Result<Self> {
        let text = raw.trim();
        let malformed = || Error::MalformedExpression {
            expr: text.to_owned(),
            rel_path: rel_path.to_owned(),
        };

        let (name, is_method) = match text.find('(') {
            Some(open) => {
                let args = text[open + 1..].strip_suffix(')').ok_or_else(malformed)?;
                if !is_valid_name(text[..open].trim_end()) || args.contains(['(', ')']) {
                    return Err(malformed());
                }
                if !args.trim().is_empty() {
                    return Err(Error::UnsupportedExpression {
                        expr: text.to_owned(),
                        rel_path: rel_path.to_owned(),
                    });
                }
                (text[..open].trim_end(), true)
            }
            None => (text, false),
        };
        if !is_valid_name(name) {
            return Err(malformed());
        }

        let (class_path, member) = name.rsplit_once('.').unwrap_or(("", name));
        Ok(Self {
            text: text.to_owned(),
            class_path: class_path.to_owned(),
            member: member.to_owned(),
            is_method,
        })
    }

    /// Trimmed source text, the key into an [`ExpressionResultMap`].
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn class_path(&self) -> &str {
        &self.class_path
    }

    pub fn member(&self) -> &str {
        &self.member
    }

    pub fn is_method(&self) -> bool {
        self.is_method
    }

    /// Run the expression through the evaluator.
    pub fn evaluate(&self, evaluation: &EvaluationContext, rel_path: &str) -> Result<String> {
        evaluation
            .evaluator()
            .evaluate(&self.class_path, &self.member, self.is_method)
            .map_err(|source| Error::Evaluation {
                expr: self.text.clone(),
                rel_path: rel_path.to_owned(),
                source,
            })
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.split('.').all(is_identifier)
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Result of expanding one document.
#[derive(Debug, Default)]
pub struct Expansion {
    pub text: String,
    /// Failures that were degraded to the original macro text.
    pub degraded: Vec<Error>,
}

/// Expands `$eval{}` / `$evalNow{}` macros for one version.
#[derive(Debug, Clone, Copy)]
pub struct ExpressionEngine<'a> {
    results: &'a ExpressionResultMap,
    evaluation: &'a EvaluationContext,
    ignore_errors: bool,
}

impl<'a> ExpressionEngine<'a> {
    pub fn new(
        results: &'a ExpressionResultMap,
        evaluation: &'a EvaluationContext,
        ignore_errors: bool,
    ) -> Self {
        Self {
            results,
            evaluation,
            ignore_errors,
        }
    }

    /// Expand every macro of `text`.
    ///
    /// Syntax errors always fail. Missing results and evaluation failures fail
    /// unless errors are ignored, in which case the macro text is kept, a
    /// warning is logged and the failure is collected in
    /// [`Expansion::degraded`].
    pub fn expand(&self, text: &str, rel_path: &str) -> Result<Expansion> {
        let mut expansion = Expansion {
            text: String::with_capacity(text.len()),
            degraded: Vec::new(),
        };

        for segment in scan(text) {
            match segment {
                Segment::Literal(literal) => expansion.text.push_str(literal),
                Segment::Macro {
                    escaped: true, raw, ..
                } => {
                    // Drop the quote after the leading '$'.
                    expansion.text.push('$');
                    expansion.text.push_str(&raw[2..]);
                }
                Segment::Macro {
                    kind,
                    escaped: false,
                    raw,
                    body,
                } => {
                    let expr = Expr::parse(body, rel_path)?;
                    match self.resolve(kind, &expr, rel_path) {
                        Ok(value) => expansion.text.push_str(&value),
                        Err(err) if self.ignore_errors && err.is_degradable() => {
                            warn!(rel_path, expr = expr.text(), error = %err, "Leaving macro unexpanded");
                            expansion.text.push_str(raw);
                            expansion.degraded.push(err);
                        }
                        Err(err) => return Err(err),
                    }
                }
            }
        }
        Ok(expansion)
    }

    fn resolve(&self, kind: MacroKind, expr: &Expr, rel_path: &str) -> Result<String> {
        match kind {
            MacroKind::Eval => {
                self.results
                    .get(expr.text())
                    .cloned()
                    .ok_or_else(|| Error::ExprNotFound {
                        expr: expr.text().to_owned(),
                        rel_path: rel_path.to_owned(),
                    })
            }
            MacroKind::EvalNow => expr.evaluate(self.evaluation, rel_path),
        }
    }
}

/// Every unescaped expression in `text`, trimmed, first occurrence order.
pub fn find_exprs(text: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    scan(text)
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Macro {
                escaped: false,
                body,
                ..
            } => Some(body.trim().to_owned()),
            _ => None,
        })
        .filter(|expr| seen.insert(expr.clone()))
        .collect()
}

/// Replace `X{name}` with the property value and `X'{name}` with the literal
/// `X{name}`, where `X` is `sigil`. Names missing from `props` are left as is.
pub fn substitute_vars(text: &str, sigil: char, props: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(at) = rest.find(sigil) {
        out.push_str(&rest[..at]);
        let after_sigil = &rest[at + sigil.len_utf8()..];
        let (escaped, after_open) = if let Some(r) = after_sigil.strip_prefix("'{") {
            (true, r)
        } else if let Some(r) = after_sigil.strip_prefix('{') {
            (false, r)
        } else {
            out.push(sigil);
            rest = after_sigil;
            continue;
        };

        let known = after_open
            .find('}')
            .map(|close| (&after_open[..close], &after_open[close + 1..]))
            .and_then(|(name, tail)| props.get(name).map(|value| (name, value, tail)));
        match known {
            Some((name, _, tail)) if escaped => {
                out.push(sigil);
                out.push('{');
                out.push_str(name);
                out.push('}');
                rest = tail;
            }
            Some((_, value, tail)) => {
                out.push_str(value);
                rest = tail;
            }
            None => {
                out.push(sigil);
                rest = after_sigil;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::evaluator::FunctionRegistry;

    fn test_context() -> EvaluationContext {
        let mut registry = FunctionRegistry::new();
        registry.register_method("test.Consts", "number", || Ok("3".to_owned()));
        registry.register_method("test.Consts", "withParams", || Ok("4".to_owned()));
        registry.register_method("test.Consts", "explode", || {
            panic!("escaped expressions must not be evaluated")
        });
        registry.register_field("test.Consts", "TEST_STRING", "hello");
        EvaluationContext::new(Arc::new(registry))
    }

    fn expand(text: &str, results: &ExpressionResultMap, ignore_errors: bool) -> Result<Expansion> {
        let ctx = test_context();
        ExpressionEngine::new(results, &ctx, ignore_errors).expand(text, "test-path")
    }

    #[test]
    fn test_eval_from_results() {
        let results = ExpressionResultMap::from([
            ("a.b".to_owned(), "1".to_owned()),
            ("c.d()".to_owned(), "2".to_owned()),
        ]);
        let out = expand("$eval{a.b}-$eval{c.d()}", &results, false).unwrap();
        assert_eq!(out.text, "1-2");
        assert!(out.degraded.is_empty());
    }

    #[test]
    fn test_eval_missing_strict() {
        let err = expand("$eval{a.b}}", &ExpressionResultMap::new(), false).unwrap_err();
        assert!(matches!(err, Error::ExprNotFound { ref expr, .. } if expr == "a.b"));
    }

    #[test]
    fn test_eval_missing_lenient_keeps_macro() {
        let out = expand("x $eval{a.b} y $eval{c.d} z", &ExpressionResultMap::new(), true).unwrap();
        assert_eq!(out.text, "x $eval{a.b} y $eval{c.d} z");
        assert_eq!(out.degraded.len(), 2);
    }

    #[test]
    fn test_eval_now() {
        let out = expand(
            "$evalNow{test.Consts.number()}-$evalNow{test.Consts.TEST_STRING}",
            &ExpressionResultMap::new(),
            false,
        )
        .unwrap();
        assert_eq!(out.text, "3-hello");
    }

    #[test]
    fn test_eval_now_spaces() {
        let out = expand(
            "a$evalNow{ test.Consts.number() }b",
            &ExpressionResultMap::new(),
            false,
        )
        .unwrap();
        assert_eq!(out.text, "a3b");
    }

    #[test]
    fn test_eval_empty() {
        let out = expand("", &ExpressionResultMap::new(), false).unwrap();
        assert_eq!(out.text, "");
    }

    #[test]
    fn test_parameters_unsupported_in_both_modes() {
        for ignore_errors in [false, true] {
            let err = expand(
                "a$evalNow{ test.Consts.withParams(4) }b",
                &ExpressionResultMap::new(),
                ignore_errors,
            )
            .unwrap_err();
            assert!(matches!(err, Error::UnsupportedExpression { .. }));
        }
    }

    #[test]
    fn test_eval_now_ignore_errors() {
        let out = expand("a$evalNow{b666}c", &ExpressionResultMap::new(), true).unwrap();
        assert_eq!(out.text, "a$evalNow{b666}c");
        assert!(matches!(out.degraded[0], Error::Evaluation { .. }));
    }

    #[test]
    fn test_eval_now_failure_strict() {
        let err = expand("$evalNow{java.lang.System.out}", &ExpressionResultMap::new(), false)
            .unwrap_err();
        assert!(matches!(err, Error::Evaluation { ref expr, .. } if expr == "java.lang.System.out"));
    }

    #[test]
    fn test_escaped_macros_are_literal() {
        let results = ExpressionResultMap::new();
        assert_eq!(expand("$'evalNow{a}", &results, false).unwrap().text, "$evalNow{a}");
        assert_eq!(
            expand("$'eval{test.Consts.explode()}", &results, false).unwrap().text,
            "$eval{test.Consts.explode()}"
        );
        assert_eq!(
            expand("$'evalNow{not valid at all}", &results, false).unwrap().text,
            "$evalNow{not valid at all}"
        );
    }

    #[test]
    fn test_unclosed_macro_is_literal() {
        let out = expand("cost: $eval{a.b", &ExpressionResultMap::new(), false).unwrap();
        assert_eq!(out.text, "cost: $eval{a.b");
    }

    #[test]
    fn test_malformed_is_always_fatal() {
        for body in ["", "  ", "a..b", "a.b(", "1abc", "a b"] {
            let err = expand(&format!("$eval{{{body}}}"), &ExpressionResultMap::new(), true)
                .unwrap_err();
            assert!(matches!(err, Error::MalformedExpression { .. }), "{body:?}");
        }
    }

    #[test]
    fn test_expr_parse() {
        let expr = Expr::parse(" a.b.C.m() ", "p").unwrap();
        assert_eq!(expr.text(), "a.b.C.m()");
        assert_eq!(expr.class_path(), "a.b.C");
        assert_eq!(expr.member(), "m");
        assert!(expr.is_method());

        let field = Expr::parse("b666", "p").unwrap();
        assert_eq!(field.class_path(), "");
        assert!(!field.is_method());
    }

    #[test]
    fn test_find_exprs() {
        let text = "$eval{a.b} $'eval{skip.me} $evalNow{ c.d() } $eval{a.b} $eval{open";
        assert_eq!(find_exprs(text), vec!["a.b".to_owned(), "c.d()".to_owned()]);
    }

    #[test]
    fn test_substitute_vars() {
        let props = BTreeMap::from([
            ("project.name".to_owned(), "Josman".to_owned()),
            ("version".to_owned(), "1.2.3".to_owned()),
        ]);
        assert_eq!(
            substitute_vars("${project.name} $'{project.name} ${unknown} $'{unknown}", '$', &props),
            "Josman ${project.name} ${unknown} $'{unknown}"
        );
        assert_eq!(
            substitute_vars("v#{version} #'{version} $eval{x}", '#', &props),
            "v1.2.3 #{version} $eval{x}"
        );
    }

    #[test]
    fn test_substitute_vars_leaves_macros_alone() {
        let props = BTreeMap::from([("eval".to_owned(), "nope".to_owned())]);
        assert_eq!(substitute_vars("$eval{a} $ {x} $", '$', &props), "$eval{a} $ {x} $");
    }
}
