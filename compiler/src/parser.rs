// Parser for .tir graph source files.
//
// Parses a token stream (from the lexer) into a `Module`. Uses chumsky
// combinators.
//
// Grammar:
//   module     := NL* (stmt (NL+ stmt)*)? NL*
//   stmt       := 'return' IDENT (',' IDENT)* | IDENT '=' expr
//   expr       := 'param' type | 'const' IDENT const_val | IDENT '(' args? ')'
//   type       := IDENT ('[' (NUMBER (',' NUMBER)*)? ']')?
//   const_val  := NUMBER | '[' NUMBER (',' NUMBER)* ']'
//   arg        := IDENT | STRING
//
// Preconditions: input is a valid token stream from `lexer::lex()`.
// Postconditions: returns an AST plus any parse errors (non-fatal).
// Failure modes: syntax errors produce `Rich` diagnostics.
// Side effects: none.

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;
use chumsky::span::SimpleSpan;

use crate::ast::*;
use crate::lexer::Token;

/// Result of parsing: AST plus any errors.
#[derive(Debug)]
pub struct ParseResult {
    pub module: Option<Module>,
    pub errors: Vec<Rich<'static, Token, SimpleSpan>>,
}

/// Parse a .tir source string. Lexes then parses.
pub fn parse(source: &str) -> ParseResult {
    let lex_result = crate::lexer::lex(source);
    let len = source.len();

    let token_iter = lex_result.tokens.into_iter().map(|(tok, span)| {
        let cspan: SimpleSpan = (span.start..span.end).into();
        (tok, cspan)
    });
    let eoi: SimpleSpan = (len..len).into();
    let stream = Stream::from_iter(token_iter).map(eoi, |(t, s): (_, _)| (t, s));

    let parser = module_parser(source);
    let (module, parse_errors) = parser.parse(stream).into_output_errors();

    let mut all_errors: Vec<Rich<'static, Token, SimpleSpan>> = lex_result
        .errors
        .into_iter()
        .map(|e| {
            let span: SimpleSpan = (e.span.start..e.span.end).into();
            Rich::custom(span, e.message)
        })
        .collect();
    all_errors.extend(parse_errors.into_iter().map(|e| e.into_owned()));

    ParseResult {
        module,
        errors: all_errors,
    }
}

// ── Parser builder ──
//
// All rules live inside `module_parser` so the `source` reference is captured
// once and shared by every combinator that needs identifier text.

fn module_parser<'tokens, 'src: 'tokens, I>(
    source: &'src str,
) -> impl Parser<'tokens, I, Module, extra::Err<Rich<'tokens, Token, SimpleSpan>>> + 'src
where
    'tokens: 'src,
    I: ValueInput<'tokens, Token = Token, Span = SimpleSpan>,
{
    let nl = just(Token::Newline).repeated().ignored();

    let ident = just(Token::Ident).map_with(move |_, e| {
        let span: SimpleSpan = e.span();
        Ident {
            name: source[span.start()..span.end()].to_string(),
            span,
        }
    });

    let number = select! {
        Token::Number(n) => n,
    };

    // ── Type: IDENT ('[' dims ']')? ──

    let dim = select! {
        Token::Number(n) if n >= 0.0 && n.fract() == 0.0 && n <= u32::MAX as f64 => n as usize,
    };

    let dims = dim
        .separated_by(just(Token::Comma))
        .collect::<Vec<_>>()
        .delimited_by(just(Token::LBracket), just(Token::RBracket));

    let type_spec = ident
        .clone()
        .then(dims.or_not())
        .map_with(|(dtype, dims), e| TypeSpec {
            dtype,
            dims: dims.unwrap_or_default(),
            span: e.span(),
        });

    // ── Constant value ──

    let const_value = {
        let array = number
            .clone()
            .separated_by(just(Token::Comma))
            .at_least(1)
            .collect::<Vec<_>>()
            .delimited_by(just(Token::LBracket), just(Token::RBracket))
            .map(ConstValue::Array);
        let scalar = number.map(ConstValue::Scalar);
        array.or(scalar)
    };

    // ── Call arguments ──

    let arg = {
        let string_arg = select! {
            Token::StringLit(s) = e => Arg::StringLit(s, e.span()),
        };
        ident.clone().map(Arg::Value).or(string_arg)
    };

    // ── Expressions ──

    let param_expr = just(Token::Param)
        .ignore_then(type_spec)
        .map(ExprKind::Param);

    let const_expr = just(Token::Const)
        .ignore_then(ident.clone())
        .then(const_value)
        .map(|(dtype, value)| ExprKind::Const { dtype, value });

    let call_expr = ident
        .clone()
        .then(
            arg.separated_by(just(Token::Comma))
                .collect::<Vec<_>>()
                .delimited_by(just(Token::LParen), just(Token::RParen)),
        )
        .map(|(op, args)| ExprKind::Call { op, args });

    let expr = choice((param_expr, const_expr, call_expr)).map_with(|kind, e| Expr {
        kind,
        span: e.span(),
    });

    // ── Statements ──

    let return_stmt = just(Token::Return)
        .ignore_then(
            ident
                .clone()
                .separated_by(just(Token::Comma))
                .at_least(1)
                .collect::<Vec<_>>(),
        )
        .map(|values| StatementKind::Return(ReturnStmt { values }));

    let let_stmt = ident
        .clone()
        .then_ignore(just(Token::Equals))
        .then(expr)
        .map(|(name, expr)| StatementKind::Let(LetStmt { name, expr }));

    let statement = choice((return_stmt, let_stmt)).map_with(|kind, e| Statement {
        kind,
        span: e.span(),
    });

    // ── Module ──

    nl.clone()
        .ignore_then(
            statement
                .separated_by(just(Token::Newline).repeated().at_least(1))
                .allow_trailing()
                .collect::<Vec<_>>(),
        )
        .then_ignore(nl)
        .map_with(|statements, e| Module {
            statements,
            span: e.span(),
        })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> Module {
        let result = parse(source);
        assert!(
            result.errors.is_empty(),
            "unexpected errors: {:#?}",
            result.errors
        );
        result.module.expect("expected module")
    }

    fn parse_errors(source: &str) -> Vec<Rich<'static, Token, SimpleSpan>> {
        parse(source).errors
    }

    fn parse_one_expr(source: &str) -> ExprKind {
        let module = parse_ok(source);
        assert_eq!(module.statements.len(), 1, "expected 1 statement");
        match module.statements.into_iter().next().unwrap().kind {
            StatementKind::Let(l) => l.expr.kind,
            other => panic!("expected let, got {:?}", other),
        }
    }

    #[test]
    fn empty_module() {
        assert!(parse_ok("").statements.is_empty());
        assert!(parse_ok("\n\n# only a comment\n").statements.is_empty());
    }

    #[test]
    fn param_with_dims() {
        let ExprKind::Param(ty) = parse_one_expr("x = param f32[2, 3]") else {
            panic!("expected param")
        };
        assert_eq!(ty.dtype.name, "f32");
        assert_eq!(ty.dims, vec![2, 3]);
    }

    #[test]
    fn param_scalar_forms() {
        for src in ["x = param f64", "x = param f64[]"] {
            let ExprKind::Param(ty) = parse_one_expr(src) else {
                panic!("expected param")
            };
            assert!(ty.dims.is_empty(), "{src}");
        }
    }

    #[test]
    fn const_scalar_and_array() {
        let ExprKind::Const { dtype, value } = parse_one_expr("s = const f64 3.14") else {
            panic!("expected const")
        };
        assert_eq!(dtype.name, "f64");
        assert!(matches!(value, ConstValue::Scalar(v) if v == 3.14));

        let ExprKind::Const { value, .. } = parse_one_expr("w = const f32 [1.0, -2.5]") else {
            panic!("expected const")
        };
        assert!(matches!(value, ConstValue::Array(ref v) if v == &vec![1.0, -2.5]));
    }

    #[test]
    fn call_with_string_arg() {
        let ExprKind::Call { op, args } = parse_one_expr(r#"z = annotate(y, "layer1_activation")"#)
        else {
            panic!("expected call")
        };
        assert_eq!(op.name, "annotate");
        assert_eq!(args.len(), 2);
        assert!(matches!(&args[0], Arg::Value(i) if i.name == "y"));
        assert!(matches!(&args[1], Arg::StringLit(s, _) if s == "layer1_activation"));
    }

    #[test]
    fn full_module() {
        let module = parse_ok(
            "# demo\nx = param f32[2]\n\nw = const f32 [1.0, 2.0]\ny = add(x, w)\nreturn y, x\n",
        );
        assert_eq!(module.statements.len(), 4);
        let StatementKind::Return(ret) = &module.statements[3].kind else {
            panic!("expected return")
        };
        let names: Vec<&str> = ret.values.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["y", "x"]);
    }

    #[test]
    fn error_missing_equals() {
        assert!(!parse_errors("x param f32").is_empty());
    }

    #[test]
    fn error_fractional_dim() {
        assert!(!parse_errors("x = param f32[2.5]").is_empty());
    }

    #[test]
    fn error_two_statements_on_one_line() {
        assert!(!parse_errors("x = param f32 y = param f32").is_empty());
    }

    #[test]
    fn lex_errors_are_reported() {
        assert!(!parse_errors("x = param f32 $").is_empty());
    }
}
