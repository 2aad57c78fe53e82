//! Formula parser.
//!
//! Builds an [`Expr`] tree from the token stream produced by
//! [`tokenize`](super::lexer::tokenize) with chumsky combinators.
//! Precedence follows JavaScript for the subset of operators the formula
//! language accepts. Formulas nesting deeper than [`MAX_EXPR_DEPTH`] are
//! rejected before parsing, so neither the parser nor the evaluator can
//! exhaust the stack.

use super::lexer::{tokenize, Token};
use crate::error::EvalError;
use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;
use std::ops::Range;

type Span = SimpleSpan;

/// Deepest expression tree a formula may produce.
///
/// Every operator, member access, call and conditional adds a level, as
/// does every pair of parentheses.
pub const MAX_EXPR_DEPTH: usize = 64;

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
}

/// Binary operators, including the short-circuiting logical ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Eq,
    NotEq,
    And,
    Or,
}

/// Parsed formula expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal. `true` and `false` parse to 1 and 0.
    Number(f64),
    /// Bare identifier such as `user` or `value`.
    Ident(String),
    /// `object.property`
    Member { object: Box<Expr>, property: String },
    /// `callee(args...)`
    Call { callee: Box<Expr>, args: Vec<Expr> },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `condition ? then_branch : else_branch`
    Conditional {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
}

impl Expr {
    /// Short rendering used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Expr::Number(n) => n.to_string(),
            Expr::Ident(name) => name.clone(),
            Expr::Member { object, property } => format!("{}.{}", object.describe(), property),
            Expr::Call { callee, .. } => format!("{}()", callee.describe()),
            _ => "expression".to_string(),
        }
    }
}

/// Parse formula text into an expression tree.
///
/// # Examples
///
/// ```rust
/// use zztp::formula::parser::{parse, BinaryOp, Expr};
///
/// let expr = parse("1 + 2 * 3").unwrap();
/// match expr {
///     Expr::Binary { op, .. } => assert_eq!(op, BinaryOp::Add),
///     other => panic!("unexpected {:?}", other),
/// }
/// ```
pub fn parse(source: &str) -> Result<Expr, EvalError> {
    let tokens = tokenize(source)?;
    check_depth(&tokens, source.len())?;

    let token_iter = tokens
        .into_iter()
        .map(|(tok, span)| (tok, Span::from(span)));
    let eoi: Span = (source.len()..source.len()).into();
    let stream = Stream::from_iter(token_iter).map(eoi, |(t, s): (_, _)| (t, s));

    expr_parser()
        .then_ignore(end())
        .parse(stream)
        .into_result()
        .map_err(|errors| match errors.into_iter().next() {
            Some(e) => EvalError::Syntax {
                position: e.span().start,
                message: e.to_string(),
            },
            None => EvalError::Syntax {
                position: 0,
                message: "invalid formula".to_string(),
            },
        })
}

/// One parenthesized group seen while measuring depth.
#[derive(Default)]
struct Group {
    operators: usize,
    deepest_child: usize,
}

impl Group {
    fn depth(&self) -> usize {
        self.operators + self.deepest_child + 1
    }
}

/// Reject token streams whose expression tree could exceed
/// [`MAX_EXPR_DEPTH`].
///
/// Within one group every tree node other than a leaf owns a distinct
/// operator token, so a group's depth is bounded by its operator count
/// plus the depth of its deepest nested group. `running` is the sum of
/// that bound over the open groups; it only shrinks when a group closes,
/// and equals the final bound once every group is closed.
fn check_depth(tokens: &[(Token, Range<usize>)], source_len: usize) -> Result<(), EvalError> {
    let mut groups = vec![Group::default()];
    let mut running = 1;
    let mut first_over = None;

    for (token, span) in tokens {
        match token {
            Token::Number(_) | Token::True | Token::False | Token::Ident(_) | Token::Comma => {}
            Token::LParen => {
                if let Some(top) = groups.last_mut() {
                    top.operators += 1;
                }
                groups.push(Group::default());
                running += 2;
            }
            Token::RParen => {
                // A stray ')' is left for the parser to report.
                if groups.len() > 1 {
                    close_group(&mut groups, &mut running);
                }
            }
            _ => {
                if let Some(top) = groups.last_mut() {
                    top.operators += 1;
                }
                running += 1;
            }
        }
        if running > MAX_EXPR_DEPTH && first_over.is_none() {
            first_over = Some(span.start);
        }
    }
    while groups.len() > 1 {
        close_group(&mut groups, &mut running);
    }

    if running > MAX_EXPR_DEPTH {
        return Err(EvalError::Syntax {
            position: first_over.unwrap_or(source_len),
            message: format!("formula nests deeper than {MAX_EXPR_DEPTH} levels"),
        });
    }
    Ok(())
}

fn close_group(groups: &mut Vec<Group>, running: &mut usize) {
    let Some(closed) = groups.pop() else {
        return;
    };
    let depth = closed.depth();
    *running -= depth;
    if let Some(parent) = groups.last_mut() {
        if depth > parent.deepest_child {
            *running += depth - parent.deepest_child;
            parent.deepest_child = depth;
        }
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

enum Postfix {
    Member(String),
    Call(Vec<Expr>),
}

/// One left-associative level: `operand (op operand)*`.
fn left_assoc<'a, I, P, O>(
    operand: P,
    op: O,
) -> impl Parser<'a, I, Expr, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = Span>,
    P: Parser<'a, I, Expr, extra::Err<Rich<'a, Token>>> + Clone,
    O: Parser<'a, I, BinaryOp, extra::Err<Rich<'a, Token>>> + Clone,
{
    operand
        .clone()
        .foldl(op.then(operand).repeated(), |lhs, (op, rhs)| {
            binary(op, lhs, rhs)
        })
}

fn expr_parser<'a, I>() -> impl Parser<'a, I, Expr, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = Span>,
{
    recursive(|expr| {
        let literal = select! {
            Token::Number(n) => Expr::Number(n),
            Token::True => Expr::Number(1.0),
            Token::False => Expr::Number(0.0),
            Token::Ident(name) => Expr::Ident(name),
        }
        .labelled("value");

        let atom = literal.or(expr
            .clone()
            .delimited_by(just(Token::LParen), just(Token::RParen)));

        let member = just(Token::Dot)
            .ignore_then(select! { Token::Ident(name) => name }.labelled("property name"))
            .map(Postfix::Member);
        let call = expr
            .clone()
            .separated_by(just(Token::Comma))
            .collect::<Vec<_>>()
            .delimited_by(just(Token::LParen), just(Token::RParen))
            .map(Postfix::Call);

        let postfix = atom.foldl(choice((member, call)).repeated(), |object, op| match op {
            Postfix::Member(property) => Expr::Member {
                object: Box::new(object),
                property,
            },
            Postfix::Call(args) => Expr::Call {
                callee: Box::new(object),
                args,
            },
        });

        // Prefix operators bind looser than `**`, which is right associative:
        // -2 ** 2 == -(2 ** 2) and 2 ** 3 ** 2 == 2 ** 9.
        let unary = recursive(|unary| {
            let power = postfix
                .clone()
                .then(just(Token::StarStar).ignore_then(unary).or_not())
                .map(|(base, exponent)| match exponent {
                    Some(exponent) => binary(BinaryOp::Pow, base, exponent),
                    None => base,
                });
            select! {
                Token::Minus => UnaryOp::Neg,
                Token::Plus => UnaryOp::Plus,
                Token::Bang => UnaryOp::Not,
            }
            .repeated()
            .foldr(power, |op, operand| Expr::Unary {
                op,
                operand: Box::new(operand),
            })
        });

        let term = left_assoc(
            unary,
            select! {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                Token::Percent => BinaryOp::Rem,
            },
        );
        let additive = left_assoc(
            term,
            select! {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
            },
        );
        let comparison = left_assoc(
            additive,
            select! {
                Token::Less => BinaryOp::Less,
                Token::LessEq => BinaryOp::LessEq,
                Token::Greater => BinaryOp::Greater,
                Token::GreaterEq => BinaryOp::GreaterEq,
            },
        );
        let equality = left_assoc(
            comparison,
            select! {
                Token::Eq => BinaryOp::Eq,
                Token::NotEq => BinaryOp::NotEq,
            },
        );
        let logic_and = left_assoc(equality, just(Token::And).to(BinaryOp::And));
        let logic_or = left_assoc(logic_and, just(Token::Or).to(BinaryOp::Or));

        logic_or
            .then(
                just(Token::Question)
                    .ignore_then(expr.clone())
                    .then_ignore(just(Token::Colon))
                    .then(expr)
                    .or_not(),
            )
            .map(|(condition, branches)| match branches {
                Some((then_branch, else_branch)) => Expr::Conditional {
                    condition: Box::new(condition),
                    then_branch: Box::new(then_branch),
                    else_branch: Box::new(else_branch),
                },
                None => condition,
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_precedence() {
        let expr = parse("1 + 2 * 3").unwrap();
        assert_eq!(
            expr,
            binary(
                BinaryOp::Add,
                Expr::Number(1.0),
                binary(BinaryOp::Mul, Expr::Number(2.0), Expr::Number(3.0))
            )
        );
    }

    #[test]
    fn test_parse_power_is_right_associative() {
        let expr = parse("2 ** 3 ** 2").unwrap();
        assert_eq!(
            expr,
            binary(
                BinaryOp::Pow,
                Expr::Number(2.0),
                binary(BinaryOp::Pow, Expr::Number(3.0), Expr::Number(2.0))
            )
        );
    }

    #[test]
    fn test_parse_negation_binds_looser_than_power() {
        let expr = parse("-2 ** 2").unwrap();
        assert_eq!(
            expr,
            Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(binary(BinaryOp::Pow, Expr::Number(2.0), Expr::Number(2.0))),
            }
        );
    }

    #[test]
    fn test_parse_method_call() {
        let expr = parse("user.maxTp()").unwrap();
        assert_eq!(
            expr,
            Expr::Call {
                callee: Box::new(Expr::Member {
                    object: Box::new(Expr::Ident("user".to_string())),
                    property: "maxTp".to_string(),
                }),
                args: vec![],
            }
        );
    }

    #[test]
    fn test_parse_math_call_with_args() {
        let expr = parse("Math.min(16, value * 100 / target.mhp)").unwrap();
        match expr {
            Expr::Call { args, .. } => assert_eq!(args.len(), 2),
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_conditional() {
        let expr = parse("user.hp < 10 ? 5 : 0").unwrap();
        assert!(matches!(expr, Expr::Conditional { .. }));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse(""), Err(EvalError::Syntax { position: 0, .. })));
        assert!(matches!(parse("1 +"), Err(EvalError::Syntax { .. })));
        assert!(matches!(parse("(1 + 2"), Err(EvalError::Syntax { .. })));
        assert!(matches!(parse("1 2"), Err(EvalError::Syntax { position: 2, .. })));
        assert!(matches!(parse("user."), Err(EvalError::Syntax { .. })));
    }

    #[test]
    fn test_parse_unclosed_parens_rejected() {
        let source = "(".repeat(10_000);
        match parse(&source) {
            Err(EvalError::Syntax { message, .. }) => assert!(message.contains("deeper")),
            other => panic!("expected a depth error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_deep_balanced_parens_rejected() {
        let source = format!("{}1{}", "(".repeat(300), ")".repeat(300));
        assert!(matches!(parse(&source), Err(EvalError::Syntax { .. })));

        let negations = format!("{}1", "-".repeat(10_000));
        assert!(matches!(parse(&negations), Err(EvalError::Syntax { .. })));

        let chain = vec!["1"; 10_000].join(" + ");
        assert!(matches!(parse(&chain), Err(EvalError::Syntax { .. })));
    }

    #[test]
    fn test_parse_depth_error_points_at_crossing_token() {
        let source = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        match parse(&source) {
            // The 32nd '(' brings the bound to 1 + 2 * 32.
            Err(EvalError::Syntax { position, .. }) => assert_eq!(position, 31),
            other => panic!("expected a depth error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_moderate_nesting_accepted() {
        let source = format!("{}1{}", "(".repeat(20), ")".repeat(20));
        assert_eq!(parse(&source), Ok(Expr::Number(1.0)));

        // Sibling groups do not add up.
        let siblings = vec!["(1 + 2 * 3)"; 20].join(" + ");
        assert!(parse(&siblings).is_ok());
    }
}
