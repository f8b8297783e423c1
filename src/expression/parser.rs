use crate::expression::ast::{BinaryOp, Expr, UnaryOp};
use crate::expression::error::ExprError;
use crate::expression::lexer::{Span, Token, TokenKind, lex};

/// Namespaces accepted (and ignored) in front of a function or constant name.
const NAMESPACES: &[&str] = &["np", "numpy", "math"];

/// Deepest unary/parenthesis nesting accepted; recursion below stays well inside a thread stack.
pub(crate) const MAX_NESTING: usize = 256;

pub(crate) fn parse_expr(src: &str) -> Result<Expr, ExprError> {
    let tokens = lex(src)?;
    let mut p = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = p.parse_additive()?;
    if p.peek().kind != TokenKind::Eof {
        let Span { start, end } = p.span();
        return Err(ExprError::new(
            start,
            format!("unexpected trailing input '{}'", &src[start..end]),
        ));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn bump(&mut self) -> Token {
        let t = self.tokens[self.pos].clone();
        if t.kind != TokenKind::Eof {
            self.pos += 1;
        }
        t
    }

    fn span(&self) -> Span {
        self.peek().span
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), ExprError> {
        if self.peek().kind == kind {
            self.bump();
            Ok(())
        } else {
            Err(ExprError::new(
                self.span().start,
                format!("expected {kind:?}, found {:?}", self.peek().kind),
            ))
        }
    }

    fn consume(&mut self, kind: TokenKind) -> bool {
        if self.peek().kind == kind {
            self.bump();
            true
        } else {
            false
        }
    }

    fn parse_additive(&mut self) -> Result<Expr, ExprError> {
        let mut e = self.parse_multiplicative()?;
        loop {
            let op = if self.consume(TokenKind::Plus) {
                BinaryOp::Add
            } else if self.consume(TokenKind::Minus) {
                BinaryOp::Sub
            } else {
                break;
            };
            let r = self.parse_multiplicative()?;
            e = Expr::Binary {
                op,
                left: Box::new(e),
                right: Box::new(r),
            };
        }
        Ok(e)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ExprError> {
        let mut e = self.parse_unary()?;
        loop {
            let op = if self.consume(TokenKind::Star) {
                BinaryOp::Mul
            } else if self.consume(TokenKind::Slash) {
                BinaryOp::Div
            } else if self.consume(TokenKind::SlashSlash) {
                BinaryOp::FloorDiv
            } else if self.consume(TokenKind::Percent) {
                BinaryOp::Mod
            } else {
                break;
            };
            let r = self.parse_unary()?;
            e = Expr::Binary {
                op,
                left: Box::new(e),
                right: Box::new(r),
            };
        }
        Ok(e)
    }

    // Every recursive path (signs, parentheses, call arguments, exponents) passes through here.
    fn parse_unary(&mut self) -> Result<Expr, ExprError> {
        if self.depth >= MAX_NESTING {
            return Err(ExprError::new(
                self.span().start,
                "expression nested too deeply",
            ));
        }
        self.depth += 1;
        let e = self.parse_unary_inner();
        self.depth -= 1;
        e
    }

    fn parse_unary_inner(&mut self) -> Result<Expr, ExprError> {
        let op = if self.consume(TokenKind::Minus) {
            UnaryOp::Neg
        } else if self.consume(TokenKind::Plus) {
            UnaryOp::Pos
        } else {
            return self.parse_power();
        };
        let e = self.parse_unary()?;
        Ok(Expr::Unary {
            op,
            expr: Box::new(e),
        })
    }

    // `**` binds tighter than unary minus on its left and is right-associative:
    // `-x**2` is `-(x**2)`, `2**-1` is `2**(-1)`, `2**3**2` is `2**(3**2)`.
    fn parse_power(&mut self) -> Result<Expr, ExprError> {
        let base = self.parse_primary()?;
        if self.consume(TokenKind::StarStar) {
            let exp = self.parse_unary()?;
            return Ok(Expr::Binary {
                op: BinaryOp::Pow,
                left: Box::new(base),
                right: Box::new(exp),
            });
        }
        Ok(base)
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, ExprError> {
        let mut args = Vec::new();
        if self.consume(TokenKind::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_additive()?);
            if self.consume(TokenKind::Comma) {
                continue;
            }
            self.expect(TokenKind::RParen)?;
            return Ok(args);
        }
    }

    fn parse_name(&mut self, first: String, offset: usize) -> Result<String, ExprError> {
        if !self.consume(TokenKind::Dot) {
            return Ok(first);
        }
        if !NAMESPACES.contains(&first.as_str()) {
            return Err(ExprError::new(
                offset,
                format!("unknown namespace '{first}'"),
            ));
        }
        let t = self.bump();
        match t.kind {
            TokenKind::Ident(name) => Ok(name),
            other => Err(ExprError::new(
                t.span.start,
                format!("expected name after '{first}.', found {other:?}"),
            )),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ExprError> {
        let t = self.bump();
        match t.kind {
            TokenKind::Number(v) => Ok(Expr::Num(v)),
            TokenKind::Ident(s) => {
                let name = self.parse_name(s, t.span.start)?;
                if self.consume(TokenKind::LParen) {
                    let args = self.parse_args()?;
                    return Ok(Expr::Call {
                        func: name,
                        args,
                        offset: t.span.start,
                    });
                }
                Ok(Expr::Var {
                    name,
                    offset: t.span.start,
                })
            }
            TokenKind::LParen => {
                let e = self.parse_additive()?;
                self.expect(TokenKind::RParen)?;
                Ok(e)
            }
            TokenKind::Eof => Err(ExprError::new(t.span.start, "unexpected end of expression")),
            other => Err(ExprError::new(
                t.span.start,
                format!("unexpected token {other:?}"),
            )),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/expression/parser.rs"]
mod tests;
