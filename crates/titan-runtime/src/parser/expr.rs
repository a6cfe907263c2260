//! Expression parsing (Pratt parsing)

use crate::ast::*;
use crate::diagnostic::error_codes;
use crate::parser::{Parser, Precedence};
use crate::token::TokenKind;

impl<'ctx> Parser<'ctx> {
    /// Parse an expression
    pub(super) fn parse_expression(&mut self) -> Result<Expr, ()> {
        self.parse_precedence(Precedence::Lowest)
    }

    /// Parse expression with given precedence
    pub(super) fn parse_precedence(&mut self, precedence: Precedence) -> Result<Expr, ()> {
        let mut left = self.parse_prefix()?;

        while precedence < self.current_precedence() {
            left = self.parse_infix(left)?;
        }

        Ok(left)
    }

    /// Whether a token has a prefix handler
    pub(super) fn starts_expression(kind: TokenKind) -> bool {
        matches!(
            kind,
            TokenKind::Identifier
                | TokenKind::Integer
                | TokenKind::Float
                | TokenKind::String
                | TokenKind::Bang
                | TokenKind::Tilde
                | TokenKind::Minus
                | TokenKind::LeftParen
                | TokenKind::LeftBrace
        )
    }

    /// Parse prefix expression
    fn parse_prefix(&mut self) -> Result<Expr, ()> {
        match self.peek().kind {
            TokenKind::Identifier => {
                let token = self.advance();
                Ok(Expr::Id {
                    name: token.lexeme.clone(),
                    span: token.span,
                })
            }
            TokenKind::Integer => {
                let token = self.advance();
                Ok(Expr::raw_int(token.lexeme.clone(), token.span))
            }
            TokenKind::Float => {
                let token = self.advance();
                Ok(Expr::RawFloat {
                    text: token.lexeme.clone(),
                    span: token.span,
                })
            }
            TokenKind::String => {
                let token = self.advance();
                Ok(Expr::RawString {
                    text: token.lexeme.clone(),
                    span: token.span,
                })
            }
            TokenKind::Minus
                if matches!(
                    self.peek_ahead(1).kind,
                    TokenKind::Integer | TokenKind::Float
                ) =>
            {
                self.parse_negative_literal()
            }
            TokenKind::Bang | TokenKind::Tilde | TokenKind::Minus => self.parse_unary(),
            TokenKind::LeftParen => self.parse_group(),
            TokenKind::LeftBrace => self.parse_array_literal(),
            kind => {
                self.error(
                    error_codes::INTERNAL_NO_FN_FOR_TOKEN,
                    &format!("Expected expression, found '{}'", kind.as_str()),
                );
                Err(())
            }
        }
    }

    /// Parse infix expression
    fn parse_infix(&mut self, left: Expr) -> Result<Expr, ()> {
        match self.peek().kind {
            TokenKind::LeftParen => self.parse_call(left),
            TokenKind::LeftBracket => self.parse_index(left),
            _ => self.parse_binary(left),
        }
    }

    /// Get current token precedence
    pub(super) fn current_precedence(&self) -> Precedence {
        Self::token_precedence(self.peek().kind)
    }

    /// Get precedence for a token with an infix handler
    pub(super) fn token_precedence(kind: TokenKind) -> Precedence {
        match kind {
            k if k.is_assignment() => Precedence::Assign,
            TokenKind::AmpAmp | TokenKind::PipePipe | TokenKind::Pipe => Precedence::Logical,
            TokenKind::Ampersand | TokenKind::Caret => Precedence::Bitwise,
            TokenKind::EqualEqual | TokenKind::BangEqual => Precedence::Equality,
            TokenKind::Less
            | TokenKind::LessEqual
            | TokenKind::Greater
            | TokenKind::GreaterEqual => Precedence::Relational,
            TokenKind::LessLess | TokenKind::GreaterGreater => Precedence::Shift,
            TokenKind::Plus | TokenKind::Minus => Precedence::Sum,
            TokenKind::Star | TokenKind::Slash | TokenKind::Percent => Precedence::Product,
            TokenKind::StarStar => Precedence::Power,
            TokenKind::LeftParen => Precedence::Call,
            TokenKind::LeftBracket => Precedence::Index,
            _ => Precedence::Lowest,
        }
    }

    /// Fold `-` and the following numeric literal into one literal
    fn parse_negative_literal(&mut self) -> Result<Expr, ()> {
        let minus_span = self.advance().span;
        let token = self.advance();
        let text = format!("-{}", token.lexeme);
        let span = minus_span.merge(token.span);
        if token.kind == TokenKind::Float {
            Ok(Expr::RawFloat { text, span })
        } else {
            Ok(Expr::raw_int(text, span))
        }
    }

    /// Parse unary expression
    fn parse_unary(&mut self) -> Result<Expr, ()> {
        let op_token = self.advance();
        let op = op_token.kind;
        let op_span = op_token.span;

        let right = self.parse_precedence(Precedence::Prefix)?;
        let span = op_span.merge(right.span());

        Ok(Expr::Prefix {
            op,
            right: Box::new(right),
            span,
        })
    }

    /// Parse binary expression
    ///
    /// `**` and the assignment family bind to the right by parsing their
    /// right-hand side one level lower.
    fn parse_binary(&mut self, left: Expr) -> Result<Expr, ()> {
        let op = self.advance().kind;
        let precedence = Self::token_precedence(op);
        let rhs_precedence = if op == TokenKind::StarStar || op.is_assignment() {
            precedence.lower()
        } else {
            precedence
        };

        let right = self.parse_precedence(rhs_precedence)?;
        let span = left.span().merge(right.span());

        Ok(Expr::Infix {
            op,
            left: Box::new(left),
            right: Box::new(right),
            span,
        })
    }

    /// Parse grouped expression
    fn parse_group(&mut self) -> Result<Expr, ()> {
        self.consume(TokenKind::LeftParen, "Expected '('")?;
        let expr = self.parse_expression()?;
        self.consume(TokenKind::RightParen, "Expected ')' to close grouped expression")?;
        Ok(expr)
    }

    /// Parse array literal `{a, b, ...}`
    fn parse_array_literal(&mut self) -> Result<Expr, ()> {
        let start_span = self.consume(TokenKind::LeftBrace, "Expected '{'")?.span;

        let mut elements = Vec::new();
        if !self.check(TokenKind::RightBrace) {
            loop {
                elements.push(self.parse_expression()?);
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }

        let end_span = self
            .consume(TokenKind::RightBrace, "Expected '}' to close array literal")?
            .span;

        Ok(Expr::ArrayLiteral {
            elements,
            span: start_span.merge(end_span),
        })
    }

    /// Parse function call
    fn parse_call(&mut self, callee: Expr) -> Result<Expr, ()> {
        self.consume(TokenKind::LeftParen, "Expected '('")?;

        let mut args = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                args.push(self.parse_expression()?);
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }

        let end_span = self
            .consume(TokenKind::RightParen, "Expected ')' after arguments")?
            .span;
        let span = callee.span().merge(end_span);

        Ok(Expr::Call {
            callee: Box::new(callee),
            args,
            span,
        })
    }

    /// Parse index expression
    fn parse_index(&mut self, array: Expr) -> Result<Expr, ()> {
        self.consume(TokenKind::LeftBracket, "Expected '['")?;
        let index = self.parse_expression()?;
        let end_span = self
            .consume(TokenKind::RightBracket, "Expected ']' following index into array")?
            .span;
        let span = array.span().merge(end_span);

        Ok(Expr::ArrayIndex {
            array: Box::new(array),
            index: Box::new(index),
            span,
        })
    }
}
