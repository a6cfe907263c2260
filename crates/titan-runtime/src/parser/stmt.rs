//! Statement parsing

use crate::ast::*;
use crate::diagnostic::error_codes;
use crate::parser::Parser;
use crate::token::TokenKind;
use crate::types::Variable;

impl<'ctx> Parser<'ctx> {
    /// Parse a statement
    pub(super) fn parse_statement(&mut self) -> Result<Instruction, ()> {
        match self.peek().kind {
            TokenKind::Let => Ok(Instruction::Assignment(self.parse_assignment()?)),
            TokenKind::If => self.parse_if_stmt(),
            TokenKind::While => self.parse_while_stmt(),
            TokenKind::For => self.parse_for_stmt(),
            TokenKind::Return => self.parse_return_stmt(),
            TokenKind::Break => self.parse_break_stmt(),
            _ => self.parse_expr_stmt(),
        }
    }

    /// Parse `let name: type[acc] = expr;`
    pub(super) fn parse_assignment(&mut self) -> Result<Assignment, ()> {
        let keyword_span = self.consume(TokenKind::Let, "Expected 'let'")?.span;
        let name = self
            .consume(TokenKind::Identifier, "Expected variable name following 'let'")?
            .lexeme
            .clone();
        self.consume(
            TokenKind::Colon,
            "Expected colon between name:type in variable definition",
        )?;
        let vtd = self.parse_type()?;
        self.consume(TokenKind::Equal, "Expected '=' in variable definition")?;
        let init = self.parse_expression()?;
        let end_span = self
            .consume(TokenKind::Semicolon, "Expected ';' after variable definition")?
            .span;

        Ok(Assignment {
            variable: Variable::new(name, vtd),
            init,
            span: keyword_span.merge(end_span),
        })
    }

    /// Parse a block `{ statements }`
    pub(super) fn parse_block(&mut self) -> Result<Vec<Instruction>, ()> {
        self.consume(TokenKind::LeftBrace, "Expected '{' to open block")?;

        let mut body = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            body.push(self.parse_statement()?);
        }

        self.consume(TokenKind::RightBrace, "Expected '}' to close block")?;
        Ok(body)
    }

    /// Parse the parenthesized condition of `if` / `while`
    fn parse_conditional(&mut self) -> Result<Expr, ()> {
        self.mark();
        if !self.check(TokenKind::LeftParen) {
            self.reset()?;
            self.error(
                error_codes::EXPECTED_CONDITIONAL,
                "Expected '(' to begin a conditional",
            );
            return Err(());
        }
        self.advance();
        if self.check(TokenKind::RightParen) {
            self.error(error_codes::EXPECTED_CONDITIONAL, "Expected conditional expression");
            return Err(());
        }
        let condition = self.parse_expression()?;
        self.consume(TokenKind::RightParen, "Expected ')' to close conditional")?;
        Ok(condition)
    }

    /// Parse an `if` / `else if` / `else` chain
    fn parse_if_stmt(&mut self) -> Result<Instruction, ()> {
        let span = self.consume(TokenKind::If, "Expected 'if'")?.span;

        let mut segments = Vec::new();
        let condition = self.parse_conditional()?;
        let body = self.parse_block()?;
        segments.push(ConditionalSegment { condition, body });

        while self.match_token(TokenKind::Else) {
            if self.match_token(TokenKind::If) {
                let condition = self.parse_conditional()?;
                let body = self.parse_block()?;
                segments.push(ConditionalSegment { condition, body });
            } else {
                // A bare `else` is a segment that always matches
                let else_span = self.peek().span;
                let body = self.parse_block()?;
                segments.push(ConditionalSegment {
                    condition: Expr::raw_int("1", else_span),
                    body,
                });
                break;
            }
        }

        Ok(Instruction::If(IfInstruction { segments, span }))
    }

    /// Parse `while (condition) { body }`
    fn parse_while_stmt(&mut self) -> Result<Instruction, ()> {
        let span = self.consume(TokenKind::While, "Expected 'while'")?.span;
        let condition = self.parse_conditional()?;
        let body = self.parse_block()?;
        Ok(Instruction::While(WhileInstruction {
            condition,
            body,
            span,
        }))
    }

    /// Parse `for (let ...; condition; step) { body }`
    fn parse_for_stmt(&mut self) -> Result<Instruction, ()> {
        let span = self.consume(TokenKind::For, "Expected 'for'")?.span;
        self.consume(TokenKind::LeftParen, "Expected '(' following 'for'")?;

        if !self.check(TokenKind::Let) {
            self.error(
                error_codes::EXPECTED_ASSIGNMENT,
                "Expected variable definition as the first clause of 'for'",
            );
            return Err(());
        }
        let init = self.parse_assignment()?;

        let condition = self.parse_expression()?;
        self.consume(TokenKind::Semicolon, "Expected ';' following 'for' condition")?;
        let step = self.parse_expression()?;
        self.consume(TokenKind::RightParen, "Expected ')' to close 'for' clauses")?;

        let body = self.parse_block()?;

        Ok(Instruction::For(ForInstruction {
            init,
            condition,
            step,
            body,
            span,
        }))
    }

    /// Parse `return [expr];`
    fn parse_return_stmt(&mut self) -> Result<Instruction, ()> {
        let keyword_span = self.consume(TokenKind::Return, "Expected 'return'")?.span;

        let value = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };

        let end_span = self
            .consume(TokenKind::Semicolon, "Expected ';' after return")?
            .span;

        Ok(Instruction::Return {
            value,
            span: keyword_span.merge(end_span),
        })
    }

    /// Parse `break;`
    fn parse_break_stmt(&mut self) -> Result<Instruction, ()> {
        let keyword_span = self.consume(TokenKind::Break, "Expected 'break'")?.span;
        let end_span = self
            .consume(TokenKind::Semicolon, "Expected ';' after break")?
            .span;
        Ok(Instruction::Break(keyword_span.merge(end_span)))
    }

    /// Parse an expression statement terminated by `;`
    fn parse_expr_stmt(&mut self) -> Result<Instruction, ()> {
        let expr = self.parse_expression()?;
        self.consume(TokenKind::Semicolon, "Expected ';' after expression")?;
        Ok(Instruction::Expression(expr))
    }
}
