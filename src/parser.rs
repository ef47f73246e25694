use anyhow::Result;

use crate::ast::{
    BinaryOperator, Block, ElifClause, Expression, Program, Statement, UnaryOperator,
};
use crate::token::{Span, Token, TokenKind};

pub struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
    current: Token<'a>,
}

impl<'a> Parser<'a> {
    pub fn new(mut tokens: Vec<Token<'a>>) -> Self {
        if tokens.is_empty() {
            tokens.push(Token::new(TokenKind::EndMarker, Span::default()));
        }
        let current = tokens[0].clone();
        Self {
            tokens,
            pos: 0,
            current,
        }
    }

    pub fn parse_program(mut self) -> Result<Program> {
        let statements = self.parse_statements()?;
        // Trailing Newline/Dedent runs are tolerated before the end marker.
        while matches!(self.current.kind, TokenKind::Newline | TokenKind::Dedent) {
            self.advance();
        }
        self.expect(TokenKind::EndMarker, "end of input")?;
        Ok(Program { statements })
    }

    /// Statement run shared by the top level and by blocks; stops at
    /// Dedent/EndMarker and skips blank-line Newline runs.
    fn parse_statements(&mut self) -> Result<Vec<Statement>> {
        let mut statements = Vec::new();
        while !matches!(self.current.kind, TokenKind::Dedent | TokenKind::EndMarker) {
            if self.consume_newlines() {
                continue;
            }
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    fn parse_statement(&mut self) -> Result<Statement> {
        match self.current.kind {
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            _ => self.parse_simple_statement(),
        }
    }

    fn parse_simple_statement(&mut self) -> Result<Statement> {
        match self.current.kind {
            TokenKind::Break => {
                self.advance();
                self.expect(TokenKind::Newline, "newline")?;
                Ok(Statement::Break)
            }
            TokenKind::Continue => {
                self.advance();
                self.expect(TokenKind::Newline, "newline")?;
                Ok(Statement::Continue)
            }
            TokenKind::Print => self.parse_print(),
            // Dispatch on the next one or two tokens:
            //   ID = list ( )  |  ID [ ... ] = ...  |  ID . append ( ... )  |  ID = ...
            TokenKind::Identifier(_) => match (self.peek_kind(1), self.peek_kind(2)) {
                (TokenKind::Assign, TokenKind::List) => self.parse_list_create(),
                (TokenKind::LBracket, _) => self.parse_index_assign(),
                (TokenKind::Dot, _) => self.parse_list_append(),
                (TokenKind::Assign, _) => self.parse_assign(),
                _ => Err(self.simple_statement_error()),
            },
            _ => Err(self.simple_statement_error()),
        }
    }

    fn parse_assign(&mut self) -> Result<Statement> {
        let name = self.expect_identifier()?;
        self.expect(TokenKind::Assign, "'='")?;
        let value = self.parse_expression()?;
        self.expect(TokenKind::Newline, "newline")?;
        Ok(Statement::Assign { name, value })
    }

    fn parse_index_assign(&mut self) -> Result<Statement> {
        let name = self.expect_identifier()?;
        self.expect(TokenKind::LBracket, "'['")?;
        let index = self.parse_expression()?;
        self.expect(TokenKind::RBracket, "']'")?;
        self.expect(TokenKind::Assign, "'='")?;
        let value = self.parse_expression()?;
        self.expect(TokenKind::Newline, "newline")?;
        Ok(Statement::AssignIndex { name, index, value })
    }

    fn parse_list_create(&mut self) -> Result<Statement> {
        let name = self.expect_identifier()?;
        self.expect(TokenKind::Assign, "'='")?;
        self.expect(TokenKind::List, "'list'")?;
        self.expect(TokenKind::LParen, "'('")?;
        self.expect(TokenKind::RParen, "')'")?;
        self.expect(TokenKind::Newline, "newline")?;
        Ok(Statement::NewList { name })
    }

    fn parse_list_append(&mut self) -> Result<Statement> {
        let name = self.expect_identifier()?;
        self.expect(TokenKind::Dot, "'.'")?;
        self.expect(TokenKind::Append, "'append'")?;
        self.expect(TokenKind::LParen, "'('")?;
        let value = self.parse_expression()?;
        self.expect(TokenKind::RParen, "')'")?;
        self.expect(TokenKind::Newline, "newline")?;
        Ok(Statement::Append { name, value })
    }

    fn parse_print(&mut self) -> Result<Statement> {
        self.expect(TokenKind::Print, "'print'")?;
        self.expect(TokenKind::LParen, "'('")?;
        let expr = self.parse_expression()?;
        self.expect(TokenKind::RParen, "')'")?;
        self.expect(TokenKind::Newline, "newline")?;
        Ok(Statement::Print(expr))
    }

    fn parse_if(&mut self) -> Result<Statement> {
        self.expect(TokenKind::If, "'if'")?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::Colon, "':'")?;
        let then_block = self.parse_block()?;

        let mut elif_clauses = Vec::new();
        while self.eat(TokenKind::Elif) {
            let condition = self.parse_expression()?;
            self.expect(TokenKind::Colon, "':'")?;
            let block = self.parse_block()?;
            elif_clauses.push(ElifClause { condition, block });
        }

        let else_block = if self.eat(TokenKind::Else) {
            self.expect(TokenKind::Colon, "':'")?;
            Some(self.parse_block()?)
        } else {
            None
        };

        Ok(Statement::If {
            condition,
            then_block,
            elif_clauses,
            else_block,
        })
    }

    fn parse_while(&mut self) -> Result<Statement> {
        self.expect(TokenKind::While, "'while'")?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::Colon, "':'")?;
        let body = self.parse_block()?;
        Ok(Statement::While { condition, body })
    }

    fn parse_block(&mut self) -> Result<Block> {
        self.expect(TokenKind::Newline, "newline")?;
        self.expect(TokenKind::Indent, "indented block")?;
        let statements = self.parse_statements()?;
        self.expect(TokenKind::Dedent, "dedent")?;
        Ok(Block { statements })
    }

    fn parse_expression(&mut self) -> Result<Expression> {
        let mut expr = self.parse_join()?;
        while self.eat(TokenKind::Or) {
            let right = self.parse_join()?;
            expr = binary(expr, BinaryOperator::Or, right);
        }
        Ok(expr)
    }

    fn parse_join(&mut self) -> Result<Expression> {
        let mut expr = self.parse_equality()?;
        while self.eat(TokenKind::And) {
            let right = self.parse_equality()?;
            expr = binary(expr, BinaryOperator::And, right);
        }
        Ok(expr)
    }

    fn parse_equality(&mut self) -> Result<Expression> {
        let mut expr = self.parse_rel()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Equal => BinaryOperator::Equal,
                TokenKind::NotEqual => BinaryOperator::NotEqual,
                _ => break,
            };
            self.advance();
            let right = self.parse_rel()?;
            expr = binary(expr, op, right);
        }
        Ok(expr)
    }

    /// Relational operators do not chain: at most one is consumed, so
    /// `a < b < c` fails at the following statement boundary.
    fn parse_rel(&mut self) -> Result<Expression> {
        let expr = self.parse_numexpr()?;
        let op = match self.current.kind {
            TokenKind::Less => BinaryOperator::Less,
            TokenKind::LessEqual => BinaryOperator::LessEqual,
            TokenKind::Greater => BinaryOperator::Greater,
            TokenKind::GreaterEqual => BinaryOperator::GreaterEqual,
            _ => return Ok(expr),
        };
        self.advance();
        let right = self.parse_numexpr()?;
        Ok(binary(expr, op, right))
    }

    fn parse_numexpr(&mut self) -> Result<Expression> {
        let mut expr = self.parse_term()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Plus => BinaryOperator::Add,
                TokenKind::Minus => BinaryOperator::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            expr = binary(expr, op, right);
        }
        Ok(expr)
    }

    fn parse_term(&mut self) -> Result<Expression> {
        let mut expr = self.parse_unary()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Star => BinaryOperator::Mul,
                TokenKind::FloorDiv => BinaryOperator::FloorDiv,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            expr = binary(expr, op, right);
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Expression> {
        let op = match self.current.kind {
            TokenKind::Not => UnaryOperator::Not,
            TokenKind::Minus => UnaryOperator::Neg,
            _ => return self.parse_factor(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        Ok(Expression::UnaryOp {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_factor(&mut self) -> Result<Expression> {
        match self.current.kind {
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(expr)
            }
            TokenKind::Integer(value) => {
                self.advance();
                Ok(Expression::Integer(value))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expression::Boolean(true))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expression::Boolean(false))
            }
            TokenKind::Identifier(_) => self.parse_loc(),
            _ => Err(self.error("expression")),
        }
    }

    fn parse_loc(&mut self) -> Result<Expression> {
        let name = self.expect_identifier()?;
        if self.eat(TokenKind::LBracket) {
            let index = self.parse_expression()?;
            self.expect(TokenKind::RBracket, "']'")?;
            return Ok(Expression::Index {
                name,
                index: Box::new(index),
            });
        }
        Ok(Expression::Identifier(name))
    }

    fn consume_newlines(&mut self) -> bool {
        let mut consumed = false;
        while matches!(self.current.kind, TokenKind::Newline) {
            consumed = true;
            self.advance();
        }
        consumed
    }

    fn expect_identifier(&mut self) -> Result<String> {
        if let TokenKind::Identifier(name) = self.current.kind {
            let name = name.to_string();
            self.advance();
            Ok(name)
        } else {
            Err(self.error("identifier"))
        }
    }

    fn expect(&mut self, kind: TokenKind<'a>, expected: &str) -> Result<()> {
        if self.current.kind == kind {
            self.advance();
            Ok(())
        } else {
            Err(self.error(expected))
        }
    }

    fn eat(&mut self, kind: TokenKind<'a>) -> bool {
        if self.current.kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn advance(&mut self) -> Token<'a> {
        let next = self
            .tokens
            .get(self.pos + 1)
            .cloned()
            .unwrap_or(Token::new(TokenKind::EndMarker, Span::default()));
        self.pos = self.pos.saturating_add(1);
        std::mem::replace(&mut self.current, next)
    }

    fn peek_kind(&self, offset: usize) -> TokenKind<'a> {
        self.tokens
            .get(self.pos + offset)
            .map(|token| token.kind)
            .unwrap_or(TokenKind::EndMarker)
    }

    fn error(&self, expected: &str) -> anyhow::Error {
        let span = self.current.span();
        anyhow::anyhow!(
            "Expected {expected}, got {:?} at line {}, column {}",
            self.current.kind(),
            span.line,
            span.column
        )
    }

    fn simple_statement_error(&self) -> anyhow::Error {
        let span = self.current.span();
        anyhow::anyhow!(
            "Unexpected token {:?} in simple statement at line {}, column {}",
            self.current.kind(),
            span.line,
            span.column
        )
    }
}

fn binary(left: Expression, op: BinaryOperator, right: Expression) -> Expression {
    Expression::BinaryOp {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

pub fn parse_tokens(tokens: Vec<Token<'_>>) -> Result<Program> {
    Parser::new(tokens).parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer;
    use indoc::indoc;

    fn parse_source(input: &str) -> Result<Program> {
        parse_tokens(lexer::tokenize(input).expect("tokenize should succeed"))
    }

    fn int(value: i64) -> Expression {
        Expression::Integer(value)
    }

    #[test]
    fn parses_assignment_from_raw_tokens() {
        fn tok(kind: TokenKind<'_>) -> Token<'_> {
            Token::new(kind, Span::default())
        }

        let tokens = vec![
            tok(TokenKind::Identifier("n")),
            tok(TokenKind::Assign),
            tok(TokenKind::Integer(4)),
            tok(TokenKind::Plus),
            tok(TokenKind::Integer(4)),
            tok(TokenKind::Newline),
            tok(TokenKind::EndMarker),
        ];
        let program = parse_tokens(tokens).expect("parse failed");

        let expected = Program {
            statements: vec![Statement::Assign {
                name: "n".to_string(),
                value: binary(int(4), BinaryOperator::Add, int(4)),
            }],
        };
        assert_eq!(program, expected);
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let program = parse_source("x = 1 + 2 * 3\n").expect("parse failed");
        let expected = Program {
            statements: vec![Statement::Assign {
                name: "x".to_string(),
                value: binary(
                    int(1),
                    BinaryOperator::Add,
                    binary(int(2), BinaryOperator::Mul, int(3)),
                ),
            }],
        };
        assert_eq!(program, expected);
    }

    #[test]
    fn addition_is_left_associative() {
        let program = parse_source("x = 1 - 2 - 3\n").expect("parse failed");
        let expected = Program {
            statements: vec![Statement::Assign {
                name: "x".to_string(),
                value: binary(
                    binary(int(1), BinaryOperator::Sub, int(2)),
                    BinaryOperator::Sub,
                    int(3),
                ),
            }],
        };
        assert_eq!(program, expected);
    }

    #[test]
    fn comparison_binds_tighter_than_logic() {
        let program = parse_source("x = 1 < 2 and 3 < 4 or False\n").expect("parse failed");
        let expected = Program {
            statements: vec![Statement::Assign {
                name: "x".to_string(),
                value: binary(
                    binary(
                        binary(int(1), BinaryOperator::Less, int(2)),
                        BinaryOperator::And,
                        binary(int(3), BinaryOperator::Less, int(4)),
                    ),
                    BinaryOperator::Or,
                    Expression::Boolean(false),
                ),
            }],
        };
        assert_eq!(program, expected);
    }

    #[test]
    fn parentheses_override_precedence() {
        let program = parse_source("x = (1 + 2) * 3\n").expect("parse failed");
        let expected = Program {
            statements: vec![Statement::Assign {
                name: "x".to_string(),
                value: binary(
                    binary(int(1), BinaryOperator::Add, int(2)),
                    BinaryOperator::Mul,
                    int(3),
                ),
            }],
        };
        assert_eq!(program, expected);
    }

    #[test]
    fn unary_operators_nest_right_associatively() {
        let program = parse_source("x = not not True\ny = - - 1\n").expect("parse failed");
        let not_true = Expression::UnaryOp {
            op: UnaryOperator::Not,
            operand: Box::new(Expression::Boolean(true)),
        };
        let neg_one = Expression::UnaryOp {
            op: UnaryOperator::Neg,
            operand: Box::new(int(1)),
        };
        let expected = Program {
            statements: vec![
                Statement::Assign {
                    name: "x".to_string(),
                    value: Expression::UnaryOp {
                        op: UnaryOperator::Not,
                        operand: Box::new(not_true),
                    },
                },
                Statement::Assign {
                    name: "y".to_string(),
                    value: Expression::UnaryOp {
                        op: UnaryOperator::Neg,
                        operand: Box::new(neg_one),
                    },
                },
            ],
        };
        assert_eq!(program, expected);
    }

    #[test]
    fn rejects_chained_comparison() {
        let err = parse_source("x = 1 < 2 < 3\n").expect_err("expected parse failure");
        assert!(err.to_string().contains("Expected newline"));
    }

    #[test]
    fn dispatches_list_statements() {
        let input = indoc! {"
            a = list()
            a.append(1)
            a[0] = 2
            b = a[0]
        "};
        let program = parse_source(input).expect("parse failed");
        let expected = Program {
            statements: vec![
                Statement::NewList {
                    name: "a".to_string(),
                },
                Statement::Append {
                    name: "a".to_string(),
                    value: int(1),
                },
                Statement::AssignIndex {
                    name: "a".to_string(),
                    index: int(0),
                    value: int(2),
                },
                Statement::Assign {
                    name: "b".to_string(),
                    value: Expression::Index {
                        name: "a".to_string(),
                        index: Box::new(int(0)),
                    },
                },
            ],
        };
        assert_eq!(program, expected);
    }

    #[test]
    fn parses_if_elif_else() {
        let input = indoc! {"
            if x > 0:
              print(1)
            elif x == 0:
              print(0)
            else:
              print(2)
        "};
        let program = parse_source(input).expect("parse failed");
        let Statement::If {
            elif_clauses,
            else_block,
            ..
        } = &program.statements[0]
        else {
            panic!("expected if statement, got {:?}", program.statements[0]);
        };
        assert_eq!(elif_clauses.len(), 1);
        assert!(else_block.is_some());
    }

    #[test]
    fn parses_nested_blocks() {
        let input = indoc! {"
            while a < 10:
              if a == 5:
                break
              a = a + 1
        "};
        let program = parse_source(input).expect("parse failed");
        let Statement::While { body, .. } = &program.statements[0] else {
            panic!("expected while statement");
        };
        assert_eq!(body.statements.len(), 2);
        let Statement::If { then_block, .. } = &body.statements[0] else {
            panic!("expected nested if statement");
        };
        assert_eq!(then_block.statements, vec![Statement::Break]);
    }

    #[test]
    fn tolerates_blank_lines_between_statements() {
        let program = parse_source("x = 1\n\n\ny = 2\n").expect("parse failed");
        assert_eq!(program.statements.len(), 2);
    }

    #[test]
    fn parses_empty_program() {
        let program = parse_source("\n\n").expect("parse failed");
        assert_eq!(program.statements, vec![]);
    }

    #[test]
    fn errors_on_missing_colon() {
        let err = parse_source("if True\n  x = 1\n").expect_err("expected parse failure");
        assert!(err.to_string().contains("Expected ':'"));
    }

    #[test]
    fn errors_on_missing_block_indent() {
        let err = parse_source("if True:\nx = 1\n").expect_err("expected parse failure");
        assert!(err.to_string().contains("Expected indented block"));
    }

    #[test]
    fn errors_on_bare_identifier_statement() {
        let err = parse_source("x\n").expect_err("expected parse failure");
        assert!(err.to_string().contains("in simple statement"));
    }

    #[test]
    fn errors_on_keyword_in_expression_position() {
        let err = parse_source("x = while\n").expect_err("expected parse failure");
        assert!(err.to_string().contains("Expected expression"));
    }

    #[test]
    fn errors_on_list_create_with_arguments() {
        let err = parse_source("a = list(1)\n").expect_err("expected parse failure");
        assert!(err.to_string().contains("Expected ')'"));
    }
}
