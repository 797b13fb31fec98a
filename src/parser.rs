use crate::ast::{
    AssignOp, BinaryOp, CatchClause, DeclKind, Expression, Function, Literal, Program, Statement,
    UnaryOp,
};
use crate::token::{Keyword, Op, Token, TokenKind};

mod error;

pub use error::ParseError;

/// Recursion ceiling for nested expressions and blocks. Exceeding it is a
/// parse error, not a host stack overflow.
const MAX_DEPTH: usize = 256;

pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
            depth: 0,
        }
    }

    pub fn parse_program(mut self) -> Result<Program, ParseError> {
        let mut statements = Vec::new();
        while !self.at_end() {
            if self.eat_symbol(';') {
                continue;
            }
            statements.push(self.parse_statement()?);
        }
        Ok(Program { statements })
    }

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        self.enter()?;
        let statement = self.parse_statement_inner();
        self.depth -= 1;
        statement
    }

    fn parse_statement_inner(&mut self) -> Result<Statement, ParseError> {
        if let TokenKind::Keyword(keyword) = self.current().kind {
            match keyword {
                Keyword::Let | Keyword::Const | Keyword::Var => {
                    return self.parse_variable_declaration();
                }
                Keyword::Def | Keyword::Function => {
                    return Ok(Statement::FunctionDeclaration(self.parse_function()?));
                }
                Keyword::Class => return self.parse_class_declaration(),
                Keyword::If => return self.parse_if_statement(),
                Keyword::While => return self.parse_while_statement(),
                Keyword::For => return self.parse_for_statement(),
                Keyword::Return => return self.parse_return_statement(),
                Keyword::Throw => {
                    self.advance();
                    return Ok(Statement::Throw(self.parse_expression()?));
                }
                Keyword::Try => return self.parse_try_statement(),
                Keyword::Import => return self.parse_import_statement(),
                Keyword::Export => {
                    self.advance();
                    return Ok(Statement::Export(Box::new(self.parse_statement()?)));
                }
                Keyword::Break => {
                    self.advance();
                    return Ok(Statement::Break);
                }
                Keyword::Continue => {
                    self.advance();
                    return Ok(Statement::Continue);
                }
                _ => {}
            }
        }
        Ok(Statement::Expression(self.parse_expression()?))
    }

    fn parse_variable_declaration(&mut self) -> Result<Statement, ParseError> {
        let kind = match self.current().kind {
            TokenKind::Keyword(Keyword::Const) => DeclKind::Const,
            TokenKind::Keyword(Keyword::Var) => DeclKind::Var,
            _ => DeclKind::Let,
        };
        self.advance();
        let name = self.expect_identifier()?;
        let init = if self.eat_op(Op::Assign) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        Ok(Statement::VariableDeclaration { kind, name, init })
    }

    fn parse_function(&mut self) -> Result<Function, ParseError> {
        // `def` and `function` are interchangeable.
        if !self.eat_keyword(Keyword::Def) && !self.eat_keyword(Keyword::Function) {
            return Err(self.error("'def'"));
        }
        let name = self.expect_identifier()?;
        self.expect_symbol('(')?;
        let mut params = Vec::new();
        while !self.check_symbol(')') {
            params.push(self.expect_identifier()?);
            if !self.eat_symbol(',') {
                break;
            }
        }
        self.expect_symbol(')')?;
        let body = self.parse_block()?;
        Ok(Function { name, params, body })
    }

    fn parse_class_declaration(&mut self) -> Result<Statement, ParseError> {
        self.expect_keyword(Keyword::Class)?;
        let name = self.expect_identifier()?;
        let parent = if self.eat_keyword(Keyword::Extends) {
            Some(self.expect_identifier()?)
        } else {
            None
        };
        self.expect_symbol('{')?;
        let mut fields = Vec::new();
        let mut methods = Vec::new();
        while !self.check_symbol('}') {
            if self.at_end() {
                return Err(self.eof_error("'}' closing class body"));
            }
            if self.eat_symbol(';') {
                continue;
            }
            match self.current().kind {
                TokenKind::Keyword(Keyword::Def | Keyword::Function) => {
                    methods.push(self.parse_function()?);
                }
                TokenKind::Keyword(Keyword::Let | Keyword::Var) => {
                    self.advance();
                    let field = self.expect_identifier()?;
                    let init = if self.eat_op(Op::Assign) {
                        Some(self.parse_expression()?)
                    } else {
                        None
                    };
                    fields.push((field, init));
                }
                _ => return Err(self.error("class member ('def', 'let' or 'var')")),
            }
        }
        self.expect_symbol('}')?;
        Ok(Statement::ClassDeclaration {
            name,
            parent,
            fields,
            methods,
        })
    }

    fn parse_if_statement(&mut self) -> Result<Statement, ParseError> {
        // Entered on `if` or, for a chain alternate, on `elsif`.
        if !self.eat_keyword(Keyword::If) && !self.eat_keyword(Keyword::Elsif) {
            return Err(self.error("'if'"));
        }
        self.expect_symbol('(')?;
        let test = self.parse_expression()?;
        self.expect_symbol(')')?;
        let consequent = self.parse_block()?;

        // An `elsif` chain nests as the alternate; the braces on every
        // branch make else-binding unambiguous.
        let alternate = if self.check_keyword(Keyword::Elsif) {
            Some(Box::new(self.parse_if_statement()?))
        } else if self.eat_keyword(Keyword::Else) {
            Some(Box::new(Statement::Block(self.parse_block()?)))
        } else {
            None
        };

        Ok(Statement::If {
            test,
            consequent,
            alternate,
        })
    }

    fn parse_while_statement(&mut self) -> Result<Statement, ParseError> {
        self.expect_keyword(Keyword::While)?;
        self.expect_symbol('(')?;
        let test = self.parse_expression()?;
        self.expect_symbol(')')?;
        let body = self.parse_block()?;
        Ok(Statement::While { test, body })
    }

    fn parse_for_statement(&mut self) -> Result<Statement, ParseError> {
        self.expect_keyword(Keyword::For)?;
        let iterator = self.expect_identifier()?;
        self.expect_op(Op::Assign)?;
        let start = self.parse_expression()?;
        self.expect_keyword(Keyword::To)?;
        let end = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(Statement::For {
            iterator,
            start,
            end,
            body,
        })
    }

    fn parse_return_statement(&mut self) -> Result<Statement, ParseError> {
        self.expect_keyword(Keyword::Return)?;
        let value = if self.check_symbol('}') || self.check_symbol(';') || self.at_end() {
            None
        } else {
            Some(self.parse_expression()?)
        };
        Ok(Statement::Return(value))
    }

    fn parse_try_statement(&mut self) -> Result<Statement, ParseError> {
        self.expect_keyword(Keyword::Try)?;
        let body = self.parse_block()?;

        let handler = if self.eat_keyword(Keyword::Catch) {
            self.expect_symbol('(')?;
            let param = self.expect_identifier()?;
            self.expect_symbol(')')?;
            let body = self.parse_block()?;
            Some(CatchClause { param, body })
        } else {
            None
        };

        let finalizer = if self.eat_keyword(Keyword::Finally) {
            Some(self.parse_block()?)
        } else {
            None
        };

        Ok(Statement::Try {
            body,
            handler,
            finalizer,
        })
    }

    fn parse_import_statement(&mut self) -> Result<Statement, ParseError> {
        self.expect_keyword(Keyword::Import)?;
        let mut names = Vec::new();
        if self.eat_symbol('{') {
            while !self.check_symbol('}') {
                names.push(self.expect_identifier()?);
                if !self.eat_symbol(',') {
                    break;
                }
            }
            self.expect_symbol('}')?;
        } else {
            names.push(self.expect_identifier()?);
        }
        self.expect_keyword(Keyword::From)?;
        let source = self.expect_string()?;
        Ok(Statement::Import { names, source })
    }

    /// Brace-delimited statement list. Exactly one closing brace is consumed
    /// per opening brace; hitting end of input first is an error.
    fn parse_block(&mut self) -> Result<Vec<Statement>, ParseError> {
        self.enter()?;
        let result = self.parse_block_inner();
        self.depth -= 1;
        result
    }

    fn parse_block_inner(&mut self) -> Result<Vec<Statement>, ParseError> {
        self.expect_symbol('{')?;
        let mut statements = Vec::new();
        while !self.check_symbol('}') {
            if self.at_end() {
                return Err(self.eof_error("'}' closing block"));
            }
            if self.eat_symbol(';') {
                continue;
            }
            statements.push(self.parse_statement()?);
        }
        self.expect_symbol('}')?;
        Ok(statements)
    }

    fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        self.enter()?;
        let expr = self.parse_assignment();
        self.depth -= 1;
        expr
    }

    fn parse_assignment(&mut self) -> Result<Expression, ParseError> {
        let expr = self.parse_logical_or()?;

        let op = match self.current().kind {
            TokenKind::Operator(Op::Assign) => AssignOp::Assign,
            TokenKind::Operator(Op::PlusAssign) => AssignOp::Add,
            TokenKind::Operator(Op::MinusAssign) => AssignOp::Sub,
            TokenKind::Operator(Op::StarAssign) => AssignOp::Mul,
            TokenKind::Operator(Op::SlashAssign) => AssignOp::Div,
            _ => return Ok(expr),
        };
        self.advance();
        let value = self.parse_assignment()?;
        Ok(Expression::Assignment {
            target: Box::new(expr),
            op,
            value: Box::new(value),
        })
    }

    fn parse_logical_or(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.parse_logical_and()?;
        while self.eat_op(Op::OrOr) {
            let right = self.parse_logical_and()?;
            expr = binary(expr, BinaryOp::Or, right);
        }
        Ok(expr)
    }

    fn parse_logical_and(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.parse_equality()?;
        while self.eat_op(Op::AndAnd) {
            let right = self.parse_equality()?;
            expr = binary(expr, BinaryOp::And, right);
        }
        Ok(expr)
    }

    fn parse_equality(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.parse_relational()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Operator(Op::Eq) => BinaryOp::Eq,
                TokenKind::Operator(Op::Ne) => BinaryOp::Ne,
                _ => break,
            };
            self.advance();
            let right = self.parse_relational()?;
            expr = binary(expr, op, right);
        }
        Ok(expr)
    }

    fn parse_relational(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.parse_additive()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Operator(Op::Lt) => BinaryOp::Lt,
                TokenKind::Operator(Op::Gt) => BinaryOp::Gt,
                TokenKind::Operator(Op::Le) => BinaryOp::Le,
                TokenKind::Operator(Op::Ge) => BinaryOp::Ge,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            expr = binary(expr, op, right);
        }
        Ok(expr)
    }

    fn parse_additive(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.parse_multiplicative()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Operator(Op::Plus) => BinaryOp::Add,
                TokenKind::Operator(Op::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            expr = binary(expr, op, right);
        }
        Ok(expr)
    }

    fn parse_multiplicative(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.parse_unary()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Operator(Op::Star) => BinaryOp::Mul,
                TokenKind::Operator(Op::Slash) => BinaryOp::Div,
                TokenKind::Operator(Op::Percent) => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            expr = binary(expr, op, right);
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Expression, ParseError> {
        let op = match self.current().kind {
            TokenKind::Operator(Op::Minus) => UnaryOp::Neg,
            TokenKind::Operator(Op::Not) => UnaryOp::Not,
            TokenKind::Operator(Op::PlusPlus) => UnaryOp::Increment,
            TokenKind::Operator(Op::MinusMinus) => UnaryOp::Decrement,
            _ => return self.parse_postfix(),
        };
        self.advance();
        self.enter()?;
        let operand = self.parse_unary();
        self.depth -= 1;
        Ok(Expression::Unary {
            op,
            operand: Box::new(operand?),
            prefix: true,
        })
    }

    fn parse_postfix(&mut self) -> Result<Expression, ParseError> {
        let expr = self.parse_call_chain()?;
        let op = match self.current().kind {
            TokenKind::Operator(Op::PlusPlus) => UnaryOp::Increment,
            TokenKind::Operator(Op::MinusMinus) => UnaryOp::Decrement,
            _ => return Ok(expr),
        };
        self.advance();
        Ok(Expression::Unary {
            op,
            operand: Box::new(expr),
            prefix: false,
        })
    }

    fn parse_call_chain(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat_symbol('(') {
                let args = self.parse_arguments()?;
                expr = Expression::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else if self.eat_symbol('.') {
                let property = self.expect_identifier()?;
                expr = Expression::Member {
                    object: Box::new(expr),
                    property,
                };
            } else if self.eat_symbol('[') {
                let index = self.parse_expression()?;
                self.expect_symbol(']')?;
                expr = Expression::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    /// Comma-separated arguments; the opening '(' is already consumed.
    fn parse_arguments(&mut self) -> Result<Vec<Expression>, ParseError> {
        let mut args = Vec::new();
        while !self.check_symbol(')') {
            args.push(self.parse_expression()?);
            if !self.eat_symbol(',') {
                break;
            }
        }
        self.expect_symbol(')')?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expression, ParseError> {
        match self.current().kind.clone() {
            TokenKind::Number(value) => {
                self.advance();
                Ok(Expression::Literal(Literal::Number(value)))
            }
            TokenKind::Str(value) => {
                self.advance();
                Ok(Expression::Literal(Literal::Str(value)))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Ok(Expression::Literal(Literal::Boolean(true)))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Ok(Expression::Literal(Literal::Boolean(false)))
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.advance();
                Ok(Expression::Literal(Literal::Null))
            }
            TokenKind::Keyword(Keyword::This) => {
                self.advance();
                Ok(Expression::This)
            }
            TokenKind::Keyword(Keyword::New) => {
                self.advance();
                let class_name = self.expect_identifier()?;
                self.expect_symbol('(')?;
                let args = self.parse_arguments()?;
                Ok(Expression::New { class_name, args })
            }
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(Expression::Identifier(name))
            }
            TokenKind::Symbol('(') => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect_symbol(')')?;
                Ok(expr)
            }
            TokenKind::Symbol('[') => {
                self.advance();
                let mut elements = Vec::new();
                while !self.check_symbol(']') {
                    elements.push(self.parse_expression()?);
                    if !self.eat_symbol(',') {
                        break;
                    }
                }
                self.expect_symbol(']')?;
                Ok(Expression::Array(elements))
            }
            TokenKind::Symbol('{') => {
                self.advance();
                let mut properties = Vec::new();
                while !self.check_symbol('}') {
                    let key = self.expect_identifier()?;
                    self.expect_symbol(':')?;
                    let value = self.parse_expression()?;
                    properties.push((key, value));
                    if !self.eat_symbol(',') {
                        break;
                    }
                }
                self.expect_symbol('}')?;
                Ok(Expression::Object(properties))
            }
            _ => Err(self.error("expression")),
        }
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ParseError::NestingTooDeep {
                line: self.current().span.line,
            });
        }
        Ok(())
    }

    fn current(&self) -> &Token {
        // The stream always ends with Eof, so position stays in bounds.
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn at_end(&self) -> bool {
        matches!(self.current().kind, TokenKind::Eof)
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
    }

    fn check_symbol(&self, ch: char) -> bool {
        matches!(self.current().kind, TokenKind::Symbol(c) if c == ch)
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        matches!(self.current().kind, TokenKind::Keyword(k) if k == keyword)
    }

    fn eat_symbol(&mut self, ch: char) -> bool {
        if self.check_symbol(ch) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        if self.check_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_op(&mut self, op: Op) -> bool {
        if matches!(self.current().kind, TokenKind::Operator(o) if o == op) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_symbol(&mut self, ch: char) -> Result<(), ParseError> {
        if self.eat_symbol(ch) {
            Ok(())
        } else {
            Err(self.error(&format!("'{ch}'")))
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<(), ParseError> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.error(&format!("'{}'", keyword.as_str())))
        }
    }

    fn expect_op(&mut self, op: Op) -> Result<(), ParseError> {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(self.error(&format!("'{}'", op.as_str())))
        }
    }

    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        if let TokenKind::Identifier(name) = &self.current().kind {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.error("identifier"))
        }
    }

    fn expect_string(&mut self) -> Result<String, ParseError> {
        if let TokenKind::Str(value) = &self.current().kind {
            let value = value.clone();
            self.advance();
            Ok(value)
        } else {
            Err(self.error("string"))
        }
    }

    fn error(&self, expected: &str) -> ParseError {
        let token = self.current();
        if matches!(token.kind, TokenKind::Eof) {
            return self.eof_error(expected);
        }
        ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found_kind: token.kind.name(),
            found: token.kind.to_string(),
            line: token.span.line,
            column: token.span.column,
        }
    }

    fn eof_error(&self, expected: &str) -> ParseError {
        ParseError::UnexpectedEof {
            expected: expected.to_string(),
            line: self.current().span.line,
        }
    }
}

fn binary(left: Expression, op: BinaryOp, right: Expression) -> Expression {
    Expression::Binary {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

pub fn parse_tokens(tokens: Vec<Token>) -> Result<Program, ParseError> {
    Parser::new(tokens).parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use indoc::indoc;

    fn parse_source(input: &str) -> Program {
        parse_tokens(tokenize(input).expect("tokenize failed")).expect("parse failed")
    }

    #[test]
    fn parses_declaration_and_call() {
        let program = parse_source("let x = 2\nprint(x + 3)");
        let expected = Program {
            statements: vec![
                Statement::VariableDeclaration {
                    kind: DeclKind::Let,
                    name: "x".to_string(),
                    init: Some(Expression::Literal(Literal::Number(2.0))),
                },
                Statement::Expression(Expression::Call {
                    callee: Box::new(Expression::Identifier("print".to_string())),
                    args: vec![Expression::Binary {
                        left: Box::new(Expression::Identifier("x".to_string())),
                        op: BinaryOp::Add,
                        right: Box::new(Expression::Literal(Literal::Number(3.0))),
                    }],
                }),
            ],
        };
        assert_eq!(program, expected);
    }

    #[test]
    fn statement_count_matches_source() {
        let program = parse_source(indoc! {"
            let a = 1
            def f(x) { return x }
            if (a) { f(a) }
            a
        "});
        assert_eq!(program.statements.len(), 4);
    }

    #[test]
    fn precedence_mul_binds_tighter_than_add() {
        let program = parse_source("1 + 2 * 3");
        let Statement::Expression(Expression::Binary { op, right, .. }) = &program.statements[0]
        else {
            panic!("expected binary expression statement");
        };
        assert_eq!(*op, BinaryOp::Add);
        assert!(matches!(
            right.as_ref(),
            Expression::Binary {
                op: BinaryOp::Mul,
                ..
            }
        ));
    }

    #[test]
    fn binary_operators_are_left_associative() {
        let program = parse_source("10 - 4 - 3");
        let Statement::Expression(Expression::Binary { left, op, .. }) = &program.statements[0]
        else {
            panic!("expected binary expression statement");
        };
        assert_eq!(*op, BinaryOp::Sub);
        assert!(matches!(
            left.as_ref(),
            Expression::Binary {
                op: BinaryOp::Sub,
                ..
            }
        ));
    }

    #[test]
    fn assignment_is_right_associative() {
        let program = parse_source("let a = 0\nlet b = 0\na = b = 3");
        let Statement::Expression(Expression::Assignment { value, .. }) = &program.statements[2]
        else {
            panic!("expected assignment statement");
        };
        assert!(matches!(value.as_ref(), Expression::Assignment { .. }));
    }

    #[test]
    fn parses_elsif_chain_as_nested_if() {
        let program = parse_source(indoc! {"
            if (a) { 1 } elsif (b) { 2 } else { 3 }
        "});
        let Statement::If { alternate, .. } = &program.statements[0] else {
            panic!("expected if statement");
        };
        let inner = alternate.as_ref().expect("expected alternate");
        let Statement::If {
            alternate: inner_alt,
            ..
        } = inner.as_ref()
        else {
            panic!("elsif should nest as an if");
        };
        assert!(matches!(
            inner_alt.as_deref(),
            Some(Statement::Block(statements)) if statements.len() == 1
        ));
    }

    #[test]
    fn parses_for_to_loop() {
        let program = parse_source("for i = 1 to 3 { print(i) }");
        let Statement::For {
            iterator, body, ..
        } = &program.statements[0]
        else {
            panic!("expected for statement");
        };
        assert_eq!(iterator, "i");
        assert_eq!(body.len(), 1);
    }

    #[test]
    fn parses_class_with_fields_methods_and_parent() {
        let program = parse_source(indoc! {"
            class Dog extends Animal {
              let legs = 4
              def speak() { return \"woof\" }
            }
        "});
        let Statement::ClassDeclaration {
            name,
            parent,
            fields,
            methods,
        } = &program.statements[0]
        else {
            panic!("expected class declaration");
        };
        assert_eq!(name, "Dog");
        assert_eq!(parent.as_deref(), Some("Animal"));
        assert_eq!(fields.len(), 1);
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].name, "speak");
    }

    #[test]
    fn parses_try_catch_finally() {
        let program = parse_source(indoc! {r#"
            try { throw "boom" } catch (e) { print(e) } finally { print("done") }
        "#});
        let Statement::Try {
            body,
            handler,
            finalizer,
        } = &program.statements[0]
        else {
            panic!("expected try statement");
        };
        assert_eq!(body.len(), 1);
        assert_eq!(handler.as_ref().expect("handler").param, "e");
        assert!(finalizer.is_some());
    }

    #[test]
    fn parses_postfix_and_prefix_update() {
        let program = parse_source("let i = 0\ni++\n--i");
        assert!(matches!(
            &program.statements[1],
            Statement::Expression(Expression::Unary {
                op: UnaryOp::Increment,
                prefix: false,
                ..
            })
        ));
        assert!(matches!(
            &program.statements[2],
            Statement::Expression(Expression::Unary {
                op: UnaryOp::Decrement,
                prefix: true,
                ..
            })
        ));
    }

    #[test]
    fn parses_member_index_and_new() {
        let program = parse_source("let p = new Point(1, 2)\np.x\np[0]");
        assert!(matches!(
            &program.statements[0],
            Statement::VariableDeclaration {
                init: Some(Expression::New { class_name, args }),
                ..
            } if class_name == "Point" && args.len() == 2
        ));
        assert!(matches!(
            &program.statements[1],
            Statement::Expression(Expression::Member { property, .. }) if property == "x"
        ));
        assert!(matches!(
            &program.statements[2],
            Statement::Expression(Expression::Index { .. })
        ));
    }

    #[test]
    fn parses_import_and_export_as_records() {
        let program = parse_source(indoc! {r#"
            import { sin, cos } from "math"
            export def f() { return 1 }
        "#});
        assert!(matches!(
            &program.statements[0],
            Statement::Import { names, source }
                if names == &["sin".to_string(), "cos".to_string()] && source == "math"
        ));
        assert!(matches!(&program.statements[1], Statement::Export(_)));
    }

    #[test]
    fn unclosed_block_is_a_parse_error() {
        let tokens = tokenize("while (1) { print(1)").expect("tokenize failed");
        let err = parse_tokens(tokens).expect_err("expected parse failure");
        assert!(matches!(err, ParseError::UnexpectedEof { .. }));
    }

    #[test]
    fn reports_expected_and_actual() {
        let tokens = tokenize("def 5() {}").expect("tokenize failed");
        let err = parse_tokens(tokens).expect_err("expected parse failure");
        let ParseError::UnexpectedToken {
            expected,
            found_kind,
            line,
            ..
        } = err
        else {
            panic!("expected UnexpectedToken, got {err:?}");
        };
        assert_eq!(expected, "identifier");
        assert_eq!(found_kind, "number");
        assert_eq!(line, 1);
    }

    #[test]
    fn deep_nesting_fails_instead_of_overflowing() {
        let source = format!("{}1{}", "(".repeat(500), ")".repeat(500));
        let tokens = tokenize(&source).expect("tokenize failed");
        let err = parse_tokens(tokens).expect_err("expected parse failure");
        assert!(matches!(err, ParseError::NestingTooDeep { .. }));
    }

    #[test]
    fn parsing_twice_yields_equal_asts() {
        let input = "let x = 2\nprint(x + 3)";
        assert_eq!(parse_source(input), parse_source(input));
    }
}
