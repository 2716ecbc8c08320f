//! Recursive-descent parser producing the expression AST.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! or         := and ("or" and)*
//! and        := not ("and" not)*
//! not        := "not" not | comparison
//! comparison := additive (("==" | "!=" | "<" | "<=" | ">" | ">=") additive)?
//! additive   := term (("+" | "-") term)*
//! term       := unary (("*" | "/" | "//" | "%") unary)*
//! unary      := ("-" | "+") unary | power
//! power      := postfix (("**" | "^") unary)?
//! postfix    := primary ("." IDENT "(" args ")")*
//! primary    := NUMBER | STRING | "true" | "false" | IDENT "(" args ")" | "(" or ")"
//! ```

use super::lexer::Token;
use super::ExprError;

/// Deepest nesting the parser accepts.
pub const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Rem,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Str(String),
    Bool(bool),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call { name: String, args: Vec<Expr> },
    Method {
        receiver: Box<Expr>,
        name: String,
        args: Vec<Expr>,
    },
}

pub fn parse(tokens: &[Token]) -> Result<Expr, ExprError> {
    if tokens.is_empty() {
        return Err(ExprError::Empty);
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.or()?;

    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(ExprError::UnexpectedToken(format!("{:?}", token))),
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        match self.peek() {
            Some(Token::Ident(name)) if name == keyword => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), ExprError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(match self.peek() {
                Some(token) => ExprError::UnexpectedToken(format!("{:?}", token)),
                None => ExprError::UnexpectedEnd,
            })
        }
    }

    fn enter(&mut self) -> Result<(), ExprError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExprError::TooDeep(MAX_DEPTH));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn or(&mut self) -> Result<Expr, ExprError> {
        self.enter()?;
        let mut left = self.and()?;
        while self.eat_keyword("or") {
            let right = self.and()?;
            left = Expr::Binary(BinaryOp::Or, Box::new(left), Box::new(right));
        }
        self.leave();
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.not()?;
        while self.eat_keyword("and") {
            let right = self.not()?;
            left = Expr::Binary(BinaryOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn not(&mut self) -> Result<Expr, ExprError> {
        if self.eat_keyword("not") {
            self.enter()?;
            let operand = self.not()?;
            self.leave();
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(operand)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, ExprError> {
        let left = self.additive()?;
        let op = match self.peek() {
            Some(Token::Eq) => BinaryOp::Eq,
            Some(Token::Ne) => BinaryOp::Ne,
            Some(Token::Lt) => BinaryOp::Lt,
            Some(Token::Le) => BinaryOp::Le,
            Some(Token::Gt) => BinaryOp::Gt,
            Some(Token::Ge) => BinaryOp::Ge,
            _ => return Ok(left),
        };
        self.pos += 1;
        let right = self.additive()?;
        Ok(Expr::Binary(op, Box::new(left), Box::new(right)))
    }

    fn additive(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.term()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn term(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::DoubleSlash) => BinaryOp::FloorDiv,
                Some(Token::Percent) => BinaryOp::Rem,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        let op = match self.peek() {
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Plus) => UnaryOp::Plus,
            _ => return self.power(),
        };
        self.pos += 1;
        self.enter()?;
        let operand = self.unary()?;
        self.leave();
        Ok(Expr::Unary(op, Box::new(operand)))
    }

    fn power(&mut self) -> Result<Expr, ExprError> {
        let base = self.postfix()?;
        if self.eat(&Token::Power) {
            self.enter()?;
            let exponent = self.unary()?;
            self.leave();
            return Ok(Expr::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn postfix(&mut self) -> Result<Expr, ExprError> {
        let mut expr = self.primary()?;
        while self.eat(&Token::Dot) {
            let name = match self.advance() {
                Some(Token::Ident(name)) => name.clone(),
                Some(token) => return Err(ExprError::UnexpectedToken(format!("{:?}", token))),
                None => return Err(ExprError::UnexpectedEnd),
            };
            self.expect(&Token::LParen)?;
            let args = self.args()?;
            expr = Expr::Method {
                receiver: Box::new(expr),
                name,
                args,
            };
        }
        Ok(expr)
    }

    /// Arguments after an opening parenthesis, through the closing one.
    fn args(&mut self) -> Result<Vec<Expr>, ExprError> {
        let mut args = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.or()?);
            if self.eat(&Token::RParen) {
                return Ok(args);
            }
            self.expect(&Token::Comma)?;
        }
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Number(*n)),
            Some(Token::Str(s)) => Ok(Expr::Str(s.clone())),
            Some(Token::Ident(name)) => match name.as_str() {
                "true" | "True" => Ok(Expr::Bool(true)),
                "false" | "False" => Ok(Expr::Bool(false)),
                _ => {
                    if !self.eat(&Token::LParen) {
                        return Err(ExprError::UnknownName(name.clone()));
                    }
                    let args = self.args()?;
                    Ok(Expr::Call {
                        name: name.clone(),
                        args,
                    })
                }
            },
            Some(Token::LParen) => {
                let inner = self.or()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(token) => Err(ExprError::UnexpectedToken(format!("{:?}", token))),
            None => Err(ExprError::UnexpectedEnd),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::lexer::tokenize;
    use super::*;

    fn parse_str(input: &str) -> Result<Expr, ExprError> {
        parse(&tokenize(input)?)
    }

    #[test]
    fn test_precedence() {
        let expr = parse_str("1 + 2 * 3").unwrap();
        assert_eq!(
            expr,
            Expr::Binary(
                BinaryOp::Add,
                Box::new(Expr::Number(1.0)),
                Box::new(Expr::Binary(
                    BinaryOp::Mul,
                    Box::new(Expr::Number(2.0)),
                    Box::new(Expr::Number(3.0)),
                )),
            )
        );
    }

    #[test]
    fn test_power_is_right_associative() {
        let expr = parse_str("2 ** 3 ** 2").unwrap();
        match expr {
            Expr::Binary(BinaryOp::Pow, base, exponent) => {
                assert_eq!(*base, Expr::Number(2.0));
                assert!(matches!(*exponent, Expr::Binary(BinaryOp::Pow, _, _)));
            }
            other => panic!("unexpected AST: {:?}", other),
        }
    }

    #[test]
    fn test_method_call() {
        let expr = parse_str("'banana'.count('a')").unwrap();
        assert!(matches!(expr, Expr::Method { ref name, .. } if name == "count"));
    }

    #[test]
    fn test_bare_identifier_is_rejected() {
        assert!(matches!(
            parse_str("x + 1"),
            Err(ExprError::UnknownName(name)) if name == "x"
        ));
    }

    #[test]
    fn test_trailing_tokens_are_rejected() {
        assert!(matches!(parse_str("1 2"), Err(ExprError::UnexpectedToken(_))));
        assert!(matches!(parse_str("(1 + 2"), Err(ExprError::UnexpectedEnd)));
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}1{}", "(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
        assert!(matches!(parse_str(&deep), Err(ExprError::TooDeep(_))));

        let shallow = format!("{}1{}", "(".repeat(10), ")".repeat(10));
        assert!(parse_str(&shallow).is_ok());
    }
}
