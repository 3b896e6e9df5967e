// Recursive-descent parser with direct bytecode emission.

use smol_str::SmolStr;

use crate::rill_value::{Chunk, Value};
use crate::rill_vm::Instruction;

use super::lexer::{Lexer, SpannedToken, Token};
use super::{CompileError, CompileMode};

const MAX_CALL_ARGS: usize = 255;

pub(crate) struct Parser<'a> {
    lexer: Lexer<'a>,
    cur: SpannedToken,
    next: SpannedToken,
    chunk: Chunk,
    mode: CompileMode,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(
        source: &'a str,
        chunk_name: &str,
        mode: CompileMode,
    ) -> Result<Self, CompileError> {
        let mut lexer = Lexer::new(source);
        let cur = lexer.next_token()?;
        let next = lexer.next_token()?;
        Ok(Parser {
            lexer,
            cur,
            next,
            chunk: Chunk::new(SmolStr::new(chunk_name)),
            mode,
        })
    }

    pub(crate) fn parse_unit(mut self) -> Result<Chunk, CompileError> {
        let mut strict = self.mode.contains(CompileMode::STRICT);

        // Directive prologue: a leading "use strict" expression statement.
        let is_directive = match (&self.cur.token, &self.next.token) {
            (Token::Str(s), Token::Semi | Token::Eof) => s == "use strict",
            _ => false,
        };
        if is_directive {
            strict = true;
            self.advance()?;
            if self.cur.token == Token::Semi {
                self.advance()?;
            }
        }

        while self.cur.token != Token::Eof {
            self.statement()?;
        }

        if self.is_program() {
            self.emit(Instruction::ReturnResult);
        } else {
            self.emit(Instruction::ReturnUndefined);
        }
        self.chunk.is_strict = strict;
        Ok(self.chunk)
    }

    /// Program mode: completion value is the last expression statement.
    fn is_program(&self) -> bool {
        self.mode.contains(CompileMode::EVAL) && !self.mode.contains(CompileMode::FUNCEXPR)
    }

    // ===== Statements =====

    fn statement(&mut self) -> Result<(), CompileError> {
        match &self.cur.token {
            Token::Var => self.var_statement(),
            Token::Return => self.return_statement(),
            Token::Ident(_) if self.next.token == Token::Assign => self.assign_statement(),
            _ => self.expression_statement(),
        }
    }

    fn var_statement(&mut self) -> Result<(), CompileError> {
        self.advance()?; // 'var'
        let name = self.expect_ident()?;
        if self.cur.token == Token::Assign {
            self.advance()?;
            self.expression()?;
        } else {
            let idx = self.add_const(Value::Undefined)?;
            self.emit(Instruction::Const(idx));
        }
        self.expect_semi()?;
        let idx = self.add_name(name)?;
        self.emit(Instruction::DeclGlobal(idx));
        Ok(())
    }

    fn return_statement(&mut self) -> Result<(), CompileError> {
        if !self.mode.contains(CompileMode::FUNCEXPR) {
            return Err(self.error_at("'return' outside a function body"));
        }
        self.advance()?; // 'return'
        if matches!(self.cur.token, Token::Semi | Token::Eof) {
            self.expect_semi()?;
            self.emit(Instruction::ReturnUndefined);
        } else {
            self.expression()?;
            self.expect_semi()?;
            self.emit(Instruction::Return);
        }
        Ok(())
    }

    fn assign_statement(&mut self) -> Result<(), CompileError> {
        let name = self.expect_ident()?;
        self.advance()?; // '='
        self.expression()?;
        self.expect_semi()?;
        let idx = self.add_name(name)?;
        self.emit(Instruction::SetGlobal(idx));
        Ok(())
    }

    fn expression_statement(&mut self) -> Result<(), CompileError> {
        self.expression()?;
        self.expect_semi()?;
        if self.is_program() {
            self.emit(Instruction::StoreResult);
        } else {
            self.emit(Instruction::Pop);
        }
        Ok(())
    }

    // ===== Expressions (precedence climbing) =====

    fn expression(&mut self) -> Result<(), CompileError> {
        self.equality()
    }

    fn equality(&mut self) -> Result<(), CompileError> {
        self.comparison()?;
        loop {
            let op = match self.cur.token {
                Token::EqEq => Instruction::Eq,
                Token::NotEq => Instruction::Ne,
                _ => break,
            };
            self.advance()?;
            self.comparison()?;
            self.emit(op);
        }
        Ok(())
    }

    fn comparison(&mut self) -> Result<(), CompileError> {
        self.term()?;
        loop {
            let op = match self.cur.token {
                Token::Lt => Instruction::Lt,
                Token::Le => Instruction::Le,
                Token::Gt => Instruction::Gt,
                Token::Ge => Instruction::Ge,
                _ => break,
            };
            self.advance()?;
            self.term()?;
            self.emit(op);
        }
        Ok(())
    }

    fn term(&mut self) -> Result<(), CompileError> {
        self.factor()?;
        loop {
            let op = match self.cur.token {
                Token::Plus => Instruction::Add,
                Token::Minus => Instruction::Sub,
                _ => break,
            };
            self.advance()?;
            self.factor()?;
            self.emit(op);
        }
        Ok(())
    }

    fn factor(&mut self) -> Result<(), CompileError> {
        self.unary()?;
        loop {
            let op = match self.cur.token {
                Token::Star => Instruction::Mul,
                Token::Slash => Instruction::Div,
                Token::Percent => Instruction::Mod,
                _ => break,
            };
            self.advance()?;
            self.unary()?;
            self.emit(op);
        }
        Ok(())
    }

    fn unary(&mut self) -> Result<(), CompileError> {
        match self.cur.token {
            Token::Minus => {
                self.advance()?;
                self.unary()?;
                self.emit(Instruction::Neg);
                Ok(())
            }
            Token::Bang => {
                self.advance()?;
                self.unary()?;
                self.emit(Instruction::Not);
                Ok(())
            }
            _ => self.call(),
        }
    }

    fn call(&mut self) -> Result<(), CompileError> {
        self.primary()?;
        while self.cur.token == Token::LParen {
            self.advance()?;
            let mut argc = 0usize;
            if self.cur.token != Token::RParen {
                loop {
                    self.expression()?;
                    argc += 1;
                    if self.cur.token != Token::Comma {
                        break;
                    }
                    self.advance()?;
                }
            }
            self.expect(Token::RParen, "')'")?;
            if argc > MAX_CALL_ARGS {
                return Err(self.error_at("too many call arguments"));
            }
            self.emit(Instruction::Call(argc as u8));
        }
        Ok(())
    }

    fn primary(&mut self) -> Result<(), CompileError> {
        let token = self.cur.token.clone();
        match token {
            Token::Number(n) => {
                self.advance()?;
                let idx = self.add_const(Value::Number(n))?;
                self.emit(Instruction::Const(idx));
            }
            Token::Str(s) => {
                self.advance()?;
                let idx = self.add_const(Value::String(s))?;
                self.emit(Instruction::Const(idx));
            }
            Token::True => {
                self.advance()?;
                let idx = self.add_const(Value::Boolean(true))?;
                self.emit(Instruction::Const(idx));
            }
            Token::False => {
                self.advance()?;
                let idx = self.add_const(Value::Boolean(false))?;
                self.emit(Instruction::Const(idx));
            }
            Token::Null => {
                self.advance()?;
                let idx = self.add_const(Value::Null)?;
                self.emit(Instruction::Const(idx));
            }
            Token::Undefined => {
                self.advance()?;
                let idx = self.add_const(Value::Undefined)?;
                self.emit(Instruction::Const(idx));
            }
            Token::Ident(name) => {
                self.advance()?;
                let idx = self.add_name(name)?;
                self.emit(Instruction::GetGlobal(idx));
            }
            Token::LParen => {
                self.advance()?;
                self.expression()?;
                self.expect(Token::RParen, "')'")?;
            }
            other => {
                return Err(self.error_at(format!("unexpected {}", other.describe())));
            }
        }
        Ok(())
    }

    // ===== Token plumbing =====

    fn advance(&mut self) -> Result<(), CompileError> {
        self.cur = std::mem::replace(&mut self.next, self.lexer.next_token()?);
        Ok(())
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<(), CompileError> {
        if self.cur.token == token {
            self.advance()
        } else {
            Err(self.error_at(format!("expected {}, found {}", what, self.cur.token.describe())))
        }
    }

    /// Statement terminator: a semicolon or the end of input.
    fn expect_semi(&mut self) -> Result<(), CompileError> {
        match self.cur.token {
            Token::Semi => self.advance(),
            Token::Eof => Ok(()),
            _ => Err(self.error_at(format!(
                "expected ';', found {}",
                self.cur.token.describe()
            ))),
        }
    }

    fn expect_ident(&mut self) -> Result<SmolStr, CompileError> {
        match self.cur.token.clone() {
            Token::Ident(name) => {
                self.advance()?;
                Ok(name)
            }
            other => Err(self.error_at(format!("expected identifier, found {}", other.describe()))),
        }
    }

    fn error_at(&self, message: impl Into<String>) -> CompileError {
        CompileError {
            message: message.into(),
            line: self.cur.line,
        }
    }

    // ===== Emission =====

    fn emit(&mut self, ins: Instruction) {
        self.chunk.code.push(ins);
    }

    fn add_const(&mut self, value: Value) -> Result<u16, CompileError> {
        if self.chunk.consts.len() > usize::from(u16::MAX) {
            return Err(self.error_at("too many constants in one chunk"));
        }
        self.chunk.consts.push(value);
        Ok((self.chunk.consts.len() - 1) as u16)
    }

    fn add_name(&mut self, name: SmolStr) -> Result<u16, CompileError> {
        if let Some(idx) = self.chunk.names.iter().position(|n| *n == name) {
            return Ok(idx as u16);
        }
        if self.chunk.names.len() > usize::from(u16::MAX) {
            return Err(self.error_at("too many names in one chunk"));
        }
        self.chunk.names.push(name);
        Ok((self.chunk.names.len() - 1) as u16)
    }
}
