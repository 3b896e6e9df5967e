// Hand-written scanner. Tracks line numbers for error reporting.

use smol_str::SmolStr;

use super::CompileError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Number(f64),
    Str(SmolStr),
    Ident(SmolStr),

    // keywords
    Var,
    Return,
    True,
    False,
    Null,
    Undefined,

    // punctuation
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Assign,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    LParen,
    RParen,
    Comma,
    Semi,

    Eof,
}

impl Token {
    pub(crate) fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("number '{}'", n),
            Token::Str(_) => "string literal".to_string(),
            Token::Ident(name) => format!("identifier '{}'", name),
            Token::Var => "'var'".to_string(),
            Token::Return => "'return'".to_string(),
            Token::True => "'true'".to_string(),
            Token::False => "'false'".to_string(),
            Token::Null => "'null'".to_string(),
            Token::Undefined => "'undefined'".to_string(),
            Token::Plus => "'+'".to_string(),
            Token::Minus => "'-'".to_string(),
            Token::Star => "'*'".to_string(),
            Token::Slash => "'/'".to_string(),
            Token::Percent => "'%'".to_string(),
            Token::Bang => "'!'".to_string(),
            Token::Assign => "'='".to_string(),
            Token::EqEq => "'=='".to_string(),
            Token::NotEq => "'!='".to_string(),
            Token::Lt => "'<'".to_string(),
            Token::Le => "'<='".to_string(),
            Token::Gt => "'>'".to_string(),
            Token::Ge => "'>='".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::Comma => "','".to_string(),
            Token::Semi => "';'".to_string(),
            Token::Eof => "end of input".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SpannedToken {
    pub token: Token,
    pub line: u32,
}

pub(crate) struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: u32,
}

impl<'a> Lexer<'a> {
    pub(crate) fn new(src: &'a str) -> Self {
        Lexer { src, pos: 0, line: 1 }
    }

    fn error(&self, message: impl Into<String>) -> CompileError {
        CompileError {
            message: message.into(),
            line: self.line,
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek2(&self) -> Option<char> {
        let mut it = self.src[self.pos..].chars();
        it.next();
        it.next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn skip_trivia(&mut self) -> Result<(), CompileError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') if self.peek2() == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some('/') if self.peek2() == Some('*') => {
                    self.bump();
                    self.bump();
                    loop {
                        match self.peek() {
                            None => return Err(self.error("unterminated block comment")),
                            Some('*') if self.peek2() == Some('/') => {
                                self.bump();
                                self.bump();
                                break;
                            }
                            _ => {
                                self.bump();
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    pub(crate) fn next_token(&mut self) -> Result<SpannedToken, CompileError> {
        self.skip_trivia()?;
        let line = self.line;
        let token = match self.peek() {
            None => Token::Eof,
            Some(c) if c.is_ascii_digit() => self.lex_number()?,
            Some(c) if c.is_ascii_alphabetic() || c == '_' => self.lex_ident(),
            Some(q @ ('"' | '\'')) => self.lex_string(q)?,
            Some(c) => {
                self.bump();
                match c {
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '*' => Token::Star,
                    '/' => Token::Slash,
                    '%' => Token::Percent,
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    ',' => Token::Comma,
                    ';' => Token::Semi,
                    '=' => {
                        if self.peek() == Some('=') {
                            self.bump();
                            Token::EqEq
                        } else {
                            Token::Assign
                        }
                    }
                    '!' => {
                        if self.peek() == Some('=') {
                            self.bump();
                            Token::NotEq
                        } else {
                            Token::Bang
                        }
                    }
                    '<' => {
                        if self.peek() == Some('=') {
                            self.bump();
                            Token::Le
                        } else {
                            Token::Lt
                        }
                    }
                    '>' => {
                        if self.peek() == Some('=') {
                            self.bump();
                            Token::Ge
                        } else {
                            Token::Gt
                        }
                    }
                    _ => return Err(self.error(format!("unexpected character '{}'", c))),
                }
            }
        };
        Ok(SpannedToken { token, line })
    }

    fn lex_number(&mut self) -> Result<Token, CompileError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        if self.peek() == Some('.') && self.peek2().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            self.bump();
            if matches!(self.peek(), Some('+' | '-')) {
                self.bump();
            }
            if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
                return Err(self.error("malformed exponent in number literal"));
            }
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }
        let text = &self.src[start..self.pos];
        match text.parse::<f64>() {
            Ok(n) => Ok(Token::Number(n)),
            Err(_) => Err(self.error(format!("invalid number literal '{}'", text))),
        }
    }

    fn lex_ident(&mut self) -> Token {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.bump();
        }
        match &self.src[start..self.pos] {
            "var" => Token::Var,
            "return" => Token::Return,
            "true" => Token::True,
            "false" => Token::False,
            "null" => Token::Null,
            "undefined" => Token::Undefined,
            name => Token::Ident(SmolStr::new(name)),
        }
    }

    fn lex_string(&mut self, quote: char) -> Result<Token, CompileError> {
        self.bump(); // opening quote
        let mut text = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string literal")),
                Some('\n') => return Err(self.error("unterminated string literal")),
                Some(c) if c == quote => break,
                Some('\\') => {
                    let esc = self
                        .bump()
                        .ok_or_else(|| self.error("unterminated string literal"))?;
                    match esc {
                        'n' => text.push('\n'),
                        't' => text.push('\t'),
                        'r' => text.push('\r'),
                        '0' => text.push('\0'),
                        '\\' => text.push('\\'),
                        '\'' => text.push('\''),
                        '"' => text.push('"'),
                        other => {
                            return Err(
                                self.error(format!("unknown escape sequence '\\{}'", other))
                            );
                        }
                    }
                }
                Some(c) => text.push(c),
            }
        }
        Ok(Token::Str(SmolStr::from(text)))
    }
}
