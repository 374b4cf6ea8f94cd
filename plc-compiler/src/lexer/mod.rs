use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Raw source text of the token, escapes included.
    pub literal: String,
    /// Character offset of the first character of the token.
    pub index: usize,
}

impl Token {
    pub fn new(kind: TokenKind, literal: impl Into<String>, index: usize) -> Self {
        Self {
            kind,
            literal: literal.into(),
            index,
        }
    }

    /// Offset just past the last character of the token.
    pub fn end(&self) -> usize {
        self.index + self.literal.chars().count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    Integer,
    Decimal,
    Character,
    String,
    Operator,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct LexError {
    pub message: String,
    pub index: usize,
}

impl LexError {
    fn new(message: impl Into<String>, index: usize) -> Self {
        Self {
            message: message.into(),
            index,
        }
    }
}

/// Lexes `source` in one call.
pub fn lex(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).lex()
}

pub struct Lexer {
    chars: Vec<char>,
    position: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            position: 0,
        }
    }

    pub fn lex(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        while let Some(ch) = self.peek_char() {
            if is_whitespace(ch) {
                self.advance_char();
                continue;
            }
            tokens.push(self.lex_token()?);
        }

        Ok(tokens)
    }

    fn lex_token(&mut self) -> Result<Token, LexError> {
        match self.peek_char() {
            Some(ch) if ch == '@' || ch.is_ascii_alphabetic() => Ok(self.lex_identifier()),
            Some(ch) if ch.is_ascii_digit() => Ok(self.lex_number()),
            Some('-') if self.peek_next_char().is_some_and(|ch| ch.is_ascii_digit()) => {
                Ok(self.lex_number())
            }
            Some('\'') => self.lex_character(),
            Some('"') => self.lex_string(),
            Some(_) => Ok(self.lex_operator()),
            None => Err(LexError::new("Unexpected end of input", self.position)),
        }
    }

    fn lex_identifier(&mut self) -> Token {
        let start = self.position;
        self.advance_char(); // consume '@' or the first letter

        while let Some(ch) = self.peek_char() {
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' {
                self.advance_char();
            } else {
                break;
            }
        }

        self.token(TokenKind::Identifier, start)
    }

    fn lex_number(&mut self) -> Token {
        let start = self.position;

        if self.peek_char() == Some('-') {
            // `-0` only starts a literal when a fraction follows; otherwise the
            // minus is an operator and the zero is lexed on its own.
            if self.peek_nth_char(1) == Some('0') && !self.fraction_follows(2) {
                self.advance_char();
                return self.token(TokenKind::Operator, start);
            }
            self.advance_char();
        }

        if self.peek_char() == Some('0') {
            self.advance_char();
        } else {
            self.consume_digits();
        }

        if self.fraction_follows(0) {
            self.advance_char(); // consume '.'
            self.consume_digits();
            return self.token(TokenKind::Decimal, start);
        }

        self.token(TokenKind::Integer, start)
    }

    fn lex_character(&mut self) -> Result<Token, LexError> {
        let start = self.position;
        self.advance_char(); // consume opening quote

        match self.peek_char() {
            None => return Err(LexError::new("Unterminated character literal", self.position)),
            Some('\'') => return Err(LexError::new("Empty character literal", self.position)),
            Some('\n' | '\r') => {
                return Err(LexError::new("Invalid character literal", self.position))
            }
            Some('\\') => self.lex_escape()?,
            Some(_) => {
                self.advance_char();
            }
        }

        if self.peek_char() != Some('\'') {
            return Err(LexError::new(
                "Unterminated character literal",
                self.position,
            ));
        }
        self.advance_char(); // consume closing quote

        Ok(self.token(TokenKind::Character, start))
    }

    fn lex_string(&mut self) -> Result<Token, LexError> {
        let start = self.position;
        self.advance_char(); // consume opening quote

        loop {
            match self.peek_char() {
                Some('"') => {
                    self.advance_char();
                    return Ok(self.token(TokenKind::String, start));
                }
                Some('\\') => self.lex_escape()?,
                Some('\n' | '\r') | None => {
                    return Err(LexError::new("Unterminated string literal", self.position));
                }
                Some(_) => {
                    self.advance_char();
                }
            }
        }
    }

    fn lex_escape(&mut self) -> Result<(), LexError> {
        self.advance_char(); // consume '\'
        match self.peek_char() {
            Some('b' | 'n' | 'r' | 't' | '\'' | '"' | '\\') => {
                self.advance_char();
                Ok(())
            }
            _ => Err(LexError::new("Invalid escape sequence", self.position)),
        }
    }

    fn lex_operator(&mut self) -> Token {
        let start = self.position;
        let first = self.advance_char();
        let pair = matches!(
            (first, self.peek_char()),
            (Some('!' | '='), Some('=')) | (Some('&'), Some('&')) | (Some('|'), Some('|'))
        );
        if pair {
            self.advance_char();
        }
        self.token(TokenKind::Operator, start)
    }

    fn consume_digits(&mut self) {
        while self.peek_char().is_some_and(|ch| ch.is_ascii_digit()) {
            self.advance_char();
        }
    }

    /// True when the characters at `offset` from the cursor are `.` and a digit.
    fn fraction_follows(&self, offset: usize) -> bool {
        self.peek_nth_char(offset) == Some('.')
            && self
                .peek_nth_char(offset + 1)
                .is_some_and(|ch| ch.is_ascii_digit())
    }

    fn token(&self, kind: TokenKind, start: usize) -> Token {
        Token::new(kind, self.slice(start, self.position), start)
    }

    fn peek_char(&self) -> Option<char> {
        self.peek_nth_char(0)
    }

    fn peek_next_char(&self) -> Option<char> {
        self.peek_nth_char(1)
    }

    fn peek_nth_char(&self, offset: usize) -> Option<char> {
        self.chars.get(self.position + offset).copied()
    }

    fn advance_char(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.position += 1;
        Some(ch)
    }

    fn slice(&self, start: usize, end: usize) -> String {
        self.chars[start..end].iter().collect()
    }
}

fn is_whitespace(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\r' | '\u{8}')
}
