use std::collections::VecDeque;
use std::fmt;

use crate::error::{LexError, LexResult};
use crate::keywords::{Function, Keyword};

/// Lexical class of a token. Keyword and function classification of words is
/// derived on demand from the lookup tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Bare word: keyword, function name or identifier.
    Word,
    /// `"name"`, `` `name` `` or `[name]`
    QuotedIdentifier,
    /// `'text'`
    String,
    Number,
    /// `X'CAFE'`
    Blob,
    /// Operators and punctuation.
    Symbol,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Original text with quotes stripped and escapes resolved.
    pub text: String,
    /// Byte offset of the token start in the input.
    pub offset: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, offset: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            offset,
        }
    }

    pub fn keyword(&self) -> Option<Keyword> {
        match self.kind {
            TokenKind::Word => Keyword::lookup(&self.text),
            _ => None,
        }
    }

    pub fn function(&self) -> Option<Function> {
        match self.kind {
            TokenKind::Word => Function::lookup(&self.text),
            _ => None,
        }
    }

    #[inline]
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.keyword() == Some(keyword)
    }

    #[inline]
    pub fn is_symbol(&self, symbol: &str) -> bool {
        self.kind == TokenKind::Symbol && self.text == symbol
    }

    /// Words that are not reserved, plus quoted identifiers.
    pub fn is_identifier(&self) -> bool {
        match self.kind {
            TokenKind::QuotedIdentifier => true,
            TokenKind::Word => self.keyword().is_none(),
            _ => false,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::String => write!(f, "'{}'", self.text),
            TokenKind::QuotedIdentifier => write!(f, "\"{}\"", self.text),
            TokenKind::Blob => write!(f, "X'{}'", self.text),
            _ => f.write_str(&self.text),
        }
    }
}

/// Destructively consumed token sequence shared by the statement and
/// expression parsers.
#[derive(Debug, Clone, Default)]
pub struct TokenQueue {
    tokens: VecDeque<Token>,
    end_offset: usize,
}

impl TokenQueue {
    pub fn new(tokens: Vec<Token>, end_offset: usize) -> Self {
        Self {
            tokens: tokens.into(),
            end_offset,
        }
    }

    /// Tokenize `input` into a fresh queue.
    pub fn from_text(input: &str) -> LexResult<Self> {
        Ok(Self::new(tokenize(input)?, input.len()))
    }

    #[inline]
    pub fn peek(&self) -> Option<&Token> {
        self.tokens.front()
    }

    #[inline]
    pub fn peek_nth(&self, n: usize) -> Option<&Token> {
        self.tokens.get(n)
    }

    #[inline]
    pub fn pop(&mut self) -> Option<Token> {
        self.tokens.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Offset reported for errors at end of input.
    pub fn end_offset(&self) -> usize {
        self.end_offset
    }

    pub fn next_is_keyword(&self, keyword: Keyword) -> bool {
        self.peek().is_some_and(|t| t.is_keyword(keyword))
    }

    pub fn next_is_symbol(&self, symbol: &str) -> bool {
        self.peek().is_some_and(|t| t.is_symbol(symbol))
    }

    /// Pop the next token if it is `keyword`.
    pub fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        if self.next_is_keyword(keyword) {
            self.pop();
            true
        } else {
            false
        }
    }

    /// Pop the next token if it is `symbol`.
    pub fn eat_symbol(&mut self, symbol: &str) -> bool {
        if self.next_is_symbol(symbol) {
            self.pop();
            true
        } else {
            false
        }
    }
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    offset: usize,
    current_char: Option<char>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let current_char = chars.first().copied();

        Self {
            input: chars,
            position: 0,
            offset: 0,
            current_char,
        }
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char {
            self.offset += ch.len_utf8();
        }
        self.position += 1;
        self.current_char = self.input.get(self.position).copied();
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.current_char {
            self.advance();
            if ch == '\n' {
                break;
            }
        }
    }

    fn skip_block_comment(&mut self) {
        self.advance(); // skip /
        self.advance(); // skip *
        while let Some(ch) = self.current_char {
            if ch == '*' && self.peek() == Some('/') {
                self.advance();
                self.advance();
                break;
            }
            self.advance();
        }
    }

    fn read_number(&mut self, start: usize) -> Token {
        let mut num_str = String::new();
        let mut has_dot = false;
        let mut has_exponent = false;

        while let Some(ch) = self.current_char {
            if ch.is_ascii_digit() {
                num_str.push(ch);
                self.advance();
            } else if ch == '.' && !has_dot && !has_exponent {
                has_dot = true;
                num_str.push(ch);
                self.advance();
            } else if (ch == 'e' || ch == 'E') && !has_exponent {
                // Only an exponent when digits follow (optionally signed)
                let next = self.peek();
                let after_sign = self.input.get(self.position + 2).copied();
                let is_exponent = match next {
                    Some(d) if d.is_ascii_digit() => true,
                    Some('+') | Some('-') => after_sign.is_some_and(|d| d.is_ascii_digit()),
                    _ => false,
                };
                if !is_exponent {
                    break;
                }
                has_exponent = true;
                num_str.push(ch);
                self.advance();
                if let Some(sign @ ('+' | '-')) = self.current_char {
                    num_str.push(sign);
                    self.advance();
                }
            } else {
                break;
            }
        }

        Token::new(TokenKind::Number, num_str, start)
    }

    fn read_quoted(&mut self, kind: TokenKind, closing: char, start: usize) -> LexResult<Token> {
        self.advance(); // skip opening quote
        let mut text = String::new();

        while let Some(ch) = self.current_char {
            if ch == closing {
                // A doubled delimiter is an escaped delimiter
                if self.peek() == Some(closing) && closing != ']' {
                    text.push(closing);
                    self.advance();
                    self.advance();
                } else {
                    self.advance();
                    return Ok(Token::new(kind, text, start));
                }
            } else {
                text.push(ch);
                self.advance();
            }
        }

        let kind = match kind {
            TokenKind::String => "string literal",
            TokenKind::Blob => "blob literal",
            _ => "quoted identifier",
        };
        Err(LexError::UnterminatedLiteral {
            kind,
            offset: start,
        })
    }

    fn read_word(&mut self, start: usize) -> Token {
        let mut word = String::new();

        while let Some(ch) = self.current_char {
            if ch.is_alphanumeric() || ch == '_' || ch == '$' {
                word.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        Token::new(TokenKind::Word, word, start)
    }

    fn read_symbol(&mut self, start: usize) -> Token {
        let ch = self.current_char.unwrap_or_default();
        let next = self.peek();
        let two_char = match (ch, next) {
            ('<', Some('=')) => Some("<="),
            ('<', Some('>')) => Some("<>"),
            ('>', Some('=')) => Some(">="),
            ('!', Some('=')) => Some("!="),
            ('=', Some('=')) => Some("=="),
            ('|', Some('|')) => Some("||"),
            _ => None,
        };

        if let Some(symbol) = two_char {
            self.advance();
            self.advance();
            return Token::new(TokenKind::Symbol, symbol, start);
        }

        self.advance();
        Token::new(TokenKind::Symbol, ch.to_string(), start)
    }

    pub fn next_token(&mut self) -> LexResult<Option<Token>> {
        loop {
            self.skip_whitespace();

            match self.current_char {
                None => return Ok(None),
                Some('-') if self.peek() == Some('-') => {
                    self.skip_line_comment();
                    continue;
                }
                Some('/') if self.peek() == Some('*') => {
                    self.skip_block_comment();
                    continue;
                }
                _ => break,
            }
        }

        let start = self.offset;
        let token = match self.current_char {
            None => return Ok(None),
            Some(ch) if ch.is_ascii_digit() => self.read_number(start),
            Some('.') if self.peek().is_some_and(|c| c.is_ascii_digit()) => {
                self.read_number(start)
            }
            Some('x') | Some('X') if self.peek() == Some('\'') => {
                self.advance(); // skip X
                let mut token = self.read_quoted(TokenKind::Blob, '\'', start)?;
                token.offset = start;
                token
            }
            Some('\'') => self.read_quoted(TokenKind::String, '\'', start)?,
            Some('"') => self.read_quoted(TokenKind::QuotedIdentifier, '"', start)?,
            Some('`') => self.read_quoted(TokenKind::QuotedIdentifier, '`', start)?,
            Some('[') => self.read_quoted(TokenKind::QuotedIdentifier, ']', start)?,
            Some(ch) if ch.is_alphabetic() || ch == '_' => self.read_word(start),
            Some(_) => self.read_symbol(start),
        };

        Ok(Some(token))
    }

    pub fn tokenize(&mut self) -> LexResult<Vec<Token>> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }
}

/// Split `input` into tokens.
pub fn tokenize(input: &str) -> LexResult<Vec<Token>> {
    Lexer::new(input).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(input: &str) -> Vec<String> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| t.text)
            .collect()
    }

    #[test]
    fn test_select_keywords() {
        let tokens = tokenize("SELECT FROM WHERE").unwrap();
        assert_eq!(tokens[0].keyword(), Some(Keyword::Select));
        assert_eq!(tokens[1].keyword(), Some(Keyword::From));
        assert_eq!(tokens[2].keyword(), Some(Keyword::Where));
    }

    #[test]
    fn test_case_insensitive_but_preserved() {
        let tokens = tokenize("select Select userName").unwrap();
        assert_eq!(tokens[0].keyword(), Some(Keyword::Select));
        assert_eq!(tokens[1].keyword(), Some(Keyword::Select));
        assert_eq!(tokens[1].text, "Select");
        assert!(tokens[2].is_identifier());
        assert_eq!(tokens[2].text, "userName");
    }

    #[test]
    fn test_function_classification() {
        let tokens = tokenize("UPPER(name)").unwrap();
        assert_eq!(tokens[0].function(), Some(Function::Upper));
        assert!(tokens[1].is_symbol("("));
        assert_eq!(tokens[2].function(), None);
    }

    #[test]
    fn test_strings() {
        let tokens = tokenize("'hello' 'it''s'").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].text, "hello");
        assert_eq!(tokens[1].text, "it's");
    }

    #[test]
    fn test_quoted_identifiers() {
        let tokens = tokenize("\"first name\" `order` [my table]").unwrap();
        assert!(tokens.iter().all(|t| t.kind == TokenKind::QuotedIdentifier));
        assert_eq!(tokens[0].text, "first name");
        assert_eq!(tokens[1].text, "order");
        assert!(tokens[1].is_identifier());
        assert_eq!(tokens[2].text, "my table");
    }

    #[test]
    fn test_numbers() {
        assert_eq!(texts("123 3.14 .5 1e3 2.5E-2"), vec!["123", "3.14", ".5", "1e3", "2.5E-2"]);
        let tokens = tokenize("12abc").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[1].kind, TokenKind::Word);
    }

    #[test]
    fn test_blob_literal() {
        let tokens = tokenize("X'CAFE' x").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Blob);
        assert_eq!(tokens[0].text, "CAFE");
        assert_eq!(tokens[1].kind, TokenKind::Word);
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            texts("= == != <> < <= > >= || + - * / %"),
            vec!["=", "==", "!=", "<>", "<", "<=", ">", ">=", "||", "+", "-", "*", "/", "%"]
        );
    }

    #[test]
    fn test_offsets() {
        let tokens = tokenize("a = 'é' AND b").unwrap();
        assert_eq!(tokens[0].offset, 0);
        assert_eq!(tokens[2].offset, 4);
        // 'é' is two bytes in UTF-8
        assert_eq!(tokens[3].offset, 9);
    }

    #[test]
    fn test_comments() {
        assert_eq!(
            texts("SELECT -- comment\n* /* block */ FROM users"),
            vec!["SELECT", "*", "FROM", "users"]
        );
    }

    #[test]
    fn test_unterminated_literals() {
        assert_eq!(
            tokenize("name = 'abc"),
            Err(LexError::UnterminatedLiteral {
                kind: "string literal",
                offset: 7
            })
        );
        assert!(matches!(
            tokenize("\"abc"),
            Err(LexError::UnterminatedLiteral { kind: "quoted identifier", .. })
        ));
    }

    #[test]
    fn test_queue_consumption() {
        let mut queue = TokenQueue::from_text("a, b").unwrap();
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.peek().map(|t| t.text.as_str()), Some("a"));
        assert!(queue.peek_nth(1).unwrap().is_symbol(","));
        queue.pop();
        assert!(queue.eat_symbol(","));
        assert!(!queue.eat_symbol(","));
        assert_eq!(queue.pop().map(|t| t.text), Some("b".to_string()));
        assert!(queue.is_empty());
        assert_eq!(queue.end_offset(), 4);
    }
}
