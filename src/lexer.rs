use std::iter::Peekable;
use std::str::CharIndices;

use crate::token::{Kind, Token};

/// ASCII letters, digits and underscore; the characters of a script identifier.
pub fn is_script_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Splits script text into tokens. Lexing never fails: anything that is not
/// a word, number, literal, comment or directive becomes a `Punct` token.
pub struct Lexer<'a> {
    source_code: &'a str,
    iter: Peekable<CharIndices<'a>>,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            source_code: input,
            iter: input.char_indices().peekable(),
            line: 0,
        }
    }

    fn create_token(&self, kind: Kind, line: usize, start: usize, end: usize) -> Token {
        Token {
            line,
            start,
            end,
            kind,
            value: self.source_code[start..end].to_string(),
        }
    }

    /// Offset of the next unread character, or the end of the input.
    fn offset(&mut self) -> usize {
        self.iter.peek().map_or(self.source_code.len(), |&(i, _)| i)
    }

    fn skip_to_line_end(&mut self) -> usize {
        while let Some(&(i, c)) = self.iter.peek() {
            if c == '\n' || c == '\r' {
                return i;
            }
            self.iter.next();
        }
        self.source_code.len()
    }

    fn consume_while(&mut self, predicate: impl Fn(char) -> bool) -> usize {
        while self.iter.next_if(|&(_, c)| predicate(c)).is_some() {}
        self.offset()
    }

    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        while let Some((start, ch)) = self.iter.next() {
            let line = self.line;

            match ch {
                '\n' => {
                    self.line += 1;
                    continue;
                }
                ch if ch.is_whitespace() => continue,
                '#' => {
                    let end = self.skip_to_line_end();
                    let mut token = self.create_token(Kind::Directive, line, start, end);
                    token.value.remove(0);
                    tokens.push(token);
                }
                '/' if matches!(self.iter.peek(), Some(&(_, '/'))) => {
                    let end = self.skip_to_line_end();
                    let text = &self.source_code[start..end];
                    let token = match text.strip_prefix("///") {
                        Some(doc) => Token {
                            line,
                            start,
                            end,
                            kind: Kind::DocComment,
                            value: doc.trim().to_string(),
                        },
                        None => self.create_token(Kind::LineComment, line, start, end),
                    };
                    tokens.push(token);
                }
                '/' if matches!(self.iter.peek(), Some(&(_, '*'))) => {
                    self.iter.next();
                    let mut prev_char = '\0';
                    let mut end = self.source_code.len();
                    while let Some((i, c)) = self.iter.next() {
                        if c == '\n' {
                            self.line += 1;
                        }
                        if prev_char == '*' && c == '/' {
                            end = i + 1;
                            break;
                        }
                        prev_char = c;
                    }
                    tokens.push(self.create_token(Kind::BlockComment, line, start, end));
                }
                '"' | '\'' => {
                    let mut end = None;
                    while let Some(&(i, c)) = self.iter.peek() {
                        if c == '\n' || c == '\r' {
                            break;
                        }
                        self.iter.next();
                        if c == '\\' {
                            self.iter.next_if(|&(_, c)| c != '\n' && c != '\r');
                        } else if c == ch {
                            end = Some(i + 1);
                            break;
                        }
                    }
                    // unterminated literals stop at the end of the line
                    let end = end.unwrap_or_else(|| self.offset());
                    tokens.push(self.create_token(Kind::StringLiteral, line, start, end));
                }
                ':' if matches!(self.iter.peek(), Some(&(_, ':'))) => {
                    self.iter.next();
                    tokens.push(self.create_token(Kind::Punct, line, start, start + 2));
                }
                c if c.is_ascii_digit() => {
                    let end = self.consume_while(|s| is_script_word_char(s) || s == '.');
                    tokens.push(self.create_token(Kind::Number, line, start, end));
                }
                c if is_script_word_char(c) => {
                    let end = self.consume_while(is_script_word_char);
                    tokens.push(self.create_token(Kind::Word, line, start, end));
                }
                c => {
                    tokens.push(self.create_token(Kind::Punct, line, start, start + c.len_utf8()));
                }
            }
        }

        tokens
    }
}
