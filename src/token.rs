#[derive(Debug, PartialEq, Clone)]
pub struct Token {
    /// 0-based line the token starts on.
    pub line: usize,
    /// Byte offset of the first character in the source text.
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
    pub kind: Kind,
    pub value: String,
}

impl Token {
    pub fn is_punct(&self, symbol: &str) -> bool {
        self.kind == Kind::Punct && self.value == symbol
    }

    pub fn is_word(&self, word: &str) -> bool {
        self.kind == Kind::Word && self.value == word
    }

    /// Comments carry no structure and are skipped by most consumers.
    pub fn is_comment(&self) -> bool {
        matches!(self.kind, Kind::LineComment | Kind::DocComment | Kind::BlockComment)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Kind {
    // Identifiers and literals
    Word,          // identifiers and keywords
    Number,        // 12, 3.5
    StringLiteral, // "text" or 'c', quotes included

    // Everything else, one symbol per token; "::" is kept whole
    Punct,

    // Text after '#' up to the end of the line
    Directive,

    // Comments
    LineComment,  // // comment
    DocComment,   // /// comment, value holds the text after the slashes
    BlockComment, // /* comment */
}
