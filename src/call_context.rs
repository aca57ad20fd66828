//! Backward scanning from a cursor position, used to find which call
//! expression the cursor sits in.
//!
//! All positions are byte offsets into the script text.

use crate::lexer::is_script_word_char;

const MEMBER_ACCESS: u8 = b'.';

fn is_newline(byte: u8) -> bool {
    byte == b'\n' || byte == b'\r'
}

fn is_word_byte(byte: u8) -> bool {
    is_script_word_char(byte as char)
}

#[derive(Debug, Clone)]
pub struct ParserState<'a> {
    script: &'a str,
    /// `(start, end)` of each comment, sorted by start, end exclusive.
    comments: Vec<(usize, usize)>,
}

impl<'a> ParserState<'a> {
    pub fn new(script: &'a str) -> Self {
        Self {
            script,
            comments: Vec::new(),
        }
    }

    pub fn with_comments(script: &'a str) -> Self {
        let mut state = Self::new(script);
        state.fill_comment_sections();
        state
    }

    pub fn script(&self) -> &'a str {
        self.script
    }

    pub fn comments(&self) -> &[(usize, usize)] {
        &self.comments
    }

    /// Scans the whole script and records the span of every comment.
    /// String literals are stepped over so `"//"` inside them is not a comment.
    pub fn fill_comment_sections(&mut self) {
        self.comments.clear();
        let bytes = self.script.as_bytes();
        let mut index = 0;
        while index < bytes.len() {
            if bytes[index] == b'"' || bytes[index] == b'\'' {
                index = skip_string_literal(bytes, index);
                continue;
            }
            let next = self.skip_comments(index);
            index = if next == index { index + 1 } else { next };
        }
    }

    fn add_comment(&mut self, section: (usize, usize)) {
        if let Err(position) = self.comments.binary_search_by_key(&section.0, |c| c.0) {
            self.comments.insert(position, section);
        }
    }

    pub fn skip_comments(&mut self, mut index: usize) -> usize {
        let bytes = self.script.as_bytes();
        if index + 1 < bytes.len() && bytes[index] == b'/' && bytes[index + 1] == b'/' {
            let start = index;
            while index < bytes.len() && !is_newline(bytes[index]) {
                index += 1;
            }
            self.add_comment((start, index));
        }
        if index + 1 < bytes.len() && bytes[index] == b'/' && bytes[index + 1] == b'*' {
            let start = index;
            index += 2;
            while index < bytes.len() {
                if bytes[index] == b'*' && bytes.get(index + 1) == Some(&b'/') {
                    index += 2;
                    break;
                }
                index += 1;
            }
            self.add_comment((start, index));
        }
        index
    }

    pub fn is_in_comment(&self, position: usize) -> bool {
        self.skip_comment_backwards(position) != position
            || self.comments.iter().any(|&(start, _)| start == position)
    }

    pub fn skip_comment_backwards(&self, back_from: usize) -> usize {
        let candidates = self.comments.partition_point(|&(start, _)| start <= back_from);
        match candidates.checked_sub(1).map(|i| self.comments[i]) {
            Some((start, end)) if back_from < end => start,
            _ => back_from,
        }
    }

    /// Position of the `(` opening the argument list that `back_from` is in.
    /// Returns `None` when a `{`, `}` or `;` is reached first.
    pub fn backtrace_to_open_bracket(&self, back_from: usize) -> Option<usize> {
        let bytes = self.script.as_bytes();
        let mut bracket_level = 1;
        let mut index = back_from.min(bytes.len()).checked_sub(1)?;

        loop {
            match bytes[index] {
                b'(' => {
                    bracket_level -= 1;
                    if bracket_level == 0 {
                        return Some(index);
                    }
                }
                b')' => bracket_level += 1,
                b'/' if index > 0 && bytes[index - 1] == b'*' => {
                    index = self.skip_comment_backwards(index - 1);
                }
                b'\n' | b'\r' => {
                    // the previous line may end inside a comment
                    while is_newline(bytes[index]) {
                        index = index.checked_sub(1)?;
                    }
                    let after_comment = self.skip_comment_backwards(index);
                    if after_comment == index {
                        index += 1;
                    } else {
                        index = after_comment;
                    }
                }
                b'"' => {
                    index = skip_string_literal_backwards(self.script, index, 0)?;
                }
                b'{' | b'}' | b';' => return None,
                _ => {}
            }
            index = index.checked_sub(1)?;
        }
    }

    /// Text from the start of the enclosing call expression (including a
    /// dotted receiver such as `player.Say`) up to `back_from`. With
    /// `outer_call` the outermost enclosing call is used. Empty when
    /// `back_from` is not inside an argument list.
    pub fn current_function_call(&self, back_from: usize, outer_call: bool) -> &'a str {
        let mut arg_list_start = None;
        let mut search_from = back_from;
        while let Some(open) = self.backtrace_to_open_bracket(search_from) {
            arg_list_start = Some(open);
            search_from = open;
            if !outer_call {
                break;
            }
        }

        match arg_list_start {
            Some(open) => {
                let expression_start = backtrace_script_symbol_composite(self.script, open);
                self.script.get(expression_start..back_from).unwrap_or("")
            }
            None => "",
        }
    }
}

fn skip_string_literal(bytes: &[u8], open: usize) -> usize {
    let quote = bytes[open];
    let mut index = open + 1;
    while index < bytes.len() && !is_newline(bytes[index]) {
        match bytes[index] {
            b'\\' => index += 2,
            b if b == quote => return index + 1,
            _ => index += 1,
        }
    }
    index.min(bytes.len())
}

pub fn skip_string_literal_backwards(script: &str, back_from: usize, script_start: usize) -> Option<usize> {
    let bytes = script.as_bytes();
    (script_start..back_from.min(bytes.len()))
        .rev()
        .find(|&i| bytes[i] == b'"')
}

fn skip_back_while(bytes: &[u8], mut index: Option<usize>, predicate: impl Fn(u8) -> bool) -> Option<usize> {
    while let Some(i) = index {
        if !predicate(bytes[i]) {
            break;
        }
        index = i.checked_sub(1);
    }
    index
}

pub fn backtrace_script_symbol(script: &str, back_from: usize) -> usize {
    let bytes = script.as_bytes();
    let index = back_from.min(bytes.len()).checked_sub(1);
    let index = skip_back_while(bytes, index, |b| b.is_ascii_whitespace());
    let index = skip_back_while(bytes, index, is_word_byte);
    index.map_or(0, |i| i + 1)
}

pub fn backtrace_script_symbol_composite(script: &str, back_from: usize) -> usize {
    let bytes = script.as_bytes();
    let mut index = back_from.min(bytes.len()).checked_sub(1);
    loop {
        index = skip_back_while(bytes, index, |b| b.is_ascii_whitespace());
        index = skip_back_while(bytes, index, is_word_byte);
        let last_valid = index;
        index = skip_back_while(bytes, index, |b| b.is_ascii_whitespace());
        match index {
            Some(i) if bytes[i] == MEMBER_ACCESS => index = i.checked_sub(1),
            _ => return last_valid.map_or(0, |i| i + 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NESTED: &str = "Outer_Call     (1, 2, InnerCall(  3, 4, \"text\"))";

    #[test]
    fn innermost_call_from_argument_position() {
        let state = ParserState::with_comments(NESTED);
        let position = NESTED.find("\"text").unwrap();
        assert_eq!(state.current_function_call(position, false), "InnerCall(  3, 4, ");
    }

    #[test]
    fn outermost_call_from_same_position() {
        let state = ParserState::with_comments(NESTED);
        let position = NESTED.find("\"text").unwrap();
        assert_eq!(
            state.current_function_call(position, true),
            "Outer_Call     (1, 2, InnerCall(  3, 4, "
        );
    }

    #[test]
    fn statement_boundaries_end_the_search() {
        let script = "Foo(1);\nBar";
        let state = ParserState::with_comments(script);
        assert_eq!(state.current_function_call(script.len(), false), "");
        assert_eq!(state.backtrace_to_open_bracket(script.len()), None);

        let script = "if (x) {\n  y = ";
        let state = ParserState::with_comments(script);
        assert_eq!(state.current_function_call(script.len(), true), "");
    }

    #[test]
    fn closed_literals_and_receivers() {
        let script = "cEgo.Say(\"hi (there\", ";
        let state = ParserState::with_comments(script);
        assert_eq!(state.current_function_call(script.len(), false), script);
    }

    #[test]
    fn comments_do_not_confuse_bracket_matching() {
        let script = "Foo(1, /* ( */ 2, // a) b\n    3, ";
        let state = ParserState::with_comments(script);
        assert_eq!(state.backtrace_to_open_bracket(script.len()), Some(3));
        assert_eq!(state.current_function_call(script.len(), false), script);
    }

    #[test]
    fn comment_sections_skip_string_literals() {
        let script = "a // x\nb /* y */ c \"// not\" '/'/*z";
        let state = ParserState::with_comments(script);
        assert_eq!(state.comments(), &[(2, 6), (9, 16), (31, 34)]);
        assert!(state.is_in_comment(4));
        assert!(state.is_in_comment(9));
        assert!(!state.is_in_comment(16));
        assert!(!state.is_in_comment(22));
        assert_eq!(state.skip_comment_backwards(12), 9);
        assert_eq!(state.skip_comment_backwards(7), 7);
    }

    #[test]
    fn symbol_backtracking() {
        let script = "x = player.Inventory . Count  ";
        assert_eq!(backtrace_script_symbol(script, script.len()), script.find("Count").unwrap());
        assert_eq!(backtrace_script_symbol_composite(script, script.len()), 4);
        assert_eq!(backtrace_script_symbol_composite("Count", 5), 0);
        assert_eq!(backtrace_script_symbol("", 0), 0);
    }

    #[test]
    fn string_literal_backwards() {
        let script = "Say(\"abc\"";
        assert_eq!(skip_string_literal_backwards(script, 8, 0), Some(4));
        assert_eq!(skip_string_literal_backwards(script, 4, 0), None);
    }
}
