//! Line-oriented script preprocessor.
//!
//! Strips comments, expands `#define` macros and evaluates conditional
//! blocks. Every input line produces exactly one output line, so line numbers
//! reported by the compiler on the output still point at the original source.

use crate::error::{CompileResults, Diagnostic, ErrorCode};
use crate::macros::MacroTable;
use crate::version::Version;
use tracing::{debug, trace};

/// Prefix of the synthetic line that opens every preprocessed script.
pub const NEW_SCRIPT_MARKER: &str = "\"__NEWSCRIPTSTART_";

#[derive(Debug, Clone, Default)]
pub struct PreprocessorContext {
    pub macros: MacroTable,
    pub version: Version,
    pub max_line_length: Option<usize>,
}

impl PreprocessorContext {
    pub fn new(version: Version) -> Self {
        Self {
            version,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConditionalKind {
    IfDef,
    IfNDef,
    IfVer,
    IfNVer,
}

impl ConditionalKind {
    fn from_directive(directive: &str) -> Option<Self> {
        match directive {
            "ifdef" => Some(Self::IfDef),
            "ifndef" => Some(Self::IfNDef),
            "ifver" => Some(Self::IfVer),
            "ifnver" => Some(Self::IfNVer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct ConditionalFrame {
    condition_met: bool,
    else_seen: bool,
    parent_active: bool,
}

impl ConditionalFrame {
    fn is_active(&self) -> bool {
        self.parent_active && (self.condition_met != self.else_seen)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptChunk {
    pub name: String,
    pub text: String,
}

pub struct Preprocessor {
    context: PreprocessorContext,
    conditionals: Vec<ConditionalFrame>,
    results: CompileResults,
    in_multi_line_comment: bool,
    halted: bool,
    line_number: usize,
    script_name: String,
}

impl Preprocessor {
    pub fn new(context: PreprocessorContext) -> Self {
        Self {
            context,
            conditionals: Vec::new(),
            results: CompileResults::default(),
            in_multi_line_comment: false,
            halted: false,
            line_number: 0,
            script_name: String::new(),
        }
    }

    pub fn with_version(version: Version) -> Self {
        Self::new(PreprocessorContext::new(version))
    }

    pub fn define_macro(&mut self, name: &str, value: &str) {
        self.context.macros.define(name, value);
    }

    pub fn macros(&self) -> &MacroTable {
        &self.context.macros
    }

    pub fn results(&self) -> &CompileResults {
        &self.results
    }

    pub fn take_results(&mut self) -> CompileResults {
        std::mem::take(&mut self.results)
    }

    pub fn into_context(self) -> PreprocessorContext {
        self.context
    }

    /// Preprocesses one script. Macros defined here stay visible to later
    /// calls on the same preprocessor; conditional state does not.
    pub fn preprocess(&mut self, script: &str, script_name: &str) -> String {
        debug!(script = script_name, "preprocessing script");
        self.script_name = script_name.to_string();
        self.line_number = 0;
        self.conditionals.clear();
        self.in_multi_line_comment = false;
        self.halted = false;

        let mut output = String::with_capacity(script.len() + script_name.len() + 32);
        output.push_str(&script_marker(script_name));
        output.push('\n');

        for line in script.lines() {
            self.line_number += 1;
            let processed = if self.halted {
                String::new()
            } else {
                self.process_line(line)
            };

            if let Some(max) = self.context.max_line_length {
                if processed.chars().count() >= max {
                    self.record_error(ErrorCode::LineTooLong, format!("Line too long (max line length = {})", max));
                }
            }

            output.push_str(&processed);
            output.push('\n');
        }

        if !self.halted && !self.conditionals.is_empty() {
            self.record_error(ErrorCode::IfWithoutEndIf, "Missing #endif".to_string());
        }

        output
    }

    pub fn preprocess_scripts<'a, I>(&mut self, scripts: I) -> String
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut output = String::new();
        for (name, text) in scripts {
            output.push_str(&self.preprocess(text, name));
        }
        output
    }

    fn process_line(&mut self, line: &str) -> String {
        let stripped = self.remove_comments(line);
        if stripped.is_empty() {
            return stripped;
        }

        if stripped.starts_with('#') {
            self.process_directive(&stripped);
            return String::new();
        }

        if self.deleting_current_line() {
            return String::new();
        }

        let mut output = String::with_capacity(stripped.len());
        let mut expanding = Vec::new();
        self.expand_macros(&stripped, &mut expanding, &mut output);
        output
    }

    fn record_error(&mut self, code: ErrorCode, message: String) {
        debug!(?code, line = self.line_number, "{}", message);
        self.results
            .push(Diagnostic::error(code, message, &self.script_name, self.line_number));
    }

    fn record_warning(&mut self, code: ErrorCode, message: String) {
        self.results
            .push(Diagnostic::warning(code, message, &self.script_name, self.line_number));
    }

    fn deleting_current_line(&self) -> bool {
        self.conditionals.last().map_or(false, |frame| !frame.is_active())
    }

    fn remove_comments(&mut self, line: &str) -> String {
        let chars: Vec<char> = line.chars().collect();
        let mut output = String::with_capacity(line.len());
        let mut i = 0;

        while i < chars.len() {
            if self.in_multi_line_comment {
                if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
                    self.in_multi_line_comment = false;
                    i += 2;
                } else {
                    i += 1;
                }
                continue;
            }

            match chars[i] {
                '"' | '\'' => match find_closing_quote(&chars, i) {
                    Some(end) => {
                        output.extend(&chars[i..=end]);
                        i = end + 1;
                    }
                    None => {
                        output.extend(&chars[i..]);
                        break;
                    }
                },
                '/' if chars.get(i + 1) == Some(&'/') => break,
                '/' if chars.get(i + 1) == Some(&'*') => {
                    self.in_multi_line_comment = true;
                    i += 2;
                }
                c => {
                    output.push(c);
                    i += 1;
                }
            }
        }

        output.trim().to_string()
    }

    /// Copies `text` into `output`, replacing macro names with their values.
    /// `expanding` holds the chain of macros currently being substituted;
    /// a name already on it is copied literally.
    fn expand_macros(&self, text: &str, expanding: &mut Vec<String>, output: &mut String) {
        let chars: Vec<char> = text.chars().collect();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            if c == '"' || c == '\'' {
                let end = find_closing_quote(&chars, i).unwrap_or(chars.len() - 1);
                output.extend(&chars[i..=end]);
                i = end + 1;
                continue;
            }

            if !is_word_char(c) {
                output.push(c);
                i += 1;
                continue;
            }

            let start = i;
            while i < chars.len() && is_word_char(chars[i]) {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            let preceded_by_dot = start > 0 && chars[start - 1] == '.';

            match self.context.macros.get(&word) {
                Some(value)
                    if !preceded_by_dot
                        && !c.is_ascii_digit()
                        && !expanding.iter().any(|active| *active == word) =>
                {
                    trace!(name = %word, value, "expanding macro");
                    expanding.push(word);
                    self.expand_macros(value, expanding, output);
                    expanding.pop();
                }
                _ => output.push_str(&word),
            }
        }
    }

    fn process_directive(&mut self, line: &str) {
        let (directive, rest) = next_word(line[1..].trim_start(), false);
        let rest = rest.trim();

        if let Some(kind) = ConditionalKind::from_directive(directive) {
            self.push_conditional(kind, directive, rest);
            return;
        }

        match directive {
            "else" => self.process_else(),
            "endif" => {
                if self.conditionals.pop().is_none() {
                    self.record_error(ErrorCode::EndIfWithoutIf, "#endif has no matching #if".to_string());
                }
            }
            // inside a failed conditional block every other directive is dropped
            _ if self.deleting_current_line() => {}
            "define" => self.process_define(rest),
            "undef" => self.process_undef(rest),
            "error" => {
                self.record_error(ErrorCode::UserDefinedError, format!("User error: {}", rest));
                self.halted = true;
            }
            "region" | "endregion" | "sectionstart" | "sectionend" => {}
            _ => self.record_error(
                ErrorCode::UnknownPreprocessorDirective,
                format!("Unknown preprocessor directive '{}'", directive),
            ),
        }
    }

    fn push_conditional(&mut self, kind: ConditionalKind, directive: &str, rest: &str) {
        let argument = match kind {
            ConditionalKind::IfDef | ConditionalKind::IfNDef => next_word(rest, true).0,
            ConditionalKind::IfVer | ConditionalKind::IfNVer => rest.split_whitespace().next().unwrap_or(""),
        };

        if argument.is_empty() {
            self.record_error(ErrorCode::MacroNameMissing, format!("Expected something after '{}'", directive));
            return;
        }

        let parent_active = !self.deleting_current_line();
        let condition_met = if !parent_active {
            false
        } else {
            match kind {
                ConditionalKind::IfDef => self.context.macros.contains(argument),
                ConditionalKind::IfNDef => !self.context.macros.contains(argument),
                ConditionalKind::IfVer | ConditionalKind::IfNVer => match argument.parse::<Version>() {
                    Ok(target) => {
                        let reached = self.context.version >= target;
                        if kind == ConditionalKind::IfVer {
                            reached
                        } else {
                            !reached
                        }
                    }
                    Err(err) => {
                        self.record_error(ErrorCode::InvalidVersionNumber, err.to_string());
                        false
                    }
                },
            }
        };

        debug!(directive, argument, condition_met, parent_active, "conditional block");
        self.conditionals.push(ConditionalFrame {
            condition_met,
            else_seen: false,
            parent_active,
        });
    }

    fn process_else(&mut self) {
        match self.conditionals.last_mut() {
            Some(frame) if !frame.else_seen => frame.else_seen = true,
            Some(_) => self.record_error(ErrorCode::ElseWithoutIf, "#else already used for this #if".to_string()),
            None => self.record_error(ErrorCode::ElseWithoutIf, "#else has no matching #if".to_string()),
        }
    }

    fn process_define(&mut self, rest: &str) {
        let (name, value) = next_word(rest, false);
        if name.is_empty() {
            self.record_error(ErrorCode::MacroNameMissing, "Macro name expected".to_string());
        } else if name.starts_with(|c: char| c.is_ascii_digit()) {
            self.record_error(
                ErrorCode::MacroNameInvalid,
                format!("Macro name '{}' cannot start with a digit", name),
            );
        } else {
            let value = value.trim();
            debug!(name, value, "define");
            if self.context.macros.define(name, value).is_some() {
                self.record_warning(ErrorCode::MacroAlreadyExists, format!("Macro '{}' is already defined", name));
            }
        }
    }

    fn process_undef(&mut self, rest: &str) {
        let (name, _) = next_word(rest, false);
        if name.is_empty() {
            self.record_error(ErrorCode::MacroNameMissing, "Macro name expected".to_string());
        } else if self.context.macros.undefine(name).is_none() {
            self.record_error(ErrorCode::MacroDoesNotExist, format!("Macro '{}' is not defined", name));
        }
    }
}

pub fn script_marker(script_name: &str) -> String {
    format!("{}{}\"", NEW_SCRIPT_MARKER, script_name.replace('\\', "\\\\"))
}

/// Splits concatenated preprocessor output back into per-script chunks.
/// Text before the first marker is returned under an empty name.
pub fn split_scripts(text: &str) -> Vec<ScriptChunk> {
    let mut chunks: Vec<ScriptChunk> = Vec::new();

    for line in text.lines() {
        let name = line
            .strip_prefix(NEW_SCRIPT_MARKER)
            .and_then(|rest| rest.strip_suffix('"'));
        match name {
            Some(name) => chunks.push(ScriptChunk {
                name: name.replace("\\\\", "\\"),
                text: String::new(),
            }),
            None => {
                if chunks.is_empty() {
                    chunks.push(ScriptChunk {
                        name: String::new(),
                        text: String::new(),
                    });
                }
                if let Some(chunk) = chunks.last_mut() {
                    chunk.text.push_str(line);
                    chunk.text.push('\n');
                }
            }
        }
    }

    chunks
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn next_word(text: &str, include_dots: bool) -> (&str, &str) {
    let end = text
        .char_indices()
        .find(|&(_, c)| !(is_word_char(c) || (include_dots && c == '.')))
        .map_or(text.len(), |(i, _)| i);
    text.split_at(end)
}

fn find_closing_quote(chars: &[char], open: usize) -> Option<usize> {
    let quote = chars[open];
    let mut i = open + 1;
    while i < chars.len() {
        if chars[i] == '\\' {
            i += 2;
            continue;
        }
        if chars[i] == quote {
            return Some(i);
        }
        i += 1;
    }
    None
}
