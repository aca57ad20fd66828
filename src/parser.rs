use crate::autocomplete::CancellationToken;
use crate::lexer::{is_script_word_char, Lexer};
use crate::symbols::{
    AutoCompleteData, EnumValue, Guard, ScriptDefine, ScriptEnum, ScriptFunction, ScriptStruct, ScriptVariable,
};
use crate::token::{Kind, Token};
use tracing::{debug, trace};

const AUTO_COMPLETE_IGNORE: &str = "$AUTOCOMPLETEIGNORE$";
const AUTO_COMPLETE_STATIC_ONLY: &str = "$AUTOCOMPLETESTATICONLY$";
const AUTO_COMPLETE_NO_INHERIT: &str = "$AUTOCOMPLETENOINHERIT$";

const FIXED_ARRAY_MARK: &str = "[N]";
const DYNAMIC_ARRAY_MARK: &str = "[]";

/// Description given to the `Length` member of dynamic array pseudo structs.
pub const DYNAMIC_ARRAY_LENGTH_DESCRIPTION: &str = "Returns length of this dynamic array.";

pub(crate) fn is_identifier(word: &str) -> bool {
    word.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') && word.chars().all(is_script_word_char)
}

/// Words seen since the last declaration boundary, most recent last.
#[derive(Debug, Clone, Default)]
struct PreviousWords {
    words: Vec<String>,
}

impl PreviousWords {
    fn add(&mut self, word: &str) {
        self.words.push(word.to_string());
    }

    /// `nth_back(0)` is the last word; missing words read as empty.
    fn nth_back(&self, n: usize) -> &str {
        self.words
            .len()
            .checked_sub(n + 1)
            .map_or("", |i| self.words[i].as_str())
    }

    fn last(&self) -> &str {
        self.nth_back(0)
    }

    fn previous(&self) -> &str {
        self.nth_back(1)
    }

    fn previous2(&self) -> &str {
        self.nth_back(2)
    }

    fn undo(&mut self) {
        self.words.pop();
    }

    fn clear(&mut self) {
        self.words.clear();
    }

    fn contains(&self, word: &str) -> bool {
        self.words.iter().any(|w| w == word)
    }

    /// Drops trailing array markers and the word before them, returning
    /// how many dimensions were removed.
    fn revert_array_dimensions(&mut self) -> usize {
        let mut dims = 0;
        loop {
            self.undo();
            dims += 1;
            if self.last() != FIXED_ARRAY_MARK && self.last() != DYNAMIC_ARRAY_MARK {
                return dims;
            }
        }
    }
}

#[derive(Debug, Clone)]
enum GuardFrame {
    IfDef(String),
    IfNDef(String),
    /// `#ifver` and malformed conditions; matched by `#endif` but not recorded.
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionTarget {
    Global,
    CurrentStruct,
    LocalStruct(usize),
}

/// Single pass over a script's tokens that collects its declarations.
pub(crate) struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    current: usize,
    words: PreviousWords,
    guards: Vec<GuardFrame>,
    previous_comment: Option<String>,
    inside_enum: Option<ScriptEnum>,
    inside_struct: Option<ScriptStruct>,
    last_function: Option<(FunctionTarget, usize)>,
    imported_structs: Vec<&'a ScriptStruct>,
    data: AutoCompleteData,
    cancel: Option<&'a CancellationToken>,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(source: &'a str, imported_structs: Vec<&'a ScriptStruct>) -> Self {
        Self {
            source,
            tokens: Lexer::new(source).tokenize(),
            current: 0,
            words: PreviousWords::default(),
            guards: Vec::new(),
            previous_comment: None,
            inside_enum: None,
            inside_struct: None,
            last_function: None,
            imported_structs,
            data: AutoCompleteData::default(),
            cancel: None,
        }
    }

    pub(crate) fn with_cancellation(mut self, cancel: &'a CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn at(&self) -> Option<&Token> {
        self.tokens.get(self.current)
    }

    fn next_token(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.current).cloned();
        if token.is_some() {
            self.current += 1;
        }
        token
    }

    fn peek_significant(&self) -> Option<&Token> {
        self.tokens[self.current.min(self.tokens.len())..]
            .iter()
            .find(|t| !t.is_comment())
    }

    fn next_significant(&mut self) -> Option<Token> {
        while let Some(token) = self.next_token() {
            if !token.is_comment() {
                return Some(token);
            }
        }
        None
    }

    /// Returns `None` when cancelled.
    pub(crate) fn parse(mut self) -> Option<AutoCompleteData> {
        while let Some(token) = self.next_token() {
            if self.cancel.map_or(false, CancellationToken::is_cancelled) {
                debug!(offset = token.start, "autocomplete parse cancelled");
                return None;
            }

            match token.kind {
                Kind::LineComment | Kind::BlockComment => {}
                Kind::DocComment => self.previous_comment = Some(token.value),
                Kind::Directive => self.process_directive(&token),
                _ => self.process_token(token),
            }
        }

        if let Some(open) = self.inside_struct.as_ref().map(|s| s.name.clone()) {
            debug!(name = %open, "struct not closed before end of script");
        }

        let mut data = self.data;
        let mut known: Vec<String> = self
            .imported_structs
            .iter()
            .map(|s| s.name.clone())
            .chain(data.structs.iter().map(|s| s.name.clone()))
            .collect();
        generate_dynamic_array_structs(&mut data, &mut known);

        debug!(
            variables = data.variables.len(),
            functions = data.functions.len(),
            enums = data.enums.len(),
            structs = data.structs.len(),
            defines = data.defines.len(),
            "autocomplete cache built"
        );
        Some(data)
    }

    fn current_guard(&self) -> Guard {
        for frame in self.guards.iter().rev() {
            match frame {
                GuardFrame::IfDef(name) => {
                    return Guard {
                        if_def_only: Some(name.clone()),
                        if_ndef_only: None,
                    }
                }
                GuardFrame::IfNDef(name) => {
                    return Guard {
                        if_def_only: None,
                        if_ndef_only: Some(name.clone()),
                    }
                }
                GuardFrame::Neutral => continue,
            }
        }
        Guard::default()
    }

    /// Whether the source line holding `offset` contains `marker` after it.
    fn line_has_marker(&self, offset: usize, marker: &str) -> bool {
        self.source
            .get(offset..)
            .and_then(|rest| rest.split(|c| c == '\n' || c == '\r').next())
            .map_or(false, |line| line.contains(marker))
    }

    fn process_directive(&mut self, token: &Token) {
        let (directive, rest) = split_word(token.value.trim_start());
        let (name, _) = split_word(rest.trim_start());
        let valid_name = name.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_');

        match directive {
            "define" => {
                if valid_name && !self.line_has_marker(token.start, AUTO_COMPLETE_IGNORE) {
                    let define = ScriptDefine {
                        name: name.to_string(),
                        guard: self.current_guard(),
                        start: token.start,
                    };
                    self.data.defines.push(define);
                }
            }
            "undef" => {
                if let Some(index) = self.data.defines.iter().position(|d| d.name == name) {
                    self.data.defines.remove(index);
                }
            }
            "ifdef" if valid_name => self.guards.push(GuardFrame::IfDef(name.to_string())),
            "ifndef" if valid_name => self.guards.push(GuardFrame::IfNDef(name.to_string())),
            "ifdef" | "ifndef" | "ifver" | "ifnver" => self.guards.push(GuardFrame::Neutral),
            "else" => {
                if let Some(frame) = self.guards.last_mut() {
                    *frame = match std::mem::replace(frame, GuardFrame::Neutral) {
                        GuardFrame::IfDef(name) => GuardFrame::IfNDef(name),
                        GuardFrame::IfNDef(name) => GuardFrame::IfDef(name),
                        GuardFrame::Neutral => GuardFrame::Neutral,
                    };
                }
            }
            "endif" => {
                self.guards.pop();
            }
            _ => {}
        }

        self.previous_comment = None;
        self.words.clear();
    }

    fn process_token(&mut self, token: Token) {
        if token.is_punct("{") {
            match self.words.previous() {
                "enum" => {
                    self.inside_enum = Some(ScriptEnum {
                        name: self.words.last().to_string(),
                        values: Vec::new(),
                        guard: self.current_guard(),
                        start: token.start,
                        description: self.previous_comment.take(),
                    });
                }
                "extends" => self.begin_inherited_struct(token.start),
                "struct" => {
                    self.inside_struct = Some(ScriptStruct {
                        name: self.words.last().to_string(),
                        full_definition: true,
                        guard: self.current_guard(),
                        start: token.start,
                        description: self.previous_comment.take(),
                        ..ScriptStruct::default()
                    });
                }
                _ => {
                    self.words.clear();
                    self.previous_comment = None;
                    let end = self.skip_until_matching("{", "}");
                    if let Some((target, index)) = self.last_function {
                        if let Some(function) = self.functions_mut(target).and_then(|f| f.get_mut(index)) {
                            if function.ends_at.is_none() {
                                function.ends_at = Some(end);
                            }
                        }
                    }
                    return;
                }
            }
        }

        if token.kind == Kind::Punct {
            match token.value.as_str() {
                "(" => {
                    self.process_function(&token);
                    return;
                }
                "[" => {
                    if self.peek_significant().map_or(false, |t| t.is_punct("]")) {
                        self.next_significant();
                        self.words.add(DYNAMIC_ARRAY_MARK);
                    } else {
                        self.skip_until_matching("[", "]");
                        self.words.add(FIXED_ARRAY_MARK);
                    }
                    return;
                }
                "=" | ";" | "," => {
                    self.process_declaration_end(&token);
                    return;
                }
                "}" if self.inside_enum.is_some() => {
                    if self.words.last() != "{" {
                        self.add_enum_value(token.start);
                    }
                    if let Some(finished) = self.inside_enum.take() {
                        trace!(name = %finished.name, values = finished.values.len(), "enum");
                        self.data.enums.push(finished);
                    }
                    self.previous_comment = None;
                    self.words.clear();
                    return;
                }
                "}" if self.inside_struct.is_some() => {
                    if let Some(finished) = self.inside_struct.take() {
                        trace!(name = %finished.name, "struct");
                        self.data.structs.push(finished);
                        if let Some((FunctionTarget::CurrentStruct, index)) = self.last_function {
                            let local = FunctionTarget::LocalStruct(self.data.structs.len() - 1);
                            self.last_function = Some((local, index));
                        }
                    }
                    self.previous_comment = None;
                    self.words.clear();
                    return;
                }
                _ => {}
            }
        }

        self.words.add(&token.value);
    }

    /// Consumes tokens up to the bracket closing an already opened one and
    /// returns the offset just past it.
    fn skip_until_matching(&mut self, open: &str, close: &str) -> usize {
        let mut depth = 1;
        while let Some(token) = self.next_token() {
            if token.is_punct(open) {
                depth += 1;
            } else if token.is_punct(close) {
                depth -= 1;
                if depth == 0 {
                    return token.end;
                }
            }
        }
        self.source.len()
    }

    /// Skips an initializer and returns the `;` or `,` that ended it.
    fn skip_initializer(&mut self) -> String {
        let mut depth = 0usize;
        while let Some(token) = self.next_significant() {
            if token.kind != Kind::Punct {
                continue;
            }
            match token.value.as_str() {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => depth = depth.saturating_sub(1),
                ";" | "," if depth == 0 => return token.value,
                _ => {}
            }
        }
        String::new()
    }

    fn current_target(&self) -> FunctionTarget {
        if self.inside_struct.is_some() {
            FunctionTarget::CurrentStruct
        } else {
            FunctionTarget::Global
        }
    }

    fn functions_mut(&mut self, target: FunctionTarget) -> Option<&mut Vec<ScriptFunction>> {
        match target {
            FunctionTarget::Global => Some(&mut self.data.functions),
            FunctionTarget::CurrentStruct => self.inside_struct.as_mut().map(|s| &mut s.functions),
            FunctionTarget::LocalStruct(index) => self.data.structs.get_mut(index).map(|s| &mut s.functions),
        }
    }

    fn variables_mut(&mut self) -> &mut Vec<ScriptVariable> {
        match self.inside_struct.as_mut() {
            Some(current) => &mut current.variables,
            None => &mut self.data.variables,
        }
    }

    fn begin_inherited_struct(&mut self, start: usize) {
        let name = self.words.previous2().to_string();
        let base_name = self.words.last().to_string();
        let mut inherited = ScriptStruct {
            name,
            parent_type: Some(base_name.clone()),
            full_definition: true,
            guard: self.current_guard(),
            start,
            description: self.previous_comment.take(),
            ..ScriptStruct::default()
        };

        let base = self
            .imported_structs
            .iter()
            .copied()
            .chain(self.data.structs.iter())
            .find(|s| s.name == base_name);
        match base {
            Some(base) => {
                inherited
                    .functions
                    .extend(base.functions.iter().filter(|f| !f.no_inherit).cloned());
                inherited
                    .variables
                    .extend(base.variables.iter().filter(|v| !v.no_inherit).cloned());
            }
            None => debug!(name = %inherited.name, base = %base_name, "base struct not found"),
        }

        self.inside_struct = Some(inherited);
    }

    /// Extender functions attach to a struct of this script, created on demand.
    fn extender_target(&mut self, struct_name: &str) -> FunctionTarget {
        if let Some(index) = self.data.structs.iter().position(|s| s.name == struct_name) {
            return FunctionTarget::LocalStruct(index);
        }
        self.data.structs.push(ScriptStruct::new(struct_name));
        FunctionTarget::LocalStruct(self.data.structs.len() - 1)
    }

    fn process_function(&mut self, lparen: &Token) {
        let next = self.peek_significant();
        let is_static_extender = next.map_or(false, |t| t.is_word("static"));
        let is_extender = is_static_extender || next.map_or(false, |t| t.is_word("this"));

        let mut target = self.current_target();
        let mut params_start = lparen.end;
        if is_extender {
            self.next_significant();
            let struct_name = self.next_significant().map(|t| t.value).unwrap_or_default();
            while let Some(token) = self.at() {
                if token.is_punct(")") {
                    break;
                }
                let is_comma = token.is_punct(",");
                self.current += 1;
                if is_comma {
                    break;
                }
            }
            params_start = self.at().map_or(self.source.len(), |t| t.start);
            if is_identifier(&struct_name) {
                target = self.extender_target(&struct_name);
            }
        }

        if let Some(index) = self.add_function_declaration(target, lparen, params_start, is_extender, is_static_extender) {
            self.last_function = Some((target, index));
        }
        self.words.clear();
    }

    fn add_function_declaration(
        &mut self,
        target: FunctionTarget,
        lparen: &Token,
        params_start: usize,
        is_extender: bool,
        is_static_extender: bool,
    ) -> Option<usize> {
        let last = self.words.last();
        let previous = self.words.previous();
        if !is_identifier(last) || previous.is_empty() {
            return None;
        }
        if self.line_has_marker(lparen.start, AUTO_COMPLETE_IGNORE) {
            return None;
        }

        let mut name = last.to_string();
        let mut return_type = previous.to_string();
        let mut is_pointer = false;
        if return_type == "::" {
            name = format!("{}::{}", self.words.previous2(), name);
            return_type = match self.words.nth_back(3) {
                "" => "unknown".to_string(),
                word => word.to_string(),
            };
        }
        if return_type == "*" {
            is_pointer = true;
            return_type = self.words.previous2().to_string();
        }
        if return_type == DYNAMIC_ARRAY_MARK {
            return_type = format!("{}[]", self.words.previous2());
        }

        let rparen = self.tokens[self.current..].iter().position(|t| t.is_punct(")"))? + self.current;
        let params_end = self.tokens[rparen].start;
        let param_list = self
            .source
            .get(params_start.min(params_end)..params_end)
            .unwrap_or("")
            .trim()
            .to_string();
        self.current = rparen + 1;

        let function = ScriptFunction {
            name,
            return_type,
            param_list,
            is_pointer,
            is_static: is_static_extender || self.words.contains("static"),
            is_static_only: is_static_extender || self.line_has_marker(lparen.start, AUTO_COMPLETE_STATIC_ONLY),
            is_protected: self.words.contains("protected"),
            is_extender_method: is_extender,
            no_inherit: self.line_has_marker(lparen.start, AUTO_COMPLETE_NO_INHERIT),
            guard: self.current_guard(),
            start: lparen.start,
            ends_at: None,
            description: self.previous_comment.take(),
        };
        trace!(name = %function.name, params = %function.param_list, "function");

        let functions = self.functions_mut(target)?;
        functions.push(function);
        Some(functions.len() - 1)
    }

    fn process_declaration_end(&mut self, token: &Token) {
        if self.inside_enum.is_some() {
            self.add_enum_value(token.start);
            if token.is_punct("=") {
                self.next_significant();
            }
            self.previous_comment = None;
            self.words.clear();
            return;
        }

        self.add_variable_declaration(token.start);
        self.previous_comment = None;
        let terminator = if token.is_punct("=") {
            self.skip_initializer()
        } else {
            token.value.clone()
        };

        if terminator == "," {
            // keep the type so "int x, y;" declares y as well
            while self.words.last() == FIXED_ARRAY_MARK || self.words.last() == DYNAMIC_ARRAY_MARK {
                self.words.undo();
            }
            self.words.undo();
            return;
        }
        self.words.clear();
    }

    fn add_enum_value(&mut self, offset: usize) {
        let name = self.words.last().to_string();
        if !is_identifier(&name) || self.line_has_marker(offset, AUTO_COMPLETE_IGNORE) {
            return;
        }
        let guard = self.current_guard();
        if let Some(current) = self.inside_enum.as_mut() {
            current.values.push(EnumValue {
                name,
                enum_type: current.name.clone(),
                guard,
                start: offset,
            });
        }
    }

    fn add_variable_declaration(&mut self, offset: usize) {
        let mut words = self.words.clone();
        if words.last().is_empty() || words.previous().is_empty() {
            return;
        }
        if self.line_has_marker(offset, AUTO_COMPLETE_IGNORE) {
            return;
        }

        let is_attribute = words.contains("attribute");
        let mut is_array = false;
        let mut is_dynamic_array = false;
        let mut is_pointer = false;
        let mut array_dimensions = 0;

        if words.last() == FIXED_ARRAY_MARK {
            is_array = true;
            array_dimensions = words.revert_array_dimensions();
        } else if words.last() == DYNAMIC_ARRAY_MARK {
            array_dimensions = words.revert_array_dimensions();
            if is_attribute {
                // indexed attribute, not an array value
                array_dimensions = 0;
            } else {
                is_array = true;
                is_dynamic_array = true;
            }
        }
        let name = words.last().to_string();

        words.undo();
        let mut var_type = words.last().to_string();
        if var_type == DYNAMIC_ARRAY_MARK {
            let dims = words.revert_array_dimensions();
            var_type = words.last().to_string();
            if is_attribute {
                is_array = true;
                is_dynamic_array = true;
                array_dimensions = dims;
            }
        }
        if var_type == "*" {
            is_pointer = true;
            words.undo();
            var_type = words.last().to_string();
        }

        // "struct GUI;" is a forward declaration
        if var_type == "struct" || !is_identifier(&name) || !is_identifier(&var_type) {
            return;
        }

        let variable = ScriptVariable {
            name,
            var_type,
            is_array,
            is_dynamic_array,
            array_dimensions,
            is_pointer,
            is_static: words.contains("static"),
            is_static_only: self.line_has_marker(offset, AUTO_COMPLETE_STATIC_ONLY),
            is_protected: words.contains("protected"),
            is_readonly: words.contains("readonly"),
            no_inherit: self.line_has_marker(offset, AUTO_COMPLETE_NO_INHERIT),
            guard: self.current_guard(),
            start: offset,
            description: self.previous_comment.take(),
        };
        trace!(name = %variable.name, var_type = %variable.var_type, "variable");
        self.variables_mut().push(variable);
    }
}

fn split_word(text: &str) -> (&str, &str) {
    let end = text
        .char_indices()
        .find(|&(_, c)| !is_script_word_char(c))
        .map_or(text.len(), |(i, _)| i);
    text.split_at(end)
}

fn dynamic_array_struct(name: &str, base_type: &str) -> ScriptStruct {
    let length = ScriptVariable {
        is_readonly: true,
        description: Some(DYNAMIC_ARRAY_LENGTH_DESCRIPTION.to_string()),
        ..ScriptVariable::new("Length", "int", 0)
    };
    ScriptStruct {
        variables: vec![length],
        base_type: Some(base_type.to_string()),
        full_definition: true,
        ..ScriptStruct::new(name)
    }
}

/// Gives every dynamic array variable a pseudo struct per dimension
/// (`int[]`, `int[][]`, ...) and rewrites its type to the innermost one.
/// `known` lists struct names that already exist and must not be duplicated.
pub(crate) fn generate_dynamic_array_structs_for(
    variables: &mut [ScriptVariable],
    structs: &mut Vec<ScriptStruct>,
    known: &mut Vec<String>,
) {
    for variable in variables.iter_mut().filter(|v| v.is_dynamic_array) {
        let mut base_type = variable.var_type.clone();
        let mut name = if variable.is_pointer {
            format!("{}*", base_type)
        } else {
            base_type.clone()
        };

        for _ in 0..variable.array_dimensions {
            name.push_str(DYNAMIC_ARRAY_MARK);
            if !known.contains(&name) {
                structs.push(dynamic_array_struct(&name, &base_type));
                known.push(name.clone());
            }
            base_type = name.clone();
        }
        variable.var_type = name;
    }
}

fn generate_dynamic_array_structs(data: &mut AutoCompleteData, known: &mut Vec<String>) {
    let declared = data.structs.len();
    generate_dynamic_array_structs_for(&mut data.variables, &mut data.structs, known);
    for index in 0..declared {
        let mut members = std::mem::take(&mut data.structs[index].variables);
        generate_dynamic_array_structs_for(&mut members, &mut data.structs, known);
        data.structs[index].variables = members;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> AutoCompleteData {
        Parser::new(source, Vec::new()).parse().unwrap()
    }

    #[test]
    fn handles_spaces_tabs_and_comments() {
        assert_eq!(parse("int a = 5;").variables.len(), 1);
        assert_eq!(parse("\tint\tb\t=\t10\t;").variables.len(), 1);
        assert_eq!(parse("\tint\t\tvarName\t=\t30\t;\n").variables.len(), 1);

        let data = parse("// int is_a_comment = 1\r\nint a = 5;");
        assert_eq!(data.variables.len(), 1);
        assert!(data.find_variable("a").is_some());

        let data = parse("// int is_a_comment = 1\r\nint\t/* int comment = 1 */ b =\t 15\t;");
        assert_eq!(data.variables.len(), 1);
        assert!(data.find_variable("b").is_some());

        let data = parse("int a = 5;\r\n\r\n\r\nstring b = \"text\";\r\n");
        assert_eq!(data.variables.len(), 2);
        assert!(data.find_variable("b").is_some());
    }

    #[test]
    fn fixed_arrays_keep_base_type() {
        let data = parse("\nint staticArrayOfInts[100];\nint multiDimArray[10][20];\n");
        assert_eq!(data.variables.len(), 2);
        for variable in &data.variables {
            assert_eq!(variable.var_type, "int");
            assert!(variable.is_array);
            assert!(!variable.is_dynamic_array);
            assert!(!variable.is_pointer);
        }
        assert_eq!(data.variables[1].array_dimensions, 2);
        assert!(data.structs.is_empty());
    }

    #[test]
    fn dynamic_arrays_generate_pseudo_structs() {
        let data = parse(
            "\nint arrOfInts[] = new int[100];\nint arrOfInts2[] = new int[100];\nCharacter* arrOfCharacters[] = new Character[100];\n",
        );
        assert_eq!(data.variables.len(), 3);
        assert_eq!(data.structs.len(), 2);

        let ints = data.find_variable("arrOfInts").unwrap();
        assert_eq!(ints.var_type, "int[]");
        assert!(ints.is_array && ints.is_dynamic_array && !ints.is_pointer);
        assert_eq!(data.find_variable("arrOfInts2").unwrap().var_type, "int[]");

        let characters = data.find_variable("arrOfCharacters").unwrap();
        assert_eq!(characters.var_type, "Character*[]");
        assert!(characters.is_pointer);

        let int_array = data.find_struct("int[]").unwrap();
        assert_eq!(int_array.base_type.as_deref(), Some("int"));
        assert_eq!(int_array.variables.len(), 1);
        let length = int_array.find_member_variable("Length").unwrap();
        assert_eq!(length.var_type, "int");
        assert_eq!(length.description.as_deref(), Some(DYNAMIC_ARRAY_LENGTH_DESCRIPTION));
        assert!(!length.is_array && !length.is_pointer);

        let character_array = data.find_struct("Character*[]").unwrap();
        assert_eq!(character_array.base_type.as_deref(), Some("Character"));
    }

    #[test]
    fn multidimensional_dynamic_array_chains_base_types() {
        let data = parse("\nint multiDimArray[][];\n");
        assert_eq!(data.variables.len(), 1);
        assert_eq!(data.structs.len(), 2);
        let variable = data.find_variable("multiDimArray").unwrap();
        assert_eq!(variable.var_type, "int[][]");
        assert_eq!(variable.array_dimensions, 2);
        assert_eq!(data.find_struct("int[]").unwrap().base_type.as_deref(), Some("int"));
        assert_eq!(data.find_struct("int[][]").unwrap().base_type.as_deref(), Some("int[]"));
    }

    #[test]
    fn functions_imports_and_statics() {
        let data = parse(
            "\nimport int fooFactory();\nvoid MyMethod() {\n}\nstatic void MyStaticMethod(int param1, string param2) {\n}\n",
        );
        assert_eq!(data.functions.len(), 3);
        assert_eq!(data.find_function("fooFactory").unwrap().return_type, "int");
        assert!(!data.find_function("MyMethod").unwrap().is_static);

        let stat = data.find_function("MyStaticMethod").unwrap();
        assert!(stat.is_static);
        assert_eq!(stat.param_list, "int param1, string param2");
        assert!(stat.ends_at.is_some());
    }

    #[test]
    fn function_body_end_is_recorded() {
        let source = "void A() {\n  if (x) { y(); }\n}\nint b;";
        let data = parse(source);
        let function = data.find_function("A").unwrap();
        assert_eq!(function.ends_at, source.find("}\nint").map(|i| i + 1));
        assert_eq!(data.variables.len(), 1);
        assert!(data.function_at(source.find("y()").unwrap()).is_some());
    }

    #[test]
    fn qualified_and_pointer_return_types() {
        let data = parse("String* Make();\nint Character::Walk(int x) {\n}\nint[] Numbers();");
        let make = data.find_function("Make").unwrap();
        assert!(make.is_pointer);
        assert_eq!(make.return_type, "String");
        assert_eq!(data.find_function("Character::Walk").unwrap().return_type, "int");
        assert_eq!(data.find_function("Numbers").unwrap().return_type, "int[]");
    }

    #[test]
    fn enums_collect_values_in_order() {
        let data = parse("\nenum MyEnum {\n    Value1,\n    Value2 = 5,\n    Value3\n};\nenum Empty { };\n");
        assert_eq!(data.enums.len(), 2);
        let values: Vec<&str> = data.find_enum("MyEnum").unwrap().values.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(values, vec!["Value1", "Value2", "Value3"]);
        assert!(data.find_enum("Empty").unwrap().values.is_empty());
        assert_eq!(data.find_enum_value("Value3").unwrap().enum_type, "MyEnum");
    }

    #[test]
    fn structs_own_their_members() {
        let data = parse("\nstruct MyStruct {\n    int x;\n    int y;\n}\n");
        assert_eq!(data.structs.len(), 1);
        assert_eq!(data.find_struct("MyStruct").unwrap().variables.len(), 2);
        assert!(data.variables.is_empty());
    }

    #[test]
    fn inherited_struct_copies_base_members_first() {
        let data = parse("\nstruct Base {\n    int x;\n};\nstruct Child extends Base {\n    int y;\n};\n");
        assert_eq!(data.structs.len(), 2);
        let child = data.find_struct("Child").unwrap();
        assert_eq!(child.parent_type.as_deref(), Some("Base"));
        assert!(child.functions.is_empty());
        let names: Vec<&str> = child.variables.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["x", "y"]);
    }

    #[test]
    fn no_inherit_members_stay_in_base() {
        let data = parse(
            "struct Base {\n  import void Hidden(); // $AUTOCOMPLETENOINHERIT$\n  import void Shown();\n};\nstruct Child extends Base {\n};\n",
        );
        let child = data.find_struct("Child").unwrap();
        assert_eq!(child.functions.len(), 1);
        assert_eq!(child.functions[0].name, "Shown");
    }

    #[test]
    fn attributes_distinguish_indexed_from_array_values() {
        let data = parse(
            "\nstruct MyStruct {\n    int arrOfInts[];\n    attribute int IndexedAttrib[];\n    attribute int[] AttribOfArray;\n    attribute int[] IndexedAttribOfArrays[];\n}\n",
        );
        assert!(data.variables.is_empty());
        assert_eq!(data.structs.len(), 2);
        let my_struct = data.find_struct("MyStruct").unwrap();

        let indexed = my_struct.find_member_variable("IndexedAttrib").unwrap();
        assert_eq!(indexed.var_type, "int");
        assert!(!indexed.is_array && !indexed.is_dynamic_array);

        for name in ["arrOfInts", "AttribOfArray", "IndexedAttribOfArrays"] {
            let variable = my_struct.find_member_variable(name).unwrap();
            assert_eq!(variable.var_type, "int[]", "{}", name);
            assert!(variable.is_array && variable.is_dynamic_array && !variable.is_pointer);
        }
        assert_eq!(data.find_struct("int[]").unwrap().variables.len(), 1);
    }

    #[test]
    fn comma_separated_declarations() {
        let data = parse("int x = 1, y;\nint arr[3], z;\nfloat f, g = 2.0;");
        let names: Vec<(&str, &str)> = data
            .variables
            .iter()
            .map(|v| (v.name.as_str(), v.var_type.as_str()))
            .collect();
        assert_eq!(
            names,
            vec![("x", "int"), ("y", "int"), ("arr", "int"), ("z", "int"), ("f", "float"), ("g", "float")]
        );
    }

    #[test]
    fn comparisons_at_top_level_are_not_declarations() {
        let data = parse(
            "\nimport void AbortGame();\nString mytext = \"Hello\";\nmytext = mytext.Append(\"World\");\nif (mytext != \"HelloWorld\")\n  AbortGame();\n",
        );
        assert_eq!(data.functions.len(), 1);
        assert_eq!(data.variables.len(), 1);
        assert_eq!(data.find_variable("mytext").unwrap().var_type, "String");
    }

    #[test]
    fn defines_follow_undef_and_guards() {
        let data = parse("#define A 1\n#define B\n#undef A\n#ifdef DEBUG\nint dbg;\n#else\nint rel;\n#endif\n#define _C // $AUTOCOMPLETEIGNORE$\n#define 1D\n");
        let names: Vec<&str> = data.defines.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["B"]);
        assert_eq!(data.find_variable("dbg").unwrap().guard.if_def_only.as_deref(), Some("DEBUG"));
        assert_eq!(data.find_variable("rel").unwrap().guard.if_ndef_only.as_deref(), Some("DEBUG"));
    }

    #[test]
    fn innermost_guard_wins_and_ifver_is_neutral() {
        let data = parse("#ifdef OUTER\n#ifndef INNER\nint a;\n#endif\n#ifver 3.6\nint b;\n#endif\nint c;\n#endif\nint d;");
        assert_eq!(data.find_variable("a").unwrap().guard.if_ndef_only.as_deref(), Some("INNER"));
        assert_eq!(data.find_variable("b").unwrap().guard.if_def_only.as_deref(), Some("OUTER"));
        assert_eq!(data.find_variable("c").unwrap().guard.if_def_only.as_deref(), Some("OUTER"));
        assert_eq!(data.find_variable("d").unwrap().guard, Guard::default());
    }

    #[test]
    fn extender_functions_attach_to_struct() {
        let data = parse(
            "struct Hero {\n  int hp;\n};\nvoid Heal(this Hero*, int amount) {\n}\nstatic int Count(static Villain) {\n}\n",
        );
        assert!(data.functions.is_empty());

        let heal = data.find_struct("Hero").unwrap().find_member_function("Heal").unwrap();
        assert!(heal.is_extender_method);
        assert!(!heal.is_static);
        assert_eq!(heal.param_list, "int amount");
        assert!(heal.ends_at.is_some());

        let villain = data.find_struct("Villain").unwrap();
        assert!(!villain.full_definition);
        let count = villain.find_member_function("Count").unwrap();
        assert!(count.is_static && count.is_static_only && count.is_extender_method);
        assert_eq!(count.param_list, "");
    }

    #[test]
    fn doc_comments_stay_with_the_next_declaration() {
        let data = parse(
            "/// The player character.\nstruct Hero {\n  int hp;\n};\n/// Game modes.\nenum Mode { Easy, Hard };\nint score;\n",
        );
        assert_eq!(data.find_struct("Hero").unwrap().description.as_deref(), Some("The player character."));
        assert_eq!(data.find_struct("Hero").unwrap().variables[0].description, None);
        assert_eq!(data.find_enum("Mode").unwrap().description.as_deref(), Some("Game modes."));
        assert_eq!(data.find_variable("score").unwrap().description, None);

        let data = parse("/// Stale.\n#define MAX 3\nint a;\n/// Also stale.\nWait(1);\nint b;\n/// Kept.\nint c;");
        assert_eq!(data.find_variable("a").unwrap().description, None);
        assert_eq!(data.find_variable("b").unwrap().description, None);
        assert_eq!(data.find_variable("c").unwrap().description.as_deref(), Some("Kept."));
    }

    #[test]
    fn ignore_marker_hides_declarations() {
        let data = parse("int shown;\nint hidden; // $AUTOCOMPLETEIGNORE$\nimport void Secret(); // $AUTOCOMPLETEIGNORE$\n");
        assert_eq!(data.variables.len(), 1);
        assert!(data.functions.is_empty());
    }

    #[test]
    fn imported_base_structs_are_visible() {
        let base = ScriptStruct {
            variables: vec![ScriptVariable::new("ID", "int", 0)],
            full_definition: true,
            ..ScriptStruct::new("Thing")
        };
        let data = Parser::new("struct Box extends Thing { int size; };\nint list[];", vec![&base])
            .parse()
            .unwrap();
        let boxed = data.find_struct("Box").unwrap();
        assert_eq!(boxed.variables.len(), 2);
        assert_eq!(data.find_struct("int[]").map(|s| s.name.as_str()), Some("int[]"));
    }

    #[test]
    fn cancelled_parse_yields_nothing() {
        let token = CancellationToken::new();
        token.cancel();
        assert!(Parser::new("int a;", Vec::new()).with_cancellation(&token).parse().is_none());
    }
}
