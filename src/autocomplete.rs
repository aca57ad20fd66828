//! Autocomplete caches for scripts and the cross-script index built on them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::CompilerError;
use crate::lexer::Lexer;
use crate::parser::{generate_dynamic_array_structs_for, is_identifier, Parser};
use crate::symbols::{AutoCompleteData, ScriptFunction, ScriptStruct, ScriptVariable};
use crate::token::{Kind, Token};

#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Script {
    pub name: String,
    pub text: String,
    pub is_header: bool,
    pub autocomplete: AutoCompleteData,
    pub populated: bool,
}

impl Script {
    pub fn new(name: &str, text: &str, is_header: bool) -> Self {
        Self {
            name: name.to_string(),
            text: text.to_string(),
            is_header,
            ..Self::default()
        }
    }

    pub fn local_variables_at(&self, offset: usize) -> Vec<ScriptVariable> {
        let Some(function) = self.autocomplete.function_at(offset) else {
            return Vec::new();
        };
        let body_start = self
            .text
            .get(function.start..offset)
            .and_then(|head| head.find('{'))
            .map_or(function.start, |i| function.start + i + 1);
        let body = self.text.get(body_start..offset).unwrap_or("");
        let mut structs = self.autocomplete.structs.clone();
        local_variables(function, &mut structs, body, body_start)
    }
}

fn imported_structs<'a, I>(imports: I) -> Vec<&'a ScriptStruct>
where
    I: IntoIterator<Item = &'a Script>,
{
    imports
        .into_iter()
        .flat_map(|script| script.autocomplete.structs.iter())
        .collect()
}

/// Rebuilds `script.autocomplete` from its text. Structs declared in
/// `imports` can be extended and are not duplicated as array pseudo structs.
pub fn construct_cache<'a, I>(script: &mut Script, imports: I)
where
    I: IntoIterator<Item = &'a Script>,
{
    let parsed = Parser::new(&script.text, imported_structs(imports)).parse();
    if let Some(data) = parsed {
        script.autocomplete = data;
        script.populated = true;
    }
}

/// Like [`construct_cache`], but gives up when `cancel` is triggered. The
/// script keeps its previous cache in that case.
pub fn construct_cache_cancellable<'a, I>(
    script: &mut Script,
    imports: I,
    cancel: &CancellationToken,
) -> Result<(), CompilerError>
where
    I: IntoIterator<Item = &'a Script>,
{
    let parsed = Parser::new(&script.text, imported_structs(imports))
        .with_cancellation(cancel)
        .parse();
    match parsed {
        Some(data) => {
            script.autocomplete = data;
            script.populated = true;
            Ok(())
        }
        None => Err(CompilerError::Cancelled),
    }
}

pub fn local_variables(
    function: &ScriptFunction,
    structs: &mut Vec<ScriptStruct>,
    body: &str,
    offset: usize,
) -> Vec<ScriptVariable> {
    let mut variables = parameters_as_variables(function);
    variables.extend(locals_in_body(body, offset));

    let mut known: Vec<String> = structs.iter().map(|s| s.name.clone()).collect();
    generate_dynamic_array_structs_for(&mut variables, structs, &mut known);
    variables
}

fn parameters_as_variables(function: &ScriptFunction) -> Vec<ScriptVariable> {
    let mut variables = Vec::new();
    if function.param_list.is_empty() {
        return variables;
    }

    let param_list: String = function
        .param_list
        .lines()
        .map(|line| line.split("//").next().unwrap_or(""))
        .collect::<Vec<_>>()
        .join(" ");

    for parameter in param_list.split(',') {
        let mut parameter = parameter.trim();
        if let Some(rest) = parameter.strip_prefix("optional ") {
            parameter = rest.trim();
        }
        if let Some((declaration, _default)) = parameter.split_once('=') {
            parameter = declaration.trim();
        }

        let mut array_dimensions = 0;
        while let Some(rest) = parameter.strip_suffix(']') {
            match rest.rfind('[') {
                Some(open) => {
                    array_dimensions += 1;
                    parameter = rest[..open].trim_end();
                }
                None => break,
            }
        }

        let param_type = parameter.trim_end_matches(|c: char| c.is_alphanumeric() || c == '_');
        let name = &parameter[param_type.len()..];
        let mut param_type = param_type.trim();
        let mut is_pointer = false;
        if let Some(stripped) = param_type.strip_suffix('*') {
            is_pointer = true;
            param_type = stripped.trim();
        }

        if !name.is_empty() && !param_type.is_empty() {
            variables.push(ScriptVariable {
                is_array: array_dimensions > 0,
                is_dynamic_array: array_dimensions > 0,
                array_dimensions,
                is_pointer,
                ..ScriptVariable::new(name, param_type, function.start)
            });
        }
    }
    variables
}

fn locals_in_body(body: &str, offset: usize) -> Vec<ScriptVariable> {
    let tokens: Vec<Token> = Lexer::new(body)
        .tokenize()
        .into_iter()
        .filter(|t| !t.is_comment() && t.kind != Kind::Directive)
        .collect();
    let mut iter = tokens.iter().peekable();
    let mut variables = Vec::new();
    let mut last_word = String::new();

    while let Some(token) = iter.next() {
        let starts_declarator = is_identifier(&token.value) || token.is_punct("*");
        if !starts_declarator {
            last_word.clear();
            continue;
        }
        if last_word.is_empty() || iter.peek().is_none() {
            last_word = token.value.clone();
            continue;
        }

        let mut is_pointer = false;
        let mut name_token = token;
        if token.is_punct("*") {
            is_pointer = true;
            match iter.next() {
                Some(next) if is_identifier(&next.value) && iter.peek().is_some() => name_token = next,
                _ => {
                    last_word.clear();
                    continue;
                }
            }
        }

        let mut next = iter.next();
        let mut is_array = false;
        let mut is_dynamic_array = false;
        let mut array_dimensions = 0;
        if next.map_or(false, |t| t.is_punct("[")) {
            is_array = true;
            is_dynamic_array = iter.peek().map_or(false, |t| t.is_punct("]"));
            while next.map_or(false, |t| t.is_punct("[")) {
                array_dimensions += 1;
                let mut depth = 1;
                for inner in iter.by_ref() {
                    if inner.is_punct("[") {
                        depth += 1;
                    } else if inner.is_punct("]") {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                }
                next = iter.next();
            }
        }

        let terminator = next.map_or("", |t| t.value.as_str());
        let ends_declarator = next.map_or(false, |t| t.kind == Kind::Punct) && matches!(terminator, "=" | ";" | ",");
        if ends_declarator && !matches!(last_word.as_str(), "return" | "else" | "new") {
            let end = next.map_or(body.len(), |t| t.end);
            variables.push(ScriptVariable {
                is_array,
                is_dynamic_array,
                array_dimensions,
                is_pointer,
                ..ScriptVariable::new(&name_token.value, &last_word, end + offset)
            });
        }
        if terminator != "," {
            last_word.clear();
        }
    }
    variables
}

#[derive(Debug, Clone, Default)]
pub struct ScriptIndex {
    scripts: Vec<Script>,
}

impl ScriptIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, script: Script) {
        self.scripts.push(script);
    }

    pub fn scripts(&self) -> &[Script] {
        &self.scripts
    }

    pub fn get(&self, name: &str) -> Option<&Script> {
        self.scripts.iter().find(|s| s.name == name)
    }

    /// Rebuilds every cache in order; each script sees the headers added
    /// before it.
    pub fn rebuild(&mut self) {
        for index in 0..self.scripts.len() {
            let (before, rest) = self.scripts.split_at_mut(index);
            if let Some(script) = rest.first_mut() {
                construct_cache(script, before.iter().filter(|s| s.is_header));
                debug!(script = %script.name, "rebuilt autocomplete cache");
            }
        }
        info!(scripts = self.scripts.len(), "script index rebuilt");
    }

    pub fn rebuild_cancellable(&mut self, cancel: &CancellationToken) -> Result<(), CompilerError> {
        for index in 0..self.scripts.len() {
            let (before, rest) = self.scripts.split_at_mut(index);
            if let Some(script) = rest.first_mut() {
                construct_cache_cancellable(script, before.iter().filter(|s| s.is_header), cancel)?;
            }
        }
        Ok(())
    }

    pub fn all_structs_named(&self, name: &str) -> Vec<&ScriptStruct> {
        self.scripts
            .iter()
            .flat_map(|s| s.autocomplete.structs.iter())
            .filter(|s| s.name == name)
            .collect()
    }

    /// Single view of a struct: the full definition with the members of
    /// every other declaration of the same name appended.
    pub fn merged_struct(&self, name: &str) -> Option<ScriptStruct> {
        let all = self.all_structs_named(name);
        let primary = all.iter().find(|s| s.full_definition).or_else(|| all.first())?;
        let mut merged = (*primary).clone();

        for other in all.iter().filter(|s| !std::ptr::eq(**s, *primary)) {
            for function in &other.functions {
                if merged.find_member_function(&function.name).is_none() {
                    merged.functions.push(function.clone());
                }
            }
            for variable in &other.variables {
                if merged.find_member_variable(&variable.name).is_none() {
                    merged.variables.push(variable.clone());
                }
            }
        }
        Some(merged)
    }

    pub fn find_function(&self, name: &str) -> Option<&ScriptFunction> {
        self.scripts.iter().find_map(|s| s.autocomplete.find_function(name))
    }

    pub fn find_variable(&self, name: &str) -> Option<&ScriptVariable> {
        self.scripts.iter().find_map(|s| s.autocomplete.find_variable(name))
    }
}
