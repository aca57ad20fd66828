//! Symbol tables collected from a script for autocomplete and lookups.

use serde::Serialize;

/// Preprocessor guard active at a declaration: the macro a surrounding
/// `#ifdef` requires, or the one a surrounding `#ifndef` forbids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Guard {
    pub if_def_only: Option<String>,
    pub if_ndef_only: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScriptVariable {
    pub name: String,
    #[serde(rename = "type")]
    pub var_type: String,
    pub is_array: bool,
    pub is_dynamic_array: bool,
    pub array_dimensions: usize,
    pub is_pointer: bool,
    pub is_static: bool,
    pub is_static_only: bool,
    pub is_protected: bool,
    pub is_readonly: bool,
    pub no_inherit: bool,
    #[serde(flatten)]
    pub guard: Guard,
    pub start: usize,
    pub description: Option<String>,
}

impl ScriptVariable {
    pub fn new(name: &str, var_type: &str, start: usize) -> Self {
        Self {
            name: name.to_string(),
            var_type: var_type.to_string(),
            start,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScriptFunction {
    pub name: String,
    #[serde(rename = "type")]
    pub return_type: String,
    pub param_list: String,
    pub is_pointer: bool,
    pub is_static: bool,
    pub is_static_only: bool,
    pub is_protected: bool,
    pub is_extender_method: bool,
    pub no_inherit: bool,
    #[serde(flatten)]
    pub guard: Guard,
    pub start: usize,
    /// Offset just past the closing brace of the body, once one was seen.
    pub ends_at: Option<usize>,
    pub description: Option<String>,
}

impl ScriptFunction {
    /// Name without a `Struct::` qualifier.
    pub fn short_name(&self) -> &str {
        self.name.rsplit("::").next().unwrap_or(&self.name)
    }

    pub fn contains_offset(&self, offset: usize) -> bool {
        self.ends_at.map_or(false, |end| self.start <= offset && offset < end)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EnumValue {
    pub name: String,
    pub enum_type: String,
    #[serde(flatten)]
    pub guard: Guard,
    pub start: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScriptEnum {
    pub name: String,
    pub values: Vec<EnumValue>,
    #[serde(flatten)]
    pub guard: Guard,
    pub start: usize,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScriptStruct {
    pub name: String,
    pub variables: Vec<ScriptVariable>,
    pub functions: Vec<ScriptFunction>,
    /// Base struct named after `extends`.
    pub parent_type: Option<String>,
    /// Element type of a dynamic array pseudo struct such as `int[]`.
    pub base_type: Option<String>,
    /// False for structs that only exist to hold extender functions.
    pub full_definition: bool,
    #[serde(flatten)]
    pub guard: Guard,
    pub start: usize,
    pub description: Option<String>,
}

impl ScriptStruct {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn find_member_function(&self, name: &str) -> Option<&ScriptFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn find_member_variable(&self, name: &str) -> Option<&ScriptVariable> {
        self.variables.iter().find(|v| v.name == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScriptDefine {
    pub name: String,
    #[serde(flatten)]
    pub guard: Guard,
    pub start: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AutoCompleteData {
    pub variables: Vec<ScriptVariable>,
    pub functions: Vec<ScriptFunction>,
    pub enums: Vec<ScriptEnum>,
    pub structs: Vec<ScriptStruct>,
    pub defines: Vec<ScriptDefine>,
}

impl AutoCompleteData {
    pub fn find_variable(&self, name: &str) -> Option<&ScriptVariable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn find_function(&self, name: &str) -> Option<&ScriptFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn find_enum(&self, name: &str) -> Option<&ScriptEnum> {
        self.enums.iter().find(|e| e.name == name)
    }

    pub fn find_struct(&self, name: &str) -> Option<&ScriptStruct> {
        self.structs.iter().find(|s| s.name == name)
    }

    pub fn find_define(&self, name: &str) -> Option<&ScriptDefine> {
        self.defines.iter().find(|d| d.name == name)
    }

    pub fn find_enum_value(&self, name: &str) -> Option<&EnumValue> {
        self.enums.iter().flat_map(|e| e.values.iter()).find(|v| v.name == name)
    }

    /// The function whose body spans `offset`, if any.
    pub fn function_at(&self, offset: usize) -> Option<&ScriptFunction> {
        self.functions
            .iter()
            .chain(self.structs.iter().flat_map(|s| s.functions.iter()))
            .find(|f| f.contains_offset(offset))
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
            && self.functions.is_empty()
            && self.enums.is_empty()
            && self.structs.is_empty()
            && self.defines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_name_drops_struct_qualifier() {
        let function = ScriptFunction {
            name: "Character::Walk".to_string(),
            ..ScriptFunction::default()
        };
        assert_eq!(function.short_name(), "Walk");
    }

    #[test]
    fn enum_values_are_found_across_enums() {
        let data = AutoCompleteData {
            enums: vec![ScriptEnum {
                name: "Colour".to_string(),
                values: vec![EnumValue {
                    name: "eRed".to_string(),
                    enum_type: "Colour".to_string(),
                    ..EnumValue::default()
                }],
                ..ScriptEnum::default()
            }],
            ..AutoCompleteData::default()
        };
        assert_eq!(data.find_enum_value("eRed").map(|v| v.enum_type.as_str()), Some("Colour"));
        assert!(data.find_enum_value("eBlue").is_none());
    }

    #[test]
    fn serializes_type_field_name() {
        let variable = ScriptVariable::new("a", "int", 0);
        let json = serde_json::to_value(&variable).unwrap();
        assert_eq!(json["type"], "int");
        assert_eq!(json["if_def_only"], serde_json::Value::Null);
    }
}
