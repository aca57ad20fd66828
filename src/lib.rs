//! Editor-side tooling for a C-like game scripting language: the line
//! preserving preprocessor, the structural parser that feeds autocomplete,
//! call-context lookup for parameter hints and the include/exclude file
//! pattern filter.

pub mod autocomplete;
pub mod call_context;
pub mod config;
pub mod error;
pub mod include_filter;
pub mod lexer;
pub mod macros;
pub mod parser;
pub mod preprocessor;
pub mod symbols;
pub mod token;
pub mod version;

pub use autocomplete::{construct_cache, construct_cache_cancellable, CancellationToken, Script, ScriptIndex};
pub use call_context::ParserState;
pub use config::Config;
pub use error::{CompileResults, CompilerError, Diagnostic, ErrorCode, Severity};
pub use include_filter::{create_pattern_list, filter_item_list, MatchOption, Pattern, PatternType};
pub use macros::MacroTable;
pub use preprocessor::{split_scripts, Preprocessor, PreprocessorContext, ScriptChunk};
pub use symbols::AutoCompleteData;
pub use version::Version;
