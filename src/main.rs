use std::fs;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser as ClapParser, Subcommand};
use serde::Serialize;
use tracing::{debug, info};

use cscript_tools::call_context::ParserState;
use cscript_tools::config::Config;
use cscript_tools::error::{CompileResults, CompilerError};
use cscript_tools::include_filter::{create_pattern_list, filter_item_list, MatchOption};
use cscript_tools::preprocessor::Preprocessor;
use cscript_tools::version::Version;
use cscript_tools::{construct_cache, Script};

#[derive(ClapParser)]
#[command(author, version, about = "Script preprocessor and autocomplete tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Preprocess scripts in order, headers first
    Preprocess {
        files: Vec<PathBuf>,
        /// Compiler version checked by #ifver (defaults to the config value)
        #[arg(long)]
        compiler_version: Option<String>,
        /// Extra macro, as NAME or NAME=VALUE
        #[arg(short = 'D', value_name = "NAME[=VALUE]")]
        defines: Vec<String>,
        /// Print output and diagnostics as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the symbols declared in a script as JSON
    Symbols {
        file: PathBuf,
        /// Headers whose structs the script may extend
        #[arg(long = "import")]
        imports: Vec<PathBuf>,
    },
    /// Print the call expression enclosing a byte offset
    Call {
        file: PathBuf,
        offset: usize,
        /// Use the outermost call instead of the innermost
        #[arg(long)]
        outer: bool,
    },
    /// Filter file names through an include/exclude pattern file
    Filter {
        pattern_file: PathBuf,
        #[arg(long)]
        ignore_case: bool,
        /// Items to filter; read from stdin when empty
        items: Vec<String>,
    },
    /// Manage cst configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Write a default config file for the current environment
    Init,
    /// Print where the config file lives
    Path,
}

#[derive(Serialize)]
struct PreprocessOutput<'a> {
    output: &'a str,
    diagnostics: &'a CompileResults,
}

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_level(true).with_writer(io::stderr))
        .with(filter)
        .init();
}

fn read_script(path: &Path) -> Result<String, CompilerError> {
    if !path.exists() {
        return Err(CompilerError::FileNotFound(path.display().to_string()));
    }
    Ok(fs::read_to_string(path)?)
}

fn parse_define(define: &str) -> (&str, &str) {
    define.split_once('=').unwrap_or((define, ""))
}

fn preprocess_files(
    files: &[PathBuf],
    compiler_version: Option<&str>,
    defines: &[String],
    json: bool,
    config: &Config,
) -> Result<bool, CompilerError> {
    if files.is_empty() {
        return Err(CompilerError::InvalidArgument("no scripts given".to_string()));
    }

    let mut context = config.preprocessor_context()?;
    if let Some(version) = compiler_version {
        context.version = version
            .parse::<Version>()
            .map_err(|err| CompilerError::InvalidArgument(err.to_string()))?;
    }
    for define in defines {
        let (name, value) = parse_define(define);
        context.macros.define(name, value);
    }

    let mut sources = Vec::with_capacity(files.len());
    for file in files {
        sources.push((file.display().to_string(), read_script(file)?));
    }

    let mut preprocessor = Preprocessor::new(context);
    let output = preprocessor.preprocess_scripts(sources.iter().map(|(name, text)| (name.as_str(), text.as_str())));
    let results = preprocessor.take_results();
    info!(scripts = files.len(), diagnostics = results.len(), "preprocessed");

    if json {
        let report = PreprocessOutput {
            output: &output,
            diagnostics: &results,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", output);
        for diagnostic in &results {
            eprintln!("{}", diagnostic);
        }
    }

    Ok(!results.has_errors())
}

fn print_symbols(file: &Path, imports: &[PathBuf]) -> Result<(), CompilerError> {
    let mut headers: Vec<Script> = Vec::with_capacity(imports.len());
    for import in imports {
        let mut header = Script::new(&import.display().to_string(), &read_script(import)?, true);
        construct_cache(&mut header, headers.iter());
        headers.push(header);
    }

    let mut script = Script::new(&file.display().to_string(), &read_script(file)?, false);
    construct_cache(&mut script, headers.iter());
    debug!(script = %script.name, structs = script.autocomplete.structs.len(), "symbols built");

    println!("{}", serde_json::to_string_pretty(&script.autocomplete)?);
    Ok(())
}

fn print_call(file: &Path, offset: usize, outer: bool) -> Result<(), CompilerError> {
    let text = read_script(file)?;
    if offset > text.len() || !text.is_char_boundary(offset) {
        return Err(CompilerError::InvalidArgument(format!(
            "offset {} is not a character position in {}",
            offset,
            file.display()
        )));
    }

    let state = ParserState::with_comments(&text);
    if state.is_in_comment(offset) {
        debug!(offset, "cursor is inside a comment");
        return Ok(());
    }
    println!("{}", state.current_function_call(offset, outer));
    Ok(())
}

fn filter_items(pattern_file: &Path, ignore_case: bool, items: Vec<String>, config: &Config) -> Result<(), CompilerError> {
    let option = if ignore_case {
        MatchOption::CaseInsensitive
    } else {
        config.match_option()
    };
    let patterns = create_pattern_list(&read_script(pattern_file)?, option);

    let items = if items.is_empty() {
        io::stdin().lock().lines().collect::<Result<Vec<_>, _>>()?
    } else {
        items
    };

    for item in filter_item_list(&items, &patterns, option) {
        println!("{}", item);
    }
    Ok(())
}

fn run_config_command(command: ConfigCommands, config: &Config) -> Result<(), CompilerError> {
    match command {
        ConfigCommands::Show => {
            println!("Environment: {}", Config::env_name());
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        ConfigCommands::Init => {
            let config_path = Config::get_config_path();
            if config_path.exists() {
                println!("Config file already exists at: {}", config_path.display());
                println!("Remove it to reinitialize.");
            } else {
                let config_path = Config::default().save()?;
                println!("Initialized new config file at: {}", config_path.display());
            }
        }
        ConfigCommands::Path => println!("{}", Config::get_config_path().display()),
    }
    Ok(())
}

fn main() -> Result<ExitCode, CompilerError> {
    init_tracing();
    let cli = Cli::parse();
    let config = Config::load();

    match cli.command {
        Commands::Preprocess {
            files,
            compiler_version,
            defines,
            json,
        } => {
            let clean = preprocess_files(&files, compiler_version.as_deref(), &defines, json, &config)?;
            if !clean {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Symbols { file, imports } => print_symbols(&file, &imports)?,
        Commands::Call { file, offset, outer } => print_call(&file, offset, outer)?,
        Commands::Filter {
            pattern_file,
            ignore_case,
            items,
        } => filter_items(&pattern_file, ignore_case, items, &config)?,
        Commands::Config { command } => run_config_command(command, &config)?,
    }

    Ok(ExitCode::SUCCESS)
}
