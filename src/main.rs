use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser as ClapParser, Subcommand};
use log::LevelFilter;
use rayon::prelude::*;

use vns_compiler::config::Config;
use vns_compiler::error::CliError;
use vns_compiler::writer::MAGIC;
use vns_compiler::{compile, lex, parse, Artifact, CompiledScript, Identifier, TranslationTable};

#[derive(ClapParser)]
#[command(author, version, about = "VNS Script Compiler")]
struct Cli {
    /// Raise the log level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile one or more scripts into bytecode artifacts
    Compile {
        /// Source files, or directories whose source files are all compiled
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Directory for the artifacts (defaults to next to each source)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the token stream of a script
    Tokens { file: PathBuf },
    /// Print the syntax tree of a script
    Ast { file: PathBuf },
    /// Disassemble a script or an already compiled artifact
    Disasm { file: PathBuf },
    /// Print the translation table of a script as JSON
    Translations {
        file: PathBuf,
        /// Previously edited table to bring up to date
        #[arg(long)]
        merge: Option<PathBuf>,
    },
    /// Manage vnsc configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Write a config file with defaults
    Init,
    /// Print where the config file lives
    Path,
}

fn init_logger(verbose: u8, config: Option<&Config>) {
    let mut builder = env_logger::Builder::new();
    if let Ok(filters) = env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    } else if verbose > 0 {
        builder.filter_level(match verbose {
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        });
    } else {
        builder.parse_filters(config.map_or("warn", |config| config.log_level.as_str()));
    }
    let _ = builder.try_init();
}

fn read_source(path: &Path) -> Result<String, CliError> {
    let source = fs::read_to_string(path).map_err(|e| CliError::io(path, e))?;
    Ok(source.replace("\r\n", "\n"))
}

fn compile_file(path: &Path) -> Result<CompiledScript, CliError> {
    let source = read_source(path)?;
    let identifier = Identifier::from_path(path);
    Ok(compile(&source, &identifier)?)
}

fn compile_files(inputs: &[PathBuf], output: Option<PathBuf>, config: &Config) -> Result<(), CliError> {
    let files = config.source_files(inputs)?;
    let mut config = config.clone();
    if output.is_some() {
        config.output_dir = output;
    }
    if let Some(dir) = &config.output_dir {
        fs::create_dir_all(dir).map_err(|e| CliError::io(dir, e))?;
    }

    let results: Vec<(&PathBuf, Result<PathBuf, CliError>)> = files
        .par_iter()
        .map(|path| {
            let result = compile_file(path).and_then(|script| {
                let target = config.output_path(path);
                fs::write(&target, &script.binary).map_err(|e| CliError::io(&target, e))?;
                Ok(target)
            });
            (path, result)
        })
        .collect();

    let mut failed = 0;
    for (path, result) in results {
        match result {
            Ok(target) => log::info!("{} -> {}", path.display(), target.display()),
            Err(e) => {
                eprintln!("{}: {}", path.display(), e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(CliError::Failed {
            failed,
            total: files.len(),
        });
    }
    Ok(())
}

fn disassemble(path: &Path) -> Result<String, CliError> {
    let bytes = fs::read(path).map_err(|e| CliError::io(path, e))?;
    let artifact = if bytes.starts_with(&MAGIC.to_le_bytes()) {
        Artifact::from_bytes(&bytes)?
    } else {
        Artifact::from_bytes(&compile_file(path)?.binary)?
    };
    Ok(artifact.disassemble()?)
}

fn translations(path: &Path, merge: Option<&Path>) -> Result<String, CliError> {
    let compiled = compile_file(path)?.translations;
    let table = match merge {
        Some(existing) => {
            let contents = fs::read_to_string(existing).map_err(|e| CliError::io(existing, e))?;
            let mut table: TranslationTable = serde_json::from_str(&contents)?;
            let report = table.merge(&compiled);
            log::info!(
                "{}: kept {}, added {}, removed {}",
                existing.display(),
                report.kept,
                report.added,
                report.removed
            );
            table
        }
        None => compiled,
    };
    Ok(serde_json::to_string_pretty(&table)?)
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = Config::load();
    init_logger(cli.verbose, config.as_ref().ok());
    dispatch(cli.command, config)
}

/// Runs one subcommand. Only the commands that read settings fail on a broken config
/// file, so `config path` and `config init` stay usable to repair it.
fn dispatch(command: Commands, config: Result<Config, CliError>) -> Result<(), CliError> {
    if let Err(e) = &config {
        log::warn!("{}", e);
    }

    match command {
        Commands::Compile { files, output } => compile_files(&files, output, &config?)?,
        Commands::Tokens { file } => {
            let identifier = Identifier::from_path(&file);
            for token in lex(&read_source(&file)?, &identifier)? {
                println!("{:>4}:{:<4} {:?}", token.position.line, token.position.column, token.kind);
            }
        }
        Commands::Ast { file } => {
            let identifier = Identifier::from_path(&file);
            let tokens = lex(&read_source(&file)?, &identifier)?;
            println!("{:#?}", parse(tokens, &identifier)?);
        }
        Commands::Disasm { file } => print!("{}", disassemble(&file)?),
        Commands::Translations { file, merge } => {
            println!("{}", translations(&file, merge.as_deref())?)
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show => println!("{}", serde_json::to_string_pretty(&config?)?),
            ConfigCommands::Init => {
                let path = Config::get_config_path();
                if path.exists() {
                    println!("Config file already exists at: {}", path.display());
                } else {
                    Config::default().save_to(&path)?;
                    println!("Initialized new config file at: {}", path.display());
                }
            }
            ConfigCommands::Path => println!("{}", Config::get_config_path().display()),
        },
    }

    Ok(())
}

fn main() {
    if let Err(e) = run(Cli::parse()) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn broken_config() -> Result<Config, CliError> {
        Err(CliError::Config(String::from("config.json: expected value at line 1 column 1")))
    }

    #[test]
    fn test_config_path_survives_broken_config() {
        let command = Commands::Config {
            command: ConfigCommands::Path,
        };
        assert!(dispatch(command, broken_config()).is_ok());
    }

    #[test]
    fn test_settings_commands_report_broken_config() {
        let command = Commands::Config {
            command: ConfigCommands::Show,
        };
        assert!(matches!(
            dispatch(command, broken_config()),
            Err(CliError::Config(_))
        ));

        let command = Commands::Compile {
            files: vec![PathBuf::from("missing.vns")],
            output: None,
        };
        assert!(matches!(
            dispatch(command, broken_config()),
            Err(CliError::Config(_))
        ));
    }
}
