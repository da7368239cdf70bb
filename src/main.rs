use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use loxide::ast_printer::AstPrinter;
use loxide::error::LoxError;
use loxide::interpreter::Interpreter;
use loxide::parser::Parser;
use loxide::resolver::Resolver;
use loxide::scanner::Scanner;
use loxide::token::Token;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Emit the token list as JSON instead of one token per line
        #[arg(long)]
        json: bool,
    },

    /// Parses input from a file and prints each statement's AST
    Parse { filename: PathBuf },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: PathBuf },

    /// Runs input from a file as a Lox program
    Run { filename: PathBuf },

    /// Starts an interactive session; expression values echo back
    Repl,
}

/// Memory-map a source file.  `None` for an empty file (zero-length
/// mappings are not portable).
fn map_source(filename: &Path) -> Result<Option<Mmap>> {
    info!("Mapping file: {:?}", filename);

    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;

    let len = file
        .metadata()
        .context(format!("Failed to stat file {:?}", filename))?
        .len();

    if len == 0 {
        return Ok(None);
    }

    let mmap = unsafe { Mmap::map(&file) }.context(format!("Failed to map file {:?}", filename))?;

    info!("Mapped {} bytes from {:?}", len, filename);

    Ok(Some(mmap))
}

/// Run the scanner to completion, separating tokens from lex errors.
fn scan_tokens(src: &[u8]) -> (Vec<Token>, Vec<LoxError>) {
    let mut tokens: Vec<Token> = Vec::new();
    let mut errors: Vec<LoxError> = Vec::new();

    for result in Scanner::new(src) {
        match result {
            Ok(token) => tokens.push(token),
            Err(e) => errors.push(e),
        }
    }

    (tokens, errors)
}

fn init_logger() -> Result<()> {
    // Create or open the log file
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    // Configure env_logger to write to file with module path and source line
    Builder::new()
        .format(|buf, record| {
            // Strip 'loxide::' from module path
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("loxide::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        // Initialize a minimal logger to avoid "no logger" errors
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Commands::Tokenize { filename, json } => {
            info!("Running Tokenize subcommand");

            let mmap = map_source(&filename)?;
            let (tokens, errors) = scan_tokens(mmap.as_deref().unwrap_or(&[]));

            for e in &errors {
                eprintln!("{}", e);
            }

            if json {
                let rendered =
                    serde_json::to_string_pretty(&tokens).context("Failed to render tokens")?;

                println!("{}", rendered);
            } else {
                for token in &tokens {
                    println!("{}", token);
                }
            }

            if !errors.is_empty() {
                debug!("Tokenization failed, exiting with code 65");

                std::process::exit(65);
            }

            info!("Tokenization completed successfully");
        }

        Commands::Parse { filename } => {
            info!("Running Parse subcommand");

            let mmap = map_source(&filename)?;
            let (tokens, errors) = scan_tokens(mmap.as_deref().unwrap_or(&[]));

            if !errors.is_empty() {
                for e in &errors {
                    eprintln!("{}", e);
                }

                std::process::exit(65);
            }

            match Parser::new(tokens).parse() {
                Ok(statements) => {
                    info!("Parsed {} statements", statements.len());

                    for stmt in &statements {
                        println!("{}", AstPrinter::print_stmt(stmt));
                    }
                }

                Err(errors) => {
                    for e in &errors {
                        eprintln!("{}", e);
                    }

                    std::process::exit(65);
                }
            }
        }

        Commands::Evaluate { filename } => {
            info!("Running Evaluate subcommand");

            let mmap = map_source(&filename)?;
            let (tokens, errors) = scan_tokens(mmap.as_deref().unwrap_or(&[]));

            if !errors.is_empty() {
                for e in &errors {
                    eprintln!("{}", e);
                }

                std::process::exit(65);
            }

            match Parser::new(tokens).parse_expression() {
                Ok(expr) => {
                    let mut interpreter = Interpreter::new();

                    match interpreter.evaluate(&expr) {
                        Ok(value) => {
                            debug!("Evaluated to: {}", value);
                            println!("{}", value);
                        }

                        Err(e) => {
                            eprintln!("{}", e);
                            std::process::exit(70);
                        }
                    }
                }

                Err(e) => {
                    eprintln!("{}", e);
                    std::process::exit(65);
                }
            }
        }

        Commands::Run { filename } => {
            info!("Running Run subcommand");

            let mmap = map_source(&filename)?;
            let (tokens, errors) = scan_tokens(mmap.as_deref().unwrap_or(&[]));

            if !errors.is_empty() {
                for e in &errors {
                    eprintln!("{}", e);
                }

                std::process::exit(65);
            }

            let statements = match Parser::new(tokens).parse() {
                Ok(statements) => statements,

                Err(errors) => {
                    for e in &errors {
                        eprintln!("{}", e);
                    }

                    std::process::exit(65);
                }
            };

            info!("Parsed {} statements", statements.len());

            // A non-empty static-error list prevents interpretation: not a
            // single statement of the program runs.
            let locals = match Resolver::new().resolve(&statements) {
                Ok(locals) => locals,

                Err(errors) => {
                    for e in &errors {
                        eprintln!("{}", e);
                    }

                    std::process::exit(65);
                }
            };

            let mut interpreter = Interpreter::new();

            if let Err(e) = interpreter.interpret(&statements, locals) {
                eprintln!("{}", e);
                std::process::exit(70);
            }

            info!("Program executed successfully");
        }

        Commands::Repl => {
            info!("Starting REPL session");

            repl()?;
        }
    }

    Ok(())
}

/// Interactive loop.  Globals persist across lines; a runtime error aborts
/// only the current line, and already-applied effects stick around.
fn repl() -> Result<()> {
    let mut interpreter = Interpreter::new();
    interpreter.set_prompt_mode(true);

    let stdin = io::stdin();
    let mut next_id: usize = 0;

    loop {
        print!("> ");
        io::stdout().flush().context("Failed to flush stdout")?;

        let mut line = String::new();
        if stdin
            .lock()
            .read_line(&mut line)
            .context("Failed to read line")?
            == 0
        {
            break; // EOF
        }

        if line.trim().is_empty() {
            continue;
        }

        let (tokens, errors) = scan_tokens(line.as_bytes());

        if !errors.is_empty() {
            for e in &errors {
                eprintln!("{}", e);
            }

            continue;
        }

        // Expression ids stay unique for the whole session, so side tables
        // from earlier lines remain valid inside the interpreter.
        let mut parser = Parser::with_start_id(tokens, next_id);

        let statements = match parser.parse() {
            Ok(statements) => statements,

            Err(errors) => {
                for e in &errors {
                    eprintln!("{}", e);
                }

                continue;
            }
        };

        next_id = parser.next_id();

        let locals = match Resolver::new().resolve(&statements) {
            Ok(locals) => locals,

            Err(errors) => {
                for e in &errors {
                    eprintln!("{}", e);
                }

                continue;
            }
        };

        if let Err(e) = interpreter.interpret(&statements, locals) {
            eprintln!("{}", e);
        }
    }

    Ok(())
}
