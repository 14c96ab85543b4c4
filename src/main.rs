use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use ilox::ast_printer::AstPrinter;
use ilox::error::LoxError;
use ilox::interpreter::Interpreter;
use ilox::parser::Parser;
use ilox::resolver::Resolver;
use ilox::scanner::Scanner;
use ilox::token::Token;

#[derive(ClapParser, Debug)]
#[command(version, about = "ilox language interpreter", long_about = None)]
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
        filename: Option<PathBuf>,

        /// Emit the token stream as JSON instead of one token per line
        #[arg(long)]
        json: bool,
    },

    /// Parses input from a file as a single expression and prints its AST
    Parse { filename: Option<PathBuf> },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: Option<PathBuf> },

    /// Runs input from a file as a program, or starts a REPL when no file is
    /// given
    Run { filename: Option<PathBuf> },
}

/// Memory-maps the script so the scanner can work straight off the file bytes.
fn map_file(filename: &PathBuf) -> Result<Mmap> {
    info!("Mapping file: {:?}", filename);
    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;

    // SAFETY: the mapping is read-only and lives for the duration of one run.
    let mmap = unsafe { Mmap::map(&file) }.context(format!("Failed to map file {:?}", filename))?;

    info!("Mapped {} bytes from {:?}", mmap.len(), filename);

    Ok(mmap)
}

fn init_logger() -> Result<()> {
    // Create or open the log file
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    // Configure env_logger to write to file with module path and source line
    Builder::new()
        .format(|buf, record| {
            // Strip 'ilox::' from module path
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("ilox::")
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

/// Scans the whole input, splitting tokens from diagnostics.  The scan never
/// aborts, so the caller always sees every lexical error at once.
fn scan_source(src: &[u8]) -> (Vec<Token>, Vec<LoxError>) {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    for item in Scanner::new(src) {
        match item {
            Ok(token) => tokens.push(token),
            Err(e) => errors.push(e),
        }
    }

    (tokens, errors)
}

/// Runs one unit of source through scan → parse → resolve → execute against
/// the given (possibly long-lived) resolver and interpreter.
///
/// Returns the exit code the driver should use: 0 on success, 65 when the
/// static pipeline failed, 70 on a runtime error.  Execution never starts
/// when scanning, parsing, or resolution reported any error.
fn run_source(src: &[u8], resolver: &mut Resolver, interpreter: &mut Interpreter) -> i32 {
    let (tokens, lex_errors) = scan_source(src);

    if !lex_errors.is_empty() {
        for e in &lex_errors {
            eprintln!("{}", e);
        }
        return 65;
    }

    let mut parser = Parser::new(&tokens);

    let statements = match parser.parse() {
        Ok(statements) => statements,

        Err(errors) => {
            for e in &errors {
                eprintln!("{}", e);
            }
            return 65;
        }
    };

    info!("Parsed {} statements", statements.len());

    if let Err(errors) = resolver.resolve(&statements) {
        for e in &errors {
            eprintln!("{}", e);
        }
        return 65;
    }

    match interpreter.interpret(&statements) {
        Ok(()) => {
            info!("Program executed successfully");
            0
        }

        Err(e) => {
            debug!("Runtime debug: {}", e);
            eprintln!("{}", e);
            70
        }
    }
}

/// Interactive read-eval loop.  One resolver and one interpreter serve every
/// line, so globals and closures survive across inputs; errors report and
/// return to the prompt.
fn repl() -> Result<()> {
    info!("Starting REPL");

    let mut resolver = Resolver::new();
    let mut interpreter = Interpreter::new();

    let stdin = io::stdin();
    let mut line = String::new();

    loop {
        print!("> ");
        io::stdout().flush().context("Failed to flush stdout")?;

        line.clear();
        let read = stdin
            .lock()
            .read_line(&mut line)
            .context("Failed to read line")?;

        if read == 0 {
            info!("REPL received EOF");
            return Ok(());
        }

        run_source(line.as_bytes(), &mut resolver, &mut interpreter);

        println!();
    }
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
        Commands::Tokenize { filename, json } => match filename {
            Some(filename) => {
                info!("Running Tokenize subcommand");
                let buf = map_file(&filename)?;
                let (tokens, errors) = scan_source(&buf);

                for e in &errors {
                    debug!("Tokenization debug: {}", e);
                    eprintln!("{}", e);
                }

                if json {
                    let rendered = serde_json::to_string_pretty(&tokens)
                        .context("Failed to serialize tokens")?;
                    println!("{}", rendered);
                } else {
                    for token in &tokens {
                        debug!("Scanned token: {}", token);
                        println!("{}", token);
                    }
                }

                if !errors.is_empty() {
                    debug!("Tokenization failed, exiting with code 65");
                    std::process::exit(65);
                }

                info!("Tokenization completed successfully");
            }

            None => {
                info!("No filepath provided for Tokenize");
                println!("No input filepath was provided. Exiting...");
                std::process::exit(0);
            }
        },

        Commands::Parse { filename } => match filename {
            Some(filename) => {
                info!("Running Parse subcommand");
                let buf = map_file(&filename)?;
                let (tokens, errors) = scan_source(&buf);

                if !errors.is_empty() {
                    for e in &errors {
                        eprintln!("{}", e);
                    }
                    std::process::exit(65);
                }

                let mut parser = Parser::new(&tokens);

                match parser.parse_expression() {
                    Ok(expr) => {
                        info!("Expression parsed successfully");
                        let ast_str = AstPrinter::print(&expr);

                        debug!("AST: {}", ast_str);
                        println!("{}", ast_str);
                    }

                    Err(e) => {
                        debug!("Parse debug: {}", e);
                        eprintln!("{}", e);
                        std::process::exit(65);
                    }
                }

                info!("Parse subcommand completed");
            }

            None => {
                info!("No filepath provided for Parse");
                println!("No input filepath was provided. Exiting...");
                std::process::exit(0);
            }
        },

        Commands::Evaluate { filename } => match filename {
            Some(filename) => {
                info!("Running Evaluate subcommand");

                let buf = map_file(&filename)?;
                let (tokens, errors) = scan_source(&buf);

                if !errors.is_empty() {
                    for e in &errors {
                        eprintln!("{}", e);
                    }
                    std::process::exit(65);
                }

                let mut parser = Parser::new(&tokens);
                let mut interpreter = Interpreter::new();

                match parser.parse_expression() {
                    Ok(expr) => {
                        info!("Expression parsed successfully");

                        match interpreter.evaluate(&expr) {
                            Ok(value) => {
                                debug!("Evaluated to: {}", value);
                                println!("{}", value);
                            }

                            Err(e) => {
                                debug!("Evaluation debug: {}", e);
                                eprintln!("{}", e);
                                std::process::exit(70);
                            }
                        }
                    }

                    Err(e) => {
                        debug!("Parse debug: {}", e);
                        eprintln!("{}", e);
                        std::process::exit(65);
                    }
                }

                info!("Evaluate subcommand completed");
            }

            None => {
                info!("No filepath provided for Evaluate");
                println!("No input filepath was provided. Exiting...");
                std::process::exit(0);
            }
        },

        Commands::Run { filename } => match filename {
            Some(filename) => {
                info!("Running Run subcommand");
                let buf = map_file(&filename)?;

                let mut resolver = Resolver::new();
                let mut interpreter = Interpreter::new();

                let code = run_source(&buf, &mut resolver, &mut interpreter);

                // One trailing blank line after each top-level run.
                println!();

                if code != 0 {
                    std::process::exit(code);
                }
            }

            None => {
                repl()?;
            }
        },
    }

    Ok(())
}
