mod highlighter;
mod validator;

use std::io::{BufRead, BufReader};

use clap::Parser;
use kestrel::{
    CompilationOptions, Engine, EngineOptions, ExecutionMode, ExecutionOptions, LanguageLevel,
    MapVariableResolverFactory, Value, render_error,
};
use miette::{IntoDiagnostic, Result};
use reedline::{
    DefaultPrompt, DefaultPromptSegment, EditCommand, Emacs, FileBackedHistory, KeyCode,
    KeyModifiers, Reedline, ReedlineEvent, Signal, default_emacs_keybindings,
};
use tracing::debug;

use highlighter::Highlighter;
use validator::BracketValidator;

const HISTORY_SIZE: usize = 1000;

/// Kestrel - an embeddable expression language
#[derive(Parser, Debug)]
#[command(name = "kestrel")]
#[command(about = "Evaluate Kestrel expressions", long_about = None)]
struct Args {
    /// Print the compiled tree (for debugging)
    #[arg(long)]
    debug_parse: bool,

    /// Resolve every property path on each evaluation instead of caching
    #[arg(long)]
    interpreted: bool,

    /// Reject identifiers whose type cannot be inferred
    #[arg(long)]
    strict: bool,

    /// Restrict the language: 0 property paths .. 5 full control flow
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u8).range(0..=5))]
    level: u8,

    /// Define a variable; the value is evaluated as Kestrel, or taken as a
    /// string when that fails (repeatable)
    #[arg(short = 'D', value_name = "NAME=VALUE", value_parser = parse_define)]
    define: Vec<(String, String)>,

    /// Expression to evaluate (if not provided, reads from stdin)
    expression: Option<String>,
}

fn parse_define(arg: &str) -> std::result::Result<(String, String), String> {
    match arg.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got `{}`", arg)),
    }
}

fn define_value(text: &str) -> Value {
    kestrel::eval(text).unwrap_or_else(|_| Value::str(text))
}

fn language_level(level: u8) -> LanguageLevel {
    match level {
        0 => LanguageLevel::PropertyOnly,
        1 => LanguageLevel::BasicOps,
        2 => LanguageLevel::MultiStatement,
        3 => LanguageLevel::Iteration,
        4 => LanguageLevel::Assignment,
        _ => LanguageLevel::ControlFlow,
    }
}

fn build_engine(args: &Args) -> Engine {
    let options = EngineOptions {
        default_compilation_options: CompilationOptions {
            strict_typing: args.strict,
            language_level: language_level(args.level),
            ..CompilationOptions::default()
        },
        default_execution_options: ExecutionOptions {
            mode: if args.interpreted {
                ExecutionMode::Interpreted
            } else {
                ExecutionMode::Accelerated
            },
            ..ExecutionOptions::default()
        },
    };
    Engine::new(options, |_| {})
}

/// Variables live for the whole session, so assignments carry over
/// between inputs.
struct Session<'a> {
    engine: Engine,
    vars: MapVariableResolverFactory<'a>,
    debug_parse: bool,
}

impl Session<'_> {
    fn interpret(&self, input: &str) {
        let expr = match self.engine.compile(input) {
            Ok(Some(expr)) => expr,
            Ok(None) => return,
            Err(e) => {
                render_error(&e, input);
                return;
            }
        };

        if self.debug_parse {
            println!("=== Compiled tree ===");
            println!("{}", expr.debug_tree());
            println!();
        }

        match expr.evaluate(&Value::Null, &self.vars) {
            Ok(value) => println!("{:?}", value),
            Err(e) => render_error(&e, input),
        }
    }
}

fn setup_reedline() -> Result<(Reedline, DefaultPrompt)> {
    let mut keybindings = default_emacs_keybindings();
    keybindings.add_binding(
        KeyModifiers::ALT,
        KeyCode::Enter,
        ReedlineEvent::Edit(vec![EditCommand::InsertNewline]),
    );

    let mut line_editor = Reedline::create()
        .with_highlighter(Box::new(Highlighter))
        .with_validator(Box::new(BracketValidator))
        .with_edit_mode(Box::new(Emacs::new(keybindings)));

    if let Some(dir) = dirs::data_dir() {
        let dir = dir.join("kestrel");
        std::fs::create_dir_all(&dir).into_diagnostic()?;
        let path = dir.join("history.txt");
        debug!(path = %path.display(), "Loading REPL history");
        let history = FileBackedHistory::with_file(HISTORY_SIZE, path).into_diagnostic()?;
        line_editor = line_editor.with_history(Box::new(history));
    }

    let prompt = DefaultPrompt::new(
        DefaultPromptSegment::Basic("kestrel".to_string()),
        DefaultPromptSegment::Empty,
    );
    Ok((line_editor, prompt))
}

fn main() -> Result<()> {
    let args = Args::parse();

    use tracing_subscriber::{EnvFilter, fmt};

    // RUST_LOG controls the level; WARN when unset.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn"))
        .into_diagnostic()?;

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let session = Session {
        engine: build_engine(&args),
        vars: MapVariableResolverFactory::with_variables(
            args.define
                .iter()
                .map(|(name, value)| (name.as_str(), define_value(value))),
        ),
        debug_parse: args.debug_parse,
    };

    if let Some(expr) = &args.expression {
        session.interpret(expr);
        return Ok(());
    }

    if atty::is(atty::Stream::Stdin) {
        let (mut line_editor, prompt) = setup_reedline()?;

        println!("Kestrel REPL - Type expressions to evaluate (Ctrl+D or Ctrl+C to exit)");

        loop {
            match line_editor.read_line(&prompt).into_diagnostic()? {
                Signal::Success(buffer) => session.interpret(&buffer),
                Signal::CtrlD | Signal::CtrlC => {
                    println!("\nGoodbye!");
                    return Ok(());
                }
            }
        }
    }

    // Pipe mode: one expression per line.
    let stdin = std::io::stdin();
    for line in BufReader::new(stdin.lock()).lines() {
        session.interpret(&line.into_diagnostic()?);
    }
    Ok(())
}
