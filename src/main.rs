use std::io::{self, BufRead, Read, Write};

use anyhow::{Result, anyhow};
use clap::Parser;
use llm_cultural_translator::{Config, ProviderImpl, Translator, format};

#[derive(Parser, Debug)]
#[command(
    name = "llm-cultural-translator",
    version,
    about = "Detect, then translate text with cultural context using an LLM"
)]
struct Cli {
    /// Target language name or code (default: from settings, english)
    #[arg(short = 'l', long = "lang")]
    lang: Option<String>,

    /// Provider or provider:model (openrouter, openai, claude)
    #[arg(short = 'm', long = "model")]
    model: Option<String>,

    /// API key (overrides environment variables)
    #[arg(short = 'k', long = "key")]
    key: Option<String>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Print the exchange as JSON
    #[arg(long = "json")]
    json: bool,

    /// Show supported languages and exit
    #[arg(long = "show-languages")]
    show_languages: bool,

    /// Append token usage to output
    #[arg(long = "with-using-tokens")]
    with_using_tokens: bool,

    /// Append model name to output
    #[arg(long = "with-using-model")]
    with_using_model: bool,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,

    /// Interactive mode
    #[arg(short = 'i', long = "interactive")]
    interactive: bool,
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            lang: self.lang.clone(),
            model: self.model.clone(),
            key: self.key.clone(),
            settings_path: self.read_settings.clone(),
            json: self.json,
            show_languages: self.show_languages,
            with_using_tokens: self.with_using_tokens,
            with_using_model: self.with_using_model,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    llm_cultural_translator::logging::init(cli.verbose)?;
    if cli.interactive && !cli.show_languages {
        return run_interactive(cli.config()).await;
    }

    let input = if cli.show_languages {
        None
    } else {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|err| anyhow!("failed to read stdin as UTF-8 text: {}", err))?;
        Some(buffer)
    };

    let output = llm_cultural_translator::run(cli.config(), input).await?;
    println!("{}", output);
    Ok(())
}

struct InteractiveState {
    config: Config,
    history_limit: usize,
    translator: Translator<ProviderImpl>,
}

async fn run_interactive(config: Config) -> Result<()> {
    let settings = llm_cultural_translator::load_settings(&config)?;
    let translator = llm_cultural_translator::build_translator(&config, &settings)?;
    let mut state = InteractiveState {
        config,
        history_limit: settings.history_display_limit,
        translator,
    };

    println!("Interactive mode. Use /quit or /exit to finish.");
    println!("Type /help to see available commands.");
    println!(
        "Translating into {}.",
        state.translator.target_language().display_name()
    );

    let mut line = String::new();
    let stdin = io::stdin();
    let mut stdin_lock = stdin.lock();
    loop {
        line.clear();
        print!("> ");
        io::stdout().flush()?;
        if stdin_lock.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.starts_with('/') {
            if handle_interactive_command(input, &mut state)? {
                break;
            }
            continue;
        }

        match state.translator.run_turn_in_session(input).await {
            Ok(exchange) => {
                println!("{}", llm_cultural_translator::format_turn(&exchange, &state.config)?)
            }
            Err(err) => eprintln!("error ({}): {}", err.kind(), err),
        }
    }
    Ok(())
}

fn handle_interactive_command(input: &str, state: &mut InteractiveState) -> Result<bool> {
    let (command, arg) = match input.trim().split_once(char::is_whitespace) {
        Some((command, arg)) => (command, arg.trim()),
        None => (input.trim(), ""),
    };

    match command {
        "/quit" | "/exit" => return Ok(true),
        "/help" => print_interactive_help(),
        "/languages" => println!("{}", llm_cultural_translator::format_languages()),
        "/history" => println!(
            "{}",
            format::render_history(state.translator.session().history(), state.history_limit)
        ),
        "/clear" => {
            state.translator.clear_history();
            println!("history cleared");
        }
        "/lang" => {
            if arg.is_empty() {
                println!("lang: {}", state.translator.target_language());
            } else {
                match state.translator.set_target_language(arg) {
                    Ok(language) => println!("lang set to {}", language),
                    Err(err) => eprintln!("error ({}): {}", err.kind(), err),
                }
            }
        }
        "/with-using-model" => {
            state.config.with_using_model = parse_toggle(arg, state.config.with_using_model)?;
            println!("with-using-model: {}", state.config.with_using_model);
        }
        "/with-using-tokens" => {
            state.config.with_using_tokens = parse_toggle(arg, state.config.with_using_tokens)?;
            println!("with-using-tokens: {}", state.config.with_using_tokens);
        }
        "/json" => {
            state.config.json = parse_toggle(arg, state.config.json)?;
            println!("json: {}", state.config.json);
        }
        _ => eprintln!("unknown command: {}", command),
    }
    Ok(false)
}

fn parse_toggle(arg: &str, current: bool) -> Result<bool> {
    let value = arg.trim();
    if value.is_empty() {
        return Ok(!current);
    }
    match value.to_lowercase().as_str() {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        _ => Err(anyhow!("expected on/off/true/false/1/0")),
    }
}

fn print_interactive_help() {
    println!("Commands:");
    println!("  /quit, /exit                 Exit interactive mode");
    println!("  /lang <name|code>            Set target language (or show current)");
    println!("  /languages                   Show supported languages");
    println!("  /history                     Show recent translations, newest first");
    println!("  /clear                       Clear the session history");
    println!("  /with-using-model [on|off]   Toggle model suffix output");
    println!("  /with-using-tokens [on|off]  Toggle token usage output");
    println!("  /json [on|off]               Toggle JSON output");
}
