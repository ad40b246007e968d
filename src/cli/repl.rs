mod highlighter;
mod prompt;

use std::path::Path;
use std::str::FromStr;

use nu_ansi_term::{Color, Style};
use reedline::{
    default_emacs_keybindings, default_vi_insert_keybindings, default_vi_normal_keybindings,
    ColumnarMenu, DefaultCompleter, EditCommand, EditMode, Emacs, KeyCode, KeyModifiers,
    MenuBuilder, Reedline, ReedlineEvent, ReedlineMenu, Signal, Vi,
};

use crate::client::GenerationRequest;
use crate::color::{self, MaybePaint};
use crate::config::{self, Config};
use crate::providers::ProviderIdentifier;
use crate::schema::{read_schema_file, schema_name_from_path};
use crate::utils::errors::describe;
use crate::{die, error, warn, ReplArgs};

use self::highlighter::Highlighter;
use self::prompt::{completion_marker, Prompt};
use super::print_insights;
use super::session::{report_generation_failure, Session};

const COMMANDS: [&str; 5] = ["/schema", "/provider", "/clear", "/help", "/exit"];

const HELP: &str = "\
/schema [FILE]     load a schema file, or show the loaded schema
/provider [NAME]   switch provider, or show the active one
/clear             forget the loaded schema
/help              show this message
/exit              leave (Ctrl-D works too)
anything else is sent as a prompt";

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Command {
    Schema(Option<String>),
    Provider(Option<String>),
    Clear,
    Help,
    Exit,
    Unknown(String),
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Input {
    Prompt(String),
    Command(Command),
    Empty,
}

fn argument(rest: &str) -> Option<String> {
    let rest = rest.trim();

    (!rest.is_empty()).then(|| rest.to_string())
}

pub(crate) fn parse_input(line: &str) -> Input {
    let line = line.trim();

    if line.is_empty() {
        return Input::Empty;
    }

    if !line.starts_with('/') {
        return Input::Prompt(line.to_string());
    }

    let (name, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));

    let command = match name {
        "/schema" => Command::Schema(argument(rest)),
        "/provider" => Command::Provider(argument(rest)),
        "/clear" => Command::Clear,
        "/help" => Command::Help,
        "/exit" | "/quit" => Command::Exit,
        other => Command::Unknown(other.to_string()),
    };

    Input::Command(command)
}

fn edit_mode(keybindings: config::Keybindings) -> Box<dyn EditMode> {
    let completion = ReedlineEvent::UntilFound(vec![
        ReedlineEvent::Menu("completion_menu".to_string()),
        ReedlineEvent::MenuNext,
    ]);

    match keybindings {
        config::Keybindings::Vi => {
            let mut insert_bindings = default_vi_insert_keybindings();

            insert_bindings.add_binding(KeyModifiers::NONE, KeyCode::Tab, completion);

            Box::new(Vi::new(insert_bindings, default_vi_normal_keybindings()))
        }
        config::Keybindings::Emacs => {
            let mut keybindings = default_emacs_keybindings();

            keybindings.add_binding(KeyModifiers::NONE, KeyCode::Tab, completion);

            keybindings.add_binding(
                KeyModifiers::CONTROL,
                KeyCode::Char('j'),
                ReedlineEvent::Edit(vec![EditCommand::InsertNewline]),
            );

            Box::new(Emacs::new(keybindings))
        }
    }
}

/// A schema loaded into the interactive session.
struct LoadedSchema {
    name: String,
    text: String,
}

struct Repl {
    line_editor: Reedline,
    prompt: Prompt,
}

impl Repl {
    fn new(keybindings: config::Keybindings, provider: ProviderIdentifier) -> Repl {
        let mut completer = Box::new(DefaultCompleter::with_inclusions(&['/']));

        completer.insert(COMMANDS.iter().map(|c| c.to_string()).collect());

        let completion_menu = Box::new(
            ColumnarMenu::default()
                .with_name("completion_menu")
                .with_marker(&completion_marker().to_string())
                .with_text_style(Style::new().fg(Color::Default))
                .with_selected_text_style(Style::new().fg(Color::Blue).on(Color::DarkGray))
                .with_selected_match_text_style(
                    Style::new().fg(Color::Blue).bold().on(Color::DarkGray),
                ),
        );

        let line_editor = Reedline::create()
            .with_completer(completer)
            .with_menu(ReedlineMenu::EngineCompleter(completion_menu))
            .with_edit_mode(edit_mode(keybindings))
            .with_highlighter(Box::new(Highlighter));

        Repl {
            line_editor,
            prompt: Prompt::new(provider),
        }
    }

    /// The next non-empty input, or `None` once the user is done.
    fn read(&mut self) -> Option<Input> {
        loop {
            match self.line_editor.read_line(&self.prompt) {
                Ok(Signal::Success(line)) => match parse_input(&line) {
                    Input::Empty => continue,
                    input => return Some(input),
                },
                Ok(Signal::CtrlC) => continue,
                Ok(Signal::CtrlD) => return None,
                Err(err) => {
                    error!("failed to read input: {}", err);
                    return None;
                }
            }
        }
    }
}

fn load_schema_file(path: &Path) -> Option<LoadedSchema> {
    match read_schema_file(path) {
        Ok(text) => {
            if text.trim().is_empty() {
                warn!("the schema in \"{}\" is empty", path.display());
            }

            Some(LoadedSchema {
                name: schema_name_from_path(path),
                text,
            })
        }
        Err(err) => {
            error!("{}", describe(&err));
            None
        }
    }
}

fn describe_schema(schema: &Option<LoadedSchema>) {
    match schema {
        Some(schema) => println!(
            "schema \"{}\" is loaded ({} lines)",
            schema.name,
            schema.text.lines().count()
        ),
        None => println!("no schema is loaded"),
    }
}

pub(crate) async fn repl_cmd(config: &Config, args: &ReplArgs) {
    let mut session = Session::open(config, !args.no_save);

    let mut schema = match session.schema(&args.source).await {
        Ok(Some(text)) => {
            let name = match (&args.source.schema, &args.source.schema_name) {
                (Some(path), _) => schema_name_from_path(path),
                (None, Some(name)) => name.clone(),
                (None, None) => String::new(),
            };

            Some(LoadedSchema { name, text })
        }
        Ok(None) => None,
        Err(err) => die!("{}", describe(&err)),
    };

    let mut provider = match session.active_provider() {
        Ok(provider) => provider,
        Err(err) => die!("{}", describe(&err)),
    };

    let mut repl = Repl::new(config.keybindings, provider);

    println!(
        "{} version {}, /help lists the commands",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    describe_schema(&schema);

    while let Some(input) = repl.read() {
        match input {
            Input::Empty => {}
            Input::Prompt(prompt) => {
                let text = schema.as_ref().map(|s| s.text.as_str()).unwrap_or("");

                if text.is_empty() {
                    warn!("no schema is loaded, the generated SQL may not match your database");
                }

                let request = GenerationRequest::new(prompt, text);

                match session.generate(None, &request).await {
                    Ok(sql) => {
                        println!("{}", color::SQL_TEXT.maybe_paint(sql.as_str()));

                        if !args.no_insights {
                            print_insights(&sql);
                        }

                        println!();
                    }
                    Err(err) => report_generation_failure(&err),
                }
            }
            Input::Command(Command::Schema(Some(path))) => {
                if let Some(loaded) = load_schema_file(Path::new(&path)) {
                    schema = Some(loaded);
                    describe_schema(&schema);
                }
            }
            Input::Command(Command::Schema(None)) => describe_schema(&schema),
            Input::Command(Command::Provider(Some(name))) => {
                let requested = match ProviderIdentifier::from_str(&name) {
                    Ok(requested) => requested,
                    Err(_) => {
                        error!("unknown provider \"{}\"", name);
                        continue;
                    }
                };

                match session.select_provider(requested) {
                    Ok(()) => {
                        provider = requested;
                        repl.prompt.set_provider(provider);
                    }
                    Err(err) => error!("{}", describe(&err)),
                }
            }
            Input::Command(Command::Provider(None)) => {
                println!("{} ({})", provider.display_name(), provider)
            }
            Input::Command(Command::Clear) => schema = None,
            Input::Command(Command::Help) => println!("{}", HELP),
            Input::Command(Command::Exit) => break,
            Input::Command(Command::Unknown(name)) => {
                error!("unknown command \"{}\", try /help", name)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input() {
        assert_eq!(parse_input("   "), Input::Empty);
        assert_eq!(
            parse_input("  top 5 customers by revenue "),
            Input::Prompt("top 5 customers by revenue".to_string())
        );
        assert_eq!(
            parse_input("/schema ./db/shop.sql"),
            Input::Command(Command::Schema(Some("./db/shop.sql".to_string())))
        );
        assert_eq!(parse_input("/schema"), Input::Command(Command::Schema(None)));
        assert_eq!(
            parse_input("/provider   openrouter"),
            Input::Command(Command::Provider(Some("openrouter".to_string())))
        );
        assert_eq!(parse_input("/clear"), Input::Command(Command::Clear));
        assert_eq!(parse_input("/exit"), Input::Command(Command::Exit));
        assert_eq!(
            parse_input("/drop table"),
            Input::Command(Command::Unknown("/drop".to_string()))
        );
    }

    #[test]
    fn test_load_schema_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("warehouse.sql");
        std::fs::write(&path, "CREATE TABLE bins (id int);").unwrap();

        let loaded = load_schema_file(&path).unwrap();

        assert_eq!(loaded.name, "warehouse");
        assert_eq!(loaded.text, "CREATE TABLE bins (id int);");

        assert!(load_schema_file(&dir.path().join("warehouse.xlsx")).is_none());
    }
}
