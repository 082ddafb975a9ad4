//! Command surface
//!
//! The command grammar the chat layer speaks to the core:
//! `/generate` and `/add` create a new script, `/modify` and `/code`
//! change existing code, `/instantiate` attaches a generated script by
//! name, `/list` enumerates session state, `/help` prints usage. Every
//! dispatch returns a text summary; there are no process exit codes
//! because this runs embedded in a host application.

use crate::budget::SessionBudget;
use crate::generate::ScriptGenerationOrchestrator;
use crate::modify::ModificationOrchestrator;
use spellforge_runtime::{HostRuntime, PluginRegistry};
use std::sync::Arc;

/// A parsed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Generate a new script from a description
    Generate(String),
    /// Modify existing code from a description
    Modify(String),
    /// Attach a previously generated script by name
    Instantiate {
        /// Script name
        name: String,
        /// Replace an already-loaded instance of the same name
        replace: bool,
    },
    /// List loaded plugins and generated scripts
    List,
    /// Show usage
    Help,
}

/// Command parsing failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// Input was empty
    #[error("empty command")]
    Empty,

    /// A command that needs an argument got none
    #[error("missing argument: usage `{0}`")]
    MissingArgument(&'static str),

    /// Not a known command
    #[error("unknown command `{0}`; type /help for available commands")]
    Unknown(String),
}

/// Parse one command line.
pub fn parse_command(input: &str) -> Result<Command, CommandError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CommandError::Empty);
    }

    for prefix in ["/generate", "/add"] {
        if let Some(rest) = strip_command(input, prefix) {
            return if rest.is_empty() {
                Err(CommandError::MissingArgument("/generate <description>"))
            } else {
                Ok(Command::Generate(rest.to_string()))
            };
        }
    }

    for prefix in ["/modify", "/code"] {
        if let Some(rest) = strip_command(input, prefix) {
            return if rest.is_empty() {
                Err(CommandError::MissingArgument("/modify <description>"))
            } else {
                Ok(Command::Modify(rest.to_string()))
            };
        }
    }

    if let Some(rest) = strip_command(input, "/instantiate") {
        if rest.is_empty() {
            return Err(CommandError::MissingArgument("/instantiate <name>"));
        }
        let mut replace = false;
        let mut name_parts = Vec::new();
        for part in rest.split_whitespace() {
            if part == "--replace" {
                replace = true;
            } else {
                name_parts.push(part);
            }
        }
        if name_parts.is_empty() {
            return Err(CommandError::MissingArgument("/instantiate <name>"));
        }
        return Ok(Command::Instantiate {
            name: name_parts.join(" "),
            replace,
        });
    }

    if strip_command(input, "/list").is_some() {
        return Ok(Command::List);
    }
    if strip_command(input, "/help").is_some() {
        return Ok(Command::Help);
    }

    Err(CommandError::Unknown(
        input.split_whitespace().next().unwrap_or(input).to_string(),
    ))
}

/// Strip a command prefix, requiring a word boundary after it.
fn strip_command<'a>(input: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = input.strip_prefix(prefix)?;
    if rest.is_empty() {
        return Some("");
    }
    rest.starts_with(char::is_whitespace).then(|| rest.trim())
}

/// Routes parsed commands to the orchestrators.
pub struct CommandDispatcher {
    modifications: Arc<ModificationOrchestrator>,
    generation: Arc<ScriptGenerationOrchestrator>,
    registry: Arc<PluginRegistry>,
    budget: Arc<SessionBudget>,
    host: Arc<dyn HostRuntime>,
}

impl std::fmt::Debug for CommandDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDispatcher").finish_non_exhaustive()
    }
}

impl CommandDispatcher {
    /// Create a dispatcher over the session's orchestrators.
    #[must_use]
    pub fn new(
        modifications: Arc<ModificationOrchestrator>,
        generation: Arc<ScriptGenerationOrchestrator>,
        registry: Arc<PluginRegistry>,
        budget: Arc<SessionBudget>,
        host: Arc<dyn HostRuntime>,
    ) -> Self {
        Self {
            modifications,
            generation,
            registry,
            budget,
            host,
        }
    }

    /// Parse and execute one command line, returning its summary.
    pub async fn dispatch(&self, input: &str) -> String {
        let command = match parse_command(input) {
            Ok(command) => command,
            Err(e) => return e.to_string(),
        };

        match command {
            Command::Generate(description) => self.generation.generate_script(&description).await,
            Command::Modify(description) => {
                self.modifications
                    .process_modification_request(&description)
                    .await
            }
            Command::Instantiate { name, replace } => self.generation.instantiate(&name, replace),
            Command::List => self.list(),
            Command::Help => help_text(),
        }
    }

    fn list(&self) -> String {
        let mut lines = Vec::new();

        let plugins = self.registry.list();
        if plugins.is_empty() {
            lines.push("No plugins loaded.".to_string());
        } else {
            lines.push(format!("Loaded plugins ({}):", plugins.len()));
            for name in plugins {
                lines.push(format!("- {name}"));
            }
        }

        let scripts = self.generation.generated_scripts();
        if scripts.is_empty() {
            lines.push("No scripts have been generated yet.".to_string());
        } else {
            lines.push(format!("Generated scripts ({}):", scripts.len()));
            for path in scripts {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                lines.push(format!("- {name}"));
            }
        }

        lines.join("\n")
    }

    /// Human-readable summary of the session: loaded plugins, generated
    /// scripts, budget state, and host libraries.
    #[must_use]
    pub fn session_report(&self) -> String {
        let mut lines = vec!["# Session Report".to_string(), String::new()];

        lines.push(format!(
            "Modifications applied: {}/{}",
            self.budget.applied(),
            self.budget.max()
        ));
        lines.push(String::new());

        lines.push(format!("## Loaded plugins ({})", self.registry.len()));
        for name in self.registry.list() {
            if let Some(entry) = self.registry.get(&name) {
                lines.push(format!(
                    "- {} ({}, {})",
                    entry.name,
                    entry.instance.type_name,
                    entry.instance.strategy
                ));
            }
        }
        lines.push(String::new());

        let scripts = self.generation.generated_scripts();
        lines.push(format!("## Generated scripts ({})", scripts.len()));
        for path in scripts {
            lines.push(format!("- {}", path.display()));
        }
        lines.push(String::new());

        let libraries = self.host.loaded_library_paths();
        lines.push(format!("## Host libraries ({})", libraries.len()));
        for path in libraries {
            lines.push(format!("- {}", path.display()));
        }

        lines.join("\n")
    }
}

fn help_text() -> String {
    [
        "Available commands:",
        "/generate <description> - Generate a new script from a description",
        "/add <description> - Alias of /generate",
        "/modify <description> - Modify existing code to match a description",
        "/code <description> - Alias of /modify",
        "/instantiate <name> [--replace] - Attach a previously generated script",
        "/list - Show loaded plugins and generated scripts",
        "/help - Show this help",
        "",
        "Examples:",
        "/generate a fireball that damages enemies on impact",
        "/modify make the player move twice as fast",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_and_alias_parse() {
        assert_eq!(
            parse_command("/generate a fireball spell").unwrap(),
            Command::Generate("a fireball spell".to_string())
        );
        assert_eq!(
            parse_command("/add a fireball spell").unwrap(),
            Command::Generate("a fireball spell".to_string())
        );
    }

    #[test]
    fn modify_and_alias_parse() {
        assert_eq!(
            parse_command("/modify faster player").unwrap(),
            Command::Modify("faster player".to_string())
        );
        assert_eq!(
            parse_command("/code faster player").unwrap(),
            Command::Modify("faster player".to_string())
        );
    }

    #[test]
    fn instantiate_parses_replace_flag() {
        assert_eq!(
            parse_command("/instantiate FireballSpell").unwrap(),
            Command::Instantiate {
                name: "FireballSpell".to_string(),
                replace: false
            }
        );
        assert_eq!(
            parse_command("/instantiate FireballSpell --replace").unwrap(),
            Command::Instantiate {
                name: "FireballSpell".to_string(),
                replace: true
            }
        );
    }

    #[test]
    fn bare_commands_parse() {
        assert_eq!(parse_command("/list").unwrap(), Command::List);
        assert_eq!(parse_command("  /help  ").unwrap(), Command::Help);
    }

    #[test]
    fn missing_arguments_are_reported() {
        assert!(matches!(
            parse_command("/generate"),
            Err(CommandError::MissingArgument(_))
        ));
        assert!(matches!(
            parse_command("/instantiate --replace"),
            Err(CommandError::MissingArgument(_))
        ));
    }

    #[test]
    fn unknown_and_empty_are_reported() {
        assert!(matches!(
            parse_command("/teleport home"),
            Err(CommandError::Unknown(_))
        ));
        assert!(matches!(parse_command("   "), Err(CommandError::Empty)));
    }

    #[test]
    fn prefix_needs_word_boundary() {
        // "/generated" must not parse as "/generate d".
        assert!(matches!(
            parse_command("/generated thing"),
            Err(CommandError::Unknown(_))
        ));
    }
}
