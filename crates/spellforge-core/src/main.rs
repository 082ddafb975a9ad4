use clap::{value_parser, Arg, ArgAction, Command};
use spellforge_core::{
    CommandDispatcher, ForgeConfig, ModificationOrchestrator, ScriptGenerationOrchestrator,
    SessionBudget, StaticResponder,
};
use spellforge_runtime::{HeadlessHost, NameChainCapabilities, PluginRegistry};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Command::new("spellforge")
        .version("0.1.0")
        .about("Runtime code-generation and hot-loading REPL (canned offline generator)")
        .arg(
            Arg::new("source-root")
                .long("source-root")
                .default_value("scripts")
                .value_parser(value_parser!(PathBuf))
                .help("Root of the script source tree searched for modification targets"),
        )
        .arg(
            Arg::new("scripts-dir")
                .long("scripts-dir")
                .default_value("generated_scripts")
                .value_parser(value_parser!(PathBuf))
                .help("Directory generated scripts are saved under"),
        )
        .arg(
            Arg::new("backups-dir")
                .long("backups-dir")
                .default_value("backups")
                .value_parser(value_parser!(PathBuf))
                .help("Directory pre-modification backups are saved under"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file (overrides the directory flags)"),
        )
        .arg(
            Arg::new("max-modifications")
                .long("max-modifications")
                .default_value("20")
                .value_parser(value_parser!(u32))
                .help("Per-session modification cap"),
        )
        .arg(
            Arg::new("no-validate")
                .long("no-validate")
                .action(ArgAction::SetTrue)
                .help("Skip compile validation before applying modifications"),
        );

    let matches = cli.get_matches();

    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => ForgeConfig::from_path(path)?,
        None => ForgeConfig::new()
            .with_source_root(matches.get_one::<PathBuf>("source-root").unwrap().clone())
            .with_scripts_dir(matches.get_one::<PathBuf>("scripts-dir").unwrap().clone())
            .with_backups_dir(matches.get_one::<PathBuf>("backups-dir").unwrap().clone())
            .with_max_modifications(*matches.get_one::<u32>("max-modifications").unwrap())
            .with_validation(!matches.get_flag("no-validate")),
    };
    config.ensure_directories()?;

    let generator = Arc::new(StaticResponder::with_defaults());
    let host = Arc::new(HeadlessHost::new());
    let capabilities = Arc::new(NameChainCapabilities::new());
    let registry = Arc::new(PluginRegistry::new());
    let budget = Arc::new(SessionBudget::new(config.max_modifications_per_session));

    let modifications = Arc::new(ModificationOrchestrator::new(
        config.clone(),
        generator.clone(),
        host.clone(),
        capabilities.clone(),
        registry.clone(),
        budget.clone(),
    ));
    let generation = Arc::new(ScriptGenerationOrchestrator::new(
        config,
        generator,
        host.clone(),
        capabilities,
        registry.clone(),
    ));
    let dispatcher = CommandDispatcher::new(modifications, generation, registry, budget, host);

    println!("spellforge ready - type /help for commands, ctrl-d to exit");
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }

        println!("{}", dispatcher.dispatch(&line).await);
    }

    println!("\n{}", dispatcher.session_report());
    Ok(())
}
