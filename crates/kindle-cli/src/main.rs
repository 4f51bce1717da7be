use anyhow::Context as _;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use kindle_artifact::Artifact;
use kindle_core::{init_tracing, AppConfig, Application, LogFormat, ReloadOutcome};
use kindle_resolve::Namespace;
use kindle_watch::FingerprintMode;
use std::path::PathBuf;
use std::time::Duration;

mod source;

use source::LoadedSource;

fn cli() -> Command {
    Command::new("kindle")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Boot a Kindle application, resolve artifacts and watch for reloads")
        .subcommand_required(true)
        .arg(
            Arg::new("root")
                .long("root")
                .global(true)
                .default_value(".")
                .value_parser(value_parser!(PathBuf))
                .help("Application root"),
        )
        .arg(
            Arg::new("env")
                .long("env")
                .global(true)
                .help("Environment name (overrides config/kindle.toml)"),
        )
        .arg(
            Arg::new("load-path")
                .long("load-path")
                .global(true)
                .action(ArgAction::Append)
                .help("Directory searched for definitions, relative to the root [default: app]"),
        )
        .arg(
            Arg::new("ext")
                .long("ext")
                .global(true)
                .default_value("rb")
                .help("Source file extension"),
        )
        .arg(
            Arg::new("content")
                .long("content")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Fingerprint file contents instead of metadata"),
        )
        .arg(
            Arg::new("log")
                .long("log")
                .global(true)
                .help("Tracing filter when RUST_LOG is unset"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(Command::new("plan").about("Print the initializer order"))
        .subcommand(Command::new("names").about("List every name the load paths define"))
        .subcommand(
            Command::new("resolve")
                .about("Resolve names and describe the artifacts")
                .arg(Arg::new("names").required(true).num_args(1..).help("Names to resolve")),
        )
        .subcommand(
            Command::new("watch")
                .about("Poll for changes and report reloads until interrupted")
                .arg(
                    Arg::new("interval")
                        .long("interval")
                        .default_value("500")
                        .value_parser(value_parser!(u64))
                        .help("Poll interval in milliseconds"),
                )
                .arg(
                    Arg::new("names")
                        .num_args(0..)
                        .help("Names re-resolved after every reload"),
                ),
        )
}

fn build(matches: &ArgMatches) -> anyhow::Result<Application> {
    let root = matches
        .get_one::<PathBuf>("root")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("."));
    let extension = matches.get_one::<String>("ext").map_or("rb", String::as_str);
    let load_paths: Vec<String> = matches
        .get_many::<String>("load-path")
        .map_or_else(|| vec!["app".to_string()], |paths| paths.cloned().collect());

    let lookup = source::lookup(&root, &load_paths, extension);
    let mut config = AppConfig::new();
    if matches.get_flag("content") {
        config = config.with_fingerprint(FingerprintMode::Content);
    }
    if let Some(filter) = matches.get_one::<String>("log") {
        config = config.with_log_filter(filter.clone());
    }
    for pattern in lookup.watch_patterns() {
        config = config.with_watch(pattern);
    }

    let mut builder = Application::builder(&root).config(config).lookup(lookup);
    if let Some(environment) = matches.get_one::<String>("env") {
        builder = builder.environment(environment.clone());
    }
    Ok(builder.build()?)
}

fn describe(name: &str, artifact: &Artifact) -> String {
    if let Some(loaded) = artifact.downcast_ref::<LoadedSource>() {
        let requires: Vec<&str> = loaded.requires.iter().map(|n| n.as_str()).collect();
        format!(
            "{name}: {} ({} bytes, {}){}",
            loaded.path.display(),
            loaded.bytes,
            loaded.digest.short(),
            if requires.is_empty() {
                String::new()
            } else {
                format!(" requires {}", requires.join(", "))
            }
        )
    } else if let Some(namespace) = artifact.downcast_ref::<Namespace>() {
        format!("{name}: namespace {}", namespace.dir.display())
    } else {
        format!("{name}: {}", artifact.type_name())
    }
}

fn resolve_all<'a>(app: &Application, names: impl IntoIterator<Item = &'a String>) {
    for name in names {
        match app.resolve_tagged(name) {
            Ok(resolved) => println!(
                "{} [{}]",
                describe(name, &resolved.artifact),
                resolved.generation
            ),
            Err(err) => eprintln!("{name}: {err}"),
        }
    }
}

fn print_outcome(outcome: &ReloadOutcome) {
    if let ReloadOutcome::Reloaded { evicted, generation } = outcome {
        let names: Vec<&str> = evicted.iter().map(|n| n.as_str()).collect();
        let evicted = if names.is_empty() {
            "nothing".to_string()
        } else {
            names.join(", ")
        };
        println!("reloaded -> {generation}: evicted {evicted}");
    }
}

async fn watch(app: &Application, interval: Duration, names: &[String]) -> anyhow::Result<()> {
    resolve_all(app, names);

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let outcome = app.before_dispatch()?;
                if outcome.is_reload() {
                    print_outcome(&outcome);
                    resolve_all(app, names);
                }
            }
            result = &mut shutdown => {
                result.context("waiting for ctrl-c")?;
                tracing::info!("interrupted");
                return Ok(());
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();

    let format = if matches.get_flag("json") {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    init_tracing(matches.get_one::<String>("log").map(String::as_str), format);

    let mut app = build(&matches)?;

    if let Some(("plan", _)) = matches.subcommand() {
        for (phase, step) in app.initializers().plan() {
            println!("{phase:<14} {step}");
        }
        return Ok(());
    }

    app.initialize().context("boot failed")?;

    match matches.subcommand() {
        Some(("names", _)) => {
            for name in app.resolver().strategy().known_names()? {
                println!("{name}");
            }
        }
        Some(("resolve", args)) => {
            resolve_all(&app, args.get_many::<String>("names").into_iter().flatten());
        }
        Some(("watch", args)) => {
            let interval = Duration::from_millis(args.get_one::<u64>("interval").copied().unwrap_or(500));
            let names: Vec<String> = args
                .get_many::<String>("names")
                .map(|names| names.cloned().collect())
                .unwrap_or_default();
            watch(&app, interval, &names).await?;
        }
        Some((other, _)) => anyhow::bail!("unknown command '{other}'"),
        None => anyhow::bail!("no command given"),
    }

    let removed = app.teardown();
    tracing::debug!(removed, "shutdown");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn resolves_from_load_path() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("app/admin")).unwrap();
        std::fs::write(dir.path().join("app/author.rb"), "class Author").unwrap();
        std::fs::write(
            dir.path().join("app/admin/post.rb"),
            "# requires: Author\nclass Admin::Post",
        )
        .unwrap();

        let root = dir.path().to_string_lossy().into_owned();
        let matches = cli().get_matches_from(["kindle", "--root", root.as_str(), "resolve", "Admin::Post"]);
        let mut app = build(&matches).unwrap();
        app.initialize().unwrap();

        let post = app.resolve("Admin::Post").unwrap();
        let loaded = post.downcast_ref::<LoadedSource>().unwrap();
        assert_eq!(loaded.requires.len(), 1);
        assert!(app.registry().contains("Author"));
        assert!(describe("Admin::Post", &post).contains("requires Author"));
        assert!(describe("Admin", &app.resolve("Admin").unwrap()).contains("namespace"));
    }

    #[test]
    fn env_flag_selects_environment() {
        let dir = tempfile::TempDir::new().unwrap();
        let root = dir.path().to_string_lossy().into_owned();
        let matches = cli().get_matches_from(["kindle", "--root", root.as_str(), "--env", "test", "plan"]);
        let mut app = build(&matches).unwrap();
        app.initialize().unwrap();
        assert_eq!(app.config().unwrap().environment, "test");
    }
}
