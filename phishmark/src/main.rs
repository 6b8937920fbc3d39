use colored::Colorize;
use phishmark::Settings;
use phishmark::commands::command_argument_builder;
use phishmark::handlers;
use tracing_subscriber::EnvFilter;

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    let settings = match Settings::load(chosen_command.get_one::<String>("config").map(String::as_str)) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{} {:#}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };
    init_tracing(&settings);

    if !quiet {
        handlers::print_banner();
    }

    let outcome = match chosen_command.subcommand() {
        Some(("analyze", sub_matches)) => handlers::handle_analyze(sub_matches, &settings)
            .await
            .map(|_| ()),
        Some(("batch", sub_matches)) => handlers::handle_batch(sub_matches, &settings, quiet)
            .await
            .map(|_| ()),
        Some(("normalize", sub_matches)) => handlers::handle_normalize(sub_matches, quiet).map(|_| ()),
        Some(("schema", _)) => {
            handlers::handle_schema();
            Ok(())
        }
        _ => unreachable!("clap should ensure we don't get here"),
    };

    if let Err(e) = outcome {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}
