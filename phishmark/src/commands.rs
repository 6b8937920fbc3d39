use crate::CLAP_STYLING;
use clap::{arg, command};
use std::path::PathBuf;

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("phishmark")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("phishmark")
        .about("Heuristic phishing feature extraction for URLs, pages and datasets")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress banner and progress output")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(-c --"config" <PATH>)
                .required(false)
                .global(true)
                .help("Settings file (default: ~/.config/phishmark/config.toml)"),
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            command!("analyze")
                .about("Extract the feature record for a single URL")
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("The URL to analyze"),
                )
                .arg(
                    arg!(--"offline")
                        .required(false)
                        .help("Do not fetch the page; only URL-derived features are computed")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(lookup_arg())
                .arg(lookup_file_arg())
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: display to screen)")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            command!("batch")
                .about("Extract feature records for a list of URLs into a CSV")
                .arg(
                    arg!(-i --"input" <PATH>)
                        .required(true)
                        .help("Newline-delimited URL list, or a CSV with a url column")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(true)
                        .help("Feature CSV to write")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--"offline")
                        .required(false)
                        .help("Do not fetch pages; only URL-derived features are computed")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(lookup_arg())
                .arg(lookup_file_arg())
                .arg(
                    arg!(-t --"threads" <NUM_WORKERS>)
                        .required(false)
                        .help("The number of concurrent fetch workers (default: 10)")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(classifier_only_arg()),
        )
        .subcommand(
            command!("normalize")
                .about("Normalize a dataset of raw measurements into canonical ternary features")
                .arg(
                    arg!(-i --"input" <PATH>)
                        .required(true)
                        .help("Raw dataset CSV")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(true)
                        .help("Normalized CSV to write")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(classifier_only_arg())
                .arg(
                    arg!(--"fill-sentinel")
                        .required(false)
                        .help("Write -1 instead of an empty cell where a value is missing")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"keep-url")
                        .required(false)
                        .help("Copy the input url column into the output")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
        .subcommand(command!("schema").about("Print the canonical feature schema"))
}

fn lookup_arg() -> clap::Arg {
    arg!(--"lookup")
        .required(false)
        .help("Query DNS, WHOIS and page rank services for domain features")
        .action(clap::ArgAction::SetTrue)
}

fn lookup_file_arg() -> clap::Arg {
    arg!(--"lookup-file" <PATH>)
        .required(false)
        .help("JSON file of pre-computed lookup answers keyed by host")
        .value_parser(clap::value_parser!(PathBuf))
}

fn classifier_only_arg() -> clap::Arg {
    arg!(--"classifier-only")
        .required(false)
        .help("Write only the 20 classifier features")
        .action(clap::ArgAction::SetTrue)
}
