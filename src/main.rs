use clap::{Arg, Command};
use log::LevelFilter;
use phishguard::analysis::{
    indicator_guidelines, ANALYSIS_TYPE_COMBINED, ANALYSIS_TYPE_EMAIL, ANALYSIS_TYPE_URL,
};
use phishguard::config::AnalyzerConfig;
use phishguard::engine::AnalysisEngine;
use serde::Serialize;
use std::process;

#[tokio::main]
async fn main() {
    let matches = Command::new("phishguard")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Explainable phishing risk scoring for URLs and email content")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path (YAML)"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Write a default configuration file and exit")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("url")
                .short('u')
                .long("url")
                .value_name("URL")
                .help("URL to analyze (repeat for a combined analysis)")
                .action(clap::ArgAction::Append),
        )
        .arg(
            Arg::new("email-text")
                .long("email-text")
                .value_name("TEXT")
                .help("Email body text to analyze"),
        )
        .arg(
            Arg::new("email-file")
                .long("email-file")
                .value_name("FILE")
                .help("Read the email body text from a file"),
        )
        .arg(
            Arg::new("no-fetch")
                .long("no-fetch")
                .help("Skip the live page fetch and DNS lookups")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("health")
                .long("health")
                .help("Print engine health and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("explanations")
                .long("explanations")
                .help("Print the indicator reference table and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(path) = matches.get_one::<String>("generate-config") {
        match AnalyzerConfig::default().to_file(path) {
            Ok(()) => println!("Default configuration written to {path}"),
            Err(e) => {
                eprintln!("Error writing configuration: {e}");
                process::exit(1);
            }
        }
        return;
    }

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => match AnalyzerConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading configuration: {e}");
                process::exit(1);
            }
        },
        None => AnalyzerConfig::default(),
    };
    if matches.get_flag("no-fetch") {
        config.fetch.enabled = false;
        config.dns.enabled = false;
    }

    // Model loading belongs to an external collaborator; without one the
    // engine answers from its lexical heuristics.
    let engine = AnalysisEngine::new(config);

    if matches.get_flag("explanations") {
        print_json(&indicator_guidelines());
        return;
    }
    if matches.get_flag("health") {
        print_json(&engine.health());
        return;
    }

    let urls: Vec<String> = matches
        .get_many::<String>("url")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    let email_text = match matches.get_one::<String>("email-file") {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(content) => Some(content),
            Err(e) => {
                eprintln!("Error reading email file {path}: {e}");
                process::exit(1);
            }
        },
        None => matches.get_one::<String>("email-text").cloned(),
    };

    match (email_text, urls.as_slice()) {
        (None, []) => {
            eprintln!("Nothing to analyze: pass --url and/or --email-text / --email-file");
            process::exit(2);
        }
        (Some(text), []) => match engine.analyze_email(&text) {
            Ok(result) => print_json(&engine.respond(result, ANALYSIS_TYPE_EMAIL)),
            Err(e) => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        },
        (None, [url]) => {
            let result = engine.analyze_url(url).await;
            print_json(&engine.respond(result, ANALYSIS_TYPE_URL));
        }
        (email_text, _) => {
            match engine.analyze_combined(email_text.as_deref(), &urls).await {
                Ok(result) => print_json(&engine.respond(result, ANALYSIS_TYPE_COMBINED)),
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            }
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Error serializing result: {e}");
            process::exit(1);
        }
    }
}
