use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use docdiff::language::validate_language;
use docdiff::matcher::ComparisonResult;
use docdiff::store::load_nodes_from_file;
use docdiff::{
    DocDiffConfig, Glossary, GreedyMatcher, StructuralNode, compare, plan_translation,
};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

fn node_file_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("source")
                .help("Source-language node list (JSON)")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .index(1),
        )
        .arg(
            Arg::new("target")
                .help("Target-language node list (JSON)")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .index(2),
        )
}

fn cli() -> Command {
    Command::new("docdiff")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Translation coverage and batch planning for documentation trees")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("Configuration file (JSON)")
                .value_parser(value_parser!(PathBuf))
                .global(true),
        )
        .arg(
            Arg::new("glossary")
                .long("glossary")
                .short('g')
                .help("Glossary file (JSON)")
                .value_parser(value_parser!(PathBuf))
                .global(true),
        )
        .arg(
            Arg::new("source-lang")
                .long("source-lang")
                .short('s')
                .help("Source language code (default: from config, else en)")
                .global(true),
        )
        .arg(
            Arg::new("target-lang")
                .long("target-lang")
                .short('t')
                .help("Target language code (e.g., ja, fr, de)")
                .default_value("ja")
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Log optimizer phases and per-file statistics")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            node_file_args(Command::new("compare").about("Report translation coverage")).arg(
                Arg::new("json")
                    .long("json")
                    .help("Print the full comparison as JSON")
                    .action(ArgAction::SetTrue),
            ),
        )
        .subcommand(
            node_file_args(Command::new("batch").about("Plan translation batches")).arg(
                Arg::new("output")
                    .long("output")
                    .short('o')
                    .help("Write batches here instead of stdout")
                    .value_parser(value_parser!(PathBuf)),
            ),
        )
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(matches: &ArgMatches) -> Result<DocDiffConfig, Box<dyn std::error::Error>> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => DocDiffConfig::from_file(path)?,
        None => DocDiffConfig::default(),
    };
    if let Some(lang) = matches.get_one::<String>("source-lang") {
        config.optimizer.source_language = lang.clone();
    }
    config.validate()?;
    Ok(config)
}

fn required_path<'a>(
    matches: &'a ArgMatches,
    id: &str,
) -> Result<&'a Path, Box<dyn std::error::Error>> {
    matches
        .get_one::<PathBuf>(id)
        .map(PathBuf::as_path)
        .ok_or_else(|| format!("missing <{}> argument", id).into())
}

fn print_comparison(comparison: &ComparisonResult) {
    let coverage = &comparison.coverage;
    println!(
        "{} -> {}",
        comparison.source_language, comparison.target_language
    );
    println!(
        "Coverage: {:.1}% ({} of {} nodes)",
        coverage.overall * 100.0,
        coverage.translated,
        coverage.total
    );
    println!(
        "  exact {}  fuzzy {}  missing {}",
        coverage.exact, coverage.fuzzy, coverage.missing
    );
    println!();
    println!("{:<12} {:>7} {:>7} {:>9}", "kind", "source", "target", "coverage");
    for (kind, row) in &comparison.structure {
        println!(
            "{:<12} {:>7} {:>7} {:>8.1}%",
            kind.as_str(),
            row.source,
            row.target,
            row.coverage_percent
        );
    }
    if !comparison.changes.is_empty() {
        println!();
        println!("{} changed nodes", comparison.changes.len());
        for change in comparison.changes.iter().take(10) {
            println!(
                "  {}:{} {:?} ({:.2})",
                change.file, change.line, change.change, change.similarity
            );
        }
    }
    for diagnostic in &comparison.diagnostics {
        eprintln!("warning: {}", diagnostic.message);
    }
}

struct Inputs {
    config: DocDiffConfig,
    glossary: Option<Glossary>,
    target_language: String,
    source: Vec<StructuralNode>,
    target: Vec<StructuralNode>,
}

async fn load_inputs(matches: &ArgMatches) -> Result<Inputs, Box<dyn std::error::Error>> {
    let config = load_config(matches)?;
    let glossary = match matches.get_one::<PathBuf>("glossary") {
        Some(path) => Some(Glossary::load_from_file(path)?),
        None => None,
    };
    let target_language = matches
        .get_one::<String>("target-lang")
        .cloned()
        .unwrap_or_else(|| "ja".to_string());
    validate_language(&target_language)?;

    let source = load_nodes_from_file(required_path(matches, "source")?).await?;
    let target = load_nodes_from_file(required_path(matches, "target")?).await?;
    info!(
        source = source.len(),
        target = target.len(),
        "loaded node lists"
    );

    Ok(Inputs {
        config,
        glossary,
        target_language,
        source,
        target,
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = cli().get_matches();
    init_logging(matches.get_flag("verbose"));

    match matches.subcommand() {
        Some(("compare", sub)) => {
            let inputs = load_inputs(sub).await?;
            let source_language = &inputs.config.optimizer.source_language;
            let matcher = GreedyMatcher::new(
                inputs.config.matcher.clone(),
                source_language,
                &inputs.target_language,
            );
            let comparison = compare(
                &inputs.source,
                &inputs.target,
                &matcher,
                source_language,
                &inputs.target_language,
            );
            if sub.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&comparison)?);
            } else {
                print_comparison(&comparison);
            }
        }
        Some(("batch", sub)) => {
            let inputs = load_inputs(sub).await?;
            let plan = plan_translation(
                &inputs.source,
                &inputs.target,
                &inputs.target_language,
                &inputs.config,
                inputs.glossary.as_ref(),
            )?;
            let json = serde_json::to_string_pretty(&plan.outcome.batches)?;
            match sub.get_one::<PathBuf>("output") {
                Some(path) => {
                    tokio::fs::write(path, json).await?;
                    info!(path = %path.display(), batches = plan.outcome.batches.len(), "wrote batches");
                }
                None => println!("{}", json),
            }
            eprintln!("{}", plan.outcome.metrics);
            eprintln!("{}", plan.quality);
        }
        _ => unreachable!("subcommand_required"),
    }

    Ok(())
}
