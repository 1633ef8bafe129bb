//! ontoshape CLI
//!
//! - `generate`: derive a SHACL shapes graph from an OWL/RDFS ontology,
//!   optionally refining each property with an operator (terminal or answers file)
//! - `inspect`: show the classes and properties the generator works from

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use ontoshape_core::{
    load, write_graph, AbortPolicy, InferOnly, LineOperator, OutputFormat, PromptSession,
    RangePolicy, RefineScope, SchemaInspector, Synthesis, SynthesisConfig, Synthesizer,
};
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod console;

#[derive(Parser)]
#[command(name = "ontoshape")]
#[command(author, version, about = "Derive SHACL shapes from OWL/RDFS ontologies")]
struct Cli {
    /// More log output on stderr (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a shapes graph from an ontology (Turtle, N-Triples or RDF/XML).
    ///
    /// Without `--interactive` or `--answers` only the constraints already
    /// stated in the ontology are emitted.
    Generate(GenerateArgs),

    /// List classes and properties with their domains, ranges and axioms.
    Inspect {
        ontology: PathBuf,
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct GenerateArgs {
    ontology: PathBuf,

    /// Output file (stdout when omitted).
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Output format (defaults from the output extension, else turtle).
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Ask the refinement questions on the terminal.
    #[arg(long, conflicts_with = "answers")]
    interactive: bool,

    /// Read answers to the refinement questions from a file, one per line.
    #[arg(long, value_name = "FILE")]
    answers: Option<PathBuf>,

    /// Only refine these properties (local name or full IRI); repeatable.
    #[arg(long = "refine", value_name = "PROPERTY")]
    refine: Vec<String>,

    /// Fail on ranges that are not a class, enumeration or known datatype.
    #[arg(long)]
    strict_ranges: bool,

    /// What to do with the remaining pairs after the operator stops.
    #[arg(long, value_enum)]
    on_abort: Option<OnAbortArg>,

    /// Emit a node shape for every named class, even without properties.
    #[arg(long)]
    emit_empty_node_shapes: bool,

    /// Extra prefix binding for the output; repeatable.
    #[arg(long = "prefix", value_name = "PREFIX=IRI", value_parser = parse_prefix)]
    prefixes: Vec<(String, String)>,

    /// JSON configuration file; flags override its values.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Turtle,
    Ntriples,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Turtle => OutputFormat::Turtle,
            FormatArg::Ntriples => OutputFormat::NTriples,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OnAbortArg {
    Skip,
    Infer,
}

impl From<OnAbortArg> for AbortPolicy {
    fn from(arg: OnAbortArg) -> Self {
        match arg {
            OnAbortArg::Skip => AbortPolicy::SkipRemaining,
            OnAbortArg::Infer => AbortPolicy::InferRemaining,
        }
    }
}

fn parse_prefix(s: &str) -> Result<(String, String), String> {
    let (prefix, iri) = s
        .split_once('=')
        .ok_or_else(|| format!("expected PREFIX=IRI, got `{s}`"))?;
    if iri.is_empty() {
        return Err(format!("empty namespace for prefix `{prefix}`"));
    }
    Ok((prefix.trim().to_string(), iri.trim().to_string()))
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Generate(args) => cmd_generate(&args),
        Commands::Inspect { ontology, json } => cmd_inspect(&ontology, json),
    }
}

// ============================================================================
// generate
// ============================================================================

/// File config first, then command-line overrides.
fn synthesis_config(args: &GenerateArgs) -> Result<SynthesisConfig> {
    let mut config = match &args.config {
        Some(path) => SynthesisConfig::from_json_file(path)
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => SynthesisConfig::default(),
    };
    if !args.refine.is_empty() {
        config.refine_scope = RefineScope::Properties(args.refine.iter().cloned().collect());
    }
    if args.strict_ranges {
        config.range_policy = RangePolicy::Strict;
    }
    if let Some(on_abort) = args.on_abort {
        config.abort_policy = on_abort.into();
    }
    if args.emit_empty_node_shapes {
        config.emit_empty_node_shapes = true;
    }
    for (prefix, iri) in &args.prefixes {
        config.prefixes.insert(prefix.clone(), iri.clone());
    }
    Ok(config)
}

fn output_format(args: &GenerateArgs) -> OutputFormat {
    if let Some(format) = args.format {
        return format.into();
    }
    match args
        .out
        .as_ref()
        .and_then(|p| p.extension())
        .and_then(|e| e.to_str())
    {
        Some("nt") => OutputFormat::NTriples,
        _ => OutputFormat::Turtle,
    }
}

fn cmd_generate(args: &GenerateArgs) -> Result<()> {
    let config = synthesis_config(args)?;
    tracing::debug!(?config, "synthesis config");
    let ontology = load(&args.ontology)
        .with_context(|| format!("failed to load ontology {}", args.ontology.display()))?;
    let synthesizer = Synthesizer::new(&ontology, &config);

    let synthesis = if let Some(path) = &args.answers {
        let file = File::open(path)
            .with_context(|| format!("failed to open answers {}", path.display()))?;
        let operator = LineOperator::new(BufReader::new(file), io::stderr()).echo(true);
        let mut session = PromptSession::new(operator, config.prompt.clone());
        synthesizer.run(&mut session)?
    } else if args.interactive {
        let mut operator = console::ConsoleOperator::new()?;
        operator.banner();
        let mut session = PromptSession::new(operator, config.prompt.clone());
        synthesizer.run(&mut session)?
    } else {
        synthesizer.run(&mut InferOnly)?
    };

    write_synthesis(&synthesis, output_format(args), args.out.as_deref())?;
    print_report(&synthesis);
    Ok(())
}

fn write_synthesis(synthesis: &Synthesis, format: OutputFormat, out: Option<&Path>) -> Result<()> {
    match out {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            write_graph(
                &synthesis.shapes,
                &synthesis.prefixes,
                format,
                BufWriter::new(file),
            )?;
            eprintln!("{} {}", "wrote".green().bold(), path.display().to_string().bold());
        }
        None => write_graph(
            &synthesis.shapes,
            &synthesis.prefixes,
            format,
            io::stdout().lock(),
        )?,
    }
    Ok(())
}

fn print_report(synthesis: &Synthesis) {
    let report = &synthesis.report;
    eprintln!(
        "{} {} node shapes, {} property shapes ({} refined)",
        "ok".green().bold(),
        report.node_shapes,
        report.property_shapes,
        report.refined_pairs
    );
    if let Some(reason) = &report.aborted {
        eprintln!(
            "{} refinement stopped ({reason}); {} pairs skipped",
            "info:".yellow().bold(),
            report.skipped_pairs
        );
    }
}

// ============================================================================
// inspect
// ============================================================================

fn cmd_inspect(path: &Path, json: bool) -> Result<()> {
    let ontology =
        load(path).with_context(|| format!("failed to load ontology {}", path.display()))?;
    let summary = SchemaInspector::new(&ontology).summary();

    if json {
        let text = serde_json::to_string_pretty(&summary)
            .map_err(|e| anyhow!("failed to encode summary: {e}"))?;
        println!("{text}");
        return Ok(());
    }

    println!("{} ({})", "Classes".green().bold(), summary.classes.len());
    for class in &summary.classes {
        println!("  {class}");
    }
    println!();
    println!("{} ({})", "Properties".green().bold(), summary.properties.len());
    for p in &summary.properties {
        let kind = match p.kind {
            ontoshape_core::PropertyKind::Object => "object",
            ontoshape_core::PropertyKind::Datatype => "datatype",
        };
        let functional = if p.functional { " functional" } else { "" };
        println!("  {} {}{}", p.iri.bold(), kind.cyan(), functional.cyan());
        for domain in &p.domains {
            for range in &p.ranges {
                println!("    {domain} {} {range}", "→".cyan());
            }
        }
        if !p.inverses.is_empty() {
            println!("    inverse of {}", p.inverses.join(", "));
        }
        if !p.enumeration.is_empty() {
            println!("    one of ( {} )", p.enumeration.join(" "));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn generate(argv: &[&str]) -> GenerateArgs {
        let cli = Cli::try_parse_from(argv).expect("parse");
        match cli.command {
            Commands::Generate(args) => args,
            Commands::Inspect { .. } => panic!("expected generate"),
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn prefix_flag_splits_on_equals() {
        assert_eq!(
            parse_prefix("ex=http://example.org/#").expect("prefix"),
            ("ex".to_string(), "http://example.org/#".to_string())
        );
        assert!(parse_prefix("ex").is_err());
        assert!(parse_prefix("ex=").is_err());
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config_path = dir.path().join("ontoshape.json");
        std::fs::write(
            &config_path,
            r#"{ "abort_policy": "infer_remaining", "prefixes": { "a": "http://a.org/" } }"#,
        )
        .expect("write");
        let config_arg = config_path.to_string_lossy().to_string();

        let args = generate(&[
            "ontoshape",
            "generate",
            "onto.ttl",
            "--config",
            &config_arg,
            "--refine",
            "age",
            "--strict-ranges",
            "--on-abort",
            "skip",
            "--prefix",
            "b=http://b.org/",
        ]);
        let config = synthesis_config(&args).expect("config");
        assert_eq!(config.abort_policy, AbortPolicy::SkipRemaining);
        assert_eq!(config.range_policy, RangePolicy::Strict);
        assert!(config.refine_scope.includes(&ontoshape_core::Term::iri("http://x.org/age")));
        assert_eq!(config.prefixes.len(), 2);
    }

    #[test]
    fn output_format_follows_extension() {
        let args = generate(&["ontoshape", "generate", "onto.ttl", "-o", "shapes.nt"]);
        assert_eq!(output_format(&args), OutputFormat::NTriples);
        let args = generate(&["ontoshape", "generate", "onto.ttl", "-o", "shapes.nt", "--format", "turtle"]);
        assert_eq!(output_format(&args), OutputFormat::Turtle);
        let args = generate(&["ontoshape", "generate", "onto.ttl"]);
        assert_eq!(output_format(&args), OutputFormat::Turtle);
    }

    #[test]
    fn interactive_and_answers_conflict() {
        assert!(Cli::try_parse_from([
            "ontoshape",
            "generate",
            "onto.ttl",
            "--interactive",
            "--answers",
            "a.txt",
        ])
        .is_err());
    }
}
