use bio::io::fasta;
use genescout::search::{
    BlastLocalProvider, BlastRemoteProvider, EntrezProvider, SearchProvider, UniprotProvider,
};
use genescout::{about, AnalysisConfig, Pipeline};
use serde::Serialize;
use std::{env, fs, path::Path};
use tracing_subscriber::EnvFilter;

fn usage() {
    eprintln!(
        "Usage:\n  \
  genescout_cli --version\n  \
  genescout_cli [OPTIONS] analyze INPUT\n  \
  genescout_cli [OPTIONS] identify INPUT\n  \
  genescout_cli [OPTIONS] chunked INPUT\n  \
  genescout_cli [OPTIONS] gene SYMBOL\n\n\
INPUT is a FASTA file path, or a raw DNA sequence. The gene command looks a\n\
gene symbol up directly in UniProt (and NCBI when an email is configured).\n\n\
Options:\n  \
  --config PATH         JSON file with analysis settings (partial files are\n                        merged over the defaults)\n  \
  --min-orf-length N    minimum ORF length in bp (default 300)\n  \
  --chunk-size N        window size for chunked processing (default 8000)\n  \
  --overlap N           window overlap in bp (default 1000)\n  \
  --providers LIST      comma-separated: blast_local,blast_remote,entrez,uniprot"
    );
}

#[derive(Serialize)]
struct RecordResult<T: Serialize> {
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    length: usize,
    result: T,
}

struct CliArgs {
    command: String,
    input: String,
    config_path: Option<String>,
    min_orf_length: Option<usize>,
    chunk_size: Option<usize>,
    overlap: Option<usize>,
    providers: Option<String>,
}

fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut config_path = None;
    let mut min_orf_length = None;
    let mut chunk_size = None;
    let mut overlap = None;
    let mut providers = None;
    let mut positional = vec![];

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        let mut flag_value = |name: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("Missing value for {name}"))
        };
        match arg.as_str() {
            "--config" => config_path = Some(flag_value("--config")?),
            "--min-orf-length" => {
                min_orf_length = Some(parse_number(&flag_value("--min-orf-length")?)?)
            }
            "--chunk-size" => chunk_size = Some(parse_number(&flag_value("--chunk-size")?)?),
            "--overlap" => overlap = Some(parse_number(&flag_value("--overlap")?)?),
            "--providers" => providers = Some(flag_value("--providers")?),
            other if other.starts_with("--") => {
                return Err(format!("Unknown option: {other}"));
            }
            other => positional.push(other.to_string()),
        }
    }

    if positional.len() != 2 {
        usage();
        return Err("Expected a command and an input".to_string());
    }
    let mut positional = positional.into_iter();
    Ok(CliArgs {
        command: positional.next().unwrap_or_default(),
        input: positional.next().unwrap_or_default(),
        config_path,
        min_orf_length,
        chunk_size,
        overlap,
        providers,
    })
}

fn parse_number(value: &str) -> Result<usize, String> {
    value
        .parse()
        .map_err(|_| format!("Not a number: '{value}'"))
}

fn load_config(cli: &CliArgs) -> Result<AnalysisConfig, String> {
    let mut config = match &cli.config_path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| format!("Could not read config file '{path}': {e}"))?;
            serde_json::from_str(&text).map_err(|e| format!("Invalid config '{path}': {e}"))?
        }
        None => AnalysisConfig::default(),
    };
    if let Some(min_orf_length) = cli.min_orf_length {
        config.min_orf_length = min_orf_length;
    }
    if let Some(chunk_size) = cli.chunk_size {
        config.chunk_size = chunk_size;
    }
    if let Some(overlap) = cli.overlap {
        config.overlap_size = overlap;
    }
    Ok(config)
}

fn build_pipeline(cli: &CliArgs, config: AnalysisConfig) -> Result<Pipeline, String> {
    let Some(list) = &cli.providers else {
        return Ok(Pipeline::new(config));
    };
    let mut providers: Vec<Box<dyn SearchProvider>> = vec![];
    for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let provider: Box<dyn SearchProvider> = match name {
            "blast_local" => Box::new(BlastLocalProvider::new(config.clone())),
            "blast_remote" => Box::new(BlastRemoteProvider::new(config.clone())),
            "entrez" => Box::new(EntrezProvider::new(config.clone())),
            "uniprot" => Box::new(UniprotProvider::new(config.clone())),
            other => return Err(format!("Unknown provider: '{other}'")),
        };
        providers.push(provider);
    }
    Ok(Pipeline::with_providers(config, providers))
}

/// An existing file path is read as FASTA; anything else is taken as an
/// inline sequence.
fn read_input(input: &str) -> Result<Vec<(String, Option<String>, String)>, String> {
    if !Path::new(input).exists() {
        return Ok(vec![("inline".to_string(), None, input.to_string())]);
    }
    let reader = fasta::Reader::from_file(input)
        .map_err(|e| format!("Could not open FASTA file '{input}': {e}"))?;
    let mut records = vec![];
    for record in reader.records() {
        let record = record.map_err(|e| format!("Invalid FASTA record in '{input}': {e}"))?;
        records.push((
            record.id().to_string(),
            record.desc().map(str::to_string),
            String::from_utf8_lossy(record.seq()).into_owned(),
        ));
    }
    if records.is_empty() {
        return Err(format!("No sequences found in '{input}'"));
    }
    Ok(records)
}

/// Direct gene-symbol lookup, no sequence analysis involved.
fn gene_lookup(symbol: &str, config: &AnalysisConfig) -> Result<(), String> {
    let max_results = config.default_max_results;
    let mut outcomes = vec![];

    let uniprot = UniprotProvider::new(config.clone());
    outcomes.push(
        uniprot
            .search_gene_name(symbol, max_results)
            .map_err(|e| format!("UniProt lookup of '{symbol}' failed: {e}"))?,
    );

    if !config.ncbi_email.is_empty() {
        let entrez = EntrezProvider::new(config.clone());
        outcomes.push(
            entrez
                .search_gene_name(symbol, max_results)
                .map_err(|e| format!("NCBI lookup of '{symbol}' failed: {e}"))?,
        );
    }

    print_json(&outcomes)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Could not serialize JSON output: {e}"))?;
    println!("{text}");
    Ok(())
}

fn for_each_record<T: Serialize>(
    records: Vec<(String, Option<String>, String)>,
    mut run: impl FnMut(&str, &str) -> Result<T, String>,
) -> Result<(), String> {
    let mut results = vec![];
    for (id, description, sequence) in records {
        let result = run(&id, &sequence)?;
        results.push(RecordResult {
            id,
            description,
            length: sequence.len(),
            result,
        });
    }
    print_json(&results)
}

fn run() -> Result<(), String> {
    let args: Vec<String> = env::args().collect();
    if args.len() >= 2 && args[1] == "--version" {
        println!("{}", about());
        return Ok(());
    }

    let cli = parse_args(&args)?;
    let config = load_config(&cli)?;

    if cli.command == "gene" {
        return gene_lookup(&cli.input, &config);
    }

    let records = read_input(&cli.input)?;
    let mut pipeline = build_pipeline(&cli, config)?;

    match cli.command.as_str() {
        "analyze" => for_each_record(records, |id, sequence| {
            pipeline
                .analyze(sequence)
                .map_err(|e| format!("Analysis of '{id}' failed: {e}"))
        }),
        "identify" => for_each_record(records, |id, sequence| {
            pipeline
                .identify(sequence)
                .map_err(|e| format!("Identification of '{id}' failed: {e}"))
        }),
        "chunked" | "identify-chunked" => {
            for_each_record(records, |_, sequence| Ok(pipeline.identify_chunked(sequence)))
        }
        other => {
            usage();
            Err(format!("Unknown command: {other}"))
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
