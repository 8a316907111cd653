use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Args, Parser, Subcommand};
use env_logger::Env;
use log::info;
use mwu_core::stream::filters;
use mwu_core::{
	ExternalSort, ExtractionConfig, Extractor, FrequencyTable, GlueMeasure, InMemorySort, MwuResult, SelectionPolicy,
	Sorter, StreamingPipeline,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Multi-word unit extraction with the Local Maxima algorithm", long_about = None)]
struct Cli {
	/// Increase verbosity (-v, -vv)
	#[arg(short = 'v', long, global = true, action = ArgAction::Count)]
	verbose: u8,

	/// Decrease verbosity (-q, -qq)
	#[arg(short = 'q', long, global = true, action = ArgAction::Count)]
	quiet: u8,

	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
	/// Extract MWUs with every table in memory
	Extract(ExtractArgs),
	/// Extract MWUs through sorted per-length files in a work directory
	Stream(StreamArgs),
	/// Emit every n-gram of each stdin line
	Ngrams {
		/// Longest n-gram length
		max_n: usize,
	},
	/// Count a sorted stream of n-grams
	Count,
	/// Append the prefix (or suffix) frequency list to a sorted count stream
	Cascade {
		/// Input keys are token-reversed: emit suffix frequencies
		#[arg(long)]
		suffixes: bool,
	},
	/// Reverse the tokens of the first column
	Reverse,
	/// Score full frequency records
	Glue {
		/// Glue measure (dice or scp)
		measure: GlueMeasure,
	},
	/// One strict rejection pass over a sorted scored stream
	Reject,
	/// Remove records whose n-gram has N tokens
	DropN {
		/// Token count to remove
		n: usize,
	},
	/// Print the non-rejected records of a scored stream
	Accepted,
}

#[derive(Args, Debug)]
struct ConfigArgs {
	/// Glue measure (dice or scp)
	#[arg(short, long, default_value = "scp")]
	measure: GlueMeasure,

	/// Selection policy (relaxed or strict)
	#[arg(short, long, default_value = "relaxed")]
	policy: SelectionPolicy,

	/// Maximum length of extracted units (>= 2)
	#[arg(short = 'n', long, value_name = "N", default_value_t = 4)]
	max_n: usize,
}

impl ConfigArgs {
	fn build(&self) -> Result<ExtractionConfig> {
		Ok(ExtractionConfig::new(self.measure, self.policy, self.max_n)?)
	}
}

#[derive(Args, Debug)]
struct ExtractArgs {
	#[command(flatten)]
	config: ConfigArgs,

	/// Reuse or write a `<stem>.bin` frequency snapshot next to each input
	#[arg(long)]
	cache: bool,

	/// Tokenized text files, one sentence per line (stdin when omitted)
	inputs: Vec<PathBuf>,
}

#[derive(Args, Debug)]
struct StreamArgs {
	#[command(flatten)]
	config: ConfigArgs,

	/// Directory receiving the per-length files and mwus.tsv
	#[arg(short, long, value_name = "DIR")]
	work_dir: PathBuf,

	/// Sort inside the process instead of calling the system `sort`
	#[arg(long)]
	in_memory_sort: bool,

	/// `sort` compatible executable
	#[arg(long, value_name = "PROGRAM", conflicts_with = "in_memory_sort")]
	sort_program: Option<String>,

	/// Tokenized text file, one sentence per line
	input: PathBuf,
}

fn main() -> Result<()> {
	let cli = Cli::parse();
	init_logging(cli.verbose, cli.quiet);

	match cli.command {
		Commands::Extract(args) => run_extract(args),
		Commands::Stream(args) => run_stream(args),
		Commands::Ngrams { max_n } => run_filter(|input, output| filters::emit_ngrams(input, output, max_n)),
		Commands::Count => run_filter(filters::count),
		Commands::Cascade { suffixes } => run_filter(|input, output| filters::cascade(input, output, suffixes)),
		Commands::Reverse => run_filter(filters::reverse),
		Commands::Glue { measure } => run_filter(|input, output| filters::glue(input, output, measure)),
		Commands::Reject => run_filter(filters::reject),
		Commands::DropN { n } => run_filter(|input, output| filters::drop_n(input, output, n)),
		Commands::Accepted => run_filter(filters::accepted),
	}
}

fn init_logging(verbose: u8, quiet: u8) {
	use log::LevelFilter;

	let level = match (quiet, verbose) {
		(0, 0) => LevelFilter::Info,
		(0, 1) => LevelFilter::Debug,
		(0, _) => LevelFilter::Trace,
		(1, _) => LevelFilter::Warn,
		_ => LevelFilter::Error,
	};

	let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
	builder.format_timestamp_millis();
	builder.filter_level(level);
	let _ = builder.try_init();
}

fn run_extract(args: ExtractArgs) -> Result<()> {
	let config = args.config.build()?;
	let extractor = Extractor::new(config);

	let table = if args.inputs.is_empty() {
		if args.cache {
			bail!("--cache needs input files");
		}
		FrequencyTable::from_reader(config.depth(), io::stdin().lock()).context("failed to count stdin")?
	} else {
		let mut table = extractor.frequency_table()?;
		for path in &args.inputs {
			let counted = if args.cache {
				FrequencyTable::load_or_count(path, config.depth())
			} else {
				File::open(path)
					.map_err(Into::into)
					.and_then(|file| FrequencyTable::from_reader(config.depth(), BufReader::new(file)))
			}
			.with_context(|| format!("failed to count {}", path.display()))?;
			table.merge(&counted)?;
		}
		info!("counted {} distinct n-grams over {} lines", table.len(), table.line_count());
		table
	};

	let results = extractor.extract(&table).context("extraction failed")?;
	print_results(&results)
}

fn run_stream(args: StreamArgs) -> Result<()> {
	let config = args.config.build()?;

	let results = if args.in_memory_sort {
		stream_with(StreamingPipeline::with_sorter(config, args.work_dir, InMemorySort), &args.input)?
	} else {
		let sorter = args.sort_program.map_or_else(ExternalSort::default, ExternalSort::with_program);
		stream_with(StreamingPipeline::with_sorter(config, args.work_dir, sorter), &args.input)?
	};

	print_results(&results)
}

fn stream_with<S: Sorter>(pipeline: StreamingPipeline<S>, input: &Path) -> Result<Vec<MwuResult>> {
	let results = pipeline
		.run(input)
		.with_context(|| format!("streaming extraction of {} failed", input.display()))?;
	info!("intermediate files kept in {}", pipeline.work_dir().display());
	Ok(results)
}

fn print_results(results: &[MwuResult]) -> Result<()> {
	let mut out = BufWriter::new(io::stdout().lock());
	for result in results {
		writeln!(out, "{result}")?;
	}
	out.flush()?;
	Ok(())
}

fn run_filter<F>(filter: F) -> Result<()>
where
	F: FnOnce(io::StdinLock<'static>, &mut BufWriter<io::StdoutLock<'static>>) -> mwu_core::Result<()>,
{
	let mut out = BufWriter::new(io::stdout().lock());
	filter(io::stdin().lock(), &mut out)?;
	out.flush()?;
	Ok(())
}
