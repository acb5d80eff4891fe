//! Command implementations and argument parsing for the `vicinity` CLI.

use std::{
    fs::{self, File},
    io::{self, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use clap::{Args, Parser, Subcommand, ValueEnum};
use thiserror::Error;
use tracing::{Span, field, info, instrument};
use vicinity_core::{
    FlatIndex, HnswIndex, HnswParams, IndexError, IndexKind, Metric, SearchOptions, SearchResult,
    probe,
};

use super::records::{Record, VectorArg, parse_records};

const DEFAULT_K: usize = 10;

/// Top-level CLI options parsed by [`clap`].
#[derive(Debug, Parser, Clone)]
#[command(name = "vicinity", about = "Build and query nearest-neighbour indexes.")]
pub struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported CLI commands.
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Build an index from a text file and save it.
    Build(BuildCommand),
    /// Search a saved index.
    Query(QueryCommand),
    /// Describe a saved index.
    Info(InfoCommand),
}

/// Index kinds the CLI can build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    /// Exact brute-force search.
    Flat,
    /// Approximate graph search.
    #[default]
    Hnsw,
}

/// Distance metrics exposed on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum MetricArg {
    /// Squared Euclidean distance.
    #[default]
    L2,
    /// One minus cosine similarity.
    Cosine,
}

impl From<MetricArg> for Metric {
    fn from(metric: MetricArg) -> Self {
        match metric {
            MetricArg::L2 => Self::SquaredL2,
            MetricArg::Cosine => Self::Cosine,
        }
    }
}

/// Options accepted by the `build` command.
#[derive(Debug, Args, Clone)]
pub struct BuildCommand {
    /// UTF-8 file with one `id v1,v2,...` record per line.
    pub input: PathBuf,

    /// Destination for the saved index.
    #[arg(long, short)]
    pub output: PathBuf,

    /// Index kind to build.
    #[arg(long, value_enum, default_value_t)]
    pub kind: KindArg,

    /// Distance metric.
    #[arg(long, value_enum, default_value_t)]
    pub metric: MetricArg,

    /// Maximum links per node on upper layers (HNSW only).
    #[arg(long = "m", default_value_t = HnswParams::default().max_connections())]
    pub max_connections: usize,

    /// Candidate beam width while inserting (HNSW only).
    #[arg(long, default_value_t = HnswParams::default().ef_construction())]
    pub ef_construction: usize,

    /// Default search beam width stored with the index (HNSW only).
    #[arg(long, default_value_t = HnswParams::default().ef_search())]
    pub ef_search: usize,

    /// Seed for level sampling (HNSW only).
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Options accepted by the `query` command.
#[derive(Debug, Args, Clone)]
pub struct QueryCommand {
    /// Saved index to search.
    pub index: PathBuf,

    /// Comma-separated query vector.
    #[arg(long, allow_hyphen_values = true)]
    pub vector: VectorArg,

    /// Number of results to return.
    #[arg(long, short, default_value_t = DEFAULT_K)]
    pub k: usize,

    /// Search beam width override (ignored by flat indexes).
    #[arg(long)]
    pub ef: Option<usize>,
}

/// Options accepted by the `info` command.
#[derive(Debug, Args, Clone)]
pub struct InfoCommand {
    /// Saved index to describe.
    pub index: PathBuf,
}

/// Errors surfaced while executing CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Reading or writing a file failed.
    #[error("failed to access `{path}`: {source}")]
    Io {
        /// Path that triggered the failure.
        path: PathBuf,
        /// Underlying operating system error.
        #[source]
        source: io::Error,
    },
    /// A build input line could not be parsed.
    #[error("{path}:{line}: {reason}")]
    Record {
        /// Input file.
        path: PathBuf,
        /// One-based line number.
        line: usize,
        /// What was wrong with the line.
        reason: String,
    },
    /// The build input held no records.
    #[error("`{path}` contains no records")]
    EmptyInput {
        /// Input file.
        path: PathBuf,
    },
    /// The query vector does not match the index dimension.
    #[error("query has {got} components but the index stores {expected}")]
    QueryDimension {
        /// Dimension of the loaded index.
        expected: usize,
        /// Length of the supplied query.
        got: usize,
    },
    /// The index library rejected an operation.
    #[error(transparent)]
    Core(#[from] IndexError),
}

/// Summary of a saved index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexInfo {
    /// Index kind recorded in the header.
    pub kind: IndexKind,
    /// Distance metric.
    pub metric: Metric,
    /// Vector dimension.
    pub dim: usize,
    /// Number of live entries.
    pub len: usize,
}

/// Result of executing a command, ready to render.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// An index was built and written to `output`.
    Built {
        /// Description of the new index.
        info: IndexInfo,
        /// Where it was saved.
        output: PathBuf,
    },
    /// Search hits, closest first.
    Hits(Vec<SearchResult<String>>),
    /// Description of a saved index.
    Info(IndexInfo),
}

enum LoadedIndex {
    Flat(FlatIndex<String>),
    Hnsw(HnswIndex<String>),
}

impl LoadedIndex {
    fn info(&self) -> IndexInfo {
        match self {
            Self::Flat(index) => IndexInfo {
                kind: IndexKind::Flat,
                metric: index.metric(),
                dim: index.dim(),
                len: index.len(),
            },
            Self::Hnsw(index) => IndexInfo {
                kind: IndexKind::Hnsw,
                metric: index.metric(),
                dim: index.dim(),
                len: index.len(),
            },
        }
    }

    fn save(&self, path: &Path) -> Result<(), CliError> {
        let file = File::create(path).map_err(|source| CliError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let writer = BufWriter::new(file);
        match self {
            Self::Flat(index) => index.save(writer)?,
            Self::Hnsw(index) => index.save(writer)?,
        }
        Ok(())
    }

    fn search(&self, k: usize, query: &[f32], ef: Option<usize>) -> Vec<SearchResult<String>> {
        let options = ef.map_or_else(SearchOptions::new, |ef| SearchOptions::new().with_ef(ef));
        match self {
            Self::Flat(index) => index.search_with_options(k, query, options),
            Self::Hnsw(index) => index.search_with_options(k, query, options),
        }
    }
}

/// Executes the command represented by `cli`.
///
/// # Errors
/// Returns [`CliError`] when reading input, building, saving, or loading an
/// index fails.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use vicinity_cli::cli::{Cli, Command, InfoCommand, Outcome, run_cli};
/// # use vicinity_core::FlatIndex;
/// # use tempfile::NamedTempFile;
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let file = NamedTempFile::new()?;
/// let index = FlatIndex::new(2);
/// index.add("a".to_owned(), &[0.0, 1.0])?;
/// index.save(file.reopen()?)?;
///
/// let cli = Cli {
///     command: Command::Info(InfoCommand {
///         index: file.path().to_path_buf(),
///     }),
/// };
/// let Outcome::Info(info) = run_cli(cli)? else {
///     unreachable!("info returns an info outcome");
/// };
/// assert_eq!((info.dim, info.len), (2, 1));
/// # Ok(())
/// # }
/// ```
#[instrument(name = "cli.run", err, skip(cli), fields(command = field::Empty))]
pub fn run_cli(cli: Cli) -> Result<Outcome, CliError> {
    let span = Span::current();
    match cli.command {
        Command::Build(command) => {
            span.record("command", "build");
            run_build(command)
        }
        Command::Query(command) => {
            span.record("command", "query");
            run_query(&command)
        }
        Command::Info(command) => {
            span.record("command", "info");
            load_index(&command.index).map(|index| Outcome::Info(index.info()))
        }
    }
}

#[instrument(
    name = "cli.build",
    err,
    skip(command),
    fields(
        input = %command.input.display(),
        kind = ?command.kind,
        records = field::Empty,
    ),
)]
pub(super) fn run_build(command: BuildCommand) -> Result<Outcome, CliError> {
    let records = read_records(&command.input)?;
    Span::current().record("records", records.len());

    let metric = Metric::from(command.metric);
    let index = match command.kind {
        KindArg::Flat => {
            let index = FlatIndex::with_metric(0, metric);
            for Record { id, vector } in records {
                index.add(id, &vector)?;
            }
            LoadedIndex::Flat(index)
        }
        KindArg::Hnsw => {
            let mut params = HnswParams::new(command.max_connections, command.ef_construction)?
                .with_ef_search(command.ef_search)
                .with_metric(metric);
            if let Some(seed) = command.seed {
                params = params.with_rng_seed(seed);
            }
            let index = HnswIndex::new(0, params);
            for Record { id, vector } in records {
                index.add(id, &vector)?;
            }
            LoadedIndex::Hnsw(index)
        }
    };

    index.save(&command.output)?;
    let info = index.info();
    info!(
        kind = %info.kind,
        entries = info.len,
        dim = info.dim,
        output = %command.output.display(),
        "index built"
    );
    Ok(Outcome::Built {
        info,
        output: command.output,
    })
}

#[instrument(
    name = "cli.query",
    err,
    skip(command),
    fields(index = %command.index.display(), k = command.k),
)]
pub(super) fn run_query(command: &QueryCommand) -> Result<Outcome, CliError> {
    let index = load_index(&command.index)?;
    let VectorArg(query) = &command.vector;
    let dim = index.info().dim;
    if query.len() != dim {
        return Err(CliError::QueryDimension {
            expected: dim,
            got: query.len(),
        });
    }
    Ok(Outcome::Hits(index.search(command.k, query, command.ef)))
}

fn read_records(path: &Path) -> Result<Vec<Record>, CliError> {
    let file = File::open(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let records = parse_records(BufReader::new(file), path)?;
    if records.is_empty() {
        return Err(CliError::EmptyInput {
            path: path.to_path_buf(),
        });
    }
    Ok(records)
}

#[instrument(name = "cli.load", err, fields(path = %path.display(), kind = field::Empty))]
fn load_index(path: &Path) -> Result<LoadedIndex, CliError> {
    let bytes = fs::read(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let kind = probe(bytes.as_slice())?;
    Span::current().record("kind", field::display(kind));
    Ok(match kind {
        IndexKind::Flat => LoadedIndex::Flat(FlatIndex::from_reader(bytes.as_slice())?),
        IndexKind::Hnsw => LoadedIndex::Hnsw(HnswIndex::from_reader(bytes.as_slice())?),
    })
}

const fn metric_label(metric: Metric) -> &'static str {
    match metric {
        Metric::SquaredL2 => "l2",
        Metric::Cosine => "cosine",
    }
}

/// Renders `outcome` to `writer` as plain text.
///
/// Hits are written as `rank\tid\tscore` lines with one-based ranks.
///
/// # Errors
/// Returns [`io::Error`] if writing to the supplied writer fails.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use vicinity_cli::cli::{Outcome, render_outcome};
/// # use vicinity_core::SearchResult;
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let outcome = Outcome::Hits(vec![SearchResult { id: "a".to_owned(), score: 0.5 }]);
/// let mut buffer = Vec::new();
/// render_outcome(&outcome, &mut buffer)?;
/// assert_eq!(String::from_utf8(buffer)?, "1\ta\t0.5\n");
/// # Ok(())
/// # }
/// ```
pub fn render_outcome(outcome: &Outcome, mut writer: impl Write) -> io::Result<()> {
    match outcome {
        Outcome::Built { info, output } => {
            writeln!(
                writer,
                "built {} index with {} entries of dimension {} at {}",
                info.kind,
                info.len,
                info.dim,
                output.display()
            )?;
        }
        Outcome::Hits(hits) => {
            for (rank, hit) in hits.iter().enumerate() {
                writeln!(writer, "{}\t{}\t{}", rank + 1, hit.id, hit.score)?;
            }
        }
        Outcome::Info(info) => {
            writeln!(writer, "kind: {}", info.kind)?;
            writeln!(writer, "metric: {}", metric_label(info.metric))?;
            writeln!(writer, "dim: {}", info.dim)?;
            writeln!(writer, "entries: {}", info.len)?;
        }
    }
    Ok(())
}
