use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};

use dfsz_codecs::codec_for;
use dfsz_core::{
    decompress_stream, CodecKind, CompressRequest, CompressionState, LocalFs, ReplaceConfig,
    Replacer, SwapMode,
};

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "dfsz",
    about = "Compress files in place behind a bounded seek index",
    version
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true, env = "DFSZ_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log format (json, text)
    #[arg(long, global = true, env = "DFSZ_LOG_FORMAT", default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a file and replace it with the compressed form
    Compress {
        /// Logical path of the file, resolved beneath --root
        #[arg(short, long)]
        file: String,
        /// Preferred chunk size in bytes (raised when the index would overflow)
        #[arg(short, long)]
        buf_size: Option<u64>,
        /// Codec: lz4 | bzip2 | zlib | snappy | zstd (default from config)
        #[arg(short, long)]
        codec: Option<String>,
        /// Directory the logical paths are resolved beneath
        #[arg(long, env = "DFSZ_ROOT", default_value = "/")]
        root: PathBuf,
        /// Directory for in-flight compressed files (logical path, same filesystem as --file)
        #[arg(long, env = "DFSZ_TEMP_DIR")]
        temp_dir: Option<String>,
        /// auto | delete-then-rename
        #[arg(long, env = "DFSZ_SWAP_MODE")]
        swap_mode: Option<SwapMode>,
        /// TOML configuration file
        #[arg(long, env = "DFSZ_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Decode a compressed file back to raw bytes
    Decompress {
        /// Compressed file
        input: PathBuf,
        /// Destination file ("-" writes to stdout)
        output: PathBuf,
        /// Codec the file was compressed with
        #[arg(short, long)]
        codec: CodecKind,
    },
    /// Summarize a compression record printed by `compress`
    Inspect {
        /// JSON record
        state: PathBuf,
        /// Print every index entry
        #[arg(long)]
        index: bool,
    },
}

// ── Helpers ────────────────────────────────────────────────────────────────

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(io::stderr))
                .init();
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ReplaceConfig> {
    match path {
        Some(path) if path.exists() => ReplaceConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        Some(path) => {
            tracing::warn!("config file not found: {}  (using defaults)", path.display());
            Ok(ReplaceConfig::default())
        }
        None => Ok(ReplaceConfig::default()),
    }
}

fn human_bytes(n: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut v = n as f64;
    let mut unit = 0;
    while v >= 1024.0 && unit < UNITS.len() - 1 {
        v /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", n)
    } else {
        format!("{:.2} {}", v, UNITS[unit])
    }
}

// ── Subcommand implementations ─────────────────────────────────────────────

struct CompressArgs {
    file: String,
    buf_size: Option<u64>,
    codec: Option<String>,
    root: PathBuf,
    temp_dir: Option<String>,
    swap_mode: Option<SwapMode>,
    config: Option<PathBuf>,
}

fn run_compress(args: CompressArgs) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(dir) = args.temp_dir {
        config.temp_dir = dir;
    }
    if let Some(mode) = args.swap_mode {
        config.swap_mode = mode;
    }

    let replacer = Replacer::new(LocalFs::new(&args.root), config, codec_for);
    let request = CompressRequest {
        source_path: Some(args.file.clone()),
        buffer_size: args.buf_size,
        codec: args.codec,
    };

    let t0 = Instant::now();
    let state = replacer
        .run(&request)
        .with_context(|| format!("compressing {} under {}", args.file, args.root.display()))?;
    let elapsed = t0.elapsed();

    eprintln!("  codec       : {}", state.codec());
    eprintln!("  chunk size  : {}", human_bytes(state.chunk_size()));
    eprintln!("  index       : {} entries", state.position_index().len());
    eprintln!("  raw size    : {}", human_bytes(state.original_length()));
    eprintln!("  compressed  : {}", human_bytes(state.compressed_length()));
    eprintln!("  ratio       : {:.2}x", state.ratio());
    eprintln!("  elapsed     : {:.3}s", elapsed.as_secs_f64());

    println!("{}", state.to_json_pretty()?);
    Ok(())
}

fn run_decompress(input: PathBuf, output: PathBuf, codec: CodecKind) -> anyhow::Result<()> {
    let codec = codec_for(codec);
    let mut src = BufReader::new(
        File::open(&input).with_context(|| format!("opening input file {:?}", input))?,
    );

    let is_stdout = output.to_str() == Some("-");
    let mut dst: Box<dyn Write> = if is_stdout {
        Box::new(BufWriter::new(io::stdout().lock()))
    } else {
        Box::new(BufWriter::new(
            File::create(&output).with_context(|| format!("creating output file {:?}", output))?,
        ))
    };

    let t0 = Instant::now();
    let summary = decompress_stream(&mut src, &mut dst, codec.as_ref())
        .with_context(|| format!("decoding {:?} as {}", input, codec.name()))?;
    dst.flush()?;
    let elapsed = t0.elapsed();

    eprintln!("  frames      : {}", summary.frames);
    eprintln!("  raw size    : {}", human_bytes(summary.raw_length));
    eprintln!(
        "  throughput  : {}/s",
        human_bytes((summary.raw_length as f64 / elapsed.as_secs_f64()) as u64)
    );
    eprintln!("  elapsed     : {:.3}s", elapsed.as_secs_f64());
    Ok(())
}

fn run_inspect(path: PathBuf, show_index: bool) -> anyhow::Result<()> {
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("reading record {:?}", path))?;
    let state = CompressionState::from_json(&json)
        .with_context(|| format!("parsing record {:?}", path))?;

    println!("=== {} ===", state.source_path());
    println!();
    println!("  codec          : {}", state.codec());
    println!("  chunk size     : {}", human_bytes(state.chunk_size()));
    println!("  chunks         : {}", state.chunk_count());
    println!("  index entries  : {}", state.position_index().len());
    println!("  raw size       : {}", human_bytes(state.original_length()));
    println!("  compressed     : {}", human_bytes(state.compressed_length()));
    println!("  ratio          : {:.2}x", state.ratio());

    if show_index {
        println!();
        println!("  {:>8}  {:>16}  {:>16}", "entry", "original", "compressed");
        println!("  {}", "-".repeat(44));
        for (i, e) in state.position_index().iter().enumerate() {
            println!(
                "  {:>8}  {:>16}  {:>16}",
                i, e.original_offset, e.compressed_offset
            );
        }
    }

    Ok(())
}

// ── Entry point ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, &cli.log_format);

    match cli.command {
        Commands::Compress {
            file,
            buf_size,
            codec,
            root,
            temp_dir,
            swap_mode,
            config,
        } => run_compress(CompressArgs {
            file,
            buf_size,
            codec,
            root,
            temp_dir,
            swap_mode,
            config,
        }),
        Commands::Decompress {
            input,
            output,
            codec,
        } => run_decompress(input, output, codec),
        Commands::Inspect { state, index } => run_inspect(state, index),
    }
}
