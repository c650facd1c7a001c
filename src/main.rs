//! File-based driver: reads a memory map, generates the kernel for the requested shape,
//! and writes the listing to disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgGroup, Parser};
use tracing::info;
use tracing_subscriber::EnvFilter;

use pim_isa::bytecode::{disassembly_table, from_bytes, parse_listing, to_bytes, ListingLine};
use pim_isa::{
  compile, compute_addresses, BankMap, CompileReport, Dimension, ErrorReport, IsaError,
  Operand, Result
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("kernel_shape").args(["size", "dims", "shape"])))]
struct Args {
  /// Side of a square kernel
  #[arg(short = 'n', long)]
  size: Option<usize>,

  /// Rectangular kernel: rows of A, the inner dimension, columns of B
  #[arg(long, num_args = 3, value_names = ["M", "N", "P"])]
  dims: Option<Vec<usize>>,

  /// Shape as text: `4`, `4x4`, or `2x3 * 3x5`
  #[arg(long)]
  shape: Option<String>,

  /// JSON memory map; the built-in map is used when absent
  #[arg(short, long, value_name = "FILE")]
  memory_map: Option<PathBuf>,

  /// Where to write the text listing
  #[arg(short, long, value_name = "FILE", default_value = "pim_isa.txt")]
  output: PathBuf,

  /// Also write a binary listing, three bytes per word
  #[arg(long, value_name = "FILE")]
  binary: Option<PathBuf>,

  /// Print the JSON response payload instead of a summary
  #[arg(long)]
  json: bool,

  /// Print the address grid of every operand
  #[arg(long)]
  show_addresses: bool,

  /// Decode an existing listing (text, or binary if it ends in `.bin`) and exit
  #[arg(long, value_name = "FILE", conflicts_with = "kernel_shape")]
  disassemble: Option<PathBuf>,

  /// Raise the log level; repeat for more
  #[arg(short, long, action = clap::ArgAction::Count)]
  verbose: u8,
}

fn init_logging(verbose: u8) {
  let default_level =
    match verbose {
      0 => "warn",
      1 => "info",
      2 => "debug",
      _ => "trace"
    };
  let filter =
    EnvFilter::try_from_default_env()
      .unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .init();
}

fn requested_dimension(args: &Args) -> Result<Dimension> {
  if let Some(n) = args.size {
    return Dimension::square(n);
  }
  if let Some(dims) = &args.dims {
    return Dimension::rectangular(dims[0], dims[1], dims[2]);
  }
  if let Some(text) = &args.shape {
    return text.parse();
  }
  Err(IsaError::InvalidDimension(
    "a matrix size is required: pass --size, --dims, or --shape".to_string()
  ))
}

fn disassemble(path: &Path) -> Result<()> {
  let lines =
    match path.extension().and_then(|extension| extension.to_str()) {
      Some("bin") => {
        from_bytes(&fs::read(path)?)?
          .into_iter()
          .map(|word| ListingLine::Instruction { word, comment: None })
          .collect()
      }
      _ => parse_listing(&fs::read_to_string(path)?)?
    };
  disassembly_table(&lines).printstd();
  Ok(())
}

fn run(args: &Args) -> Result<()> {
  if let Some(path) = &args.disassemble {
    return disassemble(path);
  }

  let dim = requested_dimension(args)?;
  let banks =
    match &args.memory_map {
      Some(path) => BankMap::load(path)?,
      None       => BankMap::default()
    };

  info!(shape = %dim, "generating kernel");
  let stream = compile(dim, &banks)?;

  if args.show_addresses {
    let table = compute_addresses(dim, &banks);
    for operand in Operand::ALL.iter() {
      println!("{}:", operand);
      table.grid(*operand).to_table(&operand.to_string()).printstd();
    }
  }

  fs::write(&args.output, stream.to_text())?;
  if let Some(path) = &args.binary {
    fs::write(path, to_bytes(&stream.words()))?;
  }

  if args.json {
    println!("{}", CompileReport::new(&stream, &banks, false).to_json()?);
  } else {
    println!("Generated {} instructions for a {} kernel", stream.len(), dim);
    println!("Output saved to {}", args.output.display());
  }
  Ok(())
}

fn main() {
  let args = Args::parse();
  init_logging(args.verbose);

  if let Err(error) = run(&args) {
    match (args.json, ErrorReport::from(&error).to_json()) {
      (true, Ok(json)) => println!("{}", json),
      _                => eprintln!("Error: {}", error),
    }
    process::exit(1);
  }
}
