use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use stackscope_core::{Detail, Result as TraceResult, Snapshot, StackTracer, SymbolSession, ThreadId};
use stackscope_utils::{info, init_logging, init_logging_with_level, LogFormat, LogLevel};

/// Render annotated call stacks from captured thread state.
#[derive(Parser, Debug)]
#[command(name = "stackscope")]
#[command(version)]
#[command(about = "Render annotated call stacks, with inline frames and local variables, from captured thread state", long_about = None)]
struct Cli
{
    /// Log level (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,
    /// Log format: pretty or json (overrides STACKSCOPE_LOG_FORMAT)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Print the call stack recorded in a snapshot file
    Replay
    {
        /// Path to the JSON snapshot
        snapshot: PathBuf,
        /// Thread to trace (default: the snapshot's own thread)
        #[arg(long)]
        thread: Option<u64>,
        /// How much to print per variable: stack-only, names, names-and-types, unoptimised, full
        #[arg(long, env = "STACKSCOPE_DETAIL", default_value_t = Detail::Full)]
        detail: Detail,
    },
    /// Summarize the contents of a snapshot file
    Inspect
    {
        /// Path to the JSON snapshot
        snapshot: PathBuf,
    },
}

fn main()
{
    let cli = Cli::parse();

    let logging = match (cli.log_level, cli.log_format) {
        (None, None) => init_logging(),
        (level, format) => init_logging_with_level(level.unwrap_or_default(), format.unwrap_or_default()),
    };
    let _guard = match logging {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            process::exit(1);
        }
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if let Err(e) = run_command(cli.command, &mut out) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run_command(command: Commands, out: &mut dyn Write) -> TraceResult<()>
{
    match command {
        Commands::Replay {
            snapshot,
            thread,
            detail,
        } => replay(&snapshot, thread, detail, out),
        Commands::Inspect { snapshot } => {
            let snapshot = Snapshot::from_path(&snapshot)?;
            print_snapshot_info(&snapshot, out)
        }
    }
}

fn replay(path: &Path, thread: Option<u64>, detail: Detail, out: &mut dyn Write) -> TraceResult<()>
{
    info!("Replaying {} at detail {}", path.display(), detail);
    let snapshot = Snapshot::from_path(path)?;
    let thread = thread.map_or(snapshot.thread, ThreadId::from);

    let session = SymbolSession::open(snapshot)?;
    let recorded = session.provider()?;
    let tracer = StackTracer::new(&session, recorded)?.with_options(detail);
    let summary = tracer.trace(recorded, thread, out)?;

    info!(
        "Printed {} physical and {} inline frame(s)",
        summary.physical_frames, summary.inline_frames
    );
    Ok(())
}

fn print_snapshot_info(snapshot: &Snapshot, out: &mut dyn Write) -> TraceResult<()>
{
    let registers = &snapshot.registers;
    writeln!(out, "Snapshot Information:")?;
    writeln!(out, "  Thread: {}", snapshot.thread.raw())?;
    writeln!(out, "  PC: {}", registers.pc)?;
    writeln!(out, "  SP: {}", registers.sp)?;
    writeln!(out, "  FP: {}", registers.fp)?;

    writeln!(out, "  Modules: {}", snapshot.modules.len())?;
    for module in &snapshot.modules {
        writeln!(out, "    {}  {:#x} bytes  {}", module.base, module.size, module.name)?;
    }

    writeln!(out, "  Symbols: {}", snapshot.symbols.len())?;
    writeln!(out, "  Function Entries: {}", snapshot.functions.len())?;
    writeln!(out, "  Line Records: {}", snapshot.lines.len())?;
    writeln!(out, "  Scopes: {}", snapshot.scopes.len())?;
    writeln!(out, "  Inline Sites: {}", snapshot.inline_sites.len())?;
    writeln!(out, "  Types: {}", snapshot.types.len())?;

    let captured: usize = snapshot.memory.iter().map(|block| block.bytes.len()).sum();
    writeln!(out, "  Memory: {} block(s), {} bytes", snapshot.memory.len(), captured)?;
    Ok(())
}
