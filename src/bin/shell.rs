//! blockfs shell
//!
//! Interactive terminal over an in-memory block file system

use anyhow::Context;
use blockfs::shell::Shell;
use blockfs::{BlockFs, FsConfig};
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "blockfs-shell")]
#[command(about = "Terminal for a simulated block-allocating file system")]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of blocks (overrides the configuration file)
    #[arg(short = 'b', long)]
    blocks: Option<usize>,

    /// Block size in bytes (overrides the configuration file)
    #[arg(short = 's', long)]
    block_size: Option<usize>,

    /// Start with an empty namespace
    #[arg(long)]
    no_sample: bool,

    /// Read JSON requests line by line instead of shell commands
    #[arg(long)]
    json: bool,

    /// Run a command and exit (repeatable)
    #[arg(short = 'c', long = "command")]
    commands: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so command output stays clean
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => FsConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => FsConfig::default(),
    };
    if let Some(blocks) = args.blocks {
        config.total_blocks = blocks;
    }
    if let Some(block_size) = args.block_size {
        config.block_size = block_size;
    }
    if args.no_sample {
        config.seed_sample = false;
    }

    let fs = Arc::new(BlockFs::with_config(config).context("creating file system")?);
    info!(
        "Ready: {} blocks of {} bytes",
        fs.stats().total_blocks,
        fs.stats().block_size
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if args.json {
        for line in io::stdin().lock().lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            writeln!(out, "{}", fs.dispatch_json(&line))?;
        }
        return Ok(());
    }

    let mut shell = Shell::new(fs);

    if !args.commands.is_empty() {
        for command in &args.commands {
            run(&mut shell, command, &mut out)?;
        }
        return Ok(());
    }

    let stdin = io::stdin();
    let mut input = stdin.lock();
    loop {
        write!(out, "{}> ", shell.cwd())?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(out)?;
            break;
        }
        let line = line.trim();
        if matches!(line, "exit" | "quit") {
            break;
        }
        run(&mut shell, line, &mut out)?;
    }

    Ok(())
}

fn run(shell: &mut Shell, line: &str, out: &mut impl Write) -> io::Result<()> {
    match shell.execute(line) {
        Ok(output) if output.is_empty() => Ok(()),
        Ok(output) => writeln!(out, "{}", output),
        Err(e) => writeln!(out, "Error: {}", e),
    }
}
