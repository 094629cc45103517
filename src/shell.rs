//! Line-oriented command shell
//!
//! Tracks a current directory and maps each command line onto one core call.
//! Relative paths are resolved against the current directory before they
//! reach the file system.

use crate::{BlockFs, FsError, FsPath, Strategy};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Width of the block map printed by `blocks`
const BLOCK_MAP_WIDTH: usize = 50;

pub const HELP: &str = "\
Available commands:
ls [path]            - List files and directories
cd <path>            - Change directory
pwd                  - Show current directory path
mkdir <dirname>      - Create a directory
rm <path>            - Remove a file or directory
touch <filename>     - Create an empty file
cat <filename>       - Display file contents
echo <text>          - Display text
write <file> <text>  - Replace file contents
append <file> <text> - Append to a file
mv <old> <new>       - Move or rename
alloc <file>         - Show where a file's blocks live
blocks               - Show the block map
stats                - Show allocation statistics
defrag               - Compact the block store
help                 - Show this help message";

#[derive(Error, Debug)]
pub enum ShellError {
    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error(transparent)]
    Fs(#[from] FsError),
}

pub type ShellResult<T> = std::result::Result<T, ShellError>;

/// Interactive session over a shared file system
pub struct Shell {
    fs: Arc<BlockFs>,
    cwd: FsPath,
}

impl Shell {
    pub fn new(fs: Arc<BlockFs>) -> Self {
        Shell {
            fs,
            cwd: FsPath::root(),
        }
    }

    pub fn cwd(&self) -> &FsPath {
        &self.cwd
    }

    pub fn fs(&self) -> &Arc<BlockFs> {
        &self.fs
    }

    fn resolve(&self, input: &str) -> ShellResult<FsPath> {
        Ok(FsPath::resolve(&self.cwd, input)?)
    }

    /// Run one command line and return its output
    pub fn execute(&mut self, line: &str) -> ShellResult<String> {
        let mut args = line.split_whitespace();
        let Some(command) = args.next() else {
            return Ok(String::new());
        };
        let command = command.to_lowercase();
        let args: Vec<&str> = args.collect();
        debug!("shell: {} {:?}", command, args);

        match command.as_str() {
            "ls" => self.ls(args.first().copied()),
            "cd" => self.cd(args.first().copied()),
            "pwd" => Ok(self.cwd.to_string()),
            "mkdir" => {
                let path = self.resolve(arg(&args, 0, "mkdir <dirname>")?)?;
                self.fs.mkdir(path)?;
                Ok(String::new())
            }
            "rm" | "rmdir" => {
                let path = self.resolve(arg(&args, 0, "rm <path>")?)?;
                self.fs.delete(path)?;
                Ok(String::new())
            }
            "touch" => {
                let path = self.resolve(arg(&args, 0, "touch <filename>")?)?;
                self.fs.create_or_overwrite(path, b"")?;
                Ok(String::new())
            }
            "cat" => {
                let path = self.resolve(arg(&args, 0, "cat <filename>")?)?;
                Ok(self.fs.read_to_string(path)?)
            }
            "echo" => Ok(args.join(" ")),
            "write" | "append" => {
                let usage = if command == "write" {
                    "write <file> <text>"
                } else {
                    "append <file> <text>"
                };
                let path = self.resolve(arg(&args, 0, usage)?)?;
                let text = args[1..].join(" ");
                if command == "write" {
                    self.fs.create_or_overwrite(path, text.as_bytes())?;
                } else {
                    self.fs.append(path, text.as_bytes())?;
                }
                Ok(String::new())
            }
            "mv" => {
                let old = self.resolve(arg(&args, 0, "mv <old> <new>")?)?;
                let new = self.resolve(arg(&args, 1, "mv <old> <new>")?)?;
                self.fs.rename(old, new)?;
                Ok(String::new())
            }
            "alloc" => {
                let path = self.resolve(arg(&args, 0, "alloc <file>")?)?;
                Ok(self.fs.allocation(path)?.to_string())
            }
            "blocks" => Ok(self
                .fs
                .snapshot()
                .render_block_map(BLOCK_MAP_WIDTH)
                .trim_end()
                .to_string()),
            "stats" => Ok(self.stats()),
            "defrag" => Ok(format!("Moved {} blocks", self.fs.defragment())),
            "help" => Ok(HELP.to_string()),
            other => Err(ShellError::CommandNotFound(other.to_string())),
        }
    }

    fn ls(&self, target: Option<&str>) -> ShellResult<String> {
        let path = match target {
            Some(target) => self.resolve(target)?,
            None => self.cwd.clone(),
        };
        let names: Vec<String> = self
            .fs
            .list(path)?
            .into_iter()
            .map(|entry| {
                if entry.is_directory {
                    format!("{}/", entry.name)
                } else {
                    entry.name
                }
            })
            .collect();
        Ok(names.join("  "))
    }

    fn cd(&mut self, target: Option<&str>) -> ShellResult<String> {
        let path = match target {
            None | Some("~") | Some("/") => FsPath::root(),
            Some(target) => self.resolve(target)?,
        };
        if !self.fs.is_directory(&path)? {
            return Err(FsError::NotADirectory(path.to_string()).into());
        }
        self.cwd = path;
        Ok(self.cwd.to_string())
    }

    fn stats(&self) -> String {
        let stats = self.fs.stats();
        let by_strategy = Strategy::ALL
            .iter()
            .map(|s| format!("{} {}", stats.files_by_strategy.get(*s), s))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "Blocks: {} used, {} free, {} total ({} bytes each)\n\
             Files: {} ({})\n\
             Directories: {}\n\
             Fragmentation: {:.3} (largest free run {})",
            stats.used_blocks,
            stats.free_blocks,
            stats.total_blocks,
            stats.block_size,
            stats.file_count,
            by_strategy,
            stats.directory_count,
            stats.fragmentation_score,
            stats.largest_free_run
        )
    }
}

fn arg<'a>(args: &[&'a str], index: usize, usage: &'static str) -> ShellResult<&'a str> {
    args.get(index).copied().ok_or(ShellError::Usage(usage))
}
