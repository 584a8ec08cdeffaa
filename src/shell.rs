//! The command layer: turns token lists into file system operations.
//! Errors are reported on the error channel and only abort the command at hand.

use std::io::{BufRead, Write};

use log::warn;
use owo_colors::OwoColorize;

use crate::directory::DirEntry;
use crate::error::{FsError, Result};
use crate::file::WriteMode;
use crate::fs::FileSystem;
use crate::BlockDevice;

/// Line that ends the content typed after `write`.
pub const END_OF_CONTENT: &str = ".";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

const HELP: &str = "\
format [-x]                     format the disk (-x: erase every block and save)
cd <path>                       change the current directory
pwd                             print the current directory
mkdir <path>...                 create directories
rmdir <path>...                 remove empty directories
ls [-l] [path]                  list a directory (-l: long format)
create <path>...                create empty files
rm <path>...                    remove files
open <path>... | -l             open files or list open files
close <path>... | -a            close files or close all
write [-w|-c|-a] <path> [pos]   write typed lines (-w: overwrite, -c: at cursor, -a: append);
                                finish with a line holding a single '.'
read [-s|-a] <path> [len]       read from the cursor (-s) or the whole file (-a)
fsck                            check the disk for consistency
df                              show block usage
exit                            save the disk and quit";

pub struct Shell<D: BlockDevice, R: BufRead, W: Write, E: Write> {
    fs: FileSystem<D>,
    input: R,
    out: W,
    err: E,
}

fn usage(msg: &str) -> FsError {
    FsError::InvalidOperand(msg.to_string())
}

fn parse_number(token: &str) -> Result<usize> {
    token
        .parse()
        .map_err(|_| FsError::InvalidOperand(format!("not a number: {token}")))
}

impl<D: BlockDevice, R: BufRead, W: Write, E: Write> Shell<D, R, W, E> {
    pub fn new(fs: FileSystem<D>, input: R, out: W, err: E) -> Self {
        Self { fs, input, out, err }
    }

    pub fn fs(&self) -> &FileSystem<D> {
        &self.fs
    }

    pub fn fs_mut(&mut self) -> &mut FileSystem<D> {
        &mut self.fs
    }

    pub fn into_parts(self) -> (FileSystem<D>, W, E) {
        (self.fs, self.out, self.err)
    }

    /// Reads and runs commands until `exit` or the end of input, then shuts
    /// the file system down.
    /// The shutdown also runs when the session ends on an I/O error, which is
    /// then returned.
    pub fn run(&mut self) -> Result<()> {
        let session = self.session();
        let shutdown = self.fs.shutdown();
        session.and(shutdown)
    }

    fn session(&mut self) -> Result<()> {
        loop {
            write!(self.out, "{}> ", self.fs.pwd())?;
            self.out.flush()?;
            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                writeln!(self.out)?;
                return Ok(());
            }
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if self.execute(&tokens) == Flow::Exit {
                return Ok(());
            }
        }
    }

    /// Runs one command. Only `exit` stops the session.
    pub fn execute(&mut self, tokens: &[&str]) -> Flow {
        let Some((&command, args)) = tokens.split_first() else {
            return Flow::Continue;
        };
        let result = match command {
            "format" => self.format(args),
            "cd" => self.cd(args),
            "pwd" => self.pwd(),
            "mkdir" => self.each(command, args, |fs, path| fs.mkdir(path).map(|_| ())),
            "rmdir" => self.each(command, args, |fs, path| fs.rmdir(path)),
            "ls" => self.ls(args),
            "create" => self.each(command, args, |fs, path| fs.create(path).map(|_| ())),
            "rm" => self.each(command, args, |fs, path| fs.rm(path)),
            "open" => self.open(args),
            "close" => self.close(args),
            "write" => self.write(args),
            "read" => self.read(args),
            "fsck" => self.fsck(),
            "df" => self.df(),
            "help" => writeln!(self.out, "{HELP}").map_err(FsError::from),
            "exit" => return Flow::Exit,
            _ => Err(FsError::InvalidOperand(format!("unknown command {command}"))),
        };
        if let Err(e) = result {
            self.report(command, &e);
        }
        Flow::Continue
    }

    fn report(&mut self, command: &str, e: &FsError) {
        if writeln!(self.err, "{command}: {e}").is_err() {
            warn!("{}: {}", command, e);
        }
    }

    /// Applies `op` to every path argument, reporting failures one by one.
    fn each(
        &mut self,
        command: &str,
        args: &[&str],
        op: impl Fn(&mut FileSystem<D>, &str) -> Result<()>,
    ) -> Result<()> {
        if args.is_empty() {
            return Err(usage("missing path"));
        }
        for path in args {
            if let Err(e) = op(&mut self.fs, *path) {
                self.report(&format!("{command} {path}"), &e);
            }
        }
        Ok(())
    }

    fn format(&mut self, args: &[&str]) -> Result<()> {
        let full = match args {
            [] => false,
            ["-x"] => true,
            _ => return Err(usage("format [-x]")),
        };
        self.fs.reformat(full)?;
        writeln!(self.out, "disk formatted")?;
        Ok(())
    }

    fn cd(&mut self, args: &[&str]) -> Result<()> {
        match args {
            [path] => self.fs.cd(path),
            _ => Err(usage("cd <path>")),
        }
    }

    fn pwd(&mut self) -> Result<()> {
        writeln!(self.out, "{}", self.fs.pwd())?;
        Ok(())
    }

    fn ls(&mut self, args: &[&str]) -> Result<()> {
        let (long, path) = match args {
            [] => (false, None),
            ["-l"] => (true, None),
            ["-l", path] => (true, Some(*path)),
            [path] => (false, Some(*path)),
            _ => return Err(usage("ls [-l] [path]")),
        };
        let entries = self.fs.ls(path)?;
        if long {
            for entry in &entries {
                writeln!(self.out, "{}", long_line(entry))?;
            }
        } else {
            let names: Vec<String> = entries.iter().map(display_name).collect();
            writeln!(self.out, "{}", names.join("  "))?;
        }
        Ok(())
    }

    fn open(&mut self, args: &[&str]) -> Result<()> {
        match args {
            [] => Err(usage("open <path>... | -l")),
            ["-l"] => {
                writeln!(self.out, "{:>2}  {:>6}  {:>8}  {:5}  path", "fd", "cursor", "length", "dirty")?;
                let lines: Vec<String> = self
                    .fs
                    .open_files()
                    .map(|(handle, file)| {
                        format!(
                            "{:>2}  {:>6}  {:>8}  {:5}  {}",
                            handle, file.cursor, file.fcb.length, file.dirty, file.path
                        )
                    })
                    .collect();
                for line in lines {
                    writeln!(self.out, "{line}")?;
                }
                Ok(())
            }
            paths => {
                for path in paths {
                    match self.fs.open(path) {
                        Ok(handle) => writeln!(self.out, "{path}: fd {handle}")?,
                        Err(e) => self.report(&format!("open {path}"), &e),
                    }
                }
                Ok(())
            }
        }
    }

    fn close(&mut self, args: &[&str]) -> Result<()> {
        match args {
            [] => Err(usage("close <path>... | -a")),
            ["-a"] => self.fs.close_all(),
            paths => self.each("close", paths, |fs, path| {
                let handle = fs.handle_of(path)?;
                fs.close(handle)
            }),
        }
    }

    /// Collects lines from the input up to the end-of-content marker.
    fn read_content(&mut self) -> Result<Vec<u8>> {
        let mut content = String::new();
        loop {
            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                break;
            }
            if line.trim_end_matches(['\r', '\n']) == END_OF_CONTENT {
                break;
            }
            content.push_str(&line);
        }
        Ok(content.into_bytes())
    }

    fn write(&mut self, args: &[&str]) -> Result<()> {
        let (mode, rest) = match args {
            ["-w", rest @ ..] => (WriteMode::Overwrite, rest),
            ["-c", rest @ ..] => (WriteMode::Cover, rest),
            ["-a", rest @ ..] => (WriteMode::Append, rest),
            rest => (WriteMode::Overwrite, rest),
        };
        // The content follows the command line even when the command is bad.
        let content = self.read_content()?;
        let (path, pos) = match rest {
            [path] => (*path, None),
            [path, pos] if mode == WriteMode::Cover => (*path, Some(parse_number(pos)?)),
            _ => return Err(usage("write [-w|-c|-a] <path> [pos]")),
        };
        let handle = self.fs.handle_of(path)?;
        if self.fs.open_file(handle)?.fcb.is_dir() {
            return Err(FsError::NotFile);
        }
        if let Some(pos) = pos {
            self.fs.seek(handle, pos)?;
        }
        let written = self.fs.write(handle, &content, mode)?;
        writeln!(self.out, "{written} bytes written")?;
        Ok(())
    }

    fn read(&mut self, args: &[&str]) -> Result<()> {
        let (whole, rest) = match args {
            ["-s", rest @ ..] => (false, rest),
            ["-a", rest @ ..] => (true, rest),
            rest => (true, rest),
        };
        let (path, len) = match rest {
            [path] => (*path, None),
            [path, len] if !whole => (*path, Some(parse_number(len)?)),
            _ => return Err(usage("read [-s|-a] <path> [len]")),
        };
        let handle = self.fs.handle_of(path)?;
        let data = if whole {
            self.fs.read_all(handle)?
        } else {
            self.fs.read(handle, len.unwrap_or(usize::MAX))?
        };
        self.out.write_all(&data)?;
        if !data.ends_with(b"\n") {
            writeln!(self.out)?;
        }
        Ok(())
    }

    fn fsck(&mut self) -> Result<()> {
        let usage = self.fs.check()?;
        writeln!(self.out, "clean: {} of {} blocks used", usage.used, usage.total)?;
        Ok(())
    }

    fn df(&mut self) -> Result<()> {
        let usage = self.fs.usage()?;
        writeln!(
            self.out,
            "{} blocks total, {} used, {} free",
            usage.total, usage.used, usage.free
        )?;
        Ok(())
    }
}

fn display_name(entry: &DirEntry) -> String {
    let name = entry.fcb.full_name();
    if entry.fcb.is_dir() {
        name.bright_green().bold().to_string()
    } else {
        name
    }
}

/// attribute, first block, length, date, time, name
fn long_line(entry: &DirEntry) -> String {
    let fcb = &entry.fcb;
    format!(
        "{}  {:>5}  {:>8}  {}  {}  {}",
        if fcb.is_dir() { "d" } else { "-" },
        fcb.first,
        fcb.length,
        fcb.created_date(),
        fcb.created_time(),
        display_name(entry)
    )
}
