//! Shared command-line plumbing for the protocol executables.
//!
//! Every executable takes the instance size (0-toy, 1-small, 2-medium,
//! 3-large) as its first argument, an optional `--root=<dir>` selecting
//! the directory holding `datasets/` and `io/` (default: the current
//! directory), and step-specific flags. No environment variables are
//! consumed.

use crate::params::{InstanceParams, InstanceSize};
use console::style;
use std::env;
use std::path::PathBuf;
use std::process::exit;

/// A parsed command line: the instance parameters plus the step-specific
/// flags that were present.
pub struct Invocation {
    /// Parameters of the selected instance, rooted at `--root` (or the
    /// current directory).
    pub prms: InstanceParams,
    /// The step-specific flags, verbatim.
    pub flags: Vec<String>,
}

fn print_notice_and_exit(step: &str, allowed_flags: &[&str], error: Option<String>) -> ! {
    println!(
        "{} fetch-by-similarity over an encrypted database",
        style("  overview:").magenta().bold()
    );
    let flags = allowed_flags
        .iter()
        .map(|f| format!(" [{f}]"))
        .collect::<String>();
    println!(
        "{} {step} <instance_size> [--root=<dir>]{flags}",
        style("     usage:").magenta().bold()
    );
    println!(
        "{} {} is 0-toy, 1-small, 2-medium or 3-large",
        style("constraints:").magenta().bold(),
        style("instance_size").blue()
    );
    if let Some(error) = error {
        println!("{} {}", style("     error:").red().bold(), error);
        exit(1);
    }
    exit(0);
}

/// Parse the command line of a protocol executable, exiting with a usage
/// notice on malformed input.
pub fn parse(step: &str, allowed_flags: &[&str]) -> Invocation {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        print_notice_and_exit(step, allowed_flags, None)
    }

    let Some(first) = args.first() else {
        print_notice_and_exit(step, allowed_flags, Some("missing instance size".to_string()))
    };
    let size = match first.parse::<usize>().map(InstanceSize::try_from) {
        Ok(Ok(size)) => size,
        Ok(Err(e)) => print_notice_and_exit(step, allowed_flags, Some(e.to_string())),
        Err(_) => print_notice_and_exit(
            step,
            allowed_flags,
            Some(format!("invalid instance size: {first}")),
        ),
    };

    let mut root = PathBuf::from(".");
    let mut flags = Vec::new();
    for arg in &args[1..] {
        if let Some(dir) = arg.strip_prefix("--root=") {
            root = PathBuf::from(dir);
        } else if allowed_flags
            .iter()
            .any(|f| arg == f || arg.starts_with(&format!("{f}=")))
        {
            flags.push(arg.clone());
        } else {
            print_notice_and_exit(
                step,
                allowed_flags,
                Some(format!("Unrecognized command: {arg}")),
            )
        }
    }

    Invocation {
        prms: InstanceParams::with_root(size, root),
        flags,
    }
}

impl Invocation {
    /// Whether a bare flag such as `--count_only` was passed.
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }

    /// The value of a `--flag=value` argument, if present.
    pub fn flag_value(&self, flag: &str) -> Option<&str> {
        self.flags
            .iter()
            .find_map(|f| f.strip_prefix(&format!("{flag}=")))
    }
}
