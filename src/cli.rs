use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use hashcrack::{Algorithm, Placement};

#[derive(Parser)]
#[command(name = "hashcrack")]
#[command(version)]
#[command(about = "Offline hash recovery (wordlist and mask attacks) - Educational use only", long_about = None)]
pub struct Args {
    /// Number of worker threads (default: CPU count)
    #[arg(short, long, global = true)]
    pub threads: Option<usize>,

    /// Engine config file (JSON)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Command to execute
    #[command(subcommand)]
    pub mode: Mode,
}

/// Options shared by both attack modes
#[derive(ClapArgs)]
pub struct TargetArgs {
    /// Target digest (hex, or a bcrypt string)
    #[arg(value_name = "HASH")]
    pub hash: String,

    /// Hash algorithm (detected from the digest when omitted)
    #[arg(short, long)]
    pub algorithm: Option<Algorithm>,

    /// Salt combined with every candidate
    #[arg(short, long)]
    pub salt: Option<String>,

    /// Salt placement (both are tried when omitted)
    #[arg(short, long)]
    pub placement: Option<Placement>,

    /// Save the result record to this directory (default: config log_dir)
    #[arg(long, value_name = "DIR")]
    pub save: Option<Option<PathBuf>>,
}

#[derive(Subcommand)]
pub enum Mode {
    /// Test every line of a wordlist
    ///
    /// Example: hashcrack wordlist 482c811da5d5b4bc6d497ffa98491e38 rockyou.txt --rules
    Wordlist {
        #[command(flatten)]
        target: TargetArgs,

        /// Path to wordlist file
        #[arg(value_name = "WORDLIST")]
        wordlist: PathBuf,

        /// Also try case, reversal and decoration variants of each word
        #[arg(short, long)]
        rules: bool,
    },

    /// Enumerate a mask (?l lower, ?u upper, ?d digit, ?s symbol)
    ///
    /// Example: hashcrack mask <HASH> '?l?l?d?d' --salt saltvalue --placement prefix
    Mask {
        #[command(flatten)]
        target: TargetArgs,

        /// Mask pattern
        #[arg(value_name = "MASK")]
        mask: String,
    },

    /// Identify the algorithm of a digest
    Detect {
        #[arg(value_name = "HASH")]
        hash: String,
    },

    /// Measure single-thread hashing throughput
    Benchmark {
        /// Algorithm to measure (all when omitted)
        #[arg(value_name = "ALGORITHM")]
        algorithm: Option<Algorithm>,

        /// Seconds per algorithm
        #[arg(short, long, default_value = "2")]
        duration: f64,
    },
}
