/*!
 * hashcrack command-line driver
 *
 * Thin wrapper over the library:
 * - wordlist / mask attacks with a live progress spinner
 * - algorithm detection
 * - per-algorithm throughput benchmark
 */

mod cli;

use std::panic;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use cli::{Args, Mode, TargetArgs};
use hashcrack::{
    benchmark, crack_with_mask, crack_with_wordlist, detect, persist_outcome, Algorithm,
    CrackOptions, EngineConfig, MaskGenerator, ProgressSample, SearchOutcome,
};

/// Show errors instead of a bare abort
fn setup_panic_handler() {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        eprintln!("\nApplication Error");
        eprintln!("=================");

        if let Some(location) = panic_info.location() {
            eprintln!(
                "Location: {}:{}:{}",
                location.file(),
                location.line(),
                location.column()
            );
        }

        default_hook(panic_info);
    }));
}

fn setup_logging(verbose: u8) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        match verbose {
            0 => tracing_subscriber::EnvFilter::new("warn"),
            1 => tracing_subscriber::EnvFilter::new("info"),
            2 => tracing_subscriber::EnvFilter::new("debug"),
            _ => tracing_subscriber::EnvFilter::new("trace"),
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Format speed in human-readable form (H/s, KH/s, MH/s)
fn format_speed(speed: f64) -> String {
    if speed >= 1_000_000.0 {
        format!("{:.2} MH/s", speed / 1_000_000.0)
    } else if speed >= 1_000.0 {
        format!("{:.2} KH/s", speed / 1_000.0)
    } else {
        format!("{:.0} H/s", speed)
    }
}

fn progress_bar(total: Option<u64>) -> Result<ProgressBar> {
    let pb = match total {
        Some(total) => {
            let pb = ProgressBar::new(total);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .context("invalid progress template")?
                    .progress_chars("█▓▒░-"),
            );
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {pos} tested {msg}")
                    .context("invalid progress template")?,
            );
            pb
        }
    };
    pb.enable_steady_tick(Duration::from_millis(120));
    Ok(pb)
}

fn build_options(
    target: &TargetArgs,
    threads: Option<usize>,
    engine: &EngineConfig,
    pb: &ProgressBar,
) -> CrackOptions {
    let pb = pb.clone();
    CrackOptions {
        algorithm: target.algorithm,
        salt: target.salt.clone(),
        placement: target.placement,
        workers: threads,
        progress: Some(Arc::new(move |sample: ProgressSample| {
            pb.set_position(sample.tested);
            pb.set_message(format_speed(sample.rate));
        })),
        engine: engine.clone(),
        ..CrackOptions::default()
    }
}

fn report(outcome: &SearchOutcome, save: &Option<Option<PathBuf>>, engine: &EngineConfig) {
    println!();
    if outcome.success {
        println!(
            "{} {}",
            "✅ Secret recovered:".green().bold(),
            outcome.recovered_secret.as_deref().unwrap_or_default().bold()
        );
    } else {
        println!(
            "{} {}",
            "❌ Not recovered:".red().bold(),
            outcome.message.as_deref().unwrap_or("unknown error")
        );
    }

    println!("\n📊 Performance Statistics:");
    println!("   Algorithm: {}", outcome.algorithm);
    println!("   Total attempts: {}", outcome.stats.attempts);
    println!("   Time elapsed: {:.2}s", outcome.stats.duration_secs);
    println!("   Average rate: {}", format_speed(outcome.stats.rate));

    if let Some(dir) = save {
        let dir = dir.clone().unwrap_or_else(|| engine.log_dir.clone());
        // a failed save never changes the reported outcome
        match persist_outcome(outcome, &dir) {
            Ok(path) => println!("\n💾 Saved to {}", path.display()),
            Err(e) => eprintln!("\n{} {}", "⚠️  Could not save result:".yellow(), e),
        }
    }
}

fn run(args: Args) -> Result<bool> {
    let engine = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::load_or_default(),
    };
    let threads = args.threads;

    match args.mode {
        Mode::Wordlist {
            target,
            wordlist,
            rules,
        } => {
            println!("{}", "🚀 Starting wordlist attack".cyan().bold());
            println!("📋 Wordlist: {}", wordlist.display());
            println!("🧵 Workers: {}\n", engine.worker_count(threads));

            let pb = progress_bar(None)?;
            let options = CrackOptions {
                use_rules: rules,
                ..build_options(&target, threads, &engine, &pb)
            };
            let outcome = crack_with_wordlist(&target.hash, &wordlist, &options);
            pb.finish_and_clear();

            report(&outcome, &target.save, &engine);
            Ok(outcome.success)
        }

        Mode::Mask { target, mask } => {
            let total = MaskGenerator::parse(&mask).total_combinations();
            println!("{}", "🚀 Starting mask attack".cyan().bold());
            println!("🎭 Mask: {} ({} candidates)", mask, total);
            println!("🧵 Workers: {}\n", engine.worker_count(threads));

            let pb = progress_bar(Some(total))?;
            let options = build_options(&target, threads, &engine, &pb);
            let outcome = crack_with_mask(&target.hash, &mask, &options);
            pb.finish_and_clear();

            report(&outcome, &target.save, &engine);
            Ok(outcome.success)
        }

        Mode::Detect { hash } => {
            let algorithm = detect(&hash);
            if algorithm == Algorithm::Unknown {
                println!("{}", "❓ Unknown hash format".yellow());
                Ok(false)
            } else {
                println!("🔍 {}", algorithm.to_string().green().bold());
                Ok(true)
            }
        }

        Mode::Benchmark {
            algorithm,
            duration,
        } => {
            if !(duration > 0.0 && duration.is_finite()) {
                bail!("Benchmark duration must be a positive number of seconds");
            }
            let duration = Duration::from_secs_f64(duration);
            let algorithms: Vec<Algorithm> = match algorithm {
                Some(algo) => vec![algo],
                None => Algorithm::ALL.to_vec(),
            };

            println!("{}", "⏱️  Benchmark (single thread)".cyan().bold());
            for algo in algorithms {
                match benchmark(algo, duration) {
                    Ok(rate) => println!("   {:<8} {}", algo.to_string(), format_speed(rate)),
                    Err(e) => println!("   {:<8} {}", algo.to_string(), e.to_string().dimmed()),
                }
            }
            Ok(true)
        }
    }
}

fn main() {
    setup_panic_handler();

    let args = Args::parse();
    setup_logging(args.verbose);

    eprintln!("\nhashcrack v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("================================\n");

    match run(args) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(2);
        }
    }
}
