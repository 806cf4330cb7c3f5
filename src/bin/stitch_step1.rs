//! Command-line driver for one stitching job
//!
//! Runs alignment, clustering and stitching on `<input>/images` and writes
//! the artifacts to `<input>/opencv_output`.

use drone_stitch::{stitch_run, StitchConfig};
use std::{env, path::Path, process, time::Instant};

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    let mut input = String::from("input");
    let mut pano_conf = None;
    let mut scans = None;
    let mut config_path = None;

    // Parse arguments
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-i" | "--input" => input = next_value(&args, &mut i),
            "-p" | "--pano_conf" => {
                let value = next_value(&args, &mut i);
                pano_conf = Some(parse_or_exit::<f64>("--pano_conf", &value));
            }
            "-r" | "--scans" => {
                let value = next_value(&args, &mut i);
                scans = Some(parse_or_exit::<i32>("--scans", &value));
            }
            "-c" | "--config" => config_path = Some(next_value(&args, &mut i)),
            "--help" | "-h" => {
                print_help(&args[0]);
                process::exit(0);
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                eprintln!("Use --help for usage information");
                process::exit(1);
            }
        }
        i += 1;
    }

    // Config file first, command-line values override it
    let mut config = match config_path {
        Some(path) => match StitchConfig::from_json_file(Path::new(&path)) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading config {}: {}", path, e);
                process::exit(1);
            }
        },
        None => StitchConfig::new(&input),
    };
    if input_given(&args) {
        config.working_dir = input.into();
    }
    if let Some(value) = pano_conf {
        config.pano_confidence = value;
    }
    if let Some(value) = scans {
        config.scans = value;
    }

    let start = Instant::now();
    let result = stitch_run(&config);
    let elapsed = start.elapsed();

    match result {
        Ok(report) if report.is_success() => {
            println!(
                "Stitched {} clusters into {}",
                report.n_clusters,
                config.working_dir.display()
            );
            println!("Elapsed: {:.2}s", elapsed.as_secs_f64());
        }
        Ok(report) => {
            if let Some(failure) = report.failure {
                eprintln!("Cluster {} failed: {}", failure.cluster, failure.message);
            }
            eprintln!("Elapsed: {:.2}s", elapsed.as_secs_f64());
            process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("{}", e.user_message());
            eprintln!("Elapsed: {:.2}s", elapsed.as_secs_f64());
            // Input problems exit with 2 so callers know a rerun will not help
            process::exit(if e.is_job_fatal() { 2 } else { 1 });
        }
    }
}

/// Whether `-i/--input` was given explicitly
fn input_given(args: &[String]) -> bool {
    args.iter().any(|a| a == "-i" || a == "--input")
}

fn next_value(args: &[String], i: &mut usize) -> String {
    if *i + 1 >= args.len() {
        eprintln!("Error: {} requires a value", args[*i]);
        process::exit(1);
    }
    *i += 1;
    args[*i].clone()
}

fn parse_or_exit<T: std::str::FromStr>(option: &str, value: &str) -> T {
    match value.parse() {
        Ok(parsed) => parsed,
        Err(_) => {
            eprintln!("Error: invalid value '{}' for {}", value, option);
            process::exit(1);
        }
    }
}

fn print_help(program: &str) {
    eprintln!("Usage: {} [OPTIONS]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -i, --input <DIR>       Job directory containing images/ (default: input)");
    eprintln!("  -p, --pano_conf <F>     Panorama confidence threshold (default: 1.0)");
    eprintln!("  -r, --scans <N>         1 = scans mode, otherwise panorama mode (default: 1)");
    eprintln!("  -c, --config <FILE>     Load a JSON job configuration");
    eprintln!("  -h, --help              Show this help");
    eprintln!();
    eprintln!("Set RUST_LOG=info (or debug) for progress output.");
    eprintln!("Exit status 2 means the job input itself is invalid.");
}
