//! Generate a default job configuration file
//!
//! Creates a JSON config with all default parameters

use drone_stitch::{ClusterPolicy, StitchConfig};
use std::{env, path::Path, process};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: {} <output_config.json> <job_dir>", args[0]);
        eprintln!();
        eprintln!("Example:");
        eprintln!("  {} jobs/survey_01/config.json jobs/survey_01", args[0]);
        process::exit(1);
    }

    let output_path = Path::new(&args[1]);

    // Create parent directory if needed
    if let Some(parent) = output_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            eprintln!("Error creating directory: {}", e);
            process::exit(1);
        }
    }

    let config = StitchConfig::new(&args[2]);

    match config.to_json_file(output_path) {
        Ok(_) => {
            eprintln!("Configuration saved to {}", output_path.display());
            eprintln!();
            eprintln!("Config summary:");
            eprintln!("  Job dir:   {}", config.working_dir.display());
            eprintln!("  Clusters:  at most {} images each", config.divide_threshold);
            eprintln!(
                "  Stitcher:  {:?} mode, pano confidence {:.2}",
                config.stitch_mode(),
                config.pano_confidence
            );
            eprintln!("  Rotation:  ±{:.1}°", config.rotation_tolerance_deg);
            let policy = match config.cluster_policy {
                ClusterPolicy::ByCount => "by count".to_string(),
                ClusterPolicy::BySimilarity { max_iterations, seed } => {
                    format!("k-means ({} iterations, seed {})", max_iterations, seed)
                }
            };
            eprintln!("  Partition: {}", policy);
        }
        Err(e) => {
            eprintln!("Error saving config: {}", e);
            process::exit(1);
        }
    }
}
