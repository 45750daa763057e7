// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CLI tool: reconstruct metric rooms, walls and openings from a floor plan
//!
//! Door and window boxes come from an external detector and are passed in
//! as a JSON file.
//!
//! Usage:
//!   floorplan-reconstruct <image_path> --scale <m/px> [options]

use anyhow::{bail, Context, Result};
use floorplan_lite_vision::{reconstruct, ReconstructionConfig, StaticDetections};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

struct Args {
    image_path: PathBuf,
    scale: Option<f64>,
    detections_path: Option<PathBuf>,
    config_path: Option<PathBuf>,
    output_path: Option<PathBuf>,
    debug_masks_dir: Option<PathBuf>,
    compact: bool,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let argv: Vec<String> = env::args().collect();
    if argv.len() < 2 || argv[1] == "--help" || argv[1] == "-h" {
        print_usage();
        return;
    }

    if let Err(e) = run(&argv) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(argv: &[String]) -> Result<()> {
    let args = parse_args(argv)?;

    let scale = match args.scale {
        Some(scale) => scale,
        None => env::var("FLOORPLAN_SCALE")
            .context("--scale not given and FLOORPLAN_SCALE not set")?
            .parse()
            .context("Invalid FLOORPLAN_SCALE value")?,
    };

    let config = match &args.config_path {
        Some(path) => {
            let json = read_to_string(path)?;
            ReconstructionConfig::from_json(&json)
                .with_context(|| format!("Invalid config '{}'", path.display()))?
        }
        None => ReconstructionConfig::default(),
    };

    let detector = match &args.detections_path {
        Some(path) => {
            let json = read_to_string(path)?;
            StaticDetections::from_json(&json)
                .with_context(|| format!("Invalid detections '{}'", path.display()))?
        }
        None => StaticDetections::default(),
    };

    let image = image::open(&args.image_path)
        .with_context(|| format!("Cannot open image '{}'", args.image_path.display()))?
        .to_rgb8();

    tracing::info!(
        image = %args.image_path.display(),
        width = image.width(),
        height = image.height(),
        scale,
        detections = detector.detections().len(),
        "Starting reconstruction"
    );

    let out = reconstruct(&image, scale, detector.detections(), &config)?;

    if let Some(dir) = &args.debug_masks_dir {
        write_debug_masks(dir, &out)?;
    }

    let json = out.result.to_json(args.compact)?;
    match &args.output_path {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Cannot write '{}'", path.display()))?;
            tracing::info!(output = %path.display(), "Wrote reconstruction");
        }
        None => println!("{}", json),
    }

    Ok(())
}

fn parse_args(argv: &[String]) -> Result<Args> {
    let mut args = Args {
        image_path: PathBuf::from(&argv[1]),
        scale: None,
        detections_path: None,
        config_path: None,
        output_path: None,
        debug_masks_dir: None,
        compact: false,
    };

    let mut i = 2;
    while i < argv.len() {
        match argv[i].as_str() {
            "--scale" => {
                let value = option_value(argv, &mut i)?;
                args.scale = Some(value.parse().context("Invalid scale value")?);
            }
            "--detections" => args.detections_path = Some(option_value(argv, &mut i)?.into()),
            "--config" => args.config_path = Some(option_value(argv, &mut i)?.into()),
            "--output" => args.output_path = Some(option_value(argv, &mut i)?.into()),
            "--debug-masks" => args.debug_masks_dir = Some(option_value(argv, &mut i)?.into()),
            "--compact" => args.compact = true,
            other => {
                print_usage();
                bail!("Unknown option: {}", other);
            }
        }
        i += 1;
    }

    Ok(args)
}

fn option_value<'a>(argv: &'a [String], i: &mut usize) -> Result<&'a str> {
    let flag = &argv[*i];
    *i += 1;
    argv.get(*i)
        .map(String::as_str)
        .with_context(|| format!("Missing value for {}", flag))
}

fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Cannot read '{}'", path.display()))
}

fn write_debug_masks(dir: &Path, out: &floorplan_lite_vision::Reconstruction) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Cannot create '{}'", dir.display()))?;

    let masks = [
        ("binary.png", &out.masks.binary),
        ("cleaned.png", &out.masks.cleaned),
        ("interior.png", &out.masks.interior),
    ];
    for (name, mask) in masks {
        let path = dir.join(name);
        mask.as_image()
            .save(&path)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;
    }

    tracing::info!(dir = %dir.display(), "Wrote debug masks");
    Ok(())
}

fn print_usage() {
    eprintln!("Usage: floorplan-reconstruct <image_path> --scale <m/px> [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scale <f64>          Meters per pixel (falls back to FLOORPLAN_SCALE)");
    eprintln!("  --detections <path>    JSON array of {{class_label, confidence, bbox}}");
    eprintln!("  --config <path>        JSON reconstruction config (partial allowed)");
    eprintln!("  --output <path>        Write result JSON here instead of stdout");
    eprintln!("  --debug-masks <dir>    Write binary, cleaned and interior masks as PNG");
    eprintln!("  --compact              Single-line JSON");
    eprintln!();
    eprintln!("Logging is controlled by RUST_LOG (default: info).");
}
