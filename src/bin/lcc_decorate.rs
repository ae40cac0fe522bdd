//! Analyze and decorate one terrain tile.
//!
//! Usage: cargo run --release --bin lcc_decorate -- [OPTIONS]
//!
//! Options:
//!   --config <PATH>       LandCoverConfig JSON (required)
//!   --lat <DEG>           Tile latitude (default: 0)
//!   --lon <DEG>           Tile longitude (default: 0)
//!   --heightfield <PATH>  16-bit grayscale PNG heightfield
//!   --synthetic <SIZE>    Noise heightfield of SIZE x SIZE samples instead
//!   --interval <M>        Heightfield sample spacing in meters (default: 30)
//!   --geo <PATH>          Georeferenced base image with a world file (repeatable)
//!   --models <DIR>        Model library directory containing index.json
//!   --seed <SEED>         Override the placement seed
//!   --out <PATH>          Write the placed scene as JSON

use std::path::PathBuf;
use std::time::Instant;

use landcover::core::TileId;
use landcover::raster::{GeospecificImage, HeightField};
use landcover::vegetation::ModelLibrary;
use landcover::LandCoverConfig;

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .format_timestamp_millis()
    .init();

    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run() -> landcover::core::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let config_path = parse_str_arg(&args, "--config")
        .ok_or_else(|| landcover::core::Error::Config("--config <PATH> is required".into()))?;
    let lat = parse_i32_arg(&args, "--lat").unwrap_or(0);
    let lon = parse_i32_arg(&args, "--lon").unwrap_or(0);
    let interval = parse_f32_arg(&args, "--interval").unwrap_or(30.0);

    let mut config = LandCoverConfig::load_sync(&PathBuf::from(&config_path))?;
    if let Some(seed) = parse_u64_arg(&args, "--seed") {
        config.vegetation.seed = seed;
    }

    let tile = TileId::new(lat, lon);
    let hf = if let Some(path) = parse_str_arg(&args, "--heightfield") {
        HeightField::load_png16(&PathBuf::from(path), interval, 1.0, 0.0)?
    } else {
        let size = parse_u32_arg(&args, "--synthetic").unwrap_or(256);
        let seed = config.vegetation.seed as u32;
        HeightField::from_noise(size, size, interval, seed, 800.0)?
    };

    println!("=== Land Cover Decorator ===");
    println!("Tile:   {}", tile);
    println!("Grid:   {} x {} @ {}m", hf.columns(), hf.rows(), interval);
    println!("Types:  {}", config.types.len());
    println!("Seed:   {}", config.vegetation.seed);
    println!("Cache:  {}", config.analyzer.cache_root.display());
    println!();

    let mut decorator = config.decorator();
    for path in all_str_args(&args, "--geo") {
        let image = GeospecificImage::load_with_world_file(&PathBuf::from(path))?;
        decorator.analyzer_mut().add_geospecific_image(image);
    }

    let library = match parse_str_arg(&args, "--models") {
        Some(dir) => ModelLibrary::load_dir(&PathBuf::from(dir))?,
        None => ModelLibrary::new(),
    };

    let start = Instant::now();
    let terrain = decorator.tile_terrain(tile, &hf);
    let scene = decorator.decorate_tile(tile, &hf, &terrain, &library)?;

    println!("Placed {} instances in {:.1}s", scene.instance_count(), start.elapsed().as_secs_f64());
    for (index, count) in &scene.stats.placed {
        println!("  class {:>3}: {}", index, count);
    }
    println!("Rejected by collision: {}", scene.stats.rejected);
    println!(
        "Groups: {} (children min {}, max {}, avg {:.1})",
        scene.stats.groups.group_count,
        scene.stats.groups.min_children,
        scene.stats.groups.max_children,
        scene.stats.groups.average_children
    );

    if let Some(out) = parse_str_arg(&args, "--out") {
        scene.save_sync(&PathBuf::from(&out))?;
        println!("Scene written to {}", out);
    }
    Ok(())
}

fn parse_f32_arg(args: &[String], flag: &str) -> Option<f32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_i32_arg(args: &[String], flag: &str) -> Option<i32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_u32_arg(args: &[String], flag: &str) -> Option<u32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_u64_arg(args: &[String], flag: &str) -> Option<u64> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn all_str_args<'a>(args: &'a [String], flag: &'a str) -> impl Iterator<Item = &'a String> {
    args.windows(2).filter(move |w| w[0] == flag).map(|w| &w[1])
}
