//! Standalone compositor driver.
//!
//! Places images on garment regions from the command line and writes the
//! resulting composite texture (and optionally the bump layer) as PNG.
//! Useful for eyeballing region layouts and fabric parameters without a
//! render layer attached.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use log::info;

use stoffa::cli::Args;
use stoffa::entities::{PixelBuffer, WeavePattern};
use stoffa::{ImageSource, SessionOptions, TextureMapperSession};

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(args.log_level())
        .init();

    let mut options = match &args.config {
        Some(path) => SessionOptions::from_json_file(path)
            .with_context(|| format!("Loading config {}", path.display()))?,
        None => SessionOptions::default(),
    };

    if let Some(size) = args.size {
        options.canvas_width = size;
        options.canvas_height = size;
    }
    if let Some(color) = &args.color {
        options.fabric.base_color = parse_color(color)?;
    }
    if let Some(weave) = &args.weave {
        options.fabric.weave = parse_weave(weave)?;
    }

    if let Some(path) = &args.dump_config {
        options.to_json_file(path)?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    let mut session = TextureMapperSession::new(options)?;

    // Kick off all decodes first; they run in parallel on the pool.
    let mut placed_regions = Vec::new();
    for pair in &args.place {
        let (region, file) = Args::split_pair(pair)?;
        session.set_image(region, ImageSource::Path(file.into()))?;
        placed_regions.push(region.to_string());
    }

    // Drive the tick loop until every decode landed.
    let deadline = Instant::now() + Duration::from_secs(30);
    loop {
        session.tick();
        if placed_regions.iter().all(|r| !session.has_pending_decode(r)) {
            break;
        }
        anyhow::ensure!(Instant::now() < deadline, "Decode timed out");
        std::thread::sleep(Duration::from_millis(5));
    }
    for region in &placed_regions {
        anyhow::ensure!(
            session.placement(region).is_some(),
            "No image landed on region '{}' (decode failed?)",
            region
        );
    }

    for pair in &args.preset {
        let (region, preset) = Args::split_pair(pair)?;
        session.apply_preset(region, preset)?;
    }
    session.tick();

    save_composite(&mut session, &args.out)?;
    info!("Wrote composite to {}", args.out.display());

    if let Some(bump_path) = &args.bump {
        save_bump(&mut session, bump_path)?;
        info!("Wrote bump layer to {}", bump_path.display());
    }

    println!("Composite revision {} -> {}", session.revision(), args.out.display());
    Ok(())
}

fn parse_color(text: &str) -> anyhow::Result<[u8; 4]> {
    let parts: Vec<&str> = text.split(',').collect();
    anyhow::ensure!(parts.len() == 3, "Expected R,G,B, got '{}'", text);
    let mut rgba = [0u8, 0, 0, 255];
    for (i, part) in parts.iter().enumerate() {
        rgba[i] = part
            .trim()
            .parse()
            .with_context(|| format!("Bad color channel '{}'", part))?;
    }
    Ok(rgba)
}

fn parse_weave(text: &str) -> anyhow::Result<WeavePattern> {
    match text {
        "plain" => Ok(WeavePattern::Plain),
        "twill" => Ok(WeavePattern::Twill),
        "rib" => Ok(WeavePattern::Rib),
        _ => anyhow::bail!("Unknown weave '{}' (plain, twill, rib)", text),
    }
}

fn save_composite(session: &mut TextureMapperSession, path: &Path) -> anyhow::Result<()> {
    let canvas = session.composite();
    let (w, h) = canvas.size();
    let img = image::RgbaImage::from_raw(w as u32, h as u32, canvas.pixels().to_vec())
        .context("Composite buffer size mismatch")?;
    img.save(path)?;
    Ok(())
}

fn save_bump(session: &mut TextureMapperSession, path: &Path) -> anyhow::Result<()> {
    let bump = session.bump_map();
    let (w, h) = (bump.width(), bump.height());
    let PixelBuffer::F32(buf) = bump.buffer() else {
        anyhow::bail!("Bump layer is not F32");
    };
    // Height in RGB, full alpha; quantize to 8-bit for the PNG.
    let bytes: Vec<u8> = buf
        .iter()
        .map(|v| (v * 255.0).clamp(0.0, 255.0) as u8)
        .collect();
    let img = image::RgbaImage::from_raw(w as u32, h as u32, bytes)
        .context("Bump buffer size mismatch")?;
    img.save(path)?;
    Ok(())
}
