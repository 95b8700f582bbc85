use std::path::PathBuf;

use anyhow::Context;
use aseprite_flatten::{Document, FlattenOptions, LayerKind};
use clap::{ArgAction, Parser};
use log::info;

/// Flattens the frames of an aseprite file into PNG images.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// The .ase or .aseprite file to read
    file: PathBuf,

    /// Directory to write frame_NNN.png files to
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Include hidden layers
    #[arg(long)]
    hidden: bool,

    /// Leave out the background layer
    #[arg(long)]
    no_background: bool,

    /// Print the decoded document as JSON
    #[arg(long)]
    json: bool,

    /// More logging, repeat for more
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let doc = Document::from_path(&args.file)
        .with_context(|| format!("decoding {}", args.file.display()))?;
    print_summary(&doc);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&doc)?);
    }

    if let Some(out) = &args.out {
        let options = FlattenOptions {
            only_visible_layers: !args.hidden,
            include_background_layer: !args.no_background,
            ..FlattenOptions::default()
        };
        std::fs::create_dir_all(out).with_context(|| format!("creating {}", out.display()))?;
        for (i, frame) in doc.flatten_all_frames(&options).into_iter().enumerate() {
            let path = out.join(format!("frame_{i:03}.png"));
            let image = image::RgbaImage::from_raw(frame.width, frame.height, frame.to_rgba_bytes())
                .context("frame buffer does not match its size")?;
            image
                .save(&path)
                .with_context(|| format!("writing {}", path.display()))?;
            info!("wrote {}", path.display());
        }
    }
    Ok(())
}

fn print_summary(doc: &Document) {
    println!(
        "{}x{} {:?}, {} frames, {} colors",
        doc.width(),
        doc.height(),
        doc.header.color_depth,
        doc.frames.len(),
        doc.palette.len()
    );
    for (i, layer) in doc.layers.iter().enumerate() {
        let kind = match layer.kind {
            LayerKind::Normal => "layer",
            LayerKind::Group { .. } => "group",
            LayerKind::Tilemap { .. } => "tilemap",
        };
        let indent = "  ".repeat(layer.child_level as usize);
        let hidden = if doc.is_layer_visible(i) { "" } else { " (hidden)" };
        println!(
            "{indent}{kind} {:?} {:?} {}{hidden}",
            layer.name, layer.blend_mode, layer.opacity
        );
    }
    for tag in &doc.tags {
        println!(
            "tag {:?} frames {}..={} {:?}",
            tag.name, tag.from, tag.to, tag.direction
        );
    }
    for slice in &doc.slices {
        println!("slice {:?} with {} keys", slice.name, slice.keys.len());
    }
    for tileset in &doc.tilesets {
        println!(
            "tileset {} {:?}: {} tiles of {}x{}",
            tileset.id, tileset.name, tileset.tile_count, tileset.tile_width, tileset.tile_height
        );
    }
}
