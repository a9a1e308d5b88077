use std::{
    fs::{self, File},
    path::Path,
};

use clap::{CommandFactory, Parser};
use image::RgbaImage;
use preview_composer::{Catalog, ComposeConfig, Compositor, PreviewSession, detect_blobs, grayscale};

use crate::cli::{Cli, Commands};

mod cli;
mod scene;

pub fn run() -> anyhow::Result<()> {
    // parse command
    let args = Cli::parse();
    let config = load_config(args.config.as_deref())?;

    match args.command {
        Some(Commands::Render {
            design,
            material,
            scene,
            output,
        }) => {
            render(&config, &design, material.as_deref(), scene.as_deref(), &output)?;
        }
        Some(Commands::Catalog { path }) => {
            catalog_info(&path)?;
        }
        Some(Commands::RenderCatalog {
            catalog,
            manufacturer,
            model,
            design,
            material,
            output,
        }) => {
            render_catalog(
                config,
                &catalog,
                &manufacturer,
                &model,
                &design,
                material.as_deref(),
                &output,
            )?;
        }
        Some(Commands::Gray { input, output }) => {
            grayscale(&image::open(input)?.to_rgba8()).save(output)?;
        }
        Some(Commands::Blobs {
            input,
            threshold,
            min_size,
        }) => {
            blobs(&input, threshold, min_size)?;
        }
        None => {
            Cli::command().print_long_help()?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ComposeConfig> {
    match path {
        Some(path) => {
            log::info!("Loading config from {}", path.display());
            Ok(ComposeConfig::from_reader(File::open(path)?)?)
        }
        None => Ok(ComposeConfig::default()),
    }
}

fn render(
    config: &ComposeConfig,
    design: &Path,
    material: Option<&Path>,
    scene: Option<&Path>,
    output: &Path,
) -> anyhow::Result<()> {
    log::info!("Rendering {}", design.display());
    // open images
    let design = image::open(design)?.to_rgba8();
    let material = material
        .map(|path| image::open(path).map(|img| img.to_rgba8()))
        .transpose()?;

    // parse scene
    let placements = match scene {
        Some(path) => {
            let base_dir = path.parent().unwrap_or(Path::new("."));
            scene::parse_scene(&fs::read_to_string(path)?, base_dir)?
        }
        None => Vec::new(),
    };

    let frame = compose_scene(config, &design, material.as_ref(), &placements)?;
    frame.save(output)?;
    log::info!("Saved {}", output.display());

    Ok(())
}

/// Prepare the design, constrain scene overlays to its dark blobs when asked
/// to, and render one frame.
fn compose_scene(
    config: &ComposeConfig,
    design: &RgbaImage,
    material: Option<&RgbaImage>,
    placements: &[scene::ScenePlacement],
) -> anyhow::Result<RgbaImage> {
    let compositor = Compositor::new(config.clone());
    let prepared = compositor.prepare_design(design)?;
    let constraint = prepared
        .dark_bounds
        .filter(|_| config.constrain_overlay_to_region);
    let overlays = scene::build_overlays(placements, config, constraint)?;
    Ok(compositor.render(&prepared, material, &overlays)?)
}

fn catalog_info(path: &Path) -> anyhow::Result<()> {
    let catalog = Catalog::from_reader(File::open(path)?)?;

    for manufacturer in catalog.manufacturers() {
        println!("{manufacturer}");
        for model in catalog.models(&manufacturer) {
            println!("  {model}");
            for design in catalog.designs(&manufacturer, &model) {
                println!("    {} ({})", design.name, design.path);
            }
        }
    }
    println!("materials");
    for material in catalog.materials() {
        println!("  {} ({})", material.name, material.path);
    }

    Ok(())
}

fn render_catalog(
    config: ComposeConfig,
    path: &Path,
    manufacturer: &str,
    model: &str,
    design: &str,
    material: Option<&str>,
    output: &Path,
) -> anyhow::Result<()> {
    let catalog = Catalog::from_reader(File::open(path)?)?;
    let entry = catalog
        .designs(manufacturer, model)
        .into_iter()
        .find(|entry| entry.name == design)
        .ok_or_else(|| anyhow::anyhow!("No design {design} for {manufacturer} {model}"))?;
    let material = material.map(|name| format!("materials/{name}"));

    let mut session = PreviewSession::new(config, catalog);
    let frame = session
        .update(&entry.path, material.as_deref())?
        .ok_or_else(|| anyhow::anyhow!("Nothing was rendered"))?;
    frame.save(output)?;
    log::info!("Saved {}", output.display());

    Ok(())
}

fn blobs(input: &Path, threshold: u8, min_size: usize) -> anyhow::Result<()> {
    let image = image::open(input)?.to_rgba8();
    let blobs = detect_blobs(&image, threshold, min_size);

    println!("{} blobs", blobs.len());
    for (i, blob) in blobs.iter().enumerate() {
        let b = blob.bounds;
        println!(
            "  #{i}: {} px at ({}, {}) {}x{}",
            blob.size(),
            b.x,
            b.y,
            b.width,
            b.height
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};
    use preview_composer::ComposeConfig;

    use crate::{
        compose_scene,
        scene::tests::{placement, write_png},
    };

    fn lens_design() -> RgbaImage {
        let mut design = RgbaImage::from_pixel(544, 544, Rgba([220, 220, 220, 255]));
        for y in 40..100 {
            for x in 60..140 {
                design.put_pixel(x, y, Rgba([0, 0, 0, 255]));
            }
        }
        design
    }

    #[test]
    fn scene_overlays_follow_dark_region() {
        let config = ComposeConfig {
            erase_blobs: true,
            constrain_overlay_to_region: true,
            ..ComposeConfig::default()
        };
        let stamp = placement(write_png("render", "stamp.png", [0, 0, 255, 255]), 0.0, 0.0, true);

        let frame = compose_scene(&config, &lens_design(), None, &[stamp]).unwrap();
        assert_eq!(frame.get_pixel(65, 45), &Rgba([0, 0, 255, 255]));
        assert_eq!(frame.get_pixel(5, 5), &Rgba([220, 220, 220, 255]));
    }

    #[test]
    fn scene_overlays_stay_put_without_constraint() {
        let config = ComposeConfig {
            erase_blobs: true,
            ..ComposeConfig::default()
        };
        let stamp = placement(write_png("free", "stamp.png", [0, 0, 255, 255]), 0.0, 0.0, true);

        let frame = compose_scene(&config, &lens_design(), None, &[stamp]).unwrap();
        assert_eq!(frame.get_pixel(5, 5), &Rgba([0, 0, 255, 255]));
        assert_eq!(frame.get_pixel(65, 45), &Rgba([255, 255, 255, 255]));
    }
}
