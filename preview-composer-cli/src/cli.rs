use std::path::PathBuf;

#[derive(clap::Parser)]
#[command(version, about = "Composite product designs, materials and stamps into a preview")]
pub struct Cli {
    /// JSON compositor config
    #[arg(short, long, env = "PREVIEW_CONFIG", global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Render a design, an optional material and the overlays of a scene file
    Render {
        #[arg(short, long)]
        design: PathBuf,
        #[arg(short, long)]
        material: Option<PathBuf>,
        #[arg(short, long)]
        scene: Option<PathBuf>,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// List the manufacturers, models, designs and materials of a catalog archive
    Catalog { path: PathBuf },
    /// Render a design picked from a catalog archive
    RenderCatalog {
        catalog: PathBuf,
        #[arg(long)]
        manufacturer: String,
        #[arg(long)]
        model: String,
        #[arg(long)]
        design: String,
        /// Material file name under materials/
        #[arg(long)]
        material: Option<String>,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Write the luminance transform of an image
    Gray { input: PathBuf, output: PathBuf },
    /// Print the dark blobs found in an image
    Blobs {
        input: PathBuf,
        #[arg(long, default_value_t = 128)]
        threshold: u8,
        #[arg(long, default_value_t = 50)]
        min_size: usize,
    },
}
