mod assets;
mod blend;
mod blob;
mod color_key;
mod compose;
mod config;
mod error;
mod fit;
mod luminance;
mod overlay;
mod raster;
mod session;

pub use assets::{AssetSource, Catalog, CatalogEntry, DirectorySource};
pub use blend::{BlendLaw, MaskBlend};
pub use blob::{Blob, blob_bounds, detect_blobs, erase_blobs};
pub use color_key::{ColorKey, remove_background};
pub use compose::{Compositor, PreparedDesign};
pub use config::{ComposeConfig, ConfigError};
pub use error::{AssetError, ComposeError};
pub use fit::{DrawRect, fit_contain};
pub use luminance::{BrightnessMetric, ThresholdScale, average, brightness_map, grayscale, luma};
pub use overlay::{Overlay, OverlayState, Placement, ZoomDirection, ZoomPolicy};
pub use raster::{Color, ColorParseError, Rect, clamp_channel, crop_region, put_region};
pub use session::PreviewSession;
