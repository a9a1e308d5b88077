use std::{
    collections::{BTreeMap, HashMap},
    io::{Read, Seek},
    path::PathBuf,
};

use image::RgbaImage;
use zip::ZipArchive;

use crate::error::AssetError;

const DESIGN_FOLDER: &str = "design";
const MATERIAL_FOLDER: &str = "materials";
const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];

/// Anything that can hand out decoded images by key.
pub trait AssetSource {
    fn load(&mut self, key: &str) -> Result<RgbaImage, AssetError>;
}

/// Decodes image files below a root directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetSource for DirectorySource {
    fn load(&mut self, key: &str) -> Result<RgbaImage, AssetError> {
        let path = self.root.join(key);
        if !path.is_file() {
            return Err(AssetError::NotFound(key.to_string()));
        }
        Ok(image::open(path)?.to_rgba8())
    }
}

impl AssetSource for HashMap<String, RgbaImage> {
    fn load(&mut self, key: &str) -> Result<RgbaImage, AssetError> {
        self.get(key)
            .cloned()
            .ok_or_else(|| AssetError::NotFound(key.to_string()))
    }
}

fn is_image(file_name: &str) -> bool {
    file_name
        .rsplit_once('.')
        .is_some_and(|(_, ext)| IMAGE_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}

fn stem(file_name: &str) -> &str {
    file_name.rsplit_once('.').map_or(file_name, |(stem, _)| stem)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: String,
    /// Path inside the archive, usable as an asset key.
    pub path: String,
}

/// A zip archive of designs and materials:
///
/// ```text
/// design/<manufacturer>/<model>_<design>.png
/// materials/<material>.jpg
/// ```
pub struct Catalog<R>
where
    R: Read + Seek,
{
    zip: ZipArchive<R>,
    /// manufacturer -> design file names
    designs: BTreeMap<String, Vec<String>>,
    materials: Vec<CatalogEntry>,
}

impl<R> Catalog<R>
where
    R: Read + Seek,
{
    pub fn from_reader(reader: R) -> Result<Self, AssetError> {
        Self::from_zip(ZipArchive::new(reader)?)
    }

    pub fn from_zip(zip: ZipArchive<R>) -> Result<Self, AssetError> {
        let mut designs: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut materials = Vec::new();

        for path in zip.file_names() {
            let parts: Vec<&str> = path.split('/').collect();
            match parts.as_slice() {
                [DESIGN_FOLDER, manufacturer, file] if !manufacturer.is_empty() => {
                    let files = designs.entry(manufacturer.to_string()).or_default();
                    if is_image(file) {
                        files.push(file.to_string());
                    }
                }
                [MATERIAL_FOLDER, file] if is_image(file) => {
                    materials.push(CatalogEntry {
                        name: file.to_string(),
                        path: path.to_string(),
                    });
                }
                _ => {}
            }
        }

        for files in designs.values_mut() {
            files.sort();
        }
        materials.sort_by(|a, b| a.path.cmp(&b.path));

        log::debug!(
            "catalog holds {} manufacturers and {} materials",
            designs.len(),
            materials.len()
        );
        Ok(Self {
            zip,
            designs,
            materials,
        })
    }

    pub fn manufacturers(&self) -> Vec<String> {
        self.designs.keys().cloned().collect()
    }

    /// Model names of a manufacturer: the file name part before the first `_`.
    pub fn models(&self, manufacturer: &str) -> Vec<String> {
        let mut models: Vec<String> = Vec::new();
        for file in self.designs.get(manufacturer).into_iter().flatten() {
            let model = stem(file).split('_').next().unwrap_or_default();
            if !models.iter().any(|m| m == model) {
                models.push(model.to_string());
            }
        }
        models
    }

    /// Designs of one model, named by the file name part after the first `_`.
    pub fn designs(&self, manufacturer: &str, model: &str) -> Vec<CatalogEntry> {
        self.designs
            .get(manufacturer)
            .into_iter()
            .flatten()
            .filter_map(|file| {
                let (file_model, design) = stem(file).split_once('_')?;
                (file_model == model).then(|| CatalogEntry {
                    name: design.to_string(),
                    path: format!("{DESIGN_FOLDER}/{manufacturer}/{file}"),
                })
            })
            .collect()
    }

    pub fn materials(&self) -> &[CatalogEntry] {
        &self.materials
    }
}

impl<R> AssetSource for Catalog<R>
where
    R: Read + Seek,
{
    fn load(&mut self, key: &str) -> Result<RgbaImage, AssetError> {
        let mut entry = self
            .zip
            .by_name(key)
            .map_err(|_err| AssetError::NotFound(key.to_string()))?;

        let mut buf = Vec::new();
        entry.read_to_end(&mut buf)?;

        Ok(image::load_from_memory(&buf)?.to_rgba8())
    }
}
