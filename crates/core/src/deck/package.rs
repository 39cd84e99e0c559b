use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::deck::shapes::Slide;
use crate::deck::xml::XmlDocument;
use crate::deck::DeckError;

const PRESENTATION_PART: &str = "ppt/presentation.xml";
const PRESENTATION_RELS_PART: &str = "ppt/_rels/presentation.xml.rels";

/// An opened PPTX package.
///
/// Slide parts are parsed into XML trees and may be mutated through
/// [`Presentation::slides_mut`]; every other part is carried as raw bytes and
/// written back unchanged, in the original entry order.
#[derive(Clone, Debug)]
pub struct Presentation {
    entries: Vec<PackageEntry>,
    slides: Vec<Slide>,
}

#[derive(Clone, Debug)]
struct PackageEntry {
    name: String,
    compression: CompressionMethod,
    data: EntryData,
}

#[derive(Clone, Debug)]
enum EntryData {
    Directory,
    Raw(Vec<u8>),
    /// Index into `Presentation::slides`.
    Slide(usize),
}

impl Presentation {
    pub fn open(path: &Path) -> Result<Self, DeckError> {
        let bytes = fs::read(path)
            .map_err(|source| DeckError::Read { path: path.to_path_buf(), source })?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DeckError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut raw_entries = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let mut file = archive.by_index(index)?;
            let name = file.name().to_string();
            let compression = file.compression();
            if file.is_dir() {
                raw_entries.push((name, compression, None));
                continue;
            }
            let mut data = Vec::new();
            file.read_to_end(&mut data)?;
            raw_entries.push((name, compression, Some(data)));
        }

        let slide_parts = {
            let lookup = |part: &str| {
                raw_entries
                    .iter()
                    .find(|(name, _, _)| name == part)
                    .and_then(|(_, _, data)| data.as_deref())
                    .ok_or_else(|| DeckError::MissingPart(part.to_string()))
            };
            let presentation = parse_part(PRESENTATION_PART, lookup(PRESENTATION_PART)?)?;
            let relationships = parse_part(PRESENTATION_RELS_PART, lookup(PRESENTATION_RELS_PART)?)?;
            slide_part_names(&presentation, &relationships)?
        };

        let mut slides: Vec<Option<Slide>> = vec![None; slide_parts.len()];
        let mut entries = Vec::with_capacity(raw_entries.len());
        for (name, compression, data) in raw_entries {
            let data = match data {
                None => EntryData::Directory,
                Some(bytes) => match slide_parts.iter().position(|part| *part == name) {
                    Some(order) => {
                        let document = parse_part(&name, &bytes)?;
                        slides[order] = Some(Slide::new(name.clone(), document));
                        EntryData::Slide(order)
                    }
                    None => EntryData::Raw(bytes),
                },
            };
            entries.push(PackageEntry { name, compression, data });
        }

        let slides = slides
            .into_iter()
            .zip(&slide_parts)
            .map(|(slide, part)| slide.ok_or_else(|| DeckError::MissingPart(part.clone())))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            event_name = "deck.package.opened",
            entries = entries.len(),
            slides = slides.len(),
            "presentation package opened"
        );

        Ok(Self { entries, slides })
    }

    /// Slides in presentation order (not archive order).
    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    pub fn slides_mut(&mut self) -> &mut [Slide] {
        &mut self.slides
    }

    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    pub fn table_count(&self) -> usize {
        self.slides.iter().map(Slide::table_count).sum()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, DeckError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for entry in &self.entries {
            let options = SimpleFileOptions::default().compression_method(writable(entry.compression));
            match &entry.data {
                EntryData::Directory => writer.add_directory(entry.name.as_str(), options)?,
                EntryData::Raw(bytes) => {
                    writer.start_file(entry.name.as_str(), options)?;
                    writer.write_all(bytes)?;
                }
                EntryData::Slide(index) => {
                    let bytes = self.slides[*index].document().to_bytes().map_err(|error| {
                        DeckError::Xml { part: entry.name.clone(), message: error.0 }
                    })?;
                    writer.start_file(entry.name.as_str(), options)?;
                    writer.write_all(&bytes)?;
                }
            }
        }
        Ok(writer.finish()?.into_inner())
    }

    /// Serializes the package and moves it into place at `path`.
    ///
    /// Bytes go to a hidden temporary sibling first and are renamed over the
    /// destination, so a failure never leaves a truncated file at `path`.
    pub fn save(&self, path: &Path) -> Result<(), DeckError> {
        let bytes = self.to_bytes()?;

        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&directory)?;

        let file_name =
            path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default();
        let staging = directory.join(format!(".{file_name}.{}.tmp", Uuid::new_v4()));
        fs::write(&staging, &bytes)?;
        if let Err(error) = fs::rename(&staging, path) {
            let _ = fs::remove_file(&staging);
            return Err(error.into());
        }

        debug!(
            event_name = "deck.package.saved",
            path = %path.display(),
            bytes = bytes.len(),
            "presentation package saved"
        );
        Ok(())
    }
}

fn writable(method: CompressionMethod) -> CompressionMethod {
    match method {
        CompressionMethod::Stored => CompressionMethod::Stored,
        _ => CompressionMethod::Deflated,
    }
}

fn parse_part(name: &str, bytes: &[u8]) -> Result<XmlDocument, DeckError> {
    XmlDocument::parse(bytes)
        .map_err(|error| DeckError::Xml { part: name.to_string(), message: error.0 })
}

/// Slide part names in the order `p:sldIdLst` lists them.
fn slide_part_names(
    presentation: &XmlDocument,
    relationships: &XmlDocument,
) -> Result<Vec<String>, DeckError> {
    let targets: HashMap<&str, &str> = relationships
        .root()
        .map(|root| {
            root.elements()
                .filter(|element| element.is("Relationship"))
                .filter_map(|rel| Some((rel.attr("Id")?, rel.attr("Target")?)))
                .collect()
        })
        .unwrap_or_default();

    let Some(list) = presentation.root().and_then(|root| root.child("sldIdLst")) else {
        return Ok(Vec::new());
    };

    list.elements()
        .filter(|element| element.is("sldId"))
        .map(|slide_id| {
            let relationship_id = slide_id
                .attr("r:id")
                .ok_or_else(|| DeckError::MissingPart("p:sldId without r:id".to_string()))?;
            let target = targets.get(relationship_id).ok_or_else(|| {
                DeckError::MissingPart(format!("relationship `{relationship_id}`"))
            })?;
            Ok(resolve_part("ppt", target))
        })
        .collect()
}

/// Resolves a relationship target against the directory of its source part.
pub(crate) fn resolve_part(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}
