//! Embedded image extraction from PDF XObject resources

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::config::ImageConfig;
use crate::error::{Error, Result};
use crate::types::{FileType, ImageDocument, ImageFormat};

/// Nesting limit for Form XObjects that contain further XObjects
const MAX_FORM_DEPTH: usize = 8;

/// Limit on `/Parent` hops when looking for inherited `/Resources`
const MAX_PARENT_DEPTH: usize = 32;

/// Extracts images placed on the pages of a document
#[derive(Debug, Clone)]
pub struct ImageProcessor {
    enabled: bool,
    min_bytes: usize,
    output_dir: Option<PathBuf>,
}

impl ImageProcessor {
    pub fn new(config: &ImageConfig) -> Self {
        Self {
            enabled: config.enabled,
            min_bytes: config.min_bytes,
            output_dir: config.output_dir.clone(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Directory extracted images are written to, if any
    pub fn output_dir(&self) -> Option<&Path> {
        self.output_dir.as_deref()
    }

    /// Extract the images embedded in `file_path`.
    ///
    /// Formats that cannot carry images, and disabled extraction, yield an
    /// empty list.
    pub fn get_image_documents(&self, file_path: &Path) -> Result<Vec<ImageDocument>> {
        if !self.enabled || !FileType::from_path(file_path).has_images() {
            return Ok(Vec::new());
        }

        let data = std::fs::read(file_path)
            .map_err(|e| Error::image(format!("cannot read {}: {}", file_path.display(), e)))?;
        self.images_from_bytes(file_path, &data)
    }

    /// Extract images from in-memory PDF bytes, attributing them to `source`
    pub fn images_from_bytes(&self, source: &Path, data: &[u8]) -> Result<Vec<ImageDocument>> {
        let doc = Document::load_mem(data)
            .map_err(|e| Error::image(format!("cannot load {}: {}", source.display(), e)))?;
        if doc.is_encrypted() {
            return Err(Error::image(format!("{} is encrypted", source.display())));
        }

        let mut walk = ImageWalk {
            doc: &doc,
            source,
            min_bytes: self.min_bytes,
            seen: HashSet::new(),
            images: Vec::new(),
        };

        for (page_number, page_id) in doc.get_pages() {
            match page_resources(&doc, page_id) {
                Some(resources) => walk.collect(resources, page_number, 0),
                None => tracing::debug!(page = page_number, "Page has no resources"),
            }
        }

        tracing::debug!(
            file = %source.display(),
            images = walk.images.len(),
            "Extracted images"
        );
        Ok(walk.images)
    }

    /// Write images to the configured output directory; no-op when unset
    pub fn save(&self, images: &mut [ImageDocument]) -> Result<()> {
        match &self.output_dir {
            Some(dir) => save_images(images, dir),
            None => Ok(()),
        }
    }
}

impl Default for ImageProcessor {
    fn default() -> Self {
        Self::new(&ImageConfig::default())
    }
}

/// Write each image to `dir` as `<stem>_p<page>_<name>.<ext>`, recording
/// where it went. Name clashes within one call get a numeric suffix.
pub fn save_images(images: &mut [ImageDocument], dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let mut used = HashSet::new();

    for image in images.iter_mut() {
        let mut file_name = image.file_name();
        let mut n = 1;
        while !used.insert(file_name.clone()) {
            let base = image.file_name();
            let (stem, ext) = base.rsplit_once('.').unwrap_or((base.as_str(), ""));
            file_name = format!("{}_{}.{}", stem, n, ext);
            n += 1;
        }

        let path = dir.join(&file_name);
        std::fs::write(&path, &image.data)
            .map_err(|e| Error::image(format!("cannot write {}: {}", path.display(), e)))?;
        image.saved_path = Some(path);
    }

    tracing::debug!(dir = %dir.display(), count = images.len(), "Saved images");
    Ok(())
}

/// State for one document's resource walk
struct ImageWalk<'a> {
    doc: &'a Document,
    source: &'a Path,
    min_bytes: usize,
    /// Objects already visited, so shared images are reported once
    seen: HashSet<ObjectId>,
    images: Vec<ImageDocument>,
}

impl<'a> ImageWalk<'a> {
    fn collect(&mut self, resources: &'a Dictionary, page_number: u32, depth: usize) {
        let Some(xobjects) = resolve_dict_entry(self.doc, resources, b"XObject") else {
            return;
        };

        for (name, obj) in xobjects.iter() {
            if let Object::Reference(id) = obj {
                if !self.seen.insert(*id) {
                    continue;
                }
            }

            let stream = match resolve_object(self.doc, obj) {
                Object::Stream(s) => s,
                _ => continue,
            };

            match stream.dict.get(b"Subtype").and_then(Object::as_name) {
                Ok(b"Image") => {
                    let name = String::from_utf8_lossy(name).into_owned();
                    if let Some(image) = self.image_document(stream, page_number, name) {
                        self.images.push(image);
                    }
                }
                Ok(b"Form") if depth < MAX_FORM_DEPTH => {
                    if let Some(inner) = resolve_dict_entry(self.doc, &stream.dict, b"Resources") {
                        self.collect(inner, page_number, depth + 1);
                    }
                }
                Ok(b"Form") => {
                    tracing::debug!(page = page_number, "Form XObject nesting too deep, skipping");
                }
                _ => {}
            }
        }
    }

    fn image_document(&self, stream: &Stream, page_number: u32, name: String) -> Option<ImageDocument> {
        let format = image_format(&stream.dict);
        let data = image_bytes(stream, format);

        if data.is_empty() || data.len() < self.min_bytes {
            tracing::debug!(page = page_number, name = %name, bytes = data.len(), "Skipping small image");
            return None;
        }

        Some(ImageDocument {
            id: Uuid::new_v4(),
            source: self.source.to_path_buf(),
            page_number,
            name,
            width: get_u32(&stream.dict, b"Width"),
            height: get_u32(&stream.dict, b"Height"),
            bits_per_component: get_u32(&stream.dict, b"BitsPerComponent"),
            color_space: color_space_name(self.doc, &stream.dict),
            format,
            byte_len: data.len(),
            data,
            saved_path: None,
        })
    }
}

/// Find a page's resources, walking up the page tree for inherited ones
fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut dict = doc.get_object(page_id).ok()?.as_dict().ok()?;

    for _ in 0..MAX_PARENT_DEPTH {
        if let Some(resources) = resolve_dict_entry(doc, dict, b"Resources") {
            return Some(resources);
        }
        let parent = dict.get(b"Parent").ok()?;
        dict = resolve_object(doc, parent).as_dict().ok()?;
    }
    None
}

/// Classify an image stream by its last filter, which produced the pixels
fn image_format(dict: &Dictionary) -> ImageFormat {
    let last_filter = match dict.get(b"Filter") {
        Ok(Object::Name(n)) => Some(n.as_slice()),
        Ok(Object::Array(arr)) => arr.last().and_then(|o| o.as_name().ok()),
        _ => None,
    };

    match last_filter {
        Some(b"DCTDecode") | Some(b"DCT") => ImageFormat::Jpeg,
        Some(b"JPXDecode") => ImageFormat::Jpeg2000,
        Some(b"CCITTFaxDecode") | Some(b"CCF") => ImageFormat::Ccitt,
        Some(b"JBIG2Decode") => ImageFormat::Jbig2,
        _ => ImageFormat::Raw,
    }
}

/// Encoded image bytes: the stream itself for image codecs, decompressed
/// samples otherwise
fn image_bytes(stream: &Stream, format: ImageFormat) -> Vec<u8> {
    let single_filter = matches!(stream.dict.get(b"Filter"), Ok(Object::Name(_)));

    if format != ImageFormat::Raw && single_filter {
        return stream.content.clone();
    }
    stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone())
}

fn color_space_name(doc: &Document, dict: &Dictionary) -> Option<String> {
    let cs = resolve_object(doc, dict.get(b"ColorSpace").ok()?);
    let name = match cs {
        Object::Name(n) => n.as_slice(),
        Object::Array(arr) => arr.first()?.as_name().ok()?,
        _ => return None,
    };
    Some(String::from_utf8_lossy(name).into_owned())
}

fn get_u32(dict: &Dictionary, key: &[u8]) -> Option<u32> {
    dict.get(key).ok()?.as_i64().ok().and_then(|v| u32::try_from(v).ok())
}

/// Resolve a PDF object reference to its target, or return the object as-is.
fn resolve_object<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// Get a dictionary entry, following references
fn resolve_dict_entry<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Dictionary> {
    let obj = dict.get(key).ok()?;
    resolve_object(doc, obj).as_dict().ok()
}
