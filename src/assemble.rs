//! Turning captured frames into one PDF using lopdf

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use image::{DynamicImage, GenericImageView, RgbImage};
use log::debug;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use crate::capture::{CapturedPage, PageData};
use crate::error::{Error, Result};

/// Page attributes a page may inherit from its `Pages` ancestors
const INHERITABLE: &[&[u8]] = &[b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Composite an image onto an opaque white background
pub fn flatten_alpha(img: &DynamicImage) -> RgbImage {
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut rgb = RgbImage::new(width, height);
    for (x, y, px) in rgba.enumerate_pixels() {
        let [r, g, b, a] = px.0;
        let alpha = a as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        rgb.put_pixel(x, y, image::Rgb([blend(r), blend(g), blend(b)]));
    }
    rgb
}

/// Build a one-page document showing a PNG or JPEG image edge to edge.
///
/// The page measures `pixels * 72 / dpi` points in each direction, so a
/// 1920x1080 capture at 100 dpi gives a 1382.4x777.6pt page.
pub fn image_page(bytes: &[u8], dpi: f64) -> Result<Document> {
    if dpi <= 0.0 {
        return Err(Error::ConfigError(format!("dpi must be positive, got {}", dpi)));
    }

    let img = image::load_from_memory(bytes)?;
    let (px_width, px_height) = img.dimensions();
    let rgb = flatten_alpha(&img);

    let width_pt = (px_width as f64 * 72.0 / dpi) as f32;
    let height_pt = (px_height as f64 * 72.0 / dpi) as f32;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let image_stream = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => px_width as i64,
            "Height" => px_height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8i64,
        },
        rgb.into_raw(),
    );
    let image_id = doc.add_object(image_stream);

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    width_pt.into(),
                    0i64.into(),
                    0i64.into(),
                    height_pt.into(),
                    0i64.into(),
                    0i64.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode()?));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![
            Object::from(0i64),
            Object::from(0i64),
            Object::from(width_pt),
            Object::from(height_pt),
        ],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! {
                "Im0" => image_id,
            },
        },
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1i64,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    Ok(doc)
}

/// Copy attributes inherited from the page tree onto the page itself, so the
/// page keeps them once it is re-parented under a new `Pages` node.
fn inline_inherited_attributes(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    let mut missing: Vec<&[u8]> = {
        let page = doc.get_dictionary(page_id)?;
        INHERITABLE.iter().copied().filter(|k| !page.has(k)).collect()
    };
    if missing.is_empty() {
        return Ok(());
    }

    let mut found: Vec<(Vec<u8>, Object)> = Vec::new();
    let mut parent = doc.get_dictionary(page_id)?.get(b"Parent").and_then(Object::as_reference).ok();
    // Bounded walk: malformed files can contain parent cycles
    let mut depth = 0;
    while let Some(parent_id) = parent {
        if missing.is_empty() || depth > 32 {
            break;
        }
        let node = doc.get_dictionary(parent_id)?;
        missing.retain(|key| match node.get(key) {
            Ok(value) => {
                found.push((key.to_vec(), value.clone()));
                false
            }
            Err(_) => true,
        });
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
        depth += 1;
    }

    if let Ok(Object::Dictionary(page)) = doc.get_object_mut(page_id) {
        for (key, value) in found {
            page.set(key, value);
        }
    }
    Ok(())
}

/// Merge documents into one, keeping every page in order.
///
/// Based on the lopdf merge example:
/// https://github.com/J-F-Liu/lopdf/blob/main/examples/merge.rs
pub fn merge_documents(documents: Vec<Document>) -> Result<Document> {
    if documents.is_empty() {
        return Err(Error::NoPagesCaptured);
    }

    // Define a starting max_id for merged document
    let mut max_id = 1;
    let mut page_ids: Vec<ObjectId> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for mut doc in documents {
        // Renumber objects in this document to avoid conflicts
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        let pages = doc.get_pages();
        for &page_id in pages.values() {
            inline_inherited_attributes(&mut doc, page_id)?;
        }
        page_ids.extend(pages.into_values());

        objects.extend(doc.objects);
    }

    let mut merged = Document::with_version("1.5");

    // Add all collected objects first, then bump max_id past them so the new
    // catalog and page tree do not collide with existing objects
    merged.objects.extend(objects);
    merged.max_id = max_id - 1;

    let pages_id = merged.new_object_id();
    let kids: Vec<Object> = page_ids.iter().map(|&id| Object::Reference(id)).collect();
    merged.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => page_ids.len() as i64,
            "Kids" => kids,
        }),
    );

    let catalog_id = merged.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    merged.trailer.set("Root", catalog_id);

    for &page_id in &page_ids {
        if let Ok(Object::Dictionary(dict)) = merged.get_object_mut(page_id) {
            dict.set("Parent", Object::Reference(pages_id));
        }
    }

    // Old catalogs and page trees are now unreachable
    merged.prune_objects();
    merged.compress();

    Ok(merged)
}

fn load_pdf_bytes(bytes: &[u8], label: &str) -> Result<Document> {
    let doc = Document::load_mem(bytes)?;
    if doc.get_pages().is_empty() {
        return Err(Error::EmptyPdf(label.to_string()));
    }
    Ok(doc)
}

/// Assemble captured pages, in order, into one document
pub fn assemble_pages(pages: &[CapturedPage], dpi: f64) -> Result<Document> {
    if pages.is_empty() {
        return Err(Error::NoPagesCaptured);
    }

    let documents = pages
        .iter()
        .map(|page| match &page.data {
            PageData::Png(bytes) => image_page(bytes, dpi),
            PageData::Pdf(bytes) => load_pdf_bytes(bytes, &page.file_stem),
        })
        .collect::<Result<Vec<_>>>()?;

    debug!("Merging {} page documents", documents.len());
    merge_documents(documents)
}

/// Merge PDF, PNG and JPEG files (sniffed by content) into one document
pub fn merge_files(paths: &[PathBuf], dpi: f64) -> Result<Document> {
    if paths.is_empty() {
        return Err(Error::Other("No input files provided".to_string()));
    }

    // Validate all input files exist before reading any of them
    for path in paths {
        if !path.exists() {
            return Err(Error::InputNotFound(path.clone()));
        }
    }

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = std::fs::read(path)?;
        let doc = if bytes.starts_with(b"%PDF") {
            load_pdf_bytes(&bytes, &path.display().to_string())?
        } else {
            image_page(&bytes, dpi)?
        };
        documents.push(doc);
    }

    merge_documents(documents)
}

/// Save a document, returning the number of bytes written
pub fn save(doc: &mut Document, path: &Path) -> Result<u64> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    doc.save(path)?;
    Ok(std::fs::metadata(path)?.len())
}

/// Count the pages in a PDF file
pub fn count_pages(path: &Path) -> Result<usize> {
    if !path.exists() {
        return Err(Error::InputNotFound(path.to_path_buf()));
    }
    let doc = Document::load(path)?;
    Ok(doc.get_pages().len())
}
