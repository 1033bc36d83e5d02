//! Shared fixtures: small PDFs built with lopdf

#![allow(dead_code)]

use lopdf::{dictionary, Document, Object, Stream};
use std::path::{Path, PathBuf};

pub const FAKE_JPEG: &[u8] = b"\xFF\xD8\xFF\xE0fixture-jpeg\xFF\xD9";

/// Build a PDF with one page per entry in `pages`, each entry a list of text
/// lines. With `with_image`, every page also places a shared JPEG XObject.
pub fn build_pdf(pages: &[&[&str]], with_image: bool) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    let image_id = with_image.then(|| {
        let mut stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 2,
                "Height" => 2,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            FAKE_JPEG.to_vec(),
        );
        stream.allows_compression = false;
        doc.add_object(stream)
    });

    let mut kids = Vec::new();
    for lines in pages {
        let mut content = String::new();
        let mut y = 720;
        for line in lines.iter() {
            let escaped = line.replace('\\', "\\\\").replace('(', "\\(").replace(')', "\\)");
            content.push_str(&format!("BT\n/F1 12 Tf\n72 {} Td\n({}) Tj\nET\n", y, escaped));
            y -= 16;
        }
        if image_id.is_some() {
            content.push_str("q 50 0 0 50 400 50 cm /Im1 Do Q\n");
        }
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));

        let mut xobjects = lopdf::Dictionary::new();
        if let Some(id) = image_id {
            xobjects.set("Im1", id);
        }

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
                "XObject" => xobjects,
            },
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("serialize fixture pdf");
    buf
}

/// Write a PDF fixture into `dir`
pub fn write_pdf(dir: &Path, name: &str, pages: &[&[&str]], with_image: bool) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, build_pdf(pages, with_image)).expect("write fixture pdf");
    path
}

/// Write an arbitrary file into `dir`
pub fn write_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write fixture file");
    path
}

/// A two-page report whose second page carries an aligned table
pub fn report_pages() -> Vec<&'static [&'static str]> {
    let summary: &'static [&'static str] = &[
        "Quarterly report on sample processing.",
        "All samples were received in good condition.",
    ];
    let table: &'static [&'static str] = &["Sample    Count    Status", "Blood    12    ok", "Tissue    4    pending"];
    vec![summary, table]
}
