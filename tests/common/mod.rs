//! PDF fixtures shared by the integration tests

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

/// One line of text: `(text, font size)`
pub type Line<'a> = (&'a str, i64);

/// A document with one page per entry, lines drawn top-down 40pt apart
pub fn build_pdf(pages: &[&[Line]]) -> Document {
    build_pdf_with_images(pages, &[])
}

/// Like [`build_pdf`], with one JPEG image placed on each listed page
pub fn build_pdf_with_images(pages: &[&[Line]], image_pages: &[u32]) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids = Vec::new();
    for (index, lines) in pages.iter().enumerate() {
        let page_number = index as u32 + 1;
        let mut operations = Vec::new();
        for (i, (text, size)) in lines.iter().enumerate() {
            let y = 720 - (i as i64) * 40;
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), (*size).into()]));
            operations.push(Operation::new("Td", vec![72.into(), y.into()]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(*text)]));
            operations.push(Operation::new("ET", vec![]));
        }

        let mut resources = dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        };
        if image_pages.contains(&page_number) {
            let image_id = doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => 1,
                    "Height" => 1,
                    "BitsPerComponent" => 8,
                    "ColorSpace" => "DeviceGray",
                    "Filter" => "DCTDecode",
                },
                vec![0xFF, 0xD8, 0xFF, 0xD9],
            ));
            resources.set("XObject", dictionary! { "Im1" => image_id });
            operations.push(Operation::new("q", vec![]));
            operations.push(Operation::new(
                "cm",
                vec![50.into(), 0.into(), 0.into(), 50.into(), 72.into(), 72.into()],
            ));
            operations.push(Operation::new("Do", vec!["Im1".into()]));
            operations.push(Operation::new("Q", vec![]));
        }

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode fixture content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources,
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
    doc
}

/// Move a page's drawing into a Form XObject the page paints with `/Fm0 Do`
pub fn move_page_into_form(doc: &mut Document, page_number: u32) {
    let page_id = doc.get_pages()[&page_number];
    let page = doc.get_dictionary(page_id).expect("page");
    let content_id = page
        .get(b"Contents")
        .and_then(Object::as_reference)
        .expect("single content stream");
    let mut resources = page
        .get(b"Resources")
        .and_then(Object::as_dict)
        .expect("page resources")
        .clone();
    let body = doc
        .get_object(content_id)
        .and_then(Object::as_stream)
        .expect("content stream")
        .content
        .clone();

    let form_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => resources.clone(),
        },
        body,
    ));
    let paint = Content {
        operations: vec![Operation::new("Do", vec!["Fm0".into()])],
    };
    let paint_id = doc.add_object(Stream::new(
        dictionary! {},
        paint.encode().expect("encode form paint"),
    ));
    resources.set("XObject", dictionary! { "Fm0" => form_id });

    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .expect("page");
    page.set("Contents", paint_id);
    page.set("Resources", resources);
}

/// Re-encode every page through an Identity-H Type0 font with a `/ToUnicode` map
pub fn convert_to_identity_h(doc: &mut Document) {
    let mut cids: BTreeMap<char, u16> = BTreeMap::new();
    let mut font_id = None;
    let page_ids: Vec<ObjectId> = doc.get_pages().values().copied().collect();

    for page_id in page_ids {
        let page = doc.get_dictionary(page_id).expect("page");
        let content_id = page
            .get(b"Contents")
            .and_then(Object::as_reference)
            .expect("single content stream");
        font_id = font_id.or_else(|| {
            page.get(b"Resources")
                .and_then(Object::as_dict)
                .and_then(|r| r.get(b"Font"))
                .and_then(Object::as_dict)
                .and_then(|f| f.get(b"F1"))
                .and_then(Object::as_reference)
                .ok()
        });

        let stream = doc
            .get_object_mut(content_id)
            .and_then(Object::as_stream_mut)
            .expect("content stream");
        let mut content = Content::decode(&stream.content).expect("decode fixture content");
        for op in &mut content.operations {
            if op.operator != "Tj" {
                continue;
            }
            if let Some(Object::String(bytes, _)) = op.operands.first() {
                let mut codes = Vec::new();
                for c in bytes.iter().map(|b| char::from(*b)) {
                    let next = cids.len() as u16 + 1;
                    let cid = *cids.entry(c).or_insert(next);
                    codes.extend_from_slice(&cid.to_be_bytes());
                }
                op.operands[0] = Object::String(codes, StringFormat::Hexadecimal);
            }
        }
        stream.set_content(content.encode().expect("encode fixture content"));
    }

    let mut cmap = format!("{} beginbfchar\n", cids.len());
    for (c, cid) in &cids {
        cmap.push_str(&format!("<{:04X}> <{:04X}>\n", cid, *c as u32));
    }
    cmap.push_str("endbfchar\n");
    let to_unicode = doc.add_object(Stream::new(dictionary! {}, cmap.into_bytes()));
    doc.objects.insert(
        font_id.expect("fixture font"),
        Object::Dictionary(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => "NotoSansCJK",
            "Encoding" => "Identity-H",
            "ToUnicode" => to_unicode,
        }),
    );
}

/// Save a fixture to disk
pub fn write_pdf(mut doc: Document, path: &Path) {
    doc.save(path).expect("save fixture");
}

pub fn catalog(doc: &Document) -> &Dictionary {
    let id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .expect("catalog reference");
    doc.get_dictionary(id).expect("catalog")
}

fn deref<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).expect("dangling reference"),
        other => other,
    }
}

/// A page group as attached to the catalog
#[derive(Debug)]
pub struct Group {
    pub page_id: ObjectId,
    /// `(role, mcid)` per leaf, in tree order
    pub leaves: Vec<(String, u32)>,
}

/// Walk `/StructTreeRoot` into page groups
pub fn struct_groups(doc: &Document) -> Vec<Group> {
    let root = deref(doc, catalog(doc).get(b"StructTreeRoot").expect("struct tree root"));
    let root = root.as_dict().expect("root dictionary");
    let kids = deref(doc, root.get(b"K").expect("root /K"))
        .as_array()
        .expect("root /K array");

    kids.iter()
        .map(|kid| {
            let group = deref(doc, kid).as_dict().expect("group dictionary");
            let page_id = group.get(b"Pg").and_then(Object::as_reference).expect("group /Pg");
            let leaves = group
                .get(b"K")
                .and_then(Object::as_array)
                .expect("group /K")
                .iter()
                .map(|leaf| {
                    let leaf = deref(doc, leaf).as_dict().expect("leaf dictionary");
                    let role = leaf.get(b"S").and_then(Object::as_name).expect("leaf /S");
                    let mcid = leaf.get(b"K").and_then(Object::as_i64).expect("leaf /K");
                    (String::from_utf8_lossy(role).into_owned(), mcid as u32)
                })
                .collect();
            Group { page_id, leaves }
        })
        .collect()
}

/// Operators of a page's concatenated content streams
pub fn page_operations(doc: &Document, page_id: ObjectId) -> Vec<Operation> {
    let bytes = doc.get_page_content(page_id).expect("page content");
    Content::decode(&bytes).expect("decode page content").operations
}

/// Raw bytes of each content stream on a page, in `/Contents` order
pub fn content_stream_bytes(doc: &Document, page_id: ObjectId) -> Vec<Vec<u8>> {
    doc.get_page_contents(page_id)
        .into_iter()
        .map(|id| {
            doc.get_object(id)
                .and_then(Object::as_stream)
                .expect("content stream")
                .content
                .clone()
        })
        .collect()
}

/// Page number (1-based) for each page id
pub fn page_numbers(doc: &Document) -> BTreeMap<ObjectId, u32> {
    doc.get_pages().into_iter().map(|(n, id)| (id, n)).collect()
}
