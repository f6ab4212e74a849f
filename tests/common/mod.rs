// Shared fixtures: in-memory label PDFs and canned text sources
#![allow(dead_code)]

use anyhow::Result;
use label_sorter::pdf_extraction::{PageHandle, PageTextSource, SourceDocument};
use label_sorter::KeywordTable;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use md5::{Digest, Md5};
use std::path::Path;
use std::time::Duration;

pub const TEST_TABLE: &str = r#"
    name = "test"
    fallback = "UNMATCHED"
    fallback_priority = 99

    [[category]]
    name = "A"
    priority = 1
    keywords = ["ALPHA"]

    [[category]]
    name = "B"
    priority = 2
    keywords = ["BRAVO"]
"#;

pub fn test_table() -> KeywordTable {
    KeywordTable::from_toml("test", TEST_TABLE).unwrap()
}

fn page_content(index: usize, text: &str) -> Vec<u8> {
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![50.into(), 700.into()]),
            Operation::new("Tj", vec![Object::string_literal(format!("PAGE-{index} {text}"))]),
            Operation::new("ET", vec![]),
        ],
    };
    content.encode().unwrap()
}

/// One page per entry. Resources and MediaBox live on the root Pages node
/// so every page inherits them.
pub fn label_document(texts: &[&str]) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for (index, text) in texts.iter().enumerate() {
        let content_id = doc.add_object(Stream::new(dictionary! {}, page_content(index, text)));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::from(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => texts.len() as i64,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 288.into(), 432.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

/// Page 0 sits under an intermediate Pages node that carries its MediaBox
/// and Rotate; page 1 hangs directly off the root.
pub fn nested_document() -> Document {
    let mut doc = Document::with_version("1.5");
    let root_id = doc.new_object_id();
    let mid_id = doc.new_object_id();
    let c0 = doc.add_object(Stream::new(dictionary! {}, page_content(0, "BRAVO")));
    let c1 = doc.add_object(Stream::new(dictionary! {}, page_content(1, "ALPHA")));
    let p0 = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => mid_id,
        "Contents" => c0,
    });
    let p1 = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => root_id,
        "Contents" => c1,
    });
    doc.objects.insert(
        mid_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Parent" => root_id,
            "Kids" => vec![p0.into()],
            "Count" => 1,
            "MediaBox" => vec![0.into(), 0.into(), 300.into(), 400.into()],
            "Rotate" => 90,
        }),
    );
    doc.objects.insert(
        root_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![mid_id.into(), p1.into()],
            "Count" => 2,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => root_id });
    doc.trailer.set("Root", catalog);
    doc
}

const PASSWORD_PAD: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

fn rc4(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut s: Vec<u8> = (0..=255).collect();
    let mut j = 0u8;
    for i in 0..256 {
        j = j.wrapping_add(s[i]).wrapping_add(key[i % key.len()]);
        s.swap(i, j as usize);
    }
    let (mut i, mut j) = (0u8, 0u8);
    data.iter()
        .map(|&byte| {
            i = i.wrapping_add(1);
            j = j.wrapping_add(s[i as usize]);
            s.swap(i as usize, j as usize);
            byte ^ s[s[i as usize].wrapping_add(s[j as usize]) as usize]
        })
        .collect()
}

/// Encrypt `doc` in place with the 40-bit RC4 standard security handler
/// (V1/R2). An empty `user_password` gives an owner-password-only file that
/// any reader can open.
pub fn encrypt_document(doc: &mut Document, user_password: &[u8]) {
    let owner_hash = vec![0x4F_u8; 32];
    let permissions: i64 = -44;
    let file_id = b"label-sorter-test".to_vec();

    let mut seed = user_password.to_vec();
    seed.extend_from_slice(&PASSWORD_PAD[..32 - user_password.len()]);
    seed.extend_from_slice(&owner_hash);
    seed.extend_from_slice(&(permissions as u32).to_le_bytes());
    seed.extend_from_slice(&file_id);
    let key = Md5::digest(&seed)[..5].to_vec();

    for (&(number, generation), object) in doc.objects.iter_mut() {
        let mut object_seed = key.clone();
        object_seed.extend_from_slice(&number.to_le_bytes()[..3]);
        object_seed.extend_from_slice(&generation.to_le_bytes()[..2]);
        let digest = Md5::digest(&object_seed);
        let object_key = &digest[..10];
        match object {
            Object::Stream(stream) => {
                let sealed = rc4(object_key, &stream.content);
                stream.set_content(sealed);
            }
            Object::String(content, _) => *content = rc4(object_key, content),
            _ => {}
        }
    }

    let encrypt_id = doc.add_object(dictionary! {
        "Filter" => "Standard",
        "V" => 1,
        "R" => 2,
        "Length" => 40,
        "O" => Object::String(owner_hash, StringFormat::Hexadecimal),
        "U" => Object::String(rc4(&key, &PASSWORD_PAD), StringFormat::Hexadecimal),
        "P" => permissions,
    });
    doc.trailer.set("Encrypt", encrypt_id);
    let id = Object::String(file_id, StringFormat::Hexadecimal);
    doc.trailer.set("ID", vec![id.clone(), id]);
}

pub fn write_pdf(mut doc: Document, path: &Path) {
    doc.save(path).unwrap();
}

/// Original page indices of `path`'s pages, in file order, recovered from
/// the PAGE-n markers in their content streams.
pub fn page_markers(path: &Path) -> Vec<usize> {
    let doc = Document::load(path).unwrap();
    doc.get_pages()
        .values()
        .map(|&id| marker(&doc, id))
        .collect()
}

fn marker(doc: &Document, page_id: ObjectId) -> usize {
    let content = doc.get_page_content(page_id).unwrap();
    let text = String::from_utf8_lossy(&content);
    let start = text.find("PAGE-").expect("page marker") + "PAGE-".len();
    text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect::<String>()
        .parse()
        .unwrap()
}

/// Uses the raw content stream as the text signal.
pub struct ContentStreamText;

impl PageTextSource for ContentStreamText {
    fn name(&self) -> &'static str {
        "content-stream"
    }

    fn page_text(&self, source: &SourceDocument, page: PageHandle) -> Result<String> {
        let content = source.document().get_page_content(page.object_id())?;
        Ok(String::from_utf8_lossy(&content).into_owned())
    }
}

/// Fixed text per page index; missing entries are "".
pub struct CannedText(pub Vec<String>);

impl PageTextSource for CannedText {
    fn name(&self) -> &'static str {
        "canned"
    }

    fn page_text(&self, _source: &SourceDocument, page: PageHandle) -> Result<String> {
        Ok(self.0.get(page.index()).cloned().unwrap_or_default())
    }
}

/// Never finishes within any reasonable page timeout.
pub struct SlowText(pub Duration);

impl PageTextSource for SlowText {
    fn name(&self) -> &'static str {
        "slow"
    }

    fn page_text(&self, _source: &SourceDocument, _page: PageHandle) -> Result<String> {
        std::thread::sleep(self.0);
        Ok("ALPHA".to_string())
    }
}

/// Panics on one page index.
pub struct PanicsOn(pub usize);

impl PageTextSource for PanicsOn {
    fn name(&self) -> &'static str {
        "panics"
    }

    fn page_text(&self, source: &SourceDocument, page: PageHandle) -> Result<String> {
        if page.index() == self.0 {
            panic!("recognizer blew up on page {}", page.index());
        }
        ContentStreamText.page_text(source, page)
    }
}
