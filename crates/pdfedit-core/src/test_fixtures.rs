//! In-memory PDFs for unit tests

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream, StringFormat};

pub struct FixtureRun {
    pub text: &'static str,
    pub x: f64,
    pub y: f64,
    pub size: f64,
}

impl FixtureRun {
    pub fn new(text: &'static str, x: f64, y: f64, size: f64) -> Self {
        Self { text, x, y, size }
    }
}

pub fn run_operations(runs: &[FixtureRun]) -> Vec<Operation> {
    let mut operations = Vec::new();
    for run in runs {
        operations.extend([
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(b"F1".to_vec()), Object::Real(run.size as f32)],
            ),
            Operation::new(
                "Td",
                vec![Object::Real(run.x as f32), Object::Real(run.y as f32)],
            ),
            Operation::new(
                "Tj",
                vec![Object::String(
                    run.text.as_bytes().to_vec(),
                    StringFormat::Literal,
                )],
            ),
            Operation::new("ET", vec![]),
        ]);
    }
    operations
}

fn helvetica_resources(doc: &mut Document) -> Dictionary {
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    dictionary! {
        "Font" => dictionary! {
            "F1" => Object::Reference(font_id),
        },
    }
}

fn finish(mut doc: Document, pages_id: lopdf::ObjectId) -> Vec<u8> {
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// A PDF with one US Letter page per entry, each page drawing its runs
pub fn pdf_with_pages(pages: &[Vec<Operation>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let resources = helvetica_resources(&mut doc);

    let mut page_ids = Vec::new();
    for operations in pages {
        let content = Content {
            operations: operations.clone(),
        };
        let content_id =
            doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => resources.clone(),
            "Contents" => Object::Reference(content_id),
        });
        page_ids.push(page_id);
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => page_ids.len() as i64,
            "Kids" => page_ids.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
        }),
    );
    finish(doc, pages_id)
}

pub fn pdf_with_runs(runs: &[FixtureRun]) -> Vec<u8> {
    pdf_with_pages(&[run_operations(runs)])
}

pub fn pdf_with_content(operations: Vec<Operation>) -> Vec<u8> {
    pdf_with_pages(&[operations])
}

/// A single A4 page whose MediaBox and Resources live on the Pages node
pub fn pdf_with_inherited_attributes() -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let resources = helvetica_resources(&mut doc);

    let content = Content {
        operations: run_operations(&[FixtureRun::new("Inherited", 72.0, 760.0, 11.0)]),
    };
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => Object::Reference(pages_id),
        "Contents" => Object::Reference(content_id),
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => 1,
            "Kids" => vec![Object::Reference(page_id)],
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            "Resources" => resources,
        }),
    );
    finish(doc, pages_id)
}
