use crate::chunking::tidy_text;
use crate::error::IngestError;
use lopdf::Document as PdfDocument;
use regex::{Captures, Regex};
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

const DOCX_BODY_ENTRY: &str = "word/document.xml";

pub trait DocumentExtractor {
    fn extract_text(&self, path: &Path) -> Result<String, IngestError>;
}

/// Word-processor documents: paragraphs of the main body part, separated by a
/// blank line.
#[derive(Default)]
pub struct DocxExtractor;

impl DocumentExtractor for DocxExtractor {
    fn extract_text(&self, path: &Path) -> Result<String, IngestError> {
        let file = File::open(path)?;
        let mut archive = zip::ZipArchive::new(file)?;
        let mut xml = String::new();
        let mut entry = archive.by_name(DOCX_BODY_ENTRY)?;
        entry.read_to_string(&mut xml)?;

        extract_plaintext_from_docx_xml(&xml)
    }
}

#[derive(Default)]
pub struct PdfExtractor;

impl DocumentExtractor for PdfExtractor {
    fn extract_text(&self, path: &Path) -> Result<String, IngestError> {
        let document = PdfDocument::load(path)
            .map_err(|error| IngestError::DocumentParse(error.to_string()))?;

        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = document
                .extract_text(&[page_no])
                .map_err(|error| IngestError::DocumentParse(error.to_string()))?;

            if !text.trim().is_empty() {
                pages.push(text);
            }
        }

        Ok(pages.join("\n\n"))
    }
}

#[derive(Default)]
pub struct PlainTextExtractor;

impl DocumentExtractor for PlainTextExtractor {
    fn extract_text(&self, path: &Path) -> Result<String, IngestError> {
        Ok(fs::read_to_string(path)?)
    }
}

pub fn extractor_for(path: &Path) -> Option<Box<dyn DocumentExtractor>> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "docx" => Some(Box::new(DocxExtractor)),
        "pdf" => Some(Box::new(PdfExtractor)),
        "txt" | "md" => Some(Box::new(PlainTextExtractor)),
        _ => None,
    }
}

pub fn extract_document_text(path: &Path) -> Result<String, IngestError> {
    let extractor = extractor_for(path).ok_or_else(|| {
        IngestError::DocumentParse(format!("unsupported document type: {}", path.display()))
    })?;

    let text = tidy_text(&extractor.extract_text(path)?);
    if text.trim().is_empty() {
        return Err(IngestError::EmptyDocument(path.display().to_string()));
    }

    Ok(text)
}

pub fn extract_plaintext_from_docx_xml(xml: &str) -> Result<String, IngestError> {
    let token_re = Regex::new(
        r"(?s)<w:t(?:\s[^>]*)?>(.*?)</w:t>|(<w:tab/>)|(<w:(?:br|cr)(?:\s[^>]*)?/>)|(</w:p>)",
    )?;
    let entity_re = Regex::new(r"&(#x[0-9A-Fa-f]+|#[0-9]+|amp|lt|gt|quot|apos);")?;

    let mut paragraphs = Vec::new();
    let mut current = String::new();

    for capture in token_re.captures_iter(xml) {
        if let Some(text) = capture.get(1) {
            current.push_str(&decode_entities(&entity_re, text.as_str()));
        } else if capture.get(2).is_some() {
            current.push('\t');
        } else if capture.get(3).is_some() {
            current.push('\n');
        } else if capture.get(4).is_some() {
            if !current.trim().is_empty() {
                paragraphs.push(current.trim_end().to_string());
            }
            current.clear();
        }
    }

    if !current.trim().is_empty() {
        paragraphs.push(current.trim_end().to_string());
    }

    Ok(paragraphs.join("\n\n"))
}

fn decode_entities(entity_re: &Regex, text: &str) -> String {
    entity_re
        .replace_all(text, |capture: &Captures| {
            let name = &capture[1];
            let decoded = match name {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => {
                    let code = match name.strip_prefix("#x") {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => name[1..].parse::<u32>().ok(),
                    };
                    code.and_then(char::from_u32)
                }
            };
            decoded.map_or_else(|| capture[0].to_string(), |c| c.to_string())
        })
        .into_owned()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    pub(crate) fn write_docx(path: &Path, paragraphs: &[&str]) -> Result<(), Box<dyn std::error::Error>> {
        let body = paragraphs
            .iter()
            .map(|text| format!(r#"<w:p><w:r><w:t xml:space="preserve">{text}</w:t></w:r></w:p>"#))
            .collect::<String>();
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
        );

        let mut writer = zip::ZipWriter::new(File::create(path)?);
        writer.start_file(DOCX_BODY_ENTRY, zip::write::SimpleFileOptions::default())?;
        writer.write_all(xml.as_bytes())?;
        writer.finish()?;
        Ok(())
    }

    #[test]
    fn docx_xml_paragraphs_runs_and_entities() {
        let xml = concat!(
            "<w:body>",
            "<w:p><w:pPr><w:tabs><w:tab w:val=\"left\" w:pos=\"720\"/></w:tabs></w:pPr>",
            "<w:r><w:t>Admissions &amp; </w:t></w:r><w:r><w:t xml:space=\"preserve\">Fees</w:t></w:r></w:p>",
            "<w:p></w:p>",
            "<w:p><w:r><w:t>Term</w:t><w:tab/><w:t>Dates</w:t><w:br/><w:t>&#x2013; see &lt;portal&gt;</w:t></w:r></w:p>",
            "</w:body>"
        );

        let text = extract_plaintext_from_docx_xml(xml).unwrap();
        assert_eq!(text, "Admissions & Fees\n\nTerm\tDates\n\u{2013} see <portal>");
    }

    #[test]
    fn docx_file_round_trip() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("handbook.docx");
        write_docx(&path, &["Library hours are 8am to 10pm.", "Exams start in May."])?;

        let text = extract_document_text(&path)?;
        assert_eq!(text, "Library hours are 8am to 10pm.\n\nExams start in May.");
        Ok(())
    }

    #[test]
    fn corrupt_docx_is_an_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("broken.docx");
        fs::write(&path, b"not a zip archive")?;

        assert!(extract_document_text(&path).is_err());
        Ok(())
    }

    #[test]
    fn blank_text_file_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("empty.txt");
        fs::write(&path, "  \n\n ")?;

        assert!(matches!(
            extract_document_text(&path),
            Err(IngestError::EmptyDocument(_))
        ));
        Ok(())
    }

    fn write_pdf(path: &Path, pages: &[&str]) -> Result<(), Box<dyn std::error::Error>> {
        use lopdf::content::{Content, Operation};
        use lopdf::{dictionary, Object, Stream};

        let mut document = PdfDocument::with_version("1.5");
        let pages_id = document.new_object_id();
        let font_id = document.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = document.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = document.add_object(Stream::new(dictionary! {}, content.encode()?));
            let page_id = document.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        document.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => kids.len() as i64,
                "Kids" => kids,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        document.trailer.set("Root", catalog_id);
        document.save(path)?;
        Ok(())
    }

    #[test]
    fn pdf_pages_are_separated_by_a_blank_line() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("prospectus.pdf");
        write_pdf(&path, &["Welcome to campus", "Exams start in May"])?;

        let text = extract_document_text(&path)?;
        let pages: Vec<&str> = text.split("\n\n").collect();
        assert_eq!(pages.len(), 2);
        assert!(pages[0].contains("Welcome to campus"));
        assert!(pages[1].contains("Exams start in May"));
        Ok(())
    }

    #[test]
    fn corrupt_pdf_is_a_parse_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("broken.pdf");
        fs::write(&path, b"%PDF-1.5 truncated")?;

        assert!(matches!(
            extract_document_text(&path),
            Err(IngestError::DocumentParse(_))
        ));
        Ok(())
    }

    #[test]
    fn extractor_is_chosen_by_extension() {
        assert!(extractor_for(Path::new("a/b.DOCX")).is_some());
        assert!(extractor_for(Path::new("notes.md")).is_some());
        assert!(extractor_for(Path::new("scan.pdf")).is_some());
        assert!(extractor_for(Path::new("image.png")).is_none());
        assert!(extractor_for(Path::new("README")).is_none());
    }
}
