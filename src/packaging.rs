use std::fs::File;
use std::io;
use std::path::Path;

use serde::Serialize;
use zip::write::FileOptions;
use zip::ZipWriter;

use crate::domain::SubmissionMetadata;

/// The routing metadata XML packaged alongside the PDF, as SDES expects it.
#[derive(Serialize)]
#[serde(rename = "submission")]
struct SubmissionMetadataXml {
    store: bool,
    source: String,
    time_of_receipt: String,
    form_id: String,
    customer_id: String,
    submission_mark: String,
    cas_key: String,
    classification_type: String,
    business_area: String,
}

impl From<&SubmissionMetadata> for SubmissionMetadataXml {
    fn from(m: &SubmissionMetadata) -> Self {
        Self {
            store: m.store,
            source: m.source.clone(),
            time_of_receipt: m.time_of_receipt.to_rfc3339(),
            form_id: m.form_id.clone(),
            customer_id: m.customer_id.clone(),
            submission_mark: m.submission_mark.clone(),
            cas_key: m.cas_key.clone(),
            classification_type: m.classification_type.clone(),
            business_area: m.business_area.clone(),
        }
    }
}

/// Serialise `metadata` to the routing XML document packaged alongside the PDF.
pub fn metadata_to_xml(metadata: &SubmissionMetadata) -> Result<String, anyhow::Error> {
    let doc = SubmissionMetadataXml::from(metadata);
    let xml = quick_xml::se::to_string(&doc)?;
    Ok(format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{xml}"))
}

/// Zip `pdf_path` (as `form.pdf`) and `metadata_xml_path` (as `metadata.xml`),
/// streaming both off disk rather than holding the whole submission in memory
/// twice over. Returns the finished zip's bytes.
pub fn build_submission_zip(
    pdf_path: &Path,
    metadata_xml_path: &Path,
) -> Result<Vec<u8>, anyhow::Error> {
    let cursor = io::Cursor::new(Vec::new());
    let mut zip = ZipWriter::new(cursor);
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated).unix_permissions(0o644);

    zip.start_file("form.pdf", options)?;
    io::copy(&mut File::open(pdf_path)?, &mut zip)?;

    zip.start_file("metadata.xml", options)?;
    io::copy(&mut File::open(metadata_xml_path)?, &mut zip)?;

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}
