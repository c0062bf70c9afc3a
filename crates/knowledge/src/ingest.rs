//! Batch ingestion of review records into a vector index.
//!
//! Two input formats are accepted, chosen by file extension:
//!
//! - CSV with a header row. Only the `review` and `product_title` columns
//!   are read; the scraping export's other columns are ignored.
//! - JSON Lines, one object per line. Blank lines are ignored.

use crate::embeddings::EmbeddingProvider;
use crate::types::{Document, ReviewRecord};
use crate::vector_index::VectorIndex;
use reviewqa_core::{AppError, AppResult};
use serde::Serialize;
use std::io::{BufRead, Read};
use std::path::Path;
use std::time::Instant;

/// Number of documents embedded per provider call.
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Outcome of an ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestStats {
    pub records_read: usize,
    pub documents_indexed: usize,
    pub skipped: usize,
    pub duration_secs: f64,
}

/// On-disk layout of a review file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewFormat {
    Csv,
    JsonLines,
}

impl ReviewFormat {
    /// Detect the format from the file extension.
    pub fn from_path(path: &Path) -> AppResult<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase());

        match extension.as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("jsonl") | Some("ndjson") | Some("json") => Ok(Self::JsonLines),
            _ => Err(AppError::Input(format!(
                "Unsupported review file {:?}: expected a .csv or .jsonl file",
                path
            ))),
        }
    }
}

/// Read review records from a CSV or JSON Lines file.
pub fn read_review_records(path: &Path) -> AppResult<Vec<ReviewRecord>> {
    let file = std::fs::File::open(path).map_err(|e| {
        AppError::Input(format!("Failed to open review file {:?}: {}", path, e))
    })?;

    match ReviewFormat::from_path(path)? {
        ReviewFormat::Csv => parse_review_csv(file),
        ReviewFormat::JsonLines => parse_review_lines(std::io::BufReader::new(file)),
    }
}

/// Parse CSV review records from any reader.
///
/// The first row must name the columns.
pub fn parse_review_csv<R: Read>(reader: R) -> AppResult<Vec<ReviewRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let mut records = Vec::new();
    for (idx, row) in csv_reader.deserialize::<ReviewRecord>().enumerate() {
        // Row numbers count the header as row 1
        let record = row.map_err(|e| {
            AppError::Serialization(format!("Row {}: invalid review record: {}", idx + 2, e))
        })?;
        records.push(record);
    }

    Ok(records)
}

/// Parse JSON Lines review records from any buffered reader.
pub fn parse_review_lines<R: BufRead>(reader: R) -> AppResult<Vec<ReviewRecord>> {
    let mut records = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: ReviewRecord = serde_json::from_str(&line).map_err(|e| {
            AppError::Serialization(format!("Line {}: invalid review record: {}", idx + 1, e))
        })?;
        records.push(record);
    }

    Ok(records)
}

/// Convert records to documents, dropping those with an empty review body.
pub fn to_documents(records: Vec<ReviewRecord>) -> (Vec<Document>, usize) {
    let total = records.len();
    let documents: Vec<Document> = records
        .into_iter()
        .filter(|r| !r.review.trim().is_empty())
        .map(Document::from)
        .collect();

    let skipped = total - documents.len();
    if skipped > 0 {
        tracing::warn!("Skipped {} records with an empty review", skipped);
    }
    (documents, skipped)
}

/// Embed documents in batches and upsert them into the index.
///
/// Returns the number of documents written. A failing batch aborts the run;
/// batches already written stay in the index.
pub async fn index_documents(
    embedder: &dyn EmbeddingProvider,
    index: &dyn VectorIndex,
    documents: &[Document],
    batch_size: usize,
) -> AppResult<usize> {
    let batch_size = batch_size.max(1);
    let mut written = 0;

    for (batch_no, batch) in documents.chunks(batch_size).enumerate() {
        let texts: Vec<String> = batch.iter().map(|d| d.content.clone()).collect();
        let embeddings = embedder.embed_batch(&texts).await?;
        written += index.upsert(batch, &embeddings).await?;

        tracing::debug!(
            "Indexed batch {} ({}/{} documents)",
            batch_no + 1,
            written,
            documents.len()
        );
    }

    Ok(written)
}

/// Read, convert and index every record in `path`.
pub async fn ingest_records(
    embedder: &dyn EmbeddingProvider,
    index: &dyn VectorIndex,
    path: &Path,
    batch_size: usize,
) -> AppResult<IngestStats> {
    let start = Instant::now();

    let records = read_review_records(path)?;
    let records_read = records.len();
    let (documents, skipped) = to_documents(records);
    let documents_indexed = index_documents(embedder, index, &documents, batch_size).await?;

    Ok(IngestStats {
        records_read,
        documents_indexed,
        skipped,
        duration_secs: start.elapsed().as_secs_f64(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::mock::MockProvider;
    use crate::memory_index::InMemoryIndex;
    use std::io::Write;

    #[test]
    fn test_parse_skips_blank_lines() {
        let input = r#"{"review": "Lasts two days", "product_title": "PhoneX"}

{"review": "Too heavy", "product_title": "TabletY", "rating": 2}
"#;
        let records = parse_review_lines(input.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].product_title, "TabletY");
    }

    #[test]
    fn test_parse_reports_line_number() {
        let input = "{\"review\": \"ok\", \"product_title\": \"A\"}\n{\"review\": \"missing title\"}\n";
        let err = parse_review_lines(input.as_bytes()).unwrap_err();
        assert!(matches!(err, AppError::Serialization(_)));
        assert!(err.to_string().contains("Line 2"));
    }

    #[test]
    fn test_parse_csv_quoted_comma_and_extra_columns() {
        let input = "product_id,product_title,rating,summary,review\n\
P1,PhoneX,5,Great,\"Great battery life, lasts two days\"\n\
P2,\"TabletY, 10 inch\",2,Meh,Too heavy\n";
        let records = parse_review_csv(input.as_bytes()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].product_title, "PhoneX");
        assert_eq!(records[0].review, "Great battery life, lasts two days");
        assert_eq!(records[1].product_title, "TabletY, 10 inch");
    }

    #[test]
    fn test_parse_csv_missing_column() {
        let input = "product_title,rating\nPhoneX,5\n";
        let err = parse_review_csv(input.as_bytes()).unwrap_err();
        assert!(matches!(err, AppError::Serialization(_)));
        assert!(err.to_string().contains("Row 2"));
    }

    #[test]
    fn test_parse_csv_empty_review_cell_is_kept_for_filtering() {
        let input = "product_title,review\nPhoneX,\nPhoneX,Solid build\n";
        let records = parse_review_csv(input.as_bytes()).unwrap();
        let (docs, skipped) = to_documents(records);
        assert_eq!(docs.len(), 1);
        assert_eq!(skipped, 1);
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ReviewFormat::from_path(Path::new("data/flipkart_product_review.csv")).unwrap(),
            ReviewFormat::Csv
        );
        assert_eq!(
            ReviewFormat::from_path(Path::new("reviews.JSONL")).unwrap(),
            ReviewFormat::JsonLines
        );
        assert!(matches!(
            ReviewFormat::from_path(Path::new("reviews.txt")),
            Err(AppError::Input(_))
        ));
        assert!(ReviewFormat::from_path(Path::new("reviews")).is_err());
    }

    #[tokio::test]
    async fn test_ingest_csv_file() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "product_id,product_title,rating,summary,review").unwrap();
        writeln!(file, "P1,PhoneX,5,Great,\"Great battery life, lasts two days\"").unwrap();
        writeln!(file, "P2,PhoneX,1,Bad,").unwrap();

        let embedder = MockProvider::new(32);
        let index = InMemoryIndex::new("vector_one");
        let stats = ingest_records(&embedder, &index, file.path(), 8).await.unwrap();

        assert_eq!(stats.records_read, 2);
        assert_eq!(stats.documents_indexed, 1);
        assert_eq!(stats.skipped, 1);

        let query = embedder.embed("battery life").await.unwrap();
        let hits = index.search(&query, 1).await.unwrap();
        assert_eq!(hits[0].document.content, "Great battery life, lasts two days");
        assert_eq!(hits[0].document.metadata.product_name, "PhoneX");
    }

    #[test]
    fn test_to_documents_drops_empty_reviews() {
        let records = vec![
            ReviewRecord {
                review: "Solid build".to_string(),
                product_title: "PhoneX".to_string(),
            },
            ReviewRecord {
                review: "   ".to_string(),
                product_title: "PhoneX".to_string(),
            },
        ];
        let (docs, skipped) = to_documents(records);
        assert_eq!(docs.len(), 1);
        assert_eq!(skipped, 1);
        assert_eq!(docs[0].metadata.product_name, "PhoneX");
    }

    #[tokio::test]
    async fn test_ingest_records_into_memory_index() {
        let mut file = tempfile::Builder::new().suffix(".jsonl").tempfile().unwrap();
        for i in 0..5 {
            writeln!(
                file,
                r#"{{"review": "Review number {} about the battery", "product_title": "PhoneX"}}"#,
                i
            )
            .unwrap();
        }
        writeln!(file, r#"{{"review": "", "product_title": "PhoneX"}}"#).unwrap();

        let embedder = MockProvider::new(32);
        let index = InMemoryIndex::new("vector_one");
        let stats = ingest_records(&embedder, &index, file.path(), 2).await.unwrap();

        assert_eq!(stats.records_read, 6);
        assert_eq!(stats.documents_indexed, 5);
        assert_eq!(stats.skipped, 1);
        assert_eq!(index.count().await.unwrap(), 5);
    }

    #[test]
    fn test_missing_file_is_input_error() {
        let err = read_review_records(Path::new("/nonexistent/reviews.jsonl")).unwrap_err();
        assert!(matches!(err, AppError::Input(_)));
    }
}
