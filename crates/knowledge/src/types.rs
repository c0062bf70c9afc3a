//! Review document and retrieval types.

use serde::{Deserialize, Serialize};

/// Metadata attached to every indexed review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Title of the reviewed product
    pub product_name: String,
}

/// A customer review stored in the vector index.
///
/// Documents are written by ingestion and only ever read by the
/// conversation pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Review text
    pub content: String,

    pub metadata: DocumentMetadata,
}

impl Document {
    pub fn new(content: impl Into<String>, product_name: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: DocumentMetadata {
                product_name: product_name.into(),
            },
        }
    }
}

/// A document paired with its cosine similarity to the query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub document: Document,
    pub score: f32,
}

/// Up to k documents for one query, most similar first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub documents: Vec<ScoredDocument>,
}

impl RetrievalResult {
    pub fn new(documents: Vec<ScoredDocument>) -> Self {
        Self { documents }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Iterate over the documents in rank order.
    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.documents.iter().map(|scored| &scored.document)
    }

    /// Similarity of the best match, 0.0 when empty.
    pub fn max_score(&self) -> f32 {
        self.documents.first().map(|d| d.score).unwrap_or(0.0)
    }
}

/// One row of review data as produced by the scraping export.
///
/// Field names follow the export's columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub review: String,
    pub product_title: String,
}

impl From<ReviewRecord> for Document {
    fn from(record: ReviewRecord) -> Self {
        Document::new(record.review, record.product_title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_from_record() {
        let record = ReviewRecord {
            review: "Great battery life, lasts two days".to_string(),
            product_title: "PhoneX".to_string(),
        };
        let doc: Document = record.into();
        assert_eq!(doc.content, "Great battery life, lasts two days");
        assert_eq!(doc.metadata.product_name, "PhoneX");
    }

    #[test]
    fn test_retrieval_result_accessors() {
        let result = RetrievalResult::new(vec![
            ScoredDocument {
                document: Document::new("a", "P1"),
                score: 0.9,
            },
            ScoredDocument {
                document: Document::new("b", "P2"),
                score: 0.4,
            },
        ]);

        assert_eq!(result.len(), 2);
        assert_eq!(result.max_score(), 0.9);
        let contents: Vec<&str> = result.iter().map(|d| d.content.as_str()).collect();
        assert_eq!(contents, vec!["a", "b"]);

        assert_eq!(RetrievalResult::default().max_score(), 0.0);
    }
}
