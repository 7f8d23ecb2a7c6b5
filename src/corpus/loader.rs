use std::fs;
use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};
use text_splitter::{ChunkConfig, TextSplitter};
use tracing::{debug, info, warn};

use super::{CorpusError, Document};

/// Plain-text formats read directly; docx/pdf extraction happens upstream.
const DOC_PATTERNS: &[&str] = &["*.txt", "*.md"];

fn doc_globs() -> Result<GlobSet, CorpusError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in DOC_PATTERNS {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

/// Reads every matching file directly inside `dir`, sorted by file name.
///
/// Files that cannot be read are logged and skipped; finding no usable file at
/// all is an error.
pub fn load_documents(dir: &Path) -> Result<Vec<Document>, CorpusError> {
    if !dir.is_dir() {
        return Err(CorpusError::NotFound(format!(
            "documents directory not found: {}",
            dir.display()
        )));
    }

    let globs = doc_globs()?;
    let mut paths: Vec<_> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .is_some_and(|name| globs.is_match(Path::new(name)))
        })
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Err(CorpusError::NotFound(format!(
            "no {} files found in {}",
            DOC_PATTERNS.join("/"),
            dir.display()
        )));
    }

    info!(count = paths.len(), dir = %dir.display(), "loading documents");

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => {
                warn!(file = %name, "skipping empty document");
            }
            Ok(text) => {
                debug!(file = %name, bytes = text.len(), "document loaded");
                documents.push(Document {
                    content: text,
                    source: name,
                    file_path: path.display().to_string(),
                });
            }
            Err(e) => warn!(file = %name, error = %e, "failed to read document, skipping"),
        }
    }

    if documents.is_empty() {
        return Err(CorpusError::NotFound(format!(
            "no readable documents in {}",
            dir.display()
        )));
    }
    Ok(documents)
}

/// Splits documents into overlapping chunks that keep their source metadata.
pub fn split_documents(
    documents: &[Document],
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<Vec<Document>, CorpusError> {
    let config = ChunkConfig::new(chunk_size)
        .with_overlap(chunk_overlap)
        .map_err(|e| CorpusError::Chunking(e.to_string()))?;
    let splitter = TextSplitter::new(config);

    let chunks: Vec<Document> = documents
        .iter()
        .flat_map(|doc| {
            splitter
                .chunks(&doc.content)
                .filter(|chunk| !chunk.trim().is_empty())
                .map(|chunk| Document {
                    content: chunk.to_string(),
                    source: doc.source.clone(),
                    file_path: doc.file_path.clone(),
                })
        })
        .collect();

    info!(
        documents = documents.len(),
        chunks = chunks.len(),
        chunk_size,
        chunk_overlap,
        "documents split"
    );
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_only_text_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b-news.md"), "# Sports\nThe team won.").unwrap();
        fs::write(dir.path().join("a-news.txt"), "Parliament met today.").unwrap();
        fs::write(dir.path().join("report.docx"), "binary").unwrap();
        fs::write(dir.path().join("blank.txt"), "   \n").unwrap();

        let docs = load_documents(dir.path()).unwrap();
        let sources: Vec<_> = docs.iter().map(|d| d.source.as_str()).collect();
        assert_eq!(sources, vec!["a-news.txt", "b-news.md"]);
        assert!(docs[0].file_path.ends_with("a-news.txt"));
        assert_eq!(docs[0].content, "Parliament met today.");
    }

    #[test]
    fn missing_directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_documents(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, CorpusError::NotFound(_)));
    }

    #[test]
    fn directory_without_text_files_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("scan.pdf"), "binary").unwrap();
        let err = load_documents(dir.path()).unwrap_err();
        assert!(err.to_string().contains("no *.txt/*.md files"), "got: {err}");
    }

    #[test]
    fn split_respects_chunk_size_and_keeps_metadata() {
        let paragraph = "The football team trained all week before the final. ".repeat(60);
        let doc = Document {
            content: paragraph,
            source: "sports.txt".into(),
            file_path: "data/docs/sports.txt".into(),
        };

        let chunks = split_documents(&[doc], 1000, 200).unwrap();
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.content.chars().count() <= 1000);
            assert_eq!(chunk.source, "sports.txt");
            assert_eq!(chunk.file_path, "data/docs/sports.txt");
        }
    }

    #[test]
    fn short_document_stays_one_chunk() {
        let doc = Document {
            content: "Short note.".into(),
            source: "note.txt".into(),
            file_path: "note.txt".into(),
        };
        let chunks = split_documents(&[doc], 1000, 200).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "Short note.");
    }

    #[test]
    fn overlap_larger_than_chunk_is_rejected() {
        let err = split_documents(&[], 100, 200).unwrap_err();
        assert!(matches!(err, CorpusError::Chunking(_)));
    }
}
