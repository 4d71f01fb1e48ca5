//! Corpus table loader.
//!
//! Reads `title,heading,content,tokens` CSV into a validated [`Corpus`].
//! Columns may appear in any order and extra columns are ignored. Errors
//! name the offending line (the header is line 1).

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use context_qa_core::models::{Corpus, Passage, PassageKey};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct CorpusRow {
    title: String,
    heading: String,
    content: String,
    tokens: i64,
}

pub fn load_corpus(path: &Path) -> Result<Corpus> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open corpus file: {}", path.display()))?;
    read_corpus(file).with_context(|| format!("Invalid corpus file: {}", path.display()))
}

pub fn read_corpus<R: Read>(reader: R) -> Result<Corpus> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();
    for required in ["title", "heading", "content", "tokens"] {
        if !headers.iter().any(|h| h == required) {
            bail!("missing required column '{}'", required);
        }
    }

    let mut passages = Vec::new();
    let mut seen = HashSet::new();

    for record in rdr.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let row: CorpusRow = record
            .deserialize(Some(&headers))
            .with_context(|| format!("line {}: malformed row", line))?;

        if row.tokens < 0 {
            bail!("line {}: tokens must be >= 0, got {}", line, row.tokens);
        }

        let key = PassageKey::new(row.title, row.heading);
        if !seen.insert(key.clone()) {
            bail!("line {}: duplicate passage {}", line, key);
        }

        passages.push(Passage {
            key,
            content: row.content,
            tokens: row.tokens as usize,
        });
    }

    Ok(Corpus::from_passages(passages)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "title,heading,content,tokens\n\
2020 Summer Olympics,Summary,\"The 2020 Summer Olympics were held in Tokyo.\nThey were postponed.\",12\n\
Curling,Rules,Stones are thrown.,4\n";

    #[test]
    fn test_read_corpus() {
        let corpus = read_corpus(SAMPLE.as_bytes()).unwrap();
        assert_eq!(corpus.len(), 2);
        let p = corpus
            .get(&PassageKey::new("2020 Summer Olympics", "Summary"))
            .unwrap();
        assert_eq!(p.tokens, 12);
        assert!(p.content.contains('\n'));
        assert_eq!(corpus.passages()[1].key.title, "Curling");
    }

    #[test]
    fn test_extra_columns_and_order() {
        let text = "tokens,id,content,heading,title\n3,7,abc,H,T\n";
        let corpus = read_corpus(text.as_bytes()).unwrap();
        let p = corpus.get(&PassageKey::new("T", "H")).unwrap();
        assert_eq!(p.content, "abc");
        assert_eq!(p.tokens, 3);
    }

    #[test]
    fn test_missing_column() {
        let err = read_corpus("title,heading,content\nA,B,C\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("tokens"));
    }

    #[test]
    fn test_negative_tokens() {
        let err = read_corpus("title,heading,content,tokens\nA,B,C,-1\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_non_integer_tokens() {
        let err =
            read_corpus("title,heading,content,tokens\nA,B,C,many\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_duplicate_key() {
        let text = "title,heading,content,tokens\nA,B,one,1\nA,C,two,1\nA,B,three,1\n";
        let err = read_corpus(text.as_bytes()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("line 4"), "{}", msg);
        assert!(msg.contains("duplicate"));
    }

    #[test]
    fn test_empty_corpus() {
        let corpus = read_corpus("title,heading,content,tokens\n".as_bytes()).unwrap();
        assert!(corpus.is_empty());
    }
}
