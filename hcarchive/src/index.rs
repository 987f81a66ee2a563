//! Full-text index over an archive.
//!
//! Every message becomes one document with the fields `ID`, `From`, `To`,
//! `Body` and `Date`. Each conversation is indexed by its own blocking task
//! and submitted as a single batch; the index is committed once all tasks
//! succeeded.

use futures::future::try_join_all;
use log::{debug, info};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tantivy::collector::TopDocs;
use tantivy::indexer::UserOperation;
use tantivy::query::QueryParser;
use tantivy::schema::{Field, Schema, Value, STORED, STRING, TEXT};
use tantivy::{Index, IndexWriter, TantivyDocument};

use crate::error::IndexError;
use crate::models::{Archive, Message};

const WRITER_MEMORY_BUDGET: usize = 50_000_000;

/// Fields of a message document.
#[derive(Debug, Clone, Copy)]
pub struct MessageFields {
    pub id: Field,
    pub from: Field,
    pub to: Field,
    pub body: Field,
    pub date: Field,
}

impl MessageFields {
    fn schema() -> (Schema, MessageFields) {
        let mut builder = Schema::builder();
        let fields = MessageFields {
            id: builder.add_text_field("ID", STRING | STORED),
            from: builder.add_text_field("From", TEXT | STORED),
            to: builder.add_text_field("To", TEXT | STORED),
            body: builder.add_text_field("Body", TEXT | STORED),
            date: builder.add_text_field("Date", TEXT | STORED),
        };
        (builder.build(), fields)
    }

    fn from_schema(schema: &Schema) -> Result<MessageFields, IndexError> {
        Ok(MessageFields {
            id: schema.get_field("ID")?,
            from: schema.get_field("From")?,
            to: schema.get_field("To")?,
            body: schema.get_field("Body")?,
            date: schema.get_field("Date")?,
        })
    }

    fn searchable(&self) -> Vec<Field> {
        vec![self.from, self.to, self.body, self.date]
    }
}

/// A message as handed to the search engine.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageDocument {
    pub id: String,
    pub from: Vec<String>,
    pub to: Vec<String>,
    pub body: String,
    pub date: String,
}

impl MessageDocument {
    pub fn new(message: &Message, recipient: &[String]) -> Self {
        Self {
            id: message.id.clone(),
            from: message
                .from
                .as_ref()
                .map(|sender| sender.name_variants())
                .unwrap_or_default(),
            to: recipient.to_vec(),
            body: message.message.clone(),
            date: message.date.clone(),
        }
    }

    fn to_tantivy(&self, fields: &MessageFields) -> TantivyDocument {
        let mut doc = TantivyDocument::default();
        doc.add_text(fields.id, &self.id);
        for name in &self.from {
            doc.add_text(fields.from, name);
        }
        for name in &self.to {
            doc.add_text(fields.to, name);
        }
        doc.add_text(fields.body, &self.body);
        doc.add_text(fields.date, &self.date);
        doc
    }

    fn from_tantivy(doc: &TantivyDocument, fields: &MessageFields) -> Self {
        let first = |field| {
            doc.get_first(field)
                .and_then(|value| value.as_str())
                .unwrap_or_default()
                .to_string()
        };
        let all = |field| {
            doc.get_all(field)
                .filter_map(|value| value.as_str())
                .map(str::to_string)
                .collect::<Vec<_>>()
        };

        Self {
            id: first(fields.id),
            from: all(fields.from),
            to: all(fields.to),
            body: first(fields.body),
            date: first(fields.date),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub score: f32,
    pub document: MessageDocument,
}

pub struct MessageIndex {
    index: Index,
    fields: MessageFields,
}

impl MessageIndex {
    /// Creates an empty index in `dir`, which must not already hold one.
    pub fn create(dir: &Path) -> Result<Self, IndexError> {
        fs::create_dir_all(dir)?;
        let (schema, fields) = MessageFields::schema();
        let index = Index::create_in_dir(dir, schema)?;
        Ok(Self { index, fields })
    }

    pub fn open(dir: &Path) -> Result<Self, IndexError> {
        let index = Index::open_in_dir(dir)?;
        let fields = MessageFields::from_schema(&index.schema())?;
        Ok(Self { index, fields })
    }

    pub fn num_docs(&self) -> Result<u64, IndexError> {
        Ok(self.index.reader()?.searcher().num_docs())
    }

    /// Ranked hits for a free-text query over sender, recipient, body and
    /// date, best first.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, IndexError> {
        let searcher = self.index.reader()?.searcher();
        let parser = QueryParser::for_index(&self.index, self.fields.searchable());
        let query = parser.parse_query(query)?;

        let top_docs = searcher.search(&query, &TopDocs::with_limit(limit.max(1)))?;
        top_docs
            .into_iter()
            .map(|(score, address)| {
                let doc: TantivyDocument = searcher.doc(address)?;
                Ok(SearchHit {
                    score,
                    document: MessageDocument::from_tantivy(&doc, &self.fields),
                })
            })
            .collect()
    }
}

/// Name variants of a conversation partner, used as the `To` field.
fn recipient_variants(archive: &Archive, partner_id: &str) -> Vec<String> {
    archive
        .users
        .get(partner_id)
        .map(|user| {
            [&user.name, &user.mention_name]
                .into_iter()
                .filter(|name| !name.is_empty())
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

fn index_conversation(
    writer: &IndexWriter,
    fields: &MessageFields,
    messages: &[Message],
    recipient: &[String],
) -> Result<usize, IndexError> {
    let batch: Vec<UserOperation> = messages
        .iter()
        .map(|message| {
            UserOperation::Add(MessageDocument::new(message, recipient).to_tantivy(fields))
        })
        .collect();
    let count = batch.len();

    writer.run(batch)?;
    Ok(count)
}

/// Indexes every message of `archive` into a fresh index in `dir` and
/// returns the number of documents written.
///
/// The index is built in a staging directory next to `dir` and moved into
/// place once committed, so a failed build leaves `dir` untouched. `dir` must
/// be absent or empty.
pub async fn build_index(archive: &Archive, dir: &Path) -> Result<u64, IndexError> {
    ensure_vacant(dir)?;

    let parent = dir
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    fs::create_dir_all(parent)?;
    let staging = tempfile::Builder::new()
        .prefix(".hcarchive-index-")
        .tempdir_in(parent)?;

    let total = index_archive(archive, staging.path()).await?;

    if dir.exists() {
        fs::remove_dir(dir)?;
    }
    fs::rename(staging.path(), dir)?;

    info!("indexed {} messages into {}", total, dir.display());
    Ok(total)
}

fn ensure_vacant(dir: &Path) -> Result<(), IndexError> {
    match fs::read_dir(dir) {
        Ok(mut entries) => match entries.next() {
            Some(_) => Err(IndexError::Exists(dir.to_path_buf())),
            None => Ok(()),
        },
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Any failing conversation aborts the build before the commit.
async fn index_archive(archive: &Archive, dir: &Path) -> Result<u64, IndexError> {
    let index = MessageIndex::create(dir)?;
    let writer: IndexWriter = index.index.writer(WRITER_MEMORY_BUDGET)?;
    let writer = Arc::new(writer);
    let fields = index.fields;

    let tasks = archive.non_empty_conversations().map(|(partner_id, messages)| {
        let writer = Arc::clone(&writer);
        let partner = partner_id.clone();
        let messages = messages.clone();
        let recipient = recipient_variants(archive, partner_id);

        async move {
            let count = tokio::task::spawn_blocking(move || {
                index_conversation(&writer, &fields, &messages, &recipient)
            })
            .await
            .map_err(|e| IndexError::Build {
                partner: partner.clone(),
                reason: e.to_string(),
            })?
            .map_err(|e| IndexError::Build {
                partner: partner.clone(),
                reason: e.to_string(),
            })?;
            debug!("indexed {} messages with {}", count, partner);
            Ok::<usize, IndexError>(count)
        }
    });

    let counts = try_join_all(tasks).await?;
    let total: usize = counts.iter().sum();

    let mut writer = Arc::try_unwrap(writer).map_err(|_| IndexError::Build {
        partner: String::new(),
        reason: "index writer still in use".to_string(),
    })?;
    writer.commit()?;
    writer.wait_merging_threads()?;

    debug!("committed {} documents in {}", total, dir.display());
    Ok(total as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Sender, SenderAccount, User};

    #[test]
    fn test_document_from_record_sender() {
        let sender = Sender::Account(SenderAccount {
            name: Some("Alice".to_string()),
            mention_name: Some("alice".to_string()),
            ..SenderAccount::default()
        });
        let message = Message::new("a", "2024-01-01T10:00:00Z", sender, "hi");

        let doc = MessageDocument::new(&message, &["Bob".to_string(), "bob".to_string()]);

        assert_eq!(doc.from, vec!["Alice", "alice"]);
        assert_eq!(doc.to, vec!["Bob", "bob"]);
        assert_eq!(doc.body, "hi");
        assert_eq!(doc.date, "2024-01-01T10:00:00Z");
    }

    #[test]
    fn test_document_from_plain_handle() {
        let message = Message::new(
            "a",
            "2024-01-01T10:00:00Z",
            Sender::Handle("JIRA".to_string()),
            "build failed",
        );

        assert_eq!(MessageDocument::new(&message, &[]).from, vec!["JIRA"]);
    }

    #[test]
    fn test_recipient_variants_of_unknown_partner_are_empty() {
        let mut archive = Archive::default();
        archive
            .users
            .insert("7".to_string(), User::new(7, "Alice", "alice"));

        assert_eq!(recipient_variants(&archive, "7"), vec!["Alice", "alice"]);
        assert!(recipient_variants(&archive, "8").is_empty());
    }
}
