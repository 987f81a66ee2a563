use chrono::{Local, TimeZone};
use log::{debug, info};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::PersistenceError;
use crate::merger::{MessageSet, SortOrder};
use crate::models::Archive;
use crate::transcript::render_transcript;

pub const MACHINE_READABLE_NAME: &str = "machine-readable.json";
const TRANSCRIPT_DIR: &str = "conversations";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// The structured archive alone.
    Json,
    /// Zip container with the structured archive and one transcript per
    /// non-empty conversation.
    Zip,
}

pub fn detect_format(path: &Path) -> ArchiveFormat {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => ArchiveFormat::Json,
        _ => ArchiveFormat::Zip,
    }
}

/// Writes `archive` to `path` in the format implied by its extension.
///
/// The file is written next to its destination and renamed into place, so
/// `path` either keeps its previous content or holds the complete archive.
pub fn write_archive(archive: &Archive, path: &Path) -> Result<ArchiveFormat, PersistenceError> {
    write_archive_in(archive, path, &Local)
}

pub fn write_archive_in<Tz: TimeZone>(
    archive: &Archive,
    path: &Path,
    tz: &Tz,
) -> Result<ArchiveFormat, PersistenceError> {
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    fs::create_dir_all(dir)?;

    let format = detect_format(path);
    let mut temp = NamedTempFile::new_in(dir)?;

    match format {
        ArchiveFormat::Json => {
            let mut writer = BufWriter::new(temp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, archive)?;
            writer.flush()?;
        }
        ArchiveFormat::Zip => write_zip(archive, temp.as_file_mut(), tz)?,
    }

    temp.as_file().sync_all()?;
    temp.persist(path)?;

    info!(
        "wrote {} conversations ({} messages) to {}",
        archive.conversations.len(),
        archive.message_count(),
        path.display()
    );
    Ok(format)
}

fn write_zip<W: Write + Seek, Tz: TimeZone>(
    archive: &Archive,
    writer: W,
    tz: &Tz,
) -> Result<(), PersistenceError> {
    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, partner_id) in transcript_names(archive) {
        // Transcripts read oldest first whatever order the archive keeps.
        let messages: MessageSet = archive.conversations[&partner_id].iter().cloned().collect();
        let messages = messages.into_sorted(SortOrder::Ascending);
        debug!("rendering transcript {}", name);
        zip.start_file(name, options)?;
        zip.write_all(render_transcript(&messages, tz).as_bytes())?;
    }

    zip.start_file(MACHINE_READABLE_NAME, options)?;
    serde_json::to_writer_pretty(&mut zip, archive)?;

    zip.finish()?;
    Ok(())
}

/// Entry names of the transcripts, paired with the partner they render.
/// Empty conversations get no transcript.
pub fn transcript_names(archive: &Archive) -> Vec<(String, String)> {
    let mut used = HashSet::new();

    archive
        .non_empty_conversations()
        .map(|(partner_id, _)| {
            let label = sanitize_file_name(archive.partner_label(partner_id));
            let stem = if label.is_empty() {
                partner_id.clone()
            } else if used.contains(&label) {
                format!("{} ({})", label, partner_id)
            } else {
                label
            };
            used.insert(stem.clone());
            (format!("{}/{}.txt", TRANSCRIPT_DIR, stem), partner_id.clone())
        })
        .collect()
}

fn sanitize_file_name(label: &str) -> String {
    label
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

pub fn read_archive(path: &Path) -> Result<Archive, PersistenceError> {
    let file = File::open(path)?;

    let archive: Archive = match detect_format(path) {
        ArchiveFormat::Json => serde_json::from_reader(BufReader::new(file))?,
        ArchiveFormat::Zip => read_zip(BufReader::new(file))?,
    };

    debug!("read archive {}", path.display());
    Ok(archive)
}

fn read_zip<R: Read + Seek>(reader: R) -> Result<Archive, PersistenceError> {
    let mut zip = ZipArchive::new(reader)?;
    let entry = zip.by_name(MACHINE_READABLE_NAME)?;
    Ok(serde_json::from_reader(BufReader::new(entry))?)
}
