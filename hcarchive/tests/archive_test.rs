mod common;

use chrono::Utc;
use common::sample_archive;
use hcarchive::archive::{
    read_archive, write_archive, write_archive_in, ArchiveFormat, MACHINE_READABLE_NAME,
};
use hcarchive::models::Archive;
use std::fs::{self, File};
use std::io::Read;
use zip::ZipArchive;

fn entry_names(path: &std::path::Path) -> Vec<String> {
    let zip = ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut names: Vec<String> = zip.file_names().map(str::to_string).collect();
    names.sort();
    names
}

#[test]
fn test_json_archive_round_trip() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("archive.json");
    let archive = sample_archive();

    let format = write_archive(&archive, &path).unwrap();

    assert_eq!(format, ArchiveFormat::Json);
    assert_eq!(read_archive(&path).unwrap(), archive);

    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert!(raw["Users"]["7"].is_object());
    assert_eq!(raw["Conversations"]["8"], serde_json::json!([]));
    assert_eq!(
        raw["Conversations"]["7"][1]["message"],
        "sure\nsee you at the usual place"
    );
    assert_eq!(
        raw["Conversations"]["7"][0]["date"],
        "2024-01-01T10:00:00.123456+00:00"
    );
}

#[test]
fn test_zip_archive_round_trip() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("nested").join("archive.zip");
    let archive = sample_archive();

    let format = write_archive_in(&archive, &path, &Utc).unwrap();

    assert_eq!(format, ArchiveFormat::Zip);
    assert_eq!(read_archive(&path).unwrap(), archive);
    // Bob has no messages, so only Alice gets a transcript.
    assert_eq!(
        entry_names(&path),
        vec!["conversations/Alice.txt", MACHINE_READABLE_NAME]
    );
}

#[test]
fn test_zip_transcript_content() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("archive.zip");

    write_archive_in(&sample_archive(), &path, &Utc).unwrap();

    let mut zip = ZipArchive::new(File::open(&path).unwrap()).unwrap();
    let mut transcript = String::new();
    zip.by_name("conversations/Alice.txt")
        .unwrap()
        .read_to_string(&mut transcript)
        .unwrap();

    assert!(transcript.contains("Monday January 1, 2024"));
    assert!(transcript.contains("Tuesday January 2, 2024"));
    assert!(transcript.contains(&format!("{:<30} | lunch at noon?", "Alice")));
    assert!(transcript.contains(&format!(
        "{:<30} | sure\n{} | see you at the usual place",
        "Me",
        " ".repeat(30)
    )));
    assert!(transcript.contains(&format!("{:<30} | build passed", "GitHub")));
}

#[test]
fn test_unknown_extension_is_written_as_zip() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("archive.bak");

    assert_eq!(
        write_archive_in(&sample_archive(), &path, &Utc).unwrap(),
        ArchiveFormat::Zip
    );
    assert!(entry_names(&path).contains(&MACHINE_READABLE_NAME.to_string()));
}

#[test]
fn test_rewrite_replaces_previous_archive() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("archive.json");

    write_archive(&sample_archive(), &path).unwrap();
    write_archive(&Archive::default(), &path).unwrap();

    assert_eq!(read_archive(&path).unwrap(), Archive::default());
    // Only the archive itself is left behind, no temporary files.
    assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 1);
}

#[test]
fn test_missing_archive_is_an_error() {
    let temp_dir = tempfile::tempdir().unwrap();
    assert!(read_archive(&temp_dir.path().join("absent.zip")).is_err());
}

#[test]
fn test_archive_keeps_unknown_fields() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("archive.json");
    fs::write(
        &path,
        r#"{
  "Users": {"7": {"id": 7, "name": "Alice", "mention_name": "alice", "email": "alice@example.com"}},
  "Conversations": {"7": [
    {"id": "a", "date": "2024-01-01T10:00:00Z", "message": "hi",
     "from": {"id": 7, "name": "Alice", "mention_name": "alice"}, "type": "message"}
  ]}
}"#,
    )
    .unwrap();

    let archive = read_archive(&path).unwrap();
    let rewritten = temp_dir.path().join("copy.json");
    write_archive(&archive, &rewritten).unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&rewritten).unwrap()).unwrap();
    assert_eq!(raw["Users"]["7"]["email"], "alice@example.com");
    assert_eq!(raw["Conversations"]["7"][0]["type"], "message");
    assert_eq!(raw["Conversations"]["7"][0]["from"]["id"], 7);
}

#[test]
fn test_transcript_of_descending_archive_reads_oldest_first() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("archive.zip");
    let mut archive = sample_archive();
    archive.conversations.get_mut("7").unwrap().reverse();

    write_archive_in(&archive, &path, &Utc).unwrap();

    let mut zip = ZipArchive::new(File::open(&path).unwrap()).unwrap();
    let mut transcript = String::new();
    zip.by_name("conversations/Alice.txt")
        .unwrap()
        .read_to_string(&mut transcript)
        .unwrap();

    let jan1 = transcript.find("Monday January 1, 2024").unwrap();
    let jan2 = transcript.find("Tuesday January 2, 2024").unwrap();
    let lunch = transcript.find("lunch at noon?").unwrap();
    let sure = transcript.find("sure").unwrap();
    assert!(jan1 < jan2);
    assert!(lunch < sure);

    // The structured archive keeps the stored order.
    assert_eq!(read_archive(&path).unwrap(), archive);
}
