//! End-to-end migration of an on-disk export into a vault.

use std::fs;
use std::path::{Path, PathBuf};

use omniparser::config::PathsYamlConfig;
use omniparser::{
    analyze_vault, fingerprint, run_migration, DedupError, MigrationError, OmniConfig,
};
use tempfile::TempDir;

const PHOTO: &[u8] = b"\x89PNG\r\n\x1a\n pretend this is a sunset";

struct Export {
    _dir: TempDir,
    notes: PathBuf,
    attachments: PathBuf,
    output: PathBuf,
}

impl Export {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let notes = dir.path().join("notes");
        let attachments = dir.path().join("attachments");
        let output = dir.path().join("vault");
        fs::create_dir_all(notes.join("trip")).expect("notes dir");
        fs::create_dir_all(attachments.join("pics")).expect("attachments dir");
        Self {
            _dir: dir,
            notes,
            attachments,
            output,
        }
    }

    /// Three notes embedding the same image under three names, one note
    /// transclusion, and one attachment nobody uses.
    fn populated() -> Self {
        let export = Self::new();
        export.note("daily.md", "Morning ![[photo.png]] and ![[Recipes]]\n");
        export.note(
            "trip/day1.md",
            "# Day 1\n![beach](../attachments/pics/beach%20copy.png)\n",
        );
        export.note("trip/day2.md", "<img src=\"pics/beach.png\" width=\"300\">\n");
        export.attachment("photo.png", PHOTO);
        export.attachment("pics/beach copy.png", PHOTO);
        export.attachment("pics/beach.png", PHOTO);
        export.attachment("unused.gif", b"GIF89a");
        export.attachment("notes.txt", b"not an asset");
        export
    }

    fn note(&self, relative: &str, body: &str) {
        fs::write(self.notes.join(relative), body).expect("write note");
    }

    fn attachment(&self, relative: &str, bytes: &[u8]) {
        fs::write(self.attachments.join(relative), bytes).expect("write attachment");
    }

    fn config(&self) -> OmniConfig {
        OmniConfig {
            paths: PathsYamlConfig {
                notes_dir: self.notes.clone(),
                attachments_dir: self.attachments.clone(),
                output_dir: self.output.clone(),
            },
            ..Default::default()
        }
    }
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).expect("read output")
}

#[test]
fn migration_stores_each_image_once_and_relinks_notes() {
    let export = Export::populated();
    let summary = run_migration(&export.config()).expect("migration succeeds");

    let canonical = format!("attachments/{}.png", fingerprint(PHOTO).to_hex());

    assert_eq!(summary.notes_written, 3);
    assert_eq!(summary.commit.written, 1);
    assert_eq!(summary.unreferenced_attachments, 1);
    assert!(summary.rejected_assets.is_empty());
    assert_eq!(summary.report.assets_seen, 3);
    assert_eq!(summary.report.canonical_assets, 1);
    assert_eq!(summary.report.duplicates_discarded, 2);
    assert_eq!(summary.report.bytes_saved, 2 * PHOTO.len() as u64);
    assert_eq!(summary.report.references_rewritten, 3);

    let stored: Vec<_> = fs::read_dir(export.output.join("attachments"))
        .expect("attachments written")
        .collect();
    assert_eq!(stored.len(), 1);
    assert_eq!(fs::read(export.output.join(&canonical)).expect("asset"), PHOTO);

    assert_eq!(
        read(&export.output.join("daily.md")),
        format!("Morning ![[{canonical}]] and ![[Recipes]]\n")
    );
    assert_eq!(
        read(&export.output.join("trip/day1.md")),
        format!("# Day 1\n![beach]({canonical})\n")
    );
    assert_eq!(
        read(&export.output.join("trip/day2.md")),
        format!("<img src=\"{canonical}\" width=\"300\">\n")
    );
}

#[test]
fn rerunning_finds_assets_already_present() {
    let export = Export::populated();
    let first = run_migration(&export.config()).expect("first run");
    let second = run_migration(&export.config()).expect("second run");

    assert_eq!(first.report, second.report);
    assert_eq!(second.commit.written, 0);
    assert_eq!(second.commit.already_present, 1);
}

#[test]
fn dry_run_reports_the_duplicate_group_without_writing() {
    let export = Export::populated();
    let groups = analyze_vault(&export.config()).expect("analyze");

    assert_eq!(groups.len(), 1);
    let group = &groups[0];
    assert_eq!(group.canonical_source.as_str(), "photo.png");
    let duplicates: Vec<_> = group.duplicates.iter().map(|p| p.as_str()).collect();
    assert_eq!(duplicates, vec!["pics/beach copy.png", "pics/beach.png"]);
    assert_eq!(group.wasted_bytes, 2 * PHOTO.len() as u64);
    assert!(!export.output.exists());
}

#[test]
fn missing_attachment_aborts_before_anything_is_written() {
    let export = Export::populated();
    export.note("broken.md", "![[gone.png]]\n");

    let err = run_migration(&export.config()).expect_err("zero tolerance");
    let MigrationError::Dedup(DedupError::ToleranceExceeded { report, .. }) = &err else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(report.unresolved.len(), 1);
    assert_eq!(report.unresolved[0].document_id.as_str(), "broken");
    assert!(err.to_string().contains("gone.png"));
    assert!(!export.output.exists());
}

#[test]
fn tolerated_missing_attachment_is_left_as_written() {
    let export = Export::populated();
    export.note("broken.md", "![[gone.png]]\n");
    let mut config = export.config();
    config.dedup.unresolved_tolerance = 1;

    let summary = run_migration(&config).expect("tolerated");
    assert_eq!(summary.report.unresolved.len(), 1);
    assert_eq!(read(&export.output.join("broken.md")), "![[gone.png]]\n");
}

#[test]
fn oversized_attachment_is_rejected_and_its_reference_unresolved() {
    let export = Export::new();
    export.note("a.md", "![[big.png]] ![[small.png]]\n");
    export.attachment("big.png", &[7u8; 64]);
    export.attachment("small.png", b"tiny");
    let mut config = export.config();
    config.ingest.max_asset_bytes = Some(16);
    config.dedup.unresolved_tolerance = 1;

    let summary = run_migration(&config).expect("tolerated");
    assert_eq!(summary.rejected_assets.len(), 1);
    assert_eq!(summary.rejected_assets[0].path.as_str(), "big.png");
    assert_eq!(summary.report.canonical_assets, 1);
    assert_eq!(summary.report.unresolved.len(), 1);
    assert!(summary.render().contains("Rejected assets:    1"));
}

#[test]
fn markdown_target_with_literal_space_is_migrated() {
    let export = Export::new();
    export.note("a.md", "![](my image.png)\n");
    export.attachment("my image.png", PHOTO);

    let summary = run_migration(&export.config()).expect("migration succeeds");
    let canonical = format!("attachments/{}.png", fingerprint(PHOTO).to_hex());

    assert_eq!(summary.unreferenced_attachments, 0);
    assert_eq!(summary.report.references_rewritten, 1);
    assert_eq!(read(&export.output.join("a.md")), format!("![]({canonical})\n"));
}

#[test]
fn output_directory_may_not_be_the_notes_directory() {
    let export = Export::populated();
    let mut config = export.config();
    config.paths.output_dir = export.notes.clone();
    assert!(matches!(
        run_migration(&config),
        Err(MigrationError::Config(_))
    ));
}
