//! CLI integration tests
//!
//! Runs the built binary against generated PDFs.

mod common;

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use common::{build_pdf, build_pdf_with_images, write_pdf};
use predicates::prelude::*;
use tempfile::tempdir;

fn tagger(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("pdf-a11y-tagger").unwrap();
    cmd.current_dir(dir);
    cmd
}

fn report_pdf(dir: &Path) {
    let doc = build_pdf(&[&[("Annual Report", 24), ("Revenue grew 10%.", 12)]]);
    write_pdf(doc, &dir.join("report.pdf"));
}

#[cfg(test)]
mod tests {
    use super::*;

    // TC-CLI-001: Help lists the subcommands
    #[test]
    fn test_help() {
        let dir = tempdir().unwrap();
        tagger(dir.path())
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("tag"))
            .stdout(predicate::str::contains("inspect"))
            .stdout(predicate::str::contains("alt-text"));
    }

    // TC-CLI-002: Tag prints a summary and writes the output
    #[test]
    fn test_tag_summary() {
        let dir = tempdir().unwrap();
        report_pdf(dir.path());

        tagger(dir.path())
            .args(["tag", "report.pdf", "tagged.pdf"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Tagged 1 of 1 pages"))
            .stdout(predicate::str::contains("H1 1"))
            .stdout(predicate::str::contains("Wrote tagged.pdf"));

        assert!(dir.path().join("tagged.pdf").is_file());
    }

    // TC-CLI-003: --json emits a parseable run report
    #[test]
    fn test_tag_json() {
        let dir = tempdir().unwrap();
        report_pdf(dir.path());

        let output = tagger(dir.path())
            .args(["tag", "report.pdf", "tagged.pdf", "--json"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(report["counts"]["heading1"], 1);
        assert_eq!(report["counts"]["paragraph"], 1);
        assert_eq!(report["tagged_pages"], 1);
        assert_eq!(report["replaced_existing_tree"], false);
    }

    // TC-CLI-004: Missing input exits with code 2
    #[test]
    fn test_missing_input() {
        let dir = tempdir().unwrap();
        tagger(dir.path())
            .args(["tag", "absent.pdf", "out.pdf"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("Error"));
        assert!(!dir.path().join("out.pdf").exists());
    }

    // TC-CLI-005: Writing over the input needs --in-place
    #[test]
    fn test_same_input_output() {
        let dir = tempdir().unwrap();
        report_pdf(dir.path());
        let before = fs::read(dir.path().join("report.pdf")).unwrap();

        tagger(dir.path())
            .args(["tag", "report.pdf", "report.pdf"])
            .assert()
            .code(5);
        assert_eq!(fs::read(dir.path().join("report.pdf")).unwrap(), before);

        tagger(dir.path())
            .args(["tag", "report.pdf", "report.pdf", "--in-place"])
            .assert()
            .success();
    }

    // TC-CLI-006: Malformed language tags are rejected
    #[test]
    fn test_invalid_lang() {
        let dir = tempdir().unwrap();
        report_pdf(dir.path());

        tagger(dir.path())
            .args(["tag", "report.pdf", "out.pdf", "--lang", "not a tag"])
            .assert()
            .code(5);
        assert!(!dir.path().join("out.pdf").exists());
    }

    // TC-CLI-007: Re-tagging a tagged file is an integrity failure
    #[test]
    fn test_retag_fails() {
        let dir = tempdir().unwrap();
        report_pdf(dir.path());

        tagger(dir.path())
            .args(["tag", "report.pdf", "once.pdf"])
            .assert()
            .success();
        tagger(dir.path())
            .args(["tag", "once.pdf", "twice.pdf"])
            .assert()
            .code(3);
        assert!(!dir.path().join("twice.pdf").exists());
    }

    // TC-CLI-008: Inspect prints one row per block
    #[test]
    fn test_inspect_table() {
        let dir = tempdir().unwrap();
        report_pdf(dir.path());

        tagger(dir.path())
            .args(["inspect", "report.pdf"])
            .assert()
            .success()
            .stdout(predicate::str::contains("PAGE"))
            .stdout(predicate::str::contains("H1  Annual Report"))
            .stdout(predicate::str::contains("P   Revenue grew 10%."));
    }

    // TC-CLI-009: Inspect --json lists blocks with kinds
    #[test]
    fn test_inspect_json() {
        let dir = tempdir().unwrap();
        report_pdf(dir.path());

        let output = tagger(dir.path())
            .args(["inspect", "report.pdf", "--json"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let blocks: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        let blocks = blocks.as_array().unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0]["kind"], "heading1");
        assert_eq!(blocks[0]["mcid"], 0);
        assert_eq!(blocks[1]["kind"], "paragraph");
    }

    // TC-CLI-010: Threshold override changes the classification
    #[test]
    fn test_inspect_ratio_override() {
        let dir = tempdir().unwrap();
        let doc = build_pdf(&[&[("Big", 20), ("Medium", 16)]]);
        write_pdf(doc, &dir.path().join("doc.pdf"));

        tagger(dir.path())
            .args(["inspect", "doc.pdf"])
            .assert()
            .success()
            .stdout(predicate::str::contains("H2  Medium"));

        tagger(dir.path())
            .args(["inspect", "doc.pdf", "--h2-ratio", "0.9", "--h1-ratio", "0.95"])
            .assert()
            .success()
            .stdout(predicate::str::contains("P   Medium"));
    }

    // TC-CLI-011: Alt-text without a map lists image keys
    #[test]
    fn test_alt_text_listing() {
        let dir = tempdir().unwrap();
        let doc = build_pdf_with_images(&[&[("Logo page", 12)], &[]], &[1, 2]);
        write_pdf(doc, &dir.path().join("images.pdf"));

        tagger(dir.path())
            .args(["alt-text", "images.pdf"])
            .assert()
            .success()
            .stdout(predicate::str::contains("page001_img001.jpg  /Im1"))
            .stdout(predicate::str::contains("page002_img001.jpg  /Im1"));
    }

    // TC-CLI-012: Alt-text with a map writes /Alt
    #[test]
    fn test_alt_text_inject() {
        let dir = tempdir().unwrap();
        let doc = build_pdf_with_images(&[&[("Logo page", 12)]], &[1]);
        write_pdf(doc, &dir.path().join("images.pdf"));
        fs::write(
            dir.path().join("alt.json"),
            r#"{"page001_img001.jpg": "Company logo", "page009_img001.png": "Missing"}"#,
        )
        .unwrap();

        tagger(dir.path())
            .args(["alt-text", "images.pdf", "--map", "alt.json", "-o", "out.pdf"])
            .assert()
            .success()
            .stdout(predicate::str::contains("wrote alt text for page001_img001.jpg"))
            .stdout(predicate::str::contains("no image for page009_img001.png"));

        tagger(dir.path())
            .args(["alt-text", "out.pdf"])
            .assert()
            .success()
            .stdout(predicate::str::contains("(has alt)"));
    }

    // TC-CLI-013: Info reports the structure tree before and after tagging
    #[test]
    fn test_info_structure_tree() {
        let dir = tempdir().unwrap();
        report_pdf(dir.path());

        tagger(dir.path())
            .args(["info", "report.pdf"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Structure tree: no"))
            .stdout(predicate::str::contains("Config File Locations:"));

        tagger(dir.path())
            .args(["tag", "report.pdf", "tagged.pdf", "--title", "Annual Report"])
            .assert()
            .success();

        tagger(dir.path())
            .args(["info", "tagged.pdf"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Structure tree: yes"))
            .stdout(predicate::str::contains("Title:          Annual Report"))
            .stdout(predicate::str::contains("Language:       en-US"));
    }

    // TC-CLI-014: An explicit config file that does not parse is fatal
    #[test]
    fn test_bad_explicit_config() {
        let dir = tempdir().unwrap();
        report_pdf(dir.path());
        fs::write(dir.path().join("bad.toml"), "[classify\nheading1_ratio = ").unwrap();

        tagger(dir.path())
            .args(["tag", "report.pdf", "out.pdf", "--config", "bad.toml"])
            .assert()
            .code(5);
    }

    // TC-CLI-015: The local config file is picked up
    #[test]
    fn test_local_config_file() {
        let dir = tempdir().unwrap();
        let doc = build_pdf(&[&[("Big", 20), ("Medium", 16)]]);
        write_pdf(doc, &dir.path().join("doc.pdf"));
        fs::write(
            dir.path().join("pdf-a11y-tagger.toml"),
            "[classify]\nheading1_ratio = 0.95\nheading2_ratio = 0.9\n",
        )
        .unwrap();

        tagger(dir.path())
            .args(["inspect", "doc.pdf"])
            .assert()
            .success()
            .stdout(predicate::str::contains("P   Medium"));
    }
}
