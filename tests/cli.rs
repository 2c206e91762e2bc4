//! Command-line tests for the `overlap` binary.

use std::io::Write;
use std::process::{Command, Output};
use tempfile::NamedTempFile;

// =============================================================================
// Helper functions
// =============================================================================

fn create_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", content).unwrap();
    file.flush().unwrap();
    file
}

fn run_overlap(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_overlap"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run overlap")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

const TRACKS: &str = "\
chr1\t900\t1500\tA\tbrain\tENCODE
chr1\t1400\t1800\tA\tbrain\tENCODE
chr1\t1900\t2100\tA\tbrain\tENCODE
chr1\t1200\t1300\tB\tliver\tRoadmap
chr1\t200\t1000\tC\tliver\tENCODE
";

// =============================================================================
// query
// =============================================================================

#[test]
fn test_query_reports_merged_coverage() {
    let tracks = create_file(TRACKS);
    let path = tracks.path().to_str().unwrap();
    let output = run_overlap(&[
        "query", "-i", path, "-c", "chr1", "-s", "1000", "-e", "2000",
    ]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let text = stdout(&output);
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("#track_id\t"));
    assert_eq!(
        lines[1],
        "A\t900\t0.9\t3\t2\t1000-1800,1900-2000\tbrain\tENCODE"
    );
    assert!(lines[2].starts_with("B\t100\t"));
}

#[test]
fn test_query_tissue_filter() {
    let tracks = create_file(TRACKS);
    let path = tracks.path().to_str().unwrap();

    for extra in [&[][..], &["--no-pushdown"][..]] {
        let mut args = vec![
            "query", "-i", path, "-c", "1", "-s", "0", "-e", "3000", "--tissue", "LIVER",
        ];
        args.extend_from_slice(extra);
        let output = run_overlap(&args);

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        let ids: Vec<_> = stdout(&output)
            .lines()
            .skip(1)
            .map(|l| l.split('\t').next().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["C", "B"]);
    }
}

#[test]
fn test_query_max_tracks() {
    let tracks = create_file(TRACKS);
    let path = tracks.path().to_str().unwrap();
    let output = run_overlap(&[
        "query", "-i", path, "-c", "chr1", "-s", "0", "-e", "3000", "-n", "1",
    ]);

    assert!(output.status.success());
    let text = stdout(&output);
    assert_eq!(text.lines().count(), 2);
    assert!(text.lines().nth(1).unwrap().starts_with("A\t"));
}

#[test]
fn test_query_default_track_cap() {
    let content: String = (0..25)
        .map(|i| format!("chr1\t{}\t{}\tT{:02}\n", i * 10, i * 10 + 5 + i, i))
        .collect();
    let tracks = create_file(&content);
    let path = tracks.path().to_str().unwrap();

    let capped = run_overlap(&["query", "-i", path, "-c", "chr1", "-s", "0", "-e", "1000"]);
    assert!(capped.status.success(), "stderr: {}", stderr(&capped));
    let capped_text = stdout(&capped);
    // Header plus the 20 tracks with the most coverage
    assert_eq!(capped_text.lines().count(), 21);
    assert!(capped_text.lines().nth(1).unwrap().starts_with("T24\t"));
    assert!(!capped_text.contains("T04\t"));

    let uncapped = run_overlap(&[
        "query", "-i", path, "-c", "chr1", "-s", "0", "-e", "1000", "-n", "0",
    ]);
    assert!(uncapped.status.success());
    assert_eq!(stdout(&uncapped).lines().count(), 26);
}

#[test]
fn test_query_invalid_region_fails() {
    let tracks = create_file(TRACKS);
    let path = tracks.path().to_str().unwrap();

    for (start, end) in [("2000", "1000"), ("500", "500"), ("-5", "100")] {
        let output = run_overlap(&[
            "query", "-i", path, "-c", "chr1", "-s", start, "-e", end,
        ]);
        assert!(!output.status.success(), "{}-{} should fail", start, end);
        assert!(stderr(&output).contains("Invalid region"));
        assert!(stdout(&output).is_empty());
    }
}

#[test]
fn test_query_missing_input_fails() {
    let output = run_overlap(&[
        "query",
        "-i",
        "/nonexistent/tracks.tsv",
        "-c",
        "chr1",
        "-s",
        "0",
        "-e",
        "10",
    ]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Error:"));
}

#[test]
fn test_query_stats_and_partial_warning() {
    let tracks = create_file(&format!("{}chr1\t1500\tnope\tB\n", TRACKS));
    let path = tracks.path().to_str().unwrap();
    let output = run_overlap(&[
        "query", "-i", path, "-c", "chr1", "-s", "1000", "-e", "2000", "--stats",
    ]);

    assert!(output.status.success());
    let err = stderr(&output);
    assert!(err.contains("Malformed: 1"), "stderr: {}", err);
    assert!(err.contains("partial"), "stderr: {}", err);
}

// =============================================================================
// batch
// =============================================================================

#[test]
fn test_batch_prefixes_region() {
    let tracks = create_file(TRACKS);
    let regions = create_file("# regions\nchr1\t1000\t2000\nchr1\t0\t500\nchr2\t0\t100\n");
    let output = run_overlap(&[
        "batch",
        "-i",
        tracks.path().to_str().unwrap(),
        "-r",
        regions.path().to_str().unwrap(),
        "-t",
        "2",
    ]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let text = stdout(&output);
    let lines: Vec<_> = text.lines().collect();
    assert!(lines[0].starts_with("#chrom\tstart\tend\ttrack_id"));
    assert_eq!(lines.len(), 4);
    assert!(lines[1].starts_with("chr1\t1000\t2000\tA\t900\t"));
    assert!(lines[2].starts_with("chr1\t1000\t2000\tB\t100\t"));
    assert!(lines[3].starts_with("chr1\t0\t500\tC\t300\t"));
}

#[test]
fn test_batch_bad_region_line_fails() {
    let tracks = create_file(TRACKS);
    let regions = create_file("chr1\t1000\n");
    let output = run_overlap(&[
        "batch",
        "-i",
        tracks.path().to_str().unwrap(),
        "-r",
        regions.path().to_str().unwrap(),
    ]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("line 1"));
}
