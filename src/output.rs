//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Progress
//!
//! One line per file per job, printed as results stream in. Degraded and
//! failed files carry their reason on an indented line:
//!
//! ```text
//! [jpg .lg] a/cat.png → a/cat.lg.jpg: written
//! [avif .lg] a/cat.png → a/cat.lg.avif: degraded
//!     metadata read failed: Failed to decode image: ...
//! [placeholder] a/cat.png → a/cat.webp: skipped
//! ```
//!
//! ## Summary
//!
//! ```text
//! jpg: 2 written, 1 skipped (3 total)
//! avif: 3 written
//! ```
//!
//! ## Check
//!
//! ```text
//! Source: imgs (3 png files)
//! Dest: out
//! Versions
//!     .lg 80% (jpg 0.8, webp 0.8, avif 0.6)
//! Placeholders: webp, 16px, quality 0.2
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::config::Configuration;
use crate::process::{FileResult, FileStatus, Pipeline, Report};
use crate::scan::SourceFile;
use std::path::Path;

fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn status_label(status: &FileStatus) -> &'static str {
    match status {
        FileStatus::Written => "written",
        FileStatus::Skipped => "skipped",
        FileStatus::Degraded(_) => "degraded",
        FileStatus::Failed(_) => "failed",
    }
}

// ============================================================================
// Progress
// ============================================================================

/// Format a single progress event as display lines.
pub fn format_event(event: &FileResult) -> Vec<String> {
    let job = match &event.version {
        Some(suffix) => format!("[{} {}]", event.pipeline, suffix),
        None => format!("[{}]", event.pipeline),
    };
    let mut lines = vec![format!(
        "{} {} \u{2192} {}: {}",
        job,
        display_path(&event.source),
        display_path(&event.output),
        status_label(&event.status)
    )];
    if let FileStatus::Degraded(reason) | FileStatus::Failed(reason) = &event.status {
        lines.push(format!("    {}", reason));
    }
    lines
}

pub fn print_event(event: &FileResult) {
    for line in format_event(event) {
        println!("{}", line);
    }
}

// ============================================================================
// Summary
// ============================================================================

/// One summary line per pipeline that produced results, in pipeline order.
pub fn format_report(report: &Report) -> Vec<String> {
    if report.total() == 0 {
        return vec![report.to_string()];
    }
    [
        Pipeline::Jpeg,
        Pipeline::WebP,
        Pipeline::Avif,
        Pipeline::Placeholder,
    ]
    .into_iter()
    .filter_map(|pipeline| {
        let part = Report {
            results: report
                .results
                .iter()
                .filter(|r| r.pipeline == pipeline)
                .cloned()
                .collect(),
        };
        (part.total() > 0).then(|| format!("{}: {}", pipeline, part))
    })
    .collect()
}

pub fn print_report(report: &Report) {
    for line in format_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// Summarise a validated configuration and the sources it would process.
pub fn format_check(config: &Configuration, sources: &[SourceFile]) -> Vec<String> {
    let mut lines = vec![
        format!(
            "Source: {} ({} {} files)",
            display_path(&config.source),
            sources.len(),
            config.source_ext
        ),
        format!("Dest: {}", display_path(&config.dest)),
    ];

    if config.versions.is_empty() {
        lines.push("Versions: none".to_string());
    } else {
        lines.push("Versions".to_string());
        for v in &config.versions {
            lines.push(format!(
                "    {} {}% (jpg {}, webp {}, avif {})",
                v.suffix, v.percent, v.quality.jpg, v.quality.webp, v.quality.avif
            ));
        }
    }

    let blur = config
        .placeholder
        .blur
        .map(|sigma| format!(", blur {}", sigma))
        .unwrap_or_default();
    lines.push(format!(
        "Placeholders: {}, {}px, quality {}{}",
        config.format.extension(),
        config.placeholder.size,
        config.placeholder.quality,
        blur
    ));
    lines
}

pub fn print_check(config: &Configuration, sources: &[SourceFile]) {
    for line in format_check(config, sources) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{VersionQuality, VersionSpec};
    use std::path::PathBuf;

    fn event(pipeline: Pipeline, version: Option<&str>, status: FileStatus) -> FileResult {
        FileResult {
            pipeline,
            version: version.map(str::to_string),
            source: PathBuf::from("a/cat.png"),
            output: PathBuf::from("a/cat.lg.jpg"),
            status,
        }
    }

    #[test]
    fn event_written() {
        let lines = format_event(&event(Pipeline::Jpeg, Some(".lg"), FileStatus::Written));
        assert_eq!(lines, vec!["[jpg .lg] a/cat.png \u{2192} a/cat.lg.jpg: written"]);
    }

    #[test]
    fn event_failed_shows_reason() {
        let lines = format_event(&event(
            Pipeline::WebP,
            Some(".sm"),
            FileStatus::Failed("bad header".into()),
        ));
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("[webp .sm]"));
        assert!(lines[0].ends_with(": failed"));
        assert_eq!(lines[1], "    bad header");
    }

    #[test]
    fn event_placeholder_has_no_suffix() {
        let lines = format_event(&event(Pipeline::Placeholder, None, FileStatus::Skipped));
        assert!(lines[0].starts_with("[placeholder] a/cat.png"));
        assert!(lines[0].ends_with(": skipped"));
    }

    #[test]
    fn report_groups_by_pipeline() {
        let report = Report {
            results: vec![
                event(Pipeline::Avif, Some(".lg"), FileStatus::Written),
                event(Pipeline::Jpeg, Some(".lg"), FileStatus::Written),
                event(Pipeline::Jpeg, Some(".lg"), FileStatus::Skipped),
            ],
        };
        assert_eq!(
            format_report(&report),
            vec!["jpg: 1 written, 1 skipped (2 total)", "avif: 1 written"]
        );
    }

    #[test]
    fn report_empty() {
        assert_eq!(format_report(&Report::default()), vec!["no matching files"]);
    }

    #[test]
    fn check_lists_versions_and_placeholders() {
        let config = Configuration {
            source: PathBuf::from("imgs"),
            dest: PathBuf::from("out"),
            versions: vec![VersionSpec {
                suffix: ".lg".into(),
                percent: 80.0,
                quality: VersionQuality {
                    jpg: 0.8,
                    webp: 0.8,
                    avif: 0.6,
                },
            }],
            ..Configuration::default()
        };
        let sources = vec![SourceFile {
            path: PathBuf::from("imgs/a.png"),
            relative: PathBuf::from("a.png"),
        }];

        assert_eq!(
            format_check(&config, &sources),
            vec![
                "Source: imgs (1 png files)",
                "Dest: out",
                "Versions",
                "    .lg 80% (jpg 0.8, webp 0.8, avif 0.6)",
                "Placeholders: webp, 16px, quality 0.2",
            ]
        );
    }

    #[test]
    fn check_without_versions() {
        let lines = format_check(&Configuration::default(), &[]);
        assert!(lines.contains(&"Versions: none".to_string()));
    }
}
