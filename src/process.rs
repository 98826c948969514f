//! Pipeline driver: versions and placeholders.
//!
//! Each resize pipeline (JPEG, WebP, AVIF) takes one [`Configuration`] and runs
//! one job per [`VersionSpec`]. Every job reads the full set of matching source
//! files and pushes each one through
//!
//! ```text
//! Discovered → ChangeFilter (pass | skip) → Resized → Encoded → Renamed → Written
//! ```
//!
//! The placeholder pipeline is the same walk over `*.png` sources with a single
//! LQIP step instead of resize + encode, and no version suffix.
//!
//! ## Parallel Processing
//!
//! Versions and the files within them are processed with
//! [rayon](https://docs.rs/rayon). Jobs start together and finish in any order;
//! within one file the steps run in order. Versions are validated to have
//! distinct suffixes, so concurrent jobs never write the same path.
//!
//! ## Failure Handling
//!
//! | Failure | Outcome |
//! |---|---|
//! | Invalid config, missing source dir, dest not creatable | `Err` before any file is touched |
//! | AVIF metadata or encode error | original bytes written under the `.avif` name, [`FileStatus::Degraded`] |
//! | JPEG/WebP read, decode, encode or write error | nothing written, [`FileStatus::Failed`], job continues |
//! | Placeholder error | the other files still run, then the job returns `Err` |
//!
//! Every operation returns only after all files are done, with a [`Report`]
//! counting written, skipped, degraded and failed files.

use crate::config::{ConfigError, Configuration, VersionSpec};
use crate::freshness::{AlwaysProcess, ChangeFilter, MtimeFilter, destination_path};
use crate::imaging::{
    BackendError, Codec, ImageBackend, Placeholder, PlaceholderParams, Quality, ResizeTarget, RustBackend,
    TranscodeParams, width_for_percent,
};
use crate::naming;
use crate::placeholder_index::{IndexEntry, PlaceholderIndex};
use crate::scan::{self, SourceFile};
use rayon::prelude::*;
use serde::Serialize;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Placeholders are always generated from PNG sources.
pub const PLACEHOLDER_SOURCE_EXT: &str = "png";

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to walk source directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Source directory not found: {0}")]
    SourceNotFound(PathBuf),
    #[error("Placeholder generation failed for {path}: {source}")]
    Placeholder {
        path: PathBuf,
        #[source]
        source: BackendError,
    },
}

/// Which pipeline produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Pipeline {
    #[serde(rename = "jpg")]
    Jpeg,
    WebP,
    Avif,
    Placeholder,
}

impl From<Codec> for Pipeline {
    fn from(codec: Codec) -> Self {
        match codec {
            Codec::Jpeg => Pipeline::Jpeg,
            Codec::WebP => Pipeline::WebP,
            Codec::Avif => Pipeline::Avif,
        }
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Pipeline::Jpeg => "jpg",
            Pipeline::WebP => "webp",
            Pipeline::Avif => "avif",
            Pipeline::Placeholder => "placeholder",
        })
    }
}

/// Terminal state of one file in one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum FileStatus {
    /// Converted and written.
    Written,
    /// Output already up to date.
    Skipped,
    /// Conversion failed; the original bytes were written instead.
    Degraded(String),
    /// Nothing was written.
    Failed(String),
}

/// Outcome for one source file in one job. Also the progress event type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileResult {
    pub pipeline: Pipeline,
    /// Version suffix; `None` for placeholders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Source path relative to the source root.
    pub source: PathBuf,
    /// Output path relative to the destination root.
    pub output: PathBuf,
    #[serde(flatten)]
    pub status: FileStatus,
}

/// Aggregated outcome of one or more jobs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Report {
    pub results: Vec<FileResult>,
}

impl Report {
    fn count(&self, pred: impl Fn(&FileStatus) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.status)).count()
    }

    pub fn written(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Written))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Skipped))
    }

    pub fn degraded(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Degraded(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Failed(_)))
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    /// Append another report's results.
    pub fn merge(&mut self, other: Report) {
        self.results.extend(other.results);
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.total() == 0 {
            return write!(f, "no matching files");
        }
        let mut parts = vec![format!("{} written", self.written())];
        for (n, label) in [
            (self.skipped(), "skipped"),
            (self.degraded(), "degraded"),
            (self.failed(), "failed"),
        ] {
            if n > 0 {
                parts.push(format!("{n} {label}"));
            }
        }
        if parts.len() == 1 {
            write!(f, "{}", parts[0])
        } else {
            write!(f, "{} ({} total)", parts.join(", "), self.total())
        }
    }
}

/// In-flight record of one file moving through a job.
///
/// Owned by exactly one job; contents are replaced by the encoder and the
/// relative path is rewritten by the renamer before the file is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    /// Source root the file was read from.
    pub base: PathBuf,
    /// Path relative to `base`, later the path relative to the destination.
    pub relative: PathBuf,
    pub contents: Vec<u8>,
}

impl ImageFile {
    pub fn read(base: &Path, relative: &Path) -> io::Result<Self> {
        let contents = std::fs::read(base.join(relative))?;
        Ok(Self {
            base: base.to_path_buf(),
            relative: relative.to_path_buf(),
            contents,
        })
    }

    /// Replace the file's last extension with `extension`.
    pub fn rename(&mut self, extension: &str) {
        self.relative = naming::rename(&self.relative, extension);
    }

    /// Write under `dest_root`, creating parent directories.
    pub fn write(self, dest_root: &Path) -> io::Result<PathBuf> {
        let out = dest_root.join(&self.relative);
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&out, &self.contents)?;
        Ok(out)
    }
}

/// Validate the config and list the sources for one pipeline.
fn prepare(config: &Configuration, ext: &str) -> Result<Vec<SourceFile>, ProcessError> {
    config.validate()?;
    if !config.source.is_dir() {
        return Err(ProcessError::SourceNotFound(config.source.clone()));
    }
    std::fs::create_dir_all(&config.dest)?;
    Ok(scan::discover(&config.source, ext)?)
}

fn emit(events: &Option<Sender<FileResult>>, result: &FileResult) {
    if let Some(tx) = events {
        // Receiver gone means nobody is printing; results are still returned.
        let _ = tx.send(result.clone());
    }
}

/// Resize and encode every source into `codec` for each version.
///
/// Uses [`RustBackend`]. `force` bypasses change detection.
pub fn resize_images(
    config: &Configuration,
    codec: Codec,
    force: bool,
    events: Option<Sender<FileResult>>,
) -> Result<Report, ProcessError> {
    let backend = RustBackend::new();
    if force {
        resize_with_backend(&backend, &AlwaysProcess, config, codec, events)
    } else {
        resize_with_backend(&backend, &MtimeFilter, config, codec, events)
    }
}

/// JPEG pipeline.
pub fn resize_jpeg(
    backend: &impl ImageBackend,
    filter: &impl ChangeFilter,
    config: &Configuration,
    events: Option<Sender<FileResult>>,
) -> Result<Report, ProcessError> {
    resize_with_backend(backend, filter, config, Codec::Jpeg, events)
}

/// WebP pipeline.
pub fn resize_webp(
    backend: &impl ImageBackend,
    filter: &impl ChangeFilter,
    config: &Configuration,
    events: Option<Sender<FileResult>>,
) -> Result<Report, ProcessError> {
    resize_with_backend(backend, filter, config, Codec::WebP, events)
}

/// AVIF pipeline.
pub fn resize_avif(
    backend: &impl ImageBackend,
    filter: &impl ChangeFilter,
    config: &Configuration,
    events: Option<Sender<FileResult>>,
) -> Result<Report, ProcessError> {
    resize_with_backend(backend, filter, config, Codec::Avif, events)
}

/// Run all three resize pipelines together and merge their reports.
///
/// Any setup error fails the whole call.
pub fn convert_all(
    backend: &impl ImageBackend,
    filter: &impl ChangeFilter,
    config: &Configuration,
    events: Option<Sender<FileResult>>,
) -> Result<Report, ProcessError> {
    config.validate_versions()?;
    let reports = Codec::ALL
        .par_iter()
        .map(|&codec| resize_with_backend(backend, filter, config, codec, events.clone()))
        .collect::<Result<Vec<Report>, ProcessError>>()?;

    let mut merged = Report::default();
    for report in reports {
        merged.merge(report);
    }
    Ok(merged)
}

/// Process images using a specific backend and change filter
/// (allows testing with mocks).
pub fn resize_with_backend(
    backend: &impl ImageBackend,
    filter: &impl ChangeFilter,
    config: &Configuration,
    codec: Codec,
    events: Option<Sender<FileResult>>,
) -> Result<Report, ProcessError> {
    config.validate_versions()?;
    let files = prepare(config, &config.source_ext)?;
    info!(
        codec = %codec,
        versions = config.versions.len(),
        files = files.len(),
        source = %config.source.display(),
        "starting resize jobs"
    );

    let files = &files;
    let events = &events;
    let results: Vec<FileResult> = config
        .versions
        .par_iter()
        .flat_map(move |version| {
            files.par_iter().map(move |source| {
                let result = process_file(backend, filter, config, version, codec, source);
                emit(events, &result);
                result
            })
        })
        .collect();

    let report = Report { results };
    info!(codec = %codec, summary = %report, "resize jobs finished");
    Ok(report)
}

/// One file through one version job.
fn process_file(
    backend: &impl ImageBackend,
    filter: &impl ChangeFilter,
    config: &Configuration,
    version: &VersionSpec,
    codec: Codec,
    source: &SourceFile,
) -> FileResult {
    let extension = naming::version_extension(&version.suffix, codec);
    let destination = destination_path(&config.dest, &source.relative, &extension);
    let result = |status| FileResult {
        pipeline: Pipeline::from(codec),
        version: Some(version.suffix.clone()),
        source: source.relative.clone(),
        output: naming::rename(&source.relative, &extension),
        status,
    };
    let fail = |reason: String| {
        error!(source = %source.relative.display(), codec = %codec, suffix = %version.suffix, "{reason}");
        result(FileStatus::Failed(reason))
    };

    match filter.needs_processing(&source.path, &destination) {
        Ok(true) => {}
        Ok(false) => {
            debug!(output = %destination.display(), "up to date, skipping");
            return result(FileStatus::Skipped);
        }
        Err(e) => return fail(format!("change check failed: {e}")),
    }

    let mut file = match ImageFile::read(&config.source, &source.relative) {
        Ok(file) => file,
        Err(e) => return fail(format!("read failed: {e}")),
    };
    let input_len = file.contents.len();

    let status = match codec {
        Codec::Avif => match encode_avif(backend, &mut file, version, config) {
            Ok(()) => FileStatus::Written,
            Err(reason) => {
                warn!(
                    source = %source.relative.display(),
                    suffix = %version.suffix,
                    "{reason}; writing original bytes"
                );
                FileStatus::Degraded(reason)
            }
        },
        Codec::Jpeg | Codec::WebP => {
            let params = TranscodeParams {
                target: ResizeTarget::Percent(version.percent),
                codec,
                quality: version.quality_for(codec),
                filter: config.processing.filter,
                avif_speed: config.processing.avif_speed,
            };
            match backend.transcode(&file.contents, &params) {
                Ok(bytes) => {
                    file.contents = bytes;
                    FileStatus::Written
                }
                Err(e) => return fail(e.to_string()),
            }
        }
    };

    file.rename(&extension);
    let output_len = file.contents.len();
    match file.write(&config.dest) {
        Ok(path) => {
            info!(
                output = %path.display(),
                input_bytes = input_len,
                output_bytes = output_len,
                "wrote"
            );
            result(status)
        }
        Err(e) => fail(format!("write failed: {e}")),
    }
}

/// AVIF step: metadata → absolute width → encode.
///
/// On error the file is left untouched and the reason is returned.
fn encode_avif(
    backend: &impl ImageBackend,
    file: &mut ImageFile,
    version: &VersionSpec,
    config: &Configuration,
) -> Result<(), String> {
    let meta = backend
        .identify(&file.contents)
        .map_err(|e| format!("metadata read failed: {e}"))?;
    let width = width_for_percent(meta.dimensions.width, version.percent);
    let params = TranscodeParams {
        target: ResizeTarget::Width(width),
        codec: Codec::Avif,
        quality: version.quality_for(Codec::Avif),
        filter: config.processing.filter,
        avif_speed: config.processing.avif_speed,
    };
    file.contents = backend
        .transcode(&file.contents, &params)
        .map_err(|e| format!("AVIF encode failed: {e}"))?;
    Ok(())
}

/// Generate placeholders using [`RustBackend`]. `force` bypasses change
/// detection.
pub fn generate_placeholders(
    config: &Configuration,
    force: bool,
    events: Option<Sender<FileResult>>,
) -> Result<Report, ProcessError> {
    let backend = RustBackend::new();
    if force {
        placeholders_with_backend(&backend, &AlwaysProcess, config, events)
    } else {
        placeholders_with_backend(&backend, &MtimeFilter, config, events)
    }
}

/// Generate one LQIP per PNG source, mirroring the source layout under `dest`.
///
/// Any failing file fails the whole job; files already written stay (and are
/// indexed when an index is configured).
pub fn placeholders_with_backend(
    backend: &impl ImageBackend,
    filter: &impl ChangeFilter,
    config: &Configuration,
    events: Option<Sender<FileResult>>,
) -> Result<Report, ProcessError> {
    let files = prepare(config, PLACEHOLDER_SOURCE_EXT)?;
    let extension = naming::placeholder_extension(config.format);
    let params = PlaceholderParams {
        format: config.format,
        size: config.placeholder.size,
        quality: Quality::from_fraction_rounded(config.placeholder.quality),
        blur: config.placeholder.blur,
    };
    info!(
        format = config.format.extension(),
        files = files.len(),
        source = %config.source.display(),
        "starting placeholder job"
    );

    // Every file runs even after a failure so the index covers whatever was
    // written; the first error is returned afterwards.
    let outcomes: Vec<Result<(FileResult, Option<IndexEntry>), ProcessError>> = files
        .par_iter()
        .map(|source| {
            let outcome = placeholder_file(backend, filter, config, &params, &extension, source);
            match &outcome {
                Ok((result, _)) => emit(&events, result),
                Err(e) => error!(source = %source.relative.display(), "{e}"),
            }
            outcome
        })
        .collect();

    let mut results = Vec::with_capacity(outcomes.len());
    let mut written = Vec::new();
    let mut first_error = None;
    for outcome in outcomes {
        match outcome {
            Ok((result, entry)) => {
                if let Some(entry) = entry {
                    written.push((result.output.clone(), entry));
                }
                results.push(result);
            }
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }

    if let Some(name) = &config.placeholder.index {
        let outputs: Vec<PathBuf> = files
            .iter()
            .map(|f| naming::rename(&f.relative, &extension))
            .collect();
        update_index(backend, config, name, &outputs, &results, written)?;
    }
    if let Some(e) = first_error {
        return Err(e);
    }

    let report = Report { results };
    info!(summary = %report, "placeholder job finished");
    Ok(report)
}

/// Bring the placeholder index in line with the destination tree.
///
/// Written files replace their entry. Skipped files without an entry get one
/// built from the placeholder on disk. Entries for outputs no longer produced
/// by any source are dropped.
fn update_index(
    backend: &impl ImageBackend,
    config: &Configuration,
    name: &str,
    outputs: &[PathBuf],
    results: &[FileResult],
    written: Vec<(PathBuf, IndexEntry)>,
) -> io::Result<()> {
    let mut index = PlaceholderIndex::load(&config.dest, name);
    for (output, entry) in written {
        index.insert(&output, entry);
    }
    for result in results.iter().filter(|r| r.status == FileStatus::Skipped) {
        if index.get(&result.output).is_some() {
            continue;
        }
        match entry_from_disk(backend, config, result) {
            Ok(entry) => index.insert(&result.output, entry),
            Err(e) => warn!(
                output = %result.output.display(),
                "cannot index existing placeholder: {e}"
            ),
        }
    }
    index.retain_outputs(outputs);
    index.save(&config.dest, name)
}

/// Index entry for a placeholder that is already on disk.
fn entry_from_disk(
    backend: &impl ImageBackend,
    config: &Configuration,
    result: &FileResult,
) -> Result<IndexEntry, BackendError> {
    let content = std::fs::read(config.dest.join(&result.output))?;
    let source = std::fs::read(config.source.join(&result.source))?;
    let placeholder = Placeholder {
        dimensions: backend.identify(&content)?.dimensions,
        original: backend.identify(&source)?.dimensions,
        content,
    };
    Ok(IndexEntry::new(&placeholder, config.format))
}

fn placeholder_file(
    backend: &impl ImageBackend,
    filter: &impl ChangeFilter,
    config: &Configuration,
    params: &PlaceholderParams,
    extension: &str,
    source: &SourceFile,
) -> Result<(FileResult, Option<IndexEntry>), ProcessError> {
    let destination = destination_path(&config.dest, &source.relative, extension);
    let result = |status| FileResult {
        pipeline: Pipeline::Placeholder,
        version: None,
        source: source.relative.clone(),
        output: naming::rename(&source.relative, extension),
        status,
    };

    if !filter.needs_processing(&source.path, &destination)? {
        debug!(output = %destination.display(), "up to date, skipping");
        return Ok((result(FileStatus::Skipped), None));
    }

    let mut file = ImageFile::read(&config.source, &source.relative)?;
    let lqip = backend
        .placeholder(&file.contents, params)
        .map_err(|source_err| ProcessError::Placeholder {
            path: source.relative.clone(),
            source: source_err,
        })?;
    let entry = IndexEntry::new(&lqip, params.format);
    file.contents = lqip.content;
    file.rename(extension);
    let path = file.write(&config.dest)?;
    info!(output = %path.display(), "wrote placeholder");
    Ok((result(FileStatus::Written), Some(entry)))
}
