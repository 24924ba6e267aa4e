//! High-level API for transplanter operations
//!
//! Every operation works on whole files: load a package, extract or splice
//! movie payloads, and write the result back through
//! [`persistence::commit`](crate::pcc::persistence::commit).

use log::{debug, error, info, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

use crate::config::TransplantConfig;
use crate::exceptions::{PathContext, Result, TransplantError};
use crate::pcc::Package;
use crate::pcc::payload::{self, is_payload_bearing, payload_exports};
use crate::pcc::persistence::{CommitOutcome, commit};
use crate::utils::{file_stem, find_files, relative_parent, relative_path, same_file};

/// Best-effort progress update: `scanned` of `total` exports in `file`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub file: PathBuf,
    pub scanned: usize,
    pub total: usize,
}

/// Per-file result of a folder operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum FileStatus {
    Extracted(usize),
    Replaced(usize),
    NoMatches,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub output: PathBuf,
    #[serde(flatten)]
    pub status: FileStatus,
}

impl FileReport {
    pub fn is_failure(&self) -> bool {
        matches!(self.status, FileStatus::Failed(_))
    }
}

/// How a payload file name is compared with an export's qualified name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NameMatch {
    /// Exact, every matching export
    All,
    /// Case-insensitive, first matching export only
    FirstIgnoreCase,
}

/// Movie extraction and replacement driven by one configuration
#[derive(Debug, Clone, Default)]
pub struct Transplanter {
    config: TransplantConfig,
    progress: Option<Sender<Progress>>,
}

impl Transplanter {
    pub fn new(config: TransplantConfig) -> Self {
        Transplanter {
            config,
            progress: None,
        }
    }

    /// Send progress updates to `sender`; a disconnected receiver is ignored
    pub fn with_progress(mut self, sender: Sender<Progress>) -> Self {
        self.progress = Some(sender);
        self
    }

    pub fn config(&self) -> &TransplantConfig {
        &self.config
    }

    fn report(&self, file: &Path, scanned: usize, total: usize) {
        if let Some(sender) = &self.progress {
            let _ = sender.send(Progress {
                file: file.to_path_buf(),
                scanned,
                total,
            });
        }
    }

    /// Write every movie in `package_path` to `<out_dir>/<qualified name>.<ext>`.
    /// `out_dir` defaults to the package's directory.
    pub fn extract_movies(&self, package_path: &Path, out_dir: Option<&Path>) -> Result<Vec<PathBuf>> {
        let package = Package::load(package_path)?;
        let out_dir = match out_dir {
            Some(dir) => dir.to_path_buf(),
            None => package_path.parent().map(Path::to_path_buf).unwrap_or_default(),
        };

        let movies = payload_exports(&package, &self.config.marker_class, None);
        let mut written = Vec::with_capacity(movies.len());
        for (n, &index) in movies.iter().enumerate() {
            let export = &package.exports()[index];
            let target = out_dir.join(format!(
                "{}.{}",
                package.qualified_name(export),
                self.config.payload_extension
            ));
            let movie = payload::extract(export.data())?;

            fs::create_dir_all(&out_dir).with_path(&out_dir)?;
            fs::write(&target, &movie).with_path(&target)?;
            debug!("Extracted {} bytes to {:?}", movie.len(), target);
            written.push(target);
            self.report(package_path, n + 1, movies.len());
        }

        info!("Extracted {} movies from {:?}", written.len(), package_path);
        Ok(written)
    }

    /// Extract every package under `root` into
    /// `<out_root or root>/<relative parent>/<package stem>/`
    pub fn extract_movies_from_folder(&self, root: &Path, out_root: Option<&Path>) -> Result<Vec<FileReport>> {
        let files = find_files(root, &self.config.package_extension)?;
        let base = out_root.unwrap_or(root);
        let jobs: Vec<(PathBuf, PathBuf)> = files
            .into_iter()
            .map(|file| {
                let out_dir = base.join(relative_parent(root, &file)).join(file_stem(&file));
                (file, out_dir)
            })
            .collect();

        self.run_batch(&jobs, |file, out_dir| {
            self.extract_movies(file, Some(out_dir))
                .map(|written| FileStatus::Extracted(written.len()))
        })
    }

    /// Replace the single movie named `target` (default: the payload file's
    /// stem) in `destination` with the contents of `payload_file`.
    /// Names are compared case-insensitively and only the first match is used.
    pub fn replace_single(
        &self,
        payload_file: &Path,
        destination: &Path,
        target: Option<&str>,
    ) -> Result<CommitOutcome> {
        let name = target
            .map(str::to_string)
            .unwrap_or_else(|| file_stem(payload_file));
        let mut candidates = BTreeMap::new();
        candidates.insert(name, payload_file.to_path_buf());
        self.replace_into(destination, destination, &candidates, NameMatch::FirstIgnoreCase)
    }

    /// Replace every movie in `destination` that has a same-named payload file
    /// directly inside `payload_dir`
    pub fn replace_from_directory(&self, payload_dir: &Path, destination: &Path) -> Result<CommitOutcome> {
        let candidates = self.candidates(payload_dir)?;
        self.replace_into(destination, destination, &candidates, NameMatch::All)
    }

    /// Copy every movie of `source` into the same-named exports of `destination`
    pub fn transplant(&self, source: &Path, destination: &Path) -> Result<CommitOutcome> {
        if same_file(source, destination) {
            return Err(TransplantError::SameSourceAndDestination(
                destination.to_path_buf(),
            ));
        }

        let staging = tempfile::TempDir::new()?;
        let extracted = self.extract_movies(source, Some(staging.path()))?;
        info!(
            "Transplanting {} movies from {:?} into {:?}",
            extracted.len(),
            source,
            destination
        );
        self.replace_from_directory(staging.path(), destination)
    }

    /// Replace movies in every package under `root`.
    ///
    /// Payload files for `<root>/<dir>/<name>.pcc` are taken from
    /// `<payload_root>/<dir>/<name>/`. Results go to `<out_root>/<dir>/<name>.pcc`,
    /// or back over the input when `out_root` is `None`.
    pub fn replace_folder(
        &self,
        root: &Path,
        payload_root: &Path,
        out_root: Option<&Path>,
    ) -> Result<Vec<FileReport>> {
        let files = find_files(root, &self.config.package_extension)?;
        let mut seen = HashSet::new();
        let mut jobs = Vec::with_capacity(files.len());
        for file in files {
            let dest = match out_root {
                Some(out) => out.join(relative_path(root, &file)),
                None => file.clone(),
            };
            if !seen.insert(dest.clone()) {
                return Err(TransplantError::Generic(format!(
                    "Two packages would be written to {}",
                    dest.display()
                )));
            }
            jobs.push((file, dest));
        }

        self.run_batch(&jobs, |file, dest| {
            let payload_dir = payload_root
                .join(relative_parent(root, file))
                .join(file_stem(file));
            if !payload_dir.is_dir() {
                debug!("No payload folder {:?} for {:?}", payload_dir, file);
                return Ok(FileStatus::NoMatches);
            }
            let candidates = self.candidates(&payload_dir)?;
            match self.replace_into(file, dest, &candidates, NameMatch::All)? {
                CommitOutcome::NoMatches => Ok(FileStatus::NoMatches),
                CommitOutcome::Committed { replaced, .. } => Ok(FileStatus::Replaced(replaced)),
            }
        })
    }

    /// Run `job` for every (input, output) pair on a pool of `workers` threads.
    /// A failing job becomes a `Failed` report; the batch always completes.
    fn run_batch<F>(&self, jobs: &[(PathBuf, PathBuf)], job: F) -> Result<Vec<FileReport>>
    where
        F: Fn(&Path, &Path) -> Result<FileStatus> + Sync,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers.max(1))
            .build()
            .map_err(|e| TransplantError::Generic(format!("Failed to start worker pool: {e}")))?;

        let total = jobs.len();
        let reports = pool.install(|| {
            jobs.par_iter()
                .enumerate()
                .map(|(i, (input, output))| {
                    info!("[{}/{}] Processing {:?}", i + 1, total, input);
                    let status = match job(input, output) {
                        Ok(status) => status,
                        Err(e) => {
                            error!("Failed on {:?}: {}", input, e);
                            FileStatus::Failed(e.to_string())
                        }
                    };
                    FileReport {
                        path: input.clone(),
                        output: output.clone(),
                        status,
                    }
                })
                .collect::<Vec<_>>()
        });

        let failed = reports.iter().filter(|r| r.is_failure()).count();
        if failed > 0 {
            warn!("{failed} of {total} packages failed");
        }
        Ok(reports)
    }

    /// Payload files directly inside `dir`, keyed by file stem
    fn candidates(&self, dir: &Path) -> Result<BTreeMap<String, PathBuf>> {
        let ext = self.config.payload_extension.as_str();
        let mut candidates = BTreeMap::new();
        for entry in fs::read_dir(dir).with_path(dir)? {
            let path = entry.with_path(dir)?.path();
            let matches_ext = path
                .extension()
                .is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case(ext));
            if path.is_file() && matches_ext {
                debug!("Payload candidate: {:?}", path);
                candidates.insert(file_stem(&path), path);
            }
        }
        Ok(candidates)
    }

    /// Load `source`, splice matching candidates, and commit to `destination`
    fn replace_into(
        &self,
        source: &Path,
        destination: &Path,
        candidates: &BTreeMap<String, PathBuf>,
        mode: NameMatch,
    ) -> Result<CommitOutcome> {
        if candidates.is_empty() {
            info!("No payload files for {:?}", destination);
            return Ok(CommitOutcome::NoMatches);
        }

        let mut package = Package::load(source)?;
        let total = package.exports().len();
        let mut replaced = 0;

        for index in 0..total {
            let export = &package.exports()[index];
            if is_payload_bearing(&package, export, &self.config.marker_class) {
                let name = package.qualified_name(export);
                let found = match mode {
                    NameMatch::All => candidates.get(&name),
                    NameMatch::FirstIgnoreCase => candidates
                        .iter()
                        .find(|(key, _)| key.eq_ignore_ascii_case(&name))
                        .map(|(_, path)| path),
                };
                if let Some(payload_path) = found {
                    let movie = fs::read(payload_path).with_path(payload_path)?;
                    let data = payload::splice(package.exports()[index].data(), &movie)?;
                    info!("#{} Replacing {} ({} bytes)", index + 1, name, movie.len());
                    package.replace_export_data(index, data)?;
                    replaced += 1;
                }
            }
            self.report(source, index + 1, total);

            if replaced > 0 && mode == NameMatch::FirstIgnoreCase {
                break;
            }
        }

        if replaced == 0 {
            info!("No movie in {:?} matched the payload files", source);
        }
        commit(&package, destination, &self.config.backup_suffix)
    }
}
