//! Batch runner: scan the source directory, plan every file, transfer and report.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::{self, File, FileTimes, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;
use indicatif::ProgressBar;
#[cfg(not(test))]
use indicatif::ProgressStyle;
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::error::{OrganizeError, Result};
use crate::organize::config::{OrganizeConfig, TransferMode};
use crate::organize::context::ContextSource;
use crate::organize::logger::RunLogger;
use crate::organize::parser::{KeywordSet, NameParser};
use crate::organize::path_builder::{self, Placement};
use crate::organize::report::{FileOutcome, RunReport};
use crate::organize::types::{Classification, GroupContext, ViewCategory};

#[cfg(not(test))]
const PROGRESS_BAR_CHARS: &str = "=> ";
#[cfg(not(test))]
const PROGRESS_BAR_TEMPLATE: &str = "[{elapsed_precise}] {bar:80.cyan/blue} {pos}/{len} {percent}%";

/// Extensions that are expected to end up in the video folder.
const VIDEO_EXTENSIONS: &[&str] = &["avi", "m4v", "mkv", "mov", "mp4", "mpg", "webm", "wmv"];

/// Sorts experiment files into the `Group/Timepoint/View` tree.
#[derive(Debug)]
pub struct Organizer {
    root: PathBuf,
    config: OrganizeConfig,
    parser: NameParser,
    context: ContextSource,
}

/// A source file with its classification and group context.
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub source: PathBuf,
    pub classification: Classification,
    pub context: GroupContext,
}

/// What will happen to one source file.
#[derive(Debug)]
pub enum Action {
    Transfer(PathBuf),
    Skip {
        destination: Option<PathBuf>,
        reason: String,
    },
    Fail {
        destination: Option<PathBuf>,
        error: OrganizeError,
    },
}

#[derive(Debug)]
pub struct PlannedFile {
    pub source: PathBuf,
    pub action: Action,
}

impl Organizer {
    /// Validate the configuration and create an organizer for the given source path.
    ///
    /// # Errors
    /// Returns a configuration error if keywords, delimiters, group names or the target are invalid.
    pub fn new(root: PathBuf, config: OrganizeConfig) -> Result<Self> {
        let keywords = KeywordSet::new(&config.side_keyword, &config.ventral_keyword, config.case_sensitive)?;
        let parser = NameParser::new(keywords, &config.delimiters, config.regex_delimiters)?;
        let context = ContextSource::new(&config.context, &config.default_group, config.regex_delimiters)?;
        Self::check_target_root(&config.target_root)?;
        Ok(Self {
            root,
            config,
            parser,
            context,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &OrganizeConfig {
        &self.config
    }

    /// Scan, organize and report.
    ///
    /// # Errors
    /// Returns an error on configuration errors, or if the log or report file cannot be written.
    /// Per-file failures are part of the returned report.
    pub fn run(&self) -> anyhow::Result<RunReport> {
        if self.config.debug {
            println!("Root: {}", self.root.display());
            print!("{}", self.config);
        }

        let files = self.collect_source_files();
        if files.is_empty() {
            println!("No matching files found in {}", self.root.display());
            return Ok(RunReport::new(self.config.dryrun));
        }

        crate::print_bold!(
            "{} {} file(s) into {}",
            if self.config.dryrun { "Planning" } else { "Organizing" },
            files.len(),
            self.config.target_root.display()
        );

        let mut logger = if self.config.log {
            let logger = RunLogger::new()?;
            if self.config.verbose {
                println!("Logging to {}", logger.path().display());
            }
            Some(logger)
        } else {
            None
        };
        if let Some(logger) = logger.as_mut() {
            logger.log_init(&self.root, &self.config, files.len());
        }

        let abort_flag = Arc::new(AtomicBool::new(false));
        let abort_flag_handler = Arc::clone(&abort_flag);
        if let Err(error) = ctrlc::set_handler(move || {
            if abort_flag_handler.load(Ordering::SeqCst) {
                // Second Ctrl+C - force exit
                std::process::exit(130);
            }
            println!("\n{}", "Received Ctrl+C, finishing current file...".yellow().bold());
            abort_flag_handler.store(true, Ordering::SeqCst);
        }) && self.config.debug
        {
            eprintln!("Could not set Ctrl+C handler: {error}");
        }

        let report = self.organize_with(&files, &abort_flag, logger.as_mut())?;

        if let Some(logger) = logger.as_mut() {
            logger.log_summary(&report);
        }
        report.print_summary(&self.root, self.config.verbose);
        if let Some(path) = &self.config.report_path {
            report.write_json(path)?;
            if self.config.verbose {
                println!("Report written to {}", path.display());
            }
        }
        Ok(report)
    }

    /// Organize the given source files.
    ///
    /// # Errors
    /// Returns a configuration error, before any file is touched,
    /// if a file name matches both keywords.
    pub fn organize(&self, files: &[PathBuf]) -> Result<RunReport> {
        let abort_flag = AtomicBool::new(false);
        self.organize_with(files, &abort_flag, None)
    }

    /// Organize the given source files, stopping after the current file once `abort_flag` is set.
    ///
    /// # Errors
    /// Same as [`Organizer::organize`].
    pub fn organize_with(
        &self,
        files: &[PathBuf],
        abort_flag: &AtomicBool,
        mut logger: Option<&mut RunLogger>,
    ) -> Result<RunReport> {
        let plan = self.plan(files)?;
        let mut report = RunReport::new(self.config.dryrun);

        let transfer_count = plan
            .iter()
            .filter(|planned| matches!(planned.action, Action::Transfer(_)))
            .count();
        let progress_bar = self.create_progress_bar(transfer_count as u64);

        for planned in plan {
            if abort_flag.load(Ordering::SeqCst) {
                report.aborted = true;
                break;
            }
            let is_transfer = matches!(planned.action, Action::Transfer(_));
            let outcome = self.execute(planned);
            if is_transfer {
                progress_bar.inc(1);
            }
            if let Some(logger) = logger.as_deref_mut() {
                logger.log_outcome(&outcome);
            }
            report.record(outcome);
        }

        progress_bar.finish_and_clear();
        Ok(report)
    }

    /// Decide the action for every source file without touching the file system.
    ///
    /// Classification runs in parallel, destinations are assigned sequentially in source order
    /// so that collisions within the batch are resolved deterministically.
    ///
    /// # Errors
    /// Returns the first configuration error in source order.
    pub fn plan(&self, files: &[PathBuf]) -> Result<Vec<PlannedFile>> {
        let context_root = self.context_root();
        let mut sources: Vec<&PathBuf> = files.iter().collect();
        sources.sort();
        sources.dedup();

        let results: Vec<(&PathBuf, Result<ParsedFile>)> = sources
            .into_par_iter()
            .map(|source| (source, self.parse_file(&context_root, source)))
            .collect();

        let mut plan = Vec::with_capacity(results.len());
        let mut parsed_files = Vec::with_capacity(results.len());
        for (source, result) in results {
            match result {
                Ok(parsed) => parsed_files.push(parsed),
                Err(error) if error.is_fatal() => return Err(error),
                Err(error) => plan.push(PlannedFile {
                    source: source.clone(),
                    action: Action::Fail {
                        destination: None,
                        error,
                    },
                }),
            }
        }

        if self.config.verbose {
            self.warn_about_fallback_videos(&parsed_files);
        }
        let incomplete = self.incomplete_entities(&parsed_files);

        let mut claimed: HashSet<PathBuf> = HashSet::new();
        for parsed in parsed_files {
            let key = (parsed.context.clone(), parsed.classification.entity_name().to_string());
            let destination =
                path_builder::destination_path(&parsed.classification, &parsed.context, &self.config.target_root);

            let action = if let Some(reason) = incomplete.get(&key) {
                Action::Skip {
                    destination: Some(destination),
                    reason: reason.clone(),
                }
            } else if !claimed.insert(destination.clone()) {
                Action::Fail {
                    destination: Some(destination.clone()),
                    error: OrganizeError::AlreadyExists(destination),
                }
            } else {
                match path_builder::place(
                    &parsed.source,
                    &parsed.classification,
                    &parsed.context,
                    &self.config.target_root,
                ) {
                    Ok(Placement::New(destination)) => Action::Transfer(destination),
                    Ok(Placement::AlreadyInPlace(destination)) => Action::Skip {
                        destination: Some(destination),
                        reason: "already organized".to_string(),
                    },
                    Err(error) => Action::Fail {
                        destination: Some(destination),
                        error,
                    },
                }
            };
            plan.push(PlannedFile {
                source: parsed.source,
                action,
            });
        }

        plan.sort_by(|a, b| a.source.cmp(&b.source));
        Ok(plan)
    }

    /// Collect candidate files from the source path.
    ///
    /// Hidden entries and the target directory are skipped.
    #[must_use]
    pub fn collect_source_files(&self) -> Vec<PathBuf> {
        if self.root.is_file() {
            return if self.is_candidate(&self.root) {
                vec![self.root.clone()]
            } else {
                Vec::new()
            };
        }

        let max_depth = if self.config.recurse { 100 } else { 1 };
        let target_root = self.config.target_root.as_path();
        let canonical_target = dunce::canonicalize(target_root).ok();

        let mut files: Vec<PathBuf> = WalkDir::new(&self.root)
            .max_depth(max_depth)
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || (!crate::is_hidden(entry)
                        && entry.path() != target_root
                        && canonical_target.as_deref().is_none_or(|target| entry.path() != target))
            })
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(walkdir::DirEntry::into_path)
            .filter(|path| !self.is_organized_output(path, canonical_target.as_deref()))
            .filter(|path| self.is_candidate(path))
            .collect();

        files.sort();
        files
    }

    /// True for files already placed in the output tree: `<target>/<group>/<timepoint>/<view>/<file>`.
    /// Matters when the target is the source directory itself.
    fn is_organized_output(&self, path: &Path, canonical_target: Option<&Path>) -> bool {
        [Some(self.config.target_root.as_path()), canonical_target]
            .into_iter()
            .flatten()
            .any(|target| {
                path.strip_prefix(target).is_ok_and(|relative| {
                    let components: Vec<_> = relative.components().collect();
                    components.len() == 4
                        && ViewCategory::ALL
                            .iter()
                            .any(|view| components[2].as_os_str() == view.folder_name())
                })
            })
    }

    /// Check extension and include / exclude filters.
    fn is_candidate(&self, path: &Path) -> bool {
        let extension = crate::path_to_file_extension_string(path);
        if !self.config.extensions.contains(&extension) {
            return false;
        }
        let file_name = crate::path_to_filename_string(path).to_lowercase();
        if !self.config.include.is_empty()
            && !self
                .config
                .include
                .iter()
                .any(|pattern| file_name.contains(&pattern.to_lowercase()))
        {
            return false;
        }
        !self
            .config
            .exclude
            .iter()
            .any(|pattern| file_name.contains(&pattern.to_lowercase()))
    }

    fn parse_file(&self, context_root: &Path, source: &Path) -> Result<ParsedFile> {
        let classification = self.parser.classify_path(source)?;
        let context = self.context.resolve(context_root, source)?;
        Ok(ParsedFile {
            source: source.to_path_buf(),
            classification,
            context,
        })
    }

    /// Folder context is relative to the source directory.
    /// A single input file uses its absolute path instead.
    fn context_root(&self) -> PathBuf {
        if self.root.is_file() {
            PathBuf::new()
        } else {
            self.root.clone()
        }
    }

    /// Files matching neither keyword end up in the video folder.
    /// Flag those that do not look like videos.
    fn warn_about_fallback_videos(&self, parsed_files: &[ParsedFile]) {
        for parsed in parsed_files {
            if parsed.classification.view_category() == ViewCategory::Video
                && !VIDEO_EXTENSIONS.contains(&parsed.classification.extension())
            {
                crate::print_warning!(
                    "{} matches neither '{}' nor '{}', placing it in the {} folder",
                    crate::get_relative_path_or_filename(&parsed.source, &self.root),
                    self.config.side_keyword,
                    self.config.ventral_keyword,
                    ViewCategory::Video.folder_name()
                );
            }
        }
    }

    /// Find entities missing a side, ventral or video file.
    ///
    /// Missing counterparts of a side file are reported in verbose mode
    /// or when ventral or video data is required.
    /// Returns the entities to skip with the reason.
    fn incomplete_entities(&self, parsed_files: &[ParsedFile]) -> HashMap<(GroupContext, String), String> {
        let mut views: BTreeMap<(GroupContext, String), HashSet<ViewCategory>> = BTreeMap::new();
        for parsed in parsed_files {
            views
                .entry((parsed.context.clone(), parsed.classification.entity_name().to_string()))
                .or_default()
                .insert(parsed.classification.view_category());
        }

        let require_any = self.config.require_ventral || self.config.require_video;
        let mut incomplete = HashMap::new();
        for ((context, entity), categories) in views {
            let has_side = categories.contains(&ViewCategory::Side);
            let missing_ventral = !categories.contains(&ViewCategory::Ventral);
            let missing_video = !categories.contains(&ViewCategory::Video);

            if has_side && (self.config.verbose || require_any) {
                if missing_ventral {
                    crate::print_warning!("No corresponding ventral view for {context}/{entity}");
                }
                if missing_video {
                    crate::print_warning!("No corresponding video for {context}/{entity}");
                }
            }

            if !require_any {
                continue;
            }
            let reason = if !has_side {
                Some("no side view for this entity")
            } else if self.config.require_ventral && missing_ventral {
                Some("no corresponding ventral view")
            } else if self.config.require_video && missing_video {
                Some("no corresponding video")
            } else {
                None
            };
            if let Some(reason) = reason {
                incomplete.insert((context, entity), reason.to_string());
            }
        }
        incomplete
    }

    fn execute(&self, planned: PlannedFile) -> FileOutcome {
        let PlannedFile { source, action } = planned;
        match action {
            Action::Transfer(destination) => {
                if self.config.dryrun {
                    self.print_transfer("Dryrun", &source, &destination);
                    return FileOutcome::planned(source, destination);
                }
                if self.config.verbose {
                    let verb = match self.config.mode {
                        TransferMode::Copy => "Copy",
                        TransferMode::Move => "Move",
                    };
                    self.print_transfer(verb, &source, &destination);
                }
                match self.transfer(&source, &destination) {
                    Ok(()) => FileOutcome::transferred(source, destination),
                    Err(error) => FileOutcome::failed(source, Some(destination), &error),
                }
            }
            Action::Skip { destination, reason } => FileOutcome::skipped(source, destination, reason),
            Action::Fail { destination, error } => FileOutcome::failed(source, destination, &error),
        }
    }

    fn print_transfer(&self, label: &str, source: &Path, destination: &Path) {
        println!(
            "{} {} {} {}",
            format!("{label}:").bold().cyan(),
            crate::get_relative_path_or_filename(source, &self.root),
            "→".green(),
            crate::get_relative_path_or_filename(destination, &self.config.target_root)
        );
    }

    fn transfer(&self, source: &Path, destination: &Path) -> Result<()> {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|e| OrganizeError::io(parent, e))?;
        }
        match self.config.mode {
            TransferMode::Copy => copy_new(source, destination),
            TransferMode::Move => move_new(source, destination),
        }
    }

    fn check_target_root(target_root: &Path) -> Result<()> {
        if target_root.as_os_str().is_empty() {
            return Err(OrganizeError::config("target directory is not set"));
        }
        for ancestor in target_root.ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            match fs::metadata(ancestor) {
                Ok(metadata) if metadata.is_dir() => return Ok(()),
                Ok(_) => {
                    return Err(OrganizeError::config(format!(
                        "target directory {} cannot be created: {} is a file",
                        target_root.display(),
                        ancestor.display()
                    )));
                }
                Err(error) if error.kind() == io::ErrorKind::NotFound => {}
                Err(error) => {
                    return Err(OrganizeError::config(format!(
                        "cannot access target directory {}: {error}",
                        target_root.display()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Create a progress bar that is hidden during tests, dry runs and verbose output.
    fn create_progress_bar(&self, len: u64) -> ProgressBar {
        #[cfg(test)]
        {
            let _ = (len, self.config.dryrun);
            ProgressBar::hidden()
        }
        #[cfg(not(test))]
        {
            if self.config.dryrun || self.config.verbose || len == 0 {
                return ProgressBar::hidden();
            }
            let progress_bar = ProgressBar::new(len);
            progress_bar.set_style(
                ProgressStyle::default_bar()
                    .template(PROGRESS_BAR_TEMPLATE)
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars(PROGRESS_BAR_CHARS),
            );
            progress_bar
        }
    }
}

/// Copy to a destination that must not exist yet, keeping permissions and timestamps.
/// A partially written destination is removed on failure.
fn copy_new(source: &Path, destination: &Path) -> Result<()> {
    let mut reader = File::open(source).map_err(|e| OrganizeError::io(source, e))?;
    let mut writer = match OpenOptions::new().write(true).create_new(true).open(destination) {
        Ok(file) => file,
        Err(error) if error.kind() == io::ErrorKind::AlreadyExists => {
            return Err(OrganizeError::AlreadyExists(destination.to_path_buf()));
        }
        Err(error) => return Err(OrganizeError::io(destination, error)),
    };

    let result = io::copy(&mut reader, &mut writer)
        .and_then(|_| reader.metadata())
        .and_then(|metadata| {
            let mut times = FileTimes::new().set_modified(metadata.modified()?);
            if let Ok(accessed) = metadata.accessed() {
                times = times.set_accessed(accessed);
            }
            writer.set_times(times)?;
            writer.sync_all()?;
            fs::set_permissions(destination, metadata.permissions())
        });

    if let Err(error) = result {
        drop(writer);
        let _ = fs::remove_file(destination);
        return Err(OrganizeError::io(destination, error));
    }
    Ok(())
}

/// Move to a destination that must not exist yet.
/// Falls back to copy and delete when the destination is on another file system.
fn move_new(source: &Path, destination: &Path) -> Result<()> {
    if fs::symlink_metadata(destination).is_ok() {
        return Err(OrganizeError::AlreadyExists(destination.to_path_buf()));
    }
    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::CrossesDevices => {
            copy_new(source, destination)?;
            fs::remove_file(source).map_err(|e| OrganizeError::io(source, e))
        }
        Err(error) => Err(OrganizeError::io(source, error)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::{TempDir, tempdir};

    use crate::organize::context::ContextMode;
    use crate::organize::parser::DelimiterPair;
    use crate::organize::report::OutcomeStatus;

    fn create_file(dir: &Path, relative: &str, content: &str) -> PathBuf {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().expect("has parent")).expect("create folders");
        fs::write(&path, content).expect("write file");
        path
    }

    fn fixed_config(target: &Path) -> OrganizeConfig {
        OrganizeConfig::new(
            "SDE",
            "VNT",
            DelimiterPair::new("_", "-"),
            ContextMode::Fixed {
                group: "G1".to_string(),
                timepoint: "T1".to_string(),
            },
            target,
        )
    }

    fn setup() -> (TempDir, PathBuf, PathBuf) {
        let dir = tempdir().expect("temp dir");
        let source = dir.path().join("source");
        let target = dir.path().join("target");
        fs::create_dir_all(&source).expect("create source");
        (dir, source, target)
    }

    #[test]
    fn organizes_concrete_scenario() {
        let (_dir, source, target) = setup();
        let file = create_file(&source, "M1_run1-SDE.csv", "frame,x,y\n");
        let organizer = Organizer::new(source, fixed_config(&target)).expect("valid config");

        let report = organizer.organize(&[file.clone()]).expect("should organize");

        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 0);
        let destination = target.join("G1").join("T1").join("Side view").join("run1.csv");
        assert!(destination.is_file());
        assert!(file.exists(), "copy mode keeps the source");
    }

    #[test]
    fn collision_within_batch_fails_second_file() {
        let (_dir, source, target) = setup();
        let first = create_file(&source, "A_run1-SDE.csv", "first");
        let second = create_file(&source, "B_run1-SDE.csv", "second");
        let organizer = Organizer::new(source, fixed_config(&target)).expect("valid config");

        let report = organizer.organize(&[second.clone(), first.clone()]).expect("should organize");

        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        let failure = report.failures().next().expect("one failure");
        assert_eq!(failure.source, second);
        assert_eq!(failure.error_kind, Some("already_exists"));
        let destination = target.join("G1").join("T1").join("Side view").join("run1.csv");
        assert_eq!(fs::read_to_string(destination).expect("read"), "first");
    }

    #[test]
    fn collision_within_batch_detected_in_dry_run() {
        let (_dir, source, target) = setup();
        let first = create_file(&source, "A_run1-SDE.csv", "first");
        let second = create_file(&source, "B_run1-SDE.csv", "second");
        let mut config = fixed_config(&target);
        config.dryrun = true;
        let organizer = Organizer::new(source, config).expect("valid config");

        let report = organizer.organize(&[first, second]).expect("should organize");

        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        assert!(!target.exists(), "dry run does not create anything");
    }

    #[test]
    fn existing_different_destination_is_not_overwritten() {
        let (_dir, source, target) = setup();
        let file = create_file(&source, "M1_run1-SDE.csv", "new");
        let existing = create_file(&target, "G1/T1/Side view/run1.csv", "old");
        let organizer = Organizer::new(source, fixed_config(&target)).expect("valid config");

        let report = organizer.organize(&[file]).expect("should organize");

        assert_eq!(report.failed, 1);
        assert_eq!(fs::read_to_string(existing).expect("read"), "old");
    }

    #[test]
    fn second_run_skips_everything() {
        let (_dir, source, target) = setup();
        let files = vec![
            create_file(&source, "M1_run1-SDE.csv", "side"),
            create_file(&source, "M1_run1-VNT.csv", "ventral"),
            create_file(&source, "M1_run1-cam.mp4", "video"),
        ];
        let organizer = Organizer::new(source, fixed_config(&target)).expect("valid config");

        let first = organizer.organize(&files).expect("should organize");
        assert_eq!(first.succeeded, 3);

        let second = organizer.organize(&files).expect("should organize");
        assert_eq!(second.succeeded, 0);
        assert_eq!(second.skipped, 3);
        assert_eq!(second.failed, 0);
    }

    #[test]
    fn ambiguous_name_aborts_before_any_transfer() {
        let (_dir, source, target) = setup();
        let good = create_file(&source, "A_run1-SDE.csv", "ok");
        let ambiguous = create_file(&source, "B_run2-SDE-VNT.csv", "both");
        let organizer = Organizer::new(source, fixed_config(&target)).expect("valid config");

        let result = organizer.organize(&[good, ambiguous]);

        assert!(matches!(result, Err(OrganizeError::Configuration(_))));
        assert!(!target.exists());
    }

    #[test]
    fn parse_errors_do_not_stop_the_run() {
        let (_dir, source, target) = setup();
        let bad = create_file(&source, "noDelimitersHere.csv", "x");
        let good = create_file(&source, "M1_run1-SDE.csv", "y");
        let organizer = Organizer::new(source, fixed_config(&target)).expect("valid config");

        let report = organizer.organize(&[bad.clone(), good]).expect("should organize");

        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        let failure = report.failures().next().expect("one failure");
        assert_eq!(failure.source, bad);
        assert_eq!(failure.error_kind, Some("parse"));
    }

    #[test]
    fn identical_keywords_rejected_on_creation() {
        let (_dir, source, target) = setup();
        let mut config = fixed_config(&target);
        config.ventral_keyword = "SDE".to_string();
        let result = Organizer::new(source, config);
        assert!(matches!(result, Err(OrganizeError::Configuration(_))));
    }

    #[test]
    fn target_below_a_file_rejected_on_creation() {
        let (dir, source, _) = setup();
        let blocker = create_file(dir.path(), "blocker", "x");
        let result = Organizer::new(source, fixed_config(&blocker.join("out")));
        assert!(matches!(result, Err(OrganizeError::Configuration(_))));
    }

    #[test]
    fn move_mode_removes_source() {
        let (_dir, source, target) = setup();
        let file = create_file(&source, "M1_run1-VNT.csv", "ventral");
        let mut config = fixed_config(&target);
        config.mode = TransferMode::Move;
        let organizer = Organizer::new(source, config).expect("valid config");

        let report = organizer.organize(&[file.clone()]).expect("should organize");

        assert_eq!(report.succeeded, 1);
        assert!(!file.exists());
        assert!(target.join("G1/T1/Ventral view/run1.csv").is_file());
    }

    #[test]
    fn abort_flag_stops_before_next_file() {
        let (_dir, source, target) = setup();
        let files = vec![
            create_file(&source, "M1_run1-SDE.csv", "a"),
            create_file(&source, "M1_run2-SDE.csv", "b"),
        ];
        let organizer = Organizer::new(source, fixed_config(&target)).expect("valid config");
        let abort_flag = AtomicBool::new(true);

        let report = organizer
            .organize_with(&files, &abort_flag, None)
            .expect("should organize");

        assert!(report.aborted);
        assert_eq!(report.total(), 0);
    }

    #[test]
    fn require_ventral_skips_incomplete_entities() {
        let (_dir, source, target) = setup();
        let files = vec![
            create_file(&source, "M1_run1-SDE.csv", "side"),
            create_file(&source, "M1_run1-VNT.csv", "ventral"),
            create_file(&source, "M1_run2-SDE.csv", "side only"),
            create_file(&source, "M1_run3-VNT.csv", "ventral only"),
        ];
        let mut config = fixed_config(&target);
        config.require_ventral = true;
        let organizer = Organizer::new(source, config).expect("valid config");

        let report = organizer.organize(&files).expect("should organize");

        assert_eq!(report.succeeded, 2);
        assert_eq!(report.skipped, 2);
        assert!(target.join("G1/T1/Side view/run1.csv").is_file());
        assert!(!target.join("G1/T1/Side view/run2.csv").exists());
        assert!(!target.join("G1/T1/Ventral view/run3.csv").exists());
    }

    #[test]
    fn require_video_skips_entities_without_video() {
        let (_dir, source, target) = setup();
        let files = vec![
            create_file(&source, "M1_run1-SDE.csv", "side"),
            create_file(&source, "M1_run1-cam.mp4", "video"),
            create_file(&source, "M1_run2-SDE.csv", "side"),
        ];
        let mut config = fixed_config(&target);
        config.require_video = true;
        let organizer = Organizer::new(source, config).expect("valid config");

        let report = organizer.organize(&files).expect("should organize");

        assert_eq!(report.succeeded, 2);
        assert_eq!(report.skipped, 1);
        let skipped = report.skips().next().expect("one skip");
        assert_eq!(skipped.reason.as_deref(), Some("no corresponding video"));
    }

    #[test]
    fn collect_source_files_filters_and_skips_target() {
        let (_dir, source, _) = setup();
        let target = source.join("organized");
        create_file(&source, "a/M1_run1-SDE.csv", "x");
        create_file(&source, "a/M1_run1-cam.MP4", "x");
        create_file(&source, "a/notes.txt", "x");
        create_file(&source, ".hidden/M1_run2-SDE.csv", "x");
        create_file(&source, "organized/G1/T1/Side view/run1.csv", "x");
        create_file(&source, "a/M1_run3-SDE_filtered.csv", "x");
        let mut config = fixed_config(&target);
        config.exclude = vec!["FILTERED".to_string()];
        let root = dunce::canonicalize(&source).expect("canonical");
        let organizer = Organizer::new(root.clone(), config).expect("valid config");

        let files = organizer.collect_source_files();

        assert_eq!(
            files,
            vec![root.join("a/M1_run1-SDE.csv"), root.join("a/M1_run1-cam.MP4")]
        );
    }

    #[test]
    fn collect_source_files_without_recurse() {
        let (_dir, source, target) = setup();
        create_file(&source, "M1_run1-SDE.csv", "x");
        create_file(&source, "sub/M1_run2-SDE.csv", "x");
        let mut config = fixed_config(&target);
        config.recurse = false;
        let organizer = Organizer::new(source.clone(), config).expect("valid config");

        let files = organizer.collect_source_files();

        assert_eq!(files, vec![source.join("M1_run1-SDE.csv")]);
    }

    #[test]
    fn folder_context_from_source_tree() {
        let (_dir, source, target) = setup();
        let file = create_file(&source, "Cohort1/Week2/M1_run1-SDE.csv", "x");
        let mut config = fixed_config(&target);
        config.context = ContextMode::Folders;
        let organizer = Organizer::new(source, config).expect("valid config");

        let plan = organizer.plan(&[file]).expect("should plan");

        assert_eq!(plan.len(), 1);
        match &plan[0].action {
            Action::Transfer(destination) => assert_eq!(
                destination,
                &target.join("Cohort1").join("Week2").join("Side view").join("run1.csv")
            ),
            other => panic!("expected transfer, got {other:?}"),
        }
    }

    #[test]
    fn plan_is_sorted_and_deduplicated() {
        let (_dir, source, target) = setup();
        let b = create_file(&source, "M1_run2-SDE.csv", "b");
        let a = create_file(&source, "M1_run1-SDE.csv", "a");
        let organizer = Organizer::new(source, fixed_config(&target)).expect("valid config");

        let plan = organizer.plan(&[b.clone(), a.clone(), b.clone()]).expect("should plan");

        let sources: Vec<&PathBuf> = plan.iter().map(|planned| &planned.source).collect();
        assert_eq!(sources, vec![&a, &b]);
    }

    #[test]
    fn dry_run_reports_planned() {
        let (_dir, source, target) = setup();
        let file = create_file(&source, "M1_run1-SDE.csv", "x");
        let mut config = fixed_config(&target);
        config.dryrun = true;
        let organizer = Organizer::new(source, config).expect("valid config");

        let report = organizer.organize(&[file]).expect("should organize");

        assert_eq!(report.outcomes[0].status, OutcomeStatus::Planned);
        assert!(report.dryrun);
        assert!(!target.exists());
    }

    #[test]
    fn copy_new_refuses_existing_destination() {
        let dir = tempdir().expect("temp dir");
        let source = create_file(dir.path(), "a.csv", "a");
        let destination = create_file(dir.path(), "b.csv", "b");

        let result = copy_new(&source, &destination);

        assert!(matches!(result, Err(OrganizeError::AlreadyExists(_))));
        assert_eq!(fs::read_to_string(destination).expect("read"), "b");
    }

    #[test]
    fn copy_new_keeps_modification_time() {
        let dir = tempdir().expect("temp dir");
        let source = create_file(dir.path(), "a.csv", "frame,x,y\n");
        let old_time = std::time::UNIX_EPOCH + std::time::Duration::from_secs(946_684_800);
        File::options()
            .write(true)
            .open(&source)
            .expect("open source")
            .set_times(FileTimes::new().set_modified(old_time))
            .expect("set source time");
        let destination = dir.path().join("b.csv");

        copy_new(&source, &destination).expect("should copy");

        let source_modified = fs::metadata(&source).expect("metadata").modified().expect("mtime");
        let destination_modified = fs::metadata(&destination).expect("metadata").modified().expect("mtime");
        assert_eq!(source_modified, old_time);
        assert_eq!(destination_modified, source_modified);
    }

    #[test]
    fn copy_new_removes_partial_destination_on_failure() {
        let dir = tempdir().expect("temp dir");
        let unreadable_source = dir.path().join("folder.csv");
        fs::create_dir_all(&unreadable_source).expect("create folder");
        let destination = dir.path().join("out.csv");

        let result = copy_new(&unreadable_source, &destination);

        assert!(matches!(result, Err(OrganizeError::Io { .. })));
        assert!(!destination.exists());
    }

    #[test]
    fn io_failure_only_affects_one_file() {
        let (_dir, source, target) = setup();
        let blocked = create_file(&source, "Cohort1/Week1/M1_run1-SDE.csv", "blocked");
        let free = create_file(&source, "Cohort2/Week1/M1_run2-SDE.csv", "free");
        create_file(&target, "Cohort1", "a file where the group folder should be");
        let mut config = fixed_config(&target);
        config.context = ContextMode::Folders;
        let organizer = Organizer::new(source, config).expect("valid config");

        let report = organizer.organize(&[blocked.clone(), free]).expect("should organize");

        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        let failure = report.failures().next().expect("one failure");
        assert_eq!(failure.source, blocked);
        assert_eq!(failure.error_kind, Some("io"));
        assert!(target.join("Cohort2/Week1/Side view/run2.csv").is_file());
    }

    #[test]
    fn target_same_as_source_rerun_skips_output() {
        let (_dir, source, _) = setup();
        let file = create_file(&source, "G1/T1/M1_run1-SDE.csv", "side");
        let mut config = fixed_config(&source);
        config.context = ContextMode::Folders;
        let organizer = Organizer::new(source.clone(), config).expect("valid config");

        let first = organizer
            .organize(&organizer.collect_source_files())
            .expect("should organize");
        let files = organizer.collect_source_files();
        let second = organizer.organize(&files).expect("should organize");

        assert_eq!(first.succeeded, 1);
        assert!(source.join("G1/T1/Side view/run1.csv").is_file());
        assert_eq!(files, vec![file]);
        assert_eq!(second.failed, 0);
        assert_eq!(second.skipped, 1);
    }

    #[test]
    fn move_new_refuses_existing_destination() {
        let dir = tempdir().expect("temp dir");
        let source = create_file(dir.path(), "a.csv", "a");
        let destination = create_file(dir.path(), "b.csv", "b");

        let result = move_new(&source, &destination);

        assert!(matches!(result, Err(OrganizeError::AlreadyExists(_))));
        assert!(source.exists());
    }
}
