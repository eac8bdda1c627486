//! Converting a file, or every video in a folder
//!
//! Each input gets its own [`Job`] and its own source and frames, and a failing
//! input is reported and skipped without stopping the rest of the folder.

use crate::encoder::{AnimationEncoder, EncodeOptions};
use crate::error::*;
use crate::progress::ProgressReporter;
use crate::sampler::{frame_budget, sample_frames};
use crate::source::SourceOpener;
use crate::SampleConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// Extensions (compared case-insensitively) picked up from folders
pub const VIDEO_EXTENSIONS: [&str; 4] = ["mp4", "avi", "mov", "mkv"];

/// Everything one conversion needs. Built fresh for every input.
#[derive(Debug, Clone)]
pub struct Job {
    pub input: PathBuf,
    pub destination: PathBuf,
    pub config: SampleConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Saved { destination: PathBuf, frames: usize },
    /// The video gave no frames to keep. No file has been written.
    NothingToSave,
}

/// What happened to each input of a [`Converter::convert_path`] call
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Paths of the GIFs written
    pub saved: Vec<PathBuf>,
    /// Inputs that had no frames to save
    pub empty: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, Error)>,
}

impl BatchReport {
    pub fn inputs(&self) -> usize {
        self.saved.len() + self.empty.len() + self.failed.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Case-insensitive match of the file name's ending, so a bare `.mkv` counts too
pub fn is_video_file(path: &Path) -> bool {
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name.to_ascii_lowercase(),
        None => return false,
    };
    VIDEO_EXTENSIONS.iter().any(|ext| {
        name.len() > ext.len() && name.ends_with(ext) && name.as_bytes()[name.len() - ext.len() - 1] == b'.'
    })
}

/// `<output_dir>/<input name without extension>.gif`
pub fn destination_for(input: &Path, output_dir: &Path) -> CatResult<PathBuf> {
    let stem = input.file_stem().ok_or_else(|| Error::InvalidInputPath(input.to_path_buf(), "file"))?;
    let mut name = stem.to_os_string();
    name.push(".gif");
    Ok(output_dir.join(name))
}

/// Runs the sampling pipeline and the encoder for every input.
///
/// The opener and encoder are swappable, so this works the same with FFmpeg
/// or with any other decoder.
pub struct Converter<O, E> {
    opener: O,
    encoder: E,
    options: EncodeOptions,
}

impl<O: SourceOpener, E: AnimationEncoder> Converter<O, E> {
    pub fn new(opener: O, encoder: E, options: EncodeOptions) -> Self {
        Self { opener, encoder, options }
    }

    /// Converts a single file or all videos in a folder.
    ///
    /// Problems with individual inputs are given to `reporter.error()` and collected in the report.
    /// Only settings that can't work at all, or a path that is neither a file nor a folder, fail the whole call.
    pub fn convert_path(&mut self, input: &Path, output_dir: &Path, config: &SampleConfig, reporter: &mut dyn ProgressReporter) -> CatResult<BatchReport> {
        config.validate()?;
        if input.is_dir() {
            return self.convert_folder(input, output_dir, config, reporter);
        }
        if !input.is_file() {
            return Err(Error::InvalidInputPath(input.to_path_buf(), "file or folder"));
        }
        let mut report = BatchReport::default();
        self.convert_into_report(input, output_dir, config, reporter, &mut report);
        Ok(report)
    }

    /// Converts every file with a video extension found directly in `folder`, in natural name order.
    pub fn convert_folder(&mut self, folder: &Path, output_dir: &Path, config: &SampleConfig, reporter: &mut dyn ProgressReporter) -> CatResult<BatchReport> {
        config.validate()?;
        if !folder.is_dir() {
            return Err(Error::InvalidInputPath(folder.to_path_buf(), "folder"));
        }

        let mut inputs = Vec::new();
        for entry in fs::read_dir(folder)? {
            let path = entry?.path();
            if is_video_file(&path) {
                inputs.push(path);
            }
        }
        inputs.sort_by(|a, b| natord::compare(&a.to_string_lossy(), &b.to_string_lossy()));
        log::debug!("{} video(s) in {}", inputs.len(), folder.display());

        let mut report = BatchReport::default();
        for input in inputs {
            self.convert_into_report(&input, output_dir, config, reporter, &mut report);
        }
        Ok(report)
    }

    fn convert_into_report(&mut self, input: &Path, output_dir: &Path, config: &SampleConfig, reporter: &mut dyn ProgressReporter, report: &mut BatchReport) {
        match self.convert_file(input, output_dir, config, reporter) {
            Ok(Outcome::Saved { destination, .. }) => report.saved.push(destination),
            Ok(Outcome::NothingToSave) => report.empty.push(input.to_path_buf()),
            Err(err) => {
                log::warn!("skipping {}: {}", input.display(), err);
                reporter.error(format!("Error: {}", err));
                report.failed.push((input.to_path_buf(), err));
            },
        }
    }

    /// Converts one video into `<output_dir>/<name>.gif`.
    ///
    /// An existing GIF at that path is left alone and nothing is decoded.
    pub fn convert_file(&mut self, input: &Path, output_dir: &Path, config: &SampleConfig, reporter: &mut dyn ProgressReporter) -> CatResult<Outcome> {
        config.validate()?;
        let job = Self::job(input, output_dir, config)?;
        self.run(&job, reporter)
    }

    fn job(input: &Path, output_dir: &Path, config: &SampleConfig) -> CatResult<Job> {
        let invalid = || Error::InvalidInputPath(input.to_path_buf(), "file");
        let resolved = dunce::canonicalize(input).map_err(|_| invalid())?;
        if !resolved.is_file() {
            return Err(invalid());
        }

        let destination = destination_for(&resolved, output_dir)?;
        if destination.exists() {
            return Err(Error::OutputAlreadyExists(destination));
        }
        Ok(Job {
            input: resolved,
            destination,
            config: *config,
        })
    }

    fn run(&mut self, job: &Job, reporter: &mut dyn ProgressReporter) -> CatResult<Outcome> {
        let source = self.opener.open(&job.input)?;

        let name = job.input.file_name().unwrap_or(job.input.as_os_str()).to_string_lossy();
        let budget = frame_budget(&source.info(), job.config.max_frames);
        reporter.begin(budget as u64, &format!("Reading {} video file", name));
        let frames = sample_frames(source, &job.config, reporter)?;

        if frames.is_empty() {
            reporter.done("No frames to save.");
            return Ok(Outcome::NothingToSave);
        }
        reporter.done(&format!("Kept {} frames", frames.len()));

        let count = frames.len();
        reporter.begin(count as u64, &format!("Saving file in {}", job.destination.display()));
        self.encoder.encode(frames, &job.destination, &self.options, reporter)?;
        reporter.done("GIF saved successfully.");

        Ok(Outcome::Saved {
            destination: job.destination.clone(),
            frames: count,
        })
    }
}
