use crate::encoderust::RustEncoder;
use crate::error::*;
use crate::progress::ProgressReporter;
use crate::FrameSequence;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// How the animation is written
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Display time of every frame. GIF stores it in 10ms units.
    pub frame_delay_ms: u32,
    /// 0 loops forever
    pub loop_count: u16,
    /// Build a palette per frame with imagequant instead of the gif crate's NeuQuant
    pub optimize_palette: bool,
    /// 1-100, for frames after the first. Lower quality may give smaller file.
    pub quality: u8,
    /// Lower quality, but faster encode
    pub fast: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            frame_delay_ms: 100,
            loop_count: 0,
            optimize_palette: true,
            quality: 100,
            fast: false,
        }
    }
}

impl EncodeOptions {
    pub(crate) fn delay_centiseconds(&self) -> u16 {
        (self.frame_delay_ms / 10).min(u32::from(u16::MAX)) as u16
    }
}

/// Turns a finished [`FrameSequence`] into a file
pub trait AnimationEncoder {
    /// Writes `frames` in order to a new file at `destination`.
    ///
    /// Must not overwrite an existing file, and must not leave a file behind on failure.
    fn encode(&mut self, frames: FrameSequence, destination: &Path, options: &EncodeOptions, reporter: &mut dyn ProgressReporter) -> CatResult<()>;
}

/// Encoder writing GIF files with the `gif` and `imagequant` crates
#[derive(Debug, Default)]
pub struct GifEncoder {}

impl AnimationEncoder for GifEncoder {
    fn encode(&mut self, frames: FrameSequence, destination: &Path, options: &EncodeOptions, reporter: &mut dyn ProgressReporter) -> CatResult<()> {
        if frames.is_empty() {
            return Err(Error::NoFrames);
        }

        let file = OpenOptions::new().write(true).create_new(true).open(destination).map_err(|err| match err.kind() {
            io::ErrorKind::AlreadyExists => Error::OutputAlreadyExists(destination.to_path_buf()),
            _ => Error::Io(err),
        })?;

        let mut out = BufWriter::new(file);
        let res = write_gif(&mut out, frames, options, reporter)
            .and_then(|_| out.flush().map_err(Error::from));
        if let Err(err) = res {
            drop(out);
            log::debug!("removing incomplete {} after: {}", destination.display(), err);
            let _ = fs::remove_file(destination);
            return Err(err);
        }
        Ok(())
    }
}

/// Encodes all frames into `writer`, first to last. Returns number of frames written.
///
/// `reporter.increase()` is called after each frame and may abort the write.
pub fn write_gif<W: Write>(writer: W, frames: FrameSequence, options: &EncodeOptions, reporter: &mut dyn ProgressReporter) -> CatResult<usize> {
    if frames.is_empty() {
        return Err(Error::NoFrames);
    }
    log::debug!("encoding {} frames of {}×{}, {}ms each", frames.len(), frames.width(), frames.height(), options.frame_delay_ms);

    let mut enc = RustEncoder::new(writer);
    for frame in frames {
        enc.write_frame(frame.as_ref(), options)?;
        if !reporter.increase() {
            return Err(Error::Aborted);
        }
    }
    enc.finish()
}
