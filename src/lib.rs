/*
 simplegif video to animated GIF converter

 This program is free software: you can redistribute it and/or modify
 it under the terms of the GNU Affero General Public License as
 published by the Free Software Foundation, either version 3 of the
 License, or (at your option) any later version.

 This program is distributed in the hope that it will be useful,
 but WITHOUT ANY WARRANTY; without even the implied warranty of
 MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 GNU Affero General Public License for more details.

 You should have received a copy of the GNU Affero General Public License
 along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/
//! Samples frames out of videos and writes them as looping GIFs.
//!
//! The pieces, from the bottom up:
//!
//!  * a [`FrameSource`] pulls decoded frames (FFmpeg with the `video` feature),
//!  * [`sample_frames`] keeps every n-th frame, scales it and optionally [reduces its colors](color::reduce),
//!  * an [`AnimationEncoder`] writes the [`FrameSequence`] out,
//!  * [`Converter`] does the above for a file or a folder of videos.

#[macro_use] extern crate quick_error;

use imgref::ImgVec;
use rgb::RGB8;

mod error;
pub use crate::error::*;
pub mod progress;
pub mod color;
pub mod source;
pub use crate::source::*;
mod sampler;
pub use crate::sampler::*;
mod encoder;
pub use crate::encoder::*;
mod encoderust;
mod batch;
pub use crate::batch::*;

#[cfg(feature = "video")]
mod ffmpeg_source;
#[cfg(feature = "video")]
pub use crate::ffmpeg_source::*;

/// How frames are picked out of each video
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SampleConfig {
    /// Multiplier for the video's width and height. Usually at most 1.
    pub scale: f64,
    /// Floor all channels to multiples of 8, see [`color::reduce`]
    pub less_colors: bool,
    /// Stop reading after this many source frames
    pub max_frames: usize,
    /// Keep one out of this many frames. Must be at least 1.
    pub frame_skip: usize,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            scale: 0.6,
            less_colors: false,
            max_frames: 2000,
            frame_skip: 5,
        }
    }
}

impl SampleConfig {
    /// Rejects settings that can't work for any video, before anything is opened.
    pub fn validate(&self) -> CatResult<()> {
        if self.frame_skip == 0 {
            return Err(Error::InvalidFrameSkip);
        }
        if !self.scale.is_finite() || self.scale <= 0. {
            return Err(Error::InvalidScale(self.scale));
        }
        Ok(())
    }
}

/// Frames kept from one video, oldest first.
///
/// All frames have the same size, fixed when the sequence is created.
#[derive(Debug, Clone)]
pub struct FrameSequence {
    width: usize,
    height: usize,
    frames: Vec<ImgVec<RGB8>>,
}

impl FrameSequence {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            frames: Vec::new(),
        }
    }

    /// Appends at the end. Frames can't be changed after they've been added.
    pub fn push(&mut self, frame: ImgVec<RGB8>) -> CatResult<()> {
        if frame.width() != self.width || frame.height() != self.height {
            return Err(Error::WrongSize(format!("Frame {} has wrong size ({}×{}, expected {}×{})",
                self.frames.len() + 1, frame.width(), frame.height(), self.width, self.height)));
        }
        self.frames.push(frame);
        Ok(())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[ImgVec<RGB8>] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<ImgVec<RGB8>> {
        self.frames
    }
}

impl IntoIterator for FrameSequence {
    type Item = ImgVec<RGB8>;
    type IntoIter = std::vec::IntoIter<ImgVec<RGB8>>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = SampleConfig::default();
        assert_eq!(0.6, c.scale);
        assert!(!c.less_colors);
        assert_eq!(2000, c.max_frames);
        assert_eq!(5, c.frame_skip);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn zero_skip_is_rejected() {
        let c = SampleConfig { frame_skip: 0, ..SampleConfig::default() };
        assert!(matches!(c.validate(), Err(Error::InvalidFrameSkip)));
    }

    #[test]
    fn bad_scale_is_rejected() {
        for &scale in &[0., -1., f64::NAN, f64::INFINITY] {
            let c = SampleConfig { scale, ..SampleConfig::default() };
            assert!(matches!(c.validate(), Err(Error::InvalidScale(_))), "{}", scale);
        }
    }

    #[test]
    fn sequence_keeps_one_size() {
        let mut seq = FrameSequence::new(2, 2);
        seq.push(ImgVec::new(vec![RGB8::new(1, 2, 3); 4], 2, 2)).unwrap();
        let err = seq.push(ImgVec::new(vec![RGB8::new(1, 2, 3); 6], 3, 2)).unwrap_err();
        assert!(err.is_encode_error());
        assert_eq!(1, seq.len());
        assert_eq!(RGB8::new(1, 2, 3), seq.frames()[0].buf()[0]);
    }
}
