//! Where frames come from
//!
//! A [`FrameSource`] is an open, decodable stream. It's released when dropped,
//! so whoever owns it (normally [`sample_frames`](crate::sample_frames)) closes it
//! exactly once, whichever way the run ends.

use crate::error::*;
use imgref::ImgVec;
use rgb::alt::BGR8;
use rgb::RGB8;
use std::path::Path;

/// Stream metadata as reported by the container
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    pub width: usize,
    pub height: usize,
    /// Best-effort. 0 when the container doesn't know.
    pub total_frames: u64,
}

/// One decoded frame, in whatever channel order the decoder produces
#[derive(Debug, Clone)]
pub enum RasterFrame {
    Rgb(ImgVec<RGB8>),
    Bgr(ImgVec<BGR8>),
}

impl RasterFrame {
    pub fn width(&self) -> usize {
        match self {
            Self::Rgb(img) => img.width(),
            Self::Bgr(img) => img.width(),
        }
    }

    pub fn height(&self) -> usize {
        match self {
            Self::Rgb(img) => img.height(),
            Self::Bgr(img) => img.height(),
        }
    }

    /// Canonical channel order. Padding (stride) is dropped.
    pub fn into_rgb(self) -> ImgVec<RGB8> {
        match self {
            Self::Rgb(img) => {
                if img.width() == img.stride() {
                    img
                } else {
                    let (buf, width, height) = img.as_ref().to_contiguous_buf();
                    ImgVec::new(buf.into_owned(), width, height)
                }
            },
            Self::Bgr(img) => {
                let buf = img.pixels().map(|px| RGB8::new(px.r, px.g, px.b)).collect();
                ImgVec::new(buf, img.width(), img.height())
            },
        }
    }
}

pub trait FrameSource {
    fn info(&self) -> StreamInfo;

    /// `Ok(None)` at the end of the stream
    fn next_frame(&mut self) -> CatResult<Option<RasterFrame>>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn info(&self) -> StreamInfo {
        (**self).info()
    }

    fn next_frame(&mut self) -> CatResult<Option<RasterFrame>> {
        (**self).next_frame()
    }
}

/// Opens videos for the batch converter.
///
/// Fails with `Error::SourceUnavailable` if the path can't be decoded as video.
pub trait SourceOpener {
    fn open(&mut self, path: &Path) -> CatResult<Box<dyn FrameSource>>;
}
