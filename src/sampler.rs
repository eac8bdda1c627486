use crate::color;
use crate::error::*;
use crate::progress::ProgressReporter;
use crate::source::{FrameSource, StreamInfo};
use crate::{FrameSequence, SampleConfig};
use imgref::ImgVec;
use rgb::RGB8;

/// Largest side a GIF can have
const MAX_SIDE: usize = u16::MAX as usize;

/// Size of the frames after scaling.
///
/// Fails if either side would be 0 pixels, or larger than a GIF can hold.
pub fn output_dimensions(width: usize, height: usize, scale: f64) -> CatResult<(usize, usize)> {
    if !scale.is_finite() || scale <= 0. {
        return Err(Error::InvalidScale(scale));
    }
    let out_w = (width as f64 * scale).floor() as usize;
    let out_h = (height as f64 * scale).floor() as usize;
    if out_w == 0 || out_h == 0 || out_w > MAX_SIDE || out_h > MAX_SIDE {
        return Err(Error::InvalidScale(scale));
    }
    Ok((out_w, out_h))
}

/// How many source frames will be read at most.
///
/// Containers that don't know their length report 0, and then only `max_frames` limits it.
pub fn frame_budget(info: &StreamInfo, max_frames: usize) -> usize {
    if info.total_frames == 0 {
        max_frames
    } else {
        info.total_frames.min(max_frames as u64) as usize
    }
}

/// Reads up to the frame budget from `source`, keeping every `frame_skip`-th frame
/// (starting with the first one), scaled and color-reduced according to `config`.
///
/// The source is consumed and closed when this returns, on every path.
/// `reporter.increase()` is called once per frame read.
pub fn sample_frames<S: FrameSource>(mut source: S, config: &SampleConfig, reporter: &mut dyn ProgressReporter) -> CatResult<FrameSequence> {
    config.validate()?;

    let info = source.info();
    let (width, height) = output_dimensions(info.width, info.height, config.scale)?;
    let budget = frame_budget(&info, config.max_frames);
    log::debug!("sampling {}×{} video ({} frames reported) at {}×{}, budget {}, every {} frame(s)",
        info.width, info.height, info.total_frames, width, height, budget, config.frame_skip);

    let mut scaler = Scaler::new(width, height);
    let mut frames = FrameSequence::new(width, height);

    for index in 0..budget {
        let frame = match source.next_frame()? {
            Some(frame) => frame,
            None => {
                log::debug!("stream ended after {} frames", index);
                break;
            },
        };
        if !reporter.increase() {
            return Err(Error::Aborted);
        }
        if index % config.frame_skip != 0 {
            continue;
        }

        let image = scaler.scale(frame.into_rgb())?;
        let image = if config.less_colors { color::reduce(image) } else { image };
        frames.push(image)?;
    }
    Ok(frames)
}

/// Resizes to one fixed size, reusing the filter while the input size stays the same
struct Scaler {
    width: usize,
    height: usize,
    resizer: Option<((usize, usize), resize::Resizer<resize::formats::Rgb<u8, u8>>)>,
}

impl Scaler {
    fn new(width: usize, height: usize) -> Self {
        Self { width, height, resizer: None }
    }

    /// `image` must be contiguous (no stride padding)
    fn scale(&mut self, image: ImgVec<RGB8>) -> CatResult<ImgVec<RGB8>> {
        let src = (image.width(), image.height());
        if src == (self.width, self.height) {
            return Ok(image);
        }

        let stale = self.resizer.as_ref().map_or(true, |(size, _)| *size != src);
        if stale {
            let resizer = resize::new(src.0, src.1, self.width, self.height, resize::Pixel::RGB8, resize::Type::Lanczos3)?;
            self.resizer = Some((src, resizer));
        }

        let mut dst = vec![RGB8::new(0, 0, 0); self.width * self.height];
        if let Some((_, resizer)) = self.resizer.as_mut() {
            resizer.resize(image.buf(), &mut dst)?;
        }
        Ok(ImgVec::new(dst, self.width, self.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use crate::source::RasterFrame;
    use rgb::alt::BGR8;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Frame `i` is filled with `r = i`
    struct Counting {
        info: StreamInfo,
        available: u64,
        emitted: Rc<Cell<u64>>,
        dropped: Rc<Cell<u32>>,
    }

    impl Counting {
        fn new(width: usize, height: usize, reported: u64, available: u64) -> Self {
            Self {
                info: StreamInfo { width, height, total_frames: reported },
                available,
                emitted: Rc::default(),
                dropped: Rc::default(),
            }
        }
    }

    impl FrameSource for Counting {
        fn info(&self) -> StreamInfo {
            self.info
        }

        fn next_frame(&mut self) -> CatResult<Option<RasterFrame>> {
            let n = self.emitted.get();
            if n >= self.available {
                return Ok(None);
            }
            self.emitted.set(n + 1);
            let px = RGB8::new(n as u8, 100, 200);
            Ok(Some(RasterFrame::Rgb(ImgVec::new(vec![px; self.info.width * self.info.height], self.info.width, self.info.height))))
        }
    }

    impl Drop for Counting {
        fn drop(&mut self) {
            self.dropped.set(self.dropped.get() + 1);
        }
    }

    fn config(max_frames: usize, frame_skip: usize) -> SampleConfig {
        SampleConfig { scale: 1., less_colors: false, max_frames, frame_skip }
    }

    fn indices(seq: &FrameSequence) -> Vec<u8> {
        seq.frames().iter().map(|f| f.buf()[0].r).collect()
    }

    #[test]
    fn retains_every_nth_frame() {
        for &(total, max, skip) in &[(20u64, 2000, 5), (21, 2000, 5), (10, 7, 3), (10, 10, 1), (3, 100, 5), (12, 12, 12), (0, 9, 4)] {
            let src = Counting::new(4, 4, total, total);
            let seq = sample_frames(src, &config(max, skip), &mut NoProgress {}).unwrap();
            let n = (total as usize).min(max);
            let expected: Vec<u8> = (0..n).step_by(skip).map(|i| i as u8).collect();
            assert_eq!((n + skip - 1) / skip, seq.len());
            assert_eq!(expected, indices(&seq), "{} {} {}", total, max, skip);
        }
    }

    #[test]
    fn reads_no_more_than_budget() {
        let src = Counting::new(2, 2, 100, 100);
        let emitted = src.emitted.clone();
        sample_frames(src, &config(10, 3), &mut NoProgress {}).unwrap();
        assert_eq!(10, emitted.get());
    }

    #[test]
    fn unknown_length_stops_at_end_of_stream() {
        let src = Counting::new(2, 2, 0, 7);
        let emitted = src.emitted.clone();
        let seq = sample_frames(src, &config(2000, 2), &mut NoProgress {}).unwrap();
        assert_eq!(vec![0, 2, 4, 6], indices(&seq));
        assert_eq!(7, emitted.get());
    }

    #[test]
    fn short_stream_stops_early() {
        // container claims more frames than it has
        let src = Counting::new(2, 2, 50, 4);
        let seq = sample_frames(src, &config(2000, 3), &mut NoProgress {}).unwrap();
        assert_eq!(vec![0, 3], indices(&seq));
    }

    #[test]
    fn identity_settings_keep_frames_untouched() {
        let src = Counting::new(3, 2, 9, 9);
        let seq = sample_frames(src, &config(9, 1), &mut NoProgress {}).unwrap();
        assert_eq!(9, seq.len());
        for (i, f) in seq.frames().iter().enumerate() {
            assert_eq!((3, 2), (f.width(), f.height()));
            assert!(f.pixels().all(|px| px == RGB8::new(i as u8, 100, 200)));
        }
    }

    #[test]
    fn less_colors_floors_channels() {
        let src = Counting::new(2, 2, 10, 10);
        let seq = sample_frames(src, &SampleConfig { less_colors: true, ..config(10, 1) }, &mut NoProgress {}).unwrap();
        for (i, f) in seq.frames().iter().enumerate() {
            assert_eq!(RGB8::new(i as u8 / 8 * 8, 96, 200), f.buf()[0]);
        }
    }

    #[test]
    fn scales_down() {
        let src = Counting::new(100, 50, 3, 3);
        let seq = sample_frames(src, &SampleConfig { scale: 0.6, ..config(10, 1) }, &mut NoProgress {}).unwrap();
        assert_eq!((60, 30), (seq.width(), seq.height()));
        assert!(seq.frames().iter().all(|f| f.width() == 60 && f.height() == 30));
    }

    #[test]
    fn output_size_is_floored() {
        assert_eq!((1, 1), output_dimensions(2, 3, 0.5).unwrap());
        assert_eq!((115, 76), output_dimensions(192, 128, 0.6).unwrap());
        assert_eq!((640, 360), output_dimensions(640, 360, 1.).unwrap());
    }

    #[test]
    fn collapsing_scale_fails() {
        assert!(matches!(output_dimensions(2, 1000, 0.4), Err(Error::InvalidScale(_))));
        assert!(matches!(output_dimensions(1920, 1080, 0.0001), Err(Error::InvalidScale(_))));

        let src = Counting::new(10, 10, 5, 5);
        let emitted = src.emitted.clone();
        let dropped = src.dropped.clone();
        let res = sample_frames(src, &SampleConfig { scale: 0.01, ..config(5, 1) }, &mut NoProgress {});
        assert!(matches!(res, Err(Error::InvalidScale(_))));
        assert_eq!(0, emitted.get());
        assert_eq!(1, dropped.get());
    }

    #[test]
    fn oversized_scale_fails_before_reading() {
        assert_eq!((65535, 1), output_dimensions(65535, 1, 1.).unwrap());
        assert!(matches!(output_dimensions(65536, 1, 1.), Err(Error::InvalidScale(_))));
        assert!(matches!(output_dimensions(1920, 1080, 100.), Err(Error::InvalidScale(_))));
        assert!(matches!(output_dimensions(1920, 1080, 1e300), Err(Error::InvalidScale(_))));

        let src = Counting::new(1920, 1080, 5, 5);
        let emitted = src.emitted.clone();
        let dropped = src.dropped.clone();
        let res = sample_frames(src, &SampleConfig { scale: 1e300, ..config(5, 1) }, &mut NoProgress {});
        assert!(matches!(res, Err(Error::InvalidScale(_))));
        assert_eq!(0, emitted.get());
        assert_eq!(1, dropped.get());
    }

    #[test]
    fn source_is_released_once() {
        let src = Counting::new(2, 2, 30, 30);
        let dropped = src.dropped.clone();
        sample_frames(src, &config(30, 5), &mut NoProgress {}).unwrap();
        assert_eq!(1, dropped.get());

        struct Abort(u32);
        impl ProgressReporter for Abort {
            fn increase(&mut self) -> bool {
                self.0 += 1;
                self.0 < 3
            }
        }
        let src = Counting::new(2, 2, 30, 30);
        let dropped = src.dropped.clone();
        let emitted = src.emitted.clone();
        let res = sample_frames(src, &config(30, 1), &mut Abort(0));
        assert!(matches!(res, Err(Error::Aborted)));
        assert_eq!(3, emitted.get());
        assert_eq!(1, dropped.get());
    }

    #[test]
    fn zero_skip_opens_nothing() {
        let src = Counting::new(2, 2, 30, 30);
        let emitted = src.emitted.clone();
        let res = sample_frames(src, &config(30, 0), &mut NoProgress {});
        assert!(matches!(res, Err(Error::InvalidFrameSkip)));
        assert_eq!(0, emitted.get());
    }

    #[test]
    fn bgr_sources_come_out_as_rgb() {
        struct Bgr(u32);
        impl FrameSource for Bgr {
            fn info(&self) -> StreamInfo {
                StreamInfo { width: 2, height: 1, total_frames: 2 }
            }

            fn next_frame(&mut self) -> CatResult<Option<RasterFrame>> {
                self.0 += 1;
                Ok(Some(RasterFrame::Bgr(ImgVec::new(vec![BGR8 { b: 10, g: 20, r: 30 }; 2], 2, 1))))
            }
        }
        let seq = sample_frames(Bgr(0), &config(5, 1), &mut NoProgress {}).unwrap();
        assert_eq!(2, seq.len());
        assert!(seq.frames().iter().all(|f| f.buf()[..] == [RGB8::new(30, 20, 10); 2]));
    }
}
