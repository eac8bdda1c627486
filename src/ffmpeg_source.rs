use crate::error::*;
use crate::source::{FrameSource, RasterFrame, SourceOpener, StreamInfo};
use ffmpeg::codec::context::Context as CodecContext;
use ffmpeg::software::scaling::{Context as ScalingContext, Flags};
use ffmpeg::util::format::pixel::Pixel;
use ffmpeg::util::frame::video::Video;
use imgref::ImgVec;
use rgb::FromSlice;
use std::path::Path;

/// Consecutive packet read failures tolerated before giving up on the file
const MAX_READ_ERRORS: u32 = 64;

/// Decodes the best video track of a file, one frame at a time, at native size
pub struct FfmpegSource {
    input_context: ffmpeg::format::context::Input,
    decoder: ffmpeg::decoder::Video,
    converter: ScalingContext,
    stream_index: usize,
    info: StreamInfo,
    vid_frame: Video,
    eof_sent: bool,
    read_errors: u32,
}

fn init() -> CatResult<()> {
    ffmpeg::init().map_err(|e| Error::Decode(format!("Unable to initialize ffmpeg: {}", e)))?;
    ffmpeg::util::log::set_level(ffmpeg::util::log::Level::Error);
    Ok(())
}

impl FfmpegSource {
    pub fn open(path: &Path) -> CatResult<Self> {
        init()?;
        let unavailable = |reason: String| Error::SourceUnavailable(path.to_path_buf(), reason);

        let input_context = ffmpeg::format::input(&path).map_err(|e| unavailable(e.to_string()))?;
        let (stream_index, decoder, total_frames) = {
            let stream = input_context.streams().best(ffmpeg::media::Type::Video)
                .ok_or_else(|| unavailable("The file has no video tracks".into()))?;
            let decoder = CodecContext::from_parameters(stream.parameters())
                .and_then(|codec| codec.decoder().video())
                .map_err(|e| unavailable(format!("Unable to decode the codec used in the video: {}", e)))?;
            (stream.index(), decoder, stream.frames().max(0) as u64)
        };
        if decoder.width() == 0 || decoder.height() == 0 {
            return Err(unavailable("The video track has no size".into()));
        }

        let converter = rgb_converter(&decoder.format(), decoder.width(), decoder.height())?;
        let info = StreamInfo {
            width: decoder.width() as usize,
            height: decoder.height() as usize,
            total_frames,
        };
        log::debug!("opened {}: {}×{} {:?}, {} frames", path.display(), info.width, info.height, decoder.format(), total_frames);

        Ok(Self {
            input_context,
            decoder,
            converter,
            stream_index,
            info,
            vid_frame: Video::empty(),
            eof_sent: false,
            read_errors: 0,
        })
    }

    /// Copies the current decoded frame out as packed RGB
    fn rgb_frame(&mut self) -> CatResult<RasterFrame> {
        let def = self.converter.input();
        if def.format != self.vid_frame.format() || def.width != self.vid_frame.width() || def.height != self.vid_frame.height() {
            // resolution changes mid-stream; the pipeline resizes it back
            self.converter = rgb_converter(&self.vid_frame.format(), self.vid_frame.width(), self.vid_frame.height())?;
        }

        let mut rgb_frame = Video::empty();
        self.converter.run(&self.vid_frame, &mut rgb_frame).map_err(decode_error)?;

        let width = rgb_frame.width() as usize;
        let height = rgb_frame.height() as usize;
        let stride = rgb_frame.stride(0);
        let mut buf = Vec::with_capacity(width * height);
        for row in rgb_frame.data(0).chunks(stride).take(height) {
            buf.extend_from_slice(row[..width * 3].as_rgb());
        }
        Ok(RasterFrame::Rgb(ImgVec::new(buf, width, height)))
    }
}

fn rgb_converter(format: &Pixel, width: u32, height: u32) -> CatResult<ScalingContext> {
    ScalingContext::get(*format, width, height, Pixel::RGB24, width, height, Flags::BILINEAR).map_err(decode_error)
}

fn decode_error(e: ffmpeg::Error) -> Error {
    Error::Decode(e.to_string())
}

impl FrameSource for FfmpegSource {
    fn info(&self) -> StreamInfo {
        self.info
    }

    fn next_frame(&mut self) -> CatResult<Option<RasterFrame>> {
        loop {
            if self.decoder.receive_frame(&mut self.vid_frame).is_ok() {
                if self.vid_frame.width() == 0 {
                    continue;
                }
                return self.rgb_frame().map(Some);
            }
            if self.eof_sent {
                return Ok(None);
            }

            let mut packet = ffmpeg::Packet::empty();
            match packet.read(&mut self.input_context) {
                Ok(()) => {
                    self.read_errors = 0;
                    if packet.stream() == self.stream_index {
                        self.decoder.send_packet(&packet).map_err(decode_error)?;
                    }
                },
                Err(ffmpeg::Error::Eof) => {
                    self.decoder.send_eof().map_err(decode_error)?;
                    self.eof_sent = true;
                },
                Err(e) => {
                    self.read_errors += 1;
                    if self.read_errors > MAX_READ_ERRORS {
                        return Err(decode_error(e));
                    }
                    log::debug!("skipping unreadable packet: {}", e);
                },
            }
        }
    }
}

/// Opens every path with [`FfmpegSource`]
#[derive(Debug, Default)]
pub struct FfmpegOpener {}

impl SourceOpener for FfmpegOpener {
    fn open(&mut self, path: &Path) -> CatResult<Box<dyn FrameSource>> {
        Ok(Box::new(FfmpegSource::open(path)?))
    }
}
