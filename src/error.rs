use std::io;
use std::path::PathBuf;

quick_error! {
    #[derive(Debug)]
    pub enum Error {
        /// The input isn't the kind of filesystem entry the call expected
        InvalidInputPath(path: PathBuf, expected: &'static str) {
            display("{} is not a valid {} path", path.display(), expected)
        }
        /// Refusing to overwrite an earlier result
        OutputAlreadyExists(path: PathBuf) {
            display("{} already exists", path.display())
        }
        SourceUnavailable(path: PathBuf, reason: String) {
            display("Unable to read video {}: {}", path.display(), reason)
        }
        InvalidScale(scale: f64) {
            display("Scale {} gives a frame size that can't be encoded", scale)
        }
        InvalidFrameSkip {
            display("Frame skip must be at least 1")
        }
        Decode(msg: String) {
            display("Video decoding failed: {}", msg)
        }
        NoFrames {
            display("Found no usable frames to encode")
        }
        WrongSize(msg: String) {
            display("{}", msg)
        }
        Aborted {
            display("aborted")
        }
        Gif(err: gif::EncodingError) {
            display("GIF encoding error: {}", err)
            from()
        }
        Quant(err: imagequant::Error) {
            display("Palette quantization error: {}", err)
            from()
        }
        Resize(err: resize::Error) {
            display("Resizing error: {}", err)
            from()
        }
        Io(err: io::Error) {
            display("I/O: {}", err)
            source(err)
            from()
        }
    }
}

impl Error {
    /// The encoder rejected the frames (the `EncodeError` family)
    pub fn is_encode_error(&self) -> bool {
        matches!(self, Error::WrongSize(_) | Error::Gif(_) | Error::Quant(_) | Error::NoFrames)
    }
}

pub type CatResult<T, E = Error> = Result<T, E>;
