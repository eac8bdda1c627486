use crate::error::*;
use crate::EncodeOptions;
use imgref::*;
use rgb::*;
use std::borrow::Cow;
use std::io::Write;

/// Writes frames with the `gif` crate. The first frame sets the screen size.
pub(crate) struct RustEncoder<W: Write> {
    writer: Option<W>,
    gif_enc: Option<gif::Encoder<W>>,
    screen: (u16, u16),
    frames_written: usize,
}

impl<W: Write> RustEncoder<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Some(writer),
            gif_enc: None,
            screen: (0, 0),
            frames_written: 0,
        }
    }

    pub fn write_frame(&mut self, image: ImgRef<'_, RGB8>, settings: &EncodeOptions) -> CatResult<()> {
        let (width, height) = gif_size(image.width(), image.height())?;

        let enc = match self.gif_enc {
            None => {
                let w = self.writer.take().ok_or(Error::Aborted)?;
                let mut enc = gif::Encoder::new(w, width, height, &[])?;
                enc.set_repeat(match settings.loop_count {
                    0 => gif::Repeat::Infinite,
                    n => gif::Repeat::Finite(n),
                })?;
                self.screen = (width, height);
                self.gif_enc.get_or_insert(enc)
            },
            Some(ref mut enc) => {
                if self.screen != (width, height) {
                    return Err(Error::WrongSize(format!("Frame {} has wrong size ({}×{}, expected {}×{})",
                        self.frames_written + 1, width, height, self.screen.0, self.screen.1)));
                }
                enc
            },
        };

        let mut frame = if settings.optimize_palette {
            // the first frame is too important to ruin it
            let quality = if self.frames_written == 0 { 100 } else { settings.quality };
            let (image8, pal) = quantize(image, quality, settings.fast)?;
            let mut pal_rgb = Vec::with_capacity(3 * pal.len());
            for p in &pal {
                pal_rgb.extend_from_slice(&[p.r, p.g, p.b]);
            }
            gif::Frame {
                width,
                height,
                palette: Some(pal_rgb),
                buffer: Cow::Owned(image8),
                ..gif::Frame::default()
            }
        } else {
            let mut rgb = Vec::with_capacity(3 * image.width() * image.height());
            for px in image.pixels() {
                rgb.extend_from_slice(&[px.r, px.g, px.b]);
            }
            gif::Frame::from_rgb_speed(width, height, &rgb, if settings.fast { 20 } else { 10 })
        };
        frame.delay = settings.delay_centiseconds();
        frame.dispose = gif::DisposalMethod::Keep;

        enc.write_frame(&frame)?;
        self.frames_written += 1;
        Ok(())
    }

    /// Writes the GIF trailer
    pub fn finish(mut self) -> CatResult<usize> {
        let enc = self.gif_enc.take().ok_or(Error::NoFrames)?;
        enc.into_inner()?;
        Ok(self.frames_written)
    }
}

fn gif_size(width: usize, height: usize) -> CatResult<(u16, u16)> {
    if width > u16::MAX as usize || height > u16::MAX as usize {
        return Err(Error::WrongSize(format!("{}×{} is too large for a GIF", width, height)));
    }
    Ok((width as u16, height as u16))
}

/// Maps the frame onto its own palette of at most 256 colors
fn quantize(image: ImgRef<'_, RGB8>, quality: u8, fast: bool) -> CatResult<(Vec<u8>, Vec<RGBA8>)> {
    let mut liq = imagequant::new();
    if fast {
        liq.set_speed(10)?;
    }
    liq.set_quality(0, quality)?;
    let pixels: Vec<RGBA8> = image.pixels().map(|px| RGBA8::new(px.r, px.g, px.b, 255)).collect();
    let mut img = liq.new_image(pixels, image.width(), image.height(), 0.)?;
    let mut res = liq.quantize(&mut img)?;
    res.set_dithering_level(0.5)?;

    let (pal, pal_img) = res.remapped(&mut img)?;
    debug_assert_eq!(image.width() * image.height(), pal_img.len());
    Ok((pal_img, pal))
}
