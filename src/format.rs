//! Self-describing sample formats carried by buffers.
//!
//! Producers tag each [`MediaBuffer`](crate::buffer::MediaBuffer) with a
//! `SampleFormat`; filters validate the coarse [`FormatKind`] before touching
//! the payload. A mismatch is an input-validation failure, never a crash.

/// Coarse format class used for filter admission checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatKind {
    /// Accepts anything (or: format not further described).
    Any,
    /// Untyped byte payload.
    Raw,
    /// Video/image frame.
    Image,
    /// Audio sample block.
    Audio,
}

impl FormatKind {
    /// Check whether a buffer of kind `actual` satisfies this expectation.
    #[inline]
    pub fn matches(&self, actual: FormatKind) -> bool {
        matches!(self, FormatKind::Any) || *self == actual
    }
}

/// Pixel layout of an image frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelLayout {
    /// Planar Y followed by interleaved UV, 4:2:0.
    Nv12,
    /// Fully planar YUV 4:2:0.
    Yuv420Planar,
    /// Packed 8-bit RGB.
    Rgb24,
    /// Single-plane 8-bit grayscale.
    Gray8,
}

impl PixelLayout {
    /// Bytes needed for one `width` x `height` frame in this layout.
    pub fn frame_size(&self, width: u32, height: u32) -> usize {
        let pixels = width as usize * height as usize;
        match self {
            PixelLayout::Nv12 | PixelLayout::Yuv420Planar => pixels * 3 / 2,
            PixelLayout::Rgb24 => pixels * 3,
            PixelLayout::Gray8 => pixels,
        }
    }
}

/// Description of an image frame payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageFormat {
    /// Pixel layout.
    pub pixel: PixelLayout,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
}

impl ImageFormat {
    /// Create an image format description.
    pub fn new(pixel: PixelLayout, width: u32, height: u32) -> Self {
        Self {
            pixel,
            width,
            height,
        }
    }

    /// Bytes needed for one frame of this format.
    pub fn frame_size(&self) -> usize {
        self.pixel.frame_size(self.width, self.height)
    }
}

/// Per-sample storage layout of an audio block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleLayout {
    /// Signed 16-bit interleaved.
    S16,
    /// Signed 32-bit interleaved.
    S32,
    /// 32-bit float interleaved.
    F32,
}

impl SampleLayout {
    /// Bytes per single sample.
    pub fn sample_bytes(&self) -> usize {
        match self {
            SampleLayout::S16 => 2,
            SampleLayout::S32 | SampleLayout::F32 => 4,
        }
    }
}

/// Description of an audio sample payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioFormat {
    /// Sample storage layout.
    pub sample: SampleLayout,
    /// Number of channels.
    pub channels: u16,
    /// Sample rate in Hz.
    pub rate: u32,
}

impl AudioFormat {
    /// Create an audio format description.
    pub fn new(sample: SampleLayout, channels: u16, rate: u32) -> Self {
        Self {
            sample,
            channels,
            rate,
        }
    }

    /// Bytes needed for `nb_samples` samples per channel.
    pub fn block_size(&self, nb_samples: usize) -> usize {
        self.sample.sample_bytes() * self.channels as usize * nb_samples
    }
}

/// Self-describing format of a buffer's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    /// Untyped bytes (e.g. an encoded elementary stream).
    Raw,
    /// An image frame.
    Image(ImageFormat),
    /// A block of audio samples.
    Audio(AudioFormat),
}

impl SampleFormat {
    /// The coarse class of this format.
    pub fn kind(&self) -> FormatKind {
        match self {
            SampleFormat::Raw => FormatKind::Raw,
            SampleFormat::Image(_) => FormatKind::Image,
            SampleFormat::Audio(_) => FormatKind::Audio,
        }
    }
}

impl Default for SampleFormat {
    fn default() -> Self {
        SampleFormat::Raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matching() {
        assert!(FormatKind::Any.matches(FormatKind::Image));
        assert!(FormatKind::Any.matches(FormatKind::Raw));
        assert!(FormatKind::Image.matches(FormatKind::Image));
        assert!(!FormatKind::Image.matches(FormatKind::Audio));
        assert!(!FormatKind::Audio.matches(FormatKind::Raw));
    }

    #[test]
    fn test_image_frame_sizes() {
        let nv12 = ImageFormat::new(PixelLayout::Nv12, 1920, 1080);
        assert_eq!(nv12.frame_size(), 1920 * 1080 * 3 / 2);

        let rgb = ImageFormat::new(PixelLayout::Rgb24, 640, 480);
        assert_eq!(rgb.frame_size(), 640 * 480 * 3);

        let gray = ImageFormat::new(PixelLayout::Gray8, 320, 240);
        assert_eq!(gray.frame_size(), 320 * 240);
    }

    #[test]
    fn test_audio_block_size() {
        let fmt = AudioFormat::new(SampleLayout::S16, 2, 48_000);
        assert_eq!(fmt.block_size(1024), 2 * 2 * 1024);
    }

    #[test]
    fn test_sample_format_kind() {
        assert_eq!(SampleFormat::Raw.kind(), FormatKind::Raw);
        let img = SampleFormat::Image(ImageFormat::new(PixelLayout::Gray8, 8, 8));
        assert_eq!(img.kind(), FormatKind::Image);
        let aud = SampleFormat::Audio(AudioFormat::new(SampleLayout::F32, 1, 16_000));
        assert_eq!(aud.kind(), FormatKind::Audio);
    }
}
