//! Frame type representing a captured RGB image with metadata.

/// One color channel of a packed `0x00RRGGBB` pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    /// All channels in sample order.
    pub const ALL: [Channel; 3] = [Channel::Red, Channel::Green, Channel::Blue];

    #[inline]
    fn shift(self) -> u32 {
        match self {
            Channel::Red => 16,
            Channel::Green => 8,
            Channel::Blue => 0,
        }
    }

    /// Extracts this channel's intensity from a packed pixel.
    #[inline]
    pub fn of(self, pixel: u32) -> u8 {
        ((pixel >> self.shift()) & 0xFF) as u8
    }
}

/// Packs three intensities into one `0x00RRGGBB` pixel.
#[inline]
pub fn pack_rgb(r: u8, g: u8, b: u8) -> u32 {
    (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
}

/// A single captured frame from the camera.
///
/// Pixels are stored row-major, one packed RGB value per pixel. The
/// alpha byte, if the source provides one, is ignored.
#[derive(Clone)]
pub struct Frame {
    /// Packed pixel data.
    pixels: Vec<u32>,
    /// Frame width in pixels.
    width: u32,
    /// Frame height in pixels.
    height: u32,
    /// Monotonic sequence number.
    sequence: u64,
}

impl Frame {
    /// Creates a new frame with the given parameters.
    pub fn new(pixels: Vec<u32>, width: u32, height: u32, sequence: u64) -> Self {
        Self {
            pixels,
            width,
            height,
            sequence,
        }
    }

    /// Builds a frame from interleaved `R, G, B` bytes.
    ///
    /// A trailing partial pixel is ignored.
    pub fn from_rgb_bytes(bytes: &[u8], width: u32, height: u32, sequence: u64) -> Self {
        let pixels = bytes
            .chunks_exact(3)
            .map(|px| pack_rgb(px[0], px[1], px[2]))
            .collect();
        Self::new(pixels, width, height, sequence)
    }

    /// Returns a reference to the packed pixel data.
    #[inline]
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Returns the frame width.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the frame height.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the sequence number.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns the total number of pixels (width * height).
    #[inline]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Intensity of one channel at pixel `index`.
    #[inline]
    pub fn channel(&self, index: usize, channel: Channel) -> Option<u8> {
        self.pixels.get(index).map(|&p| channel.of(p))
    }

    /// Validates that the pixel buffer size matches dimensions.
    pub fn is_valid(&self) -> bool {
        self.pixels.len() == self.pixel_count()
    }

    /// True when both frames can be differenced pixel by pixel.
    pub fn is_compatible(&self, other: &Frame) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.pixels.len() == other.pixels.len()
            && self.is_valid()
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("sequence", &self.sequence)
            .field("pixels", &self.pixels.len())
            .finish()
    }
}
