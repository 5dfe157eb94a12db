//! Frame type representing one captured preview image.

use serde::{Deserialize, Serialize};

/// Orientation of a captured frame relative to the display, in degrees.
///
/// Camera stacks report the rotation needed to bring the sensor image
/// upright; only the four right-angle values occur in practice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum Orientation {
    /// No rotation.
    #[default]
    Deg0,
    /// 90 degrees clockwise.
    Deg90,
    /// 180 degrees.
    Deg180,
    /// 270 degrees clockwise.
    Deg270,
}

impl Orientation {
    /// Returns the rotation in degrees.
    #[inline]
    pub fn degrees(self) -> u16 {
        match self {
            Orientation::Deg0 => 0,
            Orientation::Deg90 => 90,
            Orientation::Deg180 => 180,
            Orientation::Deg270 => 270,
        }
    }

    /// Returns true if applying this rotation swaps width and height.
    #[inline]
    pub fn swaps_dimensions(self) -> bool {
        matches!(self, Orientation::Deg90 | Orientation::Deg270)
    }
}

/// Error for orientation values that are not a right-angle rotation.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid orientation: {0} degrees (expected 0, 90, 180 or 270)")]
pub struct InvalidOrientation(pub u16);

impl TryFrom<u16> for Orientation {
    type Error = InvalidOrientation;

    fn try_from(degrees: u16) -> Result<Self, Self::Error> {
        match degrees {
            0 => Ok(Orientation::Deg0),
            90 => Ok(Orientation::Deg90),
            180 => Ok(Orientation::Deg180),
            270 => Ok(Orientation::Deg270),
            other => Err(InvalidOrientation(other)),
        }
    }
}

impl From<Orientation> for u16 {
    fn from(orientation: Orientation) -> Self {
        orientation.degrees()
    }
}

/// Fixed geometry of a camera preview session.
///
/// Dimensions and orientation are determined when the preview is
/// configured and do not change while it is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frame orientation.
    pub orientation: Orientation,
}

impl FrameGeometry {
    /// Creates a new geometry.
    pub fn new(width: u32, height: u32, orientation: Orientation) -> Self {
        Self {
            width,
            height,
            orientation,
        }
    }

    /// Returns the number of luma pixels (width * height).
    #[inline]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }
}

/// A single captured preview frame.
///
/// Holds the raw buffer as delivered by the camera stack. Preview
/// buffers are typically planar YUV; the luma plane occupies the first
/// `width * height` bytes and any chroma data follows it, so the buffer
/// may legitimately be larger than the pixel count.
#[derive(Clone)]
pub struct Frame {
    /// Raw buffer (luma plane first).
    pixels: Vec<u8>,
    /// Frame width in pixels.
    width: u32,
    /// Frame height in pixels.
    height: u32,
    /// Frame orientation.
    orientation: Orientation,
    /// Monotonic sequence number.
    sequence: u64,
}

impl Frame {
    /// Creates a new frame with the given parameters.
    pub fn new(
        pixels: Vec<u8>,
        width: u32,
        height: u32,
        orientation: Orientation,
        sequence: u64,
    ) -> Self {
        Self {
            pixels,
            width,
            height,
            orientation,
            sequence,
        }
    }

    /// Returns a reference to the raw buffer.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
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

    /// Returns the frame orientation.
    #[inline]
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Returns the sequence number.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns the frame geometry.
    #[inline]
    pub fn geometry(&self) -> FrameGeometry {
        FrameGeometry::new(self.width, self.height, self.orientation)
    }

    /// Returns the number of luma pixels (width * height).
    #[inline]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Validates that the buffer covers at least the luma plane.
    pub fn is_valid(&self) -> bool {
        self.pixels.len() >= self.pixel_count()
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("orientation", &self.orientation.degrees())
            .field("sequence", &self.sequence)
            .field("buffer_bytes", &self.pixels.len())
            .finish()
    }
}
