use std::sync::Arc;

use ndarray::Array2;

use crate::consts::{
    LUMINANCE_B, LUMINANCE_G, LUMINANCE_R, MAX_FRAME_HEIGHT, MAX_FRAME_WIDTH, MIN_IMAGE_SIZE,
};
use crate::error::{Result, StabilizerError};

/// An 8-bit interleaved pixel buffer.
///
/// Channel order is gray (1), BGR (3) or BGRA (4). Pixel storage is shared:
/// cloning an `ImageBuffer` is O(1) and never copies pixels, so returning
/// the caller's frame unchanged costs nothing. Use [`ImageBuffer::deep_copy`]
/// for an independent buffer.
#[derive(Clone, Debug)]
pub struct ImageBuffer {
    width: usize,
    height: usize,
    channels: usize,
    /// Bytes per row, at least `width * channels`
    stride: usize,
    data: Arc<[u8]>,
}

impl ImageBuffer {
    /// Build a tightly packed buffer, checking that `data` is large enough.
    pub fn new(width: usize, height: usize, channels: usize, data: Vec<u8>) -> Result<Self> {
        let stride = width
            .checked_mul(channels)
            .ok_or_else(|| StabilizerError::InvalidFrame("layout overflows".into()))?;
        let buffer = Self::from_raw_parts(width, height, channels, stride, data);
        validate_frame(&buffer)?;
        Ok(buffer)
    }

    /// Wrap host memory without any checks. Run [`validate_frame`] before
    /// touching the pixels.
    pub fn from_raw_parts(
        width: usize,
        height: usize,
        channels: usize,
        stride: usize,
        data: Vec<u8>,
    ) -> Self {
        Self {
            width,
            height,
            channels,
            stride,
            data: data.into(),
        }
    }

    /// A black, tightly packed buffer.
    pub fn zeros(width: usize, height: usize, channels: usize) -> Self {
        Self::from_raw_parts(
            width,
            height,
            channels,
            width * channels,
            vec![0u8; width * height * channels],
        )
    }

    /// Single-channel buffer from a (height, width) array.
    pub fn from_gray(gray: &Array2<u8>) -> Self {
        let (h, w) = gray.dim();
        let data: Vec<u8> = gray.iter().copied().collect();
        Self::from_raw_parts(w, h, 1, w, data)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }

    /// Visible bytes of one row.
    pub fn row(&self, row: usize) -> &[u8] {
        let start = row * self.stride;
        &self.data[start..start + self.width * self.channels]
    }

    pub fn pixel(&self, row: usize, col: usize, channel: usize) -> u8 {
        self.data[row * self.stride + col * self.channels + channel]
    }

    /// True when both buffers point at the same pixel storage.
    pub fn shares_storage(&self, other: &ImageBuffer) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Independent copy, repacked without row padding.
    pub fn deep_copy(&self) -> ImageBuffer {
        if self.is_empty() || validate_layout(self).is_err() {
            return Self::from_raw_parts(
                self.width,
                self.height,
                self.channels,
                self.stride,
                self.data.to_vec(),
            );
        }
        let mut data = Vec::with_capacity(self.width * self.height * self.channels);
        for r in 0..self.height {
            data.extend_from_slice(self.row(r));
        }
        Self::from_raw_parts(
            self.width,
            self.height,
            self.channels,
            self.width * self.channels,
            data,
        )
    }
}

impl PartialEq for ImageBuffer {
    /// Equal when geometry and every visible byte match; row padding is ignored.
    fn eq(&self, other: &Self) -> bool {
        if self.width != other.width
            || self.height != other.height
            || self.channels != other.channels
        {
            return false;
        }
        if self.shares_storage(other) && self.stride == other.stride {
            return true;
        }
        if validate_layout(self).is_err() || validate_layout(other).is_err() {
            return self.stride == other.stride && self.data == other.data;
        }
        (0..self.height).all(|r| self.row(r) == other.row(r))
    }
}

/// Check that a frame can be processed: non-empty, within the supported
/// resolution range, 1/3/4 channels and a stride consistent with the data.
pub fn validate_frame(frame: &ImageBuffer) -> Result<()> {
    if frame.is_empty() {
        return Err(StabilizerError::InvalidFrame("empty frame".into()));
    }
    validate_dimensions(frame.width, frame.height)
        .map_err(|_| {
            StabilizerError::InvalidFrame(format!(
                "{}x{} outside supported range {MIN_IMAGE_SIZE}x{MIN_IMAGE_SIZE} to {MAX_FRAME_WIDTH}x{MAX_FRAME_HEIGHT}",
                frame.width, frame.height
            ))
        })?;
    validate_layout(frame)
}

/// Check that `width`/`height` fall inside the supported range.
pub fn validate_dimensions(width: usize, height: usize) -> Result<()> {
    if width < MIN_IMAGE_SIZE
        || height < MIN_IMAGE_SIZE
        || width > MAX_FRAME_WIDTH
        || height > MAX_FRAME_HEIGHT
    {
        return Err(StabilizerError::InvalidDimensions { width, height });
    }
    Ok(())
}

fn validate_layout(frame: &ImageBuffer) -> Result<()> {
    if !matches!(frame.channels, 1 | 3 | 4) {
        return Err(StabilizerError::InvalidFrame(format!(
            "unsupported channel count {}",
            frame.channels
        )));
    }
    let overflow = || StabilizerError::InvalidFrame("layout overflows".into());
    let row_bytes = frame.width.checked_mul(frame.channels).ok_or_else(overflow)?;
    if frame.stride < row_bytes {
        return Err(StabilizerError::InvalidFrame(format!(
            "stride {} shorter than row ({} bytes)",
            frame.stride, row_bytes
        )));
    }
    let required = frame
        .stride
        .checked_mul(frame.height.saturating_sub(1))
        .and_then(|n| n.checked_add(row_bytes))
        .ok_or_else(overflow)?;
    if frame.data.len() < required {
        return Err(StabilizerError::InvalidFrame(format!(
            "buffer holds {} bytes, layout needs {}",
            frame.data.len(),
            required
        )));
    }
    Ok(())
}

/// Convert to a grayscale f32 image in [0, 1], shape (height, width).
///
/// BGR and BGRA use BT.601 weights; alpha is ignored. Call on validated
/// frames only.
pub fn to_gray(frame: &ImageBuffer) -> Array2<f32> {
    let (h, w) = (frame.height, frame.width);
    let mut gray = Array2::<f32>::zeros((h, w));
    let scale = 1.0 / 255.0;

    match frame.channels {
        1 => {
            for r in 0..h {
                for (c, &v) in frame.row(r).iter().enumerate() {
                    gray[[r, c]] = v as f32 * scale;
                }
            }
        }
        n => {
            for r in 0..h {
                for (c, px) in frame.row(r).chunks_exact(n).enumerate() {
                    let luma = LUMINANCE_B * px[0] as f32
                        + LUMINANCE_G * px[1] as f32
                        + LUMINANCE_R * px[2] as f32;
                    gray[[r, c]] = luma * scale;
                }
            }
        }
    }

    gray
}
