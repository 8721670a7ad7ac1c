//! Audio frame type.

/// A stereo audio frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Frame {
    pub left: f32,
    pub right: f32,
}

impl Frame {
    /// Create a silent frame.
    pub const fn silence() -> Self {
        Self {
            left: 0.0,
            right: 0.0,
        }
    }

    /// Create a mono frame (same value for both channels).
    #[cfg(test)]
    pub const fn mono(value: f32) -> Self {
        Self {
            left: value,
            right: value,
        }
    }

    /// Mix another frame into this one.
    #[inline]
    pub fn mix(&mut self, other: Frame) {
        self.left += other.left;
        self.right += other.right;
    }

    /// Scale both sides by `gain`.
    #[inline]
    pub fn scale(&mut self, gain: f32) {
        self.left *= gain;
        self.right *= gain;
    }

    /// Convert to 16-bit PCM, clipping out-of-range values.
    pub fn to_i16(self) -> [i16; 2] {
        [to_pcm(self.left), to_pcm(self.right)]
    }
}

fn to_pcm(value: f32) -> i16 {
    (value * 32767.0).clamp(-32768.0, 32767.0) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mix_and_scale() {
        let mut f = Frame::mono(0.25);
        f.mix(Frame { left: 0.25, right: -0.5 });
        f.scale(0.5);
        assert_eq!(f, Frame { left: 0.25, right: -0.125 });
    }

    #[test]
    fn pcm_conversion_clips() {
        assert_eq!(Frame::silence().to_i16(), [0, 0]);
        assert_eq!(Frame { left: 1.0, right: -1.0 }.to_i16(), [32767, -32767]);
        assert_eq!(Frame { left: 3.0, right: -3.0 }.to_i16(), [32767, -32768]);
    }
}
