// src/audio_buffer.rs

/// Mutable view over one block of planar audio.
///
/// Layout is channel-major: all frames of channel 0, then all frames of
/// channel 1, and so on.
#[derive(Debug)]
pub struct AudioBuffer<'a> {
    pub channels: usize,
    pub frames: usize,
    pub data: &'a mut [f32],
}

impl<'a> AudioBuffer<'a> {
    /// Wrap existing planar data. `data.len()` must be a multiple of `channels`.
    #[inline]
    pub fn new(data: &'a mut [f32], channels: usize) -> Self {
        let frames = if channels == 0 { 0 } else { data.len() / channels };
        Self {
            channels,
            frames,
            data,
        }
    }

    #[inline]
    pub fn clear(&mut self) {
        self.data.fill(0.0);
    }

    #[inline]
    pub fn channel(&self, ch: usize) -> &[f32] {
        let start = ch * self.frames;
        &self.data[start..start + self.frames]
    }

    #[inline]
    pub fn channel_mut(&mut self, ch: usize) -> &mut [f32] {
        let start = ch * self.frames;
        &mut self.data[start..start + self.frames]
    }

    /// Add `other` into this buffer, channel by channel.
    ///
    /// A mono source is spread to every destination channel.
    pub fn mix_from(&mut self, other: &AudioBuffer) {
        if other.channels == 0 {
            return;
        }
        let frames = self.frames.min(other.frames);
        for ch in 0..self.channels {
            let src_ch = ch.min(other.channels - 1);
            let start = src_ch * other.frames;
            let src = &other.data[start..start + frames];
            let dst = self.channel_mut(ch);
            for (d, s) in dst.iter_mut().zip(src) {
                *d += *s;
            }
        }
    }

    /// Copy `other` into this buffer (same spreading rules as [`mix_from`](Self::mix_from)).
    pub fn copy_from(&mut self, other: &AudioBuffer) {
        self.clear();
        self.mix_from(other);
    }

    /// Peak absolute sample value across all channels.
    pub fn peak(&self) -> f32 {
        self.data.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_views_are_planar() {
        let mut data = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let buf = AudioBuffer::new(&mut data, 2);
        assert_eq!(buf.frames, 3);
        assert_eq!(buf.channel(0), &[1.0, 2.0, 3.0]);
        assert_eq!(buf.channel(1), &[4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_mix_spreads_mono_source() {
        let mut mono = vec![0.5, 0.25];
        let src = AudioBuffer::new(&mut mono, 1);

        let mut stereo = vec![1.0; 4];
        let mut dst = AudioBuffer::new(&mut stereo, 2);
        dst.mix_from(&src);

        assert_eq!(stereo, vec![1.5, 1.25, 1.5, 1.25]);
    }
}
