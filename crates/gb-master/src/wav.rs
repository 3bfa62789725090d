//! WAV encoding for 16-bit stereo PCM.

use std::io::Write;

pub fn write_wav(w: &mut impl Write, left: &[f32], right: &[f32], sample_rate: u32) -> std::io::Result<()> {
    let num_channels: u16 = 2;
    let bits_per_sample: u16 = 16;
    let block_align = num_channels * (bits_per_sample / 8);
    let frames = left.len().min(right.len());
    let data_size = frames as u32 * block_align as u32;

    write_riff_header(w, data_size)?;
    write_fmt_chunk(w, num_channels, sample_rate, block_align, bits_per_sample)?;
    write_data_chunk(w, &left[..frames], &right[..frames], data_size)
}

pub fn planes_to_wav(left: &[f32], right: &[f32], sample_rate: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    write_wav(&mut buf, left, right, sample_rate).expect("Vec<u8> write cannot fail");
    buf
}

/// Full-scale float to 16-bit PCM, clipping outside `-1.0..=1.0`.
pub fn to_pcm16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}

fn write_riff_header(w: &mut impl Write, data_size: u32) -> std::io::Result<()> {
    w.write_all(b"RIFF")?;
    w.write_all(&(36 + data_size).to_le_bytes())?;
    w.write_all(b"WAVE")
}

fn write_fmt_chunk(
    w: &mut impl Write,
    num_channels: u16,
    sample_rate: u32,
    block_align: u16,
    bits_per_sample: u16,
) -> std::io::Result<()> {
    w.write_all(b"fmt ")?;
    w.write_all(&16u32.to_le_bytes())?;
    w.write_all(&1u16.to_le_bytes())?;
    w.write_all(&num_channels.to_le_bytes())?;
    w.write_all(&sample_rate.to_le_bytes())?;
    w.write_all(&(sample_rate * block_align as u32).to_le_bytes())?;
    w.write_all(&block_align.to_le_bytes())?;
    w.write_all(&bits_per_sample.to_le_bytes())
}

fn write_data_chunk(w: &mut impl Write, left: &[f32], right: &[f32], data_size: u32) -> std::io::Result<()> {
    w.write_all(b"data")?;
    w.write_all(&data_size.to_le_bytes())?;
    for (&l, &r) in left.iter().zip(right) {
        w.write_all(&to_pcm16(l).to_le_bytes())?;
        w.write_all(&to_pcm16(r).to_le_bytes())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_describes_stereo_pcm16() {
        let wav = planes_to_wav(&[0.0; 10], &[0.0; 10], 48_000);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(u16::from_le_bytes([wav[22], wav[23]]), 2);
        assert_eq!(u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]), 48_000);
        assert_eq!(u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]), 40);
        assert_eq!(wav.len(), 44 + 40);
    }

    #[test]
    fn samples_are_interleaved_and_clipped() {
        let wav = planes_to_wav(&[1.0, -2.0], &[0.5, 0.0], 44_100);
        let data: Vec<i16> = wav[44..]
            .chunks(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect();
        assert_eq!(data, vec![i16::MAX, 16384, -i16::MAX, 0]);
    }

    #[test]
    fn uneven_planes_use_the_shorter() {
        let wav = planes_to_wav(&[0.0; 4], &[0.0; 3], 44_100);
        assert_eq!(wav.len(), 44 + 3 * 4);
    }
}
