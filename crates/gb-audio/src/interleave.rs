use gb_engine::{Player, MAX_BUFFER_SAMPLES};

/// Fill an interleaved device buffer of `channels` channels from `player`.
///
/// Renders through stack planes one engine buffer at a time. Channel 0 gets
/// the left plane, channel 1 the right, any further channels silence; a mono
/// device gets the left plane only.
pub fn interleave(player: &Player, data: &mut [f32], channels: usize) {
    if channels == 0 {
        return;
    }
    let mut left = [0.0f32; MAX_BUFFER_SAMPLES];
    let mut right = [0.0f32; MAX_BUFFER_SAMPLES];

    for block in data.chunks_mut(MAX_BUFFER_SAMPLES * channels) {
        let frames = block.len() / channels;
        player.work_stereo(&mut left[..frames], &mut right[..frames]);
        for (i, frame) in block.chunks_mut(channels).enumerate() {
            for (c, sample) in frame.iter_mut().enumerate() {
                *sample = match c {
                    0 if i < frames => left[i],
                    1 if i < frames => right[i],
                    _ => 0.0,
                };
            }
        }
    }
}
