//! Minimal RIFF/WAVE decoding for uploaded speech.
//!
//! Only uncompressed 16-bit PCM is accepted. Multi-channel input is averaged
//! down to mono.

use arrowbot_core::error::{ArrowError, Result};

/// Mono PCM samples in [-1.0, 1.0].
#[derive(Debug, Clone, PartialEq)]
pub struct PcmAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl PcmAudio {
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

const FORMAT_PCM: u16 = 1;

struct FormatChunk {
    format: u16,
    channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
}

fn invalid(msg: impl Into<String>) -> ArrowError {
    ArrowError::Transcription(format!("Invalid WAV data: {}", msg.into()))
}

fn u16_at(bytes: &[u8], at: usize) -> Option<u16> {
    bytes
        .get(at..at + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
}

fn u32_at(bytes: &[u8], at: usize) -> Option<u32> {
    bytes
        .get(at..at + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// Decode a 16-bit PCM WAV file.
pub fn decode_wav(bytes: &[u8]) -> Result<PcmAudio> {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(invalid("missing RIFF/WAVE header"));
    }

    let mut format: Option<FormatChunk> = None;
    let mut data: Option<&[u8]> = None;
    let mut pos = 12;

    while pos + 8 <= bytes.len() {
        let id = &bytes[pos..pos + 4];
        let size = u32_at(bytes, pos + 4).ok_or_else(|| invalid("truncated chunk header"))? as usize;
        let body_start = pos + 8;
        let body_end = body_start.saturating_add(size).min(bytes.len());
        let body = &bytes[body_start..body_end];

        match id {
            b"fmt " => {
                if body.len() < 16 {
                    return Err(invalid("fmt chunk too short"));
                }
                format = Some(FormatChunk {
                    format: u16_at(body, 0).unwrap_or_default(),
                    channels: u16_at(body, 2).unwrap_or_default(),
                    sample_rate: u32_at(body, 4).unwrap_or_default(),
                    bits_per_sample: u16_at(body, 14).unwrap_or_default(),
                });
            }
            b"data" => data = Some(body),
            _ => {}
        }

        // Chunks are padded to an even length.
        pos = body_start.saturating_add(size).saturating_add(size & 1);
    }

    let fmt = format.ok_or_else(|| invalid("no fmt chunk"))?;
    let data = data.ok_or_else(|| invalid("no data chunk"))?;

    if fmt.format != FORMAT_PCM || fmt.bits_per_sample != 16 {
        return Err(invalid(format!(
            "unsupported encoding (format {}, {} bits); expected 16-bit PCM",
            fmt.format, fmt.bits_per_sample
        )));
    }
    if fmt.channels == 0 || fmt.sample_rate == 0 {
        return Err(invalid("zero channels or sample rate"));
    }

    let channels = fmt.channels as usize;
    let frame_bytes = 2 * channels;
    let samples: Vec<f32> = data
        .chunks_exact(frame_bytes)
        .map(|frame| {
            let sum: f32 = frame
                .chunks_exact(2)
                .map(|s| i16::from_le_bytes([s[0], s[1]]) as f32 / 32768.0)
                .sum();
            sum / channels as f32
        })
        .collect();

    if samples.is_empty() {
        return Err(invalid("no audio samples"));
    }

    Ok(PcmAudio {
        samples,
        sample_rate: fmt.sample_rate,
    })
}

/// Linear-interpolation resampler. Adequate for speech going into whisper.
pub fn resample(input: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || input.is_empty() || from_rate == 0 || to_rate == 0 {
        return input.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (input.len() as f64 / ratio).ceil() as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_idx = i as f64 * ratio;
        let idx0 = (src_idx.floor() as usize).min(input.len() - 1);
        let idx1 = (idx0 + 1).min(input.len() - 1);
        let frac = (src_idx - idx0 as f64) as f32;
        output.push(input[idx0] * (1.0 - frac) + input[idx1] * frac);
    }

    output
}

#[cfg(test)]
pub(crate) fn encode_pcm16(samples: &[i16], channels: u16, sample_rate: u32) -> Vec<u8> {
    let data_len = (samples.len() * 2) as u32;
    let mut out = Vec::with_capacity(44 + data_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&FORMAT_PCM.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&(sample_rate * channels as u32 * 2).to_le_bytes());
    out.extend_from_slice(&(channels * 2).to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    for s in samples {
        out.extend_from_slice(&s.to_le_bytes());
    }
    out
}
