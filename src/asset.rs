//! Audio asset loading.
//!
//! Decodes the player's audio file into [`PcmData`]. RIFF/WAVE goes through
//! `hound`; any other container is probed and decoded with `symphonia`.
//! Failures are mapped to the native media error code a browser would
//! raise, so a missing or broken asset reaches the listener through the
//! normal error path.

use std::io::{Cursor, ErrorKind};
use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavReader};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::config::PlayerConfig;
use crate::error::AssetError;
use crate::media::{PcmData, PcmMedia};

/// Resolve the configured asset against a site's public directory.
pub fn asset_path(public_dir: &Path, config: &PlayerConfig) -> PathBuf {
    public_dir.join(config.asset_path.trim_start_matches('/'))
}

/// Decode an audio file into interleaved f32 PCM.
pub fn load_audio<P: AsRef<Path>>(path: P) -> Result<PcmData, AssetError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(AssetError::NotFound(path.display().to_string()));
    }
    let bytes = std::fs::read(path)?;
    let extension = path.extension().and_then(|e| e.to_str());
    decode_audio_bytes(bytes, extension)
}

/// Decode audio bytes already in memory. `extension` is only a hint; the
/// container is sniffed from the data.
pub fn decode_audio_bytes(bytes: Vec<u8>, extension: Option<&str>) -> Result<PcmData, AssetError> {
    if is_wave(&bytes) {
        decode_wav(&bytes)
    } else {
        decode_probed(bytes, extension)
    }
}

fn is_wave(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WAVE"
}

fn decode_wav(bytes: &[u8]) -> Result<PcmData, AssetError> {
    let reader = WavReader::new(bytes).map_err(|e| AssetError::Unrecognized(e.to_string()))?;
    let spec = reader.spec();
    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float if spec.bits_per_sample == 32 => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>()?,
        SampleFormat::Int if (8..=32).contains(&spec.bits_per_sample) => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<Vec<_>, _>>()?
        }
        SampleFormat::Float => {
            return Err(AssetError::UnsupportedFormat {
                bits: spec.bits_per_sample,
                format: "float",
            });
        }
        SampleFormat::Int => {
            return Err(AssetError::UnsupportedFormat {
                bits: spec.bits_per_sample,
                format: "int",
            });
        }
    };

    log::debug!(
        "decoded {} frames, {} ch @ {} Hz (wav)",
        samples.len() / spec.channels.max(1) as usize,
        spec.channels,
        spec.sample_rate
    );
    Ok(PcmData::new(samples, spec.channels as usize, spec.sample_rate as f64))
}

fn decode_probed(bytes: Vec<u8>, extension: Option<&str>) -> Result<PcmData, AssetError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());
    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| AssetError::Unrecognized(e.to_string()))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AssetError::Unrecognized("no audio track".into()))?;
    let track_id = track.id;
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AssetError::Unrecognized(e.to_string()))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut layout: Option<(usize, f64)> = None;
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(stream_error(e, layout.is_some())),
        };
        if packet.track_id() != track_id {
            continue;
        }
        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buf.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buf.samples());
                layout.get_or_insert((spec.channels.count(), spec.rate as f64));
            }
            Err(SymphoniaError::DecodeError(e)) => log::warn!("skipping corrupt packet: {e}"),
            Err(e) => return Err(stream_error(e, layout.is_some())),
        }
    }

    let Some((channels, sample_rate)) = layout else {
        return Err(AssetError::Unrecognized("no audio decoded".into()));
    };
    log::debug!(
        "decoded {} frames, {} ch @ {} Hz",
        samples.len() / channels.max(1),
        channels,
        sample_rate
    );
    Ok(PcmData::new(samples, channels, sample_rate))
}

/// A stream that breaks before producing audio was never playable.
fn stream_error(e: SymphoniaError, decoded_any: bool) -> AssetError {
    if decoded_any {
        AssetError::Decode(e)
    } else {
        AssetError::Unrecognized(e.to_string())
    }
}

/// Open the player's media element from a file.
///
/// Never fails: a load error yields an element already in the error state,
/// carrying the classified code.
pub fn open_media<P: AsRef<Path>>(path: P) -> PcmMedia {
    match load_audio(path.as_ref()) {
        Ok(data) => PcmMedia::with_data(data),
        Err(e) => {
            log::error!("failed to load {}: {e}", path.as_ref().display());
            PcmMedia::failed(Some(e.media_code()))
        }
    }
}
