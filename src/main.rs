// src/main.rs
//
// Offline bounce: play an audio file through the player (rate, reverb) and
// write what it would have sounded like.

use std::path::PathBuf;

use clap::Parser;
use nowplaying::{
    AudioBuffer, ManualFrames, NowPlaying, OfflineContextProvider, PcmMedia, PlayerConfig,
    load_audio,
};

#[derive(Parser, Debug)]
#[command(name = "nowplaying-render")]
#[command(about = "Render an audio file through the now-playing player")]
#[command(version)]
struct Args {
    /// Input audio file (WAV, MP3)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output WAV file (32-bit float stereo)
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Playback rate (clamped to the configured range)
    #[arg(long, default_value = "1.0")]
    rate: f64,

    /// Enable the hall reverb
    #[arg(long)]
    reverb: bool,

    /// Reverb mix in [0, 1]
    #[arg(long)]
    mix: Option<f64>,

    /// Reverb tail in seconds
    #[arg(long)]
    tail: Option<f64>,

    /// Player configuration (JSON)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => PlayerConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => PlayerConfig::default(),
    };

    let data = load_audio(&args.input)?;
    let sample_rate = data.sample_rate;
    println!(
        "Reading {}: {} frames, {} ch @ {} Hz, {:.2}s",
        args.input.display(),
        data.frames,
        data.channels,
        sample_rate,
        data.duration()
    );
    config.sample_rate = sample_rate;

    let media = PcmMedia::with_data(data).with_time_update_interval(config.time_update_interval);
    let provider = OfflineContextProvider::new(sample_rate, config.max_block);
    let block = config.max_block;
    let mut player = NowPlaying::new(media, Box::new(provider), ManualFrames::new(), config);
    player.mount();
    player.pump_events();
    if let Some(message) = player.playback().error_message() {
        anyhow::bail!(message);
    }

    player.set_playback_rate(args.rate);
    if args.reverb {
        player.toggle_reverb();
        if let Some(mix) = args.mix {
            player.set_reverb_mix(mix);
        }
        if let Some(tail) = args.tail {
            player.set_reverb_tail(tail);
        }
    }

    player.toggle_play();
    if !player.playback().is_playing {
        anyhow::bail!("playback did not start");
    }
    log::info!(
        "rendering at rate {:.2}, reverb {}",
        player.playback().playback_rate,
        if player.reverb().enabled { "on" } else { "off" }
    );

    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: sample_rate as u32,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(&args.output, spec)?;

    // Keep rendering after the end so the reverb tail rings out.
    let ring_out = if player.reverb().enabled {
        (player.reverb().tail_seconds * sample_rate).ceil() as usize + block
    } else {
        0
    };
    let mut remaining: Option<usize> = None;
    let mut planar = vec![0.0f32; block * 2];
    let mut frames_written = 0usize;
    let mut peak = 0.0f32;

    loop {
        let mut out = AudioBuffer::new(&mut planar, 2);
        player.render(&mut out);
        peak = peak.max(out.peak());

        for i in 0..block {
            writer.write_sample(planar[i])?;
            writer.write_sample(planar[block + i])?;
        }
        frames_written += block;

        player.pump_events();
        player.animation_frame();

        if !player.playback().is_playing {
            let left = remaining.get_or_insert(ring_out);
            if *left == 0 {
                break;
            }
            *left = left.saturating_sub(block);
        }
    }

    writer.finalize()?;
    println!(
        "Wrote {}: {} frames, {:.2}s, peak {:.3}",
        args.output.display(),
        frames_written,
        frames_written as f64 / sample_rate,
        peak
    );
    Ok(())
}
