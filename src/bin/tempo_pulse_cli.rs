// Headless metronome: clicks through an output device and logs each beat

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use clap::Parser;
use tempo_pulse::audio::device::AudioDeviceManager;
use tempo_pulse::audio::engine::CpalClockProvider;
use tempo_pulse::audio::parameters::ClickVolume;
use tempo_pulse::config::MetronomeConfig;
use tempo_pulse::messaging::channels::create_notification_channel;
use tempo_pulse::sequencer::{LogVisuals, MetronomeSession, Subdivision};

#[derive(Parser, Debug)]
#[command(name = "tempo_pulse_cli")]
#[command(version, about = "Headless look-ahead metronome", long_about = None)]
struct CliArgs {
    /// Tempo in BPM (clamped to the range, snapped to the step size)
    #[arg(long)]
    bpm: Option<u32>,

    /// Clicks per beat: 1, 2 or 4
    #[arg(long, value_parser = parse_subdivision)]
    subdivision: Option<Subdivision>,

    /// Lower tempo bound
    #[arg(long)]
    min: Option<u32>,

    /// Upper tempo bound
    #[arg(long)]
    max: Option<u32>,

    /// Stop after this many seconds (runs until killed otherwise)
    #[arg(long)]
    seconds: Option<u64>,

    /// Output device name (overrides the config file)
    #[arg(long)]
    device: Option<String>,

    /// Print the available output devices and exit
    #[arg(long)]
    list_devices: bool,
}

fn parse_subdivision(value: &str) -> Result<Subdivision, String> {
    let count: u32 = value
        .parse()
        .map_err(|_| format!("'{}' is not a number", value))?;
    Subdivision::from_count(count).ok_or_else(|| format!("must be 1, 2 or 4, got {}", count))
}

/// None when the run is unbounded or the deadline does not fit in an Instant
fn run_deadline(start: Instant, seconds: Option<u64>) -> Option<Instant> {
    seconds.and_then(|s| start.checked_add(Duration::from_secs(s)))
}

fn list_devices() {
    let devices = AudioDeviceManager::new().list_output_devices();
    if devices.is_empty() {
        println!("No output devices found");
        return;
    }
    for device in devices {
        let marker = if device.is_default { " (default)" } else { "" };
        println!("{}: {}{}", device.id, device.name, marker);
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = CliArgs::parse();

    if args.list_devices {
        list_devices();
        return;
    }

    let config = MetronomeConfig::load().unwrap_or_else(|e| {
        log::warn!("Invalid config, using defaults: {}", e);
        MetronomeConfig::default()
    });

    let (notification_tx, _notification_rx) = create_notification_channel(64);
    let provider = CpalClockProvider::new(
        args.device.clone().or_else(|| config.audio.device.clone()),
        ClickVolume::new(config.audio.volume),
        Arc::new(Mutex::new(notification_tx)),
    );

    let mut session = MetronomeSession::with_transport(
        config.transport_state(),
        provider,
        LogVisuals,
        config.scheduler_timing(),
    );

    if args.min.is_some() || args.max.is_some() {
        let (min, max) = session.transport().range();
        session.set_range(args.min.unwrap_or(min), args.max.unwrap_or(max));
    }
    if let Some(subdivision) = args.subdivision {
        session.set_subdivision(subdivision);
    }
    if let Some(bpm) = args.bpm {
        session.set_tempo(bpm);
    }

    if !session.start() {
        if let Some(e) = session.scheduler().last_error() {
            log::error!("Could not start: {}", e);
        }
        std::process::exit(1);
    }

    log::info!(
        "Clicking at {} BPM ({})",
        session.transport().tempo(),
        session.transport().subdivision()
    );

    let deadline = run_deadline(Instant::now(), args.seconds);
    if args.seconds.is_some() && deadline.is_none() {
        log::warn!("--seconds is too large, running until interrupted");
    }

    loop {
        let now = Instant::now();
        if deadline.is_some_and(|d| now >= d) {
            break;
        }

        session.poll(now);

        let Some(wait) = session.time_until_next_poll(Instant::now()) else {
            if let Some(e) = session.scheduler().last_error() {
                log::error!("Stopped: {}", e);
            }
            break;
        };
        std::thread::sleep(wait);
    }

    session.stop();
    log::info!("Stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_all_flags() {
        let args = CliArgs::try_parse_from([
            "tempo_pulse_cli",
            "--bpm",
            "120",
            "--subdivision",
            "4",
            "--min",
            "60",
            "--max",
            "200",
            "--seconds",
            "30",
        ])
        .unwrap();

        assert_eq!(args.bpm, Some(120));
        assert_eq!(args.subdivision, Some(Subdivision::Sixteenth));
        assert_eq!(args.min, Some(60));
        assert_eq!(args.max, Some(200));
        assert_eq!(args.seconds, Some(30));
        assert!(!args.list_devices);
    }

    #[test]
    fn test_bpm_beyond_u32_is_rejected() {
        // 2^32 + 120 used to wrap to 120
        let result = CliArgs::try_parse_from(["tempo_pulse_cli", "--bpm", "4294967416"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_subdivision_is_rejected() {
        let result = CliArgs::try_parse_from(["tempo_pulse_cli", "--subdivision", "3"]);
        assert!(result.is_err());

        let result = CliArgs::try_parse_from(["tempo_pulse_cli", "--subdivision", "eighth"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_flag_is_rejected() {
        let result = CliArgs::try_parse_from(["tempo_pulse_cli", "--tempo", "100"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_huge_duration_has_no_deadline() {
        let now = Instant::now();
        assert_eq!(run_deadline(now, None), None);
        assert_eq!(run_deadline(now, Some(u64::MAX)), None);
        assert_eq!(
            run_deadline(now, Some(5)),
            Some(now + Duration::from_secs(5))
        );
    }
}
