// Integration test: click timing properties of the look-ahead scheduler
//
// Every assertion is made against the timestamps handed to the audio clock,
// recorded by the offline clock, never against wall-clock call times.

use std::time::{Duration, Instant};

use tempo_pulse::audio::AudioClock;
use tempo_pulse::audio::offline::{OfflineClockProvider, RecordedClick};
use tempo_pulse::sequencer::{
    Accent, MetronomeSession, NoVisuals, SchedulerTiming, StepSize, Subdivision, BEATS_PER_BAR,
};

type Session = MetronomeSession<OfflineClockProvider, NoVisuals>;

const EPSILON: f64 = 1e-9;

fn session() -> Session {
    MetronomeSession::new(
        OfflineClockProvider::new(),
        NoVisuals,
        SchedulerTiming::default(),
    )
}

/// Advance the audio clock in lookahead-sized steps and service the timer after each step
fn run_for(session: &mut Session, seconds: f64) {
    let step = session.scheduler().timing().lookahead.as_secs_f64();
    let steps = (seconds / step).round() as usize;
    for _ in 0..steps {
        if let Some(clock) = session.scheduler_mut().clock_mut() {
            clock.advance(step);
        }
        // Far future: whatever is armed is due
        session.poll(Instant::now() + Duration::from_secs(3600));
    }
}

fn clicks(session: &Session) -> Vec<RecordedClick> {
    session
        .scheduler()
        .clock()
        .map(|clock| clock.clicks().to_vec())
        .unwrap_or_default()
}

#[test]
fn test_spacing_matches_tempo_and_subdivision() {
    for tempo in [40, 97, 120, 300] {
        for subdivision in Subdivision::ALL {
            let mut session = session();
            session.set_range(40, 300);
            session.set_step_size(StepSize::One);
            assert_eq!(session.set_tempo(tempo), tempo);
            session.set_subdivision(subdivision);

            session.start();
            run_for(&mut session, 4.0);

            let clicks = clicks(&session);
            assert!(clicks.len() >= 3, "too few clicks at {} BPM", tempo);

            let expected = (60.0 / tempo as f64) / subdivision.count() as f64;
            for pair in clicks.windows(2) {
                let spacing = pair[1].at - pair[0].at;
                assert!(
                    (spacing - expected).abs() < EPSILON,
                    "{} BPM {}: spacing {} != {}",
                    tempo,
                    subdivision,
                    spacing,
                    expected
                );
            }
        }
    }
}

#[test]
fn test_120_bpm_quarter_example() {
    let mut session = session();
    session.set_tempo(120);
    session.start();
    run_for(&mut session, 2.0);

    let clicks = clicks(&session);
    let accents: Vec<Accent> = clicks.iter().take(4).map(|c| c.accent).collect();
    assert_eq!(
        accents,
        vec![Accent::Bar, Accent::Beat, Accent::Beat, Accent::Beat]
    );
    for (i, click) in clicks.iter().take(4).enumerate() {
        assert!((click.at - (0.1 + 0.5 * i as f64)).abs() < EPSILON);
    }
}

#[test]
fn test_bar_accent_once_per_bar() {
    for subdivision in Subdivision::ALL {
        let mut session = session();
        session.set_tempo(120);
        session.set_subdivision(subdivision);
        session.start();
        run_for(&mut session, 10.0);

        let clicks = clicks(&session);
        let per_bar = (BEATS_PER_BAR * subdivision.count()) as usize;

        for (i, click) in clicks.iter().enumerate() {
            let expected = if i % per_bar == 0 {
                Accent::Bar
            } else if i % subdivision.count() as usize == 0 {
                Accent::Beat
            } else {
                Accent::SubStep
            };
            assert_eq!(click.accent, expected, "click {} with {}", i, subdivision);
        }
    }
}

#[test]
fn test_tempo_change_is_not_retroactive() {
    let mut session = session();
    session.set_tempo(120);
    session.start();
    run_for(&mut session, 1.0);

    let before = clicks(&session);
    let pending_time = session.scheduler().position().unwrap().next_event_time;

    session.set_tempo(60);
    run_for(&mut session, 3.0);

    let after = clicks(&session);
    // Clicks emitted before the change are untouched
    for (old, new) in before.iter().zip(after.iter()) {
        assert_eq!(old, new);
    }

    // The already-computed next click keeps its time, then spacing switches to 1s
    let first_new = &after[before.len()];
    assert!((first_new.at - pending_time).abs() < EPSILON);
    for pair in after[before.len()..].windows(2) {
        assert!((pair[1].at - pair[0].at - 1.0).abs() < EPSILON);
    }
}

#[test]
fn test_stop_then_start_resets_position() {
    let mut session = session();
    session.set_subdivision(Subdivision::Eighth);
    session.start();
    run_for(&mut session, 1.3);

    session.stop();
    assert!(session.start());

    let now = session.scheduler().clock().unwrap().now();
    let position = session.scheduler().position().unwrap();
    assert_eq!(position.sub_step, 0);
    assert_eq!(position.beat_in_bar, 0);
    assert!(position.next_event_time >= now);
}

#[test]
fn test_redundant_transitions_change_nothing() {
    let mut session = session();

    session.stop();
    assert!(!session.is_playing());
    assert_eq!(session.scheduler().pending_timer(), None);

    session.start();
    let pending = session.scheduler().pending_timer();
    let position = session.scheduler().position();

    session.start();
    assert_eq!(session.scheduler().pending_timer(), pending);
    assert_eq!(session.scheduler().position(), position);
}

#[test]
fn test_unavailable_audio_fails_closed_then_recovers() {
    let mut session = MetronomeSession::new(
        OfflineClockProvider::unavailable(),
        NoVisuals,
        SchedulerTiming::default(),
    );

    assert!(!session.start());
    assert!(!session.is_playing());
    assert!(session.scheduler().last_error().is_some());
    assert_eq!(session.time_until_next_poll(Instant::now()), None);

    session.scheduler_mut().provider_mut().set_available(true);
    assert!(session.toggle());
    assert!(session.scheduler().last_error().is_none());
}
