use std::sync::{Arc, Mutex};

use tempo_pulse::audio::engine::CpalClockProvider;
use tempo_pulse::audio::parameters::ClickVolume;
use tempo_pulse::config::MetronomeConfig;
use tempo_pulse::messaging::channels::create_notification_channel;
use tempo_pulse::messaging::notification::{Notification, NotificationCategory};
use tempo_pulse::sequencer::MetronomeSession;
use tempo_pulse::ui::app::MetronomeApp;
use tempo_pulse::ui::indicators::Indicators;

const NOTIFICATION_RINGBUFFER_CAPACITY: usize = 64;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Tempo Pulse {}", env!("CARGO_PKG_VERSION"));

    // Create notification channel (audio errors → status bar)
    let (notification_tx, notification_rx) =
        create_notification_channel(NOTIFICATION_RINGBUFFER_CAPACITY);
    let notification_tx = Arc::new(Mutex::new(notification_tx));

    let config = match MetronomeConfig::load() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid config, using defaults: {}", e);
            if let Ok(mut tx) = notification_tx.lock() {
                let _ = ringbuf::traits::Producer::try_push(
                    &mut *tx,
                    Notification::warning(
                        NotificationCategory::Config,
                        format!("Invalid config, using defaults: {}", e),
                    ),
                );
            }
            MetronomeConfig::default()
        }
    };

    let volume = ClickVolume::new(config.audio.volume);
    let provider =
        CpalClockProvider::new(config.audio.device.clone(), volume.clone(), notification_tx);

    let session = MetronomeSession::with_transport(
        config.transport_state(),
        provider,
        Indicators::new(config.pulse_duration()),
        config.scheduler_timing(),
    );

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([520.0, 420.0])
            .with_title("Tempo Pulse"),
        ..Default::default()
    };

    let scale_label_count = config.scale_label_count();
    if let Err(e) = eframe::run_native(
        "Tempo Pulse",
        native_options,
        Box::new(move |_cc| {
            Ok(Box::new(MetronomeApp::new(
                session,
                volume,
                scale_label_count,
                notification_rx,
            )))
        }),
    ) {
        log::error!("UI error: {}", e);
    }
}
