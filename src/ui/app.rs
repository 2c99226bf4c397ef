// Main UI App - egui front-end of the metronome session

use crate::audio::AudioClock;
use crate::audio::click::ClickSound;
use crate::audio::device::{AudioDeviceInfo, AudioDeviceManager};
use crate::audio::engine::CpalClockProvider;
use crate::audio::parameters::ClickVolume;
use crate::audio::status::DeviceStatus;
use crate::messaging::channels::NotificationConsumer;
use crate::messaging::notification::{Notification, NotificationCategory, NotificationLevel};
use crate::sequencer::session::MetronomeSession;
use crate::sequencer::timeline::{Accent, Subdivision, BEATS_PER_BAR};
use crate::ui::indicators::Indicators;
use eframe::egui;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

pub type AppSession = MetronomeSession<CpalClockProvider, Indicators>;

pub struct MetronomeApp {
    session: AppSession,
    volume: ClickVolume,
    volume_ui: f32,
    tempo_ui: u32,
    scale_label_count: usize,
    // Audio clock is opened on the first user gesture
    primed: bool,
    output_devices: Vec<AudioDeviceInfo>,
    // Notification system
    notification_rx: NotificationConsumer,
    notification_queue: VecDeque<Notification>,
    max_notifications: usize,
}

impl MetronomeApp {
    pub fn new(
        session: AppSession,
        volume: ClickVolume,
        scale_label_count: usize,
        notification_rx: NotificationConsumer,
    ) -> Self {
        let tempo_ui = session.transport().tempo();
        let volume_ui = volume.get();

        Self {
            session,
            volume,
            volume_ui,
            tempo_ui,
            scale_label_count,
            primed: false,
            output_devices: AudioDeviceManager::new().list_output_devices(),
            notification_rx,
            notification_queue: VecDeque::new(),
            max_notifications: 10,
        }
    }

    /// Read new notifications from the ringbuffer into the queue
    fn update_notifications(&mut self) {
        while let Some(notification) = ringbuf::traits::Consumer::try_pop(&mut self.notification_rx)
        {
            self.push_notification(notification);
        }
    }

    fn push_notification(&mut self, notification: Notification) {
        self.notification_queue.push_back(notification);
        if self.notification_queue.len() > self.max_notifications {
            self.notification_queue.pop_front();
        }
    }

    /// Notifications younger than 5 seconds, newest first
    fn get_recent_notifications(&self) -> Vec<&Notification> {
        self.notification_queue
            .iter()
            .rev()
            .filter(|n| n.is_recent(5000))
            .take(3)
            .collect()
    }

    fn toggle(&mut self) {
        if self.session.toggle() {
            return;
        }

        self.session.visuals_mut().clear();
        if let Some(error) = self.session.scheduler().last_error().cloned() {
            self.push_notification(Notification::error(
                NotificationCategory::Transport,
                format!("Could not start: {}", error),
            ));
        }
    }

    /// Pause the output stream while stopped and the window is in the
    /// background, once the last click has rung out. The next start resumes it.
    fn suspend_when_hidden(&mut self, ctx: &egui::Context) {
        if self.session.is_playing() {
            return;
        }
        let hidden = ctx.input(|i| {
            let viewport = i.viewport();
            viewport.focused == Some(false) || viewport.minimized == Some(true)
        });
        if !hidden {
            return;
        }

        let last_click = self.session.scheduler().last_click_time();
        let Some(clock) = self.session.scheduler_mut().clock_mut() else {
            return;
        };
        if clock.is_suspended() {
            return;
        }

        if let Some(remaining) = ring_out_remaining(clock.now(), last_click) {
            ctx.request_repaint_after(remaining);
            return;
        }
        if let Err(e) = clock.suspend() {
            log::warn!("Could not suspend audio output: {}", e);
        }
    }

    fn sync_tempo_ui(&mut self) {
        self.tempo_ui = self.session.transport().tempo();
    }

    fn handle_keyboard(&mut self, ctx: &egui::Context) {
        let (space, up, down) = ctx.input(|i| {
            (
                i.key_pressed(egui::Key::Space),
                i.key_pressed(egui::Key::ArrowUp),
                i.key_pressed(egui::Key::ArrowDown),
            )
        });

        // A focused widget (the start button) already reacts to Space itself
        let widget_focused = ctx.memory(|m| m.focused().is_some());
        if space_toggles(space, widget_focused) {
            self.toggle();
        }
        if up {
            self.session.nudge_tempo(1);
            self.sync_tempo_ui();
        }
        if down {
            self.session.nudge_tempo(-1);
            self.sync_tempo_ui();
        }
    }

    fn draw_tempo(&mut self, ui: &mut egui::Ui) {
        let transport = self.session.transport();
        let (range_min, range_max) = transport.range();
        let step = transport.step_size();

        ui.vertical_centered(|ui| {
            ui.label(
                egui::RichText::new(format!("{}", transport.tempo()))
                    .size(56.0)
                    .strong(),
            );
            ui.label("BPM");
        });

        ui.add_space(8.0);

        ui.horizontal(|ui| {
            if ui.button("−").on_hover_text("Slower (↓)").clicked() {
                self.session.nudge_tempo(-1);
                self.sync_tempo_ui();
            }

            let slider = egui::Slider::new(&mut self.tempo_ui, range_min..=range_max)
                .step_by(step.bpm() as f64)
                .show_value(false);
            if ui.add(slider).changed() {
                self.session.set_tempo(self.tempo_ui);
                self.sync_tempo_ui();
            }

            if ui.button("+").on_hover_text("Faster (↑)").clicked() {
                self.session.nudge_tempo(1);
                self.sync_tempo_ui();
            }

            let pill = ui
                .button(format!("± {}", step))
                .on_hover_text("Step size (right click: previous)");
            if pill.clicked() {
                self.session.cycle_step_size(1);
                self.sync_tempo_ui();
            } else if pill.secondary_clicked() {
                self.session.cycle_step_size(-1);
                self.sync_tempo_ui();
            }
        });

        // Scale under the slider
        let labels = self.session.transport().scale_labels(self.scale_label_count);
        ui.horizontal(|ui| {
            for label in labels {
                ui.small(label.to_string());
                ui.add_space(24.0);
            }
        });
    }

    fn draw_range(&mut self, ui: &mut egui::Ui) {
        let (mut range_min, mut range_max) = self.session.transport().range();
        let min_options = self.session.transport().range_min_options();
        let max_options = self.session.transport().range_max_options();

        ui.horizontal(|ui| {
            ui.label("Range:");
            egui::ComboBox::from_id_salt("range_min_selector")
                .selected_text(range_min.to_string())
                .show_ui(ui, |ui| {
                    for option in min_options {
                        ui.selectable_value(&mut range_min, option, option.to_string());
                    }
                });
            ui.label("to");
            egui::ComboBox::from_id_salt("range_max_selector")
                .selected_text(range_max.to_string())
                .show_ui(ui, |ui| {
                    for option in max_options {
                        ui.selectable_value(&mut range_max, option, option.to_string());
                    }
                });
        });

        if (range_min, range_max) != self.session.transport().range() {
            self.session.set_range(range_min, range_max);
            self.sync_tempo_ui();
        }
    }

    fn draw_subdivision(&mut self, ui: &mut egui::Ui) {
        let current = self.session.transport().subdivision();
        ui.horizontal(|ui| {
            ui.label("Subdivision:");
            for subdivision in Subdivision::ALL {
                if ui
                    .selectable_label(current == subdivision, subdivision.label())
                    .clicked()
                {
                    self.session.set_subdivision(subdivision);
                }
            }
        });
    }

    fn draw_output_device(&mut self, ui: &mut egui::Ui) {
        let current = self
            .session
            .scheduler()
            .provider()
            .device_name()
            .map(str::to_string);
        let mut selected = current.clone();

        ui.horizontal(|ui| {
            ui.label("Output:");
            egui::ComboBox::from_id_salt("output_device_selector")
                .selected_text(selected.as_deref().unwrap_or("System default"))
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut selected, None, "System default");
                    for device in &self.output_devices {
                        let label = if device.is_default {
                            format!("{} (default)", device.name)
                        } else {
                            device.name.clone()
                        };
                        ui.selectable_value(&mut selected, Some(device.name.clone()), label);
                    }
                });
            if ui.small_button("⟳").on_hover_text("Rescan devices").clicked() {
                self.output_devices = AudioDeviceManager::new().list_output_devices();
            }
        });

        if selected != current {
            self.switch_output_device(selected);
        }
    }

    /// Reopen the audio clock on another device, keeping the transport running
    fn switch_output_device(&mut self, device_name: Option<String>) {
        let was_playing = self.session.is_playing();
        log::info!(
            "Switching output device to {}",
            device_name.as_deref().unwrap_or("system default")
        );

        let scheduler = self.session.scheduler_mut();
        scheduler.release_clock();
        scheduler.provider_mut().set_device_name(device_name);

        if was_playing {
            self.toggle();
        } else if self.primed {
            self.session.prime();
        }
    }

    fn draw_indicators(&self, ui: &mut egui::Ui, now: Instant) {
        let indicators = self.session.visuals();
        let dot_radius = 10.0;

        ui.horizontal(|ui| {
            // Pulse dot: flashes on every click, colour by accent
            let (rect, _) = ui.allocate_exact_size(egui::vec2(40.0, 30.0), egui::Sense::hover());
            let color = match indicators.active_pulse(now) {
                Some(Accent::Bar) => egui::Color32::from_rgb(255, 90, 90),
                Some(Accent::Beat) => egui::Color32::from_rgb(255, 200, 80),
                Some(Accent::SubStep) => egui::Color32::from_rgb(120, 170, 255),
                None => egui::Color32::from_gray(60),
            };
            ui.painter().circle_filled(rect.center(), dot_radius + 4.0, color);

            ui.add_space(20.0);

            // Beat dots: the live beat is lit, the bar's first beat in red
            let active_beat = indicators.active_beat();
            for beat in 0..BEATS_PER_BAR {
                let (rect, _) =
                    ui.allocate_exact_size(egui::vec2(30.0, 30.0), egui::Sense::hover());
                let color = match active_beat {
                    Some((index, true)) if index == beat => egui::Color32::from_rgb(255, 90, 90),
                    Some((index, false)) if index == beat => egui::Color32::from_rgb(255, 200, 80),
                    _ => egui::Color32::from_gray(60),
                };
                ui.painter().circle_filled(rect.center(), dot_radius, color);
            }
        });
    }

    /// Status bar at the bottom of the window
    fn draw_status_bar(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let status = self.session.scheduler().provider().status().get();
            let status_color = match status {
                DeviceStatus::Connected => egui::Color32::GREEN,
                DeviceStatus::Connecting | DeviceStatus::Suspended => egui::Color32::YELLOW,
                DeviceStatus::Disconnected => egui::Color32::GRAY,
                DeviceStatus::Error => egui::Color32::RED,
            };
            ui.colored_label(status_color, "●");
            ui.label(status.label());
            ui.separator();

            let recent_notifications = self.get_recent_notifications();
            if recent_notifications.is_empty() {
                ui.label("Ready");
            } else {
                for notification in recent_notifications {
                    let (icon, color) = match notification.level {
                        NotificationLevel::Info => ("ℹ", egui::Color32::from_rgb(100, 150, 255)),
                        NotificationLevel::Warning => ("⚠", egui::Color32::from_rgb(255, 165, 0)),
                        NotificationLevel::Error => ("✖", egui::Color32::RED),
                    };

                    ui.colored_label(color, icon);
                    ui.colored_label(color, &notification.message);
                    ui.add_space(10.0);
                }
            }
        });
    }

    /// Wake the UI for the next scheduler tick or the end of the pulse flash
    fn schedule_repaint(&self, ctx: &egui::Context, now: Instant) {
        let next_poll = self.session.time_until_next_poll(now);
        let pulse_end = self.session.visuals().pulse_remaining(now);

        let wake = match (next_poll, pulse_end) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };

        if let Some(delay) = wake {
            ctx.request_repaint_after(delay.max(Duration::from_millis(1)));
        }
    }
}

impl eframe::App for MetronomeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();

        // Service the coarse timer first so clicks are queued before drawing
        self.session.poll(now);

        self.update_notifications();

        // Audio output may only open after a user gesture on some platforms
        if !self.primed && ctx.input(|i| i.pointer.any_pressed() || !i.keys_down.is_empty()) {
            self.primed = true;
            self.session.prime();
        }

        self.handle_keyboard(ctx);
        self.suspend_when_hidden(ctx);

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            self.draw_status_bar(ui);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Tempo Pulse");
            ui.separator();
            ui.add_space(10.0);

            self.draw_tempo(ui);
            ui.add_space(10.0);
            self.draw_range(ui);
            self.draw_subdivision(ui);

            ui.add_space(10.0);
            ui.separator();
            self.draw_indicators(ui, now);
            ui.add_space(10.0);

            let label = if self.session.is_playing() {
                "■ Stop"
            } else {
                "▶ Start"
            };
            if ui
                .add(egui::Button::new(label).min_size(egui::vec2(120.0, 36.0)))
                .on_hover_text("Space")
                .clicked()
            {
                self.toggle();
            }

            ui.add_space(10.0);

            // Volume control (connected to atomic parameter)
            ui.horizontal(|ui| {
                ui.label("Volume:");
                if ui.add(egui::Slider::new(&mut self.volume_ui, 0.0..=1.0)).changed() {
                    self.volume.set(self.volume_ui);
                }
            });
            self.draw_output_device(ui);
        });

        self.schedule_repaint(ctx, now);
    }
}

/// Space toggles the transport unless a widget holds keyboard focus
fn space_toggles(space_pressed: bool, widget_focused: bool) -> bool {
    space_pressed && !widget_focused
}

/// Time left until the last scheduled click has finished sounding,
/// None once it has (or when nothing was ever scheduled)
fn ring_out_remaining(audio_now: f64, last_click: Option<f64>) -> Option<Duration> {
    let click_end = last_click? + f64::from(ClickSound::CLICK_DURATION_MS) / 1000.0;
    let remaining = click_end - audio_now;
    (remaining > 0.0).then(|| Duration::from_secs_f64(remaining))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_ignored_while_widget_focused() {
        assert!(space_toggles(true, false));
        assert!(!space_toggles(true, true));
        assert!(!space_toggles(false, false));
    }

    #[test]
    fn test_nothing_scheduled_is_rung_out() {
        assert_eq!(ring_out_remaining(5.0, None), None);
    }

    #[test]
    fn test_pending_click_delays_suspend() {
        // Click still in the future: wait for it plus its tail
        let remaining = ring_out_remaining(1.0, Some(1.1)).unwrap();
        assert!((remaining.as_secs_f64() - 0.14).abs() < 1e-9);

        // Click sounding now
        assert!(ring_out_remaining(1.02, Some(1.0)).is_some());
    }

    #[test]
    fn test_finished_click_allows_suspend() {
        assert_eq!(ring_out_remaining(1.05, Some(1.0)), None);
        assert_eq!(ring_out_remaining(10.0, Some(1.0)), None);
    }
}
