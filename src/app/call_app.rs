use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use eframe::{App, Frame, egui};

use crate::app::{
    utils::{show_video, update_texture},
    view_model::{PrimaryAction, ViewModel},
};
use crate::call::{CallClient, CallEvent};
use crate::log::{LogSink, Logger};
use crate::media::{
    AudioOutput, LocalStream, MediaDevices, NullAudioOutput, TestPatternDevices,
    capture_local_stream,
};
use crate::negotiation::UdpNegotiatorFactory;
use crate::settings::{MediaSource, Settings};
use crate::signaling_client::SignalingClient;
use crate::{logger_error, logger_info, logger_warn};

const MAX_UI_LOGS: usize = 256;
const VIDEO_W: f32 = 320.0;
const VIDEO_H: f32 = 240.0;

/// Desktop window for placing and answering calls.
pub struct CallApp {
    settings: Settings,
    logger: Logger,
    log: Arc<dyn LogSink>,
    local_stream: Option<LocalStream>,
    speaker: Box<dyn AudioOutput>,
    client: Option<CallClient<SignalingClient>>,

    target_text: String,
    status_line: String,
    ui_logs: VecDeque<String>,

    local_texture: Option<egui::TextureHandle>,
    remote_texture: Option<egui::TextureHandle>,
}

impl CallApp {
    /// Captures local media once and connects to the relay.
    pub fn new(_cc: &eframe::CreationContext<'_>, settings: Settings, logger: Logger) -> Self {
        let log: Arc<dyn LogSink> = Arc::new(logger.handle());
        let mut devices = open_devices(&settings);
        let local_stream = capture_local_stream(devices.as_mut(), &settings.constraints, &log);
        let speaker = open_speaker(&log);

        let mut app = Self {
            settings,
            logger,
            log,
            local_stream,
            speaker,
            client: None,
            target_text: String::new(),
            status_line: "Starting.".into(),
            ui_logs: VecDeque::with_capacity(MAX_UI_LOGS),
            local_texture: None,
            remote_texture: None,
        };
        let notice = match &app.local_stream {
            None => Some("No capture: calls will carry no outgoing media."),
            Some(s) if !s.has_video() => Some("No camera: calls will carry audio only."),
            Some(s) if !s.has_audio() => Some("No microphone: calls will carry video only."),
            Some(_) => None,
        };
        if let Some(line) = notice {
            app.push_log(line);
        }
        app.connect();
        app
    }

    fn connect(&mut self) {
        match SignalingClient::connect(&self.settings.server_addr, self.log.clone()) {
            Ok(channel) => {
                let factory = UdpNegotiatorFactory::new(self.settings.link, self.log.clone());
                self.client = Some(CallClient::new(
                    channel,
                    Box::new(factory),
                    self.local_stream.clone(),
                    self.settings.display_name.clone(),
                    self.log.clone(),
                ));
                self.status_line = format!("Connected to {}.", self.settings.server_addr);
                logger_info!(self.logger, "connected to relay {}", self.settings.server_addr);
            }
            Err(e) => {
                self.status_line = format!("Relay {} unreachable: {e}", self.settings.server_addr);
                logger_error!(self.logger, "relay {} unreachable: {}", self.settings.server_addr, e);
            }
        }
    }

    fn push_log<T: Into<String>>(&mut self, s: T) {
        if self.ui_logs.len() == MAX_UI_LOGS {
            self.ui_logs.pop_front();
        }
        self.ui_logs.push_back(s.into());
    }

    fn apply_events(&mut self, events: Vec<CallEvent>) {
        for ev in events {
            match ev {
                CallEvent::IdentityAssigned(id) => self.status_line = format!("Your id is {id}."),
                CallEvent::IncomingCall { name, .. } => {
                    self.status_line = format!("{name} is calling.");
                }
                CallEvent::InviteSent { target } => {
                    self.status_line = format!("Calling {target}…");
                }
                CallEvent::Accepted | CallEvent::RemoteStreamStarted => {
                    self.status_line = "In call.".into();
                }
                CallEvent::Ended => self.status_line = "Call ended.".into(),
                CallEvent::SignalingLost => self.status_line = "Lost connection to the relay.".into(),
                CallEvent::Error(e) => self.status_line = format!("Error: {e}"),
                CallEvent::InviteDropped { .. } | CallEvent::AcceptanceSent { .. } => {}
            }
        }
    }

    fn run_action(&mut self, action: Action) {
        let Some(client) = self.client.as_mut() else {
            return;
        };
        let result = match action {
            Action::Call => client.call_user(self.target_text.trim()),
            Action::Answer => client.answer_call(),
            Action::Leave => client.leave_call(),
        };
        if let Err(e) = result {
            logger_warn!(self.logger, "{:?} failed: {}", action, e);
            self.status_line = e.to_string();
        }
    }

    fn draw_controls(&mut self, ui: &mut egui::Ui, vm: &ViewModel) {
        let mut action = None;
        ui.horizontal(|ui| {
            ui.label("Call id:");
            ui.add(
                egui::TextEdit::singleline(&mut self.target_text)
                    .hint_text("Paste the id to call…")
                    .desired_width(220.0),
            );
            match vm.primary_action {
                PrimaryAction::EndCall => {
                    if ui.button("End Call").clicked() {
                        action = Some(Action::Leave);
                    }
                }
                PrimaryAction::Call => {
                    let enabled = vm.signaling_connected && !vm.can_cancel;
                    if ui.add_enabled(enabled, egui::Button::new("Call")).clicked() {
                        action = Some(Action::Call);
                    }
                    if vm.can_cancel && ui.button("Cancel").clicked() {
                        action = Some(Action::Leave);
                    }
                }
            }
        });

        if vm.show_answer_prompt {
            ui.horizontal(|ui| {
                let who = vm.caller_name.as_deref().unwrap_or("Someone");
                ui.strong(format!("{who} is calling..."));
                if ui.button("Answer").clicked() {
                    action = Some(Action::Answer);
                }
            });
        }
        if let Some(a) = action {
            self.run_action(a);
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Action {
    Call,
    Answer,
    Leave,
}

fn open_devices(settings: &Settings) -> Box<dyn MediaDevices> {
    match settings.media_source {
        MediaSource::TestPattern => Box::new(TestPatternDevices::new()),
        #[cfg(feature = "opencv-camera")]
        MediaSource::Camera => Box::new(crate::media::CameraDevices::new(settings.camera_device)),
        #[cfg(not(feature = "opencv-camera"))]
        MediaSource::Camera => Box::new(TestPatternDevices::failing(
            crate::media::MediaError::NoDevice,
        )),
    }
}

#[cfg(feature = "cpal-audio")]
fn open_speaker(log: &Arc<dyn LogSink>) -> Box<dyn AudioOutput> {
    match crate::media::SpeakerOutput::open(log.clone()) {
        Ok(speaker) => Box::new(speaker),
        Err(e) => {
            crate::sink_warn!(log, "no speaker, peer audio is discarded: {}", e);
            Box::new(NullAudioOutput::new())
        }
    }
}

#[cfg(not(feature = "cpal-audio"))]
fn open_speaker(log: &Arc<dyn LogSink>) -> Box<dyn AudioOutput> {
    crate::sink_info!(log, "built without cpal-audio, peer audio is discarded");
    Box::new(NullAudioOutput::new())
}

impl App for CallApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        while let Some(line) = self.logger.try_recv_ui() {
            self.push_log(line);
        }
        let events = self.client.as_mut().map(CallClient::poll).unwrap_or_default();
        self.apply_events(events);

        let Some(vm) = self.client.as_ref().map(ViewModel::from_client) else {
            egui::CentralPanel::default().show(ctx, |ui| {
                ui.heading("PeerCall");
                ui.label(&self.status_line);
                if ui.button("Retry").clicked() {
                    self.connect();
                }
            });
            ctx.request_repaint_after(Duration::from_millis(250));
            return;
        };

        let local = self.local_stream.as_ref().and_then(LocalStream::latest_frame);
        update_texture(ctx, &mut self.local_texture, "local", local.as_ref());
        let remote = if vm.show_remote_video {
            self.client
                .as_ref()
                .and_then(CallClient::remote_stream)
                .and_then(|r| r.latest_frame())
        } else {
            self.remote_texture = None;
            None
        };
        update_texture(ctx, &mut self.remote_texture, "remote", remote.as_ref());

        let heard = self
            .client
            .as_ref()
            .and_then(CallClient::remote_stream)
            .map(|r| r.take_audio())
            .unwrap_or_default();
        if !heard.is_empty() {
            self.speaker.play(heard);
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.heading("PeerCall");
            });
            ui.horizontal(|ui| {
                ui.label("Your id:");
                match vm.own_id.as_deref() {
                    Some(id) => {
                        ui.monospace(id);
                        if ui.small_button("Copy").clicked() {
                            ui.output_mut(|o| o.copied_text = id.to_owned());
                        }
                    }
                    None => {
                        ui.weak("waiting for the relay…");
                    }
                }
                ui.separator();
                ui.label(format!("State: {}", vm.state_label));
            });
            ui.separator();

            ui.horizontal(|ui| {
                ui.vertical(|ui| {
                    ui.label(format!("You ({})", self.settings.display_name));
                    let tex = if vm.show_local_video {
                        self.local_texture.as_ref()
                    } else {
                        None
                    };
                    show_video(ui, tex, VIDEO_W, VIDEO_H, "no camera");
                });
                ui.vertical(|ui| {
                    ui.label(vm.caller_name.as_deref().unwrap_or("Peer"));
                    let tex = if vm.show_remote_video {
                        self.remote_texture.as_ref()
                    } else {
                        None
                    };
                    show_video(ui, tex, VIDEO_W, VIDEO_H, "no call");
                });
            });
            ui.separator();

            self.draw_controls(ui, &vm);

            ui.separator();
            ui.label("Logs:");
            egui::ScrollArea::vertical()
                .stick_to_bottom(true)
                .max_height(160.0)
                .show(ui, |ui| {
                    for line in &self.ui_logs {
                        ui.monospace(line);
                    }
                });
            ui.separator();
            ui.label(&self.status_line);
        });

        // frames keep arriving from other threads
        ctx.request_repaint_after(Duration::from_millis(33));
    }
}
