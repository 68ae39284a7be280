use crate::device::DiscoveredDevice;
use crate::session::{SessionCommand, SessionStatus, SessionUpdate};
use crate::ui::device_card::{DeviceCard, EMPTY_STATE_MESSAGE};
use crate::ui::styles;
use crossbeam_channel::Receiver;
use iced::alignment::Horizontal;
use iced::widget::{button, column, container, row, scrollable, text, Space};
use iced::{Alignment, Element, Length, Subscription, Task};
use std::sync::mpsc::Sender;

#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub title: String,
    pub message: String,
}

// Iced Application State
pub struct BeaconScout {
    pub devices: Vec<DiscoveredDevice>,
    pub status: SessionStatus,
    pub alert: Option<Alert>,
    receiver: Receiver<SessionUpdate>,
    command_sender: Sender<SessionCommand>,
}

#[derive(Debug, Clone)]
pub enum Message {
    Tick,
    StartScan,
    StopScan,
    ClearResults,
    DismissAlert,
}

impl BeaconScout {
    /// Creates the screen and asks for a scan right away.
    pub fn new(
        receiver: Receiver<SessionUpdate>,
        command_sender: Sender<SessionCommand>,
    ) -> (Self, Task<Message>) {
        let app = BeaconScout {
            devices: Vec::new(),
            status: SessionStatus::Idle,
            alert: None,
            receiver,
            command_sender,
        };
        app.send(SessionCommand::Start);

        (app, Task::none())
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Tick => {
                // Process all pending updates without blocking
                while let Ok(update) = self.receiver.try_recv() {
                    self.apply(update);
                }
            }
            Message::StartScan => self.send(SessionCommand::Start),
            Message::StopScan => self.send(SessionCommand::Stop),
            Message::ClearResults => self.send(SessionCommand::Clear),
            Message::DismissAlert => self.alert = None,
        }
        Task::none()
    }

    fn apply(&mut self, update: SessionUpdate) {
        match update {
            SessionUpdate::Status(status) => {
                if let SessionStatus::Failed(reason) = &status {
                    log::error!("Scan session failed: {}", reason);
                }
                self.status = status;
            }
            SessionUpdate::Devices(devices) => {
                self.devices = devices;
            }
            SessionUpdate::Alert { title, message } => {
                self.alert = Some(Alert { title, message });
            }
        }
    }

    fn send(&self, command: SessionCommand) {
        if let Err(e) = self.command_sender.send(command) {
            log::error!("Failed to send {:?} to scan controller: {}", command, e);
        }
    }

    pub fn subscription(&self) -> Subscription<Message> {
        iced::time::every(std::time::Duration::from_millis(50)).map(|_| Message::Tick)
    }

    pub fn view(&'_ self) -> Element<'_, Message> {
        let header = text("BLE Devices Scanned:").size(24);

        let mut content = column![header, self.controls()]
            .spacing(20)
            .padding(20)
            .align_x(Horizontal::Center);

        if let Some(alert) = &self.alert {
            content = content.push(self.alert_banner(alert));
        }

        content = content.push(self.device_list());

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .style(styles::screen_style)
            .into()
    }

    fn status_label(&self) -> String {
        match &self.status {
            SessionStatus::Idle => "Idle".to_string(),
            SessionStatus::Scanning => "Scanning...".to_string(),
            SessionStatus::Stopped => "Stopped".to_string(),
            SessionStatus::PermissionsRequired => "Permissions required".to_string(),
            SessionStatus::Failed(reason) => format!("Scan failed: {}", reason),
        }
    }

    fn controls(&self) -> Element<'_, Message> {
        let toggle = if self.status == SessionStatus::Scanning {
            button(text("Stop"))
                .on_press(Message::StopScan)
                .padding(10)
                .style(styles::stop_button_style())
        } else {
            button(text("Scan for Devices"))
                .on_press(Message::StartScan)
                .padding(10)
                .style(styles::start_button_style())
        };

        let clear = button(text("Clear"))
            .on_press_maybe(if self.devices.is_empty() {
                None
            } else {
                Some(Message::ClearResults)
            })
            .padding(10);

        row![text(self.status_label()).size(16), toggle, clear]
            .spacing(10)
            .align_y(Alignment::Center)
            .into()
    }

    fn alert_banner(&self, alert: &Alert) -> Element<'_, Message> {
        let body = column![
            text(alert.title.clone()).size(18),
            text(alert.message.clone()).size(14),
        ]
        .spacing(4)
        .width(Length::Fill);

        let dismiss = button(text("OK")).on_press(Message::DismissAlert).padding(8);

        container(row![body, dismiss].spacing(10).align_y(Alignment::Center))
            .padding(12)
            .width(Length::Fill)
            .style(styles::alert_style)
            .into()
    }

    fn device_list(&self) -> Element<'_, Message> {
        if self.devices.is_empty() {
            return container(text(EMPTY_STATE_MESSAGE).size(16))
                .width(Length::Fill)
                .center_x(Length::Fill)
                .padding(20)
                .into();
        }

        let cards = self
            .devices
            .iter()
            .map(|device| device_card(DeviceCard::from_device(device)));

        scrollable(column(cards).spacing(8))
            .height(Length::Fill)
            .into()
    }
}

fn device_card<'a>(card: DeviceCard) -> Element<'a, Message> {
    let bars: Vec<Element<'a, Message>> = card
        .bars()
        .into_iter()
        .map(|filled| {
            container(Space::new(Length::Fixed(15.0), Length::Fixed(10.0)))
                .style(styles::signal_bar_style(filled))
                .into()
        })
        .collect();

    let meter = column![
        text("Signal Strength:").size(14),
        row![text(card.rssi.clone()).size(14), row(bars).spacing(5)]
            .spacing(10)
            .align_y(Alignment::Center),
    ]
    .spacing(5)
    .align_x(Horizontal::Center);

    let mut content = column![
        text(card.title.clone()).size(18),
        text(card.identity.clone()).size(14),
    ]
    .spacing(4)
    .align_x(Horizontal::Center);

    if let Some(payload) = card.payload.clone() {
        content = content.push(text(payload).size(14));
    }
    if let Some(location) = card.location.clone() {
        content = content.push(text(location).size(14));
    }
    content = content.push(text(card.last_seen.clone()).size(12)).push(meter);

    container(content)
        .padding(15)
        .width(Length::Fill)
        .style(styles::device_card_style)
        .into()
}
