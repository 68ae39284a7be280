//! # UI Styling Module
//!
//! Centralized styling utilities for consistent UI appearance across components.

use iced::widget::{button, container};
use iced::{Background, Border, Color, Shadow, Vector};

/// Background of the whole screen
pub fn screen_style(_theme: &iced::Theme) -> container::Style {
    container::Style {
        background: Some(Background::Color(Color::from_rgb8(0xF0, 0xF4, 0xF8))),
        ..Default::default()
    }
}

/// White rounded card with a soft drop shadow
pub fn device_card_style(_theme: &iced::Theme) -> container::Style {
    container::Style {
        background: Some(Background::Color(Color::WHITE)),
        text_color: Some(Color::from_rgb8(0x33, 0x33, 0x33)),
        border: Border {
            color: Color::TRANSPARENT,
            width: 0.0,
            radius: 8.0.into(),
        },
        shadow: Shadow {
            color: Color::from_rgba(0.0, 0.0, 0.0, 0.1),
            offset: Vector::new(0.0, 2.0),
            blur_radius: 4.0,
        },
    }
}

/// One bar of the signal meter: green when filled, light gray otherwise
pub fn signal_bar_style(filled: bool) -> impl Fn(&iced::Theme) -> container::Style {
    move |_theme: &iced::Theme| {
        let color = if filled {
            Color::from_rgb8(0x4C, 0xAF, 0x50)
        } else {
            Color::from_rgb8(0xE0, 0xE0, 0xE0)
        };
        container::Style {
            background: Some(Background::Color(color)),
            border: Border {
                color,
                width: 0.0,
                radius: 3.0.into(),
            },
            ..Default::default()
        }
    }
}

/// Alert banner for permission problems
pub fn alert_style(_theme: &iced::Theme) -> container::Style {
    container::Style {
        background: Some(Background::Color(Color::from_rgb(1.0, 0.93, 0.93))),
        text_color: Some(Color::from_rgb(0.6, 0.1, 0.1)),
        border: Border {
            color: Color::from_rgb(0.9, 0.3, 0.3),
            width: 1.0,
            radius: 4.0.into(),
        },
        ..Default::default()
    }
}

/// Style for the start button (green theme)
pub fn start_button_style() -> impl Fn(&iced::Theme, button::Status) -> button::Style {
    |_theme: &iced::Theme, status: button::Status| match status {
        button::Status::Active => button::Style {
            background: Some(Background::Color(Color::from_rgb(0.2, 0.7, 0.2))),
            text_color: Color::WHITE,
            border: Border {
                color: Color::from_rgb(0.3, 0.8, 0.3),
                width: 1.0,
                radius: 4.0.into(),
            },
            ..Default::default()
        },
        button::Status::Hovered => button::Style {
            background: Some(Background::Color(Color::from_rgb(0.3, 0.8, 0.3))),
            text_color: Color::WHITE,
            border: Border {
                color: Color::from_rgb(0.4, 0.9, 0.4),
                width: 1.0,
                radius: 4.0.into(),
            },
            ..Default::default()
        },
        button::Status::Pressed => button::Style {
            background: Some(Background::Color(Color::from_rgb(0.15, 0.6, 0.15))),
            text_color: Color::WHITE,
            border: Border {
                color: Color::from_rgb(0.2, 0.7, 0.2),
                width: 1.0,
                radius: 4.0.into(),
            },
            ..Default::default()
        },
        _ => button::Style::default(),
    }
}

/// Style for the stop button (red theme)
pub fn stop_button_style() -> impl Fn(&iced::Theme, button::Status) -> button::Style {
    |_theme: &iced::Theme, status: button::Status| match status {
        button::Status::Active => button::Style {
            background: Some(Background::Color(Color::from_rgb(0.8, 0.2, 0.2))),
            text_color: Color::WHITE,
            border: Border {
                color: Color::from_rgb(0.9, 0.3, 0.3),
                width: 1.0,
                radius: 4.0.into(),
            },
            ..Default::default()
        },
        button::Status::Hovered => button::Style {
            background: Some(Background::Color(Color::from_rgb(0.9, 0.3, 0.3))),
            text_color: Color::WHITE,
            border: Border {
                color: Color::from_rgb(1.0, 0.4, 0.4),
                width: 1.0,
                radius: 4.0.into(),
            },
            ..Default::default()
        },
        button::Status::Pressed => button::Style {
            background: Some(Background::Color(Color::from_rgb(0.7, 0.15, 0.15))),
            text_color: Color::WHITE,
            border: Border {
                color: Color::from_rgb(0.8, 0.2, 0.2),
                width: 1.0,
                radius: 4.0.into(),
            },
            ..Default::default()
        },
        _ => button::Style::default(),
    }
}
