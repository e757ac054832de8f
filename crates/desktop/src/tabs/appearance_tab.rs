use iced::widget::{button, checkbox, column, pick_list, row, slider, text};
use iced::{Alignment, Element, Theme};

use crate::app::{scaled, Message};
use crate::settings::{Appearance, Settings};
use crate::theme;

/// Window preferences: colour scheme, contrast and text size.
pub fn view<'a>(settings: &Settings) -> Element<'a, Message> {
    let fs = settings.font_scale;

    let scheme = labelled(
        fs,
        "Colour scheme",
        pick_list(Appearance::ALL, Some(settings.appearance), Message::AppearanceChanged)
            .text_size(scaled(13.0, fs))
            .into(),
    );

    let contrast = column![
        checkbox(settings.high_contrast)
            .label("High contrast")
            .on_toggle(Message::HighContrastChanged)
            .text_size(scaled(13.0, fs)),
        caption(fs, "Black or white backgrounds with full-strength text."),
    ]
    .spacing(4);

    let font_size = labelled(
        fs,
        "Text size",
        row![
            slider(0.8..=1.5, settings.font_scale, Message::FontScaleChanged).step(0.05),
            text(format!("{:.0}%", settings.font_scale * 100.0)).size(scaled(13.0, fs)),
        ]
        .spacing(12)
        .align_y(Alignment::Center)
        .into(),
    );

    let reset = button(text("Reset appearance").size(scaled(12.0, fs)))
        .on_press_maybe((*settings != Settings::default()).then_some(Message::ResetAppearance))
        .style(button::secondary);

    column![
        text("Appearance").size(scaled(20.0, fs)),
        scheme,
        contrast,
        font_size,
        reset
    ]
    .spacing(18)
    .into()
}

fn labelled<'a>(fs: f32, label: &'a str, control: Element<'a, Message>) -> Element<'a, Message> {
    row![text(label).size(scaled(13.0, fs)).width(120), control]
        .spacing(12)
        .align_y(Alignment::Center)
        .into()
}

fn caption<'a>(fs: f32, content: &'a str) -> Element<'a, Message> {
    text(content)
        .size(scaled(11.0, fs))
        .style(|t: &Theme| text::Style {
            color: Some(theme::muted_color(t)),
        })
        .into()
}
