use iced::widget::{button, column, container, image, row, slider, text, text_input, Space};
use iced::{Alignment, Background, Border, Color, ContentFit, Element, Length, Theme};

use facecap_core::detection::domain::detection_config::{
    DetectionConfig, MIN_NEIGHBORS_RANGE, SCALE_FACTOR_RANGE,
};
use facecap_core::shared::box_color::BoxColor;

use crate::app::{scaled, CaptureView, Message};
use crate::theme;

/// Quick picks shown next to the hex field.
pub const SWATCHES: &[BoxColor] = &[
    BoxColor::GREEN,
    BoxColor::new(0xFF, 0x00, 0x00),
    BoxColor::new(0x00, 0x7A, 0xFF),
    BoxColor::new(0xFF, 0xCC, 0x00),
    BoxColor::new(0x00, 0xFF, 0xFF),
    BoxColor::new(0xFF, 0x00, 0xFF),
    BoxColor::new(0xFF, 0xFF, 0xFF),
];

pub fn view<'a>(fs: f32, config: &DetectionConfig, state: CaptureView<'a>) -> Element<'a, Message> {
    let intro = column![
        text("Face Detection").size(scaled(20.0, fs)),
        text(
            "Start the camera to detect faces live. Adjust the rectangle colour, \
             scale factor and minimum neighbours below, then save frames you \
             want to keep."
        )
        .size(scaled(13.0, fs))
        .style(|t: &Theme| text::Style {
            color: Some(theme::muted_color(t)),
        }),
    ]
    .spacing(6);

    let controls = column![
        color_row(fs, config, state.hex_input),
        parameter_row(
            fs,
            "Scale factor",
            format!("{:.1}", config.scale_factor()),
            slider(
                SCALE_FACTOR_RANGE,
                config.scale_factor(),
                Message::ScaleFactorChanged
            )
            .step(0.1)
            .into(),
        ),
        parameter_row(
            fs,
            "Min neighbors",
            config.min_neighbors().to_string(),
            slider(
                MIN_NEIGHBORS_RANGE,
                config.min_neighbors(),
                Message::MinNeighborsChanged
            )
            .into(),
        ),
        row![
            Space::new().width(Length::Fill),
            button(text("Restore defaults").size(scaled(12.0, fs)))
                .on_press(Message::RestoreDefaults)
                .style(button::text),
        ],
    ]
    .spacing(10);

    let actions = row![
        button(text("Start detection").size(scaled(13.0, fs)))
            .on_press_maybe((state.ready && !state.detecting).then_some(Message::Start))
            .style(button::primary)
            .padding([8, 16]),
        button(text("Save image").size(scaled(13.0, fs)))
            .on_press_maybe(state.ready.then_some(Message::Save))
            .style(button::secondary)
            .padding([8, 16]),
        button(text("Stop detection").size(scaled(13.0, fs)))
            .on_press_maybe(state.detecting.then_some(Message::Stop))
            .style(button::danger)
            .padding([8, 16]),
    ]
    .spacing(10);

    let mut content = column![intro, controls, actions].spacing(16);

    if let Some(line) = status_line(fs, &state) {
        content = content.push(line);
    }

    content = content.push(preview(fs, &state));

    for notice in state.notices {
        let level = notice.level;
        content = content.push(
            text(notice.text.clone())
                .size(scaled(12.0, fs))
                .style(move |t: &Theme| text::Style {
                    color: Some(theme::notice_color(t, level)),
                }),
        );
    }

    content.push(download_section(fs, &state)).into()
}

fn color_row<'a>(fs: f32, config: &DetectionConfig, hex_input: &str) -> Element<'a, Message> {
    let current = config.box_color();
    let swatches = row(SWATCHES
        .iter()
        .map(|&color| swatch(color, color == current))
        .collect::<Vec<_>>())
    .spacing(6);

    let valid = BoxColor::from_hex(hex_input).is_ok();
    let mut col = column![row![
        text("Rectangle colour").size(scaled(13.0, fs)).width(140),
        text_input("#00FF00", hex_input)
            .on_input(Message::ColorInputChanged)
            .size(scaled(13.0, fs))
            .width(100),
        swatches,
    ]
    .spacing(12)
    .align_y(Alignment::Center)];

    if !valid {
        col = col.push(
            text("Enter a colour as #RRGGBB")
                .size(scaled(11.0, fs))
                .style(|t: &Theme| text::Style {
                    color: Some(t.palette().danger),
                }),
        );
    }
    col.spacing(4).into()
}

fn swatch<'a>(color: BoxColor, selected: bool) -> Element<'a, Message> {
    let [r, g, b] = color.rgb();
    let fill = Color::from_rgb8(r, g, b);
    let chip = container(Space::new().width(18).height(18)).style(move |t: &Theme| {
        container::Style {
            background: Some(Background::Color(fill)),
            border: Border {
                radius: 4.0.into(),
                width: if selected { 2.0 } else { 1.0 },
                color: if selected {
                    t.palette().primary
                } else {
                    theme::muted_color(t)
                },
            },
            ..Default::default()
        }
    });
    button(chip)
        .on_press(Message::SwatchPicked(color))
        .padding(2)
        .style(button::text)
        .into()
}

fn parameter_row<'a>(
    fs: f32,
    label: &'a str,
    value: String,
    control: Element<'a, Message>,
) -> Element<'a, Message> {
    row![
        text(label).size(scaled(13.0, fs)).width(140),
        control,
        text(value).size(scaled(13.0, fs)).width(40),
    ]
    .spacing(12)
    .align_y(Alignment::Center)
    .into()
}

fn status_line<'a>(fs: f32, state: &CaptureView<'a>) -> Option<Element<'a, Message>> {
    let label = if let Some((downloaded, total)) = state.download {
        if total > 0 {
            format!(
                "Downloading face classifier... {}%",
                downloaded * 100 / total.max(1)
            )
        } else {
            format!("Downloading face classifier... {} KB", downloaded / 1024)
        }
    } else if !state.ready {
        "Preparing camera...".to_string()
    } else if state.detecting {
        format!("Detecting: {} face(s) in view", state.faces)
    } else {
        return None;
    };
    Some(
        text(label)
            .size(scaled(12.0, fs))
            .style(|t: &Theme| text::Style {
                color: Some(theme::muted_color(t)),
            })
            .into(),
    )
}

fn preview<'a>(fs: f32, state: &CaptureView<'a>) -> Element<'a, Message> {
    let body: Element<'a, Message> = match state.preview {
        Some(handle) => image(handle.clone())
            .width(Length::Fill)
            .content_fit(ContentFit::Contain)
            .into(),
        None => container(
            text("No frame yet")
                .size(scaled(13.0, fs))
                .style(|t: &Theme| text::Style {
                    color: Some(theme::muted_color(t)),
                }),
        )
        .center_x(Length::Fill)
        .center_y(240)
        .into(),
    };

    container(body)
        .width(Length::Fill)
        .padding(4)
        .style(|t: &Theme| container::Style {
            border: Border {
                radius: 6.0.into(),
                width: 1.0,
                color: theme::muted_color(t),
            },
            ..Default::default()
        })
        .into()
}

fn download_section<'a>(fs: f32, state: &CaptureView<'a>) -> Element<'a, Message> {
    if state.saved == 0 {
        return text("No saved images to download yet.")
            .size(scaled(12.0, fs))
            .style(|t: &Theme| text::Style {
                color: Some(t.palette().warning),
            })
            .into();
    }

    row![
        button(text("Download images.zip").size(scaled(13.0, fs)))
            .on_press(Message::DownloadArchive)
            .style(button::primary)
            .padding([8, 16]),
        button(text("Open folder").size(scaled(13.0, fs)))
            .on_press(Message::OpenFolder)
            .style(button::secondary)
            .padding([8, 16]),
        text(format!("{} image(s) saved", state.saved)).size(scaled(12.0, fs)),
    ]
    .spacing(10)
    .align_y(Alignment::Center)
    .into()
}
