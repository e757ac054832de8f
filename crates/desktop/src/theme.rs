use iced::color;
use iced::theme::Palette;
use iced::{Color, Theme};

use crate::settings::Appearance;
use crate::workers::capture_worker::NoticeLevel;

/// Resolve the iced Theme from appearance + high_contrast settings.
pub fn resolve_theme(appearance: Appearance, high_contrast: bool) -> Theme {
    let dark = match appearance {
        Appearance::Dark => true,
        Appearance::Light => false,
        Appearance::System => system_prefers_dark(),
    };
    Theme::custom("Face Capture", palette(dark, high_contrast))
}

/// Colours for the four dark/light x normal/high-contrast combinations.
///
/// `success` doubles as the accent for saved-image notices, so it stays
/// close to the default green rectangle colour.
pub fn palette(dark: bool, high_contrast: bool) -> Palette {
    let (background, text) = match (dark, high_contrast) {
        (true, false) => (color!(0x18, 0x1a, 0x1b), color!(0xd8, 0xdc, 0xde)),
        (false, false) => (color!(0xf4, 0xf6, 0xf5), color!(0x1a, 0x1f, 0x1c)),
        (true, true) => (color!(0x00, 0x00, 0x00), color!(0xff, 0xff, 0xff)),
        (false, true) => (color!(0xff, 0xff, 0xff), color!(0x00, 0x00, 0x00)),
    };

    if dark {
        Palette {
            background,
            text,
            primary: color!(0x4c, 0xa8, 0xf0),
            success: color!(0x3d, 0xdc, 0x6a),
            warning: color!(0xff, 0xc8, 0x3d),
            danger: color!(0xff, 0x5c, 0x52),
        }
    } else {
        Palette {
            background,
            text,
            primary: color!(0x1f, 0x6f, 0xd1),
            success: color!(0x1e, 0x8e, 0x3e),
            warning: color!(0xa8, 0x5a, 0x00),
            danger: color!(0xc8, 0x1e, 0x1e),
        }
    }
}

/// Text colour for a status notice.
pub fn notice_color(theme: &Theme, level: NoticeLevel) -> Color {
    let palette = theme.palette();
    match level {
        NoticeLevel::Success => palette.success,
        NoticeLevel::Info => palette.text,
        NoticeLevel::Warning => palette.warning,
        NoticeLevel::Error => palette.danger,
    }
}

/// Dimmed text for captions, placeholders and swatch borders.
pub fn muted_color(theme: &Theme) -> Color {
    Color {
        a: 0.6,
        ..theme.palette().text
    }
}

fn system_prefers_dark() -> bool {
    #[cfg(target_os = "macos")]
    {
        query("defaults", &["read", "-g", "AppleInterfaceStyle"])
            .map(|out| out.eq_ignore_ascii_case("dark"))
            .unwrap_or(false)
    }
    #[cfg(target_os = "linux")]
    {
        query(
            "gsettings",
            &["get", "org.gnome.desktop.interface", "color-scheme"],
        )
        .map(|out| out.contains("dark"))
        .unwrap_or(true)
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        true
    }
}

#[cfg(any(target_os = "macos", target_os = "linux"))]
fn query(program: &str, args: &[&str]) -> Option<String> {
    let output = std::process::Command::new(program).args(args).output().ok()?;
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
