use async_trait::async_trait;
use shared::identity::{Fingerprint, FingerprintError, FingerprintProbe};

/// Navigator, screen and timezone characteristics of this browser.
#[derive(Default)]
pub struct BrowserProbe;

#[async_trait(?Send)]
impl FingerprintProbe for BrowserProbe {
    async fn fingerprint(&self) -> Result<Fingerprint, FingerprintError> {
        let window = web_sys::window()
            .ok_or_else(|| FingerprintError::Unavailable("no window".to_string()))?;
        let navigator = window.navigator();

        let mut signals = vec![
            ("ua", navigator.user_agent().unwrap_or_default()),
            ("platform", navigator.platform().unwrap_or_default()),
            ("lang", navigator.language().unwrap_or_default()),
            ("cpus", navigator.hardware_concurrency().to_string()),
            (
                "tz",
                js_sys::Date::new_0().get_timezone_offset().to_string(),
            ),
        ];

        if let Ok(screen) = window.screen() {
            signals.push((
                "screen",
                format!(
                    "{}x{}x{}",
                    screen.width().unwrap_or_default(),
                    screen.height().unwrap_or_default(),
                    screen.color_depth().unwrap_or_default()
                ),
            ));
        }

        Fingerprint::from_signals(signals).ok_or(FingerprintError::NoSignals)
    }
}
