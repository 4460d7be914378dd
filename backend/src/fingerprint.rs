use std::env;
use std::thread;

use async_trait::async_trait;
use shared::identity::{Fingerprint, FingerprintError, FingerprintProbe};

/// Host characteristics standing in for the browser's canvas and screen signals.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostProbe;

fn first_var(names: &[&str]) -> String {
    names
        .iter()
        .find_map(|name| env::var(name).ok())
        .unwrap_or_default()
}

impl HostProbe {
    fn signals(&self) -> Vec<(&'static str, String)> {
        vec![
            ("os", env::consts::OS.to_string()),
            ("arch", env::consts::ARCH.to_string()),
            ("family", env::consts::FAMILY.to_string()),
            ("host", first_var(&["HOSTNAME", "COMPUTERNAME"])),
            ("user", first_var(&["USER", "USERNAME"])),
            ("lang", first_var(&["LANG", "LC_ALL"])),
            ("tz", first_var(&["TZ"])),
            (
                "cpus",
                thread::available_parallelism()
                    .map(|n| n.to_string())
                    .unwrap_or_default(),
            ),
        ]
    }
}

#[async_trait(?Send)]
impl FingerprintProbe for HostProbe {
    async fn fingerprint(&self) -> Result<Fingerprint, FingerprintError> {
        Fingerprint::from_signals(self.signals()).ok_or(FingerprintError::NoSignals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn host_fingerprint_is_stable() {
        let first = HostProbe.fingerprint().await.unwrap();
        let second = HostProbe.fingerprint().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.as_str().len(), 64);
    }
}
