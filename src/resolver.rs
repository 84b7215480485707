//! Screen → device resolution
//!
//! Monitor identifiers reported by compositors are decorated (connector name
//! plus make and model), so configured keys are matched as substrings. Keys
//! are tried in declaration order and the first hit wins.

use crate::config::ScreenDevices;

/// Device configured for `screen`, if any key occurs in it
#[must_use]
pub fn resolve<'a>(screen: &str, devices: &'a ScreenDevices) -> Option<&'a str> {
    devices
        .iter()
        .find(|entry| screen.contains(entry.screen.as_str()))
        .map(|entry| entry.device.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn devices() -> ScreenDevices {
        [("DISPLAY1", "Speakers"), ("DISPLAY2", "Headset")]
            .into_iter()
            .collect()
    }

    #[test_case("DISPLAY1", Some("Speakers") ; "exact key")]
    #[test_case("DISPLAY2-xyz", Some("Headset") ; "decorated identifier")]
    #[test_case(r"\\.\DISPLAY1", Some("Speakers") ; "adapter path prefix")]
    #[test_case("DISPLAY3", None ; "unmapped screen")]
    #[test_case("display1", None ; "case sensitive")]
    fn test_resolve(screen: &str, expected: Option<&str>) {
        assert_eq!(resolve(screen, &devices()), expected);
    }

    #[test]
    fn test_first_configured_key_wins() {
        let devices: ScreenDevices = [("DP", "Monitor"), ("DP-1", "Speakers")]
            .into_iter()
            .collect();
        assert_eq!(resolve("DP-1 Dell Inc. U2720Q", &devices), Some("Monitor"));

        let reversed: ScreenDevices = [("DP-1", "Speakers"), ("DP", "Monitor")]
            .into_iter()
            .collect();
        assert_eq!(resolve("DP-1 Dell Inc. U2720Q", &reversed), Some("Speakers"));
    }

    #[test]
    fn test_empty_table_resolves_nothing() {
        assert_eq!(resolve("DP-1", &ScreenDevices::default()), None);
    }
}
