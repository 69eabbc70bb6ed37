//! User-Agent classification for the audit log.
//!
//! Substring heuristics only. The result is recorded for auditing and is
//! never consulted by the access decision.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Browser {
    Edge,
    Opera,
    SamsungInternet,
    Firefox,
    Chrome,
    Safari,
    Curl,
    Bot,
    Other,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Os {
    Windows,
    #[serde(rename = "macOS")]
    MacOs,
    #[serde(rename = "iOS")]
    Ios,
    Android,
    #[serde(rename = "ChromeOS")]
    ChromeOs,
    Linux,
    Other,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Desktop,
    Mobile,
    Tablet,
    Bot,
    Unknown,
}

/// Parsed `User-Agent` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UserAgentInfo {
    pub browser: Browser,
    pub os: Os,
    pub device: DeviceClass,
}

impl UserAgentInfo {
    pub const UNKNOWN: UserAgentInfo = UserAgentInfo {
        browser: Browser::Unknown,
        os: Os::Unknown,
        device: DeviceClass::Unknown,
    };

    pub fn parse(raw: Option<&str>) -> Self {
        let ua = match raw.map(str::trim) {
            Some(s) if !s.is_empty() => s.to_ascii_lowercase(),
            _ => return Self::UNKNOWN,
        };

        if is_bot(&ua) {
            return Self {
                browser: Browser::Bot,
                os: detect_os(&ua),
                device: DeviceClass::Bot,
            };
        }

        let os = detect_os(&ua);
        Self {
            browser: detect_browser(&ua),
            os,
            device: detect_device(&ua, os),
        }
    }
}

impl Default for UserAgentInfo {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

fn is_bot(ua: &str) -> bool {
    ["bot", "crawler", "spider", "slurp", "headless"]
        .iter()
        .any(|m| ua.contains(m))
}

fn detect_browser(ua: &str) -> Browser {
    // Order matters: Chromium derivatives also advertise "chrome/" and "safari/".
    if ua.contains("edg/") || ua.contains("edge/") || ua.contains("edga/") || ua.contains("edgios/") {
        Browser::Edge
    } else if ua.contains("opr/") || ua.contains("opera") {
        Browser::Opera
    } else if ua.contains("samsungbrowser/") {
        Browser::SamsungInternet
    } else if ua.contains("firefox/") || ua.contains("fxios/") {
        Browser::Firefox
    } else if ua.contains("chrome/") || ua.contains("crios/") || ua.contains("chromium/") {
        Browser::Chrome
    } else if ua.contains("safari/") && ua.contains("version/") {
        Browser::Safari
    } else if ua.starts_with("curl/") {
        Browser::Curl
    } else {
        Browser::Other
    }
}

fn detect_os(ua: &str) -> Os {
    // iOS user agents say "like Mac OS X", so check them first.
    if ua.contains("iphone") || ua.contains("ipad") || ua.contains("ipod") {
        Os::Ios
    } else if ua.contains("windows") {
        Os::Windows
    } else if ua.contains("android") {
        Os::Android
    } else if ua.contains("cros ") {
        Os::ChromeOs
    } else if ua.contains("macintosh") || ua.contains("mac os x") {
        Os::MacOs
    } else if ua.contains("linux") {
        Os::Linux
    } else {
        Os::Other
    }
}

fn detect_device(ua: &str, os: Os) -> DeviceClass {
    if ua.contains("ipad") || ua.contains("tablet") || (os == Os::Android && !ua.contains("mobile")) {
        DeviceClass::Tablet
    } else if ua.contains("mobi") || ua.contains("iphone") || ua.contains("ipod") {
        DeviceClass::Mobile
    } else if matches!(os, Os::Windows | Os::MacOs | Os::Linux | Os::ChromeOs) {
        DeviceClass::Desktop
    } else {
        DeviceClass::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME_WIN: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const EDGE_WIN: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.2210.91";
    const SAFARI_IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Mobile/15E148 Safari/604.1";
    const FIREFOX_LINUX: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0";
    const ANDROID_PHONE: &str = "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36";
    const ANDROID_TABLET: &str = "Mozilla/5.0 (Linux; Android 13; SM-X700) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36";
    const SAFARI_MAC: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15";
    const GOOGLEBOT: &str = "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)";

    fn parse(ua: &str) -> UserAgentInfo {
        UserAgentInfo::parse(Some(ua))
    }

    #[test]
    fn test_desktop_browsers() {
        assert_eq!(parse(CHROME_WIN), UserAgentInfo { browser: Browser::Chrome, os: Os::Windows, device: DeviceClass::Desktop });
        assert_eq!(parse(EDGE_WIN).browser, Browser::Edge);
        assert_eq!(parse(FIREFOX_LINUX), UserAgentInfo { browser: Browser::Firefox, os: Os::Linux, device: DeviceClass::Desktop });
        assert_eq!(parse(SAFARI_MAC), UserAgentInfo { browser: Browser::Safari, os: Os::MacOs, device: DeviceClass::Desktop });
    }

    #[test]
    fn test_mobile_and_tablet() {
        assert_eq!(parse(SAFARI_IPHONE), UserAgentInfo { browser: Browser::Safari, os: Os::Ios, device: DeviceClass::Mobile });
        assert_eq!(parse(ANDROID_PHONE), UserAgentInfo { browser: Browser::Chrome, os: Os::Android, device: DeviceClass::Mobile });
        assert_eq!(parse(ANDROID_TABLET).device, DeviceClass::Tablet);
    }

    #[test]
    fn test_bots_and_tools() {
        let bot = parse(GOOGLEBOT);
        assert_eq!(bot.browser, Browser::Bot);
        assert_eq!(bot.device, DeviceClass::Bot);
        assert_eq!(parse("curl/8.4.0").browser, Browser::Curl);
    }

    #[test]
    fn test_missing_header() {
        assert_eq!(UserAgentInfo::parse(None), UserAgentInfo::UNKNOWN);
        assert_eq!(UserAgentInfo::parse(Some("   ")), UserAgentInfo::UNKNOWN);
    }

    #[test]
    fn test_serialized_names() {
        let json = serde_json::to_value(parse(SAFARI_IPHONE)).unwrap();
        assert_eq!(json["os"], "iOS");
        assert_eq!(json["device"], "mobile");
        assert_eq!(json["browser"], "Safari");
    }
}
