use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Platform {
    #[default]
    Android,
    Ios,
    Windows,
    MacOs,
}

impl Platform {
    pub fn label(&self) -> &'static str {
        match self {
            Platform::Android => "android",
            Platform::Ios => "ios",
            Platform::Windows => "windows",
            Platform::MacOs => "macos",
        }
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "android" => Ok(Platform::Android),
            "ios" => Ok(Platform::Ios),
            "windows" => Ok(Platform::Windows),
            "macos" => Ok(Platform::MacOs),
            other => Err(format!("unknown platform: {}", other)),
        }
    }
}

/// Best guess of the user's OS from the WebView user agent and
/// `navigator.platform`. Unknown devices get the Android guide.
pub fn detect_platform(user_agent: &str, platform: &str) -> Platform {
    if user_agent.to_ascii_lowercase().contains("android") {
        return Platform::Android;
    }
    if ["iPad", "iPhone", "iPod"].iter().any(|d| user_agent.contains(d)) {
        return Platform::Ios;
    }
    if platform.contains("Win") || user_agent.contains("Windows") {
        return Platform::Windows;
    }
    if platform.contains("Mac") || user_agent.contains("Macintosh") {
        return Platform::MacOs;
    }
    Platform::Android
}

#[derive(Debug, Default)]
pub struct GuideManager {
    current: Platform,
}

impl GuideManager {
    pub fn new(user_agent: &str, platform: &str) -> Self {
        Self {
            current: detect_platform(user_agent, platform),
        }
    }

    pub fn current(&self) -> Platform {
        self.current
    }

    /// Returns true when the visible guide changed.
    pub fn switch_platform(&mut self, platform: Platform, force: bool) -> bool {
        if !force && self.current == platform {
            return false;
        }
        self.current = platform;
        true
    }

    /// Re-runs detection when the guide tab is opened.
    pub fn init_platform(&mut self, user_agent: &str, platform: &str) -> Platform {
        let detected = detect_platform(user_agent, platform);
        self.switch_platform(detected, true);
        detected
    }
}
