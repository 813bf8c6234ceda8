use serde::{Deserialize, Serialize};

/// Platform category a release asset is filed under.
///
/// Everything except `Other` gets its own directory beneath the repo's
/// storage path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Windows,
    #[serde(rename = "macOS")]
    MacOs,
    Linux,
    Android,
    Other,
}

impl Platform {
    /// All platforms, in the order summaries list them.
    pub const ALL: [Platform; 5] = [
        Platform::Windows,
        Platform::MacOs,
        Platform::Linux,
        Platform::Android,
        Platform::Other,
    ];

    /// Directory label used in storage keys.
    pub fn label(self) -> &'static str {
        match self {
            Self::Windows => "Windows",
            Self::MacOs => "macOS",
            Self::Linux => "Linux",
            Self::Android => "Android",
            Self::Other => "Other",
        }
    }

    /// Classify an asset by its file name.
    ///
    /// Matching is case-insensitive and first match wins, in the order
    /// Android, Windows, macOS, Linux. Anything unmatched is `Other`.
    pub fn classify(file_name: &str) -> Self {
        let lower = file_name.to_lowercase();
        let has = |needle: &str| lower.contains(needle);
        let ends = |suffix: &str| lower.ends_with(suffix);

        if has("android") || has("mobile") || ends(".apk") {
            return Self::Android;
        }

        if has("windows") || has("win") || has("desktop") || ends(".exe") || ends(".msi") {
            return Self::Windows;
        }

        if has("macos") || has("darwin") || has("mac") || ends(".dmg") || ends(".pkg") {
            return Self::MacOs;
        }

        if has("linux") || ends(".deb") || ends(".rpm") || ends(".appimage") {
            return Self::Linux;
        }

        Self::Other
    }

    fn index(self) -> usize {
        match self {
            Self::Windows => 0,
            Self::MacOs => 1,
            Self::Linux => 2,
            Self::Android => 3,
            Self::Other => 4,
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-platform upload counts for one repo's sync summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlatformTally {
    counts: [usize; 5],
}

impl PlatformTally {
    pub fn record(&mut self, platform: Platform) {
        self.counts[platform.index()] += 1;
    }

    pub fn count(&self, platform: Platform) -> usize {
        self.counts[platform.index()]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

/// Renders as `Windows: 2, Android: 1`, omitting empty platforms.
impl std::fmt::Display for PlatformTally {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = Platform::ALL
            .iter()
            .filter(|p| self.count(**p) > 0)
            .map(|p| format!("{p}: {}", self.count(*p)))
            .collect();
        f.write_str(&parts.join(", "))
    }
}
