//! Configuration types for scrape-pacer
//!
//! Every numeric behavior knob (delay range, risk thresholds, daily quota,
//! challenge wait, batch size, peak windows) lives here with a serde default
//! so callers can start from `Config::default()` and override selectively.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Per-item delay and break behavior
///
/// Groups the base delay draw, the risk multipliers applied on top of it, and
/// the longer inter-batch break range. Used as a nested sub-config within
/// [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DelayConfig {
    /// Lower bound of the base per-item delay draw (default: 60s)
    #[serde(default = "default_min_delay", with = "duration_serde")]
    pub min_delay: Duration,

    /// Upper bound of the base per-item delay draw (default: 150s)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Absolute ceiling applied after all multipliers (default: 15min)
    #[serde(default = "default_max_total_delay", with = "duration_serde")]
    pub max_total_delay: Duration,

    /// Fixed cooldown used instead of a draw at critical risk (default: 30min)
    #[serde(default = "default_critical_cooldown", with = "duration_serde")]
    pub critical_cooldown: Duration,

    /// Delay multiplier at elevated risk (default: 1.5)
    #[serde(default = "default_elevated_multiplier")]
    pub elevated_multiplier: f64,

    /// Delay multiplier at high risk (default: 3.0)
    #[serde(default = "default_high_multiplier")]
    pub high_multiplier: f64,

    /// Local-time windows during which delays are stretched further
    ///
    /// Empty means no peak adjustment is ever applied.
    #[serde(default = "default_peak_windows")]
    pub peak_windows: Vec<PeakWindow>,

    /// Lower bound of the randomized inter-batch break (default: 15min)
    #[serde(default = "default_min_batch_break", with = "duration_serde")]
    pub min_batch_break: Duration,

    /// Upper bound of the randomized inter-batch break (default: 45min)
    #[serde(default = "default_max_batch_break", with = "duration_serde")]
    pub max_batch_break: Duration,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            min_delay: default_min_delay(),
            max_delay: default_max_delay(),
            max_total_delay: default_max_total_delay(),
            critical_cooldown: default_critical_cooldown(),
            elevated_multiplier: default_elevated_multiplier(),
            high_multiplier: default_high_multiplier(),
            peak_windows: default_peak_windows(),
            min_batch_break: default_min_batch_break(),
            max_batch_break: default_max_batch_break(),
        }
    }
}

/// A local-time window with a delay multiplier
///
/// Windows may cross midnight (e.g. 22:00–02:00). An empty `days` list means
/// the window applies every day.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PeakWindow {
    /// Days of week this window applies to (empty = all days)
    #[serde(default)]
    pub days: Vec<Weekday>,

    /// Window start (inclusive), local time
    #[serde(with = "time_format")]
    pub start: NaiveTime,

    /// Window end (exclusive), local time
    #[serde(with = "time_format")]
    pub end: NaiveTime,

    /// Multiplier applied to the drawn delay while inside the window
    pub multiplier: f64,
}

impl PeakWindow {
    /// Whether the given local timestamp falls inside this window.
    ///
    /// Handles midnight-crossing windows: for a window crossing midnight the
    /// day check applies to the day the window started on.
    pub fn matches(&self, now: chrono::DateTime<chrono::Local>) -> bool {
        use chrono::{Datelike, Timelike};
        let time = NaiveTime::from_hms_opt(now.hour(), now.minute(), now.second())
            .unwrap_or(self.start);

        let crosses_midnight = self.end < self.start;
        let in_time_window = if crosses_midnight {
            time >= self.start || time < self.end
        } else {
            time >= self.start && time < self.end
        };
        if !in_time_window {
            return false;
        }

        if self.days.is_empty() {
            return true;
        }
        let mut weekday = now.weekday();
        if crosses_midnight && time < self.end {
            // Past midnight, attribute to the previous day
            weekday = weekday.pred();
        }
        self.days.iter().any(|d| d.to_chrono() == weekday)
    }
}

/// Day of the week for peak window scheduling
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    /// Monday
    Monday,
    /// Tuesday
    Tuesday,
    /// Wednesday
    Wednesday,
    /// Thursday
    Thursday,
    /// Friday
    Friday,
    /// Saturday
    Saturday,
    /// Sunday
    Sunday,
}

impl Weekday {
    /// Convert to the chrono weekday type.
    pub fn to_chrono(self) -> chrono::Weekday {
        match self {
            Weekday::Monday => chrono::Weekday::Mon,
            Weekday::Tuesday => chrono::Weekday::Tue,
            Weekday::Wednesday => chrono::Weekday::Wed,
            Weekday::Thursday => chrono::Weekday::Thu,
            Weekday::Friday => chrono::Weekday::Fri,
            Weekday::Saturday => chrono::Weekday::Sat,
            Weekday::Sunday => chrono::Weekday::Sun,
        }
    }

    /// Convert from the chrono weekday type.
    pub fn from_chrono(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Mon => Weekday::Monday,
            chrono::Weekday::Tue => Weekday::Tuesday,
            chrono::Weekday::Wed => Weekday::Wednesday,
            chrono::Weekday::Thu => Weekday::Thursday,
            chrono::Weekday::Fri => Weekday::Friday,
            chrono::Weekday::Sat => Weekday::Saturday,
            chrono::Weekday::Sun => Weekday::Sunday,
        }
    }
}

/// Risk classification thresholds
///
/// The sliding outcome window is bounded by both entry count and age; the
/// level is derived from the success rate over whatever remains.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Maximum outcomes retained in the sliding window (default: 30)
    #[serde(default = "default_window_len")]
    pub window_len: usize,

    /// Maximum age of a retained outcome (default: 30min)
    #[serde(default = "default_window_age", with = "duration_serde")]
    pub window_age: Duration,

    /// Outcomes required before the level can leave `Low` (default: 4)
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,

    /// Success rate at or above which risk is `Low` (default: 0.85)
    #[serde(default = "default_low_threshold")]
    pub low_threshold: f64,

    /// Success rate at or above which risk is `Elevated` (default: 0.65)
    #[serde(default = "default_elevated_threshold")]
    pub elevated_threshold: f64,

    /// Success rate at or above which risk is `High`; below is `Critical`
    /// (default: 0.40)
    #[serde(default = "default_high_threshold")]
    pub high_threshold: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            window_len: default_window_len(),
            window_age: default_window_age(),
            min_samples: default_min_samples(),
            low_threshold: default_low_threshold(),
            elevated_threshold: default_elevated_threshold(),
            high_threshold: default_high_threshold(),
        }
    }
}

/// Daily fetch quota
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Maximum fetch attempts per calendar day (default: 50)
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            daily_limit: default_daily_limit(),
        }
    }
}

/// Challenge suspension behavior
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChallengeConfig {
    /// How often to re-check whether the challenge cleared (default: 5s)
    #[serde(default = "default_poll_interval", with = "duration_serde")]
    pub poll_interval: Duration,

    /// Total wait budget before the item is abandoned (default: 90s)
    #[serde(default = "default_max_wait", with = "duration_serde")]
    pub max_wait: Duration,
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            max_wait: default_max_wait(),
        }
    }
}

/// Batch sizing for checkpoint boundaries
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Items per batch (default: 10)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

/// Checkpoint database location
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// SQLite database file path (default: "./scrape-pacer.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Main configuration for the scrape pacing engine
///
/// Fields are organized into logical sub-configs:
/// - [`delay`](DelayConfig) — per-item delay draw, multipliers, breaks
/// - [`risk`](RiskConfig) — sliding window and classification thresholds
/// - [`quota`](QuotaConfig) — daily fetch ceiling
/// - [`challenge`](ChallengeConfig) — challenge polling and wait budget
/// - [`batch`](BatchConfig) — checkpoint batch sizing
/// - [`persistence`](PersistenceConfig) — checkpoint database path
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Per-item delay and break behavior
    #[serde(default)]
    pub delay: DelayConfig,

    /// Risk classification thresholds
    #[serde(default)]
    pub risk: RiskConfig,

    /// Daily fetch quota
    #[serde(default)]
    pub quota: QuotaConfig,

    /// Challenge suspension behavior
    #[serde(default)]
    pub challenge: ChallengeConfig,

    /// Batch sizing for checkpoint boundaries
    #[serde(default)]
    pub batch: BatchConfig,

    /// Checkpoint database location
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

fn default_min_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(150)
}

fn default_max_total_delay() -> Duration {
    Duration::from_secs(15 * 60)
}

fn default_critical_cooldown() -> Duration {
    Duration::from_secs(30 * 60)
}

fn default_elevated_multiplier() -> f64 {
    1.5
}

fn default_high_multiplier() -> f64 {
    3.0
}

fn default_peak_windows() -> Vec<PeakWindow> {
    // Business hours carry more organic traffic to blend into, but also more
    // monitoring attention; stretch delays during 9-17 local time.
    vec![PeakWindow {
        days: Vec::new(),
        start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
        end: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
        multiplier: 1.5,
    }]
}

fn default_min_batch_break() -> Duration {
    Duration::from_secs(15 * 60)
}

fn default_max_batch_break() -> Duration {
    Duration::from_secs(45 * 60)
}

fn default_window_len() -> usize {
    30
}

fn default_window_age() -> Duration {
    Duration::from_secs(30 * 60)
}

fn default_min_samples() -> usize {
    4
}

fn default_low_threshold() -> f64 {
    0.85
}

fn default_elevated_threshold() -> f64 {
    0.65
}

fn default_high_threshold() -> f64 {
    0.40
}

fn default_daily_limit() -> u32 {
    50
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_max_wait() -> Duration {
    Duration::from_secs(90)
}

fn default_batch_size() -> usize {
    10
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./scrape-pacer.db")
}

/// Serde module for Duration serialization as seconds
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

/// Serde module for NaiveTime serialization as "HH:MM"
mod time_format {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&s, FORMAT).map_err(serde::de::Error::custom)
    }
}
