//! Crawl configuration: timings, block markers, extraction selectors, and the
//! per-context browser profile.
//!
//! Every constant here was tuned against a single target site, so all of them
//! are overridable through the environment (see [`CrawlConfig::from_env`]) or a
//! JSON rules file (see [`ExtractionRulesConfig::from_file`]).

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CrawlError;
use crate::pacing::PacingConfig;

/// Timings and detection settings for both crawl phases.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Bound on the initial listing navigation.
    pub listing_timeout: Duration,
    /// Pause after each scroll so lazy content can render.
    pub scroll_settle: Duration,
    /// Upper bound on height measurements in the scroll loop.
    pub max_scroll_iterations: u32,
    /// Bound on each detail-page navigation.
    pub detail_timeout: Duration,
    /// Bound on height reads, scrolls, and snapshots.
    pub script_timeout: Duration,
    /// Delay between consecutive detail visits.
    pub pacing: PacingConfig,
    /// Visible-text markers of an anti-bot challenge page.
    pub block_markers: Vec<String>,
    pub rules: ExtractionRulesConfig,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            listing_timeout: Duration::from_secs(60),
            scroll_settle: Duration::from_secs(1),
            max_scroll_iterations: 40,
            detail_timeout: Duration::from_secs(3),
            script_timeout: Duration::from_secs(15),
            pacing: PacingConfig::default(),
            block_markers: vec!["Just a moment...".into(), "Verify you are human".into()],
            rules: ExtractionRulesConfig::default(),
        }
    }
}

impl CrawlConfig {
    /// Read configuration from environment variables, falling back to the
    /// defaults for anything unset.
    ///
    /// - `JOBCRAWL_LISTING_TIMEOUT_SECS` (60)
    /// - `JOBCRAWL_SCROLL_SETTLE_MS` (1000)
    /// - `JOBCRAWL_MAX_SCROLLS` (40, at least 1)
    /// - `JOBCRAWL_DETAIL_TIMEOUT_SECS` (3)
    /// - `JOBCRAWL_SCRIPT_TIMEOUT_SECS` (15)
    /// - `JOBCRAWL_DETAIL_DELAY_MS` (3000)
    /// - `JOBCRAWL_DETAIL_JITTER_MS` (0)
    /// - `JOBCRAWL_BLOCK_MARKERS` (comma-separated)
    /// - `JOBCRAWL_RULES_FILE` (JSON [`ExtractionRulesConfig`])
    pub fn from_env() -> Result<Self, CrawlError> {
        let defaults = Self::default();

        let max_scroll_iterations =
            env_parse("JOBCRAWL_MAX_SCROLLS", defaults.max_scroll_iterations)?;
        if max_scroll_iterations == 0 {
            return Err(CrawlError::ConfigError(
                "JOBCRAWL_MAX_SCROLLS must be at least 1".into(),
            ));
        }

        let block_markers = match std::env::var("JOBCRAWL_BLOCK_MARKERS") {
            Err(_) => defaults.block_markers,
            Ok(raw) => parse_markers(&raw),
        };

        let rules = match std::env::var("JOBCRAWL_RULES_FILE") {
            Err(_) => defaults.rules,
            Ok(path) => ExtractionRulesConfig::from_file(Path::new(&path))?,
        };

        Ok(Self {
            listing_timeout: Duration::from_secs(env_parse(
                "JOBCRAWL_LISTING_TIMEOUT_SECS",
                defaults.listing_timeout.as_secs(),
            )?),
            scroll_settle: Duration::from_millis(env_parse(
                "JOBCRAWL_SCROLL_SETTLE_MS",
                defaults.scroll_settle.as_millis() as u64,
            )?),
            max_scroll_iterations,
            detail_timeout: Duration::from_secs(env_parse(
                "JOBCRAWL_DETAIL_TIMEOUT_SECS",
                defaults.detail_timeout.as_secs(),
            )?),
            script_timeout: Duration::from_secs(env_parse(
                "JOBCRAWL_SCRIPT_TIMEOUT_SECS",
                defaults.script_timeout.as_secs(),
            )?),
            pacing: PacingConfig::new(Duration::from_millis(env_parse(
                "JOBCRAWL_DETAIL_DELAY_MS",
                defaults.pacing.delay.as_millis() as u64,
            )?))
            .with_jitter(Duration::from_millis(env_parse(
                "JOBCRAWL_DETAIL_JITTER_MS",
                defaults.pacing.jitter.as_millis() as u64,
            )?)),
            block_markers,
            rules,
        })
    }

    /// Replace the extraction rules.
    pub fn with_rules(mut self, rules: ExtractionRulesConfig) -> Self {
        self.rules = rules;
        self
    }
}

/// Which pill container (by document position) holds which tag group.
///
/// The target pages give the two groups no distinguishing attribute, so the
/// assignment is purely positional; a site redesign that swaps them needs a
/// config change here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PillLayout {
    pub job_pills: usize,
    pub skill_pills: usize,
}

impl Default for PillLayout {
    fn default() -> Self {
        Self {
            job_pills: 0,
            skill_pills: 1,
        }
    }
}

/// CSS selectors and matching data for listing and detail extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionRulesConfig {
    /// One node per job on the listing page.
    pub listing_heading: String,
    pub company_name: String,
    pub company_description: String,
    /// Containers of tag "pills"; told apart by [`PillLayout`].
    pub pill_container: String,
    /// Pill elements inside a container.
    pub pill_item: String,
    pub pill_layout: PillLayout,
    /// Headings that open a free-text section.
    pub section_heading: String,
    /// Domain substrings of applicant-tracking platforms.
    pub apply_domains: Vec<String>,
}

impl Default for ExtractionRulesConfig {
    fn default() -> Self {
        Self {
            listing_heading: "h3.text-lg.font-semibold.text-primary.mr-4".into(),
            company_name: "div.company-header h3".into(),
            company_description: "div.company-header p".into(),
            pill_container: "div.flex.flex-wrap.gap-2".into(),
            pill_item: "a".into(),
            pill_layout: PillLayout::default(),
            section_heading: "h2".into(),
            apply_domains: [
                "greenhouse.io",
                "lever.co",
                "ashbyhq.com",
                "workable.com",
                "smartrecruiters.com",
                "bamboohr.com",
                "recruitee.com",
                "breezy.hr",
                "jobvite.com",
                "myworkdayjobs.com",
                "teamtailor.com",
                "personio.",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl ExtractionRulesConfig {
    /// Load rules from a JSON file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, CrawlError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CrawlError::ConfigError(format!(
                "Failed to read rules file {}: {e}",
                path.display()
            ))
        })?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Browser identity applied to every new context to look less automated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextProfile {
    pub viewport: (u32, u32),
    pub user_agent: String,
    pub locale: String,
}

impl Default for ContextProfile {
    fn default() -> Self {
        Self {
            viewport: (1920, 1080),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36"
                .into(),
            locale: "en-US".into(),
        }
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> Result<T, CrawlError> {
    match std::env::var(key) {
        Err(_) => Ok(default),
        Ok(raw) => raw.trim().parse().map_err(|_| {
            CrawlError::ConfigError(format!(
                "Invalid {key} '{raw}': must be a non-negative integer"
            ))
        }),
    }
}

fn parse_markers(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults_match_tuned_values() {
        let config = CrawlConfig::default();
        assert_eq!(config.listing_timeout, Duration::from_secs(60));
        assert_eq!(config.scroll_settle, Duration::from_secs(1));
        assert_eq!(config.max_scroll_iterations, 40);
        assert_eq!(config.detail_timeout, Duration::from_secs(3));
        assert_eq!(config.pacing.delay, Duration::from_secs(3));
        assert!(config.pacing.jitter.is_zero());
    }

    #[test]
    fn test_parse_markers_skips_blanks() {
        assert_eq!(
            parse_markers("Just a moment..., ,Access denied "),
            vec!["Just a moment...".to_string(), "Access denied".to_string()]
        );
    }

    #[test]
    fn test_rules_file_overrides_only_given_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"section_heading": "h3", "pill_layout": {{"job_pills": 1, "skill_pills": 0}}}}"#
        )
        .unwrap();

        let rules = ExtractionRulesConfig::from_file(file.path()).unwrap();
        assert_eq!(rules.section_heading, "h3");
        assert_eq!(
            rules.pill_layout,
            PillLayout {
                job_pills: 1,
                skill_pills: 0
            }
        );
        assert_eq!(
            rules.listing_heading,
            ExtractionRulesConfig::default().listing_heading
        );
    }

    #[test]
    fn test_rules_file_missing_is_config_error() {
        let err = ExtractionRulesConfig::from_file(Path::new("/nonexistent/rules.json"))
            .unwrap_err();
        assert!(matches!(err, CrawlError::ConfigError(_)));
    }

    #[test]
    fn test_rules_file_invalid_json_is_serialization_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = ExtractionRulesConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, CrawlError::SerializationError(_)));
    }
}
