//! Static user-agent screening against allow and deny pattern lists.

use regex::{RegexSet, RegexSetBuilder};

use crate::error::{GuardError, GuardResult};

/// Scripted clients, scanners, and automation frameworks.
const DENYLIST: &[&str] = &[
    "bot",
    "crawl",
    "slurp",
    "spider",
    "httpclient",
    "python-requests",
    "python-urllib",
    "okhttp",
    "libwww",
    "java/",
    "ruby",
    "go-http-client",
    "curl",
    "wget",
    "php/",
    "perl",
    "winhttp",
    "HTTrack",
    "urlgrabber",
    "node-fetch",
    "axios",
    "ZmEu",
    "Indy Library",
    "Nutch",
    "ApacheBench",
    "Nikto",
    "EmailCollector",
    "WebCopier",
    "WebDownloader",
    "SiteSnagger",
    "Xenu",
    "python",
    "Masscan",
    "nessus",
    "nmap",
    "Arachni",
    "dirbuster",
    "heritrix",
    "SiteSucker",
    "Teleport",
    "cfnetwork",
    "phantomjs",
    "headless",
    "puppeteer",
    "selenium",
    "lighthouse",
    "cypress",
    "PowerShell",
];

/// Crawlers that are let through regardless of the denylist.
const ALLOWLIST: &[&str] = &[
    "Googlebot",
    "Googlebot-Image",
    "Googlebot-News",
    "Googlebot-Video",
    "Bingbot",
    "Slurp",
    "DuckDuckBot",
    "Baiduspider",
    "YandexBot",
    "YandexImages",
    "facebot",
    "ia_archiver",
    "Twitterbot",
    "Applebot",
    "LinkedInBot",
    "SemrushBot",
    "AhrefsBot",
    "DotBot",
    "Sogou",
    "Exabot",
    "SeznamBot",
    "CCBot",
    "PetalBot",
    "Qwantify",
    "MojeekBot",
];

/// Classifies user agents as suspicious or not. Patterns are compiled once;
/// an allowlist match always wins over a denylist match.
pub struct BotDetector {
    denylist: RegexSet,
    allowlist: RegexSet,
}

impl BotDetector {
    /// Detector over the built-in lists.
    pub fn new() -> Self {
        Self::from_lists(DENYLIST, ALLOWLIST)
            .expect("built-in user-agent patterns must compile")
    }

    /// Detector over caller-supplied pattern lists.
    pub fn from_lists(denylist: &[&str], allowlist: &[&str]) -> GuardResult<Self> {
        let denylist = compile(denylist)?;
        let allowlist = compile(allowlist)?;
        Ok(Self {
            denylist,
            allowlist,
        })
    }

    /// Whether the user agent looks like an unwanted automated client.
    pub fn is_bot(&self, user_agent: &str) -> bool {
        if self.allowlist.is_match(user_agent) {
            return false;
        }
        self.denylist.is_match(user_agent)
    }
}

impl Default for BotDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn compile(patterns: &[&str]) -> GuardResult<RegexSet> {
    RegexSetBuilder::new(patterns)
        .case_insensitive(true)
        .build()
        .map_err(|err| GuardError::Config(format!("invalid user-agent pattern: {err}")))
}
