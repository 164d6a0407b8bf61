use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the receiving client renders the paste.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PasteFormat {
    #[default]
    PlainText,
    SyntaxHighlighting,
    Markdown,
}

impl PasteFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            PasteFormat::PlainText => "plaintext",
            PasteFormat::SyntaxHighlighting => "syntaxhighlighting",
            PasteFormat::Markdown => "markdown",
        }
    }
}

impl fmt::Display for PasteFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PasteFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plaintext" => Ok(PasteFormat::PlainText),
            "syntaxhighlighting" => Ok(PasteFormat::SyntaxHighlighting),
            "markdown" => Ok(PasteFormat::Markdown),
            other => Err(format!(
                "unknown paste format '{other}' (expected plaintext, syntaxhighlighting or markdown)"
            )),
        }
    }
}

/// Server-side lifetime of a paste, as accepted by PrivateBin's `meta.expire`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expiry {
    #[serde(rename = "5min")]
    FiveMinutes,
    #[serde(rename = "10min")]
    TenMinutes,
    #[serde(rename = "1hour")]
    OneHour,
    #[serde(rename = "1day")]
    OneDay,
    #[default]
    #[serde(rename = "1week")]
    OneWeek,
    #[serde(rename = "1month")]
    OneMonth,
    #[serde(rename = "1year")]
    OneYear,
    #[serde(rename = "never")]
    Never,
}

impl Expiry {
    pub const ALL: [Expiry; 8] = [
        Expiry::FiveMinutes,
        Expiry::TenMinutes,
        Expiry::OneHour,
        Expiry::OneDay,
        Expiry::OneWeek,
        Expiry::OneMonth,
        Expiry::OneYear,
        Expiry::Never,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Expiry::FiveMinutes => "5min",
            Expiry::TenMinutes => "10min",
            Expiry::OneHour => "1hour",
            Expiry::OneDay => "1day",
            Expiry::OneWeek => "1week",
            Expiry::OneMonth => "1month",
            Expiry::OneYear => "1year",
            Expiry::Never => "never",
        }
    }
}

impl fmt::Display for Expiry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Expiry {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Expiry::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| {
                let accepted: Vec<&str> = Expiry::ALL.iter().map(|e| e.as_str()).collect();
                format!("unknown expiry '{s}' (expected one of: {})", accepted.join(", "))
            })
    }
}

/// Compression applied to the paste envelope before encryption.
///
/// `None` is the current wire contract. `Zlib` (raw DEFLATE, as the
/// PrivateBin web client produces it) is an opt-in extension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    None,
    Zlib,
}

impl Compression {
    pub fn as_str(&self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Zlib => "zlib",
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Compression {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Compression::None),
            "zlib" => Ok(Compression::Zlib),
            other => Err(format!("unknown compression '{other}' (expected none or zlib)")),
        }
    }
}

/// A stored mapping from a shareable link to the link that deletes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub public_url: String,
    pub delete_url: String,
}

impl LinkRecord {
    pub fn new(public_url: impl Into<String>, delete_url: impl Into<String>) -> Self {
        Self {
            public_url: public_url.into(),
            delete_url: delete_url.into(),
        }
    }
}
