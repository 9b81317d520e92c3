use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::job::Job;
use crate::util::{deserialize_timestamp, null_as_default};

/// Which of the three result layouts a decode produces.
///
/// Chosen once per job from the caller's `parse` and custom-instructions
/// flags; the decoder never falls back from one shape to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultShape {
    /// `content` is the page as an opaque string.
    #[default]
    Raw,
    /// `content` follows the provider's fixed parsed-SERP schema.
    Parsed,
    /// `content` is an open object shaped by caller parsing instructions.
    CustomParsed,
}

impl ResultShape {
    pub fn from_flags(parse: bool, custom_parse: bool) -> Self {
        match (parse, custom_parse) {
            (false, _) => ResultShape::Raw,
            (true, false) => ResultShape::Parsed,
            (true, true) => ResultShape::CustomParsed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResultShape::Raw => "raw",
            ResultShape::Parsed => "parsed",
            ResultShape::CustomParsed => "custom_parsed",
        }
    }
}

impl fmt::Display for ResultShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Content of a custom-parsed entry: whatever the parsing instructions produced.
pub type CustomContent = serde_json::Map<String, serde_json::Value>;

/// One page of scraped content from the `results` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEntry<C> {
    pub content: C,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub page: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub job_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status_code: u16,
}

/// Parsed search-results page.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsedContent {
    #[serde(deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(deserialize_with = "null_as_default")]
    pub page: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub results: SerpResults,
    #[serde(deserialize_with = "null_as_default")]
    pub last_visible_page: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub parse_status_code: i64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SerpResults {
    #[serde(deserialize_with = "null_as_default")]
    pub paid: Vec<PaidResult>,
    #[serde(deserialize_with = "null_as_default")]
    pub organic: Vec<OrganicResult>,
    pub related_searches: Option<RelatedSearches>,
    pub search_information: Option<SearchInformation>,
    #[serde(deserialize_with = "null_as_default")]
    pub total_results_count: u64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganicResult {
    #[serde(deserialize_with = "null_as_default")]
    pub pos: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(deserialize_with = "null_as_default")]
    pub desc: String,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub pos_overall: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PaidResult {
    #[serde(deserialize_with = "null_as_default")]
    pub pos: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(deserialize_with = "null_as_default")]
    pub desc: String,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub url_shown: String,
    #[serde(deserialize_with = "null_as_default")]
    pub pos_overall: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelatedSearches {
    #[serde(deserialize_with = "null_as_default")]
    pub pos_overall: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub related_searches: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchInformation {
    #[serde(deserialize_with = "null_as_default")]
    pub query: String,
    #[serde(deserialize_with = "null_as_default")]
    pub showing_results_for: String,
    #[serde(deserialize_with = "null_as_default")]
    pub total_results_count: u64,
}

/// Decoded `results` array. One variant per decode, so entries of
/// different shapes can never be mixed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "shape", content = "entries", rename_all = "snake_case")]
pub enum ResultSet {
    Raw(Vec<ResultEntry<String>>),
    Parsed(Vec<ResultEntry<ParsedContent>>),
    CustomParsed(Vec<ResultEntry<CustomContent>>),
}

impl ResultSet {
    /// Empty set of the given shape.
    pub fn empty(shape: ResultShape) -> Self {
        match shape {
            ResultShape::Raw => ResultSet::Raw(Vec::new()),
            ResultShape::Parsed => ResultSet::Parsed(Vec::new()),
            ResultShape::CustomParsed => ResultSet::CustomParsed(Vec::new()),
        }
    }

    pub fn shape(&self) -> ResultShape {
        match self {
            ResultSet::Raw(_) => ResultShape::Raw,
            ResultSet::Parsed(_) => ResultShape::Parsed,
            ResultSet::CustomParsed(_) => ResultShape::CustomParsed,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ResultSet::Raw(e) => e.len(),
            ResultSet::Parsed(e) => e.len(),
            ResultSet::CustomParsed(e) => e.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn raw(&self) -> Option<&[ResultEntry<String>]> {
        match self {
            ResultSet::Raw(e) => Some(e),
            _ => None,
        }
    }

    pub fn parsed(&self) -> Option<&[ResultEntry<ParsedContent>]> {
        match self {
            ResultSet::Parsed(e) => Some(e),
            _ => None,
        }
    }

    pub fn custom(&self) -> Option<&[ResultEntry<CustomContent>]> {
        match self {
            ResultSet::CustomParsed(e) => Some(e),
            _ => None,
        }
    }

    /// Page numbers in server order, regardless of shape.
    pub fn pages(&self) -> Vec<u32> {
        match self {
            ResultSet::Raw(e) => e.iter().map(|r| r.page).collect(),
            ResultSet::Parsed(e) => e.iter().map(|r| r.page).collect(),
            ResultSet::CustomParsed(e) => e.iter().map(|r| r.page).collect(),
        }
    }
}

/// Results of a finished job, as returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedResponse {
    pub results: ResultSet,
    pub job: Job,
    /// HTTP status code of the results request.
    pub status_code: u16,
    /// HTTP status line of the results request, e.g. `"200 OK"`.
    pub status: String,
}
