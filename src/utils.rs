//! Display helpers for replies. Not used on the request path.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

const UNSAFE_CHARS: &str = r#"[^\w\s.,?!:;()\[\]{}'"-]"#;
const FENCE_OPEN: &str = r"```(\w+)?\n?";
const FENCE_CLOSE: &str = r"\n?```";
const MEDICATION: &str
  = r"(?i)\b[A-Z][a-z]*(?:mab|nib|zumab|ximab|limus|prazole|sartan|statin)\b";
const CONDITION: &str
  = r"(?i)\b(?:diabetes|hypertension|asthma|cancer|depression|anxiety)\b";
const PROCEDURE: &str
  = r"(?i)\b(?:surgery|biopsy|transplant|resection|angioplasty)\b";

static UNSAFE_CHARS_RE: LazyLock<Regex>
  = LazyLock::new(|| Regex::new(UNSAFE_CHARS).unwrap());
static FENCE_OPEN_RE: LazyLock<Regex>
  = LazyLock::new(|| Regex::new(FENCE_OPEN).unwrap());
static FENCE_CLOSE_RE: LazyLock<Regex>
  = LazyLock::new(|| Regex::new(FENCE_CLOSE).unwrap());
static ENTITY_RES: LazyLock<[(EntityKind, Regex); 3]>
  = LazyLock::new(|| [
      (EntityKind::Medication, Regex::new(MEDICATION).unwrap())
    , (EntityKind::Condition, Regex::new(CONDITION).unwrap())
    , (EntityKind::Procedure, Regex::new(PROCEDURE).unwrap())
    ]);

/// Kind of term tagged by [`parse_medical_entities`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind
{   Medication
  , Condition
  , Procedure
}

/// A tagged term with byte offsets into the source text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicalEntity
{   pub kind: EntityKind
  , pub text: String
  , pub start: usize
  , pub end: usize
}

/// Drop characters outside word chars, whitespace and basic punctuation
pub fn sanitize_input(text: &str) -> String
{   UNSAFE_CHARS_RE.replace_all(text, "").into_owned()
}

/// Tidy markdown produced by the model for terminal display
pub fn format_markdown_response(text: &str) -> String
{   let text = break_before_headers(text);
    let text = space_after_lists(&text);
    normalize_fences(&text)
}

/// Headers not already at a line start are moved onto their own line
fn break_before_headers(text: &str) -> String
{   let mut out = String::with_capacity(text.len());
    let mut prev: Option<char> = None;
    for c in text.chars()
    {   if c == '#' && !matches!(prev, None | Some('\n') | Some('#'))
        {   out.push('\n');
        }
        out.push(c);
        prev = Some(c);
    }
    out
}

/// `1. text` style list item
fn is_numbered_item(line: &str) -> bool
{   let rest = line.trim_start_matches(|c: char| c.is_ascii_digit());
    rest.len() < line.len()
      && rest.starts_with('.')
      && rest.len() > 1
}

/// Blank line between a numbered item and following non-list text
fn space_after_lists(text: &str) -> String
{   let lines: Vec<&str> = text.split('\n').collect();
    let mut out = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate()
    {   out.push(*line);
        if i == 0 || !is_numbered_item(line)
        {   continue;
        }
        let continues_list = lines.get(i + 1)
          .and_then(|next| next.chars().next())
          .map(|c| c.is_ascii_digit() || c == '*' || c == '-')
          .unwrap_or(true);
        if !continues_list
        {   out.push("");
        }
    }
    out.join("\n")
}

/// Opening fences end their line; every fence starts one
fn normalize_fences(text: &str) -> String
{   let text = FENCE_OPEN_RE.replace_all(text, "```${1}\n");
    FENCE_CLOSE_RE.replace_all(&text, "\n```").into_owned()
}

/// Tag medication, condition and procedure names by pattern.
/// Illustrative only; not a clinical entity recognizer.
pub fn parse_medical_entities(text: &str) -> Vec<MedicalEntity>
{   let mut entities = Vec::new();
    for (kind, re) in ENTITY_RES.iter()
    {   for m in re.find_iter(text)
        {   entities.push(MedicalEntity
            {   kind: *kind
              , text: m.as_str().to_string()
              , start: m.start()
              , end: m.end()
            });
        }
    }
    entities
}

/// Standard medical disclaimer shown before a conversation
pub fn medical_disclaimer() -> &'static str
{   "**Medical Disclaimer**: The information provided is for \
     informational purposes only and is not a substitute for \
     professional medical advice, diagnosis, or treatment. Always seek \
     the advice of your physician or other qualified health provider \
     with any questions you may have regarding a medical condition."
}
