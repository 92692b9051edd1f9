/*! PPDB record parsing

A PPDB line holds five ` ||| `-separated columns:

```text
<lhs> ||| <source> ||| <target> ||| <k1>=<v1> <k2>=<v2> ... ||| <alignment>
```

Parsing is pure: a [ParaphraseRecord] is built from a single line and nothing else.
Syntactic annotations (`[NP]`, `[VP/NN]`...) are stripped from source and target,
and phrases are optionally escaped the way Moses expects them.
!*/
use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

/// Column delimiter of both PPDB and Moses phrase tables.
pub const COLUMN_DELIMITER: &str = " ||| ";

/// Default designated feature: `p(f|e)`, as a negative log probability.
pub const DEFAULT_FEATURE: &str = "p(f|e)";

const NB_COLUMNS: usize = 5;

lazy_static! {
    static ref MARKUP: Regex = Regex::new(r"\[[^\]]+\]\s*").unwrap();
}

/// Reasons for a line to be rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordError {
    /// The line does not split into five columns. Holds the number of columns found.
    FieldCount(usize),
    /// A feature token is not of the `key=value` form.
    Feature(String),
    /// The designated feature is absent.
    MissingFeature(String),
    /// The designated feature is not a number.
    InvalidNumber { feature: String, value: String },
    /// Empty (or whitespace only) line.
    EmptyLine,
    /// Line is not valid UTF-8.
    InvalidUtf8,
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FieldCount(n) => write!(f, "expected {} columns, found {}", NB_COLUMNS, n),
            Self::Feature(token) => write!(f, "feature token {:?} is not key=value", token),
            Self::MissingFeature(key) => write!(f, "missing required feature {:?}", key),
            Self::InvalidNumber { feature, value } => {
                write!(f, "feature {:?} has non numeric value {:?}", feature, value)
            }
            Self::EmptyLine => write!(f, "empty line"),
            Self::InvalidUtf8 => write!(f, "invalid UTF-8"),
        }
    }
}

/// One parsed PPDB line.
///
/// `target` is the group key.
/// `feature` is the raw value of the designated feature (a negative log probability),
/// see [ParaphraseRecord::raw_score] to get the score itself.
#[derive(Debug, Clone, PartialEq)]
pub struct ParaphraseRecord {
    label: String,
    source: String,
    target: String,
    feature: f64,
    alignment: String,
}

impl ParaphraseRecord {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn feature(&self) -> f64 {
        self.feature
    }

    pub fn alignment(&self) -> &str {
        &self.alignment
    }

    /// `base ^ -feature`.
    pub fn raw_score(&self, base: f64) -> f64 {
        base.powf(-self.feature)
    }

    /// Consumes the record, yielding `(target, source, alignment)`.
    pub fn into_parts(self) -> (String, String, String) {
        (self.target, self.source, self.alignment)
    }
}

/// Phrase cleaning options shared by the parser and the chunker,
/// so that both compute identical group keys.
#[derive(Debug, Clone)]
pub struct Parser {
    feature: String,
    escape: bool,
}

impl Default for Parser {
    fn default() -> Self {
        Self {
            feature: DEFAULT_FEATURE.to_string(),
            escape: true,
        }
    }
}

impl Parser {
    pub fn new(feature: &str, escape: bool) -> Self {
        Self {
            feature: feature.to_string(),
            escape,
        }
    }

    /// Parse a full line.
    ///
    /// The trailing newline (`\n` or `\r\n`) is ignored if present.
    pub fn parse(&self, line: &str) -> Result<ParaphraseRecord, RecordError> {
        let columns = split_columns(line)?;

        let feature = self.designated_feature(columns[3])?;

        Ok(ParaphraseRecord {
            label: columns[0].to_string(),
            source: self.clean_phrase(columns[1]),
            target: self.clean_phrase(columns[2]),
            feature,
            alignment: columns[4].to_string(),
        })
    }

    /// Get the group key (cleaned target phrase) of a line without parsing features.
    pub fn group_key(&self, line: &str) -> Result<String, RecordError> {
        let columns = split_columns(line)?;
        Ok(self.clean_phrase(columns[2]))
    }

    /// Strip syntactic markup, then escape if enabled.
    pub fn clean_phrase(&self, phrase: &str) -> String {
        let stripped = MARKUP.replace_all(phrase, "");
        let stripped = stripped.trim();
        if self.escape {
            escape_moses(stripped)
        } else {
            stripped.to_string()
        }
    }

    fn designated_feature(&self, features: &str) -> Result<f64, RecordError> {
        let mut found = None;
        for token in features.split_whitespace() {
            let (key, value) = token
                .split_once('=')
                .ok_or_else(|| RecordError::Feature(token.to_string()))?;
            if key == self.feature {
                found = Some(value);
            }
        }

        let value = found.ok_or_else(|| RecordError::MissingFeature(self.feature.clone()))?;
        match value.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(RecordError::InvalidNumber {
                feature: self.feature.clone(),
                value: value.to_string(),
            }),
        }
    }
}

fn split_columns(line: &str) -> Result<Vec<&str>, RecordError> {
    let line = line.trim_end_matches(['\n', '\r']);
    if line.trim().is_empty() {
        return Err(RecordError::EmptyLine);
    }

    let columns: Vec<&str> = line.split(COLUMN_DELIMITER).collect();
    if columns.len() != NB_COLUMNS {
        return Err(RecordError::FieldCount(columns.len()));
    }
    Ok(columns)
}

/// Escape characters that Moses considers special.
///
/// Control characters are dropped and whitespace runs are collapsed into a single space.
pub fn escape_moses(phrase: &str) -> String {
    let mut ret = String::with_capacity(phrase.len());
    let words = phrase
        .split(char::is_whitespace)
        .filter(|word| !word.is_empty());

    for (idx, word) in words.enumerate() {
        if idx > 0 {
            ret.push(' ');
        }
        for c in word.chars() {
            match c {
                '&' => ret.push_str("&amp;"),
                '|' => ret.push_str("&#124;"),
                '<' => ret.push_str("&lt;"),
                '>' => ret.push_str("&gt;"),
                '\'' => ret.push_str("&apos;"),
                '"' => ret.push_str("&quot;"),
                '[' => ret.push_str("&#91;"),
                ']' => ret.push_str("&#93;"),
                c if c.is_control() => (),
                c => ret.push(c),
            }
        }
    }
    ret
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple() {
        let parser = Parser::default();
        let r = parser
            .parse("[X] ||| cat ||| chat ||| p(f|e)=0.000 p(e|f)=1.2 ||| 0-0\n")
            .unwrap();
        assert_eq!(r.label(), "[X]");
        assert_eq!(r.source(), "cat");
        assert_eq!(r.target(), "chat");
        assert_eq!(r.feature(), 0.0);
        assert_eq!(r.alignment(), "0-0");
        assert_eq!(r.raw_score(std::f64::consts::E), 1.0);
    }

    #[test]
    fn parse_strips_markup() {
        let parser = Parser::default();
        let r = parser
            .parse("[NP] ||| [DT] the [NN] cat ||| [NP/NN] le chat  ||| p(f|e)=1 ||| 0-0 1-1")
            .unwrap();
        assert_eq!(r.source(), "the cat");
        assert_eq!(r.target(), "le chat");
        assert_eq!(r.alignment(), "0-0 1-1");
    }

    #[test]
    fn parse_crlf() {
        let parser = Parser::default();
        let r = parser
            .parse("[X] ||| a ||| b ||| p(f|e)=2 ||| 0-0\r\n")
            .unwrap();
        assert_eq!(r.alignment(), "0-0");
    }

    #[test]
    fn field_count() {
        let parser = Parser::default();
        let r = parser.parse("[X] ||| cat ||| chat ||| p(f|e)=0.000");
        assert_eq!(r, Err(RecordError::FieldCount(4)));
    }

    #[test]
    fn missing_feature() {
        let parser = Parser::default();
        let r = parser.parse("[X] ||| cat ||| chat ||| p(e|f)=0.000 ||| 0-0");
        assert_eq!(r, Err(RecordError::MissingFeature("p(f|e)".to_string())));
    }

    #[test]
    fn bad_feature_token() {
        let parser = Parser::default();
        let r = parser.parse("[X] ||| cat ||| chat ||| p(f|e)=0.1 Abstract ||| 0-0");
        assert_eq!(r, Err(RecordError::Feature("Abstract".to_string())));
    }

    #[test]
    fn not_a_number() {
        let parser = Parser::default();
        let r = parser.parse("[X] ||| cat ||| chat ||| p(f|e)=abc ||| 0-0");
        assert_eq!(
            r,
            Err(RecordError::InvalidNumber {
                feature: "p(f|e)".to_string(),
                value: "abc".to_string()
            })
        );
        let r = parser.parse("[X] ||| cat ||| chat ||| p(f|e)=inf ||| 0-0");
        assert!(matches!(r, Err(RecordError::InvalidNumber { .. })));
    }

    #[test]
    fn empty_line() {
        let parser = Parser::default();
        assert_eq!(parser.parse("\n"), Err(RecordError::EmptyLine));
        assert_eq!(parser.group_key("   "), Err(RecordError::EmptyLine));
    }

    #[test]
    fn custom_feature() {
        let parser = Parser::new("PhrasePenalty", true);
        let r = parser
            .parse("[X] ||| a ||| b ||| p(f|e)=3 PhrasePenalty=0.5 ||| 0-0")
            .unwrap();
        assert_eq!(r.feature(), 0.5);
    }

    #[test]
    fn group_key_only_needs_columns() {
        let parser = Parser::default();
        let key = parser
            .group_key("[X] ||| a ||| [NN] b ||| garbage ||| 0-0")
            .unwrap();
        assert_eq!(key, "b");
    }

    #[test]
    fn escape() {
        assert_eq!(escape_moses("a & b"), "a &amp; b");
        assert_eq!(escape_moses("<x> 'y' \"z\""), "&lt;x&gt; &apos;y&apos; &quot;z&quot;");
        assert_eq!(escape_moses("[a]|b"), "&#91;a&#93;&#124;b");
        assert_eq!(escape_moses("  two   words\tend "), "two words end");
        assert_eq!(escape_moses("bell\u{7}"), "bell");
    }

    #[test]
    fn no_escape() {
        let parser = Parser::new(DEFAULT_FEATURE, false);
        assert_eq!(parser.clean_phrase("[NN] rock & roll"), "rock & roll");
    }
}
