//! Compiled lexicons: verb patterns, actor/agent patterns, synonym sets, and
//! transformation rules.
//!
//! The store is built once at startup (from the text formats in [`load`] or
//! programmatically via [`DictionaryBuilder`]) and is read-only for the rest
//! of the run. Every resolver call receives a shared reference; there is no
//! process-global state.

pub mod load;

use crate::ontology::{EventCode, NULL_CODE};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// =============================================================================
// Dates
// =============================================================================

/// Parse a compact `YYYYMMDD` or `YYMMDD` date.
///
/// Two-digit years pivot at 70: `70..=99` are 1900s, `00..=69` are 2000s.
#[must_use]
pub fn parse_compact_date(text: &str) -> Option<NaiveDate> {
    let digits = text.trim();
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let (year, rest) = match digits.len() {
        8 => (digits[..4].parse::<i32>().ok()?, &digits[4..]),
        6 => {
            let yy = digits[..2].parse::<i32>().ok()?;
            let year = if yy >= 70 { 1900 + yy } else { 2000 + yy };
            (year, &digits[2..])
        }
        _ => return None,
    };
    let month = rest[..2].parse::<u32>().ok()?;
    let day = rest[2..].parse::<u32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Validity window attached to one code of a [`CodeSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateRestriction {
    /// Always valid; used as the fallback when no restricted entry holds.
    Unrestricted,
    /// Valid on or before the bound.
    Before(NaiveDate),
    /// Valid on or after the bound.
    After(NaiveDate),
    /// Valid within the inclusive range.
    Between(NaiveDate, NaiveDate),
}

impl DateRestriction {
    fn holds(&self, date: NaiveDate) -> bool {
        match *self {
            DateRestriction::Unrestricted => false,
            DateRestriction::Before(bound) => date <= bound,
            DateRestriction::After(bound) => date >= bound,
            DateRestriction::Between(lo, hi) => lo <= date && date <= hi,
        }
    }
}

/// Ordered list of date-restricted codes for one actor.
///
/// Order is significant: the first entry whose restriction holds wins, falling
/// back to the first unrestricted entry, else the null code. Entries are kept
/// in insertion order, never sorted by date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSet {
    entries: Vec<(DateRestriction, String)>,
}

impl CodeSet {
    /// An empty set resolving to the null code.
    #[must_use]
    pub fn new() -> Self {
        CodeSet::default()
    }

    /// A single unrestricted code.
    #[must_use]
    pub fn unrestricted(code: impl Into<String>) -> Self {
        let mut set = CodeSet::new();
        set.push(DateRestriction::Unrestricted, code);
        set
    }

    /// Append an entry, preserving insertion order.
    pub fn push(&mut self, restriction: DateRestriction, code: impl Into<String>) {
        self.entries.push((restriction, code.into()));
    }

    /// True if no codes are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve to a code for the given sentence date.
    #[must_use]
    pub fn resolve(&self, date: Option<NaiveDate>) -> &str {
        if let Some(date) = date {
            for (restriction, code) in &self.entries {
                if restriction.holds(date) {
                    return code;
                }
            }
        }
        self.entries
            .iter()
            .find(|(r, _)| matches!(r, DateRestriction::Unrestricted))
            .map_or(NULL_CODE, |(_, code)| code.as_str())
    }
}

// =============================================================================
// Phrases and connectors
// =============================================================================

/// One word of a dictionary phrase, with its connector to the previous word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhraseWord {
    /// Upper-cased word text.
    pub text: String,
    /// `_` connector: this word must immediately follow the previous one.
    /// The blank connector (`false`) allows intervening tokens.
    pub adjacent: bool,
}

/// Parse a dictionary phrase into connector-annotated words.
///
/// Space-separated units permit intervening tokens; `_`-joined words inside a
/// unit require adjacency ("NORTH_KOREA" vs "UNITED NATIONS").
#[must_use]
pub fn parse_phrase(text: &str) -> Vec<PhraseWord> {
    let mut words = Vec::new();
    for unit in text.split_whitespace() {
        for (i, word) in unit.split('_').filter(|w| !w.is_empty()).enumerate() {
            words.push(PhraseWord {
                text: word.to_uppercase(),
                adjacent: i > 0,
            });
        }
    }
    words
}

/// Match `words` against `tokens` starting at `start`, honoring connectors.
///
/// Returns the number of tokens consumed (from `start` through the last
/// matched word) on success.
#[must_use]
pub fn match_phrase_at(words: &[PhraseWord], tokens: &[String], start: usize) -> Option<usize> {
    let first = words.first()?;
    if tokens.get(start)? != &first.text {
        return None;
    }
    let mut pos = start + 1;
    for word in &words[1..] {
        if word.adjacent {
            if tokens.get(pos)? != &word.text {
                return None;
            }
            pos += 1;
        } else {
            let found = tokens[pos..].iter().position(|t| t == &word.text)?;
            pos += found + 1;
        }
    }
    Some(pos - start)
}

// =============================================================================
// Actor and agent patterns
// =============================================================================

/// A word sequence resolving to a date-restricted actor code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorPattern {
    /// Connector-annotated words, first word is the index key.
    pub words: Vec<PhraseWord>,
    /// Date-restricted codes, first satisfying entry wins.
    pub codes: CodeSet,
}

/// Where an agent code combines relative to the actor code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentPosition {
    /// `[CODE~]`: agent code precedes the actor code.
    Prefix,
    /// `[~CODE]`: agent code follows the actor code.
    Suffix,
}

/// A word sequence contributing a role code to an actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentPattern {
    /// Connector-annotated words.
    pub words: Vec<PhraseWord>,
    /// Three-character role code, without the `~` marker.
    pub code: String,
    /// Combination order relative to the actor code.
    pub position: AgentPosition,
}

// =============================================================================
// Verb patterns
// =============================================================================

/// One token of a verb pattern's upper or lower context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatTok {
    /// `*` / `,`: matches any noun entity.
    Wild,
    /// Literal noun-head words; multiple words require adjacency (`_`-joined).
    Lex(Vec<String>),
    /// `|WORD`: matches a preposition lexeme.
    Prep(String),
    /// `&NAME`: matches any literal member of the named synset.
    Synset(String),
}

/// Parse a space-separated pattern token string.
///
/// `*` and `,` are wildcards, `|WORD` a preposition, `&NAME` a synset
/// reference, anything else a literal (with `_` adjacency joining).
#[must_use]
pub fn parse_pattern_tokens(text: &str) -> Vec<PatTok> {
    text.split_whitespace()
        .filter_map(|tok| match tok {
            "*" | "," => Some(PatTok::Wild),
            _ if tok.starts_with('|') => Some(PatTok::Prep(tok[1..].to_uppercase())),
            _ if tok.starts_with('&') => Some(PatTok::Synset(tok[1..].to_uppercase())),
            "" => None,
            _ => Some(PatTok::Lex(
                tok.split('_')
                    .filter(|w| !w.is_empty())
                    .map(str::to_uppercase)
                    .collect(),
            )),
        })
        .collect()
}

/// A context pattern attached to a verb entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerbPattern {
    /// Tokens matched against the context before the verb.
    pub upper: Vec<PatTok>,
    /// Tokens matched against the context after the verb.
    pub lower: Vec<PatTok>,
    /// Code assigned when the pattern matches.
    pub code: EventCode,
}

impl VerbPattern {
    /// Word count across both contexts; multi-word literals count each word,
    /// so longest-match-first ordering reflects surface length.
    fn word_count(&self) -> usize {
        self.upper
            .iter()
            .chain(&self.lower)
            .map(|tok| match tok {
                PatTok::Lex(words) => words.len(),
                _ => 1,
            })
            .sum()
    }
}

/// A verb block: default code plus its context patterns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerbEntry {
    /// Canonical primary verb of the block.
    pub name: String,
    /// Default code when no pattern matches.
    pub code: Option<EventCode>,
    /// Patterns, sorted by descending token count (longest-match-first).
    pub patterns: Vec<VerbPattern>,
}

/// One surface form of a verb: a single word, an inflection, or a multi-word
/// form ("TAKE OVER"). Forms are indexed under their first word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerbForm {
    /// Words of the form.
    pub words: Vec<String>,
    /// Index of the owning [`VerbEntry`] in the store.
    pub entry: usize,
}

// =============================================================================
// Synsets and transformations
// =============================================================================

/// A named set of interchangeable literal phrases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Synset {
    /// Member phrases as word vectors.
    pub members: Vec<Vec<String>>,
}

/// Which originating role a transformation output binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoleRef {
    /// Source of the outer candidate.
    OuterSource,
    /// Target of the outer candidate.
    OuterTarget,
    /// Source of the nested sub-event.
    InnerSource,
    /// Target of the nested sub-event.
    InnerTarget,
}

/// How a transformation output derives its event code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodeOp {
    /// Keep the outer candidate's code.
    Outer,
    /// Take the nested sub-event's code.
    Inner,
    /// Combine outer and inner via the ontology algebra.
    Combine,
}

/// A variable-binding rewrite applied when a verb's complement contains a
/// nested sub-event. The first rule whose code keys match is applied;
/// candidates matched by no rule pass through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformRule {
    /// Required outer code, `None` for any.
    pub outer: Option<i64>,
    /// Required inner code, `None` for any.
    pub inner: Option<i64>,
    /// Binding for the rewritten source.
    pub source: RoleRef,
    /// Binding for the rewritten target.
    pub target: RoleRef,
    /// Code derivation for the rewritten candidate.
    pub code: CodeOp,
}

// =============================================================================
// Store
// =============================================================================

/// Immutable compiled lexicons, built once and shared for the whole run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DictionaryStore {
    entries: Vec<VerbEntry>,
    forms: Vec<VerbForm>,
    /// Word -> indices into `forms`; multi-word forms appear under every word.
    verb_index: HashMap<String, Vec<usize>>,
    /// First word -> actor patterns, sorted by descending word count.
    actors: HashMap<String, Vec<ActorPattern>>,
    /// First word -> agent patterns, sorted by descending word count.
    agents: HashMap<String, Vec<AgentPattern>>,
    synsets: HashMap<String, Synset>,
    transforms: Vec<TransformRule>,
}

impl DictionaryStore {
    /// Start building a store.
    #[must_use]
    pub fn builder() -> DictionaryBuilder {
        DictionaryBuilder::default()
    }

    /// Verb forms containing this word, multi-word forms first, the
    /// single-word sense always last.
    #[must_use]
    pub fn lookup_verb(&self, word: &str) -> Option<&[usize]> {
        self.verb_index.get(word).map(Vec::as_slice)
    }

    /// The form at the given index.
    #[must_use]
    pub fn form(&self, idx: usize) -> &VerbForm {
        &self.forms[idx]
    }

    /// The entry owning the given form.
    #[must_use]
    pub fn entry_for(&self, form: &VerbForm) -> &VerbEntry {
        &self.entries[form.entry]
    }

    /// Actor patterns whose first word is `word`, longest first.
    #[must_use]
    pub fn lookup_actor(&self, word: &str) -> Option<&[ActorPattern]> {
        self.actors.get(word).map(Vec::as_slice)
    }

    /// Agent patterns whose first word is `word`, longest first.
    #[must_use]
    pub fn lookup_agent(&self, word: &str) -> Option<&[AgentPattern]> {
        self.agents.get(word).map(Vec::as_slice)
    }

    /// The named synset, if defined.
    #[must_use]
    pub fn synset(&self, name: &str) -> Option<&Synset> {
        self.synsets.get(name)
    }

    /// Transformation rules in declaration order.
    #[must_use]
    pub fn transforms(&self) -> &[TransformRule] {
        &self.transforms
    }

    /// Resolve a date-restricted code set against a sentence date.
    #[must_use]
    pub fn resolve_date_code<'a>(&self, codes: &'a CodeSet, date: Option<NaiveDate>) -> &'a str {
        codes.resolve(date)
    }

    /// Number of verb entries (for load summaries).
    #[must_use]
    pub fn verb_count(&self) -> usize {
        self.entries.len()
    }

    /// Number of distinct actor first-word keys (for load summaries).
    #[must_use]
    pub fn actor_count(&self) -> usize {
        self.actors.values().map(Vec::len).sum()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`DictionaryStore`]; used by the text-format loaders and by
/// tests constructing lexicons programmatically.
#[derive(Debug, Default)]
pub struct DictionaryBuilder {
    store: DictionaryStore,
    /// Primary verb name -> entry index.
    by_name: HashMap<String, usize>,
}

impl DictionaryBuilder {
    /// Add an actor phrase with a full code set.
    pub fn actor_codes(&mut self, phrase: &str, codes: CodeSet) -> &mut Self {
        let words = parse_phrase(phrase);
        if let Some(first) = words.first() {
            let key = first.text.clone();
            self.store
                .actors
                .entry(key)
                .or_default()
                .push(ActorPattern { words, codes });
        }
        self
    }

    /// Add an actor phrase with a single unrestricted code.
    pub fn actor(&mut self, phrase: &str, code: &str) -> &mut Self {
        self.actor_codes(phrase, CodeSet::unrestricted(code))
    }

    /// Add an agent phrase; `code` carries the `~` marker (`"~MIL"` or
    /// `"MIL~"`).
    pub fn agent(&mut self, phrase: &str, code: &str) -> &mut Self {
        let (position, bare) = if let Some(stripped) = code.strip_prefix('~') {
            (AgentPosition::Suffix, stripped)
        } else if let Some(stripped) = code.strip_suffix('~') {
            (AgentPosition::Prefix, stripped)
        } else {
            (AgentPosition::Suffix, code)
        };
        let words = parse_phrase(phrase);
        if let Some(first) = words.first() {
            let key = first.text.clone();
            self.store.agents.entry(key).or_default().push(AgentPattern {
                words,
                code: bare.to_uppercase(),
                position,
            });
        }
        self
    }

    /// Add a primary verb with an optional default code.
    pub fn verb(&mut self, name: &str, code: Option<&str>) -> &mut Self {
        let name = name.to_uppercase();
        let entry = self.store.entries.len();
        self.store.entries.push(VerbEntry {
            name: name.clone(),
            code: code.and_then(EventCode::parse),
            patterns: Vec::new(),
        });
        self.by_name.insert(name.clone(), entry);
        self.store.forms.push(VerbForm {
            words: vec![name],
            entry,
        });
        self
    }

    /// Add an inflected or synonymous single-word form of a primary verb.
    pub fn verb_alias(&mut self, primary: &str, alias: &str) -> &mut Self {
        if let Some(&entry) = self.by_name.get(&primary.to_uppercase()) {
            self.store.forms.push(VerbForm {
                words: vec![alias.to_uppercase()],
                entry,
            });
        }
        self
    }

    /// Add a multi-word form of a primary verb ("TAKE OVER").
    pub fn verb_form(&mut self, primary: &str, form: &str) -> &mut Self {
        if let Some(&entry) = self.by_name.get(&primary.to_uppercase()) {
            let words: Vec<String> = form.split_whitespace().map(str::to_uppercase).collect();
            if words.len() > 1 {
                self.store.forms.push(VerbForm { words, entry });
            }
        }
        self
    }

    /// Attach a context pattern to a primary verb. Token syntax is that of
    /// [`parse_pattern_tokens`].
    pub fn pattern(&mut self, primary: &str, upper: &str, lower: &str, code: &str) -> &mut Self {
        if let Some(&entry) = self.by_name.get(&primary.to_uppercase()) {
            if let Some(code) = EventCode::parse(code) {
                self.store.entries[entry].patterns.push(VerbPattern {
                    upper: parse_pattern_tokens(upper),
                    lower: parse_pattern_tokens(lower),
                    code,
                });
            }
        }
        self
    }

    /// Define a synset; members are phrases in dictionary phrase syntax.
    pub fn synset(&mut self, name: &str, members: &[&str]) -> &mut Self {
        let set = Synset {
            members: members
                .iter()
                .map(|m| {
                    m.split(['_', ' '])
                        .filter(|w| !w.is_empty())
                        .map(str::to_uppercase)
                        .collect()
                })
                .collect(),
        };
        self.store.synsets.insert(name.to_uppercase(), set);
        self
    }

    /// Append a transformation rule.
    pub fn transform(&mut self, rule: TransformRule) -> &mut Self {
        self.store.transforms.push(rule);
        self
    }

    /// True if the named synset has been defined (used by loaders to reject
    /// patterns referencing unknown sets).
    #[must_use]
    pub fn has_synset(&self, name: &str) -> bool {
        self.store.synsets.contains_key(name)
    }

    /// Finish: sort every pattern list longest-first and freeze the store.
    #[must_use]
    pub fn build(mut self) -> DictionaryStore {
        for patterns in self.store.actors.values_mut() {
            patterns.sort_by_key(|p| std::cmp::Reverse(p.words.len()));
        }
        for patterns in self.store.agents.values_mut() {
            patterns.sort_by_key(|p| std::cmp::Reverse(p.words.len()));
        }
        for entry in &mut self.store.entries {
            entry.patterns.sort_by_key(|p| std::cmp::Reverse(p.word_count()));
        }
        // Index every form under its first word, the only word a lexical
        // head can anchor; multi-word forms sort ahead of the single-word
        // sense, which is always tried last.
        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, form) in self.store.forms.iter().enumerate() {
            if let Some(word) = form.words.first() {
                index.entry(word.clone()).or_default().push(i);
            }
        }
        for ids in index.values_mut() {
            ids.sort_by_key(|&i| std::cmp::Reverse(self.store.forms[i].words.len()));
        }
        self.store.verb_index = index;
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        parse_compact_date(s).unwrap()
    }

    #[test]
    fn compact_date_parsing() {
        assert_eq!(
            parse_compact_date("19900101"),
            NaiveDate::from_ymd_opt(1990, 1, 1)
        );
        assert_eq!(
            parse_compact_date("850615"),
            NaiveDate::from_ymd_opt(1985, 6, 15)
        );
        assert_eq!(
            parse_compact_date("050615"),
            NaiveDate::from_ymd_opt(2005, 6, 15)
        );
        assert_eq!(parse_compact_date("1990"), None);
        assert_eq!(parse_compact_date("19901340"), None);
    }

    #[test]
    fn code_set_resolution_order() {
        let mut set = CodeSet::new();
        set.push(DateRestriction::Before(date("19900101")), "X");
        set.push(DateRestriction::After(date("19900101")), "Y");
        assert_eq!(set.resolve(Some(date("19850101"))), "X");
        assert_eq!(set.resolve(Some(date("19950101"))), "Y");
        // Boundary date satisfies the first entry in stored order.
        assert_eq!(set.resolve(Some(date("19900101"))), "X");
    }

    #[test]
    fn code_set_falls_back_to_unrestricted() {
        let mut set = CodeSet::new();
        set.push(DateRestriction::Between(date("19800101"), date("19891231")), "OLD");
        set.push(DateRestriction::Unrestricted, "DEF");
        assert_eq!(set.resolve(Some(date("19950101"))), "DEF");
        assert_eq!(set.resolve(None), "DEF");
    }

    #[test]
    fn code_set_without_match_is_null() {
        let mut set = CodeSet::new();
        set.push(DateRestriction::After(date("20000101")), "NEW");
        assert_eq!(set.resolve(Some(date("19950101"))), NULL_CODE);
        assert_eq!(set.resolve(None), NULL_CODE);
    }

    #[test]
    fn phrase_connectors() {
        let words = parse_phrase("NORTH_KOREA");
        assert!(!words[0].adjacent);
        assert!(words[1].adjacent);
        let loose = parse_phrase("UNITED NATIONS");
        assert!(!loose[1].adjacent);
    }

    #[test]
    fn adjacency_blocks_intervening_tokens() {
        let tight = parse_phrase("NORTH_KOREA");
        let loose = parse_phrase("NORTH KOREA");
        let tokens: Vec<String> = ["NORTH", "EASTERN", "KOREA"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(match_phrase_at(&tight, &tokens, 0), None);
        assert_eq!(match_phrase_at(&loose, &tokens, 0), Some(3));
        let tokens: Vec<String> = ["NORTH", "KOREA"].iter().map(|s| s.to_string()).collect();
        assert_eq!(match_phrase_at(&tight, &tokens, 0), Some(2));
    }

    #[test]
    fn actor_patterns_sorted_longest_first() {
        let mut b = DictionaryStore::builder();
        b.actor("KOREA", "B");
        b.actor("KOREA PENINSULA FORCES", "C");
        let store = b.build();
        let patterns = store.lookup_actor("KOREA").unwrap();
        assert_eq!(patterns[0].words.len(), 3);
        assert_eq!(patterns[1].words.len(), 1);
    }

    #[test]
    fn multiword_verb_forms_ordered_before_single() {
        let mut b = DictionaryStore::builder();
        b.verb("TAKE", Some("---"));
        b.verb_form("TAKE", "TAKE OVER");
        let store = b.build();
        let forms = store.lookup_verb("TAKE").unwrap();
        assert_eq!(store.form(forms[0]).words, vec!["TAKE", "OVER"]);
        assert_eq!(store.form(forms[1]).words, vec!["TAKE"]);
        // Only the first word anchors a form; later words never head it.
        assert!(store.lookup_verb("OVER").is_none());
    }

    #[test]
    fn agent_tilde_marks_position() {
        let mut b = DictionaryStore::builder();
        b.agent("POLICE", "~COP");
        b.agent("REBEL", "REB~");
        let store = b.build();
        assert_eq!(
            store.lookup_agent("POLICE").unwrap()[0].position,
            AgentPosition::Suffix
        );
        assert_eq!(
            store.lookup_agent("REBEL").unwrap()[0].position,
            AgentPosition::Prefix
        );
    }

    #[test]
    fn pattern_token_syntax() {
        let toks = parse_pattern_tokens("* |AGAINST &WEAPON MILITARY_BASE");
        assert_eq!(toks[0], PatTok::Wild);
        assert_eq!(toks[1], PatTok::Prep("AGAINST".into()));
        assert_eq!(toks[2], PatTok::Synset("WEAPON".into()));
        assert_eq!(
            toks[3],
            PatTok::Lex(vec!["MILITARY".into(), "BASE".into()])
        );
    }
}
