//! Verb pattern matching.
//!
//! Locates a verb phrase's lexical head, looks it up in the verb dictionary
//! (multi-word forms first), detects passive voice, and reconciles the verb's
//! default code with its upper context (before the verb) and lower context
//! (after it) by walking a trie of the entry's patterns. A transformation
//! pass then rewrites candidates whose complement carried a nested sub-event.

use crate::dict::{CodeOp, DictionaryStore, PatTok, RoleRef, TransformRule, VerbPattern};
use crate::ontology::EventCode;
use crate::resolve::{ActorRef, Candidate, Meaning, Resolver};
use crate::tree::{NodeData, NodeId, Tree};
use std::collections::HashSet;

const BE_FORMS: &[&str] = &["BE", "IS", "ARE", "WAS", "WERE", "AM", "BEEN", "BEING"];
const NEGATIONS: &[&str] = &["NOT", "NEVER", "N'T"];
const PASSIVE_SOURCE_PREPS: &[&str] = &["BY", "FROM", "IN"];
const PASSIVE_TARGET_PREPS: &[&str] = &["AT", "AGAINST", "INTO", "TOWARD", "TOWARDS"];

/// One token of the matching context around the verb.
#[derive(Debug, Clone)]
enum Ctx {
    /// A noun entity: surface words, lexical head, resolved codes.
    Noun {
        words: Vec<String>,
        head: String,
        actors: ActorRef,
    },
    /// A preposition lexeme.
    Prep(String),
    /// A nested sub-event (inner verb phrase or clause).
    Event(Vec<Candidate>),
}

// =============================================================================
// Pattern trie
// =============================================================================

/// Trie over the lower-context tokens of a verb entry's patterns. Terminal
/// nodes carry the upper-context patterns and result codes.
struct PatternTrie {
    nodes: Vec<TrieNode>,
}

#[derive(Default)]
struct TrieNode {
    lex: Vec<(Vec<String>, usize)>,
    syn: Vec<(String, usize)>,
    prep: Vec<(String, usize)>,
    wild: Option<usize>,
    terminals: Vec<(Vec<PatTok>, EventCode)>,
}

impl PatternTrie {
    fn build(patterns: &[VerbPattern]) -> Self {
        let mut trie = PatternTrie {
            nodes: vec![TrieNode::default()],
        };
        // Input is sorted longest-first, keeping insertion order meaningful.
        for pattern in patterns {
            let mut cur = 0;
            for tok in &pattern.lower {
                cur = trie.step_insert(cur, tok);
            }
            trie.nodes[cur]
                .terminals
                .push((pattern.upper.clone(), pattern.code));
        }
        for node in &mut trie.nodes {
            node.terminals
                .sort_by_key(|(upper, _)| std::cmp::Reverse(upper.len()));
        }
        trie
    }

    fn step_insert(&mut self, cur: usize, tok: &PatTok) -> usize {
        match tok {
            PatTok::Lex(words) => {
                if let Some(&(_, next)) = self.nodes[cur].lex.iter().find(|(w, _)| w == words) {
                    return next;
                }
                let next = self.push_node();
                self.nodes[cur].lex.push((words.clone(), next));
                next
            }
            PatTok::Synset(name) => {
                if let Some(&(_, next)) = self.nodes[cur].syn.iter().find(|(n, _)| n == name) {
                    return next;
                }
                let next = self.push_node();
                self.nodes[cur].syn.push((name.clone(), next));
                next
            }
            PatTok::Prep(word) => {
                if let Some(&(_, next)) = self.nodes[cur].prep.iter().find(|(w, _)| w == word) {
                    return next;
                }
                let next = self.push_node();
                self.nodes[cur].prep.push((word.clone(), next));
                next
            }
            PatTok::Wild => {
                if let Some(next) = self.nodes[cur].wild {
                    return next;
                }
                let next = self.push_node();
                self.nodes[cur].wild = Some(next);
                next
            }
        }
    }

    fn push_node(&mut self) -> usize {
        self.nodes.push(TrieNode::default());
        self.nodes.len() - 1
    }

    /// Walk the trie against the lower context, branch order literal, then
    /// wildcard, then preposition; terminal upper patterns are verified
    /// before a code is returned. Deeper matches win over terminals at the
    /// same node (longest-match-first).
    fn find(
        &self,
        store: &DictionaryStore,
        lower: &[Ctx],
        upper: &[Ctx],
    ) -> Option<EventCode> {
        self.walk(0, lower, 0, upper, store)
    }

    fn walk(
        &self,
        node: usize,
        lower: &[Ctx],
        pos: usize,
        upper: &[Ctx],
        store: &DictionaryStore,
    ) -> Option<EventCode> {
        let n = &self.nodes[node];
        for (words, next) in &n.lex {
            if let Some(at) = find_noun(lower, pos, |noun_words, head| {
                literal_matches(words, noun_words, head)
            }) {
                if let Some(code) = self.walk(*next, lower, at + 1, upper, store) {
                    return Some(code);
                }
            }
        }
        for (name, next) in &n.syn {
            if let Some(synset) = store.synset(name) {
                if let Some(at) = find_noun(lower, pos, |noun_words, head| {
                    synset
                        .members
                        .iter()
                        .any(|m| literal_matches(m, noun_words, head))
                }) {
                    if let Some(code) = self.walk(*next, lower, at + 1, upper, store) {
                        return Some(code);
                    }
                }
            }
        }
        if let Some(next) = n.wild {
            if let Some(at) = find_noun(lower, pos, |_, _| true) {
                if let Some(code) = self.walk(next, lower, at + 1, upper, store) {
                    return Some(code);
                }
            }
        }
        for (word, next) in &n.prep {
            if let Some(at) = (pos..lower.len()).find(|&i| match &lower[i] {
                Ctx::Prep(p) => p == word,
                _ => false,
            }) {
                if let Some(code) = self.walk(*next, lower, at + 1, upper, store) {
                    return Some(code);
                }
            }
        }
        for (upper_pat, code) in &n.terminals {
            if match_linear(upper_pat, upper, store) {
                return Some(*code);
            }
        }
        None
    }
}

fn find_noun<F>(ctx: &[Ctx], from: usize, pred: F) -> Option<usize>
where
    F: Fn(&[String], &str) -> bool,
{
    (from..ctx.len()).find(|&i| match &ctx[i] {
        Ctx::Noun { words, head, .. } => pred(words, head),
        _ => false,
    })
}

/// A single-word literal matches the noun's head; a multi-word (`_`-joined)
/// literal must appear as an adjacent run of the noun's words.
fn literal_matches(literal: &[String], noun_words: &[String], head: &str) -> bool {
    match literal {
        [] => false,
        [word] => word == head,
        _ => noun_words
            .windows(literal.len())
            .any(|w| w == literal),
    }
}

/// Linear match with the trie's token semantics; intervening context tokens
/// are permitted between pattern tokens.
fn match_linear(pattern: &[PatTok], ctx: &[Ctx], store: &DictionaryStore) -> bool {
    let mut pos = 0;
    for tok in pattern {
        let found = match tok {
            PatTok::Lex(words) => find_noun(ctx, pos, |w, h| literal_matches(words, w, h)),
            PatTok::Synset(name) => store.synset(name).and_then(|s| {
                find_noun(ctx, pos, |w, h| {
                    s.members.iter().any(|m| literal_matches(m, w, h))
                })
            }),
            PatTok::Wild => find_noun(ctx, pos, |_, _| true),
            PatTok::Prep(word) => (pos..ctx.len()).find(|&i| match &ctx[i] {
                Ctx::Prep(p) => p == word,
                _ => false,
            }),
        };
        match found {
            Some(at) => pos = at + 1,
            None => return false,
        }
    }
    true
}

// =============================================================================
// Verb phrase analysis
// =============================================================================

/// Compute the candidate events of a verb phrase.
pub(crate) fn analyze_verb_phrase(res: &mut Resolver<'_>, vp: NodeId) -> Vec<Candidate> {
    let tree = res.tree();
    let head = match tree.head_of(vp) {
        Some(h) if tree.node(h).label.starts_with("VB") || tree.node(h).label == "V" => h,
        _ => return Vec::new(),
    };
    let head_word = match tree.node(head).word() {
        Some(w) => w.to_string(),
        None => return Vec::new(),
    };
    let store = res.store();
    let forms = match store.lookup_verb(&head_word) {
        Some(f) => f.to_vec(),
        None => return Vec::new(),
    };

    let clause = tree.enclosing_clause(vp);
    let clause_tokens = tree.tokens_under(clause.unwrap_or(vp));
    let head_pos = clause_tokens.iter().position(|&t| t == head);

    // Multi-word senses first; the single-word sense is always tried last.
    let mut matched: Option<(usize, Vec<NodeId>)> = None;
    for form_idx in forms {
        let form = store.form(form_idx);
        if let Some(consumed) = match_form(tree, &clause_tokens, head_pos, &form.words) {
            matched = Some((form_idx, consumed));
            break;
        }
    }
    let (form_idx, consumed) = match matched {
        Some(m) => m,
        None => return Vec::new(),
    };
    let form = store.form(form_idx);
    let entry = store.entry_for(form);
    let verb_text = form.words.join(" ");
    log::debug!("verb '{}' matched entry '{}'", verb_text, entry.name);

    let passive = is_passive(tree, head, &clause_tokens, head_pos);

    // Lower context: everything the verb governs, minus its own tokens.
    let consumed_set: HashSet<NodeId> = consumed.into_iter().collect();
    let mut lower = Vec::new();
    build_context(res, vp, head, &consumed_set, &mut lower);

    // Upper context: the clause constituents preceding the verb phrase.
    let mut upper = Vec::new();
    let mut subject = ActorRef::default();
    if let Some(cl) = clause {
        let vp_top = topmost_vp_within(res.tree(), vp, cl);
        for &c in &res.tree().children(cl).to_vec() {
            if c == vp_top {
                break;
            }
            build_context(res, c, head, &consumed_set, &mut upper);
            if subject.is_empty() && res.tree().node(c).is_noun_phrase() {
                if let Some(actors) = res.meaning(c).actors() {
                    subject = actors.clone();
                }
            }
        }
    }

    let store = res.store();
    let trie = PatternTrie::build(&entry.patterns);
    let code = match trie.find(store, &lower, &upper) {
        Some(code) => code,
        None => match entry.code {
            Some(code) => code,
            None => return Vec::new(),
        },
    };
    let code = if has_negation(res.tree(), vp, head) {
        code.negated()
    } else {
        code
    };

    let (source, target) = if passive {
        passive_roles(&lower, &subject)
    } else {
        (subject, first_noun_actors(&lower).unwrap_or_default())
    };

    let candidate = Candidate {
        source,
        target,
        code,
        verb_text,
    };
    apply_transforms(store.transforms(), candidate, &lower)
}

/// Match a verb form's words in order from the head token; the head must be
/// the form's first word, later words may skip intervening tokens.
fn match_form(
    tree: &Tree,
    clause_tokens: &[NodeId],
    head_pos: Option<usize>,
    words: &[String],
) -> Option<Vec<NodeId>> {
    let head_pos = head_pos?;
    let mut consumed = vec![clause_tokens[head_pos]];
    let mut pos = head_pos + 1;
    for word in &words[1..] {
        let found = clause_tokens[pos..]
            .iter()
            .position(|&t| tree.node(t).word() == Some(word))?;
        consumed.push(clause_tokens[pos + found]);
        pos += found + 1;
    }
    Some(consumed)
}

/// Passive voice: a past participle governed by a form of "be" and not
/// immediately inside a noun phrase (which would be a reduced relative).
fn is_passive(tree: &Tree, head: NodeId, clause_tokens: &[NodeId], head_pos: Option<usize>) -> bool {
    if tree.node(head).label != "VBN" {
        return false;
    }
    if let Some(parent) = tree.parent(head) {
        if tree.node(parent).is_noun_phrase() {
            return false;
        }
    }
    let head_pos = match head_pos {
        Some(p) => p,
        None => return false,
    };
    clause_tokens[..head_pos].iter().any(|&t| {
        tree.node(t)
            .word()
            .is_some_and(|w| BE_FORMS.contains(&w))
    })
}

/// Negation tokens governed by the verb itself. Embedded clauses and verb
/// phrases that do not contain the head carry their own polarity, so the
/// scan stops at the same boundaries that become sub-events.
fn has_negation(tree: &Tree, id: NodeId, head: NodeId) -> bool {
    tree.children(id).iter().any(|&c| {
        let node = tree.node(c);
        match &node.data {
            NodeData::Token { word } => NEGATIONS.contains(&word.as_str()),
            NodeData::Entity(_) => false,
            NodeData::Phrase => {
                if (node.is_clause() || node.is_verb_phrase())
                    && !subtree_contains(tree, c, head)
                {
                    false
                } else {
                    has_negation(tree, c, head)
                }
            }
        }
    })
}

/// The ancestor of `vp` that is a direct child of `clause` (the verb phrase
/// may sit inside an auxiliary chain).
fn topmost_vp_within(tree: &Tree, vp: NodeId, clause: NodeId) -> NodeId {
    let mut cur = vp;
    while let Some(p) = tree.parent(cur) {
        if p == clause {
            return cur;
        }
        cur = p;
    }
    vp
}

fn subtree_contains(tree: &Tree, id: NodeId, token: NodeId) -> bool {
    if id == token {
        return true;
    }
    tree.children(id)
        .iter()
        .any(|&c| subtree_contains(tree, c, token))
}

/// Flatten a constituent into context tokens. The analyzed verb's own tokens
/// are skipped; an embedded verb phrase or clause becomes a sub-event token.
fn build_context(
    res: &mut Resolver<'_>,
    id: NodeId,
    head: NodeId,
    consumed: &HashSet<NodeId>,
    out: &mut Vec<Ctx>,
) {
    let tree = res.tree();
    let node = tree.node(id);
    match &node.data {
        NodeData::Token { word } => {
            if consumed.contains(&id) || NEGATIONS.contains(&word.as_str()) {
                return;
            }
            if matches!(node.label.as_str(), "IN" | "TO" | "RP" | "PRT") {
                out.push(Ctx::Prep(word.clone()));
            }
        }
        NodeData::Entity(e) => {
            let words = e.words();
            let head_word = e.head().unwrap_or_default().to_string();
            let actors = match res.meaning(id) {
                Meaning::Actors(a) => a,
                _ => ActorRef {
                    codes: Vec::new(),
                    text: e.text(),
                },
            };
            out.push(Ctx::Noun {
                words,
                head: head_word,
                actors,
            });
        }
        NodeData::Phrase => {
            let is_sub_event = (node.is_verb_phrase() || node.is_clause())
                && !subtree_contains(tree, id, head);
            if is_sub_event {
                if let Some(events) = sub_event_candidates(res, id) {
                    out.push(Ctx::Event(events));
                }
                return;
            }
            if node.is_noun_phrase() {
                let words = tree.words_under(id);
                let head_word = tree
                    .head_of(id)
                    .and_then(|h| match &tree.node(h).data {
                        NodeData::Token { word } => Some(word.clone()),
                        NodeData::Entity(e) => e.head().map(str::to_string),
                        NodeData::Phrase => None,
                    })
                    .unwrap_or_default();
                let actors = match res.meaning(id) {
                    Meaning::Actors(a) => a,
                    _ => ActorRef {
                        codes: Vec::new(),
                        text: words.join(" "),
                    },
                };
                out.push(Ctx::Noun {
                    words,
                    head: head_word,
                    actors,
                });
                return;
            }
            for &c in &tree.children(id).to_vec() {
                build_context(res, c, head, consumed, out);
            }
        }
    }
}

/// Candidate events of a nested verb phrase or clause.
fn sub_event_candidates(res: &mut Resolver<'_>, id: NodeId) -> Option<Vec<Candidate>> {
    let tree = res.tree();
    let vp = if tree.node(id).is_verb_phrase() {
        id
    } else {
        find_verb_phrase(tree, id)?
    };
    match res.meaning(vp) {
        Meaning::Events(events) if !events.is_empty() => Some(events),
        _ => None,
    }
}

fn find_verb_phrase(tree: &Tree, id: NodeId) -> Option<NodeId> {
    for &c in tree.children(id) {
        if tree.node(c).is_verb_phrase() {
            return Some(c);
        }
    }
    for &c in tree.children(id) {
        if let Some(vp) = find_verb_phrase(tree, c) {
            return Some(vp);
        }
    }
    None
}

fn first_noun_actors(ctx: &[Ctx]) -> Option<ActorRef> {
    ctx.iter().find_map(|c| match c {
        Ctx::Noun { actors, .. } if !actors.is_empty() => Some(actors.clone()),
        _ => None,
    })
}

/// The noun governed by the first of the given prepositions.
fn prep_object(ctx: &[Ctx], preps: &[&str]) -> Option<ActorRef> {
    let mut after_prep = false;
    for c in ctx {
        match c {
            Ctx::Prep(p) if preps.contains(&p.as_str()) => after_prep = true,
            Ctx::Prep(_) => after_prep = false,
            Ctx::Noun { actors, .. } if after_prep => {
                return if actors.is_empty() {
                    None
                } else {
                    Some(actors.clone())
                };
            }
            _ => {}
        }
    }
    None
}

/// Passive voice swaps the roles the upper/lower contexts normally play: the
/// grammatical subject becomes the target and a by/from/in phrase supplies
/// the source. Absent both an at/against phrase and a subject, the target
/// falls back to the passive placeholder.
fn passive_roles(lower: &[Ctx], subject: &ActorRef) -> (ActorRef, ActorRef) {
    let source = prep_object(lower, PASSIVE_SOURCE_PREPS).unwrap_or_default();
    let target = if !subject.is_empty() {
        subject.clone()
    } else if let Some(t) = prep_object(lower, PASSIVE_TARGET_PREPS) {
        t
    } else {
        ActorRef {
            codes: vec![crate::ontology::NULL_CODE.to_string()],
            text: "passive".to_string(),
        }
    };
    (source, target)
}

/// Apply the first transformation rule matching each nested sub-event; when
/// no rule fires the initial candidate passes through unchanged.
fn apply_transforms(
    rules: &[TransformRule],
    candidate: Candidate,
    lower: &[Ctx],
) -> Vec<Candidate> {
    let inner_events: Vec<&Candidate> = lower
        .iter()
        .filter_map(|c| match c {
            Ctx::Event(events) => Some(events.iter()),
            _ => None,
        })
        .flatten()
        .collect();
    if inner_events.is_empty() || rules.is_empty() {
        return vec![candidate];
    }
    let mut out = Vec::new();
    for inner in inner_events {
        let rule = rules.iter().find(|r| {
            r.outer.map_or(true, |v| v == candidate.code.value)
                && r.inner.map_or(true, |v| v == inner.code.value)
        });
        if let Some(rule) = rule {
            let bind = |role: RoleRef| -> ActorRef {
                match role {
                    RoleRef::OuterSource => candidate.source.clone(),
                    RoleRef::OuterTarget => candidate.target.clone(),
                    RoleRef::InnerSource => inner.source.clone(),
                    RoleRef::InnerTarget => inner.target.clone(),
                }
            };
            let code = match rule.code {
                CodeOp::Outer => candidate.code,
                CodeOp::Inner => inner.code,
                CodeOp::Combine => candidate.code.combined_with(inner.code),
            };
            out.push(Candidate {
                source: bind(rule.source),
                target: bind(rule.target),
                code,
                verb_text: candidate.verb_text.clone(),
            });
        }
    }
    if out.is_empty() {
        vec![candidate]
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict::DictionaryStore;
    use crate::tree::normalize::{parse_sentence, NormalizerConfig};

    fn parse(text: &str) -> Tree {
        parse_sentence(text, None, &NormalizerConfig::default().without_trimming()).unwrap()
    }

    fn base_store() -> crate::dict::DictionaryBuilder {
        let mut b = DictionaryStore::builder();
        b.actor("GERMANY", "DEU");
        b.actor("FRANCE", "FRA");
        b.verb("INVADE", Some("192"));
        b.verb_alias("INVADE", "INVADED");
        b
    }

    fn candidates(store: &DictionaryStore, text: &str) -> Vec<Candidate> {
        let t = parse(text);
        let mut r = Resolver::new(store, &t);
        r.sentence_candidates()
    }

    #[test]
    fn default_code_applies_without_patterns() {
        let store = base_store().build();
        let c = candidates(
            &store,
            "(S (NP (NNP GERMANY)) (VP (VBD INVADED) (NP (NNP FRANCE))))",
        );
        assert_eq!(c.len(), 1);
        assert_eq!(c[0].source.codes, vec!["DEU"]);
        assert_eq!(c[0].target.codes, vec!["FRA"]);
        assert_eq!(c[0].code.text(), "192");
    }

    #[test]
    fn pattern_overrides_default_code() {
        let mut b = base_store();
        b.pattern("INVADE", "", "AIRSPACE", "191");
        let store = b.build();
        let c = candidates(
            &store,
            "(S (NP (NNP GERMANY)) (VP (VBD INVADED) (NP (JJ FRENCH) (NN AIRSPACE))))",
        );
        assert_eq!(c[0].code.text(), "191");
    }

    #[test]
    fn longer_pattern_wins_over_shorter() {
        let mut b = base_store();
        b.pattern("INVADE", "", "AIRSPACE", "191");
        b.pattern("INVADE", "", "CIVILIAN_AIRSPACE", "190");
        let store = b.build();
        let c = candidates(
            &store,
            "(S (NP (NNP GERMANY)) (VP (VBD INVADED) (NP (NN CIVILIAN) (NN AIRSPACE))))",
        );
        assert_eq!(c[0].code.text(), "190");
    }

    #[test]
    fn preposition_token_matches() {
        let mut b = base_store();
        b.verb("FIRE", Some("190"));
        b.verb_alias("FIRE", "FIRED");
        b.pattern("FIRE", "", "|AT *", "1823");
        let store = b.build();
        let c = candidates(
            &store,
            "(S (NP (NNP GERMANY)) (VP (VBD FIRED) (PP (IN AT) (NP (NNP FRANCE)))))",
        );
        assert_eq!(c[0].code.text(), "1823");
        assert_eq!(c[0].target.codes, vec!["FRA"]);
    }

    #[test]
    fn connector_only_literal_never_matches() {
        let mut b = base_store();
        b.pattern("INVADE", "", "_", "191");
        let store = b.build();
        let c = candidates(
            &store,
            "(S (NP (NNP GERMANY)) (VP (VBD INVADED) (NP (NNP FRANCE))))",
        );
        // The empty literal is unmatchable; the default code applies.
        assert_eq!(c.len(), 1);
        assert_eq!(c[0].code.text(), "192");
    }

    #[test]
    fn negation_in_nested_clause_spares_outer_verb() {
        let store = base_store().build();
        let c = candidates(
            &store,
            "(S (NP (NNP GERMANY)) (VP (VBD INVADED) (NP (NNP FRANCE)) \
             (SBAR (IN WHILE) (S (NP (NNP RUSSIA)) (VP (VBD DID) (RB NOT) (VP (VB MOVE)))))))",
        );
        assert_eq!(c.len(), 1);
        assert!(!c[0].code.is_negated());
        assert_eq!(c[0].code.text(), "192");
        assert_eq!(c[0].source.codes, vec!["DEU"]);
        assert_eq!(c[0].target.codes, vec!["FRA"]);
    }

    #[test]
    fn synset_token_matches_members() {
        let mut b = base_store();
        b.synset("TERRITORY", &["AIRSPACE", "TERRITORIAL WATERS"]);
        b.pattern("INVADE", "", "&TERRITORY", "191");
        let store = b.build();
        let c = candidates(
            &store,
            "(S (NP (NNP GERMANY)) (VP (VBD INVADED) (NP (NN AIRSPACE))))",
        );
        assert_eq!(c[0].code.text(), "191");
    }

    #[test]
    fn multiword_verb_form_tried_before_single() {
        let mut b = base_store();
        b.verb("TAKE", Some("010"));
        b.verb_form("TAKE", "TAKE OVER");
        b.pattern("TAKE", "", "", "192");
        // Patterns belong to the entry, so form choice only picks the entry;
        // give the multi-word form its own entry to observe the difference.
        b.verb("SEIZE", Some("1924"));
        let store = b.build();
        let c = candidates(
            &store,
            "(S (NP (NNP GERMANY)) (VP (VBD TAKE) (PRT (RP OVER)) (NP (NNP FRANCE))))",
        );
        // "TAKE OVER" matched as one form; the particle is consumed and the
        // entry's pattern fires.
        assert_eq!(c.len(), 1);
        assert_eq!(c[0].verb_text, "TAKE OVER");
    }

    #[test]
    fn passive_swaps_roles() {
        let store = base_store().build();
        let c = candidates(
            &store,
            "(S (NP (NNP FRANCE)) (VP (VBD WAS) (VP (VBN INVADED) (PP (IN BY) (NP (NNP GERMANY))))))",
        );
        assert_eq!(c.len(), 1);
        assert_eq!(c[0].source.codes, vec!["DEU"]);
        assert_eq!(c[0].target.codes, vec!["FRA"]);
    }

    #[test]
    fn negation_flips_code_sign() {
        let store = base_store().build();
        let c = candidates(
            &store,
            "(S (NP (NNP GERMANY)) (VP (VBD DID) (RB NOT) (VP (VB INVADE) (NP (NNP FRANCE)))))",
        );
        // DID is not in the dictionary; the nested VP carries the verb.
        assert_eq!(c.len(), 1);
        assert!(c[0].code.is_negated());
    }

    #[test]
    fn transform_combines_nested_event() {
        let mut b = base_store();
        b.verb("THREATEN", Some("130"));
        b.verb_alias("THREATEN", "THREATENED");
        b.transform(TransformRule {
            outer: crate::ontology::convert_forward("130"),
            inner: None,
            source: RoleRef::OuterSource,
            target: RoleRef::InnerTarget,
            code: CodeOp::Combine,
        });
        let store = b.build();
        let c = candidates(
            &store,
            "(S (NP (NNP GERMANY)) (VP (VBD THREATENED) (S (VP (TO TO) (VP (VB INVADE) (NP (NNP FRANCE)))))))",
        );
        assert_eq!(c.len(), 1);
        assert_eq!(c[0].source.codes, vec!["DEU"]);
        assert_eq!(c[0].target.codes, vec!["FRA"]);
        // 130 and 192 both carry cue categories: the inner event wins.
        assert_eq!(c[0].code.text(), "192");
    }
}
