//! Per-node meaning computation.
//!
//! Every node's meaning is computed at most once and memoized in a table
//! keyed by arena index; repeated queries from multiple ancestors return the
//! cached value. Noun phrases resolve to actor/agent codes, prepositional
//! phrases borrow their object's meaning, and verb phrases resolve to
//! candidate event triples via the pattern matcher.

use crate::dict::{match_phrase_at, AgentPosition, DictionaryStore};
use crate::matcher;
use crate::ontology::{EventCode, NULL_CODE};
use crate::tree::{NodeData, NodeId, Tree};

const PERSONAL_PRONOUNS: &[&str] = &[
    "HE", "SHE", "IT", "THEY", "HIM", "HER", "THEM", "HIS", "ITS", "THEIR",
];

const REFLEXIVE_PRONOUNS: &[&str] = &[
    "HIMSELF", "HERSELF", "ITSELF", "THEMSELVES", "ONESELF",
];

/// A resolved noun-phrase meaning: one code per compound part, plus the
/// source text that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActorRef {
    /// Resolved codes; more than one for a compound entity.
    pub codes: Vec<String>,
    /// Surface text of the phrase, for diagnostics.
    pub text: String,
}

impl ActorRef {
    /// True if no part resolved to anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// True if every resolved code is the null placeholder.
    #[must_use]
    pub fn is_unresolved(&self) -> bool {
        self.codes.iter().all(|c| c == NULL_CODE)
    }
}

/// A candidate event produced by a verb phrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Source actor codes (compound-expanded at assembly).
    pub source: ActorRef,
    /// Target actor codes.
    pub target: ActorRef,
    /// Matched event code.
    pub code: EventCode,
    /// Surface text of the triggering verb, for diagnostics.
    pub verb_text: String,
}

/// The meaning of a tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum Meaning {
    /// Actor/agent codes of a noun or prepositional phrase.
    Actors(ActorRef),
    /// Candidate events of a verb phrase.
    Events(Vec<Candidate>),
    /// Nothing resolvable under this node.
    Empty,
}

impl Meaning {
    /// The actor payload, if any.
    #[must_use]
    pub fn actors(&self) -> Option<&ActorRef> {
        match self {
            Meaning::Actors(a) if !a.is_empty() => Some(a),
            _ => None,
        }
    }

    /// The event payload, if any.
    #[must_use]
    pub fn events(&self) -> Option<&[Candidate]> {
        match self {
            Meaning::Events(e) if !e.is_empty() => Some(e),
            _ => None,
        }
    }

    /// True for `Empty` or an empty payload.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actors().is_none() && self.events().is_none()
    }
}

/// Scratch state for resolving one sentence.
pub struct Resolver<'a> {
    store: &'a DictionaryStore,
    tree: &'a Tree,
    memo: Vec<Option<Meaning>>,
}

impl<'a> Resolver<'a> {
    /// Create a resolver over one sentence tree.
    #[must_use]
    pub fn new(store: &'a DictionaryStore, tree: &'a Tree) -> Self {
        Resolver {
            memo: vec![None; tree.len()],
            store,
            tree,
        }
    }

    /// The dictionary store in use.
    #[must_use]
    pub fn store(&self) -> &'a DictionaryStore {
        self.store
    }

    /// The sentence tree in use.
    #[must_use]
    pub fn tree(&self) -> &'a Tree {
        self.tree
    }

    /// Candidate events for the whole sentence: the meanings of every verb
    /// phrase not dominated by another verb phrase (nested verb phrases are
    /// sub-events, consumed by transformation rules).
    pub fn sentence_candidates(&mut self) -> Vec<Candidate> {
        let mut out = Vec::new();
        self.collect_top_verb_phrases(self.tree.root(), false, &mut out);
        out
    }

    fn collect_top_verb_phrases(&mut self, id: NodeId, under_vp: bool, out: &mut Vec<Candidate>) {
        let node = self.tree.node(id);
        if node.is_verb_phrase() && !under_vp {
            if let Meaning::Events(events) = self.meaning(id) {
                out.extend(events);
            }
            return;
        }
        let inside = under_vp || node.is_verb_phrase();
        for &c in &node.children.clone() {
            self.collect_top_verb_phrases(c, inside, out);
        }
    }

    /// The memoized meaning of a node.
    pub fn meaning(&mut self, id: NodeId) -> Meaning {
        if let Some(cached) = &self.memo[id.index()] {
            return cached.clone();
        }
        // Break reference cycles (pronoun resolution can revisit a node).
        self.memo[id.index()] = Some(Meaning::Empty);
        let computed = self.compute_meaning(id);
        self.memo[id.index()] = Some(computed.clone());
        computed
    }

    fn compute_meaning(&mut self, id: NodeId) -> Meaning {
        let node = self.tree.node(id);
        match &node.data {
            NodeData::Entity(_) => self.entity_meaning(id),
            NodeData::Token { .. } => Meaning::Empty,
            NodeData::Phrase => {
                if node.is_verb_phrase() {
                    Meaning::Events(matcher::analyze_verb_phrase(self, id))
                } else if node.is_prep_phrase() {
                    self.prep_meaning(id)
                } else if node.is_noun_phrase() {
                    self.noun_phrase_meaning(id)
                } else {
                    self.first_child_meaning(id)
                }
            }
        }
    }

    /// Meaning of a collapsed entity leaf: per-part actor/agent lookup, with
    /// pronoun indirection for single-pronoun parts.
    fn entity_meaning(&mut self, id: NodeId) -> Meaning {
        let entity = match self.tree.node(id).entity() {
            Some(e) => e.clone(),
            None => return Meaning::Empty,
        };
        if let [part] = entity.parts.as_slice() {
            if let [word] = part.as_slice() {
                if PERSONAL_PRONOUNS.contains(&word.as_str()) {
                    return self.personal_pronoun_meaning(id);
                }
                if REFLEXIVE_PRONOUNS.contains(&word.as_str()) {
                    return self.reflexive_pronoun_meaning(id);
                }
            }
        }
        let mut codes = Vec::new();
        let mut any = false;
        for part in &entity.parts {
            match self.resolve_words(part) {
                Some(code) => {
                    any = true;
                    codes.push(code);
                }
                None => codes.push(NULL_CODE.to_string()),
            }
        }
        if !any {
            return Meaning::Empty;
        }
        Meaning::Actors(ActorRef {
            codes,
            text: entity.text(),
        })
    }

    /// Longest-contiguous actor match first, then all distinct agent codes in
    /// discovery order.
    fn resolve_words(&self, words: &[String]) -> Option<String> {
        let mut actor_code: Option<String> = None;
        // First actor match in the phrase wins; patterns under each first
        // word are sorted longest-first.
        'actor: for start in 0..words.len() {
            if let Some(patterns) = self.store.lookup_actor(&words[start]) {
                for pattern in patterns {
                    if match_phrase_at(&pattern.words, words, start).is_some() {
                        let code = self.store.resolve_date_code(&pattern.codes, self.tree.date);
                        actor_code = Some(code.to_string());
                        log::debug!("actor match '{}' -> {}", words[start..].join(" "), code);
                        break 'actor;
                    }
                }
            }
        }
        let mut code = actor_code.clone().unwrap_or_else(|| NULL_CODE.to_string());
        let mut found_agent = false;
        let mut seen_agents: Vec<String> = Vec::new();
        for start in 0..words.len() {
            if let Some(patterns) = self.store.lookup_agent(&words[start]) {
                for pattern in patterns {
                    if match_phrase_at(&pattern.words, words, start).is_some() {
                        if seen_agents.contains(&pattern.code) {
                            break;
                        }
                        seen_agents.push(pattern.code.clone());
                        // Skip an agent code already present as a 3-character
                        // block of the accumulated code.
                        if code
                            .as_bytes()
                            .chunks(3)
                            .any(|b| b == pattern.code.as_bytes())
                        {
                            found_agent = true;
                            break;
                        }
                        code = match pattern.position {
                            AgentPosition::Suffix => format!("{code}{}", pattern.code),
                            AgentPosition::Prefix => format!("{}{code}", pattern.code),
                        };
                        found_agent = true;
                        break;
                    }
                }
            }
        }
        if actor_code.is_none() && !found_agent {
            return None;
        }
        Some(code)
    }

    /// A simple (unmerged) noun phrase: direct token words first, then nested
    /// noun, prepositional, and verb phrase children, first non-empty wins.
    fn noun_phrase_meaning(&mut self, id: NodeId) -> Meaning {
        let direct_words: Vec<String> = self
            .tree
            .children(id)
            .iter()
            .filter_map(|&c| self.tree.node(c).word().map(str::to_string))
            .collect();
        if !direct_words.is_empty() {
            if let Some(code) = self.resolve_words(&direct_words) {
                return Meaning::Actors(ActorRef {
                    codes: vec![code],
                    text: direct_words.join(" "),
                });
            }
        }
        for pass in 0..3 {
            for &c in &self.tree.children(id).to_vec() {
                let node = self.tree.node(c);
                let eligible = match pass {
                    0 => node.is_noun_phrase(),
                    1 => node.is_prep_phrase(),
                    _ => node.is_verb_phrase(),
                };
                if !eligible {
                    continue;
                }
                let meaning = self.meaning(c);
                if !meaning.is_empty() {
                    return meaning;
                }
            }
        }
        Meaning::Empty
    }

    /// A prepositional phrase borrows its object's meaning; the preposition
    /// lexeme itself is consumed by the pattern matcher.
    fn prep_meaning(&mut self, id: NodeId) -> Meaning {
        for &c in &self.tree.children(id).to_vec() {
            if self.tree.node(c).is_noun_phrase() {
                let meaning = self.meaning(c);
                if !meaning.is_empty() {
                    return meaning;
                }
            }
        }
        Meaning::Empty
    }

    fn first_child_meaning(&mut self, id: NodeId) -> Meaning {
        for &c in &self.tree.children(id).to_vec() {
            let meaning = self.meaning(c);
            if !meaning.is_empty() {
                return meaning;
            }
        }
        Meaning::Empty
    }

    /// A personal pronoun takes the first sibling noun phrase's meaning in
    /// the nearest enclosing clause, climbing to outer clauses when the
    /// nearest one offers no antecedent.
    fn personal_pronoun_meaning(&mut self, id: NodeId) -> Meaning {
        let mut clause = self.tree.enclosing_clause(id);
        while let Some(cl) = clause {
            for &c in &self.tree.children(cl).to_vec() {
                if c == id || self.is_ancestor_of(c, id) {
                    continue;
                }
                if self.tree.node(c).is_noun_phrase() {
                    let meaning = self.meaning(c);
                    if meaning.actors().is_some() {
                        return meaning;
                    }
                }
            }
            clause = self.tree.enclosing_clause(cl);
        }
        Meaning::Empty
    }

    /// A reflexive pronoun searches the whole local clause.
    fn reflexive_pronoun_meaning(&mut self, id: NodeId) -> Meaning {
        let clause = match self.tree.enclosing_clause(id) {
            Some(c) => c,
            None => return Meaning::Empty,
        };
        let mut nps = Vec::new();
        self.collect_noun_phrases(clause, id, &mut nps);
        for np in nps {
            let meaning = self.meaning(np);
            if meaning.actors().is_some() {
                return meaning;
            }
        }
        Meaning::Empty
    }

    fn collect_noun_phrases(&self, id: NodeId, skip: NodeId, out: &mut Vec<NodeId>) {
        if id == skip {
            return;
        }
        let node = self.tree.node(id);
        if node.is_noun_phrase() {
            out.push(id);
            return;
        }
        for &c in &node.children {
            self.collect_noun_phrases(c, skip, out);
        }
    }

    fn is_ancestor_of(&self, candidate: NodeId, node: NodeId) -> bool {
        let mut cur = Some(node);
        while let Some(n) = cur {
            if n == candidate {
                return true;
            }
            cur = self.tree.parent(n);
        }
        false
    }
}
