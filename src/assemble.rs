//! Final event assembly.
//!
//! Expands compound source/target code lists into their constituents, forms
//! the cross product of the two sides, applies the symmetric-event rules, and
//! deduplicates the resulting triples by value (stable, first occurrence
//! wins).

use crate::ontology::{convert_reverse, NULL_CODE};
use crate::resolve::Candidate;
use serde::{Deserialize, Serialize};

/// A fully assembled event triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventTriple {
    /// Coded source actor.
    pub source: String,
    /// Coded target actor.
    pub target: String,
    /// External event code.
    pub code: String,
    /// Surface text of the triggering verb, for diagnostics.
    pub verb_text: String,
}

/// Assembly policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssemblyConfig {
    /// Drop any triple where either actor code is the null placeholder.
    pub require_dyad: bool,
}

impl AssemblyConfig {
    /// Require both sides of every emitted dyad to be resolved.
    #[must_use]
    pub fn with_require_dyad(mut self) -> Self {
        self.require_dyad = true;
        self
    }
}

fn side_codes(codes: &[String]) -> Vec<String> {
    if codes.is_empty() {
        vec![NULL_CODE.to_string()]
    } else {
        codes.to_vec()
    }
}

/// Assemble candidates into deduplicated event triples.
///
/// Negated candidates are rejected events and emit nothing. For a symmetric
/// (`active:passive`) code both directions are emitted, one per half; if one
/// side is wholly unresolved, the other side's codes substitute for it (the
/// documented legacy rule), and the identical-pair exclusion is waived for
/// pairs created by that substitution since they originate from two distinct
/// entities.
#[must_use]
pub fn assemble(candidates: &[Candidate], config: &AssemblyConfig) -> Vec<EventTriple> {
    let mut out: Vec<EventTriple> = Vec::new();
    let mut push = |triple: EventTriple| {
        if !out.contains(&triple) {
            out.push(triple);
        }
    };

    for candidate in candidates {
        if candidate.code.is_negated() || candidate.code.is_null() {
            continue;
        }
        let mut sources = side_codes(&candidate.source.codes);
        let mut targets = side_codes(&candidate.target.codes);

        if let Some(passive) = candidate.code.paired {
            let mut substituted = false;
            if candidate.source.is_unresolved() && !candidate.target.is_unresolved() {
                sources = targets.clone();
                substituted = true;
            } else if candidate.target.is_unresolved() && !candidate.source.is_unresolved() {
                targets = sources.clone();
                substituted = true;
            }
            let active_text = candidate.code.text();
            let passive_text = convert_reverse(passive);
            for s in &sources {
                for t in &targets {
                    if s == t && !substituted {
                        continue;
                    }
                    push(EventTriple {
                        source: s.clone(),
                        target: t.clone(),
                        code: active_text.clone(),
                        verb_text: candidate.verb_text.clone(),
                    });
                    push(EventTriple {
                        source: t.clone(),
                        target: s.clone(),
                        code: passive_text.clone(),
                        verb_text: candidate.verb_text.clone(),
                    });
                }
            }
        } else {
            let code_text = candidate.code.text();
            for s in &sources {
                for t in &targets {
                    if s == t {
                        continue;
                    }
                    push(EventTriple {
                        source: s.clone(),
                        target: t.clone(),
                        code: code_text.clone(),
                        verb_text: candidate.verb_text.clone(),
                    });
                }
            }
        }
    }

    if config.require_dyad {
        out.retain(|t| t.source != NULL_CODE && t.target != NULL_CODE);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ontology::EventCode;
    use crate::resolve::ActorRef;

    fn candidate(sources: &[&str], targets: &[&str], code: &str) -> Candidate {
        Candidate {
            source: ActorRef {
                codes: sources.iter().map(|s| s.to_string()).collect(),
                text: String::new(),
            },
            target: ActorRef {
                codes: targets.iter().map(|s| s.to_string()).collect(),
                text: String::new(),
            },
            code: EventCode::parse(code).unwrap(),
            verb_text: "TEST".to_string(),
        }
    }

    fn triples(candidates: &[Candidate]) -> Vec<(String, String, String)> {
        assemble(candidates, &AssemblyConfig::default())
            .into_iter()
            .map(|t| (t.source, t.target, t.code))
            .collect()
    }

    #[test]
    fn simple_dyad() {
        let t = triples(&[candidate(&["DEU"], &["FRA"], "192")]);
        assert_eq!(t, vec![("DEU".into(), "FRA".into(), "192".into())]);
    }

    #[test]
    fn compound_cross_product_excludes_self_pairs() {
        let t = triples(&[candidate(&["DEU", "FRA"], &["FRA", "RUS"], "192")]);
        assert_eq!(
            t,
            vec![
                ("DEU".into(), "FRA".into(), "192".into()),
                ("DEU".into(), "RUS".into(), "192".into()),
                ("FRA".into(), "RUS".into(), "192".into()),
            ]
        );
    }

    #[test]
    fn symmetric_code_emits_both_directions() {
        let t = triples(&[candidate(&["DEU"], &["FRA"], "054:050")]);
        assert_eq!(
            t,
            vec![
                ("DEU".into(), "FRA".into(), "054".into()),
                ("FRA".into(), "DEU".into(), "050".into()),
            ]
        );
    }

    #[test]
    fn symmetric_substitution_fills_unresolved_side() {
        let t = triples(&[candidate(&["---"], &["GOV"], "054:050")]);
        assert_eq!(
            t,
            vec![
                ("GOV".into(), "GOV".into(), "054".into()),
                ("GOV".into(), "GOV".into(), "050".into()),
            ]
        );
    }

    #[test]
    fn duplicates_removed_stably() {
        let t = triples(&[
            candidate(&["DEU"], &["FRA"], "192"),
            candidate(&["DEU"], &["FRA"], "192"),
            candidate(&["DEU"], &["RUS"], "192"),
        ]);
        assert_eq!(t.len(), 2);
        assert_eq!(t[0].0, "DEU");
        assert_eq!(t[0].1, "FRA");
    }

    #[test]
    fn negated_candidates_emit_nothing() {
        let mut c = candidate(&["DEU"], &["FRA"], "192");
        c.code = c.code.negated();
        assert!(triples(&[c]).is_empty());
    }

    #[test]
    fn require_dyad_drops_null_sides() {
        let candidates = [
            candidate(&["DEU"], &["---"], "192"),
            candidate(&["DEU"], &["FRA"], "192"),
        ];
        let strict = assemble(&candidates, &AssemblyConfig::default().with_require_dyad());
        assert_eq!(strict.len(), 1);
        assert_eq!(strict[0].target, "FRA");
        let loose = assemble(&candidates, &AssemblyConfig::default());
        assert_eq!(loose.len(), 2);
    }
}
