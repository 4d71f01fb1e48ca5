//! Greedy, token-bounded context assembly.
//!
//! Walks the ranked candidates in order and appends each passage while the
//! running cost stays within the budget. The first passage that would
//! overflow ends selection: later, smaller passages are not tried. An empty
//! result is a valid outcome.

use crate::models::{AssembledContext, Corpus, RankedCandidate};
use crate::tokens::TokenCounter;

/// Default token budget for assembled passages.
pub const DEFAULT_MAX_TOKENS: usize = 800;

/// Default fragment separator.
pub const DEFAULT_SEPARATOR: &str = "\n* ";

/// How much context may be assembled and how fragments are delimited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextBudget {
    /// Maximum of Σ(passage tokens + separator tokens).
    pub max_tokens: usize,
    /// Prefix placed before every passage.
    pub separator: String,
    /// Token cost charged for each separator.
    pub separator_tokens: usize,
}

impl ContextBudget {
    pub fn new(max_tokens: usize, separator: impl Into<String>, separator_tokens: usize) -> Self {
        Self {
            max_tokens,
            separator: separator.into(),
            separator_tokens,
        }
    }

    /// Price the separator with `counter`.
    pub fn counted(
        max_tokens: usize,
        separator: impl Into<String>,
        counter: &dyn TokenCounter,
    ) -> Self {
        let separator = separator.into();
        let separator_tokens = counter.count_tokens(&separator);
        Self::new(max_tokens, separator, separator_tokens)
    }
}

/// Select passages for a prompt.
///
/// Candidates whose key is absent from `corpus` are passed over; the result
/// is always a prefix of the ranked candidates that are present in the
/// corpus.
pub fn assemble(
    candidates: &[RankedCandidate],
    corpus: &Corpus,
    budget: &ContextBudget,
) -> AssembledContext {
    let mut assembled = AssembledContext::default();

    for candidate in candidates {
        let Some(passage) = corpus.get(&candidate.key) else {
            tracing::debug!(key = %candidate.key, "ranked passage not in corpus; skipping");
            continue;
        };

        let cost = passage.tokens.saturating_add(budget.separator_tokens);
        if assembled.used_tokens.saturating_add(cost) > budget.max_tokens {
            tracing::debug!(
                key = %candidate.key,
                cost,
                used = assembled.used_tokens,
                budget = budget.max_tokens,
                "token budget reached"
            );
            break;
        }

        let mut fragment = String::with_capacity(budget.separator.len() + passage.content.len());
        fragment.push_str(&budget.separator);
        fragment.push_str(&passage.content.replace('\n', " "));

        assembled.fragments.push(fragment);
        assembled.used_tokens += cost;
        assembled.keys.push(candidate.key.clone());
    }

    assembled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Passage, PassageKey};
    use crate::tokens::CharRatioCounter;

    fn candidate(title: &str, score: f32) -> RankedCandidate {
        RankedCandidate {
            score,
            key: PassageKey::new(title, "Summary"),
        }
    }

    fn corpus(rows: &[(&str, &str, usize)]) -> Corpus {
        Corpus::from_passages(
            rows.iter()
                .map(|(t, c, n)| Passage::new(*t, "Summary", *c, *n))
                .collect(),
        )
        .unwrap()
    }

    fn titles(ctx: &AssembledContext) -> Vec<&str> {
        ctx.keys.iter().map(|k| k.title.as_str()).collect()
    }

    #[test]
    fn test_budget_admits_exact_fit() {
        let corpus = corpus(&[("A", "alpha", 5), ("B", "beta", 5)]);
        let ranked = vec![candidate("A", 0.9), candidate("B", 0.1)];
        let ctx = assemble(&ranked, &corpus, &ContextBudget::new(6, "\n* ", 1));
        assert_eq!(titles(&ctx), vec!["A"]);
        assert_eq!(ctx.used_tokens, 6);
        assert_eq!(ctx.fragments, vec!["\n* alpha".to_string()]);
    }

    #[test]
    fn test_stops_at_first_overflow() {
        // C would fit after B is refused, but selection has already ended.
        let corpus = corpus(&[("A", "a", 3), ("B", "b", 10), ("C", "c", 1)]);
        let ranked = vec![candidate("A", 0.9), candidate("B", 0.8), candidate("C", 0.7)];
        let ctx = assemble(&ranked, &corpus, &ContextBudget::new(8, "\n* ", 1));
        assert_eq!(titles(&ctx), vec!["A"]);
        assert_eq!(ctx.used_tokens, 4);
    }

    #[test]
    fn test_first_candidate_over_budget_yields_empty() {
        let corpus = corpus(&[("A", "a", 50), ("B", "b", 1)]);
        let ranked = vec![candidate("A", 0.9), candidate("B", 0.1)];
        let ctx = assemble(&ranked, &corpus, &ContextBudget::new(10, "\n* ", 1));
        assert!(ctx.is_empty());
        assert_eq!(ctx.used_tokens, 0);
        assert!(ctx.keys.is_empty());
    }

    #[test]
    fn test_no_candidates() {
        let corpus = corpus(&[("A", "a", 1)]);
        let ctx = assemble(&[], &corpus, &ContextBudget::new(100, "\n* ", 1));
        assert_eq!(ctx, AssembledContext::default());
    }

    #[test]
    fn test_candidates_outside_corpus_are_passed_over() {
        let corpus = corpus(&[("A", "a", 2), ("C", "c", 2)]);
        let ranked = vec![candidate("B", 0.9), candidate("A", 0.8), candidate("C", 0.7)];
        let ctx = assemble(&ranked, &corpus, &ContextBudget::new(100, "\n* ", 1));
        assert_eq!(titles(&ctx), vec!["A", "C"]);
    }

    #[test]
    fn test_newlines_become_spaces() {
        let corpus = corpus(&[("A", "line one\nline two\n\nend", 4)]);
        let ctx = assemble(
            &[candidate("A", 1.0)],
            &corpus,
            &ContextBudget::new(100, "\n* ", 1),
        );
        assert_eq!(ctx.text(), "\n* line one line two  end");
    }

    #[test]
    fn test_budget_never_exceeded() {
        let rows: Vec<(String, usize)> = (0..40)
            .map(|i| (format!("doc{:02}", i), (i * 7) % 23))
            .collect();
        let corpus = Corpus::from_passages(
            rows.iter()
                .map(|(t, n)| Passage::new(t.as_str(), "Summary", "text", *n))
                .collect(),
        )
        .unwrap();
        let ranked: Vec<RankedCandidate> = rows
            .iter()
            .enumerate()
            .map(|(i, (t, _))| candidate(t, 1.0 - i as f32 / 100.0))
            .collect();

        for max_tokens in [0, 1, 5, 17, 60, 150, 400, 10_000] {
            let budget = ContextBudget::new(max_tokens, "\n* ", 2);
            let ctx = assemble(&ranked, &corpus, &budget);

            let spent: usize = ctx
                .keys
                .iter()
                .map(|k| corpus.get(k).unwrap().tokens + 2)
                .sum();
            assert_eq!(spent, ctx.used_tokens);
            assert!(ctx.used_tokens <= max_tokens);

            let prefix: Vec<&PassageKey> = ranked.iter().take(ctx.len()).map(|c| &c.key).collect();
            let chosen: Vec<&PassageKey> = ctx.keys.iter().collect();
            assert_eq!(chosen, prefix);
        }
    }

    #[test]
    fn test_counted_budget_prices_separator() {
        let budget = ContextBudget::counted(800, DEFAULT_SEPARATOR, &CharRatioCounter::new(1));
        assert_eq!(budget.separator_tokens, 3);
        assert_eq!(budget.max_tokens, 800);
    }
}
