//! Conflict resolution strategies.
//!
//! Collapses disagreeing agent outputs into a single value, either over live
//! worker results (multi-agent execution) or over the full shared-context
//! history for a key (session-level resolution).

use std::collections::HashMap;

use crate::domain::models::delegation::{ConflictOutcome, ConflictPolicy, WorkerResult};
use crate::domain::models::session::SharedContextEntry;

/// Resolve a set of worker results with the given policy.
///
/// Callers guarantee `results` is non-empty; a single result is returned
/// untouched (trivially unanimous).
pub fn resolve(policy: ConflictPolicy, results: &[WorkerResult]) -> ConflictOutcome {
    debug_assert!(!results.is_empty(), "resolve called with no results");

    let participants: Vec<String> = results.iter().map(|r| r.agent.clone()).collect();
    let unanimous = is_unanimous(results);

    let value = if results.len() == 1 || unanimous {
        results[0].payload.clone()
    } else {
        match policy {
            ConflictPolicy::MajorityVote => majority_vote(results).payload.clone(),
            ConflictPolicy::ExpertPriority => expert_priority(results).payload.clone(),
            // Partial consensus is not distinguished from full disagreement:
            // the first result wins, with `unanimous` carrying the signal
            ConflictPolicy::Consensus => results[0].payload.clone(),
        }
    };

    ConflictOutcome {
        value,
        policy,
        unanimous,
        participants,
    }
}

/// Resolve the full shared-context history for a key with the given policy.
///
/// Majority vote counts value occurrences across the history; consensus
/// requires every entry to agree; expert priority takes the most recent
/// entry, treating the latest contributor as the most informed.
pub fn resolve_entries(policy: ConflictPolicy, entries: &[SharedContextEntry]) -> ConflictOutcome {
    debug_assert!(!entries.is_empty(), "resolve_entries called with no entries");

    let participants: Vec<String> = entries.iter().map(|e| e.from_agent.clone()).collect();
    let first = &entries[0].value;
    let unanimous = entries.iter().all(|e| e.value == *first);

    let value = if entries.len() == 1 || unanimous {
        first.clone()
    } else {
        match policy {
            ConflictPolicy::MajorityVote => entries_majority(entries).clone(),
            ConflictPolicy::ExpertPriority => {
                entries.last().map(|e| e.value.clone()).unwrap_or_else(|| first.clone())
            }
            ConflictPolicy::Consensus => first.clone(),
        }
    };

    ConflictOutcome {
        value,
        policy,
        unanimous,
        participants,
    }
}

fn is_unanimous(results: &[WorkerResult]) -> bool {
    let first = results[0].canonical();
    results.iter().all(|r| r.canonical() == first)
}

/// Most frequent result by canonical form; ties broken by encounter order
fn majority_vote(results: &[WorkerResult]) -> &WorkerResult {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for result in results {
        *counts.entry(result.canonical()).or_insert(0) += 1;
    }

    let mut best = &results[0];
    let mut best_count = counts[&best.canonical()];
    for result in &results[1..] {
        let count = counts[&result.canonical()];
        if count > best_count {
            best = result;
            best_count = count;
        }
    }
    best
}

/// Highest result-embedded expertise score wins; ties broken by encounter
/// order
fn expert_priority(results: &[WorkerResult]) -> &WorkerResult {
    let mut best = &results[0];
    for result in &results[1..] {
        if result.expertise_score > best.expertise_score {
            best = result;
        }
    }
    best
}

/// Most frequent shared-context value; ties broken by encounter order
fn entries_majority(entries: &[SharedContextEntry]) -> &serde_json::Value {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for entry in entries {
        *counts.entry(entry.value.to_string()).or_insert(0) += 1;
    }

    let mut best = &entries[0];
    let mut best_count = counts[&best.value.to_string()];
    for entry in &entries[1..] {
        let count = counts[&entry.value.to_string()];
        if count > best_count {
            best = entry;
            best_count = count;
        }
    }
    &best.value
}
