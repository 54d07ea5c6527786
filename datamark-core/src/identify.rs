//! Traitor identification.
//!
//! A candidate matches a recovered template when it agrees at every decided
//! position. The verdict is a suspect only when exactly one candidate
//! matches; no match and several matches both yield no suspect.
//!
//! Exact matching loses power quickly once a copy has been heavily subset or
//! perturbed. [`rank_candidates`] reports disagreement counts so operators can
//! inspect the closest recipients, but it never changes the verdict.

use serde::{Deserialize, Serialize};

use crate::detection::{RecoveredTemplate, Symbol};
use crate::error::{DatamarkError, Result};
use crate::fingerprint::{Fingerprint, FingerprintCode, RecipientId};
use crate::key::SecretKey;

/// How one candidate compares with a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub recipient: RecipientId,
    /// Decided positions where the candidate's bit differs.
    pub disagreements: usize,
    /// Decided positions compared.
    pub compared: usize,
}

impl CandidateScore {
    pub fn is_exact(&self) -> bool {
        self.disagreements == 0
    }
}

/// Compare a template with one fingerprint over the decided positions.
pub fn disagreements(template: &RecoveredTemplate, fingerprint: &Fingerprint) -> Result<usize> {
    if template.len() != fingerprint.len() {
        return Err(DatamarkError::FingerprintLengthMismatch {
            expected: template.len(),
            actual: fingerprint.len(),
        });
    }
    Ok(template
        .symbols()
        .iter()
        .zip(fingerprint.bits())
        .filter(|(symbol, &bit)| symbol.bit().is_some_and(|b| b != u8::from(bit)))
        .count())
}

/// Score every recipient in `[0, total_recipients)` against the template,
/// closest first (ties broken by recipient id).
pub fn rank_candidates<C: FingerprintCode + ?Sized>(
    template: &RecoveredTemplate,
    key: &SecretKey,
    total_recipients: u32,
    code: &C,
) -> Result<Vec<CandidateScore>> {
    let compared = template.known_count();
    let mut scores = (0..total_recipients)
        .map(|recipient| {
            let fingerprint = code.generate(key, recipient, total_recipients, template.len())?;
            Ok(CandidateScore {
                recipient,
                disagreements: disagreements(template, &fingerprint)?,
                compared,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    scores.sort_by_key(|s| (s.disagreements, s.recipient));
    Ok(scores)
}

/// Return the single recipient whose fingerprint agrees with every decided
/// template position, or `None` when zero or several recipients do.
pub fn identify<C: FingerprintCode + ?Sized>(
    template: &RecoveredTemplate,
    key: &SecretKey,
    total_recipients: u32,
    code: &C,
) -> Result<Option<RecipientId>> {
    let ranking = rank_candidates(template, key, total_recipients, code)?;
    Ok(verdict(&ranking))
}

/// Exact-match verdict over a ranking.
pub fn verdict(ranking: &[CandidateScore]) -> Option<RecipientId> {
    let mut exact = ranking.iter().filter(|s| s.is_exact());
    match (exact.next(), exact.next()) {
        (Some(only), None) => Some(only.recipient),
        _ => None,
    }
}

/// Template with every position decided from a fingerprint.
pub fn template_of(fingerprint: &Fingerprint) -> RecoveredTemplate {
    RecoveredTemplate::from_symbols(
        fingerprint
            .bits()
            .iter()
            .map(|&bit| if bit { Symbol::One } else { Symbol::Zero })
            .collect(),
    )
}
