use std::collections::HashSet;
use std::hash::Hasher;

use anyhow::{Result, bail};
use pdoom_game::{generate_code_from_entropy, normalize_seed, parse_share_code};
use twox_hash::XxHash64;

const DEFAULT_SEED: &str = "PD-ORACLE42";

/// Seed metadata used for logic and playability analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedInfo {
    /// Normalised seed string handed to the session.
    pub seed: String,
    /// Canonical share code when the seed is one.
    pub code: Option<String>,
}

impl SeedInfo {
    #[must_use]
    pub fn from_literal(token: &str) -> Self {
        let seed = normalize_seed(token);
        let code = parse_share_code(&seed);
        Self { seed, code }
    }

    #[must_use]
    pub fn from_numeric(entropy: u64) -> Self {
        Self::from_literal(&generate_code_from_entropy(entropy))
    }

    /// Stable 64-bit value for seeding policy randomness.
    #[must_use]
    pub fn policy_seed(&self) -> u64 {
        let mut hasher = XxHash64::with_seed(0);
        hasher.write(self.seed.as_bytes());
        hasher.finish()
    }

    /// Seed for the `n`-th repeat of a run on this seed.
    #[must_use]
    pub fn iteration(&self, n: usize) -> String {
        if n == 0 {
            self.seed.clone()
        } else {
            format!("{}#{n}", self.seed)
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        self.code.as_deref().unwrap_or(&self.seed)
    }
}

/// Resolve a list of CLI seed arguments into canonical seed metadata.
///
/// Supports share codes, integers (mapped onto a share code), arbitrary
/// literal seed strings, and the keywords `all` / `available` which expand
/// to every share code.
///
/// # Errors
///
/// Returns an error when a token reduces to an empty seed.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<SeedInfo>> {
    let mut pending: Vec<SeedInfo> = Vec::new();
    let mut request_all = false;

    for token in tokens {
        if token.is_empty() {
            continue;
        }

        if token.eq_ignore_ascii_case("all") || token.eq_ignore_ascii_case("available") {
            request_all = true;
            continue;
        }

        if let Ok(value) = token.trim().parse::<u64>() {
            pending.push(SeedInfo::from_numeric(value));
            continue;
        }

        let info = SeedInfo::from_literal(token);
        if info.seed.is_empty() {
            bail!("Unrecognized seed token: {token:?}");
        }
        pending.push(info);
    }

    if request_all {
        pending.extend(all_share_code_seeds());
    }

    let mut seen: HashSet<String> = HashSet::new();
    let mut deduped: Vec<SeedInfo> = pending
        .into_iter()
        .filter(|info| seen.insert(info.seed.clone()))
        .collect();

    if deduped.is_empty() {
        deduped.push(SeedInfo::from_literal(DEFAULT_SEED));
    }

    Ok(deduped)
}

fn all_share_code_seeds() -> Vec<SeedInfo> {
    use pdoom_game::seed::WORD_LIST;

    WORD_LIST
        .iter()
        .flat_map(|word| (0..100).map(move |nn| SeedInfo::from_literal(&format!("PD-{word}{nn:02}"))))
        .collect()
}
