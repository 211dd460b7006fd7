//! Seed strings and friendly share codes.
//! Code format: PD-<WORD><NN>, e.g., PD-ORACLE42, PD-GPU07

fn sanitize_word(word: &str) -> String {
    word.chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

const CODE_PREFIX: &str = "PD";

// Word list for share codes
pub const WORD_LIST: [&str; 48] = [
    "ORACLE", "GPU", "TENSOR", "PAPER", "GRANT", "BOARD", "LAB", "AUDIT", "REDTEAM", "SANDBOX",
    "ALIGN", "INTERP", "SCALING", "MOAT", "RUNWAY", "PIVOT", "SEED", "ANGEL", "CLUSTER", "WEIGHTS",
    "PROMPT", "EVALS", "BENCH", "LEAK", "HYPE", "WINTER", "SUMMER", "FOOM", "PAUSE", "TREATY",
    "CHARTER", "CANARY", "TRIPWIRE", "GUARD", "LENS", "PROBE", "CIRCUIT", "NEURON", "GRADIENT",
    "REWARD", "CORRIGE", "MESA", "AGENT", "TOOL", "LATENT", "FRONTIER", "HORIZON", "DOOM",
];

/// Normalise a user-supplied seed string.
///
/// Share codes are canonicalised (upper-case, stripped of noise) so that
/// `pd-oracle42` and `PD-ORACLE42` seed the same session. Any other input is
/// only trimmed.
#[must_use]
pub fn normalize_seed(input: &str) -> String {
    parse_share_code(input).unwrap_or_else(|| input.trim().to_string())
}

/// Parse a share code into its canonical form.
#[must_use]
pub fn parse_share_code(code: &str) -> Option<String> {
    let s = code.trim();
    let (prefix, rest) = s.split_once('-')?;
    if !prefix.eq_ignore_ascii_case(CODE_PREFIX) || !rest.is_ascii() || rest.len() < 3 {
        return None;
    }
    let (word_part, nn_part) = rest.split_at(rest.len().checked_sub(2)?);
    let nn: u8 = nn_part.parse().ok()?;
    let word = sanitize_word(word_part);
    let canonical = WORD_LIST.iter().find(|w| sanitize_word(w) == word)?;
    Some(format!("{CODE_PREFIX}-{canonical}{nn:02}"))
}

/// Build a share code from arbitrary entropy.
#[must_use]
pub fn generate_code_from_entropy(entropy: u64) -> String {
    let words = u64::try_from(WORD_LIST.len()).unwrap_or(1);
    let wi = usize::try_from(entropy % words).unwrap_or(0);
    let nn = (entropy >> 17) % 100;
    let word = WORD_LIST.get(wi).copied().unwrap_or("ORACLE");
    format!("{CODE_PREFIX}-{word}{nn:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn share_codes_canonicalise() {
        assert_eq!(parse_share_code("pd-oracle42").as_deref(), Some("PD-ORACLE42"));
        assert_eq!(parse_share_code(" PD-GPU07 ").as_deref(), Some("PD-GPU07"));
        assert!(parse_share_code("PD-NOTAWORD11").is_none());
        assert!(parse_share_code("XX-ORACLE42").is_none());
        assert!(parse_share_code("PD-ORACLEx1").is_none());
    }

    #[test]
    fn normalize_keeps_free_form_seeds() {
        assert_eq!(normalize_seed("  S1 "), "S1");
        assert_eq!(normalize_seed("pd-doom99"), "PD-DOOM99");
    }

    #[test]
    fn generated_codes_parse_back() {
        for entropy in [0_u64, 1, 47, 0xDEAD_BEEF, u64::MAX] {
            let code = generate_code_from_entropy(entropy);
            assert_eq!(parse_share_code(&code), Some(code.clone()));
        }
    }

    #[test]
    fn entropy_wraps_around_the_word_list() {
        assert_eq!(generate_code_from_entropy(47), "PD-DOOM00");
        assert_eq!(generate_code_from_entropy(48), "PD-ORACLE00");
        assert_eq!(generate_code_from_entropy((3 << 17) + 1), "PD-GPU03");
    }
}
