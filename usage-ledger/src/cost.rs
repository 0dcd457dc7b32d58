//! Cost estimation for review runs.
//!
//! Prices are USD per 1000 tokens with separate input/output rates. Local
//! Ollama runs are always free. A model missing from the table falls back
//! per provider (`codex` flat rate, `openai` to the `gpt-4o` rate); an
//! unknown provider/model pair costs nothing.

/// Fixed USD→KRW conversion applied to every estimate.
pub const USD_TO_KRW_RATE: f64 = 1450.0;

/// USD per 1K tokens.
#[derive(Debug, Clone, Copy)]
pub struct ModelPrice {
    pub input: f64,
    pub output: f64,
}

const ZERO_PRICE: ModelPrice = ModelPrice {
    input: 0.0,
    output: 0.0,
};

const MODEL_PRICES: &[(&str, ModelPrice)] = &[
    // GPT-4 family
    ("gpt-4", ModelPrice { input: 0.03, output: 0.06 }),
    ("gpt-4-turbo", ModelPrice { input: 0.01, output: 0.03 }),
    ("gpt-4o", ModelPrice { input: 0.005, output: 0.015 }),
    ("gpt-4o-mini", ModelPrice { input: 0.00015, output: 0.0006 }),
    // GPT-3.5 family
    ("gpt-3.5-turbo", ModelPrice { input: 0.0005, output: 0.0015 }),
    // o1 family
    ("o1", ModelPrice { input: 0.015, output: 0.06 }),
    ("o1-mini", ModelPrice { input: 0.003, output: 0.012 }),
    ("o1-preview", ModelPrice { input: 0.015, output: 0.06 }),
    // Codex CLI flat estimate (subscription pricing, reference only)
    ("codex", ModelPrice { input: 0.01, output: 0.03 }),
];

fn price_for(model: &str) -> Option<ModelPrice> {
    let model = model.to_lowercase();
    MODEL_PRICES
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, p)| *p)
}

/// Estimated `(USD, KRW)` cost for one run.
///
/// USD is rounded to 4 decimal places, KRW to whole won.
pub fn calculate_cost(
    prompt_tokens: u64,
    completion_tokens: u64,
    model: &str,
    provider: &str,
) -> (f64, i64) {
    // Local models cost nothing regardless of token counts.
    if provider == "ollama" {
        return (0.0, 0);
    }

    let price = price_for(model).unwrap_or_else(|| match provider {
        "codex" => price_for("codex").unwrap_or(ZERO_PRICE),
        "openai" => price_for("gpt-4o").unwrap_or(ZERO_PRICE),
        _ => ZERO_PRICE,
    });

    let usd = prompt_tokens as f64 / 1000.0 * price.input
        + completion_tokens as f64 / 1000.0 * price.output;
    let usd = (usd * 10_000.0).round() / 10_000.0;
    let krw = (usd * USD_TO_KRW_RATE).round() as i64;
    (usd, krw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ollama_is_always_free() {
        assert_eq!(calculate_cost(0, 0, "qwen3:14b", "ollama"), (0.0, 0));
        assert_eq!(calculate_cost(1_000_000, 500_000, "gpt-4o", "ollama"), (0.0, 0));
    }

    #[test]
    fn known_model_rates_apply() {
        // 1000 in @ $0.005 + 1000 out @ $0.015 = $0.02
        let (usd, krw) = calculate_cost(1000, 1000, "gpt-4o", "openai");
        assert_eq!(usd, 0.02);
        assert_eq!(krw, (0.02 * USD_TO_KRW_RATE).round() as i64);
    }

    #[test]
    fn unknown_openai_model_falls_back_to_gpt_4o() {
        let fallback = calculate_cost(2000, 500, "gpt-unreleased", "openai");
        let explicit = calculate_cost(2000, 500, "gpt-4o", "openai");
        assert_eq!(fallback, explicit);
    }

    #[test]
    fn unknown_codex_model_uses_flat_rate() {
        let fallback = calculate_cost(3000, 1000, "some-codex-model", "codex");
        let explicit = calculate_cost(3000, 1000, "codex", "codex");
        assert_eq!(fallback, explicit);
    }

    #[test]
    fn unknown_provider_costs_nothing() {
        assert_eq!(calculate_cost(5000, 5000, "mystery", "other"), (0.0, 0));
    }

    #[test]
    fn usd_is_rounded_to_four_decimals() {
        // 123 in @ gpt-4o-mini: 0.123 * 0.00015 = 0.00001845 → 0.0000
        let (usd, _) = calculate_cost(123, 0, "gpt-4o-mini", "openai");
        assert_eq!(usd, 0.0);

        let (usd, _) = calculate_cost(333, 333, "gpt-4", "openai");
        // 0.333*0.03 + 0.333*0.06 = 0.02997 → 0.03
        assert_eq!(usd, 0.03);
    }
}
