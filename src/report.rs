use crate::matcher::OutfitMatches;
use std::fmt::Write as _;

const RULE_WIDTH: usize = 80;

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

/// Console rendering of one outfit's top matches.
pub fn render(result: &OutfitMatches, budget: Option<f64>) -> String {
    let mut out = String::new();
    let rule = rule();

    let _ = writeln!(out, "{rule}");
    let _ = writeln!(
        out,
        "TOP {} MATCHES FOR: {}",
        result.matches.len(),
        result.outfit
    );
    if let Some(budget) = budget {
        let _ = writeln!(out, "Budget: ${budget:.2}");
    }
    let _ = writeln!(out, "{rule}");

    if result.matches.is_empty() {
        let _ = writeln!(out, "\nNo matches found.");
        return out;
    }

    for (i, m) in result.matches.iter().enumerate() {
        let c = &m.candidate;
        let _ = writeln!(out, "\n{}. {}", i + 1, c.display_name());
        if c.name.is_some() {
            let _ = writeln!(out, "   Product ID: {}", c.id);
        }
        if let Some(price) = c.price {
            let _ = writeln!(out, "   Price: ${price:.2}");
        }
        let _ = writeln!(out, "   Match Score: {}/10", m.score);
        let _ = writeln!(out, "   Reason: {}", m.reason);
        if let Some(image) = c.image_key.as_deref().filter(|k| *k != c.id) {
            let _ = writeln!(out, "   Image: {image}");
        }
        if let Some(url) = &c.url {
            let _ = writeln!(out, "   URL: {url}");
        }
    }

    let best = &result.matches[0];
    let _ = writeln!(out, "\n{rule}");
    let _ = writeln!(out, "BEST MATCH: {}", best.candidate.display_name());
    if let Some(price) = best.candidate.price {
        let _ = writeln!(out, "   Price: ${price:.2}");
    }
    let _ = writeln!(out, "   Score: {}/10", best.score);
    let _ = writeln!(out, "   {}", best.reason);
    let _ = writeln!(out, "{rule}");
    out
}
