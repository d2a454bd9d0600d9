use crate::catalog::{Candidate, ImageStore};
use crate::extract::{parse_ratings, parse_verdict, Verdict};
use crate::model::{Prompt, VisionModel};
use crate::photo::EncodedImage;
use anyhow::Result;
use itertools::Itertools;
use serde::Serialize;

const SINGLE_MAX_TOKENS: u32 = 500;
const BATCH_MAX_TOKENS: u32 = 4000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub score: i64,
    pub reason: String,
}

impl ScoredCandidate {
    pub fn new(candidate: Candidate, verdict: Verdict) -> Self {
        Self {
            candidate,
            score: verdict.score,
            reason: verdict.reason,
        }
    }
}

fn single_prompt_text(outfit: &str) -> String {
    format!(
        concat!(
            "Rate how well these shoes would match with this outfit on a scale of 1-10:\n",
            "\n",
            "{outfit}\n",
            "\n",
            "Respond ONLY with a JSON object in this exact format:\n",
            "{{\"score\": <number 1-10>, \"reason\": \"<brief explanation>\"}}",
        ),
        outfit = outfit.trim()
    )
}

fn batch_prompt_text(outfit: &str, candidates: &[Candidate]) -> String {
    let listing = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| {
            format!(
                "{}. {} (${:.2})\n   Description: {}",
                i + 1,
                c.display_name(),
                c.price_or_zero(),
                c.description.as_deref().unwrap_or("No description available"),
            )
        })
        .join("\n\n");

    format!(
        concat!(
            "I need to match shoes with this outfit:\n",
            "\n",
            "{outfit}\n",
            "\n",
            "Here are the available shoes:\n",
            "\n",
            "{listing}\n",
            "\n",
            "Rate each shoe on how well it matches the outfit (1-10 scale). ",
            "Respond with a JSON array where each object has:\n",
            "- \"number\": the shoe number (1-{count})\n",
            "- \"score\": match score (1-10)\n",
            "- \"reason\": brief explanation (max 100 chars)\n",
            "\n",
            "Format: [{{\"number\": 1, \"score\": 8, \"reason\": \"...\"}}]",
        ),
        outfit = outfit.trim(),
        listing = listing,
        count = candidates.len(),
    )
}

/// Scores every image in the store with one model call each, in listing order.
///
/// A candidate whose image cannot be fetched or whose model call fails is
/// skipped; an unparseable reply is kept with the fallback verdict.
pub async fn score_each(
    model: &dyn VisionModel,
    store: &dyn ImageStore,
    outfit: &str,
    keys: &[String],
    max_image_bytes: usize,
) -> Vec<ScoredCandidate> {
    let text = single_prompt_text(outfit);
    let total = keys.len();
    let mut scored = Vec::with_capacity(total);

    for (i, key) in keys.iter().enumerate() {
        let progress = format!("{}/{total}", i + 1);
        tracing::info!(%progress, %key, "scoring candidate");

        let result: Result<String> = async {
            let bytes = store.fetch(key).await?;
            let image = EncodedImage::from_bytes(&bytes, max_image_bytes)?;
            model
                .complete(&Prompt::with_image(image, text.clone(), SINGLE_MAX_TOKENS))
                .await
        }
        .await;

        match result {
            Ok(reply) => {
                let verdict = parse_verdict(&reply);
                tracing::info!(%key, score = verdict.score, reason = %verdict.reason, "scored");
                scored.push(ScoredCandidate::new(Candidate::from_image_key(key), verdict));
            }
            Err(err) => {
                tracing::warn!(%key, error = %format!("{err:#}"), "skipping candidate");
            }
        }
    }
    scored
}

/// Scores all candidates with a single model call.
///
/// Ratings are matched back by their 1-based `number`; the first rating for a
/// number wins and out-of-range numbers are ignored. Candidates the reply does
/// not rate (including when no array can be recovered) get the fallback verdict.
pub async fn score_batch(
    model: &dyn VisionModel,
    outfit: &str,
    candidates: Vec<Candidate>,
) -> Result<Vec<ScoredCandidate>> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let prompt = Prompt::text(batch_prompt_text(outfit, &candidates), BATCH_MAX_TOKENS);
    tracing::info!(count = candidates.len(), "scoring candidates in one batch");
    let reply = model.complete(&prompt).await?;

    let mut verdicts: Vec<Option<Verdict>> = vec![None; candidates.len()];
    match parse_ratings(&reply) {
        Some(ratings) => {
            for rating in ratings {
                let Some(slot) = usize::try_from(rating.number.saturating_sub(1))
                    .ok()
                    .and_then(|idx| verdicts.get_mut(idx))
                else {
                    tracing::warn!(number = rating.number, "rating for unknown candidate number");
                    continue;
                };
                if slot.is_none() {
                    *slot = Some(rating.verdict);
                }
            }
        }
        None => {
            tracing::warn!(reply = %reply, "could not parse batched ratings");
        }
    }

    let scored = candidates
        .into_iter()
        .zip(verdicts)
        .map(|(candidate, verdict)| {
            let verdict = verdict.unwrap_or_else(Verdict::unparsed);
            tracing::info!(
                name = candidate.display_name(),
                score = verdict.score,
                "scored"
            );
            ScoredCandidate::new(candidate, verdict)
        })
        .collect();
    Ok(scored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::UNPARSED_REASON;
    use crate::fakes::{png_bytes, MemoryImages, ScriptedModel};

    fn product(name: &str, price: f64, description: &str) -> Candidate {
        Candidate {
            id: name.to_string(),
            name: Some(name.to_string()),
            description: Some(description.to_string()),
            price: Some(price),
            ..Default::default()
        }
    }

    #[test]
    fn batch_prompt_lists_numbered_candidates() {
        let text = batch_prompt_text(
            "beige trench coat",
            &[
                product("A", 50.0, "brown leather boots"),
                product("B", 90.0, "white sneakers"),
            ],
        );
        assert!(text.contains("1. A ($50.00)\n   Description: brown leather boots"));
        assert!(text.contains("2. B ($90.00)\n   Description: white sneakers"));
        assert!(text.contains("(1-2)"));
        assert!(text.contains("[{\"number\": 1, \"score\": 8, \"reason\": \"...\"}]"));
    }

    #[test]
    fn single_prompt_embeds_outfit() {
        let text = single_prompt_text("\n  navy suit  \n");
        assert!(text.contains("\n\nnavy suit\n\n"));
        assert!(text.ends_with("{\"score\": <number 1-10>, \"reason\": \"<brief explanation>\"}"));
    }

    #[tokio::test]
    async fn batch_maps_ratings_by_number() {
        let model = ScriptedModel::new([
            "Ratings:\n[{\"number\": 2, \"score\": 9, \"reason\": \"crisp\"}, {\"number\": 1, \"score\": 7, \"reason\": \"warm\"}, {\"number\": 7, \"score\": 10}]",
        ]);
        let scored = score_batch(
            &model,
            "outfit",
            vec![
                product("A", 50.0, "brown leather boots"),
                product("B", 90.0, "white sneakers"),
            ],
        )
        .await
        .unwrap();

        assert_eq!(scored.len(), 2);
        assert_eq!((scored[0].candidate.id.as_str(), scored[0].score), ("A", 7));
        assert_eq!((scored[1].candidate.id.as_str(), scored[1].score), ("B", 9));
        assert_eq!(scored[1].reason, "crisp");
    }

    #[tokio::test]
    async fn batch_falls_back_when_reply_is_garbage() {
        let model = ScriptedModel::new(["I'm sorry, I can't rate shoes."]);
        let scored = score_batch(&model, "outfit", vec![product("A", 1.0, "x")])
            .await
            .unwrap();
        assert_eq!(scored[0].score, 0);
        assert_eq!(scored[0].reason, UNPARSED_REASON);
    }

    #[tokio::test]
    async fn batch_skips_model_call_when_empty() {
        let model = ScriptedModel::new(Vec::<&str>::new());
        assert!(score_batch(&model, "outfit", Vec::new()).await.unwrap().is_empty());
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn each_skips_failures_and_keeps_unparsed() {
        let store = MemoryImages::new([
            ("a.png", png_bytes()),
            ("broken.jpg", b"not an image".to_vec()),
            ("b.png", png_bytes()),
        ]);
        let model = ScriptedModel::new([
            "{\"score\": 6, \"reason\": \"ok\"}",
            "the model rambled without JSON",
        ]);
        let keys = store.list_image_keys().await.unwrap();

        let scored = score_each(&model, &store, "outfit", &keys, 1024 * 1024).await;

        assert_eq!(scored.len(), 2);
        assert_eq!(scored[0].candidate.id, "a.png");
        assert_eq!(scored[0].score, 6);
        assert_eq!(scored[1].candidate.id, "b.png");
        assert_eq!(scored[1].reason, UNPARSED_REASON);
        assert_eq!(model.calls(), 2);
        assert!(model.prompts()[0].image.is_some());
    }

    #[tokio::test]
    async fn each_skips_candidate_when_model_errors() {
        let store = MemoryImages::new([("a.png", png_bytes()), ("b.png", png_bytes())]);
        let model = ScriptedModel::from_results([
            Err(anyhow::anyhow!("throttled")),
            Ok("{\"score\": 3}".to_string()),
        ]);
        let keys = store.list_image_keys().await.unwrap();

        let scored = score_each(&model, &store, "outfit", &keys, 1024 * 1024).await;
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].candidate.id, "b.png");
    }
}
