use crate::ai::AiBackend;
use crate::types::RunStatus;
use futures::future::join_all;

/// Result of [`translate_titles`]
#[derive(Clone, Debug, PartialEq)]
pub struct TranslatedTitles {
    /// One title per input, the original where translation failed
    pub titles: Vec<String>,
    /// One message per failed title
    pub warnings: Vec<String>,
    /// `ok`, or `partial` when any title kept its original text
    pub status: RunStatus,
}

/// Translate every title into `target_language`
///
/// Titles are translated concurrently. A failed or empty translation keeps the
/// original title and adds a warning; the batch always completes.
pub async fn translate_titles(
    ai: &dyn AiBackend,
    titles: &[String],
    target_language: &str,
) -> TranslatedTitles {
    let results = join_all(
        titles
            .iter()
            .map(|title| ai.translate(title, target_language)),
    )
    .await;

    let mut warnings = Vec::new();
    let titles = titles
        .iter()
        .zip(results)
        .map(|(original, result)| match result {
            Ok(translated) if !translated.trim().is_empty() => translated.trim().to_string(),
            Ok(_) => {
                warnings.push(format!("empty translation for '{}', kept original", original));
                original.clone()
            }
            Err(e) => {
                tracing::warn!(title = %original, target = %target_language, error = %e, "title translation failed");
                warnings.push(format!("translation of '{}' failed: {}", original, e));
                original.clone()
            }
        })
        .collect();

    let status = if warnings.is_empty() {
        RunStatus::Ok
    } else {
        RunStatus::Partial
    };
    TranslatedTitles {
        titles,
        warnings,
        status,
    }
}
