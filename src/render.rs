//! Text rendering of the page for the terminal.

use std::fmt::Write as _;

use crate::review::{PageState, ReviewPage};
use crate::state_machine::PlaybackState;

const RULE: &str = "────────────────────────────────────────────────────────────";

pub fn render(state: &PageState, playback: PlaybackState, app_version: &str) -> String {
    match state {
        PageState::Loading => render_loading(),
        PageState::Failed(message) => render_failed(message),
        PageState::Ready(page) => render_page(page, playback, app_version),
    }
}

fn render_loading() -> String {
    "Le Cafard s'active pour Mr Cissé...\nAnalyse des sources en cours...\n".to_string()
}

fn render_failed(message: &str) -> String {
    format!("{}\n\n  [r] Réessayer    [q] Quitter\n", message)
}

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out, "\n{}\n{}", title, RULE);
}

pub fn render_page(page: &ReviewPage, playback: PlaybackState, app_version: &str) -> String {
    let review = &page.review;
    let mut out = String::new();

    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(out, "LE CAFARD LIBÉRÉ · L'édition du Jour - Mr Cissé");
    let _ = writeln!(out, "{}", review.date);
    let _ = writeln!(out, "{}", RULE);

    section(&mut out, "La Caricature du Jour");
    let _ = writeln!(out, "  « {} »", review.caricature_caption);
    let _ = writeln!(out, "  {}", display_url(&page.caricature_url));

    section(&mut out, "Synthèse Express");
    let _ = writeln!(out, "L'essentiel stratégique pour M. Cissé.");
    let _ = writeln!(out, "  {}", review.summary);
    let _ = writeln!(out, "Question de Débat : {}", review.debate_question);
    let _ = writeln!(out, "  [a] {}", playback.control_label());

    section(&mut out, "Les Titres Majeurs");
    for headline in &review.headlines {
        let badge = if headline.is_reliable() {
            "🟢 Fiable"
        } else {
            "🟡 À confirmer"
        };
        let _ = writeln!(
            out,
            "▌ [{}] {} ({})",
            headline.category, headline.title, headline.source
        );
        let _ = writeln!(out, "  {}", headline.content);
        let _ = writeln!(
            out,
            "  Indice Confiance: {}% {}",
            headline.confidence_percent(),
            badge
        );
    }

    let debate = &review.debate_details;
    section(&mut out, "Le Débat du Jour");
    let _ = writeln!(out, "POUR  « {} »", debate.pro);
    let _ = writeln!(out, "      {}, Contributeur Expert", debate.pro_expert);
    let _ = writeln!(out, "CONTRE « {} »", debate.con);
    let _ = writeln!(out, "      {}, Sociologue Analyste", debate.con_expert);

    section(&mut out, "Le Mot de l'Enseignant");
    let _ = writeln!(out, "  {}", review.mot_enseignant);

    section(&mut out, "Innovation 'Tech Galsen'");
    let _ = writeln!(out, "{}", review.innovation.title);
    let _ = writeln!(out, "  {}", review.innovation.description);

    section(&mut out, "Opportunités & Éco");
    for opp in &review.opportunities {
        let _ = writeln!(out, "• [{}] {} (échéance : {})", opp.kind, opp.title, opp.deadline);
    }

    section(&mut out, "Sources Analysées");
    let _ = writeln!(out, "{}", review.sources.join(" · "));

    let _ = writeln!(out, "\n{}", RULE);
    let _ = writeln!(out, "Le Cafard Libéré · Rigueur, Satire & Éducation · v{}", app_version);
    let _ = writeln!(out, "[a] audio  [r] recharger  [q] quitter");
    out
}

/// Data URLs are huge; show their size instead.
fn display_url(url: &str) -> String {
    match url.strip_prefix("data:") {
        Some(rest) => {
            let mime = rest.split(';').next().unwrap_or("application/octet-stream");
            format!("[image {} intégrée, {} caractères]", mime, url.len())
        }
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review::LOAD_FAILED_MESSAGE;
    use crate::review::tests::sample_review;

    fn page(url: &str) -> ReviewPage {
        ReviewPage {
            review: sample_review(),
            caricature_url: url.to_string(),
        }
    }

    #[test]
    fn ready_page_shows_every_section() {
        let text = render(
            &PageState::Ready(page("https://picsum.photos/800/600?text=Erreur+HF")),
            PlaybackState::Idle,
            "0.1.0",
        );
        assert!(text.contains("vendredi 16 octobre 2026"));
        assert!(text.contains("https://picsum.photos/800/600?text=Erreur+HF"));
        assert!(text.contains("Indice Confiance: 92% 🟢 Fiable"));
        assert!(text.contains("Indice Confiance: 70% 🟡 À confirmer"));
        assert!(text.contains("Dr A, Contributeur Expert"));
        assert!(text.contains("[Bourse] Bourse d'excellence (échéance : 30 octobre)"));
        assert!(text.contains("APS · Seneweb"));
        assert!(text.contains("Écouter l'Audio-Bila"));
    }

    #[test]
    fn control_label_follows_playback() {
        let text = render(
            &PageState::Ready(page("u")),
            PlaybackState::Playing,
            "0.1.0",
        );
        assert!(text.contains("[a] Arrêter l'Audio-Bila"));
    }

    #[test]
    fn data_url_is_summarized() {
        let text = render_page(&page("data:image/png;base64,AAAA"), PlaybackState::Idle, "0");
        assert!(text.contains("[image image/png intégrée, 26 caractères]"));
        assert!(!text.contains("AAAA"));
    }

    #[test]
    fn failed_page_offers_retry() {
        let text = render(
            &PageState::Failed(LOAD_FAILED_MESSAGE.to_string()),
            PlaybackState::Idle,
            "0",
        );
        assert!(text.starts_with(LOAD_FAILED_MESSAGE));
        assert!(text.contains("[r] Réessayer"));
    }
}
