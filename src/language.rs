//! Document language heuristics
//!
//! Expert statements are written in Finnish or Swedish, and the metadata
//! does not say which. Swedish statements mostly come from a few well-known
//! organizations, so their description is enough to spot most of them.

/// Description markers of organizations that write in Swedish
///
/// Each marker is paired with markers that cancel it, e.g. the Finnish
/// consumer association is not a Swedish-speaking "förbundet".
const SWEDISH_MARKERS: &[(&str, &[&str])] = &[
    // Åland government and organizations
    ("ahvenanmaan", &[]),
    ("åbo akademi", &[]),
    ("förbundet", &["konsumentförbundet"]),
];

/// Description markers of Finnish translations of a Swedish statement
const TRANSLATION_MARKERS: &[&str] = &[" suomennos ", " su "];

/// Truth that an expert statement is most likely written in Swedish, judging
/// by its description
pub fn most_likely_swedish(description: &str) -> bool {
    let description = description.to_lowercase();
    let swedish_author = SWEDISH_MARKERS.iter().any(|(marker, exceptions)| {
        description.contains(marker) && !exceptions.iter().any(|e| description.contains(e))
    });
    let translated = TRANSLATION_MARKERS.iter().any(|m| description.contains(m));
    if swedish_author && translated {
        log::trace!("Keeping translated statement {description:?}");
    }
    swedish_author && !translated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swedish_organizations() {
        assert!(most_likely_swedish("Ahvenanmaan maakuntahallitus"));
        assert!(most_likely_swedish("Åbo Akademi, professor"));
        assert!(most_likely_swedish("Finlands Svenska Lärarförbundet"));
    }

    #[test]
    fn finnish_statements() {
        assert!(!most_likely_swedish("Valtiovarainministeriö"));
        assert!(!most_likely_swedish("Konsumentförbundet rf"));
        assert!(!most_likely_swedish(""));
    }

    #[test]
    fn translations_are_kept() {
        assert!(!most_likely_swedish("Ahvenanmaan maakuntahallitus suomennos liite"));
        assert!(!most_likely_swedish("Åbo Akademi su käännös"));
    }
}
