//! Localized notification texts

use crate::domain::Locale;

pub const REGISTER_ENTITY_TYPE: &str = "ProcessingRegister";

pub fn archiving_title(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "Processing register - Archiving",
        Locale::Fr => "Registre de traitement - Archivage",
    }
}

pub fn processed_finished(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "Processed finished",
        Locale::Fr => "Traitement terminé",
    }
}

pub fn error_occurred(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "Error occurred",
        Locale::Fr => "Une erreur est survenue",
    }
}
