//! Diagnosis keyword -> required specialty

/// Specialty required when no keyword matches
pub const DEFAULT_SPECIALTY: &str = "General Medicine";

/// Ordered keyword table; the first keyword found in the diagnosis wins
///
/// A keyword matches a whole word. A trailing `*` makes it a stem matching any
/// word that starts with it.
const KEYWORDS: &[(&str, &str)] = &[
    // Traumatology
    ("fractur*", "Traumatology"),
    ("dislocat*", "Traumatology"),
    ("luxaci*", "Traumatology"),
    ("trauma*", "Traumatology"),
    ("tbi", "Traumatology"),
    ("tce", "Traumatology"),
    // Cardiology
    ("infarct*", "Cardiology"),
    ("infarto*", "Cardiology"),
    ("thrombos*", "Cardiology"),
    ("trombosis", "Cardiology"),
    ("hypertensi*", "Cardiology"),
    ("hipertensi*", "Cardiology"),
    // Nephrology
    ("renal", "Nephrology"),
    ("kidney*", "Nephrology"),
    // Pediatrics
    ("child*", "Pediatrics"),
    ("niño*", "Pediatrics"),
    ("niña*", "Pediatrics"),
    ("minor", "Pediatrics"),
    ("menor", "Pediatrics"),
    // Pulmonology
    ("bronchospasm*", "Pulmonology"),
    ("broncoespasmo*", "Pulmonology"),
    ("pneumonia*", "Pulmonology"),
    ("neumonía*", "Pulmonology"),
    ("neumonia*", "Pulmonology"),
];

fn matches_word(keyword: &str, word: &str) -> bool {
    match keyword.strip_suffix('*') {
        Some(stem) => word.starts_with(stem),
        None => word == keyword,
    }
}

/// Case-insensitive word lookup over the keyword table
pub fn infer_specialty(diagnosis: Option<&str>) -> &'static str {
    let Some(text) = diagnosis.map(str::to_lowercase) else {
        return DEFAULT_SPECIALTY;
    };
    let words: Vec<&str> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    KEYWORDS
        .iter()
        .find(|(keyword, _)| words.iter().any(|w| matches_word(keyword, w)))
        .map(|(_, specialty)| *specialty)
        .unwrap_or(DEFAULT_SPECIALTY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_matches() {
        assert_eq!(infer_specialty(Some("Open fracture of the femur")), "Traumatology");
        assert_eq!(infer_specialty(Some("Fractura de fémur")), "Traumatology");
        assert_eq!(infer_specialty(Some("Acute myocardial INFARCTION")), "Cardiology");
        assert_eq!(infer_specialty(Some("Insuficiencia renal crónica")), "Nephrology");
        assert_eq!(infer_specialty(Some("Neumonía adquirida")), "Pulmonology");
        assert_eq!(infer_specialty(Some("Fiebre en niño de 4 años")), "Pediatrics");
    }

    #[test]
    fn test_first_match_wins() {
        // Trauma is listed before pediatrics
        assert_eq!(infer_specialty(Some("child with head trauma")), "Traumatology");
    }

    #[test]
    fn test_keywords_match_words_not_fragments() {
        assert_eq!(infer_specialty(Some("Adrenal insufficiency")), DEFAULT_SPECIALTY);
        assert_eq!(infer_specialty(Some("Patient from a minority group")), DEFAULT_SPECIALTY);
        assert_eq!(infer_specialty(Some("Hipertrofia; ratbite")), DEFAULT_SPECIALTY);
        assert_eq!(infer_specialty(Some("TBI after fall")), "Traumatology");
        assert_eq!(infer_specialty(Some("Fracturas múltiples")), "Traumatology");
        assert_eq!(infer_specialty(Some("Children's ward, fever")), "Pediatrics");
        assert_eq!(infer_specialty(Some("Paciente menor de edad")), "Pediatrics");
        assert_eq!(infer_specialty(Some("Falla renal/aguda")), "Nephrology");
    }

    #[test]
    fn test_default() {
        assert_eq!(infer_specialty(None), DEFAULT_SPECIALTY);
        assert_eq!(infer_specialty(Some("")), DEFAULT_SPECIALTY);
        assert_eq!(infer_specialty(Some("headache")), DEFAULT_SPECIALTY);
    }
}
