//! Classification prompt sent with every post.

use crate::classification::field_keys;

/// Build the user message for one sanitized post.
///
/// The post is framed as mentioning a candidate in Guatemala's 2023
/// presidential race. The model is asked for the four labels and four scores
/// as a single JSON object keyed by `prefix` + field name.
#[must_use]
pub fn build_prompt(text: &str, prefix: &str) -> String {
    let keys = field_keys(prefix).join(", ");
    format!(
        "El siguiente es un tweet que menciona a un candidato presidencial dentro de la \
contienda electoral 2023 en Guatemala.
Por favor, clasifícalo de acuerdo a las siguientes categorías:

Valencia (sentimiento general): [positivo, negativo, neutro, otro]
Emoción (emoción principal expresada): [felicidad, tristeza, enojo, miedo, sorpresa, disgusto, otro]
Postura (actitud hacia el tema): [aprobación, desaprobación, esperanza, desilusión, indiferencia, \
confianza, desconfianza, otro]
Tono (forma de expresarse): [agresivo, pasivo, asertivo, escéptico, irónico, humorístico, \
informativo, serio, inspirador, otro]

Además, evalúalo utilizando una escala continua con rango de 0 a 1 en las siguientes dimensiones:

Amabilidad (nivel de cortesía): [0.0 - 1.0]
Legibilidad (facilidad de lectura): [0.0 - 1.0]
Controversialidad (potencial para generar desacuerdo): [0.0 - 1.0]
Informatividad (cantidad de información relevante y fundamentada): [0.0 - 1.0]

Responde únicamente con un objeto JSON con las siguientes llaves:

[{keys}]

Tweet: '''{text}'''"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_text_and_prefixed_keys() {
        let prompt = build_prompt("Sandra en Xela", "tw_");
        assert!(prompt.contains("Tweet: '''Sandra en Xela'''"));
        assert!(prompt.contains(
            "[tw_valencia, tw_emocion, tw_postura, tw_tono, tw_amabilidad, \
             tw_legibilidad, tw_controversialidad, tw_informatividad]"
        ));
        assert!(prompt.contains("contienda electoral 2023 en Guatemala"));
    }

    #[test]
    fn prompt_lists_every_label_option() {
        let prompt = build_prompt("x", "tw_");
        for option in ["neutro", "disgusto", "desconfianza", "inspirador"] {
            assert!(prompt.contains(option), "missing option {option}");
        }
    }

    #[test]
    fn prompt_follows_prefix() {
        let prompt = build_prompt("x", "p_");
        assert!(prompt.contains("p_tono"));
        assert!(!prompt.contains("tw_"));
    }
}
