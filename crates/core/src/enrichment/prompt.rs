//! Prompt construction shared by every provider adapter.
//!
//! The guardrails here are a product requirement: translations must not add diagnoses or
//! recommendations, and suggestions must stay general lifestyle guidance with no medical-advice
//! framing. Adapters only change the envelope (chat messages, instruct template), never the
//! wording.

use super::{EnrichmentPurpose, EnrichmentRequest};

const TRANSLATE_SYSTEM: &str = "You are a helpful medical translator. Your job is to translate \
medical jargon and technical terms into simple, easy-to-understand language that patients can \
comprehend. Be clear, accurate, and empathetic. Only explain what the text already says: do not \
add diagnoses, do not make treatment recommendations, and do not provide medical advice.";

const SUGGEST_SYSTEM: &str = "You are a helpful wellness advisor. Based on the medical condition \
described, you provide general lifestyle tips that may help patients manage their condition. \
IMPORTANT: You do NOT provide medical advice, diagnoses, or treatment recommendations. You only \
suggest general lifestyle improvements like diet, exercise, sleep, stress management, and daily \
habits. Always remind users to consult their healthcare provider.";

const CHAT_SYSTEM: &str = "You are a helpful and empathetic medical assistant chatting with a \
patient who uses the Medical Records Bridge app. Answer the patient's questions based on their \
medical records context if provided, and explain medical concepts in simple terms. DO NOT \
provide medical advice, diagnoses, or prescribe treatments. Always encourage the patient to \
consult their healthcare provider about symptoms. If the context does not contain the answer, \
say so.";

/// System and user message for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Build the prompt for `request`.
pub fn build(request: &EnrichmentRequest) -> Prompt {
    match request.purpose {
        EnrichmentPurpose::Translate => Prompt {
            system: TRANSLATE_SYSTEM.to_string(),
            user: format!(
                "Please translate the following medical text into simple, easy-to-understand \
language that a patient without medical training can understand. Explain any medical terms, \
abbreviations, and concepts clearly, without adding diagnoses or recommendations:\n\n{}\n\n\
Provide a clear, patient-friendly explanation:",
                request.text.trim()
            ),
        },
        EnrichmentPurpose::Suggest => {
            let condition = request.condition.as_deref().unwrap_or_default().trim();
            let mut user = format!(
                "Suggest some general lifestyle tips that might help a patient living with \
{condition}. Focus on diet, exercise, sleep, stress management, and daily habits. Remember: DO \
NOT give medical advice or suggest treatments. Only provide general wellness suggestions."
            );
            let text = request.text.trim();
            if !text.is_empty() {
                user.push_str("\n\nMedical information:\n");
                user.push_str(text);
            }
            user.push_str("\n\nPlease provide helpful lifestyle suggestions:");
            Prompt {
                system: SUGGEST_SYSTEM.to_string(),
                user,
            }
        }
        EnrichmentPurpose::Chat => {
            let user = match request.context.as_deref().map(str::trim) {
                Some(context) if !context.is_empty() => format!(
                    "Context from my medical records:\n{}\n\nMy question: {}",
                    context,
                    request.text.trim()
                ),
                _ => request.text.trim().to_string(),
            };
            Prompt {
                system: CHAT_SYSTEM.to_string(),
                user,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_prompt_forbids_diagnoses_and_advice() {
        let prompt = build(&EnrichmentRequest::translate("WBC: 7.5, RBC: 4.8"));
        assert!(prompt.user.contains("WBC: 7.5, RBC: 4.8"));
        assert!(prompt.system.contains("do not add diagnoses"));
        assert!(prompt.system.contains("do not provide medical advice"));
    }

    #[test]
    fn test_suggest_prompt_names_condition_and_excludes_advice() {
        let prompt = build(&EnrichmentRequest::suggest("hypertension", "BP 150/95"));
        assert!(prompt.user.contains("living with hypertension"));
        assert!(prompt.user.contains("BP 150/95"));
        assert!(prompt.user.contains("DO NOT give medical advice"));
        assert!(prompt.system.contains("do NOT provide medical advice"));
    }

    #[test]
    fn test_suggest_prompt_without_record_text() {
        let prompt = build(&EnrichmentRequest::suggest("diabetes", ""));
        assert!(!prompt.user.contains("Medical information"));
    }

    #[test]
    fn test_chat_prompt_includes_context_when_present() {
        let with_context = build(&EnrichmentRequest::chat(
            "What does RBC mean?",
            Some("RBC: 4.8".into()),
        ));
        assert!(with_context.user.starts_with("Context from my medical records"));
        assert!(with_context.user.contains("RBC: 4.8"));

        let bare = build(&EnrichmentRequest::chat("Hello", Some("  ".into())));
        assert_eq!(bare.user, "Hello");
        assert!(bare.system.contains("DO NOT"));
    }
}
