use serde_json::Value;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::llm::TextGenerator;

const SYSTEM_PROMPT: &str = r#"You are an expert quiz generator. Respond with valid JSON only.

You receive:
1. TITLE: the Wikipedia article title
2. CONTENT: the full cleaned article text

Return one JSON object with exactly this structure:

{
  "title": "<string>",
  "description": "<2-4 sentence summary of the article>",
  "key_entities": {
    "people": ["..."],
    "organizations": ["..."],
    "locations": ["..."]
  },
  "topics": ["<topic1>", "<topic2>", "<topic3>"],
  "questions": [
    {
      "question": "<string>",
      "options": {
        "A": "<string>",
        "B": "<string>",
        "C": "<string>",
        "D": "<string>"
      },
      "answer": "<text of the correct option>",
      "explanation": "<1-2 sentences explaining the answer>",
      "difficulty": "easy | medium | hard"
    }
  ]
}

RULES:
- Output ONLY JSON, no markdown and no commentary
- Between 5 and 20 questions depending on article length
- EXACTLY 4 options per question, keyed A, B, C and D
- "answer" is the option TEXT, never the letter
- Every field must be present
- "topics" holds 3 to 6 related Wikipedia topics
- No trailing commas
- Do NOT wrap the output in ```json blocks"#;

pub fn build_prompt(title: &str, content: &str) -> String {
    let mut result = String::with_capacity(SYSTEM_PROMPT.len() + title.len() + content.len() + 32);
    result.push('\n');
    result.push_str(SYSTEM_PROMPT);
    result.push_str("\n\nTITLE:\n");
    result.push_str(title);
    result.push_str("\n\nCONTENT:\n");
    result.push_str(content);
    result.push('\n');
    result
}

/// Pulls the JSON object out of a raw model reply.
///
/// Code fences are removed, then everything from the first `{` to the last `}`
/// is parsed. The parsed value is not checked against the quiz schema.
pub fn clean_llm_output(output: &str) -> Result<Value> {
    let output = if output.contains("```") {
        output.replace("```json", "").replace("```", "").trim().to_string()
    } else {
        output.to_string()
    };

    let (start, end) = match (output.find('{'), output.rfind('}')) {
        (Some(start), Some(end)) if start <= end => (start, end),
        _ => {
            return Err(AppError::MalformedOutput(
                "LLM did not return valid JSON".to_string(),
            ));
        }
    };

    serde_json::from_str(&output[start..=end]).map_err(|e| {
        tracing::warn!(error = %e, "Failed to parse model JSON");
        AppError::MalformedOutput(format!("Failed to parse AI-generated JSON: {}", e))
    })
}

/// Drills through `quiz` wrapper objects until one carries `questions`.
pub fn unwrap_quiz(data: Value) -> Value {
    match data {
        Value::Object(mut map)
            if !map.contains_key("questions")
                && matches!(map.get("quiz"), Some(Value::Object(_))) =>
        {
            unwrap_quiz(map.remove("quiz").unwrap_or_default())
        }
        other => other,
    }
}

pub struct QuizSynthesizer {
    generator: Arc<dyn TextGenerator>,
}

impl QuizSynthesizer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub async fn synthesize(&self, title: &str, content: &str) -> Result<Value> {
        let prompt = build_prompt(title, content);
        tracing::debug!(prompt_chars = prompt.len(), "Calling text generation model");

        let raw = self.generator.generate(&prompt).await.map_err(|e| match e {
            AppError::GenerationError(_) => e,
            other => AppError::GenerationError(other.to_string()),
        })?;
        tracing::debug!(response_chars = raw.len(), "Model response received");

        Ok(unwrap_quiz(clean_llm_output(raw.trim())?))
    }
}
