use std::collections::HashSet;
use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::core::config::AiSettings;
use crate::db::models::Question;
use crate::db::types::{QuestionLevel, QuestionType};
use crate::schemas::generation::{
    self, GeneratedContent, GenerationRequest, QuestionMatrix, RawGeneratedContent, RawQuestion,
};
use crate::services::chat_client::{AiError, ChatClient, ChatRequest};

const GENERATION_SYSTEM_PROMPT: &str = r#"Bạn là chuyên gia soạn học liệu môn Khoa học tự nhiên (KHTN) lớp 6, 7, 8, 9 theo chương trình GDPT 2018.
Nhiệm vụ: tạo nội dung bài tập có cấu trúc theo đúng ma trận đề giáo viên yêu cầu.

YÊU CẦU:
1. Trả về mảng "questions"; mỗi câu có "level" là một trong "Biết", "Hiểu", "Vận dụng", "Vận dụng cao".
2. Câu trắc nghiệm (mcq): id, text, type "mcq", level, options gồm đúng 4 lựa chọn, correctAnswer là A, B, C hoặc D.
3. Câu tự luận (essay): id, text, type "essay", level; không có options.
4. "description": tóm tắt đề bài bằng Markdown.
5. "rubric": đáp án chi tiết và hướng dẫn chấm từng câu.
6. Tuân thủ đúng số lượng câu theo từng mức độ."#;

/// Drafts assignment content. Nothing is persisted by implementations.
#[async_trait]
pub(crate) trait ContentGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedContent, AiError>;
}

#[derive(Debug, Clone)]
pub(crate) struct GenerationClient {
    chat: ChatClient,
    model: String,
    temperature: f64,
}

impl GenerationClient {
    pub(crate) fn from_settings(settings: &AiSettings) -> Result<Self> {
        Ok(Self {
            chat: ChatClient::from_settings(settings)?,
            model: settings.generation_model.clone(),
            temperature: settings.generation_temperature,
        })
    }
}

#[async_trait]
impl ContentGenerator for GenerationClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedContent, AiError> {
        let timer = Instant::now();
        let matrix = request.resolved_matrix();

        tracing::info!(
            topic = %request.topic,
            grade = %request.grade,
            mcq = matrix.total(QuestionType::Mcq),
            essay = matrix.total(QuestionType::Essay),
            model = %self.model,
            "Requesting assignment content"
        );

        let outcome = self
            .chat
            .complete(&ChatRequest {
                model: self.model.clone(),
                temperature: self.temperature,
                system_prompt: GENERATION_SYSTEM_PROMPT,
                user_content: json!(render_prompt(request, &matrix)),
                schema_name: "assignment_content",
                schema: generation::response_schema(),
            })
            .await
            .and_then(|reply| validate_content(reply.content, &matrix));

        let status = match &outcome {
            Ok(_) => "ok",
            Err(err) => err.kind().as_str(),
        };
        metrics::counter!("generation_requests_total", "status" => status).increment(1);

        match &outcome {
            Ok(content) => tracing::info!(
                topic = %request.topic,
                questions = content.questions.len(),
                duration_seconds = timer.elapsed().as_secs_f64(),
                "Assignment content generated"
            ),
            Err(err) => tracing::warn!(topic = %request.topic, error = %err, "Content generation failed"),
        }

        outcome
    }
}

fn render_prompt(request: &GenerationRequest, matrix: &QuestionMatrix) -> String {
    let rows = |kind: QuestionType| {
        QuestionLevel::ALL
            .into_iter()
            .map(|level| format!("   - {}: {} câu", level.label(), matrix.count(kind, level)))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "Hãy tạo nội dung bài tập KHTN lớp {grade} cho chủ đề: \"{topic}\".\n\
         Hình thức: {kind}.\n\n\
         MA TRẬN CÂU HỎI YÊU CẦU:\n\
         1. Trắc nghiệm (MCQ):\n{mcq}\n\n\
         2. Tự luận (Essay):\n{essay}\n\n\
         Tổng cộng có {mcq_total} câu trắc nghiệm và {essay_total} câu tự luận.\n\
         Nội dung phải khoa học, chính xác và bám sát kiến thức khối {grade}.",
        grade = request.grade,
        topic = request.topic,
        kind = request.kind.label(),
        mcq = rows(QuestionType::Mcq),
        essay = rows(QuestionType::Essay),
        mcq_total = matrix.total(QuestionType::Mcq),
        essay_total = matrix.total(QuestionType::Essay),
    )
}

/// Parses the reply and keeps only well-formed questions. Individual bad
/// items are dropped; an entirely empty set when questions were requested is
/// a schema violation.
pub(crate) fn validate_content(
    content: Value,
    matrix: &QuestionMatrix,
) -> Result<GeneratedContent, AiError> {
    let raw: RawGeneratedContent =
        serde_json::from_value(content).map_err(|err| AiError::SchemaViolation(err.to_string()))?;

    let requested = raw.questions.len();
    let mut seen = HashSet::new();
    let mut questions = Vec::with_capacity(requested);

    for (idx, item) in raw.questions.into_iter().enumerate() {
        match to_question(item) {
            Ok(question) if !seen.contains(&question.id) => {
                seen.insert(question.id.clone());
                questions.push(question);
            }
            Ok(question) => reject(idx, &format!("duplicate id {}", question.id)),
            Err(reason) => reject(idx, &reason),
        }
    }

    if questions.is_empty() && !matrix.is_empty() {
        return Err(AiError::SchemaViolation(format!(
            "none of the {requested} generated questions passed validation"
        )));
    }

    Ok(GeneratedContent { description: raw.description, rubric: raw.rubric, questions })
}

fn reject(idx: usize, reason: &str) {
    metrics::counter!("generation_questions_rejected_total").increment(1);
    tracing::warn!(index = idx, reason = %reason, "Dropping generated question");
}

fn to_question(item: Value) -> Result<Question, String> {
    let raw: RawQuestion = serde_json::from_value(item).map_err(|err| err.to_string())?;

    let kind = match raw.kind.trim().to_ascii_lowercase().as_str() {
        "mcq" => QuestionType::Mcq,
        "essay" => QuestionType::Essay,
        other => return Err(format!("unknown question type {other:?}")),
    };
    let level = QuestionLevel::from_label(&raw.level)
        .ok_or_else(|| format!("unknown level {:?}", raw.level))?;

    let question = Question {
        id: raw.id.trim().to_string(),
        text: raw.text.trim().to_string(),
        kind,
        level,
        options: match kind {
            QuestionType::Mcq => raw.options,
            QuestionType::Essay => None,
        },
        correct_answer: raw.correct_answer.map(|answer| answer.trim().to_string()),
    };
    question.check()?;
    Ok(question)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::chat_client::stub::{spawn, StubBehaviour};

    fn mcq(id: &str, options: Value, answer: &str) -> Value {
        json!({"id": id, "text": format!("Câu {id}"), "type": "mcq", "level": "Biết",
               "options": options, "correctAnswer": answer})
    }

    #[test]
    fn three_option_mcq_is_filtered_out() {
        let content = json!({
            "description": "# Đề",
            "rubric": "Đáp án",
            "questions": [
                mcq("q1", json!(["A", "B", "C", "D"]), "A"),
                mcq("q2", json!(["A", "B", "C"]), "A"),
                {"id": "q3", "text": "Giải thích", "type": "essay", "level": "Hiểu"}
            ]
        });

        let generated = validate_content(content, &QuestionMatrix::from_flat(2, 1)).unwrap();

        let ids: Vec<_> = generated.questions.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["q1", "q3"]);
    }

    #[test]
    fn bad_levels_and_duplicates_are_dropped_and_essay_options_removed() {
        let content = json!({
            "description": "",
            "rubric": "",
            "questions": [
                {"id": "q1", "text": "Vì sao?", "type": "essay", "level": "Hiểu", "options": ["x"]},
                {"id": "q1", "text": "Lặp", "type": "essay", "level": "Hiểu"},
                {"id": "q2", "text": "Phân tích", "type": "essay", "level": "Phân tích"},
                {"id": "q3", "text": "Ghép", "type": "matching", "level": "Biết"},
                mcq("q4", json!(["Fe", "Cu", "Al", "Zn"]), "E")
            ]
        });

        let generated = validate_content(content, &QuestionMatrix::from_flat(1, 4)).unwrap();

        assert_eq!(generated.questions.len(), 1);
        assert_eq!(generated.questions[0].id, "q1");
        assert_eq!(generated.questions[0].options, None);
    }

    #[test]
    fn all_questions_invalid_is_schema_violation() {
        let content = json!({
            "description": "",
            "rubric": "",
            "questions": [mcq("q1", json!(["A"]), "A")]
        });

        let error = validate_content(content, &QuestionMatrix::from_flat(1, 0)).unwrap_err();

        assert!(matches!(error, AiError::SchemaViolation(_)));
    }

    #[test]
    fn missing_rubric_is_schema_violation() {
        let error =
            validate_content(json!({"description": "x", "questions": []}), &QuestionMatrix::default())
                .unwrap_err();
        assert!(matches!(error, AiError::SchemaViolation(_)));
    }

    #[test]
    fn practical_assignment_may_have_no_questions() {
        let content = json!({"description": "Báo cáo", "rubric": "Tiêu chí", "questions": []});
        let generated = validate_content(content, &QuestionMatrix::default()).unwrap();
        assert!(generated.questions.is_empty());
    }

    #[tokio::test]
    async fn client_sends_matrix_prompt_with_generation_temperature() {
        let body = json!({
            "description": "Tóm tắt",
            "rubric": "Đáp án",
            "questions": [mcq("q1", json!(["Nhôm", "Sắt", "Đồng", "Kẽm"]), "Sắt")]
        });
        let behaviour = StubBehaviour::content(&body.to_string());
        let seen = behaviour.last_request.clone();
        let settings = spawn(behaviour, 5).await;
        let client = GenerationClient::from_settings(&settings).expect("client");
        let request: GenerationRequest = serde_json::from_value(json!({
            "topic": "Kim loại",
            "grade": 9,
            "type": "trắc nghiệm",
            "mcqCount": 1
        }))
        .unwrap();

        let generated = client.generate(&request).await.expect("generated");

        assert_eq!(generated.questions.len(), 1);
        let payload = seen.lock().unwrap().clone().expect("payload");
        assert_eq!(payload["model"], "author-test");
        assert_eq!(payload["temperature"], 0.7);
        let prompt = payload["messages"][1]["content"].as_str().unwrap();
        assert!(prompt.contains("Kim loại"));
        assert!(prompt.contains("Tổng cộng có 1 câu trắc nghiệm và 0 câu tự luận"));
    }
}
