use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;

use crate::core::config::AiSettings;
use crate::schemas::grading::{self, GradingResult};
use crate::services::chat_client::{AiError, ChatClient, ChatRequest};
use crate::services::grading_request::GradingRequest;

const GRADING_SYSTEM_PROMPT: &str = r#"Bạn là hệ thống AI chấm bài môn Khoa học tự nhiên (KHTN) lớp 6, 7, 8, 9 theo chương trình GDPT 2018.

VAI TRÒ:
- Đọc chữ viết tay trong ảnh (nếu có) và các câu trả lời học sinh đã đánh máy.
- Chấm điểm công bằng, chính xác theo rubric/đáp án giáo viên cung cấp.
- Xác định từng câu hỏi là "correct" hay "incorrect".

QUY TRÌNH:
1. Kết hợp câu trả lời đánh máy và nội dung trong ảnh.
2. Với MỖI ID trong danh sách câu hỏi chính thức, trả về đúng một phần tử trong "questionResults".
3. Thang điểm 10, chú ý các bước giải và lập luận khoa học.

ĐẦU RA: chỉ trả về JSON đúng schema. "questionResults" phải chứa đầy đủ và duy nhất các ID đã giao, không thêm ID khác."#;

/// Grades one submission. Implementations never retry.
#[async_trait]
pub(crate) trait Grader: Send + Sync {
    async fn grade(&self, request: &GradingRequest) -> Result<GradingResult, AiError>;
}

#[derive(Debug, Clone)]
pub(crate) struct GradingClient {
    chat: ChatClient,
    model: String,
    temperature: f64,
}

impl GradingClient {
    pub(crate) fn from_settings(settings: &AiSettings) -> Result<Self> {
        Ok(Self {
            chat: ChatClient::from_settings(settings)?,
            model: settings.grading_model.clone(),
            temperature: settings.grading_temperature,
        })
    }
}

#[async_trait]
impl Grader for GradingClient {
    async fn grade(&self, request: &GradingRequest) -> Result<GradingResult, AiError> {
        let timer = Instant::now();

        tracing::info!(
            submission_id = %request.submission_id,
            model = %self.model,
            questions = request.official_question_ids.len(),
            typed_answers = request.typed_answers.len(),
            has_image = request.has_image(),
            "Sending AI grading request"
        );

        let reply = self
            .chat
            .complete(&ChatRequest {
                model: self.model.clone(),
                temperature: self.temperature,
                system_prompt: GRADING_SYSTEM_PROMPT,
                user_content: request.user_content(),
                schema_name: "grading_result",
                schema: grading::response_schema(),
            })
            .await?;

        let result: GradingResult = serde_json::from_value(reply.content)
            .map_err(|err| AiError::SchemaViolation(err.to_string()))?;
        result.check_values().map_err(AiError::SchemaViolation)?;

        tracing::info!(
            submission_id = %request.submission_id,
            duration_seconds = timer.elapsed().as_secs_f64(),
            tokens_used = reply.tokens_used,
            score = result.score,
            "AI grading completed"
        );

        Ok(result)
    }
}
