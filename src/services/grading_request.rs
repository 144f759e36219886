use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};

use crate::db::models::Assignment;

const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TypedAnswer {
    pub(crate) question_id: String,
    pub(crate) question_text: String,
    pub(crate) answer_text: String,
}

/// Decoded-and-checked photo of the student's work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImagePayload {
    pub(crate) mime_type: String,
    pub(crate) base64_data: String,
    pub(crate) byte_len: usize,
}

impl ImagePayload {
    /// Accepts `data:<mime>;base64,<data>` or bare base64.
    pub(crate) fn parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        let (mime_type, data) = match raw.strip_prefix("data:") {
            Some(rest) => {
                let (header, data) =
                    rest.split_once(',').ok_or_else(|| "data URL has no payload".to_string())?;
                let mime = header.strip_suffix(";base64").ok_or_else(|| {
                    "data URL must be base64 encoded".to_string()
                })?;
                let mime = if mime.is_empty() { DEFAULT_IMAGE_MIME } else { mime };
                (mime.to_ascii_lowercase(), data)
            }
            None => (DEFAULT_IMAGE_MIME.to_string(), raw),
        };

        let bytes = STANDARD.decode(data.trim()).map_err(|err| format!("invalid base64 image: {err}"))?;
        if bytes.is_empty() {
            return Err("image is empty".to_string());
        }

        Ok(Self { mime_type, base64_data: data.trim().to_string(), byte_len: bytes.len() })
    }

    pub(crate) fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64_data)
    }
}

/// Everything the grading model sees for one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GradingRequest {
    pub(crate) submission_id: String,
    pub(crate) assignment_title: String,
    pub(crate) assignment_type: String,
    pub(crate) grade: String,
    pub(crate) rubric_text: String,
    pub(crate) official_question_ids: Vec<String>,
    pub(crate) typed_answers: Vec<TypedAnswer>,
    pub(crate) image: Option<ImagePayload>,
}

impl GradingRequest {
    /// Every question of the assignment is listed in `official_question_ids`
    /// whether answered or not. Blank answers are skipped and answers keyed by
    /// unknown ids are dropped.
    pub(crate) fn build(
        submission_id: &str,
        assignment: &Assignment,
        answers: &BTreeMap<String, String>,
        image: Option<ImagePayload>,
    ) -> Self {
        for unknown in answers.keys().filter(|id| assignment.question(id).is_none()) {
            tracing::warn!(
                submission_id = %submission_id,
                question_id = %unknown,
                "Dropping typed answer for a question not in the assignment"
            );
        }

        let typed_answers = assignment
            .questions
            .iter()
            .filter_map(|question| {
                let answer = answers.get(&question.id)?.trim();
                (!answer.is_empty()).then(|| TypedAnswer {
                    question_id: question.id.clone(),
                    question_text: question.text.clone(),
                    answer_text: answer.to_string(),
                })
            })
            .collect();

        Self {
            submission_id: submission_id.to_string(),
            assignment_title: assignment.title.clone(),
            assignment_type: assignment.kind.label().to_string(),
            grade: assignment.grade.to_string(),
            rubric_text: assignment.rubric.clone(),
            official_question_ids: assignment
                .questions
                .iter()
                .map(|question| question.id.clone())
                .collect(),
            typed_answers,
            image,
        }
    }

    pub(crate) fn has_image(&self) -> bool {
        self.image.is_some()
    }

    pub(crate) fn render_prompt(&self) -> String {
        let official_ids = if self.official_question_ids.is_empty() {
            "(không có câu hỏi đánh số, chấm theo rubric)".to_string()
        } else {
            self.official_question_ids.join(", ")
        };

        let typed = if self.typed_answers.is_empty() {
            "Học sinh không đánh máy câu trả lời.".to_string()
        } else {
            self.typed_answers
                .iter()
                .map(|answer| {
                    format!(
                        "Câu hỏi [ID: {}, Nội dung: {}]: {}",
                        answer.question_id, answer.question_text, answer.answer_text
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        };

        let image_note = if self.has_image() {
            "Học sinh có gửi ảnh kèm theo (phân tích nội dung trong ảnh)."
        } else {
            "Không có ảnh chụp."
        };

        format!(
            "HÃY PHÂN TÍCH BÀI LÀM VÀ CHẤM ĐIỂM CHI TIẾT.\n\n\
             THÔNG TIN NHIỆM VỤ:\n\
             - Chủ đề: {title}\n\
             - Khối lớp: {grade}\n\
             - Hình thức: {kind}\n\
             - Đáp án mẫu/Rubric: {rubric}\n\
             - Danh sách câu hỏi chính thức (ID): {official_ids}\n\n\
             DỮ LIỆU BÀI LÀM CỦA HỌC SINH:\n\
             1. CÂU TRẢ LỜI ĐÁNH MÁY:\n{typed}\n\n\
             2. ẢNH CHỤP MINH CHỨNG:\n{image_note}\n",
            title = self.assignment_title,
            grade = self.grade,
            kind = self.assignment_type,
            rubric = self.rubric_text,
        )
    }

    /// Multimodal user message in chat-completions form.
    pub(crate) fn user_content(&self) -> Value {
        let mut content = vec![json!({"type": "text", "text": self.render_prompt()})];
        if let Some(image) = &self.image {
            content.push(json!({
                "type": "image_url",
                "image_url": {"url": image.data_url()}
            }));
        }
        Value::Array(content)
    }
}
