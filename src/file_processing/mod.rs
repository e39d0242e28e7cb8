pub mod naming;
pub mod validator;

pub use naming::generate_filename;
pub use validator::validate_upload;

use crate::{
    config::UploadConfig,
    error::{AppError, AppResult},
};
use axum::extract::{Multipart, multipart::MultipartError};
use axum::http::StatusCode;
use std::collections::HashMap;
use std::str::FromStr;

/// 上传文件类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Image,
    Video,
}

impl UploadKind {
    /// 表单字段名，同时用作存储文件名前缀
    pub fn field_name(&self) -> &'static str {
        match self {
            UploadKind::Image => "image",
            UploadKind::Video => "video",
        }
    }

    /// 允许的扩展名（小写，不含点）
    pub fn allowed_extensions(&self) -> &'static [&'static str] {
        match self {
            UploadKind::Image => &["jpg", "jpeg", "png", "gif", "webp"],
            UploadKind::Video => &["mp4", "mov", "avi", "mkv", "webm"],
        }
    }

    /// 类型不符时的错误消息
    pub fn rejection_message(&self) -> &'static str {
        match self {
            UploadKind::Image => "Only image files are allowed!",
            UploadKind::Video => "Only video files are allowed!",
        }
    }

    fn matcher_type(&self) -> infer::MatcherType {
        match self {
            UploadKind::Image => infer::MatcherType::Image,
            UploadKind::Video => infer::MatcherType::Video,
        }
    }
}

/// 上传策略：类别与大小上限
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadPolicy {
    pub kind: UploadKind,
    pub max_size: u64,
}

impl UploadPolicy {
    pub fn image(config: &UploadConfig) -> Self {
        Self {
            kind: UploadKind::Image,
            max_size: config.max_image_size,
        }
    }

    pub fn video(config: &UploadConfig) -> Self {
        Self {
            kind: UploadKind::Video,
            max_size: config.max_video_size,
        }
    }
}

/// 已接收的上传文件
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_name: String,
    pub data: Vec<u8>,
}

/// 解析后的 multipart 表单：文本字段与至多一个文件
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    pub file: Option<UploadedFile>,
}

impl MultipartForm {
    /// 读取整个表单；文件字段按策略边读边限制大小
    pub async fn collect(mut multipart: Multipart, policy: &UploadPolicy) -> AppResult<Self> {
        let mut form = MultipartForm::default();

        while let Some(mut field) = multipart
            .next_field()
            .await
            .map_err(|e| multipart_error(e, policy))?
        {
            let name = field.name().unwrap_or_default().to_string();

            if name == policy.kind.field_name() {
                let original_name = field.file_name().unwrap_or_default().to_string();
                let mut data = Vec::new();

                while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(e, policy))? {
                    if (data.len() + chunk.len()) as u64 > policy.max_size {
                        return Err(AppError::file_too_large(policy.max_size));
                    }
                    data.extend_from_slice(&chunk);
                }

                // 浏览器未选择文件时会提交空的文件字段
                if original_name.is_empty() && data.is_empty() {
                    continue;
                }

                form.file = Some(UploadedFile {
                    original_name,
                    data,
                });
            } else if !name.is_empty() {
                let value = field.text().await.map_err(|e| multipart_error(e, policy))?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    /// 文本字段原值
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// 必填文本字段
    pub fn required(&self, name: &str) -> AppResult<String> {
        self.text(name)
            .map(str::to_string)
            .ok_or_else(|| AppError::validation(format!("{} is required", name)))
    }

    /// 可选字段解析；空字符串视为未提供
    pub fn parse<T: FromStr>(&self, name: &str) -> AppResult<Option<T>> {
        match self.text(name).map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| AppError::validation(format!("{} has an invalid value", name))),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_fields(fields: &[(&str, &str)]) -> Self {
        Self {
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            file: None,
        }
    }
}

fn multipart_error(e: MultipartError, policy: &UploadPolicy) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::file_too_large(policy.max_size)
    } else {
        AppError::bad_request(format!("Invalid multipart form: {}", e.body_text()))
    }
}
