use super::{UploadPolicy, UploadedFile};
use crate::error::{AppError, AppResult};
use std::path::Path;

/// 小写扩展名
pub fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
}

/// 按策略检查上传文件：非空、大小、扩展名与文件头类型
pub fn validate_upload(policy: &UploadPolicy, file: &UploadedFile) -> AppResult<()> {
    let size = file.data.len() as u64;

    if size == 0 {
        return Err(AppError::bad_request("Uploaded file is empty"));
    }

    if size > policy.max_size {
        return Err(AppError::file_too_large(policy.max_size));
    }

    let allowed = extension_of(&file.original_name)
        .is_some_and(|ext| policy.kind.allowed_extensions().contains(&ext.as_str()));
    if !allowed {
        return Err(AppError::bad_request(policy.kind.rejection_message()));
    }

    // 能识别出文件头时，类别必须与策略一致
    if let Some(detected) = infer::get(&file.data) {
        if detected.matcher_type() != policy.kind.matcher_type() {
            tracing::warn!(
                "文件 {} 的内容类型 {} 与扩展名不符",
                file.original_name,
                detected.mime_type()
            );
            return Err(AppError::bad_request(policy.kind.rejection_message()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_processing::UploadKind;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const MP4: &[u8] = b"\0\0\0\x18ftypmp42\0\0\0\0mp42isom";

    fn image_policy() -> UploadPolicy {
        UploadPolicy {
            kind: UploadKind::Image,
            max_size: 64,
        }
    }

    fn video_policy() -> UploadPolicy {
        UploadPolicy {
            kind: UploadKind::Video,
            max_size: 64,
        }
    }

    fn file(name: &str, data: &[u8]) -> UploadedFile {
        UploadedFile {
            original_name: name.to_string(),
            data: data.to_vec(),
        }
    }

    fn rejection(result: AppResult<()>) -> String {
        match result {
            Err(AppError::BadRequest(msg)) => msg,
            other => panic!("expected bad request, got {:?}", other),
        }
    }

    #[test]
    fn test_accepts_allowed_extensions_case_insensitive() {
        assert!(validate_upload(&image_policy(), &file("avatar.PNG", PNG)).is_ok());
        assert!(validate_upload(&image_policy(), &file("photo.JpEg", b"plain bytes")).is_ok());
        assert!(validate_upload(&video_policy(), &file("clip.MP4", MP4)).is_ok());
    }

    #[test]
    fn test_rejects_disallowed_extensions() {
        assert_eq!(
            rejection(validate_upload(&image_policy(), &file("doc.pdf", b"%PDF"))),
            "Only image files are allowed!"
        );
        assert_eq!(
            rejection(validate_upload(&image_policy(), &file("noext", PNG))),
            "Only image files are allowed!"
        );
        assert_eq!(
            rejection(validate_upload(&video_policy(), &file("song.mp3", b"ID3"))),
            "Only video files are allowed!"
        );
    }

    #[test]
    fn test_rejects_content_family_mismatch() {
        assert_eq!(
            rejection(validate_upload(&image_policy(), &file("fake.png", MP4))),
            "Only image files are allowed!"
        );
        assert_eq!(
            rejection(validate_upload(&video_policy(), &file("fake.mp4", PNG))),
            "Only video files are allowed!"
        );
    }

    #[test]
    fn test_rejects_recognised_content_outside_policy_family() {
        const ZIP: &[u8] = b"PK\x03\x04\x14\0\0\0\x08\0";
        assert_eq!(
            rejection(validate_upload(&image_policy(), &file("photo.png", ZIP))),
            "Only image files are allowed!"
        );
        assert_eq!(
            rejection(validate_upload(&video_policy(), &file("clip.webm", b"%PDF-1.7\n"))),
            "Only video files are allowed!"
        );
    }

    #[test]
    fn test_rejects_oversized_and_empty() {
        let big = vec![0u8; 65];
        assert!(matches!(
            validate_upload(&image_policy(), &file("big.png", &big)),
            Err(AppError::FileTooLarge { max_size: 64 })
        ));

        let exact = vec![b'x'; 64];
        assert!(validate_upload(&image_policy(), &file("exact.gif", &exact)).is_ok());

        assert!(validate_upload(&image_policy(), &file("empty.png", b"")).is_err());
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("a.B.WebM").as_deref(), Some("webm"));
        assert_eq!(extension_of("README"), None);
    }
}
