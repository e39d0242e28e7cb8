use super::{UploadKind, validator::extension_of};
use rand::Rng;

/// 生成存储文件名：`<类别>-<毫秒时间戳>-<随机数>.<扩展名>`
pub fn generate_filename(kind: UploadKind, original_name: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: u32 = rand::rng().random_range(0..1_000_000_000);

    match extension_of(original_name) {
        Some(ext) => format!("{}-{}-{}.{}", kind.field_name(), millis, suffix, ext),
        None => format!("{}-{}-{}", kind.field_name(), millis, suffix),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_filename_shape() {
        let name = generate_filename(UploadKind::Video, "My Clip.MOV");
        assert!(name.starts_with("video-"));
        assert!(name.ends_with(".mov"));

        let parts: Vec<&str> = name.trim_end_matches(".mov").split('-').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts[1].parse::<i64>().is_ok());
        assert!(parts[2].parse::<u32>().is_ok());
    }

    #[test]
    fn test_generated_names_differ() {
        let a = generate_filename(UploadKind::Image, "a.png");
        let b = generate_filename(UploadKind::Image, "a.png");
        assert_ne!(a, b);
    }
}
