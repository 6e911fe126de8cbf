// ==========================================
// 出口集装箱质检追踪系统 - 追踪码生成
// ==========================================
// 格式: 前缀 + 10 位大写十六进制；唯一性由 container.tracking_code UNIQUE 约束保证
// ==========================================

/// 随机部分长度
pub const TRACKING_CODE_RANDOM_LEN: usize = 10;

/// 生成一个候选追踪码
pub fn generate_tracking_code(prefix: &str) -> String {
    let random = uuid::Uuid::new_v4().simple().to_string().to_ascii_uppercase();
    format!("{}{}", prefix.trim(), &random[..TRACKING_CODE_RANDOM_LEN])
}

/// 规范化用户输入的追踪码（去空白，大写）
pub fn normalize_tracking_code(code: &str) -> Option<String> {
    let code = code.trim();
    if code.is_empty() {
        None
    } else {
        Some(code.to_ascii_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_code_shape() {
        let code = generate_tracking_code("CTR-");
        assert!(code.starts_with("CTR-"));
        let random = &code["CTR-".len()..];
        assert_eq!(random.len(), TRACKING_CODE_RANDOM_LEN);
        assert!(random.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn test_generated_codes_differ() {
        assert_ne!(generate_tracking_code("CTR-"), generate_tracking_code("CTR-"));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_tracking_code(" ctr-ab12 "), Some("CTR-AB12".to_string()));
        assert_eq!(normalize_tracking_code("   "), None);
    }
}
