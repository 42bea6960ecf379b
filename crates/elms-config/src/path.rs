/// 去掉查询串、片段与末尾斜杠
pub fn normalize_path(path: &str) -> String {
    let path = path.split(|c: char| c == '?' || c == '#').next().unwrap_or("").trim();
    let trimmed = path.trim_end_matches('/');

    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}
