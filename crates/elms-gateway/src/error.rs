use elms_core::ElmsError;
use elms_types::ErrorBody;

/// 传输层错误（连接失败、超时等）
pub(crate) fn transport_error(err: reqwest::Error) -> ElmsError {
    if err.is_timeout() {
        ElmsError::Transport("request timed out".to_string())
    } else if err.is_connect() {
        ElmsError::Transport("server unreachable".to_string())
    } else {
        ElmsError::Transport(err.to_string())
    }
}

pub(crate) fn decode_error(err: reqwest::Error) -> ElmsError {
    ElmsError::Decode(err.to_string())
}

/// 从错误响应体中提取结构化 message；响应体不是 JSON 或没有该字段时返回 None
pub(crate) fn structured_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty())
}

/// 读取错误响应并提取 message
pub(crate) async fn read_error_message(response: reqwest::Response) -> Option<String> {
    match response.text().await {
        Ok(body) => structured_message(&body),
        Err(e) => {
            tracing::debug!(error = %e, "Failed to read error response body");
            None
        }
    }
}
