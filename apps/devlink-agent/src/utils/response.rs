//! HTTP 响应辅助函数
//!
//! - 成功响应：ok, created
//! - 错误响应：bad_request_error, not_found_error, storage_error
//!
//! 所有错误返回统一的 ApiResponse 格式，HTTP 状态码与错误码对应。

use api_contract::ApiResponse;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use devlink_storage::StorageError;
use serde::Serialize;

/// 200 响应
pub fn ok<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}

/// 201 响应
pub fn created<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(ApiResponse::success(data))).into_response()
}

/// 错误请求响应
pub fn bad_request_error(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::<()>::error("INVALID.REQUEST", message.into())),
    )
        .into_response()
}

/// 资源未找到错误响应
pub fn not_found_error() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::<()>::error("RESOURCE.NOT_FOUND", "not found")),
    )
        .into_response()
}

/// 存储错误响应
pub fn storage_error(err: StorageError) -> Response {
    let (status, code) = match &err {
        StorageError::NotFound { .. } => (StatusCode::NOT_FOUND, "RESOURCE.NOT_FOUND"),
        StorageError::AlreadyExists { .. } | StorageError::Conflict { .. } => {
            (StatusCode::CONFLICT, "RESOURCE.CONFLICT")
        }
        StorageError::Invalid { .. } => (StatusCode::BAD_REQUEST, "INVALID.REQUEST"),
        StorageError::UnexpectedKind(_) | StorageError::Unavailable(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL.ERROR")
        }
    };
    (status, Json(ApiResponse::<()>::error(code, err.to_string()))).into_response()
}
