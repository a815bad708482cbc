//! Extractors whose rejections render through `AppError`, so malformed
//! input gets the same `{"error": ...}` body as every other failure.

use axum::extract::FromRequestParts;

use crate::error::AppError;

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct Query<T>(pub T);
