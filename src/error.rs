/*
 * SPDX-FileCopyrightText: © 2025 Jinwoo Park (pmnxis@gmail.com)
 *
 * SPDX-License-Identifier: MIT
 */

use thiserror::Error;

/// Per-file failure causes. Both are recoverable at the batch level: the
/// offending file contributes no text and the rest of the batch continues.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("conversion failed: {0}")]
    Conversion(String),

    #[error("recognition failed: {0}")]
    Recognition(String),
}
