// Copyright 2025 reword_engine contributors
// SPDX-License-Identifier: MIT

pub mod error;
pub mod logger;
pub mod config;
pub mod retry;
pub mod text_segmenter;
pub mod formatting;
pub mod leading_clause;
pub mod host;
pub mod memory_document;
pub mod llm;
pub mod prompts;
pub mod clause_relocator;
pub mod rewrite;
pub mod reapplier;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;
