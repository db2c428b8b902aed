//! Cross-module tests for index lifecycle and the answer pipeline.
