//! Interactive terminal chat.

use crate::commands::build_pipeline;
use crate::typewriter::Typewriter;
use clap::Args;
use lumen_core::{config::AppConfig, AppError, AppResult};
use lumen_knowledge::{AnswerEngine, ConversationTurn};
use lumen_prompt::PersonaDefinition;
use std::io::{BufRead, Write};

/// Words that end the session.
const EXIT_WORDS: &[&str] = &["exit", "quit", "bye"];

/// Interactive terminal chat
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Print answers instantly instead of with the typewriter effect
    #[arg(long)]
    pub plain: bool,
}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let pipeline = build_pipeline(config).await?;
        let persona = pipeline.persona().clone();

        let typewriter = if self.plain {
            Typewriter::disabled()
        } else {
            Typewriter::new()
        };

        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        run_chat_loop(
            &pipeline,
            &persona,
            stdin.lock(),
            stdout.lock(),
            &typewriter,
        )
        .await
    }
}

/// The chat loop itself, decoupled from the terminal so tests can drive it.
///
/// History accumulates across turns within the session. An exit word or end
/// of input prints the farewell and returns without calling the engine.
pub(crate) async fn run_chat_loop<R: BufRead, W: Write>(
    engine: &dyn AnswerEngine,
    persona: &PersonaDefinition,
    mut input: R,
    mut out: W,
    typewriter: &Typewriter,
) -> AppResult<()> {
    let mut history: Vec<ConversationTurn> = Vec::new();

    if !persona.greeting.is_empty() {
        writeln!(out, "{}: {}", persona.name, persona.greeting)?;
    }
    writeln!(out, "(type 'exit' to leave)")?;
    writeln!(out)?;

    loop {
        write!(out, "You: ")?;
        out.flush()?;

        let mut line = String::new();
        let bytes = input.read_line(&mut line)?;
        if bytes == 0 {
            // End of input behaves like an exit word.
            writeln!(out)?;
            break;
        }

        let question = line.trim();
        if question.is_empty() {
            continue;
        }

        if EXIT_WORDS.contains(&question.to_lowercase().as_str()) {
            break;
        }

        // A failed query ends neither the session nor the process.
        let result = match engine.answer(question, &history).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("Query failed: {}", e);
                writeln!(out, "Sorry, something went wrong: {}", e)?;
                writeln!(out)?;
                continue;
            }
        };

        write!(out, "{}: ", persona.name)?;
        typewriter
            .write_line(&mut out, &result.answer_text)
            .map_err(AppError::Io)?;

        if !result.source_files.is_empty() {
            let sources: Vec<&str> = result.source_files.iter().map(String::as_str).collect();
            writeln!(out, "Based on: {}", sources.join(", "))?;
        }
        writeln!(out)?;

        history.push(ConversationTurn {
            question: question.to_string(),
            answer: result.answer_text,
        });
    }

    if !persona.farewell.is_empty() {
        writeln!(out, "{}: {}", persona.name, persona.farewell)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_knowledge::AnswerResult;
    use lumen_prompt::default_persona;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Engine that counts invocations and echoes the history length.
    #[derive(Debug, Default)]
    struct CountingEngine {
        calls: AtomicU32,
    }

    #[async_trait::async_trait]
    impl AnswerEngine for CountingEngine {
        async fn answer(
            &self,
            question: &str,
            history: &[ConversationTurn],
        ) -> lumen_core::AppResult<AnswerResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut source_files = BTreeSet::new();
            source_files.insert("tips.txt".to_string());
            Ok(AnswerResult {
                answer_text: format!("reply to '{}' with {} prior turns", question, history.len()),
                source_files,
            })
        }
    }

    async fn drive(input: &str) -> (CountingEngine, String) {
        let engine = CountingEngine::default();
        let mut out = Vec::new();
        run_chat_loop(
            &engine,
            &default_persona(),
            input.as_bytes(),
            &mut out,
            &Typewriter::disabled(),
        )
        .await
        .unwrap();
        (engine, String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn test_exit_word_skips_engine() {
        let (engine, output) = drive("exit\n").await;
        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
        assert!(output.contains("I'm Lumen"));
        assert!(output.contains("Take care!"));
    }

    #[tokio::test]
    async fn test_end_of_input_skips_engine() {
        let (engine, output) = drive("").await;
        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
        assert!(output.contains("Take care!"));
    }

    #[tokio::test]
    async fn test_questions_accumulate_history() {
        let (engine, output) = drive("first\nsecond\nquit\n").await;
        assert_eq!(engine.calls.load(Ordering::SeqCst), 2);
        assert!(output.contains("reply to 'first' with 0 prior turns"));
        assert!(output.contains("reply to 'second' with 1 prior turns"));
    }

    #[tokio::test]
    async fn test_blank_lines_are_ignored() {
        let (engine, _) = drive("\n   \nbye\n").await;
        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_engine_failure_keeps_the_loop_alive() {
        /// Fails on the first call, answers afterwards.
        #[derive(Debug, Default)]
        struct FlakyEngine {
            calls: AtomicU32,
        }

        #[async_trait::async_trait]
        impl AnswerEngine for FlakyEngine {
            async fn answer(
                &self,
                _question: &str,
                _history: &[ConversationTurn],
            ) -> lumen_core::AppResult<AnswerResult> {
                if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    return Err(lumen_core::AppError::Llm("connection reset".to_string()));
                }
                Ok(AnswerResult {
                    answer_text: "recovered".to_string(),
                    source_files: BTreeSet::new(),
                })
            }
        }

        let engine = FlakyEngine::default();
        let mut out = Vec::new();
        run_chat_loop(
            &engine,
            &default_persona(),
            "first\nsecond\nexit\n".as_bytes(),
            &mut out,
            &Typewriter::disabled(),
        )
        .await
        .unwrap();

        let output = String::from_utf8(out).unwrap();
        assert!(output.contains("something went wrong"));
        assert!(output.contains("recovered"));
    }

    #[tokio::test]
    async fn test_sources_are_attributed() {
        let (_, output) = drive("how do I relax\nexit\n").await;
        assert!(output.contains("Based on: tips.txt"));
    }
}
