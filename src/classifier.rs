//! Classifier invoker: turns a post into a category label by piping a prompt
//! through an external text-generation program.
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use crate::config;
use crate::model::{Classification, UNKNOWN_CATEGORY};

#[async_trait]
pub trait Classifier: Send + Sync {
    /// Run the model on `prompt` and return its raw (trimmed) output.
    async fn invoke(&self, prompt: &str) -> Result<String>;
}

/// Runs a local program (by default `ollama run llama3.2`), writing the prompt
/// to its stdin and reading the answer from its stdout.
#[derive(Debug, Clone)]
pub struct CommandClassifier {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl CommandClassifier {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn from_config(cfg: &config::Classifier) -> Self {
        Self::new(cfg.program.clone(), cfg.args.clone()).with_timeout(cfg.timeout())
    }

    async fn run(&self, prompt: &str) -> Result<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {}", self.program))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("stdin of {} not captured", self.program))?;
        let input = prompt.as_bytes().to_vec();
        let writer = async move {
            stdin.write_all(&input).await?;
            stdin.shutdown().await
        };

        let (written, output) = tokio::join!(writer, child.wait_with_output());
        let output = output.with_context(|| format!("failed to wait for {}", self.program))?;
        if let Err(err) = written {
            // The program may exit without reading all of its input.
            if err.kind() != ErrorKind::BrokenPipe {
                return Err(err).with_context(|| format!("failed to write prompt to {}", self.program));
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "{} exited with status {}: {}",
                self.program,
                output.status,
                stderr.trim()
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl Classifier for CommandClassifier {
    async fn invoke(&self, prompt: &str) -> Result<String> {
        match self.timeout {
            // Dropping the timed-out future drops the child, which kills it.
            Some(limit) => tokio::time::timeout(limit, self.run(prompt))
                .await
                .map_err(|_| anyhow!("{} timed out after {:?}", self.program, limit))?,
            None => self.run(prompt).await,
        }
    }
}

/// Build the instruction prompt for one post.
pub fn build_prompt<S: AsRef<str>>(categories: &[S], post: &str) -> String {
    let joined = categories
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Classify the following post into one or more of the categories below. \
         The categories are: {joined}. Only return the categories that apply, \
         separated by commas. Do not include any other text. \n\nPost: {post}\n\nCategories:"
    )
}

/// Take whatever follows the last colon of the model output.
///
/// This is deliberately naive: a multi-line answer or one that contains a
/// colon inside a label is cut at the last colon.
pub fn parse_category(response: &str) -> String {
    response
        .rsplit_once(':')
        .map_or(response, |(_, tail)| tail)
        .trim()
        .to_string()
}

/// Classify one post. Invocation failures are logged and recorded as
/// [`UNKNOWN_CATEGORY`] with no response.
#[instrument(skip_all)]
pub async fn classify_text<S: AsRef<str>>(
    classifier: &dyn Classifier,
    categories: &[S],
    text: &str,
) -> Classification {
    let prompt = build_prompt(categories, text);
    match classifier.invoke(&prompt).await {
        Ok(response) => {
            debug!(%response, "classifier response");
            let category = if response.is_empty() {
                UNKNOWN_CATEGORY.to_string()
            } else {
                parse_category(&response)
            };
            Classification {
                category,
                response: Some(response),
            }
        }
        Err(err) => {
            warn!(?err, "classifier invocation failed");
            Classification::failed()
        }
    }
}
