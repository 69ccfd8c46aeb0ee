use crate::annotation::{AnnotationError, Label};
use crate::auth::Authenticator;
use crate::s3::Storage;
use crate::session::{AnnotationSession, WorkflowState};
use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

const HELP: &str = "\
Commands:
  login <email> <password>   sign in
  list                       show the images still to annotate
  select <key|position>      pick an image from the list
  left | right               rotate the selected image by 90 degrees
  view [path]                fetch the selected image, optionally saving it to path
  labels                     show the label categories
  save <label> [comment]     label the selected image and move to the next
  status                     show progress
  refresh                    re-read the buckets
  help                       show this text
  quit                       leave";

const SIGN_IN_FIRST: &str = "Please sign in first: login <email> <password>";

enum Step {
    Continue(String),
    Quit(String),
}

/// Line-oriented front end over an [`AnnotationSession`]
pub struct Console<S: Storage + Clone, A: Authenticator> {
    session: AnnotationSession<S, A>,
}

impl<S: Storage + Clone, A: Authenticator> Console<S, A> {
    pub fn new(session: AnnotationSession<S, A>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &AnnotationSession<S, A> {
        &self.session
    }

    /// Read commands until `quit` or end of input, writing one reply per command
    pub async fn run<R, W>(&mut self, mut reader: R, writer: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        writer
            .write_all(b"Lameness annotator. Type 'help' for commands.\n")
            .await?;

        let mut line = String::new();
        loop {
            writer.write_all(b"> ").await?;
            writer.flush().await.context("Failed to flush console output")?;

            line.clear();
            let bytes_read = reader
                .read_line(&mut line)
                .await
                .context("Failed to read console input")?;
            if bytes_read == 0 {
                break;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let (reply, quit) = match self.handle(trimmed).await {
                Step::Continue(reply) => (reply, false),
                Step::Quit(reply) => (reply, true),
            };
            writer.write_all(reply.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            if quit {
                break;
            }
        }

        writer.flush().await?;
        Ok(())
    }

    async fn handle(&mut self, line: &str) -> Step {
        let (command, args) = match line.split_once(char::is_whitespace) {
            Some((command, args)) => (command, args.trim()),
            None => (line, ""),
        };
        debug!("Console command: {}", command);

        let reply = match command {
            "help" => HELP.to_string(),
            "quit" | "exit" => return Step::Quit("Bye".to_string()),
            "login" => self.login(args).await,
            _ if !self.session.is_authenticated() => SIGN_IN_FIRST.to_string(),
            "list" => self.list(),
            "select" => self.select(args),
            "left" => match self.session.rotate_left() {
                Ok(rotation) => format!("Rotation {}", rotation),
                Err(e) => format!("Error: {}", e),
            },
            "right" => match self.session.rotate_right() {
                Ok(rotation) => format!("Rotation {}", rotation),
                Err(e) => format!("Error: {}", e),
            },
            "view" => self.view(args).await,
            "labels" => labels(),
            "save" => self.save(args).await,
            "status" => self.status(),
            "refresh" => {
                self.session.refresh().await;
                self.describe_state()
            }
            other => format!("Unknown command '{}', type 'help' for the command list", other),
        };
        Step::Continue(reply)
    }

    async fn login(&mut self, args: &str) -> String {
        // the password is the rest of the line and may contain spaces
        let (email, password) = match args.split_once(char::is_whitespace) {
            Some((email, password)) if !password.trim().is_empty() => (email, password.trim()),
            _ => return "Usage: login <email> <password>".to_string(),
        };

        let email = match self.session.sign_in(email, password).await {
            Ok(identity) => identity.email.clone(),
            Err(e) => return format!("Error: {}", e),
        };
        self.session.refresh().await;
        format!("Signed in as {}\n{}", email, self.describe_state())
    }

    fn list(&self) -> String {
        let queue = self.session.queue();
        if queue.is_empty() {
            return self.describe_state();
        }

        let selected = match self.session.state() {
            WorkflowState::Selected { image_key, .. } => Some(image_key.as_str()),
            _ => None,
        };
        queue
            .iter()
            .enumerate()
            .map(|(i, key)| {
                let marker = if Some(key.as_str()) == selected { '*' } else { ' ' };
                format!("{}{:>4}. {}", marker, i + 1, key)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn select(&mut self, args: &str) -> String {
        if args.is_empty() {
            return "Usage: select <key|position>".to_string();
        }

        let result = match args.parse::<usize>() {
            Ok(position) => {
                let remaining = self.session.queue().len();
                if position == 0 || position > remaining {
                    return format!(
                        "Position {} is out of range, {} images remain",
                        position, remaining
                    );
                }
                self.session.select_index(position - 1).map(|_| ())
            }
            Err(_) => self.session.select(args).map(|_| ()),
        };

        match result {
            Ok(()) => self.describe_state(),
            Err(e) => format!("Error: {}", e),
        }
    }

    async fn view(&self, path: &str) -> String {
        let (image_key, rotation) = match self.session.state() {
            WorkflowState::Selected {
                image_key,
                rotation,
            } => (image_key.clone(), *rotation),
            _ => return self.describe_state(),
        };

        let data = match self.session.current_image().await {
            Ok(data) => data,
            Err(e) => return format!("Error: {}", e),
        };

        if path.is_empty() {
            return format!("{}: {} bytes, rotation {}", image_key, data.len(), rotation);
        }

        match tokio::fs::write(path, &data).await {
            Ok(()) => format!(
                "Wrote {} bytes of {} to {} (rotation {})",
                data.len(),
                image_key,
                path,
                rotation
            ),
            Err(e) => format!("Error: failed to write {}: {}", path, e),
        }
    }

    async fn save(&mut self, args: &str) -> String {
        if args.is_empty() {
            return "Usage: save <label> [comment]".to_string();
        }

        let (label, comment) = match split_label(args) {
            Ok(parsed) => parsed,
            Err(e) => return format!("Error: {}, type 'labels' for the categories", e),
        };

        match self.session.save(label, comment).await {
            Ok(outcome) => format!(
                "Saved '{}' for {} as {}\n{}",
                label,
                outcome.image_key,
                outcome.annotation_key,
                self.describe_state()
            ),
            Err(e) => format!("Error: {}", e),
        }
    }

    fn status(&self) -> String {
        let signed_in = self
            .session
            .identity()
            .map(|identity| identity.email.as_str())
            .unwrap_or("nobody");
        format!(
            "Signed in as {}\n{}\n{}",
            signed_in,
            self.session.progress(),
            self.describe_state()
        )
    }

    fn describe_state(&self) -> String {
        match self.session.state() {
            WorkflowState::NoSelection => "No image selected".to_string(),
            WorkflowState::Selected {
                image_key,
                rotation,
            } => format!("Selected {} (rotation {})", image_key, rotation),
            WorkflowState::AllAnnotated if !self.session.has_images() => {
                format!("No images found in {}", self.session.images_location())
            }
            WorkflowState::AllAnnotated => "All images are annotated".to_string(),
        }
    }
}

fn labels() -> String {
    Label::ALL
        .iter()
        .enumerate()
        .map(|(i, label)| format!("{:>2}. {} ({})", i + 1, label, label.slug()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Split `save` arguments into a label and the free-text comment after it.
///
/// Stored spellings may contain spaces, so they are matched as a prefix
/// before falling back to the first word as a slug or position.
fn split_label(args: &str) -> Result<(Label, &str), AnnotationError> {
    for label in Label::ALL {
        if let Some(rest) = strip_prefix_ignore_case(args, label.as_str()) {
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                return Ok((label, rest.trim()));
            }
        }
    }

    let (word, rest) = args.split_once(char::is_whitespace).unwrap_or((args, ""));
    Ok((word.parse()?, rest.trim()))
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let mut chars = text.char_indices();
    for expected in prefix.chars() {
        let (_, actual) = chars.next()?;
        if !actual.to_lowercase().eq(expected.to_lowercase()) {
            return None;
        }
    }
    let end = chars.next().map(|(i, _)| i).unwrap_or(text.len());
    Some(&text[end..])
}
