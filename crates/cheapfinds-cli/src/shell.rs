use std::fs;
use std::io::{self, BufRead, ErrorKind, Write};
use std::path::Path;

use anyhow::{Context, Result};
use cheapfinds_contracts::chat::{parse_intent, ChatSession, Intent, SHELL_HELP_COMMANDS};
use cheapfinds_contracts::history::HistorySelection;
use cheapfinds_contracts::identity::{IdentityGate, StaticIdentity};
use cheapfinds_contracts::regions::{Region, RegionRegistry};
use cheapfinds_contracts::results::SearchResult;
use cheapfinds_contracts::search::{ImageBlob, SearchMode, SearchRequest};
use cheapfinds_contracts::share::share_url;
use cheapfinds_engine::SearchPipeline;
use url::Url;

use crate::render::{render_history, render_regions, render_result};

/// Whether the loop should keep reading input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Shell {
    pipeline: SearchPipeline,
    regions: RegionRegistry,
    identity: StaticIdentity,
    share_base: Option<Url>,
    mode: SearchMode,
    region: Region,
    images: Vec<ImageBlob>,
    session: Option<ChatSession>,
    last_result: Option<SearchResult>,
}

impl Shell {
    pub fn new(
        pipeline: SearchPipeline,
        regions: RegionRegistry,
        identity: StaticIdentity,
        region: Region,
        share_base: Option<Url>,
    ) -> Self {
        Self {
            pipeline,
            regions,
            identity,
            share_base,
            mode: SearchMode::Single,
            region,
            images: Vec::new(),
            session: None,
            last_result: None,
        }
    }

    pub async fn run(mut self) -> Result<i32> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        let mut line = String::new();

        writeln!(
            stdout,
            "CheapFinds shell ({}, {} mode, provider {}). Type /help for commands.",
            self.region.name,
            self.mode,
            self.pipeline.provider_name()
        )?;

        loop {
            write!(stdout, "{}> ", self.mode)?;
            stdout.flush()?;

            line.clear();
            let read = match stdin.lock().read_line(&mut line) {
                Ok(read) => read,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            };
            if read == 0 {
                break;
            }

            let input = line.trim_end_matches(['\n', '\r']);
            if self.handle(input, &mut stdout).await? == Flow::Quit {
                break;
            }
        }
        Ok(0)
    }

    pub async fn handle(&mut self, input: &str, out: &mut dyn Write) -> Result<Flow> {
        let intent = parse_intent(input);
        match intent.action.as_str() {
            "noop" => {}
            "help" => writeln!(out, "Commands: {}", SHELL_HELP_COMMANDS.join(" "))?,
            "quit" => return Ok(Flow::Quit),
            "set_mode" => self.set_mode(&intent, out)?,
            "set_region" => {
                self.region = self.regions.resolve(intent.arg_str("region").unwrap_or(""));
                self.session = None;
                writeln!(out, "Country set to {}", self.region.name)?;
            }
            "regions" => write!(out, "{}", render_regions(self.regions.list()))?,
            "add_images" => self.add_images(&intent, out)?,
            "clear_images" => {
                self.images.clear();
                writeln!(out, "Images cleared.")?;
            }
            "search" => self.search(String::new(), out).await?,
            "history" => write!(out, "{}", render_history(self.pipeline.history()))?,
            "open_history" => self.open_history(&intent, out)?,
            "share" => self.share(out)?,
            "clear" => {
                self.pipeline.history_mut().clear();
                self.images.clear();
                self.session = None;
                self.last_result = None;
                writeln!(out, "History, images and chat cleared.")?;
            }
            "save_chat" => self.save_chat(&intent, out)?,
            "load_chat" => self.load_chat(&intent, out)?,
            "message" => {
                let message = intent.message.clone().unwrap_or_default();
                if self.mode == SearchMode::Chat {
                    self.chat(&message, out).await?;
                } else {
                    self.search(message, out).await?;
                }
            }
            _ => {
                let command = intent.arg_str("command").unwrap_or("?");
                writeln!(out, "Unknown command /{command}. Type /help.")?;
            }
        }
        Ok(Flow::Continue)
    }

    fn set_mode(&mut self, intent: &Intent, out: &mut dyn Write) -> Result<()> {
        let raw = intent.arg_str("mode").unwrap_or("");
        let requested = match raw.parse::<SearchMode>() {
            Ok(mode) => mode,
            Err(err) => {
                writeln!(out, "{err}; expected single, multi or chat")?;
                return Ok(());
            }
        };
        self.mode = requested.gated(&self.identity);
        if self.mode != requested {
            writeln!(out, "Sign in to use {requested} mode; staying in {} mode.", self.mode)?;
            return Ok(());
        }
        if self.mode == SearchMode::Single && self.images.len() > 1 {
            self.images.drain(..self.images.len() - 1);
        }
        writeln!(out, "Mode set to {}", self.mode)?;
        Ok(())
    }

    fn add_images(&mut self, intent: &Intent, out: &mut dyn Write) -> Result<()> {
        let paths = intent.arg_list("paths");
        if paths.is_empty() {
            writeln!(out, "/image requires at least one path")?;
            return Ok(());
        }
        if self.mode == SearchMode::Chat {
            writeln!(out, "Chat mode does not take images.")?;
            return Ok(());
        }
        for path in paths {
            match ImageBlob::from_path(Path::new(&path)) {
                Ok(blob) => {
                    if self.mode == SearchMode::Single {
                        self.images.clear();
                    }
                    writeln!(out, "Added {}", blob.name)?;
                    self.images.push(blob);
                }
                Err(err) => writeln!(out, "Could not add image: {err:#}")?,
            }
        }
        Ok(())
    }

    async fn search(&mut self, description: String, out: &mut dyn Write) -> Result<()> {
        if self.mode == SearchMode::Chat {
            writeln!(out, "Chat mode: type a message instead of /search.")?;
            return Ok(());
        }
        let mut request = SearchRequest::new(self.mode, self.region.name.clone())
            .with_description(description);
        for image in &self.images {
            request = request.with_image(image.clone());
        }

        match self.pipeline.search(request).await {
            Ok(result) => {
                write!(out, "{}", render_result(&result, false))?;
                self.last_result = Some(result);
                self.images.clear();
            }
            Err(err) => writeln!(out, "Search failed: {err}")?,
        }
        Ok(())
    }

    async fn chat(&mut self, message: &str, out: &mut dyn Write) -> Result<()> {
        let session = self
            .session
            .take()
            .unwrap_or_else(|| ChatSession::new(self.region.name.clone()));
        let turn = self.pipeline.advance(session, message).await;
        self.session = Some(turn.session);
        match turn.reply {
            Ok(reply) => writeln!(out, "{}", reply.trim_end())?,
            Err(err) => writeln!(out, "Chat failed: {err}")?,
        }
        Ok(())
    }

    fn open_history(&mut self, intent: &Intent, out: &mut dyn Write) -> Result<()> {
        let index = intent
            .arg_str("index")
            .and_then(|raw| raw.parse::<usize>().ok())
            .filter(|index| *index > 0);
        let Some(id) = index
            .and_then(|index| self.pipeline.history().nth(index - 1))
            .map(|entry| entry.id.clone())
        else {
            writeln!(out, "No such history entry. Use /history to list them.")?;
            return Ok(());
        };

        let identity: &dyn IdentityGate = &self.identity;
        let selected = match self.pipeline.history().select(&id, identity) {
            HistorySelection::Entry(entry) => Some(entry.result.clone()),
            HistorySelection::SignInRequired => {
                writeln!(out, "Sign in to reopen multi-product searches.")?;
                None
            }
            HistorySelection::NotFound => {
                writeln!(out, "No such history entry.")?;
                None
            }
        };
        if let Some(result) = selected {
            write!(out, "{}", render_result(&result, false))?;
            self.last_result = Some(result);
        }
        Ok(())
    }

    fn share(&self, out: &mut dyn Write) -> Result<()> {
        let Some(result) = self.last_result.as_ref() else {
            writeln!(out, "Nothing to share yet; run a search first.")?;
            return Ok(());
        };
        let Some(base) = self.share_base.as_ref() else {
            writeln!(out, "Sharing needs --share-base URL.")?;
            return Ok(());
        };
        writeln!(out, "{}", share_url(base, result)?)?;
        Ok(())
    }

    fn save_chat(&self, intent: &Intent, out: &mut dyn Write) -> Result<()> {
        let Some(path) = intent.arg_str("path") else {
            writeln!(out, "/save requires a path")?;
            return Ok(());
        };
        let Some(session) = self.session.as_ref() else {
            writeln!(out, "No chat to save.")?;
            return Ok(());
        };
        let saved = session.to_json().and_then(|json| {
            fs::write(path, json).with_context(|| format!("failed to write {path}"))
        });
        match saved {
            Ok(()) => writeln!(out, "Saved {} messages to {path}", session.len())?,
            Err(err) => writeln!(out, "Could not save chat: {err:#}")?,
        }
        Ok(())
    }

    fn load_chat(&mut self, intent: &Intent, out: &mut dyn Write) -> Result<()> {
        let Some(path) = intent.arg_str("path") else {
            writeln!(out, "/load requires a path")?;
            return Ok(());
        };
        if SearchMode::Chat.gated(&self.identity) != SearchMode::Chat {
            writeln!(out, "Sign in to use chat mode.")?;
            return Ok(());
        }
        let loaded = fs::read_to_string(path)
            .with_context(|| format!("failed to read {path}"))
            .and_then(|raw| ChatSession::from_json(&raw));
        let session = match loaded {
            Ok(session) => session,
            Err(err) => {
                writeln!(out, "Could not load chat: {err:#}")?;
                return Ok(());
            }
        };
        self.region = self.regions.resolve(&session.region);
        self.mode = SearchMode::Chat;
        writeln!(out, "Loaded {} messages ({}).", session.len(), self.region.name)?;
        self.session = Some(session);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cheapfinds_contracts::identity::StaticIdentity;
    use cheapfinds_contracts::regions::RegionRegistry;
    use cheapfinds_engine::provider::DryrunProvider;
    use cheapfinds_engine::{RetryPolicy, SearchPipeline};
    use url::Url;

    use super::{Flow, Shell};

    fn shell(identity: StaticIdentity) -> anyhow::Result<Shell> {
        let regions = RegionRegistry::default();
        let region = regions.global();
        let pipeline =
            SearchPipeline::new(Arc::new(DryrunProvider)).with_retry_policy(RetryPolicy::none());
        Ok(Shell::new(
            pipeline,
            regions,
            identity,
            region,
            Some(Url::parse("https://cheapfinds.example/")?),
        ))
    }

    async fn say(shell: &mut Shell, input: &str) -> anyhow::Result<String> {
        let mut out = Vec::new();
        shell.handle(input, &mut out).await?;
        Ok(String::from_utf8(out)?)
    }

    #[tokio::test]
    async fn signed_out_users_stay_in_single_mode() -> anyhow::Result<()> {
        let mut shell = shell(StaticIdentity::signed_out())?;
        let reply = say(&mut shell, "/mode multi").await?;
        assert!(reply.contains("Sign in to use multi mode; staying in single mode."));
        assert!(say(&mut shell, "/load chat.json").await?.contains("Sign in"));
        Ok(())
    }

    #[tokio::test]
    async fn message_searches_records_history_and_shares() -> anyhow::Result<()> {
        let mut shell = shell(StaticIdentity::signed_out())?;
        let rendered = say(&mut shell, "Sony WH-1000XM5").await?;
        assert!(rendered.contains("[GOLD]"));
        assert!(rendered.contains("Sources:"));

        assert!(say(&mut shell, "/history").await?.contains("[single] Sony WH-1000XM5"));
        let link = say(&mut shell, "/share").await?;
        assert!(link.starts_with("https://cheapfinds.example/?share="));
        assert!(say(&mut shell, "/open 1").await?.contains("[SILVER]"));
        assert!(say(&mut shell, "/open 9").await?.contains("No such history entry"));
        Ok(())
    }

    #[tokio::test]
    async fn chat_mode_keeps_a_running_session() -> anyhow::Result<()> {
        let mut shell = shell(StaticIdentity::signed_in())?;
        assert!(say(&mut shell, "/mode chat").await?.contains("Mode set to chat"));
        assert!(say(&mut shell, "cheapest kettle").await?.contains("turn 1"));
        assert!(say(&mut shell, "and a toaster").await?.contains("turn 2"));
        assert!(shell.pipeline.history().is_empty());

        let temp = tempfile::tempdir()?;
        let path = temp.path().join("chat.json");
        let saved = say(&mut shell, &format!("/save \"{}\"", path.display())).await?;
        assert!(saved.contains("Saved 4 messages"));

        assert!(say(&mut shell, "/clear").await?.contains("cleared"));
        let loaded = say(&mut shell, &format!("/load \"{}\"", path.display())).await?;
        assert!(loaded.contains("Loaded 4 messages (Global)."));
        Ok(())
    }

    #[tokio::test]
    async fn bad_chat_files_are_reported_and_the_shell_keeps_going() -> anyhow::Result<()> {
        let mut shell = shell(StaticIdentity::signed_in())?;
        let temp = tempfile::tempdir()?;

        let missing = temp.path().join("missing.json");
        let reply = say(&mut shell, &format!("/load \"{}\"", missing.display())).await?;
        assert!(reply.contains("Could not load chat: failed to read"));

        let garbage = temp.path().join("garbage.json");
        std::fs::write(&garbage, "not json")?;
        let reply = say(&mut shell, &format!("/load \"{}\"", garbage.display())).await?;
        assert!(reply.contains("Could not load chat:"));
        assert!(shell.session.is_none());

        say(&mut shell, "/mode chat").await?;
        say(&mut shell, "cheapest kettle").await?;
        let unwritable = temp.path().join("no-such-dir").join("chat.json");
        let reply = say(&mut shell, &format!("/save \"{}\"", unwritable.display())).await?;
        assert!(reply.contains("Could not save chat: failed to write"));

        assert!(say(&mut shell, "/help").await?.contains("Commands:"));
        assert_eq!(shell.session.as_ref().map(|session| session.len()), Some(2));
        Ok(())
    }

    #[tokio::test]
    async fn unknown_commands_and_quit() -> anyhow::Result<()> {
        let mut shell = shell(StaticIdentity::signed_in())?;
        assert!(say(&mut shell, "/magic").await?.contains("Unknown command /magic"));
        let mut sink = Vec::new();
        assert_eq!(shell.handle("/quit", &mut sink).await?, Flow::Quit);
        Ok(())
    }
}
