//! TUI event loop and screen layout for chatline

use std::time::Duration;

use chatline_ai::Role;
use chatline_core::{FinishReason, Message, Outcome, Session, SessionEvent, State};
use chatline_tui::{
    App, Theme,
    input::{Action, event_to_action},
    widgets::{
        Ending, InputBox, Picker, PickerItem, PickerState, Speaker, StatusLine, Transcript,
        TranscriptEntry, transcript::transcript_height,
    },
};
use crossterm::event::{Event, EventStream};
use futures::StreamExt;
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Margin, Rect},
    text::{Line, Span},
    widgets::Paragraph,
};

const TICK_RATE: Duration = Duration::from_millis(250);

/// Lines moved per PageUp/PageDown in the transcript
const SCROLL_STEP: usize = 5;

const KEY_LIMIT: usize = 51;
const SYSTEM_PROMPT_LIMIT: usize = 156;
const CHAT_LIMIT: usize = 280;
const NAME_LIMIT: usize = 32;

/// Run the UI until the session quits
pub async fn run(mut session: Session) -> anyhow::Result<()> {
    let mut app = App::new()?;
    let mut view = View::new();

    let (width, height) = app.size()?;
    view.resize(&mut session, width, height).await;
    session.start().await;
    view.sync(&mut session);

    let mut events = EventStream::new();
    let mut tick = tokio::time::interval(TICK_RATE);

    loop {
        app.draw(|frame| view.render(frame, &session))?;
        if session.is_finished() {
            break;
        }

        tokio::select! {
            event = events.next() => match event {
                Some(Ok(Event::Resize(width, height))) => {
                    view.resize(&mut session, width, height).await;
                }
                Some(Ok(event)) => {
                    if let Some(action) = event_to_action(event) {
                        if view.awaits_reply(&action, &session) {
                            view.waiting = true;
                            app.draw(|frame| view.render(frame, &session))?;
                        }
                        view.handle(&mut session, action).await;
                    }
                }
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },
            _ = tick.tick() => {
                session.update(SessionEvent::Tick).await;
            }
        }
    }

    tracing::info!("session finished");
    Ok(())
}

/// Widget state for whichever screen the session is on
struct View {
    theme: Theme,
    /// Screen the widgets were last prepared for
    state: State,
    input: InputBox,
    picker: PickerState,
    scroll_back: usize,
    /// A completion request is in flight
    waiting: bool,
    error: Option<String>,
    width: u16,
}

impl View {
    fn new() -> Self {
        Self {
            theme: Theme::default(),
            state: State::Start,
            input: InputBox::new(),
            picker: PickerState::default(),
            scroll_back: 0,
            waiting: false,
            error: None,
            width: 0,
        }
    }

    async fn resize(&mut self, session: &mut Session, width: u16, height: u16) {
        self.width = width;
        session.update(SessionEvent::Resize { width, height }).await;
        self.sync(session);
    }

    /// Pick up queued errors and reset the widgets when the screen changed
    fn sync(&mut self, session: &mut Session) {
        for error in session.drain_errors() {
            tracing::warn!(state = ?session.state(), error = %error, "session error");
            self.error = Some(error.to_string());
        }

        let (width, height) = session.list_size();
        self.picker.set_size(width, height);

        if session.state() != self.state {
            self.state = session.state();
            self.picker.reset();
            self.scroll_back = 0;
            self.input = input_for(session);
        }
        self.picker.clamp(item_count(session));
    }

    fn is_picker(&self) -> bool {
        matches!(self.state, State::ConversationPicker | State::ModelPicker)
    }

    /// Whether this action sends a chat message
    fn awaits_reply(&self, action: &Action, session: &Session) -> bool {
        *action == Action::Submit
            && session.state() == State::Chat
            && !self.input.content().trim().is_empty()
    }

    async fn handle(&mut self, session: &mut Session, action: Action) {
        self.error = None;

        let event = match action {
            Action::Quit => Some(SessionEvent::Quit),
            Action::Back => Some(SessionEvent::Back),
            Action::Save => Some(SessionEvent::Save),
            Action::Up if self.is_picker() => {
                self.picker.up(item_count(session));
                None
            }
            Action::Down if self.is_picker() => {
                self.picker.down(item_count(session));
                None
            }
            Action::PageUp if self.state == State::Chat => {
                let entries = transcript_entries(session.transcript());
                let total = transcript_height(&entries, &self.theme, self.width as usize);
                self.scroll_back = (self.scroll_back + SCROLL_STEP).min(total.saturating_sub(1));
                None
            }
            Action::PageDown if self.state == State::Chat => {
                self.scroll_back = self.scroll_back.saturating_sub(SCROLL_STEP);
                None
            }
            Action::Submit if self.is_picker() => Some(SessionEvent::Select(self.picker.selected())),
            Action::Submit => Some(SessionEvent::Submit(self.input.content().to_string())),
            action => {
                if !self.is_picker() {
                    self.input.handle_action(&action, self.width);
                }
                None
            }
        };

        if let Some(event) = event {
            let submitted = matches!(event, SessionEvent::Submit(_));
            let outcome = session.update(event).await;
            if submitted && outcome == Outcome::Accepted {
                self.input.clear();
                self.scroll_back = 0;
            }
        }
        self.waiting = false;
        self.sync(session);
    }

    fn render(&self, frame: &mut Frame, session: &Session) {
        let [main, status] =
            Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(frame.area());

        match session.state() {
            State::ConversationPicker => {
                let items = session
                    .entries()
                    .iter()
                    .map(|entry| PickerItem {
                        title: entry.title(),
                        description: entry.description(),
                    })
                    .collect();
                Picker::new("Conversations", items, &self.theme).render(
                    main,
                    frame.buffer_mut(),
                    &self.picker,
                );
            }
            State::ModelPicker => {
                let items = session
                    .models()
                    .iter()
                    .map(|model| PickerItem {
                        title: model,
                        description: "",
                    })
                    .collect();
                Picker::new("Models", items, &self.theme).render(
                    main,
                    frame.buffer_mut(),
                    &self.picker,
                );
            }
            State::Key => self.render_prompt(frame, main, "Enter your OpenAI API key"),
            State::SystemPrompt => {
                self.render_prompt(frame, main, "How should the assistant behave?")
            }
            State::Save => self.render_prompt(frame, main, "Name this conversation"),
            State::Chat => self.render_chat(frame, main, session),
            State::Start | State::Quit => {}
        }

        let status_area = status.inner(Margin::new(1, 0));
        frame.render_widget(
            StatusLine::new(self.hint(), &self.theme).error(self.error.as_deref()),
            status_area,
        );
    }

    fn render_prompt(&self, frame: &mut Frame, area: Rect, label: &str) {
        let [label_area, input_area] =
            Layout::vertical([Constraint::Length(1), Constraint::Length(3)])
                .areas(area.inner(Margin::new(2, 1)));
        frame.render_widget(
            Paragraph::new(Span::styled(label.to_string(), self.theme.accent_bold())),
            label_area,
        );
        self.input.render(input_area, frame.buffer_mut(), &self.theme);
    }

    fn render_chat(&self, frame: &mut Frame, area: Rect, session: &Session) {
        let [header, body, input_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .areas(area);

        if let Some(conversation) = session.conversation() {
            let name = if conversation.name().is_empty() {
                "Untitled"
            } else {
                conversation.name()
            };
            let line = Line::from(vec![
                Span::styled(name.to_string(), self.theme.accent_bold()),
                Span::styled(
                    format!(" · {}", conversation.last_model()),
                    self.theme.dim_style(),
                ),
            ]);
            frame.render_widget(Paragraph::new(line), header.inner(Margin::new(1, 0)));
        }

        let entries = transcript_entries(session.transcript());
        frame.render_widget(
            Transcript::new(&entries, &self.theme).scroll_back(self.scroll_back),
            body.inner(Margin::new(1, 0)),
        );
        self.input.render(input_area, frame.buffer_mut(), &self.theme);
    }

    fn hint(&self) -> &'static str {
        match self.state {
            State::Key => "enter save key · esc quit",
            State::ConversationPicker => "↑/↓ move · enter open · esc quit",
            State::ModelPicker => "↑/↓ move · enter choose · ctrl+z back · esc quit",
            State::SystemPrompt => "enter start chatting · ctrl+z back · esc quit",
            State::Chat if self.waiting => "waiting for a response...",
            State::Chat => "enter send · pgup/pgdn scroll · ctrl+s save · ctrl+z back · esc quit",
            State::Save => "enter save · ctrl+z back · esc quit",
            State::Start | State::Quit => "",
        }
    }
}

fn item_count(session: &Session) -> usize {
    match session.state() {
        State::ConversationPicker => session.entries().len(),
        State::ModelPicker => session.models().len(),
        _ => 0,
    }
}

/// Fresh input box for a text screen
fn input_for(session: &Session) -> InputBox {
    let mut input = match session.state() {
        State::Key => InputBox::new()
            .with_title("API key")
            .with_placeholder("sk-...")
            .with_char_limit(KEY_LIMIT),
        State::SystemPrompt => InputBox::new()
            .with_title("System message")
            .with_placeholder(session.system_prompt())
            .with_char_limit(SYSTEM_PROMPT_LIMIT),
        State::Chat => InputBox::new()
            .with_title("Message")
            .with_placeholder("Send a message...")
            .with_char_limit(CHAT_LIMIT),
        State::Save => {
            let placeholder = session
                .conversation()
                .map(|c| c.name())
                .filter(|name| !name.is_empty())
                .unwrap_or("Name of the conversation...");
            InputBox::new()
                .with_title("Conversation name")
                .with_placeholder(placeholder)
                .with_char_limit(NAME_LIMIT)
        }
        _ => InputBox::new(),
    };
    input.set_focused(true);
    input
}

fn transcript_entries(messages: &[Message]) -> Vec<TranscriptEntry> {
    messages.iter().map(transcript_entry).collect()
}

fn transcript_entry(message: &Message) -> TranscriptEntry {
    let speaker = match message.role {
        Role::User => Speaker::You,
        Role::Assistant => Speaker::Ai,
        Role::System => Speaker::System,
    };
    let ending = match message.finish_reason {
        FinishReason::Stop => Ending::Stop,
        FinishReason::Length => Ending::Length,
        FinishReason::ContentFilter => Ending::ContentFilter,
        FinishReason::UserEcho | FinishReason::Null => Ending::Other,
    };
    TranscriptEntry {
        speaker,
        ending,
        content: message.content.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatline_core::{
        CompletionClientCache, ConversationRepository, CredentialCache, FileKeyStore,
        OpenAIFactory, Orchestrator, Services, SessionSettings,
    };
    use chatline_store::{Connector, StoreConfig, StoreHandles, drivers::MemoryStore};
    use ratatui::{Terminal, backend::TestBackend};
    use std::sync::Arc;
    use tempfile::TempDir;

    const VALID_KEY: &str = "sk-abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUV";

    fn session(dir: &TempDir) -> Session {
        let credentials = Arc::new(CredentialCache::new(FileKeyStore::new(
            dir.path().join("key"),
        )));
        let clients = Arc::new(CompletionClientCache::new(
            credentials.clone(),
            OpenAIFactory::default(),
        ));
        let connector: Arc<dyn Connector> = Arc::new(MemoryStore::new());
        let store = Arc::new(StoreHandles::new(connector, StoreConfig::default()));
        let services = Services {
            credentials,
            orchestrator: Orchestrator::new(clients.clone()),
            clients,
            repository: Arc::new(ConversationRepository::new(store)),
        };
        Session::new(services, SessionSettings::default())
    }

    async fn started(dir: &TempDir) -> (Session, View) {
        let mut session = session(dir);
        let mut view = View::new();
        view.resize(&mut session, 80, 24).await;
        session.start().await;
        view.sync(&mut session);
        (session, view)
    }

    fn screen(view: &View, session: &Session) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|frame| view.render(frame, session)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    async fn type_text(view: &mut View, session: &mut Session, text: &str) {
        for c in text.chars() {
            view.handle(session, Action::Char(c)).await;
        }
    }

    #[tokio::test]
    async fn test_key_screen_keeps_rejected_input() {
        let dir = TempDir::new().unwrap();
        let (mut session, mut view) = started(&dir).await;
        assert_eq!(session.state(), State::Key);
        assert!(view.error.is_some());

        type_text(&mut view, &mut session, "not-a-key").await;
        view.handle(&mut session, Action::Submit).await;
        assert_eq!(session.state(), State::Key);
        assert_eq!(view.input.content(), "not-a-key");
        assert!(view.error.is_some());

        view.handle(&mut session, Action::ClearLine).await;
        view.handle(&mut session, Action::Paste(VALID_KEY.into())).await;
        view.handle(&mut session, Action::Submit).await;
        assert_eq!(session.state(), State::ConversationPicker);
        assert!(view.input.content().is_empty());
        assert!(view.error.is_none());
        assert!(dir.path().join("key").exists());
    }

    #[tokio::test]
    async fn test_new_conversation_is_saved_and_listed() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("key"), VALID_KEY).unwrap();
        let (mut session, mut view) = started(&dir).await;
        assert_eq!(session.state(), State::ConversationPicker);
        assert!(screen(&view, &session).contains("New conversation"));

        view.handle(&mut session, Action::Submit).await;
        assert_eq!(session.state(), State::ModelPicker);

        view.handle(&mut session, Action::Down).await;
        let model = session.models()[1].clone();
        view.handle(&mut session, Action::Submit).await;
        assert_eq!(session.state(), State::SystemPrompt);
        assert!(screen(&view, &session).contains("You are a helpful assistant"));

        type_text(&mut view, &mut session, "be brief").await;
        view.handle(&mut session, Action::Submit).await;
        assert_eq!(session.state(), State::Chat);
        let chat = screen(&view, &session);
        assert!(chat.contains("System: be brief"));
        assert!(chat.contains(&model));

        view.handle(&mut session, Action::Save).await;
        assert_eq!(session.state(), State::Save);
        type_text(&mut view, &mut session, "trip").await;
        view.handle(&mut session, Action::Submit).await;

        assert_eq!(session.state(), State::ConversationPicker);
        assert_eq!(session.entries().len(), 2);
        assert!(screen(&view, &session).contains("trip"));
    }

    #[tokio::test]
    async fn test_picker_selection_resets_between_screens() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("key"), VALID_KEY).unwrap();
        let (mut session, mut view) = started(&dir).await;

        view.handle(&mut session, Action::Submit).await;
        view.handle(&mut session, Action::Down).await;
        assert_eq!(view.picker.selected(), 1);

        view.handle(&mut session, Action::Back).await;
        assert_eq!(session.state(), State::ConversationPicker);
        assert_eq!(view.picker.selected(), 0);
        assert_eq!(view.picker.size(), (76, 22));
    }

    #[tokio::test]
    async fn test_empty_chat_message_is_not_sent() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("key"), VALID_KEY).unwrap();
        let (mut session, mut view) = started(&dir).await;

        view.handle(&mut session, Action::Submit).await;
        view.handle(&mut session, Action::Submit).await;
        view.handle(&mut session, Action::Submit).await;
        assert_eq!(session.state(), State::Chat);

        type_text(&mut view, &mut session, "   ").await;
        assert!(!view.awaits_reply(&Action::Submit, &session));
        view.handle(&mut session, Action::Submit).await;
        assert_eq!(session.transcript().len(), 1);
        assert_eq!(view.input.content(), "   ");
    }

    #[tokio::test]
    async fn test_quit() {
        let dir = TempDir::new().unwrap();
        let (mut session, mut view) = started(&dir).await;
        view.handle(&mut session, Action::Quit).await;
        assert!(session.is_finished());
    }

    #[test]
    fn test_transcript_entry_mapping() {
        let mut answer = Message::assistant("hi", FinishReason::Length, "gpt-4");
        let entry = transcript_entry(&answer);
        assert_eq!(entry.speaker, Speaker::Ai);
        assert_eq!(entry.ending, Ending::Length);

        answer.finish_reason = FinishReason::Null;
        assert_eq!(transcript_entry(&answer).ending, Ending::Other);

        let question = transcript_entry(&Message::user("hello"));
        assert_eq!(question.speaker, Speaker::You);
        assert_eq!(question.content, "hello");
    }
}
