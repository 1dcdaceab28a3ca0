//! Audio and narration playback.
//!
//! One [`Controller`] exists per process and is shared by the card grid and
//! the modal reader, so at most one stream plays at any time. Starting a
//! stream, opening another post or closing the overlay all stop the active
//! stream synchronously before anything else happens.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use parking_lot::Mutex;

use crate::fallback::{existing_file, Chain};
use crate::html;
use crate::post::Post;

const TEXT_PLACEHOLDER: &str = "%TEXT%";
const FILE_PLACEHOLDER: &str = "%FILE%";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Started,
    Ended,
    Errored(String),
}

#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("{0} playback is not configured")]
    Unavailable(&'static str),
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// A running audio or speech stream.
pub trait Stream: Send {
    /// Next pending event, if any. Never blocks.
    fn poll(&mut self) -> Option<StreamEvent>;
    /// Stops playback and waits until it has stopped.
    fn stop(&mut self);
}

/// Platform capability that turns text or an audio file into a stream.
pub trait Backend: Send + Sync {
    fn speak(&self, text: &str) -> Result<Box<dyn Stream>, PlaybackError>;
    fn play_file(&self, path: &Path) -> Result<Box<dyn Stream>, PlaybackError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Audio(PathBuf),
    Narration,
}

/// Text read aloud when no recorded audio is available.
pub fn narration_text(post: &Post) -> String {
    format!("{}. {}", post.title, html::plain_text(&post.content))
}

struct Active {
    owner: String,
    source: Source,
    stream: Box<dyn Stream>,
    narration: String,
    started: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toggle {
    Started { owner: String, source: Source },
    Stopped { owner: String },
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    Started { owner: String, source: Source },
    Finished { owner: String },
    FellBack { owner: String },
    Failed { owner: String, message: String },
}

pub type Handle = Arc<Mutex<Controller>>;

pub struct Controller {
    backend: Option<Arc<dyn Backend>>,
    active: Option<Active>,
}

impl Controller {
    pub fn new(backend: Option<Arc<dyn Backend>>) -> Self {
        Self {
            backend,
            active: None,
        }
    }

    pub fn shared(backend: Option<Arc<dyn Backend>>) -> Handle {
        Arc::new(Mutex::new(Self::new(backend)))
    }

    pub fn active_owner(&self) -> Option<&str> {
        self.active.as_ref().map(|active| active.owner.as_str())
    }

    pub fn active_source(&self) -> Option<&Source> {
        self.active.as_ref().map(|active| &active.source)
    }

    pub fn is_playing(&self, owner: &str) -> bool {
        self.active_owner() == Some(owner)
    }

    /// Stops whatever is playing. Returns the owner of the stopped stream.
    pub fn stop_active(&mut self) -> Option<String> {
        let mut active = self.active.take()?;
        active.stream.stop();
        log::debug!("playback: stopped {} ({:?})", active.owner, active.source);
        Some(active.owner)
    }

    /// Starts playback for `post`, or stops it when `post` already owns the
    /// active stream. Recorded audio at `audio` wins over narration.
    pub fn toggle(&mut self, post: &Post, audio: &Path) -> Toggle {
        if self.is_playing(&post.id) {
            self.stop_active();
            return Toggle::Stopped {
                owner: post.id.clone(),
            };
        }
        self.stop_active();

        let Some(backend) = self.backend.clone() else {
            log::debug!("playback: no backend, control is inert");
            return Toggle::Unavailable;
        };

        let narration = narration_text(post);
        let audio_path = audio.to_path_buf();
        let resolved = Chain::new()
            .then("recorded audio", || {
                let path = existing_file(audio_path)()?;
                let stream = backend.play_file(&path)?;
                Ok((Source::Audio(path), stream))
            })
            .then("narration", || {
                let stream = backend.speak(&narration)?;
                Ok((Source::Narration, stream))
            })
            .resolve();

        match resolved {
            Ok(resolved) => {
                let (source, stream) = resolved.value;
                log::info!("playback: {} via {}", post.id, resolved.label);
                self.active = Some(Active {
                    owner: post.id.clone(),
                    source: source.clone(),
                    stream,
                    narration,
                    started: false,
                });
                Toggle::Started {
                    owner: post.id.clone(),
                    source,
                }
            }
            Err(err) => {
                log::warn!("playback: {} unavailable: {err:#}", post.id);
                Toggle::Unavailable
            }
        }
    }

    /// Drains events from the active stream. A stream that ends clears the
    /// active slot; recorded audio that errors falls back to narration.
    pub fn poll(&mut self) -> Vec<PlaybackEvent> {
        let mut events = Vec::new();
        loop {
            let Some(active) = self.active.as_mut() else {
                break;
            };
            let Some(event) = active.stream.poll() else {
                break;
            };
            match event {
                StreamEvent::Started => {
                    if !active.started {
                        active.started = true;
                        events.push(PlaybackEvent::Started {
                            owner: active.owner.clone(),
                            source: active.source.clone(),
                        });
                    }
                }
                StreamEvent::Ended => {
                    if let Some(done) = self.active.take() {
                        events.push(PlaybackEvent::Finished { owner: done.owner });
                    }
                }
                StreamEvent::Errored(message) => {
                    let Some(mut failed) = self.active.take() else {
                        break;
                    };
                    failed.stream.stop();
                    if matches!(failed.source, Source::Audio(_)) {
                        if let Some(next) = self.fall_back_to_narration(failed) {
                            events.push(next);
                        }
                    } else {
                        log::warn!("playback: {} failed: {message}", failed.owner);
                        events.push(PlaybackEvent::Failed {
                            owner: failed.owner,
                            message,
                        });
                    }
                }
            }
        }
        events
    }

    fn fall_back_to_narration(&mut self, failed: Active) -> Option<PlaybackEvent> {
        let backend = self.backend.clone()?;
        match backend.speak(&failed.narration) {
            Ok(stream) => {
                log::info!("playback: {} audio failed, narrating instead", failed.owner);
                self.active = Some(Active {
                    owner: failed.owner.clone(),
                    source: Source::Narration,
                    stream,
                    narration: failed.narration,
                    started: false,
                });
                Some(PlaybackEvent::FellBack {
                    owner: failed.owner,
                })
            }
            Err(err) => Some(PlaybackEvent::Failed {
                owner: failed.owner,
                message: err.to_string(),
            }),
        }
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.stop_active();
    }
}

/// Runs external programs: one for text-to-speech, one for audio files.
/// `%TEXT%` and `%FILE%` in the argument lists are replaced per stream; when
/// absent the text or path is appended.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    speech_command: Vec<String>,
    audio_command: Vec<String>,
}

impl CommandBackend {
    pub fn new(speech_command: Vec<String>, audio_command: Vec<String>) -> Self {
        Self {
            speech_command,
            audio_command,
        }
    }

    /// `None` when neither speech nor audio is configured.
    pub fn from_commands(speech_command: Vec<String>, audio_command: Vec<String>) -> Option<Self> {
        if speech_command.is_empty() && audio_command.is_empty() {
            return None;
        }
        Some(Self::new(speech_command, audio_command))
    }
}

fn expand_args(template: &[String], placeholder: &str, value: &str) -> Vec<String> {
    let mut substituted = false;
    let mut args: Vec<String> = template
        .iter()
        .map(|arg| {
            if arg.contains(placeholder) {
                substituted = true;
                arg.replace(placeholder, value)
            } else {
                arg.clone()
            }
        })
        .collect();
    if !substituted {
        args.push(value.to_string());
    }
    args
}

impl Backend for CommandBackend {
    fn speak(&self, text: &str) -> Result<Box<dyn Stream>, PlaybackError> {
        if self.speech_command.is_empty() {
            return Err(PlaybackError::Unavailable("speech"));
        }
        let args = expand_args(&self.speech_command, TEXT_PLACEHOLDER, text);
        Ok(Box::new(ProcessStream::spawn(&args)?))
    }

    fn play_file(&self, path: &Path) -> Result<Box<dyn Stream>, PlaybackError> {
        if self.audio_command.is_empty() {
            return Err(PlaybackError::Unavailable("audio"));
        }
        let args = expand_args(
            &self.audio_command,
            FILE_PLACEHOLDER,
            &path.to_string_lossy(),
        );
        Ok(Box::new(ProcessStream::spawn(&args)?))
    }
}

/// Child process supervised by a helper thread that reports its exit.
pub struct ProcessStream {
    kill_tx: Sender<()>,
    status_rx: Receiver<std::io::Result<ExitStatus>>,
    handle: Option<thread::JoinHandle<()>>,
    announced: bool,
    finished: bool,
}

impl ProcessStream {
    fn spawn(args: &[String]) -> Result<Self, PlaybackError> {
        let (program, rest) = args
            .split_first()
            .ok_or(PlaybackError::Unavailable("command"))?;
        let mut command = Command::new(program);
        command
            .args(rest)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        let child = command.spawn().map_err(|source| PlaybackError::Launch {
            program: program.clone(),
            source,
        })?;
        log::debug!("playback: spawned {program} (pid {})", child.id());

        let (kill_tx, kill_rx) = bounded::<()>(1);
        let (status_tx, status_rx) = bounded(1);
        let handle = thread::spawn(move || supervise(child, kill_rx, status_tx));

        Ok(Self {
            kill_tx,
            status_rx,
            handle: Some(handle),
            announced: false,
            finished: false,
        })
    }

    fn finalize(&mut self) {
        self.finished = true;
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn supervise(
    mut child: Child,
    kill_rx: Receiver<()>,
    status_tx: Sender<std::io::Result<ExitStatus>>,
) {
    let result = loop {
        if kill_rx.try_recv().is_ok() {
            let _ = child.kill();
            break child.wait();
        }
        match child.try_wait() {
            Ok(Some(status)) => break Ok(status),
            Ok(None) => thread::sleep(Duration::from_millis(30)),
            Err(err) => break Err(err),
        }
    };
    let _ = status_tx.send(result);
}

impl Stream for ProcessStream {
    fn poll(&mut self) -> Option<StreamEvent> {
        if self.finished {
            return None;
        }
        if !self.announced {
            self.announced = true;
            return Some(StreamEvent::Started);
        }
        match self.status_rx.try_recv() {
            Ok(Ok(status)) => {
                self.finalize();
                if status.success() {
                    Some(StreamEvent::Ended)
                } else {
                    Some(StreamEvent::Errored(format!("player exited with {status}")))
                }
            }
            Ok(Err(err)) => {
                self.finalize();
                Some(StreamEvent::Errored(err.to_string()))
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.finalize();
                Some(StreamEvent::Errored("player closed unexpectedly".into()))
            }
        }
    }

    fn stop(&mut self) {
        if self.finished {
            return;
        }
        let _ = self.kill_tx.send(());
        let _ = self.status_rx.recv();
        self.finalize();
    }
}

impl Drop for ProcessStream {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::collections::VecDeque;

    /// Shared, ordered record of what the backend was asked to do.
    pub type Journal = Arc<Mutex<Vec<String>>>;

    pub struct MockStream {
        label: String,
        journal: Journal,
        events: Arc<Mutex<VecDeque<StreamEvent>>>,
    }

    impl Stream for MockStream {
        fn poll(&mut self) -> Option<StreamEvent> {
            self.events.lock().pop_front()
        }

        fn stop(&mut self) {
            self.journal.lock().push(format!("stop:{}", self.label));
        }
    }

    #[derive(Default)]
    pub struct MockBackend {
        pub journal: Journal,
        pub speech_fails: bool,
        pub audio_fails: bool,
        /// Events handed to the next stream created.
        pub script: Mutex<Vec<StreamEvent>>,
        pub last_events: Mutex<Option<Arc<Mutex<VecDeque<StreamEvent>>>>>,
    }

    impl MockBackend {
        fn stream(&self, label: String) -> Box<dyn Stream> {
            let events: Arc<Mutex<VecDeque<StreamEvent>>> =
                Arc::new(Mutex::new(self.script.lock().drain(..).collect()));
            *self.last_events.lock() = Some(events.clone());
            Box::new(MockStream {
                label,
                journal: self.journal.clone(),
                events,
            })
        }

        /// Queues an event on the most recently created stream.
        pub fn emit(&self, event: StreamEvent) {
            if let Some(events) = self.last_events.lock().as_ref() {
                events.lock().push_back(event);
            }
        }

        pub fn entries(&self) -> Vec<String> {
            self.journal.lock().clone()
        }
    }

    impl Backend for MockBackend {
        fn speak(&self, text: &str) -> Result<Box<dyn Stream>, PlaybackError> {
            if self.speech_fails {
                return Err(PlaybackError::Unavailable("speech"));
            }
            self.journal.lock().push(format!("speak:{text}"));
            Ok(self.stream(format!("speech:{text}")))
        }

        fn play_file(&self, path: &Path) -> Result<Box<dyn Stream>, PlaybackError> {
            if self.audio_fails {
                return Err(PlaybackError::Unavailable("audio"));
            }
            self.journal.lock().push(format!("play:{}", path.display()));
            Ok(self.stream(format!("audio:{}", path.display())))
        }
    }
}
