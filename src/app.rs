use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::assets::Manifest;
use crate::banner::Banner;
use crate::config::{self, Config};
use crate::fallback::{self, Resolver};
use crate::i18n::{self, Language};
use crate::logging;
use crate::playback::{self, Backend, CommandBackend};
use crate::post;
use crate::selection;
use crate::storage;
use crate::ui;

/// Command line overrides applied on top of the loaded config.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub posts_file: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
}

fn load_config(opts: &RunOptions) -> Result<Config> {
    let mut cfg = config::load(config::LoadOptions {
        config_file: opts.config_file.clone(),
        env_prefix: None,
    })
    .context("load config")?;
    if let Some(path) = opts.posts_file.as_ref() {
        cfg.content.posts_file = Some(path.clone());
    }
    Ok(cfg)
}

fn load_posts(cfg: &Config) -> Result<post::Store> {
    let store = match cfg.content.posts_file.as_ref() {
        Some(path) => post::Store::load(path, cfg.content.dedupe_ids)?,
        None => post::Store::builtin(cfg.content.dedupe_ids)?,
    };
    if store.dropped_duplicates() > 0 {
        log::warn!(
            "app: dropped {} posts with duplicate ids",
            store.dropped_duplicates()
        );
    }
    Ok(store)
}

fn load_manifest(cfg: &Config) -> Result<Manifest> {
    let path = cfg.content.manifest_path();
    Manifest::load(cfg.content.asset_root.clone(), Some(path.as_path())).context("load manifest")
}

fn open_store(cfg: &Config) -> Option<storage::Store> {
    match storage::Store::open(storage::Options {
        path: cfg.storage.path.clone(),
    }) {
        Ok(store) => Some(store),
        Err(err) => {
            log::warn!("app: preferences unavailable: {err:#}");
            None
        }
    }
}

/// The stored language wins over the configured one.
fn resolve_language(store: Option<&storage::Store>, cfg: &Config) -> Language {
    store
        .and_then(|store| store.language().ok().flatten())
        .or_else(|| Language::from_code(&cfg.ui.language))
        .unwrap_or_default()
}

pub fn run(opts: RunOptions) -> Result<()> {
    let cfg = load_config(&opts)?;
    if let Some(dir) = cfg.logging.dir.as_ref() {
        logging::init(&cfg.logging.level, dir).context("init logging")?;
    }

    let posts = load_posts(&cfg)?;
    let manifest = load_manifest(&cfg)?;

    let store = open_store(&cfg);
    let language = resolve_language(store.as_ref(), &cfg);

    let backend = CommandBackend::from_commands(
        cfg.player.speech_command.clone(),
        cfg.player.audio_command.clone(),
    )
    .map(|backend| Arc::new(backend) as Arc<dyn Backend>);
    if backend.is_none() {
        log::info!("app: no player commands configured, narration disabled");
    }
    let playback = playback::Controller::shared(backend);

    let banner = cfg.banner.enabled.then(|| {
        Banner::new(chrono::Local::now().date_naive(), cfg.banner.rotate_every)
    });

    let status_message = format!(
        "{} posts loaded. Enter to read, Space to listen, q to quit.",
        posts.len()
    );

    let mut model = ui::Model::new(ui::Options {
        posts,
        featured_cap: cfg.content.featured_cap,
        manifest,
        resolver: Resolver::new(cfg.content.header_image_dir.clone()),
        playback: playback.clone(),
        banner,
        language,
        store,
        status_message,
    });
    let result = model.run();
    playback.lock().stop_active();
    result
}

/// Prints the featured set and the archive grouping, then returns.
pub fn list(opts: RunOptions, out: &mut impl Write) -> Result<()> {
    let cfg = load_config(&opts)?;
    let posts = load_posts(&cfg)?;
    let manifest = load_manifest(&cfg)?;
    let resolver = Resolver::new(cfg.content.header_image_dir.clone());
    let lang = resolve_language(open_store(&cfg).as_ref(), &cfg);

    let display = selection::select(posts.posts(), cfg.content.featured_cap);
    let archive = selection::group(&display.archived);

    writeln!(out, "{}", i18n::text(lang, "blog_title"))?;
    writeln!(out)?;
    for post in &display.featured {
        let image = fallback::card_image(
            manifest.paths_for(&post.id).infographic,
            &post.category,
            &resolver,
        );
        writeln!(out, "[{}] {}", post.category, post.title)?;
        writeln!(out, "    {} | {} | {}", post.date, post.id, image.display())?;
    }

    writeln!(out)?;
    writeln!(out, "{}", i18n::text(lang, "archives"))?;
    if archive.is_empty() {
        writeln!(out, "  {}", i18n::text(lang, "archive_empty"))?;
    }
    for group in archive.groups() {
        writeln!(out, "  {}", group.category)?;
        for post in &group.posts {
            writeln!(out, "    {}  {}", post.date, post.title)?;
        }
    }
    Ok(())
}
