use std::path::Path;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use courseware_core::{
    update, AppState, AppViewModel, CacheGenerations, ModuleForm, Msg, RoutingRules, UploadPhase,
};
use courseware_engine::{
    CacheRouter, DiskCacheStorage, EngineHandle, KeepAliveService, ReqwestNetwork, SessionEvent,
};
use lms_logging::{lms_info, lms_warn, LogDestination};
use log::LevelFilter;

use super::cli::{Cli, Command};
use super::config::{AppConfig, ConfigSource};
use super::effects::EffectRunner;
use super::render::ProgressRenderer;

const EVENT_WAIT: Duration = Duration::from_millis(100);

pub fn run_app(cli: Cli) -> Result<ExitCode> {
    let (config, source) = AppConfig::load(cli.config.as_deref())?;
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let destination = match &config.log_file {
        Some(path) => LogDestination::Both(path.clone()),
        None => LogDestination::Terminal,
    };
    lms_logging::initialize(destination, level);
    match source {
        ConfigSource::File(path) => lms_info!("Loaded config from {:?}", path),
        ConfigSource::Defaults { missing } => {
            lms_info!("No config at {:?}; using defaults", missing)
        }
    }

    match &cli.command {
        Command::Upload { file, .. } => {
            let form = cli.command.module_form().unwrap_or_default();
            run_upload(&config, file, form)
        }
        Command::Route { urls } => {
            run_route(&config, urls);
            Ok(ExitCode::SUCCESS)
        }
        Command::Cache { origin } => run_cache(&config, origin),
    }
}

fn run_upload(config: &AppConfig, file: &Path, form: ModuleForm) -> Result<ExitCode> {
    let runtime = tokio::runtime::Runtime::new().context("starting runtime")?;
    let keep_alive = match config.keep_alive() {
        Some(keep_alive) => Some(
            KeepAliveService::new(keep_alive, runtime.handle().clone())
                .context("building keep-alive client")?,
        ),
        None => None,
    };
    if let Some(service) = &keep_alive {
        service.handle(SessionEvent::SignedIn);
    }

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = interrupted.clone();
    runtime.spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            flag.store(true, Ordering::SeqCst);
        }
    });

    let engine = EngineHandle::new(config.api_settings(), config.upload_settings())
        .context("building API client")?;
    let runner = EffectRunner::new(engine);
    let mut renderer = ProgressRenderer::default();

    let (mut state, effects) = update(
        AppState::new(),
        Msg::UploadSubmitted {
            form,
            file_path: file.display().to_string(),
        },
    );
    if let Some(rejected) = state.view().rejected.first() {
        eprintln!("invalid module form: {}", rejected.reason);
        return Ok(ExitCode::FAILURE);
    }
    runner.apply(effects);

    while state.has_active_jobs() {
        let mut msgs = Vec::new();
        if interrupted.swap(false, Ordering::SeqCst) {
            lms_warn!("Interrupted; cancelling active uploads");
            msgs.extend(cancel_requests(&state.view()));
        }
        msgs.push(runner.next_msg(EVENT_WAIT).unwrap_or(Msg::Tick));

        for msg in msgs {
            let (next, effects) = update(state, msg);
            state = next;
            runner.apply(effects);
        }
        if state.consume_dirty() {
            for line in renderer.render(&state.view()) {
                println!("{line}");
            }
        }
    }

    if let Some(service) = &keep_alive {
        service.handle(SessionEvent::SignedOut);
    }

    let succeeded = state
        .view()
        .jobs
        .iter()
        .all(|row| row.phase == UploadPhase::Completed);
    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// One cancel request per job that has not reached a terminal phase.
fn cancel_requests(view: &AppViewModel) -> Vec<Msg> {
    view.jobs
        .iter()
        .filter(|row| !row.phase.is_terminal() && !row.cancel_requested)
        .map(|row| Msg::CancelRequested { job_id: row.job_id })
        .collect()
}

fn routing_rules(config: &AppConfig) -> RoutingRules {
    match config.backend_host() {
        Some(host) => RoutingRules::default().with_backend_host(host),
        None => RoutingRules::default(),
    }
}

fn run_route(config: &AppConfig, urls: &[String]) {
    let rules = routing_rules(config);
    for url in urls {
        println!("{:?}\t{}", rules.classify(url), url);
    }
}

fn run_cache(config: &AppConfig, origin: &str) -> Result<ExitCode> {
    let origin = url::Url::parse(origin).with_context(|| format!("invalid origin {origin:?}"))?;
    let network = ReqwestNetwork::new(config.fetch_settings()).context("building HTTP client")?;
    let storage = DiskCacheStorage::new(config.cache_dir.clone());
    let router = CacheRouter::new(
        network,
        storage,
        routing_rules(config),
        CacheGenerations::for_version(&config.cache_version),
        origin,
    )
    .with_max_entry_bytes(config.max_cache_entry_bytes);

    let runtime = tokio::runtime::Runtime::new().context("starting runtime")?;
    let (stored, deleted) = runtime.block_on(async {
        let stored = router.install().await;
        let deleted = router.activate().await;
        (stored, deleted)
    });

    lms_info!("Cache at {:?} refreshed", config.cache_dir);
    println!(
        "generation {} holds {} pre-cached entries",
        router.current_generation(),
        stored
    );
    for name in deleted {
        println!("deleted stale generation {name}");
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use courseware_core::UploadRowView;

    fn row(job_id: u64, phase: UploadPhase, cancel_requested: bool) -> UploadRowView {
        UploadRowView {
            job_id,
            title: "Intro".to_string(),
            file_path: "intro.mp4".to_string(),
            phase,
            percent: 10,
            message: String::new(),
            record: None,
            cancel_requested,
        }
    }

    #[test]
    fn interrupt_cancels_only_running_jobs() {
        let view = AppViewModel {
            jobs: vec![
                row(1, UploadPhase::Polling, false),
                row(2, UploadPhase::Completed, false),
                row(3, UploadPhase::Polling, true),
            ],
            ..AppViewModel::default()
        };
        assert_eq!(cancel_requests(&view), vec![Msg::CancelRequested { job_id: 1 }]);
    }

    #[test]
    fn cancel_request_reaches_the_engine_as_an_effect() {
        let (state, _) = update(
            AppState::new(),
            Msg::UploadSubmitted {
                form: ModuleForm {
                    title: "Intro".to_string(),
                    type_tag: "video".to_string(),
                    order: "1".to_string(),
                    course_id: "9".to_string(),
                },
                file_path: "intro.mp4".to_string(),
            },
        );
        let msgs = cancel_requests(&state.view());
        assert_eq!(msgs.len(), 1);
        let (_, effects) = update(state, msgs[0].clone());
        assert!(matches!(
            effects.as_slice(),
            [courseware_core::Effect::CancelUpload { .. }]
        ));
    }
}
