use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use futures::FutureExt;
use reqwest::Client;
use serde::Serialize;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::{mpsc, Notify},
    task::{JoinHandle, JoinSet},
    time::timeout,
};

use crate::{
    analysis::AnalysisClient,
    cache::ResultCache,
    config::AppConfig,
    db::{self, settings::SettingsRepository},
    domain::BusMessage,
    infrastructure::{directories::ResolvedPaths, shutdown::Shutdown},
    orchestrator::Orchestrator,
    page::{render::element_html, ResultElement, ResultPage, ResultScraper},
    pipeline::AnalysisPipeline,
    relay::{MessageRelay, StdoutFeedbackSink},
    settings::SharedSettings,
    tasks::debounce::ScanDebouncer,
};

pub struct TrustLensApp {
    orchestrator: Arc<Orchestrator>,
    relay: Arc<MessageRelay>,
    bus_tx: mpsc::UnboundedSender<BusMessage>,
    bus_rx: mpsc::UnboundedReceiver<BusMessage>,
    debounce_handle: JoinHandle<()>,
    settings_store: SettingsRepository,
    shutdown: Shutdown,
    drain_timeout: Duration,
}

#[derive(Serialize)]
struct SnapshotLine<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    elements: Vec<ElementView<'a>>,
}

#[derive(Serialize)]
struct ElementView<'a> {
    #[serde(flatten)]
    element: &'a ResultElement,
    html: Option<String>,
}

impl TrustLensApp {
    pub async fn initialize(
        config: AppConfig,
        paths: ResolvedPaths,
        shutdown: Shutdown,
    ) -> Result<Self> {
        let pool = db::init_pool(&paths.db_path).await?;
        let settings_store = SettingsRepository::new(pool);
        let initial = settings_store
            .load()
            .await
            .context("failed to load persisted settings")?;
        tracing::info!(
            target: "settings",
            enabled = initial.enabled,
            auto_analyze = initial.auto_analyze,
            cache_results = initial.cache_results,
            "settings loaded"
        );
        let settings = SharedSettings::new(initial);

        let http_client = Client::builder()
            .user_agent(format!("trustlens/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        let client = AnalysisClient::new(http_client, config.analysis.clone());
        let pipeline = Arc::new(AnalysisPipeline::new(
            client,
            Arc::new(ResultCache::new()),
            settings.clone(),
        ));

        let page = Arc::new(ResultPage::new(ResultScraper::new(
            &config.page.result_selector,
        )?));
        if let Some(path) = &config.page.page_path {
            let html = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read page {path}"))?;
            let found = page.append_html(&html);
            tracing::info!(target: "orchestrator", path = %path, found, "page loaded");
        }

        let (bus_tx, bus_rx) = mpsc::unbounded_channel();
        let orchestrator = Arc::new(Orchestrator::new(
            page,
            pipeline,
            settings,
            config.page.host_domain.clone(),
            bus_tx.clone(),
        ));

        let scan_target = orchestrator.clone();
        let (debouncer, debounce_handle) = ScanDebouncer::spawn(
            config.page.scan_debounce,
            Arc::new(move || {
                let target = scan_target.clone();
                async move {
                    target.auto_scan().await;
                }
                .boxed()
            }),
            shutdown.subscribe(),
        );

        let relay = Arc::new(MessageRelay::new(
            orchestrator.clone(),
            debouncer,
            Some(settings_store.clone()),
            Arc::new(StdoutFeedbackSink),
            config.analysis.server_url.clone(),
        ));

        Ok(Self {
            orchestrator,
            relay,
            bus_tx,
            bus_rx,
            debounce_handle,
            settings_store,
            shutdown,
            drain_timeout: config.analysis.request_timeout + Duration::from_secs(1),
        })
    }

    pub async fn run(self) -> Result<()> {
        let TrustLensApp {
            orchestrator,
            relay,
            bus_tx,
            mut bus_rx,
            debounce_handle,
            settings_store,
            shutdown,
            drain_timeout,
        } = self;

        tracing::info!(elements = orchestrator.page().len(), "trustlens started");

        let mut handlers = JoinSet::new();
        {
            let orchestrator = orchestrator.clone();
            handlers.spawn(async move {
                orchestrator.auto_scan().await;
            });
        }

        let input_closed = Arc::new(Notify::new());
        let reader = spawn_stdin_reader(bus_tx, input_closed.clone());

        let mut shutdown_listener = shutdown.subscribe();
        loop {
            tokio::select! {
                biased;
                Some(msg) = bus_rx.recv() => {
                    let relay = relay.clone();
                    handlers.spawn(async move { relay.handle(msg).await });
                }
                Some(res) = handlers.join_next(), if !handlers.is_empty() => {
                    if let Err(err) = res {
                        tracing::error!(target: "relay", error = %err, "message handler panicked");
                    }
                }
                _ = input_closed.notified() => {
                    tracing::info!(target: "relay", "message input closed");
                    break;
                }
                _ = shutdown_listener.notified() => break,
            }
        }

        if timeout(drain_timeout, async {
            while handlers.join_next().await.is_some() {}
        })
        .await
        .is_err()
        {
            tracing::warn!(
                target: "relay",
                "in-flight analyses did not finish within {:?}; abandoning them",
                drain_timeout
            );
            handlers.abort_all();
        }
        while let Ok(msg) = bus_rx.try_recv() {
            relay.handle(msg).await;
        }
        // Mutations still waiting on the debounce timer would be lost on exit.
        if !shutdown_listener.is_triggered() {
            orchestrator.auto_scan().await;
            while let Ok(msg) = bus_rx.try_recv() {
                relay.handle(msg).await;
            }
        }

        shutdown.trigger("run finished");
        reader.abort();
        if let Err(err) = debounce_handle.await {
            if err.is_panic() {
                tracing::error!(target: "debounce", "debouncer panicked");
            }
        }

        print_snapshot(orchestrator.page())?;
        settings_store.close().await;
        tracing::info!("trustlens stopped");
        Ok(())
    }
}

fn spawn_stdin_reader(
    bus_tx: mpsc::UnboundedSender<BusMessage>,
    input_closed: Arc<Notify>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if let Some(msg) = MessageRelay::decode(&line) {
                        if bus_tx.send(msg).is_err() {
                            break;
                        }
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    tracing::warn!(target: "relay", error = %err, "failed to read message input");
                    break;
                }
            }
        }
        input_closed.notify_one();
    })
}

fn print_snapshot(page: &ResultPage) -> Result<()> {
    let elements = page.snapshot();
    let line = SnapshotLine {
        kind: "PAGE_SNAPSHOT",
        elements: elements
            .iter()
            .map(|element| ElementView {
                element,
                html: element_html(element),
            })
            .collect(),
    };
    println!("{}", serde_json::to_string(&line)?);
    Ok(())
}
