use crate::bindings::{self, METRIC_KEY};
use crate::config::schema::AppConfig;
use crate::device::{self, DeviceSession};
use crate::error::{DeckError, Result};
use crate::event::DeckEvent;
use crate::metrics;
use crate::obs::ObsClient;
use crate::render;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const CHANNEL_CAPACITY: usize = 64;

/// Run one device session: open the panel, bridge keys to OBS, keep the CPU
/// readout fresh, and tear everything down in order on end-of-input.
///
/// # Errors
/// `NoDevice`/`MultipleDevices` when discovery doesn't find exactly one
/// panel; any other `DeckError` for fatal startup failures.
pub async fn run(config: AppConfig) -> Result<()> {
    let (hid, kind, serial) = device::discover()?;
    let session = DeviceSession::open(&hid, kind, &serial)?;

    session.reset().await?;
    session.set_brightness(config.streamdeck.brightness).await?;
    session.log_identity().await?;

    // Verify the OBS side before any action key is drawn. Failure is fatal.
    let obs_config = config.obs.clone();
    let client = tokio::task::spawn_blocking(move || -> Result<ObsClient> {
        let client = ObsClient::connect(&obs_config)?;
        let version = client.get_version()?;
        info!(
            "connected to OBS {version} at {}:{}",
            obs_config.host, obs_config.port
        );
        Ok(client)
    })
    .await
    .map_err(|e| DeckError::Obs(format!("connect task failed: {e}")))??;
    let client = Arc::new(client);

    draw_action_keys(&session).await?;

    let cancel = CancellationToken::new();
    let (tx, _) = broadcast::channel::<DeckEvent>(CHANNEL_CAPACITY);

    let input_handle = spawn_input_reader(&session, &tx, &cancel);
    let sampler_handle = spawn_sampler(&session, &cancel);

    info!("session running, end of input stops it");
    event_loop(tx.subscribe(), &client, &cancel).await;

    // Shutdown order matters: the sampler must finish any in-flight push
    // before the handle is reset and closed.
    cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), async {
        let _ = sampler_handle.await;
        let _ = input_handle.await;
    })
    .await;

    session.reset().await?;
    session.close().await;
    info!("session closed");
    Ok(())
}

/// Caption every bound key with its action name.
async fn draw_action_keys(session: &DeviceSession) -> Result<()> {
    let size = session.key_size();
    for &(key, action) in bindings::ACTION_BINDINGS {
        let image = render::render_label(action, size)?;
        session.set_key_image(key, image).await?;
    }
    Ok(())
}

fn spawn_input_reader(
    session: &DeviceSession,
    tx: &broadcast::Sender<DeckEvent>,
    cancel: &CancellationToken,
) -> tokio::task::JoinHandle<()> {
    let session = session.clone();
    let tx = tx.clone();
    let cancel = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = device::input::read_input_loop(session, tx, cancel).await {
            error!("input reader error: {e}");
        }
    })
}

fn spawn_sampler(session: &DeviceSession, cancel: &CancellationToken) -> tokio::task::JoinHandle<()> {
    let session = session.clone();
    let cancel = cancel.clone();
    tokio::spawn(metrics::run_sampler(
        session,
        METRIC_KEY,
        metrics::SAMPLE_INTERVAL,
        cancel,
    ))
}

/// Multiplex the console wait against key events until EOF or cancellation.
async fn event_loop(
    mut rx: broadcast::Receiver<DeckEvent>,
    client: &Arc<ObsClient>,
    cancel: &CancellationToken,
) {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            line = lines.next_line() => match line {
                Ok(Some(_)) => {} // console input is ignored, only EOF stops us
                Ok(None) => {
                    info!("end of input, shutting down");
                    break;
                }
                Err(e) => {
                    warn!("stdin error: {e}");
                    break;
                }
            },
            event = rx.recv() => match event {
                Ok(event) => dispatch(event, client),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("event loop lagged, missed {n} events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
}

/// Map one key event to its remote action, if any. Unbound presses and all
/// releases are no-ops. The request itself runs on a blocking task so event
/// delivery is never held up; its outcome is only logged.
fn dispatch(event: DeckEvent, client: &Arc<ObsClient>) {
    let Some(action) = bindings::action_for_event(event) else {
        if let DeckEvent::ButtonDown(key) = event {
            debug!("key {key} has no binding");
        }
        return;
    };

    info!("triggering hotkey '{action}'");
    let client = client.clone();
    tokio::task::spawn_blocking(move || {
        if let Err(e) = client.trigger_hotkey(action) {
            error!("hotkey '{action}' failed: {e}");
        }
    });
}
