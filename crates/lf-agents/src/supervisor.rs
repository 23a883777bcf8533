//! Start, stop and report on the two agent loops.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use lf_config::{AgentsConfig, CallingConfig};
use lf_core::responses::AgentStatus;
use lf_db::service::LeadService;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;

use crate::agent::{PollingAgent, run_loop};
use crate::dialer::Dialer;
use crate::entry::DataEntryAgent;
use crate::error::AgentError;
use crate::portal::PortalClient;
use crate::voice::VoiceAgent;

const STOP_TIMEOUT: Duration = Duration::from_secs(35);

/// One spawned loop: its shutdown signal, running flag and task.
struct LoopHandle {
    shutdown: Arc<Notify>,
    running: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl LoopHandle {
    fn spawn<A: PollingAgent + 'static>(agent: A, period: Duration, backoff: Duration) -> Self {
        let shutdown = Arc::new(Notify::new());
        let running = Arc::new(AtomicBool::new(true));
        let task = tokio::spawn(run_loop(
            agent,
            period,
            backoff,
            Arc::clone(&shutdown),
            Arc::clone(&running),
        ));
        Self {
            shutdown,
            running,
            task,
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn stop(self, name: &str) {
        self.shutdown.notify_one();
        let abort = self.task.abort_handle();
        match tokio::time::timeout(STOP_TIMEOUT, self.task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(agent = name, error = ?e, "agent task panicked"),
            Err(_) => {
                tracing::error!(agent = name, "agent did not stop in time; aborting");
                abort.abort();
            }
        }
        self.running.store(false, Ordering::SeqCst);
    }
}

struct Running {
    voice: LoopHandle,
    entry: LoopHandle,
}

/// Owns the voice and data-entry loops. Vendors that are not configured make
/// [`AgentSupervisor::start`] fail with [`AgentError::NotConfigured`].
pub struct AgentSupervisor {
    service: Arc<LeadService>,
    dialer: Option<Arc<dyn Dialer>>,
    portal: Option<Arc<dyn PortalClient>>,
    calling: CallingConfig,
    agents: AgentsConfig,
    running: Mutex<Option<Running>>,
}

impl AgentSupervisor {
    #[must_use]
    pub fn new(
        service: Arc<LeadService>,
        dialer: Option<Arc<dyn Dialer>>,
        portal: Option<Arc<dyn PortalClient>>,
        calling: CallingConfig,
        agents: AgentsConfig,
    ) -> Self {
        Self {
            service,
            dialer,
            portal,
            calling,
            agents,
            running: Mutex::new(None),
        }
    }

    /// Spawn both loops.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::AlreadyRunning` if the loops are up, or
    /// `AgentError::NotConfigured` if a vendor client is missing.
    pub async fn start(&self) -> Result<(), AgentError> {
        let mut running = self.running.lock().await;
        if running.as_ref().is_some_and(|r| r.voice.is_running() || r.entry.is_running()) {
            return Err(AgentError::AlreadyRunning);
        }
        let dialer = self.dialer.clone().ok_or(AgentError::NotConfigured("voice"))?;
        let portal = self.portal.clone().ok_or(AgentError::NotConfigured("portal"))?;
        let backoff = Duration::from_secs(self.agents.error_backoff_secs);

        let voice = VoiceAgent::new(
            Arc::clone(&self.service),
            dialer,
            self.calling.clone(),
            self.agents.voice_batch,
        );
        let entry = DataEntryAgent::new(Arc::clone(&self.service), portal, self.agents.entry_batch);

        *running = Some(Running {
            voice: LoopHandle::spawn(voice, Duration::from_secs(self.agents.voice_poll_secs), backoff),
            entry: LoopHandle::spawn(entry, Duration::from_secs(self.agents.entry_poll_secs), backoff),
        });
        tracing::info!("agents started");
        Ok(())
    }

    /// Signal both loops and wait for them to finish their current tick.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::NotRunning` if no loop was started.
    pub async fn stop(&self) -> Result<(), AgentError> {
        let Some(running) = self.running.lock().await.take() else {
            return Err(AgentError::NotRunning);
        };
        tokio::join!(running.voice.stop("voice_agent"), running.entry.stop("data_entry_agent"));
        tracing::info!("agents stopped");
        Ok(())
    }

    pub async fn status(&self) -> AgentStatus {
        let running = self.running.lock().await;
        let (voice, entry) = running
            .as_ref()
            .map_or((false, false), |r| (r.voice.is_running(), r.entry.is_running()));
        AgentStatus {
            voice_agent_running: voice,
            data_entry_agent_running: entry,
            agents_running: voice && entry,
        }
    }
}
