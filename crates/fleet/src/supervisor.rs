//! Per-account control loop
//!
//! Drives one account through a cycle that never gives up: acquire a
//! credential, bootstrap the daily claim, open the session, then poll points
//! and claims until the credential is rejected or shutdown is requested.
//! Every wait in the cycle is raced against the supervisor's cancellation
//! token, so shutdown never has to outlast a retry delay.

use std::sync::Arc;
use std::time::Duration;

use rewards_api::Credential;
use tokio::sync::watch;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, info, instrument, warn};
use worker_session::{Connector, Session, SessionTiming};

use crate::account::Account;
use crate::api::RewardsApi;
use crate::error::Result;
use crate::status::{AccountStatus, ConnectionStatus, StatusReceiver};

/// Delays and poll periods for one supervisor. All injectable so tests can
/// run the cycle on paused time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorTiming {
    /// Wait between credential attempts (no attempt limit)
    pub credential_retry: Duration,
    /// Wait after a failed cycle before starting over
    pub cycle_retry: Duration,
    pub points_poll: Duration,
    pub claim_poll: Duration,
    pub session: SessionTiming,
}

impl Default for SupervisorTiming {
    fn default() -> Self {
        Self {
            credential_retry: Duration::from_secs(3),
            cycle_retry: Duration::from_secs(3),
            points_poll: Duration::from_secs(600),
            claim_poll: Duration::from_secs(3600),
            session: SessionTiming::default(),
        }
    }
}

/// Settings shared by every supervisor in the fleet.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub ws_base_url: String,
    /// Host advertised in REGISTER and HEARTBEAT
    pub worker_host: String,
    pub timing: SupervisorTiming,
}

/// How one cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleEnd {
    /// The points poll reported the credential as rejected
    CredentialRejected,
    Shutdown,
}

pub struct Supervisor {
    account: Account,
    api: Arc<dyn RewardsApi>,
    connector: Arc<dyn Connector>,
    config: SupervisorConfig,
    status: watch::Sender<AccountStatus>,
}

impl Supervisor {
    pub fn new(
        account: Account,
        api: Arc<dyn RewardsApi>,
        connector: Arc<dyn Connector>,
        config: SupervisorConfig,
    ) -> (Self, StatusReceiver) {
        let (status, receiver) =
            watch::channel(AccountStatus::new(account.index, &account.address));
        (
            Self {
                account,
                api,
                connector,
                config,
                status,
            },
            receiver,
        )
    }

    /// Run cycles until `cancel` fires. Only cancellation ends this.
    #[instrument(skip_all, fields(account = self.account.index))]
    pub async fn run(self, cancel: CancellationToken) {
        let egress = self
            .account
            .egress
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "direct".to_string());
        info!(address = %self.account.address, egress = %egress, "supervisor started");

        loop {
            match self.cycle(&cancel).await {
                Ok(CycleEnd::Shutdown) => break,
                Ok(CycleEnd::CredentialRejected) => {
                    metrics::counter!("fleet_reauthentications_total").increment(1);
                    info!("credential rejected, re-authenticating");
                }
                Err(e) => {
                    self.publish(ConnectionStatus::NotConnected);
                    warn!(
                        error = %e,
                        retry_secs = self.config.timing.cycle_retry.as_secs_f64(),
                        "cycle failed, retrying"
                    );
                    if !pause(&cancel, self.config.timing.cycle_retry).await {
                        break;
                    }
                }
            }
        }

        self.publish(ConnectionStatus::Stopped);
        info!("supervisor stopped");
    }

    async fn cycle(&self, cancel: &CancellationToken) -> Result<CycleEnd> {
        self.publish(ConnectionStatus::Authenticating);
        let Some(credential) = self.acquire(cancel).await else {
            return Ok(CycleEnd::Shutdown);
        };
        info!(token = %credential.short(), "credential acquired");

        match cancel.run_until_cancelled(self.bootstrap(&credential)).await {
            Some(result) => result?,
            None => return Ok(CycleEnd::Shutdown),
        }

        let session = Session::new(
            &self.account.address,
            &self.config.worker_host,
            &self.config.ws_base_url,
            &credential,
            self.account.egress.clone(),
            self.config.timing.session,
        )?;
        let (link_tx, mut link) = watch::channel(false);
        let session = session.with_link(link_tx);
        let session_cancel = cancel.child_token();
        let connector = self.connector.clone();
        let token = session_cancel.clone();
        let session_task = tokio::spawn(
            async move { session.run(connector.as_ref(), token).await }.instrument(Span::current()),
        );
        self.publish(ConnectionStatus::NotConnected);

        let end = self.poll(&credential, &mut link, cancel).await;

        // Close the session for good before a new credential can open another.
        session_cancel.cancel();
        match session_task.await {
            Ok(report) => debug!(
                heartbeats = report.heartbeats,
                jobs = report.jobs_acknowledged,
                "session ended"
            ),
            Err(e) => warn!(error = %e, "session task failed"),
        }
        if end == CycleEnd::CredentialRejected {
            self.publish(ConnectionStatus::NotConnected);
        }
        Ok(end)
    }

    /// Acquire a non-empty credential, retrying indefinitely. `None` on
    /// shutdown.
    async fn acquire(&self, cancel: &CancellationToken) -> Option<Credential> {
        let mut attempt: u64 = 0;
        loop {
            attempt += 1;
            let outcome = cancel
                .run_until_cancelled(self.api.acquire_credential(&self.account.address))
                .await?;
            match outcome {
                Ok(credential) if !credential.is_empty() => return Some(credential),
                Ok(_) => warn!(attempt, "issuer returned no token"),
                Err(e) => warn!(attempt, error = %e, "credential request failed"),
            }
            metrics::counter!("fleet_credential_failures_total").increment(1);
            if !pause(cancel, self.config.timing.credential_retry).await {
                return None;
            }
        }
    }

    /// Claim if still open, then log the point total (best-effort).
    async fn bootstrap(&self, credential: &Credential) -> Result<()> {
        self.claim_if_due(credential).await?;
        match self.api.fetch_point_total(credential).await {
            Ok(total) => {
                info!(points = total.total_heartbeats, "current points");
                self.publish_points(total.total_heartbeats);
            }
            Err(e) => warn!(error = %e, "could not fetch points"),
        }
        Ok(())
    }

    async fn claim_if_due(&self, credential: &Credential) -> rewards_api::Result<()> {
        let Some(state) = self.api.fetch_claim_state(credential).await? else {
            debug!("no claim record yet");
            return Ok(());
        };
        info!(
            tier = %state.tier_display(),
            daily_point = ?state.daily_point,
            claimed = state.claimed,
            next_claim = %state.next_claim_display(),
            "claim status"
        );
        if !state.should_claim() {
            return Ok(());
        }
        let result = self.api.trigger_claim(credential).await?;
        metrics::counter!("fleet_claims_triggered_total").increment(1);
        info!(result = %result, "daily claim triggered");
        Ok(())
    }

    /// Poll loops A (points) and B (claims) while the session runs, and
    /// mirror the session's link into the account status.
    async fn poll(
        &self,
        credential: &Credential,
        link: &mut watch::Receiver<bool>,
        cancel: &CancellationToken,
    ) -> CycleEnd {
        let timing = &self.config.timing;
        let mut points = ticker(timing.points_poll);
        let mut claims = ticker(timing.claim_poll);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return CycleEnd::Shutdown,
                Ok(()) = link.changed() => {
                    let status = if *link.borrow_and_update() {
                        ConnectionStatus::Connected
                    } else {
                        ConnectionStatus::NotConnected
                    };
                    self.publish(status);
                }
                _ = points.tick() => {
                    let Some(outcome) = cancel
                        .run_until_cancelled(self.api.fetch_point_total(credential))
                        .await
                    else {
                        return CycleEnd::Shutdown;
                    };
                    match outcome {
                        Ok(total) => {
                            info!(points = total.total_heartbeats, "points updated");
                            self.publish_points(total.total_heartbeats);
                        }
                        Err(e) if e.is_unauthorized() => {
                            warn!(error = %e, "credential rejected during points poll");
                            return CycleEnd::CredentialRejected;
                        }
                        Err(e) => warn!(error = %e, "points poll failed"),
                    }
                }
                _ = claims.tick() => {
                    match cancel.run_until_cancelled(self.claim_if_due(credential)).await {
                        None => return CycleEnd::Shutdown,
                        Some(Err(e)) => warn!(error = %e, "claim poll failed"),
                        Some(Ok(())) => {}
                    }
                }
            }
        }
    }

    fn publish(&self, status: ConnectionStatus) {
        self.status.send_modify(|s| s.status = status);
    }

    fn publish_points(&self, total: u64) {
        self.status.send_modify(|s| s.last_points = Some(total));
    }
}

/// Periodic timer whose first tick is one full period away.
fn ticker(period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Sleep for `delay`. Returns `false` if cancelled first.
async fn pause(cancel: &CancellationToken, delay: Duration) -> bool {
    cancel
        .run_until_cancelled(tokio::time::sleep(delay))
        .await
        .is_some()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    use rewards_api::{ClaimState, Egress, PointTotal};
    use serde_json::{Value, json};
    use worker_session::Connection;

    type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = rewards_api::Result<T>> + Send + 'a>>;

    /// Scripted `RewardsApi`. Queued results are consumed first; once a
    /// queue is empty the call succeeds with a default.
    #[derive(Default)]
    pub(crate) struct FakeApi {
        credentials: Mutex<VecDeque<rewards_api::Result<Credential>>>,
        points: Mutex<VecDeque<rewards_api::Result<PointTotal>>>,
        claim: Mutex<Option<ClaimState>>,
        claim_errors: Mutex<VecDeque<rewards_api::Error>>,
        points_delay: Mutex<Option<Duration>>,
        calls: Mutex<Vec<(Instant, &'static str)>>,
        issued: Mutex<u32>,
    }

    impl FakeApi {
        pub(crate) fn queue_credential(&self, result: rewards_api::Result<Credential>) {
            self.credentials.lock().unwrap().push_back(result);
        }

        pub(crate) fn queue_points(&self, result: rewards_api::Result<PointTotal>) {
            self.points.lock().unwrap().push_back(result);
        }

        pub(crate) fn queue_claim_error(&self, error: rewards_api::Error) {
            self.claim_errors.lock().unwrap().push_back(error);
        }

        /// Make every points fetch take `delay` before answering.
        pub(crate) fn slow_points(&self, delay: Duration) {
            *self.points_delay.lock().unwrap() = Some(delay);
        }

        pub(crate) fn set_claim(&self, claimed: bool) {
            *self.claim.lock().unwrap() = Some(ClaimState {
                tier: json!("gold"),
                daily_point: Some(50.0),
                claimed,
                next_claim: None,
            });
        }

        pub(crate) fn calls(&self, name: &str) -> Vec<Instant> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(_, n)| *n == name)
                .map(|(at, _)| *at)
                .collect()
        }

        fn record(&self, name: &'static str) {
            self.calls.lock().unwrap().push((Instant::now(), name));
        }
    }

    impl RewardsApi for FakeApi {
        fn acquire_credential<'a>(&'a self, _address: &'a str) -> ApiFuture<'a, Credential> {
            Box::pin(async move {
                self.record("acquire");
                if let Some(result) = self.credentials.lock().unwrap().pop_front() {
                    return result;
                }
                let mut issued = self.issued.lock().unwrap();
                *issued += 1;
                Ok(Credential::new(format!("tok-{issued}")))
            })
        }

        fn fetch_point_total<'a>(&'a self, _c: &'a Credential) -> ApiFuture<'a, PointTotal> {
            Box::pin(async move {
                self.record("points");
                let delay = *self.points_delay.lock().unwrap();
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                self.points.lock().unwrap().pop_front().unwrap_or(Ok(PointTotal {
                    total_heartbeats: 100,
                }))
            })
        }

        fn fetch_claim_state<'a>(
            &'a self,
            _c: &'a Credential,
        ) -> ApiFuture<'a, Option<ClaimState>> {
            Box::pin(async move {
                self.record("claim_state");
                if let Some(error) = self.claim_errors.lock().unwrap().pop_front() {
                    return Err(error);
                }
                Ok(self.claim.lock().unwrap().clone())
            })
        }

        fn trigger_claim<'a>(&'a self, _c: &'a Credential) -> ApiFuture<'a, Value> {
            Box::pin(async move {
                self.record("trigger_claim");
                Ok(json!({"ok": true}))
            })
        }
    }

    #[derive(Default)]
    pub(crate) struct ConnectorLog {
        pub(crate) urls: Vec<String>,
        pub(crate) egress: Vec<Option<Egress>>,
        pub(crate) sent: Vec<Value>,
        pub(crate) closed: usize,
        /// Refuse every connect while set
        pub(crate) refuse: bool,
    }

    /// Connector whose connections accept every frame and never receive.
    #[derive(Clone, Default)]
    pub(crate) struct FakeConnector {
        pub(crate) log: Arc<Mutex<ConnectorLog>>,
    }

    struct QuietConnection {
        log: Arc<Mutex<ConnectorLog>>,
    }

    impl Connector for FakeConnector {
        fn connect<'a>(
            &'a self,
            url: &'a str,
            egress: Option<&'a Egress>,
        ) -> Pin<Box<dyn Future<Output = worker_session::Result<Box<dyn Connection>>> + Send + 'a>>
        {
            Box::pin(async move {
                let mut log = self.log.lock().unwrap();
                log.urls.push(url.to_string());
                log.egress.push(egress.cloned());
                if log.refuse {
                    return Err(worker_session::Error::Connect("refused".into()));
                }
                Ok(Box::new(QuietConnection {
                    log: self.log.clone(),
                }) as Box<dyn Connection>)
            })
        }
    }

    impl Connection for QuietConnection {
        fn send(
            &mut self,
            text: String,
        ) -> Pin<Box<dyn Future<Output = worker_session::Result<()>> + Send + '_>> {
            Box::pin(async move {
                let value = serde_json::from_str(&text).unwrap();
                self.log.lock().unwrap().sent.push(value);
                Ok(())
            })
        }

        fn recv(
            &mut self,
        ) -> Pin<Box<dyn Future<Output = Option<worker_session::Result<String>>> + Send + '_>>
        {
            Box::pin(std::future::pending())
        }

        fn close(&mut self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
            Box::pin(async move {
                self.log.lock().unwrap().closed += 1;
            })
        }
    }

    pub(crate) fn config() -> SupervisorConfig {
        SupervisorConfig {
            ws_base_url: "ws://gw.test/ws".into(),
            worker_host: "extension".into(),
            timing: SupervisorTiming::default(),
        }
    }

    fn account(index: usize, address: &str) -> Account {
        Account {
            index,
            address: address.into(),
            egress: None,
        }
    }

    fn spawn_supervisor(
        api: &Arc<FakeApi>,
        connector: &FakeConnector,
    ) -> (
        CancellationToken,
        StatusReceiver,
        tokio::task::JoinHandle<()>,
    ) {
        let (supervisor, status) = Supervisor::new(
            account(1, "0xAAA"),
            api.clone(),
            Arc::new(connector.clone()),
            config(),
        );
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(supervisor.run(cancel.clone()));
        (cancel, status, handle)
    }

    #[tokio::test(start_paused = true)]
    async fn empty_tokens_are_retried_after_fixed_delay() {
        let api = Arc::new(FakeApi::default());
        for _ in 0..3 {
            api.queue_credential(Ok(Credential::new("")));
        }
        let connector = FakeConnector::default();
        let (cancel, status, handle) = spawn_supervisor(&api, &connector);

        tokio::time::sleep(Duration::from_secs(20)).await;

        let attempts = api.calls("acquire");
        assert_eq!(attempts.len(), 4, "three retries then success");
        for pair in attempts.windows(2) {
            assert_eq!(pair[1] - pair[0], Duration::from_secs(3));
        }
        assert_eq!(status.borrow().status, ConnectionStatus::Connected);
        assert_eq!(connector.log.lock().unwrap().urls, ["ws://gw.test/ws?token=tok-1"]);

        cancel.cancel();
        handle.await.unwrap();
        assert_eq!(status.borrow().status, ConnectionStatus::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_failures_are_retried_indefinitely() {
        let api = Arc::new(FakeApi::default());
        for _ in 0..10 {
            api.queue_credential(Err(rewards_api::Error::Http("connection refused".into())));
        }
        let connector = FakeConnector::default();
        let (cancel, status, handle) = spawn_supervisor(&api, &connector);

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert_eq!(api.calls("acquire").len(), 10);
        assert_eq!(status.borrow().status, ConnectionStatus::Authenticating);
        assert!(connector.log.lock().unwrap().urls.is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(api.calls("acquire").len(), 11);
        assert_eq!(status.borrow().status, ConnectionStatus::Connected);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_credential_closes_session_and_reauthenticates() {
        let api = Arc::new(FakeApi::default());
        api.queue_points(Ok(PointTotal {
            total_heartbeats: 7,
        }));
        api.queue_points(Err(rewards_api::Error::Unauthorized {
            endpoint: "reward_realtime",
        }));
        let connector = FakeConnector::default();
        let (cancel, status, handle) = spawn_supervisor(&api, &connector);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(status.borrow().last_points, Some(7));
        assert_eq!(api.calls("acquire").len(), 1);

        // First points poll at 600s reports the credential as rejected.
        tokio::time::sleep(Duration::from_secs(600)).await;

        assert_eq!(api.calls("acquire").len(), 2);
        {
            let log = connector.log.lock().unwrap();
            assert_eq!(log.closed, 1, "old session closed intentionally");
            assert_eq!(
                log.urls,
                ["ws://gw.test/ws?token=tok-1", "ws://gw.test/ws?token=tok-2"]
            );
        }
        assert_eq!(status.borrow().status, ConnectionStatus::Connected);

        // The retired session does not reconnect on its own.
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(connector.log.lock().unwrap().urls.len(), 2);

        cancel.cancel();
        handle.await.unwrap();
        assert_eq!(connector.log.lock().unwrap().closed, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn claimed_state_never_triggers() {
        let api = Arc::new(FakeApi::default());
        api.set_claim(true);
        let connector = FakeConnector::default();
        let (cancel, _status, handle) = spawn_supervisor(&api, &connector);

        tokio::time::sleep(Duration::from_secs(3601)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(api.calls("claim_state").len(), 2, "bootstrap and one poll");
        assert!(api.calls("trigger_claim").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unclaimed_state_triggers_exactly_once() {
        let api = Arc::new(FakeApi::default());
        api.set_claim(false);
        let connector = FakeConnector::default();
        let (cancel, _status, handle) = spawn_supervisor(&api, &connector);

        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(api.calls("claim_state").len(), 1);
        assert_eq!(api.calls("trigger_claim").len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn points_failure_other_than_unauthorized_keeps_session() {
        let api = Arc::new(FakeApi::default());
        api.queue_points(Ok(PointTotal {
            total_heartbeats: 1,
        }));
        api.queue_points(Err(rewards_api::Error::Status {
            endpoint: "reward_realtime",
            status: 502,
            body: String::new(),
        }));
        let connector = FakeConnector::default();
        let (cancel, status, handle) = spawn_supervisor(&api, &connector);

        tokio::time::sleep(Duration::from_secs(1201)).await;
        assert_eq!(api.calls("acquire").len(), 1);
        assert_eq!(api.calls("points").len(), 3);
        assert_eq!(status.borrow().last_points, Some(100));
        assert_eq!(connector.log.lock().unwrap().closed, 0);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn session_heartbeats_while_connected() {
        let api = Arc::new(FakeApi::default());
        let connector = FakeConnector::default();
        let (cancel, _status, handle) = spawn_supervisor(&api, &connector);

        tokio::time::sleep(Duration::from_secs(61)).await;
        cancel.cancel();
        handle.await.unwrap();

        let log = connector.log.lock().unwrap();
        let kinds: Vec<&str> = log
            .sent
            .iter()
            .map(|v| v["msgType"].as_str().unwrap())
            .collect();
        assert_eq!(kinds, ["REGISTER", "HEARTBEAT", "HEARTBEAT"]);
        assert_eq!(log.closed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_credential_retry_stops_promptly() {
        let api = Arc::new(FakeApi::default());
        for _ in 0..100 {
            api.queue_credential(Ok(Credential::new("")));
        }
        let connector = FakeConnector::default();
        let (cancel, status, handle) = spawn_supervisor(&api, &connector);

        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(api.calls("acquire").len(), 1);
        assert_eq!(status.borrow().status, ConnectionStatus::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_bootstrap_retries_cycle_after_fixed_delay() {
        let api = Arc::new(FakeApi::default());
        api.queue_claim_error(rewards_api::Error::Status {
            endpoint: "reward_claim",
            status: 500,
            body: String::new(),
        });
        let connector = FakeConnector::default();
        let (cancel, status, handle) = spawn_supervisor(&api, &connector);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(status.borrow().status, ConnectionStatus::NotConnected);
        assert!(connector.log.lock().unwrap().urls.is_empty());
        assert_eq!(api.calls("acquire").len(), 1);

        tokio::time::sleep(Duration::from_secs(3)).await;
        let attempts = api.calls("acquire");
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[1] - attempts[0], config().timing.cycle_retry);
        assert_eq!(
            connector.log.lock().unwrap().urls,
            ["ws://gw.test/ws?token=tok-2"],
            "only the second cycle opens a connection"
        );
        assert_eq!(status.borrow().status, ConnectionStatus::Connected);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn status_tracks_the_session_link() {
        let api = Arc::new(FakeApi::default());
        let connector = FakeConnector::default();
        connector.log.lock().unwrap().refuse = true;
        let (cancel, status, handle) = spawn_supervisor(&api, &connector);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(status.borrow().status, ConnectionStatus::NotConnected);
        assert_eq!(connector.log.lock().unwrap().urls.len(), 1);

        connector.log.lock().unwrap().refuse = false;
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(connector.log.lock().unwrap().urls.len(), 2);
        assert_eq!(status.borrow().status, ConnectionStatus::Connected);
        assert_eq!(api.calls("acquire").len(), 1, "reconnects keep the credential");

        cancel.cancel();
        handle.await.unwrap();
        assert_eq!(status.borrow().status, ConnectionStatus::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_does_not_wait_for_inflight_poll() {
        let api = Arc::new(FakeApi::default());
        let connector = FakeConnector::default();
        let (cancel, status, handle) = spawn_supervisor(&api, &connector);

        // Bootstrap fetch answers at 60s, so the first poll starts at 660s
        // and is still in flight at 690s.
        api.slow_points(Duration::from_secs(60));
        tokio::time::sleep(Duration::from_secs(690)).await;
        assert_eq!(api.calls("points").len(), 2);

        let cancelled_at = Instant::now();
        cancel.cancel();
        handle.await.unwrap();
        assert!(Instant::now() - cancelled_at < Duration::from_secs(1));
        assert_eq!(status.borrow().status, ConnectionStatus::Stopped);
    }
}
