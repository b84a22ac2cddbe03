//! Submission pipeline.
//!
//! # State Machine
//! ```text
//! Start → OriginChecked → RateLimitChecked ─┬→ HoneypotRejected → 200 "OK"
//!                                           └→ Sanitized → Validated ─┬→ Dispatched → 303
//!                                                                     └→ DeliveryFailed → 500
//! any failure → audit → ContactError::to_response
//! ```
//!
//! Stages run strictly in order and the first failure ends the request.
//! Locks (rate-limit record, audit file) are scoped to one blocking call
//! each and never held across delivery.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use axum::http::{header, HeaderMap};
use axum::response::Response;
use futures_util::FutureExt;
use tracing::Instrument;

use crate::audit::{AuditEvent, AuditMonitor, EventKind};
use crate::config::RelayConfig;
use crate::http::request::RequestContext;
use crate::http::response::{honeypot_ok, see_other, ContactError};
use crate::mail::{Delivery, MailTransport, OutboundMessage};
use crate::observability::metrics;
use crate::security::{OriginGuard, RateLimitError, RateLimiter};
use crate::storage::RuntimeDirs;
use crate::submission::sanitize::clean_line;
use crate::submission::{validate, Sanitized, SubmissionForm};

/// Pipeline position, carried into logs and failure audits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    OriginChecked,
    RateLimitChecked,
    HoneypotRejected,
    Sanitized,
    Validated,
    Dispatched,
    DeliveryFailed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Start => "start",
            Stage::OriginChecked => "origin_checked",
            Stage::RateLimitChecked => "rate_limit_checked",
            Stage::HoneypotRejected => "honeypot_rejected",
            Stage::Sanitized => "sanitized",
            Stage::Validated => "validated",
            Stage::Dispatched => "dispatched",
            Stage::DeliveryFailed => "delivery_failed",
        }
    }
}

/// Successful end states.
#[derive(Debug)]
pub enum Outcome {
    Honeypot,
    Delivered(Delivery),
}

/// What the pipeline knew when it stopped.
#[derive(Debug)]
struct Progress {
    stage: Stage,
    fields: Option<Sanitized>,
    recipient: Option<String>,
}

impl Progress {
    fn new() -> Self {
        Self {
            stage: Stage::Start,
            fields: None,
            recipient: None,
        }
    }

    fn advance(&mut self, stage: Stage) {
        tracing::trace!(stage = stage.as_str(), "Stage reached");
        self.stage = stage;
    }
}

/// Sequences origin check, rate limit, validation, audit and delivery.
#[derive(Clone)]
pub struct Dispatcher {
    config: Arc<RelayConfig>,
    dirs: RuntimeDirs,
    origin: OriginGuard,
    limiter: RateLimiter,
    monitor: AuditMonitor,
    transport: Arc<dyn MailTransport>,
}

impl Dispatcher {
    pub fn new(
        config: Arc<RelayConfig>,
        dirs: RuntimeDirs,
        transport: Arc<dyn MailTransport>,
    ) -> Self {
        Self {
            origin: OriginGuard::new(&config.origin.allowed_hosts),
            limiter: RateLimiter::new(dirs.rate_limit_dir()),
            monitor: AuditMonitor::new(dirs.monitor_dir(), config.audit.clone()),
            config,
            dirs,
            transport,
        }
    }

    pub fn monitor(&self) -> &AuditMonitor {
        &self.monitor
    }

    /// Process one submission and produce exactly one response.
    ///
    /// A panic anywhere in the pipeline is audited as `fatal` and answered
    /// with a generic 500.
    pub async fn dispatch(&self, ctx: &RequestContext, headers: &HeaderMap, body: &[u8]) -> Response {
        let span = tracing::info_span!("submission", request_id = %ctx.request_id, ip = %ctx.client_ip);
        let started = Instant::now();

        let handled = AssertUnwindSafe(self.handle(ctx, headers, body))
            .catch_unwind()
            .instrument(span)
            .await;

        let response = match handled {
            Ok(response) => response,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(request_id = %ctx.request_id, panic = %message, "Pipeline panicked");
                self.monitor
                    .record(
                        AuditEvent::new(ctx, EventKind::Fatal)
                            .with_error(&message)
                            .with("type", "panic"),
                    )
                    .await;
                metrics::record_submission("fatal");
                ContactError::UnexpectedInternal(message).to_response(&ctx.request_id)
            }
        };

        tracing::debug!(
            request_id = %ctx.request_id,
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Submission handled"
        );
        response
    }

    async fn handle(&self, ctx: &RequestContext, headers: &HeaderMap, body: &[u8]) -> Response {
        if let Err(e) = self.ensure_dirs().await {
            tracing::error!(error = %e, "Runtime directory unavailable");
            metrics::record_submission("missing_precondition");
            return ContactError::MissingPrecondition(e).to_response(&ctx.request_id);
        }

        self.monitor.maybe_cleanup().await;

        let mut progress = Progress::new();
        match self.run(ctx, headers, body, &mut progress).await {
            Ok(Outcome::Honeypot) => {
                metrics::record_submission("honeypot");
                honeypot_ok(&ctx.request_id)
            }
            Ok(Outcome::Delivered(_)) => {
                metrics::record_submission("delivered");
                see_other(&self.config.endpoint.success_redirect, &ctx.request_id)
            }
            Err(err) => {
                tracing::info!(
                    stage = progress.stage.as_str(),
                    reason = err.reason(),
                    "Submission rejected"
                );
                self.monitor.record(self.failure_event(ctx, &err, &progress)).await;
                metrics::record_submission(err.reason());
                err.to_response(&ctx.request_id)
            }
        }
    }

    async fn run(
        &self,
        ctx: &RequestContext,
        headers: &HeaderMap,
        body: &[u8],
        progress: &mut Progress,
    ) -> Result<Outcome, ContactError> {
        self.check_origin(headers)?;
        progress.advance(Stage::OriginChecked);

        self.check_rate_limit(ctx).await?;
        progress.advance(Stage::RateLimitChecked);

        let form = SubmissionForm::from_urlencoded(body);
        if form.is_honeypot_hit() {
            progress.advance(Stage::HoneypotRejected);
            self.monitor
                .record(AuditEvent::new(ctx, EventKind::HoneypotHit))
                .await;
            return Ok(Outcome::Honeypot);
        }

        let fields = Sanitized::from_form(&form);
        progress.fields = Some(fields.clone());
        progress.advance(Stage::Sanitized);

        let submission = validate(fields.clone(), &self.config.limits)?;
        progress.advance(Stage::Validated);

        self.monitor
            .record(
                AuditEvent::new(ctx, EventKind::Validated)
                    .with_digest(&fields, self.monitor.log_pii()),
            )
            .await;

        let message = OutboundMessage::compose(&self.config.mail, &submission, ctx);
        progress.recipient = Some(message.to.clone());

        let started = Instant::now();
        let delivered = self.transport.deliver(&message).await;
        metrics::record_delivery(delivered.is_ok(), started);

        match delivered {
            Ok(delivery) => {
                progress.advance(Stage::Dispatched);
                tracing::info!(transport = delivery.transport, "Notification delivered");
                self.monitor
                    .record(
                        AuditEvent::new(ctx, EventKind::MailSent)
                            .with("to", message.to.as_str())
                            .with("transport", delivery.transport),
                    )
                    .await;
                Ok(Outcome::Delivered(delivery))
            }
            Err(e) => {
                progress.advance(Stage::DeliveryFailed);
                tracing::warn!(error = %e, "Notification delivery failed");
                Err(ContactError::DeliveryFailed(e.to_string()))
            }
        }
    }

    async fn ensure_dirs(&self) -> Result<(), String> {
        let dirs = self.dirs.clone();
        match tokio::task::spawn_blocking(move || dirs.ensure()).await {
            Ok(ensured) => ensured.map_err(|e| e.to_string()),
            Err(e) => Err(format!("runtime dir task: {e}")),
        }
    }

    fn check_origin(&self, headers: &HeaderMap) -> Result<(), ContactError> {
        let verdict = if self.config.dev_mode {
            let host = headers.get(header::HOST).and_then(|v| v.to_str().ok());
            self.origin.for_development(host).assert_allowed(headers)
        } else {
            self.origin.assert_allowed(headers)
        };
        verdict.map_err(|forbidden| ContactError::ForbiddenOrigin {
            host: forbidden.host,
        })
    }

    async fn check_rate_limit(&self, ctx: &RequestContext) -> Result<(), ContactError> {
        let limiter = self.limiter.clone();
        let key = ctx.rate_limit_key();
        let max = self.config.rate_limit.max_requests;
        let window = self.config.rate_limit.window_secs;

        tokio::task::spawn_blocking(move || limiter.check(&key, max, window))
            .await
            .map_err(|e| ContactError::UnexpectedInternal(format!("rate limit task: {e}")))?
            .map_err(|e| match e {
                RateLimitError::Limited => ContactError::RateLimited,
                RateLimitError::Storage(io) => {
                    ContactError::UnexpectedInternal(format!("rate limit storage: {io}"))
                }
            })
    }

    fn failure_event(&self, ctx: &RequestContext, err: &ContactError, progress: &Progress) -> AuditEvent {
        match err {
            ContactError::RateLimited => AuditEvent::new(ctx, EventKind::RateLimited),
            ContactError::DeliveryFailed(warning) => AuditEvent::new(ctx, EventKind::MailFailed)
                .with("to", progress.recipient.clone().unwrap_or_default())
                .with("warning", clean_line(warning)),
            _ => {
                let event = AuditEvent::new(ctx, EventKind::RuntimeError)
                    .with("reason", err.reason())
                    .with("stage", progress.stage.as_str())
                    .with_error(&err.to_string());
                match (&progress.fields, err.is_validation()) {
                    (Some(fields), true) => event.with_digest(fields, self.monitor.log_pii()),
                    _ => event,
                }
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}
