//! Bounded planning service.
//!
//! Planning is CPU-bound and may run long on pathological pockets, so each
//! request runs on the blocking pool behind a semaphore and under a
//! wall-clock timeout that also covers queueing for a worker. A timed-out
//! request has its [`CancelToken`] tripped; the worker stops at its next
//! checkpoint and still holds its permit until then, so the number of busy
//! workers never exceeds the configured bound.

use luthcam_core::data::{MachineProfile, MaterialProfile};
use luthcam_core::error::{ParameterError, PlanError};
use luthcam_core::geometry::PocketInput;
use luthcam_core::CancelToken;
use luthcam_toolpath::{PlanConfig, ToolpathAssembler, ToolpathPlan};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Re-run a timed-out request once with a coarser arc tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Multiplier applied to `arc_tolerance` on the retry.
    pub coarsen_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            coarsen_factor: 4.0,
        }
    }
}

/// Service limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Maximum number of plans computed at once.
    pub max_concurrent: usize,
    /// Wall-clock budget per attempt in milliseconds.
    pub timeout_ms: u64,
    pub retry: Option<RetryPolicy>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_concurrent: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            timeout_ms: 30_000,
            retry: None,
        }
    }
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<(), ParameterError> {
        if self.max_concurrent == 0 {
            return Err(ParameterError::InvalidValue {
                name: "max_concurrent".to_string(),
                reason: "at least one worker is required".to_string(),
            });
        }
        if self.timeout_ms == 0 {
            return Err(ParameterError::InvalidValue {
                name: "timeout_ms".to_string(),
                reason: "timeout must be non-zero".to_string(),
            });
        }
        if let Some(retry) = self.retry {
            ParameterError::check_range("coarsen_factor", retry.coarsen_factor, 1.0, f64::MAX)?;
        }
        Ok(())
    }
}

/// Everything one plan needs, owned so it can move to a worker thread.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanRequest {
    pub pocket: PocketInput,
    pub machine: MachineProfile,
    pub material: MaterialProfile,
    pub config: PlanConfig,
}

/// Runs planning requests on a bounded worker pool.
#[derive(Debug, Clone)]
pub struct PlanService {
    permits: Arc<Semaphore>,
    config: ServiceConfig,
}

impl PlanService {
    pub fn new(config: ServiceConfig) -> Result<Self, PlanError> {
        config.validate()?;
        Ok(Self {
            permits: Arc::new(Semaphore::new(config.max_concurrent)),
            config,
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Workers currently free.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Plans one request, retrying once on timeout when a policy is set.
    pub async fn plan(&self, request: PlanRequest) -> Result<ToolpathPlan, PlanError> {
        let Some(policy) = self.config.retry else {
            return self.attempt(request).await;
        };
        match self.attempt(request.clone()).await {
            Err(err) if err.is_timeout() => {
                let coarse = request.config.coarsened(policy.coarsen_factor);
                warn!(
                    "Plan timed out, retrying with arc tolerance {:.4}mm",
                    coarse.arc_tolerance
                );
                self.attempt(PlanRequest {
                    config: coarse,
                    ..request
                })
                .await
            }
            other => other,
        }
    }

    /// One budgeted run. The budget covers the wait for a worker as well as
    /// the planning itself.
    async fn attempt(&self, request: PlanRequest) -> Result<ToolpathPlan, PlanError> {
        let timeout_ms = self.config.timeout_ms;
        let cancel = CancelToken::new();
        let run = self.run(request, cancel.clone());
        match tokio::time::timeout(Duration::from_millis(timeout_ms), run).await {
            Ok(result) => result,
            Err(_) => {
                cancel.cancel();
                warn!("Plan exceeded {}ms, cancelling worker", timeout_ms);
                Err(PlanError::Timeout { timeout_ms })
            }
        }
    }

    async fn run(
        &self,
        request: PlanRequest,
        cancel: CancelToken,
    ) -> Result<ToolpathPlan, PlanError> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| PlanError::Worker(e.to_string()))?;

        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            ToolpathAssembler::new(request.config).plan_with_cancel(
                &request.pocket,
                &request.machine,
                &request.material,
                &cancel,
            )
        });

        match handle.await {
            Ok(result) => {
                debug!("Plan finished: ok = {}", result.is_ok());
                result
            }
            Err(join) => Err(PlanError::Worker(join.to_string())),
        }
    }
}
