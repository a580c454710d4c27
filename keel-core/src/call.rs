//! Call - One vendor API operation and the hooks around it
//!
//! A resource's create/modify/remove sequence is an ordered list of
//! [`Callback`]s. Each carries an [`SdkCall`]: how to build the request, how
//! to execute it, and what to wait for afterwards.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};

use crate::config::DispatcherConfig;
use crate::convert::{ConvertMode, ConverterTable, build_params};
use crate::error::{ReconcileError, ReconcileResult};
use crate::lock::LockRegistry;
use crate::refresh::StateRefresh;
use crate::resource::ResourceData;
use crate::service::ResourceService;
use crate::transport::{ContentType, ServiceInfo, Transport};
use crate::value::{Value, ValueMap};

/// Per-call behavior. Only `execute_call` is required.
#[async_trait]
pub trait CallHooks: Send + Sync {
    /// Inspect or adjust the built parameters. `Ok(false)` skips the call.
    async fn before_call(&self, _data: &ResourceData, _params: &mut ValueMap) -> ReconcileResult<bool> {
        Ok(true)
    }

    async fn execute_call(&self, data: &ResourceData, params: &ValueMap) -> ReconcileResult<Value>;

    /// Body encoding `execute_call` sends, when the hooks fix one. Parameters
    /// are built for it.
    fn content_type(&self) -> Option<ContentType> {
        None
    }

    /// Recover from a failed `execute_call`, typically by retrying within
    /// `retry_budget`. The default surfaces the error.
    async fn call_error(
        &self,
        _data: &ResourceData,
        _params: &ValueMap,
        err: ReconcileError,
        _retry_budget: Duration,
    ) -> ReconcileResult<Value> {
        Err(err)
    }

    /// Record what the response says about the resource, e.g. its new id
    fn after_call(&self, _data: &mut ResourceData, _response: &Value) -> ReconcileResult<()> {
        Ok(())
    }

    async fn after_refresh(&self, _data: &ResourceData) -> ReconcileResult<()> {
        Ok(())
    }
}

/// Hooks that send the call straight through a [`Transport`]
pub struct TransportCall {
    transport: Arc<dyn Transport>,
    service: ServiceInfo,
    action: String,
}

impl TransportCall {
    pub fn new(transport: Arc<dyn Transport>, service: ServiceInfo, action: impl Into<String>) -> Self {
        Self {
            transport,
            service,
            action: action.into(),
        }
    }
}

#[async_trait]
impl CallHooks for TransportCall {
    async fn execute_call(&self, _data: &ResourceData, params: &ValueMap) -> ReconcileResult<Value> {
        self.transport
            .do_call(self.service.request(self.action.clone(), params.clone()))
            .await
    }

    fn content_type(&self) -> Option<ContentType> {
        Some(self.service.content_type)
    }
}

/// A vendor operation with its parameter mapping, locking and polling
pub struct SdkCall {
    pub action: String,
    pub convert: ConverterTable,
    pub convert_mode: ConvertMode,
    pub content_type: ContentType,
    /// Static parameters merged over the converted ones
    pub sdk_param: ValueMap,
    pub lock_key: Option<String>,
    pub refresh: Option<StateRefresh>,
    /// Polls of other resources, e.g. a parent load balancer returning to
    /// Active. `StateRefresh::resource_id` must be set.
    pub extra_refresh: Vec<(Arc<dyn ResourceService>, StateRefresh)>,
    pub hooks: Box<dyn CallHooks>,
}

impl SdkCall {
    /// Parameters are built for the hooks' content type, if they declare one
    pub fn new(action: impl Into<String>, hooks: impl CallHooks + 'static) -> Self {
        Self {
            action: action.into(),
            convert: ConverterTable::new(),
            convert_mode: ConvertMode::All,
            content_type: hooks.content_type().unwrap_or_default(),
            sdk_param: ValueMap::new(),
            lock_key: None,
            refresh: None,
            extra_refresh: Vec::new(),
            hooks: Box::new(hooks),
        }
    }

    pub fn with_convert(mut self, convert: ConverterTable) -> Self {
        self.convert = convert;
        self
    }

    pub fn with_convert_mode(mut self, mode: ConvertMode) -> Self {
        self.convert_mode = mode;
        self
    }

    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.sdk_param.insert(key.into(), value.into());
        self
    }

    pub fn with_lock_key(mut self, key: impl Into<String>) -> Self {
        self.lock_key = Some(key.into());
        self
    }

    pub fn with_refresh(mut self, refresh: StateRefresh) -> Self {
        self.refresh = Some(refresh);
        self
    }

    pub fn with_extra_refresh(mut self, service: Arc<dyn ResourceService>, refresh: StateRefresh) -> Self {
        self.extra_refresh.push((service, refresh));
        self
    }

    /// Run the call under its lock. `service` owns the resource being
    /// reconciled and answers the status polls of `refresh`. Polls without
    /// their own timings use the cadence from `config`, and `call_error`
    /// gets `config.call_retry_timeout` as its budget.
    pub async fn execute(
        &self,
        service: &dyn ResourceService,
        data: &mut ResourceData,
        locks: &LockRegistry,
        config: &DispatcherConfig,
    ) -> ReconcileResult<CallOutcome> {
        let key = self.lock_key.as_deref().unwrap_or_default();
        locks.with_lock(key, self.run(service, data, config)).await
    }

    async fn run(
        &self,
        service: &dyn ResourceService,
        data: &mut ResourceData,
        config: &DispatcherConfig,
    ) -> ReconcileResult<CallOutcome> {
        if let Some(sent) = self.hooks.content_type() {
            if sent != self.content_type {
                return Err(ReconcileError::service(format!(
                    "{}: parameters built as {:?} but sent as {:?}",
                    self.action, self.content_type, sent
                )));
            }
        }

        let schema = service.schema();
        let mut params = build_params(data, &schema, &self.convert, self.convert_mode, self.content_type)?;
        for (key, value) in &self.sdk_param {
            params.insert(key.clone(), value.clone());
        }

        if !self.hooks.before_call(data, &mut params).await? {
            warn!("Skipping {}: precondition not met", self.action);
            return Ok(CallOutcome::Skipped);
        }

        debug!("Calling {} with {} parameters", self.action, params.len());
        let response = match self.hooks.execute_call(data, &params).await {
            Ok(response) => response,
            Err(err) => {
                warn!("{} failed: {}", self.action, err);
                self.hooks
                    .call_error(data, &params, err, config.call_retry_timeout)
                    .await?
            }
        };
        self.hooks.after_call(data, &response)?;

        if let Some(refresh) = &self.refresh {
            let refresh = cadenced(refresh, config);
            let id = match refresh.resource_id.clone() {
                Some(id) => id,
                None => data
                    .id()
                    .map(str::to_string)
                    .ok_or_else(|| ReconcileError::service(format!("{}: no resource id to poll", self.action)))?,
            };
            let snapshot: &ResourceData = data;
            let id_ref = id.as_str();
            info!("Waiting for {} {} to reach {:?}", service.resource_type(), id, refresh.target);
            refresh
                .wait(id_ref, move || service.refresh_status(snapshot, id_ref))
                .await?;
        }

        for (other, refresh) in &self.extra_refresh {
            let refresh = cadenced(refresh, config);
            let id = refresh.resource_id.clone().ok_or_else(|| {
                ReconcileError::service(format!(
                    "{}: no {} id to poll",
                    self.action,
                    other.resource_type()
                ))
            })?;
            let other: &dyn ResourceService = &**other;
            let parent = ResourceData::new().with_id(id.clone());
            let parent_ref = &parent;
            let id_ref = id.as_str();
            info!("Waiting for {} {} to reach {:?}", other.resource_type(), id, refresh.target);
            refresh
                .wait(id_ref, move || other.refresh_status(parent_ref, id_ref))
                .await?;
        }

        self.hooks.after_refresh(data).await?;
        Ok(CallOutcome::Completed(response))
    }
}

fn cadenced(refresh: &StateRefresh, config: &DispatcherConfig) -> StateRefresh {
    refresh
        .clone()
        .or_cadence(config.poll_delay, config.poll_min_interval)
}

/// One step of a create/modify/remove sequence
pub enum Callback {
    Call(SdkCall),
    /// An error detected while planning the sequence, surfaced without
    /// touching the vendor
    Failed(ReconcileError),
}

impl From<SdkCall> for Callback {
    fn from(call: SdkCall) -> Self {
        Callback::Call(call)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    Completed(Value),
    /// `before_call` declined; not an error
    Skipped,
}
