//! Dispatcher - Drive a resource service through its lifecycle
//!
//! Create, update and delete run the service's callbacks strictly in order,
//! each under its lock and through its state poll, and stop at the first
//! error. Create and update then read the resource back so the stored state
//! reflects what the vendor reports.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use regex::Regex;
use tokio::time::Instant;

use crate::call::{CallOutcome, Callback};
use crate::config::DispatcherConfig;
use crate::convert::{ConvertError, build_params, convert_response};
use crate::error::{Phase, ReconcileError, ReconcileResult};
use crate::lock::LockRegistry;
use crate::refresh::StateRefresh;
use crate::resource::{ResourceData, ResourceState};
use crate::schema::TypeError;
use crate::service::ResourceService;
use crate::value::{Value, ValueMap};

/// Attribute of a data source query holding the name filter
pub const NAME_REGEX_FIELD: &str = "name_regex";

/// Shown in errors for resources that have no vendor id yet
const NO_ID: &str = "<new>";

/// Result of a data source query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataSourceResult {
    pub ids: Vec<String>,
    pub items: Vec<ValueMap>,
    pub total_count: usize,
}

pub struct Dispatcher {
    locks: Arc<LockRegistry>,
    config: DispatcherConfig,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DispatcherConfig::default())
    }
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig) -> Self {
        Self::with_locks(Arc::new(LockRegistry::new()), config)
    }

    /// Share a lock registry between dispatchers
    pub fn with_locks(locks: Arc<LockRegistry>, config: DispatcherConfig) -> Self {
        Self { locks, config }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub fn locks(&self) -> &Arc<LockRegistry> {
        &self.locks
    }

    /// Create the resource and return the state read back afterwards
    pub async fn create(
        &self,
        service: &dyn ResourceService,
        data: &mut ResourceData,
    ) -> ReconcileResult<ResourceState> {
        info!("Creating {}", service.resource_type());
        let result = self.create_inner(service, data).await;
        result.map_err(|e| wrap(e, Phase::Creating, service, data))
    }

    async fn create_inner(
        &self,
        service: &dyn ResourceService,
        data: &mut ResourceData,
    ) -> ReconcileResult<ResourceState> {
        validate(service, data)?;

        let callbacks = service.create_resource(data);
        self.run_callbacks(service, data, callbacks, self.config.create_timeout, "create")
            .await?;

        let id = data
            .id()
            .map(str::to_string)
            .ok_or_else(|| ReconcileError::service("create completed without assigning an id"))?;
        info!("Created {} {}", service.resource_type(), id);

        self.read_inner(service, data)
            .await?
            .ok_or_else(|| ReconcileError::not_found(service.resource_type(), id))
    }

    /// Apply declared changes in place and return the state read back
    /// afterwards. Changes to ForceNew attributes are rejected.
    pub async fn update(
        &self,
        service: &dyn ResourceService,
        data: &mut ResourceData,
    ) -> ReconcileResult<ResourceState> {
        info!("Updating {} {}", service.resource_type(), display_id(data));
        let result = self.update_inner(service, data).await;
        result.map_err(|e| wrap(e, Phase::Updating, service, data))
    }

    async fn update_inner(
        &self,
        service: &dyn ResourceService,
        data: &mut ResourceData,
    ) -> ReconcileResult<ResourceState> {
        validate(service, data)?;

        let schema = service.schema();
        if let Some(attr) = schema
            .attributes
            .values()
            .find(|attr| attr.force_new && data.has_change(&attr.name))
        {
            return Err(ReconcileError::ForceNew {
                attribute: attr.name.clone(),
            });
        }

        let id = data
            .id()
            .map(str::to_string)
            .ok_or_else(|| ReconcileError::service("cannot update a resource without an id"))?;

        let callbacks = service.modify_resource(data);
        self.run_callbacks(service, data, callbacks, self.config.update_timeout, "update")
            .await?;

        self.read_inner(service, data)
            .await?
            .ok_or_else(|| ReconcileError::not_found(service.resource_type(), id))
    }

    /// Delete the resource and wait until it is gone. A resource without an
    /// id is already gone.
    pub async fn delete(&self, service: &dyn ResourceService, data: &mut ResourceData) -> ReconcileResult<()> {
        let Some(id) = data.id().map(str::to_string) else {
            debug!("{} has no id, nothing to delete", service.resource_type());
            return Ok(());
        };
        info!("Deleting {} {}", service.resource_type(), id);
        let result = self.delete_inner(service, data, &id).await;
        result.map_err(|e| e.with_resource(Phase::Deleting, service.resource_type(), id.as_str()))
    }

    /// The remove callbacks and the wait for removal share one
    /// `delete_timeout` budget
    async fn delete_inner(
        &self,
        service: &dyn ResourceService,
        data: &mut ResourceData,
        id: &str,
    ) -> ReconcileResult<()> {
        let budget = self.config.delete_timeout;
        let deadline = Instant::now() + budget;

        let callbacks = service.remove_resource(data);
        self.run_callbacks(service, data, callbacks, budget, "delete")
            .await?;

        let remaining = deadline.saturating_duration_since(Instant::now());
        let snapshot: &ResourceData = data;
        StateRefresh::until_gone(remaining)
            .or_cadence(self.config.poll_delay, self.config.poll_min_interval)
            .wait(id, move || service.refresh_status(snapshot, id))
            .await?;

        info!("Deleted {} {}", service.resource_type(), id);
        data.clear();
        Ok(())
    }

    /// Read the remote resource into `data`. A resource that no longer
    /// exists clears `data` and yields `None`.
    pub async fn read(
        &self,
        service: &dyn ResourceService,
        data: &mut ResourceData,
    ) -> ReconcileResult<Option<ResourceState>> {
        let result = self.read_inner(service, data).await;
        result.map_err(|e| wrap(e, Phase::Reading, service, data))
    }

    async fn read_inner(
        &self,
        service: &dyn ResourceService,
        data: &mut ResourceData,
    ) -> ReconcileResult<Option<ResourceState>> {
        let Some(id) = data.id().map(str::to_string) else {
            return Ok(None);
        };

        let item = match service.read_resource(data, &id).await {
            Ok(item) => item,
            Err(err) if err.is_not_found() => {
                info!("{} {} no longer exists", service.resource_type(), id);
                data.clear();
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        let mut converted = convert_response(&item, &service.response_converts())?;
        for handler in service.response_handlers(data, &item).await? {
            converted.extend(convert_response(&handler.data, &handler.converts)?);
        }

        let state = hydrate(service, &id, converted);
        debug!("Read {} {} ({} attributes)", service.resource_type(), id, state.attributes.len());
        data.set_state(state.clone());
        Ok(Some(state))
    }

    /// Adopt an existing resource by id
    pub async fn import(
        &self,
        service: &dyn ResourceService,
        data: &mut ResourceData,
        id: &str,
    ) -> ReconcileResult<ResourceState> {
        info!("Importing {} {}", service.resource_type(), id);
        data.set_id(service.read_resource_id(id));
        let result = self
            .read_inner(service, data)
            .await
            .and_then(|state| state.ok_or_else(|| ReconcileError::not_found(service.resource_type(), id)));
        result.map_err(|e| e.with_resource(Phase::Importing, service.resource_type(), id))
    }

    /// Query existing resources. `data` holds the data source arguments,
    /// including an optional `name_regex` filter.
    pub async fn data(
        &self,
        service: &dyn ResourceService,
        data: &ResourceData,
    ) -> ReconcileResult<DataSourceResult> {
        self.data_inner(service, data).await.map_err(|e| {
            e.with_resource(Phase::ReadingDataSource, service.resource_type(), "data")
        })
    }

    async fn data_inner(
        &self,
        service: &dyn ResourceService,
        data: &ResourceData,
    ) -> ReconcileResult<DataSourceResult> {
        let info = service.datasource_resources();
        let condition = build_params(
            data,
            &service.schema(),
            &info.request_converts,
            info.convert_mode,
            info.content_type,
        )?;

        let name_regex = data
            .get_str(NAME_REGEX_FIELD)
            .map(Regex::new)
            .transpose()
            .map_err(|e| {
                ReconcileError::Validation(vec![TypeError::AttributeError {
                    name: NAME_REGEX_FIELD.to_string(),
                    inner: Box::new(TypeError::ValidationFailed {
                        message: e.to_string(),
                    }),
                }])
            })?;

        let raw = service.read_resources(&condition).await?;
        debug!("{} data source listed {} items", service.resource_type(), raw.len());

        let mut result = DataSourceResult::default();
        for item in raw {
            let Value::Map(item) = item else {
                return Err(ConvertError::Shape {
                    field: service.resource_type().to_string(),
                    expected: "map",
                    got: item.type_name(),
                }
                .into());
            };
            let converted = convert_response(&item, &info.response_converts)?;

            if let (Some(regex), Some(field)) = (&name_regex, &info.name_field) {
                let name = converted.get(field).and_then(Value::as_str).unwrap_or_default();
                if !regex.is_match(name) {
                    continue;
                }
            }

            if let Some(id) = converted.get(&info.id_field).and_then(Value::to_param_string) {
                result.ids.push(id);
            }
            result.items.push(converted);
        }
        result.total_count = result.items.len();
        Ok(result)
    }

    async fn run_callbacks(
        &self,
        service: &dyn ResourceService,
        data: &mut ResourceData,
        callbacks: Vec<Callback>,
        timeout: Duration,
        operation: &str,
    ) -> ReconcileResult<()> {
        let config = &self.config;
        let locks: &LockRegistry = &self.locks;
        let run = async move {
            for callback in callbacks {
                let call = match callback {
                    Callback::Call(call) => call,
                    Callback::Failed(err) => return Err(err),
                };
                match call.execute(service, data, locks, config).await? {
                    CallOutcome::Completed(_) => debug!("{} completed", call.action),
                    CallOutcome::Skipped => debug!("{} skipped", call.action),
                }
            }
            Ok(())
        };
        with_timeout(operation, timeout, run).await
    }
}

async fn with_timeout<T>(
    operation: &str,
    timeout: Duration,
    fut: impl Future<Output = ReconcileResult<T>>,
) -> ReconcileResult<T> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| ReconcileError::TimedOut {
            operation: operation.to_string(),
            timeout,
        })?
}

fn validate(service: &dyn ResourceService, data: &ResourceData) -> ReconcileResult<()> {
    service
        .schema()
        .validate(data.attributes())
        .map_err(ReconcileError::Validation)
}

/// Every schema attribute gets an entry: the remote value, else the schema
/// default, else null
fn hydrate(service: &dyn ResourceService, id: &str, mut converted: ValueMap) -> ResourceState {
    let schema = service.schema();
    let mut state = ResourceState::new(service.resource_type(), id);
    for (name, attr) in &schema.attributes {
        let value = converted
            .remove(name)
            .filter(|v| !v.is_null())
            .or_else(|| attr.default.clone())
            .unwrap_or(Value::Null);
        state.attributes.insert(name.clone(), value);
    }
    state
}

fn display_id(data: &ResourceData) -> &str {
    data.id().unwrap_or(NO_ID)
}

fn wrap(err: ReconcileError, phase: Phase, service: &dyn ResourceService, data: &ResourceData) -> ReconcileError {
    err.with_resource(phase, service.resource_type(), display_id(data))
}
