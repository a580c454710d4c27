//! In-memory load balancer cloud and the services that manage it, for
//! dispatcher tests

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::call::{CallHooks, Callback, SdkCall, TransportCall};
use crate::convert::{ConvertMode, ConverterEntry, ConverterTable, ResponseConverter, ResponseConverterTable};
use crate::error::{ReconcileError, ReconcileResult};
use crate::paginate::with_page_number_query;
use crate::refresh::StateRefresh;
use crate::resource::ResourceData;
use crate::retry::{RetryError, retry};
use crate::schema::{AttributeSchema, AttributeType, ResourceSchema, types};
use crate::service::{DataSourceInfo, ResourceService};
use crate::transport::{CallRequest, ServiceInfo, Transport};
use crate::value::{Value, ValueMap};

pub const PAGE_SIZE: usize = 2;

/// Time a listener mutation occupies its load balancer
pub const MUTATION_TIME: Duration = Duration::from_secs(1);

#[derive(Default)]
struct CloudState {
    next_id: u32,
    load_balancers: BTreeMap<String, ValueMap>,
    /// Statuses a load balancer reports on its next describes
    lb_scripts: BTreeMap<String, VecDeque<String>>,
    listeners: BTreeMap<String, ValueMap>,
    create_script: Option<Vec<String>>,
    /// Deleted listeners stay `Deleting` instead of disappearing
    linger_deletes: bool,
    /// action -> (code, message) returned by its next calls
    failures: BTreeMap<String, VecDeque<(String, String)>>,
    calls: Vec<CallRequest>,
    in_flight: BTreeMap<String, usize>,
    max_in_flight: usize,
}

impl CloudState {
    fn new_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    fn lb_mut(&mut self, id: &str, action: &str) -> ReconcileResult<&mut ValueMap> {
        self.load_balancers.get_mut(id).ok_or_else(|| {
            ReconcileError::transport(action, Some("InvalidLoadBalancer.NotFound"), format!("{} not found", id))
        })
    }

    fn listener_mut(&mut self, id: &str, action: &str) -> ReconcileResult<&mut ValueMap> {
        self.listeners.get_mut(id).ok_or_else(|| {
            ReconcileError::transport(action, Some("InvalidListener.NotFound"), format!("{} not found", id))
        })
    }

    fn advance_script(&mut self, id: &str) {
        let next = self.lb_scripts.get_mut(id).and_then(VecDeque::pop_front);
        if let (Some(status), Some(lb)) = (next, self.load_balancers.get_mut(id)) {
            lb.insert("Status".to_string(), Value::String(status));
        }
    }
}

fn param(params: &ValueMap, key: &str) -> Option<String> {
    params.get(key).and_then(Value::to_param_string)
}

fn required_param(params: &ValueMap, key: &str, action: &str) -> ReconcileResult<String> {
    param(params, key).ok_or_else(|| {
        ReconcileError::transport(action, Some("MissingParameter"), format!("{} is required", key))
    })
}

fn map(entries: &[(&str, Value)]) -> ValueMap {
    entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

fn response(entries: &[(&str, Value)]) -> Value {
    Value::Map(map(entries))
}

/// A cloud with load balancers and listeners. Listener mutations take
/// [`MUTATION_TIME`] and require their load balancer to be `Active`; each
/// one leaves it `Configuring` for one describe.
#[derive(Default)]
pub struct FakeCloud {
    state: Mutex<CloudState>,
}

impl FakeCloud {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Statuses the next created load balancer reports on successive
    /// describes (default: `Active` right away)
    pub fn script_next_create(&self, statuses: &[&str]) {
        self.state.lock().unwrap().create_script = Some(statuses.iter().map(|s| s.to_string()).collect());
    }

    /// Leave deleted listeners behind in `Deleting`
    pub fn linger_deletes(&self) {
        self.state.lock().unwrap().linger_deletes = true;
    }

    /// Make the next call of `action` fail with `code`
    pub fn fail_next(&self, action: &str, code: &str, message: &str) {
        self.state
            .lock()
            .unwrap()
            .failures
            .entry(action.to_string())
            .or_default()
            .push_back((code.to_string(), message.to_string()));
    }

    pub fn insert_load_balancer(&self, name: &str, address_type: &str) -> String {
        let mut state = self.state.lock().unwrap();
        let id = state.new_id("lb");
        let item = map(&[
            ("LoadBalancerId", Value::from(id.as_str())),
            ("LoadBalancerName", Value::from(name)),
            ("AddressType", Value::from(address_type)),
            ("PayType", Value::Int(2)),
            ("Status", Value::from("Active")),
        ]);
        state.load_balancers.insert(id.clone(), item);
        id
    }

    pub fn load_balancer(&self, id: &str) -> Option<ValueMap> {
        self.state.lock().unwrap().load_balancers.get(id).cloned()
    }

    pub fn listener(&self, id: &str) -> Option<ValueMap> {
        self.state.lock().unwrap().listeners.get(id).cloned()
    }

    /// Remove a listener behind the engine's back
    pub fn drop_listener(&self, id: &str) {
        self.state.lock().unwrap().listeners.remove(id);
    }

    /// Parameters of every call made to `action`, in order
    pub fn calls(&self, action: &str) -> Vec<ValueMap> {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.action == action)
            .map(|c| c.params.clone())
            .collect()
    }

    pub fn call_count(&self, action: &str) -> usize {
        self.calls(action).len()
    }

    /// Peak number of listener mutations running against one load balancer
    pub fn max_in_flight(&self) -> usize {
        self.state.lock().unwrap().max_in_flight
    }

    /// Log the call, apply injected failures, and name the load balancer a
    /// listener mutation occupies
    fn admit(&self, request: &CallRequest) -> ReconcileResult<Option<String>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(request.clone());

        if let Some((code, message)) = state
            .failures
            .get_mut(&request.action)
            .and_then(VecDeque::pop_front)
        {
            return Err(ReconcileError::transport(request.action.as_str(), Some(code.as_str()), message));
        }

        let parent = match request.action.as_str() {
            "CreateListener" => param(&request.params, "LoadBalancerId"),
            "ModifyListener" | "DeleteListener" => param(&request.params, "ListenerId")
                .and_then(|id| state.listeners.get(&id))
                .and_then(|l| param(l, "LoadBalancerId")),
            _ => None,
        };
        if let Some(lb) = &parent {
            let count = state.in_flight.entry(lb.clone()).or_default();
            *count += 1;
            let count = *count;
            state.max_in_flight = state.max_in_flight.max(count);
        }
        Ok(parent)
    }

    fn release(&self, lb: &str) {
        if let Some(count) = self.state.lock().unwrap().in_flight.get_mut(lb) {
            *count -= 1;
        }
    }

    fn apply(&self, request: &CallRequest) -> ReconcileResult<Value> {
        let mut state = self.state.lock().unwrap();
        let action = request.action.as_str();
        let params = &request.params;

        match action {
            "CreateLoadBalancer" => {
                let name = required_param(params, "LoadBalancerName", action)?;
                let id = state.new_id("lb");
                let item = map(&[
                    ("LoadBalancerId", Value::from(id.as_str())),
                    ("LoadBalancerName", Value::String(name)),
                    (
                        "AddressType",
                        params.get("AddressType").cloned().unwrap_or(Value::from("internet")),
                    ),
                    ("PayType", params.get("PayType").cloned().unwrap_or(Value::Int(2))),
                    ("Status", Value::from("Provisioning")),
                ]);
                let script = state
                    .create_script
                    .take()
                    .unwrap_or_else(|| vec!["Active".to_string()]);
                state.load_balancers.insert(id.clone(), item);
                state.lb_scripts.insert(id.clone(), script.into());
                Ok(response(&[("LoadBalancerId", Value::String(id))]))
            }
            "DescribeLoadBalancers" => {
                if let Some(id) = param(params, "LoadBalancerId") {
                    state.advance_script(&id);
                    let items: Vec<Value> = state
                        .load_balancers
                        .get(&id)
                        .map(|lb| Value::Map(lb.clone()))
                        .into_iter()
                        .collect();
                    return Ok(response(&[("LoadBalancers", Value::List(items))]));
                }
                let address_type = param(params, "AddressType");
                let matching: Vec<Value> = state
                    .load_balancers
                    .values()
                    .filter(|lb| address_type.is_none() || param(lb, "AddressType") == address_type)
                    .map(|lb| Value::Map(lb.clone()))
                    .collect();
                let size = params.get("PageSize").and_then(Value::as_i64).unwrap_or(20) as usize;
                let number = params.get("PageNumber").and_then(Value::as_i64).unwrap_or(1) as usize;
                let page: Vec<Value> = matching
                    .iter()
                    .skip((number - 1) * size)
                    .take(size)
                    .cloned()
                    .collect();
                Ok(response(&[
                    ("LoadBalancers", Value::List(page)),
                    ("TotalCount", Value::Int(matching.len() as i64)),
                ]))
            }
            "ModifyLoadBalancerAttributes" => {
                let id = required_param(params, "LoadBalancerId", action)?;
                let lb = state.lb_mut(&id, action)?;
                if let Some(name) = params.get("LoadBalancerName") {
                    lb.insert("LoadBalancerName".to_string(), name.clone());
                }
                Ok(response(&[]))
            }
            "DeleteLoadBalancer" => {
                let id = required_param(params, "LoadBalancerId", action)?;
                state.lb_mut(&id, action)?;
                state.load_balancers.remove(&id);
                state
                    .listeners
                    .retain(|_, l| param(l, "LoadBalancerId").as_deref() != Some(id.as_str()));
                Ok(response(&[]))
            }
            "CreateListener" => {
                let lb_id = required_param(params, "LoadBalancerId", action)?;
                let lb = state.lb_mut(&lb_id, action)?;
                let status = param(lb, "Status").unwrap_or_default();
                if status != "Active" {
                    return Err(ReconcileError::transport(
                        action,
                        Some("IncorrectStatus"),
                        format!("load balancer {} is {}", lb_id, status),
                    ));
                }
                lb.insert("Status".to_string(), Value::from("Configuring"));
                state
                    .lb_scripts
                    .insert(lb_id.clone(), VecDeque::from(["Configuring".to_string(), "Active".to_string()]));

                let id = state.new_id("lsn");
                let mut item = params.clone();
                item.insert("ListenerId".to_string(), Value::from(id.as_str()));
                item.insert("Status".to_string(), Value::from("Running"));
                state.listeners.insert(id.clone(), item);
                Ok(response(&[("ListenerId", Value::String(id))]))
            }
            "DescribeListeners" => {
                let id = required_param(params, "ListenerId", action)?;
                let items: Vec<Value> = state
                    .listeners
                    .get(&id)
                    .map(|l| Value::Map(l.clone()))
                    .into_iter()
                    .collect();
                Ok(response(&[("Listeners", Value::List(items))]))
            }
            "ModifyListener" => {
                let id = required_param(params, "ListenerId", action)?;
                let listener = state.listener_mut(&id, action)?;
                for (key, value) in params {
                    listener.insert(key.clone(), value.clone());
                }
                Ok(response(&[]))
            }
            "DeleteListener" => {
                let id = required_param(params, "ListenerId", action)?;
                if state.linger_deletes {
                    let listener = state.listener_mut(&id, action)?;
                    listener.insert("Status".to_string(), Value::from("Deleting"));
                } else {
                    state.listener_mut(&id, action)?;
                    state.listeners.remove(&id);
                }
                Ok(response(&[]))
            }
            _ => Err(ReconcileError::transport(action, Some("InvalidAction"), "unknown action")),
        }
    }
}

#[async_trait]
impl Transport for FakeCloud {
    async fn do_call(&self, request: CallRequest) -> ReconcileResult<Value> {
        if let Some(lb) = self.admit(&request)? {
            tokio::time::sleep(MUTATION_TIME).await;
            self.release(&lb);
        }
        self.apply(&request)
    }
}

fn clb() -> ServiceInfo {
    ServiceInfo::new("clb", "2018-03-17")
}

pub fn billing_type_to_wire(value: &Value) -> Result<Value, String> {
    match value.as_str() {
        Some("PrePaid") => Ok(Value::Int(1)),
        Some("PostPaid") => Ok(Value::Int(2)),
        other => Err(format!("unknown billing type {:?}", other)),
    }
}

pub fn billing_type_from_wire(value: &Value) -> Result<Value, String> {
    match value.as_i64() {
        Some(1) => Ok(Value::from("PrePaid")),
        Some(2) => Ok(Value::from("PostPaid")),
        other => Err(format!("unknown billing type code {:?}", other)),
    }
}

fn converters(entries: Vec<(&str, ConverterEntry)>) -> ConverterTable {
    entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

fn first_item(response: &Value, list_field: &str, resource_type: &str, id: &str) -> ReconcileResult<ValueMap> {
    response
        .get_path(list_field)?
        .as_list()
        .and_then(|items| items.first())
        .and_then(Value::as_map)
        .cloned()
        .ok_or_else(|| ReconcileError::not_found(resource_type, id))
}

/// Wait for a load balancer to settle back to `Active`
pub fn lb_active(id: &str) -> StateRefresh {
    StateRefresh::new(&["Active"], Duration::from_secs(600))
        .with_pending(&["Provisioning", "Configuring"])
        .with_fail(&["Error"])
        .with_resource_id(id)
}

struct CreateLoadBalancer {
    transport: Arc<dyn Transport>,
}

#[async_trait]
impl CallHooks for CreateLoadBalancer {
    async fn execute_call(&self, _data: &ResourceData, params: &ValueMap) -> ReconcileResult<Value> {
        self.transport
            .do_call(clb().request("CreateLoadBalancer", params.clone()))
            .await
    }

    fn after_call(&self, data: &mut ResourceData, response: &Value) -> ReconcileResult<()> {
        let id = response.get_str_path("LoadBalancerId")?.to_string();
        data.set_id(id);
        Ok(())
    }
}

pub struct LoadBalancerService {
    transport: Arc<dyn Transport>,
}

impl LoadBalancerService {
    pub fn new(transport: Arc<dyn Transport>) -> Arc<Self> {
        Arc::new(Self { transport })
    }
}

#[async_trait]
impl ResourceService for LoadBalancerService {
    fn resource_type(&self) -> &'static str {
        "clb"
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new("clb")
            .attribute(AttributeSchema::new("load_balancer_name", AttributeType::String).required())
            .attribute(
                AttributeSchema::new("billing_type", types::one_of(&["PrePaid", "PostPaid"]))
                    .optional()
                    .with_default(Value::from("PostPaid")),
            )
            .attribute(
                AttributeSchema::new("address_type", types::one_of(&["internet", "intranet"]))
                    .optional()
                    .force_new()
                    .with_default(Value::from("internet")),
            )
            .attribute(AttributeSchema::new("load_balancer_id", AttributeType::String).computed())
            .attribute(AttributeSchema::new("status", AttributeType::String).computed())
    }

    async fn read_resources(&self, condition: &ValueMap) -> ReconcileResult<Vec<Value>> {
        with_page_number_query(condition, "PageSize", "PageNumber", PAGE_SIZE, 1, |query| {
            let transport = self.transport.clone();
            async move {
                let response = transport
                    .do_call(clb().request("DescribeLoadBalancers", query))
                    .await?;
                let items = response.get_path("LoadBalancers")?.as_list().unwrap_or_default();
                Ok(items.to_vec())
            }
        })
        .await
    }

    async fn read_resource(&self, _data: &ResourceData, id: &str) -> ReconcileResult<ValueMap> {
        let query = ValueMap::from([("LoadBalancerId".to_string(), Value::from(id))]);
        let response = self
            .transport
            .do_call(clb().request("DescribeLoadBalancers", query))
            .await?;
        first_item(&response, "LoadBalancers", self.resource_type(), id)
    }

    fn create_resource(&self, _data: &ResourceData) -> Vec<Callback> {
        let convert = converters(vec![(
            "billing_type",
            ConverterEntry::rename("PayType").with_transform(billing_type_to_wire),
        )]);
        let refresh = StateRefresh::new(&["Active"], Duration::from_secs(600))
            .with_pending(&["Provisioning"])
            .with_fail(&["Error"]);
        vec![
            SdkCall::new(
                "CreateLoadBalancer",
                CreateLoadBalancer {
                    transport: self.transport.clone(),
                },
            )
            .with_convert(convert)
            .with_refresh(refresh)
            .into(),
        ]
    }

    fn modify_resource(&self, data: &ResourceData) -> Vec<Callback> {
        let Some(id) = data.id() else {
            return vec![Callback::Failed(ReconcileError::service("load balancer has no id"))];
        };
        if !data.has_change("load_balancer_name") {
            return Vec::new();
        }
        vec![
            SdkCall::new(
                "ModifyLoadBalancerAttributes",
                TransportCall::new(self.transport.clone(), clb(), "ModifyLoadBalancerAttributes"),
            )
            .with_convert_mode(ConvertMode::InConvert)
            .with_convert(converters(vec![("load_balancer_name", ConverterEntry::new())]))
            .with_param("LoadBalancerId", id)
            .with_lock_key(id)
            .into(),
        ]
    }

    fn remove_resource(&self, data: &ResourceData) -> Vec<Callback> {
        let id = data.id().unwrap_or_default();
        vec![
            SdkCall::new(
                "DeleteLoadBalancer",
                TransportCall::new(self.transport.clone(), clb(), "DeleteLoadBalancer"),
            )
            .with_convert_mode(ConvertMode::Ignore)
            .with_param("LoadBalancerId", id)
            .with_lock_key(id)
            .into(),
        ]
    }

    fn datasource_resources(&self) -> DataSourceInfo {
        DataSourceInfo::new("load_balancer_id")
            .with_request_converts(converters(vec![("address_type", ConverterEntry::new().force_get())]))
            .with_response_converts(self.response_converts())
            .with_name_field("load_balancer_name")
    }

    fn response_converts(&self) -> ResponseConverterTable {
        ResponseConverterTable::from([(
            "PayType".to_string(),
            ResponseConverter::rename("billing_type").with_transform(billing_type_from_wire),
        )])
    }
}

struct CreateListener {
    transport: Arc<dyn Transport>,
}

#[async_trait]
impl CallHooks for CreateListener {
    async fn execute_call(&self, _data: &ResourceData, params: &ValueMap) -> ReconcileResult<Value> {
        self.transport
            .do_call(clb().request("CreateListener", params.clone()))
            .await
    }

    fn after_call(&self, data: &mut ResourceData, response: &Value) -> ReconcileResult<()> {
        let id = response.get_str_path("ListenerId")?.to_string();
        data.set_id(id);
        Ok(())
    }
}

struct ModifyListener {
    transport: Arc<dyn Transport>,
}

#[async_trait]
impl CallHooks for ModifyListener {
    async fn before_call(&self, _data: &ResourceData, params: &mut ValueMap) -> ReconcileResult<bool> {
        Ok(params.keys().any(|k| k != "ListenerId"))
    }

    async fn execute_call(&self, _data: &ResourceData, params: &ValueMap) -> ReconcileResult<Value> {
        self.transport
            .do_call(clb().request("ModifyListener", params.clone()))
            .await
    }
}

/// Retries transient failures; a listener that is already gone counts as
/// deleted
struct DeleteListener {
    transport: Arc<dyn Transport>,
}

#[async_trait]
impl CallHooks for DeleteListener {
    async fn execute_call(&self, _data: &ResourceData, params: &ValueMap) -> ReconcileResult<Value> {
        self.transport
            .do_call(clb().request("DeleteListener", params.clone()))
            .await
    }

    async fn call_error(
        &self,
        data: &ResourceData,
        params: &ValueMap,
        err: ReconcileError,
        retry_budget: Duration,
    ) -> ReconcileResult<Value> {
        if err.is_not_found() {
            return Ok(Value::Null);
        }
        if !err.is_retryable() {
            return Err(err);
        }
        retry(retry_budget, Duration::from_secs(2), || async move {
            match self.execute_call(data, params).await {
                Ok(response) => Ok(response),
                Err(e) if e.is_not_found() => Ok(Value::Null),
                Err(e) => Err(RetryError::classify(e)),
            }
        })
        .await
    }
}

pub struct ListenerService {
    transport: Arc<dyn Transport>,
    load_balancers: Arc<LoadBalancerService>,
}

impl ListenerService {
    pub fn new(transport: Arc<dyn Transport>, load_balancers: Arc<LoadBalancerService>) -> Arc<Self> {
        Arc::new(Self {
            transport,
            load_balancers,
        })
    }

    fn lb_id(data: &ResourceData) -> String {
        data.get_str("load_balancer_id").unwrap_or_default().to_string()
    }
}

#[async_trait]
impl ResourceService for ListenerService {
    fn resource_type(&self) -> &'static str {
        "clb_listener"
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new("clb_listener")
            .attribute(
                AttributeSchema::new("load_balancer_id", AttributeType::String)
                    .required()
                    .force_new(),
            )
            .attribute(AttributeSchema::new("listener_port", types::port()).required().force_new())
            .attribute(
                AttributeSchema::new("protocol", types::one_of(&["TCP", "UDP", "HTTP", "HTTPS"]))
                    .required()
                    .force_new(),
            )
            .attribute(AttributeSchema::new("listener_name", AttributeType::String).optional())
            .attribute(AttributeSchema::new("certificate_id", AttributeType::String).optional())
            .attribute(AttributeSchema::new("listener_id", AttributeType::String).computed())
            .attribute(AttributeSchema::new("status", AttributeType::String).computed())
    }

    async fn read_resources(&self, condition: &ValueMap) -> ReconcileResult<Vec<Value>> {
        let response = self
            .transport
            .do_call(clb().request("DescribeListeners", condition.clone()))
            .await?;
        Ok(response
            .get_path("Listeners")?
            .as_list()
            .unwrap_or_default()
            .to_vec())
    }

    async fn read_resource(&self, _data: &ResourceData, id: &str) -> ReconcileResult<ValueMap> {
        let query = ValueMap::from([("ListenerId".to_string(), Value::from(id))]);
        let response = self
            .transport
            .do_call(clb().request("DescribeListeners", query))
            .await?;
        first_item(&response, "Listeners", self.resource_type(), id)
    }

    fn create_resource(&self, data: &ResourceData) -> Vec<Callback> {
        if data.get_str("protocol") == Some("HTTPS") && data.get_ok("certificate_id").is_none() {
            return vec![Callback::Failed(ReconcileError::service(
                "HTTPS listeners require certificate_id",
            ))];
        }
        let lb_id = Self::lb_id(data);
        vec![
            SdkCall::new(
                "CreateListener",
                CreateListener {
                    transport: self.transport.clone(),
                },
            )
            .with_lock_key(lb_id.as_str())
            .with_extra_refresh(self.load_balancers.clone(), lb_active(&lb_id))
            .into(),
        ]
    }

    fn modify_resource(&self, data: &ResourceData) -> Vec<Callback> {
        let lb_id = Self::lb_id(data);
        vec![
            SdkCall::new(
                "ModifyListener",
                ModifyListener {
                    transport: self.transport.clone(),
                },
            )
            .with_convert_mode(ConvertMode::InConvert)
            .with_convert(converters(vec![
                ("listener_name", ConverterEntry::new()),
                ("certificate_id", ConverterEntry::new()),
            ]))
            .with_param("ListenerId", data.id().unwrap_or_default())
            .with_lock_key(lb_id.as_str())
            .into(),
        ]
    }

    fn remove_resource(&self, data: &ResourceData) -> Vec<Callback> {
        let lb_id = Self::lb_id(data);
        vec![
            SdkCall::new(
                "DeleteListener",
                DeleteListener {
                    transport: self.transport.clone(),
                },
            )
            .with_convert_mode(ConvertMode::Ignore)
            .with_param("ListenerId", data.id().unwrap_or_default())
            .with_lock_key(lb_id.as_str())
            .into(),
        ]
    }
}

/// Cloud plus both services wired to it
pub struct Fixture {
    pub cloud: Arc<FakeCloud>,
    pub load_balancers: Arc<LoadBalancerService>,
    pub listeners: Arc<ListenerService>,
}

impl Fixture {
    pub fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let cloud = FakeCloud::new();
        let transport: Arc<dyn Transport> = cloud.clone();
        let load_balancers = LoadBalancerService::new(transport.clone());
        let listeners = ListenerService::new(transport, load_balancers.clone());
        Self {
            cloud,
            load_balancers,
            listeners,
        }
    }
}
