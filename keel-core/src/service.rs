//! Service - Per-resource-type reconciliation strategy
//!
//! A [`ResourceService`] knows one vendor resource type: how to list and read
//! it, which calls create, modify and remove it, and how its wire fields map
//! onto schema attributes. The dispatcher drives the lifecycle.

use async_trait::async_trait;

use crate::call::Callback;
use crate::convert::{ConvertMode, ConverterTable, ResponseConverterTable};
use crate::error::ReconcileResult;
use crate::refresh::RefreshOutcome;
use crate::resource::ResourceData;
use crate::schema::ResourceSchema;
use crate::transport::ContentType;
use crate::value::{Value, ValueMap};

/// How a data source turns a query into list calls and list items into
/// results
#[derive(Debug, Clone, Default)]
pub struct DataSourceInfo {
    /// Maps data source arguments onto the list call's filter condition
    pub request_converts: ConverterTable,
    pub convert_mode: ConvertMode,
    pub content_type: ContentType,
    pub response_converts: ResponseConverterTable,
    /// Attribute of a converted item matched against `name_regex`
    pub name_field: Option<String>,
    /// Attribute of a converted item holding its id
    pub id_field: String,
}

impl DataSourceInfo {
    /// Query conditions are built in `InConvert` mode: only fields listed in
    /// `request_converts` are sent
    pub fn new(id_field: impl Into<String>) -> Self {
        Self {
            id_field: id_field.into(),
            convert_mode: ConvertMode::InConvert,
            ..Self::default()
        }
    }

    pub fn with_request_converts(mut self, converts: ConverterTable) -> Self {
        self.request_converts = converts;
        self
    }

    pub fn with_convert_mode(mut self, mode: ConvertMode) -> Self {
        self.convert_mode = mode;
        self
    }

    pub fn with_response_converts(mut self, converts: ResponseConverterTable) -> Self {
        self.response_converts = converts;
        self
    }

    pub fn with_name_field(mut self, field: impl Into<String>) -> Self {
        self.name_field = Some(field.into());
        self
    }
}

/// Extra wire data merged into a read result, with its own converters.
/// Used for attributes that live behind a second describe call.
#[derive(Debug, Clone, Default)]
pub struct ResponseHandler {
    pub data: ValueMap,
    pub converts: ResponseConverterTable,
}

impl ResponseHandler {
    pub fn new(data: ValueMap) -> Self {
        Self {
            data,
            converts: ResponseConverterTable::new(),
        }
    }

    pub fn with_converts(mut self, converts: ResponseConverterTable) -> Self {
        self.converts = converts;
        self
    }
}

#[async_trait]
pub trait ResourceService: Send + Sync {
    /// Resource type name (e.g., "clb_listener")
    fn resource_type(&self) -> &'static str;

    fn schema(&self) -> ResourceSchema;

    /// List raw wire items matching `condition`
    async fn read_resources(&self, condition: &ValueMap) -> ReconcileResult<Vec<Value>>;

    /// Raw wire item for `id`, or `NotFound`
    async fn read_resource(&self, data: &ResourceData, id: &str) -> ReconcileResult<ValueMap>;

    fn create_resource(&self, data: &ResourceData) -> Vec<Callback>;

    fn modify_resource(&self, data: &ResourceData) -> Vec<Callback>;

    fn remove_resource(&self, data: &ResourceData) -> Vec<Callback>;

    fn datasource_resources(&self) -> DataSourceInfo {
        DataSourceInfo::new("id")
    }

    /// Converters for the main read item
    fn response_converts(&self) -> ResponseConverterTable {
        ResponseConverterTable::new()
    }

    /// Additional data to merge into a read result
    async fn response_handlers(
        &self,
        _data: &ResourceData,
        _item: &ValueMap,
    ) -> ReconcileResult<Vec<ResponseHandler>> {
        Ok(Vec::new())
    }

    /// Dotted path of the lifecycle status inside a wire item
    fn status_path(&self) -> &str {
        "Status"
    }

    /// One poll observation. A missing resource is `Gone`.
    async fn refresh_status(&self, data: &ResourceData, id: &str) -> ReconcileResult<RefreshOutcome> {
        match self.read_resource(data, id).await {
            Ok(item) => {
                let item = Value::Map(item);
                let status = item
                    .get_path(self.status_path())?
                    .to_param_string()
                    .unwrap_or_default();
                Ok(RefreshOutcome::Found { item, status })
            }
            Err(err) if err.is_not_found() => Ok(RefreshOutcome::Gone),
            Err(err) => Err(err),
        }
    }

    /// Vendor id to read for an import id (composite ids override this)
    fn read_resource_id(&self, id: &str) -> String {
        id.to_string()
    }
}
