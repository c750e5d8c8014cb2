//! Value getters backing the published variables.

use std::sync::Arc;

use opcua::server::callbacks::AttributeGetter;
use opcua::server::prelude::*;

use crate::cache::{Measurand, Readout, SampleCache};
use crate::diagnosis::DiagnosisLed;
use crate::sensor::SensorStatus;

pub fn status_code(status: SensorStatus) -> StatusCode {
    match status {
        SensorStatus::Success => StatusCode::Good,
        SensorStatus::TimeoutError => StatusCode::BadTimeout,
        SensorStatus::GpioError => StatusCode::BadCommunicationError,
        SensorStatus::Unknown => StatusCode::BadNotFound,
    }
}

pub fn data_value(readout: Readout) -> DataValue {
    DataValue {
        value: Some(Variant::Float(readout.value)),
        status: Some(status_code(readout.status)),
        source_timestamp: Some(DateTime::from(readout.source_timestamp)),
        source_picoseconds: None,
        server_timestamp: Some(DateTime::now()),
        server_picoseconds: None,
    }
}

/// Serves one quantity of the cached sample.
pub struct SensorValueGetter {
    cache: Arc<SampleCache>,
    measurand: Measurand,
}

impl SensorValueGetter {
    pub fn new(cache: Arc<SampleCache>, measurand: Measurand) -> Self {
        Self { cache, measurand }
    }
}

impl AttributeGetter for SensorValueGetter {
    fn get(
        &mut self,
        _node_id: &NodeId,
        _timestamps_to_return: TimestampsToReturn,
        _attribute_id: AttributeId,
        _index_range: NumericRange,
        _data_encoding: &QualifiedName,
        _max_age: f64,
    ) -> Result<Option<DataValue>, StatusCode> {
        Ok(Some(data_value(self.cache.read(self.measurand))))
    }
}

pub struct LedStateGetter {
    led: Arc<DiagnosisLed>,
}

impl LedStateGetter {
    pub fn new(led: Arc<DiagnosisLed>) -> Self {
        Self { led }
    }
}

impl AttributeGetter for LedStateGetter {
    fn get(
        &mut self,
        _node_id: &NodeId,
        _timestamps_to_return: TimestampsToReturn,
        _attribute_id: AttributeId,
        _index_range: NumericRange,
        _data_encoding: &QualifiedName,
        _max_age: f64,
    ) -> Result<Option<DataValue>, StatusCode> {
        Ok(Some(DataValue::new_now(self.led.is_on())))
    }
}
