pub(crate) fn bridge_to_dynamic(value: &BridgeValue) -> Dynamic {
    match value {
        BridgeValue::Unit => Dynamic::UNIT,
        BridgeValue::Bool(value) => Dynamic::from(*value),
        BridgeValue::Number(value) => {
            if value.fract() == 0.0
                && value.is_finite()
                && *value >= INT::MIN as f64
                && *value <= INT::MAX as f64
            {
                Dynamic::from(*value as INT)
            } else {
                Dynamic::from(*value as FLOAT)
            }
        }
        BridgeValue::String(value) => Dynamic::from(value.clone()),
        BridgeValue::Array(values) => {
            Dynamic::from(values.iter().map(bridge_to_dynamic).collect::<Array>())
        }
        BridgeValue::Map(values) => {
            let mut map = Map::new();
            for (key, entry) in values {
                map.insert(key.as_str().into(), bridge_to_dynamic(entry));
            }
            Dynamic::from(map)
        }
    }
}

pub(crate) fn dynamic_to_bridge(value: Dynamic) -> Result<BridgeValue, BridgeError> {
    if value.is::<()>() {
        return Ok(BridgeValue::Unit);
    }
    if value.is::<bool>() {
        return Ok(BridgeValue::Bool(value.cast::<bool>()));
    }
    if value.is::<INT>() {
        return Ok(BridgeValue::Number(value.cast::<INT>() as f64));
    }
    if value.is::<FLOAT>() {
        return Ok(BridgeValue::Number(value.cast::<FLOAT>()));
    }
    if value.is::<ImmutableString>() {
        return Ok(BridgeValue::String(
            value.cast::<ImmutableString>().to_string(),
        ));
    }
    if value.is::<Array>() {
        let mut out = Vec::new();
        for entry in value.cast::<Array>() {
            out.push(dynamic_to_bridge(entry)?);
        }
        return Ok(BridgeValue::Array(out));
    }
    if value.is::<Map>() {
        let mut out = BTreeMap::new();
        for (key, entry) in value.cast::<Map>() {
            out.insert(key.to_string(), dynamic_to_bridge(entry)?);
        }
        return Ok(BridgeValue::Map(out));
    }
    Err(BridgeError::new(
        "VALUE_OPAQUE",
        format!(
            "Script value of type \"{}\" has no plain representation.",
            value.type_name()
        ),
    ))
}

/// Script results that are bound host values have no plain rendition;
/// callers retrieve those through the typed accessors instead.
pub(crate) fn dynamic_result_to_bridge(value: Dynamic) -> Result<BridgeValue, BridgeError> {
    if value.is::<ScriptHandle>() {
        return Ok(BridgeValue::Unit);
    }
    dynamic_to_bridge(value)
}
